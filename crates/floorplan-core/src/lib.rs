//! Floor-plan editor core.
//!
//! Platform-agnostic data model, editing state machine and persistence
//! interface for a 2D floor-plan editor. Rendering and transport are left
//! to the host.

pub mod backend;
pub mod config;
pub mod editor;
pub mod element;
pub mod error;
pub mod history;
pub mod input;
pub mod layers;
pub mod model;
pub mod selection;
pub mod snap;
pub mod store;
pub mod tools;
pub mod viewport;

pub use backend::{Backend, BackendError, BackendResult, MemoryBackend};
pub use config::{ConfigError, EditorConfig};
pub use editor::{Action, Command, CommandOutput, EditorSession};
pub use element::{Element, ElementId, ElementKind, Geometry, Metadata, Style};
pub use error::{EditorError, EditorResult, Notification, NotificationLevel};
pub use history::History;
pub use input::{ClickTracker, Key, Modifiers, MouseButton, PointerEvent};
pub use layers::{Layer, LayerError, LayerIndex};
pub use model::{
    BatchElement, Drawing, DrawingId, DrawingPatch, ElementBatch, ElementPatch, NewElement, Project, ProjectId,
    ProjectMetadata, UserId, ViewBox,
};
pub use selection::{MoveState, Selection};
pub use snap::{GridSettings, SnapResult, snap_point, snap_to_grid};
pub use store::ElementStore;
pub use tools::{ToolKind, ToolManager, ToolOutcome};
pub use viewport::Viewport;
