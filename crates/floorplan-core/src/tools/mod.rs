//! Tool system for the floor-plan editor.

use crate::element::{Element, ElementId, ElementKind, Geometry, Style};
use crate::input::Modifiers;
use crate::snap::GridSettings;
use crate::store::ElementStore;
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    #[default]
    Select,
    Wall,
    Door,
    Window,
    Room,
    Furniture,
    Text,
    Dimension,
}

impl ToolKind {
    pub const ALL: [ToolKind; 8] = [
        ToolKind::Select,
        ToolKind::Wall,
        ToolKind::Door,
        ToolKind::Window,
        ToolKind::Room,
        ToolKind::Furniture,
        ToolKind::Text,
        ToolKind::Dimension,
    ];

    /// The element kind this tool draws, if any.
    pub fn element_kind(self) -> Option<ElementKind> {
        match self {
            ToolKind::Select => None,
            ToolKind::Wall => Some(ElementKind::Wall),
            ToolKind::Door => Some(ElementKind::Door),
            ToolKind::Window => Some(ElementKind::Window),
            ToolKind::Room => Some(ElementKind::Room),
            ToolKind::Furniture => Some(ElementKind::Furniture),
            ToolKind::Text => Some(ElementKind::Text),
            ToolKind::Dimension => Some(ElementKind::Dimension),
        }
    }
}

/// State of a tool interaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ToolState {
    /// Waiting for interaction.
    #[default]
    Idle,
    /// A multi-point element is being built. Its last point trails the pointer.
    Constructing { draft: Element },
}

/// A primary-button press, already converted to world coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct PointerDown {
    /// Unsnapped world position.
    pub position: Point,
    pub modifiers: Modifiers,
    /// 2 on the second press of a double click.
    pub click_count: u8,
    /// Topmost hit-testable element under the pointer.
    pub hit: Option<ElementId>,
}

/// What a tool interaction asks the editor to do.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Nothing,
    ClearSelection,
    Select { id: ElementId, additive: bool },
    DraftStarted,
    DraftExtended,
    /// A finished element to create.
    Commit(Element),
    /// A draft was dropped without creating anything.
    Discarded,
}

/// Manages the current tool and its state.
#[derive(Debug, Clone, Default)]
pub struct ToolManager {
    /// Currently selected tool.
    pub current_tool: ToolKind,
    /// Current state of the tool.
    pub state: ToolState,
}

impl ToolManager {
    /// Create a new tool manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch tools. Any draft in progress is discarded and returned.
    pub fn set_tool(&mut self, tool: ToolKind) -> Option<Element> {
        self.current_tool = tool;
        self.cancel()
    }

    /// Drop the draft in progress, if any.
    pub fn cancel(&mut self) -> Option<Element> {
        match std::mem::take(&mut self.state) {
            ToolState::Constructing { draft } => {
                log::debug!("Discarded {} draft", draft.kind());
                Some(draft)
            }
            ToolState::Idle => None,
        }
    }

    pub fn is_constructing(&self) -> bool {
        matches!(self.state, ToolState::Constructing { .. })
    }

    /// The element being built, for preview.
    pub fn draft(&self) -> Option<&Element> {
        match &self.state {
            ToolState::Constructing { draft } => Some(draft),
            ToolState::Idle => None,
        }
    }

    /// Handle a primary-button press.
    pub fn pointer_down(&mut self, event: PointerDown, grid: &GridSettings, store: &ElementStore) -> ToolOutcome {
        let Some(kind) = self.current_tool.element_kind() else {
            return match event.hit {
                Some(id) => ToolOutcome::Select {
                    id,
                    additive: event.modifiers.shift,
                },
                None => ToolOutcome::ClearSelection,
            };
        };

        let point = grid.snap_point(event.position).point;

        if !kind.is_multi_point() {
            return ToolOutcome::Commit(new_element(kind, point, store));
        }

        match &mut self.state {
            ToolState::Idle => {
                self.state = ToolState::Constructing {
                    draft: new_element(kind, point, store),
                };
                ToolOutcome::DraftStarted
            }
            ToolState::Constructing { draft } => {
                let Some(line) = draft.geometry.polyline_mut() else {
                    return ToolOutcome::Nothing;
                };
                if let Some(last) = line.points.last_mut() {
                    *last = point;
                }
                if event.click_count >= 2 {
                    self.finish()
                } else {
                    line.points.push(point);
                    ToolOutcome::DraftExtended
                }
            }
        }
    }

    /// Move the trailing draft point. Returns true if the draft changed.
    pub fn pointer_move(&mut self, position: Point, grid: &GridSettings) -> bool {
        let ToolState::Constructing { draft } = &mut self.state else {
            return false;
        };
        let point = grid.snap_point(position).point;
        match draft.geometry.polyline_mut().and_then(|line| line.points.last_mut()) {
            Some(last) if *last != point => {
                *last = point;
                true
            }
            _ => false,
        }
    }

    /// Commit the draft as it stands.
    ///
    /// Consecutive duplicate points are collapsed first. A draft left with
    /// fewer distinct points than its kind requires is discarded.
    pub fn finish(&mut self) -> ToolOutcome {
        let Some(mut draft) = self.cancel() else {
            return ToolOutcome::Nothing;
        };
        if let Some(line) = draft.geometry.polyline_mut() {
            line.dedup();
        }
        if draft.has_min_points() {
            log::debug!("Committed {} draft", draft.kind());
            ToolOutcome::Commit(draft)
        } else {
            ToolOutcome::Discarded
        }
    }
}

/// A new element of `kind` at `point` with the tool defaults applied.
fn new_element(kind: ElementKind, point: Point, store: &ElementStore) -> Element {
    let mut element = Element::new(ElementId::placeholder(), Geometry::at(kind, point));
    element.metadata.name = format!("{} {}", kind.label(), store.count_kind(kind) + 1);
    element.metadata.layer = kind.default_layer().to_string();
    if kind == ElementKind::Wall {
        element.style = Style::wall();
    }
    element
}
