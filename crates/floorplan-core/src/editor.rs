//! Editor session: the state of one open drawing and the reducer driving it.
//!
//! Every user intent goes through [`EditorSession::dispatch`]. Element edits
//! are applied to the local store immediately and queued as [`Command`]s for
//! the backend. Each command carries what is needed to undo it locally, so a
//! failed write can be rolled back when its result comes in through
//! [`EditorSession::complete`].

use crate::backend::{Backend, BackendResult};
use crate::config::EditorConfig;
use crate::element::{Element, ElementId};
use crate::error::{EditorError, EditorResult, Notification};
use crate::history::History;
use crate::input::{Key, Modifiers, MouseButton, PointerEvent};
use crate::layers::{self, LayerError, LayerIndex};
use crate::model::{Drawing, DrawingId, DrawingPatch, ElementPatch, NewElement};
use crate::selection::{MoveState, Selection};
use crate::snap::GridSettings;
use crate::store::ElementStore;
use crate::tools::{PointerDown, ToolKind, ToolManager, ToolOutcome};
use crate::viewport::Viewport;
use kurbo::Point;
use std::collections::VecDeque;

/// Screen padding kept around content by [`Action::FitToContent`].
const FIT_PADDING: f64 = 50.0;

/// A user intent.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Pointer input in screen coordinates.
    Pointer(PointerEvent),
    Key { key: Key, modifiers: Modifiers },
    SetTool(ToolKind),
    /// Drop the draft in progress.
    Cancel,
    /// Commit the draft in progress.
    FinishDraft,
    Undo,
    Redo,
    Select { ids: Vec<ElementId>, additive: bool },
    SelectAll,
    ClearSelection,
    DeleteSelected,
    DeleteElement(ElementId),
    /// Replace an element's properties, e.g. from a properties panel.
    UpdateElement(Element),
    Pan { dx: f64, dy: f64 },
    /// Wheel zoom by `delta` notches around a screen point.
    Zoom { delta: f64, pivot: Point },
    ZoomIn,
    ZoomOut,
    ResetView,
    FitToContent,
    Resize { width: f64, height: f64 },
    ToggleSnap,
    SetGrid(GridSettings),
    RenameLayer { from: String, to: String },
    DeleteLayer(String),
    ToggleLayerVisibility(String),
    ToggleLayerLock(String),
    MoveToLayer { ids: Vec<ElementId>, layer: String },
    /// Persist viewport and grid settings.
    Save,
}

/// A pending backend write.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Create {
        placeholder: ElementId,
        element: NewElement,
    },
    Update {
        id: ElementId,
        patch: ElementPatch,
        previous: Element,
    },
    Delete {
        id: ElementId,
        /// Position in the store before removal.
        index: usize,
        previous: Element,
    },
    Replace {
        elements: Vec<Element>,
        previous: Vec<Element>,
    },
    UpdateDrawing {
        patch: DrawingPatch,
    },
}

impl Command {
    fn rename(&mut self, old: &ElementId, new: &ElementId) {
        let follow = |id: &mut ElementId| {
            if *id == *old {
                *id = new.clone();
            }
        };
        match self {
            Command::Update { id, previous, .. } | Command::Delete { id, previous, .. } => {
                follow(id);
                follow(&mut previous.id);
            }
            Command::Replace { elements, previous } => {
                for element in elements.iter_mut().chain(previous.iter_mut()) {
                    follow(&mut element.id);
                }
            }
            Command::Create { .. } | Command::UpdateDrawing { .. } => {}
        }
    }

    /// Whether this command writes to a single element with the given id.
    fn targets(&self, target: &ElementId) -> bool {
        match self {
            Command::Update { id, .. } | Command::Delete { id, .. } => id == target,
            Command::Create { placeholder, .. } => placeholder == target,
            Command::Replace { .. } | Command::UpdateDrawing { .. } => false,
        }
    }
}

/// Successful backend response to a [`Command`].
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutput {
    Created(Element),
    Updated(Element),
    Deleted,
    Replaced(Vec<Element>),
    DrawingUpdated(Drawing),
}

/// Run a command against a backend.
pub async fn execute(backend: &dyn Backend, drawing: &DrawingId, command: &Command) -> BackendResult<CommandOutput> {
    match command {
        Command::Create { element, .. } => backend
            .create_element(drawing, element.clone())
            .await
            .map(CommandOutput::Created),
        Command::Update { id, patch, .. } => backend
            .update_element(id, patch.clone())
            .await
            .map(CommandOutput::Updated),
        Command::Delete { id, .. } => backend.delete_element(id).await.map(|_| CommandOutput::Deleted),
        Command::Replace { elements, .. } => backend
            .replace_elements(drawing, elements.clone())
            .await
            .map(CommandOutput::Replaced),
        Command::UpdateDrawing { patch } => backend
            .update_drawing(drawing, patch.clone())
            .await
            .map(CommandOutput::DrawingUpdated),
    }
}

#[derive(Debug, Clone)]
enum Drag {
    Move(MoveState),
    Pan { last: Point },
}

/// State of one open drawing.
#[derive(Debug)]
pub struct EditorSession {
    drawing: Drawing,
    config: EditorConfig,
    store: ElementStore,
    selection: Selection,
    tools: ToolManager,
    viewport: Viewport,
    grid: GridSettings,
    history: History,
    layers: LayerIndex,
    drag: Option<Drag>,
    commands: VecDeque<Command>,
    notifications: Vec<Notification>,
    read_only: bool,
}

impl EditorSession {
    /// Open a drawing with its already-fetched elements.
    pub fn open(drawing: Drawing, elements: Vec<Element>, config: EditorConfig) -> Self {
        let elements: Vec<Element> = elements
            .into_iter()
            .filter(|e| {
                let drawable = e.geometry.distinct_points() > 0;
                if !drawable {
                    log::warn!("Skipping element {} without points", e.id);
                }
                drawable
            })
            .collect();

        let store = ElementStore::from_elements(elements);
        let mut viewport = config.viewport();
        viewport.apply_view_box(drawing.view_box, drawing.scale);
        let history = History::with_initial(store.snapshot(), config.history_limit);
        let layers = LayerIndex::build(store.elements());

        log::info!("Opened drawing {} with {} elements", drawing.id, store.len());

        Self {
            grid: drawing.grid_settings,
            drawing,
            config,
            store,
            selection: Selection::new(),
            tools: ToolManager::new(),
            viewport,
            history,
            layers,
            drag: None,
            commands: VecDeque::new(),
            notifications: Vec::new(),
            read_only: false,
        }
    }

    /// Fetch a drawing and its elements and open them.
    pub async fn load(backend: &dyn Backend, id: &DrawingId, config: EditorConfig) -> EditorResult<Self> {
        let drawing = backend.fetch_drawing(id).await?;
        let elements = backend.fetch_elements(id).await?;
        Ok(Self::open(drawing, elements, config))
    }

    pub fn drawing(&self) -> &Drawing {
        &self.drawing
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn store(&self) -> &ElementStore {
        &self.store
    }

    pub fn elements(&self) -> &[Element] {
        self.store.elements()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn tool(&self) -> ToolKind {
        self.tools.current_tool
    }

    /// The element under construction, for preview.
    pub fn draft(&self) -> Option<&Element> {
        self.tools.draft()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn grid(&self) -> &GridSettings {
        &self.grid
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn layers(&self) -> &LayerIndex {
        &self.layers
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Commands not yet sent.
    pub fn pending_commands(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }

    /// Take the oldest queued command, for hosts that run their own transport.
    ///
    /// Feed its result back through [`EditorSession::complete`] before taking
    /// the next one: an acknowledged create renames its placeholder in the
    /// commands still queued, not in commands already handed out.
    pub fn next_command(&mut self) -> Option<Command> {
        self.commands.pop_front()
    }

    /// Drain user notifications.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Send every queued command to `backend`, one at a time, reconciling
    /// each result before the next is sent. Returns the number sent.
    pub async fn sync(&mut self, backend: &dyn Backend) -> usize {
        let mut sent = 0;
        while let Some(command) = self.next_command() {
            let result = execute(backend, &self.drawing.id, &command).await;
            self.complete(command, result);
            sent += 1;
        }
        sent
    }

    /// Apply an intent.
    pub fn dispatch(&mut self, action: Action) {
        log::trace!("Dispatch {:?}", action);
        match action {
            Action::Pointer(event) => self.pointer(event),
            Action::Key { key, modifiers } => self.key(key, modifiers),
            Action::SetTool(tool) => self.set_tool(tool),
            Action::Cancel => self.cancel(),
            Action::FinishDraft => self.finish_draft(),
            Action::Undo => self.undo(),
            Action::Redo => self.redo(),
            Action::Select { ids, additive } => {
                let known: Vec<ElementId> = ids.into_iter().filter(|id| self.store.contains(id)).collect();
                self.selection.select(known, additive);
            }
            Action::SelectAll => self.selection.select_all(&self.store),
            Action::ClearSelection => self.selection.clear(),
            Action::DeleteSelected => {
                let ids = self.selection.ids().to_vec();
                self.delete_elements(ids);
            }
            Action::DeleteElement(id) => self.delete_elements(vec![id]),
            Action::UpdateElement(element) => self.update_elements(vec![element]),
            Action::Pan { dx, dy } => self.viewport.pan(dx, dy),
            Action::Zoom { delta, pivot } => self.viewport.zoom(delta, pivot),
            Action::ZoomIn => self.viewport.zoom_in(),
            Action::ZoomOut => self.viewport.zoom_out(),
            Action::ResetView => self.viewport.reset(),
            Action::FitToContent => {
                if let Some(bounds) = self.store.bounds() {
                    self.viewport.fit_to_bounds(bounds, FIT_PADDING);
                }
            }
            Action::Resize { width, height } => self.viewport.resize(width, height),
            Action::ToggleSnap => self.grid.toggle_snap(),
            Action::SetGrid(grid) => self.grid = grid,
            Action::RenameLayer { from, to } => self.layer_op(|elements| layers::rename_layer(elements, &from, &to)),
            Action::DeleteLayer(name) => self.layer_op(|elements| layers::delete_layer(elements, &name)),
            Action::ToggleLayerVisibility(name) => self.layer_op(|elements| layers::toggle_visibility(elements, &name)),
            Action::ToggleLayerLock(name) => self.layer_op(|elements| layers::toggle_lock(elements, &name)),
            Action::MoveToLayer { ids, layer } => self.layer_op(|elements| layers::move_to_layer(elements, &ids, &layer)),
            Action::Save => self.save(),
        }
    }

    /// Reconcile the result of a command taken from the queue.
    pub fn complete(&mut self, command: Command, result: BackendResult<CommandOutput>) {
        match result {
            Ok(output) => self.acknowledge(command, output),
            Err(error) => self.revert(command, error.into()),
        }
    }

    fn acknowledge(&mut self, command: Command, output: CommandOutput) {
        match (command, output) {
            (Command::Create { placeholder, .. }, CommandOutput::Created(element)) => {
                log::debug!("Element {} saved as {}", placeholder, element.id);
                self.rename(&placeholder, &element.id);
            }
            (Command::Replace { elements, .. }, CommandOutput::Replaced(saved)) => {
                for (sent, saved) in elements.iter().zip(&saved) {
                    if sent.id != saved.id {
                        self.rename(&sent.id, &saved.id);
                    }
                }
            }
            (Command::UpdateDrawing { .. }, CommandOutput::DrawingUpdated(drawing)) => {
                log::info!("Saved settings of drawing {}", drawing.id);
                self.drawing = drawing;
            }
            (Command::Update { id, .. }, CommandOutput::Updated(_)) => log::debug!("Element {} updated", id),
            (Command::Delete { id, .. }, CommandOutput::Deleted) => log::debug!("Element {} deleted", id),
            (command, output) => log::warn!("Unexpected result {:?} for {:?}", output, command),
        }
    }

    fn revert(&mut self, command: Command, error: EditorError) {
        log::warn!("Persistence failed, reverting: {}", error);

        if error == EditorError::Unauthorized && !self.read_only {
            self.read_only = true;
            self.tools.set_tool(ToolKind::Select);
            self.finish_move();
            self.notifications.push(Notification::warning("Drawing is read-only"));
        }

        let not_found = matches!(error, EditorError::NotFound(_));
        let mut notify = true;
        match command {
            Command::Create { placeholder, .. } => {
                self.store.remove(&placeholder);
                self.commands.retain(|c| !c.targets(&placeholder));
            }
            Command::Update { id, previous, .. } => {
                if not_found {
                    self.store.remove(&id);
                    self.commands.retain(|c| !c.targets(&id));
                } else {
                    // Later updates were diffed against the rejected state.
                    self.store.update(previous);
                    self.commands
                        .retain(|c| !matches!(c, Command::Update { id: target, .. } if *target == id));
                }
            }
            Command::Delete { index, previous, .. } => {
                // Gone remotely is what was asked for.
                if not_found {
                    notify = false;
                } else {
                    self.store.insert_at(index, previous);
                }
            }
            Command::Replace { previous, .. } => {
                self.store.replace_all(previous);
            }
            Command::UpdateDrawing { .. } => {}
        }

        self.after_store_change();
        if notify {
            self.notifications.push(Notification::from(&error));
        }
    }

    /// Follow an id reassignment everywhere it can appear.
    fn rename(&mut self, old: &ElementId, new: &ElementId) {
        self.store.rename(old, new);
        self.selection.rename(old, new);
        self.history.rename(old, new);
        for command in &mut self.commands {
            command.rename(old, new);
        }
        if let Some(Drag::Move(state)) = &mut self.drag {
            for element in &mut state.original_elements {
                if element.id == *old {
                    element.id = new.clone();
                }
            }
        }
        self.layers = LayerIndex::build(self.store.elements());
    }

    fn after_store_change(&mut self) {
        self.selection.retain_known(&self.store);
        self.layers = LayerIndex::build(self.store.elements());
        self.history.record(self.store.snapshot());
    }

    fn editable(&self) -> bool {
        if self.read_only {
            log::debug!("Ignoring edit of read-only drawing {}", self.drawing.id);
        }
        !self.read_only
    }

    /// Hit-test tolerance in world units.
    fn hit_tolerance(&self) -> f64 {
        self.config.hit_tolerance / self.viewport.scale
    }

    fn pointer(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Down {
                position,
                button: MouseButton::Middle,
                ..
            } => {
                self.finish_move();
                self.drag = Some(Drag::Pan { last: position });
            }
            PointerEvent::Down {
                position,
                button: MouseButton::Left,
                modifiers,
                click_count,
            } => self.primary_down(position, modifiers, click_count),
            PointerEvent::Down { .. } => {}
            PointerEvent::Move { position } => self.pointer_move(position),
            PointerEvent::Up {
                button: MouseButton::Middle,
                ..
            } => {
                if matches!(self.drag, Some(Drag::Pan { .. })) {
                    self.drag = None;
                }
            }
            PointerEvent::Up {
                position,
                button: MouseButton::Left,
            } => {
                if matches!(self.drag, Some(Drag::Move(_))) {
                    self.pointer_move(position);
                    self.finish_move();
                }
            }
            PointerEvent::Up { .. } => {}
            PointerEvent::Scroll { position, delta } => self.viewport.zoom(delta.y, position),
        }
    }

    fn primary_down(&mut self, position: Point, modifiers: Modifiers, click_count: u8) {
        if self.tools.current_tool != ToolKind::Select && !self.editable() {
            return;
        }

        let world = self.viewport.screen_to_world(position);
        let event = PointerDown {
            position: world,
            modifiers,
            click_count,
            hit: self.store.hit(world, self.hit_tolerance()),
        };

        match self.tools.pointer_down(event, &self.grid, &self.store) {
            ToolOutcome::ClearSelection => self.selection.clear(),
            ToolOutcome::Select { id, additive } => {
                self.selection.select([id.clone()], additive);
                if self.selection.contains(&id) {
                    self.begin_move(world);
                }
            }
            ToolOutcome::Commit(element) => self.create(element),
            ToolOutcome::Nothing
            | ToolOutcome::DraftStarted
            | ToolOutcome::DraftExtended
            | ToolOutcome::Discarded => {}
        }
    }

    fn pointer_move(&mut self, position: Point) {
        let world = self.viewport.screen_to_world(position);
        match &mut self.drag {
            Some(Drag::Pan { last }) => {
                let delta = position - *last;
                *last = position;
                self.viewport.pan(delta.x, delta.y);
            }
            Some(Drag::Move(state)) => {
                state.current_point = world;
                for element in state.moved_elements(&self.grid) {
                    self.store.update(element);
                }
            }
            None => {
                self.tools.pointer_move(world, &self.grid);
            }
        }
    }

    /// Start dragging the selected, unlocked elements.
    fn begin_move(&mut self, world: Point) {
        if self.read_only {
            return;
        }
        // A press without a release in between still settles the old drag.
        self.finish_move();
        let originals: Vec<Element> = self
            .selection
            .iter()
            .filter_map(|id| self.store.get(id))
            .filter(|e| !e.is_locked())
            .cloned()
            .collect();
        if originals.is_empty() {
            return;
        }
        self.history.begin_gesture();
        self.drag = Some(Drag::Move(MoveState::new(world, originals)));
    }

    /// Settle an in-progress move: queue one update per moved element and
    /// record the whole drag as a single history entry.
    fn finish_move(&mut self) {
        let state = match self.drag.take() {
            Some(Drag::Move(state)) => state,
            other => {
                self.drag = other;
                return;
            }
        };

        for before in &state.original_elements {
            let Some(after) = self.store.get(&before.id) else {
                continue;
            };
            if after != before {
                self.commands.push_back(Command::Update {
                    id: after.id.clone(),
                    patch: ElementPatch::diff(before, after),
                    previous: before.clone(),
                });
            }
        }
        self.history.end_gesture(self.store.snapshot());
    }

    /// Abandon an in-progress move, putting the elements back.
    fn cancel_move(&mut self) -> bool {
        match self.drag.take() {
            Some(Drag::Move(state)) => {
                for element in state.original_elements {
                    self.store.update(element);
                }
                self.history.abort_gesture();
                true
            }
            other => {
                self.drag = other;
                false
            }
        }
    }

    fn key(&mut self, key: Key, modifiers: Modifiers) {
        match key {
            Key::Escape => self.cancel(),
            Key::Enter => self.finish_draft(),
            Key::Delete | Key::Backspace => {
                let ids = self.selection.ids().to_vec();
                self.delete_elements(ids);
            }
            Key::Character(c) if modifiers.command() => match c.to_ascii_lowercase() {
                'z' if modifiers.shift => self.redo(),
                'z' => self.undo(),
                'y' => self.redo(),
                'a' => self.selection.select_all(&self.store),
                's' => self.save(),
                _ => {}
            },
            Key::Character(_) => {}
        }
    }

    fn set_tool(&mut self, tool: ToolKind) {
        if tool != ToolKind::Select && !self.editable() {
            return;
        }
        self.finish_move();
        self.tools.set_tool(tool);
    }

    /// Escape: drop the draft, else abandon a drag, else clear the selection.
    fn cancel(&mut self) {
        if self.tools.cancel().is_none() && !self.cancel_move() {
            self.selection.clear();
        }
    }

    fn finish_draft(&mut self) {
        if let ToolOutcome::Commit(element) = self.tools.finish() {
            self.create(element);
        }
    }

    fn create(&mut self, element: Element) {
        if !self.editable() {
            return;
        }
        log::debug!("Creating {} {}", element.kind(), element.id);
        self.commands.push_back(Command::Create {
            placeholder: element.id.clone(),
            element: NewElement::from(&element),
        });
        self.store.insert(element);
        self.after_store_change();
    }

    fn update_elements(&mut self, updated: Vec<Element>) {
        if updated.is_empty() || !self.editable() {
            return;
        }
        self.finish_move();
        for element in updated {
            let Some(previous) = self.store.update(element.clone()) else {
                log::warn!("Ignoring update of unknown element {}", element.id);
                continue;
            };
            if previous != element {
                self.commands.push_back(Command::Update {
                    id: element.id.clone(),
                    patch: ElementPatch::diff(&previous, &element),
                    previous,
                });
            }
        }
        self.after_store_change();
    }

    fn delete_elements(&mut self, ids: Vec<ElementId>) {
        if ids.is_empty() || !self.editable() {
            return;
        }
        self.finish_move();
        for id in ids {
            if let Some((index, previous)) = self.store.remove(&id) {
                self.commands.push_back(Command::Delete { id, index, previous });
            }
        }
        self.after_store_change();
    }

    fn layer_op<F>(&mut self, op: F)
    where
        F: FnOnce(&[Element]) -> Result<Vec<Element>, LayerError>,
    {
        if !self.editable() {
            return;
        }
        match op(self.store.elements()) {
            Ok(updated) => self.update_elements(updated),
            Err(e) => {
                log::debug!("Layer operation rejected: {}", e);
                self.notifications.push(Notification::from(&EditorError::from(e)));
            }
        }
    }

    fn undo(&mut self) {
        if !self.editable() {
            return;
        }
        self.finish_move();
        if let Some(snapshot) = self.history.undo().cloned() {
            self.restore(snapshot);
        }
    }

    fn redo(&mut self) {
        if !self.editable() {
            return;
        }
        self.finish_move();
        if let Some(snapshot) = self.history.redo().cloned() {
            self.restore(snapshot);
        }
    }

    /// Show a history snapshot and persist it as a batch replace.
    fn restore(&mut self, snapshot: Vec<Element>) {
        let previous = self.store.replace_all(snapshot.clone());
        self.commands.push_back(Command::Replace {
            elements: snapshot,
            previous,
        });
        self.selection.retain_known(&self.store);
        self.layers = LayerIndex::build(self.store.elements());
    }

    fn save(&mut self) {
        if !self.editable() {
            return;
        }
        self.commands.push_back(Command::UpdateDrawing {
            patch: DrawingPatch {
                view_box: Some(self.viewport.view_box()),
                scale: Some(self.viewport.scale),
                grid_settings: Some(self.grid),
                ..DrawingPatch::default()
            },
        });
    }
}
