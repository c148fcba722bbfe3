//! Editor state: the layer collection under history plus view state.

use crate::actions::{AlignPosition, EditorAction};
use crate::background::BackgroundFit;
use crate::camera::Camera;
use crate::config::EditorConfig;
use crate::history::History;
use crate::layers::{Layer, LayerId, LayerPatch, ShapeType};
use crate::project::{ProjectError, ProjectFile};
use crate::tools::{StrokeStyle, ToolKind};
use kurbo::{Size, Vec2};

/// Application state of one open design.
///
/// Only the layer collection is undo-tracked. Selection, background, zoom,
/// tool and drawing color are view state.
#[derive(Debug, Clone)]
pub struct Editor {
    history: History<Vec<Layer>>,
    selected: Option<LayerId>,
    background_image: Option<String>,
    background_fit: BackgroundFit,
    camera: Camera,
    tool: ToolKind,
    drawing_color: String,
    config: EditorConfig,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl Editor {
    pub fn new(config: EditorConfig) -> Self {
        let mut history = History::new(Vec::new());
        if let Some(limit) = config.history_limit {
            history = history.with_limit(limit);
        }
        Self {
            history,
            selected: None,
            background_image: None,
            background_fit: BackgroundFit::default(),
            camera: Camera::with_limits(config.zoom_step, config.min_zoom, config.max_zoom),
            tool: ToolKind::default(),
            drawing_color: config.drawing_color.clone(),
            config,
        }
    }

    // --- Accessors ---

    /// Layers in paint order, back to front.
    pub fn layers(&self) -> &[Layer] {
        self.history.present()
    }

    pub fn layer(&self, id: &LayerId) -> Option<&Layer> {
        self.layers().iter().find(|l| l.id() == id)
    }

    pub fn selected_id(&self) -> Option<&LayerId> {
        self.selected.as_ref()
    }

    pub fn selected_layer(&self) -> Option<&Layer> {
        self.selected.as_ref().and_then(|id| self.layer(id))
    }

    pub fn background_image(&self) -> Option<&str> {
        self.background_image.as_deref()
    }

    pub fn background_fit(&self) -> BackgroundFit {
        self.background_fit
    }

    pub fn zoom(&self) -> f64 {
        self.camera.zoom
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn tool(&self) -> ToolKind {
        self.tool
    }

    pub fn drawing_color(&self) -> &str {
        &self.drawing_color
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn canvas_size(&self) -> Size {
        self.config.canvas_size()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn contains(&self, id: &LayerId) -> bool {
        self.layer(id).is_some()
    }

    fn index_of(&self, id: &LayerId) -> Option<usize> {
        self.layers().iter().position(|l| l.id() == id)
    }

    // --- Layer collection ---

    /// Append a layer and select it.
    ///
    /// A layer whose id is already taken gets a fresh id.
    pub fn add_layer(&mut self, mut layer: Layer) -> LayerId {
        if self.contains(layer.id()) {
            let fresh = LayerId::generate();
            log::warn!("Layer id {} already in use, reassigned to {}", layer.id(), fresh);
            layer.id = fresh;
        }
        let id = layer.id().clone();
        log::debug!("Adding {} layer {}", layer.kind.type_name(), id);
        self.history.set_with(|layers| {
            let mut next = layers.clone();
            next.push(layer);
            next
        });
        self.selected = Some(id.clone());
        id
    }

    pub fn add_text(&mut self) -> LayerId {
        self.add_layer(Layer::new_text(LayerId::generate()))
    }

    pub fn add_shape(&mut self, shape_type: ShapeType) -> LayerId {
        self.add_layer(Layer::new_shape(LayerId::generate(), shape_type))
    }

    pub fn add_image(&mut self, url: impl Into<String>, width: f64, height: f64) -> LayerId {
        self.add_layer(Layer::new_image(LayerId::generate(), url, width, height))
    }

    /// Apply `f` to the layer with `id` as one history entry.
    fn modify_layer(&mut self, id: &LayerId, f: impl FnOnce(&mut Layer)) -> bool {
        let Some(index) = self.index_of(id) else {
            log::debug!("Ignoring edit of unknown layer {}", id);
            return false;
        };
        let mut next = self.layers().to_vec();
        f(&mut next[index]);
        if next[index] == self.layers()[index] && !self.history.has_pending_amend() {
            return false;
        }
        self.history.set(next);
        true
    }

    /// Merge a patch into a layer, creating one history entry.
    ///
    /// Pending text previews for the layer are folded into the same entry.
    pub fn update_layer(&mut self, id: &LayerId, patch: &LayerPatch) -> bool {
        if patch.is_empty() && !self.history.has_pending_amend() {
            return false;
        }
        self.modify_layer(id, |layer| layer.apply_patch(patch))
    }

    /// Merge a patch without creating a history entry.
    ///
    /// Used for per-keystroke text edits; the next committed edit records
    /// all previews as a single undo step.
    pub fn preview_layer(&mut self, id: &LayerId, patch: &LayerPatch) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let mut next = self.layers().to_vec();
        next[index].apply_patch(patch);
        self.history.amend(next);
        true
    }

    /// Remove a layer; clears the selection if it was selected.
    pub fn delete_layer(&mut self, id: &LayerId) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.history
            .set_with(|layers| layers.iter().filter(|l| l.id() != id).cloned().collect());
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
        }
        log::debug!("Deleted layer {}", id);
        true
    }

    /// Clone a layer under a new id, offset by the duplicate offset, and
    /// select the copy.
    pub fn duplicate_layer(&mut self, id: &LayerId) -> Option<LayerId> {
        let offset = Vec2::new(self.config.duplicate_offset, self.config.duplicate_offset);
        let copy = self.layer(id)?.duplicate_with(LayerId::generate(), offset);
        Some(self.add_layer(copy))
    }

    pub fn toggle_lock(&mut self, id: &LayerId) -> bool {
        self.modify_layer(id, |layer| layer.locked = !layer.locked)
    }

    pub fn toggle_hide(&mut self, id: &LayerId) -> bool {
        self.modify_layer(id, |layer| layer.hidden = !layer.hidden)
    }

    /// Rename a layer. A blank name restores the content-derived label.
    pub fn rename_layer(&mut self, id: &LayerId, name: &str) -> bool {
        let name = name.trim();
        let name = (!name.is_empty()).then(|| name.to_string());
        self.modify_layer(id, |layer| layer.name = name)
    }

    /// Move a layer one step towards the front.
    pub fn bring_forward(&mut self, id: &LayerId) -> bool {
        match self.index_of(id) {
            Some(pos) if pos + 1 < self.layers().len() => {
                self.history.set_with(|layers| {
                    let mut next = layers.clone();
                    next.swap(pos, pos + 1);
                    next
                });
                true
            }
            _ => false,
        }
    }

    /// Move a layer one step towards the back.
    pub fn send_backward(&mut self, id: &LayerId) -> bool {
        match self.index_of(id) {
            Some(pos) if pos > 0 => {
                self.history.set_with(|layers| {
                    let mut next = layers.clone();
                    next.swap(pos, pos - 1);
                    next
                });
                true
            }
            _ => false,
        }
    }

    /// Move a layer of rendered `size` to an anchor of the canvas.
    pub fn align_layer(&mut self, id: &LayerId, position: AlignPosition, size: Size) -> bool {
        let target = position.resolve(size, self.canvas_size());
        self.modify_layer(id, |layer| layer.set_position(target))
    }

    // --- Selection ---

    /// Select a layer, or clear the selection with `None`.
    ///
    /// Unknown ids are rejected so the selection never goes stale.
    pub fn select_layer(&mut self, id: Option<LayerId>) -> bool {
        match id {
            Some(id) if !self.contains(&id) => {
                log::debug!("Ignoring selection of unknown layer {}", id);
                false
            }
            id => {
                let changed = self.selected != id;
                self.selected = id;
                changed
            }
        }
    }

    fn drop_stale_selection(&mut self) {
        if let Some(id) = &self.selected {
            if !self.contains(id) {
                self.selected = None;
            }
        }
    }

    // --- History ---

    pub fn undo(&mut self) -> bool {
        let undone = self.history.undo();
        self.drop_stale_selection();
        undone
    }

    pub fn redo(&mut self) -> bool {
        let redone = self.history.redo();
        self.drop_stale_selection();
        redone
    }

    /// Record pending text previews as one history entry.
    pub fn commit_pending(&mut self) {
        self.history.commit();
    }

    // --- View state ---

    pub fn zoom_in(&mut self) {
        self.camera.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.camera.zoom_out();
    }

    pub fn zoom_reset(&mut self) {
        self.camera.reset_zoom();
    }

    pub fn set_tool(&mut self, tool: ToolKind) {
        self.tool = tool;
    }

    pub fn set_drawing_color(&mut self, color: impl Into<String>) {
        self.drawing_color = color.into();
    }

    pub fn set_background(&mut self, url: Option<String>) {
        self.background_image = url.filter(|u| !u.is_empty());
    }

    pub fn set_background_fit(&mut self, fit: BackgroundFit) {
        self.background_fit = fit;
    }

    /// Brush for the active freehand tool, if any.
    pub fn stroke_style(&self) -> Option<StrokeStyle> {
        match self.tool {
            ToolKind::Draw => Some(StrokeStyle {
                color: self.drawing_color.clone(),
                width: self.config.brush_width,
            }),
            ToolKind::Eraser => Some(StrokeStyle {
                color: self.config.background_color.clone(),
                width: self.config.eraser_width,
            }),
            ToolKind::Select | ToolKind::Hand => None,
        }
    }

    // --- Projects ---

    /// Discard everything and start an empty design.
    pub fn new_project(&mut self) {
        self.load_project(ProjectFile::default());
        self.camera.reset();
        log::info!("Started new project");
    }

    /// Replace the current design with `project`. History starts fresh.
    pub fn load_project(&mut self, project: ProjectFile) {
        self.history.reset(project.layers);
        self.selected = None;
        self.background_image = project.background_image;
        self.background_fit = project.background_fit;
    }

    /// Parse and load a project file. On error the current design is left
    /// untouched.
    pub fn open_project(&mut self, json: &str) -> Result<(), ProjectError> {
        let project = ProjectFile::from_json(json).map_err(|e| {
            log::error!("Failed to open project: {}", e);
            e
        })?;
        log::info!("Opened project with {} layers", project.layers.len());
        self.load_project(project);
        Ok(())
    }

    /// Snapshot the saveable state.
    pub fn to_project(&self) -> ProjectFile {
        ProjectFile {
            layers: self.layers().to_vec(),
            background_image: self.background_image.clone(),
            background_fit: self.background_fit,
        }
    }

    // --- Dispatch ---

    /// Apply a panel action. Returns true if editor state changed.
    ///
    /// `Align` uses the layer's nominal size; callers that can measure the
    /// rendered object should use [`align_layer`](Self::align_layer).
    pub fn apply(&mut self, action: EditorAction) -> bool {
        match action {
            EditorAction::AddLayer { layer } => {
                self.add_layer(layer);
                true
            }
            EditorAction::AddText => {
                self.add_text();
                true
            }
            EditorAction::AddShape { shape_type } => {
                self.add_shape(shape_type);
                true
            }
            EditorAction::AddImage { url, width, height } => {
                self.add_image(url, width, height);
                true
            }
            EditorAction::SetTool { tool } => {
                let changed = self.tool != tool;
                self.set_tool(tool);
                changed
            }
            EditorAction::SetDrawingColor { color } => {
                self.set_drawing_color(color);
                true
            }
            EditorAction::SetBackground { url } => {
                self.set_background(url);
                true
            }
            EditorAction::SetBackgroundFit { fit } => {
                let changed = self.background_fit != fit;
                self.set_background_fit(fit);
                changed
            }
            EditorAction::NewProject => {
                self.new_project();
                true
            }
            EditorAction::SelectLayer { id } => self.select_layer(id),
            EditorAction::DeleteLayer { id } => self.delete_layer(&id),
            EditorAction::DuplicateLayer { id } => self.duplicate_layer(&id).is_some(),
            EditorAction::ToggleLock { id } => self.toggle_lock(&id),
            EditorAction::ToggleHide { id } => self.toggle_hide(&id),
            EditorAction::RenameLayer { id, name } => self.rename_layer(&id, &name),
            EditorAction::BringForward { id } => self.bring_forward(&id),
            EditorAction::SendBackward { id } => self.send_backward(&id),
            EditorAction::UpdateLayer { id, patch } => {
                // The properties form is only live while a layer is selected.
                if self.selected.is_none() {
                    log::debug!("Ignoring properties edit with no selection");
                    return false;
                }
                self.update_layer(&id, &patch)
            }
            EditorAction::Align { position } => {
                let Some(layer) = self.selected_layer() else {
                    return false;
                };
                let id = layer.id().clone();
                let size = layer.nominal_size().unwrap_or(Size::ZERO);
                self.align_layer(&id, position, size)
            }
            EditorAction::Undo => self.undo(),
            EditorAction::Redo => self.redo(),
            EditorAction::ZoomIn => {
                self.zoom_in();
                true
            }
            EditorAction::ZoomOut => {
                self.zoom_out();
                true
            }
            EditorAction::ZoomReset => {
                self.zoom_reset();
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::LayerKind;
    use kurbo::Point;

    #[test]
    fn test_add_selects() {
        let mut editor = Editor::default();
        let id = editor.add_text();
        assert_eq!(editor.selected_id(), Some(&id));
        assert_eq!(editor.layers().len(), 1);

        let layer = editor.selected_layer().unwrap();
        assert_eq!(layer.position(), Point::new(400.0, 300.0));
        assert!((layer.opacity - 1.0).abs() < f64::EPSILON);
        assert!((layer.as_text().unwrap().font_size - 48.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_add_reassigns_taken_id() {
        let mut editor = Editor::default();
        editor.add_layer(Layer::new_text(LayerId::new("same")));
        let second = editor.add_layer(Layer::new_text(LayerId::new("same")));
        assert_ne!(second.as_str(), "same");
        assert_eq!(editor.layers().len(), 2);
    }

    #[test]
    fn test_delete_clears_selection() {
        let mut editor = Editor::default();
        let a = editor.add_text();
        let b = editor.add_shape(ShapeType::Circle);
        assert!(editor.delete_layer(&a));
        assert_eq!(editor.selected_id(), Some(&b));
        assert!(editor.delete_layer(&b));
        assert!(editor.selected_id().is_none());
        assert!(!editor.delete_layer(&b));
    }

    #[test]
    fn test_duplicate() {
        let mut editor = Editor::default();
        let id = editor.add_shape(ShapeType::Rectangle);
        editor.update_layer(&id, &LayerPatch {
            rotation: Some(15.0),
            ..LayerPatch::default()
        });
        let copy_id = editor.duplicate_layer(&id).unwrap();
        assert_ne!(copy_id, id);
        assert_eq!(editor.selected_id(), Some(&copy_id));

        let original = editor.layer(&id).unwrap().clone();
        let mut copy = editor.layer(&copy_id).unwrap().clone();
        assert_eq!(copy.position(), original.position() + Vec2::new(20.0, 20.0));
        copy.id = original.id.clone();
        copy.set_position(original.position());
        assert_eq!(copy, original);
    }

    #[test]
    fn test_undo_clears_stale_selection() {
        let mut editor = Editor::default();
        let id = editor.add_text();
        assert!(editor.undo());
        assert!(editor.layers().is_empty());
        assert!(editor.selected_id().is_none());
        assert!(editor.redo());
        assert!(editor.contains(&id));
        assert!(!editor.select_layer(Some(LayerId::new("ghost"))));
    }

    #[test]
    fn test_text_previews_coalesce() {
        let mut editor = Editor::default();
        let id = editor.add_text();
        for text in ["H", "He", "Hel", "Hell"] {
            editor.preview_layer(&id, &LayerPatch::text(text));
        }
        assert_eq!(editor.layer(&id).unwrap().as_text().unwrap().text, "Hell");
        editor.update_layer(&id, &LayerPatch::text("Hello"));

        assert!(editor.undo());
        assert_eq!(
            editor.layer(&id).unwrap().as_text().unwrap().text,
            "Double click to edit"
        );
        assert!(editor.undo());
        assert!(editor.layers().is_empty());
    }

    #[test]
    fn test_typing_after_undo_blocks_redo() {
        let mut editor = Editor::default();
        let id = editor.add_text();
        editor.update_layer(
            &id,
            &LayerPatch {
                x: Some(10.0),
                ..LayerPatch::default()
            },
        );
        assert!(editor.undo());
        editor.preview_layer(&id, &LayerPatch::text("Hi"));

        assert!(!editor.can_redo());
        assert!(!editor.redo());
        let layer = editor.layer(&id).unwrap();
        assert_eq!(layer.as_text().unwrap().text, "Hi");
        assert!((layer.x - 400.0).abs() < f64::EPSILON);

        assert!(editor.undo());
        assert_eq!(
            editor.layer(&id).unwrap().as_text().unwrap().text,
            "Double click to edit"
        );
        assert!(editor.undo());
        assert!(editor.layers().is_empty());
    }

    #[test]
    fn test_lock_hide_rename() {
        let mut editor = Editor::default();
        let id = editor.add_text();
        assert!(editor.toggle_lock(&id));
        assert!(editor.toggle_hide(&id));
        assert!(editor.rename_layer(&id, "  Headline "));
        let layer = editor.layer(&id).unwrap();
        assert!(layer.locked && layer.hidden);
        assert_eq!(layer.display_name(), "Headline");

        editor.rename_layer(&id, "");
        assert_eq!(editor.layer(&id).unwrap().display_name(), "Double click to edit");
    }

    #[test]
    fn test_reorder() {
        let mut editor = Editor::default();
        let a = editor.add_text();
        let b = editor.add_text();
        assert!(!editor.bring_forward(&b));
        assert!(editor.bring_forward(&a));
        assert_eq!(editor.layers()[1].id(), &a);
        assert!(editor.send_backward(&a));
        assert_eq!(editor.layers()[0].id(), &a);
        assert!(!editor.send_backward(&a));
    }

    #[test]
    fn test_align_uses_canvas_bounds() {
        let mut editor = Editor::default();
        editor.add_shape(ShapeType::Rectangle);
        assert!(editor.apply(EditorAction::Align {
            position: AlignPosition::BottomRight
        }));
        let layer = editor.selected_layer().unwrap();
        assert_eq!(layer.position(), Point::new(1050.0, 700.0));
    }

    #[test]
    fn test_update_requires_selection() {
        let mut editor = Editor::default();
        let id = editor.add_text();
        editor.select_layer(None);
        let patch = LayerPatch {
            opacity: Some(0.5),
            ..LayerPatch::default()
        };
        assert!(!editor.apply(EditorAction::UpdateLayer {
            id: id.clone(),
            patch: patch.clone()
        }));
        editor.select_layer(Some(id.clone()));
        assert!(editor.apply(EditorAction::UpdateLayer { id: id.clone(), patch }));
        assert!((editor.layer(&id).unwrap().opacity - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_view_state_not_in_history() {
        let mut editor = Editor::default();
        editor.add_text();
        editor.set_background(Some("data:image/png;base64,AA".to_string()));
        editor.zoom_in();
        editor.set_tool(ToolKind::Hand);
        editor.undo();
        assert!(editor.background_image().is_some());
        assert!((editor.zoom() - 1.2).abs() < 1e-9);
        assert_eq!(editor.tool(), ToolKind::Hand);
    }

    #[test]
    fn test_stroke_style_per_tool() {
        let mut editor = Editor::default();
        assert!(editor.stroke_style().is_none());
        editor.set_tool(ToolKind::Draw);
        editor.set_drawing_color("#ff00ff");
        assert_eq!(
            editor.stroke_style(),
            Some(StrokeStyle {
                color: "#ff00ff".to_string(),
                width: 3.0
            })
        );
        editor.set_tool(ToolKind::Eraser);
        assert_eq!(
            editor.stroke_style(),
            Some(StrokeStyle {
                color: "#1a1a24".to_string(),
                width: 20.0
            })
        );
    }

    #[test]
    fn test_open_project_failure_keeps_state() {
        let mut editor = Editor::default();
        let id = editor.add_text();
        assert!(editor.open_project("{ broken").is_err());
        assert!(editor.contains(&id));
        assert_eq!(editor.selected_id(), Some(&id));

        let json = editor.to_project().to_json().unwrap();
        editor.new_project();
        assert!(editor.layers().is_empty());
        editor.open_project(&json).unwrap();
        assert_eq!(editor.layers().len(), 1);
        assert!(matches!(editor.layers()[0].kind, LayerKind::Text(_)));
        assert!(!editor.can_undo());
    }
}
