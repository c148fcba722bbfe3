//! Editing session: routes panel actions and surface events through the
//! editor into the canvas synchronizer.

use kurbo::Size;
use proedit_core::{
    AlignPosition, Editor, EditorAction, EditorConfig, ProjectError, ProjectFile, Rgba, Storage,
    StorageError, parse_color,
};
use proedit_render::{
    ExportError, ExportFormat, ExportOutcome, ImageLoader, Surface, SyncAction, Synchronizer, export,
};

/// One open design bound to (at most) one rendering surface.
pub struct Session<S: Surface> {
    editor: Editor,
    sync: Synchronizer,
    surface: Option<S>,
    loader: Box<dyn ImageLoader>,
}

impl<S: Surface> Session<S> {
    /// Create a session with no surface attached yet.
    pub fn new(config: EditorConfig, loader: Box<dyn ImageLoader>) -> Self {
        Self {
            editor: Editor::new(config),
            sync: Synchronizer::new(),
            surface: None,
            loader,
        }
    }

    /// Create a session and attach `surface` immediately.
    pub fn with_surface(config: EditorConfig, loader: Box<dyn ImageLoader>, surface: S) -> Self {
        let mut session = Self::new(config, loader);
        session.attach(surface);
        session
    }

    /// Mount the surface and paint the current state onto it.
    pub fn attach(&mut self, surface: S) {
        self.surface = Some(surface);
        self.refresh();
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    pub fn surface_mut(&mut self) -> Option<&mut S> {
        self.surface.as_mut()
    }

    pub fn sync(&self) -> &Synchronizer {
        &self.sync
    }

    /// Apply a panel action and repaint. Returns true if state changed.
    pub fn dispatch(&mut self, action: EditorAction) -> bool {
        log::debug!("Dispatching {:?}", action);
        let changed = match action {
            EditorAction::Align { position } => self.align_selected(position),
            action => self.editor.apply(action),
        };
        self.refresh();
        changed
    }

    /// Align the selection using its rendered size when the surface can
    /// measure it.
    fn align_selected(&mut self, position: AlignPosition) -> bool {
        let Some(layer) = self.editor.selected_layer() else {
            return false;
        };
        let id = layer.id().clone();
        let size = self
            .surface
            .as_ref()
            .and_then(|surface| self.sync.measure(surface, &id))
            .or_else(|| layer.nominal_size())
            .unwrap_or(Size::ZERO);
        self.editor.align_layer(&id, position, size)
    }

    /// Push editor state onto the surface.
    pub fn refresh(&mut self) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        let editor = &self.editor;
        let config = editor.config();
        let fallback = parse_color(&config.background_color).unwrap_or_else(|e| {
            log::warn!("Invalid background color in config: {}", e);
            Rgba::black()
        });

        self.sync.set_tool(surface, editor.tool(), editor.stroke_style());
        self.sync.set_zoom(surface, editor.zoom());
        self.sync.set_background(
            surface,
            &mut *self.loader,
            editor.background_image(),
            editor.background_fit(),
            editor.canvas_size(),
            fallback,
        );
        self.sync
            .reconcile(surface, &mut *self.loader, editor.layers(), editor.selected_id());
    }

    /// Process pending surface events and finished image loads.
    ///
    /// Returns the number of editor actions applied.
    pub fn pump(&mut self) -> usize {
        let mut actions = Vec::new();
        if let Some(surface) = self.surface.as_mut() {
            for event in surface.drain_events() {
                actions.extend(self.sync.handle_event(surface, event));
            }
        }
        let mut applied = 0;
        for action in actions {
            if self.apply_sync_action(action) {
                applied += 1;
            }
        }
        if let Some(surface) = self.surface.as_mut() {
            for completion in self.loader.poll() {
                self.sync.handle_completion(surface, completion);
            }
        }
        self.refresh();
        applied
    }

    fn apply_sync_action(&mut self, action: SyncAction) -> bool {
        match action {
            SyncAction::Select(id) => self.editor.select_layer(id),
            SyncAction::Update { id, patch, commit: true } => self.editor.update_layer(&id, &patch),
            SyncAction::Update { id, patch, commit: false } => self.editor.preview_layer(&id, &patch),
            SyncAction::AddLayer(layer) => {
                self.editor.add_layer(layer);
                true
            }
        }
    }

    /// Run `pump` until no loads are outstanding, up to `max_rounds`.
    pub fn settle(&mut self, max_rounds: usize) {
        for _ in 0..max_rounds {
            if self.loader.pending() == 0 {
                break;
            }
            self.pump();
        }
    }

    /// Encode the canvas. Without a surface this is a logged no-op.
    pub fn export(&self, format: ExportFormat) -> Result<ExportOutcome, ExportError> {
        export(self.surface.as_ref().map(|s| s as &dyn Surface), format)
    }

    // --- Projects ---

    pub fn save(&self, storage: &dyn Storage, id: &str) -> Result<(), StorageError> {
        storage.save(id, &self.editor.to_project())?;
        log::info!("Saved project {}", id);
        Ok(())
    }

    pub fn open(&mut self, storage: &dyn Storage, id: &str) -> Result<(), StorageError> {
        self.load_project(storage.load(id)?);
        log::info!("Opened project {}", id);
        Ok(())
    }

    /// Replace the design with an already parsed project.
    pub fn load_project(&mut self, project: ProjectFile) {
        self.editor.load_project(project);
        self.refresh();
    }

    /// Open project JSON. Malformed input leaves the session untouched.
    pub fn open_json(&mut self, json: &str) -> Result<(), ProjectError> {
        self.editor.open_project(json)?;
        self.refresh();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;
    use proedit_core::{LayerId, LayerPatch, MemoryStorage, ShapeType, ToolKind};
    use proedit_render::{DataUrlLoader, ObjectKind, RetainedSurface};

    fn new_session() -> Session<RetainedSurface> {
        Session::with_surface(
            EditorConfig::default(),
            Box::new(DataUrlLoader::new()),
            RetainedSurface::new(Size::new(1200.0, 800.0)),
        )
    }

    fn surface(session: &mut Session<RetainedSurface>) -> &mut RetainedSurface {
        session.surface_mut().unwrap()
    }

    fn selected(session: &Session<RetainedSurface>) -> LayerId {
        session.editor().selected_id().unwrap().clone()
    }

    #[test]
    fn test_add_layers_reach_surface() {
        let mut session = new_session();
        session.dispatch(EditorAction::AddText);
        session.dispatch(EditorAction::AddShape {
            shape_type: ShapeType::Circle,
        });
        assert_eq!(surface(&mut session).object_count(), 2);

        let active = surface(&mut session).active_object();
        let id = selected(&session);
        let object = session.sync().object(session.surface().unwrap(), &id).unwrap();
        assert!(matches!(object.kind, ObjectKind::Circle { radius } if (radius - 50.0).abs() < 1e-9));
        assert!(active.is_some());

        session.refresh();
        assert_eq!(surface(&mut session).churn(), (2, 0));
    }

    #[test]
    fn test_delete_clears_object_and_selection() {
        let mut session = new_session();
        session.dispatch(EditorAction::AddText);
        let id = selected(&session);
        session.dispatch(EditorAction::DeleteLayer { id: id.clone() });

        assert_eq!(surface(&mut session).object_count(), 0);
        assert!(session.editor().selected_id().is_none());
        assert!(session.sync().object(session.surface().unwrap(), &id).is_none());
        assert_eq!(surface(&mut session).active_object(), None);
    }

    #[test]
    fn test_duplicate_selects_copy() {
        let mut session = new_session();
        session.dispatch(EditorAction::AddShape {
            shape_type: ShapeType::Rectangle,
        });
        let original = selected(&session);
        session.dispatch(EditorAction::DuplicateLayer { id: original.clone() });
        let copy = selected(&session);

        assert_ne!(copy, original);
        let object = session.sync().object(session.surface().unwrap(), &copy).unwrap();
        assert_eq!((object.left, object.top), (420.0, 320.0));
        assert_eq!(surface(&mut session).object_count(), 2);
    }

    #[test]
    fn test_click_selects_layer() {
        let mut session = new_session();
        session.dispatch(EditorAction::AddShape {
            shape_type: ShapeType::Rectangle,
        });
        session.dispatch(EditorAction::SelectLayer { id: None });

        surface(&mut session).pointer_down(Point::new(450.0, 350.0));
        surface(&mut session).pointer_up(Point::new(450.0, 350.0));
        assert_eq!(session.pump(), 1);
        assert!(session.editor().selected_id().is_some());
    }

    #[test]
    fn test_drag_moves_layer_with_undo() {
        let mut session = new_session();
        session.dispatch(EditorAction::AddShape {
            shape_type: ShapeType::Rectangle,
        });
        let id = selected(&session);

        surface(&mut session).drag(Point::new(450.0, 350.0), &[Point::new(500.0, 400.0)]);
        session.pump();
        assert_eq!(session.editor().layer(&id).unwrap().position(), Point::new(450.0, 350.0));

        session.dispatch(EditorAction::Undo);
        assert_eq!(session.editor().layer(&id).unwrap().position(), Point::new(400.0, 300.0));
        let object = session.sync().object(session.surface().unwrap(), &id).unwrap();
        assert_eq!((object.left, object.top), (400.0, 300.0));
    }

    #[test]
    fn test_text_resize_normalizes_font_size() {
        let mut session = new_session();
        session.dispatch(EditorAction::AddText);
        let id = selected(&session);

        let handle = surface(&mut session).active_object().unwrap();
        assert!(surface(&mut session).scale_object(handle, 2.0, 2.0));
        session.pump();

        let layer = session.editor().layer(&id).unwrap();
        assert!((layer.as_text().unwrap().font_size - 96.0).abs() < f64::EPSILON);
        assert!((layer.scale_x - 1.0).abs() < f64::EPSILON);
        let object = surface(&mut session).object(handle).unwrap().clone();
        assert_eq!((object.scale_x, object.scale_y), (1.0, 1.0));
        match object.kind {
            ObjectKind::Text(content) => assert!((content.font_size - 96.0).abs() < f64::EPSILON),
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn test_text_scale_from_panel_does_not_compound() {
        let mut session = new_session();
        session.dispatch(EditorAction::AddText);
        let id = selected(&session);
        session.dispatch(EditorAction::UpdateLayer {
            id: id.clone(),
            patch: LayerPatch {
                scale_x: Some(2.0),
                scale_y: Some(2.0),
                ..LayerPatch::default()
            },
        });

        for from in [Point::new(420.0, 320.0), Point::new(440.0, 320.0)] {
            surface(&mut session).drag(from, &[from + kurbo::Vec2::new(10.0, 0.0)]);
            session.pump();
            let layer = session.editor().layer(&id).unwrap();
            assert!((layer.as_text().unwrap().font_size - 96.0).abs() < f64::EPSILON);
            assert_eq!((layer.scale_x, layer.scale_y), (1.0, 1.0));
        }
        assert_eq!(session.editor().layer(&id).unwrap().position(), Point::new(420.0, 300.0));
        let object = session.sync().object(session.surface().unwrap(), &id).unwrap();
        assert_eq!((object.scale_x, object.scale_y), (1.0, 1.0));
    }

    #[test]
    fn test_pump_mid_drag_keeps_gesture() {
        let mut session = new_session();
        session.dispatch(EditorAction::AddShape {
            shape_type: ShapeType::Rectangle,
        });
        let id = selected(&session);

        surface(&mut session).pointer_down(Point::new(450.0, 350.0));
        surface(&mut session).pointer_move(Point::new(500.0, 350.0));
        session.pump();
        let object = session.sync().object(session.surface().unwrap(), &id).unwrap();
        assert_eq!(object.left, 450.0);

        surface(&mut session).pointer_move(Point::new(550.0, 350.0));
        surface(&mut session).pointer_up(Point::new(550.0, 350.0));
        session.pump();
        assert_eq!(session.editor().layer(&id).unwrap().position(), Point::new(500.0, 300.0));
    }

    #[test]
    fn test_locked_layer_cannot_be_dragged() {
        let mut session = new_session();
        session.dispatch(EditorAction::AddShape {
            shape_type: ShapeType::Rectangle,
        });
        let id = selected(&session);
        let handle = surface(&mut session).active_object().unwrap();
        session.dispatch(EditorAction::ToggleLock { id: id.clone() });

        surface(&mut session).drag(Point::new(450.0, 350.0), &[Point::new(600.0, 500.0)]);
        // A modification reported anyway is reverted.
        surface(&mut session).object_mut(handle).unwrap().left = 10.0;
        surface(&mut session).push_event(proedit_render::SurfaceEvent::ObjectModified(handle));
        session.pump();

        assert_eq!(session.editor().layer(&id).unwrap().position(), Point::new(400.0, 300.0));
        assert_eq!(surface(&mut session).object(handle).unwrap().left, 400.0);
    }

    #[test]
    fn test_typing_is_one_undo_step() {
        let mut session = new_session();
        session.dispatch(EditorAction::AddText);
        let id = selected(&session);
        let handle = surface(&mut session).active_object().unwrap();

        assert!(surface(&mut session).enter_editing(handle));
        surface(&mut session).type_text("\u{8}t!");
        session.pump();
        surface(&mut session).exit_editing();
        session.pump();
        assert_eq!(session.editor().layer(&id).unwrap().as_text().unwrap().text, "Double click to edit!");

        session.dispatch(EditorAction::Undo);
        assert_eq!(
            session.editor().layer(&id).unwrap().as_text().unwrap().text,
            "Double click to edit"
        );
        session.dispatch(EditorAction::Undo);
        assert!(session.editor().layers().is_empty());
    }

    #[test]
    fn test_properties_edit_and_align() {
        let mut session = new_session();
        session.dispatch(EditorAction::AddShape {
            shape_type: ShapeType::Rectangle,
        });
        let id = selected(&session);
        session.dispatch(EditorAction::UpdateLayer {
            id: id.clone(),
            patch: LayerPatch {
                opacity: Some(0.25),
                ..LayerPatch::default()
            },
        });
        session.dispatch(EditorAction::Align {
            position: AlignPosition::BottomRight,
        });

        let object = session.sync().object(session.surface().unwrap(), &id).unwrap();
        assert_eq!(object.opacity, 0.25);
        assert_eq!((object.left, object.top), (1050.0, 700.0));
    }

    #[test]
    fn test_image_appears_after_pump() {
        let mut session = new_session();
        let url = proedit_render::data_url::encode(
            &proedit_render::export::encode_png(&proedit_render::PixelBuffer::filled(2, 2, [0, 0, 255, 255]))
                .unwrap(),
            "image/png",
        );
        session.dispatch(EditorAction::AddImage {
            url,
            width: 100.0,
            height: 100.0,
        });
        let id = selected(&session);
        assert!(session.sync().is_pending(&id));
        assert_eq!(surface(&mut session).object_count(), 0);

        session.settle(4);
        assert!(!session.sync().is_pending(&id));
        assert_eq!(surface(&mut session).object_count(), 1);
    }

    #[test]
    fn test_draw_tool_adds_drawing() {
        let mut session = new_session();
        session.dispatch(EditorAction::SetTool { tool: ToolKind::Draw });
        session.dispatch(EditorAction::SetDrawingColor {
            color: "#ff3366".to_string(),
        });
        surface(&mut session).drag(Point::new(10.0, 10.0), &[Point::new(50.0, 10.0), Point::new(50.0, 60.0)]);
        session.pump();

        let layer = session.editor().selected_layer().unwrap();
        let drawing = layer.as_drawing().unwrap();
        assert_eq!(drawing.stroke_color, "#ff3366");
        assert!((drawing.stroke_width - 3.0).abs() < f64::EPSILON);
        assert_eq!(surface(&mut session).object_count(), 1);

        session.dispatch(EditorAction::SetTool { tool: ToolKind::Eraser });
        assert_eq!(
            surface(&mut session).interaction().brush.as_ref().map(|b| b.width),
            Some(20.0)
        );
    }

    #[test]
    fn test_zoom_is_not_history() {
        let mut session = new_session();
        session.dispatch(EditorAction::ZoomIn);
        assert!((surface(&mut session).zoom() - 1.2).abs() < 1e-9);
        assert!(!session.editor().can_undo());
    }

    #[test]
    fn test_export_without_surface() {
        let session: Session<RetainedSurface> =
            Session::new(EditorConfig::default(), Box::new(DataUrlLoader::new()));
        assert_eq!(session.export(ExportFormat::Png).unwrap(), ExportOutcome::NoSurface);
    }

    #[test]
    fn test_save_and_open_through_storage() {
        let storage = MemoryStorage::new();
        let mut session = new_session();
        session.dispatch(EditorAction::AddText);
        session.save(&storage, "design").unwrap();

        let mut other = new_session();
        other.open(&storage, "design").unwrap();
        assert_eq!(other.editor().layers(), session.editor().layers());
        assert_eq!(surface(&mut other).object_count(), 1);
        assert!(!other.editor().can_undo());
        assert!(other.open(&storage, "missing").is_err());
    }

    #[test]
    fn test_open_malformed_json_keeps_state() {
        let mut session = new_session();
        session.dispatch(EditorAction::AddText);
        assert!(session.open_json("{ not json").is_err());
        assert_eq!(session.editor().layers().len(), 1);
        assert_eq!(surface(&mut session).object_count(), 1);
    }
}
