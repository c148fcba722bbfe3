//! Canvas synchronizer.
//!
//! Keeps a [`Surface`] in step with the editor's layer list. The synchronizer
//! owns the layer id to object handle table; nothing else creates, mutates or
//! removes surface objects. Edits made on the surface travel back as
//! [`SyncAction`]s for the application layer to record in history.

use crate::loader::{DecodedImage, ImageCompletion, ImageKey, ImageLoadError, ImageLoader};
use crate::surface::{
    InteractionMode, ObjectHandle, ObjectKind, ObjectShadow, ObjectStroke, Surface, SurfaceBackground,
    SurfaceEvent, SurfaceObject, TextContent,
};
use kurbo::{BezPath, Point, Size, Vec2};
use proedit_core::background::placement;
use proedit_core::tools::stroke_to_layer;
use proedit_core::{
    BackgroundFit, Fill, Layer, LayerId, LayerKind, LayerPatch, PointerSample, Rgba, ShapeType, StrokeStyle,
    ToolKind, ToolManager, ToolOutput, parse_color, resolve_fill,
};
use std::collections::{HashMap, HashSet};

/// Scale deltas smaller than this are treated as no resize.
const SCALE_EPSILON: f64 = 1e-9;

/// An edit originating on the surface, to be applied to the editor.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncAction {
    /// The user selected an object, or cleared the selection.
    Select(Option<LayerId>),
    /// The user changed a layer. `commit: false` marks a per-keystroke
    /// text preview that should not create its own history entry.
    Update {
        id: LayerId,
        patch: LayerPatch,
        commit: bool,
    },
    /// A finished freehand stroke.
    AddLayer(Layer),
}

#[derive(Debug, Clone)]
struct Tracked {
    handle: ObjectHandle,
    /// Layer state last pushed to the object.
    layer: Layer,
}

#[derive(Debug, Clone)]
struct PendingImage {
    url: String,
    /// Latest layer state, applied when the asset arrives.
    layer: Layer,
}

#[derive(Debug, Clone)]
struct BackgroundState {
    url: Option<String>,
    fit: BackgroundFit,
    canvas: Size,
    color: Rgba,
    image: Option<DecodedImage>,
    loading: bool,
}

impl Default for BackgroundState {
    fn default() -> Self {
        Self {
            url: None,
            fit: BackgroundFit::default(),
            canvas: Size::ZERO,
            color: Rgba::black(),
            image: None,
            loading: false,
        }
    }
}

/// Reconciles layer snapshots against a surface and bridges surface events
/// back into editor actions.
#[derive(Debug, Default)]
pub struct Synchronizer {
    objects: HashMap<LayerId, Tracked>,
    ids: HashMap<ObjectHandle, LayerId>,
    pending: HashMap<LayerId, PendingImage>,
    /// Layer ids in paint order, from the last reconcile.
    order: Vec<LayerId>,
    selected: Option<LayerId>,
    tools: ToolManager,
    brush: Option<StrokeStyle>,
    background: BackgroundState,
}

impl Synchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of layers with a live surface object.
    pub fn tracked_count(&self) -> usize {
        self.objects.len()
    }

    /// Check if an image layer is waiting for its asset.
    pub fn is_pending(&self, id: &LayerId) -> bool {
        self.pending.contains_key(id)
    }

    pub fn tool(&self) -> ToolKind {
        self.tools.current_tool()
    }

    /// The surface object currently showing a layer.
    pub fn object<'a>(&self, surface: &'a dyn Surface, id: &LayerId) -> Option<&'a SurfaceObject> {
        surface.object(self.objects.get(id)?.handle)
    }

    /// Rendered size of a layer's object on the canvas, scale included.
    pub fn measure(&self, surface: &dyn Surface, id: &LayerId) -> Option<Size> {
        let handle = self.objects.get(id)?.handle;
        let local = surface.measure(handle)?;
        let object = surface.object(handle)?;
        Some(Size::new(
            local.width * object.scale_x.abs(),
            local.height * object.scale_y.abs(),
        ))
    }

    // --- Reconcile ---

    /// Bring the surface in line with `layers` and `selected`.
    ///
    /// Running it twice with the same input creates and removes nothing.
    pub fn reconcile(
        &mut self,
        surface: &mut dyn Surface,
        loader: &mut dyn ImageLoader,
        layers: &[Layer],
        selected: Option<&LayerId>,
    ) {
        let live: HashSet<&LayerId> = layers.iter().map(|l| l.id()).collect();

        // 1. Drop objects and loads for layers that are gone.
        let stale: Vec<LayerId> = self
            .objects
            .keys()
            .filter(|id| !live.contains(id))
            .cloned()
            .collect();
        for id in stale {
            if let Some(tracked) = self.objects.remove(&id) {
                surface.remove_object(tracked.handle);
                self.ids.remove(&tracked.handle);
                log::debug!("Removed object for layer {}", id);
            }
        }
        self.pending.retain(|id, _| live.contains(id));

        // 2 and 3. Create missing objects and push fields onto existing ones.
        for layer in layers {
            self.request_image_if_needed(loader, layer);
            match self.objects.get(layer.id()).map(|t| t.handle) {
                Some(handle) => self.push_layer(surface, handle, layer),
                None => self.create_object(surface, layer),
            }
        }

        // 4. Stacking order and selection.
        self.order = layers.iter().map(|l| l.id().clone()).collect();
        self.restack(surface);
        self.selected = selected.cloned();
        self.sync_active(surface, layers);
    }

    /// Start loading a layer's image unless it is already on its way.
    fn request_image_if_needed(&mut self, loader: &mut dyn ImageLoader, layer: &Layer) {
        let Some(image) = layer.as_image() else {
            return;
        };
        if let Some(pending) = self.pending.get_mut(layer.id()) {
            if pending.url == image.image_url {
                pending.layer = layer.clone();
                return;
            }
        }
        let shown_url = self
            .objects
            .get(layer.id())
            .and_then(|t| t.layer.as_image())
            .map(|i| i.image_url.as_str());
        if shown_url == Some(image.image_url.as_str()) {
            return;
        }
        loader.request(ImageKey::Layer(layer.id().clone()), &image.image_url);
        self.pending.insert(
            layer.id().clone(),
            PendingImage {
                url: image.image_url.clone(),
                layer: layer.clone(),
            },
        );
    }

    fn create_object(&mut self, surface: &mut dyn Surface, layer: &Layer) {
        // Image layers are added when their asset arrives.
        let Some(object) = build_object(layer, None, None) else {
            return;
        };
        let handle = surface.add_object(object);
        self.track(handle, layer);
        self.refresh_gradient(surface, handle, layer);
        log::debug!("Created object for {} layer {}", layer.kind.type_name(), layer.id());
    }

    fn track(&mut self, handle: ObjectHandle, layer: &Layer) {
        self.ids.insert(handle, layer.id().clone());
        self.objects.insert(
            layer.id().clone(),
            Tracked {
                handle,
                layer: layer.clone(),
            },
        );
    }

    /// Push every mutable field of `layer` onto its existing object.
    ///
    /// Layers unchanged since the last push are skipped, so a gesture in
    /// progress on the surface is left alone.
    fn push_layer(&mut self, surface: &mut dyn Surface, handle: ObjectHandle, layer: &Layer) {
        if self.objects.get(layer.id()).is_some_and(|t| t.layer == *layer) {
            return;
        }
        let current = surface.object(handle);
        let image = current.and_then(|o| match &o.kind {
            ObjectKind::Image { image, .. } => Some(image.clone()),
            _ => None,
        });
        let measured = surface.measure(handle);
        if let Some(object) = build_object(layer, image, measured) {
            if surface.object(handle) != Some(&object) {
                surface.update_object(handle, object);
            }
        }
        if let Some(tracked) = self.objects.get_mut(layer.id()) {
            tracked.layer = layer.clone();
        }
        self.refresh_gradient(surface, handle, layer);
    }

    /// Rebuild a gradient fill against the object's measured box.
    fn refresh_gradient(&self, surface: &mut dyn Surface, handle: ObjectHandle, layer: &Layer) {
        let Some(object) = surface.object(handle) else {
            return;
        };
        if !object.fill.as_ref().is_some_and(Fill::is_gradient) {
            return;
        }
        let fill = layer_fill(layer, surface.measure(handle));
        if object.fill != fill {
            let mut object = object.clone();
            object.fill = fill;
            surface.update_object(handle, object);
        }
    }

    fn restack(&self, surface: &mut dyn Surface) {
        let handles: Vec<ObjectHandle> = self
            .order
            .iter()
            .filter_map(|id| self.objects.get(id).map(|t| t.handle))
            .collect();
        surface.reorder(&handles);
    }

    fn sync_active(&self, surface: &mut dyn Surface, layers: &[Layer]) {
        let wanted = self
            .selected
            .as_ref()
            .filter(|id| layers.iter().any(|l| l.id() == *id && !l.hidden))
            .and_then(|id| self.objects.get(id))
            .map(|t| t.handle);
        if surface.active_object() != wanted {
            surface.set_active_object(wanted);
        }
    }

    // --- Asset completions ---

    /// Route a finished load to [`on_image_loaded`](Self::on_image_loaded)
    /// or [`on_image_failed`](Self::on_image_failed).
    pub fn handle_completion(&mut self, surface: &mut dyn Surface, completion: ImageCompletion) {
        let ImageCompletion { key, url, result } = completion;
        match key {
            ImageKey::Layer(id) => {
                let current = self.pending.get(&id).is_some_and(|p| p.url == url);
                if !current {
                    log::debug!("Discarding stale image load for layer {}", id);
                    return;
                }
                match result {
                    Ok(image) => self.on_image_loaded(surface, &id, image),
                    Err(e) => self.on_image_failed(&id, &e),
                }
            }
            ImageKey::Background => {
                if self.background.url.as_deref() != Some(url.as_str()) {
                    log::debug!("Discarding stale background load");
                    return;
                }
                self.background.loading = false;
                match result {
                    Ok(image) => {
                        self.background.image = Some(image);
                        self.apply_background(surface);
                    }
                    Err(e) => log::warn!("Background image failed to load: {}", e),
                }
            }
        }
    }

    /// Show a loaded image for a pending layer.
    pub fn on_image_loaded(&mut self, surface: &mut dyn Surface, id: &LayerId, image: DecodedImage) {
        let Some(pending) = self.pending.remove(id) else {
            log::debug!("Discarding image for layer {} that is no longer pending", id);
            return;
        };
        let Some(object) = build_object(&pending.layer, Some(image), None) else {
            return;
        };
        match self.objects.get(id).map(|t| t.handle) {
            Some(handle) => {
                surface.update_object(handle, object);
                self.track(handle, &pending.layer);
            }
            None => {
                let handle = surface.add_object(object);
                self.track(handle, &pending.layer);
                self.restack(surface);
            }
        }
        if self.selected.as_ref() == Some(id) && !pending.layer.hidden {
            surface.set_active_object(self.objects.get(id).map(|t| t.handle));
        }
        log::debug!("Image for layer {} ready", id);
    }

    /// Give up on a pending layer image. The layer stays without an object.
    pub fn on_image_failed(&mut self, id: &LayerId, error: &ImageLoadError) {
        if self.pending.remove(id).is_some() {
            log::warn!("Image for layer {} failed to load: {}", id, error);
        }
    }

    // --- Background, zoom, tools ---

    /// Show `url` behind the objects, or a flat `color` when there is none.
    ///
    /// The image loads asynchronously; the color shows until it arrives.
    pub fn set_background(
        &mut self,
        surface: &mut dyn Surface,
        loader: &mut dyn ImageLoader,
        url: Option<&str>,
        fit: BackgroundFit,
        canvas: Size,
        color: Rgba,
    ) {
        self.background.fit = fit;
        self.background.canvas = canvas;
        self.background.color = color;

        let url = url.filter(|u| !u.is_empty());
        if url != self.background.url.as_deref() {
            self.background.url = url.map(str::to_string);
            self.background.image = None;
            self.background.loading = false;
            if let Some(url) = url {
                loader.request(ImageKey::Background, url);
                self.background.loading = true;
            }
        }
        self.apply_background(surface);
    }

    fn apply_background(&self, surface: &mut dyn Surface) {
        let state = &self.background;
        let placed = state
            .image
            .as_ref()
            .and_then(|image| Some((image, placement(state.fit, image.size(), state.canvas)?)));
        let background = match placed {
            Some((image, placement)) => SurfaceBackground::Image {
                image: image.clone(),
                placement,
                color: state.color,
            },
            None => SurfaceBackground::Color(state.color),
        };
        surface.set_background(background);
    }

    pub fn set_zoom(&mut self, surface: &mut dyn Surface, zoom: f64) {
        surface.set_zoom(zoom);
    }

    /// Switch the pointer mode. Any gesture of the previous tool is dropped
    /// before the new mode takes effect.
    pub fn set_tool(&mut self, surface: &mut dyn Surface, tool: ToolKind, brush: Option<StrokeStyle>) {
        if self.tools.set_tool(tool) {
            log::debug!("Tool switched to {}", tool);
        }
        self.brush = brush.filter(|_| tool.is_freehand());
        surface.set_interaction(InteractionMode {
            objects: tool.objects_interactive(),
            multi_select: tool == ToolKind::Select,
            brush: self.brush.clone(),
        });
    }

    // --- Surface events ---

    /// Translate a surface event into editor actions.
    pub fn handle_event(&mut self, surface: &mut dyn Surface, event: SurfaceEvent) -> Vec<SyncAction> {
        match event {
            SurfaceEvent::SelectionCreated(handles) | SurfaceEvent::SelectionUpdated(handles) => {
                let Some(id) = handles.iter().find_map(|h| self.ids.get(h)).cloned() else {
                    return Vec::new();
                };
                self.selected = Some(id.clone());
                vec![SyncAction::Select(Some(id))]
            }
            SurfaceEvent::SelectionCleared => {
                self.selected = None;
                vec![SyncAction::Select(None)]
            }
            SurfaceEvent::ObjectModified(handle) => self.object_modified(surface, handle).into_iter().collect(),
            SurfaceEvent::TextChanged(handle) => self.text_changed(surface, handle).into_iter().collect(),
            SurfaceEvent::PointerDown(point) => {
                let sample = pointer_sample(surface, point);
                self.tools.begin(sample);
                Vec::new()
            }
            SurfaceEvent::PointerMove(point) => {
                let sample = pointer_sample(surface, point);
                if let Some(delta) = self.tools.update(sample) {
                    pan(surface, delta);
                }
                Vec::new()
            }
            SurfaceEvent::PointerUp(point) => {
                let sample = pointer_sample(surface, point);
                let (delta, output) = self.tools.end(sample);
                if let Some(delta) = delta {
                    pan(surface, delta);
                }
                match (output, &self.brush) {
                    (ToolOutput::Stroke(points), Some(brush)) => {
                        stroke_to_layer(&points, brush).map(SyncAction::AddLayer).into_iter().collect()
                    }
                    _ => Vec::new(),
                }
            }
        }
    }

    fn tracked_for(&self, handle: ObjectHandle) -> Option<&Tracked> {
        self.objects.get(self.ids.get(&handle)?)
    }

    /// Put an object back to its layer's state.
    fn revert(&self, surface: &mut dyn Surface, tracked: &Tracked) {
        let image = surface.object(tracked.handle).and_then(|o| match &o.kind {
            ObjectKind::Image { image, .. } => Some(image.clone()),
            _ => None,
        });
        let measured = surface.measure(tracked.handle);
        if let Some(object) = build_object(&tracked.layer, image, measured) {
            surface.update_object(tracked.handle, object);
        }
    }

    fn object_modified(&mut self, surface: &mut dyn Surface, handle: ObjectHandle) -> Option<SyncAction> {
        let tracked = self.tracked_for(handle)?.clone();
        if tracked.layer.locked {
            log::debug!("Reverting modification of locked layer {}", tracked.layer.id());
            self.revert(surface, &tracked);
            return None;
        }
        let object = surface.object(handle)?.clone();
        let mut patch = LayerPatch {
            x: Some(object.left),
            y: Some(object.top),
            rotation: Some(object.angle),
            ..LayerPatch::default()
        };

        match (&object.kind, tracked.layer.as_text()) {
            (ObjectKind::Text(content), Some(text)) => {
                patch.text = Some(content.text.clone());
                patch.scale_x = Some(1.0);
                patch.scale_y = Some(1.0);
                let factor = (object.scale_x + object.scale_y) / 2.0;
                if (factor - 1.0).abs() > SCALE_EPSILON {
                    patch.font_size = Some(text.scaled_font_size(factor));
                    let mut normalized = object.clone();
                    normalized.scale_x = 1.0;
                    normalized.scale_y = 1.0;
                    surface.update_object(handle, normalized);
                }
            }
            _ => {
                patch.scale_x = Some(object.scale_x);
                patch.scale_y = Some(object.scale_y);
            }
        }

        Some(SyncAction::Update {
            id: tracked.layer.id().clone(),
            patch,
            commit: true,
        })
    }

    fn text_changed(&self, surface: &mut dyn Surface, handle: ObjectHandle) -> Option<SyncAction> {
        let tracked = self.tracked_for(handle)?;
        if tracked.layer.locked {
            self.revert(surface, tracked);
            return None;
        }
        match &surface.object(handle)?.kind {
            ObjectKind::Text(content) => Some(SyncAction::Update {
                id: tracked.layer.id().clone(),
                patch: LayerPatch::text(content.text.clone()),
                commit: false,
            }),
            _ => None,
        }
    }
}

fn pointer_sample(surface: &dyn Surface, screen: Point) -> PointerSample {
    PointerSample {
        screen,
        canvas: surface.viewport_transform().inverse() * screen,
    }
}

fn pan(surface: &mut dyn Surface, delta: Vec2) {
    if delta != Vec2::ZERO {
        surface.pan_viewport(delta);
    }
}

fn color_or(input: &str, fallback: Rgba) -> Rgba {
    parse_color(input).unwrap_or_else(|e| {
        log::debug!("Invalid color, using fallback: {}", e);
        fallback
    })
}

fn layer_fill(layer: &Layer, measured: Option<Size>) -> Option<Fill> {
    match &layer.kind {
        LayerKind::Text(t) => Some(resolve_fill(&t.color, Some(&t.gradient), measured)),
        LayerKind::Shape(s) => Some(resolve_fill(&s.fill, s.gradient.as_ref(), measured)),
        LayerKind::Image(_) | LayerKind::Drawing(_) => None,
    }
}

/// Describe `layer` as a surface object.
///
/// Returns `None` for image layers without decoded pixels.
fn build_object(layer: &Layer, image: Option<DecodedImage>, measured: Option<Size>) -> Option<SurfaceObject> {
    let kind = match &layer.kind {
        LayerKind::Text(t) => ObjectKind::Text(TextContent {
            text: t.text.clone(),
            font_size: t.font_size,
            font_family: t.font_family.clone(),
            font_weight: t.font_weight.clone(),
            align: t.text_align,
            char_spacing: t.char_spacing(),
            line_height: t.line_height,
        }),
        LayerKind::Shape(s) => match s.shape_type {
            ShapeType::Rectangle => ObjectKind::Rect {
                width: s.width,
                height: s.height,
            },
            ShapeType::Circle => ObjectKind::Circle { radius: s.width / 2.0 },
            ShapeType::Ellipse => ObjectKind::Ellipse {
                rx: s.width / 2.0,
                ry: s.height / 2.0,
            },
            ShapeType::Triangle => ObjectKind::Triangle {
                width: s.width,
                height: s.height,
            },
        },
        LayerKind::Image(i) => ObjectKind::Image {
            image: image?,
            width: i.width,
            height: i.height,
        },
        LayerKind::Drawing(d) => ObjectKind::Path(d.path().unwrap_or_else(|e| {
            log::debug!("Invalid path data on layer {}: {:?}", layer.id(), e);
            BezPath::new()
        })),
    };

    let outline = layer.stroke.enabled && layer.stroke.width > 0.0;
    let stroke = match &layer.kind {
        _ if outline => Some(ObjectStroke {
            color: color_or(&layer.stroke.color, Rgba::black()),
            width: layer.stroke.width,
        }),
        LayerKind::Drawing(d) => Some(ObjectStroke {
            color: color_or(&d.stroke_color, Rgba::white()),
            width: d.stroke_width,
        }),
        _ => None,
    };
    let shadow = layer.shadow.enabled.then(|| ObjectShadow {
        color: color_or(&layer.shadow.color, Rgba::black()),
        blur: layer.shadow.blur,
        offset: Vec2::new(layer.shadow.offset_x, layer.shadow.offset_y),
    });
    let interactive = !layer.locked && !layer.hidden;
    // Text size lives in the font size alone.
    let (scale_x, scale_y) = match layer.kind {
        LayerKind::Text(_) => (1.0, 1.0),
        _ => (layer.scale_x, layer.scale_y),
    };

    Some(SurfaceObject {
        kind,
        left: layer.x,
        top: layer.y,
        angle: layer.rotation,
        scale_x,
        scale_y,
        opacity: layer.opacity,
        fill: layer_fill(layer, measured),
        stroke,
        shadow,
        blend: layer.blend_mode.to_peniko(),
        visible: !layer.hidden,
        selectable: interactive,
        evented: interactive,
    })
}
