//! In-memory retained surface.
//!
//! Keeps objects in stacking order, hit-tests by bounding box, and turns
//! simulated gestures into [`SurfaceEvent`]s the way an interactive canvas
//! would. `read_pixels` paints a coarse proxy raster (axis-aligned object
//! boxes in their base color, images sampled nearest-neighbor).

use crate::surface::{
    InteractionMode, ObjectHandle, ObjectKind, PixelBuffer, Surface, SurfaceBackground, SurfaceEvent,
    SurfaceObject,
};
use kurbo::{Affine, Point, Rect, Size, Vec2};
use proedit_core::Rgba;

/// Average glyph advance as a fraction of the font size.
const GLYPH_ADVANCE: f64 = 0.6;

#[derive(Debug, Clone)]
struct DragState {
    handle: ObjectHandle,
    last: Point,
    moved: bool,
}

/// A headless surface backing tests and the command-line front end.
#[derive(Debug, Clone)]
pub struct RetainedSurface {
    size: Size,
    objects: Vec<(ObjectHandle, SurfaceObject)>,
    next_handle: u64,
    active: Option<ObjectHandle>,
    background: SurfaceBackground,
    zoom: f64,
    pan: Vec2,
    interaction: InteractionMode,
    events: Vec<SurfaceEvent>,
    editing: Option<ObjectHandle>,
    drag: Option<DragState>,
    created: usize,
    removed: usize,
}

impl RetainedSurface {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            objects: Vec::new(),
            next_handle: 1,
            active: None,
            background: SurfaceBackground::Color(Rgba::black()),
            zoom: 1.0,
            pan: Vec2::ZERO,
            interaction: InteractionMode::default(),
            events: Vec::new(),
            editing: None,
            drag: None,
            created: 0,
            removed: 0,
        }
    }

    /// Total objects ever created and removed.
    pub fn churn(&self) -> (usize, usize) {
        (self.created, self.removed)
    }

    /// Handles in stacking order, back to front.
    pub fn handles(&self) -> Vec<ObjectHandle> {
        self.objects.iter().map(|(h, _)| *h).collect()
    }

    pub fn background(&self) -> &SurfaceBackground {
        &self.background
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn interaction(&self) -> &InteractionMode {
        &self.interaction
    }

    /// Mutable access for simulating external changes to an object.
    pub fn object_mut(&mut self, handle: ObjectHandle) -> Option<&mut SurfaceObject> {
        self.objects.iter_mut().find(|(h, _)| *h == handle).map(|(_, o)| o)
    }

    /// Queue an arbitrary event.
    pub fn push_event(&mut self, event: SurfaceEvent) {
        self.events.push(event);
    }

    fn index_of(&self, handle: ObjectHandle) -> Option<usize> {
        self.objects.iter().position(|(h, _)| *h == handle)
    }

    fn local_size(object: &SurfaceObject) -> Size {
        match &object.kind {
            ObjectKind::Text(t) => {
                let lines: Vec<&str> = t.text.split('\n').collect();
                let longest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) as f64;
                let advance = t.font_size * (GLYPH_ADVANCE + t.char_spacing / 1000.0);
                Size::new(longest * advance, lines.len() as f64 * t.font_size * t.line_height)
            }
            ObjectKind::Rect { width, height } | ObjectKind::Triangle { width, height } => {
                Size::new(*width, *height)
            }
            ObjectKind::Circle { radius } => Size::new(radius * 2.0, radius * 2.0),
            ObjectKind::Ellipse { rx, ry } => Size::new(rx * 2.0, ry * 2.0),
            ObjectKind::Image { width, height, .. } => Size::new(*width, *height),
            ObjectKind::Path(path) => {
                use kurbo::Shape;
                let bounds = path.bounding_box();
                Size::new(bounds.x1.max(0.0), bounds.y1.max(0.0))
            }
        }
    }

    /// Canvas-space bounding box of an object.
    fn bounds(object: &SurfaceObject) -> Rect {
        let size = Self::local_size(object);
        object.transform().transform_rect_bbox(size.to_rect())
    }

    /// Topmost visible, evented object under a canvas point.
    pub fn hit_test(&self, point: Point) -> Option<ObjectHandle> {
        self.objects
            .iter()
            .rev()
            .find(|(_, o)| o.visible && o.evented && Self::bounds(o).contains(point))
            .map(|(h, _)| *h)
    }

    fn to_canvas(&self, screen: Point) -> Point {
        self.viewport_transform().inverse() * screen
    }

    fn select_from_pointer(&mut self, handle: Option<ObjectHandle>) {
        match (self.active, handle) {
            (None, Some(h)) => {
                self.active = Some(h);
                self.events.push(SurfaceEvent::SelectionCreated(vec![h]));
            }
            (Some(current), Some(h)) if current != h => {
                self.active = Some(h);
                self.events.push(SurfaceEvent::SelectionUpdated(vec![h]));
            }
            (Some(_), None) => {
                self.active = None;
                self.events.push(SurfaceEvent::SelectionCleared);
            }
            _ => {}
        }
    }

    // --- Simulated gestures ---

    pub fn pointer_down(&mut self, screen: Point) {
        self.exit_editing();
        self.events.push(SurfaceEvent::PointerDown(screen));
        if !self.interaction.objects {
            return;
        }
        let canvas = self.to_canvas(screen);
        let hit = self.hit_test(canvas);
        let selectable = hit.filter(|h| self.object(*h).is_some_and(|o| o.selectable));
        self.select_from_pointer(selectable);
        self.drag = selectable.map(|handle| DragState {
            handle,
            last: canvas,
            moved: false,
        });
    }

    fn drag_to(&mut self, screen: Point) {
        let canvas = self.to_canvas(screen);
        let Some(drag) = self.drag.as_mut() else {
            return;
        };
        let delta = canvas - drag.last;
        if delta == Vec2::ZERO {
            return;
        }
        drag.last = canvas;
        drag.moved = true;
        let handle = drag.handle;
        if let Some(object) = self.object_mut(handle) {
            object.left += delta.x;
            object.top += delta.y;
        }
    }

    pub fn pointer_move(&mut self, screen: Point) {
        self.events.push(SurfaceEvent::PointerMove(screen));
        self.drag_to(screen);
    }

    pub fn pointer_up(&mut self, screen: Point) {
        self.drag_to(screen);
        self.events.push(SurfaceEvent::PointerUp(screen));
        if let Some(drag) = self.drag.take() {
            if drag.moved {
                self.events.push(SurfaceEvent::ObjectModified(drag.handle));
            }
        }
    }

    /// Press, move through `path`, release.
    pub fn drag(&mut self, from: Point, path: &[Point]) {
        self.pointer_down(from);
        let Some((last, rest)) = path.split_last() else {
            self.pointer_up(from);
            return;
        };
        for point in rest {
            self.pointer_move(*point);
        }
        self.pointer_up(*last);
    }

    /// Resize with a corner handle: multiplies the object's scale.
    /// Ignored for objects that do not receive input.
    pub fn scale_object(&mut self, handle: ObjectHandle, sx: f64, sy: f64) -> bool {
        if !self.interaction.objects {
            return false;
        }
        let Some(object) = self.object_mut(handle).filter(|o| o.evented) else {
            return false;
        };
        object.scale_x *= sx;
        object.scale_y *= sy;
        self.events.push(SurfaceEvent::ObjectModified(handle));
        true
    }

    /// Rotate with the rotation handle.
    pub fn rotate_object(&mut self, handle: ObjectHandle, angle: f64) -> bool {
        if !self.interaction.objects {
            return false;
        }
        let Some(object) = self.object_mut(handle).filter(|o| o.evented) else {
            return false;
        };
        object.angle = angle;
        self.events.push(SurfaceEvent::ObjectModified(handle));
        true
    }

    /// Enter in-place editing of a text object (double click).
    pub fn enter_editing(&mut self, handle: ObjectHandle) -> bool {
        let editable = self
            .object(handle)
            .is_some_and(|o| o.evented && o.kind.is_text());
        if editable && self.interaction.objects {
            self.editing = Some(handle);
        }
        self.editing == Some(handle)
    }

    /// Type characters into the edited text, one change event per char.
    pub fn type_text(&mut self, input: &str) {
        let Some(handle) = self.editing else {
            return;
        };
        for ch in input.chars() {
            if let Some(ObjectKind::Text(content)) = self.object_mut(handle).map(|o| &mut o.kind) {
                if ch == '\u{8}' {
                    content.text.pop();
                } else {
                    content.text.push(ch);
                }
                self.events.push(SurfaceEvent::TextChanged(handle));
            }
        }
    }

    /// Leave text editing; commits with a modified event.
    pub fn exit_editing(&mut self) {
        if let Some(handle) = self.editing.take() {
            self.events.push(SurfaceEvent::ObjectModified(handle));
        }
    }

    pub fn editing(&self) -> Option<ObjectHandle> {
        self.editing
    }

    // --- Proxy raster ---

    fn paint_background(&self, buffer: &mut PixelBuffer) {
        let (color, image) = match &self.background {
            SurfaceBackground::Color(c) => (*c, None),
            SurfaceBackground::Image { image, placement, color } => (*color, Some((image, placement))),
        };
        let base = [color.r, color.g, color.b, color.a];
        let inverse = image.map(|(_, p)| p.to_affine().inverse());
        for y in 0..buffer.height {
            for x in 0..buffer.width {
                let mut px = base;
                if let (Some((image, _)), Some(inv)) = (image, inverse) {
                    let src = inv * Point::new(x as f64 + 0.5, y as f64 + 0.5);
                    if src.x >= 0.0 && src.y >= 0.0 {
                        if let Some(sample) = image.pixel(src.x as u32, src.y as u32) {
                            px = blend(px, sample, 1.0);
                        }
                    }
                }
                put(buffer, x, y, px);
            }
        }
    }

    fn paint_object(&self, buffer: &mut PixelBuffer, object: &SurfaceObject) {
        let bounds = Self::bounds(object);
        let x0 = bounds.x0.max(0.0).floor() as u32;
        let y0 = bounds.y0.max(0.0).floor() as u32;
        let x1 = (bounds.x1.min(buffer.width as f64)).ceil().max(0.0) as u32;
        let y1 = (bounds.y1.min(buffer.height as f64)).ceil().max(0.0) as u32;

        let solid = match (&object.kind, &object.fill, &object.stroke) {
            (ObjectKind::Image { .. }, _, _) => None,
            (_, Some(fill), _) => Some(fill.base_color()),
            (_, None, Some(stroke)) => Some(stroke.color),
            _ => None,
        };
        let inverse = object.transform().inverse();

        for y in y0..y1 {
            for x in x0..x1 {
                let src = match (&object.kind, solid) {
                    (_, Some(c)) => Some([c.r, c.g, c.b, c.a]),
                    (ObjectKind::Image { image, width, height }, None) => {
                        let local = inverse * Point::new(x as f64 + 0.5, y as f64 + 0.5);
                        if local.x < 0.0 || local.y < 0.0 || *width <= 0.0 || *height <= 0.0 {
                            None
                        } else {
                            let u = (local.x / width * image.width as f64) as u32;
                            let v = (local.y / height * image.height as f64) as u32;
                            image.pixel(u, v)
                        }
                    }
                    _ => None,
                };
                if let (Some(src), Some(dst)) = (src, buffer.pixel(x, y)) {
                    put(buffer, x, y, blend(dst, src, object.opacity));
                }
            }
        }
    }
}

fn put(buffer: &mut PixelBuffer, x: u32, y: u32, px: [u8; 4]) {
    let i = ((y * buffer.width + x) * 4) as usize;
    if let Some(slot) = buffer.data.get_mut(i..i + 4) {
        slot.copy_from_slice(&px);
    }
}

/// Source-over of straight-alpha `src` (scaled by `opacity`) onto `dst`.
fn blend(dst: [u8; 4], src: [u8; 4], opacity: f64) -> [u8; 4] {
    let sa = src[3] as f64 / 255.0 * opacity.clamp(0.0, 1.0);
    let da = dst[3] as f64 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return [0, 0, 0, 0];
    }
    let channel = |s: u8, d: u8| {
        let c = (s as f64 * sa + d as f64 * da * (1.0 - sa)) / out_a;
        c.round().clamp(0.0, 255.0) as u8
    };
    [
        channel(src[0], dst[0]),
        channel(src[1], dst[1]),
        channel(src[2], dst[2]),
        (out_a * 255.0).round() as u8,
    ]
}

impl Surface for RetainedSurface {
    fn add_object(&mut self, object: SurfaceObject) -> ObjectHandle {
        let handle = ObjectHandle(self.next_handle);
        self.next_handle += 1;
        self.objects.push((handle, object));
        self.created += 1;
        handle
    }

    fn update_object(&mut self, handle: ObjectHandle, object: SurfaceObject) -> bool {
        match self.object_mut(handle) {
            Some(slot) => {
                *slot = object;
                true
            }
            None => false,
        }
    }

    fn remove_object(&mut self, handle: ObjectHandle) -> bool {
        let Some(index) = self.index_of(handle) else {
            return false;
        };
        self.objects.remove(index);
        self.removed += 1;
        if self.active == Some(handle) {
            self.active = None;
        }
        if self.editing == Some(handle) {
            self.editing = None;
        }
        if self.drag.as_ref().is_some_and(|d| d.handle == handle) {
            self.drag = None;
        }
        true
    }

    fn object(&self, handle: ObjectHandle) -> Option<&SurfaceObject> {
        self.objects.iter().find(|(h, _)| *h == handle).map(|(_, o)| o)
    }

    fn reorder(&mut self, order: &[ObjectHandle]) {
        let (mut listed, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.objects)
            .into_iter()
            .partition(|(h, _)| order.contains(h));
        listed.sort_by_key(|(h, _)| order.iter().position(|o| o == h));
        self.objects = rest;
        self.objects.extend(listed);
    }

    fn measure(&self, handle: ObjectHandle) -> Option<Size> {
        self.object(handle).map(Self::local_size)
    }

    fn set_active_object(&mut self, handle: Option<ObjectHandle>) {
        self.active = handle.filter(|h| self.index_of(*h).is_some());
    }

    fn active_object(&self) -> Option<ObjectHandle> {
        self.active
    }

    fn set_background(&mut self, background: SurfaceBackground) {
        self.background = background;
    }

    fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom;
    }

    fn pan_viewport(&mut self, delta: Vec2) {
        self.pan += delta;
    }

    fn viewport_transform(&self) -> Affine {
        Affine::translate(self.pan) * Affine::scale(self.zoom)
    }

    fn set_interaction(&mut self, mode: InteractionMode) {
        if !mode.objects {
            self.exit_editing();
            self.drag = None;
        }
        self.interaction = mode;
    }

    fn size(&self) -> Size {
        self.size
    }

    fn read_pixels(&self) -> Option<PixelBuffer> {
        let width = self.size.width.round().max(0.0) as u32;
        let height = self.size.height.round().max(0.0) as u32;
        let mut buffer = PixelBuffer::filled(width, height, [0, 0, 0, 0]);
        self.paint_background(&mut buffer);
        for (_, object) in self.objects.iter().filter(|(_, o)| o.visible) {
            self.paint_object(&mut buffer, object);
        }
        Some(buffer)
    }

    fn drain_events(&mut self) -> Vec<SurfaceEvent> {
        std::mem::take(&mut self.events)
    }

    fn object_count(&self) -> usize {
        self.objects.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proedit_core::Fill;

    fn rect(left: f64, top: f64, color: Rgba) -> SurfaceObject {
        SurfaceObject {
            left,
            top,
            fill: Some(Fill::Solid(color)),
            ..SurfaceObject::new(ObjectKind::Rect {
                width: 10.0,
                height: 10.0,
            })
        }
    }

    #[test]
    fn test_hit_test_topmost_evented() {
        let mut surface = RetainedSurface::new(Size::new(100.0, 100.0));
        let below = surface.add_object(rect(0.0, 0.0, Rgba::white()));
        let above = surface.add_object(rect(5.0, 5.0, Rgba::black()));
        assert_eq!(surface.hit_test(Point::new(7.0, 7.0)), Some(above));
        assert_eq!(surface.hit_test(Point::new(2.0, 2.0)), Some(below));

        surface.object_mut(above).unwrap().evented = false;
        assert_eq!(surface.hit_test(Point::new(7.0, 7.0)), Some(below));
        assert_eq!(surface.hit_test(Point::new(50.0, 50.0)), None);
    }

    #[test]
    fn test_click_selection_events() {
        let mut surface = RetainedSurface::new(Size::new(100.0, 100.0));
        let a = surface.add_object(rect(0.0, 0.0, Rgba::white()));
        let b = surface.add_object(rect(50.0, 50.0, Rgba::white()));

        surface.pointer_down(Point::new(5.0, 5.0));
        surface.pointer_up(Point::new(5.0, 5.0));
        surface.pointer_down(Point::new(55.0, 55.0));
        surface.pointer_up(Point::new(55.0, 55.0));
        surface.pointer_down(Point::new(90.0, 5.0));
        surface.pointer_up(Point::new(90.0, 5.0));

        let selection: Vec<_> = surface
            .drain_events()
            .into_iter()
            .filter(|e| !matches!(e, SurfaceEvent::PointerDown(_) | SurfaceEvent::PointerUp(_)))
            .collect();
        assert_eq!(
            selection,
            vec![
                SurfaceEvent::SelectionCreated(vec![a]),
                SurfaceEvent::SelectionUpdated(vec![b]),
                SurfaceEvent::SelectionCleared,
            ]
        );
    }

    #[test]
    fn test_drag_moves_and_reports() {
        let mut surface = RetainedSurface::new(Size::new(100.0, 100.0));
        let h = surface.add_object(rect(0.0, 0.0, Rgba::white()));
        surface.drag(Point::new(5.0, 5.0), &[Point::new(10.0, 5.0), Point::new(25.0, 35.0)]);
        let object = surface.object(h).unwrap();
        assert_eq!((object.left, object.top), (20.0, 30.0));
        assert!(surface.drain_events().contains(&SurfaceEvent::ObjectModified(h)));
    }

    #[test]
    fn test_locked_object_is_not_draggable() {
        let mut surface = RetainedSurface::new(Size::new(100.0, 100.0));
        let h = surface.add_object(SurfaceObject {
            evented: false,
            selectable: false,
            ..rect(0.0, 0.0, Rgba::white())
        });
        surface.drag(Point::new(5.0, 5.0), &[Point::new(50.0, 50.0)]);
        assert_eq!(surface.object(h).unwrap().left, 0.0);
        assert!(!surface.scale_object(h, 2.0, 2.0));
        assert!(
            !surface
                .drain_events()
                .iter()
                .any(|e| matches!(e, SurfaceEvent::ObjectModified(_) | SurfaceEvent::SelectionCreated(_)))
        );
    }

    #[test]
    fn test_pointer_respects_viewport() {
        let mut surface = RetainedSurface::new(Size::new(100.0, 100.0));
        let h = surface.add_object(rect(10.0, 10.0, Rgba::white()));
        surface.set_zoom(2.0);
        surface.pan_viewport(Vec2::new(10.0, 0.0));
        // Canvas (15, 15) is at screen (40, 30).
        surface.pointer_down(Point::new(40.0, 30.0));
        assert_eq!(surface.active_object(), Some(h));
    }

    #[test]
    fn test_text_editing_events() {
        let mut surface = RetainedSurface::new(Size::new(100.0, 100.0));
        let h = surface.add_object(SurfaceObject::new(ObjectKind::Text(crate::surface::TextContent {
            text: String::new(),
            font_size: 10.0,
            font_family: "Inter".to_string(),
            font_weight: "bold".to_string(),
            align: proedit_core::TextAlign::Left,
            char_spacing: 0.0,
            line_height: 1.0,
        })));
        assert!(surface.enter_editing(h));
        surface.type_text("Hi");
        surface.exit_editing();
        assert_eq!(
            surface.drain_events(),
            vec![
                SurfaceEvent::TextChanged(h),
                SurfaceEvent::TextChanged(h),
                SurfaceEvent::ObjectModified(h),
            ]
        );
        assert_eq!(surface.measure(h), Some(Size::new(12.0, 10.0)));
    }

    #[test]
    fn test_reorder() {
        let mut surface = RetainedSurface::new(Size::new(10.0, 10.0));
        let a = surface.add_object(rect(0.0, 0.0, Rgba::white()));
        let b = surface.add_object(rect(0.0, 0.0, Rgba::white()));
        let c = surface.add_object(rect(0.0, 0.0, Rgba::white()));
        surface.reorder(&[c, a]);
        assert_eq!(surface.handles(), vec![b, c, a]);
    }

    #[test]
    fn test_read_pixels_paints_background_and_objects() {
        let mut surface = RetainedSurface::new(Size::new(20.0, 20.0));
        surface.set_background(SurfaceBackground::Color(Rgba::new(0x1a, 0x1a, 0x24, 255)));
        surface.add_object(rect(0.0, 0.0, Rgba::new(255, 0, 0, 255)));
        let hidden = surface.add_object(rect(10.0, 10.0, Rgba::white()));
        surface.object_mut(hidden).unwrap().visible = false;

        let pixels = surface.read_pixels().unwrap();
        assert!(pixels.is_valid());
        assert_eq!(pixels.pixel(5, 5), Some([255, 0, 0, 255]));
        assert_eq!(pixels.pixel(15, 15), Some([0x1a, 0x1a, 0x24, 255]));
    }

    #[test]
    fn test_blend_half_opacity() {
        assert_eq!(blend([0, 0, 0, 255], [255, 255, 255, 255], 0.5), [128, 128, 128, 255]);
    }
}
