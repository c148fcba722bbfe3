//! Tool modes for canvas interaction.

use crate::layers::{Layer, LayerId, path_from_points, simplify_points};
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tolerance used to simplify captured strokes, in canvas pixels.
pub const STROKE_SIMPLIFY_TOLERANCE: f64 = 0.5;

/// Available tools. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    /// Click, drag, resize and rotate unlocked objects.
    #[default]
    Select,
    /// Drag pans the viewport; objects are not interactive.
    Hand,
    /// Freehand strokes in the drawing color.
    Draw,
    /// Freehand strokes in the background color.
    Eraser,
}

impl ToolKind {
    /// Identifier used by the toolbar.
    pub fn id(self) -> &'static str {
        match self {
            ToolKind::Select => "select",
            ToolKind::Hand => "hand",
            ToolKind::Draw => "draw",
            ToolKind::Eraser => "eraser",
        }
    }

    pub fn all() -> &'static [ToolKind] {
        &[ToolKind::Select, ToolKind::Hand, ToolKind::Draw, ToolKind::Eraser]
    }

    /// Check if surface objects respond to pointer input in this mode.
    pub fn objects_interactive(self) -> bool {
        self == ToolKind::Select
    }

    /// Check if this mode captures freehand strokes.
    pub fn is_freehand(self) -> bool {
        matches!(self, ToolKind::Draw | ToolKind::Eraser)
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Error for unknown toolbar identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown tool: {0}")]
pub struct UnknownTool(pub String);

impl FromStr for ToolKind {
    type Err = UnknownTool;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolKind::all()
            .iter()
            .copied()
            .find(|tool| tool.id() == s)
            .ok_or_else(|| UnknownTool(s.to_string()))
    }
}

/// Brush used for a freehand stroke.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeStyle {
    pub color: String,
    pub width: f64,
}

/// Pointer position in both coordinate spaces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    /// Viewport (screen) position.
    pub screen: Point,
    /// Canvas position under the current camera.
    pub canvas: Point,
}

/// Per-mode interaction state.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ToolState {
    #[default]
    Idle,
    /// Hand tool drag; `last` is the previous screen position.
    Panning { last: Point },
    /// Freehand stroke in progress, in canvas coordinates.
    Stroking { points: Vec<Point> },
}

/// Result of finishing a gesture.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    None,
    /// Simplified canvas-space points of a finished stroke.
    Stroke(Vec<Point>),
}

/// Manages the current tool and its gesture state.
#[derive(Debug, Clone, Default)]
pub struct ToolManager {
    current_tool: ToolKind,
    state: ToolState,
}

impl ToolManager {
    /// Create a new tool manager.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_tool(&self) -> ToolKind {
        self.current_tool
    }

    pub fn state(&self) -> &ToolState {
        &self.state
    }

    /// Set the current tool, dropping any gesture of the previous one.
    ///
    /// Returns true if the tool changed.
    pub fn set_tool(&mut self, tool: ToolKind) -> bool {
        if self.current_tool == tool {
            return false;
        }
        if self.is_active() {
            log::debug!("Abandoning {} gesture on switch to {}", self.current_tool, tool);
        }
        self.current_tool = tool;
        self.state = ToolState::Idle;
        true
    }

    /// Begin a gesture. Select mode has no tool-level gesture.
    pub fn begin(&mut self, sample: PointerSample) {
        self.state = match self.current_tool {
            ToolKind::Select => ToolState::Idle,
            ToolKind::Hand => ToolState::Panning { last: sample.screen },
            ToolKind::Draw | ToolKind::Eraser => ToolState::Stroking {
                points: vec![sample.canvas],
            },
        };
    }

    /// Continue the gesture. Returns the viewport pan delta for the hand tool.
    pub fn update(&mut self, sample: PointerSample) -> Option<Vec2> {
        match &mut self.state {
            ToolState::Idle => None,
            ToolState::Panning { last } => {
                let delta = sample.screen - *last;
                *last = sample.screen;
                Some(delta)
            }
            ToolState::Stroking { points } => {
                if points.last() != Some(&sample.canvas) {
                    points.push(sample.canvas);
                }
                None
            }
        }
    }

    /// End the gesture and return any finished stroke.
    pub fn end(&mut self, sample: PointerSample) -> (Option<Vec2>, ToolOutput) {
        let delta = self.update(sample);
        let output = match std::mem::take(&mut self.state) {
            ToolState::Stroking { points } => {
                ToolOutput::Stroke(simplify_points(&points, STROKE_SIMPLIFY_TOLERANCE))
            }
            _ => ToolOutput::None,
        };
        (delta, output)
    }

    /// Cancel the current gesture.
    pub fn cancel(&mut self) {
        self.state = ToolState::Idle;
    }

    pub fn is_active(&self) -> bool {
        self.state != ToolState::Idle
    }
}

/// Turn a finished stroke into a drawing layer positioned at the stroke's
/// top-left corner.
pub fn stroke_to_layer(points: &[Point], style: &StrokeStyle) -> Option<Layer> {
    let (origin, path_data) = path_from_points(points)?;
    let mut layer = Layer::new_drawing(LayerId::generate(), path_data, style.color.clone(), style.width);
    layer.set_position(origin);
    Some(layer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::LayerKind;

    fn sample(x: f64, y: f64) -> PointerSample {
        PointerSample {
            screen: Point::new(x, y),
            canvas: Point::new(x / 2.0, y / 2.0),
        }
    }

    #[test]
    fn test_tool_selection() {
        let mut tm = ToolManager::new();
        assert_eq!(tm.current_tool(), ToolKind::Select);
        assert!(tm.set_tool(ToolKind::Hand));
        assert!(!tm.set_tool(ToolKind::Hand));
        assert_eq!(tm.current_tool(), ToolKind::Hand);
    }

    #[test]
    fn test_tool_ids() {
        for tool in ToolKind::all() {
            assert_eq!(tool.id().parse::<ToolKind>().unwrap(), *tool);
        }
        assert!("lasso".parse::<ToolKind>().is_err());
        assert_eq!(serde_json::to_string(&ToolKind::Eraser).unwrap(), "\"eraser\"");
    }

    #[test]
    fn test_hand_reports_screen_deltas() {
        let mut tm = ToolManager::new();
        tm.set_tool(ToolKind::Hand);
        tm.begin(sample(10.0, 10.0));
        assert_eq!(tm.update(sample(15.0, 30.0)), Some(Vec2::new(5.0, 20.0)));
        let (delta, output) = tm.end(sample(16.0, 30.0));
        assert_eq!(delta, Some(Vec2::new(1.0, 0.0)));
        assert_eq!(output, ToolOutput::None);
        assert!(!tm.is_active());
    }

    #[test]
    fn test_draw_captures_canvas_points() {
        let mut tm = ToolManager::new();
        tm.set_tool(ToolKind::Draw);
        tm.begin(sample(0.0, 0.0));
        tm.update(sample(20.0, 40.0));
        let (delta, output) = tm.end(sample(60.0, 0.0));
        assert!(delta.is_none());
        let ToolOutput::Stroke(points) = output else {
            panic!("expected stroke");
        };
        assert_eq!(points, vec![Point::new(0.0, 0.0), Point::new(10.0, 20.0), Point::new(30.0, 0.0)]);
    }

    #[test]
    fn test_switching_drops_gesture() {
        let mut tm = ToolManager::new();
        tm.set_tool(ToolKind::Draw);
        tm.begin(sample(0.0, 0.0));
        assert!(tm.is_active());
        tm.set_tool(ToolKind::Select);
        assert!(!tm.is_active());
        let (_, output) = tm.end(sample(5.0, 5.0));
        assert_eq!(output, ToolOutput::None);
    }

    #[test]
    fn test_stroke_to_layer() {
        let style = StrokeStyle {
            color: "#ff0000".to_string(),
            width: 3.0,
        };
        let layer = stroke_to_layer(&[Point::new(100.0, 50.0), Point::new(120.0, 80.0)], &style).unwrap();
        assert_eq!(layer.position(), Point::new(100.0, 50.0));
        let LayerKind::Drawing(drawing) = &layer.kind else {
            panic!("expected drawing layer");
        };
        assert_eq!(drawing.stroke_color, "#ff0000");
        assert!((drawing.stroke_width - 3.0).abs() < f64::EPSILON);
        assert!(stroke_to_layer(&[], &style).is_none());
    }
}
