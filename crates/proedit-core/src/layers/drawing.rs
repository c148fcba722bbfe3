//! Freehand drawing layer payload.

use kurbo::{BezPath, Point, Rect, Shape as KurboShape, Vec2};
use serde::{Deserialize, Serialize};

/// A freehand stroke stored as SVG path data.
///
/// Path coordinates are relative to the layer's `(x, y)` origin so the
/// drawing can be moved without rewriting the path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawingLayer {
    pub path_data: String,
    pub stroke_color: String,
    pub stroke_width: f64,
}

impl DrawingLayer {
    /// Parse the stored path data.
    pub fn path(&self) -> Result<BezPath, kurbo::SvgParseError> {
        BezPath::from_svg(&self.path_data)
    }

    /// Bounds of the path in layer-local coordinates.
    pub fn bounds(&self) -> Option<Rect> {
        let path = self.path().ok()?;
        if path.elements().is_empty() {
            return None;
        }
        Some(path.bounding_box())
    }
}

/// Build layer-relative path data from canvas-space stroke points.
///
/// Returns the layer origin (top-left of the stroke bounds) and the path
/// data, or `None` when there are no points.
pub fn path_from_points(points: &[Point]) -> Option<(Point, String)> {
    let first = *points.first()?;
    let origin = points.iter().fold(first, |acc, p| Point::new(acc.x.min(p.x), acc.y.min(p.y)));
    let shift = -origin.to_vec2();

    let mut path = BezPath::new();
    path.move_to(first + shift);
    if points.len() == 1 {
        // A single click still leaves a dot.
        path.line_to(first + shift);
    }
    for point in points.iter().skip(1) {
        path.line_to(*point + shift);
    }
    Some((origin, path.to_svg()))
}

/// Ramer-Douglas-Peucker line simplification.
pub fn simplify_points(points: &[Point], tolerance: f64) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let first = points[0];
    let last = points[points.len() - 1];

    let mut max_dist = 0.0;
    let mut max_index = 0;
    for (i, point) in points.iter().enumerate().skip(1).take(points.len() - 2) {
        let dist = perpendicular_distance(*point, first, last);
        if dist > max_dist {
            max_dist = dist;
            max_index = i;
        }
    }

    if max_dist > tolerance {
        let mut left = simplify_points(&points[..=max_index], tolerance);
        let right = simplify_points(&points[max_index..], tolerance);
        left.pop();
        left.extend(right);
        left
    } else {
        vec![first, last]
    }
}

fn perpendicular_distance(point: Point, line_start: Point, line_end: Point) -> f64 {
    let line: Vec2 = line_end - line_start;
    let len_sq = line.hypot2();
    if len_sq < f64::EPSILON {
        return (point - line_start).hypot();
    }
    (point - line_start).cross(line).abs() / len_sq.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_from_points_is_relative() {
        let points = [Point::new(110.0, 220.0), Point::new(150.0, 200.0), Point::new(130.0, 260.0)];
        let (origin, data) = path_from_points(&points).unwrap();
        assert_eq!(origin, Point::new(110.0, 200.0));

        let drawing = DrawingLayer {
            path_data: data,
            stroke_color: "#ffffff".to_string(),
            stroke_width: 3.0,
        };
        let bounds = drawing.bounds().unwrap();
        assert!(bounds.x0.abs() < 1e-9 && bounds.y0.abs() < 1e-9);
        assert!((bounds.width() - 40.0).abs() < 1e-9);
        assert!((bounds.height() - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_path_from_no_points() {
        assert!(path_from_points(&[]).is_none());
        assert!(path_from_points(&[Point::new(3.0, 4.0)]).is_some());
    }

    #[test]
    fn test_simplify() {
        let points = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.1),
            Point::new(2.0, 0.0),
            Point::new(3.0, 0.1),
            Point::new(4.0, 0.0),
        ];
        assert!(simplify_points(&points, 0.5).len() < 5);
        assert_eq!(simplify_points(&points, 0.01).len(), 5);
    }

    #[test]
    fn test_bad_path_data_has_no_bounds() {
        let drawing = DrawingLayer {
            path_data: "not a path".to_string(),
            stroke_color: "#000".to_string(),
            stroke_width: 1.0,
        };
        assert!(drawing.bounds().is_none());
    }
}
