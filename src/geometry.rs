//! Point-list parsing and the small amount of geometry shape nodes need.
//!
//! Point lists arrive as whitespace-separated `x,y` pairs, e.g.
//! `"0,0 5,0 5,5"`.

use serde::Serialize;

use crate::error::{GraphError, Result};

/// A 2D point in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Parse whitespace-separated `x,y` tokens into points.
///
/// Every token must hold exactly two comma-separated floats.
pub fn parse_points(text: &str) -> Result<Vec<Point>> {
    text.split_whitespace().map(parse_point).collect()
}

fn parse_point(token: &str) -> Result<Point> {
    let mut parts = token.split(',');

    let (Some(x), Some(y), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(GraphError::GeometryParse {
            token: token.to_string(),
            message: "expected exactly two comma-separated components".to_string(),
        });
    };

    let component = |raw: &str| {
        raw.trim().parse::<f64>().map_err(|e| GraphError::GeometryParse {
            token: token.to_string(),
            message: format!("'{}' is not a number: {}", raw, e),
        })
    };

    Ok(Point::new(component(x)?, component(y)?))
}

/// Offset every point by `(dx, dy)`.
pub fn translate(points: &[Point], dx: f64, dy: f64) -> Vec<Point> {
    points
        .iter()
        .map(|p| Point::new(p.x + dx, p.y + dy))
        .collect()
}

/// Extent of a point set measured from the origin.
///
/// Width is `|min_x| + |max_x|` where both extremes start at zero, so the
/// origin always counts as part of the shape. This matches how the editor
/// sizes polygon objects (points are relative to the object origin).
pub fn bounds(points: &[Point]) -> (f64, f64) {
    let (mut x1, mut x2, mut y1, mut y2) = (0.0f64, 0.0f64, 0.0f64, 0.0f64);

    for p in points {
        x1 = x1.min(p.x);
        x2 = x2.max(p.x);
        y1 = y1.min(p.y);
        y2 = y2.max(p.y);
    }

    (x1.abs() + x2.abs(), y1.abs() + y2.abs())
}

/// Render points back into the `x,y x,y` text form.
pub fn format_points(points: &[Point]) -> String {
    points
        .iter()
        .map(|p| format!("{},{}", p.x, p.y))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_points() {
        let points = parse_points("0,0 5,0 5,5").unwrap();
        assert_eq!(
            points,
            vec![Point::new(0.0, 0.0), Point::new(5.0, 0.0), Point::new(5.0, 5.0)]
        );
    }

    #[test]
    fn test_parse_points_tolerates_newlines_and_floats() {
        let points = parse_points("\n  -1.5,2.25\n\t3,-4  ").unwrap();
        assert_eq!(points, vec![Point::new(-1.5, 2.25), Point::new(3.0, -4.0)]);
    }

    #[test]
    fn test_parse_points_empty() {
        assert!(parse_points("   ").unwrap().is_empty());
    }

    #[test]
    fn test_parse_points_missing_component() {
        let err = parse_points("0,0 5").unwrap_err();
        assert!(matches!(err, GraphError::GeometryParse { ref token, .. } if token == "5"));
    }

    #[test]
    fn test_parse_points_extra_component() {
        assert!(matches!(
            parse_points("1,2,3"),
            Err(GraphError::GeometryParse { .. })
        ));
    }

    #[test]
    fn test_parse_points_not_a_number() {
        assert!(matches!(
            parse_points("a,1"),
            Err(GraphError::GeometryParse { .. })
        ));
    }

    #[test]
    fn test_translate() {
        let points = parse_points("0,0 5,0 5,5").unwrap();
        let moved = translate(&points, 10.0, 10.0);
        assert_eq!(
            moved,
            vec![
                Point::new(10.0, 10.0),
                Point::new(15.0, 10.0),
                Point::new(15.0, 15.0)
            ]
        );
    }

    #[test]
    fn test_bounds_is_origin_relative() {
        let points = vec![Point::new(-3.0, 2.0), Point::new(4.0, -1.0)];
        assert_eq!(bounds(&points), (7.0, 3.0));
    }

    #[test]
    fn test_bounds_includes_origin() {
        // Minimum-relative extent would be (2, 2); origin-relative is (5, 5).
        let points = vec![Point::new(3.0, 3.0), Point::new(5.0, 5.0)];
        assert_eq!(bounds(&points), (5.0, 5.0));
    }

    #[test]
    fn test_bounds_empty() {
        assert_eq!(bounds(&[]), (0.0, 0.0));
    }

    #[test]
    fn test_format_points() {
        let points = vec![Point::new(1.0, 2.5), Point::new(-3.0, 0.0)];
        assert_eq!(format_points(&points), "1,2.5 -3,0");
    }
}
