//! Hit testing against the committed annotation set.
//!
//! All tests run in intrinsic canvas pixels. Stored shapes are de-normalized
//! with the canvas size before testing.

use crate::annotation::{Annotation, AnnotationId, Shape};
use crate::geometry::{distance_to_segment, CanvasSize, Point};

pub const DEFAULT_TOLERANCE_PX: f64 = 10.0;

/// Returns the topmost annotation under `point`. The set is walked from the
/// most recently added entry, so later shapes win ties.
pub fn hit_test(
    point: Point,
    annotations: &[Annotation],
    size: CanvasSize,
    tolerance: f64,
) -> Option<AnnotationId> {
    annotations
        .iter()
        .rev()
        .find(|annotation| shape_hit(&annotation.shape, point, size, tolerance))
        .map(|annotation| annotation.id)
}

pub fn shape_hit(shape: &Shape, point: Point, size: CanvasSize, tolerance: f64) -> bool {
    match shape {
        Shape::Arrow { start, end, .. } => {
            distance_to_segment(point, size.denormalize(*start), size.denormalize(*end)) < tolerance
        }
        // Freehand uses the bounding box of its points, padded so a straight
        // stroke still has area.
        Shape::Freehand { .. } => shape
            .pixel_bounds(size)
            .is_some_and(|bounds| bounds.inflate(tolerance / 2.0).contains(point)),
        Shape::Rect { .. } | Shape::Text { .. } => shape
            .pixel_bounds(size)
            .is_some_and(|bounds| bounds.contains(point)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::AnnotationModel;

    const SIZE: CanvasSize = CanvasSize::new(1000.0, 500.0);

    fn rect(x: f64, y: f64, width: f64, height: f64) -> Shape {
        Shape::Rect {
            x,
            y,
            width,
            height,
            color: "#a78bfa".into(),
            label: None,
        }
    }

    #[test]
    fn later_shape_wins_overlap() {
        let mut model = AnnotationModel::new();
        let first = model.commit(rect(0.1, 0.1, 0.3, 0.3)).unwrap();
        let second = model.commit(rect(0.2, 0.2, 0.3, 0.3)).unwrap();
        let inside_both = Point::new(300.0, 150.0);
        assert_eq!(
            hit_test(inside_both, model.list(), SIZE, DEFAULT_TOLERANCE_PX),
            Some(second)
        );
        let only_first = Point::new(120.0, 60.0);
        assert_eq!(
            hit_test(only_first, model.list(), SIZE, DEFAULT_TOLERANCE_PX),
            Some(first)
        );
    }

    #[test]
    fn arrow_uses_segment_tolerance() {
        let shape = Shape::Arrow {
            start: Point::new(0.1, 0.2),
            end: Point::new(0.5, 0.2),
            color: "#22d3ee".into(),
        };
        assert!(shape_hit(&shape, Point::new(300.0, 109.0), SIZE, 10.0));
        assert!(!shape_hit(&shape, Point::new(300.0, 111.0), SIZE, 10.0));
        assert!(!shape_hit(&shape, Point::new(515.0, 100.0), SIZE, 10.0));
    }

    #[test]
    fn text_box_is_approximated_from_length() {
        let shape = Shape::Text {
            x: 0.1,
            y: 0.1,
            content: "Note".into(),
            color: "#f472b6".into(),
            font_size: 20.0,
        };
        // Box spans 4 * 20 * 0.6 = 48 px wide and 30 px tall from (100, 50).
        assert!(shape_hit(&shape, Point::new(147.0, 79.0), SIZE, 10.0));
        assert!(!shape_hit(&shape, Point::new(149.0, 60.0), SIZE, 10.0));
        assert!(!shape_hit(&shape, Point::new(120.0, 81.0), SIZE, 10.0));
    }

    #[test]
    fn freehand_hits_inside_point_bounds() {
        let shape = Shape::Freehand {
            points: vec![Point::new(0.1, 0.1), Point::new(0.2, 0.3), Point::new(0.3, 0.1)],
            color: "#fbbf24".into(),
        };
        assert!(shape_hit(&shape, Point::new(150.0, 100.0), SIZE, 10.0));
        assert!(!shape_hit(&shape, Point::new(350.0, 100.0), SIZE, 10.0));
    }

    #[test]
    fn straight_freehand_stroke_is_hittable() {
        let shape = Shape::Freehand {
            points: vec![Point::new(0.1, 0.2), Point::new(0.2, 0.2), Point::new(0.3, 0.2)],
            color: "#fbbf24".into(),
        };
        // The stroke runs along y = 100 from x = 100 to x = 300.
        assert!(shape_hit(&shape, Point::new(200.0, 103.0), SIZE, 10.0));
        assert!(shape_hit(&shape, Point::new(97.0, 100.0), SIZE, 10.0));
        assert!(!shape_hit(&shape, Point::new(200.0, 107.0), SIZE, 10.0));
    }

    #[test]
    fn miss_returns_none() {
        let mut model = AnnotationModel::new();
        model.commit(rect(0.1, 0.1, 0.1, 0.1)).unwrap();
        assert_eq!(
            hit_test(Point::new(900.0, 400.0), model.list(), SIZE, DEFAULT_TOLERANCE_PX),
            None
        );
        assert_eq!(hit_test(Point::new(0.0, 0.0), &[], SIZE, DEFAULT_TOLERANCE_PX), None);
    }
}
