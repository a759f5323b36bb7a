use std::fmt;

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::geometry::{Bounds, CanvasSize, Point};

/// Label painted on committed zoom callouts.
pub const ZOOM_LABEL: &str = "ZOOM";

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct AnnotationId(u64);

impl AnnotationId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shape payload of an annotation. Every positional field is normalized to the
/// intrinsic canvas size that was current when the shape was committed.
#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Shape {
    Freehand {
        points: Vec<Point>,
        color: String,
    },
    Arrow {
        start: Point,
        end: Point,
        color: String,
    },
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        color: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
    Text {
        x: f64,
        y: f64,
        content: String,
        color: String,
        /// Intrinsic pixels, not normalized.
        #[serde(rename = "fontSize")]
        font_size: f64,
    },
}

impl Shape {
    pub fn kind(&self) -> &'static str {
        match self {
            Shape::Freehand { .. } => "freehand",
            Shape::Arrow { .. } => "arrow",
            Shape::Rect { .. } => "rect",
            Shape::Text { .. } => "text",
        }
    }

    pub fn color(&self) -> &str {
        match self {
            Shape::Freehand { color, .. }
            | Shape::Arrow { color, .. }
            | Shape::Rect { color, .. }
            | Shape::Text { color, .. } => color,
        }
    }

    /// Degenerate shapes are never committed.
    pub fn is_degenerate(&self) -> bool {
        match self {
            Shape::Freehand { points, .. } => points.len() < 2,
            Shape::Arrow { start, end, .. } => start == end,
            Shape::Rect { width, height, .. } => *width <= 0.0 || *height <= 0.0,
            Shape::Text { content, .. } => content.trim().is_empty(),
        }
    }

    pub fn is_finite(&self) -> bool {
        match self {
            Shape::Freehand { points, .. } => points.iter().all(|point| point.is_finite()),
            Shape::Arrow { start, end, .. } => start.is_finite() && end.is_finite(),
            Shape::Rect {
                x,
                y,
                width,
                height,
                ..
            } => x.is_finite() && y.is_finite() && width.is_finite() && height.is_finite(),
            Shape::Text { x, y, font_size, .. } => {
                x.is_finite() && y.is_finite() && font_size.is_finite()
            }
        }
    }

    /// Moves every coordinate-bearing field by a normalized delta.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        match self {
            Shape::Freehand { points, .. } => {
                for point in points.iter_mut() {
                    *point = point.offset(dx, dy);
                }
            }
            Shape::Arrow { start, end, .. } => {
                *start = start.offset(dx, dy);
                *end = end.offset(dx, dy);
            }
            Shape::Rect { x, y, .. } | Shape::Text { x, y, .. } => {
                *x += dx;
                *y += dy;
            }
        }
    }

    /// Bounding box in intrinsic pixels. Text uses the monospace heuristic:
    /// width = chars * font size * 0.6, height = font size * 1.5.
    pub fn pixel_bounds(&self, size: CanvasSize) -> Option<Bounds> {
        match self {
            Shape::Freehand { points, .. } => {
                let pixels = points
                    .iter()
                    .map(|point| size.denormalize(*point))
                    .collect::<Vec<_>>();
                Bounds::from_points(&pixels)
            }
            Shape::Arrow { start, end, .. } => Some(Bounds::from_corners(
                size.denormalize(*start),
                size.denormalize(*end),
            )),
            Shape::Rect {
                x,
                y,
                width,
                height,
                ..
            } => {
                let origin = size.denormalize(Point::new(*x, *y));
                let extent = size.denormalize(Point::new(*x + *width, *y + *height));
                Some(Bounds::from_corners(origin, extent))
            }
            Shape::Text {
                x,
                y,
                content,
                font_size,
                ..
            } => {
                let origin = size.denormalize(Point::new(*x, *y));
                let (width, height) = text_extent(content, *font_size);
                Some(Bounds {
                    min_x: origin.x,
                    min_y: origin.y,
                    max_x: origin.x + width,
                    max_y: origin.y + height,
                })
            }
        }
    }
}

pub fn text_extent(content: &str, font_size: f64) -> (f64, f64) {
    let chars = content.chars().count() as f64;
    (chars * font_size * 0.6, font_size * 1.5)
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq)]
pub struct Annotation {
    pub id: AnnotationId,
    #[serde(flatten)]
    pub shape: Shape,
}

/// The ordered annotation set. Insertion order is paint order and hit priority.
#[derive(Clone, Debug)]
pub struct AnnotationModel {
    annotations: Vec<Annotation>,
    next_id: u64,
}

impl Default for AnnotationModel {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnotationModel {
    pub fn new() -> Self {
        Self {
            annotations: Vec::new(),
            next_id: 1,
        }
    }

    pub fn from_annotations(annotations: Vec<Annotation>) -> Self {
        let mut model = Self::new();
        model.replace_all(annotations);
        model
    }

    /// Appends a shape under a fresh id. Degenerate shapes are dropped.
    pub fn commit(&mut self, shape: Shape) -> Option<AnnotationId> {
        if shape.is_degenerate() {
            tracing::debug!(kind = shape.kind(), "dropping degenerate shape");
            return None;
        }
        let id = self.fresh_id();
        self.annotations.push(Annotation { id, shape });
        Some(id)
    }

    /// `next_id` saturates at `u64::MAX`; once that id is taken, the lowest
    /// unused id is handed out instead.
    fn fresh_id(&mut self) -> AnnotationId {
        let candidate = AnnotationId(self.next_id);
        if !self.contains(candidate) {
            self.next_id = self.next_id.saturating_add(1);
            return candidate;
        }
        let mut id = 1;
        while self.contains(AnnotationId(id)) {
            id += 1;
        }
        AnnotationId(id)
    }

    /// Removes and returns the annotation together with the index it occupied.
    pub fn remove(&mut self, id: AnnotationId) -> Option<(usize, Annotation)> {
        let index = self.index_of(id)?;
        Some((index, self.annotations.remove(index)))
    }

    /// Puts a previously removed annotation back at `index`, keeping its id.
    pub fn restore(&mut self, index: usize, annotation: Annotation) {
        if self.contains(annotation.id) {
            return;
        }
        self.next_id = self.next_id.max(annotation.id.0.saturating_add(1));
        let index = index.min(self.annotations.len());
        self.annotations.insert(index, annotation);
    }

    /// Replaces the content of an existing Text annotation in place.
    pub fn reinsert_text(&mut self, index: usize, mut original: Annotation, content: String) {
        if let Shape::Text {
            content: current, ..
        } = &mut original.shape
        {
            *current = content;
        }
        self.restore(index, original);
    }

    /// Applies `mutator` to the shape; returns false when the id is unknown.
    /// The variant of the shape is preserved even if the mutator swaps it.
    pub fn update(&mut self, id: AnnotationId, mutator: impl FnOnce(&mut Shape)) -> bool {
        let Some(annotation) = self.annotations.iter_mut().find(|item| item.id == id) else {
            return false;
        };
        let mut shape = annotation.shape.clone();
        mutator(&mut shape);
        if std::mem::discriminant(&shape) == std::mem::discriminant(&annotation.shape) {
            annotation.shape = shape;
        }
        true
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|item| item.id == id)
    }

    pub fn contains(&self, id: AnnotationId) -> bool {
        self.index_of(id).is_some()
    }

    pub fn index_of(&self, id: AnnotationId) -> Option<usize> {
        self.annotations.iter().position(|item| item.id == id)
    }

    pub fn list(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn to_list(&self) -> Vec<Annotation> {
        self.annotations.clone()
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn clear(&mut self) -> usize {
        let removed = self.annotations.len();
        self.annotations.clear();
        removed
    }

    /// Adopts an externally supplied set. Non-finite and degenerate entries and
    /// duplicate ids are dropped; fresh ids continue after the largest one kept.
    pub fn replace_all(&mut self, annotations: Vec<Annotation>) {
        let mut kept: Vec<Annotation> = Vec::with_capacity(annotations.len());
        for annotation in annotations {
            if !annotation.shape.is_finite() || annotation.shape.is_degenerate() {
                continue;
            }
            if kept.iter().any(|item| item.id == annotation.id) {
                continue;
            }
            kept.push(annotation);
        }
        let max_id = kept.iter().map(|item| item.id.0).max().unwrap_or(0);
        self.next_id = self.next_id.max(max_id.saturating_add(1));
        self.annotations = kept;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arrow(start: (f64, f64), end: (f64, f64)) -> Shape {
        Shape::Arrow {
            start: Point::new(start.0, start.1),
            end: Point::new(end.0, end.1),
            color: "#22d3ee".into(),
        }
    }

    #[test]
    fn commit_assigns_fresh_ids_in_order() {
        let mut model = AnnotationModel::new();
        let a = model.commit(arrow((0.1, 0.1), (0.2, 0.2))).unwrap();
        let b = model.commit(arrow((0.3, 0.3), (0.4, 0.4))).unwrap();
        assert_ne!(a, b);
        let ids = model.list().iter().map(|item| item.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn single_point_freehand_is_not_committed() {
        let mut model = AnnotationModel::new();
        let shape = Shape::Freehand {
            points: vec![Point::new(0.5, 0.5)],
            color: "#fbbf24".into(),
        };
        assert!(model.commit(shape).is_none());
        assert!(model.is_empty());
    }

    #[test]
    fn remove_missing_id_is_a_no_op() {
        let mut model = AnnotationModel::new();
        let id = model.commit(arrow((0.1, 0.1), (0.2, 0.2))).unwrap();
        assert!(model.remove(id).is_some());
        assert!(model.remove(id).is_none());
        assert!(model.is_empty());
    }

    #[test]
    fn update_keeps_identity_and_variant() {
        let mut model = AnnotationModel::new();
        let id = model.commit(arrow((0.1, 0.1), (0.2, 0.2))).unwrap();
        assert!(model.update(id, |shape| shape.translate(0.05, 0.05)));
        assert!(model.update(id, |shape| {
            *shape = Shape::Text {
                x: 0.0,
                y: 0.0,
                content: "swap".into(),
                color: "#fff".into(),
                font_size: 12.0,
            }
        }));
        let Shape::Arrow { start, end, .. } = &model.get(id).unwrap().shape else {
            panic!("variant changed");
        };
        assert!((start.x - 0.15).abs() < 1e-9);
        assert!((end.y - 0.25).abs() < 1e-9);
        assert!(!model.update(AnnotationId::new(99), |_| {}));
    }

    #[test]
    fn restore_puts_annotation_back_at_its_index() {
        let mut model = AnnotationModel::new();
        let a = model.commit(arrow((0.1, 0.1), (0.2, 0.2))).unwrap();
        let b = model.commit(arrow((0.3, 0.3), (0.4, 0.4))).unwrap();
        let (index, removed) = model.remove(a).unwrap();
        model.restore(index, removed);
        assert_eq!(model.list()[0].id, a);
        assert_eq!(model.list()[1].id, b);
    }

    #[test]
    fn replace_all_filters_and_continues_ids() {
        let mut model = AnnotationModel::new();
        model.replace_all(vec![
            Annotation {
                id: AnnotationId::new(7),
                shape: arrow((0.1, 0.1), (0.2, 0.2)),
            },
            Annotation {
                id: AnnotationId::new(8),
                shape: arrow((f64::NAN, 0.1), (0.2, 0.2)),
            },
            Annotation {
                id: AnnotationId::new(7),
                shape: arrow((0.5, 0.5), (0.6, 0.6)),
            },
        ]);
        assert_eq!(model.len(), 1);
        let next = model.commit(arrow((0.0, 0.0), (0.1, 0.0))).unwrap();
        assert_eq!(next, AnnotationId::new(8));
    }

    #[test]
    fn max_id_from_json_does_not_overflow_allocation() {
        let set: Vec<Annotation> = serde_json::from_str(
            r##"[{"id":18446744073709551615,"type":"arrow","start":{"x":0.1,"y":0.1},"end":{"x":0.5,"y":0.5},"color":"#fff"}]"##,
        )
        .unwrap();
        let mut model = AnnotationModel::new();
        model.replace_all(set);
        assert_eq!(model.len(), 1);

        let first = model.commit(arrow((0.2, 0.2), (0.3, 0.3))).unwrap();
        let second = model.commit(arrow((0.3, 0.3), (0.4, 0.4))).unwrap();
        assert_ne!(first, AnnotationId::new(u64::MAX));
        assert_ne!(first, second);
        assert_eq!(model.len(), 3);

        let (index, removed) = model.remove(AnnotationId::new(u64::MAX)).unwrap();
        model.restore(index, removed);
        assert!(model.contains(AnnotationId::new(u64::MAX)));
    }

    #[test]
    fn text_bounds_follow_monospace_heuristic() {
        let shape = Shape::Text {
            x: 0.0,
            y: 0.0,
            content: "Hello".into(),
            color: "#f472b6".into(),
            font_size: 20.0,
        };
        let bounds = shape.pixel_bounds(CanvasSize::new(100.0, 100.0)).unwrap();
        assert!((bounds.width() - 60.0).abs() < 1e-9);
        assert!((bounds.height() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn json_shape_is_tagged_and_flattened() {
        let annotation = Annotation {
            id: AnnotationId::new(3),
            shape: Shape::Text {
                x: 0.25,
                y: 0.5,
                content: "Hi".into(),
                color: "#f472b6".into(),
                font_size: 24.0,
            },
        };
        let value = serde_json::to_value(&annotation).unwrap();
        assert_eq!(value["id"], 3);
        assert_eq!(value["type"], "text");
        assert_eq!(value["fontSize"], 24.0);
        let parsed: Annotation = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, annotation);
    }
}
