//! Gesture state machine.
//!
//! Pointer positions arrive in intrinsic canvas pixels. Live gesture state stays
//! in pixels; shapes are normalized only when they are committed to the model.

use crate::annotation::{Annotation, AnnotationId, AnnotationModel, Shape, ZOOM_LABEL};
use crate::config::EngineConfig;
use crate::geometry::{Bounds, CanvasSize, Point};
use crate::hit::{hit_test, shape_hit};
use crate::tool::Tool;

/// What a transition did, from the point of view of the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Outcome {
    /// Nothing visible changed.
    Unchanged,
    /// Live state changed; repaint without notifying the host.
    Preview,
    /// The annotation set changed; repaint and notify the host.
    Changed,
}

impl Outcome {
    pub fn merge(self, other: Outcome) -> Outcome {
        self.max(other)
    }

    pub fn needs_redraw(self) -> bool {
        self != Outcome::Unchanged
    }
}

/// An open inline text editor.
#[derive(Clone, Debug, PartialEq)]
pub struct TextSession {
    /// Increments for every new session so hosts can tell sessions apart.
    pub serial: u64,
    /// Top-left of the text box, intrinsic pixels.
    pub anchor: Point,
    /// Latest content reported by the host editor.
    pub draft: String,
    pub color: String,
    pub font_size: f64,
    /// The annotation being re-edited and the index it was taken from.
    original: Option<(usize, Annotation)>,
}

impl TextSession {
    pub fn is_reedit(&self) -> bool {
        self.original.is_some()
    }

    pub fn original_id(&self) -> Option<AnnotationId> {
        self.original.as_ref().map(|(_, annotation)| annotation.id)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum Interaction {
    #[default]
    Idle,
    DrawingFreehand {
        points: Vec<Point>,
    },
    DrawingArrow {
        start: Point,
        end: Point,
    },
    DrawingZoomRect {
        start: Point,
        end: Point,
    },
    EditingText(TextSession),
    Dragging {
        id: AnnotationId,
        last: Point,
    },
}

/// Everything a transition may read or mutate besides the gesture itself.
pub struct Context<'a> {
    pub model: &'a mut AnnotationModel,
    pub config: &'a EngineConfig,
    pub text_serial: &'a mut u64,
}

impl Context<'_> {
    fn size(&self) -> CanvasSize {
        self.config.intrinsic_size
    }
}

impl Interaction {
    pub fn is_idle(&self) -> bool {
        matches!(self, Interaction::Idle)
    }

    /// True while a pointer is held down for a gesture.
    pub fn is_pointer_gesture(&self) -> bool {
        matches!(
            self,
            Interaction::DrawingFreehand { .. }
                | Interaction::DrawingArrow { .. }
                | Interaction::DrawingZoomRect { .. }
                | Interaction::Dragging { .. }
        )
    }

    pub fn text_session(&self) -> Option<&TextSession> {
        match self {
            Interaction::EditingText(session) => Some(session),
            _ => None,
        }
    }

    pub fn dragging_id(&self) -> Option<AnnotationId> {
        match self {
            Interaction::Dragging { id, .. } => Some(*id),
            _ => None,
        }
    }

    pub fn pointer_down(&mut self, tool: Tool, point: Point, cx: &mut Context<'_>) -> Outcome {
        // A new press finishes whatever was still open, like a blur would.
        let mut outcome = self.finish(cx);
        let font_size = cx.config.font_size;
        let next = match tool {
            Tool::Pointer | Tool::Link => None,
            Tool::Pen => Some(Interaction::DrawingFreehand {
                points: vec![point],
            }),
            Tool::Arrow => Some(Interaction::DrawingArrow {
                start: point,
                end: point,
            }),
            Tool::Zoom => Some(Interaction::DrawingZoomRect {
                start: point,
                end: point,
            }),
            Tool::Text => Some(Interaction::EditingText(new_session(
                cx,
                point,
                String::new(),
                Tool::Text.color().to_string(),
                font_size,
                None,
            ))),
            Tool::Hand => hit_test(point, cx.model.list(), cx.size(), cx.config.hit_tolerance)
                .map(|id| Interaction::Dragging { id, last: point }),
            Tool::Eraser => {
                if let Some(id) =
                    hit_test(point, cx.model.list(), cx.size(), cx.config.hit_tolerance)
                {
                    if cx.model.remove(id).is_some() {
                        tracing::debug!(%id, "erased annotation");
                        outcome = outcome.merge(Outcome::Changed);
                    }
                }
                None
            }
        };
        if let Some(next) = next {
            *self = next;
            outcome = outcome.merge(Outcome::Preview);
        }
        outcome
    }

    pub fn pointer_move(&mut self, point: Point, cx: &mut Context<'_>) -> Outcome {
        match self {
            Interaction::DrawingFreehand { points } => {
                points.push(point);
                Outcome::Preview
            }
            Interaction::DrawingArrow { end, .. } | Interaction::DrawingZoomRect { end, .. } => {
                *end = point;
                Outcome::Preview
            }
            Interaction::Dragging { id, last } => {
                let (dx, dy) = cx.size().normalize_delta(point.x - last.x, point.y - last.y);
                *last = point;
                if cx.model.update(*id, |shape| shape.translate(dx, dy)) {
                    Outcome::Preview
                } else {
                    *self = Interaction::Idle;
                    Outcome::Preview
                }
            }
            Interaction::Idle | Interaction::EditingText(_) => Outcome::Unchanged,
        }
    }

    /// Pointer release. Pointer-leave is routed here as well.
    pub fn pointer_up(&mut self, cx: &mut Context<'_>) -> Outcome {
        if self.is_pointer_gesture() {
            self.finish(cx)
        } else {
            Outcome::Unchanged
        }
    }

    pub fn double_click(&mut self, tool: Tool, point: Point, cx: &mut Context<'_>) -> Outcome {
        let allowed = tool == Tool::Text || (tool == Tool::Pointer && cx.config.pointer_reedit);
        if !allowed {
            return Outcome::Unchanged;
        }
        let size = cx.size();
        let target = cx
            .model
            .list()
            .iter()
            .rev()
            .find(|annotation| {
                matches!(annotation.shape, Shape::Text { .. })
                    && shape_hit(&annotation.shape, point, size, cx.config.hit_tolerance)
            })
            .map(|annotation| annotation.id);
        let Some(id) = target else {
            return Outcome::Unchanged;
        };

        // The clicks that preceded this double-click may have opened an empty
        // session; an empty one is discarded, a non-empty one is committed.
        let mut outcome = self.finish(cx);
        let Some((index, original)) = cx.model.remove(id) else {
            return outcome;
        };
        let fields = match &original.shape {
            Shape::Text {
                x,
                y,
                content,
                color,
                font_size,
            } => Some((
                size.denormalize(Point::new(*x, *y)),
                content.clone(),
                color.clone(),
                *font_size,
            )),
            _ => None,
        };
        let Some((anchor, content, color, font_size)) = fields else {
            cx.model.restore(index, original);
            return outcome;
        };
        let session = new_session(
            cx,
            anchor,
            content,
            color,
            font_size,
            Some((index, original)),
        );
        *self = Interaction::EditingText(session);
        tracing::debug!(%id, "re-opened text annotation");
        outcome = outcome.merge(Outcome::Preview);
        outcome
    }

    pub fn update_text_draft(&mut self, content: &str) -> Outcome {
        match self {
            Interaction::EditingText(session) if session.draft != content => {
                session.draft = content.to_string();
                Outcome::Preview
            }
            _ => Outcome::Unchanged,
        }
    }

    /// Blur or Enter in the host editor.
    pub fn submit_text(&mut self, content: &str, cx: &mut Context<'_>) -> Outcome {
        if let Interaction::EditingText(session) = self {
            session.draft = content.to_string();
        }
        if self.text_session().is_none() {
            return Outcome::Unchanged;
        }
        self.finish(cx)
    }

    /// Escape. Drawing gestures are dropped, a drag keeps what it moved, a text
    /// session puts back the annotation it was editing.
    pub fn cancel(&mut self, cx: &mut Context<'_>) -> Outcome {
        match std::mem::take(self) {
            Interaction::Idle => Outcome::Unchanged,
            Interaction::DrawingFreehand { .. }
            | Interaction::DrawingArrow { .. }
            | Interaction::DrawingZoomRect { .. } => {
                tracing::debug!("gesture cancelled");
                Outcome::Preview
            }
            Interaction::Dragging { .. } => Outcome::Changed,
            Interaction::EditingText(session) => {
                if let Some((index, original)) = session.original {
                    cx.model.restore(index, original);
                }
                Outcome::Preview
            }
        }
    }

    /// Finalizes whatever is in progress as a release would and returns to idle.
    pub fn finish(&mut self, cx: &mut Context<'_>) -> Outcome {
        let size = cx.size();
        match std::mem::take(self) {
            Interaction::Idle => Outcome::Unchanged,
            Interaction::DrawingFreehand { points } => {
                let shape = Shape::Freehand {
                    points: points.into_iter().map(|point| size.normalize(point)).collect(),
                    color: Tool::Pen.color().to_string(),
                };
                commit(cx, shape)
            }
            Interaction::DrawingArrow { start, end } => {
                let shape = Shape::Arrow {
                    start: size.normalize(start),
                    end: size.normalize(end),
                    color: Tool::Arrow.color().to_string(),
                };
                commit(cx, shape)
            }
            Interaction::DrawingZoomRect { start, end } => {
                let bounds = Bounds::from_corners(start, end);
                if bounds.width() <= cx.config.min_zoom_size
                    || bounds.height() <= cx.config.min_zoom_size
                {
                    tracing::debug!(
                        width = bounds.width(),
                        height = bounds.height(),
                        "zoom rectangle below minimum size"
                    );
                    return Outcome::Preview;
                }
                let origin = size.normalize(Point::new(bounds.min_x, bounds.min_y));
                let shape = Shape::Rect {
                    x: origin.x,
                    y: origin.y,
                    width: bounds.width() / size.width,
                    height: bounds.height() / size.height,
                    color: Tool::Zoom.color().to_string(),
                    label: Some(ZOOM_LABEL.to_string()),
                };
                commit(cx, shape)
            }
            Interaction::Dragging { id, .. } => {
                tracing::debug!(%id, "drag finished");
                Outcome::Changed
            }
            Interaction::EditingText(session) => finish_text(session, cx),
        }
    }
}

fn new_session(
    cx: &mut Context<'_>,
    anchor: Point,
    draft: String,
    color: String,
    font_size: f64,
    original: Option<(usize, Annotation)>,
) -> TextSession {
    *cx.text_serial += 1;
    TextSession {
        serial: *cx.text_serial,
        anchor,
        draft,
        color,
        font_size,
        original,
    }
}

fn commit(cx: &mut Context<'_>, shape: Shape) -> Outcome {
    let kind = shape.kind();
    match cx.model.commit(shape) {
        Some(id) => {
            tracing::debug!(%id, kind, "committed annotation");
            Outcome::Changed
        }
        None => Outcome::Preview,
    }
}

fn finish_text(session: TextSession, cx: &mut Context<'_>) -> Outcome {
    let content = session.draft.trim();
    match session.original {
        Some((index, original)) => {
            if content.is_empty() {
                // Empty re-edit keeps the original text.
                cx.model.restore(index, original);
                Outcome::Preview
            } else {
                cx.model.reinsert_text(index, original, content.to_string());
                Outcome::Changed
            }
        }
        None => {
            if content.is_empty() {
                tracing::debug!("empty text session discarded");
                return Outcome::Preview;
            }
            let anchor = cx.size().normalize(session.anchor);
            let shape = Shape::Text {
                x: anchor.x,
                y: anchor.y,
                content: content.to_string(),
                color: session.color,
                font_size: session.font_size,
            };
            commit(cx, shape)
        }
    }
}
