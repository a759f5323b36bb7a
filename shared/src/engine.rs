//! The canvas engine: owns the annotation model and the live gesture, routes
//! host events through the state machine and repaints after every change.

use crate::annotation::{Annotation, AnnotationId, AnnotationModel};
use crate::config::EngineConfig;
use crate::geometry::{CanvasSize, Point};
use crate::hit::hit_test;
use crate::interaction::{Context, Interaction, Outcome, TextSession};
use crate::render::{render, Highlight, Scene};
use crate::tool::Tool;

/// Where scenes end up. The browser client paints onto a 2D context; tests
/// record them.
pub trait Surface {
    fn present(&mut self, scene: &Scene);
}

pub type ChangeCallback = Box<dyn FnMut(&[Annotation])>;

/// Whether pointer input should reach the engine for `tool` given the
/// playback state.
pub fn drawing_allowed(tool: Tool, paused: bool, config: &EngineConfig) -> bool {
    if !tool.reaches_engine() {
        return false;
    }
    paused || (tool == Tool::Pointer && !config.gate_pointer_on_playback)
}

pub struct CanvasEngine<S: Surface> {
    surface: S,
    model: AnnotationModel,
    interaction: Interaction,
    tool: Tool,
    drawing_enabled: bool,
    config: EngineConfig,
    hover: Option<AnnotationId>,
    text_serial: u64,
    on_change: Option<ChangeCallback>,
}

impl<S: Surface> CanvasEngine<S> {
    pub fn new(surface: S, config: EngineConfig) -> Self {
        Self {
            surface,
            model: AnnotationModel::new(),
            interaction: Interaction::Idle,
            tool: Tool::default(),
            drawing_enabled: true,
            config,
            hover: None,
            text_serial: 0,
            on_change: None,
        }
    }

    pub fn on_annotation_set_changed(&mut self, callback: impl FnMut(&[Annotation]) + 'static) {
        self.on_change = Some(Box::new(callback));
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn is_drawing_enabled(&self) -> bool {
        self.drawing_enabled
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn text_session(&self) -> Option<&TextSession> {
        self.interaction.text_session()
    }

    pub fn hovered(&self) -> Option<AnnotationId> {
        self.hover
    }

    pub fn list(&self) -> &[Annotation] {
        self.model.list()
    }

    pub fn annotations(&self) -> Vec<Annotation> {
        self.model.to_list()
    }

    /// Switching tools finishes the open gesture first.
    pub fn set_tool(&mut self, tool: Tool) -> Outcome {
        if tool == self.tool {
            return Outcome::Unchanged;
        }
        tracing::debug!(from = %self.tool, to = %tool, "tool changed");
        let outcome = self.step(|interaction, cx| interaction.finish(cx));
        self.tool = tool;
        self.hover = None;
        self.apply(outcome.merge(Outcome::Preview))
    }

    /// Disabling finishes the open gesture; every pointer handler is a no-op
    /// until drawing is enabled again.
    pub fn set_drawing_enabled(&mut self, enabled: bool) -> Outcome {
        if enabled == self.drawing_enabled {
            return Outcome::Unchanged;
        }
        self.drawing_enabled = enabled;
        if enabled {
            return Outcome::Unchanged;
        }
        let outcome = self.step(|interaction, cx| interaction.finish(cx));
        let cleared = if self.hover.take().is_some() {
            Outcome::Preview
        } else {
            Outcome::Unchanged
        };
        self.apply(outcome.merge(cleared))
    }

    fn accepts_pointer(&self) -> bool {
        self.drawing_enabled && self.tool.reaches_engine()
    }

    pub fn pointer_down(&mut self, point: Point) -> Outcome {
        if !self.accepts_pointer() {
            return Outcome::Unchanged;
        }
        let tool = self.tool;
        let outcome = self.step(|interaction, cx| interaction.pointer_down(tool, point, cx));
        if outcome == Outcome::Changed {
            // The hovered shape may be the one just erased.
            self.hover = self.hover.filter(|id| self.model.contains(*id));
        }
        self.apply(outcome)
    }

    pub fn pointer_move(&mut self, point: Point) -> Outcome {
        if !self.accepts_pointer() {
            return Outcome::Unchanged;
        }
        let outcome = self.step(|interaction, cx| interaction.pointer_move(point, cx));
        let hover = self.update_hover(point);
        self.apply(outcome.merge(hover))
    }

    pub fn pointer_up(&mut self) -> Outcome {
        if !self.accepts_pointer() {
            return Outcome::Unchanged;
        }
        let outcome = self.step(|interaction, cx| interaction.pointer_up(cx));
        self.apply(outcome)
    }

    /// Leaving the canvas finalizes like a release and drops the hover.
    pub fn pointer_leave(&mut self) -> Outcome {
        if !self.accepts_pointer() {
            return Outcome::Unchanged;
        }
        let outcome = self.step(|interaction, cx| interaction.pointer_up(cx));
        let cleared = if self.hover.take().is_some() {
            Outcome::Preview
        } else {
            Outcome::Unchanged
        };
        self.apply(outcome.merge(cleared))
    }

    pub fn double_click(&mut self, point: Point) -> Outcome {
        if !self.accepts_pointer() {
            return Outcome::Unchanged;
        }
        let tool = self.tool;
        let outcome = self.step(|interaction, cx| interaction.double_click(tool, point, cx));
        self.hover = None;
        self.apply(outcome)
    }

    pub fn update_text_draft(&mut self, content: &str) -> Outcome {
        self.interaction.update_text_draft(content)
    }

    /// Enter or blur in the host editor.
    pub fn submit_text(&mut self, content: &str) -> Outcome {
        let outcome = self.step(|interaction, cx| interaction.submit_text(content, cx));
        self.apply(outcome)
    }

    /// Escape.
    pub fn cancel(&mut self) -> Outcome {
        let outcome = self.step(|interaction, cx| interaction.cancel(cx));
        self.apply(outcome)
    }

    /// Loads a stored set, dropping any open gesture. The host is not
    /// notified since it supplied the set.
    pub fn replace_all(&mut self, annotations: Vec<Annotation>) {
        self.interaction = Interaction::Idle;
        self.hover = None;
        self.model.replace_all(annotations);
        tracing::debug!(count = self.model.len(), "annotation set replaced");
        self.redraw();
    }

    /// An open re-edit session holds its original outside the model, so it
    /// counts as removed too.
    pub fn clear(&mut self) -> Outcome {
        let reedited = self
            .interaction
            .text_session()
            .is_some_and(|session| session.is_reedit());
        self.interaction = Interaction::Idle;
        self.hover = None;
        let removed = self.model.clear() + usize::from(reedited);
        let outcome = if removed > 0 {
            tracing::debug!(removed, "annotation set cleared");
            Outcome::Changed
        } else {
            Outcome::Preview
        };
        self.apply(outcome)
    }

    /// Changing the raster size while a gesture holds pixel coordinates would
    /// mix two scales, so it is refused until the engine is idle.
    pub fn set_intrinsic_size(&mut self, size: CanvasSize) -> bool {
        if !size.is_valid() {
            return false;
        }
        if !self.interaction.is_idle() {
            tracing::warn!(?size, "resize refused during a gesture");
            return false;
        }
        if size != self.config.intrinsic_size {
            self.config.intrinsic_size = size;
            self.redraw();
        }
        true
    }

    pub fn redraw(&mut self) {
        let highlight = Highlight {
            hovered: self.hover.filter(|_| self.config.hover_highlight),
            selected: self.interaction.dragging_id(),
        };
        let scene = render(
            self.model.list(),
            &self.interaction,
            self.tool,
            highlight,
            &self.config,
        );
        self.surface.present(&scene);
    }

    fn step(
        &mut self,
        transition: impl FnOnce(&mut Interaction, &mut Context<'_>) -> Outcome,
    ) -> Outcome {
        let mut cx = Context {
            model: &mut self.model,
            config: &self.config,
            text_serial: &mut self.text_serial,
        };
        transition(&mut self.interaction, &mut cx)
    }

    fn update_hover(&mut self, point: Point) -> Outcome {
        let hover = if self.config.hover_highlight
            && self.tool.highlights_hover()
            && self.interaction.is_idle()
        {
            hit_test(
                point,
                self.model.list(),
                self.config.intrinsic_size,
                self.config.hit_tolerance,
            )
        } else {
            None
        };
        if hover == self.hover {
            Outcome::Unchanged
        } else {
            self.hover = hover;
            Outcome::Preview
        }
    }

    fn apply(&mut self, outcome: Outcome) -> Outcome {
        if outcome.needs_redraw() {
            self.redraw();
        }
        if outcome == Outcome::Changed {
            if let Some(callback) = self.on_change.as_mut() {
                callback(self.model.list());
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::annotation::Shape;
    use crate::render::DrawCommand;

    #[derive(Default)]
    struct RecordingSurface {
        frames: Vec<Scene>,
    }

    impl Surface for RecordingSurface {
        fn present(&mut self, scene: &Scene) {
            self.frames.push(scene.clone());
        }
    }

    type Notifications = Rc<RefCell<Vec<Vec<Annotation>>>>;

    fn engine(width: f64, height: f64) -> (CanvasEngine<RecordingSurface>, Notifications) {
        let config = EngineConfig {
            intrinsic_size: CanvasSize::new(width, height),
            ..EngineConfig::default()
        };
        let mut engine = CanvasEngine::new(RecordingSurface::default(), config);
        let notifications: Notifications = Rc::default();
        let sink = notifications.clone();
        engine.on_annotation_set_changed(move |set| sink.borrow_mut().push(set.to_vec()));
        (engine, notifications)
    }

    fn frames(engine: &CanvasEngine<RecordingSurface>) -> usize {
        engine.surface().frames.len()
    }

    #[test]
    fn pen_gesture_repaints_each_move_and_notifies_once() {
        let (mut engine, notes) = engine(1920.0, 1080.0);
        engine.set_tool(Tool::Pen);
        let before = frames(&engine);
        engine.pointer_down(Point::new(100.0, 100.0));
        engine.pointer_move(Point::new(120.0, 110.0));
        engine.pointer_move(Point::new(140.0, 130.0));
        engine.pointer_up();
        assert_eq!(frames(&engine) - before, 4);
        assert_eq!(notes.borrow().len(), 1);
        assert_eq!(notes.borrow()[0].len(), 1);
    }

    #[test]
    fn single_point_freehand_does_not_notify() {
        let (mut engine, notes) = engine(1920.0, 1080.0);
        engine.set_tool(Tool::Pen);
        engine.pointer_down(Point::new(100.0, 100.0));
        engine.pointer_up();
        assert!(engine.list().is_empty());
        assert!(notes.borrow().is_empty());
    }

    #[test]
    fn zoom_threshold_controls_commit() {
        let (mut engine, notes) = engine(100.0, 100.0);
        engine.set_tool(Tool::Zoom);
        engine.pointer_down(Point::new(10.0, 10.0));
        engine.pointer_move(Point::new(12.0, 11.0));
        engine.pointer_up();
        assert!(notes.borrow().is_empty());

        engine.pointer_down(Point::new(10.0, 10.0));
        engine.pointer_move(Point::new(20.0, 20.0));
        engine.pointer_up();
        assert_eq!(notes.borrow().len(), 1);
        assert!(matches!(engine.list()[0].shape, Shape::Rect { .. }));
    }

    #[test]
    fn eraser_is_idempotent() {
        let (mut engine, notes) = engine(100.0, 100.0);
        engine.set_tool(Tool::Arrow);
        engine.pointer_down(Point::new(10.0, 50.0));
        engine.pointer_move(Point::new(90.0, 50.0));
        engine.pointer_up();
        engine.set_tool(Tool::Eraser);
        assert_eq!(engine.pointer_down(Point::new(50.0, 52.0)), Outcome::Changed);
        engine.pointer_up();
        assert_eq!(engine.pointer_down(Point::new(50.0, 52.0)), Outcome::Unchanged);
        assert!(engine.list().is_empty());
        assert_eq!(notes.borrow().len(), 2);
    }

    #[test]
    fn drag_notifies_on_release_only() {
        let (mut engine, notes) = engine(1000.0, 1000.0);
        engine.replace_all(vec![Annotation {
            id: AnnotationId::new(7),
            shape: Shape::Arrow {
                start: Point::new(0.1, 0.1),
                end: Point::new(0.2, 0.2),
                color: "#22d3ee".into(),
            },
        }]);
        engine.set_tool(Tool::Hand);
        engine.pointer_down(Point::new(150.0, 150.0));
        engine.pointer_move(Point::new(175.0, 175.0));
        engine.pointer_move(Point::new(200.0, 200.0));
        assert!(notes.borrow().is_empty());
        engine.pointer_up();
        assert_eq!(notes.borrow().len(), 1);
        let Shape::Arrow { start, end, .. } = &notes.borrow()[0][0].shape else {
            panic!("expected arrow");
        };
        assert!((start.x - 0.15).abs() < 1e-9 && (end.y - 0.25).abs() < 1e-9);
        assert_eq!(engine.list()[0].id, AnnotationId::new(7));
    }

    #[test]
    fn dragged_shape_is_outlined() {
        let (mut engine, _) = engine(1000.0, 1000.0);
        engine.replace_all(vec![Annotation {
            id: AnnotationId::new(1),
            shape: Shape::Rect {
                x: 0.1,
                y: 0.1,
                width: 0.2,
                height: 0.2,
                color: "#a78bfa".into(),
                label: None,
            },
        }]);
        engine.set_tool(Tool::Hand);
        engine.pointer_down(Point::new(150.0, 150.0));
        let last = engine.surface().frames.last().unwrap();
        let outlines = last
            .commands
            .iter()
            .filter(|command| matches!(command, DrawCommand::StrokeRect { .. }))
            .count();
        // The rect's own border plus the selection outline.
        assert_eq!(outlines, 2);
    }

    #[test]
    fn disabled_engine_ignores_pointer_input() {
        let (mut engine, notes) = engine(100.0, 100.0);
        engine.set_tool(Tool::Pen);
        engine.set_drawing_enabled(false);
        let before = frames(&engine);
        assert_eq!(engine.pointer_down(Point::new(10.0, 10.0)), Outcome::Unchanged);
        engine.pointer_move(Point::new(50.0, 50.0));
        engine.pointer_up();
        assert_eq!(frames(&engine), before);
        assert!(notes.borrow().is_empty());
        assert!(engine.interaction().is_idle());
    }

    #[test]
    fn disabling_mid_gesture_commits_what_was_drawn() {
        let (mut engine, notes) = engine(100.0, 100.0);
        engine.set_tool(Tool::Pen);
        engine.pointer_down(Point::new(10.0, 10.0));
        engine.pointer_move(Point::new(30.0, 30.0));
        assert_eq!(engine.set_drawing_enabled(false), Outcome::Changed);
        assert_eq!(notes.borrow().len(), 1);
        assert!(engine.interaction().is_idle());
    }

    #[test]
    fn link_tool_never_reaches_the_state_machine() {
        let (mut engine, _) = engine(100.0, 100.0);
        engine.set_tool(Tool::Link);
        assert_eq!(engine.pointer_down(Point::new(10.0, 10.0)), Outcome::Unchanged);
        assert!(engine.interaction().is_idle());
    }

    #[test]
    fn text_edit_flow_keeps_one_annotation() {
        let (mut engine, notes) = engine(1000.0, 1000.0);
        engine.set_tool(Tool::Text);
        engine.pointer_down(Point::new(100.0, 100.0));
        engine.pointer_up();
        assert_eq!(engine.submit_text(""), Outcome::Preview);
        assert!(notes.borrow().is_empty());

        engine.pointer_down(Point::new(100.0, 100.0));
        engine.submit_text("Hello");
        engine.double_click(Point::new(110.0, 110.0));
        assert_eq!(engine.text_session().map(|s| s.draft.as_str()), Some("Hello"));
        engine.submit_text("Hello World");

        assert_eq!(engine.list().len(), 1);
        let Shape::Text { content, .. } = &engine.list()[0].shape else {
            panic!("expected text");
        };
        assert_eq!(content, "Hello World");
        assert_eq!(notes.borrow().len(), 2);
    }

    #[test]
    fn hover_is_tracked_for_pointer_tool() {
        let (mut engine, _) = engine(1000.0, 1000.0);
        engine.replace_all(vec![Annotation {
            id: AnnotationId::new(3),
            shape: Shape::Rect {
                x: 0.1,
                y: 0.1,
                width: 0.2,
                height: 0.2,
                color: "#a78bfa".into(),
                label: None,
            },
        }]);
        let before = frames(&engine);
        assert_eq!(engine.pointer_move(Point::new(200.0, 200.0)), Outcome::Preview);
        assert_eq!(engine.hovered(), Some(AnnotationId::new(3)));
        assert_eq!(engine.pointer_move(Point::new(210.0, 210.0)), Outcome::Unchanged);
        assert_eq!(engine.pointer_leave(), Outcome::Preview);
        assert_eq!(engine.hovered(), None);
        assert_eq!(frames(&engine) - before, 2);
    }

    #[test]
    fn replace_all_does_not_notify_but_clear_does() {
        let (mut engine, notes) = engine(100.0, 100.0);
        engine.replace_all(vec![Annotation {
            id: AnnotationId::new(1),
            shape: Shape::Arrow {
                start: Point::new(0.1, 0.1),
                end: Point::new(0.5, 0.5),
                color: "#22d3ee".into(),
            },
        }]);
        assert!(notes.borrow().is_empty());
        assert_eq!(engine.clear(), Outcome::Changed);
        assert_eq!(notes.borrow().len(), 1);
        assert_eq!(engine.clear(), Outcome::Preview);
        assert_eq!(notes.borrow().len(), 1);
    }

    #[test]
    fn clear_during_reedit_notifies_empty_set() {
        let (mut engine, notes) = engine(1000.0, 1000.0);
        engine.set_tool(Tool::Text);
        engine.pointer_down(Point::new(100.0, 100.0));
        engine.submit_text("Hello");
        assert_eq!(notes.borrow().len(), 1);

        engine.double_click(Point::new(110.0, 110.0));
        assert!(engine.text_session().is_some_and(|session| session.is_reedit()));
        assert_eq!(engine.clear(), Outcome::Changed);

        assert!(engine.text_session().is_none());
        assert!(engine.list().is_empty());
        assert_eq!(notes.borrow().len(), 2);
        assert!(notes.borrow()[1].is_empty());
    }

    #[test]
    fn resize_is_refused_mid_gesture() {
        let (mut engine, _) = engine(100.0, 100.0);
        engine.set_tool(Tool::Arrow);
        engine.pointer_down(Point::new(10.0, 10.0));
        assert!(!engine.set_intrinsic_size(CanvasSize::new(200.0, 200.0)));
        engine.pointer_up();
        assert!(engine.set_intrinsic_size(CanvasSize::new(200.0, 200.0)));
        assert_eq!(engine.config().intrinsic_size, CanvasSize::new(200.0, 200.0));
        assert!(!engine.set_intrinsic_size(CanvasSize::new(0.0, 200.0)));
    }

    #[test]
    fn playback_gate() {
        let config = EngineConfig::default();
        assert!(drawing_allowed(Tool::Pen, true, &config));
        assert!(!drawing_allowed(Tool::Pen, false, &config));
        assert!(drawing_allowed(Tool::Pointer, false, &config));
        assert!(!drawing_allowed(Tool::Link, true, &config));
        let gated = EngineConfig {
            gate_pointer_on_playback: true,
            ..config
        };
        assert!(!drawing_allowed(Tool::Pointer, false, &gated));
    }
}
