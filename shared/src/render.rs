//! Scene building. The renderer is a pure function from the committed set and
//! the live gesture to a list of draw commands in intrinsic pixels; the host
//! replays the list onto its surface after clearing it.

use std::f64::consts::PI;

use crate::annotation::{Annotation, AnnotationId, Shape, ZOOM_LABEL};
use crate::config::EngineConfig;
use crate::geometry::{arrowhead, Bounds, CanvasSize, Point};
use crate::interaction::Interaction;
use crate::tool::Tool;

pub const HOVER_COLOR: &str = "rgba(255, 255, 255, 0.65)";
pub const SELECTED_COLOR: &str = "rgba(255, 255, 255, 0.95)";
pub const ZOOM_FILL: &str = "rgba(167, 139, 250, 0.12)";
pub const LABEL_FONT_SIZE: f64 = 14.0;
const ARROWHEAD_SPREAD: f64 = PI / 6.0;
const HIGHLIGHT_PADDING: f64 = 6.0;
const PREVIEW_DASH: [f64; 2] = [8.0, 6.0];
const HIGHLIGHT_DASH: [f64; 2] = [4.0, 4.0];

#[derive(Clone, Debug, PartialEq)]
pub struct StrokeStyle {
    pub color: String,
    pub width: f64,
    pub dash: Option<[f64; 2]>,
}

impl StrokeStyle {
    fn solid(color: &str, width: f64) -> Self {
        Self {
            color: color.to_string(),
            width,
            dash: None,
        }
    }

    fn dashed(color: &str, width: f64, dash: [f64; 2]) -> Self {
        Self {
            color: color.to_string(),
            width,
            dash: Some(dash),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    Clear {
        width: f64,
        height: f64,
    },
    Polyline {
        points: Vec<Point>,
        style: StrokeStyle,
    },
    Line {
        from: Point,
        to: Point,
        style: StrokeStyle,
    },
    StrokeRect {
        bounds: Bounds,
        style: StrokeStyle,
    },
    FillRect {
        bounds: Bounds,
        color: String,
    },
    /// `at` is the top-left corner of the text box.
    Text {
        at: Point,
        content: String,
        color: String,
        font_size: f64,
    },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scene {
    pub commands: Vec<DrawCommand>,
}

impl Scene {
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }
}

/// Ids that get an outline on top of their shape.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Highlight {
    pub hovered: Option<AnnotationId>,
    pub selected: Option<AnnotationId>,
}

pub fn render(
    annotations: &[Annotation],
    interaction: &Interaction,
    tool: Tool,
    highlight: Highlight,
    config: &EngineConfig,
) -> Scene {
    let size = config.intrinsic_size;
    let mut scene = Scene::default();
    scene.push(DrawCommand::Clear {
        width: size.width,
        height: size.height,
    });

    for annotation in annotations {
        paint_shape(&mut scene, &annotation.shape, size, config);
        let outline = if highlight.selected == Some(annotation.id) {
            Some(StrokeStyle::solid(SELECTED_COLOR, 1.5))
        } else if tool.highlights_hover() && highlight.hovered == Some(annotation.id) {
            Some(StrokeStyle::dashed(HOVER_COLOR, 1.5, HIGHLIGHT_DASH))
        } else {
            None
        };
        if let (Some(style), Some(bounds)) = (outline, annotation.shape.pixel_bounds(size)) {
            scene.push(DrawCommand::StrokeRect {
                bounds: bounds.inflate(HIGHLIGHT_PADDING),
                style,
            });
        }
    }

    paint_preview(&mut scene, interaction, config);
    scene
}

fn paint_shape(scene: &mut Scene, shape: &Shape, size: CanvasSize, config: &EngineConfig) {
    match shape {
        Shape::Freehand { points, color } => {
            scene.push(DrawCommand::Polyline {
                points: points.iter().map(|point| size.denormalize(*point)).collect(),
                style: StrokeStyle::solid(color, config.stroke_width),
            });
        }
        Shape::Arrow { start, end, color } => {
            paint_arrow(
                scene,
                size.denormalize(*start),
                size.denormalize(*end),
                color,
                config,
            );
        }
        Shape::Rect { color, label, .. } => {
            let Some(bounds) = shape.pixel_bounds(size) else {
                return;
            };
            scene.push(DrawCommand::FillRect {
                bounds,
                color: ZOOM_FILL.to_string(),
            });
            scene.push(DrawCommand::StrokeRect {
                bounds,
                style: StrokeStyle::solid(color, config.stroke_width),
            });
            if let Some(label) = label {
                paint_label(scene, bounds, label, color);
            }
        }
        Shape::Text {
            x,
            y,
            content,
            color,
            font_size,
        } => {
            scene.push(DrawCommand::Text {
                at: size.denormalize(Point::new(*x, *y)),
                content: content.clone(),
                color: color.clone(),
                font_size: *font_size,
            });
        }
    }
}

fn paint_arrow(scene: &mut Scene, start: Point, end: Point, color: &str, config: &EngineConfig) {
    let style = StrokeStyle::solid(color, config.stroke_width);
    scene.push(DrawCommand::Line {
        from: start,
        to: end,
        style: style.clone(),
    });
    for wing in arrowhead(start, end, config.arrowhead_length, ARROWHEAD_SPREAD) {
        scene.push(DrawCommand::Line {
            from: end,
            to: wing,
            style: style.clone(),
        });
    }
}

fn paint_label(scene: &mut Scene, bounds: Bounds, label: &str, color: &str) {
    let above = bounds.min_y - LABEL_FONT_SIZE * 1.5;
    let y = if above < 0.0 { bounds.min_y + 4.0 } else { above };
    scene.push(DrawCommand::Text {
        at: Point::new(bounds.min_x, y),
        content: label.to_string(),
        color: color.to_string(),
        font_size: LABEL_FONT_SIZE,
    });
}

fn paint_preview(scene: &mut Scene, interaction: &Interaction, config: &EngineConfig) {
    match interaction {
        Interaction::DrawingFreehand { points } if points.len() > 1 => {
            scene.push(DrawCommand::Polyline {
                points: points.clone(),
                style: StrokeStyle::solid(Tool::Pen.color(), config.stroke_width),
            });
        }
        Interaction::DrawingArrow { start, end } if start != end => {
            paint_arrow(scene, *start, *end, Tool::Arrow.color(), config);
        }
        Interaction::DrawingZoomRect { start, end } => {
            let bounds = Bounds::from_corners(*start, *end);
            let color = Tool::Zoom.color();
            scene.push(DrawCommand::StrokeRect {
                bounds,
                style: StrokeStyle::dashed(color, 2.0, PREVIEW_DASH),
            });
            paint_label(scene, bounds, ZOOM_LABEL, color);
        }
        _ => {}
    }
}
