use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use framereview_shared::render::{DrawCommand, Scene, StrokeStyle};
use framereview_shared::Surface;

/// Replays scenes onto the annotation canvas.
pub struct CanvasSurface {
    ctx: CanvasRenderingContext2d,
}

impl CanvasSurface {
    pub fn new(ctx: CanvasRenderingContext2d) -> Self {
        ctx.set_line_cap("round");
        ctx.set_line_join("round");
        ctx.set_text_baseline("top");
        Self { ctx }
    }

    fn apply_stroke(&self, style: &StrokeStyle) {
        self.ctx.set_stroke_style_str(&style.color);
        self.ctx.set_line_width(style.width);
        let dash = match style.dash {
            Some([on, off]) => js_sys::Array::of2(&JsValue::from(on), &JsValue::from(off)),
            None => js_sys::Array::new(),
        };
        let _ = self.ctx.set_line_dash(&dash);
    }
}

impl Surface for CanvasSurface {
    fn present(&mut self, scene: &Scene) {
        let ctx = &self.ctx;
        for command in &scene.commands {
            match command {
                DrawCommand::Clear { width, height } => {
                    ctx.clear_rect(0.0, 0.0, *width, *height);
                }
                DrawCommand::Polyline { points, style } => {
                    let Some((first, rest)) = points.split_first() else {
                        continue;
                    };
                    self.apply_stroke(style);
                    ctx.begin_path();
                    ctx.move_to(first.x, first.y);
                    for point in rest {
                        ctx.line_to(point.x, point.y);
                    }
                    ctx.stroke();
                }
                DrawCommand::Line { from, to, style } => {
                    self.apply_stroke(style);
                    ctx.begin_path();
                    ctx.move_to(from.x, from.y);
                    ctx.line_to(to.x, to.y);
                    ctx.stroke();
                }
                DrawCommand::StrokeRect { bounds, style } => {
                    self.apply_stroke(style);
                    ctx.stroke_rect(bounds.min_x, bounds.min_y, bounds.width(), bounds.height());
                }
                DrawCommand::FillRect { bounds, color } => {
                    ctx.set_fill_style_str(color);
                    ctx.fill_rect(bounds.min_x, bounds.min_y, bounds.width(), bounds.height());
                }
                DrawCommand::Text {
                    at,
                    content,
                    color,
                    font_size,
                } => {
                    // Monospace keeps glyph widths close to the hit-test box.
                    ctx.set_font(&format!("{font_size}px monospace"));
                    ctx.set_fill_style_str(color);
                    let _ = ctx.fill_text(content, at.x, at.y);
                }
            }
        }
        let _ = ctx.set_line_dash(&js_sys::Array::new());
    }
}
