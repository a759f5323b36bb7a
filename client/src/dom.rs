use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlCanvasElement, HtmlElement, HtmlInputElement, MouseEvent};

use framereview_shared::{CanvasSize, Point, TextSession, Tool};

pub fn get_element<T: JsCast>(document: &Document, id: &str) -> Result<T, JsValue> {
    let element = document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("Missing element: {id}")))?;
    element
        .dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("Invalid element type: {id}")))
}

pub fn create<T: JsCast>(document: &Document, tag: &str) -> Result<T, JsValue> {
    document
        .create_element(tag)?
        .dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("Invalid element type: {tag}")))
}

pub fn set_pressed(element: &Element, active: bool) {
    let pressed = if active { "true" } else { "false" };
    let _ = element.set_attribute("aria-pressed", pressed);
}

pub fn set_status(status: &Element, state: &str, text: &str) {
    let _ = status.set_attribute("data-state", state);
    status.set_text_content(Some(text));
}

/// Marks the button whose `data-tool` matches `tool`.
pub fn sync_tool_buttons(document: &Document, tool: Tool) {
    let Ok(buttons) = document.query_selector_all("[data-tool]") else {
        return;
    };
    for index in 0..buttons.length() {
        let Some(element) = buttons
            .item(index)
            .and_then(|node| node.dyn_into::<Element>().ok())
        else {
            continue;
        };
        let active = element.get_attribute("data-tool").as_deref() == Some(tool.as_str());
        set_pressed(&element, active);
    }
}

pub fn set_canvas_cursor(canvas: &HtmlCanvasElement, tool: Tool, enabled: bool, dragging: bool) {
    let cursor = if !enabled {
        "not-allowed"
    } else {
        match tool {
            Tool::Hand if dragging => "grabbing",
            Tool::Hand => "grab",
            Tool::Eraser => "cell",
            Tool::Text => "text",
            Tool::Pen | Tool::Arrow | Tool::Zoom => "crosshair",
            Tool::Pointer | Tool::Link => "default",
        }
    };
    let _ = canvas.style().set_property("cursor", cursor);
}

/// Client coordinates to intrinsic canvas pixels. The canvas is stretched by
/// CSS, so the bounding rect gives the display scale.
pub fn event_to_point(canvas: &HtmlCanvasElement, event: &MouseEvent, size: CanvasSize) -> Option<Point> {
    let rect = canvas.get_bounding_client_rect();
    if rect.width() <= 0.0 || rect.height() <= 0.0 {
        return None;
    }
    let x = (event.client_x() as f64 - rect.left()) / rect.width() * size.width;
    let y = (event.client_y() as f64 - rect.top()) / rect.height() * size.height;
    Some(Point::new(x, y))
}

/// Horizontal position of `event` along `track`, as a fraction of its width.
pub fn track_fraction(track: &Element, event: &MouseEvent) -> Option<f64> {
    let rect = track.get_bounding_client_rect();
    if rect.width() <= 0.0 {
        return None;
    }
    Some((event.client_x() as f64 - rect.left()) / rect.width())
}

/// Positions the inline editor over the session anchor, scaled to the
/// displayed canvas.
pub fn place_text_editor(
    editor: &HtmlInputElement,
    canvas: &HtmlCanvasElement,
    session: &TextSession,
    size: CanvasSize,
) {
    let rect = canvas.get_bounding_client_rect();
    let scale = if size.width > 0.0 { rect.width() / size.width } else { 1.0 };
    let style = editor.style();
    let left = session.anchor.x / size.width * 100.0;
    let top = session.anchor.y / size.height * 100.0;
    let _ = style.set_property("left", &format!("{left}%"));
    let _ = style.set_property("top", &format!("{top}%"));
    let _ = style.set_property("font-size", &format!("{}px", session.font_size * scale));
    let _ = style.set_property("color", &session.color);
    editor.set_value(&session.draft);
}

pub fn show_element(element: &HtmlElement, visible: bool) {
    let display = if visible { "block" } else { "none" };
    let _ = element.style().set_property("display", display);
}

pub fn is_text_target(event: &web_sys::Event) -> bool {
    event
        .target()
        .and_then(|target| target.dyn_into::<Element>().ok())
        .map(|element| {
            let tag = element.tag_name();
            tag.eq_ignore_ascii_case("input") || tag.eq_ignore_ascii_case("textarea")
        })
        .unwrap_or(false)
}
