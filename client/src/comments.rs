//! Comment sidebar, timeline markers, spatial pins and the asset picker list.
//! Items carry `data-*` attributes; clicks are resolved by the delegated
//! listeners in `app`.

use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, HtmlElement};

use framereview_shared::comment::{format_clock, format_timecode, visible_spatial};
use framereview_shared::media::filter_assets;
use framereview_shared::{Asset, Comment, CommentId};

use crate::dom::create;

pub fn render_comment_list(
    document: &Document,
    list: &Element,
    comments: &[Comment],
    selected: Option<CommentId>,
) -> Result<(), JsValue> {
    list.set_inner_html("");
    if comments.is_empty() {
        let empty: HtmlElement = create(document, "li")?;
        empty.set_class_name("comment-empty");
        empty.set_text_content(Some("No comments yet"));
        list.append_child(&empty)?;
        return Ok(());
    }
    for comment in comments {
        let item = comment_item(document, comment, selected == Some(comment.id))?;
        list.append_child(&item)?;
    }
    Ok(())
}

fn comment_item(document: &Document, comment: &Comment, selected: bool) -> Result<HtmlElement, JsValue> {
    let item: HtmlElement = create(document, "li")?;
    item.set_class_name("comment");
    item.set_attribute("data-comment-id", &comment.id.to_string())?;
    item.set_attribute("data-kind", comment.kind.as_str())?;
    if comment.resolved {
        item.class_list().add_1("resolved")?;
    }
    if selected {
        item.class_list().add_1("selected")?;
    }

    let header: HtmlElement = create(document, "div")?;
    header.set_class_name("comment-header");
    let avatar: HtmlElement = create(document, "span")?;
    avatar.set_class_name("avatar");
    avatar.set_text_content(Some(&comment.author.initials));
    avatar.set_title(&comment.author.name);
    let dot: HtmlElement = create(document, "span")?;
    dot.set_class_name("marker-dot");
    dot.style().set_property("background", comment.kind.marker_color())?;
    let time: HtmlElement = create(document, "button")?;
    time.set_class_name("comment-time");
    time.set_attribute("data-action", "seek")?;
    time.set_text_content(Some(&format_clock(comment.time)));
    header.append_child(&avatar)?;
    header.append_child(&dot)?;
    header.append_child(&time)?;

    let text: HtmlElement = create(document, "p")?;
    text.set_class_name("comment-text");
    text.set_text_content(Some(&comment.text));

    item.append_child(&header)?;
    item.append_child(&text)?;

    if let Some(link) = &comment.link {
        let anchor: HtmlElement = create(document, "a")?;
        anchor.set_attribute("href", link)?;
        anchor.set_attribute("target", "_blank")?;
        anchor.set_attribute("rel", "noopener")?;
        anchor.set_text_content(Some("Open attachment"));
        item.append_child(&anchor)?;
    }
    if !comment.annotations.is_empty() {
        let badge: HtmlElement = create(document, "span")?;
        badge.set_class_name("annotation-count");
        badge.set_text_content(Some(&format!("{} annotations", comment.annotations.len())));
        item.append_child(&badge)?;
    }

    let actions: HtmlElement = create(document, "div")?;
    actions.set_class_name("comment-actions");
    let resolve: HtmlElement = create(document, "button")?;
    resolve.set_attribute("data-action", "resolve")?;
    resolve.set_text_content(Some(if comment.resolved { "Reopen" } else { "Resolve" }));
    let delete: HtmlElement = create(document, "button")?;
    delete.set_attribute("data-action", "delete")?;
    delete.set_text_content(Some("Delete"));
    actions.append_child(&resolve)?;
    actions.append_child(&delete)?;
    item.append_child(&actions)?;
    Ok(item)
}

/// Markers along the scrubber, positioned by time.
pub fn render_markers(document: &Document, timeline: &Element, comments: &[Comment], duration: f64) -> Result<(), JsValue> {
    timeline.set_inner_html("");
    if !duration.is_finite() || duration <= 0.0 {
        return Ok(());
    }
    for comment in comments {
        let marker: HtmlElement = create(document, "button")?;
        marker.set_class_name("timeline-marker");
        marker.set_attribute("data-comment-id", &comment.id.to_string())?;
        marker.set_attribute("data-action", "seek")?;
        marker.set_title(&format!("{} {}", format_timecode(comment.time), comment.text));
        let left = (comment.time / duration * 100.0).clamp(0.0, 100.0);
        let style = marker.style();
        style.set_property("left", &format!("{left}%"))?;
        style.set_property("background", comment.kind.marker_color())?;
        timeline.append_child(&marker)?;
    }
    Ok(())
}

/// Pins for spatial comments near the playhead.
pub fn render_pins(document: &Document, layer: &Element, comments: &[Comment], time: f64) -> Result<(), JsValue> {
    layer.set_inner_html("");
    for comment in visible_spatial(comments, time) {
        let (Some(x), Some(y)) = (comment.x, comment.y) else {
            continue;
        };
        let pin: HtmlElement = create(document, "button")?;
        pin.set_class_name("spatial-pin");
        pin.set_attribute("data-comment-id", &comment.id.to_string())?;
        pin.set_attribute("data-action", "seek")?;
        pin.set_text_content(Some(&comment.author.initials));
        pin.set_title(&format!("{}: {}", comment.author.name, comment.text));
        let style = pin.style();
        style.set_property("left", &format!("{x}%"))?;
        style.set_property("top", &format!("{y}%"))?;
        layer.append_child(&pin)?;
    }
    Ok(())
}

pub fn render_asset_list(document: &Document, list: &Element, assets: &[Asset], query: &str) -> Result<(), JsValue> {
    list.set_inner_html("");
    let matches = filter_assets(assets, query);
    if matches.is_empty() {
        let empty: HtmlElement = create(document, "li")?;
        empty.set_text_content(Some("No assets found"));
        list.append_child(&empty)?;
        return Ok(());
    }
    for asset in matches {
        let item: HtmlElement = create(document, "li")?;
        item.set_class_name("asset");
        item.set_attribute("data-asset-id", &asset.id)?;
        let name: HtmlElement = create(document, "span")?;
        name.set_class_name("asset-name");
        name.set_text_content(Some(&asset.filename));
        let size: HtmlElement = create(document, "span")?;
        size.set_class_name("asset-size");
        size.set_text_content(Some(&asset.size_label()));
        item.append_child(&name)?;
        item.append_child(&size)?;
        list.append_child(&item)?;
    }
    Ok(())
}

/// Nearest ancestor carrying `attribute`, starting at the event target.
pub fn closest_with(event: &web_sys::Event, attribute: &str) -> Option<Element> {
    use wasm_bindgen::JsCast;
    let target = event.target()?.dyn_into::<Element>().ok()?;
    target.closest(&format!("[{attribute}]")).ok().flatten()
}

pub fn comment_id_of(element: &Element) -> Option<CommentId> {
    element
        .get_attribute("data-comment-id")?
        .parse::<u64>()
        .ok()
        .map(CommentId::new)
}
