use std::cell::{Cell, RefCell};
use std::rc::Rc;

use js_sys::Reflect;
use wasm_bindgen::convert::FromWasmAbi;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    Document, Element, Event, FileReader, HtmlButtonElement, HtmlCanvasElement,
    HtmlDialogElement, HtmlElement, HtmlInputElement, HtmlVideoElement, KeyboardEvent,
    MouseEvent, PointerEvent, ProgressEvent,
};

use framereview_shared::comment::{format_timecode, sort_by_time};
use framereview_shared::media::time_at_fraction;
use framereview_shared::{
    drawing_allowed, Annotation, Asset, CanvasEngine, CanvasSize, Comment, CommentId,
    CommentPatch, EngineConfig, NewComment, StepDirection, Tool, VideoSource,
};

use crate::comments::{
    closest_with, comment_id_of, render_asset_list, render_comment_list, render_markers,
    render_pins,
};
use crate::dom::{
    event_to_point, get_element, is_text_target, place_text_editor, set_canvas_cursor, set_status,
    show_element, sync_tool_buttons, track_fraction,
};
use crate::net::{debug_enabled, video_id_from_location, Api};
use crate::persistence::{download_annotations, read_load_payload};
use crate::surface::CanvasSurface;
use crate::video::HtmlVideoSource;

struct App {
    engine: CanvasEngine<CanvasSurface>,
    video: HtmlVideoSource,
    comments: Vec<Comment>,
    assets: Vec<Asset>,
    selected_comment: Option<CommentId>,
    /// Serial of the text session the inline editor currently shows.
    editor_serial: u64,
    editor_open: bool,
    pointer_held: bool,
    load_onload: Option<Closure<dyn FnMut(ProgressEvent)>>,
}

/// DOM handles shared by the listeners.
struct Ui {
    document: Document,
    canvas: HtmlCanvasElement,
    editor: HtmlInputElement,
    status: Element,
    timecode: Element,
    duration: Element,
    play_button: HtmlButtonElement,
    comment_list: Element,
    comment_input: HtmlInputElement,
    comment_link: HtmlInputElement,
    timeline: Element,
    timeline_hover: HtmlElement,
    pins: Element,
    asset_dialog: HtmlDialogElement,
    asset_search: HtmlInputElement,
    asset_list: Element,
    debug: bool,
}

impl Ui {
    fn log(&self, message: &str) {
        if self.debug {
            web_sys::console::log_1(&message.into());
        }
    }

    fn error(&self, message: &str) {
        web_sys::console::error_1(&message.into());
        set_status(&self.status, "error", message);
    }
}

fn document_ready_state(document: &Document) -> Option<String> {
    Reflect::get(document.as_ref(), &JsValue::from_str("readyState"))
        .ok()?
        .as_string()
}

fn query_param(window: &web_sys::Window, name: &str) -> Option<String> {
    let search = window.location().search().ok()?;
    search
        .trim_start_matches('?')
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .and_then(|(_, value)| js_sys::decode_uri_component(value).ok())
        .and_then(|value| value.as_string())
}

fn engine_config(canvas: &HtmlCanvasElement, ui_debug: bool) -> EngineConfig {
    let mut config = match canvas.get_attribute("data-engine-config") {
        Some(json) => EngineConfig::from_json(&json).unwrap_or_else(|err| {
            web_sys::console::warn_1(&format!("Ignoring data-engine-config: {err}").into());
            EngineConfig::default()
        }),
        None => EngineConfig::default(),
    };
    let attribute_size = CanvasSize::new(canvas.width() as f64, canvas.height() as f64);
    if attribute_size.is_valid() {
        config.intrinsic_size = attribute_size;
    } else {
        canvas.set_width(config.intrinsic_size.width as u32);
        canvas.set_height(config.intrinsic_size.height as u32);
    }
    if ui_debug {
        web_sys::console::log_1(&format!("Engine config {config:?}").into());
    }
    config
}

fn sync_editor(app: &mut App, ui: &Ui) {
    let size = app.engine.config().intrinsic_size;
    match app.engine.text_session() {
        Some(session) => {
            if app.editor_open && session.serial == app.editor_serial {
                return;
            }
            let serial = session.serial;
            place_text_editor(&ui.editor, &ui.canvas, session, size);
            show_element(&ui.editor, true);
            let _ = ui.editor.focus();
            app.editor_serial = serial;
            app.editor_open = true;
        }
        None => {
            if !app.editor_open {
                return;
            }
            app.editor_open = false;
            // Hiding blurs the editor; the blur listener sees the app
            // borrowed and leaves it alone.
            show_element(&ui.editor, false);
    show_element(&ui.timeline_hover, false);
            ui.editor.set_value("");
        }
    }
}

fn sync_cursor(app: &App, ui: &Ui) {
    set_canvas_cursor(
        &ui.canvas,
        app.engine.tool(),
        app.engine.is_drawing_enabled(),
        app.pointer_held && app.engine.interaction().dragging_id().is_some(),
    );
}

/// Drawing follows playback: paused enables every tool, playing only the
/// pointer unless the config gates it too.
fn sync_gate(app: &mut App, ui: &Ui) {
    let paused = app.video.is_paused();
    let allowed = drawing_allowed(app.engine.tool(), paused, app.engine.config());
    app.engine.set_drawing_enabled(allowed);
    ui.play_button
        .set_text_content(Some(if paused { "Play" } else { "Pause" }));
    sync_editor(app, ui);
    sync_cursor(app, ui);
}

fn sync_time(app: &App, ui: &Ui) {
    let time = app.video.current_time();
    ui.timecode.set_text_content(Some(&format_timecode(time)));
    ui.duration
        .set_text_content(Some(&format_timecode(app.video.duration())));
    if let Err(err) = render_pins(&ui.document, &ui.pins, &app.comments, time) {
        web_sys::console::error_1(&err);
    }
}

fn refresh_comments(app: &App, ui: &Ui) {
    let rendered = render_comment_list(
        &ui.document,
        &ui.comment_list,
        &app.comments,
        app.selected_comment,
    )
    .and_then(|_| {
        render_markers(
            &ui.document,
            &ui.timeline,
            &app.comments,
            app.video.duration(),
        )
    });
    if let Err(err) = rendered {
        web_sys::console::error_1(&err);
    }
    sync_time(app, ui);
}

fn select_tool(app_rc: &Rc<RefCell<App>>, ui: &Rc<Ui>, api: &Api, tool: Tool) {
    if !tool.reaches_engine() {
        open_asset_picker(app_rc, ui, api);
        return;
    }
    let mut app = app_rc.borrow_mut();
    if tool.pauses_playback() {
        app.video.pause();
    }
    app.engine.set_tool(tool);
    ui.log(&format!("Tool {tool}"));
    sync_tool_buttons(&ui.document, tool);
    sync_gate(&mut app, ui);
}

fn open_asset_picker(app_rc: &Rc<RefCell<App>>, ui: &Rc<Ui>, api: &Api) {
    if let Err(err) = ui.asset_dialog.show_modal() {
        web_sys::console::error_1(&err);
        return;
    }
    let app_rc = app_rc.clone();
    let ui_cb = ui.clone();
    api.list_assets(move |result| {
        let mut app = app_rc.borrow_mut();
        match result {
            Ok(assets) => app.assets = assets,
            Err(err) => {
                ui_cb.error(&format!("Could not load assets: {err}"));
                app.assets.clear();
            }
        }
        let query = ui_cb.asset_search.value();
        if let Err(err) = render_asset_list(&ui_cb.document, &ui_cb.asset_list, &app.assets, &query)
        {
            web_sys::console::error_1(&err);
        }
    });
    ui.log("Asset picker opened");
}

fn add_comment(app_rc: &Rc<RefCell<App>>, ui: &Rc<Ui>, api: &Api, comment: NewComment) {
    let restore = comment.annotations.clone();
    let app_cb = app_rc.clone();
    let ui_cb = ui.clone();
    api.create_comment(&comment, move |result| {
        let mut app = app_cb.borrow_mut();
        match result {
            Ok(comment) => {
                ui_cb.log(&format!("Comment {} created", comment.id));
                app.comments.push(comment);
                sort_by_time(&mut app.comments);
                set_status(&ui_cb.status, "ok", "Comment saved");
            }
            Err(err) => {
                ui_cb.error(&format!("Could not save comment: {err}"));
                if !restore.is_empty() && app.engine.list().is_empty() {
                    app.engine.replace_all(restore);
                }
            }
        }
        refresh_comments(&app, &ui_cb);
    });
}

fn submit_comment(app_rc: &Rc<RefCell<App>>, ui: &Rc<Ui>, api: &Api) {
    let text = ui.comment_input.value().trim().to_string();
    if text.is_empty() {
        set_status(&ui.status, "error", "Write a comment first");
        return;
    }
    let comment = {
        let mut app = app_rc.borrow_mut();
        // An open text draft belongs to the set being attached.
        let text_open = app.engine.text_session().is_some();
        if text_open {
            let draft = ui.editor.value();
            app.engine.submit_text(&draft);
            sync_editor(&mut app, ui);
        }
        let mut comment = NewComment::new(app.video.current_time(), text)
            .with_link(&ui.comment_link.value());
        comment.annotations = app.engine.annotations();
        app.engine.clear();
        app.selected_comment = None;
        comment
    };
    ui.comment_input.set_value("");
    ui.comment_link.set_value("");
    add_comment(app_rc, ui, api, comment);
}

fn focus_comment(app: &mut App, ui: &Ui, id: CommentId) {
    let Some(comment) = app.comments.iter().find(|comment| comment.id == id) else {
        return;
    };
    let time = comment.time;
    let annotations: Vec<Annotation> = comment.annotations.clone();
    app.video.pause();
    app.video.seek(time);
    app.engine.replace_all(annotations);
    app.selected_comment = Some(id);
    sync_gate(app, ui);
    refresh_comments(app, ui);
}

fn handle_comment_click(app_rc: &Rc<RefCell<App>>, ui: &Rc<Ui>, api: &Api, event: &Event) {
    let Some(id) = closest_with(event, "data-comment-id").and_then(|item| comment_id_of(&item))
    else {
        return;
    };
    let action = closest_with(event, "data-action").and_then(|element| element.get_attribute("data-action"));
    match action.as_deref() {
        Some("resolve") => {
            let resolved = app_rc
                .borrow()
                .comments
                .iter()
                .find(|comment| comment.id == id)
                .map(|comment| !comment.resolved);
            let Some(resolved) = resolved else {
                return;
            };
            let patch = CommentPatch {
                resolved: Some(resolved),
                ..CommentPatch::default()
            };
            let app_cb = app_rc.clone();
            let ui_cb = ui.clone();
            api.update_comment(id, &patch, move |result| {
                let mut app = app_cb.borrow_mut();
                match result {
                    Ok(updated) => {
                        if let Some(slot) = app.comments.iter_mut().find(|c| c.id == updated.id) {
                            *slot = updated;
                        }
                    }
                    Err(err) => ui_cb.error(&format!("Could not update comment: {err}")),
                }
                refresh_comments(&app, &ui_cb);
            });
        }
        Some("delete") => {
            let app_cb = app_rc.clone();
            let ui_cb = ui.clone();
            api.delete_comment(id, move |result| {
                let mut app = app_cb.borrow_mut();
                match result {
                    Ok(()) => {
                        app.comments.retain(|comment| comment.id != id);
                        if app.selected_comment == Some(id) {
                            app.selected_comment = None;
                        }
                    }
                    Err(err) => ui_cb.error(&format!("Could not delete comment: {err}")),
                }
                refresh_comments(&app, &ui_cb);
            });
        }
        _ => {
            let mut app = app_rc.borrow_mut();
            focus_comment(&mut app, ui, id);
        }
    }
}

/// Clicks on the bare track seek; markers focus their comment.
fn handle_timeline_click(app_rc: &Rc<RefCell<App>>, ui: &Rc<Ui>, api: &Api, event: &MouseEvent) {
    if closest_with(event, "data-comment-id").is_some() {
        handle_comment_click(app_rc, ui, api, event);
        return;
    }
    let mut app = app_rc.borrow_mut();
    let Some(time) = track_fraction(&ui.timeline, event)
        .and_then(|fraction| time_at_fraction(fraction, app.video.duration()))
    else {
        return;
    };
    app.video.seek(time);
    ui.log(&format!("Seek to {}", format_timecode(time)));
    sync_time(&app, ui);
}

fn show_hover_time(app: &App, ui: &Ui, event: &MouseEvent) {
    match track_fraction(&ui.timeline, event)
        .and_then(|fraction| time_at_fraction(fraction, app.video.duration()))
    {
        Some(time) => {
            ui.timeline_hover
                .set_text_content(Some(&format_timecode(time)));
            show_element(&ui.timeline_hover, true);
        }
        None => show_element(&ui.timeline_hover, false),
    }
}

fn pointer_point(app: &App, ui: &Ui, event: &MouseEvent) -> Option<framereview_shared::Point> {
    event_to_point(&ui.canvas, event, app.engine.config().intrinsic_size)
}

fn listen<E: FromWasmAbi + 'static>(
    target: &web_sys::EventTarget,
    name: &str,
    handler: impl FnMut(E) + 'static,
) -> Result<(), JsValue> {
    let closure = Closure::<dyn FnMut(E)>::new(handler);
    target.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}

#[wasm_bindgen(start)]
pub fn run() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("Missing window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("Missing document"))?;
    let started = Rc::new(Cell::new(false));

    if document_ready_state(&document).as_deref() == Some("complete") {
        started.set(true);
        return start_app();
    }

    let onload_started = started.clone();
    let onload = Closure::<dyn FnMut(Event)>::new(move |_| {
        if onload_started.replace(true) {
            return;
        }
        if let Err(err) = start_app() {
            web_sys::console::error_1(&err);
        }
    });
    window.add_event_listener_with_callback("load", onload.as_ref().unchecked_ref())?;
    onload.forget();

    Ok(())
}

fn start_app() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("Missing window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("Missing document"))?;
    let debug = debug_enabled(&window);
    if debug {
        let href = window.location().href().ok().unwrap_or_default();
        web_sys::console::log_1(&format!("FrameReview debug enabled href={href}").into());
    }

    let canvas: HtmlCanvasElement = get_element(&document, "annotations")?;
    let ctx = canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("Missing canvas context"))?
        .dyn_into::<web_sys::CanvasRenderingContext2d>()?;
    let video_element: HtmlVideoElement = get_element(&document, "video")?;
    if let Some(src) = query_param(&window, "src") {
        video_element.set_src(&src);
    }

    let ui = Rc::new(Ui {
        document: document.clone(),
        canvas: canvas.clone(),
        editor: get_element(&document, "textEditor")?,
        status: get_element(&document, "status")?,
        timecode: get_element(&document, "timecode")?,
        duration: get_element(&document, "duration")?,
        play_button: get_element(&document, "playPause")?,
        comment_list: get_element(&document, "comments")?,
        comment_input: get_element(&document, "commentText")?,
        comment_link: get_element(&document, "commentLink")?,
        timeline: get_element(&document, "timeline")?,
        timeline_hover: get_element(&document, "timelineHover")?,
        pins: get_element(&document, "pins")?,
        asset_dialog: get_element(&document, "assetPicker")?,
        asset_search: get_element(&document, "assetSearch")?,
        asset_list: get_element(&document, "assetList")?,
        debug,
    });
    show_element(&ui.editor, false);

    let video_id = video_id_from_location(&window)
        .or_else(|| canvas.get_attribute("data-video-id"))
        .ok_or_else(|| JsValue::from_str("Missing video id"))?;
    let api_base = canvas.get_attribute("data-api-base").unwrap_or_default();
    let api = Api::new(window.clone(), &api_base, &video_id);

    let config = engine_config(&canvas, debug);
    let mut engine = CanvasEngine::new(CanvasSurface::new(ctx), config);
    {
        let status = ui.status.clone();
        engine.on_annotation_set_changed(move |annotations| {
            let text = match annotations.len() {
                0 => "No annotations".to_string(),
                1 => "1 annotation".to_string(),
                count => format!("{count} annotations"),
            };
            set_status(&status, "ok", &text);
            if debug {
                web_sys::console::log_1(&format!("Annotation set changed: {text}").into());
            }
        });
    }
    engine.redraw();

    let app = Rc::new(RefCell::new(App {
        engine,
        video: HtmlVideoSource::new(video_element.clone()),
        comments: Vec::new(),
        assets: Vec::new(),
        selected_comment: None,
        editor_serial: 0,
        editor_open: false,
        pointer_held: false,
        load_onload: None,
    }));
    sync_tool_buttons(&document, Tool::default());
    sync_gate(&mut app.borrow_mut(), &ui);
    set_status(&ui.status, "loading", "Loading comments...");

    {
        let app = app.clone();
        let ui_cb = ui.clone();
        api.list_comments(move |result| {
            let mut app = app.borrow_mut();
            match result {
                Ok(mut comments) => {
                    sort_by_time(&mut comments);
                    ui_cb.log(&format!("Loaded {} comments", comments.len()));
                    app.comments = comments;
                    set_status(&ui_cb.status, "ok", "Ready");
                }
                Err(err) => ui_cb.error(&format!("Could not load comments: {err}")),
            }
            refresh_comments(&app, &ui_cb);
        });
    }

    // Canvas pointer input.
    {
        let app = app.clone();
        let ui_cb = ui.clone();
        listen(&canvas, "pointerdown", move |event: PointerEvent| {
            if event.button() != 0 {
                return;
            }
            // Keeps focus in the inline editor; the engine submits its draft.
            event.prevent_default();
            let _ = ui_cb.canvas.set_pointer_capture(event.pointer_id());
            let mut app = app.borrow_mut();
            let Some(point) = pointer_point(&app, &ui_cb, &event) else {
                return;
            };
            app.pointer_held = true;
            app.engine.pointer_down(point);
            sync_editor(&mut app, &ui_cb);
            sync_cursor(&app, &ui_cb);
        })?;
    }
    {
        let app = app.clone();
        let ui_cb = ui.clone();
        listen(&canvas, "pointermove", move |event: PointerEvent| {
            let mut app = app.borrow_mut();
            let Some(point) = pointer_point(&app, &ui_cb, &event) else {
                return;
            };
            app.engine.pointer_move(point);
        })?;
    }
    {
        let app = app.clone();
        let ui_cb = ui.clone();
        listen(&canvas, "pointerup", move |event: PointerEvent| {
            let _ = ui_cb.canvas.release_pointer_capture(event.pointer_id());
            let mut app = app.borrow_mut();
            app.pointer_held = false;
            app.engine.pointer_up();
            sync_cursor(&app, &ui_cb);
        })?;
    }
    {
        let app = app.clone();
        let ui_cb = ui.clone();
        listen(&canvas, "pointerleave", move |_: PointerEvent| {
            let mut app = app.borrow_mut();
            app.pointer_held = false;
            app.engine.pointer_leave();
            sync_cursor(&app, &ui_cb);
        })?;
    }
    {
        let app = app.clone();
        let ui_cb = ui.clone();
        listen(&canvas, "dblclick", move |event: MouseEvent| {
            event.prevent_default();
            let mut app = app.borrow_mut();
            let Some(point) = pointer_point(&app, &ui_cb, &event) else {
                return;
            };
            app.engine.double_click(point);
            sync_editor(&mut app, &ui_cb);
        })?;
    }

    // Inline text editor.
    {
        let app = app.clone();
        let editor = ui.editor.clone();
        listen(&ui.editor, "input", move |_: Event| {
            app.borrow_mut().engine.update_text_draft(&editor.value());
        })?;
    }
    {
        let app = app.clone();
        let ui_cb = ui.clone();
        listen(&ui.editor, "keydown", move |event: KeyboardEvent| {
            event.stop_propagation();
            let key = event.key();
            if key != "Enter" && key != "Escape" {
                return;
            }
            event.prevent_default();
            let mut app = app.borrow_mut();
            if key == "Enter" {
                let value = ui_cb.editor.value();
                app.engine.submit_text(&value);
            } else {
                app.engine.cancel();
            }
            sync_editor(&mut app, &ui_cb);
        })?;
    }
    {
        let app = app.clone();
        let ui_cb = ui.clone();
        listen(&ui.editor, "blur", move |_: Event| {
            let Ok(mut app) = app.try_borrow_mut() else {
                return;
            };
            if app.engine.text_session().is_none() {
                return;
            }
            let value = ui_cb.editor.value();
            app.engine.submit_text(&value);
            sync_editor(&mut app, &ui_cb);
        })?;
    }

    // Toolbar.
    {
        let buttons = document.query_selector_all("[data-tool]")?;
        for index in 0..buttons.length() {
            let Some(button) = buttons
                .item(index)
                .and_then(|node| node.dyn_into::<Element>().ok())
            else {
                continue;
            };
            let Some(tool) = button
                .get_attribute("data-tool")
                .and_then(|name| name.parse::<Tool>().ok())
            else {
                web_sys::console::warn_1(&"Toolbar button with unknown data-tool".into());
                continue;
            };
            let shortcut = tool.shortcut();
            let _ = button.set_attribute("title", &format!("{tool} ({shortcut})"));
            let app = app.clone();
            let ui_cb = ui.clone();
            let api = api.clone();
            listen(&button, "click", move |_: Event| {
                select_tool(&app, &ui_cb, &api, tool);
            })?;
        }
    }
    {
        let app = app.clone();
        let ui_cb = ui.clone();
        let api = api.clone();
        listen(&window, "keydown", move |event: KeyboardEvent| {
            if is_text_target(&event) || event.meta_key() || event.ctrl_key() || event.alt_key() {
                return;
            }
            let key = event.key();
            match key.as_str() {
                "Escape" => {
                    let mut app = app.borrow_mut();
                    app.engine.cancel();
                    sync_editor(&mut app, &ui_cb);
                }
                " " => {
                    event.prevent_default();
                    let mut app = app.borrow_mut();
                    app.video.toggle_playback();
                    sync_gate(&mut app, &ui_cb);
                }
                "ArrowLeft" | "ArrowRight" => {
                    event.prevent_default();
                    let direction = if key == "ArrowLeft" {
                        StepDirection::Back
                    } else {
                        StepDirection::Forward
                    };
                    let mut app = app.borrow_mut();
                    app.video.step_frame(direction);
                    sync_gate(&mut app, &ui_cb);
                }
                _ => {
                    if let Some(tool) = Tool::from_shortcut(&key) {
                        event.prevent_default();
                        select_tool(&app, &ui_cb, &api, tool);
                    }
                }
            }
        })?;
    }

    // Playback.
    {
        let app = app.clone();
        let ui_cb = ui.clone();
        listen(&ui.play_button, "click", move |_: Event| {
            let mut app = app.borrow_mut();
            app.video.toggle_playback();
            sync_gate(&mut app, &ui_cb);
        })?;
    }
    for (id, direction) in [
        ("stepBack", StepDirection::Back),
        ("stepForward", StepDirection::Forward),
    ] {
        let button: HtmlButtonElement = get_element(&document, id)?;
        let app = app.clone();
        let ui_cb = ui.clone();
        listen(&button, "click", move |_: Event| {
            let mut app = app.borrow_mut();
            app.video.step_frame(direction);
            sync_gate(&mut app, &ui_cb);
        })?;
    }
    for name in ["play", "pause"] {
        let app = app.clone();
        let ui_cb = ui.clone();
        listen(&video_element, name, move |_: Event| {
            // Events raised by our own play/pause calls arrive later, when
            // the app is free again.
            if let Ok(mut app) = app.try_borrow_mut() {
                sync_gate(&mut app, &ui_cb);
            }
        })?;
    }
    for name in ["timeupdate", "seeked"] {
        let app = app.clone();
        let ui_cb = ui.clone();
        listen(&video_element, name, move |_: Event| {
            if let Ok(app) = app.try_borrow() {
                sync_time(&app, &ui_cb);
            }
        })?;
    }
    {
        let app = app.clone();
        let ui_cb = ui.clone();
        listen(&video_element, "loadedmetadata", move |_: Event| {
            if let Ok(app) = app.try_borrow() {
                refresh_comments(&app, &ui_cb);
            }
        })?;
    }

    // Comments.
    {
        let form: HtmlElement = get_element(&document, "commentForm")?;
        let app = app.clone();
        let ui_cb = ui.clone();
        let api = api.clone();
        listen(&form, "submit", move |event: Event| {
            event.prevent_default();
            submit_comment(&app, &ui_cb, &api);
        })?;
    }
    {
        let app = app.clone();
        let ui_cb = ui.clone();
        let api = api.clone();
        listen(&ui.timeline, "click", move |event: MouseEvent| {
            handle_timeline_click(&app, &ui_cb, &api, &event);
        })?;
    }
    {
        let app = app.clone();
        let ui_cb = ui.clone();
        listen(&ui.timeline, "mousemove", move |event: MouseEvent| {
            if let Ok(app) = app.try_borrow() {
                show_hover_time(&app, &ui_cb, &event);
            }
        })?;
    }
    {
        let ui_cb = ui.clone();
        listen(&ui.timeline, "mouseleave", move |_: Event| {
            show_element(&ui_cb.timeline_hover, false);
        })?;
    }
    for target in [&ui.comment_list, &ui.pins] {
        let app = app.clone();
        let ui_cb = ui.clone();
        let api = api.clone();
        listen(target, "click", move |event: Event| {
            handle_comment_click(&app, &ui_cb, &api, &event);
        })?;
    }

    // Asset picker.
    {
        let app = app.clone();
        let ui_cb = ui.clone();
        listen(&ui.asset_search, "input", move |_: Event| {
            let app = app.borrow();
            let query = ui_cb.asset_search.value();
            if let Err(err) = render_asset_list(&ui_cb.document, &ui_cb.asset_list, &app.assets, &query)
            {
                web_sys::console::error_1(&err);
            }
        })?;
    }
    {
        let app = app.clone();
        let ui_cb = ui.clone();
        let api = api.clone();
        listen(&ui.asset_list, "click", move |event: Event| {
            let Some(asset_id) = closest_with(&event, "data-asset-id")
                .and_then(|item| item.get_attribute("data-asset-id"))
            else {
                return;
            };
            let comment = {
                let app = app.borrow();
                let Some(asset) = app.assets.iter().find(|asset| asset.id == asset_id) else {
                    return;
                };
                NewComment::attachment(app.video.current_time(), &asset.filename, asset.url.clone())
            };
            ui_cb.asset_dialog.close();
            add_comment(&app, &ui_cb, &api, comment);
        })?;
    }
    {
        let close: HtmlButtonElement = get_element(&document, "assetClose")?;
        let ui_cb = ui.clone();
        listen(&close, "click", move |_: Event| {
            ui_cb.asset_dialog.close();
        })?;
    }

    // Canvas actions.
    {
        let clear: HtmlButtonElement = get_element(&document, "clear")?;
        let app = app.clone();
        let ui_cb = ui.clone();
        listen(&clear, "click", move |_: Event| {
            let mut app = app.borrow_mut();
            app.engine.clear();
            sync_editor(&mut app, &ui_cb);
        })?;
    }
    {
        let save: HtmlButtonElement = get_element(&document, "save")?;
        let app = app.clone();
        let ui_cb = ui.clone();
        listen(&save, "click", move |_: Event| {
            let app = app.borrow();
            if let Err(err) = download_annotations(&ui_cb.document, app.engine.list()) {
                web_sys::console::error_1(&err);
            }
        })?;
    }
    {
        let load: HtmlButtonElement = get_element(&document, "load")?;
        let load_file: HtmlInputElement = get_element(&document, "loadFile")?;
        let load_file_cb = load_file.clone();
        listen(&load, "click", move |_: Event| {
            load_file_cb.set_value("");
            load_file_cb.click();
        })?;

        let app = app.clone();
        let ui_cb = ui.clone();
        let load_file_cb = load_file.clone();
        listen(&load_file, "change", move |_: Event| {
            let Some(file) = load_file_cb.files().and_then(|list| list.get(0)) else {
                return;
            };
            let Ok(reader) = FileReader::new() else {
                return;
            };
            let app_onload = app.clone();
            let ui_onload = ui_cb.clone();
            let onload = Closure::<dyn FnMut(ProgressEvent)>::new(move |event: ProgressEvent| {
                let mut app = app_onload.borrow_mut();
                match read_load_payload(&event) {
                    Some(annotations) => {
                        ui_onload.log(&format!("Loaded {} annotations", annotations.len()));
                        app.engine.replace_all(annotations);
                        sync_editor(&mut app, &ui_onload);
                    }
                    None => ui_onload.error("Could not read annotation file"),
                }
            });
            reader.set_onload(Some(onload.as_ref().unchecked_ref()));
            app.borrow_mut().load_onload = Some(onload);
            if let Err(err) = reader.read_as_text(&file) {
                web_sys::console::error_1(&err);
            }
        })?;
    }

    {
        let app = app.clone();
        let ui_cb = ui.clone();
        listen(&window, "resize", move |_: Event| {
            let app = app.borrow();
            if let Some(session) = app.engine.text_session() {
                place_text_editor(
                    &ui_cb.editor,
                    &ui_cb.canvas,
                    session,
                    app.engine.config().intrinsic_size,
                );
            }
        })?;
    }

    ui.log(&format!("Review {video_id} ready"));
    Ok(())
}
