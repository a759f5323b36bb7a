use std::cell::RefCell;
use std::rc::Rc;

use js_sys::Promise;
use serde::de::DeserializeOwned;
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Headers, Request, RequestInit, Response, Window};

use framereview_shared::{Asset, Comment, CommentId, CommentPatch, NewComment};

type Callback = Box<dyn FnOnce(Result<String, String>)>;

/// REST endpoints of one review.
#[derive(Clone)]
pub struct Api {
    window: Window,
    base: String,
    video_id: String,
}

impl Api {
    pub fn new(window: Window, base: &str, video_id: &str) -> Self {
        Self {
            window,
            base: base.trim_end_matches('/').to_string(),
            video_id: video_id.to_string(),
        }
    }

    fn comments_url(&self) -> String {
        format!("{}/api/videos/{}/comments", self.base, self.video_id)
    }

    fn comment_url(&self, id: CommentId) -> String {
        format!("{}/{id}", self.comments_url())
    }

    pub fn list_comments(&self, done: impl FnOnce(Result<Vec<Comment>, String>) + 'static) {
        self.send("GET", &self.comments_url(), None, parse_with(done));
    }

    pub fn create_comment(&self, comment: &NewComment, done: impl FnOnce(Result<Comment, String>) + 'static) {
        match to_body(comment) {
            Ok(body) => self.send("POST", &self.comments_url(), Some(body), parse_with(done)),
            Err(err) => done(Err(err)),
        }
    }

    pub fn update_comment(
        &self,
        id: CommentId,
        patch: &CommentPatch,
        done: impl FnOnce(Result<Comment, String>) + 'static,
    ) {
        match to_body(patch) {
            Ok(body) => self.send("PATCH", &self.comment_url(id), Some(body), parse_with(done)),
            Err(err) => done(Err(err)),
        }
    }

    pub fn delete_comment(&self, id: CommentId, done: impl FnOnce(Result<(), String>) + 'static) {
        self.send(
            "DELETE",
            &self.comment_url(id),
            None,
            Box::new(move |result: Result<String, String>| done(result.map(|_| ()))),
        );
    }

    pub fn list_assets(&self, done: impl FnOnce(Result<Vec<Asset>, String>) + 'static) {
        let url = format!("{}/api/assets", self.base);
        self.send("GET", &url, None, parse_with(done));
    }

    fn send(&self, method: &str, url: &str, body: Option<String>, done: Callback) {
        let promise = match self.build_request(method, url, body.as_deref()) {
            Ok(request) => self.window.fetch_with_request(&request),
            Err(err) => {
                done(Err(format!("{method} {url}: {err:?}")));
                return;
            }
        };
        // Both the response and the body read share one completion.
        let done = Rc::new(RefCell::new(Some(done)));
        let label = format!("{method} {url}");

        let done_ok = done.clone();
        let label_ok = label.clone();
        let on_response = Closure::<dyn FnMut(JsValue)>::new(move |value: JsValue| {
            let Ok(response) = value.dyn_into::<Response>() else {
                finish(&done_ok, Err(format!("{label_ok}: not a response")));
                return;
            };
            if !response.ok() {
                finish(&done_ok, Err(format!("{label_ok}: HTTP {}", response.status())));
                return;
            }
            read_text(&response, done_ok.clone(), label_ok.clone());
        });
        let done_err = done;
        let on_error = Closure::<dyn FnMut(JsValue)>::new(move |err: JsValue| {
            finish(&done_err, Err(format!("{label}: {err:?}")));
        });
        let _ = promise.then2(&on_response, &on_error);
        on_response.forget();
        on_error.forget();
    }

    fn build_request(&self, method: &str, url: &str, body: Option<&str>) -> Result<Request, JsValue> {
        let init = RequestInit::new();
        init.set_method(method);
        if let Some(body) = body {
            let headers = Headers::new()?;
            headers.set("Content-Type", "application/json")?;
            init.set_headers(&headers);
            init.set_body(&JsValue::from_str(body));
        }
        Request::new_with_str_and_init(url, &init)
    }
}

fn read_text(response: &Response, done: Rc<RefCell<Option<Callback>>>, label: String) {
    let promise: Promise = match response.text() {
        Ok(promise) => promise,
        Err(err) => {
            finish(&done, Err(format!("{label}: {err:?}")));
            return;
        }
    };
    let done_ok = done.clone();
    let on_text = Closure::<dyn FnMut(JsValue)>::new(move |value: JsValue| {
        finish(&done_ok, Ok(value.as_string().unwrap_or_default()));
    });
    let on_error = Closure::<dyn FnMut(JsValue)>::new(move |err: JsValue| {
        finish(&done, Err(format!("{label}: {err:?}")));
    });
    let _ = promise.then2(&on_text, &on_error);
    on_text.forget();
    on_error.forget();
}

fn finish(done: &Rc<RefCell<Option<Callback>>>, result: Result<String, String>) {
    let callback = done.borrow_mut().take();
    if let Some(callback) = callback {
        callback(result);
    }
}

fn parse_with<T: DeserializeOwned + 'static>(
    done: impl FnOnce(Result<T, String>) + 'static,
) -> Callback {
    Box::new(move |result: Result<String, String>| {
        done(result.and_then(|text| serde_json::from_str(&text).map_err(|err| err.to_string())))
    })
}

fn to_body<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|err| err.to_string())
}

/// `/review/{id}` yields the video id.
pub fn video_id_from_location(window: &Window) -> Option<String> {
    let path = window.location().pathname().ok()?;
    let mut parts = path.trim_matches('/').split('/');
    if parts.next()? != "review" {
        return None;
    }
    let video_id = parts.next()?;
    if video_id.is_empty() {
        None
    } else {
        Some(video_id.to_string())
    }
}

pub fn debug_enabled(window: &Window) -> bool {
    let search = window.location().search().ok().unwrap_or_default();
    search.contains("debug=1") || search.contains("debug=true")
}
