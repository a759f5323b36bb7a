use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, HtmlAnchorElement, ProgressEvent};

use framereview_shared::Annotation;

pub const SAVE_FILE_NAME: &str = "annotations.json";

#[derive(Serialize, Deserialize)]
pub struct SaveData {
    pub version: u8,
    pub annotations: Vec<Annotation>,
}

/// Accepts a saved file, a data URL of one, or a bare annotation array.
pub fn parse_load_payload(text: &str) -> Option<Vec<Annotation>> {
    if let Some(annotations) = try_parse_annotations(text) {
        return Some(annotations);
    }
    let trimmed = text.trim();
    if let Some(payload) = extract_data_url_payload(trimmed) {
        if let Some(annotations) = try_parse_annotations(&payload) {
            return Some(annotations);
        }
        if let Some(decoded) = decode_uri_string(&payload) {
            return try_parse_annotations(&decoded);
        }
    }
    None
}

fn try_parse_annotations(text: &str) -> Option<Vec<Annotation>> {
    if let Ok(data) = serde_json::from_str::<SaveData>(text) {
        return Some(data.annotations);
    }
    serde_json::from_str::<Vec<Annotation>>(text).ok()
}

fn extract_data_url_payload(text: &str) -> Option<String> {
    let trimmed = text.trim_start();
    if !trimmed.starts_with("data:") {
        return None;
    }
    let (_, payload) = trimmed.split_once(',')?;
    Some(payload.to_string())
}

fn decode_uri_string(text: &str) -> Option<String> {
    js_sys::decode_uri_component(text)
        .ok()
        .and_then(|value| value.as_string())
}

pub fn read_load_payload(event: &ProgressEvent) -> Option<Vec<Annotation>> {
    let target = event.target()?;
    let reader = target.dyn_into::<web_sys::FileReader>().ok()?;
    let text = reader.result().ok()?.as_string()?;
    parse_load_payload(&text)
}

/// Offers the set as a JSON download.
pub fn download_annotations(document: &Document, annotations: &[Annotation]) -> Result<(), JsValue> {
    let payload = SaveData {
        version: 1,
        annotations: annotations.to_vec(),
    };
    let json = serde_json::to_string(&payload).map_err(|err| JsValue::from_str(&err.to_string()))?;
    let encoded = js_sys::encode_uri_component(&json);
    let href = format!("data:application/json;charset=utf-8,{encoded}");
    let anchor = document.create_element("a")?.dyn_into::<HtmlAnchorElement>()?;
    anchor.set_href(&href);
    anchor.set_download(SAVE_FILE_NAME);
    anchor.click();
    Ok(())
}
