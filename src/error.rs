use thiserror::Error;
use wasm_bindgen::JsValue;

use crate::js_value_to_string;

#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("missing window")]
    MissingWindow,

    #[error("missing document")]
    MissingDocument,

    #[error("{0}")]
    Js(String),

    #[error("malformed frame: {0}")]
    MalformedFrame(#[source] serde_json::Error),

    #[error("invalid field schema: {0}")]
    Schema(#[source] serde_json::Error),
}

impl DisplayError {
    pub fn from_js(value: JsValue) -> Self {
        DisplayError::Js(js_value_to_string(&value))
    }
}

impl From<JsValue> for DisplayError {
    fn from(value: JsValue) -> Self {
        DisplayError::from_js(value)
    }
}

impl From<DisplayError> for JsValue {
    fn from(err: DisplayError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}
