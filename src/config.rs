use web_sys::{Document, Window};

use crate::error::DisplayError;
use crate::project::DEFAULT_TIMESTAMP_ID;
use crate::schema::FieldSchema;

pub const DEFAULT_RECONNECT_INTERVAL_MS: i32 = 1000;
pub const SCHEMA_ELEMENT_ID: &str = "display-schema";

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub socket_url: String,
    pub reconnect_interval_ms: i32,
    pub timestamp_id: String,
    pub schema: FieldSchema,
    pub autoconnect: bool,
}

impl ClientConfig {
    pub fn new(socket_url: impl Into<String>) -> Self {
        Self {
            socket_url: socket_url.into(),
            reconnect_interval_ms: DEFAULT_RECONNECT_INTERVAL_MS,
            timestamp_id: DEFAULT_TIMESTAMP_ID.to_string(),
            schema: FieldSchema::default(),
            autoconnect: true,
        }
    }

    /// Reads the socket address from the page location, query overrides from
    /// `?reconnect=<ms>` / `?noconnect=1` and the field schema from the
    /// `display-schema` element, if present.
    pub fn from_window(window: &Window) -> Result<Self, DisplayError> {
        let location = window.location();
        let host = location.hostname()?;
        let port = location.port()?;
        let search = location.search().unwrap_or_default();

        let mut config = Self::new(socket_url(&host, &port));
        config.apply_query(&search);

        let document = window.document().ok_or(DisplayError::MissingDocument)?;
        if let Some(schema) = schema_from_document(&document)? {
            config.schema = schema;
        }
        Ok(config)
    }

    pub fn apply_query(&mut self, search: &str) {
        if let Some(interval) = query_param(search, "reconnect").and_then(|v| v.parse::<i32>().ok()) {
            if interval > 0 {
                self.reconnect_interval_ms = interval;
            }
        }
        if query_param(search, "noconnect") == Some("1") {
            self.autoconnect = false;
        }
    }
}

pub fn socket_url(host: &str, port: &str) -> String {
    if port.is_empty() {
        format!("ws://{}/ws", host)
    } else {
        format!("ws://{}:{}/ws", host, port)
    }
}

/// Value of `name` in a `?a=1&b=2` style query string.
pub fn query_param<'a>(search: &'a str, name: &str) -> Option<&'a str> {
    search
        .trim_start_matches('?')
        .split('&')
        .filter_map(|pair| pair.split_once('=').or(Some((pair, ""))))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

fn schema_from_document(document: &Document) -> Result<Option<FieldSchema>, DisplayError> {
    let Some(el) = document.get_element_by_id(SCHEMA_ELEMENT_ID) else {
        return Ok(None);
    };
    let text = el.text_content().unwrap_or_default();
    if text.trim().is_empty() {
        return Ok(None);
    }
    FieldSchema::from_json(&text).map(Some)
}
