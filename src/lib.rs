//! Drop-in display client for a show-timing server.
//!
//! Pages only need to load the module and give their elements ids following
//! `<category>-<field>` (`eventNow-title`, `timer-current`, ...). Most values
//! land in the element's text; progress bars and colours are driven through
//! CSS custom properties.

use std::cell::RefCell;

use wasm_bindgen::prelude::*;

pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod format;
pub mod project;
pub mod schema;
pub mod surface;

pub use config::ClientConfig;
pub use connection::{Connection, ReconnectState};
pub use dispatch::{Category, Dispatcher, Message, Route};
pub use error::DisplayError;
pub use format::format_timer;
pub use project::Projector;
pub use schema::{FieldKind, FieldSchema};
pub use surface::{DomSurface, Surface, TargetRegistry};

thread_local! {
    static PAGE_CLIENT: RefCell<Option<Connection>> = const { RefCell::new(None) };
}

pub(crate) fn js_value_to_string(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

fn page_config() -> Result<ClientConfig, DisplayError> {
    let window = web_sys::window().ok_or(DisplayError::MissingWindow)?;
    ClientConfig::from_window(&window)
}

fn page_connection(config: ClientConfig) -> Result<Connection, DisplayError> {
    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or(DisplayError::MissingDocument)?;
    let surface = DomSurface::new(document)?;
    Ok(Connection::new(config, surface))
}

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();

    if let Err(err) = start_impl() {
        web_sys::console::error_1(&JsValue::from_str(&format!("fatal: {}", err)));
    }
}

fn start_impl() -> Result<(), DisplayError> {
    let config = page_config()?;
    if !config.autoconnect {
        web_sys::console::warn_1(&JsValue::from_str("display client: autoconnect disabled via noconnect=1"));
        return Ok(());
    }

    let connection = page_connection(config)?;
    connection.start()?;
    PAGE_CLIENT.with(|client| *client.borrow_mut() = Some(connection));
    Ok(())
}

/// A display client driven from JavaScript, independent of the one started
/// automatically for the page.
#[wasm_bindgen]
pub struct DisplayClient {
    connection: Connection,
}

#[wasm_bindgen]
impl DisplayClient {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<DisplayClient, JsValue> {
        Ok(DisplayClient {
            connection: page_connection(page_config()?)?,
        })
    }

    pub fn start(&self) -> Result<(), JsValue> {
        self.connection.start().map_err(JsValue::from)
    }

    pub fn stop(&self) {
        self.connection.stop();
    }

    pub fn attempts(&self) -> u32 {
        self.connection.attempts()
    }

    #[wasm_bindgen(js_name = isOpen)]
    pub fn is_open(&self) -> bool {
        self.connection.is_open()
    }

    #[wasm_bindgen(js_name = refreshTargets)]
    pub fn refresh_targets(&self) -> Result<(), JsValue> {
        self.connection.refresh_targets().map_err(JsValue::from)
    }

    /// Applies a frame locally, without a server.
    #[wasm_bindgen(js_name = applyFrame)]
    pub fn apply_frame(&self, frame: &str) -> Result<(), JsValue> {
        self.connection.apply_frame(frame).map_err(JsValue::from)
    }
}

/// Stops the client started automatically for the page.
#[wasm_bindgen(js_name = stopPageClient)]
pub fn stop_page_client() {
    PAGE_CLIENT.with(|client| {
        if let Some(connection) = client.borrow_mut().take() {
            connection.stop();
        }
    });
}
