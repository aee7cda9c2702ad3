//! Socket lifecycle: connect, reconnect after every close at a fixed interval,
//! hand text frames to the dispatcher.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CloseEvent, Event, MessageEvent, WebSocket};

use crate::config::ClientConfig;
use crate::dispatch::Dispatcher;
use crate::error::DisplayError;
use crate::project::Projector;
use crate::surface::DomSurface;

/// Retry bookkeeping, kept apart from the socket so it can be reasoned about
/// on its own.
#[derive(Debug, Default)]
pub struct ReconnectState {
    attempts: u32,
    pending: Option<i32>,
}

impl ReconnectState {
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn pending(&self) -> Option<i32> {
        self.pending
    }

    /// Socket opened: returns the timer to cancel and resets the counter.
    pub fn opened(&mut self) -> Option<i32> {
        self.attempts = 0;
        self.pending.take()
    }

    pub fn scheduled(&mut self, handle: i32) {
        self.pending = Some(handle);
    }

    /// Retry timer fired. Returns whether a new socket should be opened, which
    /// is only the case while the current one is still closed.
    pub fn fired(&mut self, socket_closed: bool) -> bool {
        self.pending = None;
        if socket_closed {
            self.attempts += 1;
        }
        socket_closed
    }

    /// Forgets any pending timer, returning it so the caller can cancel it.
    pub fn cancel(&mut self) -> Option<i32> {
        self.pending.take()
    }
}

/// Socket callbacks, owned so they are released with the socket.
struct SocketHandlers {
    _on_open: Closure<dyn FnMut(Event)>,
    _on_close: Closure<dyn FnMut(CloseEvent)>,
    _on_error: Closure<dyn FnMut(Event)>,
    _on_message: Closure<dyn FnMut(MessageEvent)>,
}

struct Inner {
    config: ClientConfig,
    dispatcher: Dispatcher,
    surface: DomSurface,
    socket: Option<WebSocket>,
    handlers: Option<SocketHandlers>,
    retry: Option<Closure<dyn FnMut()>>,
    reconnect: ReconnectState,
    stopped: bool,
}

/// One display connection. Cloning shares the same underlying connection.
#[derive(Clone)]
pub struct Connection {
    inner: Rc<RefCell<Inner>>,
}

impl Connection {
    pub fn new(config: ClientConfig, surface: DomSurface) -> Self {
        let projector = Projector::new(config.schema.clone(), config.timestamp_id.clone());
        let dispatcher = Dispatcher::new(projector);
        Self {
            inner: Rc::new(RefCell::new(Inner {
                config,
                dispatcher,
                surface,
                socket: None,
                handlers: None,
                retry: None,
                reconnect: ReconnectState::default(),
                stopped: true,
            })),
        }
    }

    pub fn start(&self) -> Result<(), DisplayError> {
        {
            let mut inner = self.inner.borrow_mut();
            if !inner.stopped {
                return Ok(());
            }
            inner.stopped = false;
            if inner.retry.is_none() {
                inner.retry = Some(retry_closure(Rc::downgrade(&self.inner)));
            }
        }
        connect(&self.inner).inspect_err(|_| schedule_retry(&self.inner))
    }

    /// Cancels any pending retry and closes the socket without reconnecting.
    pub fn stop(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.stopped = true;
        if let Some(handle) = inner.reconnect.cancel() {
            if let Some(window) = web_sys::window() {
                window.clear_timeout_with_handle(handle);
            }
        }
        if let Some(socket) = inner.socket.take() {
            detach(&socket);
            let _ = socket.close();
        }
        inner.handlers = None;
    }

    pub fn attempts(&self) -> u32 {
        self.inner.borrow().reconnect.attempts()
    }

    pub fn is_open(&self) -> bool {
        self.inner
            .borrow()
            .socket
            .as_ref()
            .is_some_and(|socket| socket.ready_state() == WebSocket::OPEN)
    }

    pub fn refresh_targets(&self) -> Result<(), DisplayError> {
        self.inner.borrow_mut().surface.refresh()
    }

    /// Applies a frame as if it had arrived on the socket.
    pub fn apply_frame(&self, frame: &str) -> Result<(), DisplayError> {
        let mut inner = self.inner.borrow_mut();
        let Inner {
            dispatcher, surface, ..
        } = &mut *inner;
        dispatcher.dispatch(surface, frame).map(|_| ())
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(handle) = self.reconnect.cancel() {
            if let Some(window) = web_sys::window() {
                window.clear_timeout_with_handle(handle);
            }
        }
        if let Some(socket) = self.socket.take() {
            detach(&socket);
            let _ = socket.close();
        }
    }
}

fn detach(socket: &WebSocket) {
    socket.set_onopen(None);
    socket.set_onclose(None);
    socket.set_onerror(None);
    socket.set_onmessage(None);
}

fn connect(inner_rc: &Rc<RefCell<Inner>>) -> Result<(), DisplayError> {
    let url = inner_rc.borrow().config.socket_url.clone();
    let socket = WebSocket::new(&url)?;
    let weak = Rc::downgrade(inner_rc);

    let on_open = {
        let weak = weak.clone();
        Closure::<dyn FnMut(Event)>::new(move |_event: Event| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if let Some(handle) = inner.borrow_mut().reconnect.opened() {
                if let Some(window) = web_sys::window() {
                    window.clear_timeout_with_handle(handle);
                }
            }
            web_sys::console::warn_1(&JsValue::from_str("WebSocket connected"));
        })
    };

    let on_close = {
        let weak = weak.clone();
        Closure::<dyn FnMut(CloseEvent)>::new(move |_event: CloseEvent| {
            web_sys::console::warn_1(&JsValue::from_str("WebSocket disconnected"));
            if let Some(inner) = weak.upgrade() {
                schedule_retry(&inner);
            }
        })
    };

    let on_error = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
        web_sys::console::error_2(&JsValue::from_str("WebSocket error:"), &event);
    });

    let on_message = Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        let Some(frame) = event.data().as_string() else {
            return;
        };
        let mut inner = inner.borrow_mut();
        let Inner {
            dispatcher, surface, ..
        } = &mut *inner;
        if let Err(err) = dispatcher.dispatch(surface, &frame) {
            web_sys::console::error_1(&JsValue::from_str(&err.to_string()));
        }
    });

    socket.set_onopen(Some(on_open.as_ref().unchecked_ref()));
    socket.set_onclose(Some(on_close.as_ref().unchecked_ref()));
    socket.set_onerror(Some(on_error.as_ref().unchecked_ref()));
    socket.set_onmessage(Some(on_message.as_ref().unchecked_ref()));

    let mut inner = inner_rc.borrow_mut();
    if let Some(previous) = inner.socket.replace(socket) {
        detach(&previous);
    }
    inner.handlers = Some(SocketHandlers {
        _on_open: on_open,
        _on_close: on_close,
        _on_error: on_error,
        _on_message: on_message,
    });
    Ok(())
}

fn schedule_retry(inner_rc: &Rc<RefCell<Inner>>) {
    let mut inner = inner_rc.borrow_mut();
    if inner.stopped {
        return;
    }
    let Some(window) = web_sys::window() else {
        return;
    };
    let Some(retry) = inner.retry.as_ref() else {
        return;
    };
    match window.set_timeout_with_callback_and_timeout_and_arguments_0(
        retry.as_ref().unchecked_ref(),
        inner.config.reconnect_interval_ms,
    ) {
        Ok(handle) => inner.reconnect.scheduled(handle),
        Err(err) => web_sys::console::error_1(&err),
    }
}

fn retry_closure(weak: Weak<RefCell<Inner>>) -> Closure<dyn FnMut()> {
    Closure::<dyn FnMut()>::new(move || {
        let Some(inner_rc) = weak.upgrade() else {
            return;
        };
        let reconnect = {
            let mut inner = inner_rc.borrow_mut();
            web_sys::console::warn_1(&JsValue::from_str(&format!(
                "WebSocket: attempting reconnect {}",
                inner.reconnect.attempts()
            )));
            // no socket at all means the first connect never got one
            let closed = inner
                .socket
                .as_ref()
                .is_none_or(|socket| socket.ready_state() == WebSocket::CLOSED);
            !inner.stopped && inner.reconnect.fired(closed)
        };
        if !reconnect {
            return;
        }
        if let Err(err) = connect(&inner_rc) {
            web_sys::console::error_1(&JsValue::from_str(&err.to_string()));
            schedule_retry(&inner_rc);
        }
    })
}
