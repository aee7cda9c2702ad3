//! Routes decoded frames to projections.
//!
//! Each frame is `{"type": ..., "payload": ...}`. The dispatcher holds no state
//! between frames; the page itself is the only record of what was shown.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::DisplayError;
use crate::format::{TIMER_PLACEHOLDER, is_truthy, percent};
use crate::project::Projector;
use crate::surface::Surface;

const BAR_START: &str = "--barStart";
const BAR_END: &str = "--barEnd";
const BAR_PROGRESS: &str = "--barProgress";

const ON_AIR_TARGET: &str = "onAir-onAir";
const CLOCK_TARGET: &str = "clock-clock";
const MESSAGE_EXTERNAL_TARGET: &str = "message-external";

/// Timer targets forced to the placeholder while the timer is stopped.
const STOPPED_TIMER_TARGETS: [&str; 7] = [
    "timer-addedTime",
    "timer-current",
    "timer-duration",
    "timer-elapsed",
    "timer-expectedFinish",
    "timer-finishedAt",
    "timer-startedAt",
];

#[derive(Debug, Deserialize)]
pub struct Message {
    /// Anything but a string routes nowhere.
    #[serde(rename = "type", default)]
    pub kind: Value,
    #[serde(default)]
    pub payload: Value,
}

/// Display categories, each owning the targets under its id prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Category {
    EventNow,
    EventNext,
    PublicEventNow,
    PublicEventNext,
    CurrentBlock,
    Message,
    Timer,
    OnAir,
    Clock,
    Runtime,
    AuxTimer1,
    Log,
    Client,
}

impl Category {
    pub fn prefix(self) -> &'static str {
        match self {
            Category::EventNow => "eventNow",
            Category::EventNext => "eventNext",
            Category::PublicEventNow => "publicEventNow",
            Category::PublicEventNext => "publicEventNext",
            Category::CurrentBlock => "currentBlock",
            Category::Message => "message",
            Category::Timer => "timer",
            Category::OnAir => "onAir",
            Category::Clock => "clock",
            Category::Runtime => "runtime",
            Category::AuxTimer1 => "auxtimer1",
            Category::Log => "log",
            Category::Client => "client",
        }
    }
}

/// What a message `type` asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Snapshot,
    /// Plain category: clear when falsy, project otherwise.
    Fields(Category),
    Message,
    Timer,
    OnAir,
    Clock,
    CurrentBlock,
    Unknown,
}

impl Route {
    pub fn for_type(kind: &str) -> Self {
        match kind {
            "ontime" => Route::Snapshot,
            "ontime-eventNow" => Route::Fields(Category::EventNow),
            "ontime-eventNext" => Route::Fields(Category::EventNext),
            "ontime-publicEventNow" => Route::Fields(Category::PublicEventNow),
            "ontime-publicEventNext" => Route::Fields(Category::PublicEventNext),
            "ontime-auxtimer1" => Route::Fields(Category::AuxTimer1),
            "ontime-runtime" => Route::Fields(Category::Runtime),
            "ontime-log" => Route::Fields(Category::Log),
            "client" => Route::Fields(Category::Client),
            "ontime-message" => Route::Message,
            "ontime-timer" => Route::Timer,
            "ontime-onAir" => Route::OnAir,
            "ontime-clock" => Route::Clock,
            "ontime-currentBlock" => Route::CurrentBlock,
            _ => Route::Unknown,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Dispatcher {
    projector: Projector,
}

impl Dispatcher {
    pub fn new(projector: Projector) -> Self {
        Self { projector }
    }

    pub fn projector(&self) -> &Projector {
        &self.projector
    }

    /// Decodes one frame and applies it to `surface`.
    pub fn dispatch<S: Surface>(&self, surface: &mut S, frame: &str) -> Result<Route, DisplayError> {
        let message: Message = serde_json::from_str(frame).map_err(DisplayError::MalformedFrame)?;
        Ok(self.apply(surface, &message))
    }

    pub fn apply<S: Surface>(&self, surface: &mut S, message: &Message) -> Route {
        let route = message.kind.as_str().map_or(Route::Unknown, Route::for_type);
        let payload = &message.payload;

        match route {
            Route::Snapshot => self.snapshot(surface, payload),
            Route::Fields(category) => {
                if !is_truthy(Some(payload)) {
                    self.projector.clear(surface, category.prefix());
                    return route;
                }
                self.projector.project_fields(surface, category.prefix(), payload);
                if category == Category::EventNow {
                    update_bar_thresholds(surface, payload);
                }
            }
            Route::Message => {
                if !is_truthy(Some(payload)) {
                    self.projector.clear(surface, Category::Message.prefix());
                    return route;
                }
                self.project_message(surface, payload);
            }
            Route::Timer => self.timer(surface, payload),
            Route::OnAir => {
                self.projector.update(surface, ON_AIR_TARGET, payload);
            }
            Route::Clock => {
                if !is_truthy(Some(payload)) {
                    self.projector.clear(surface, Category::Clock.prefix());
                    return route;
                }
                self.projector.update(surface, CLOCK_TARGET, payload);
            }
            Route::CurrentBlock => {
                let started_at = payload.get("startedAt");
                if !is_truthy(started_at) {
                    self.projector.clear(surface, Category::CurrentBlock.prefix());
                    return route;
                }
                let block = merge_started_at(payload.get("block"), started_at);
                self.projector
                    .project_fields(surface, Category::CurrentBlock.prefix(), &block);
            }
            Route::Unknown => {}
        }

        route
    }

    /// Full state snapshot. Nothing is touched while no event is loaded, which
    /// also leaves message, runtime, clock and aux timer targets stale.
    fn snapshot<S: Surface>(&self, surface: &mut S, payload: &Value) {
        let Some(event_now) = payload.get("eventNow").filter(|v| is_truthy(Some(*v))) else {
            return;
        };

        let projector = &self.projector;
        let sections = [
            (Category::EventNow, Some(event_now)),
            (Category::EventNext, payload.get("eventNext")),
            (Category::PublicEventNow, payload.get("publicEventNow")),
            (Category::PublicEventNext, payload.get("publicEventNext")),
        ];
        for (category, section) in sections {
            if let Some(section) = section.filter(|v| is_truthy(Some(*v))) {
                projector.project_fields(surface, category.prefix(), section);
            }
        }

        let current_block = payload.get("currentBlock");
        let block = current_block.and_then(|cb| cb.get("block"));
        if is_truthy(block) {
            let block = merge_started_at(block, current_block.and_then(|cb| cb.get("startedAt")));
            projector.project_fields(surface, Category::CurrentBlock.prefix(), &block);
        }

        if let Some(on_air) = payload.get("onAir") {
            projector.update(surface, ON_AIR_TARGET, on_air);
        }
        if let Some(clock) = payload.get("clock") {
            projector.update(surface, CLOCK_TARGET, clock);
        }
        if let Some(message) = payload.get("message") {
            self.project_message(surface, message);
        }
        for category in [Category::Runtime, Category::AuxTimer1] {
            if let Some(section) = payload.get(category.prefix()) {
                projector.project_fields(surface, category.prefix(), section);
            }
        }

        update_bar_thresholds(surface, event_now);
    }

    fn project_message<S: Surface>(&self, surface: &mut S, message: &Value) {
        if let Some(timer) = message.get("timer") {
            self.projector
                .project_fields(surface, Category::Message.prefix(), timer);
        }
        if let Some(external) = message.get("external") {
            self.projector
                .update(surface, MESSAGE_EXTERNAL_TARGET, external);
        }
    }

    fn timer<S: Surface>(&self, surface: &mut S, payload: &Value) {
        let prefix = Category::Timer.prefix();
        self.projector.project_fields(surface, prefix, payload);

        if !is_truthy(payload.get("current")) {
            for id in STOPPED_TIMER_TARGETS {
                if surface.has_target(id) {
                    surface.set_text(id, TIMER_PLACEHOLDER);
                }
            }
            surface.set_root_property(BAR_START, "0%");
            surface.set_root_property(BAR_END, "0%");
            surface.set_root_property(BAR_PROGRESS, "100%");
            return;
        }

        if payload.get("playback").and_then(Value::as_str) == Some("play") {
            let progress = percent(payload.get("elapsed"), payload.get("duration"));
            surface.set_root_property(BAR_PROGRESS, &progress);
        }
    }
}

/// Warning and danger thresholds of the running event as bar percentages.
fn update_bar_thresholds<S: Surface>(surface: &mut S, event: &Value) {
    let duration = event.get("duration");
    surface.set_root_property(BAR_START, &percent(event.get("timeWarning"), duration));
    surface.set_root_property(BAR_END, &percent(event.get("timeDanger"), duration));
}

fn merge_started_at(block: Option<&Value>, started_at: Option<&Value>) -> Value {
    let mut fields = match block {
        Some(Value::Object(fields)) => fields.clone(),
        _ => Map::new(),
    };
    if let Some(started_at) = started_at {
        fields.insert("startedAt".to_string(), started_at.clone());
    }
    Value::Object(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::memory::MemorySurface;
    use serde_json::json;

    fn send(surface: &mut MemorySurface, message: Value) -> Route {
        Dispatcher::default()
            .dispatch(surface, &message.to_string())
            .expect("frame decodes")
    }

    #[test]
    fn clock_clear_uses_placeholder_for_timers() {
        let mut surface = MemorySurface::with_targets(&["clock-clock"]);
        send(&mut surface, json!({"type": "ontime-clock", "payload": 3_723_000}));
        assert_eq!(surface.text_of("clock-clock"), "01:02:03");

        send(&mut surface, json!({"type": "ontime-clock", "payload": null}));
        assert_eq!(surface.text_of("clock-clock"), "--:--:--");

        surface.targets.get_mut("clock-clock").unwrap().text = "noon".into();
        send(&mut surface, json!({"type": "ontime-clock", "payload": null}));
        assert_eq!(surface.text_of("clock-clock"), "");
    }

    #[test]
    fn event_now_sets_bar_thresholds_and_fields() {
        let mut surface = MemorySurface::with_targets(&["eventNow-title"]);
        send(
            &mut surface,
            json!({
                "type": "ontime-eventNow",
                "payload": {"duration": 1000, "timeWarning": 300, "timeDanger": 100, "title": "Intro"}
            }),
        );
        assert_eq!(surface.root_property("--barStart"), Some("30%"));
        assert_eq!(surface.root_property("--barEnd"), Some("10%"));
        assert_eq!(surface.text_of("eventNow-title"), "Intro");
    }

    #[test]
    fn event_now_null_clears_category() {
        let mut surface = MemorySurface::with_targets(&["eventNow-title"]);
        send(&mut surface, json!({"type": "ontime-eventNow", "payload": {"title": "Intro"}}));
        send(&mut surface, json!({"type": "ontime-eventNow", "payload": null}));
        assert_eq!(surface.text_of("eventNow-title"), "");
        assert_eq!(surface.root_property("--barStart"), Some("NaN%"));
    }

    #[test]
    fn stopped_timer_resets_bars_and_placeholders() {
        let mut surface = MemorySurface::with_targets(&[
            "timer-current",
            "timer-duration",
            "timer-elapsed",
            "timer-playback",
        ]);
        send(
            &mut surface,
            json!({"type": "ontime-timer", "payload": {"current": null, "elapsed": 0, "playback": "stop"}}),
        );
        assert_eq!(surface.root_property("--barStart"), Some("0%"));
        assert_eq!(surface.root_property("--barEnd"), Some("0%"));
        assert_eq!(surface.root_property("--barProgress"), Some("100%"));
        assert_eq!(surface.text_of("timer-current"), "--:--:--");
        assert_eq!(surface.text_of("timer-duration"), "--:--:--");
        assert_eq!(surface.text_of("timer-elapsed"), "--:--:--");
        assert_eq!(surface.text_of("timer-playback"), "stop");
    }

    #[test]
    fn playing_timer_sets_progress() {
        let mut surface = MemorySurface::with_targets(&["timer-current"]);
        send(
            &mut surface,
            json!({
                "type": "ontime-timer",
                "payload": {"current": 3_723_000, "elapsed": 250_000, "duration": 1_000_000, "playback": "play"}
            }),
        );
        assert_eq!(surface.text_of("timer-current"), "01:02:03");
        assert_eq!(surface.root_property("--barProgress"), Some("25%"));

        let mut paused = MemorySurface::default();
        send(
            &mut paused,
            json!({"type": "ontime-timer", "payload": {"current": 5000, "playback": "pause"}}),
        );
        assert_eq!(paused.root_property("--barProgress"), None);
    }

    #[test]
    fn message_projects_timer_and_external() {
        let mut surface =
            MemorySurface::with_targets(&["message-text", "message-external"]).with_checkbox("message-visible");
        send(
            &mut surface,
            json!({
                "type": "ontime-message",
                "payload": {"timer": {"text": "Wrap up", "visible": true}, "external": "Hi"}
            }),
        );
        assert_eq!(surface.text_of("message-text"), "Wrap up");
        assert!(surface.targets["message-visible"].checked);
        assert_eq!(surface.text_of("message-external"), "Hi");

        send(&mut surface, json!({"type": "ontime-message", "payload": null}));
        assert_eq!(surface.text_of("message-text"), "");
        assert_eq!(surface.text_of("message-external"), "");
        assert!(!surface.targets["message-visible"].checked);
    }

    #[test]
    fn on_air_has_no_clear_path() {
        let mut surface = MemorySurface::default().with_checkbox("onAir-onAir");
        send(&mut surface, json!({"type": "ontime-onAir", "payload": true}));
        assert!(surface.targets["onAir-onAir"].checked);
        send(&mut surface, json!({"type": "ontime-onAir", "payload": false}));
        assert!(!surface.targets["onAir-onAir"].checked);
    }

    #[test]
    fn current_block_merges_started_at() {
        let mut surface = MemorySurface::with_targets(&["currentBlock-title", "currentBlock-startedAt"]);
        send(
            &mut surface,
            json!({
                "type": "ontime-currentBlock",
                "payload": {"block": {"title": "Act 1"}, "startedAt": 3_723_000}
            }),
        );
        assert_eq!(surface.text_of("currentBlock-title"), "Act 1");
        assert_eq!(surface.text_of("currentBlock-startedAt"), "01:02:03");

        send(
            &mut surface,
            json!({"type": "ontime-currentBlock", "payload": {"block": null, "startedAt": null}}),
        );
        assert_eq!(surface.text_of("currentBlock-title"), "");
        assert_eq!(surface.text_of("currentBlock-startedAt"), "--:--:--");
    }

    #[test]
    fn client_and_log_categories() {
        let mut surface = MemorySurface::with_targets(&["client-clientName", "log-level"]);
        send(&mut surface, json!({"type": "client", "payload": {"clientName": "FOH"}}));
        send(&mut surface, json!({"type": "ontime-log", "payload": {"level": "INFO"}}));
        assert_eq!(surface.text_of("client-clientName"), "FOH");
        assert_eq!(surface.text_of("log-level"), "INFO");

        send(&mut surface, json!({"type": "client", "payload": null}));
        assert_eq!(surface.text_of("client-clientName"), "");
    }

    #[test]
    fn snapshot_projects_everything() {
        let mut surface = MemorySurface::with_targets(&[
            "eventNow-title",
            "eventNext-title",
            "publicEventNow-title",
            "currentBlock-title",
            "currentBlock-startedAt",
            "clock-clock",
            "message-text",
            "message-external",
            "runtime-offset",
            "auxtimer1-current",
        ])
        .with_checkbox("onAir-onAir");

        let route = send(
            &mut surface,
            json!({
                "type": "ontime",
                "payload": {
                    "timer": {"current": 5000, "playback": "play"},
                    "eventNow": {"title": "Intro", "duration": 1000, "timeWarning": 300, "timeDanger": 100},
                    "eventNext": {"title": "Outro"},
                    "publicEventNow": {"title": "Welcome"},
                    "publicEventNext": null,
                    "currentBlock": {"block": {"title": "Act 1"}, "startedAt": 7_200_000},
                    "onAir": true,
                    "clock": 3_723_000,
                    "message": {"timer": {"text": "Hello"}, "external": "Ext"},
                    "runtime": {"offset": 500},
                    "auxtimer1": {"current": 60_000}
                }
            }),
        );

        assert_eq!(route, Route::Snapshot);
        assert_eq!(surface.text_of("eventNow-title"), "Intro");
        assert_eq!(surface.text_of("eventNext-title"), "Outro");
        assert_eq!(surface.text_of("publicEventNow-title"), "Welcome");
        assert_eq!(surface.text_of("currentBlock-title"), "Act 1");
        assert_eq!(surface.text_of("currentBlock-startedAt"), "02:00:00");
        assert!(surface.targets["onAir-onAir"].checked);
        assert_eq!(surface.text_of("clock-clock"), "01:02:03");
        assert_eq!(surface.text_of("message-text"), "Hello");
        assert_eq!(surface.text_of("message-external"), "Ext");
        assert_eq!(surface.text_of("runtime-offset"), "500");
        assert_eq!(surface.text_of("auxtimer1-current"), "00:01:00");
        assert_eq!(surface.root_property("--barStart"), Some("30%"));
        assert_eq!(surface.root_property("--barEnd"), Some("10%"));
    }

    #[test]
    fn snapshot_without_event_now_changes_nothing() {
        let mut surface = MemorySurface::with_targets(&["clock-clock", "message-text"]);
        send(
            &mut surface,
            json!({
                "type": "ontime",
                "payload": {"eventNow": null, "clock": 3_723_000, "message": {"timer": {"text": "Hello"}}}
            }),
        );
        assert_eq!(surface.text_of("clock-clock"), "");
        assert_eq!(surface.text_of("message-text"), "");
        assert!(surface.root.is_empty());
    }

    #[test]
    fn snapshot_skips_absent_fields() {
        let mut surface =
            MemorySurface::with_targets(&["clock-clock", "message-external", "currentBlock-startedAt"])
                .with_checkbox("onAir-onAir");
        surface.targets.get_mut("onAir-onAir").unwrap().checked = true;
        surface.targets.get_mut("clock-clock").unwrap().text = "01:02:03".into();
        surface.targets.get_mut("message-external").unwrap().text = "Ext".into();
        surface.targets.get_mut("currentBlock-startedAt").unwrap().text = "02:00:00".into();

        send(
            &mut surface,
            json!({
                "type": "ontime",
                "payload": {
                    "eventNow": {"title": "Intro"},
                    "currentBlock": {"block": {"title": "Act 1"}},
                    "message": {"timer": {"text": "Hello"}}
                }
            }),
        );

        assert!(surface.targets["onAir-onAir"].checked);
        assert_eq!(surface.text_of("clock-clock"), "01:02:03");
        assert_eq!(surface.text_of("message-external"), "Ext");
        assert_eq!(surface.text_of("currentBlock-startedAt"), "02:00:00");
    }

    #[test]
    fn unknown_type_is_ignored() {
        let mut surface = MemorySurface::with_targets(&["eventNow-title"]);
        let route = send(&mut surface, json!({"type": "ontime-refetch", "payload": {"title": "x"}}));
        assert_eq!(route, Route::Unknown);
        assert_eq!(surface.text_of("eventNow-title"), "");
    }

    #[test]
    fn malformed_frame_is_an_error() {
        let mut surface = MemorySurface::default();
        let dispatcher = Dispatcher::default();
        assert!(matches!(
            dispatcher.dispatch(&mut surface, "{not json"),
            Err(DisplayError::MalformedFrame(_))
        ));
    }

    #[test]
    fn non_string_type_is_ignored() {
        let mut surface = MemorySurface::with_targets(&["eventNow-title"]);
        let dispatcher = Dispatcher::default();
        for frame in [
            r#"{"type": 5, "payload": null}"#,
            r#"{"type": null, "payload": {"title": "x"}}"#,
            r#"{"payload": 1}"#,
        ] {
            let route = dispatcher.dispatch(&mut surface, frame).expect("frame decodes");
            assert_eq!(route, Route::Unknown);
        }
        assert_eq!(surface.text_of("eventNow-title"), "");
    }

    #[test]
    fn log_string_payload_projects_characters() {
        let mut surface = MemorySurface::with_targets(&["log-0", "log-1"]);
        send(&mut surface, json!({"type": "ontime-log", "payload": "ab"}));
        assert_eq!(surface.text_of("log-0"), "a");
        assert_eq!(surface.text_of("log-1"), "b");
    }

    #[test]
    fn missing_payload_counts_as_null() {
        let mut surface = MemorySurface::with_targets(&["runtime-offset"]);
        send(&mut surface, json!({"type": "ontime-runtime", "payload": {"offset": 5}}));
        send(&mut surface, json!({"type": "ontime-runtime"}));
        assert_eq!(surface.text_of("runtime-offset"), "");
    }
}
