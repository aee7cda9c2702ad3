use serde_json::Value;

use crate::format::{TIMER_PLACEHOLDER, looks_like_timer};
use crate::schema::{FieldSchema, Write};
use crate::surface::Surface;

pub const DEFAULT_TIMESTAMP_ID: &str = "timestamp";

/// Writes payload fields into display targets.
#[derive(Clone, Debug)]
pub struct Projector {
    schema: FieldSchema,
    timestamp_id: String,
}

impl Default for Projector {
    fn default() -> Self {
        Self::new(FieldSchema::default(), DEFAULT_TIMESTAMP_ID)
    }
}

impl Projector {
    pub fn new(schema: FieldSchema, timestamp_id: impl Into<String>) -> Self {
        Self {
            schema,
            timestamp_id: timestamp_id.into(),
        }
    }

    /// Writes `value` into the target `field_key`. Returns false when the page
    /// has no such target.
    pub fn update<S: Surface>(&self, surface: &mut S, field_key: &str, value: &Value) -> bool {
        if !surface.has_target(field_key) {
            return false;
        }

        match self.schema.resolve(field_key, value) {
            Write::Checked(checked) => surface.set_checked(field_key, checked),
            Write::Text(text) => surface.set_text(field_key, &text),
            Write::Property { name, value } => surface.set_target_property(field_key, &name, &value),
        }

        if surface.has_target(&self.timestamp_id) {
            let now = surface.now();
            surface.set_text(&self.timestamp_id, &now);
        }
        true
    }

    /// Projects every entry of a payload under `<prefix>-<key>`. Strings and
    /// arrays contribute one entry per index, numbers and booleans none.
    pub fn project_fields<S: Surface>(&self, surface: &mut S, prefix: &str, payload: &Value) {
        match payload {
            Value::Object(fields) => {
                for (key, value) in fields {
                    self.update(surface, &format!("{}-{}", prefix, key), value);
                }
            }
            Value::Array(items) => {
                for (i, value) in items.iter().enumerate() {
                    self.update(surface, &format!("{}-{}", prefix, i), value);
                }
            }
            Value::String(text) => {
                for (i, ch) in text.chars().enumerate() {
                    self.update(surface, &format!("{}-{}", prefix, i), &Value::String(ch.to_string()));
                }
            }
            _ => {}
        }
    }

    /// Resets every target under `prefix` to its "nothing active" state.
    pub fn clear<S: Surface>(&self, surface: &mut S, prefix: &str) {
        for id in surface.target_ids(prefix) {
            let showing_timer = surface.text(&id).is_some_and(|text| looks_like_timer(&text));
            surface.set_text(&id, if showing_timer { TIMER_PLACEHOLDER } else { "" });
            if surface.is_checkbox(&id) {
                surface.set_checked(&id, false);
            }
        }

        let colour_id = format!("{}-colour", prefix);
        if surface.has_target(&colour_id) {
            surface.set_target_property(&colour_id, &format!("--{}", colour_id), "transparent");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldKind;
    use crate::surface::memory::MemorySurface;
    use serde_json::json;

    #[test]
    fn missing_target_is_a_no_op() {
        let mut surface = MemorySurface::with_targets(&["timestamp"]);
        let projector = Projector::default();
        assert!(!projector.update(&mut surface, "eventNow-title", &json!("Intro")));
        assert_eq!(surface.text_of("timestamp"), "");
    }

    #[test]
    fn update_writes_value_and_timestamp() {
        let mut surface = MemorySurface::with_targets(&["eventNow-title", "timestamp"]);
        let projector = Projector::default();
        assert!(projector.update(&mut surface, "eventNow-title", &json!("Intro")));
        assert_eq!(surface.text_of("eventNow-title"), "Intro");
        assert_eq!(surface.text_of("timestamp"), "Fri Oct 16 2026 12:00:00");
    }

    #[test]
    fn update_strategies() {
        let mut surface =
            MemorySurface::with_targets(&["eventNow-colour", "eventNow-duration"]).with_checkbox("onAir-onAir");
        let projector = Projector::default();

        projector.update(&mut surface, "onAir-onAir", &json!(true));
        projector.update(&mut surface, "eventNow-colour", &json!("#00ff00"));
        projector.update(&mut surface, "eventNow-duration", &json!(3_723_000));

        assert!(surface.targets["onAir-onAir"].checked);
        assert_eq!(
            surface.targets["eventNow-colour"].properties["--eventNow-colour"],
            "#00ff00"
        );
        assert_eq!(surface.targets["eventNow-colour"].text, "");
        assert_eq!(surface.text_of("eventNow-duration"), "01:02:03");
    }

    #[test]
    fn timestamp_id_is_configurable() {
        let mut surface = MemorySurface::with_targets(&["client-name", "last-update"]);
        let projector = Projector::new(
            FieldSchema::default().with_kind("client-name", FieldKind::Json),
            "last-update",
        );
        projector.update(&mut surface, "client-name", &json!("stage"));
        assert_eq!(surface.text_of("client-name"), "\"stage\"");
        assert!(!surface.text_of("last-update").is_empty());
    }

    #[test]
    fn clear_resets_timers_text_checkboxes_and_colour() {
        let mut surface =
            MemorySurface::with_targets(&["eventNow-duration", "eventNow-title", "eventNow-colour", "eventNext-title"])
                .with_checkbox("eventNow-isPublic");
        let projector = Projector::default();

        projector.project_fields(
            &mut surface,
            "eventNow",
            &json!({
                "duration": 3_723_000,
                "title": "Intro",
                "colour": "#123456",
                "isPublic": true,
            }),
        );
        projector.update(&mut surface, "eventNext-title", &json!("Outro"));

        projector.clear(&mut surface, "eventNow");

        assert_eq!(surface.text_of("eventNow-duration"), "--:--:--");
        assert_eq!(surface.text_of("eventNow-title"), "");
        assert!(!surface.targets["eventNow-isPublic"].checked);
        assert_eq!(
            surface.targets["eventNow-colour"].properties["--eventNow-colour"],
            "transparent"
        );
        assert_eq!(surface.text_of("eventNext-title"), "Outro");
    }

    #[test]
    fn arrays_and_strings_project_by_index() {
        let mut surface = MemorySurface::with_targets(&["runtime-0", "runtime-1", "log-0", "log-1"]);
        let projector = Projector::default();
        projector.project_fields(&mut surface, "runtime", &json!(["a", 5]));
        projector.project_fields(&mut surface, "log", &json!("ab"));
        assert_eq!(surface.text_of("runtime-0"), "a");
        assert_eq!(surface.text_of("runtime-1"), "5");
        assert_eq!(surface.text_of("log-0"), "a");
        assert_eq!(surface.text_of("log-1"), "b");
    }

    #[test]
    fn scalar_payload_projects_nothing() {
        let mut surface = MemorySurface::with_targets(&["runtime-0"]);
        let projector = Projector::default();
        projector.project_fields(&mut surface, "runtime", &json!(42));
        projector.project_fields(&mut surface, "runtime", &json!(true));
        assert_eq!(surface.text_of("runtime-0"), "");
    }
}
