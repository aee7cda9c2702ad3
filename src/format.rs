use serde_json::Value;

const MILLIS_PER_SECOND: f64 = 1000.0;
const MILLIS_PER_MINUTE: f64 = 1000.0 * 60.0;
const MILLIS_PER_HOUR: f64 = 1000.0 * 60.0 * 60.0;

/// Placeholder shown by timer targets when nothing is running.
pub const TIMER_PLACEHOLDER: &str = "--:--:--";

/// Renders a number the way `JSON.stringify` / `Number.prototype.toString` do
/// for the values a show timer produces.
pub fn js_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        // -0 prints as 0
        return "0".to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e21 {
        return format!("{:.0}", value);
    }
    format!("{}", value)
}

#[inline]
fn left_pad(value: f64) -> String {
    format!("{:0>2}", js_number(value.floor()))
}

/// Values within +/- 1000 are left as they are; everything else is treated as
/// milliseconds and rendered as a signed `HH:MM:SS`.
pub fn format_timer(millis: f64) -> String {
    if (-1000.0..=1000.0).contains(&millis) {
        return js_number(millis);
    }

    let sign = if millis < 0.0 { "-" } else { "" };
    let abs = millis.abs();
    format!(
        "{}{}:{}:{}",
        sign,
        left_pad(abs / MILLIS_PER_HOUR),
        left_pad((abs % MILLIS_PER_HOUR) / MILLIS_PER_MINUTE),
        left_pad((abs % MILLIS_PER_MINUTE) / MILLIS_PER_SECOND),
    )
}

/// Numeric coercion with JavaScript semantics: absent is `NaN`, `null` is 0.
pub fn to_number(value: Option<&Value>) -> f64 {
    match value {
        None => f64::NAN,
        Some(Value::Null) => 0.0,
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse().unwrap_or(f64::NAN)
            }
        }
        Some(_) => f64::NAN,
    }
}

/// `part / whole` as a CSS percentage. Multiplies before dividing so that
/// whole-number ratios such as 300/1000 come out as `30%`.
pub fn percent(part: Option<&Value>, whole: Option<&Value>) -> String {
    let ratio = to_number(part) * 100.0 / to_number(whole);
    format!("{}%", js_number(ratio))
}

/// JavaScript truthiness of a payload value.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0 && !v.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Coerces a value the way assigning it to `innerText` does.
pub fn to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => js_number(n.as_f64().unwrap_or(f64::NAN)),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => to_text(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// True when `text` contains a `DD:DD:DD` run anywhere.
pub fn looks_like_timer(text: &str) -> bool {
    text.as_bytes().windows(8).any(|w| {
        w[2] == b':'
            && w[5] == b':'
            && [0, 1, 3, 4, 6, 7].iter().all(|&i| w[i].is_ascii_digit())
    })
}
