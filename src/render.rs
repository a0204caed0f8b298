//! Formatting seam between raw JSON replies and the text blocks the envelope
//! carries. Pure functions over `serde_json::Value`; no business logic.

use serde_json::Value;

/// Status glyph for a VM/container/service state string.
pub fn status_glyph(status: &str) -> &'static str {
    match status {
        "running" | "online" | "active" | "available" => "🟢",
        "stopped" | "offline" | "dead" | "inactive" => "🔴",
        "paused" | "suspended" => "⏸",
        _ => "⚪",
    }
}

/// Human-readable byte size: 1536 → "1.5 KiB".
pub fn human_bytes(bytes: f64) -> String {
    const UNITS: [&str; 6] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB"];
    if !bytes.is_finite() || bytes < 0.0 {
        return "unknown".to_string();
    }
    let mut value = bytes;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let name = UNITS.get(unit).copied().unwrap_or("B");
    if unit == 0 {
        format!("{value:.0} {name}")
    } else {
        format!("{value:.1} {name}")
    }
}

/// Human-readable uptime: 93784 → "1d 2h 3m".
pub fn human_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3600;
    let minutes = (seconds % 3600) / 60;
    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// String field of a JSON object, or "-" when absent.
pub fn str_field<'a>(v: &'a Value, key: &str) -> &'a str {
    v.get(key).and_then(Value::as_str).unwrap_or("-")
}

/// Integer field of a JSON object, if present.
pub fn int_field(v: &Value, key: &str) -> Option<i64> {
    v.get(key).and_then(Value::as_i64)
}

/// Float field of a JSON object, if present.
pub fn num_field(v: &Value, key: &str) -> Option<f64> {
    v.get(key).and_then(Value::as_f64)
}

/// A titled markdown section listing items, one formatted line each.
/// Empty lists render the section header with "No {empty_label} found."
pub fn list_section<T>(
    title: &str,
    items: &[T],
    empty_label: &str,
    mut line: impl FnMut(&T) -> String,
) -> String {
    let mut lines = vec![format!("**{title}** ({})", items.len())];
    if items.is_empty() {
        lines.push(format!("No {empty_label} found."));
    } else {
        for item in items {
            lines.push(format!("- {}", line(item)));
        }
    }
    lines.join("\n")
}

/// A titled key/value detail block: one `- key: value` line per pair, JSON
/// values rendered compactly.
pub fn detail_block(title: &str, v: &Value) -> String {
    let mut lines = vec![format!("**{title}**")];
    if let Some(map) = v.as_object() {
        for (key, value) in map {
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            lines.push(format!("- {key}: {rendered}"));
        }
    } else {
        lines.push(v.to_string());
    }
    lines.join("\n")
}

/// The items of a JSON array reply, tolerating `null` (the API returns null
/// for some empty collections).
pub fn as_items(v: &Value) -> Vec<Value> {
    match v {
        Value::Array(items) => items.clone(),
        Value::Null => Vec::new(),
        other => vec![other.clone()],
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bytes_humanized() {
        assert_eq!(human_bytes(512.0), "512 B");
        assert_eq!(human_bytes(1536.0), "1.5 KiB");
        assert_eq!(human_bytes(3.0 * 1024.0 * 1024.0 * 1024.0), "3.0 GiB");
        assert_eq!(human_bytes(-1.0), "unknown");
    }

    #[test]
    fn uptime_humanized() {
        assert_eq!(human_uptime(93_784), "1d 2h 3m");
        assert_eq!(human_uptime(3_660), "1h 1m");
        assert_eq!(human_uptime(59), "0m");
    }

    #[test]
    fn glyphs_cover_common_states() {
        assert_eq!(status_glyph("running"), "🟢");
        assert_eq!(status_glyph("stopped"), "🔴");
        assert_eq!(status_glyph("paused"), "⏸");
        assert_eq!(status_glyph("mystery"), "⚪");
    }

    #[test]
    fn empty_list_renders_not_found() {
        let text = list_section::<Value>("VMs", &[], "virtual machines", |_| String::new());
        assert!(text.contains("**VMs** (0)"));
        assert!(text.contains("No virtual machines found."));
    }

    #[test]
    fn detail_block_renders_pairs() {
        let text = detail_block("Node", &json!({"cpu": 0.12, "name": "pve1"}));
        assert!(text.contains("- name: pve1"));
        assert!(text.contains("- cpu: 0.12"));
    }

    #[test]
    fn as_items_tolerates_null() {
        assert!(as_items(&Value::Null).is_empty());
        assert_eq!(as_items(&json!([1, 2])).len(), 2);
    }
}
