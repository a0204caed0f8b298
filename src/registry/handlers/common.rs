//! Shared handler plumbing: node resolution and request-body assembly.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::context::Context;
use crate::error::CommandError;
use crate::registry::validation::Violation;

/// Resolve the target node: the explicit param, else the configured default.
/// Reported as a field-level violation so the caller sees which param to
/// supply, same as any other schema problem.
pub(super) fn require_node<'a>(
    ctx: &'a Context,
    explicit: Option<&'a str>,
) -> Result<&'a str, CommandError> {
    ctx.node(explicit).ok_or_else(|| CommandError::Validation {
        violations: vec![Violation::new(
            "node",
            "required (no default_node configured)",
        )],
    })
}

/// Request-body builder that only includes present fields. The API treats an
/// explicit `null` differently from an absent key, so optional params must
/// not be serialized when unset.
pub(super) struct Body(Map<String, Value>);

impl Body {
    pub(super) fn new() -> Self {
        Body(Map::new())
    }

    pub(super) fn set(mut self, key: &str, value: impl Serialize) -> Self {
        if let Ok(value) = serde_json::to_value(value) {
            self.0.insert(key.to_string(), value);
        }
        self
    }

    pub(super) fn opt(self, key: &str, value: Option<impl Serialize>) -> Self {
        match value {
            Some(value) => self.set(key, value),
            None => self,
        }
    }

    /// Boolean params travel as `1`; `false` means "omit the key".
    pub(super) fn flag(self, key: &str, on: bool) -> Self {
        if on {
            self.set(key, 1)
        } else {
            self
        }
    }

    /// Merge raw config keys verbatim (the `config`-map params).
    pub(super) fn merge(mut self, config: HashMap<String, Value>) -> Self {
        self.0.extend(config);
        self
    }

    pub(super) fn build(self) -> Value {
        Value::Object(self.0)
    }
}

/// Asynchronous operations reply with a task id; append it to the message
/// so the caller can follow up with `task status`.
pub(super) fn task_line(reply: &Value) -> String {
    match reply.as_str() {
        Some(upid) => format!("\nTask: {upid}"),
        None => String::new(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn body_omits_absent_and_false() {
        let body = Body::new()
            .set("vmid", 100)
            .opt("name", None::<&str>)
            .opt("cores", Some(4))
            .flag("purge", false)
            .flag("force", true)
            .build();
        assert_eq!(body, json!({"vmid": 100, "cores": 4, "force": 1}));
    }

    #[test]
    fn merge_keeps_raw_config_keys() {
        let mut config = std::collections::HashMap::new();
        config.insert("memory".to_string(), json!(8192));
        let body = Body::new().set("vmid", 100).merge(config).build();
        assert_eq!(body, json!({"vmid": 100, "memory": 8192}));
    }

    #[test]
    fn task_line_only_for_string_replies() {
        assert_eq!(task_line(&json!("UPID:pve1:0001:x")), "\nTask: UPID:pve1:0001:x");
        assert_eq!(task_line(&json!({"ok": true})), "");
        assert_eq!(task_line(&Value::Null), "");
    }
}
