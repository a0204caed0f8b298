use std::sync::OnceLock;

use indexmap::IndexMap;
use schemars::schema_for;
use serde::Serialize;
use serde_json::Value;

use super::{Command, CommandCategory, CommandInfo, Mutability};
use crate::error::CommandError;
use crate::registry::validation::Violation;

/// A registry entry: metadata plus the JSON schema of the params. The same
/// schema drives validation and the machine-readable command listing — it is
/// derived once, never hand-duplicated.
#[derive(Debug, Clone, Serialize)]
pub struct CommandRegistryEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub category: CommandCategory,
    pub mutability: Mutability,
    pub input_schema: Value,
}

pub(super) fn empty_object_schema() -> Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

pub(super) fn schema_value<T: schemars::JsonSchema>() -> Value {
    let root = schema_for!(T);
    serde_json::to_value(root).unwrap_or(empty_object_schema())
}

pub(super) fn entry(info: CommandInfo, input_schema: Value) -> CommandRegistryEntry {
    CommandRegistryEntry {
        name: info.name,
        description: info.description,
        category: info.category,
        mutability: info.mutability,
        input_schema,
    }
}

/// Deserialize already-validated params into their typed form. Failing here
/// means the schema validator and serde disagree about a shape.
pub(super) fn de<T: serde::de::DeserializeOwned>(input: &Value) -> Result<T, CommandError> {
    serde_json::from_value(input.clone()).map_err(|e| CommandError::Validation {
        violations: vec![Violation::new("params", e.to_string())],
    })
}

// ── The registry ────────────────────────────────────────────────

/// The externally documented command list. Deliberately maintained by hand,
/// separately from the `define_commands!` table: `verify_registry` compares
/// the two at startup so a command declared here but never wired (or wired
/// under a different name) aborts the process instead of surfacing as a
/// runtime "unknown command".
pub const DECLARED_COMMANDS: &[&str] = &[
    "vm",
    "container",
    "storage",
    "snapshot",
    "backup",
    "task",
    "user",
    "network",
    "service",
    "pool",
    "cluster_resources",
    "node_status",
    "help",
    "cluster_status",
    "node_list",
    "version",
    "next_vmid",
];

/// The complete command registry, keyed by name, built once per process.
pub fn registry() -> &'static IndexMap<&'static str, CommandRegistryEntry> {
    static REGISTRY: OnceLock<IndexMap<&'static str, CommandRegistryEntry>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        Command::registry_entries()
            .into_iter()
            .map(|e| (e.name, e))
            .collect()
    })
}

/// Startup completeness check: the registry and the declared command list
/// must agree exactly. Returns a diagnostic naming every discrepancy so
/// registration drift fails loudly at process start, not at first invocation.
pub fn verify_registry() -> Result<(), CommandError> {
    let mut problems = Vec::new();

    let entries = Command::registry_entries();
    if entries.len() != registry().len() {
        // IndexMap deduplicates on key, so a size difference means two
        // entries were registered under one name.
        for (i, e) in entries.iter().enumerate() {
            if entries.iter().take(i).any(|prev| prev.name == e.name) {
                problems.push(format!("duplicate registration: \"{}\"", e.name));
            }
        }
    }

    for name in DECLARED_COMMANDS {
        if !registry().contains_key(name) {
            problems.push(format!("declared but not registered: \"{name}\""));
        }
    }
    for name in registry().keys() {
        if !DECLARED_COMMANDS.contains(name) {
            problems.push(format!("registered but not declared: \"{name}\""));
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(CommandError::Internal {
            message: format!(
                "registry completeness check failed ({} problems): {}",
                problems.len(),
                problems.join("; ")
            ),
        })
    }
}

/// Machine-readable command listing for transports: name, description,
/// category, mutability, and the input schema used for validation.
pub fn to_json_schema() -> Value {
    Value::Array(
        registry()
            .values()
            .map(|e| {
                serde_json::json!({
                    "name": e.name,
                    "description": e.description,
                    "category": e.category,
                    "mutability": e.mutability,
                    "inputSchema": e.input_schema,
                })
            })
            .collect(),
    )
}

fn command_detail(entry: &CommandRegistryEntry) -> String {
    let schema =
        serde_json::to_string_pretty(&entry.input_schema).unwrap_or_else(|_| "{}".to_string());
    format!(
        "{}: {}\nCategory: {} | Mutability: {:?}\n\nParameters:\n{}",
        entry.name,
        entry.description,
        entry.category.slug(),
        entry.mutability,
        schema,
    )
}

/// Help text for command discovery. Three tiers: no topic → categories,
/// category → command list, command → description plus full schema. Six
/// consolidated commands share their category's slug; for those topics the
/// category listing comes first with the command's schema appended, so
/// neither tier is shadowed.
pub fn help_text(topic: Option<&str>) -> String {
    match topic {
        None => {
            let mut lines = vec!["Available command categories:".to_string()];
            for category in CommandCategory::all() {
                let count = registry()
                    .values()
                    .filter(|e| e.category == *category)
                    .count();
                if count > 0 {
                    lines.push(format!(
                        "  {} ({count}) — {}",
                        category.slug(),
                        category.description()
                    ));
                }
            }
            lines.push(String::new());
            lines.push("Use help with topic \"vm\" to list that category's commands.".to_string());
            lines.push("Use help with a command name for its full parameter schema.".to_string());
            lines.join("\n")
        }
        Some(topic) => {
            // Category name first: the overview directs people at the
            // category listing, so the listing wins a name collision.
            let slug = topic.to_lowercase();
            let matching: Vec<&CommandRegistryEntry> = registry()
                .values()
                .filter(|e| e.category.slug() == slug)
                .collect();

            if !matching.is_empty() {
                let mut lines = vec![format!("{slug} commands:")];
                for entry in &matching {
                    lines.push(format!("  - {}: {}", entry.name, entry.description));
                }
                lines.push(String::new());
                lines.push("Use help with a command name for parameter details.".to_string());
                if let Some(entry) = registry().get(slug.as_str()) {
                    lines.push(String::new());
                    lines.push(command_detail(entry));
                }
                return lines.join("\n");
            }

            // Then command name: full schema.
            if let Some(entry) = registry().get(topic) {
                return command_detail(entry);
            }

            format!("Unknown topic: \"{topic}\". Use help with no topic for an overview.")
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn registry_is_complete() {
        // The completeness invariant: declared set and registered set agree.
        verify_registry().unwrap();
        assert_eq!(registry().len(), DECLARED_COMMANDS.len());
    }

    #[test]
    fn every_name_resolves_to_exactly_one_entry() {
        for name in DECLARED_COMMANDS {
            let entry = registry().get(name).unwrap();
            assert_eq!(entry.name, *name);
        }
    }

    #[test]
    fn command_names_constant_matches_declared_set() {
        let mut a: Vec<&str> = crate::registry::COMMAND_NAMES.to_vec();
        let mut b: Vec<&str> = DECLARED_COMMANDS.to_vec();
        a.sort_unstable();
        b.sort_unstable();
        assert_eq!(a, b);
    }

    #[test]
    fn consolidated_schemas_carry_the_discriminator() {
        let entry = registry().get("vm").unwrap();
        let schema = serde_json::to_string(&entry.input_schema).unwrap();
        assert!(schema.contains("\"action\""));
        assert!(schema.contains("\"oneOf\""));
    }

    #[test]
    fn listing_derives_schema_from_registry() {
        let listing = to_json_schema();
        let items = listing.as_array().unwrap();
        assert_eq!(items.len(), DECLARED_COMMANDS.len());
        for item in items {
            assert!(item.get("name").is_some());
            assert!(item.get("inputSchema").is_some());
        }
    }

    #[test]
    fn help_tiers() {
        let overview = help_text(None);
        assert!(overview.contains("command categories"));
        assert!(overview.contains("vm"));

        let category = help_text(Some("cluster"));
        assert!(category.contains("cluster_status"));
        assert!(category.contains("cluster_resources"));

        let command = help_text(Some("snapshot"));
        assert!(command.contains("Parameters:"));
        assert!(command.contains("rollback"));

        let unknown = help_text(Some("nonsense"));
        assert!(unknown.contains("Unknown topic"));
    }

    #[test]
    fn colliding_topic_lists_the_category_before_the_command_schema() {
        // "vm" names both the Vm category and the vm command. The category
        // listing comes first, then the command's schema, so neither tier
        // is shadowed.
        for topic in ["vm", "container", "storage", "backup", "task", "network"] {
            let text = help_text(Some(topic));
            let listing = text.find(&format!("{topic} commands:")).unwrap();
            let schema = text.find("Parameters:").unwrap();
            assert!(listing < schema, "listing should precede schema for {topic}");
        }
        // The Vm category spans two commands.
        assert!(help_text(Some("vm")).contains("  - snapshot:"));
    }
}
