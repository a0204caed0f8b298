//! Params validation against the registry's JSON schemas.
//!
//! Raw params are checked structurally before any deserialization so a
//! caller gets the complete list of problems in one response, not the
//! first syntax error serde happens to hit. The walker understands the
//! subset of JSON Schema that `schemars` derives emit: `$ref` into
//! `definitions`, `oneOf` tagged unions, `anyOf` for optionals, plus the
//! usual type / required / enum / bounds keywords.

use serde::Serialize;
use serde_json::Value;

/// One concrete schema violation, addressed by dotted path into the params
/// object (`""` for the root, `disks[2].size` for nested values).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Validate `input` against `schema` (a serialized `schemars` root schema).
/// Returns every violation found; an empty vec means the params are valid
/// and typed deserialization cannot fail on shape.
pub fn validate(schema: &Value, input: &Value) -> Vec<Violation> {
    let mut violations = Vec::new();
    let definitions = schema.get("definitions");
    walk(schema, input, "", definitions, &mut violations);
    violations
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn resolve<'a>(schema: &'a Value, definitions: Option<&'a Value>) -> &'a Value {
    let mut current = schema;
    // Refs in generated schemas are one level deep; the depth guard covers
    // ref-to-ref chains without risking a cycle.
    for _ in 0..8 {
        let Some(reference) = current.get("$ref").and_then(Value::as_str) else {
            return current;
        };
        let Some(name) = reference.strip_prefix("#/definitions/") else {
            return current;
        };
        match definitions.and_then(|d| d.get(name)) {
            Some(target) => current = target,
            None => return current,
        }
    }
    current
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                "integer"
            } else {
                "number"
            }
        }
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "number" => matches!(value, Value::Number(_)),
        "integer" => matches!(value, Value::Number(n) if n.is_i64() || n.is_u64()),
        other => type_name(value) == other,
    }
}

fn check_type(schema: &Value, input: &Value, path: &str, out: &mut Vec<Violation>) -> bool {
    let Some(expected) = schema.get("type") else {
        return true;
    };
    let allowed: Vec<&str> = match expected {
        Value::String(s) => vec![s.as_str()],
        Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
        _ => return true,
    };
    if allowed.iter().any(|t| type_matches(t, input)) {
        return true;
    }
    out.push(Violation::new(
        path,
        format!(
            "expected {}, got {}",
            allowed.join(" or "),
            type_name(input)
        ),
    ));
    false
}

fn literal_display(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{s}\""),
        other => other.to_string(),
    }
}

fn check_enum(schema: &Value, input: &Value, path: &str, out: &mut Vec<Violation>) {
    let Some(allowed) = schema.get("enum").and_then(Value::as_array) else {
        return;
    };
    if allowed.contains(input) {
        return;
    }
    let options: Vec<String> = allowed.iter().map(literal_display).collect();
    out.push(Violation::new(
        path,
        format!(
            "must be one of {}, got {}",
            options.join(", "),
            literal_display(input)
        ),
    ));
}

fn check_bounds(schema: &Value, input: &Value, path: &str, out: &mut Vec<Violation>) {
    if let Some(n) = input.as_f64() {
        if let Some(min) = schema.get("minimum").and_then(Value::as_f64) {
            if n < min {
                out.push(Violation::new(path, format!("must be >= {min}, got {n}")));
            }
        }
        if let Some(max) = schema.get("maximum").and_then(Value::as_f64) {
            if n > max {
                out.push(Violation::new(path, format!("must be <= {max}, got {n}")));
            }
        }
    }
    if let Some(s) = input.as_str() {
        let len = s.chars().count();
        if let Some(min) = schema.get("minLength").and_then(Value::as_u64) {
            if (len as u64) < min {
                out.push(Violation::new(
                    path,
                    format!("must be at least {min} characters, got {len}"),
                ));
            }
        }
        if let Some(max) = schema.get("maxLength").and_then(Value::as_u64) {
            if (len as u64) > max {
                out.push(Violation::new(
                    path,
                    format!("must be at most {max} characters, got {len}"),
                ));
            }
        }
    }
}

/// Look for a tagged-union discriminator in a `oneOf`: a property that
/// every branch requires with exactly one allowed literal.
fn discriminator_key<'a>(
    branches: &'a [Value],
    definitions: Option<&'a Value>,
) -> Option<&'a str> {
    let first = resolve(branches.first()?, definitions);
    let properties = first.get("properties")?.as_object()?;
    properties
        .keys()
        .map(String::as_str)
        .find(|key| branches.iter().all(|b| branch_literal(b, key, definitions).is_some()))
}

/// The single literal a branch requires for `key`, if it is a tag property.
fn branch_literal<'a>(
    branch: &'a Value,
    key: &str,
    definitions: Option<&'a Value>,
) -> Option<&'a Value> {
    let branch = resolve(branch, definitions);
    let required = branch.get("required")?.as_array()?;
    if !required.iter().any(|r| r.as_str() == Some(key)) {
        return None;
    }
    let prop = resolve(branch.get("properties")?.get(key)?, definitions);
    let allowed = prop.get("enum")?.as_array()?;
    if allowed.len() == 1 {
        allowed.first()
    } else {
        None
    }
}

fn walk_one_of(
    branches: &[Value],
    input: &Value,
    path: &str,
    definitions: Option<&Value>,
    out: &mut Vec<Violation>,
) {
    if let Some(key) = discriminator_key(branches, definitions) {
        let Some(object) = input.as_object() else {
            out.push(Violation::new(
                path,
                format!("expected object, got {}", type_name(input)),
            ));
            return;
        };
        let literals: Vec<String> = branches
            .iter()
            .filter_map(|b| branch_literal(b, key, definitions))
            .map(literal_display)
            .collect();
        let Some(tag) = object.get(key) else {
            out.push(Violation::new(
                join(path, key),
                format!("missing required property (one of {})", literals.join(", ")),
            ));
            return;
        };
        let matched = branches
            .iter()
            .find(|b| branch_literal(b, key, definitions) == Some(tag));
        match matched {
            Some(branch) => walk(branch, input, path, definitions, out),
            None => out.push(Violation::new(
                join(path, key),
                format!(
                    "must be one of {}, got {}",
                    literals.join(", "),
                    literal_display(tag)
                ),
            )),
        }
        return;
    }

    // No discriminator: behave like anyOf, the closest useful reading.
    walk_any_of(branches, input, path, definitions, out);
}

fn walk_any_of(
    branches: &[Value],
    input: &Value,
    path: &str,
    definitions: Option<&Value>,
    out: &mut Vec<Violation>,
) {
    let mut best: Option<Vec<Violation>> = None;
    for branch in branches {
        let mut scratch = Vec::new();
        walk(branch, input, path, definitions, &mut scratch);
        if scratch.is_empty() {
            return;
        }
        if best.as_ref().map_or(true, |b| scratch.len() < b.len()) {
            best = Some(scratch);
        }
    }
    if let Some(violations) = best {
        out.extend(violations);
    }
}

fn walk(
    schema: &Value,
    input: &Value,
    path: &str,
    definitions: Option<&Value>,
    out: &mut Vec<Violation>,
) {
    let schema = resolve(schema, definitions);

    if let Some(branches) = schema.get("allOf").and_then(Value::as_array) {
        for branch in branches {
            walk(branch, input, path, definitions, out);
        }
    }
    if let Some(branches) = schema.get("oneOf").and_then(Value::as_array) {
        walk_one_of(branches, input, path, definitions, out);
        return;
    }
    if let Some(branches) = schema.get("anyOf").and_then(Value::as_array) {
        walk_any_of(branches, input, path, definitions, out);
        return;
    }

    if !check_type(schema, input, path, out) {
        // Wrong shape entirely; nested keywords would only produce noise.
        return;
    }
    check_enum(schema, input, path, out);
    check_bounds(schema, input, path, out);

    if let (Some(object), Some(properties)) = (
        input.as_object(),
        schema.get("properties").and_then(Value::as_object),
    ) {
        if let Some(required) = schema.get("required").and_then(Value::as_array) {
            for key in required.iter().filter_map(Value::as_str) {
                if !object.contains_key(key) {
                    out.push(Violation::new(join(path, key), "missing required property"));
                }
            }
        }
        for (key, value) in object {
            if let Some(prop_schema) = properties.get(key) {
                walk(prop_schema, value, &join(path, key), definitions, out);
            }
        }
    }

    if let (Some(items), Some(item_schema)) = (input.as_array(), schema.get("items")) {
        for (index, item) in items.iter().enumerate() {
            walk(
                item_schema,
                item,
                &format!("{path}[{index}]"),
                definitions,
                out,
            );
        }
    }
}
