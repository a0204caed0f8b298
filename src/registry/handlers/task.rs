//! Asynchronous task command: the follow-up surface for every operation
//! that replied with a UPID.

use std::sync::Arc;

use serde_json::Value;

use super::common::require_node;
use crate::client::Method;
use crate::context::Context;
use crate::error::CommandError;
use crate::registry::params::TaskAction;
use crate::registry::CommandOutput;
use crate::render;

pub(crate) async fn task(
    ctx: &Arc<Context>,
    action: TaskAction,
) -> Result<CommandOutput, CommandError> {
    match action {
        TaskAction::List {
            node,
            limit,
            running_only,
        } => list(ctx, node.as_deref(), limit, running_only).await,
        TaskAction::Status { node, upid } => status(ctx, node.as_deref(), &upid).await,
        TaskAction::Log {
            node,
            upid,
            start,
            limit,
        } => log(ctx, node.as_deref(), &upid, start, limit).await,
        TaskAction::Cancel { node, upid } => cancel(ctx, node.as_deref(), &upid).await,
    }
}

async fn list(
    ctx: &Arc<Context>,
    node: Option<&str>,
    limit: Option<u32>,
    running_only: bool,
) -> Result<CommandOutput, CommandError> {
    let node = require_node(ctx, node)?;
    let mut query = Vec::new();
    if let Some(limit) = limit {
        query.push(format!("limit={limit}"));
    }
    if running_only {
        query.push("source=active".to_string());
    }
    let path = if query.is_empty() {
        format!("nodes/{node}/tasks")
    } else {
        format!("nodes/{node}/tasks?{}", query.join("&"))
    };
    let reply = ctx.transport.request(Method::Get, &path, None).await?;
    let items = render::as_items(&reply);

    let title = format!("Tasks on {node}");
    let message = render::list_section(&title, &items, "tasks", |v| {
        let state = task_state(v);
        format!(
            "{} `{}` {} ({state})",
            state_glyph(&state),
            render::str_field(v, "upid"),
            render::str_field(v, "type"),
        )
    });
    Ok(CommandOutput::with_data(message, reply))
}

async fn status(
    ctx: &Arc<Context>,
    node: Option<&str>,
    upid: &str,
) -> Result<CommandOutput, CommandError> {
    let node = require_node(ctx, node)?;
    let path = format!("nodes/{node}/tasks/{upid}/status");
    let reply = ctx.transport.request(Method::Get, &path, None).await?;

    let state = task_state(&reply);
    let mut lines = vec![format!("{} Task `{upid}` is {state}", state_glyph(&state))];
    if let Some(started) = render::int_field(&reply, "starttime") {
        lines.push(format!("- started: {started}"));
    }
    let kind = render::str_field(&reply, "type");
    if kind != "-" {
        lines.push(format!("- type: {kind}"));
    }
    Ok(CommandOutput::with_data(lines.join("\n"), reply))
}

async fn log(
    ctx: &Arc<Context>,
    node: Option<&str>,
    upid: &str,
    start: Option<u32>,
    limit: Option<u32>,
) -> Result<CommandOutput, CommandError> {
    let node = require_node(ctx, node)?;
    let mut query = Vec::new();
    if let Some(start) = start {
        query.push(format!("start={start}"));
    }
    if let Some(limit) = limit {
        query.push(format!("limit={limit}"));
    }
    let path = if query.is_empty() {
        format!("nodes/{node}/tasks/{upid}/log")
    } else {
        format!("nodes/{node}/tasks/{upid}/log?{}", query.join("&"))
    };
    let reply = ctx.transport.request(Method::Get, &path, None).await?;

    // Log entries are {n, t} pairs; render the text in line order.
    let mut entries = render::as_items(&reply);
    entries.sort_by_key(|v| render::int_field(v, "n"));
    let mut lines = vec![format!("**Log of `{upid}`**")];
    for entry in &entries {
        lines.push(render::str_field(entry, "t").to_string());
    }
    if entries.is_empty() {
        lines.push("No log lines found.".to_string());
    }
    Ok(CommandOutput::with_data(lines.join("\n"), reply))
}

async fn cancel(
    ctx: &Arc<Context>,
    node: Option<&str>,
    upid: &str,
) -> Result<CommandOutput, CommandError> {
    let node = require_node(ctx, node)?;
    let path = format!("nodes/{node}/tasks/{upid}");
    let reply = ctx.transport.request(Method::Delete, &path, None).await?;
    Ok(CommandOutput::with_data(
        format!("Cancelled task `{upid}`"),
        reply,
    ))
}

/// A task's state: "running" while active, else its exit status.
fn task_state(v: &Value) -> String {
    match v.get("status").and_then(Value::as_str) {
        Some(status) => status.to_string(),
        None => "running".to_string(),
    }
}

fn state_glyph(state: &str) -> &'static str {
    match state {
        "OK" => "🟢",
        "running" => "⏳",
        _ => "🔴",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::client::testing::StubTransport;
    use crate::context::testing::stub_context;
    use serde_json::json;

    #[tokio::test]
    async fn list_builds_query_from_params() {
        let stub = StubTransport::new().respond_with(json!([]));
        let (ctx, stub) = stub_context(false, stub);
        let action = TaskAction::List {
            node: None,
            limit: Some(20),
            running_only: true,
        };
        task(&ctx, action).await.unwrap();
        assert_eq!(stub.calls()[0].path, "nodes/pve1/tasks?limit=20&source=active");
    }

    #[tokio::test]
    async fn status_marks_failures() {
        let stub = StubTransport::new().respond_with(json!({
            "upid": "UPID:pve1:0001:x", "type": "qmstart",
            "status": "command failed with exit code 1"
        }));
        let (ctx, _stub) = stub_context(false, stub);
        let action = TaskAction::Status {
            node: None,
            upid: "UPID:pve1:0001:x".into(),
        };
        let out = task(&ctx, action).await.unwrap();
        assert!(out.message.contains("🔴"));
        assert!(out.message.contains("command failed"));
    }

    #[tokio::test]
    async fn log_lines_render_in_order() {
        let stub = StubTransport::new().respond_with(json!([
            {"n": 2, "t": "second line"},
            {"n": 1, "t": "first line"}
        ]));
        let (ctx, _stub) = stub_context(false, stub);
        let action = TaskAction::Log {
            node: None,
            upid: "UPID:pve1:0001:x".into(),
            start: None,
            limit: None,
        };
        let out = task(&ctx, action).await.unwrap();
        let first = out.message.find("first line").unwrap();
        let second = out.message.find("second line").unwrap();
        assert!(first < second);
    }

    #[tokio::test]
    async fn cancel_deletes_the_task() {
        let stub = StubTransport::new();
        let (ctx, stub) = stub_context(true, stub);
        let action = TaskAction::Cancel {
            node: None,
            upid: "UPID:pve1:0001:x".into(),
        };
        task(&ctx, action).await.unwrap();
        assert_eq!(stub.calls()[0].method, "DELETE");
        assert_eq!(stub.calls()[0].path, "nodes/pve1/tasks/UPID:pve1:0001:x");
    }

    #[tokio::test]
    async fn every_action_routes_to_its_endpoint() {
        let cases = [
            (json!({"action": "list"}), "GET", "nodes/pve1/tasks"),
            (
                json!({"action": "status", "upid": "UPID:pve1:0001:x"}),
                "GET",
                "nodes/pve1/tasks/UPID:pve1:0001:x/status",
            ),
            (
                json!({"action": "log", "upid": "UPID:pve1:0001:x"}),
                "GET",
                "nodes/pve1/tasks/UPID:pve1:0001:x/log",
            ),
            (
                json!({"action": "cancel", "upid": "UPID:pve1:0001:x"}),
                "DELETE",
                "nodes/pve1/tasks/UPID:pve1:0001:x",
            ),
        ];
        for (params, method, path) in cases {
            let action: TaskAction = serde_json::from_value(params).unwrap();
            let (ctx, stub) = stub_context(true, StubTransport::new());
            task(&ctx, action).await.unwrap();
            let calls = stub.calls();
            assert_eq!(calls.len(), 1, "{path} should make exactly one call");
            assert_eq!(calls[0].method, method, "{path}");
            assert_eq!(calls[0].path, path);
        }
    }
}
