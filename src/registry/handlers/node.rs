//! Node commands: listing and per-node status detail.

use std::sync::Arc;

use serde_json::Value;

use super::common::require_node;
use crate::client::Method;
use crate::context::Context;
use crate::error::CommandError;
use crate::registry::params::NodeStatusParams;
use crate::registry::CommandOutput;
use crate::render;

pub(crate) async fn list(ctx: &Arc<Context>) -> Result<CommandOutput, CommandError> {
    let reply = ctx.transport.request(Method::Get, "nodes", None).await?;
    let mut items = render::as_items(&reply);
    items.sort_by(|a, b| render::str_field(a, "node").cmp(render::str_field(b, "node")));

    let message = render::list_section("Nodes", &items, "nodes", |v| {
        let status = render::str_field(v, "status");
        let uptime = v
            .get("uptime")
            .and_then(Value::as_u64)
            .filter(|u| *u > 0)
            .map(|u| format!(", up {}", render::human_uptime(u)))
            .unwrap_or_default();
        format!(
            "{} **{}** ({status}{uptime})",
            render::status_glyph(status),
            render::str_field(v, "node")
        )
    });
    Ok(CommandOutput::with_data(message, reply))
}

pub(crate) async fn status(
    ctx: &Arc<Context>,
    params: NodeStatusParams,
) -> Result<CommandOutput, CommandError> {
    let node = require_node(ctx, params.node.as_deref())?;
    let path = format!("nodes/{node}/status");
    let reply = ctx.transport.request(Method::Get, &path, None).await?;

    let mut lines = vec![format!("**Node {node}**")];
    if let Some(uptime) = reply.get("uptime").and_then(Value::as_u64) {
        lines.push(format!("- uptime: {}", render::human_uptime(uptime)));
    }
    if let Some(cpu) = render::num_field(&reply, "cpu") {
        lines.push(format!("- cpu: {:.1}%", cpu * 100.0));
    }
    if let Some(memory) = reply.get("memory") {
        if let (Some(used), Some(total)) = (
            render::num_field(memory, "used"),
            render::num_field(memory, "total"),
        ) {
            lines.push(format!(
                "- memory: {} / {}",
                render::human_bytes(used),
                render::human_bytes(total)
            ));
        }
    }
    if let Some(loadavg) = reply.get("loadavg").and_then(Value::as_array) {
        let load: Vec<String> = loadavg
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        lines.push(format!("- load: {}", load.join(" ")));
    }
    if let Some(kversion) = reply.get("kversion").and_then(Value::as_str) {
        lines.push(format!("- kernel: {kversion}"));
    }
    Ok(CommandOutput::with_data(lines.join("\n"), reply))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::client::testing::StubTransport;
    use crate::context::testing::stub_context;
    use serde_json::json;

    #[tokio::test]
    async fn list_sorts_and_shows_uptime() {
        let stub = StubTransport::new().respond_with(json!([
            {"node": "pve2", "status": "online", "uptime": 7200},
            {"node": "pve1", "status": "offline"}
        ]));
        let (ctx, _stub) = stub_context(false, stub);
        let out = list(&ctx).await.unwrap();
        let pve1 = out.message.find("pve1").unwrap();
        let pve2 = out.message.find("pve2").unwrap();
        assert!(pve1 < pve2);
        assert!(out.message.contains("up 2h 0m"));
    }

    #[tokio::test]
    async fn status_renders_memory_and_load() {
        let stub = StubTransport::new().respond_with(json!({
            "uptime": 360_000,
            "cpu": 0.12,
            "memory": {"used": 8_589_934_592u64, "total": 34_359_738_368u64},
            "loadavg": ["0.52", "0.48", "0.41"],
            "kversion": "Linux 6.8.12-1-pve"
        }));
        let (ctx, _stub) = stub_context(false, stub);
        let out = status(&ctx, NodeStatusParams { node: None }).await.unwrap();
        assert!(out.message.contains("**Node pve1**"));
        assert!(out.message.contains("8.0 GiB / 32.0 GiB"));
        assert!(out.message.contains("load: 0.52 0.48 0.41"));
        assert!(out.message.contains("6.8.12-1-pve"));
    }
}
