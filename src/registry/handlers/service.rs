//! Node service command (pveproxy, pvedaemon, corosync and friends).

use std::sync::Arc;

use super::common::{require_node, task_line};
use crate::client::Method;
use crate::context::Context;
use crate::error::CommandError;
use crate::registry::params::ServiceAction;
use crate::registry::CommandOutput;
use crate::render;

pub(crate) async fn service(
    ctx: &Arc<Context>,
    action: ServiceAction,
) -> Result<CommandOutput, CommandError> {
    match action {
        ServiceAction::List { node } => list(ctx, node.as_deref()).await,
        ServiceAction::State { node, service } => state(ctx, node.as_deref(), &service).await,
        ServiceAction::Start { node, service } => {
            control(ctx, node.as_deref(), &service, "start").await
        }
        ServiceAction::Stop { node, service } => {
            control(ctx, node.as_deref(), &service, "stop").await
        }
        ServiceAction::Restart { node, service } => {
            control(ctx, node.as_deref(), &service, "restart").await
        }
    }
}

async fn list(ctx: &Arc<Context>, node: Option<&str>) -> Result<CommandOutput, CommandError> {
    let node = require_node(ctx, node)?;
    let path = format!("nodes/{node}/services");
    let reply = ctx.transport.request(Method::Get, &path, None).await?;
    let mut items = render::as_items(&reply);
    items.sort_by(|a, b| render::str_field(a, "name").cmp(render::str_field(b, "name")));

    let title = format!("Services on {node}");
    let message = render::list_section(&title, &items, "services", |v| {
        let state = render::str_field(v, "state");
        format!(
            "{} **{}** ({state}) — {}",
            render::status_glyph(state),
            render::str_field(v, "name"),
            render::str_field(v, "desc")
        )
    });
    Ok(CommandOutput::with_data(message, reply))
}

async fn state(
    ctx: &Arc<Context>,
    node: Option<&str>,
    service: &str,
) -> Result<CommandOutput, CommandError> {
    let node = require_node(ctx, node)?;
    let path = format!("nodes/{node}/services/{service}/state");
    let reply = ctx.transport.request(Method::Get, &path, None).await?;
    let state = render::str_field(&reply, "state");
    Ok(CommandOutput::with_data(
        format!(
            "{} Service **{service}** on {node} is {state}",
            render::status_glyph(state)
        ),
        reply,
    ))
}

async fn control(
    ctx: &Arc<Context>,
    node: Option<&str>,
    service: &str,
    verb: &str,
) -> Result<CommandOutput, CommandError> {
    let node = require_node(ctx, node)?;
    let path = format!("nodes/{node}/services/{service}/{verb}");
    let reply = ctx.transport.request(Method::Post, &path, None).await?;
    Ok(CommandOutput::with_data(
        format!("Sent {verb} to service {service} on {node}{}", task_line(&reply)),
        reply,
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::client::testing::StubTransport;
    use crate::context::testing::stub_context;
    use serde_json::json;

    #[tokio::test]
    async fn list_sorts_by_name() {
        let stub = StubTransport::new().respond_with(json!([
            {"name": "pveproxy", "state": "running", "desc": "PVE API Proxy Server"},
            {"name": "corosync", "state": "running", "desc": "Corosync Cluster Engine"}
        ]));
        let (ctx, _stub) = stub_context(false, stub);
        let out = service(&ctx, ServiceAction::List { node: None }).await.unwrap();
        let corosync = out.message.find("corosync").unwrap();
        let pveproxy = out.message.find("pveproxy").unwrap();
        assert!(corosync < pveproxy);
    }

    #[tokio::test]
    async fn restart_posts_to_the_verb_endpoint() {
        let stub = StubTransport::new().respond_with(json!("UPID:pve1:000a:srvrestart"));
        let (ctx, stub) = stub_context(true, stub);
        let action = ServiceAction::Restart {
            node: None,
            service: "pveproxy".into(),
        };
        service(&ctx, action).await.unwrap();
        assert_eq!(stub.calls()[0].method, "POST");
        assert_eq!(stub.calls()[0].path, "nodes/pve1/services/pveproxy/restart");
    }

    #[tokio::test]
    async fn state_renders_glyph() {
        let stub = StubTransport::new().respond_with(json!({"state": "dead"}));
        let (ctx, _stub) = stub_context(false, stub);
        let action = ServiceAction::State {
            node: None,
            service: "pvedaemon".into(),
        };
        let out = service(&ctx, action).await.unwrap();
        assert!(out.message.contains("🔴"));
        assert!(out.message.contains("pvedaemon"));
    }

    #[tokio::test]
    async fn every_action_routes_to_its_endpoint() {
        let cases = [
            (json!({"action": "list"}), "GET", "nodes/pve1/services"),
            (
                json!({"action": "state", "service": "pveproxy"}),
                "GET",
                "nodes/pve1/services/pveproxy/state",
            ),
            (
                json!({"action": "start", "service": "pveproxy"}),
                "POST",
                "nodes/pve1/services/pveproxy/start",
            ),
            (
                json!({"action": "stop", "service": "pveproxy"}),
                "POST",
                "nodes/pve1/services/pveproxy/stop",
            ),
            (
                json!({"action": "restart", "service": "pveproxy"}),
                "POST",
                "nodes/pve1/services/pveproxy/restart",
            ),
        ];
        for (params, method, path) in cases {
            let action: ServiceAction = serde_json::from_value(params).unwrap();
            let (ctx, stub) = stub_context(true, StubTransport::new());
            service(&ctx, action).await.unwrap();
            let calls = stub.calls();
            assert_eq!(calls.len(), 1, "{path} should make exactly one call");
            assert_eq!(calls[0].method, method, "{path}");
            assert_eq!(calls[0].path, path);
        }
    }
}
