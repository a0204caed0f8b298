//! Node network interface command. Create/update/delete stage changes;
//! `apply` commits the staged set and `revert` discards it.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::common::{require_node, task_line, Body};
use crate::client::Method;
use crate::context::Context;
use crate::error::CommandError;
use crate::registry::params::NetworkAction;
use crate::registry::CommandOutput;
use crate::render;

pub(crate) async fn network(
    ctx: &Arc<Context>,
    action: NetworkAction,
) -> Result<CommandOutput, CommandError> {
    match action {
        NetworkAction::List { node, kind } => list(ctx, node.as_deref(), kind.as_deref()).await,
        NetworkAction::Get { node, iface } => get(ctx, node.as_deref(), &iface).await,
        NetworkAction::Create {
            node,
            iface,
            kind,
            config,
        } => create(ctx, node.as_deref(), &iface, &kind, config).await,
        NetworkAction::Update {
            node,
            iface,
            config,
        } => update(ctx, node.as_deref(), &iface, config).await,
        NetworkAction::Delete { node, iface } => delete(ctx, node.as_deref(), &iface).await,
        NetworkAction::Apply { node } => apply(ctx, node.as_deref()).await,
        NetworkAction::Revert { node } => revert(ctx, node.as_deref()).await,
    }
}

async fn list(
    ctx: &Arc<Context>,
    node: Option<&str>,
    kind: Option<&str>,
) -> Result<CommandOutput, CommandError> {
    let node = require_node(ctx, node)?;
    let path = match kind {
        Some(kind) => format!("nodes/{node}/network?type={kind}"),
        None => format!("nodes/{node}/network"),
    };
    let reply = ctx.transport.request(Method::Get, &path, None).await?;
    let items = render::as_items(&reply);

    let title = format!("Network interfaces on {node}");
    let message = render::list_section(&title, &items, "interfaces", |v| {
        let active = v.get("active").and_then(Value::as_i64) == Some(1);
        let glyph = if active { "🟢" } else { "🔴" };
        let cidr = match render::str_field(v, "cidr") {
            "-" => String::new(),
            cidr => format!(" {cidr}"),
        };
        format!(
            "{glyph} **{}** ({}){cidr}",
            render::str_field(v, "iface"),
            render::str_field(v, "type")
        )
    });
    Ok(CommandOutput::with_data(message, reply))
}

async fn get(
    ctx: &Arc<Context>,
    node: Option<&str>,
    iface: &str,
) -> Result<CommandOutput, CommandError> {
    let node = require_node(ctx, node)?;
    let path = format!("nodes/{node}/network/{iface}");
    let reply = ctx.transport.request(Method::Get, &path, None).await?;
    let message = render::detail_block(&format!("Interface {iface} on {node}"), &reply);
    Ok(CommandOutput::with_data(message, reply))
}

async fn create(
    ctx: &Arc<Context>,
    node: Option<&str>,
    iface: &str,
    kind: &str,
    config: HashMap<String, Value>,
) -> Result<CommandOutput, CommandError> {
    let node = require_node(ctx, node)?;
    let body = Body::new()
        .set("iface", iface)
        .set("type", kind)
        .merge(config)
        .build();
    let path = format!("nodes/{node}/network");
    let reply = ctx
        .transport
        .request(Method::Post, &path, Some(&body))
        .await?;
    Ok(CommandOutput::with_data(
        format!("Staged new interface {iface} ({kind}) on {node} — run network apply to commit"),
        reply,
    ))
}

async fn update(
    ctx: &Arc<Context>,
    node: Option<&str>,
    iface: &str,
    config: HashMap<String, Value>,
) -> Result<CommandOutput, CommandError> {
    let node = require_node(ctx, node)?;
    // Format the key list before `config` moves into the body.
    let keys = config.keys().cloned().collect::<Vec<_>>().join(", ");
    let body = Body::new().merge(config).build();
    let path = format!("nodes/{node}/network/{iface}");
    let reply = ctx
        .transport
        .request(Method::Put, &path, Some(&body))
        .await?;
    Ok(CommandOutput::with_data(
        format!("Staged changes to {iface}: {keys} — run network apply to commit"),
        reply,
    ))
}

async fn delete(
    ctx: &Arc<Context>,
    node: Option<&str>,
    iface: &str,
) -> Result<CommandOutput, CommandError> {
    let node = require_node(ctx, node)?;
    let path = format!("nodes/{node}/network/{iface}");
    let reply = ctx.transport.request(Method::Delete, &path, None).await?;
    Ok(CommandOutput::with_data(
        format!("Staged removal of {iface} on {node} — run network apply to commit"),
        reply,
    ))
}

async fn apply(ctx: &Arc<Context>, node: Option<&str>) -> Result<CommandOutput, CommandError> {
    let node = require_node(ctx, node)?;
    let path = format!("nodes/{node}/network");
    let reply = ctx.transport.request(Method::Put, &path, None).await?;
    Ok(CommandOutput::with_data(
        format!("Applying staged network changes on {node}{}", task_line(&reply)),
        reply,
    ))
}

async fn revert(ctx: &Arc<Context>, node: Option<&str>) -> Result<CommandOutput, CommandError> {
    let node = require_node(ctx, node)?;
    let path = format!("nodes/{node}/network");
    let reply = ctx.transport.request(Method::Delete, &path, None).await?;
    Ok(CommandOutput::with_data(
        format!("Discarded staged network changes on {node}"),
        reply,
    ))
}
