//! LXC container command. Mirrors the VM command over the `lxc` endpoints;
//! the API exposes the two guest types as parallel trees.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::common::{require_node, task_line, Body};
use crate::client::Method;
use crate::context::Context;
use crate::error::CommandError;
use crate::registry::params::ContainerAction;
use crate::registry::CommandOutput;
use crate::render;

pub(crate) async fn container(
    ctx: &Arc<Context>,
    action: ContainerAction,
) -> Result<CommandOutput, CommandError> {
    match action {
        ContainerAction::List { node } => list(ctx, node.as_deref()).await,
        ContainerAction::Get { node, vmid } => get(ctx, node.as_deref(), vmid).await,
        ContainerAction::Status { node, vmid } => status(ctx, node.as_deref(), vmid).await,
        ContainerAction::Create {
            node,
            vmid,
            ostemplate,
            hostname,
            cores,
            memory_mb,
            rootfs_gb,
            storage,
            unprivileged,
        } => {
            create(
                ctx,
                node.as_deref(),
                vmid,
                &ostemplate,
                hostname,
                cores,
                memory_mb,
                rootfs_gb,
                storage,
                unprivileged,
            )
            .await
        }
        ContainerAction::Update { node, vmid, config } => {
            update(ctx, node.as_deref(), vmid, config).await
        }
        ContainerAction::Delete { node, vmid, purge } => {
            delete(ctx, node.as_deref(), vmid, purge).await
        }
        ContainerAction::Start { node, vmid } => {
            lifecycle(ctx, node.as_deref(), vmid, "start").await
        }
        ContainerAction::Stop { node, vmid } => lifecycle(ctx, node.as_deref(), vmid, "stop").await,
        ContainerAction::Shutdown {
            node,
            vmid,
            timeout_secs,
        } => shutdown(ctx, node.as_deref(), vmid, timeout_secs).await,
        ContainerAction::Reboot { node, vmid } => {
            lifecycle(ctx, node.as_deref(), vmid, "reboot").await
        }
    }
}

async fn list(ctx: &Arc<Context>, node: Option<&str>) -> Result<CommandOutput, CommandError> {
    let (path, title) = match ctx.node(node) {
        Some(node) => (
            format!("nodes/{node}/lxc"),
            format!("Containers on {node}"),
        ),
        None => (
            // The cluster view has no container-only filter; type=vm covers
            // both guest kinds and we keep the lxc entries.
            "cluster/resources?type=vm".to_string(),
            "Containers".to_string(),
        ),
    };
    let reply = ctx.transport.request(Method::Get, &path, None).await?;
    let mut items = render::as_items(&reply);
    items.retain(|v| render::str_field(v, "type") != "qemu");
    items.sort_by_key(|v| render::int_field(v, "vmid"));

    let message = render::list_section(&title, &items, "containers", |v| {
        let status = render::str_field(v, "status");
        let vmid = render::int_field(v, "vmid").unwrap_or_default();
        format!(
            "{} {vmid} **{}** ({status})",
            render::status_glyph(status),
            render::str_field(v, "name")
        )
    });
    Ok(CommandOutput::with_data(message, reply))
}

async fn get(
    ctx: &Arc<Context>,
    node: Option<&str>,
    vmid: u32,
) -> Result<CommandOutput, CommandError> {
    let node = require_node(ctx, node)?;
    let path = format!("nodes/{node}/lxc/{vmid}/config");
    let reply = ctx.transport.request(Method::Get, &path, None).await?;
    let message = render::detail_block(&format!("Container {vmid} config"), &reply);
    Ok(CommandOutput::with_data(message, reply))
}

async fn status(
    ctx: &Arc<Context>,
    node: Option<&str>,
    vmid: u32,
) -> Result<CommandOutput, CommandError> {
    let node = require_node(ctx, node)?;
    let path = format!("nodes/{node}/lxc/{vmid}/status/current");
    let reply = ctx.transport.request(Method::Get, &path, None).await?;

    let state = render::str_field(&reply, "status");
    let mut lines = vec![format!(
        "{} Container {vmid} **{}** is {state}",
        render::status_glyph(state),
        render::str_field(&reply, "name")
    )];
    if let Some(uptime) = reply.get("uptime").and_then(Value::as_u64) {
        if uptime > 0 {
            lines.push(format!("- uptime: {}", render::human_uptime(uptime)));
        }
    }
    if let (Some(mem), Some(maxmem)) = (
        render::num_field(&reply, "mem"),
        render::num_field(&reply, "maxmem"),
    ) {
        lines.push(format!(
            "- memory: {} / {}",
            render::human_bytes(mem),
            render::human_bytes(maxmem)
        ));
    }
    Ok(CommandOutput::with_data(lines.join("\n"), reply))
}

#[allow(clippy::too_many_arguments)]
async fn create(
    ctx: &Arc<Context>,
    node: Option<&str>,
    vmid: u32,
    ostemplate: &str,
    hostname: Option<String>,
    cores: Option<u32>,
    memory_mb: Option<u64>,
    rootfs_gb: Option<u64>,
    storage: Option<String>,
    unprivileged: bool,
) -> Result<CommandOutput, CommandError> {
    let node = require_node(ctx, node)?;
    let rootfs = match (&storage, rootfs_gb) {
        (Some(storage), Some(size)) => Some(format!("{storage}:{size}")),
        _ => None,
    };
    let body = Body::new()
        .set("vmid", vmid)
        .set("ostemplate", ostemplate)
        .opt("hostname", hostname)
        .opt("cores", cores)
        .opt("memory", memory_mb)
        .opt("rootfs", rootfs)
        .flag("unprivileged", unprivileged)
        .build();
    let path = format!("nodes/{node}/lxc");
    let reply = ctx
        .transport
        .request(Method::Post, &path, Some(&body))
        .await?;
    Ok(CommandOutput::with_data(
        format!("Created container {vmid} on {node}{}", task_line(&reply)),
        reply,
    ))
}

async fn update(
    ctx: &Arc<Context>,
    node: Option<&str>,
    vmid: u32,
    config: HashMap<String, Value>,
) -> Result<CommandOutput, CommandError> {
    let node = require_node(ctx, node)?;
    // Format the key list before `config` moves into the body.
    let keys = config.keys().cloned().collect::<Vec<_>>().join(", ");
    let body = Body::new().merge(config).build();
    let path = format!("nodes/{node}/lxc/{vmid}/config");
    let reply = ctx
        .transport
        .request(Method::Put, &path, Some(&body))
        .await?;
    Ok(CommandOutput::with_data(
        format!("Updated container {vmid}: {keys}"),
        reply,
    ))
}

async fn delete(
    ctx: &Arc<Context>,
    node: Option<&str>,
    vmid: u32,
    purge: bool,
) -> Result<CommandOutput, CommandError> {
    let node = require_node(ctx, node)?;
    let path = if purge {
        format!("nodes/{node}/lxc/{vmid}?purge=1")
    } else {
        format!("nodes/{node}/lxc/{vmid}")
    };
    let reply = ctx.transport.request(Method::Delete, &path, None).await?;
    Ok(CommandOutput::with_data(
        format!("Deleted container {vmid}{}", task_line(&reply)),
        reply,
    ))
}

async fn lifecycle(
    ctx: &Arc<Context>,
    node: Option<&str>,
    vmid: u32,
    verb: &str,
) -> Result<CommandOutput, CommandError> {
    let node = require_node(ctx, node)?;
    let path = format!("nodes/{node}/lxc/{vmid}/status/{verb}");
    let reply = ctx.transport.request(Method::Post, &path, None).await?;
    Ok(CommandOutput::with_data(
        format!("Sent {verb} to container {vmid}{}", task_line(&reply)),
        reply,
    ))
}

async fn shutdown(
    ctx: &Arc<Context>,
    node: Option<&str>,
    vmid: u32,
    timeout_secs: Option<u64>,
) -> Result<CommandOutput, CommandError> {
    let node = require_node(ctx, node)?;
    let body = Body::new().opt("timeout", timeout_secs).build();
    let path = format!("nodes/{node}/lxc/{vmid}/status/shutdown");
    let reply = ctx
        .transport
        .request(Method::Post, &path, Some(&body))
        .await?;
    Ok(CommandOutput::with_data(
        format!("Sent shutdown to container {vmid}{}", task_line(&reply)),
        reply,
    ))
}
