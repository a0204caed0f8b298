//! QEMU virtual machine command.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::common::{require_node, task_line, Body};
use crate::client::Method;
use crate::context::Context;
use crate::error::CommandError;
use crate::registry::params::VmAction;
use crate::registry::CommandOutput;
use crate::render;

pub(crate) async fn vm(
    ctx: &Arc<Context>,
    action: VmAction,
) -> Result<CommandOutput, CommandError> {
    match action {
        VmAction::List { node } => list(ctx, node.as_deref()).await,
        VmAction::Get { node, vmid } => get(ctx, node.as_deref(), vmid).await,
        VmAction::Status { node, vmid } => status(ctx, node.as_deref(), vmid).await,
        VmAction::Create {
            node,
            vmid,
            name,
            cores,
            memory_mb,
            disk_gb,
            storage,
            iso,
        } => {
            create(
                ctx,
                node.as_deref(),
                vmid,
                name,
                cores,
                memory_mb,
                disk_gb,
                storage,
                iso,
            )
            .await
        }
        VmAction::Update { node, vmid, config } => {
            update(ctx, node.as_deref(), vmid, config).await
        }
        VmAction::Delete { node, vmid, purge } => {
            delete(ctx, node.as_deref(), vmid, purge).await
        }
        VmAction::Start { node, vmid } => lifecycle(ctx, node.as_deref(), vmid, "start").await,
        VmAction::Stop { node, vmid } => lifecycle(ctx, node.as_deref(), vmid, "stop").await,
        VmAction::Shutdown {
            node,
            vmid,
            timeout_secs,
        } => shutdown(ctx, node.as_deref(), vmid, timeout_secs).await,
        VmAction::Reboot { node, vmid } => lifecycle(ctx, node.as_deref(), vmid, "reboot").await,
        VmAction::Suspend { node, vmid } => lifecycle(ctx, node.as_deref(), vmid, "suspend").await,
        VmAction::Resume { node, vmid } => lifecycle(ctx, node.as_deref(), vmid, "resume").await,
        VmAction::Migrate {
            node,
            vmid,
            target,
            online,
        } => migrate(ctx, node.as_deref(), vmid, &target, online).await,
        VmAction::Clone {
            node,
            vmid,
            new_vmid,
            name,
            full,
        } => clone(ctx, node.as_deref(), vmid, new_vmid, name, full).await,
    }
}

async fn list(ctx: &Arc<Context>, node: Option<&str>) -> Result<CommandOutput, CommandError> {
    // With a resolvable node, list that node's guests; without one, fall
    // back to the cluster-wide resource view.
    let (path, title) = match ctx.node(node) {
        Some(node) => (
            format!("nodes/{node}/qemu"),
            format!("Virtual machines on {node}"),
        ),
        None => (
            "cluster/resources?type=vm".to_string(),
            "Virtual machines".to_string(),
        ),
    };
    let reply = ctx.transport.request(Method::Get, &path, None).await?;
    let mut items = render::as_items(&reply);
    items.retain(|v| render::str_field(v, "type") != "lxc");
    items.sort_by_key(|v| render::int_field(v, "vmid"));

    let message = render::list_section(&title, &items, "virtual machines", guest_line);
    Ok(CommandOutput::with_data(message, reply))
}

fn guest_line(v: &Value) -> String {
    let status = render::str_field(v, "status");
    let vmid = render::int_field(v, "vmid").unwrap_or_default();
    let mem = render::num_field(v, "maxmem")
        .filter(|m| *m > 0.0)
        .map(|m| format!(", {}", render::human_bytes(m)))
        .unwrap_or_default();
    format!(
        "{} {vmid} **{}** ({status}{mem})",
        render::status_glyph(status),
        render::str_field(v, "name")
    )
}

async fn get(ctx: &Arc<Context>, node: Option<&str>, vmid: u32) -> Result<CommandOutput, CommandError> {
    let node = require_node(ctx, node)?;
    let path = format!("nodes/{node}/qemu/{vmid}/config");
    let reply = ctx.transport.request(Method::Get, &path, None).await?;
    let message = render::detail_block(&format!("VM {vmid} config"), &reply);
    Ok(CommandOutput::with_data(message, reply))
}

async fn status(
    ctx: &Arc<Context>,
    node: Option<&str>,
    vmid: u32,
) -> Result<CommandOutput, CommandError> {
    let node = require_node(ctx, node)?;
    let path = format!("nodes/{node}/qemu/{vmid}/status/current");
    let reply = ctx.transport.request(Method::Get, &path, None).await?;

    let state = render::str_field(&reply, "status");
    let mut lines = vec![format!(
        "{} VM {vmid} **{}** is {state}",
        render::status_glyph(state),
        render::str_field(&reply, "name")
    )];
    if let Some(uptime) = reply.get("uptime").and_then(Value::as_u64) {
        if uptime > 0 {
            lines.push(format!("- uptime: {}", render::human_uptime(uptime)));
        }
    }
    if let Some(cpu) = render::num_field(&reply, "cpu") {
        lines.push(format!("- cpu: {:.1}%", cpu * 100.0));
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
    name: Option<String>,
    cores: Option<u32>,
    memory_mb: Option<u64>,
    disk_gb: Option<u64>,
    storage: Option<String>,
    iso: Option<String>,
) -> Result<CommandOutput, CommandError> {
    let node = require_node(ctx, node)?;
    let disk = match (&storage, disk_gb) {
        (Some(storage), Some(size)) => Some(format!("{storage}:{size}")),
        _ => None,
    };
    let body = Body::new()
        .set("vmid", vmid)
        .opt("name", name)
        .opt("cores", cores)
        .opt("memory", memory_mb)
        .opt("scsi0", disk)
        .opt("ide2", iso.map(|iso| format!("{iso},media=cdrom")))
        .build();
    let path = format!("nodes/{node}/qemu");
    let reply = ctx
        .transport
        .request(Method::Post, &path, Some(&body))
        .await?;
    Ok(CommandOutput::with_data(
        format!("Created VM {vmid} on {node}{}", task_line(&reply)),
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
    let path = format!("nodes/{node}/qemu/{vmid}/config");
    let reply = ctx
        .transport
        .request(Method::Put, &path, Some(&body))
        .await?;
    Ok(CommandOutput::with_data(
        format!("Updated VM {vmid}: {keys}"),
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
        format!("nodes/{node}/qemu/{vmid}?purge=1")
    } else {
        format!("nodes/{node}/qemu/{vmid}")
    };
    let reply = ctx.transport.request(Method::Delete, &path, None).await?;
    Ok(CommandOutput::with_data(
        format!("Deleted VM {vmid}{}", task_line(&reply)),
        reply,
    ))
}

/// Shared shape of the start/stop/reboot/suspend/resume status endpoints.
async fn lifecycle(
    ctx: &Arc<Context>,
    node: Option<&str>,
    vmid: u32,
    verb: &str,
) -> Result<CommandOutput, CommandError> {
    let node = require_node(ctx, node)?;
    let path = format!("nodes/{node}/qemu/{vmid}/status/{verb}");
    let reply = ctx.transport.request(Method::Post, &path, None).await?;
    Ok(CommandOutput::with_data(
        format!("Sent {verb} to VM {vmid}{}", task_line(&reply)),
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
    let path = format!("nodes/{node}/qemu/{vmid}/status/shutdown");
    let reply = ctx
        .transport
        .request(Method::Post, &path, Some(&body))
        .await?;
    Ok(CommandOutput::with_data(
        format!("Sent shutdown to VM {vmid}{}", task_line(&reply)),
        reply,
    ))
}

async fn migrate(
    ctx: &Arc<Context>,
    node: Option<&str>,
    vmid: u32,
    target: &str,
    online: bool,
) -> Result<CommandOutput, CommandError> {
    let node = require_node(ctx, node)?;
    let body = Body::new().set("target", target).flag("online", online).build();
    let path = format!("nodes/{node}/qemu/{vmid}/migrate");
    let reply = ctx
        .transport
        .request(Method::Post, &path, Some(&body))
        .await?;
    Ok(CommandOutput::with_data(
        format!("Migrating VM {vmid} to {target}{}", task_line(&reply)),
        reply,
    ))
}

async fn clone(
    ctx: &Arc<Context>,
    node: Option<&str>,
    vmid: u32,
    new_vmid: u32,
    name: Option<String>,
    full: bool,
) -> Result<CommandOutput, CommandError> {
    let node = require_node(ctx, node)?;
    let body = Body::new()
        .set("newid", new_vmid)
        .opt("name", name)
        .flag("full", full)
        .build();
    let path = format!("nodes/{node}/qemu/{vmid}/clone");
    let reply = ctx
        .transport
        .request(Method::Post, &path, Some(&body))
        .await?;
    Ok(CommandOutput::with_data(
        format!("Cloning VM {vmid} to {new_vmid}{}", task_line(&reply)),
        reply,
    ))
}
