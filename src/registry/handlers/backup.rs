//! Backup archive command. Creation goes through the node's vzdump
//! endpoint; archives themselves live as storage content.

use std::sync::Arc;

use super::common::{require_node, task_line, Body};
use crate::client::Method;
use crate::context::Context;
use crate::error::CommandError;
use crate::registry::params::{BackupAction, BackupMode};
use crate::registry::CommandOutput;
use crate::render;

pub(crate) async fn backup(
    ctx: &Arc<Context>,
    action: BackupAction,
) -> Result<CommandOutput, CommandError> {
    match action {
        BackupAction::List { node, storage } => list(ctx, node.as_deref(), &storage).await,
        BackupAction::Create {
            node,
            vmid,
            storage,
            mode,
            compress,
        } => create(ctx, node.as_deref(), vmid, storage, mode, compress).await,
        BackupAction::Delete {
            node,
            storage,
            volid,
        } => delete(ctx, node.as_deref(), &storage, &volid).await,
        BackupAction::Restore {
            node,
            vmid,
            archive,
            storage,
            force,
        } => restore(ctx, node.as_deref(), vmid, &archive, storage, force).await,
    }
}

async fn list(
    ctx: &Arc<Context>,
    node: Option<&str>,
    storage: &str,
) -> Result<CommandOutput, CommandError> {
    let node = require_node(ctx, node)?;
    let path = format!("nodes/{node}/storage/{storage}/content?content=backup");
    let reply = ctx.transport.request(Method::Get, &path, None).await?;
    let mut items = render::as_items(&reply);
    // Newest first.
    items.sort_by_key(|v| std::cmp::Reverse(render::int_field(v, "ctime")));

    let title = format!("Backups on {storage}");
    let message = render::list_section(&title, &items, "backups", |v| {
        let size = render::num_field(v, "size")
            .map(|s| format!(" ({})", render::human_bytes(s)))
            .unwrap_or_default();
        let guest = render::int_field(v, "vmid")
            .map(|id| format!("VM {id}: "))
            .unwrap_or_default();
        format!("{guest}`{}`{size}", render::str_field(v, "volid"))
    });
    Ok(CommandOutput::with_data(message, reply))
}

async fn create(
    ctx: &Arc<Context>,
    node: Option<&str>,
    vmid: u32,
    storage: Option<String>,
    mode: Option<BackupMode>,
    compress: Option<String>,
) -> Result<CommandOutput, CommandError> {
    let node = require_node(ctx, node)?;
    let body = Body::new()
        .set("vmid", vmid)
        .opt("storage", storage)
        .opt("mode", mode.map(BackupMode::as_str))
        .opt("compress", compress)
        .build();
    let path = format!("nodes/{node}/vzdump");
    let reply = ctx
        .transport
        .request(Method::Post, &path, Some(&body))
        .await?;
    Ok(CommandOutput::with_data(
        format!("Backing up VM {vmid}{}", task_line(&reply)),
        reply,
    ))
}

async fn delete(
    ctx: &Arc<Context>,
    node: Option<&str>,
    storage: &str,
    volid: &str,
) -> Result<CommandOutput, CommandError> {
    let node = require_node(ctx, node)?;
    let path = format!("nodes/{node}/storage/{storage}/content/{volid}");
    let reply = ctx.transport.request(Method::Delete, &path, None).await?;
    Ok(CommandOutput::with_data(
        format!("Deleted backup {volid}{}", task_line(&reply)),
        reply,
    ))
}

async fn restore(
    ctx: &Arc<Context>,
    node: Option<&str>,
    vmid: u32,
    archive: &str,
    storage: Option<String>,
    force: bool,
) -> Result<CommandOutput, CommandError> {
    let node = require_node(ctx, node)?;
    let body = Body::new()
        .set("vmid", vmid)
        .set("archive", archive)
        .opt("storage", storage)
        .flag("force", force)
        .build();
    let path = format!("nodes/{node}/qemu");
    let reply = ctx
        .transport
        .request(Method::Post, &path, Some(&body))
        .await?;
    Ok(CommandOutput::with_data(
        format!("Restoring VM {vmid} from {archive}{}", task_line(&reply)),
        reply,
    ))
}
