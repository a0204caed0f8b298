//! Storage pool command.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::common::{require_node, Body};
use crate::client::Method;
use crate::context::Context;
use crate::error::CommandError;
use crate::registry::params::StorageAction;
use crate::registry::CommandOutput;
use crate::render;

pub(crate) async fn storage(
    ctx: &Arc<Context>,
    action: StorageAction,
) -> Result<CommandOutput, CommandError> {
    match action {
        StorageAction::List { node } => list(ctx, node.as_deref()).await,
        StorageAction::Get { storage } => get(ctx, &storage).await,
        StorageAction::Content {
            node,
            storage,
            content,
        } => list_content(ctx, node.as_deref(), &storage, content.as_deref()).await,
        StorageAction::Create {
            storage,
            kind,
            config,
        } => create(ctx, &storage, &kind, config).await,
        StorageAction::Update { storage, config } => update(ctx, &storage, config).await,
        StorageAction::Delete { storage } => delete(ctx, &storage).await,
    }
}

async fn list(ctx: &Arc<Context>, node: Option<&str>) -> Result<CommandOutput, CommandError> {
    // Node view includes usage figures; the cluster view is config only.
    let (path, title) = match node {
        Some(node) => (
            format!("nodes/{node}/storage"),
            format!("Storage on {node}"),
        ),
        None => ("storage".to_string(), "Storage pools".to_string()),
    };
    let reply = ctx.transport.request(Method::Get, &path, None).await?;
    let items = render::as_items(&reply);

    let message = render::list_section(&title, &items, "storage pools", |v| {
        let id = render::str_field(v, "storage");
        let kind = render::str_field(v, "type");
        let usage = match (render::num_field(v, "used"), render::num_field(v, "total")) {
            (Some(used), Some(total)) if total > 0.0 => format!(
                " — {} / {} used",
                render::human_bytes(used),
                render::human_bytes(total)
            ),
            _ => String::new(),
        };
        format!("**{id}** ({kind}){usage}")
    });
    Ok(CommandOutput::with_data(message, reply))
}

async fn get(ctx: &Arc<Context>, storage: &str) -> Result<CommandOutput, CommandError> {
    let path = format!("storage/{storage}");
    let reply = ctx.transport.request(Method::Get, &path, None).await?;
    let message = render::detail_block(&format!("Storage {storage}"), &reply);
    Ok(CommandOutput::with_data(message, reply))
}

async fn list_content(
    ctx: &Arc<Context>,
    node: Option<&str>,
    storage: &str,
    content: Option<&str>,
) -> Result<CommandOutput, CommandError> {
    let node = require_node(ctx, node)?;
    let path = match content {
        Some(kind) => format!("nodes/{node}/storage/{storage}/content?content={kind}"),
        None => format!("nodes/{node}/storage/{storage}/content"),
    };
    let reply = ctx.transport.request(Method::Get, &path, None).await?;
    let items = render::as_items(&reply);

    let title = format!("Content of {storage}");
    let message = render::list_section(&title, &items, "volumes", |v| {
        let size = render::num_field(v, "size")
            .map(|s| format!(" ({})", render::human_bytes(s)))
            .unwrap_or_default();
        format!("`{}`{size}", render::str_field(v, "volid"))
    });
    Ok(CommandOutput::with_data(message, reply))
}

async fn create(
    ctx: &Arc<Context>,
    storage: &str,
    kind: &str,
    config: HashMap<String, Value>,
) -> Result<CommandOutput, CommandError> {
    let body = Body::new()
        .set("storage", storage)
        .set("type", kind)
        .merge(config)
        .build();
    let reply = ctx
        .transport
        .request(Method::Post, "storage", Some(&body))
        .await?;
    Ok(CommandOutput::with_data(
        format!("Created storage {storage} ({kind})"),
        reply,
    ))
}

async fn update(
    ctx: &Arc<Context>,
    storage: &str,
    config: HashMap<String, Value>,
) -> Result<CommandOutput, CommandError> {
    // Format the key list before `config` moves into the body.
    let keys = config.keys().cloned().collect::<Vec<_>>().join(", ");
    let body = Body::new().merge(config).build();
    let path = format!("storage/{storage}");
    let reply = ctx
        .transport
        .request(Method::Put, &path, Some(&body))
        .await?;
    Ok(CommandOutput::with_data(
        format!("Updated storage {storage}: {keys}"),
        reply,
    ))
}

async fn delete(ctx: &Arc<Context>, storage: &str) -> Result<CommandOutput, CommandError> {
    let path = format!("storage/{storage}");
    let reply = ctx.transport.request(Method::Delete, &path, None).await?;
    Ok(CommandOutput::with_data(
        format!("Deleted storage {storage}"),
        reply,
    ))
}
