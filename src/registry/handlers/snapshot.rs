//! VM snapshot command.

use std::sync::Arc;

use super::common::{require_node, task_line, Body};
use crate::client::Method;
use crate::context::Context;
use crate::error::CommandError;
use crate::registry::params::SnapshotAction;
use crate::registry::CommandOutput;
use crate::render;

pub(crate) async fn snapshot(
    ctx: &Arc<Context>,
    action: SnapshotAction,
) -> Result<CommandOutput, CommandError> {
    match action {
        SnapshotAction::List { node, vmid } => list(ctx, node.as_deref(), vmid).await,
        SnapshotAction::Get { node, vmid, name } => get(ctx, node.as_deref(), vmid, &name).await,
        SnapshotAction::Create {
            node,
            vmid,
            name,
            description,
            include_ram,
        } => create(ctx, node.as_deref(), vmid, &name, description, include_ram).await,
        SnapshotAction::Delete { node, vmid, name } => {
            delete(ctx, node.as_deref(), vmid, &name).await
        }
        SnapshotAction::Rollback {
            node,
            vmid,
            name,
            start,
        } => rollback(ctx, node.as_deref(), vmid, &name, start).await,
    }
}

async fn list(
    ctx: &Arc<Context>,
    node: Option<&str>,
    vmid: u32,
) -> Result<CommandOutput, CommandError> {
    let node = require_node(ctx, node)?;
    let path = format!("nodes/{node}/qemu/{vmid}/snapshot");
    let reply = ctx.transport.request(Method::Get, &path, None).await?;
    let mut items = render::as_items(&reply);
    // The listing always contains the synthetic "current" entry.
    items.retain(|v| render::str_field(v, "name") != "current");
    items.sort_by_key(|v| render::int_field(v, "snaptime"));

    let title = format!("Snapshots of VM {vmid}");
    let message = render::list_section(&title, &items, "snapshots", |v| {
        let desc = match render::str_field(v, "description") {
            "-" | "" => String::new(),
            d => format!(" — {}", d.trim_end()),
        };
        format!("**{}**{desc}", render::str_field(v, "name"))
    });
    Ok(CommandOutput::with_data(message, reply))
}

async fn get(
    ctx: &Arc<Context>,
    node: Option<&str>,
    vmid: u32,
    name: &str,
) -> Result<CommandOutput, CommandError> {
    let node = require_node(ctx, node)?;
    let path = format!("nodes/{node}/qemu/{vmid}/snapshot/{name}/config");
    let reply = ctx.transport.request(Method::Get, &path, None).await?;
    let message = render::detail_block(&format!("Snapshot {name} of VM {vmid}"), &reply);
    Ok(CommandOutput::with_data(message, reply))
}

async fn create(
    ctx: &Arc<Context>,
    node: Option<&str>,
    vmid: u32,
    name: &str,
    description: Option<String>,
    include_ram: bool,
) -> Result<CommandOutput, CommandError> {
    let node = require_node(ctx, node)?;
    let body = Body::new()
        .set("snapname", name)
        .opt("description", description)
        .flag("vmstate", include_ram)
        .build();
    let path = format!("nodes/{node}/qemu/{vmid}/snapshot");
    let reply = ctx
        .transport
        .request(Method::Post, &path, Some(&body))
        .await?;
    Ok(CommandOutput::with_data(
        format!("Created snapshot {name} of VM {vmid}{}", task_line(&reply)),
        reply,
    ))
}

async fn delete(
    ctx: &Arc<Context>,
    node: Option<&str>,
    vmid: u32,
    name: &str,
) -> Result<CommandOutput, CommandError> {
    let node = require_node(ctx, node)?;
    let path = format!("nodes/{node}/qemu/{vmid}/snapshot/{name}");
    let reply = ctx.transport.request(Method::Delete, &path, None).await?;
    Ok(CommandOutput::with_data(
        format!("Deleted snapshot {name} of VM {vmid}{}", task_line(&reply)),
        reply,
    ))
}

async fn rollback(
    ctx: &Arc<Context>,
    node: Option<&str>,
    vmid: u32,
    name: &str,
    start: bool,
) -> Result<CommandOutput, CommandError> {
    let node = require_node(ctx, node)?;
    let body = Body::new().flag("start", start).build();
    let path = format!("nodes/{node}/qemu/{vmid}/snapshot/{name}/rollback");
    let reply = ctx
        .transport
        .request(Method::Post, &path, Some(&body))
        .await?;
    Ok(CommandOutput::with_data(
        format!(
            "Rolled VM {vmid} back to snapshot {name}{}",
            task_line(&reply)
        ),
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
    async fn list_hides_the_current_marker() {
        let stub = StubTransport::new().respond_with(json!([
            {"name": "before-upgrade", "snaptime": 1_700_000_000, "description": "pre 8.2\n"},
            {"name": "current", "description": "You are here!"}
        ]));
        let (ctx, _stub) = stub_context(false, stub);
        let out = snapshot(&ctx, SnapshotAction::List { node: None, vmid: 100 })
            .await
            .unwrap();
        assert!(out.message.contains("before-upgrade"));
        assert!(out.message.contains("pre 8.2"));
        assert!(!out.message.contains("You are here"));
    }

    #[tokio::test]
    async fn create_includes_ram_flag_only_when_asked() {
        let stub = StubTransport::new().respond_with(json!("UPID:pve1:0005:snapshot"));
        let (ctx, stub) = stub_context(true, stub);
        let action = SnapshotAction::Create {
            node: None,
            vmid: 100,
            name: "nightly".into(),
            description: None,
            include_ram: false,
        };
        snapshot(&ctx, action).await.unwrap();

        let body = stub.calls()[0].body.clone().unwrap();
        assert_eq!(body["snapname"], "nightly");
        assert!(body.get("vmstate").is_none());
    }

    #[tokio::test]
    async fn rollback_posts_to_rollback_endpoint() {
        let stub = StubTransport::new().respond_with(json!("UPID:pve1:0006:rollback"));
        let (ctx, stub) = stub_context(true, stub);
        let action = SnapshotAction::Rollback {
            node: Some("pve2".into()),
            vmid: 100,
            name: "before-upgrade".into(),
            start: true,
        };
        let out = snapshot(&ctx, action).await.unwrap();
        assert_eq!(
            stub.calls()[0].path,
            "nodes/pve2/qemu/100/snapshot/before-upgrade/rollback"
        );
        assert_eq!(stub.calls()[0].body.clone().unwrap()["start"], 1);
        assert!(out.message.contains("UPID:pve1:0006:rollback"));
    }

    #[tokio::test]
    async fn every_action_routes_to_its_endpoint() {
        let cases = [
            (json!({"action": "list", "vmid": 100}), "GET", "nodes/pve1/qemu/100/snapshot"),
            (
                json!({"action": "get", "vmid": 100, "name": "clean"}),
                "GET",
                "nodes/pve1/qemu/100/snapshot/clean/config",
            ),
            (
                json!({"action": "create", "vmid": 100, "name": "clean"}),
                "POST",
                "nodes/pve1/qemu/100/snapshot",
            ),
            (
                json!({"action": "delete", "vmid": 100, "name": "clean"}),
                "DELETE",
                "nodes/pve1/qemu/100/snapshot/clean",
            ),
            (
                json!({"action": "rollback", "vmid": 100, "name": "clean"}),
                "POST",
                "nodes/pve1/qemu/100/snapshot/clean/rollback",
            ),
        ];
        for (params, method, path) in cases {
            let action: SnapshotAction = serde_json::from_value(params).unwrap();
            let (ctx, stub) = stub_context(true, StubTransport::new());
            snapshot(&ctx, action).await.unwrap();
            let calls = stub.calls();
            assert_eq!(calls.len(), 1, "{path} should make exactly one call");
            assert_eq!(calls[0].method, method, "{path}");
            assert_eq!(calls[0].path, path);
        }
    }
}
