//! Resource pool command.

use std::sync::Arc;

use super::common::Body;
use crate::client::Method;
use crate::context::Context;
use crate::error::CommandError;
use crate::registry::params::PoolAction;
use crate::registry::validation::Violation;
use crate::registry::CommandOutput;
use crate::render;

pub(crate) async fn pool(
    ctx: &Arc<Context>,
    action: PoolAction,
) -> Result<CommandOutput, CommandError> {
    match action {
        PoolAction::List => list(ctx).await,
        PoolAction::Get { poolid } => get(ctx, &poolid).await,
        PoolAction::Create { poolid, comment } => create(ctx, &poolid, comment).await,
        PoolAction::Update {
            poolid,
            comment,
            add_vms,
            remove_vms,
        } => update(ctx, &poolid, comment, add_vms, remove_vms).await,
        PoolAction::Delete { poolid } => delete(ctx, &poolid).await,
    }
}

async fn list(ctx: &Arc<Context>) -> Result<CommandOutput, CommandError> {
    let reply = ctx.transport.request(Method::Get, "pools", None).await?;
    let items = render::as_items(&reply);

    let message = render::list_section("Resource pools", &items, "pools", |v| {
        let comment = match render::str_field(v, "comment") {
            "-" | "" => String::new(),
            c => format!(" — {c}"),
        };
        format!("**{}**{comment}", render::str_field(v, "poolid"))
    });
    Ok(CommandOutput::with_data(message, reply))
}

async fn get(ctx: &Arc<Context>, poolid: &str) -> Result<CommandOutput, CommandError> {
    let path = format!("pools/{poolid}");
    let reply = ctx.transport.request(Method::Get, &path, None).await?;

    let mut lines = vec![format!("**Pool {poolid}**")];
    let comment = render::str_field(&reply, "comment");
    if comment != "-" {
        lines.push(format!("- comment: {comment}"));
    }
    let members = reply
        .get("members")
        .map(render::as_items)
        .unwrap_or_default();
    lines.push(format!("- members: {}", members.len()));
    for member in &members {
        lines.push(format!(
            "  - {} {}",
            render::str_field(member, "type"),
            render::str_field(member, "id")
        ));
    }
    Ok(CommandOutput::with_data(lines.join("\n"), reply))
}

async fn create(
    ctx: &Arc<Context>,
    poolid: &str,
    comment: Option<String>,
) -> Result<CommandOutput, CommandError> {
    let body = Body::new().set("poolid", poolid).opt("comment", comment).build();
    let reply = ctx
        .transport
        .request(Method::Post, "pools", Some(&body))
        .await?;
    Ok(CommandOutput::with_data(
        format!("Created pool {poolid}"),
        reply,
    ))
}

async fn update(
    ctx: &Arc<Context>,
    poolid: &str,
    comment: Option<String>,
    add_vms: Vec<u32>,
    remove_vms: Vec<u32>,
) -> Result<CommandOutput, CommandError> {
    // The membership endpoint takes one vms list per call, adding or (with
    // the delete marker) removing. Requesting both cannot be honored in a
    // single call, so it is rejected up front.
    if !add_vms.is_empty() && !remove_vms.is_empty() {
        return Err(CommandError::Validation {
            violations: vec![Violation::new(
                "add_vms",
                "cannot combine add_vms and remove_vms in one update",
            )],
        });
    }
    let vms = |ids: &[u32]| {
        ids.iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    };
    let mut body = Body::new().opt("comment", comment);
    let mut changes = Vec::new();
    if !add_vms.is_empty() {
        body = body.set("vms", vms(&add_vms));
        changes.push(format!("added VMs {}", vms(&add_vms)));
    }
    if !remove_vms.is_empty() {
        body = body.set("vms", vms(&remove_vms)).flag("delete", true);
        changes.push(format!("removed VMs {}", vms(&remove_vms)));
    }
    if changes.is_empty() {
        changes.push("comment".to_string());
    }

    let path = format!("pools/{poolid}");
    let reply = ctx
        .transport
        .request(Method::Put, &path, Some(&body.build()))
        .await?;
    Ok(CommandOutput::with_data(
        format!("Updated pool {poolid}: {}", changes.join(", ")),
        reply,
    ))
}

async fn delete(ctx: &Arc<Context>, poolid: &str) -> Result<CommandOutput, CommandError> {
    let path = format!("pools/{poolid}");
    let reply = ctx.transport.request(Method::Delete, &path, None).await?;
    Ok(CommandOutput::with_data(
        format!("Deleted pool {poolid}"),
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
    async fn get_lists_members() {
        let stub = StubTransport::new().respond_with(json!({
            "comment": "production",
            "members": [
                {"type": "qemu", "id": "qemu/100"},
                {"type": "storage", "id": "storage/local"}
            ]
        }));
        let (ctx, _stub) = stub_context(false, stub);
        let out = pool(&ctx, PoolAction::Get { poolid: "prod".into() }).await.unwrap();
        assert!(out.message.contains("members: 2"));
        assert!(out.message.contains("qemu/100"));
    }

    #[tokio::test]
    async fn update_add_and_remove_together_is_rejected_locally() {
        let stub = StubTransport::new();
        let (ctx, stub) = stub_context(true, stub);
        let action = PoolAction::Update {
            poolid: "prod".into(),
            comment: None,
            add_vms: vec![100],
            remove_vms: vec![101],
        };
        let err = pool(&ctx, action).await.unwrap_err();
        assert!(matches!(err, CommandError::Validation { .. }));
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn removal_sets_the_delete_marker() {
        let stub = StubTransport::new();
        let (ctx, stub) = stub_context(true, stub);
        let action = PoolAction::Update {
            poolid: "prod".into(),
            comment: None,
            add_vms: vec![],
            remove_vms: vec![100, 101],
        };
        pool(&ctx, action).await.unwrap();

        let body = stub.calls()[0].body.clone().unwrap();
        assert_eq!(body["vms"], "100,101");
        assert_eq!(body["delete"], 1);
    }

    #[tokio::test]
    async fn every_action_routes_to_its_endpoint() {
        let cases = [
            (json!({"action": "list"}), "GET", "pools"),
            (json!({"action": "get", "poolid": "prod"}), "GET", "pools/prod"),
            (json!({"action": "create", "poolid": "prod"}), "POST", "pools"),
            (
                json!({"action": "update", "poolid": "prod", "comment": "web tier"}),
                "PUT",
                "pools/prod",
            ),
            (json!({"action": "delete", "poolid": "prod"}), "DELETE", "pools/prod"),
        ];
        for (params, method, path) in cases {
            let action: PoolAction = serde_json::from_value(params).unwrap();
            let (ctx, stub) = stub_context(true, StubTransport::new());
            pool(&ctx, action).await.unwrap();
            let calls = stub.calls();
            assert_eq!(calls.len(), 1, "{path} should make exactly one call");
            assert_eq!(calls[0].method, method, "{path}");
            assert_eq!(calls[0].path, path);
        }
    }
}
