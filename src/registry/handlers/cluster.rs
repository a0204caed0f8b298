//! Cluster-wide read commands: membership, resources, API version, and the
//! next free guest id.

use std::sync::Arc;

use serde_json::Value;

use crate::client::Method;
use crate::context::Context;
use crate::error::CommandError;
use crate::registry::params::{ClusterResourcesParams, ResourceKind};
use crate::registry::CommandOutput;
use crate::render;

pub(crate) async fn status(ctx: &Arc<Context>) -> Result<CommandOutput, CommandError> {
    let reply = ctx
        .transport
        .request(Method::Get, "cluster/status", None)
        .await?;
    let items = render::as_items(&reply);

    let mut lines = Vec::new();
    if let Some(cluster) = items.iter().find(|v| render::str_field(v, "type") == "cluster") {
        let quorate = cluster.get("quorate").and_then(Value::as_i64) == Some(1);
        lines.push(format!(
            "{} Cluster **{}** — {}",
            if quorate { "🟢" } else { "🔴" },
            render::str_field(cluster, "name"),
            if quorate { "quorate" } else { "no quorum" }
        ));
    }
    let nodes: Vec<&Value> = items
        .iter()
        .filter(|v| render::str_field(v, "type") == "node")
        .collect();
    if lines.is_empty() && nodes.is_empty() {
        lines.push("No cluster status reported.".to_string());
    } else {
        lines.push(format!("Nodes ({}):", nodes.len()));
        for node in nodes {
            let online = node.get("online").and_then(Value::as_i64) == Some(1);
            lines.push(format!(
                "- {} **{}** ({})",
                if online { "🟢" } else { "🔴" },
                render::str_field(node, "name"),
                render::str_field(node, "ip")
            ));
        }
    }
    Ok(CommandOutput::with_data(lines.join("\n"), reply))
}

pub(crate) async fn resources(
    ctx: &Arc<Context>,
    params: ClusterResourcesParams,
) -> Result<CommandOutput, CommandError> {
    let path = match params.kind {
        Some(kind) => format!("cluster/resources?type={}", kind.as_str()),
        None => "cluster/resources".to_string(),
    };
    let reply = ctx.transport.request(Method::Get, &path, None).await?;
    let items = render::as_items(&reply);

    let title = match params.kind {
        Some(ResourceKind::Vm) => "Guest resources",
        Some(ResourceKind::Storage) => "Storage resources",
        Some(ResourceKind::Node) => "Node resources",
        Some(ResourceKind::Sdn) => "SDN resources",
        None => "Cluster resources",
    };
    let message = render::list_section(title, &items, "resources", |v| {
        let status = render::str_field(v, "status");
        format!(
            "{} `{}` ({status})",
            render::status_glyph(status),
            render::str_field(v, "id")
        )
    });
    Ok(CommandOutput::with_data(message, reply))
}

pub(crate) async fn version(ctx: &Arc<Context>) -> Result<CommandOutput, CommandError> {
    let reply = ctx.transport.request(Method::Get, "version", None).await?;
    let message = format!(
        "API version {} (release {})",
        render::str_field(&reply, "version"),
        render::str_field(&reply, "release")
    );
    Ok(CommandOutput::with_data(message, reply))
}

pub(crate) async fn next_vmid(ctx: &Arc<Context>) -> Result<CommandOutput, CommandError> {
    let reply = ctx
        .transport
        .request(Method::Get, "cluster/nextid", None)
        .await?;
    // Comes back as a string of digits.
    let id = match &reply {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Ok(CommandOutput::with_data(format!("Next free VM id: {id}"), reply))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::client::testing::StubTransport;
    use crate::context::testing::stub_context;
    use serde_json::json;

    #[tokio::test]
    async fn status_reports_quorum_and_nodes() {
        let stub = StubTransport::new().respond_with(json!([
            {"type": "cluster", "name": "homelab", "quorate": 1},
            {"type": "node", "name": "pve1", "online": 1, "ip": "10.0.0.1"},
            {"type": "node", "name": "pve2", "online": 0, "ip": "10.0.0.2"}
        ]));
        let (ctx, _stub) = stub_context(false, stub);
        let out = status(&ctx).await.unwrap();
        assert!(out.message.contains("**homelab** — quorate"));
        assert!(out.message.contains("Nodes (2):"));
        assert!(out.message.contains("🔴 **pve2**"));
    }

    #[tokio::test]
    async fn resources_filter_appears_in_path() {
        let stub = StubTransport::new().respond_with(json!([
            {"id": "storage/pve1/local", "status": "available"}
        ]));
        let (ctx, stub) = stub_context(false, stub);
        let params = ClusterResourcesParams {
            kind: Some(ResourceKind::Storage),
        };
        let out = resources(&ctx, params).await.unwrap();
        assert_eq!(stub.calls()[0].path, "cluster/resources?type=storage");
        assert!(out.message.contains("storage/pve1/local"));
    }

    #[tokio::test]
    async fn next_vmid_accepts_string_reply() {
        let stub = StubTransport::new().respond_with(json!("105"));
        let (ctx, _stub) = stub_context(false, stub);
        let out = next_vmid(&ctx).await.unwrap();
        assert_eq!(out.message, "Next free VM id: 105");
    }
}
