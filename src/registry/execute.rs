//! The single invocation entry point.
//!
//! Every surface calls [`invoke`] with a command name and raw JSON params
//! and gets an [`Envelope`] back, unconditionally. Lookup, validation, the
//! capability gate, dispatch, and even handler panics all resolve into the
//! same two-shape result; nothing escapes as a Rust error or a panic.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use serde_json::Value;

use super::{catalog, validation, Command, CommandOutput};
use crate::context::Context;
use crate::envelope::Envelope;
use crate::error::CommandError;
use crate::gate;

/// Invoke a command by name with raw JSON params.
pub async fn invoke(ctx: &Arc<Context>, name: &str, params: &Value) -> Envelope {
    invoke_detailed(ctx, name, params).await.0
}

/// Like [`invoke`], but also returns the handler's raw JSON reply on
/// success. The CLI's `--json` output and tests use the second half.
pub async fn invoke_detailed(
    ctx: &Arc<Context>,
    name: &str,
    params: &Value,
) -> (Envelope, Option<Value>) {
    match run(ctx, name, params).await {
        Ok(output) => (Envelope::ok(output.message), output.data),
        Err((label, error)) => {
            tracing::warn!(command = %label, error = %error, "invocation failed");
            (Envelope::fail(&label, &error), None)
        }
    }
}

/// The pipeline proper. Errors carry the most specific label known at the
/// point of failure: the bare name before the params parse, the
/// `command.action` label after.
async fn run(
    ctx: &Arc<Context>,
    name: &str,
    params: &Value,
) -> Result<CommandOutput, (String, CommandError)> {
    // Absent params mean "no params"; validation sees an empty object.
    let params = match params {
        Value::Null => Value::Object(serde_json::Map::new()),
        other => other.clone(),
    };

    let entry = catalog::registry().get(name).ok_or_else(|| {
        (
            name.to_string(),
            CommandError::UnknownCommand {
                name: name.to_string(),
            },
        )
    })?;

    // Structural validation first, against the same schema the catalog
    // publishes. All violations in one report.
    let violations = validation::validate(&entry.input_schema, &params);
    if !violations.is_empty() {
        return Err((name.to_string(), CommandError::Validation { violations }));
    }

    let command =
        Command::from_invocation(name, &params).map_err(|e| (name.to_string(), e))?;
    let label = command.action_label();

    // The gate runs here, after validation and before dispatch. Handlers
    // never check it themselves, so a denial is guaranteed to precede any
    // remote call.
    if command.requires_elevation() {
        gate::require_elevated(ctx, &label).map_err(|e| (label.clone(), e))?;
    }

    tracing::debug!(command = %label, "dispatching");
    match AssertUnwindSafe(command.dispatch(ctx)).catch_unwind().await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(error)) => Err((label, error)),
        Err(panic) => Err((
            label,
            CommandError::Internal {
                message: panic_message(panic.as_ref()),
            },
        )),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("handler panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("handler panicked: {s}")
    } else {
        "handler panicked".to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::client::testing::StubTransport;
    use crate::context::testing::stub_context;
    use serde_json::json;

    #[tokio::test]
    async fn mutation_denied_before_any_remote_call() {
        let (ctx, stub) = stub_context(false, StubTransport::new());
        let env = invoke(&ctx, "vm", &json!({"action": "delete", "vmid": 100})).await;

        assert!(env.is_error());
        assert!(env.message().contains("Permission denied"));
        assert!(env.message().contains("vm.delete"));
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn read_only_action_passes_with_mutations_disabled() {
        let stub = StubTransport::new().respond_with(json!([
            {"vmid": 100, "name": "web", "status": "running"},
            {"vmid": 101, "name": "db", "status": "stopped"}
        ]));
        let (ctx, stub) = stub_context(false, stub);
        let env = invoke(&ctx, "vm", &json!({"action": "list"})).await;

        assert!(!env.is_error(), "{}", env.message());
        assert!(env.message().contains("web"));
        assert_eq!(stub.call_count(), 1);
    }

    #[tokio::test]
    async fn invalid_params_reported_without_dispatch() {
        let (ctx, stub) = stub_context(true, StubTransport::new());
        let env = invoke(&ctx, "vm", &json!({"action": "update"})).await;

        assert!(env.is_error());
        assert!(env.message().contains("vmid"));
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn unknown_command_is_an_error_envelope() {
        let (ctx, stub) = stub_context(true, StubTransport::new());
        let env = invoke(&ctx, "does_not_exist", &json!({})).await;

        assert!(env.is_error());
        assert!(env.message().contains("Unknown command"));
        assert!(env.message().contains("does_not_exist"));
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn transport_failure_surfaces_verbatim_after_one_call() {
        let stub = StubTransport::new().fail_with("connection timeout");
        let (ctx, stub) = stub_context(false, stub);
        let env = invoke(&ctx, "vm", &json!({"action": "list"})).await;

        assert!(env.is_error());
        assert!(env.message().contains("connection timeout"));
        assert_eq!(stub.call_count(), 1);
    }

    #[tokio::test]
    async fn handler_panic_contained_as_internal_error() {
        let stub = StubTransport::new().panic_with("stub exploded");
        let (ctx, _stub) = stub_context(false, stub);
        let env = invoke(&ctx, "vm", &json!({"action": "list"})).await;

        assert!(env.is_error());
        assert!(env.message().contains("Internal error"));
        assert!(env.message().contains("stub exploded"));
    }

    #[tokio::test]
    async fn null_params_treated_as_empty_object() {
        let stub = StubTransport::new().respond_with(json!({"version": "8.2.4", "release": "8.2"}));
        let (ctx, _stub) = stub_context(false, stub);
        let env = invoke(&ctx, "version", &Value::Null).await;

        assert!(!env.is_error(), "{}", env.message());
        assert!(env.message().contains("8.2.4"));
    }

    #[tokio::test]
    async fn detailed_invoke_returns_raw_reply() {
        let stub = StubTransport::new().respond_with(json!([{"vmid": 100, "status": "running"}]));
        let (ctx, _stub) = stub_context(false, stub);
        let (env, data) = invoke_detailed(&ctx, "vm", &json!({"action": "list"})).await;

        assert!(!env.is_error());
        let data = data.unwrap();
        assert_eq!(data[0]["vmid"], 100);
    }
}
