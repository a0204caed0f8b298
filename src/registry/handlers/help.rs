//! Command discovery. Answers from the registry itself; the only handler
//! that issues no remote call.

use std::sync::Arc;

use crate::context::Context;
use crate::error::CommandError;
use crate::registry::catalog;
use crate::registry::params::HelpParams;
use crate::registry::CommandOutput;

#[allow(clippy::unused_async)]
pub(crate) async fn help(
    _ctx: &Arc<Context>,
    params: HelpParams,
) -> Result<CommandOutput, CommandError> {
    Ok(CommandOutput::new(catalog::help_text(
        params.topic.as_deref(),
    )))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::client::testing::StubTransport;
    use crate::context::testing::stub_context;

    #[tokio::test]
    async fn help_never_touches_the_transport() {
        let (ctx, stub) = stub_context(false, StubTransport::new());
        let out = help(&ctx, HelpParams { topic: None }).await.unwrap();
        assert!(out.message.contains("command categories"));
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn command_topic_shows_schema() {
        let (ctx, _stub) = stub_context(false, StubTransport::new());
        let out = help(
            &ctx,
            HelpParams {
                topic: Some("snapshot".into()),
            },
        )
        .await
        .unwrap();
        assert!(out.message.contains("Parameters:"));
        assert!(out.message.contains("rollback"));
    }
}
