//! The capability gate separating read-only from mutating operations.
//!
//! One global boolean, no roles, no scopes. Dispatch applies the gate from
//! command metadata before any handler runs, so no remote call can be issued
//! for a gated action — individual handlers never call this themselves.

use crate::context::Context;
use crate::error::CommandError;

/// Pass if mutating operations are permitted, otherwise a `PermissionDenied`
/// naming the attempted action.
pub fn require_elevated(ctx: &Context, action_label: &str) -> Result<(), CommandError> {
    if ctx.settings.allow_mutations {
        Ok(())
    } else {
        Err(CommandError::PermissionDenied {
            action: action_label.to_string(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::client::testing::StubTransport;
    use crate::context::testing::stub_context;

    #[test]
    fn passes_when_mutations_allowed() {
        let (ctx, _) = stub_context(true, StubTransport::new());
        assert!(require_elevated(&ctx, "vm.delete").is_ok());
    }

    #[test]
    fn denies_and_names_action_when_flag_unset() {
        let (ctx, _) = stub_context(false, StubTransport::new());
        let err = require_elevated(&ctx, "vm.delete").unwrap_err();
        assert!(matches!(err, CommandError::PermissionDenied { ref action } if action == "vm.delete"));
    }
}
