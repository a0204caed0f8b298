use std::sync::Arc;

use crate::client::Transport;
use crate::settings::Settings;

/// Process-wide execution context: configuration plus the remote transport.
///
/// Constructed once at startup and shared by reference (`Arc`) into every
/// invocation. Nothing here is mutable, so concurrent invocations need no
/// synchronization.
pub struct Context {
    pub settings: Settings,
    pub transport: Arc<dyn Transport>,
}

impl Context {
    pub fn new(settings: Settings, transport: Arc<dyn Transport>) -> Arc<Context> {
        Arc::new(Context {
            settings,
            transport,
        })
    }

    /// Resolve the node a command should target: explicit parameter first,
    /// then the configured default.
    pub fn node<'a>(&'a self, explicit: Option<&'a str>) -> Option<&'a str> {
        explicit.or(self.settings.default_node.as_deref())
    }
}

#[cfg(test)]
pub mod testing {
    use std::sync::Arc;

    use super::Context;
    use crate::client::testing::StubTransport;
    use crate::settings::Settings;

    /// Context wired to a stub transport, for handler and dispatch tests.
    /// Returns the stub separately so tests can assert on recorded calls.
    pub fn stub_context(
        allow_mutations: bool,
        stub: StubTransport,
    ) -> (Arc<Context>, Arc<StubTransport>) {
        let stub = Arc::new(stub);
        let settings = Settings {
            api_url: "https://pve.test:8006/api2/json".into(),
            token_id: "root@pam!test".into(),
            token_secret: "secret".into(),
            allow_mutations,
            verify_tls: false,
            default_node: Some("pve1".into()),
        };
        (Context::new(settings, stub.clone()), stub)
    }
}
