//! virtdeck — a schema-validated, permission-gated command surface for
//! hypervisor remote management.
//!
//! Every operation is a named command: raw JSON params are validated against
//! a generated schema, checked against the mutation gate, routed to exactly
//! one remote call, and the outcome is folded into a two-shape response
//! envelope. The registry is the single source of truth; dispatch, schemas,
//! and the published catalog all derive from it.

pub mod api;
pub mod client;
pub mod context;
pub mod envelope;
pub mod error;
pub mod gate;
pub mod registry;
pub mod render;
pub mod settings;
