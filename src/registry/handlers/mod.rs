//! Command handlers. One module per command; each action performs exactly
//! one remote call and renders the reply into the output message. Handlers
//! never check permissions (the dispatch pipeline gates before they run) and
//! never retry.

pub mod backup;
pub mod cluster;
mod common;
pub mod container;
pub mod help;
pub mod network;
pub mod node;
pub mod pool;
pub mod service;
pub mod snapshot;
pub mod storage;
pub mod task;
pub mod user;
pub mod vm;
