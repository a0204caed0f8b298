pub mod catalog;
pub mod execute;
pub mod handlers;
pub mod params;
pub mod validation;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::CommandError;

use params::{
    BackupAction, ClusterResourcesParams, ContainerAction, HelpParams, NetworkAction,
    NodeStatusParams, PoolAction, ServiceAction, SnapshotAction, StorageAction, TaskAction,
    UserAction, VmAction,
};

// ── Command metadata ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandCategory {
    Vm,
    Container,
    Storage,
    Backup,
    Task,
    Access,
    Network,
    Node,
    Cluster,
    System,
}

impl CommandCategory {
    pub fn slug(self) -> &'static str {
        match self {
            Self::Vm => "vm",
            Self::Container => "container",
            Self::Storage => "storage",
            Self::Backup => "backup",
            Self::Task => "task",
            Self::Access => "access",
            Self::Network => "network",
            Self::Node => "node",
            Self::Cluster => "cluster",
            Self::System => "system",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Vm => "QEMU virtual machines: lifecycle, config, snapshots",
            Self::Container => "LXC containers: lifecycle and config",
            Self::Storage => "Storage pools and their content",
            Self::Backup => "Backup archives: create, delete, restore",
            Self::Task => "Asynchronous task tracking",
            Self::Access => "Users and permissions",
            Self::Network => "Node network interfaces",
            Self::Node => "Cluster nodes and their services",
            Self::Cluster => "Cluster-wide status and resources",
            Self::System => "Command discovery and API version",
        }
    }

    pub fn all() -> &'static [CommandCategory] {
        &[
            Self::Vm,
            Self::Container,
            Self::Storage,
            Self::Backup,
            Self::Task,
            Self::Access,
            Self::Network,
            Self::Node,
            Self::Cluster,
            Self::System,
        ]
    }
}

/// Whether a command needs the capability gate: never, always, or decided by
/// the validated `action` discriminator (consolidated commands).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mutability {
    ReadOnly,
    Mutating,
    PerAction,
}

pub struct CommandInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub category: CommandCategory,
    pub mutability: Mutability,
}

// ── Command output ──────────────────────────────────────────────

/// Internal result of executing a command: the rendered markdown message the
/// envelope will carry, plus the raw JSON reply for machine consumers.
#[derive(Debug, Clone, Serialize)]
pub struct CommandOutput {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl CommandOutput {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
        }
    }
}

// ── define_commands! macro ──────────────────────────────────────

/// Single source of truth for all commands. Generates:
/// 1. `Command` enum (serde-tagged)
/// 2. `Command::info()` — metadata (name, description, category, mutability)
/// 3. `Command::dispatch()` — route to the handler; exhaustive by construction
/// 4. `Command::registry_entries()` — catalog entries with JSON schemas
/// 5. `Command::from_invocation()` — build from a (name, JSON params) pair
/// 6. `Command::requires_elevation()` — capability-gate metadata, per-action
///    for consolidated commands
/// 7. `Command::action_label()` — "vm.delete"-style label for gate messages
/// 8. `COMMAND_NAMES` — every registered name, for the completeness check
macro_rules! define_commands {
    (
        params {
            $(
                [ $pc:expr $(, $pf:ident)* ]
                $pv:ident ( $pp:ty )
                => $ph:path, $pn:literal : $pd:literal ;
            )*
        }
        no_params {
            $(
                [ $nc:expr $(, $nf:ident)* ]
                $nv:ident
                => $nh:path, $nn:literal : $nd:literal ;
            )*
        }
    ) => {
        // ── 1. Command enum ──
        /// Unified command type. Every surface (HTTP, CLI, tests) dispatches
        /// through the same entry point. Adding a variant causes compiler
        /// errors until it is fully handled.
        #[derive(Debug, Clone, Serialize, Deserialize)]
        #[serde(tag = "command", content = "params", rename_all = "snake_case")]
        pub enum Command {
            $( $pv($pp), )*
            $( $nv, )*
        }

        impl Command {
            // ── 2. info() ──
            pub fn info(&self) -> CommandInfo {
                match self {
                    $( Command::$pv(_) => CommandInfo {
                        name: $pn,
                        description: $pd,
                        category: $pc,
                        mutability: define_commands!(@mutability $($pf)*),
                    }, )*
                    $( Command::$nv => CommandInfo {
                        name: $nn,
                        description: $nd,
                        category: $nc,
                        mutability: define_commands!(@mutability $($nf)*),
                    }, )*
                }
            }

            // ── 3. dispatch() ──
            pub(crate) async fn dispatch(
                self,
                ctx: &Arc<Context>,
            ) -> Result<CommandOutput, CommandError> {
                match self {
                    $( Command::$pv(p) => $ph(ctx, p).await, )*
                    $( Command::$nv => $nh(ctx).await, )*
                }
            }

            // ── 4. registry_entries() ──
            pub(crate) fn registry_entries() -> Vec<catalog::CommandRegistryEntry> {
                vec![
                    $( catalog::entry(
                        CommandInfo {
                            name: $pn,
                            description: $pd,
                            category: $pc,
                            mutability: define_commands!(@mutability $($pf)*),
                        },
                        catalog::schema_value::<$pp>(),
                    ), )*
                    $( catalog::entry(
                        CommandInfo {
                            name: $nn,
                            description: $nd,
                            category: $nc,
                            mutability: define_commands!(@mutability $($nf)*),
                        },
                        catalog::empty_object_schema(),
                    ), )*
                ]
            }

            // ── 5. from_invocation() ──
            pub(crate) fn from_invocation(
                name: &str,
                params: &serde_json::Value,
            ) -> Result<Command, CommandError> {
                match name {
                    $( $pn => Ok(Command::$pv(catalog::de(params)?)), )*
                    $( $nn => Ok(Command::$nv), )*
                    _ => Err(CommandError::UnknownCommand {
                        name: name.to_string(),
                    }),
                }
            }

            // ── 6. requires_elevation() ──
            /// Whether this (already validated) invocation must pass the
            /// capability gate before any remote call is issued.
            pub fn requires_elevation(&self) -> bool {
                match self {
                    $( Command::$pv(p) => define_commands!(@elevation p; $($pf)*), )*
                    $( Command::$nv => define_commands!(@elevation_unit $($nf)*), )*
                }
            }

            // ── 7. action_label() ──
            /// Human-readable label for gate denials and envelopes:
            /// the command name, or `command.action` for consolidated commands.
            pub fn action_label(&self) -> String {
                match self {
                    $( Command::$pv(p) => define_commands!(@label p, $pn; $($pf)*), )*
                    $( Command::$nv => $nn.to_string(), )*
                }
            }
        }

        /// Every registered command name, in registration order.
        pub const COMMAND_NAMES: &[&str] = &[
            $( $pn, )*
            $( $nn, )*
        ];
    };

    // Flag cascade helpers. Literal tokens match before metavariables, so a
    // specific flag matches its arm and anything else recurses.
    (@mutability mutating $($rest:ident)*) => { Mutability::Mutating };
    (@mutability per_action $($rest:ident)*) => { Mutability::PerAction };
    (@mutability $_other:ident $($rest:ident)*) => { define_commands!(@mutability $($rest)*) };
    (@mutability) => { Mutability::ReadOnly };

    (@elevation $p:ident; mutating $($rest:ident)*) => { { let _ = $p; true } };
    (@elevation $p:ident; per_action $($rest:ident)*) => { $p.is_mutating() };
    (@elevation $p:ident; $_other:ident $($rest:ident)*) => { define_commands!(@elevation $p; $($rest)*) };
    (@elevation $p:ident;) => { { let _ = $p; false } };

    (@elevation_unit mutating $($rest:ident)*) => { true };
    (@elevation_unit $_other:ident $($rest:ident)*) => { define_commands!(@elevation_unit $($rest)*) };
    (@elevation_unit) => { false };

    (@label $p:ident, $n:literal; per_action $($rest:ident)*) => { format!("{}.{}", $n, $p.action_name()) };
    (@label $p:ident, $n:literal; $_other:ident $($rest:ident)*) => { define_commands!(@label $p, $n; $($rest)*) };
    (@label $p:ident, $n:literal;) => { { let _ = $p; $n.to_string() } };
}

// ── Command definitions ─────────────────────────────────────────

define_commands! {
    params {
        // ── Consolidated commands, gated per action ─────────────
        [CommandCategory::Vm, per_action]
        Vm(VmAction)
        => handlers::vm::vm, "vm": "Manage QEMU VMs: list, get, status, create, update, delete, start, stop, shutdown, reboot, suspend, resume, migrate, clone.";

        [CommandCategory::Container, per_action]
        Container(ContainerAction)
        => handlers::container::container, "container": "Manage LXC containers: list, get, status, create, update, delete, start, stop, shutdown, reboot.";

        [CommandCategory::Storage, per_action]
        Storage(StorageAction)
        => handlers::storage::storage, "storage": "Manage storage pools: list, get, content, create, update, delete.";

        [CommandCategory::Vm, per_action]
        Snapshot(SnapshotAction)
        => handlers::snapshot::snapshot, "snapshot": "Manage VM snapshots: list, get, create, delete, rollback.";

        [CommandCategory::Backup, per_action]
        Backup(BackupAction)
        => handlers::backup::backup, "backup": "Manage backup archives: list, create, delete, restore.";

        [CommandCategory::Task, per_action]
        Task(TaskAction)
        => handlers::task::task, "task": "Inspect and cancel asynchronous tasks: list, status, log, cancel.";

        [CommandCategory::Access, per_action]
        User(UserAction)
        => handlers::user::user, "user": "Manage users: list, get, create, update, delete.";

        [CommandCategory::Network, per_action]
        Network(NetworkAction)
        => handlers::network::network, "network": "Manage node network interfaces: list, get, create, update, delete, apply, revert.";

        [CommandCategory::Node, per_action]
        Service(ServiceAction)
        => handlers::service::service, "service": "Manage node services: list, state, start, stop, restart.";

        [CommandCategory::Cluster, per_action]
        Pool(PoolAction)
        => handlers::pool::pool, "pool": "Manage resource pools: list, get, create, update, delete.";

        // ── Simple commands ─────────────────────────────────────
        [CommandCategory::Cluster]
        ClusterResources(ClusterResourcesParams)
        => handlers::cluster::resources, "cluster_resources": "List cluster resources (VMs, storage, nodes), optionally filtered by kind.";

        [CommandCategory::Node]
        NodeStatus(NodeStatusParams)
        => handlers::node::status, "node_status": "Detailed status of one node: CPU, memory, uptime, load.";

        [CommandCategory::System]
        Help(HelpParams)
        => handlers::help::help, "help": "Discover available commands. No topic lists categories; a category or command name gives detail.";
    }
    no_params {
        [CommandCategory::Cluster]
        ClusterStatus
        => handlers::cluster::status, "cluster_status": "Cluster membership and quorum status.";

        [CommandCategory::Node]
        NodeList
        => handlers::node::list, "node_list": "List cluster nodes with their status.";

        [CommandCategory::System]
        Version
        => handlers::cluster::version, "version": "API version of the connected cluster.";

        [CommandCategory::Cluster]
        NextVmid
        => handlers::cluster::next_vmid, "next_vmid": "Next unused VM id in the cluster.";
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn per_action_elevation_follows_discriminator() {
        let read = Command::from_invocation("vm", &json!({"action": "list"})).unwrap();
        assert!(!read.requires_elevation());
        assert_eq!(read.action_label(), "vm.list");

        let write =
            Command::from_invocation("vm", &json!({"action": "delete", "vmid": 100})).unwrap();
        assert!(write.requires_elevation());
        assert_eq!(write.action_label(), "vm.delete");
    }

    #[test]
    fn simple_commands_are_read_only() {
        let cmd = Command::from_invocation("cluster_status", &json!({})).unwrap();
        assert!(!cmd.requires_elevation());
        assert_eq!(cmd.action_label(), "cluster_status");
        assert!(matches!(cmd.info().mutability, Mutability::ReadOnly));
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = Command::from_invocation("does_not_exist", &json!({})).unwrap_err();
        assert!(matches!(err, CommandError::UnknownCommand { ref name } if name == "does_not_exist"));
    }

    #[test]
    fn command_names_match_registry_entries() {
        let entries = Command::registry_entries();
        assert_eq!(entries.len(), COMMAND_NAMES.len());
        for (entry, name) in entries.iter().zip(COMMAND_NAMES) {
            assert_eq!(entry.name, *name);
        }
    }

    #[test]
    fn every_category_is_used() {
        let entries = Command::registry_entries();
        for category in CommandCategory::all() {
            assert!(
                entries.iter().any(|e| e.category == *category),
                "category {} has no commands",
                category.slug()
            );
        }
    }
}
