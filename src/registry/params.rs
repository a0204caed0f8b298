use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// Consolidated commands deserialize into these `action`-tagged enums. The
// discriminator enumeration is defined exactly once per command — the schema
// (via the JsonSchema derive) and the router (via exhaustive `match`) both
// reference the same type, so an action cannot exist in one and not the other.
//
// `is_mutating`/`action_name` are exhaustive matches on purpose: adding an
// action without classifying it is a compile error, not a silent read-only
// default.

fn default_true() -> bool {
    true
}

// ── vm ──────────────────────────────────────────────────────────

/// Guest lifecycle and CRUD on QEMU virtual machines.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum VmAction {
    /// List VMs on one node, or cluster-wide when no node is given.
    List { node: Option<String> },
    Get {
        node: Option<String>,
        #[schemars(range(min = 100, max = 999_999_999))]
        vmid: u32,
    },
    Status {
        node: Option<String>,
        #[schemars(range(min = 100, max = 999_999_999))]
        vmid: u32,
    },
    Create {
        node: Option<String>,
        #[schemars(range(min = 100, max = 999_999_999))]
        vmid: u32,
        name: Option<String>,
        #[schemars(range(min = 1, max = 128))]
        cores: Option<u32>,
        /// Memory in MiB.
        #[schemars(range(min = 16))]
        memory_mb: Option<u64>,
        /// Root disk size in GiB on the given storage.
        disk_gb: Option<u64>,
        storage: Option<String>,
        /// ISO volume id to attach, e.g. `local:iso/debian-12.iso`.
        iso: Option<String>,
    },
    Update {
        node: Option<String>,
        #[schemars(range(min = 100, max = 999_999_999))]
        vmid: u32,
        /// Raw config keys to set, e.g. `{"cores": 4, "memory": 8192}`.
        config: HashMap<String, Value>,
    },
    Delete {
        node: Option<String>,
        #[schemars(range(min = 100, max = 999_999_999))]
        vmid: u32,
        /// Also remove the VM from backup jobs and HA config.
        #[serde(default)]
        purge: bool,
    },
    Start {
        node: Option<String>,
        #[schemars(range(min = 100, max = 999_999_999))]
        vmid: u32,
    },
    Stop {
        node: Option<String>,
        #[schemars(range(min = 100, max = 999_999_999))]
        vmid: u32,
    },
    Shutdown {
        node: Option<String>,
        #[schemars(range(min = 100, max = 999_999_999))]
        vmid: u32,
        /// Seconds to wait for a graceful shutdown before giving up.
        timeout_secs: Option<u64>,
    },
    Reboot {
        node: Option<String>,
        #[schemars(range(min = 100, max = 999_999_999))]
        vmid: u32,
    },
    Suspend {
        node: Option<String>,
        #[schemars(range(min = 100, max = 999_999_999))]
        vmid: u32,
    },
    Resume {
        node: Option<String>,
        #[schemars(range(min = 100, max = 999_999_999))]
        vmid: u32,
    },
    Migrate {
        node: Option<String>,
        #[schemars(range(min = 100, max = 999_999_999))]
        vmid: u32,
        /// Target node name.
        target: String,
        /// Live-migrate a running VM.
        #[serde(default)]
        online: bool,
    },
    Clone {
        node: Option<String>,
        #[schemars(range(min = 100, max = 999_999_999))]
        vmid: u32,
        #[schemars(range(min = 100, max = 999_999_999))]
        new_vmid: u32,
        name: Option<String>,
        /// Full clone instead of a linked clone.
        #[serde(default)]
        full: bool,
    },
}

impl VmAction {
    pub fn is_mutating(&self) -> bool {
        match self {
            VmAction::List { .. } | VmAction::Get { .. } | VmAction::Status { .. } => false,
            VmAction::Create { .. }
            | VmAction::Update { .. }
            | VmAction::Delete { .. }
            | VmAction::Start { .. }
            | VmAction::Stop { .. }
            | VmAction::Shutdown { .. }
            | VmAction::Reboot { .. }
            | VmAction::Suspend { .. }
            | VmAction::Resume { .. }
            | VmAction::Migrate { .. }
            | VmAction::Clone { .. } => true,
        }
    }

    pub fn action_name(&self) -> &'static str {
        match self {
            VmAction::List { .. } => "list",
            VmAction::Get { .. } => "get",
            VmAction::Status { .. } => "status",
            VmAction::Create { .. } => "create",
            VmAction::Update { .. } => "update",
            VmAction::Delete { .. } => "delete",
            VmAction::Start { .. } => "start",
            VmAction::Stop { .. } => "stop",
            VmAction::Shutdown { .. } => "shutdown",
            VmAction::Reboot { .. } => "reboot",
            VmAction::Suspend { .. } => "suspend",
            VmAction::Resume { .. } => "resume",
            VmAction::Migrate { .. } => "migrate",
            VmAction::Clone { .. } => "clone",
        }
    }
}

// ── container ───────────────────────────────────────────────────

/// LXC container lifecycle and CRUD.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ContainerAction {
    List { node: Option<String> },
    Get {
        node: Option<String>,
        #[schemars(range(min = 100, max = 999_999_999))]
        vmid: u32,
    },
    Status {
        node: Option<String>,
        #[schemars(range(min = 100, max = 999_999_999))]
        vmid: u32,
    },
    Create {
        node: Option<String>,
        #[schemars(range(min = 100, max = 999_999_999))]
        vmid: u32,
        /// Template volume id, e.g. `local:vztmpl/debian-12-standard.tar.zst`.
        ostemplate: String,
        hostname: Option<String>,
        #[schemars(range(min = 1, max = 128))]
        cores: Option<u32>,
        /// Memory in MiB.
        #[schemars(range(min = 16))]
        memory_mb: Option<u64>,
        /// Root filesystem size in GiB on the given storage.
        rootfs_gb: Option<u64>,
        storage: Option<String>,
        #[serde(default = "default_true")]
        unprivileged: bool,
    },
    Update {
        node: Option<String>,
        #[schemars(range(min = 100, max = 999_999_999))]
        vmid: u32,
        /// Raw config keys to set.
        config: HashMap<String, Value>,
    },
    Delete {
        node: Option<String>,
        #[schemars(range(min = 100, max = 999_999_999))]
        vmid: u32,
        #[serde(default)]
        purge: bool,
    },
    Start {
        node: Option<String>,
        #[schemars(range(min = 100, max = 999_999_999))]
        vmid: u32,
    },
    Stop {
        node: Option<String>,
        #[schemars(range(min = 100, max = 999_999_999))]
        vmid: u32,
    },
    Shutdown {
        node: Option<String>,
        #[schemars(range(min = 100, max = 999_999_999))]
        vmid: u32,
        timeout_secs: Option<u64>,
    },
    Reboot {
        node: Option<String>,
        #[schemars(range(min = 100, max = 999_999_999))]
        vmid: u32,
    },
}

impl ContainerAction {
    pub fn is_mutating(&self) -> bool {
        match self {
            ContainerAction::List { .. }
            | ContainerAction::Get { .. }
            | ContainerAction::Status { .. } => false,
            ContainerAction::Create { .. }
            | ContainerAction::Update { .. }
            | ContainerAction::Delete { .. }
            | ContainerAction::Start { .. }
            | ContainerAction::Stop { .. }
            | ContainerAction::Shutdown { .. }
            | ContainerAction::Reboot { .. } => true,
        }
    }

    pub fn action_name(&self) -> &'static str {
        match self {
            ContainerAction::List { .. } => "list",
            ContainerAction::Get { .. } => "get",
            ContainerAction::Status { .. } => "status",
            ContainerAction::Create { .. } => "create",
            ContainerAction::Update { .. } => "update",
            ContainerAction::Delete { .. } => "delete",
            ContainerAction::Start { .. } => "start",
            ContainerAction::Stop { .. } => "stop",
            ContainerAction::Shutdown { .. } => "shutdown",
            ContainerAction::Reboot { .. } => "reboot",
        }
    }
}

// ── storage ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StorageAction {
    /// List storage pools; restricted to one node's view when given.
    List { node: Option<String> },
    Get { storage: String },
    /// List the content of one storage on one node.
    Content {
        node: Option<String>,
        storage: String,
        /// Filter by content kind, e.g. `iso`, `backup`, `images`.
        content: Option<String>,
    },
    Create {
        storage: String,
        /// Storage plugin type, e.g. `dir`, `nfs`, `lvmthin`, `zfspool`.
        kind: String,
        /// Plugin-specific config keys, e.g. `{"path": "/mnt/backup"}`.
        #[serde(default)]
        config: HashMap<String, Value>,
    },
    Update {
        storage: String,
        config: HashMap<String, Value>,
    },
    Delete { storage: String },
}

impl StorageAction {
    pub fn is_mutating(&self) -> bool {
        match self {
            StorageAction::List { .. }
            | StorageAction::Get { .. }
            | StorageAction::Content { .. } => false,
            StorageAction::Create { .. }
            | StorageAction::Update { .. }
            | StorageAction::Delete { .. } => true,
        }
    }

    pub fn action_name(&self) -> &'static str {
        match self {
            StorageAction::List { .. } => "list",
            StorageAction::Get { .. } => "get",
            StorageAction::Content { .. } => "content",
            StorageAction::Create { .. } => "create",
            StorageAction::Update { .. } => "update",
            StorageAction::Delete { .. } => "delete",
        }
    }
}

// ── snapshot ────────────────────────────────────────────────────

/// VM snapshot management.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SnapshotAction {
    List {
        node: Option<String>,
        #[schemars(range(min = 100, max = 999_999_999))]
        vmid: u32,
    },
    Get {
        node: Option<String>,
        #[schemars(range(min = 100, max = 999_999_999))]
        vmid: u32,
        name: String,
    },
    Create {
        node: Option<String>,
        #[schemars(range(min = 100, max = 999_999_999))]
        vmid: u32,
        #[schemars(length(min = 1, max = 40))]
        name: String,
        description: Option<String>,
        /// Also snapshot the VM's RAM state.
        #[serde(default)]
        include_ram: bool,
    },
    Delete {
        node: Option<String>,
        #[schemars(range(min = 100, max = 999_999_999))]
        vmid: u32,
        name: String,
    },
    Rollback {
        node: Option<String>,
        #[schemars(range(min = 100, max = 999_999_999))]
        vmid: u32,
        name: String,
        /// Start the VM after rollback completes.
        #[serde(default)]
        start: bool,
    },
}

impl SnapshotAction {
    pub fn is_mutating(&self) -> bool {
        match self {
            SnapshotAction::List { .. } | SnapshotAction::Get { .. } => false,
            SnapshotAction::Create { .. }
            | SnapshotAction::Delete { .. }
            | SnapshotAction::Rollback { .. } => true,
        }
    }

    pub fn action_name(&self) -> &'static str {
        match self {
            SnapshotAction::List { .. } => "list",
            SnapshotAction::Get { .. } => "get",
            SnapshotAction::Create { .. } => "create",
            SnapshotAction::Delete { .. } => "delete",
            SnapshotAction::Rollback { .. } => "rollback",
        }
    }
}

// ── backup ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum BackupMode {
    Snapshot,
    Suspend,
    Stop,
}

impl BackupMode {
    pub fn as_str(self) -> &'static str {
        match self {
            BackupMode::Snapshot => "snapshot",
            BackupMode::Suspend => "suspend",
            BackupMode::Stop => "stop",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BackupAction {
    /// List backup archives on one storage.
    List {
        node: Option<String>,
        storage: String,
    },
    Create {
        node: Option<String>,
        #[schemars(range(min = 100, max = 999_999_999))]
        vmid: u32,
        storage: Option<String>,
        mode: Option<BackupMode>,
        /// Compression, e.g. `zstd`, `gzip`, `lzo`.
        compress: Option<String>,
    },
    Delete {
        node: Option<String>,
        storage: String,
        /// Volume id of the archive, e.g. `local:backup/vzdump-qemu-100-....vma.zst`.
        volid: String,
    },
    Restore {
        node: Option<String>,
        #[schemars(range(min = 100, max = 999_999_999))]
        vmid: u32,
        /// Archive volume id to restore from.
        archive: String,
        storage: Option<String>,
        /// Overwrite an existing VM with this vmid.
        #[serde(default)]
        force: bool,
    },
}

impl BackupAction {
    pub fn is_mutating(&self) -> bool {
        match self {
            BackupAction::List { .. } => false,
            BackupAction::Create { .. }
            | BackupAction::Delete { .. }
            | BackupAction::Restore { .. } => true,
        }
    }

    pub fn action_name(&self) -> &'static str {
        match self {
            BackupAction::List { .. } => "list",
            BackupAction::Create { .. } => "create",
            BackupAction::Delete { .. } => "delete",
            BackupAction::Restore { .. } => "restore",
        }
    }
}

// ── task ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TaskAction {
    List {
        node: Option<String>,
        #[schemars(range(min = 1, max = 500))]
        limit: Option<u32>,
        /// Only tasks still running.
        #[serde(default)]
        running_only: bool,
    },
    Status {
        node: Option<String>,
        /// Task id, e.g. `UPID:pve1:0004F2A1:...`.
        upid: String,
    },
    Log {
        node: Option<String>,
        upid: String,
        start: Option<u32>,
        #[schemars(range(min = 1, max = 1000))]
        limit: Option<u32>,
    },
    Cancel {
        node: Option<String>,
        upid: String,
    },
}

impl TaskAction {
    pub fn is_mutating(&self) -> bool {
        match self {
            TaskAction::List { .. } | TaskAction::Status { .. } | TaskAction::Log { .. } => false,
            TaskAction::Cancel { .. } => true,
        }
    }

    pub fn action_name(&self) -> &'static str {
        match self {
            TaskAction::List { .. } => "list",
            TaskAction::Status { .. } => "status",
            TaskAction::Log { .. } => "log",
            TaskAction::Cancel { .. } => "cancel",
        }
    }
}

// ── user ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum UserAction {
    List,
    Get {
        /// User id in `name@realm` form.
        userid: String,
    },
    Create {
        userid: String,
        #[schemars(length(min = 5))]
        password: Option<String>,
        comment: Option<String>,
        email: Option<String>,
        #[serde(default)]
        groups: Vec<String>,
        #[serde(default = "default_true")]
        enable: bool,
        /// Account expiry as a unix timestamp; 0 = never.
        expire: Option<u64>,
    },
    Update {
        userid: String,
        comment: Option<String>,
        email: Option<String>,
        groups: Option<Vec<String>>,
        enable: Option<bool>,
        expire: Option<u64>,
    },
    Delete { userid: String },
}

impl UserAction {
    pub fn is_mutating(&self) -> bool {
        match self {
            UserAction::List | UserAction::Get { .. } => false,
            UserAction::Create { .. } | UserAction::Update { .. } | UserAction::Delete { .. } => {
                true
            }
        }
    }

    pub fn action_name(&self) -> &'static str {
        match self {
            UserAction::List => "list",
            UserAction::Get { .. } => "get",
            UserAction::Create { .. } => "create",
            UserAction::Update { .. } => "update",
            UserAction::Delete { .. } => "delete",
        }
    }
}

// ── network ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum NetworkAction {
    List {
        node: Option<String>,
        /// Filter by interface type, e.g. `bridge`, `bond`, `vlan`.
        kind: Option<String>,
    },
    Get {
        node: Option<String>,
        iface: String,
    },
    Create {
        node: Option<String>,
        iface: String,
        /// Interface type: `bridge`, `bond`, `vlan`, `eth`.
        kind: String,
        /// Type-specific config, e.g. `{"bridge_ports": "eno1", "cidr": "10.0.0.2/24"}`.
        #[serde(default)]
        config: HashMap<String, Value>,
    },
    Update {
        node: Option<String>,
        iface: String,
        config: HashMap<String, Value>,
    },
    Delete {
        node: Option<String>,
        iface: String,
    },
    /// Apply staged network changes on a node.
    Apply { node: Option<String> },
    /// Discard staged network changes on a node.
    Revert { node: Option<String> },
}

impl NetworkAction {
    pub fn is_mutating(&self) -> bool {
        match self {
            NetworkAction::List { .. } | NetworkAction::Get { .. } => false,
            NetworkAction::Create { .. }
            | NetworkAction::Update { .. }
            | NetworkAction::Delete { .. }
            | NetworkAction::Apply { .. }
            | NetworkAction::Revert { .. } => true,
        }
    }

    pub fn action_name(&self) -> &'static str {
        match self {
            NetworkAction::List { .. } => "list",
            NetworkAction::Get { .. } => "get",
            NetworkAction::Create { .. } => "create",
            NetworkAction::Update { .. } => "update",
            NetworkAction::Delete { .. } => "delete",
            NetworkAction::Apply { .. } => "apply",
            NetworkAction::Revert { .. } => "revert",
        }
    }
}

// ── service ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ServiceAction {
    List { node: Option<String> },
    State {
        node: Option<String>,
        /// Service name, e.g. `pveproxy`, `pvedaemon`, `corosync`.
        service: String,
    },
    Start {
        node: Option<String>,
        service: String,
    },
    Stop {
        node: Option<String>,
        service: String,
    },
    Restart {
        node: Option<String>,
        service: String,
    },
}

impl ServiceAction {
    pub fn is_mutating(&self) -> bool {
        match self {
            ServiceAction::List { .. } | ServiceAction::State { .. } => false,
            ServiceAction::Start { .. }
            | ServiceAction::Stop { .. }
            | ServiceAction::Restart { .. } => true,
        }
    }

    pub fn action_name(&self) -> &'static str {
        match self {
            ServiceAction::List { .. } => "list",
            ServiceAction::State { .. } => "state",
            ServiceAction::Start { .. } => "start",
            ServiceAction::Stop { .. } => "stop",
            ServiceAction::Restart { .. } => "restart",
        }
    }
}

// ── pool ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PoolAction {
    List,
    Get { poolid: String },
    Create {
        poolid: String,
        comment: Option<String>,
    },
    Update {
        poolid: String,
        comment: Option<String>,
        /// VM ids to add to the pool.
        #[serde(default)]
        add_vms: Vec<u32>,
        /// VM ids to remove from the pool.
        #[serde(default)]
        remove_vms: Vec<u32>,
    },
    Delete { poolid: String },
}

impl PoolAction {
    pub fn is_mutating(&self) -> bool {
        match self {
            PoolAction::List | PoolAction::Get { .. } => false,
            PoolAction::Create { .. } | PoolAction::Update { .. } | PoolAction::Delete { .. } => {
                true
            }
        }
    }

    pub fn action_name(&self) -> &'static str {
        match self {
            PoolAction::List => "list",
            PoolAction::Get { .. } => "get",
            PoolAction::Create { .. } => "create",
            PoolAction::Update { .. } => "update",
            PoolAction::Delete { .. } => "delete",
        }
    }
}

// ── Simple command params ───────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Vm,
    Storage,
    Node,
    Sdn,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Vm => "vm",
            ResourceKind::Storage => "storage",
            ResourceKind::Node => "node",
            ResourceKind::Sdn => "sdn",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClusterResourcesParams {
    /// Restrict to one resource kind.
    pub kind: Option<ResourceKind>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NodeStatusParams {
    pub node: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HelpParams {
    /// Category name (e.g. `vm`) or command name (e.g. `snapshot`) for detail.
    pub topic: Option<String>,
}
