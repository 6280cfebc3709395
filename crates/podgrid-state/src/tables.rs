//! redb table definitions for the podgrid state store.
//!
//! Each table uses `&str` keys and `&[u8]` values (JSON-serialized domain types).

use redb::TableDefinition;

/// Stored configuration snapshots keyed by version id (UUID string).
pub const CONFIGURATIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("configurations");

/// Singleton properties such as the target configuration pointer.
pub const PROPERTIES: TableDefinition<&str, &[u8]> = TableDefinition::new("properties");

/// Launched task records keyed by task instance name.
pub const TASKS: TableDefinition<&str, &[u8]> = TableDefinition::new("tasks");

/// Latest task status keyed by task instance name.
pub const TASK_STATUSES: TableDefinition<&str, &[u8]> = TableDefinition::new("task_statuses");

/// Key of the target configuration pointer in `PROPERTIES`.
pub const TARGET_CONFIG_KEY: &str = "target_config";
