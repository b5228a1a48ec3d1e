//! PostgREST client for the dashboard's record tables.

pub mod client;
pub mod types;

pub use client::{LOG_LIST_LIMIT, SOLDIER_LIST_LIMIT, StoreClient, THREAT_LIST_LIMIT};
pub use types::{
    DEFAULT_LOG_LEVEL, NewSystemLog, NewThreat, RecordId, Soldier, SoldierFields, SystemLog, Threat,
};
