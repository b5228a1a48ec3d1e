//! Record service over the PostgREST store.
//!
//! Thin layer on [`StoreClient`]: validates create/update payloads,
//! turns "no row matched" into [`CoreError::NotFound`], and logs writes.

use tracing::{debug, info};

use sentinel_api::StoreClient;
use sentinel_api::store::{
    NewSystemLog, NewThreat, RecordId, Soldier, SoldierFields, SystemLog, Threat,
};

use crate::error::CoreError;

#[derive(Debug, Clone)]
pub struct RecordService {
    store: StoreClient,
}

impl RecordService {
    pub fn new(store: StoreClient) -> Self {
        Self { store }
    }

    // ── Soldiers ─────────────────────────────────────────────────────

    pub async fn soldiers(&self) -> Result<Vec<Soldier>, CoreError> {
        let rows = self.store.list_soldiers().await?;
        debug!(count = rows.len(), "listed soldiers");
        Ok(rows)
    }

    pub async fn add_soldier(&self, fields: &SoldierFields) -> Result<Soldier, CoreError> {
        validate_soldier(fields)?;
        let soldier = self.store.create_soldier(fields).await?;
        info!(id = %soldier.id, name = %soldier.name, "soldier created");
        Ok(soldier)
    }

    pub async fn update_soldier(
        &self,
        id: &RecordId,
        fields: &SoldierFields,
    ) -> Result<Soldier, CoreError> {
        validate_soldier(fields)?;
        let soldier = self
            .store
            .update_soldier(id, fields)
            .await
            .map_err(|e| not_found_or(e, "Soldier", id))?;
        info!(%id, "soldier updated");
        Ok(soldier)
    }

    pub async fn remove_soldier(&self, id: &RecordId) -> Result<(), CoreError> {
        self.store
            .delete_soldier(id)
            .await
            .map_err(|e| not_found_or(e, "Soldier", id))?;
        info!(%id, "soldier deleted");
        Ok(())
    }

    // ── System logs ──────────────────────────────────────────────────

    pub async fn system_logs(&self) -> Result<Vec<SystemLog>, CoreError> {
        Ok(self.store.list_system_logs().await?)
    }

    pub async fn add_system_log(&self, entry: &NewSystemLog) -> Result<SystemLog, CoreError> {
        require("message", &entry.message)?;
        require("level", &entry.level)?;
        Ok(self.store.create_system_log(entry).await?)
    }

    // ── Threats ──────────────────────────────────────────────────────

    pub async fn threats(&self) -> Result<Vec<Threat>, CoreError> {
        Ok(self.store.list_threats().await?)
    }

    pub async fn add_threat(&self, threat: &NewThreat) -> Result<Threat, CoreError> {
        require("level", &threat.level)?;
        let created = self.store.create_threat(threat).await?;
        info!(id = %created.id, level = %created.level, "threat recorded");
        Ok(created)
    }
}

fn validate_soldier(fields: &SoldierFields) -> Result<(), CoreError> {
    require("name", &fields.name)?;
    require("rank", &fields.rank)
}

fn require(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::Validation {
            message: format!("{field} must not be empty"),
        });
    }
    Ok(())
}

fn not_found_or(err: sentinel_api::Error, entity: &str, id: &RecordId) -> CoreError {
    if err.is_not_found() {
        CoreError::not_found(entity, id)
    } else {
        err.into()
    }
}
