//! Read-only report of applied and pending migrations.

use crate::engine::Engine;
use crate::error::{EngineError, EngineResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tm_core::MigrationId;
use tm_state::AppliedRecord;

/// State of one known unit
#[derive(Debug, Clone, Serialize)]
pub struct UnitStatus {
    pub id: MigrationId,
    pub origin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub dependencies: Vec<MigrationId>,
    pub applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_at: Option<DateTime<Utc>>,
}

/// Every known unit in identity order, plus applied records that no
/// known unit matches.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub units: Vec<UnitStatus>,
    pub orphaned: Vec<AppliedRecord>,
}

impl StatusReport {
    pub fn applied_count(&self) -> usize {
        self.units.iter().filter(|u| u.applied).count()
    }

    pub fn pending_count(&self) -> usize {
        self.units.len() - self.applied_count()
    }
}

impl Engine {
    /// Report which units are applied. Nothing is planned or executed.
    pub async fn status(&self) -> EngineResult<StatusReport> {
        let units = self.load_units()?;
        let records = self
            .store()
            .list_applied()
            .await
            .map_err(EngineError::StoreUnavailable)?;

        let mut applied: HashMap<&MigrationId, DateTime<Utc>> =
            records.iter().map(|r| (&r.id, r.applied_at)).collect();

        let report_units = units
            .iter()
            .map(|unit| {
                let applied_at = applied.remove(&unit.id);
                UnitStatus {
                    id: unit.id.clone(),
                    origin: unit.origin.to_string(),
                    description: unit.description().map(str::to_string),
                    dependencies: unit.dependencies().to_vec(),
                    applied: applied_at.is_some(),
                    applied_at,
                }
            })
            .collect();

        let orphaned = records
            .iter()
            .filter(|r| applied.contains_key(&r.id))
            .cloned()
            .collect();

        Ok(StatusReport {
            units: report_units,
            orphaned,
        })
    }
}
