//! # Backup and restore reconciliation
//!
//! Two one-directional passes between a config backend and the mirror store,
//! both scoped to a tenant/project[/environment]:
//!
//! - backend to mirror (backup): insert items missing from the mirror and
//!   update the ones whose content differs; never deletes mirror records.
//! - mirror to backend (restore): publish every non-empty mirror value the
//!   backend does not already hold.
//!
//! Passes stop at the first error. Writes applied before it stay in place,
//! and re-running a pass is always safe.

use crate::backends::ConfigBackend;
use crate::domain::{ConfigItem, ListOptions, Scope};
use crate::errors::Result;
use crate::observability::MetricsRecorder;
use crate::storage::MirrorStore;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, Instrument, Span};

/// Page size used while reading a whole scope from a backend.
pub const SYNC_PAGE_SIZE: i64 = 500;

/// User recorded on mirror writes made by a backup pass.
pub const SYNC_ACTOR: &str = "syncer_service";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    BackendToMirror,
    MirrorToBackend,
}

impl SyncDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BackendToMirror => "backend_to_mirror",
            Self::MirrorToBackend => "mirror_to_backend",
        }
    }
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of one pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub direction: SyncDirection,
    /// Items read from the source side
    pub scanned: usize,
    /// Inserts, updates or publishes applied to the target side
    pub written: usize,
    /// Items already in sync, or empty mirror values
    pub skipped: usize,
}

impl SyncReport {
    fn new(direction: SyncDirection) -> Self {
        Self { direction, scanned: 0, written: 0, skipped: 0 }
    }

    fn finish(self) -> Self {
        Span::current().record("writes", self.written);
        MetricsRecorder::new().record_sync_writes(self.direction.as_str(), self.written as u64);
        info!(
            direction = %self.direction,
            scanned = self.scanned,
            written = self.written,
            skipped = self.skipped,
            "Sync pass finished"
        );
        self
    }
}

/// Every backend item under `scope`, read page by page until a short page.
pub async fn list_scope(backend: &dyn ConfigBackend, scope: &Scope) -> Result<Vec<ConfigItem>> {
    let mut items = Vec::new();
    let mut page = 1;
    loop {
        let batch = backend.list(&ListOptions::new(scope.to_item(), page, SYNC_PAGE_SIZE)).await?;
        let exhausted = (batch.len() as i64) < SYNC_PAGE_SIZE;
        items.extend(batch.into_iter().filter(|item| scope.contains(item)));
        if exhausted {
            return Ok(items);
        }
        page += 1;
    }
}

/// Backup: copy backend content into the mirror.
///
/// Backends that do not store the application tag (etcd) report it empty;
/// the mirror keeps its own tag in that case instead of being cleared.
pub async fn sync_backend_to_mirror(
    scope: &Scope,
    backend: &dyn ConfigBackend,
    mirror: &dyn MirrorStore,
) -> Result<SyncReport> {
    let direction = SyncDirection::BackendToMirror;
    let span = crate::sync_span!(direction, scope, backend = %backend.kind());

    async move {
        let mut report = SyncReport::new(direction);
        for mut item in list_scope(backend, scope).await? {
            report.scanned += 1;
            match mirror.find(&item).await? {
                None => {
                    mirror.upsert(&item, SYNC_ACTOR).await?;
                    debug!(item = %item, "Inserted mirror record");
                    report.written += 1;
                }
                Some(existing) => {
                    if item.application.is_empty() {
                        item.application = existing.application.clone();
                    }
                    if existing.differs_from(&item) {
                        mirror.upsert(&item, SYNC_ACTOR).await?;
                        debug!(item = %item, "Updated mirror record");
                        report.written += 1;
                    } else {
                        report.skipped += 1;
                    }
                }
            }
        }
        Ok(report.finish())
    }
    .instrument(span)
    .await
}

/// Restore: publish mirror values the backend is missing or holds differently.
///
/// Mirror records with an empty value carry metadata only and are skipped.
pub async fn sync_mirror_to_backend(
    scope: &Scope,
    mirror: &dyn MirrorStore,
    backend: &dyn ConfigBackend,
) -> Result<SyncReport> {
    let direction = SyncDirection::MirrorToBackend;
    let span = crate::sync_span!(direction, scope, backend = %backend.kind());

    async move {
        let records = mirror.find_all(scope).await?;
        let current: HashMap<(String, String), String> = list_scope(backend, scope)
            .await?
            .into_iter()
            .map(|item| ((item.environment, item.key), item.value))
            .collect();

        let mut report = SyncReport::new(direction);
        for record in records {
            report.scanned += 1;
            if record.value.is_empty() {
                report.skipped += 1;
                continue;
            }
            let identity = (record.environment.clone(), record.key.clone());
            if current.get(&identity) == Some(&record.value) {
                report.skipped += 1;
                continue;
            }
            let item = record.to_item();
            backend.publish(&item).await?;
            debug!(item = %item, "Restored item to backend");
            report.written += 1;
        }
        Ok(report.finish())
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_labels() {
        assert_eq!(SyncDirection::BackendToMirror.to_string(), "backend_to_mirror");
        assert_eq!(
            serde_json::to_value(SyncDirection::MirrorToBackend).unwrap(),
            serde_json::json!("mirror_to_backend")
        );
    }
}
