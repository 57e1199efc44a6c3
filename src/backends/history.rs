//! Historical version reconstruction.
//!
//! Two strategies exist. MVCC stores (etcd) keep no history listing, so
//! previous versions are recovered by walking revisions backwards from the
//! latest record. HTTP config centers (Nacos) have a native history endpoint
//! whose rows map one to one.

use crate::domain::HistoryVersion;
use crate::errors::Result;
use std::future::Future;

/// Maximum versions considered per walk, counting the latest one.
pub const HISTORY_LIMIT: usize = 10;

/// Revision metadata of one MVCC record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevisionMeta {
    pub version: i64,
    pub mod_revision: i64,
    pub create_revision: i64,
}

/// Walk backwards from `latest`, fetching the record visible at each
/// preceding revision.
///
/// Stops at the iteration cap, when the version counter reaches zero, or when
/// the walk would cross the key's create revision. Entries are most recent
/// first and never older than `latest.create_revision`.
pub async fn revision_walk<F, Fut>(latest: RevisionMeta, mut fetch_at: F) -> Result<Vec<HistoryVersion>>
where
    F: FnMut(i64) -> Fut,
    Fut: Future<Output = Result<RevisionMeta>>,
{
    let mut versions = Vec::new();
    let mut version = latest.version - 1;
    let mut last_revision = latest.mod_revision - 1;

    while versions.len() < HISTORY_LIMIT - 1
        && version > 0
        && last_revision >= latest.create_revision
    {
        let record = fetch_at(last_revision).await?;
        versions.push(HistoryVersion {
            revision: record.mod_revision.to_string(),
            version: version.to_string(),
            last_update_time: String::new(),
        });
        version -= 1;
        last_revision = record.mod_revision - 1;
    }

    Ok(versions)
}

/// Map native history rows, keeping the backend's order.
pub fn direct_query<T: Into<HistoryVersion>>(rows: Vec<T>) -> Vec<HistoryVersion> {
    rows.into_iter().map(Into::into).collect()
}
