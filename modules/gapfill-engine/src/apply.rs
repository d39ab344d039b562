use std::collections::BTreeMap;
use std::path::Path;

use tracing::info;

use gapfill_graph::RelationshipStore;

use crate::export::{read_connections, ExportError};
use crate::persist::{PersistStats, RelationshipPersister};

/// Apply a previously exported batch. File-level problems are returned as
/// errors before any write; per-row failures land in the stats.
pub async fn apply_batch<S>(
    path: &Path,
    persister: &RelationshipPersister<S>,
) -> Result<PersistStats, ExportError>
where
    S: RelationshipStore + ?Sized,
{
    let connections = read_connections(path)?;
    info!(path = %path.display(), rows = connections.len(), "Loaded batch");

    let mut by_pass_type: BTreeMap<&str, usize> = BTreeMap::new();
    for c in &connections {
        *by_pass_type.entry(c.pass_type.as_str()).or_default() += 1;
    }
    for (pass_type, count) in &by_pass_type {
        info!(pass_type, count, "Batch breakdown");
    }

    let stats = persister.persist(&connections).await;
    info!(
        created = stats.created,
        failed = stats.failed,
        total = stats.attempted,
        "Batch applied"
    );
    Ok(stats)
}
