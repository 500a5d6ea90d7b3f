//! Startup check that the store serves every record kind

use crate::error::{DaemonError, DaemonResult};
use mcp_store::WatchSource;
use mcp_types::RecordKind;
use tracing::{error, info};

/// Fail unless every kind in `required` is registered with the store
pub fn check_kinds<S>(store: &S, required: &[RecordKind]) -> DaemonResult<()>
where
    S: WatchSource + ?Sized,
{
    let registered = store.registered_kinds();
    let missing: Vec<RecordKind> = required
        .iter()
        .copied()
        .filter(|kind| !registered.contains(kind))
        .collect();

    if missing.is_empty() {
        info!(kinds = required.len(), "Record kinds installed");
        Ok(())
    } else {
        error!(missing = ?missing, "Record kinds not installed");
        Err(DaemonError::KindsMissing(missing))
    }
}
