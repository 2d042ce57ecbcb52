//! Destination lookup by display name.

use relay_core::{ChannelDirectory, Destination, RelayError, Result};
use tracing::{info, instrument};

/// Enumerates the directory once and returns the first entry whose name equals `name` exactly
/// (case-sensitive). No retry.
///
/// Fails with `LookupFailed` if enumeration errors, `NotFound` if nothing matches.
#[instrument(skip(directory))]
pub async fn resolve_destination(
    directory: &dyn ChannelDirectory,
    name: &str,
) -> Result<Destination> {
    let destinations = directory.list_destinations().await.map_err(|e| match e {
        RelayError::LookupFailed(_) => e,
        other => RelayError::LookupFailed(other.to_string()),
    })?;

    let found = destinations
        .into_iter()
        .find(|d| d.name == name)
        .ok_or_else(|| RelayError::NotFound(name.to_string()))?;

    info!(name = %found.name, id = %found.id, "destination resolved");
    Ok(found)
}
