//! Prefix list identifier resolution.

use crate::config::PrefixSpec;
use crate::provider::PrefixListProvider;
use crate::refresh::RefreshError;

/// Resolve `spec` to a list identifier.
///
/// An explicit identifier is returned as-is without contacting the provider.
/// A name is looked up and only an exact, case-sensitive match is accepted;
/// the provider's filter may return lists that merely share a prefix.
pub async fn resolve_list_id(
    provider: &dyn PrefixListProvider,
    spec: &PrefixSpec,
    region: &str,
) -> Result<String, RefreshError> {
    let name = match spec {
        PrefixSpec::Id(id) => return Ok(id.clone()),
        PrefixSpec::Name(name) => name,
    };

    let candidates = provider
        .describe_lists(name)
        .await
        .map_err(|source| RefreshError::Lookup {
            name: name.clone(),
            source,
        })?;

    let found = candidates
        .into_iter()
        .find(|list| list.name == *name)
        .map(|list| list.id);

    match found {
        Some(id) => {
            tracing::debug!(name = %name, id = %id, "Resolved prefix list");
            Ok(id)
        }
        None => Err(RefreshError::NotFound {
            name: name.clone(),
            region: region.to_string(),
        }),
    }
}
