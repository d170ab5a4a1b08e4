//! Paged entry retrieval.
//!
//! # Responsibilities
//! - Walk every page of every resolved list
//! - Parse entry text into prefixes, skipping malformed entries
//! - Deduplicate across pages and lists, keeping first-seen order

use ipnetwork::IpNetwork;
use std::collections::HashSet;

use crate::observability::metrics;
use crate::provider::PrefixListProvider;
use crate::refresh::RefreshError;

/// Page size requested from the provider.
pub const MAX_RESULTS_PER_PAGE: u32 = 100;

/// Parse one entry as `address/length`.
///
/// The length must be plain decimal without leading zeros; bare addresses and
/// netmask notation (`10.0.0.0/255.0.0.0`) are rejected.
pub fn parse_prefix(text: &str) -> Option<IpNetwork> {
    let (_, length) = text.split_once('/')?;
    let canonical_length = !length.is_empty()
        && length.len() <= 3
        && length.bytes().all(|b| b.is_ascii_digit())
        && (length.len() == 1 || !length.starts_with('0'));
    if !canonical_length {
        return None;
    }
    text.parse().ok()
}

/// Fetch and merge the entries of every list in `list_ids`, in order.
///
/// Any provider error aborts the whole fetch; partial results are discarded.
pub async fn fetch_all(
    provider: &dyn PrefixListProvider,
    list_ids: &[String],
) -> Result<Vec<IpNetwork>, RefreshError> {
    let mut seen = HashSet::new();
    let mut prefixes = Vec::new();
    let mut malformed = 0usize;

    for list_id in list_ids {
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = provider
                .get_list_entries(list_id, page_token.as_deref(), MAX_RESULTS_PER_PAGE)
                .await
                .map_err(|source| RefreshError::Fetch {
                    list_id: list_id.clone(),
                    source,
                })?;
            pages += 1;

            for cidr in page.entries.iter().filter_map(|entry| entry.cidr.as_deref()) {
                match parse_prefix(cidr) {
                    Some(prefix) => {
                        if seen.insert(prefix.to_string()) {
                            prefixes.push(prefix);
                        }
                    }
                    None => {
                        malformed += 1;
                        tracing::debug!(list_id = %list_id, entry = %cidr, "Skipping malformed entry");
                    }
                }
            }

            match page.next_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        tracing::debug!(list_id = %list_id, pages, "Fetched prefix list entries");
    }

    metrics::record_malformed_entries(malformed);
    Ok(prefixes)
}
