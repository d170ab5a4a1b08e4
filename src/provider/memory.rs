//! In-memory provider.
//!
//! Serves prefix lists from explicitly paged data held in memory. Name lookups
//! use prefix matching, like the EC2 `prefix-list-name` filter, so exact-match
//! handling in the resolver is exercised. Call counters and failure injection
//! make it the test double for the whole refresh engine.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::provider::{
    AuthError, CredentialRequest, CredentialResolver, EntryPage, ListSummary, PrefixEntry,
    PrefixListProvider, ProviderError,
};

#[derive(Debug, Clone)]
struct StaticList {
    id: String,
    name: String,
    pages: Vec<Vec<Option<String>>>,
}

/// Prefix lists served from memory.
#[derive(Debug, Default)]
pub struct StaticProvider {
    lists: Mutex<Vec<StaticList>>,
    describe_failure: Mutex<Option<ProviderError>>,
    describe_failures_by_name: Mutex<HashMap<String, ProviderError>>,
    entries_failure: Mutex<Option<ProviderError>>,
    entries_delay: Mutex<Option<Duration>>,
    empty_final_token: AtomicBool,
    describe_calls: AtomicUsize,
    entry_calls: AtomicUsize,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a list whose entries are served as the given pages, in order.
    pub fn with_list(self, id: &str, name: &str, pages: Vec<Vec<&str>>) -> Self {
        self.add_list(id, name, pages);
        self
    }

    /// Add (or replace) a list on a shared provider.
    pub fn add_list(&self, id: &str, name: &str, pages: Vec<Vec<&str>>) {
        self.put_list(id, name, to_pages(pages));
    }

    /// Add a list containing entries with no range text at all.
    pub fn with_raw_list(self, id: &str, name: &str, pages: Vec<Vec<Option<&str>>>) -> Self {
        let pages = pages
            .into_iter()
            .map(|page| page.into_iter().map(|e| e.map(str::to_owned)).collect())
            .collect();
        self.put_list(id, name, pages);
        self
    }

    /// Replace the pages served for `id`. Unknown ids are ignored.
    pub fn set_pages(&self, id: &str, pages: Vec<Vec<&str>>) {
        let mut lists = self.lists.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(list) = lists.iter_mut().find(|list| list.id == id) {
            list.pages = to_pages(pages);
        }
    }

    /// Remove the list with identifier `id`.
    pub fn remove_list(&self, id: &str) {
        let mut lists = self.lists.lock().unwrap_or_else(PoisonError::into_inner);
        lists.retain(|list| list.id != id);
    }

    /// Make every `describe_lists` call fail until cleared with `None`.
    pub fn fail_describe(&self, error: Option<ProviderError>) {
        *self.describe_failure.lock().unwrap_or_else(PoisonError::into_inner) = error;
    }

    /// Make `describe_lists` fail only when called with exactly `name_filter`.
    pub fn fail_describe_for(&self, name_filter: &str, error: Option<ProviderError>) {
        let mut failures = self
            .describe_failures_by_name
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match error {
            Some(error) => failures.insert(name_filter.to_string(), error),
            None => failures.remove(name_filter),
        };
    }

    /// Make every `get_list_entries` call fail until cleared with `None`.
    pub fn fail_entries(&self, error: Option<ProviderError>) {
        *self.entries_failure.lock().unwrap_or_else(PoisonError::into_inner) = error;
    }

    /// Sleep this long inside every `get_list_entries` call.
    pub fn set_entries_delay(&self, delay: Option<Duration>) {
        *self.entries_delay.lock().unwrap_or_else(PoisonError::into_inner) = delay;
    }

    /// Signal the last page with `Some("")` instead of `None`.
    pub fn terminate_with_empty_token(&self, enabled: bool) {
        self.empty_final_token.store(enabled, Ordering::SeqCst);
    }

    pub fn describe_calls(&self) -> usize {
        self.describe_calls.load(Ordering::SeqCst)
    }

    pub fn entry_calls(&self) -> usize {
        self.entry_calls.load(Ordering::SeqCst)
    }

    fn put_list(&self, id: &str, name: &str, pages: Vec<Vec<Option<String>>>) {
        let mut lists = self.lists.lock().unwrap_or_else(PoisonError::into_inner);
        lists.retain(|list| list.id != id);
        lists.push(StaticList {
            id: id.to_string(),
            name: name.to_string(),
            pages,
        });
    }
}

fn to_pages(pages: Vec<Vec<&str>>) -> Vec<Vec<Option<String>>> {
    pages
        .into_iter()
        .map(|page| page.into_iter().map(|cidr| Some(cidr.to_string())).collect())
        .collect()
}

#[async_trait]
impl PrefixListProvider for StaticProvider {
    async fn describe_lists(&self, name_filter: &str) -> Result<Vec<ListSummary>, ProviderError> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = self.describe_failure.lock().unwrap_or_else(PoisonError::into_inner).clone() {
            return Err(error);
        }

        if let Some(error) = self
            .describe_failures_by_name
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name_filter)
            .cloned()
        {
            return Err(error);
        }

        let lists = self.lists.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(lists
            .iter()
            .filter(|list| list.name.starts_with(name_filter))
            .map(|list| ListSummary {
                id: list.id.clone(),
                name: list.name.clone(),
            })
            .collect())
    }

    async fn get_list_entries(
        &self,
        list_id: &str,
        page_token: Option<&str>,
        _max_results: u32,
    ) -> Result<EntryPage, ProviderError> {
        self.entry_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.entries_delay.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.entries_failure.lock().unwrap_or_else(PoisonError::into_inner).clone() {
            return Err(error);
        }

        let index = match page_token {
            None => 0,
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| ProviderError::Service(format!("invalid next token {token:?}")))?,
        };

        let lists = self.lists.lock().unwrap_or_else(PoisonError::into_inner);
        let list = lists
            .iter()
            .find(|list| list.id == list_id)
            .ok_or_else(|| ProviderError::Service(format!("prefix list {list_id} does not exist")))?;

        let entries = list
            .pages
            .get(index)
            .map(|page| page.iter().map(|cidr| PrefixEntry { cidr: cidr.clone() }).collect())
            .unwrap_or_default();

        let next_token = if index + 1 < list.pages.len() {
            Some((index + 1).to_string())
        } else if self.empty_final_token.load(Ordering::SeqCst) {
            Some(String::new())
        } else {
            None
        };

        Ok(EntryPage { entries, next_token })
    }
}

/// Credential resolver that always hands out the same [`StaticProvider`].
#[derive(Debug)]
pub struct StaticCredentials {
    provider: Arc<StaticProvider>,
    failure: Mutex<Option<AuthError>>,
    requests: Mutex<Vec<CredentialRequest>>,
}

impl StaticCredentials {
    pub fn new(provider: Arc<StaticProvider>) -> Self {
        Self {
            provider,
            failure: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Make every `resolve` call fail until cleared with `None`.
    pub fn fail_with(&self, error: Option<AuthError>) {
        *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = error;
    }

    /// Requests seen so far, oldest first.
    pub fn requests(&self) -> Vec<CredentialRequest> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl CredentialResolver for StaticCredentials {
    async fn resolve(
        &self,
        request: &CredentialRequest,
    ) -> Result<Arc<dyn PrefixListProvider>, AuthError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        if let Some(error) = self.failure.lock().unwrap_or_else(PoisonError::into_inner).clone() {
            return Err(error);
        }
        Ok(self.provider.clone())
    }
}
