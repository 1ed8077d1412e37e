//! In-process policy store

use async_trait::async_trait;
use log::debug;
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::{check_etag, PolicyStore, StoreResult};
use crate::types::Policy;

#[derive(Debug, Default)]
struct State {
    policies: HashMap<String, Policy>,
    revision: u64,
    writes: u64,
}

impl State {
    fn next_etag(&mut self) -> String {
        self.revision += 1;
        format!("rev-{}", self.revision)
    }
}

/// Store that keeps policies in memory and mints `rev-<n>` etags
#[derive(Debug, Default)]
pub struct InMemoryPolicyStore {
    state: Mutex<State>,
}

impl InMemoryPolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `policy` unconditionally and return it with its minted etag
    pub async fn seed(&self, resource: &str, policy: Policy) -> Policy {
        let mut state = self.state.lock().await;
        let stored = policy.with_etag(state.next_etag());
        state.policies.insert(resource.to_string(), stored.clone());
        stored
    }

    /// Successful conditional writes so far
    pub async fn write_count(&self) -> u64 {
        self.state.lock().await.writes
    }
}

#[async_trait]
impl PolicyStore for InMemoryPolicyStore {
    async fn get_policy(&self, resource: &str) -> StoreResult<Policy> {
        let state = self.state.lock().await;
        Ok(state.policies.get(resource).cloned().unwrap_or_default())
    }

    async fn set_policy(&self, resource: &str, policy: &Policy) -> StoreResult<Policy> {
        let mut state = self.state.lock().await;
        let stored_etag = state
            .policies
            .get(resource)
            .map(|p| p.etag.as_str())
            .unwrap_or_default();
        check_etag(stored_etag, &policy.etag)?;

        let stored = policy.clone().with_etag(state.next_etag());
        debug!("Stored policy for {} at {}", resource, stored.etag);
        state.policies.insert(resource.to_string(), stored.clone());
        state.writes += 1;
        Ok(stored)
    }
}
