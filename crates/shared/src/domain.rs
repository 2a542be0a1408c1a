use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Number of UUID hex characters appended to the store prefix.
const STORE_TOKEN_LEN: usize = 6;
/// Longest name a namespace may carry.
const MAX_STORE_ID_LEN: usize = 63;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{0}' is not a valid store id")]
pub struct InvalidStoreId(pub String);

/// Identifier of a store. Doubles as the namespace name and the release name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreId(pub String);

impl StoreId {
    /// Generates `{prefix}{token}` where the token is a short random hex string.
    pub fn generate(prefix: &str) -> Self {
        let token = Uuid::new_v4().simple().to_string();
        Self(format!("{prefix}{}", &token[..STORE_TOKEN_LEN]))
    }

    /// Accepts ids that can name a namespace: lowercase alphanumerics and
    /// `-`, starting and ending with an alphanumeric.
    pub fn parse(raw: &str) -> Result<Self, InvalidStoreId> {
        let valid_char = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();
        let valid = !raw.is_empty()
            && raw.len() <= MAX_STORE_ID_LEN
            && raw.chars().all(|c| valid_char(c) || c == '-')
            && raw.starts_with(valid_char)
            && raw.ends_with(valid_char);
        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(InvalidStoreId(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StoreId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoreState {
    Provisioning,
    Ready,
    Failed,
    Deleting,
}

impl StoreState {
    /// Whether the lifecycle allows moving from `self` to `next`.
    ///
    /// Removal from the registry is not a state; it is only reachable from
    /// `Deleting` and is enforced by the registry itself.
    pub fn can_transition_to(self, next: StoreState) -> bool {
        use StoreState::*;
        matches!(
            (self, next),
            (Provisioning, Ready)
                | (Provisioning, Failed)
                | (Provisioning, Deleting)
                | (Ready, Deleting)
                | (Failed, Deleting)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StoreState::Provisioning => "Provisioning",
            StoreState::Ready => "Ready",
            StoreState::Failed => "Failed",
            StoreState::Deleting => "Deleting",
        }
    }
}

impl fmt::Display for StoreState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreRecord {
    pub id: StoreId,
    pub state: StoreState,
    pub endpoint: String,
    pub created_at: DateTime<Utc>,
}

impl StoreRecord {
    /// A fresh record in `Provisioning` with its endpoint derived from `id`.
    pub fn provisioning(id: StoreId, store_domain: &str, created_at: DateTime<Utc>) -> Self {
        let endpoint = endpoint_for_store(&id, store_domain);
        Self {
            id,
            state: StoreState::Provisioning,
            endpoint,
            created_at,
        }
    }
}

pub fn endpoint_for_store(id: &StoreId, store_domain: &str) -> String {
    format!("http://{}.{}", id.0, store_domain)
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
