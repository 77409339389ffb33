//! Credential selection
//!
//! Every stage places one access-key pair into its inputs. Which pair is used
//! depends only on the [`Dataset`] the caller asked for.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which dataset a pipeline run targets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
    #[default]
    Primary,
    Alternate,
}

impl From<bool> for Dataset {
    /// Maps the `alternateDataset` flag of the service surface
    fn from(alternate: bool) -> Self {
        if alternate {
            Dataset::Alternate
        } else {
            Dataset::Primary
        }
    }
}

/// An object-store access-key pair
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl CredentialPair {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        }
    }
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// The credential table, one pair per [`Dataset`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub primary: CredentialPair,
    pub alternate: CredentialPair,
}

impl Credentials {
    pub fn new(primary: CredentialPair, alternate: CredentialPair) -> Self {
        Self { primary, alternate }
    }

    /// Returns the pair for a dataset
    pub fn select(&self, dataset: Dataset) -> &CredentialPair {
        match dataset {
            Dataset::Primary => &self.primary,
            Dataset::Alternate => &self.alternate,
        }
    }
}
