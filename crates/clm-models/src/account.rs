//! Account addressing.
//!
//! The REST API scopes every resource under the account:
//! `{api_base}/v2/{account}/doclauncherconfigurations`. The account id is
//! the GUID shown in the CLM admin settings and is spliced into request
//! paths as-is, so anything that would change the path (separators, query
//! or fragment markers, whitespace) is rejected when parsing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// CLM account the console's REST calls are scoped to.
///
/// Parsing trims surrounding whitespace, as account ids are usually pasted
/// from the admin console or an `.env` file.
///
/// # Examples
///
/// ```
/// use clm_models::AccountId;
///
/// let id: AccountId = " 4b5e1a0c-8d7f-4c3e-9a21-6f0d2b7e9c14\n".parse().unwrap();
/// assert_eq!(id.as_str(), "4b5e1a0c-8d7f-4c3e-9a21-6f0d2b7e9c14");
///
/// assert!("".parse::<AccountId>().is_err());
/// assert!("acc/../other".parse::<AccountId>().is_err());
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Wrap an id that is already known to be a clean path segment.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as it appears in request paths.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AccountId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.trim();
        let reason = if id.is_empty() {
            Some("must not be empty")
        } else if id.contains(['/', '?', '#', '%']) {
            Some("must not contain '/', '?', '#' or '%'")
        } else if id.chars().any(char::is_whitespace) {
            Some("must not contain whitespace")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(ModelError::InvalidAccountId {
                value: s.to_string(),
                reason,
            }),
            None => Ok(Self(id.to_string())),
        }
    }
}
