//! Account identities and their canonical textual form.
//!
//! AccountId: numeric account number, always present
//! Identity: resolved (or unresolved) account record attached to votes and submissions

use std::fmt;

use serde::{Deserialize, Serialize};

/// Numeric account identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(u32);

impl AccountId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.0)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An account as seen by a note.
///
/// `full_name` and `preferred_email` are both absent when the account record
/// was purged or could not be resolved; only the numeric id survives.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: AccountId,
    #[serde(default, rename = "name", skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, rename = "email", skip_serializing_if = "Option::is_none")]
    pub preferred_email: Option<String>,
}

impl Identity {
    pub fn new(
        id: AccountId,
        full_name: Option<String>,
        preferred_email: Option<String>,
    ) -> Self {
        Self {
            id,
            full_name,
            preferred_email,
        }
    }

    /// Identity for an account whose record is missing.
    pub fn unresolved(id: AccountId) -> Self {
        Self {
            id,
            full_name: None,
            preferred_email: None,
        }
    }

    /// Render this identity, falling back to `"<anonymous> #<id>"`.
    pub fn display<'a>(&'a self, anonymous: &'a str) -> IdentityDisplay<'a> {
        IdentityDisplay {
            identity: self,
            anonymous,
        }
    }
}

/// `Display` adapter produced by [`Identity::display`].
pub struct IdentityDisplay<'a> {
    identity: &'a Identity,
    anonymous: &'a str,
}

impl fmt::Display for IdentityDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = non_empty(self.identity.full_name.as_deref());
        let email = non_empty(self.identity.preferred_email.as_deref());

        match (name, email) {
            (Some(name), Some(email)) => write!(f, "{name} <{email}>"),
            (Some(name), None) => f.write_str(name),
            (None, Some(email)) => write!(f, "<{email}>"),
            (None, None) => write!(f, "{} #{}", self.anonymous, self.identity.id),
        }
    }
}

/// Canonical text for `identity`; never empty.
pub fn format_identity(identity: &Identity, anonymous: &str) -> String {
    identity.display(anonymous).to_string()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
