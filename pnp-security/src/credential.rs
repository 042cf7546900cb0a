use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A coarse access tag; `admin` implies `read` and `write` (spec GLOSSARY, §4.F).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Read,
    Write,
    Admin,
}

impl Capability {
    pub fn parse(s: &str) -> Option<Capability> {
        match s {
            "read" => Some(Capability::Read),
            "write" => Some(Capability::Write),
            "admin" => Some(Capability::Admin),
            _ => None,
        }
    }
}

/// A credential with its capability set and per-credential rate budget
/// (spec §3). `secret_hash` is the argon2 hash; the raw secret is returned
/// exactly once at creation and never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub id: String,
    pub name: String,
    #[serde(rename = "hash_of_secret")]
    pub secret_hash: String,
    pub capabilities: HashSet<Capability>,
    pub budget: u32,
    pub active: bool,
    pub description: String,
    pub created: i64,
    pub last_used: Option<i64>,
}

impl Credential {
    /// `admin` implies `read` and `write` (spec §4.F).
    pub fn has_capability(&self, required: Capability) -> bool {
        if self.capabilities.contains(&Capability::Admin) {
            return true;
        }
        self.capabilities.contains(&required)
    }

    /// Public-facing summary used by `GET /api/v1/auth/status` and by
    /// `list()` — never includes `secret_hash`.
    pub fn summary(&self) -> CredentialSummary {
        CredentialSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            capabilities: self.capabilities.iter().copied().collect(),
            budget: self.budget,
            active: self.active,
            description: self.description.clone(),
            created: self.created,
            last_used: self.last_used,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CredentialSummary {
    pub id: String,
    pub name: String,
    pub capabilities: Vec<Capability>,
    pub budget: u32,
    pub active: bool,
    pub description: String,
    pub created: i64,
    pub last_used: Option<i64>,
}
