use crate::credential::{Capability, Credential, CredentialSummary};
use crate::error::SecurityError;
use crate::persistence::CredentialStorePath;
use crate::rate_window::RateWindow;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use dashmap::DashMap;
use rand::RngCore;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Per-credential mutable state: the credential record plus its sliding
/// rate window, held under one lock so `record_request`/`within_budget`
/// compose into a single atomic critical section (spec §5).
struct Entry {
    credential: Credential,
    window: RateWindow,
}

/// Credentials with capability sets and per-credential rate budgets;
/// opaque-token validation; sliding-window accounting (spec §4.F).
///
/// Presented secrets have the shape `"<id>.<random>"` so validation can look
/// up the credential by id before paying for an argon2 verify.
pub struct CredentialRegistry {
    entries: Arc<DashMap<String, Mutex<Entry>>>,
    store: Option<CredentialStorePath>,
}

impl CredentialRegistry {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            store: None,
        }
    }

    /// Load existing credentials from `path` and persist future mutations
    /// there (spec §6.3).
    pub fn with_persistence(path: impl Into<std::path::PathBuf>) -> Result<Self, SecurityError> {
        let store = CredentialStorePath::new(path);
        let loaded = store.load()?;
        let entries = Arc::new(DashMap::new());
        for (id, credential) in loaded {
            entries.insert(id, Mutex::new(Entry { credential, window: RateWindow::new() }));
        }
        Ok(Self { entries, store: Some(store) })
    }

    fn persist(&self) -> Result<(), SecurityError> {
        let Some(store) = &self.store else { return Ok(()) };
        let snapshot: std::collections::HashMap<_, _> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.value().lock().expect("credential mutex poisoned").credential.clone()))
            .collect();
        store.save(&snapshot)
    }

    /// `secret` is returned exactly once as the caller-presented token; only
    /// its argon2 hash is ever stored (spec §3).
    pub fn create(&self, name: impl Into<String>, capabilities: HashSet<Capability>, budget: u32, description: impl Into<String>) -> Result<(String, String), SecurityError> {
        let id = uuid::Uuid::new_v4().to_string();
        let mut random_bytes = [0u8; 24];
        rand::thread_rng().fill_bytes(&mut random_bytes);
        let raw_secret = hex_encode(&random_bytes);

        let salt = SaltString::generate(&mut OsRng);
        let secret_hash = Argon2::default()
            .hash_password(raw_secret.as_bytes(), &salt)
            .map_err(|e| SecurityError::Persistence(e.to_string()))?
            .to_string();

        let credential = Credential {
            id: id.clone(),
            name: name.into(),
            secret_hash,
            capabilities,
            budget,
            active: true,
            description: description.into(),
            created: now_unix(),
            last_used: None,
        };
        self.entries.insert(id.clone(), Mutex::new(Entry { credential, window: RateWindow::new() }));
        self.persist()?;

        let presented = format!("{id}.{raw_secret}");
        Ok((id, presented))
    }

    /// `None` if unknown, disabled, or hash mismatch (spec §4.F). Updates
    /// `last_used` on success.
    pub fn validate(&self, presented_secret: &str) -> Option<Credential> {
        let (id, raw_secret) = presented_secret.split_once('.')?;
        let entry_ref = self.entries.get(id)?;
        let mut entry = entry_ref.lock().expect("credential mutex poisoned");
        if !entry.credential.active {
            return None;
        }
        let parsed = PasswordHash::new(&entry.credential.secret_hash).ok()?;
        if Argon2::default().verify_password(raw_secret.as_bytes(), &parsed).is_err() {
            return None;
        }
        entry.credential.last_used = Some(now_unix());
        Some(entry.credential.clone())
    }

    pub fn check_capability(&self, credential: &Credential, required: Capability) -> bool {
        credential.has_capability(required)
    }

    /// Combines `record_request` and `within_budget` into one atomic
    /// reservation, as spec §5 requires ("callers invoke both under the same
    /// critical section"). Returns `Ok(())` if accepted, or the retry delay
    /// if rate-limited.
    pub fn reserve_or_reject(&self, credential_id: &str) -> Result<(), Duration> {
        let Some(entry_ref) = self.entries.get(credential_id) else {
            return Ok(());
        };
        let mut entry = entry_ref.lock().expect("credential mutex poisoned");
        let budget = entry.credential.budget;
        entry.window.try_reserve(budget, Instant::now())
    }

    pub fn remaining(&self, credential_id: &str) -> u32 {
        let Some(entry_ref) = self.entries.get(credential_id) else { return 0 };
        let mut entry = entry_ref.lock().expect("credential mutex poisoned");
        let budget = entry.credential.budget;
        entry.window.remaining(budget)
    }

    pub fn reset_at(&self, credential_id: &str) -> Option<Instant> {
        let entry_ref = self.entries.get(credential_id)?;
        let mut entry = entry_ref.lock().expect("credential mutex poisoned");
        entry.window.reset_at()
    }

    pub fn get(&self, id: &str) -> Option<CredentialSummary> {
        self.entries.get(id).map(|e| e.lock().expect("credential mutex poisoned").credential.summary())
    }

    pub fn list(&self) -> Vec<CredentialSummary> {
        self.entries.iter().map(|e| e.value().lock().expect("credential mutex poisoned").credential.summary()).collect()
    }

    pub fn update(
        &self,
        id: &str,
        name: Option<String>,
        capabilities: Option<HashSet<Capability>>,
        budget: Option<u32>,
        description: Option<String>,
        active: Option<bool>,
    ) -> Result<CredentialSummary, SecurityError> {
        let entry_ref = self.entries.get(id).ok_or_else(|| SecurityError::KeyNotFound(id.to_string()))?;
        let summary = {
            let mut entry = entry_ref.lock().expect("credential mutex poisoned");
            if let Some(name) = name {
                entry.credential.name = name;
            }
            if let Some(capabilities) = capabilities {
                entry.credential.capabilities = capabilities;
            }
            if let Some(budget) = budget {
                entry.credential.budget = budget;
            }
            if let Some(description) = description {
                entry.credential.description = description;
            }
            if let Some(active) = active {
                entry.credential.active = active;
            }
            entry.credential.summary()
        };
        self.persist()?;
        Ok(summary)
    }

    pub fn delete(&self, id: &str) -> Result<(), SecurityError> {
        self.entries.remove(id).ok_or_else(|| SecurityError::KeyNotFound(id.to_string()))?;
        self.persist()
    }
}

impl Default for CredentialRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_write() -> HashSet<Capability> {
        HashSet::from([Capability::Read, Capability::Write])
    }

    #[test]
    fn create_then_validate_round_trips() {
        let registry = CredentialRegistry::new();
        let (id, secret) = registry.create("bot", read_write(), 10, "").unwrap();
        let credential = registry.validate(&secret).expect("valid secret");
        assert_eq!(credential.id, id);
    }

    #[test]
    fn wrong_secret_does_not_validate() {
        let registry = CredentialRegistry::new();
        let (id, _secret) = registry.create("bot", read_write(), 10, "").unwrap();
        assert!(registry.validate(&format!("{id}.wrongsecret")).is_none());
    }

    #[test]
    fn disabled_credential_never_authenticates() {
        let registry = CredentialRegistry::new();
        let (id, secret) = registry.create("bot", read_write(), 10, "").unwrap();
        registry.update(&id, None, None, None, None, Some(false)).unwrap();
        assert!(registry.validate(&secret).is_none());
    }

    #[test]
    fn admin_capability_implies_read_and_write() {
        let registry = CredentialRegistry::new();
        let (_id, secret) = registry.create("root", HashSet::from([Capability::Admin]), 10, "").unwrap();
        let credential = registry.validate(&secret).unwrap();
        assert!(registry.check_capability(&credential, Capability::Read));
        assert!(registry.check_capability(&credential, Capability::Write));
    }

    #[test]
    fn budget_of_b_accepts_b_requests_then_rejects() {
        let registry = CredentialRegistry::new();
        let (id, _secret) = registry.create("bot", read_write(), 3, "").unwrap();
        for _ in 0..3 {
            assert!(registry.reserve_or_reject(&id).is_ok());
        }
        assert!(registry.reserve_or_reject(&id).is_err());
    }

    #[test]
    fn unknown_id_update_returns_key_not_found() {
        let registry = CredentialRegistry::new();
        assert!(matches!(registry.update("missing", None, None, None, None, None), Err(SecurityError::KeyNotFound(_))));
    }
}
