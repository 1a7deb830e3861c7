//! Durable storage for the session token.
//!
//! Every backend holds exactly one value in the slot named [`TOKEN_KEY`].
//! There is no expiry logic here; the server decides when a token is dead.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use keyring::Entry;
use tracing::debug;

/// Name of the single slot every backend stores the token under
pub const TOKEN_KEY: &str = "token";

/// Keychain service name
const SERVICE_NAME: &str = "faceaccess";

/// Credentials file name in the data directory
const CREDENTIALS_FILE: &str = "credentials.json";

pub trait CredentialStore: Send + Sync {
    /// Overwrite the slot with `token`.
    fn save(&self, token: &str) -> Result<()>;

    /// The previously saved token, or `None` if nothing is stored.
    fn load(&self) -> Result<Option<String>>;

    /// Remove the slot. Clearing an empty slot is not an error.
    fn clear(&self) -> Result<()>;
}

// ============================================================================
// File backend
// ============================================================================

/// Stores the token as `{"token": "..."}` in a JSON file.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(CREDENTIALS_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_slots(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = std::fs::read_to_string(&self.path)
            .context("Failed to read credentials file")?;
        serde_json::from_str(&contents).context("Failed to parse credentials file")
    }
}

impl CredentialStore for FileCredentialStore {
    fn save(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create data directory")?;
        }
        let mut slots = BTreeMap::new();
        slots.insert(TOKEN_KEY.to_string(), token.to_string());
        let contents = serde_json::to_string_pretty(&slots)?;
        write_private(&self.path, &contents).context("Failed to write credentials file")?;
        debug!(path = ?self.path, "Token saved");
        Ok(())
    }

    fn load(&self) -> Result<Option<String>> {
        let mut slots = self.read_slots()?;
        Ok(slots.remove(TOKEN_KEY).filter(|t| !t.is_empty()))
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).context("Failed to remove credentials file")?;
            debug!(path = ?self.path, "Token cleared");
        }
        Ok(())
    }
}

#[cfg(unix)]
fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents.as_bytes())
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    std::fs::write(path, contents)
}

// ============================================================================
// Keyring backend
// ============================================================================

/// Stores the token in the OS keychain.
pub struct KeyringCredentialStore {
    service: String,
}

impl KeyringCredentialStore {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(&self.service, TOKEN_KEY).context("Failed to create keyring entry")
    }
}

impl Default for KeyringCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn save(&self, token: &str) -> Result<()> {
        self.entry()?
            .set_password(token)
            .context("Failed to store token in keychain")?;

        // Read back through a fresh entry: a store that only keeps values
        // on the handle that wrote them would lose the session on restart.
        match self.entry()?.get_password() {
            Ok(stored) if stored == token => {
                debug!(service = %self.service, "Token saved to keychain");
                Ok(())
            }
            Ok(_) => bail!("Keychain returned a different token after save"),
            Err(e) => Err(e).context("Keychain did not retain the token"),
        }
    }

    fn load(&self) -> Result<Option<String>> {
        match self.entry()?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve token from keychain"),
        }
    }

    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete token from keychain"),
        }
    }
}

// ============================================================================
// In-memory backend
// ============================================================================

/// Process-local store; survives nothing. Used for `--backend memory` runs and tests.
#[derive(Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a token already stored, as if saved by an earlier run
    pub fn seeded(token: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(token.into())),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn save(&self, token: &str) -> Result<()> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(token.to_string());
        Ok(())
    }

    fn load(&self) -> Result<Option<String>> {
        Ok(self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn clear(&self) -> Result<()> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}
