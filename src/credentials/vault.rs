use keyring::Entry;

use super::{BackendKind, Credential, CredentialBackend};
use crate::error::{FacadeError, Result};

pub const SERVICE_NAME: &str = "dm-facade";
const REG_CODE_USER: &str = "reg_code";
const VER_INFO_USER: &str = "ver_info";

/// Credential held in the OS credential vault (Windows Credential Manager,
/// macOS Keychain or the Linux kernel keyring), one entry per field.
pub struct VaultBackend {
    entries: std::result::Result<VaultEntries, String>,
}

struct VaultEntries {
    reg_code: Entry,
    ver_info: Entry,
}

impl VaultBackend {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    pub fn with_service(service: &str) -> Self {
        let entries = Entry::new(service, REG_CODE_USER)
            .and_then(|reg_code| {
                Entry::new(service, VER_INFO_USER).map(|ver_info| VaultEntries { reg_code, ver_info })
            })
            .map_err(|e| e.to_string());
        if let Err(e) = &entries {
            tracing::debug!("Vault entries for {} unavailable: {}", service, e);
        }
        Self { entries }
    }

    /// Backend over entries the caller already built, e.g. with
    /// [`Entry::new_with_credential`].
    pub fn with_entries(reg_code: Entry, ver_info: Entry) -> Self {
        Self {
            entries: Ok(VaultEntries { reg_code, ver_info }),
        }
    }

    fn entry(&self, user: &str) -> Result<&Entry> {
        let entries = self.entries.as_ref().map_err(|e| {
            FacadeError::storage(BackendKind::Vault, format!("failed to access vault: {}", e))
        })?;
        Ok(if user == REG_CODE_USER {
            &entries.reg_code
        } else {
            &entries.ver_info
        })
    }

    fn get(&self, user: &str) -> Result<Option<String>> {
        match self.entry(user)?.get_password() {
            Ok(value) if value.is_empty() => Ok(None),
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(keyring::Error::NoStorageAccess(e)) | Err(keyring::Error::PlatformFailure(e)) => {
                tracing::debug!("Vault unavailable for {}: {}", user, e);
                Ok(None)
            }
            Err(e) => Err(FacadeError::storage(
                BackendKind::Vault,
                format!("failed to read {}: {}", user, e),
            )),
        }
    }

    fn set(&self, user: &str, value: &str) -> Result<()> {
        self.entry(user)?.set_password(value).map_err(|e| {
            FacadeError::storage(BackendKind::Vault, format!("failed to write {}: {}", user, e))
        })
    }

    fn delete(&self, user: &str) -> Result<()> {
        match self.entry(user)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(FacadeError::storage(
                BackendKind::Vault,
                format!("failed to delete {}: {}", user, e),
            )),
        }
    }
}

impl Default for VaultBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialBackend for VaultBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Vault
    }

    fn is_available(&self) -> bool {
        self.entries.is_ok()
    }

    fn read(&self) -> Result<Option<Credential>> {
        let Some(reg_code) = self.get(REG_CODE_USER)? else {
            return Ok(None);
        };
        let Some(ver_info) = self.get(VER_INFO_USER)? else {
            return Ok(None);
        };
        Ok(Some(Credential { reg_code, ver_info }))
    }

    /// Writes both entries; if the second write fails the first is put back
    /// to its previous value so the vault never holds a mixed pair.
    fn write(&self, credential: &Credential) -> Result<()> {
        let previous = self.get(REG_CODE_USER).unwrap_or(None);
        self.set(REG_CODE_USER, &credential.reg_code)?;

        if let Err(e) = self.set(VER_INFO_USER, &credential.ver_info) {
            let rollback = match &previous {
                Some(value) => self.set(REG_CODE_USER, value),
                None => self.delete(REG_CODE_USER),
            };
            if let Err(rollback_err) = rollback {
                tracing::warn!("Failed to roll back vault entry: {}", rollback_err);
            }
            return Err(e);
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.delete(REG_CODE_USER)?;
        self.delete(VER_INFO_USER)
    }
}
