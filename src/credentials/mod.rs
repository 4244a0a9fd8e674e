//! Registration credentials for activating the plugin.
//!
//! Backends are probed in a fixed priority order (environment, OS vault,
//! encrypted file, plain file). A backend that is unavailable, empty or
//! unreadable simply reports absent and resolution moves on; if none has a
//! credential the built-in placeholder is returned and the activation step
//! downstream decides whether that is acceptable.

pub mod env;
pub mod file;
pub mod vault;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FacadeError, Result};
use crate::settings::Settings;

pub use env::EnvBackend;
pub use file::{ArtifactIo, EncryptedFileBackend, FsIo, PlainFileBackend};
pub use vault::VaultBackend;

pub const PLACEHOLDER_REG_CODE: &str = "unregistered";
pub const PLACEHOLDER_VER_INFO: &str = "unregistered";

/// Registration code and version token pair.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(rename = "dm_reg_code")]
    pub reg_code: String,
    #[serde(rename = "dm_ver_info")]
    pub ver_info: String,
}

impl Credential {
    pub fn new(reg_code: impl Into<String>, ver_info: impl Into<String>) -> Self {
        Self {
            reg_code: reg_code.into(),
            ver_info: ver_info.into(),
        }
    }

    pub fn placeholder() -> Self {
        Self::new(PLACEHOLDER_REG_CODE, PLACEHOLDER_VER_INFO)
    }

    pub fn is_placeholder(&self) -> bool {
        *self == Self::placeholder()
    }

    /// Both halves present.
    pub fn is_complete(&self) -> bool {
        !self.reg_code.is_empty() && !self.ver_info.is_empty()
    }

    /// Registration code with all but the first four characters masked.
    pub fn redacted_reg_code(&self) -> String {
        let visible: String = self.reg_code.chars().take(4).collect();
        let hidden = self.reg_code.chars().count().saturating_sub(4);
        format!("{}{}", visible, "*".repeat(hidden))
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("reg_code", &self.redacted_reg_code())
            .field("ver_info", &self.ver_info)
            .finish()
    }
}

/// Storage backends in read-priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Environment,
    Vault,
    EncryptedFile,
    PlainFile,
}

impl BackendKind {
    pub const PRIORITY: [BackendKind; 4] = [
        BackendKind::Environment,
        BackendKind::Vault,
        BackendKind::EncryptedFile,
        BackendKind::PlainFile,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Environment => "env",
            BackendKind::Vault => "vault",
            BackendKind::EncryptedFile => "encrypted",
            BackendKind::PlainFile => "plain",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "env" | "environment" => Ok(BackendKind::Environment),
            "vault" | "windows" | "keyring" => Ok(BackendKind::Vault),
            "encrypted" => Ok(BackendKind::EncryptedFile),
            "plain" => Ok(BackendKind::PlainFile),
            other => Err(format!(
                "unknown credential backend `{}` (expected env, vault, encrypted or plain)",
                other
            )),
        }
    }
}

/// One credential storage mechanism.
pub trait CredentialBackend {
    fn kind(&self) -> BackendKind;

    /// Whether the mechanism can be used on this host at all.
    fn is_available(&self) -> bool {
        true
    }

    /// `Ok(None)` when nothing (or only half a credential) is stored.
    fn read(&self) -> Result<Option<Credential>>;

    fn write(&self, credential: &Credential) -> Result<()>;

    /// Remove whatever this backend stores. Clearing an empty backend succeeds.
    fn clear(&self) -> Result<()>;
}

/// A resolved credential together with the backend that supplied it.
/// `source` is `None` for the placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub credential: Credential,
    pub source: Option<BackendKind>,
}

pub struct CredentialResolver {
    backends: Vec<Box<dyn CredentialBackend>>,
}

impl CredentialResolver {
    /// The four standard backends in priority order, rooted at `settings`.
    pub fn standard(settings: &Settings) -> Self {
        Self::with_backends(vec![
            Box::new(EnvBackend::new()),
            Box::new(VaultBackend::new()),
            Box::new(EncryptedFileBackend::new(
                settings.encrypted_file(),
                settings.key_file(),
            )),
            Box::new(PlainFileBackend::new(settings.plain_file())),
        ])
    }

    /// Backends are probed in the order given.
    pub fn with_backends(backends: Vec<Box<dyn CredentialBackend>>) -> Self {
        Self { backends }
    }

    pub fn backend(&self, kind: BackendKind) -> Option<&dyn CredentialBackend> {
        self.backends
            .iter()
            .find(|b| b.kind() == kind)
            .map(|b| b.as_ref())
    }

    /// Always yields a credential; see [`resolve_with_source`](Self::resolve_with_source).
    pub fn resolve(&self) -> Credential {
        self.resolve_with_source().credential
    }

    pub fn resolve_with_source(&self) -> Resolved {
        for backend in &self.backends {
            let kind = backend.kind();
            if !backend.is_available() {
                tracing::debug!("Credential backend {} unavailable, skipping", kind);
                continue;
            }

            match backend.read() {
                Ok(Some(credential)) if credential.is_complete() => {
                    tracing::debug!("Resolved credential from {} backend", kind);
                    return Resolved {
                        credential,
                        source: Some(kind),
                    };
                }
                Ok(_) => tracing::debug!("Credential backend {} has no credential", kind),
                Err(e) => tracing::warn!("Credential backend {} unreadable, skipping: {}", kind, e),
            }
        }

        tracing::warn!("No credential found in any backend, using placeholder credential");
        Resolved {
            credential: Credential::placeholder(),
            source: None,
        }
    }

    /// Persist `credential` to exactly the requested backend.
    pub fn store(&self, credential: &Credential, kind: BackendKind) -> Result<()> {
        if !credential.is_complete() {
            return Err(FacadeError::storage(
                kind,
                "registration code and version info must both be non-empty",
            ));
        }
        let backend = self.available(kind)?;
        backend.write(credential)?;
        tracing::info!("Stored credential in {} backend", kind);
        Ok(())
    }

    pub fn clear(&self, kind: BackendKind) -> Result<()> {
        self.available(kind)?.clear()?;
        tracing::info!("Cleared credential from {} backend", kind);
        Ok(())
    }

    /// Availability of each configured backend, in priority order.
    pub fn available_backends(&self) -> Vec<(BackendKind, bool)> {
        self.backends
            .iter()
            .map(|b| (b.kind(), b.is_available()))
            .collect()
    }

    fn available(&self, kind: BackendKind) -> Result<&dyn CredentialBackend> {
        let backend = self
            .backend(kind)
            .ok_or_else(|| FacadeError::storage(kind, "backend is not configured"))?;
        if !backend.is_available() {
            return Err(FacadeError::storage(kind, "backend is not available on this host"));
        }
        Ok(backend)
    }
}
