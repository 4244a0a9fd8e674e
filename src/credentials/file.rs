//! File-backed credential storage: a plain JSON document, or the same
//! document sealed with AES-256-GCM under a key kept in a sibling file.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::RngCore;

use super::{BackendKind, Credential, CredentialBackend};
use crate::error::{FacadeError, Result};

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Writes one artifact file in full.
pub trait ArtifactIo {
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Like [`write`](Self::write), but the file ends up readable by the owner only.
    fn write_private(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        self.write(path, contents)?;
        restrict_permissions(path)
    }
}

/// Writes through a temporary sibling and renames it into place, so a
/// reader never observes a half-written file.
pub struct FsIo;

impl FsIo {
    fn write_via_tmp(path: &Path, contents: &[u8], private: bool) -> io::Result<()> {
        let file_name = path
            .file_name()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
        let mut tmp_name = file_name.to_os_string();
        tmp_name.push(".tmp");
        let tmp = path.with_file_name(tmp_name);

        // A stale temp file would keep its old mode.
        remove_if_exists(&tmp)?;
        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        if private {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        #[cfg(not(unix))]
        let _ = private;

        let written = options
            .open(&tmp)
            .and_then(|mut file| {
                file.write_all(contents)?;
                file.sync_all()
            })
            .and_then(|()| fs::rename(&tmp, path));
        written.inspect_err(|_| {
            let _ = fs::remove_file(&tmp);
        })
    }
}

impl ArtifactIo for FsIo {
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        Self::write_via_tmp(path, contents, false)
    }

    fn write_private(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        Self::write_via_tmp(path, contents, true)
    }
}

fn ensure_parent(path: &Path, backend: BackendKind) -> Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir).map_err(|e| {
            FacadeError::storage(backend, format!("failed to create {:?}: {}", dir, e))
        }),
        _ => Ok(()),
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

fn parse_document(text: &str, backend: BackendKind) -> Result<Option<Credential>> {
    let credential: Credential = serde_json::from_str(text)
        .map_err(|e| FacadeError::storage(backend, format!("malformed credential document: {}", e)))?;
    Ok(credential.is_complete().then_some(credential))
}

// ============ Plain file ============

pub struct PlainFileBackend {
    path: PathBuf,
}

impl PlainFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialBackend for PlainFileBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::PlainFile
    }

    fn read(&self) -> Result<Option<Credential>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(FacadeError::storage(self.kind(), e)),
        };
        parse_document(&text, self.kind())
    }

    fn write(&self, credential: &Credential) -> Result<()> {
        ensure_parent(&self.path, self.kind())?;
        let document = serde_json::to_vec_pretty(credential)
            .map_err(|e| FacadeError::storage(self.kind(), e))?;
        FsIo.write(&self.path, &document)
            .map_err(|e| FacadeError::storage(self.kind(), e))
    }

    fn clear(&self) -> Result<()> {
        remove_if_exists(&self.path).map_err(|e| FacadeError::storage(self.kind(), e))
    }
}

// ============ Encrypted file ============

/// Payload file holds `base64(nonce || ciphertext)`; the key file holds the
/// base64 key. A write either leaves a decryptable pair or the previous
/// artifacts untouched.
pub struct EncryptedFileBackend {
    payload_path: PathBuf,
    key_path: PathBuf,
    io: Box<dyn ArtifactIo>,
}

impl EncryptedFileBackend {
    pub fn new(payload_path: impl Into<PathBuf>, key_path: impl Into<PathBuf>) -> Self {
        Self {
            payload_path: payload_path.into(),
            key_path: key_path.into(),
            io: Box::new(FsIo),
        }
    }

    pub fn with_io(mut self, io: Box<dyn ArtifactIo>) -> Self {
        self.io = io;
        self
    }

    pub fn payload_path(&self) -> &Path {
        &self.payload_path
    }

    pub fn key_path(&self) -> &Path {
        &self.key_path
    }

    fn err(&self, reason: impl std::fmt::Display) -> FacadeError {
        FacadeError::storage(BackendKind::EncryptedFile, reason)
    }

    fn decode_key(&self, text: &str) -> Result<Vec<u8>> {
        let key = BASE64
            .decode(text.trim())
            .map_err(|e| self.err(format!("malformed key file: {}", e)))?;
        if key.len() != KEY_LEN {
            return Err(self.err(format!("key is {} bytes, expected {}", key.len(), KEY_LEN)));
        }
        Ok(key)
    }

    fn load_key(&self) -> Result<Option<Vec<u8>>> {
        match fs::read_to_string(&self.key_path) {
            Ok(text) => self.decode_key(&text).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.err(e)),
        }
    }

    fn seal(&self, key: &[u8], plaintext: &[u8]) -> Result<String> {
        let cipher = Aes256Gcm::new_from_slice(key).map_err(|e| self.err(e))?;
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| self.err("encryption failed"))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(sealed))
    }

    fn open(&self, key: &[u8], payload: &str) -> Result<Vec<u8>> {
        let sealed = BASE64
            .decode(payload.trim())
            .map_err(|e| self.err(format!("malformed payload: {}", e)))?;
        if sealed.len() <= NONCE_LEN {
            return Err(self.err(format!("payload too short ({} bytes)", sealed.len())));
        }

        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        let cipher = Aes256Gcm::new_from_slice(key).map_err(|e| self.err(e))?;
        cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| self.err("payload does not decrypt with the stored key"))
    }

    fn write_artifacts(&self, new_key: Option<&str>, payload: &str) -> io::Result<()> {
        if let Some(key) = new_key {
            self.io.write_private(&self.key_path, key.as_bytes())?;
        }
        self.io.write(&self.payload_path, payload.as_bytes())
    }
}

impl CredentialBackend for EncryptedFileBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::EncryptedFile
    }

    fn read(&self) -> Result<Option<Credential>> {
        let payload = match fs::read_to_string(&self.payload_path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.err(e)),
        };
        let Some(key) = self.load_key()? else {
            return Ok(None);
        };

        let plaintext = self.open(&key, &payload)?;
        let text = String::from_utf8(plaintext).map_err(|e| self.err(e))?;
        parse_document(&text, self.kind())
    }

    fn write(&self, credential: &Credential) -> Result<()> {
        ensure_parent(&self.payload_path, self.kind())?;
        ensure_parent(&self.key_path, self.kind())?;

        let (key, new_key) = match self.load_key() {
            Ok(Some(key)) => (key, None),
            Ok(None) | Err(_) => {
                let mut key = vec![0u8; KEY_LEN];
                rand::thread_rng().fill_bytes(&mut key);
                let encoded = BASE64.encode(&key);
                (key, Some(encoded))
            }
        };

        let document = serde_json::to_vec(credential).map_err(|e| self.err(e))?;
        let payload = self.seal(&key, &document)?;

        let snapshot = Snapshot::take(&[&self.key_path, &self.payload_path]);
        if let Err(e) = self.write_artifacts(new_key.as_deref(), &payload) {
            snapshot.restore();
            return Err(self.err(format!("failed to write encrypted credential: {}", e)));
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        remove_if_exists(&self.payload_path).map_err(|e| self.err(e))?;
        remove_if_exists(&self.key_path).map_err(|e| self.err(e))
    }
}

/// Prior contents of a set of files, restorable after a failed write.
struct Snapshot {
    files: Vec<(PathBuf, Option<Vec<u8>>)>,
}

impl Snapshot {
    fn take(paths: &[&Path]) -> Self {
        let files = paths
            .iter()
            .map(|path| (path.to_path_buf(), fs::read(path).ok()))
            .collect();
        Self { files }
    }

    fn restore(self) {
        for (path, contents) in self.files {
            let restored = match contents {
                Some(bytes) => fs::write(&path, bytes),
                None => remove_if_exists(&path),
            };
            if let Err(e) = restored {
                tracing::warn!("Failed to restore {:?} after aborted write: {}", path, e);
            }
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> io::Result<()> {
    Ok(())
}
