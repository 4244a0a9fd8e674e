use std::env;

use super::{BackendKind, Credential, CredentialBackend};
use crate::error::Result;

pub const REG_CODE_VAR: &str = "DM_REG_CODE";
pub const VER_INFO_VAR: &str = "DM_VER_INFO";

/// Credential taken from two process environment variables. Writes only
/// affect the current process.
pub struct EnvBackend {
    reg_code_var: String,
    ver_info_var: String,
}

impl EnvBackend {
    pub fn new() -> Self {
        Self::with_vars(REG_CODE_VAR, VER_INFO_VAR)
    }

    pub fn with_vars(reg_code_var: impl Into<String>, ver_info_var: impl Into<String>) -> Self {
        Self {
            reg_code_var: reg_code_var.into(),
            ver_info_var: ver_info_var.into(),
        }
    }

    fn var(name: &str) -> Option<String> {
        env::var(name).ok().filter(|v| !v.is_empty())
    }
}

impl Default for EnvBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialBackend for EnvBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Environment
    }

    fn read(&self) -> Result<Option<Credential>> {
        match (Self::var(&self.reg_code_var), Self::var(&self.ver_info_var)) {
            (Some(reg_code), Some(ver_info)) => Ok(Some(Credential { reg_code, ver_info })),
            _ => Ok(None),
        }
    }

    fn write(&self, credential: &Credential) -> Result<()> {
        env::set_var(&self.reg_code_var, &credential.reg_code);
        env::set_var(&self.ver_info_var, &credential.ver_info);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        env::remove_var(&self.reg_code_var);
        env::remove_var(&self.ver_info_var);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_backend_requires_both_vars() {
        let backend = EnvBackend::with_vars("DM_TEST_ENV_REG_A", "DM_TEST_ENV_VER_A");
        backend.clear().unwrap();
        assert_eq!(backend.read().unwrap(), None);

        env::set_var("DM_TEST_ENV_REG_A", "code");
        assert_eq!(backend.read().unwrap(), None);

        env::set_var("DM_TEST_ENV_VER_A", "ver");
        assert_eq!(backend.read().unwrap(), Some(Credential::new("code", "ver")));

        backend.clear().unwrap();
        assert_eq!(backend.read().unwrap(), None);
    }

    #[test]
    fn test_env_backend_write() {
        let backend = EnvBackend::with_vars("DM_TEST_ENV_REG_B", "DM_TEST_ENV_VER_B");
        backend.write(&Credential::new("abc", "123")).unwrap();
        assert_eq!(env::var("DM_TEST_ENV_REG_B").unwrap(), "abc");
        assert_eq!(backend.read().unwrap(), Some(Credential::new("abc", "123")));
        backend.clear().unwrap();
    }
}
