use thiserror::Error;

use crate::config::BindConfig;
use crate::credentials::BackendKind;
use crate::plugin::PluginError;

#[derive(Error, Debug)]
pub enum FacadeError {
    #[error("Unknown bind option `{key}` (known options: {known:?})")]
    UnknownOption {
        key: String,
        known: Vec<&'static str>,
    },

    #[error("Invalid value for `{field}`: {value} (legal values: {allowed})")]
    InvalidOptionValue {
        field: &'static str,
        value: String,
        allowed: String,
    },

    #[error("Invalid window handle: {0}")]
    InvalidHandle(i32),

    #[error(
        "Binding window {hwnd} failed with status {status} ({message}); config: {config}"
    )]
    BindFailed {
        hwnd: i32,
        status: i32,
        message: String,
        config: BindConfig,
    },

    #[error("No component provides method `{0}`")]
    MethodNotFound(String),

    #[error("Invalid argument {index} for `{method}`: expected {expected}")]
    InvalidArgument {
        method: String,
        index: usize,
        expected: &'static str,
    },

    #[error("Credential storage error ({backend}): {reason}")]
    Storage { backend: BackendKind, reason: String },

    #[error("Plugin activation failed with status {status}: {message}")]
    ActivationFailed { status: i32, message: String },

    #[error("Facade is closed; `{0}` was not sent to the plugin")]
    Closed(String),

    #[error("Plugin registration failed: {0}")]
    Registration(String),

    #[error(transparent)]
    Plugin(#[from] PluginError),
}

impl FacadeError {
    pub(crate) fn storage(backend: BackendKind, reason: impl std::fmt::Display) -> Self {
        FacadeError::Storage {
            backend,
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FacadeError>;
