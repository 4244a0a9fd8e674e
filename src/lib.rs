pub mod color;
pub mod components;
pub mod config;
pub mod credentials;
pub mod dispatch;
pub mod error;
pub mod facade;
pub mod plugin;
pub mod settings;
pub mod timing;

pub use components::{CoreEngine, FindOutcome, HighLevelProxy, KeyComponent, MouseComponent, Region};
pub use config::{BindConfig, BindField, BindOverrides, ConfigStore, OptionValue, Timing};
pub use credentials::{BackendKind, Credential, CredentialBackend, CredentialResolver};
pub use dispatch::Dispatch;
pub use error::{FacadeError, Result};
pub use facade::{Facade, FacadeBuilder};
pub use plugin::{AutomationPlugin, PluginError, PluginRegistrar, PreloadedRegistrar};
pub use settings::Settings;
