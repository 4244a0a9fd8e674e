//! Single entry point over the plugin and its helper components.
//!
//! Method names are resolved in a fixed order: [`HighLevelProxy`], then
//! [`CoreEngine`], [`KeyComponent`], [`MouseComponent`] and finally the raw
//! plugin. The first component listing a name services it, so the proxy's
//! validated `BindWindow` shadows the engine's raw one.

use std::path::PathBuf;
use std::rc::Rc;

use serde_json::Value;

use crate::components::{CoreEngine, HighLevelProxy, KeyComponent, MouseComponent};
use crate::config::{describe_error_code, ConfigStore, STATUS_OK};
use crate::credentials::{Credential, CredentialResolver};
use crate::dispatch::Dispatch;
use crate::error::{FacadeError, Result};
use crate::plugin::{resolve_dll_path, AutomationPlugin, PluginRegistrar, Registration};
use crate::settings::Settings;

/// Component name reported by [`Facade::resolve`] for methods only the plugin has.
pub const RAW_PLUGIN: &str = "Plugin";

pub struct FacadeBuilder {
    settings: Settings,
    plugin_path: Option<PathBuf>,
    credential: Option<Credential>,
    resolver: Option<CredentialResolver>,
    config: ConfigStore,
}

impl FacadeBuilder {
    pub fn new() -> Self {
        Self::with_settings(Settings::from_env())
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings,
            plugin_path: None,
            credential: None,
            resolver: None,
            config: ConfigStore::new(),
        }
    }

    /// Plugin directory, or the library file itself if it ends in `.dll`.
    pub fn plugin_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.plugin_path = Some(path.into());
        self
    }

    /// Activate with this credential instead of resolving one.
    pub fn credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn resolver(mut self, resolver: CredentialResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn config(mut self, config: ConfigStore) -> Self {
        self.config = config;
        self
    }

    /// Register the plugin, assemble the components and activate.
    ///
    /// If activation is rejected the registration is undone before the
    /// error is returned.
    pub fn build(self, registrar: Box<dyn PluginRegistrar>) -> Result<Facade> {
        let location = self
            .plugin_path
            .unwrap_or_else(|| self.settings.plugin_path.clone());
        let (mut registration, plugin) =
            Registration::register(registrar, resolve_dll_path(&location))?;

        let timing = self.config.timing.clone();
        let core = Rc::new(CoreEngine::new(Rc::clone(&plugin)));
        let key = KeyComponent::new(Rc::clone(&plugin), timing.keyboard_delay);
        let mouse = MouseComponent::new(Rc::clone(&plugin), timing.mouse_delay);
        let proxy = HighLevelProxy::new(Rc::clone(&core), self.config);

        let credential = match self.credential {
            Some(credential) => credential,
            None => self
                .resolver
                .unwrap_or_else(|| CredentialResolver::standard(&self.settings))
                .resolve(),
        };

        let status = match core.reg(&credential.reg_code, &credential.ver_info) {
            Ok(status) => status,
            Err(e) => {
                registration.unregister();
                return Err(e);
            }
        };
        if status != STATUS_OK {
            let message = describe_error_code(status);
            tracing::error!("Plugin activation failed with status {}: {}", status, message);
            registration.unregister();
            return Err(FacadeError::ActivationFailed { status, message });
        }
        tracing::info!("Plugin activated");

        Ok(Facade {
            proxy,
            core,
            key,
            mouse,
            plugin,
            registration,
        })
    }
}

impl Default for FacadeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Facade {
    proxy: HighLevelProxy,
    core: Rc<CoreEngine>,
    key: KeyComponent,
    mouse: MouseComponent,
    plugin: Rc<dyn AutomationPlugin>,
    registration: Registration,
}

impl Facade {
    pub fn builder() -> FacadeBuilder {
        FacadeBuilder::new()
    }

    pub fn proxy(&self) -> &HighLevelProxy {
        &self.proxy
    }

    pub fn core(&self) -> &CoreEngine {
        &self.core
    }

    pub fn key(&self) -> &KeyComponent {
        &self.key
    }

    pub fn mouse(&self) -> &MouseComponent {
        &self.mouse
    }

    pub fn plugin(&self) -> &dyn AutomationPlugin {
        self.plugin.as_ref()
    }

    pub fn config(&self) -> &ConfigStore {
        self.proxy.config()
    }

    fn chain(&self) -> [&dyn Dispatch; 4] {
        [&self.proxy, self.core.as_ref(), &self.key, &self.mouse]
    }

    /// Name of whichever component would service `method`.
    pub fn resolve(&self, method: &str) -> Option<&'static str> {
        self.chain()
            .into_iter()
            .find(|component| component.responds_to(method))
            .map(|component| component.component())
            .or_else(|| self.plugin.has_method(method).then_some(RAW_PLUGIN))
    }

    /// Invoke `method` on the first component in the chain that has it.
    /// Fails with [`FacadeError::Closed`] once the facade is closed.
    pub fn call(&self, method: &str, args: &[Value]) -> Result<Value> {
        if self.is_closed() {
            return Err(FacadeError::Closed(method.to_string()));
        }

        if let Some(component) = self
            .chain()
            .into_iter()
            .find(|component| component.responds_to(method))
        {
            tracing::debug!("{} -> {}", method, component.component());
            return component.invoke(method, args);
        }

        if self.plugin.has_method(method) {
            tracing::debug!("{} -> {}", method, RAW_PLUGIN);
            return Ok(self.plugin.invoke(method, args)?);
        }

        Err(FacadeError::MethodNotFound(method.to_string()))
    }

    /// Plugin version and instance id, e.g. `version 7.2107, id 0`.
    pub fn describe(&self) -> Result<String> {
        Ok(format!(
            "version {}, id {}",
            self.core.ver()?,
            self.core.get_id()?
        ))
    }

    pub fn is_closed(&self) -> bool {
        !self.registration.is_registered()
    }

    /// Unregister the plugin. Later calls, including the one from `Drop`, do nothing.
    pub fn close(&mut self) {
        self.registration.unregister();
    }
}

impl Drop for Facade {
    fn drop(&mut self) {
        self.close();
    }
}
