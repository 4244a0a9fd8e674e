//! Bind-option defaults, legal value domains and plugin status descriptions.
//!
//! Every window binding starts from [`ConfigStore::default_bind_config`] and
//! only the fields a caller explicitly supplies are replaced. A field that is
//! `None` is treated exactly like a field that was never mentioned.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FacadeError, Result};

/// Capability string handed to `BindWindowEx` when the caller does not supply one.
pub const DEFAULT_PUBLIC: &str = "dx.public.fake.window.min|dx.public.hack.speed";

pub const DISPLAY_MODES: &[&str] = &["normal", "gdi", "gdi2", "dx", "dx2"];
pub const MOUSE_MODES: &[&str] = &["normal", "windows", "windows2", "windows3", "dx", "dx2"];
pub const KEYPAD_MODES: &[&str] = &["normal", "windows", "dx"];
pub const BIND_MODES: &[i32] = &[0, 1, 2, 3, 4, 5, 6, 7, 101, 103];

/// Status code the plugin returns for a successful call.
pub const STATUS_OK: i32 = 1;

const ERROR_CODES: &[(i32, &str)] = &[
    (-1, "Unable to connect to the network"),
    (
        -2,
        "Process is not running as administrator (consider disabling UAC on win7/win8/vista/2008)",
    ),
    (0, "Failure (unknown error)"),
    (1, "Success"),
    (2, "Insufficient balance"),
    (3, "Account is bound to this machine but its balance is below 50"),
    (4, "Invalid registration code"),
    (5, "Machine or IP is blacklisted or not whitelisted"),
    (6, "Illegal use of the plugin"),
    (7, "Account banned for illegal use"),
    (8, "ver_info is not in the configured additional whitelist"),
    (77, "Machine code or IP banned for illegal use"),
    (-8, "Version info is longer than 20 characters"),
    (-9, "Version info contains illegal characters"),
];

/// One recognised key of a bind configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindField {
    Display,
    Mouse,
    Keypad,
    Mode,
    Public,
}

impl BindField {
    pub const ALL: [BindField; 5] = [
        BindField::Display,
        BindField::Mouse,
        BindField::Keypad,
        BindField::Mode,
        BindField::Public,
    ];

    pub fn key(self) -> &'static str {
        match self {
            BindField::Display => "display",
            BindField::Mouse => "mouse",
            BindField::Keypad => "keypad",
            BindField::Mode => "mode",
            BindField::Public => "public",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == key)
    }

    /// Legal values for this field. `public` is free-form.
    pub fn domain(self) -> Domain {
        match self {
            BindField::Display => Domain::Text(DISPLAY_MODES),
            BindField::Mouse => Domain::Text(MOUSE_MODES),
            BindField::Keypad => Domain::Text(KEYPAD_MODES),
            BindField::Mode => Domain::Int(BIND_MODES),
            BindField::Public => Domain::Free,
        }
    }
}

impl fmt::Display for BindField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A loosely-typed option value as supplied by string-keyed callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Int(i64),
    Text(String),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Int(n) => write!(f, "{}", n),
            OptionValue::Text(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Text(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Text(value)
    }
}

impl From<i32> for OptionValue {
    fn from(value: i32) -> Self {
        OptionValue::Int(value.into())
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Int(value)
    }
}

/// The ordered set of permitted values for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Text(&'static [&'static str]),
    Int(&'static [i32]),
    Free,
}

impl Domain {
    pub fn contains(&self, value: &OptionValue) -> bool {
        match (self, value) {
            (Domain::Text(allowed), OptionValue::Text(v)) => allowed.contains(&v.as_str()),
            (Domain::Int(allowed), OptionValue::Int(v)) => {
                allowed.iter().any(|candidate| i64::from(*candidate) == *v)
            }
            (Domain::Free, OptionValue::Text(_)) => true,
            _ => false,
        }
    }

    /// Renders the legal values as a JSON list, e.g. `["normal","gdi"]`.
    pub fn render(&self) -> String {
        let rendered = match self {
            Domain::Text(allowed) => serde_json::to_string(allowed),
            Domain::Int(allowed) => serde_json::to_string(allowed),
            Domain::Free => Ok("<any string>".to_string()),
        };
        rendered.unwrap_or_default()
    }
}

/// Fully resolved parameters of one `BindWindowEx` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindConfig {
    pub display: String,
    pub mouse: String,
    pub keypad: String,
    pub public: String,
    pub mode: i32,
}

impl Default for BindConfig {
    fn default() -> Self {
        Self {
            display: "gdi".to_string(),
            mouse: "windows3".to_string(),
            keypad: "windows".to_string(),
            public: DEFAULT_PUBLIC.to_string(),
            mode: 101,
        }
    }
}

impl fmt::Display for BindConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "display={}, mouse={}, keypad={}, mode={}, public={}",
            self.display, self.mouse, self.keypad, self.mode, self.public
        )
    }
}

/// Caller-supplied partial bind configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindOverrides {
    pub display: Option<String>,
    pub mouse: Option<String>,
    pub keypad: Option<String>,
    pub mode: Option<i32>,
    pub public: Option<String>,
}

impl BindOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }

    pub fn mouse(mut self, mouse: impl Into<String>) -> Self {
        self.mouse = Some(mouse.into());
        self
    }

    pub fn keypad(mut self, keypad: impl Into<String>) -> Self {
        self.keypad = Some(keypad.into());
        self
    }

    pub fn mode(mut self, mode: i32) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn public(mut self, public: impl Into<String>) -> Self {
        self.public = Some(public.into());
        self
    }

    fn entries(&self) -> [(BindField, Option<OptionValue>); 5] {
        [
            (BindField::Display, self.display.clone().map(OptionValue::from)),
            (BindField::Mouse, self.mouse.clone().map(OptionValue::from)),
            (BindField::Keypad, self.keypad.clone().map(OptionValue::from)),
            (BindField::Mode, self.mode.map(OptionValue::from)),
            (BindField::Public, self.public.clone().map(OptionValue::from)),
        ]
    }
}

/// Timing and matching defaults used by the helper components.
#[derive(Debug, Clone, PartialEq)]
pub struct Timing {
    pub mouse_delay: Duration,
    pub keyboard_delay: Duration,
    pub similarity: f64,
    pub timeout: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            mouse_delay: Duration::from_millis(50),
            keyboard_delay: Duration::from_millis(50),
            similarity: 0.9,
            timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    default_bind: BindConfig,
    pub timing: Timing,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_bind_config(&self) -> &BindConfig {
        &self.default_bind
    }

    /// Merge typed overrides onto a fresh copy of the default configuration.
    pub fn get_bind_config(&self, overrides: &BindOverrides) -> Result<BindConfig> {
        let mut config = self.default_bind.clone();
        for (field, value) in overrides.entries() {
            if let Some(value) = value {
                apply(&mut config, field, value)?;
            }
        }
        Ok(config)
    }

    /// String-keyed variant of [`get_bind_config`](Self::get_bind_config).
    ///
    /// Entries whose value is `None` are skipped before the key is looked at,
    /// so an unset value is indistinguishable from an absent key.
    pub fn get_bind_config_from_pairs<I, K>(&self, pairs: I) -> Result<BindConfig>
    where
        I: IntoIterator<Item = (K, Option<OptionValue>)>,
        K: AsRef<str>,
    {
        let mut config = self.default_bind.clone();
        for (key, value) in pairs {
            let Some(value) = value else { continue };
            let key = key.as_ref();
            let field = BindField::from_key(key).ok_or_else(|| FacadeError::UnknownOption {
                key: key.to_string(),
                known: BindField::ALL.iter().map(|f| f.key()).collect(),
            })?;
            apply(&mut config, field, value)?;
        }
        Ok(config)
    }

    /// Pure membership check against the field's domain. Unknown fields are never valid.
    pub fn validate_option(&self, field: &str, value: &OptionValue) -> bool {
        BindField::from_key(field).is_some_and(|field| field.domain().contains(value))
    }

    pub fn legal_values(&self, field: BindField) -> Domain {
        field.domain()
    }

    pub fn describe_error_code(&self, code: i32) -> String {
        describe_error_code(code)
    }
}

pub fn describe_error_code(code: i32) -> String {
    ERROR_CODES
        .iter()
        .find(|(candidate, _)| *candidate == code)
        .map(|(_, message)| (*message).to_string())
        .unwrap_or_else(|| format!("unknown error code: {}", code))
}

fn apply(config: &mut BindConfig, field: BindField, value: OptionValue) -> Result<()> {
    if !field.domain().contains(&value) {
        return Err(invalid_value(field, &value));
    }

    match (field, value) {
        (BindField::Display, OptionValue::Text(v)) => config.display = v,
        (BindField::Mouse, OptionValue::Text(v)) => config.mouse = v,
        (BindField::Keypad, OptionValue::Text(v)) => config.keypad = v,
        (BindField::Public, OptionValue::Text(v)) => config.public = v,
        (BindField::Mode, OptionValue::Int(v)) => {
            config.mode = i32::try_from(v).map_err(|_| invalid_value(field, &v.into()))?
        }
        (field, value) => return Err(invalid_value(field, &value)),
    }
    Ok(())
}

fn invalid_value(field: BindField, value: &OptionValue) -> FacadeError {
    FacadeError::InvalidOptionValue {
        field: field.key(),
        value: value.to_string(),
        allowed: field.domain().render(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_overrides_yields_defaults() {
        let store = ConfigStore::new();
        let config = store.get_bind_config(&BindOverrides::new()).unwrap();
        assert_eq!(&config, store.default_bind_config());
        assert_eq!(config.display, "gdi");
        assert_eq!(config.mouse, "windows3");
        assert_eq!(config.keypad, "windows");
        assert_eq!(config.mode, 101);
        assert_eq!(config.public, DEFAULT_PUBLIC);
    }

    #[test]
    fn test_partial_override() {
        let store = ConfigStore::new();
        let config = store
            .get_bind_config(&BindOverrides::new().display("dx2").mode(103))
            .unwrap();

        assert_eq!(config.display, "dx2");
        assert_eq!(config.mouse, "windows3");
        assert_eq!(config.keypad, "windows");
        assert_eq!(config.mode, 103);
        assert_eq!(config.public, DEFAULT_PUBLIC);
    }

    #[test]
    fn test_invalid_display_names_field_value_and_domain() {
        let store = ConfigStore::new();
        let err = store
            .get_bind_config(&BindOverrides::new().display("invalid_mode"))
            .unwrap_err();

        match &err {
            FacadeError::InvalidOptionValue { field, value, allowed } => {
                assert_eq!(*field, "display");
                assert_eq!(value, "\"invalid_mode\"");
                assert_eq!(allowed, r#"["normal","gdi","gdi2","dx","dx2"]"#);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        let message = err.to_string();
        assert!(message.contains("display"));
        assert!(message.contains("invalid_mode"));
        assert!(message.contains(r#"["normal","gdi","gdi2","dx","dx2"]"#));
    }

    #[test]
    fn test_every_field_rejects_values_outside_domain() {
        let store = ConfigStore::new();
        let cases = [
            BindOverrides::new().display("dx3"),
            BindOverrides::new().mouse("windows4"),
            BindOverrides::new().keypad("gdi"),
            BindOverrides::new().mode(102),
        ];
        for overrides in cases {
            assert!(matches!(
                store.get_bind_config(&overrides),
                Err(FacadeError::InvalidOptionValue { .. })
            ));
        }
    }

    #[test]
    fn test_public_is_free_form() {
        let store = ConfigStore::new();
        let config = store
            .get_bind_config(&BindOverrides::new().public("dx.public.active.api"))
            .unwrap();
        assert_eq!(config.public, "dx.public.active.api");
    }

    #[test]
    fn test_pairs_unset_values_behave_like_absent_keys() {
        let store = ConfigStore::new();
        let config = store
            .get_bind_config_from_pairs([
                ("display", None),
                ("mouse", Some(OptionValue::from("dx"))),
                ("not_a_key", None),
            ])
            .unwrap();
        assert_eq!(config.display, "gdi");
        assert_eq!(config.mouse, "dx");
    }

    #[test]
    fn test_pairs_unknown_key() {
        let store = ConfigStore::new();
        let err = store
            .get_bind_config_from_pairs([("colour", Some(OptionValue::from("dx")))])
            .unwrap_err();
        match err {
            FacadeError::UnknownOption { key, known } => {
                assert_eq!(key, "colour");
                assert!(known.contains(&"display"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_pairs_wrong_value_kind() {
        let store = ConfigStore::new();
        let err = store
            .get_bind_config_from_pairs([("mode", Some(OptionValue::from("101")))])
            .unwrap_err();
        assert!(matches!(err, FacadeError::InvalidOptionValue { field: "mode", .. }));
    }

    #[test]
    fn test_validate_option() {
        let store = ConfigStore::new();
        assert!(store.validate_option("display", &"gdi".into()));
        assert!(!store.validate_option("display", &"invalid".into()));
        assert!(store.validate_option("mode", &101.into()));
        assert!(!store.validate_option("mode", &999.into()));
        assert!(!store.validate_option("unknown", &"gdi".into()));
    }

    #[test]
    fn test_describe_error_code() {
        let store = ConfigStore::new();
        assert_eq!(store.describe_error_code(1), "Success");
        assert_eq!(store.describe_error_code(4), "Invalid registration code");
        assert_eq!(store.describe_error_code(12345), "unknown error code: 12345");
    }
}
