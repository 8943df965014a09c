//! Binder configuration.

use tether_property::DEFAULT_MAX_NESTING_DEPTH;

/// Initial flag values and environment of a [`Binder`](crate::Binder).
///
/// # Example
///
/// ```
/// use tether_binder::BinderConfig;
///
/// let config = BinderConfig::default()
///     .change_detection(true)
///     .locale("fi")
///     .max_nesting_depth(4);
/// assert!(config.change_detection);
/// assert_eq!(config.locale.as_deref(), Some("fi"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BinderConfig {
    /// Compare field values with their baselines to detect reverted edits.
    pub change_detection: bool,
    /// Run the validators fields declare for themselves.
    pub default_validators: bool,
    /// Skip every validator; converters still run.
    pub validators_disabled: bool,
    /// Make every binding read-only.
    pub read_only: bool,
    /// Locale for messages; `None` detects the system locale.
    pub locale: Option<String>,
    /// Deepest nested property path discovered for `bind_property`.
    pub max_nesting_depth: usize,
}

impl Default for BinderConfig {
    fn default() -> Self {
        Self {
            change_detection: false,
            default_validators: true,
            validators_disabled: false,
            read_only: false,
            locale: None,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }
}

impl BinderConfig {
    /// Set change detection.
    #[must_use]
    pub fn change_detection(mut self, enabled: bool) -> Self {
        self.change_detection = enabled;
        self
    }

    /// Set whether field default validators run.
    #[must_use]
    pub fn default_validators(mut self, enabled: bool) -> Self {
        self.default_validators = enabled;
        self
    }

    /// Set whether validators are skipped.
    #[must_use]
    pub fn validators_disabled(mut self, disabled: bool) -> Self {
        self.validators_disabled = disabled;
        self
    }

    /// Set the read-only flag.
    #[must_use]
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Set the locale.
    #[must_use]
    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Set the property discovery depth.
    #[must_use]
    pub fn max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    /// Parse a TOML document; missing keys keep their defaults.
    #[cfg(feature = "policy-config")]
    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }
}
