//! Engine configuration.
//!
//! [`Configuration`] is built in code with [`Configuration::builder`];
//! [`Settings`] is its serializable subset for hosts that keep settings in
//! a file.

use std::sync::Arc;
use std::time::Duration;

use chrono_tz::Tz;
use quill_cache::{
    CacheStorage, Clock, MemoryLoader, MruStorage, StrongStorage, TemplateLoader, UpdateDelay,
};
use quill_check::CheckOptions;
use quill_eval::DEFAULT_MAX_CALL_DEPTH;
use quill_ir::Locale;
use quill_value::{
    Capabilities, DefaultObjectWrapper, HashValue, ObjectWrapper, UnknownCapability, Value,
};

/// Everything an [`Engine`](crate::Engine) is built from.
#[derive(Clone)]
pub struct Configuration {
    pub(crate) loader: Arc<dyn TemplateLoader>,
    pub(crate) storage: Arc<dyn CacheStorage>,
    pub(crate) clock: Option<Arc<dyn Clock>>,
    pub(crate) update_delay: UpdateDelay,
    pub(crate) localized_lookup: bool,
    pub(crate) check_options: CheckOptions,
    pub(crate) locale: Locale,
    pub(crate) time_zone: Tz,
    pub(crate) capabilities: Capabilities,
    pub(crate) max_call_depth: usize,
    pub(crate) object_wrapper: Arc<dyn ObjectWrapper>,
    pub(crate) shared_variables: HashValue,
}

impl Configuration {
    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::new()
    }

    pub fn update_delay(&self) -> UpdateDelay {
        self.update_delay
    }

    pub fn localized_lookup(&self) -> bool {
        self.localized_lookup
    }

    pub fn check_options(&self) -> &CheckOptions {
        &self.check_options
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    pub fn time_zone(&self) -> Tz {
        self.time_zone
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn max_call_depth(&self) -> usize {
        self.max_call_depth
    }

    pub fn shared_variables(&self) -> &HashValue {
        &self.shared_variables
    }
}

impl Default for Configuration {
    fn default() -> Self {
        ConfigurationBuilder::new().build()
    }
}

impl std::fmt::Debug for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Configuration")
            .field("update_delay", &self.update_delay)
            .field("localized_lookup", &self.localized_lookup)
            .field("check_options", &self.check_options)
            .field("locale", &self.locale)
            .field("time_zone", &self.time_zone)
            .field("capabilities", &self.capabilities)
            .field("max_call_depth", &self.max_call_depth)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Configuration`].
///
/// Defaults: an empty in-memory loader, unbounded storage, a five second
/// update delay, localized lookup, whitespace stripping, advisory literal
/// checks, the root locale, UTC and every capability.
#[derive(Clone, Debug)]
pub struct ConfigurationBuilder {
    config: Configuration,
}

impl ConfigurationBuilder {
    pub fn new() -> Self {
        ConfigurationBuilder {
            config: Configuration {
                loader: Arc::new(MemoryLoader::new()),
                storage: Arc::new(StrongStorage::new()),
                clock: None,
                update_delay: UpdateDelay::DEFAULT,
                localized_lookup: true,
                check_options: CheckOptions::default(),
                locale: Locale::ROOT,
                time_zone: Tz::UTC,
                capabilities: Capabilities::all(),
                max_call_depth: DEFAULT_MAX_CALL_DEPTH,
                object_wrapper: Arc::new(DefaultObjectWrapper),
                shared_variables: HashValue::new(),
            },
        }
    }

    #[must_use]
    pub fn loader(mut self, loader: impl TemplateLoader + 'static) -> Self {
        self.config.loader = Arc::new(loader);
        self
    }

    #[must_use]
    pub fn storage(mut self, storage: Arc<dyn CacheStorage>) -> Self {
        self.config.storage = storage;
        self
    }

    /// Clock driving cache revalidation and idle eviction.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.config.clock = Some(clock);
        self
    }

    #[must_use]
    pub fn update_delay(mut self, delay: UpdateDelay) -> Self {
        self.config.update_delay = delay;
        self
    }

    #[must_use]
    pub fn localized_lookup(mut self, enabled: bool) -> Self {
        self.config.localized_lookup = enabled;
        self
    }

    #[must_use]
    pub fn strip_whitespace(mut self, enabled: bool) -> Self {
        self.config.check_options.strip_whitespace = enabled;
        self
    }

    #[must_use]
    pub fn literal_type_check_fatal(mut self, fatal: bool) -> Self {
        self.config.check_options.literal_type_check_fatal = fatal;
        self
    }

    #[must_use]
    pub fn locale(mut self, locale: Locale) -> Self {
        self.config.locale = locale;
        self
    }

    #[must_use]
    pub fn time_zone(mut self, time_zone: Tz) -> Self {
        self.config.time_zone = time_zone;
        self
    }

    #[must_use]
    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.config.capabilities = capabilities;
        self
    }

    #[must_use]
    pub fn max_call_depth(mut self, depth: usize) -> Self {
        self.config.max_call_depth = depth;
        self
    }

    /// Converts host objects handed to [`Engine::wrap`](crate::Engine::wrap).
    #[must_use]
    pub fn object_wrapper(mut self, wrapper: Arc<dyn ObjectWrapper>) -> Self {
        self.config.object_wrapper = wrapper;
        self
    }

    /// A variable every render sees beneath its data model.
    #[must_use]
    pub fn shared_variable(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.config.shared_variables.insert(name, value.into());
        self
    }

    pub fn build(self) -> Configuration {
        self.config
    }
}

impl Default for ConfigurationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid settings: {0}")]
    Syntax(#[from] serde_json::Error),
    #[error(transparent)]
    Capability(#[from] UnknownCapability),
    #[error("unknown time zone `{0}`")]
    TimeZone(String),
}

/// The scalar part of a [`Configuration`], as read from a settings file.
///
/// Unset fields leave the builder's value alone.
///
/// ```json
/// {
///   "update_delay_ms": 2000,
///   "locale": "de_AT",
///   "time_zone": "Europe/Vienna",
///   "capabilities": ["include", "node_visit"]
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Milliseconds between source checks; negative caches forever.
    pub update_delay_ms: Option<i64>,
    /// Keep at most this many templates, dropping the least recently used.
    pub cache_capacity: Option<usize>,
    pub localized_lookup: Option<bool>,
    pub strip_whitespace: Option<bool>,
    pub literal_type_check_fatal: Option<bool>,
    pub locale: Option<String>,
    pub time_zone: Option<String>,
    /// Names of the granted capabilities; all others are denied.
    pub capabilities: Option<Vec<String>>,
    pub max_call_depth: Option<usize>,
}

impl Settings {
    pub fn from_json(text: &str) -> Result<Settings, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Apply every field that is set.
    pub fn apply(&self, mut builder: ConfigurationBuilder) -> Result<ConfigurationBuilder, ConfigError> {
        if let Some(millis) = self.update_delay_ms {
            builder = builder.update_delay(match u64::try_from(millis) {
                Ok(millis) => UpdateDelay::After(Duration::from_millis(millis)),
                Err(_) => UpdateDelay::Never,
            });
        }
        if let Some(capacity) = self.cache_capacity {
            builder = builder.storage(Arc::new(MruStorage::new(capacity)));
        }
        if let Some(enabled) = self.localized_lookup {
            builder = builder.localized_lookup(enabled);
        }
        if let Some(enabled) = self.strip_whitespace {
            builder = builder.strip_whitespace(enabled);
        }
        if let Some(fatal) = self.literal_type_check_fatal {
            builder = builder.literal_type_check_fatal(fatal);
        }
        if let Some(locale) = &self.locale {
            builder = builder.locale(Locale::parse(locale));
        }
        if let Some(name) = &self.time_zone {
            let time_zone: Tz = name
                .parse()
                .map_err(|_| ConfigError::TimeZone(name.clone()))?;
            builder = builder.time_zone(time_zone);
        }
        if let Some(names) = &self.capabilities {
            builder = builder.capabilities(Capabilities::from_names(names)?);
        }
        if let Some(depth) = self.max_call_depth {
            builder = builder.max_call_depth(depth);
        }
        Ok(builder)
    }
}
