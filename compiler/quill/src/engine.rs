//! The engine: a configuration, a template cache and the render entry points.

use std::any::Any;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use quill_cache::{TemplateCache, TemplateCacheBuilder};
use quill_check::ValidatedTemplate;
use quill_eval::{Environment, OutputSink, TemplateProvider};
use quill_ir::Locale;
use quill_value::{template_load, EvalError, HashValue, Value};
use serde::Serialize;

use crate::config::Configuration;
use crate::error::RenderError;

/// Per-render overrides of the configured defaults.
#[derive(Clone, Debug, Default)]
pub struct RenderOptions {
    pub locale: Option<Locale>,
    pub time_zone: Option<Tz>,
    /// Value of `.now`; the clock at render start if unset.
    pub now: Option<DateTime<Utc>>,
}

/// Loads, caches and renders templates.
///
/// An engine is `Send + Sync`; renders on different threads share its
/// cache and nothing else.
pub struct Engine {
    config: Configuration,
    cache: TemplateCache,
}

impl Engine {
    pub fn new(config: Configuration) -> Self {
        let mut cache = TemplateCacheBuilder::new(Arc::clone(&config.loader))
            .storage(Arc::clone(&config.storage))
            .check_options(config.check_options.clone())
            .delay(config.update_delay)
            .localized_lookup(config.localized_lookup);
        if let Some(clock) = &config.clock {
            cache = cache.clock(Arc::clone(clock));
        }
        Engine {
            cache: cache.build(),
            config,
        }
    }

    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    pub fn cache(&self) -> &TemplateCache {
        &self.cache
    }

    /// The validated template `name` for `locale`.
    pub fn template(&self, name: &str, locale: &Locale) -> Result<Arc<ValidatedTemplate>, RenderError> {
        Ok(self.cache.get(name, locale)?)
    }

    /// Render `name` with a serializable data model under the configured
    /// locale and time zone.
    pub fn render<T: Serialize + ?Sized>(
        &self,
        name: &str,
        data: &T,
        sink: &mut dyn OutputSink,
    ) -> Result<(), RenderError> {
        let data_model = HashValue::from_serialize(data)?;
        self.render_with(name, &data_model, sink, &RenderOptions::default())
    }

    /// Like [`render`](Self::render), collecting the output.
    pub fn render_to_string<T: Serialize + ?Sized>(&self, name: &str, data: &T) -> Result<String, RenderError> {
        let mut out = String::new();
        self.render(name, data, &mut out)?;
        Ok(out)
    }

    /// Render `name` against a prepared data model.
    ///
    /// Output written before a failure stays in `sink`.
    #[tracing::instrument(level = "debug", skip(self, data_model, sink, options))]
    pub fn render_with(
        &self,
        name: &str,
        data_model: &HashValue,
        sink: &mut dyn OutputSink,
        options: &RenderOptions,
    ) -> Result<(), RenderError> {
        let locale = options.locale.as_ref().unwrap_or(&self.config.locale);
        let template = self.template(name, locale)?;
        let mut env = Environment::builder(self.cache.interner())
            .provider(self)
            .capabilities(self.config.capabilities)
            .check_options(self.config.check_options.clone())
            .max_call_depth(self.config.max_call_depth)
            .locale(locale.clone())
            .time_zone(options.time_zone.unwrap_or(self.config.time_zone))
            .shared_variables(self.config.shared_variables.clone());
        if let Some(now) = options.now {
            env = env.now(now);
        }
        env.build().render(&template, data_model, sink).map_err(|err| {
            tracing::debug!(error = %err, "render failed");
            RenderError::from(err)
        })
    }

    /// Turn a host object into a template value with the configured
    /// object wrapper.
    pub fn wrap(&self, object: Arc<dyn Any + Send + Sync>) -> Result<Value, RenderError> {
        Ok(self.config.object_wrapper.wrap(object)?)
    }
}

impl TemplateProvider for Engine {
    fn get_template(&self, name: &str, locale: &Locale) -> Result<Arc<ValidatedTemplate>, EvalError> {
        self.cache
            .get(name, locale)
            .map_err(|err| template_load(name, err.reason()))
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new(Configuration::default())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .finish()
    }
}
