// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::{borrow::Cow, ops::Deref, sync::OnceLock};

use super::sources::{CompositeConfigSourceResult, CompositeSource};
use crate::{constants, log::LevelFilter};

#[derive(Debug, Clone)]
#[non_exhaustive]
/// Configuration for the span pipeline
///
/// This represents the finalized configuration, pulled from the process
/// environment with manual overrides applied on top.
///
/// # Usage
/// ```
/// use tracedrop::Config;
///
/// // This pulls configuration from the environment
/// let mut builder = Config::builder();
///
/// // Manual overrides
/// builder
///     .set_service("my-service".to_string())
///     .set_max_queue_size(4096);
///
/// // Finalize the configuration
/// let config = builder.build();
/// ```
pub struct Config {
    // # Global
    runtime_id: &'static str,

    // # Service tagging
    service: String,
    env: Option<String>,
    version: Option<String>,

    // # Pipeline
    /// The span attribute that marks a finished span and its buffered
    /// children for discard
    drop_span_attribute: Cow<'static, str>,
    /// Capacity of the completed-span ingestion queue; spans that arrive
    /// while the queue is full are silently lost
    max_queue_size: usize,
    /// Disables the library if this is false
    enabled: bool,
    /// The level at which the library will log
    log_level_filter: LevelFilter,
}

impl Config {
    fn from_sources(sources: &CompositeSource) -> Self {
        let default = Config::default();

        /// Helper function to convert a CompositeConfigSourceResult<T> into an
        /// Option<T>. This drops the origin and the errors collected while
        /// parsing the value.
        fn to_val<T>(res: CompositeConfigSourceResult<T>) -> Option<T> {
            res.value.map(|c| c.value)
        }

        Self {
            runtime_id: default.runtime_id,
            service: to_val(sources.get("TRACEDROP_SERVICE")).unwrap_or(default.service),
            env: to_val(sources.get("TRACEDROP_ENV")).or(default.env),
            version: to_val(sources.get("TRACEDROP_VERSION")).or(default.version),
            drop_span_attribute: to_val(sources.get("TRACEDROP_DROP_ATTRIBUTE"))
                .map(Cow::Owned)
                .unwrap_or(default.drop_span_attribute),
            max_queue_size: to_val(sources.get_parse("TRACEDROP_MAX_QUEUE_SIZE"))
                .unwrap_or(default.max_queue_size),
            enabled: to_val(sources.get_parse("TRACEDROP_ENABLED")).unwrap_or(default.enabled),
            log_level_filter: to_val(sources.get_parse("TRACEDROP_LOG_LEVEL"))
                .unwrap_or(default.log_level_filter),
        }
    }

    pub(crate) fn builder_with_sources(sources: &CompositeSource) -> ConfigBuilder {
        ConfigBuilder {
            config: Config::from_sources(sources),
        }
    }

    /// Creates a new builder to set overrides on the detected configuration
    pub fn builder() -> ConfigBuilder {
        Self::builder_with_sources(&CompositeSource::default_sources())
    }

    pub fn runtime_id(&self) -> &str {
        self.runtime_id
    }

    pub fn service(&self) -> &str {
        self.service.deref()
    }

    pub fn env(&self) -> Option<&str> {
        self.env.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn drop_span_attribute(&self) -> &str {
        self.drop_span_attribute.deref()
    }

    pub fn max_queue_size(&self) -> usize {
        self.max_queue_size
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn log_level_filter(&self) -> LevelFilter {
        self.log_level_filter
    }

    /// Static runtime id of the process
    fn process_runtime_id() -> &'static str {
        static RUNTIME_ID: OnceLock<String> = OnceLock::new();
        RUNTIME_ID.get_or_init(|| uuid::Uuid::new_v4().to_string())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            runtime_id: Config::process_runtime_id(),
            service: "unnamed-rust-service".to_string(),
            env: None,
            version: None,

            drop_span_attribute: Cow::Borrowed(constants::DROP_SPAN_ATTRIBUTE),
            max_queue_size: constants::DEFAULT_MAX_QUEUE_SIZE,
            enabled: true,
            log_level_filter: LevelFilter::default(),
        }
    }
}

pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Finalizes the builder and returns the configuration
    pub fn build(self) -> Config {
        self.config
    }

    pub fn set_service(&mut self, service: String) -> &mut Self {
        self.config.service = service;
        self
    }

    pub fn set_env(&mut self, env: String) -> &mut Self {
        self.config.env = Some(env);
        self
    }

    pub fn set_version(&mut self, version: String) -> &mut Self {
        self.config.version = Some(version);
        self
    }

    pub fn set_drop_span_attribute(&mut self, attribute: Cow<'static, str>) -> &mut Self {
        self.config.drop_span_attribute = attribute;
        self
    }

    pub fn set_max_queue_size(&mut self, max_queue_size: usize) -> &mut Self {
        self.config.max_queue_size = max_queue_size;
        self
    }

    pub fn set_enabled(&mut self, enabled: bool) -> &mut Self {
        self.config.enabled = enabled;
        self
    }

    pub fn set_log_level_filter(&mut self, log_level_filter: LevelFilter) -> &mut Self {
        self.config.log_level_filter = log_level_filter;
        self
    }
}
