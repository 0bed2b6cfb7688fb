// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Drop-aware span pipeline for the OpenTelemetry SDK.
//!
//! Two-stage sampling: [`AttributeDropSampler`] rejects a trace at
//! creation when the caller already knows it is uninteresting, and
//! [`DropCheckSpanProcessor`] lets any span discard its buffered subtree
//! *after* completion by carrying the drop marker — for code paths whose
//! relevance is only known once the work has run (cache hits, health
//! checks, ...). Span export stays with whatever processor is composed
//! downstream.
//!
//! # Usage
//! ```
//! # use opentelemetry_sdk::error::OTelSdkResult;
//! # use opentelemetry_sdk::trace::{SpanData, SpanProcessor, TracerProviderBuilder};
//! # #[derive(Debug)]
//! # struct NoopProcessor;
//! # impl SpanProcessor for NoopProcessor {
//! #     fn on_start(&self, _: &mut opentelemetry_sdk::trace::Span, _: &opentelemetry::Context) {}
//! #     fn on_end(&self, _: SpanData) {}
//! #     fn force_flush(&self) -> OTelSdkResult { Ok(()) }
//! #     fn shutdown(&self) -> OTelSdkResult { Ok(()) }
//! # }
//! // This picks up env var configuration
//! let config = tracedrop::Config::builder().build();
//!
//! // The downstream processor performs the actual export, e.g. a
//! // batching exporter processor
//! let provider = tracedrop_opentelemetry::init(
//!     config,
//!     TracerProviderBuilder::default(), // Pass any OpenTelemetry specific configuration here
//!     NoopProcessor,
//! );
//! # let _ = provider;
//! ```

mod sampler;
mod span_processor;
mod trace_id;

pub use sampler::{drop_span, AttributeDropSampler};
pub use span_processor::DropCheckSpanProcessor;
pub use trace_id::EntropyIdGenerator;

use opentelemetry::KeyValue;
use opentelemetry_sdk::{
    trace::{Sampler, SdkTracerProvider, SpanProcessor, TracerProviderBuilder},
    Resource,
};
use opentelemetry_semantic_conventions::attribute::{
    DEPLOYMENT_ENVIRONMENT_NAME, SERVICE_INSTANCE_ID, SERVICE_VERSION,
};
use tracedrop::Config;

/// Initialize the drop-aware span pipeline.
///
/// Builds the tracer provider via [`tracer_provider`] and installs it as
/// the global OpenTelemetry provider.
pub fn init<P: SpanProcessor + 'static>(
    config: Config,
    tracer_provider_builder: TracerProviderBuilder,
    next: P,
) -> SdkTracerProvider {
    let provider = tracer_provider(config, tracer_provider_builder, next);
    opentelemetry::global::set_tracer_provider(provider.clone());
    provider
}

/// Create an instance of the tracer provider.
///
/// The provider samples with a parent-based [`AttributeDropSampler`],
/// generates identities with [`EntropyIdGenerator`], and routes every
/// finished span through a [`DropCheckSpanProcessor`] in front of `next`.
pub fn tracer_provider<P: SpanProcessor + 'static>(
    config: Config,
    mut tracer_provider_builder: TracerProviderBuilder,
    next: P,
) -> SdkTracerProvider {
    tracedrop::log::set_max_level(config.log_level_filter());

    let sampler = if config.enabled() {
        Sampler::ParentBased(Box::new(AttributeDropSampler::new(
            config.drop_span_attribute().to_string(),
        )))
    } else {
        // If the library has been disabled, every trace-start decision is
        // a Drop: spans store no data and never reach the processors
        Sampler::AlwaysOff
    };

    tracer_provider_builder = tracer_provider_builder
        .with_resource(build_resource(&config))
        .with_id_generator(EntropyIdGenerator)
        .with_sampler(sampler)
        .with_span_processor(DropCheckSpanProcessor::new(&config, next));
    tracer_provider_builder.build()
}

fn build_resource(config: &Config) -> Resource {
    let mut builder = Resource::builder()
        .with_service_name(config.service().to_string())
        .with_attribute(KeyValue::new(
            SERVICE_INSTANCE_ID,
            config.runtime_id().to_string(),
        ));
    if let Some(env) = config.env() {
        builder = builder.with_attribute(KeyValue::new(
            DEPLOYMENT_ENVIRONMENT_NAME,
            env.to_string(),
        ));
    }
    if let Some(version) = config.version() {
        builder = builder.with_attribute(KeyValue::new(SERVICE_VERSION, version.to_string()));
    }
    builder.build()
}
