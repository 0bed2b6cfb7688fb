// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! End-to-end tests through a real `SdkTracerProvider`: sampler, id
//! generator and drop-check processor wired together the way an
//! application would use them.

use std::sync::{Arc, Mutex};

use opentelemetry::{
    trace::{TraceContextExt, Tracer, TracerProvider as _},
    Context, KeyValue, TraceId,
};
use opentelemetry_sdk::{
    error::OTelSdkResult,
    trace::{SpanData, SpanProcessor, TracerProviderBuilder},
};
use tracedrop::Config;
use tracedrop_opentelemetry::{drop_span, tracer_provider};

/// Stands in for the exporting processor that normally sits downstream.
#[derive(Debug, Clone, Default)]
struct RecordingProcessor {
    spans: Arc<Mutex<Vec<SpanData>>>,
}

impl RecordingProcessor {
    fn names(&self) -> Vec<String> {
        self.spans
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.name.to_string())
            .collect()
    }
}

impl SpanProcessor for RecordingProcessor {
    fn on_start(&self, _span: &mut opentelemetry_sdk::trace::Span, _cx: &Context) {}

    fn on_end(&self, span: SpanData) {
        self.spans.lock().unwrap().push(span);
    }

    fn force_flush(&self) -> OTelSdkResult {
        Ok(())
    }

    fn shutdown(&self) -> OTelSdkResult {
        Ok(())
    }
}

fn pipeline(
    mut configure: impl FnMut(&mut tracedrop::configuration::ConfigBuilder),
) -> (opentelemetry_sdk::trace::SdkTracerProvider, RecordingProcessor) {
    let downstream = RecordingProcessor::default();
    let mut builder = Config::builder();
    configure(&mut builder);
    let provider = tracer_provider(
        builder.build(),
        TracerProviderBuilder::default(),
        downstream.clone(),
    );
    (provider, downstream)
}

#[test]
fn test_creation_time_drop_rejects_trace() {
    let (provider, downstream) = pipeline(|_| {});
    let tracer = provider.tracer("test");

    {
        let span = tracer
            .span_builder("not_interesting")
            .with_attributes([drop_span(true)])
            .start(&tracer);
        drop(span);
    }
    {
        let span = tracer.span_builder("interesting").start(&tracer);
        drop(span);
    }
    provider.shutdown().unwrap();

    assert_eq!(downstream.names(), ["interesting"]);
}

#[test]
fn test_child_inherits_parent_sampling_decision() {
    let (provider, downstream) = pipeline(|_| {});
    let tracer = provider.tracer("test");

    {
        let root = tracer.span_builder("root").start(&tracer);
        let _root_ctx = Context::current_with_span(root).attach();
        {
            // The creation-time marker is ignored on a span with a live
            // sampled parent; only trace-start decisions consult it
            let child = tracer
                .span_builder("child")
                .with_attributes([drop_span(false)])
                .start(&tracer);
            drop(child);
        }
    }
    provider.shutdown().unwrap();

    assert_eq!(downstream.names(), ["child", "root"]);
}

#[test]
fn test_completion_time_drop_discards_buffered_subtree() {
    let (provider, downstream) = pipeline(|_| {});
    let tracer = provider.tracer("test");

    {
        let root = tracer.span_builder("root").start(&tracer);
        let root_ctx = Context::current_with_span(root);
        let _guard = root_ctx.clone().attach();
        {
            let child = tracer.span_builder("child").start(&tracer);
            drop(child);
        }
        // The request turned out to be uninteresting; say so before the
        // root ends
        root_ctx.span().set_attribute(drop_span(true));
    }
    {
        let span = tracer.span_builder("unrelated").start(&tracer);
        drop(span);
    }
    provider.shutdown().unwrap();

    assert_eq!(downstream.names(), ["unrelated"]);
}

#[test]
fn test_configured_drop_attribute_is_honored() {
    let (provider, downstream) = pipeline(|builder| {
        builder.set_drop_span_attribute("request.discard".into());
    });
    let tracer = provider.tracer("test");

    {
        let span = tracer
            .span_builder("custom_marker")
            .with_attributes([KeyValue::new("request.discard", true)])
            .start(&tracer);
        drop(span);
    }
    {
        // The default marker key no longer means anything
        let span = tracer
            .span_builder("default_marker")
            .with_attributes([drop_span(true)])
            .start(&tracer);
        drop(span);
    }
    provider.shutdown().unwrap();

    assert_eq!(downstream.names(), ["default_marker"]);
}

#[test]
fn test_disabled_config_records_nothing() {
    let (provider, downstream) = pipeline(|builder| {
        builder.set_enabled(false);
    });
    let tracer = provider.tracer("test");

    {
        let span = tracer.span_builder("ignored").start(&tracer);
        drop(span);
    }
    provider.shutdown().unwrap();

    assert!(downstream.names().is_empty());
}

#[test]
fn test_exported_spans_carry_generated_identities() {
    let (provider, downstream) = pipeline(|_| {});
    let tracer = provider.tracer("test");

    {
        let span = tracer.span_builder("root").start(&tracer);
        drop(span);
    }
    provider.shutdown().unwrap();

    let spans = downstream.spans.lock().unwrap();
    assert_eq!(spans.len(), 1);
    let ctx = &spans[0].span_context;
    assert_ne!(ctx.trace_id(), TraceId::INVALID);
    assert_ne!(ctx.span_id(), opentelemetry::SpanId::INVALID);
    assert_eq!(spans[0].parent_span_id, opentelemetry::SpanId::INVALID);
}
