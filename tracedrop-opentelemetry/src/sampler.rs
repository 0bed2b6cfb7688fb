// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Creation-time half of the two-stage sampling system: rejects a trace
//! before any span is recorded when the caller already knows it is
//! uninteresting. The completion-time half lives in
//! [`crate::DropCheckSpanProcessor`].

use std::borrow::Cow;

use opentelemetry::{trace::TraceContextExt, KeyValue, Value};
use opentelemetry_sdk::trace::ShouldSample;

use tracedrop::constants::DROP_SPAN_ATTRIBUTE;

/// Constructs the well-known marker attribute. Attach it at span creation
/// to reject the whole trace up front, or set it on a live span before it
/// ends to discard that span and its buffered children at export time.
pub fn drop_span(value: bool) -> KeyValue {
    KeyValue::new(DROP_SPAN_ATTRIBUTE, value)
}

pub(crate) fn contains_drop_marker(attributes: &[KeyValue], key: &str) -> bool {
    attributes
        .iter()
        .any(|kv| kv.key.as_str() == key && matches!(kv.value, Value::Bool(true)))
}

/// Sampler that drops a span when its creation-time attributes carry the
/// drop marker set to `true`, and records it otherwise.
///
/// Intended as the root delegate of a
/// [`Sampler::ParentBased`](opentelemetry_sdk::trace::Sampler::ParentBased)
/// composition: a span with a live, sampled parent inherits the parent's
/// decision unconditionally, so this logic only governs trace-start
/// decisions.
#[derive(Debug, Clone)]
pub struct AttributeDropSampler {
    attribute: Cow<'static, str>,
}

impl AttributeDropSampler {
    pub fn new(attribute: impl Into<Cow<'static, str>>) -> Self {
        Self {
            attribute: attribute.into(),
        }
    }
}

impl Default for AttributeDropSampler {
    fn default() -> Self {
        Self::new(DROP_SPAN_ATTRIBUTE)
    }
}

impl ShouldSample for AttributeDropSampler {
    fn should_sample(
        &self,
        parent_context: Option<&opentelemetry::Context>,
        _trace_id: opentelemetry::trace::TraceId,
        _name: &str,
        _span_kind: &opentelemetry::trace::SpanKind,
        attributes: &[opentelemetry::KeyValue],
        _links: &[opentelemetry::trace::Link],
    ) -> opentelemetry::trace::SamplingResult {
        let decision = if contains_drop_marker(attributes, &self.attribute) {
            opentelemetry::trace::SamplingDecision::Drop
        } else {
            opentelemetry::trace::SamplingDecision::RecordAndSample
        };

        opentelemetry::trace::SamplingResult {
            decision,
            attributes: Vec::new(),
            // The parent's trace state travels through unchanged whatever
            // the decision, so downstream systems see a consistent value
            trace_state: parent_context
                .map(|c| c.span().span_context().trace_state().clone())
                .unwrap_or_default(),
        }
    }
}
