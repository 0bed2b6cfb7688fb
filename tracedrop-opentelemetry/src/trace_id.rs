// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::cell::RefCell;

use rand::{Rng, SeedableRng};

/// Generates span identities from random entropy.
///
/// Trace ids are 16 random bytes, span ids 8 random bytes; a span id is
/// never derived from the trace id it belongs to, so uniqueness is purely
/// probabilistic. Each thread seeds its own generator once from the OS,
/// which keeps generation safe under concurrent span creation with no
/// shared state.
#[derive(Debug)]
pub struct EntropyIdGenerator;

thread_local! {
    static RNG: RefCell<rand::rngs::SmallRng> = RefCell::new(rand::rngs::SmallRng::from_entropy());
}

impl opentelemetry_sdk::trace::IdGenerator for EntropyIdGenerator {
    fn new_trace_id(&self) -> opentelemetry::TraceId {
        let id = RNG.with(|rng| rng.borrow_mut().gen::<u128>());
        opentelemetry::TraceId::from_bytes(id.to_be_bytes())
    }

    fn new_span_id(&self) -> opentelemetry::SpanId {
        let id = RNG.with(|rng| rng.borrow_mut().gen::<u64>());
        opentelemetry::SpanId::from_bytes(id.to_be_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry_sdk::trace::IdGenerator;

    #[test]
    fn test_ids_are_distinct() {
        let generator = EntropyIdGenerator;
        let trace_ids: Vec<_> = (0..64).map(|_| generator.new_trace_id()).collect();
        let span_ids: Vec<_> = (0..64).map(|_| generator.new_span_id()).collect();

        for window in trace_ids.windows(2) {
            assert_ne!(window[0], window[1]);
        }
        for window in span_ids.windows(2) {
            assert_ne!(window[0], window[1]);
        }
    }

    #[test]
    fn test_ids_usable_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                std::thread::spawn(|| {
                    let generator = EntropyIdGenerator;
                    (generator.new_trace_id(), generator.new_span_id())
                })
            })
            .collect();

        let mut seen = std::collections::HashSet::new();
        for handle in handles {
            let (trace_id, span_id) = handle.join().unwrap();
            assert!(seen.insert(trace_id.to_bytes()));
            assert_ne!(span_id, opentelemetry::SpanId::INVALID);
        }
    }
}
