// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Completion-time half of the two-stage sampling system.
//!
//! Every finished span is buffered under its parent's identity until the
//! parent resolves the subtree: a root that finishes clean flushes its
//! buffered children downstream, a span that finishes carrying the drop
//! marker discards them. This allows a decision like "this request turned
//! out to be a cache hit, don't export it" to be taken after the spans
//! involved have already completed.

use std::{
    collections::HashMap,
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        mpsc::{self, Receiver, SyncSender},
        Arc, Mutex, RwLock, RwLockReadGuard,
    },
    thread,
};

use opentelemetry::SpanId;
use opentelemetry_sdk::{
    error::{OTelSdkError, OTelSdkResult},
    trace::{SpanData, SpanProcessor},
    Resource,
};
use tracedrop::Config;

use crate::sampler::contains_drop_marker;

/// A span identity: 16 trace id bytes followed by 8 span id bytes. Opaque,
/// only ever used as a map key.
type BufferKey = [u8; 24];

fn buffer_key(trace_id: opentelemetry::TraceId, span_id: SpanId) -> BufferKey {
    let mut key = [0_u8; 24];
    key[..16].copy_from_slice(&trace_id.to_bytes());
    key[16..].copy_from_slice(&span_id.to_bytes());
    key
}

/// Span processor that holds finished spans back until their parent
/// resolves whether the subtree is exported or discarded.
///
/// Finished spans are placed on a bounded queue and handled by a single
/// worker thread, which owns the span buffer outright; `on_end` never
/// blocks, and spans that arrive while the queue is full are silently
/// lost. Accepted spans are forwarded to the downstream processor `P`
/// from the worker thread, while `shutdown` and `force_flush` reach `P`
/// from the calling thread.
pub struct DropCheckSpanProcessor<P> {
    sender: RwLock<Option<SyncSender<SpanData>>>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
    shutdown: AtomicBool,
    overflow_count: AtomicUsize,
    next: Arc<RwLock<P>>,
}

impl<P> fmt::Debug for DropCheckSpanProcessor<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DropCheckSpanProcessor").finish()
    }
}

impl<P: SpanProcessor + 'static> DropCheckSpanProcessor<P> {
    /// Creates the processor and starts its worker thread. The worker runs
    /// until [`shutdown`](SpanProcessor::shutdown) closes the queue.
    pub fn new(config: &Config, next: P) -> Self {
        let (sender, receiver) = mpsc::sync_channel(config.max_queue_size());
        let next = Arc::new(RwLock::new(next));
        let worker = thread::spawn({
            let next = Arc::clone(&next);
            let drop_span_attribute = config.drop_span_attribute().to_string();
            move || {
                DropCheckWorker {
                    receiver,
                    buffered: HashMap::new(),
                    drop_span_attribute,
                    next,
                }
                .run()
            }
        });
        Self {
            sender: RwLock::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
            shutdown: AtomicBool::new(false),
            overflow_count: AtomicUsize::new(0),
            next,
        }
    }

    fn next(&self) -> Result<RwLockReadGuard<'_, P>, OTelSdkError> {
        self.next.read().map_err(|_| {
            OTelSdkError::InternalFailure(
                "DropCheckSpanProcessor: downstream processor lock poisoned".to_string(),
            )
        })
    }
}

impl<P: SpanProcessor + 'static> SpanProcessor for DropCheckSpanProcessor<P> {
    // Only completions are observed
    fn on_start(&self, _span: &mut opentelemetry_sdk::trace::Span, _cx: &opentelemetry::Context) {}

    fn on_end(&self, span: SpanData) {
        if self.shutdown.load(Ordering::Relaxed) {
            return;
        }
        let Ok(sender) = self.sender.read() else {
            return;
        };
        let Some(sender) = sender.as_ref() else {
            return;
        };
        if sender.try_send(span).is_err() {
            // Queue full: the span is lost, and that is not a fault the
            // application should ever observe
            self.overflow_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Blocks until every span already enqueued has been handled, then
    /// shuts the downstream processor down and returns its result.
    fn shutdown(&self) -> OTelSdkResult {
        self.shutdown.store(true, Ordering::Relaxed);
        // Dropping the sender closes the queue: the worker drains whatever
        // is left and exits
        drop(
            self.sender
                .write()
                .map_err(|_| {
                    OTelSdkError::InternalFailure(
                        "DropCheckSpanProcessor.shutdown: sender lock poisoned".to_string(),
                    )
                })?
                .take(),
        );
        let worker = self
            .worker
            .lock()
            .map_err(|_| {
                OTelSdkError::InternalFailure(
                    "DropCheckSpanProcessor.shutdown: worker handle lock poisoned".to_string(),
                )
            })?
            .take()
            .ok_or(OTelSdkError::AlreadyShutdown)?;
        worker.join().map_err(|panic| {
            let message = panic
                .downcast_ref::<String>()
                .map(String::as_str)
                .or_else(|| panic.downcast_ref::<&str>().copied())
                .unwrap_or("error message unknown");
            OTelSdkError::InternalFailure(format!(
                "DropCheckSpanProcessor.shutdown: worker panicked: {message}"
            ))
        })?;
        let lost = self.overflow_count.load(Ordering::Relaxed);
        if lost > 0 {
            tracedrop::td_debug!(
                "DropCheckSpanProcessor: {} spans were lost to a full ingestion queue",
                lost
            );
        }
        self.next()?.shutdown()
    }

    /// Passes through to the downstream processor. The internal span
    /// buffer is opaque to flush semantics.
    fn force_flush(&self) -> OTelSdkResult {
        self.next()?.force_flush()
    }

    fn set_resource(&mut self, resource: &Resource) {
        if let Ok(mut next) = self.next.write() {
            next.set_resource(resource);
        }
    }
}

struct DropCheckWorker<P> {
    receiver: Receiver<SpanData>,
    /// Finished spans keyed by the identity of the parent they wait on,
    /// in arrival order. Owned by this thread alone, hence no lock.
    buffered: HashMap<BufferKey, Vec<SpanData>>,
    drop_span_attribute: String,
    next: Arc<RwLock<P>>,
}

impl<P: SpanProcessor> DropCheckWorker<P> {
    fn run(mut self) {
        while let Ok(span) = self.receiver.recv() {
            self.process(span);
        }
        // The queue is closed and fully drained at this point
        if !self.buffered.is_empty() {
            let unresolved: usize = self.buffered.values().map(Vec::len).sum();
            tracedrop::td_debug!(
                "DropCheckSpanProcessor: discarding {} buffered spans whose root never completed",
                unresolved
            );
        }
    }

    fn process(&mut self, span: SpanData) {
        if contains_drop_marker(&span.attributes, &self.drop_span_attribute) {
            // The span vetoes its own subtree: discard it together with
            // every direct child buffered under it, and whatever those
            // children were buffering in turn
            let key = buffer_key(span.span_context.trace_id(), span.span_context.span_id());
            if let Some(children) = self.buffered.remove(&key) {
                for child in &children {
                    self.buffered.remove(&buffer_key(
                        child.span_context.trace_id(),
                        child.span_context.span_id(),
                    ));
                }
            }
            return;
        }

        if span.parent_span_id == SpanId::INVALID {
            // Trace root: flush the buffered direct children in completion
            // order, then the root itself. Resolution is one level deep:
            // a child's own buffer is dropped, not forwarded.
            let key = buffer_key(span.span_context.trace_id(), span.span_context.span_id());
            let next = self
                .next
                .read()
                .expect("downstream span processor lock poisoned");
            if let Some(children) = self.buffered.remove(&key) {
                for child in children {
                    self.buffered.remove(&buffer_key(
                        child.span_context.trace_id(),
                        child.span_context.span_id(),
                    ));
                    next.on_end(child);
                }
            }
            next.on_end(span);
            return;
        }

        let key = buffer_key(span.span_context.trace_id(), span.parent_span_id);
        self.buffered.entry(key).or_default().push(span);
    }
}
