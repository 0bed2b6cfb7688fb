// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Well-known boolean span attribute: set to `true` on any span before it
/// ends to discard that span and its buffered direct children instead of
/// exporting them.
pub const DROP_SPAN_ATTRIBUTE: &str = "span.drop";

/// Default capacity of the completed-span ingestion queue.
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 2048;
