// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Core configuration and logging for the tracedrop span pipeline.
//!
//! The OpenTelemetry integration lives in the `tracedrop-opentelemetry`
//! crate; this crate carries the pieces that do not depend on the
//! OpenTelemetry API.

pub mod configuration;
pub mod constants;
pub use configuration::Config;

pub mod log;
