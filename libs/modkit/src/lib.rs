//! # ModKit
//!
//! Small toolkit shared by the server modules: phase contracts
//! (migrate → init → REST), the per-module context, the typed operation
//! builder, RFC 9457 problem responses and shutdown signal handling.

pub use anyhow::Result;
pub use async_trait::async_trait;

pub mod context;
pub use context::{ConfigProvider, ModuleCtx, ModuleCtxBuilder};

// Core module contracts and traits
pub mod contracts;
pub use crate::contracts::*;

pub mod api;
pub use api::problem::{Problem, ProblemResponse, ValidationError};
pub use api::{OpenApiRegistry, OperationBuilder};

pub mod runtime;
pub use runtime::shutdown::{cancel_on_shutdown, wait_for_shutdown};
