// src/render/mod.rs

//! Render pass orchestration.
//!
//! - [`configuration`] holds the immutable engine settings shared by a pass.
//! - [`orchestrator`] dispatches jobs with bounded concurrency and waits for
//!   all of them.
//! - [`result`] aggregates per-job failures into a [`PassResult`].

pub mod configuration;
pub mod orchestrator;
pub mod result;

pub use configuration::RenderConfiguration;
pub use orchestrator::{RenderOrchestrator, RenderPlan};
pub use result::{JobFailure, PassFailure, PassResult};
