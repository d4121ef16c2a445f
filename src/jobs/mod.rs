// src/jobs/mod.rs

//! Render job discovery.
//!
//! - [`filter`] decides which immediate children of the source root are render
//!   roots for a pass (allow-list or regex patterns).
//! - [`descriptor`] defines the [`JobDescriptor`] handed to the orchestrator and
//!   the source-to-output directory mapping.

pub mod descriptor;
pub mod filter;

pub use descriptor::{output_dir_for, JobDescriptor};
pub use filter::{select_jobs, SelectionRule};
