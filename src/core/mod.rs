//! Core domain models for the release pipeline
//!
//! This module defines the pipeline definition, its steps, the triggering
//! event, step conditions and run state.

pub mod condition;
pub mod config;
pub mod context;
pub mod pipeline;
pub mod state;
pub mod step;
pub mod trigger;

pub use context::*;
pub use pipeline::*;
pub use state::*;
pub use step::*;
pub use trigger::*;
