#![forbid(unsafe_code)]

//! Core: logging setup and environment configuration.
//!
//! # Role in statewire
//! `statewire-core` holds the ambient pieces every binary needs before any
//! state is created: a `tracing` subscriber configured from the
//! environment, and small helpers for reading typed overrides from
//! environment variables through an injectable lookup (so tests never touch
//! the real process environment).

pub mod env;
pub mod logging;

// Re-export tracing macros at crate root for ergonomic use.
pub use logging::{
    debug, debug_span, error, error_span, info, info_span, trace, trace_span, warn, warn_span,
};
