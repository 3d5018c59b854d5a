#![forbid(unsafe_code)]

//! Counter playground for statewire.
//!
//! Four counters, each owned a different way:
//!
//! 1. view-local state ([`Observable`](statewire_runtime::Observable)),
//! 2. a field of the view model container,
//! 3. a field of a value-type record inside the view model,
//! 4. a field of a child container embedded in the view model.
//!
//! The [`render::Renderer`] subscribes once and re-reads the whole view on
//! every pulse, which shows which mutations reach it and how often.

pub mod app;
pub mod cli;
pub mod render;
