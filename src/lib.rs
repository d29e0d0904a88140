//! Move the top-level modules of a Python source tree under a package prefix
//! and keep every import consistent while doing it.

pub mod applier;
pub mod commands;
pub mod config;
pub mod error;
pub mod index;
pub mod logging;
pub mod planner;
pub mod refactor;
pub mod report;
pub mod ui;

pub use error::{PrefixError, Result};
