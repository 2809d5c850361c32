//! Command line front end for tidyload.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod progress;
pub mod summary;
