//! Library side of the `rcm` binary: configuration, logging and the staged
//! warehouse build.

pub mod config;
pub mod logging;
pub mod pipeline;
pub mod types;
