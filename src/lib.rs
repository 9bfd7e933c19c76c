//! Convert PostgreSQL `COPY ... FROM stdin` dumps into MySQL `INSERT`
//! statements and clean them up for import.

pub mod config;
pub mod convert;
pub mod error;
pub mod input;
pub mod logging;
pub mod parser;
pub mod passes;
pub mod pipeline;

pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::{Pipeline, PipelineOutput};
