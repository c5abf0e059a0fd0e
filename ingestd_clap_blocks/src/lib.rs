//! Building blocks for [`clap`]-driven configs.
//!
//! Each block is a [`clap::Parser`] meant to be `#[clap(flatten)]`ed into a command config. Every
//! flag has an `INGESTD_*` environment variable fallback.
pub mod object_store;
pub mod source;
pub mod tokio;
