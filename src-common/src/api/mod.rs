//! HTTP client for the journaling backend.

mod client;
mod error;
mod requests;
mod responses;

pub use client::*;
pub use error::*;
pub use requests::*;
pub use responses::{Acknowledgement, MetaUpdated, TranscriptText};
