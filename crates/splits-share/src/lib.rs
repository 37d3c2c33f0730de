//! Sharing and fetching runs through the splits.io v4 API.
//!
//! Run files are moved as opaque bytes; parsing them belongs to the timer.

mod client;
mod error;

pub use client::{SplitsIoClient, DEFAULT_API_BASE, ORIGINAL_TIMER_MIME};
pub use error::{DownloadError, UploadError};
