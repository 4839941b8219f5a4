//! `fmp4-sei` extracts timestamped H.264 SEI messages from fragmented MP4
//! (fMP4) media segments, the kind fetched by adaptive HTTP streaming
//! players.
//!
//! This crate provides:
//! - A stateful [`SeiExtractor`] that walks each segment's `moof`/`mdat`
//!   pairs, rebuilds per-sample decode/presentation timestamps from the
//!   track-fragment metadata, and surfaces every SEI message with its
//!   presentation time in seconds.
//! - A Tokio-based async `Stream` wrapper (enabled by default) for easy
//!   integration with async apps.
//!
//! The extractor consumes, but does not produce, the `trackId → timescale`
//! table of the stream's initialization segment; media segments fed in
//! before that table is known are cached and drained once the video track
//! is bound. SEI payload bytes are surfaced raw; interpreting a particular
//! payload type (CEA-608/708 captions, user data, …) is the consumer's job.
//!
//! ## Quick start (sync)
//! - Create a [`SeiExtractor`], call [`SeiExtractor::init`], then feed each
//!   media segment to [`SeiExtractor::parse`] together with the init
//!   segment's video track ids and timescales.
//! - Or use [`for_each_sei_event`] to walk a batch of segments with a
//!   callback.
//!
//! ## Quick start (async)
//! - Use [`stream_segments`] to get a Tokio `Stream` of events.
//!
//! ## Features
//! - `async` (default): enables Tokio stream helpers.

pub mod error;

mod mp4;
mod sei;

pub mod extract;

#[cfg(feature = "async")]
pub mod async_extract;

#[cfg(test)]
pub(crate) mod test_support;

pub use extract::{for_each_sei_event, LogLevel, LogRecord, ParseResult, SeiEvent, SeiExtractor};

pub use error::Error;

#[cfg(feature = "async")]
pub use async_extract::stream_segments;
