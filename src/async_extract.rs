#![cfg(feature = "async")]

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::extract::{SeiEvent, SeiExtractor};

/// Create a Tokio `Stream` of SEI events from a sequence of media segments.
///
/// This API is enabled by default (crate feature `async`).
///
/// Implementation detail: extraction is synchronous, CPU-bound byte parsing,
/// so this function runs a dedicated extractor on a blocking thread
/// (`tokio::task::spawn_blocking`) and forwards events over a bounded
/// channel.
///
/// `buffer` controls the channel capacity. Larger buffers can improve
/// throughput if the consumer occasionally stalls.
///
/// Log records are not forwarded; drive [`SeiExtractor::parse`] directly if
/// you need them.
pub fn stream_segments<I>(
    segments: I,
    video_track_ids: Vec<u32>,
    timescales: HashMap<u32, u32>,
    buffer: usize,
) -> ReceiverStream<SeiEvent>
where
    I: IntoIterator<Item = Vec<u8>> + Send + 'static,
    I::IntoIter: Send,
{
    let (tx, rx) = mpsc::channel(buffer.max(1));

    tokio::task::spawn_blocking(move || {
        let mut extractor = SeiExtractor::new();
        extractor.init();

        for segment in segments {
            let Some(result) = extractor.parse(&segment, &video_track_ids, &timescales) else {
                continue;
            };
            for event in result.sei {
                if tx.blocking_send(event).is_err() {
                    return;
                }
            }
        }
    });

    ReceiverStream::new(rx)
}
