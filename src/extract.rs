use std::collections::{HashMap, VecDeque};

use serde::Serialize;

use crate::mp4::{build_fragment_samples, find_box, parse_tfdt, parse_tfhd, parse_trun};
use crate::sei::{find_sei_nals, parse_sei_messages};

/// Severity of a [`LogRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Warn,
    Info,
}

/// Diagnostic attached to a [`ParseResult`] where data was skipped or lost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
}

impl LogRecord {
    pub(crate) fn warn(message: String) -> Self {
        LogRecord {
            level: LogLevel::Warn,
            message,
        }
    }
}

/// A single decoded SEI message with its presentation time.
///
/// One SEI NAL may carry zero, one, or multiple messages; each is surfaced
/// as a separate event. The payload bytes are not interpreted here, that is
/// the consumer's job (e.g. a CEA-608/708 decoder).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeiEvent {
    /// Presentation time in seconds: the NAL's pts divided by the track
    /// timescale.
    pub pts: f64,
    pub payload_type: u32,
    pub payload_size: u32,
    pub payload: Vec<u8>,
}

/// Everything one [`SeiExtractor::parse`] call produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParseResult {
    pub sei: Vec<SeiEvent>,
    pub logs: Vec<LogRecord>,
}

/// Stateful extractor for in-band SEI messages in fMP4 media segments.
///
/// The extractor binds to a single video track, reported by whichever
/// component parses the stream's initialization segment. Media segments fed
/// in before that binding is known are cached and drained once it is.
///
/// This type is synchronous; `parse` takes `&mut self`, so concurrent calls
/// against one extractor are ruled out by the borrow checker.
pub struct SeiExtractor {
    initialized: bool,
    track_id: Option<u32>,
    timescale: Option<u32>,
    segment_cache: VecDeque<Vec<u8>>,
}

impl Default for SeiExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl SeiExtractor {
    pub fn new() -> Self {
        SeiExtractor {
            initialized: false,
            track_id: None,
            timescale: None,
            segment_cache: VecDeque::new(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Mark the extractor ready to accept segments. Idempotent.
    pub fn init(&mut self) {
        self.initialized = true;
    }

    /// Whether `parse` would (re)bind the tracked video track: true when the
    /// first reported track id, or its timescale, differs from the current
    /// binding. Always false when either input is empty.
    pub fn is_new_init(&self, video_track_ids: &[u32], timescales: &HashMap<u32, u32>) -> bool {
        if video_track_ids.is_empty() || timescales.is_empty() {
            return false;
        }
        let first = video_track_ids[0];
        self.track_id != Some(first) || self.timescale != timescales.get(&first).copied()
    }

    /// Extract timestamped SEI events from one media segment.
    ///
    /// `video_track_ids` lists the video tracks declared by the init
    /// segment (only the first is used); `timescales` maps track ids to
    /// ticks per second.
    ///
    /// Returns `None` when the extractor is uninitialized, when no video
    /// track binding exists yet (the segment bytes are then cached, and
    /// copied, until an init segment arrives), or when the segment yielded
    /// neither events nor diagnostics. The cache is unbounded; callers
    /// feeding untrusted input should bound segment sizes themselves.
    ///
    /// Malformed structures never fail the call: affected track fragments
    /// or NALs are skipped, surfacing warn records in [`ParseResult::logs`].
    pub fn parse(
        &mut self,
        segment: &[u8],
        video_track_ids: &[u32],
        timescales: &HashMap<u32, u32>,
    ) -> Option<ParseResult> {
        if !self.initialized {
            return None;
        }

        if self.is_new_init(video_track_ids, timescales) {
            // Only the first video track is tracked; there is no mechanism
            // for switching mid-stream.
            let track_id = video_track_ids[0];
            self.track_id = Some(track_id);
            self.timescale = timescales.get(&track_id).copied();
        }

        let (track_id, timescale) = match (self.track_id, self.timescale) {
            (Some(id), Some(ts)) if ts > 0 => (id, ts),
            // No usable binding yet: hold the segment until an init segment
            // provides one.
            _ => {
                self.segment_cache.push_back(segment.to_vec());
                return None;
            }
        };

        let mut result = ParseResult::default();

        // Drain oldest-first so events come out in arrival order.
        while let Some(cached) = self.segment_cache.pop_front() {
            parse_segment(&cached, track_id, timescale, &mut result);
        }
        parse_segment(segment, track_id, timescale, &mut result);

        if result.sei.is_empty() && result.logs.is_empty() {
            return None;
        }
        Some(result)
    }

    /// Drop the track binding and any cached segments. The initialized flag
    /// survives; feed the next init segment's tracks to rebind.
    pub fn reset(&mut self) {
        self.track_id = None;
        self.timescale = None;
        self.segment_cache.clear();
    }
}

fn parse_segment(segment: &[u8], track_id: u32, timescale: u32, out: &mut ParseResult) {
    let trafs = find_box(segment, &[b"moof", b"traf"]);
    let mdats = find_box(segment, &[b"mdat"]);

    // Pairing is positional: the n-th mdat carries the n-th traf's samples.
    for (mdat, traf) in mdats.into_iter().zip(trafs) {
        let tfhd = match find_box(traf, &[b"tfhd"]).first().map(|b| parse_tfhd(b)) {
            Some(Ok(tfhd)) => tfhd,
            Some(Err(e)) => {
                out.logs
                    .push(LogRecord::warn(format!("skipping track fragment: {e}")));
                continue;
            }
            None => continue,
        };
        if tfhd.track_id != track_id {
            continue;
        }

        let base_media_decode_time = match find_box(traf, &[b"tfdt"]).first().map(|b| parse_tfdt(b))
        {
            Some(Ok(time)) => time,
            Some(Err(e)) => {
                out.logs
                    .push(LogRecord::warn(format!("skipping track fragment: {e}")));
                continue;
            }
            None => 0,
        };

        let trun_boxes = find_box(traf, &[b"trun"]);
        if trun_boxes.is_empty() {
            continue;
        }
        let mut truns = Vec::with_capacity(trun_boxes.len());
        for trun in trun_boxes {
            match parse_trun(trun) {
                Ok(run) => truns.push(run),
                Err(e) => out
                    .logs
                    .push(LogRecord::warn(format!("skipping track run: {e}"))),
            }
        }

        let samples = build_fragment_samples(&tfhd, base_media_decode_time, &truns);
        for nal in find_sei_nals(mdat, &samples, track_id, &mut out.logs) {
            for message in parse_sei_messages(&nal.escaped_rbsp) {
                out.sei.push(SeiEvent {
                    pts: nal.pts as f64 / f64::from(timescale),
                    payload_type: message.payload_type,
                    payload_size: message.payload_size,
                    payload: message.payload,
                });
            }
        }
    }
}

/// Run a fresh extractor over a sequence of media segments and invoke a
/// callback per event. Log records are discarded; drive
/// [`SeiExtractor::parse`] directly if you need them.
pub fn for_each_sei_event<'a, I>(
    segments: I,
    video_track_ids: &[u32],
    timescales: &HashMap<u32, u32>,
    mut f: impl FnMut(SeiEvent),
) where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut extractor = SeiExtractor::new();
    extractor.init();

    for segment in segments {
        if let Some(result) = extractor.parse(segment, video_track_ids, timescales) {
            for event in result.sei {
                f(event);
            }
        }
    }
}
