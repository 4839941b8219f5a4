use crate::extract::LogRecord;
use crate::mp4::Sample;

// -----------------------------
// NAL + SEI parsing
// -----------------------------

const NAL_UNIT_TYPE_SEI: u8 = 6;

/// An H.264 SEI NAL located inside an `mdat`, stamped with the timestamps of
/// the sample whose byte range contains it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SeiNal<'a> {
    pub(crate) track_id: u32,
    /// NAL payload, excluding the one-byte NAL header.
    #[allow(dead_code)]
    pub(crate) raw_data: &'a [u8],
    /// Same bytes with emulation-prevention bytes removed.
    pub(crate) escaped_rbsp: Vec<u8>,
    pub(crate) dts: i64,
    pub(crate) pts: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SeiMessage {
    pub(crate) payload_type: u32,
    pub(crate) payload_size: u32,
    pub(crate) payload: Vec<u8>,
}

/// Remove emulation prevention bytes: the 0x03 of every `00 00 03` triple.
pub(crate) fn remove_emulation_prevention(rbsp: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(rbsp.len());
    let mut zeros = 0usize;

    for &b in rbsp {
        if zeros >= 2 && b == 0x03 {
            zeros = 0;
            continue;
        }
        out.push(b);
        if b == 0x00 {
            zeros += 1;
        } else {
            zeros = 0;
        }
    }
    out
}

fn timestamps_for_offset(samples: &[Sample], offset: usize) -> Option<(i64, i64)> {
    let mut cumulative = 0usize;
    for sample in samples {
        cumulative += sample.size as usize;
        if cumulative > offset {
            return Some((sample.dts, sample.pts));
        }
    }
    None
}

/// Walk an `mdat` payload as 4-byte-length-prefixed NAL units and collect the
/// SEI NALs, timestamped from `samples` by byte offset.
///
/// A zero length prefix advances past itself rather than aborting the scan.
/// A NAL whose offset lies past every sample reuses the previous match; with
/// no previous match it is dropped under a warn log, since its timestamp
/// cannot be reconstructed.
pub(crate) fn find_sei_nals<'a>(
    mdat: &'a [u8],
    samples: &[Sample],
    track_id: u32,
    logs: &mut Vec<LogRecord>,
) -> Vec<SeiNal<'a>> {
    let mut nals = Vec::new();
    let mut last_match: Option<(i64, i64)> = None;

    let mut i = 0usize;
    while i + 4 <= mdat.len() {
        let length = u32::from_be_bytes(mdat[i..i + 4].try_into().unwrap()) as usize;
        if length == 0 {
            i += 4;
            continue;
        }
        i += 4;
        if i >= mdat.len() {
            break;
        }

        let nal_end = (i + length).min(mdat.len());
        let nal_type = mdat[i] & 0x1f;
        if nal_type == NAL_UNIT_TYPE_SEI {
            match timestamps_for_offset(samples, i).or(last_match) {
                Some((dts, pts)) => {
                    last_match = Some((dts, pts));
                    let raw_data = &mdat[i + 1..nal_end];
                    nals.push(SeiNal {
                        track_id,
                        raw_data,
                        escaped_rbsp: remove_emulation_prevention(raw_data),
                        dts,
                        pts,
                    });
                }
                None => {
                    logs.push(LogRecord::warn(format!(
                        "SEI without matching sample at offset {i} for trackId {track_id}; dropping"
                    )));
                }
            }
        }

        // Non-SEI NALs are skipped by the same advance.
        i = nal_end;
    }

    nals
}

/// Split an escaped RBSP into SEI messages (ITU-T H.264 7.3.2.3.1).
///
/// Payload type and size use ff-coded accumulation. A size that would run
/// past the buffer clamps the payload to the bytes available; a zero size
/// (stop bit, zero padding) emits nothing.
pub(crate) fn parse_sei_messages(rbsp: &[u8]) -> Vec<SeiMessage> {
    let mut messages = Vec::new();
    let mut i = 0usize;

    while i < rbsp.len() {
        let mut payload_type = 0u32;
        while i < rbsp.len() && rbsp[i] == 0xff {
            payload_type += 255;
            i += 1;
        }
        if i >= rbsp.len() {
            break;
        }
        payload_type += u32::from(rbsp[i]);
        i += 1;

        let mut payload_size = 0u32;
        while i < rbsp.len() && rbsp[i] == 0xff {
            payload_size += 255;
            i += 1;
        }
        if i >= rbsp.len() {
            break;
        }
        payload_size += u32::from(rbsp[i]);
        i += 1;

        if payload_size > 0 {
            let end = (i + payload_size as usize).min(rbsp.len());
            messages.push(SeiMessage {
                payload_type,
                payload_size,
                payload: rbsp[i..end].to_vec(),
            });
        }

        i += payload_size as usize;
    }

    messages
}
