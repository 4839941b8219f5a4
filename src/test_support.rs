//! Byte-level builders for fragmented-MP4 test fixtures.

/// Wrap `payload` in a box header with a 32-bit size.
pub(crate) fn boxed(typ: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + payload.len());
    out.extend_from_slice(&(8 + payload.len() as u32).to_be_bytes());
    out.extend_from_slice(typ);
    out.extend_from_slice(payload);
    out
}

/// Wrap `payload` in a box header that uses the 64-bit largesize form.
pub(crate) fn boxed_large(typ: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(16 + payload.len());
    out.extend_from_slice(&1u32.to_be_bytes());
    out.extend_from_slice(typ);
    out.extend_from_slice(&(16 + payload.len() as u64).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

pub(crate) fn tfhd(
    track_id: u32,
    default_sample_duration: Option<u32>,
    default_sample_size: Option<u32>,
) -> Vec<u8> {
    let mut flags = 0u32;
    if default_sample_duration.is_some() {
        flags |= 0x000008;
    }
    if default_sample_size.is_some() {
        flags |= 0x000010;
    }

    let mut body = Vec::new();
    body.extend_from_slice(&flags.to_be_bytes());
    body.extend_from_slice(&track_id.to_be_bytes());
    if let Some(duration) = default_sample_duration {
        body.extend_from_slice(&duration.to_be_bytes());
    }
    if let Some(size) = default_sample_size {
        body.extend_from_slice(&size.to_be_bytes());
    }
    boxed(b"tfhd", &body)
}

pub(crate) fn tfdt_v1(base_media_decode_time: u64) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&0x0100_0000u32.to_be_bytes());
    body.extend_from_slice(&base_media_decode_time.to_be_bytes());
    boxed(b"tfdt", &body)
}

/// A `trun` whose samples carry explicit duration, size, and composition
/// time offset (`(duration, size, cto)` per sample).
pub(crate) fn trun(version: u8, entries: &[(u32, u32, i32)]) -> Vec<u8> {
    let flags = 0x000100 | 0x000200 | 0x000800;
    let mut body = Vec::new();
    body.extend_from_slice(&((u32::from(version) << 24) | flags).to_be_bytes());
    body.extend_from_slice(&(entries.len() as u32).to_be_bytes());
    for &(duration, size, cto) in entries {
        body.extend_from_slice(&duration.to_be_bytes());
        body.extend_from_slice(&size.to_be_bytes());
        body.extend_from_slice(&(cto as u32).to_be_bytes());
    }
    boxed(b"trun", &body)
}

pub(crate) fn mfhd(sequence_number: u32) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&0u32.to_be_bytes());
    body.extend_from_slice(&sequence_number.to_be_bytes());
    boxed(b"mfhd", &body)
}

pub(crate) fn traf(children: &[Vec<u8>]) -> Vec<u8> {
    boxed(b"traf", &children.concat())
}

pub(crate) fn moof(sequence_number: u32, trafs: &[Vec<u8>]) -> Vec<u8> {
    let mut body = mfhd(sequence_number);
    for t in trafs {
        body.extend_from_slice(t);
    }
    boxed(b"moof", &body)
}

pub(crate) fn mdat(payload: &[u8]) -> Vec<u8> {
    boxed(b"mdat", payload)
}

/// A 4-byte-length-prefixed SEI NAL (type 6) around `rbsp`.
pub(crate) fn sei_nal(rbsp: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(5 + rbsp.len());
    out.extend_from_slice(&(1 + rbsp.len() as u32).to_be_bytes());
    out.push(0x06);
    out.extend_from_slice(rbsp);
    out
}
