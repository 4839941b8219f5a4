use crate::Error;

// -----------------------------
// fMP4 parsing (minimal ISO-BMFF)
// -----------------------------

// tf_flags bits, ISO-BMFF 8.8.7
const TFHD_BASE_DATA_OFFSET: u32 = 0x000001;
const TFHD_SAMPLE_DESCRIPTION_INDEX: u32 = 0x000002;
const TFHD_DEFAULT_SAMPLE_DURATION: u32 = 0x000008;
const TFHD_DEFAULT_SAMPLE_SIZE: u32 = 0x000010;
const TFHD_DEFAULT_SAMPLE_FLAGS: u32 = 0x000020;

// tr_flags bits, ISO-BMFF 8.8.8
const TRUN_DATA_OFFSET: u32 = 0x000001;
const TRUN_FIRST_SAMPLE_FLAGS: u32 = 0x000004;
const TRUN_SAMPLE_DURATION: u32 = 0x000100;
const TRUN_SAMPLE_SIZE: u32 = 0x000200;
const TRUN_SAMPLE_FLAGS: u32 = 0x000400;
const TRUN_SAMPLE_COMPOSITION_TIME_OFFSET: u32 = 0x000800;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Tfhd {
    pub(crate) track_id: u32,
    #[allow(dead_code)]
    pub(crate) base_data_offset: Option<u64>,
    #[allow(dead_code)]
    pub(crate) sample_description_index: Option<u32>,
    pub(crate) default_sample_duration: Option<u32>,
    pub(crate) default_sample_size: Option<u32>,
    #[allow(dead_code)]
    pub(crate) default_sample_flags: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TrunSample {
    pub(crate) duration: Option<u32>,
    pub(crate) size: Option<u32>,
    #[allow(dead_code)]
    pub(crate) flags: Option<u32>,
    pub(crate) composition_time_offset: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Trun {
    pub(crate) samples: Vec<TrunSample>,
}

/// One media sample of a track fragment, in decode order, with absolute
/// timestamps in media-timescale units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Sample {
    pub(crate) track_id: u32,
    pub(crate) size: u32,
    pub(crate) duration: u32,
    pub(crate) composition_time_offset: i64,
    pub(crate) dts: i64,
    pub(crate) pts: i64,
}

fn be_u32(buf: &[u8], pos: usize) -> Option<u32> {
    let bytes = buf.get(pos..pos + 4)?;
    Some(u32::from_be_bytes(bytes.try_into().unwrap()))
}

fn be_u64(buf: &[u8], pos: usize) -> Option<u64> {
    let bytes = buf.get(pos..pos + 8)?;
    Some(u64::from_be_bytes(bytes.try_into().unwrap()))
}

fn read_be_u32(
    buf: &[u8],
    pos: &mut usize,
    box_type: &'static str,
    field: &'static str,
) -> Result<u32, Error> {
    let value = be_u32(buf, *pos).ok_or(Error::TruncatedBox {
        box_type,
        field,
        needed: *pos + 4,
        available: buf.len(),
    })?;
    *pos += 4;
    Ok(value)
}

fn read_be_u64(
    buf: &[u8],
    pos: &mut usize,
    box_type: &'static str,
    field: &'static str,
) -> Result<u64, Error> {
    let value = be_u64(buf, *pos).ok_or(Error::TruncatedBox {
        box_type,
        field,
        needed: *pos + 8,
        available: buf.len(),
    })?;
    *pos += 8;
    Ok(value)
}

/// Return the content slice of every box whose path from the root of `data`
/// matches `path`, in file order.
///
/// The walk descends only into boxes named by the path; it assumes nothing
/// about the container hierarchy beyond that. A box whose declared size runs
/// past the buffer (or whose header does) abandons the current level without
/// failing: earlier siblings stay in the result.
pub(crate) fn find_box<'a>(data: &'a [u8], path: &[&[u8; 4]]) -> Vec<&'a [u8]> {
    let mut found = Vec::new();
    let Some((target, rest)) = path.split_first() else {
        return found;
    };

    let mut pos = 0usize;
    while pos + 8 <= data.len() {
        let Some(size32) = be_u32(data, pos) else {
            break;
        };
        // ISO-BMFF: size==1 means a 64-bit largesize follows the type;
        // size==0 means the box extends to the end of the input.
        let (size, header_len) = match size32 {
            0 => ((data.len() - pos) as u64, 8usize),
            1 => match be_u64(data, pos + 8) {
                Some(large) => (large, 16),
                None => break,
            },
            n => (u64::from(n), 8),
        };
        if size < header_len as u64 {
            break;
        }
        let end = pos as u64 + size;
        if end > data.len() as u64 {
            break;
        }
        let end = end as usize;

        if &data[pos + 4..pos + 8] == *target {
            let content = &data[pos + header_len..end];
            if rest.is_empty() {
                found.push(content);
            } else {
                found.extend(find_box(content, rest));
            }
        }

        pos = end;
    }

    found
}

/// Decode a `tfhd` content slice (track fragment header, ISO-BMFF 8.8.7).
pub(crate) fn parse_tfhd(data: &[u8]) -> Result<Tfhd, Error> {
    let mut pos = 0usize;
    let flags = read_be_u32(data, &mut pos, "tfhd", "version and flags")? & 0x00ff_ffff;
    let track_id = read_be_u32(data, &mut pos, "tfhd", "track_id")?;

    let base_data_offset = if flags & TFHD_BASE_DATA_OFFSET != 0 {
        Some(read_be_u64(data, &mut pos, "tfhd", "base_data_offset")?)
    } else {
        None
    };
    let sample_description_index = if flags & TFHD_SAMPLE_DESCRIPTION_INDEX != 0 {
        Some(read_be_u32(data, &mut pos, "tfhd", "sample_description_index")?)
    } else {
        None
    };
    let default_sample_duration = if flags & TFHD_DEFAULT_SAMPLE_DURATION != 0 {
        Some(read_be_u32(data, &mut pos, "tfhd", "default_sample_duration")?)
    } else {
        None
    };
    let default_sample_size = if flags & TFHD_DEFAULT_SAMPLE_SIZE != 0 {
        Some(read_be_u32(data, &mut pos, "tfhd", "default_sample_size")?)
    } else {
        None
    };
    let default_sample_flags = if flags & TFHD_DEFAULT_SAMPLE_FLAGS != 0 {
        Some(read_be_u32(data, &mut pos, "tfhd", "default_sample_flags")?)
    } else {
        None
    };

    Ok(Tfhd {
        track_id,
        base_data_offset,
        sample_description_index,
        default_sample_duration,
        default_sample_size,
        default_sample_flags,
    })
}

/// Decode a `tfdt` content slice into its base media decode time
/// (ISO-BMFF 8.8.12). Version 1 carries a 64-bit time.
pub(crate) fn parse_tfdt(data: &[u8]) -> Result<i64, Error> {
    let mut pos = 0usize;
    let word = read_be_u32(data, &mut pos, "tfdt", "version and flags")?;
    let version = (word >> 24) as u8;

    if version == 1 {
        Ok(read_be_u64(data, &mut pos, "tfdt", "base_media_decode_time")? as i64)
    } else {
        Ok(i64::from(read_be_u32(
            data,
            &mut pos,
            "tfdt",
            "base_media_decode_time",
        )?))
    }
}

/// Decode a `trun` content slice (track run, ISO-BMFF 8.8.8).
///
/// A run truncated inside its sample array keeps the samples that were fully
/// readable; the trailing bytes are ignored.
pub(crate) fn parse_trun(data: &[u8]) -> Result<Trun, Error> {
    let mut pos = 0usize;
    let word = read_be_u32(data, &mut pos, "trun", "version and flags")?;
    let version = (word >> 24) as u8;
    let flags = word & 0x00ff_ffff;
    let sample_count = read_be_u32(data, &mut pos, "trun", "sample_count")?;

    if flags & TRUN_DATA_OFFSET != 0 {
        read_be_u32(data, &mut pos, "trun", "data_offset")?;
    }
    if flags & TRUN_FIRST_SAMPLE_FLAGS != 0 {
        read_be_u32(data, &mut pos, "trun", "first_sample_flags")?;
    }

    let per_sample = 4 * ((flags & TRUN_SAMPLE_DURATION != 0) as usize
        + (flags & TRUN_SAMPLE_SIZE != 0) as usize
        + (flags & TRUN_SAMPLE_FLAGS != 0) as usize
        + (flags & TRUN_SAMPLE_COMPOSITION_TIME_OFFSET != 0) as usize);

    let mut samples = Vec::new();
    for _ in 0..sample_count {
        if data.len().saturating_sub(pos) < per_sample {
            break;
        }

        let mut duration = None;
        if flags & TRUN_SAMPLE_DURATION != 0 {
            duration = be_u32(data, pos);
            pos += 4;
        }
        let mut size = None;
        if flags & TRUN_SAMPLE_SIZE != 0 {
            size = be_u32(data, pos);
            pos += 4;
        }
        let mut sample_flags = None;
        if flags & TRUN_SAMPLE_FLAGS != 0 {
            sample_flags = be_u32(data, pos);
            pos += 4;
        }
        let mut composition_time_offset = None;
        if flags & TRUN_SAMPLE_COMPOSITION_TIME_OFFSET != 0 {
            // Version 0 stores the offset unsigned; version 1 signed.
            composition_time_offset = be_u32(data, pos).map(|raw| {
                if version == 0 {
                    i64::from(raw)
                } else {
                    i64::from(raw as i32)
                }
            });
            pos += 4;
        }

        samples.push(TrunSample {
            duration,
            size,
            flags: sample_flags,
            composition_time_offset,
        });
    }

    Ok(Trun { samples })
}

// Flatten the runs of one track fragment into samples with absolute dts/pts.
pub(crate) fn build_fragment_samples(
    tfhd: &Tfhd,
    base_media_decode_time: i64,
    truns: &[Trun],
) -> Vec<Sample> {
    let mut samples = Vec::new();
    let mut dts = base_media_decode_time;

    for trun in truns {
        for entry in &trun.samples {
            let duration = entry.duration.or(tfhd.default_sample_duration).unwrap_or(0);
            let size = entry.size.or(tfhd.default_sample_size).unwrap_or(0);
            let composition_time_offset = entry.composition_time_offset.unwrap_or(0);

            samples.push(Sample {
                track_id: tfhd.track_id,
                size,
                duration,
                composition_time_offset,
                dts,
                pts: dts + composition_time_offset,
            });

            dts += i64::from(duration);
        }
    }

    samples
}
