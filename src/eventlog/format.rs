//! The binary record framing of spec §6.1.
//!
//! ```text
//! offset  size  field
//!   0      4    magic prefix  = 0x46464230 ("FFB0")
//!   4      4    blob length   (little-endian uint32)
//!   8      4    crc32         (IEEE, over the blob bytes only)
//!  12    len    blob
//!          p    zero padding so that (len + p) % 8 == 0
//! ```

pub const RECORD_MAGIC: u32 = 0x4646_4230;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramingError {
    BadMagic,
    LengthExceedsRemainingFile,
    ChecksumMismatch,
    Truncated,
}

/// Appends one fully framed record for `blob` to `out`.
pub fn encode_record(blob: &[u8], out: &mut Vec<u8>) {
    let crc = crc32fast::hash(blob);
    out.extend_from_slice(&RECORD_MAGIC.to_le_bytes());
    out.extend_from_slice(&(blob.len() as u32).to_le_bytes());
    out.extend_from_slice(&crc.to_le_bytes());
    out.extend_from_slice(blob);
    let total_before_padding = 12 + blob.len();
    let padding = (8 - (total_before_padding % 8)) % 8;
    out.extend(std::iter::repeat_n(0u8, padding));
}

pub struct DecodedRecord<'a> {
    pub blob: &'a [u8],
    /// Total bytes consumed from the input, including framing and padding.
    pub consumed: usize,
}

/// Decodes one record starting at `buf[0..]`. Does not advance past what it
/// consumed; the caller re-slices for the next call (spec §4.4 steps 3-4).
pub fn decode_record(buf: &[u8], verify_checksum: bool) -> Result<DecodedRecord<'_>, FramingError> {
    if buf.len() < 12 {
        return Err(FramingError::Truncated);
    }
    let magic = u32::from_le_bytes(buf[0..4].try_into().unwrap());
    if magic != RECORD_MAGIC {
        return Err(FramingError::BadMagic);
    }
    let blob_len = u32::from_le_bytes(buf[4..8].try_into().unwrap()) as usize;
    let stored_crc = u32::from_le_bytes(buf[8..12].try_into().unwrap());
    if blob_len > buf.len().saturating_sub(12) {
        return Err(FramingError::LengthExceedsRemainingFile);
    }
    let blob = &buf[12..12 + blob_len];
    if verify_checksum {
        let actual_crc = crc32fast::hash(blob);
        if actual_crc != stored_crc {
            return Err(FramingError::ChecksumMismatch);
        }
    }
    let total_before_padding = 12 + blob_len;
    let padding = (8 - (total_before_padding % 8)) % 8;
    let consumed = total_before_padding + padding;
    if consumed > buf.len() {
        return Err(FramingError::Truncated);
    }
    Ok(DecodedRecord { blob, consumed })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_and_pads_to_eight_bytes() {
        let mut out = Vec::new();
        encode_record(b"hello", &mut out);
        assert_eq!(out.len() % 8, 0);
        let decoded = decode_record(&out, true).unwrap();
        assert_eq!(decoded.blob, b"hello");
        assert_eq!(decoded.consumed, out.len());
    }

    #[test]
    fn detects_checksum_mismatch() {
        let mut out = Vec::new();
        encode_record(b"hello", &mut out);
        out[12] ^= 0xFF; // corrupt the blob
        assert_eq!(decode_record(&out, true), Err(FramingError::ChecksumMismatch));
    }

    #[test]
    fn rejects_bad_magic() {
        let buf = [0u8; 16];
        assert_eq!(decode_record(&buf, true), Err(FramingError::BadMagic));
    }

    #[test]
    fn rejects_length_exceeding_remaining_bytes() {
        let mut out = Vec::new();
        encode_record(b"hello", &mut out);
        let truncated = &out[..out.len() - 4];
        assert_eq!(decode_record(truncated, true), Err(FramingError::LengthExceedsRemainingFile));
    }
}
