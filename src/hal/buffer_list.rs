//! Channel layout of a stream configuration property.
//!
//! The value is a native buffer list: a `u32` buffer count, padded to pointer
//! alignment, followed by one `{ channels: u32, byte_size: u32, data: *mut }`
//! entry per buffer. The property's size grows with the number of buffers.

use std::mem::{align_of, size_of};

fn align_up(offset: usize, align: usize) -> usize {
    (offset + align - 1) / align * align
}

/// Offset of the first buffer entry
pub fn header_len() -> usize {
    align_up(size_of::<u32>(), align_of::<*mut u8>())
}

/// Size of one buffer entry
pub fn entry_len() -> usize {
    align_up(2 * size_of::<u32>() + size_of::<*mut u8>(), align_of::<*mut u8>())
}

/// Byte size of a buffer list holding `buffers` entries
pub fn encoded_len(buffers: usize) -> usize {
    header_len() + buffers * entry_len()
}

fn read_u32(raw: &[u8], offset: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&raw[offset..offset + 4]);
    u32::from_ne_bytes(word)
}

/// Per-buffer channel counts of a raw buffer list
///
/// An empty value means the scope has no streams. A declared buffer count
/// larger than the value can hold is clamped to the entries present.
pub fn decode_channel_counts(raw: &[u8]) -> Result<Vec<u32>, String> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    if raw.len() < size_of::<u32>() {
        return Err(format!("{} bytes is too short for a buffer list", raw.len()));
    }

    let declared = read_u32(raw, 0) as usize;
    let available = raw.len().saturating_sub(header_len()) / entry_len();
    if declared > available {
        log::debug!(
            "buffer list declares {} buffers but only {} fit in {} bytes",
            declared,
            available,
            raw.len()
        );
    }

    Ok((0..declared.min(available))
        .map(|i| read_u32(raw, header_len() + i * entry_len()))
        .collect())
}

/// Encode channel counts as a buffer list with null data pointers
pub fn encode_channel_counts(channels: &[u32]) -> Vec<u8> {
    let mut raw = vec![0u8; encoded_len(channels.len())];
    raw[..4].copy_from_slice(&(channels.len() as u32).to_ne_bytes());
    for (i, count) in channels.iter().enumerate() {
        let offset = header_len() + i * entry_len();
        raw[offset..offset + 4].copy_from_slice(&count.to_ne_bytes());
    }
    raw
}

/// Total channels across all buffers
pub fn total_channels(counts: &[u32]) -> u64 {
    counts.iter().map(|&c| u64::from(c)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_matches_pointer_width() {
        if size_of::<*mut u8>() == 8 {
            assert_eq!(header_len(), 8);
            assert_eq!(entry_len(), 16);
        } else {
            assert_eq!(header_len(), 4);
            assert_eq!(entry_len(), 12);
        }
    }

    #[test]
    fn test_size_grows_with_buffers() {
        assert_eq!(encode_channel_counts(&[]).len(), header_len());
        assert_eq!(encode_channel_counts(&[2, 2, 2]).len(), header_len() + 3 * entry_len());
    }

    #[test]
    fn test_decode_multiple_buffers() {
        let raw = encode_channel_counts(&[2, 0, 6]);
        assert_eq!(decode_channel_counts(&raw).unwrap(), vec![2, 0, 6]);
        assert_eq!(total_channels(&[2, 0, 6]), 8);
    }

    #[test]
    fn test_decode_empty_value() {
        assert!(decode_channel_counts(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_decode_rejects_partial_header() {
        assert!(decode_channel_counts(&[1, 0]).is_err());
    }

    #[test]
    fn test_decode_clamps_truncated_list() {
        let mut raw = encode_channel_counts(&[4, 4]);
        raw.truncate(header_len() + entry_len());
        assert_eq!(decode_channel_counts(&raw).unwrap(), vec![4]);
    }

    #[cfg(target_os = "macos")]
    #[test]
    fn test_layout_matches_native_buffer_list() {
        assert_eq!(encoded_len(1), size_of::<coreaudio_sys::AudioBufferList>());
        assert_eq!(entry_len(), size_of::<coreaudio_sys::AudioBuffer>());
    }
}
