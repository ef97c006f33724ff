//! CRC32 checksum of the snapshot table payload
//!
//! Format: `crc32:XXXXXXXX` (lowercase hex, zero-padded).

use crc32fast::Hasher;

/// Computes a CRC32 checksum over the provided data.
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Formats a CRC32 checksum for the snapshot envelope.
///
/// # Example
///
/// ```
/// use relstore::snapshot::format_checksum;
/// assert_eq!(format_checksum(0xDEADBEEF), "crc32:deadbeef");
/// ```
pub fn format_checksum(checksum: u32) -> String {
    format!("crc32:{:08x}", checksum)
}

/// Parses `crc32:XXXXXXXX`. Returns `None` if the format is invalid.
pub fn parse_checksum(formatted: &str) -> Option<u32> {
    let stripped = formatted.strip_prefix("crc32:")?;
    u32::from_str_radix(stripped, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_detects_changes() {
        assert_eq!(compute_checksum(b"rows"), compute_checksum(b"rows"));
        assert_ne!(compute_checksum(b"rows"), compute_checksum(b"rowz"));
    }

    #[test]
    fn test_format_checksum() {
        assert_eq!(format_checksum(0xABCD1234), "crc32:abcd1234");
        assert_eq!(format_checksum(0x00000001), "crc32:00000001");
    }

    #[test]
    fn test_parse_checksum() {
        assert_eq!(parse_checksum("crc32:deadbeef"), Some(0xDEADBEEF));
        assert_eq!(parse_checksum("crc32:DEADBEEF"), Some(0xDEADBEEF));
        assert_eq!(parse_checksum("crc32:"), None);
        assert_eq!(parse_checksum("md5:deadbeef"), None);
    }
}
