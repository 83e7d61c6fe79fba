#![forbid(unsafe_code)]

/// Checksum over a node record body.
pub fn record_crc32(body: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(body);
    hasher.finalize()
}

/// Checksum over the footer fields preceding the crc slot.
///
/// The footer offset is mixed in so a footer copied to another position in
/// the file does not validate.
pub fn footer_crc32(footer_off: u64, fields: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&footer_off.to_le_bytes());
    hasher.update(fields);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_crc_detects_single_byte_flip() {
        let body = b"prefix-and-value".to_vec();
        let crc = record_crc32(&body);
        assert_eq!(crc, record_crc32(&body));

        let mut flipped = body.clone();
        flipped[3] ^= 0x01;
        assert_ne!(crc, record_crc32(&flipped));
    }

    #[test]
    fn footer_crc_depends_on_position() {
        let fields = [7u8; 24];
        assert_eq!(footer_crc32(100, &fields), footer_crc32(100, &fields));
        assert_ne!(footer_crc32(100, &fields), footer_crc32(128, &fields));
    }
}
