//! WebSocket frame masking (RFC 6455 §5.3)

/// XOR the payload in place with the repeating 4-byte mask
///
/// Used both to unmask client frames and, in tests, to build them.
/// Processes a word at a time; the mask pattern repeats every 4 bytes so
/// a doubled mask fills a u64 lane exactly.
pub fn apply_mask(data: &mut [u8], mask: [u8; 4]) {
    if data.is_empty() {
        return;
    }

    let mask_word = u64::from_ne_bytes([
        mask[0], mask[1], mask[2], mask[3], mask[0], mask[1], mask[2], mask[3],
    ]);

    let mut chunks = data.chunks_exact_mut(8);
    for chunk in &mut chunks {
        let word = u64::from_ne_bytes(chunk.try_into().unwrap()) ^ mask_word;
        chunk.copy_from_slice(&word.to_ne_bytes());
    }
    for (i, byte) in chunks.into_remainder().iter_mut().enumerate() {
        *byte ^= mask[i & 3];
    }
}
