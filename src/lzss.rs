/*!
# LZSS Codec

LZSS compression/decompression for the scenario-script container's body.
This is a textbook Okumura-style LZSS variant parameterised to match the
specific game tool this toolchain replaces:

- 4 KiB sliding-window ring buffer, zero-filled.
- A 4-byte little-endian declared decompressed size precedes the token
  stream.
- Flag bytes precede every group of up to 8 tokens; bit `b` of the flag
  byte describes token `b` of that group. Bit value `1` means *literal*,
  `0` means *back-reference* — this polarity is exactly inverted from the
  flag convention a casual reader might expect, and must not be "fixed".
- Back-references are two bytes: `(offset_low, (length-3)<<4 | offset_high)`
  where `offset` is an absolute position in the ring buffer and `length`
  is in `3..=18`.

This is a different wire format from the block-framed variant used
elsewhere in this codebase's history for archive bodies; the two share
the ring-buffer idea but not the framing.
*/

use crate::error::LzssError;

/// Ring buffer (sliding window) size.
const DICT_SIZE: usize = 4096;
const DICT_MASK: usize = DICT_SIZE - 1;

/// Minimum and maximum back-reference match length.
const MIN_MATCH: usize = 3;
const MAX_MATCH: usize = 18;

/// Where the ring buffer's write cursor starts. Leaves `MAX_MATCH` bytes
/// of headroom before it would wrap into position 0, matching the
/// classic Okumura layout; every other position starts zero-filled so
/// early back-references can legally match runs of `0x00`.
const INITIAL_DICT_POS: usize = DICT_SIZE - MAX_MATCH;

/// Decompress a script body.
///
/// `input` must begin with a 4-byte little-endian declared decompressed
/// size. If the token stream runs out of input between token groups (no
/// next flag byte to read), decompression stops and returns what it has —
/// this is not an error. If the stream runs out *mid-token* (a literal
/// with no byte to read, or a back-reference missing its second byte),
/// that is a [`LzssError`]. A declared size shorter than what the tokens
/// would produce is honored by truncating the output.
pub fn decompress(input: &[u8]) -> Result<Vec<u8>, LzssError> {
    if input.len() < 4 {
        return Err(LzssError::MissingLengthPrefix);
    }
    let declared_len = i32::from_le_bytes([input[0], input[1], input[2], input[3]]);
    if declared_len < 0 {
        return Err(LzssError::NegativeDeclaredLength);
    }
    let declared_len = declared_len as usize;

    let mut ring = [0u8; DICT_SIZE];
    let mut ring_pos = INITIAL_DICT_POS;
    let mut out = Vec::with_capacity(declared_len);
    let mut pos = 4usize;
    let mut flags: u16 = 0;

    while out.len() < declared_len {
        flags >>= 1;
        if flags & 0x100 == 0 {
            let Some(&byte) = input.get(pos) else {
                // No more tokens to read; a short output is allowed.
                break;
            };
            flags = (byte as u16) | 0xff00;
            pos += 1;
        }

        if flags & 1 != 0 {
            // Literal.
            let byte = *input
                .get(pos)
                .ok_or(LzssError::LiteralPastEof { offset: pos })?;
            pos += 1;
            out.push(byte);
            ring[ring_pos] = byte;
            ring_pos = (ring_pos + 1) & DICT_MASK;
        } else {
            // Back-reference.
            if pos + 1 >= input.len() {
                return Err(LzssError::TruncatedBackReference { offset: pos });
            }
            let b1 = input[pos] as usize;
            let b2 = input[pos + 1] as usize;
            pos += 2;

            let match_pos = b1 | ((b2 & 0x0F) << 8);
            let match_len = (b2 >> 4) + MIN_MATCH;

            for k in 0..match_len {
                if out.len() >= declared_len {
                    break;
                }
                let byte = ring[(match_pos + k) & DICT_MASK];
                out.push(byte);
                ring[ring_pos] = byte;
                ring_pos = (ring_pos + 1) & DICT_MASK;
            }
        }
    }

    out.truncate(declared_len);
    Ok(out)
}

/// Compress a script body.
///
/// Produces a stream [`decompress`] can read back byte-for-byte. Uses a
/// greedy longest-match search over the 4 KiB window; this is not
/// guaranteed to find the globally shortest encoding, only a valid one —
/// the contract this codec owes callers is round-trip equality, not
/// optimality.
pub fn compress(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + 4);
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());

    let mut ring = [0u8; DICT_SIZE];
    let mut ring_pos = INITIAL_DICT_POS;
    let mut i = 0usize;

    while i < data.len() {
        let flag_index = out.len();
        out.push(0);
        let mut flag_byte = 0u8;

        for bit in 0..8 {
            if i >= data.len() {
                break;
            }

            let remaining = data.len() - i;
            let max_len = MAX_MATCH.min(remaining);
            let best = longest_match(&ring, &data[i..i + max_len]);

            if let Some((match_pos, match_len)) = best {
                let len_field = (match_len - MIN_MATCH) as u8;
                out.push((match_pos & 0xFF) as u8);
                out.push((len_field << 4) | ((match_pos >> 8) as u8 & 0x0F));
                for k in 0..match_len {
                    let byte = data[i + k];
                    ring[ring_pos] = byte;
                    ring_pos = (ring_pos + 1) & DICT_MASK;
                }
                i += match_len;
            } else {
                let byte = data[i];
                out.push(byte);
                ring[ring_pos] = byte;
                ring_pos = (ring_pos + 1) & DICT_MASK;
                i += 1;
                flag_byte |= 1 << bit;
            }
        }

        out[flag_index] = flag_byte;
    }

    out
}

/// Search the whole ring buffer for the longest run matching the start of
/// `wanted` (already capped to at most [`MAX_MATCH`] bytes by the caller).
/// Returns `None` if no run of at least [`MIN_MATCH`] bytes exists.
fn longest_match(ring: &[u8; DICT_SIZE], wanted: &[u8]) -> Option<(usize, usize)> {
    if wanted.len() < MIN_MATCH {
        return None;
    }

    let mut best_pos = 0usize;
    let mut best_len = 0usize;

    for start in 0..DICT_SIZE {
        let mut len = 0usize;
        while len < wanted.len() && ring[(start + len) & DICT_MASK] == wanted[len] {
            len += 1;
        }
        if len > best_len {
            best_len = len;
            best_pos = start;
            if best_len == wanted.len() {
                break;
            }
        }
    }

    if best_len >= MIN_MATCH {
        Some((best_pos, best_len))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_empty() {
        let body: &[u8] = &[];
        let compressed = compress(body);
        assert_eq!(decompress(&compressed).unwrap(), body);
    }

    #[test]
    fn round_trip_short_literal_run() {
        let body = b"ABC";
        let compressed = compress(body);
        assert_eq!(decompress(&compressed).unwrap(), body);
    }

    #[test]
    fn round_trip_repeated_run() {
        let body = vec![0x41u8; 200];
        let compressed = compress(&body);
        assert_eq!(decompress(&compressed).unwrap(), body);
    }

    #[test]
    fn round_trip_zero_fill_backreference() {
        // The ring buffer starts zero-filled, so a leading run of zeros
        // should compress via back-references against the fill, not only
        // literals.
        let body = vec![0u8; 64];
        let compressed = compress(&body);
        assert_eq!(decompress(&compressed).unwrap(), body);
        assert!(compressed.len() < body.len() + 4);
    }

    #[test]
    fn round_trip_text_record() {
        let body = [
            0xFDu8, 0x03, 0x41, 0x42, 0x43, 0x00, 0x07, 0xFD, 0x02, 0x58, 0x59, 0x00,
        ];
        let compressed = compress(&body);
        assert_eq!(decompress(&compressed).unwrap(), body.to_vec());
    }

    #[test]
    fn round_trip_random_like_bytes() {
        // Deterministic pseudo-random sequence (no Vec<u8> from an RNG
        // crate needed): a linear congruential generator.
        let mut state: u32 = 0x1234_5678;
        let body: Vec<u8> = (0..2000)
            .map(|_| {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                (state >> 16) as u8
            })
            .collect();
        let compressed = compress(&body);
        assert_eq!(decompress(&compressed).unwrap(), body);
    }

    #[test]
    fn decompress_rejects_negative_length() {
        let stream = (-1i32).to_le_bytes().to_vec();
        assert!(matches!(
            decompress(&stream),
            Err(LzssError::NegativeDeclaredLength)
        ));
    }

    #[test]
    fn decompress_rejects_missing_length_prefix() {
        let stream = vec![0u8, 1, 2];
        assert!(matches!(
            decompress(&stream),
            Err(LzssError::MissingLengthPrefix)
        ));
    }

    #[test]
    fn decompress_rejects_truncated_backreference() {
        let mut stream = 5u32.to_le_bytes().to_vec();
        stream.push(0x00); // flag byte: first token is a back-reference
        stream.push(0x10); // only one of the two back-reference bytes
        assert!(matches!(
            decompress(&stream),
            Err(LzssError::TruncatedBackReference { .. })
        ));
    }

    #[test]
    fn decompress_rejects_literal_past_eof() {
        let mut stream = 5u32.to_le_bytes().to_vec();
        stream.push(0x01); // flag byte: first token is a literal, none follows
        assert!(matches!(
            decompress(&stream),
            Err(LzssError::LiteralPastEof { .. })
        ));
    }

    #[test]
    fn decompress_with_no_tokens_at_all_is_a_short_success() {
        // Only the length prefix is present; running out of input while
        // looking for the very first flag byte is a legitimate short
        // output, not an error.
        let stream = 5u32.to_le_bytes().to_vec();
        let out = decompress(&stream).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn decompress_truncates_when_declared_length_exceeds_token_output() {
        // One full 8-literal group ("ABCDEFGH"), then the stream ends
        // before the next flag byte. Declaring a larger size than the
        // tokens can fill must not be an error.
        let mut stream = 20u32.to_le_bytes().to_vec();
        stream.push(0xFF);
        stream.extend_from_slice(b"ABCDEFGH");
        let out = decompress(&stream).unwrap();
        assert_eq!(out, b"ABCDEFGH");
    }
}
