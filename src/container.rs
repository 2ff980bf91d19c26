/*!
# Container Framing

A script container on disk is a fixed 0x18-byte header followed by an
LZSS-compressed body. [`unframe`] turns that on-disk layout
into the in-memory form every other stage works with: header bytes kept
verbatim, body decompressed. [`frame`] is the inverse, used when writing a
script back out.

The 2-byte field at offset `0x14` is the authoritative length of the
decompressed body; `unframe` doesn't need it (the LZSS stream carries its
own length prefix), but `frame` rewrites it so the two stay consistent
when the injection engine changes the body's length. The file is silent on
whether the adjacent `0x16..0x18` field depends on body length — it is
left untouched here, matching that silence.
*/

use crate::error::ContainerError;
use crate::lzss;

/// Size of the opaque container header, including the authoritative
/// length field at `0x14..0x16`.
pub const HEADER_LEN: usize = 0x18;

/// Offset of the little-endian 16-bit decompressed-body-length field.
const LENGTH_FIELD_OFFSET: usize = 0x14;

/// A decompressed-form container: header kept intact, body decompressed.
/// This is the shape every downstream stage (scanner, extractor,
/// injector) operates on.
#[derive(Debug, Clone)]
pub struct DecompressedContainer {
    /// The full 0x18-byte header, including the length field.
    pub header: [u8; HEADER_LEN],
    /// The decompressed body that originally followed the header's LZSS
    /// stream.
    pub body: Vec<u8>,
}

impl DecompressedContainer {
    /// The in-memory representation used by the scanner and injector:
    /// header followed by body, as if the file had never been
    /// compressed. This is also the on-disk shape of the decompressed
    /// intermediate files written by the `decompress` command and read
    /// back by `inject`/`extract`/`compress` — there is no separate
    /// compression on those intermediates.
    pub fn as_combined(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.body.len());
        out.extend_from_slice(&self.header);
        out.extend_from_slice(&self.body);
        out
    }

    /// Parse a decompressed-intermediate file's bytes (header ++ body,
    /// with no LZSS framing) back into a [`DecompressedContainer`].
    pub fn from_combined(bytes: &[u8]) -> Result<Self, ContainerError> {
        if bytes.len() < HEADER_LEN {
            return Err(ContainerError::FileTooSmall { len: bytes.len() });
        }
        let body = bytes[HEADER_LEN..].to_vec();
        if body.len() > 0xFFFF {
            return Err(ContainerError::BodyTooLarge { len: body.len() });
        }
        let mut header = [0u8; HEADER_LEN];
        header.copy_from_slice(&bytes[..HEADER_LEN]);
        Ok(Self { header, body })
    }

    /// The declared body length currently recorded in the header.
    pub fn declared_len(&self) -> u16 {
        u16::from_le_bytes([
            self.header[LENGTH_FIELD_OFFSET],
            self.header[LENGTH_FIELD_OFFSET + 1],
        ])
    }

    /// Rewrite the declared body length in the header. Called whenever
    /// the body's length changes.
    pub fn set_declared_len(&mut self, len: u16) {
        self.header[LENGTH_FIELD_OFFSET..LENGTH_FIELD_OFFSET + 2]
            .copy_from_slice(&len.to_le_bytes());
    }
}

/// Split a raw on-disk container into header and decompressed body.
///
/// The LZSS input handed to [`lzss::decompress`] starts at `0x14`, not
/// `0x18` — it includes the 4-byte declared-length prefix that happens to
/// live inside the header region, consumed by the codec before the
/// compressed payload proper.
pub fn unframe(raw: &[u8]) -> Result<DecompressedContainer, ContainerError> {
    if raw.len() < HEADER_LEN {
        return Err(ContainerError::FileTooSmall { len: raw.len() });
    }

    let mut header = [0u8; HEADER_LEN];
    header.copy_from_slice(&raw[..HEADER_LEN]);

    let lzss_input = &raw[LENGTH_FIELD_OFFSET..];
    let body = lzss::decompress(lzss_input)?;

    if body.len() > 0xFFFF {
        return Err(ContainerError::BodyTooLarge { len: body.len() });
    }

    Ok(DecompressedContainer { header, body })
}

/// Recompress a decompressed-form container back into its on-disk layout.
///
/// [`lzss::compress`] writes its own 4-byte declared-length prefix as the
/// first bytes of its output; those bytes take the place of the
/// header's `0x14..0x18` region on disk, so only `header[..0x14]`
/// is copied here verbatim — appending the full header would duplicate
/// that region. Callers that changed the body's length should still call
/// [`DecompressedContainer::set_declared_len`] before framing, since that
/// field is also read directly by the injection engine's bookkeeping
/// while it still holds the decompressed-intermediate form.
pub fn frame(container: &DecompressedContainer) -> Result<Vec<u8>, ContainerError> {
    if container.body.len() > 0xFFFF {
        return Err(ContainerError::BodyTooLarge {
            len: container.body.len(),
        });
    }

    let compressed = lzss::compress(&container.body);
    let mut out = Vec::with_capacity(LENGTH_FIELD_OFFSET + compressed.len());
    out.extend_from_slice(&container.header[..LENGTH_FIELD_OFFSET]);
    out.extend_from_slice(&compressed);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_raw(body: &[u8]) -> Vec<u8> {
        let mut header = [0u8; HEADER_LEN];
        header[LENGTH_FIELD_OFFSET..LENGTH_FIELD_OFFSET + 2]
            .copy_from_slice(&(body.len() as u16).to_le_bytes());
        let compressed = lzss::compress(body);
        let mut raw = Vec::new();
        raw.extend_from_slice(&header[..LENGTH_FIELD_OFFSET]);
        raw.extend_from_slice(&compressed);
        raw
    }

    #[test]
    fn unframe_rejects_too_small_container() {
        let raw = vec![0u8; 10];
        assert!(matches!(
            unframe(&raw),
            Err(ContainerError::FileTooSmall { len: 10 })
        ));
    }

    #[test]
    fn unframe_then_frame_round_trips_body() {
        let body = b"hello script".to_vec();
        let raw = sample_raw(&body);
        let container = unframe(&raw).unwrap();
        assert_eq!(container.body, body);
        assert_eq!(container.declared_len() as usize, body.len());

        let reframed = frame(&container).unwrap();
        let round_tripped = unframe(&reframed).unwrap();
        assert_eq!(round_tripped.body, body);
    }

    #[test]
    fn set_declared_len_updates_only_the_0x14_field() {
        let body = b"abc".to_vec();
        let raw = sample_raw(&body);
        let mut container = unframe(&raw).unwrap();
        let original_tail = container.header[0x16..0x18].to_vec();

        container.set_declared_len(0x1234);
        assert_eq!(container.declared_len(), 0x1234);
        assert_eq!(&container.header[0x16..0x18], original_tail.as_slice());
    }

    #[test]
    fn combined_round_trips_through_bytes() {
        let body = b"some decompressed body".to_vec();
        let mut header = [0u8; HEADER_LEN];
        header[LENGTH_FIELD_OFFSET..LENGTH_FIELD_OFFSET + 2]
            .copy_from_slice(&(body.len() as u16).to_le_bytes());
        let container = DecompressedContainer { header, body };

        let bytes = container.as_combined();
        let round_tripped = DecompressedContainer::from_combined(&bytes).unwrap();
        assert_eq!(round_tripped.header, container.header);
        assert_eq!(round_tripped.body, container.body);
    }

    #[test]
    fn frame_rejects_oversize_body() {
        let mut container = DecompressedContainer {
            header: [0u8; HEADER_LEN],
            body: vec![0u8; 0x1_0000],
        };
        container.set_declared_len(0); // declared len doesn't matter here
        assert!(matches!(
            frame(&container),
            Err(ContainerError::BodyTooLarge { .. })
        ));
    }
}
