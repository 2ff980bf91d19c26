/*!
# Image Writer Interface

The external sink: something that can take a path inside a FAT-formatted
disk image and overwrite the file living there with new bytes. This is
treated purely as a black box — `open`, `replace_file`, `close` — so the
core pipeline and the batch driver depend only on the [`ImageWriter`]
trait, never on a concrete filesystem implementation.

[`fat::FatImage`] is the one real implementation: a deliberately bounded
FAT12/16 writer. [`NullImage`] is a test double that records which paths
were written instead of touching a disk image, used by the crate's own
tests so they don't need a real image fixture.
*/

pub mod fat;

use std::path::Path;

use crate::error::ImageError;

/// A handle onto a disk image capable of overwriting an existing file's
/// contents by absolute in-image path.
pub trait ImageWriter: Sized {
    /// Open the image at `image_path`, parsing whatever on-disk
    /// structures this implementation needs.
    fn open(image_path: &Path) -> Result<Self, ImageError>;

    /// Overwrite the file at `path` (e.g. `/EVE/A001.CC`) with `bytes`.
    fn replace_file(&mut self, path: &str, bytes: &[u8]) -> Result<(), ImageError>;

    /// Flush any pending writes and release the handle.
    fn close(self) -> Result<(), ImageError>;
}

/// A no-op [`ImageWriter`] that records the paths it was asked to write,
/// for tests that exercise the pipeline without a real disk image.
#[derive(Debug, Default)]
pub struct NullImage {
    pub writes: Vec<(String, Vec<u8>)>,
}

impl ImageWriter for NullImage {
    fn open(_image_path: &Path) -> Result<Self, ImageError> {
        Ok(Self::default())
    }

    fn replace_file(&mut self, path: &str, bytes: &[u8]) -> Result<(), ImageError> {
        self.writes.push((path.to_string(), bytes.to_vec()));
        Ok(())
    }

    fn close(self) -> Result<(), ImageError> {
        Ok(())
    }
}
