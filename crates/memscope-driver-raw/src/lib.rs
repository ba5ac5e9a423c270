//! Address space for raw (padded) physical memory images.

mod error;

use std::{fs::File, path::Path};

use memmap2::Mmap;
use memscope_core::{AddressSpace, MemscopeError};

pub use self::error::Error;

/// A physical address space backed by a raw memory image.
///
/// Offset `N` of the file is physical address `N`. Reads past the end of
/// the file are short.
pub struct FileSpace {
    name: String,
    mmap: Mmap,
}

impl FileSpace {
    /// Maps the image at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MemscopeError> {
        Ok(Self::open_inner(path.as_ref())?)
    }

    fn open_inner(path: &Path) -> Result<Self, Error> {
        let file = File::open(path)?;

        // SAFETY: The image is treated as read-only. Concurrent truncation
        // of the file by another process is not supported.
        let mmap = unsafe { Mmap::map(&file)? };

        if mmap.is_empty() {
            return Err(Error::Empty);
        }

        tracing::debug!(path = %path.display(), size = mmap.len(), "mapped image");

        Ok(Self {
            name: path.display().to_string(),
            mmap,
        })
    }

    /// Returns the bytes at `offset`, or [`Error::OutOfBounds`] if the range
    /// is not fully inside the image.
    pub fn slice(&self, offset: u64, length: usize) -> Result<&[u8], Error> {
        let out_of_bounds = || Error::OutOfBounds {
            offset,
            length,
            size: self.size(),
        };

        let start = usize::try_from(offset).map_err(|_| out_of_bounds())?;
        let end = start.checked_add(length).ok_or_else(out_of_bounds)?;
        self.mmap.get(start..end).ok_or_else(out_of_bounds)
    }
}

impl AddressSpace for FileSpace {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self, offset: u64, length: usize) -> Vec<u8> {
        let Ok(start) = usize::try_from(offset) else {
            return Vec::new();
        };

        if start >= self.mmap.len() {
            return Vec::new();
        }

        let end = start.saturating_add(length).min(self.mmap.len());
        self.mmap[start..end].to_vec()
    }

    fn is_valid_address(&self, offset: u64) -> bool {
        offset < self.size()
    }

    fn size(&self) -> u64 {
        self.mmap.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    fn image(name: &str, data: &[u8]) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "memscope-driver-raw-{}-{name}.img",
            std::process::id()
        ));

        let mut file = File::create(&path).unwrap();
        file.write_all(data).unwrap();
        path
    }

    #[test]
    fn reads_are_short_past_the_end() {
        let path = image("short", b"\x03\x00\x1b\x00Idle");
        let space = FileSpace::open(&path).unwrap();

        assert_eq!(space.size(), 8);
        assert_eq!(space.read(0, 4), b"\x03\x00\x1b\x00");
        assert_eq!(space.read(4, 100), b"Idle");
        assert!(space.read(8, 1).is_empty());
        assert!(space.read_exact(6, 4).is_none());

        assert!(space.is_valid_address(7));
        assert!(!space.is_valid_address(8));

        assert!(space.slice(4, 4).is_ok());
        assert!(matches!(
            space.slice(6, 4),
            Err(Error::OutOfBounds { offset: 6, length: 4, size: 8 })
        ));

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn empty_image_is_rejected() {
        let path = image("empty", b"");
        assert!(FileSpace::open(&path).is_err());
        std::fs::remove_file(path).unwrap();
    }
}
