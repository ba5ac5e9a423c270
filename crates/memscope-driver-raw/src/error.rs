/// Error type for the raw image driver.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The image could not be opened or mapped.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The image file has no content.
    #[error("Image is empty")]
    Empty,

    /// The requested range is not fully inside the image.
    #[error("Range {offset:#x}+{length:#x} exceeds image size {size:#x}")]
    OutOfBounds {
        /// Start of the requested range.
        offset: u64,

        /// Length of the requested range.
        length: usize,

        /// Size of the image.
        size: u64,
    },
}

impl From<Error> for memscope_core::MemscopeError {
    fn from(value: Error) -> Self {
        match value {
            Error::Io(err) => Self::Io(err),
            Error::Empty => Self::Other("image is empty"),
            Error::OutOfBounds { .. } => Self::OutOfBounds,
        }
    }
}
