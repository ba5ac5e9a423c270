use crate::Pa;

/// An error that can occur inside the overlay engine.
///
/// These errors describe failures of the engine's collaborators (address
/// spaces, type tables, configuration). Data-dependent failures observed
/// while interpreting memory are never reported through this type; they are
/// turned into a [`NoneObject`] by the object factory.
///
/// [`NoneObject`]: crate::NoneObject
#[derive(thiserror::Error, Debug)]
pub enum MemscopeError {
    /// The type name is not present in the profile's type table.
    #[error("Unknown type: {0}")]
    UnknownType(String),

    /// The type is known but its size cannot be determined statically.
    #[error("Type has no static size: {0}")]
    UnsizedType(String),

    /// A read or computed offset fell outside the valid range.
    #[error("Out of bounds")]
    OutOfBounds,

    /// The translation root cannot be used to build an address space.
    #[error("Invalid translation root {0}")]
    InvalidTranslationRoot(Pa),

    /// Operation not supported.
    #[error("Operation not supported.")]
    NotSupported,

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A configuration error occurred.
    #[error(transparent)]
    Config(#[from] crate::ConfigError),

    /// An OS-specific error occurred.
    #[error(transparent)]
    Os(Box<dyn std::error::Error>),

    /// Other error.
    #[error("{0}")]
    Other(&'static str),
}
