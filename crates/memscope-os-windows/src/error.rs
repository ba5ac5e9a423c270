use memscope_core::{ConfigError, MemscopeError, NoneObject};

/// Error types for Windows plugins.
///
/// Data-dependent failures degrade to invalid objects and are never
/// reported here. Only the absence of something a plugin cannot work
/// without is.
#[derive(thiserror::Error, Debug)]
pub enum WindowsError {
    /// A required option is missing or unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A root object the plugin starts from could not be produced.
    #[error("Required object not available: {0}")]
    RootObject(#[from] NoneObject),

    /// No process with the requested ID.
    #[error("Process {0} not found")]
    ProcessNotFound(u32),

    /// An engine error.
    #[error(transparent)]
    Core(#[from] MemscopeError),
}

impl From<WindowsError> for MemscopeError {
    fn from(value: WindowsError) -> Self {
        match value {
            WindowsError::Core(err) => err,
            WindowsError::Config(err) => MemscopeError::Config(err),
            err => MemscopeError::Os(err.into()),
        }
    }
}
