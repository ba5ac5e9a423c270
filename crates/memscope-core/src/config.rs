use serde::{Deserialize, Serialize};

/// Default block size used by signature scanners.
pub const DEFAULT_SCAN_BLOCK_SIZE: u64 = 1024 * 1024 * 10;

/// Largest block size accepted for signature scanners.
pub const MAX_SCAN_BLOCK_SIZE: u64 = 1024 * 1024 * 16;

/// An error raised when a required option is missing or unusable.
///
/// Configuration errors are the only errors that plugins propagate to
/// their callers; everything data-dependent degrades to an invalid object.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required option was not provided.
    #[error("Missing required option: {0}")]
    MissingOption(&'static str),

    /// An option was provided but cannot be used.
    #[error("Invalid value for option {name}: {reason}")]
    InvalidOption {
        /// The option name.
        name: &'static str,

        /// What is wrong with the value.
        reason: String,
    },
}

/// Immutable per-invocation configuration.
///
/// Every field is optional. Values that are set take precedence over
/// anything the engine would otherwise discover by scanning (see magic
/// values with a configuration key).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Kernel directory table base (physical address of the page directory).
    pub dtb: Option<u64>,

    /// Virtual address of the kernel processor control region.
    pub kpcr: Option<u64>,

    /// Virtual address of `PsActiveProcessHead`.
    pub ps_active_process_head: Option<u64>,

    /// Virtual address of `PsLoadedModuleList`.
    pub ps_loaded_module_list: Option<u64>,

    /// Process ID to operate on.
    pub pid: Option<u32>,

    /// Kernel virtual address of a specific object to operate on.
    pub offset: Option<u64>,

    /// Block size used by signature scanners.
    pub scan_block_size: Option<u64>,
}

impl Config {
    /// Looks up an address-like option by its configuration key.
    ///
    /// Keys are the names magic values refer to, e.g. `"DTB"` or `"KPCR"`.
    pub fn get(&self, key: &str) -> Option<u64> {
        match key {
            "DTB" => self.dtb,
            "KPCR" => self.kpcr,
            "PsActiveProcessHead" => self.ps_active_process_head,
            "PsLoadedModuleList" => self.ps_loaded_module_list,
            "PID" => self.pid.map(u64::from),
            "OFFSET" => self.offset,
            _ => None,
        }
    }

    /// Returns the configured process ID.
    pub fn require_pid(&self) -> Result<u32, ConfigError> {
        self.pid.ok_or(ConfigError::MissingOption("pid"))
    }

    /// Returns the scanner block size.
    pub fn scan_block_size(&self) -> Result<u64, ConfigError> {
        match self.scan_block_size {
            None => Ok(DEFAULT_SCAN_BLOCK_SIZE),
            Some(0) => Err(ConfigError::InvalidOption {
                name: "scan_block_size",
                reason: String::from("must be non-zero"),
            }),
            Some(size) if size > MAX_SCAN_BLOCK_SIZE => Err(ConfigError::InvalidOption {
                name: "scan_block_size",
                reason: format!("must not exceed {MAX_SCAN_BLOCK_SIZE:#x}"),
            }),
            Some(size) => Ok(size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_pid_is_reported() {
        let config = Config::default();
        assert_eq!(config.require_pid(), Err(ConfigError::MissingOption("pid")));

        let config = Config {
            pid: Some(4),
            ..Default::default()
        };
        assert_eq!(config.require_pid(), Ok(4));
        assert_eq!(config.get("PID"), Some(4));
    }

    #[test]
    fn scan_block_size_defaults() {
        let config = Config::default();
        assert_eq!(config.scan_block_size(), Ok(DEFAULT_SCAN_BLOCK_SIZE));

        let config = Config {
            scan_block_size: Some(0),
            ..Default::default()
        };
        assert!(config.scan_block_size().is_err());

        let config = Config {
            scan_block_size: Some(MAX_SCAN_BLOCK_SIZE),
            ..Default::default()
        };
        assert_eq!(config.scan_block_size(), Ok(MAX_SCAN_BLOCK_SIZE));

        let config = Config {
            scan_block_size: Some(u64::MAX),
            ..Default::default()
        };
        assert!(matches!(
            config.scan_block_size(),
            Err(ConfigError::InvalidOption { name: "scan_block_size", .. })
        ));
    }
}
