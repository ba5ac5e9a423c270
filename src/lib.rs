//! A typed object overlay engine for memory forensics.
//!
//! This crate re-exports the engine from [`memscope_core`] together with the
//! address-space backends and OS support enabled by feature flags:
//!
//! - `arch-x86`: [`arch::x86`], 32-bit x86 paging.
//! - `driver-raw`: [`driver::raw`], raw memory image files.
//! - `os-windows`: [`os::windows`], the Windows XP profile and plugins.

pub use memscope_core::*;

/// Architectures.
pub mod arch {
    #[cfg(feature = "arch-x86")]
    pub use memscope_arch_x86 as x86;
}

/// Physical memory backends.
pub mod driver {
    #[cfg(feature = "driver-raw")]
    pub use memscope_driver_raw as raw;
}

/// Operating system support.
pub mod os {
    #[cfg(feature = "os-windows")]
    pub use memscope_os_windows as windows;
}
