//! Windows support for memscope.
//!
//! Provides the Windows XP SP2 x86 profile (type tables and overlays), the
//! object classes that give `_EPROCESS`, `_MMVAD` and `_UNICODE_STRING`
//! their behavior, iterators over kernel lists, trees and handle tables,
//! and the plugins built on top of them.
//!
//! # Example
//!
//! ```no_run
//! use std::rc::Rc;
//!
//! use memscope_core::{AddressSpace, Config};
//! use memscope_os_windows::{WindowsKernel, plugins, xp_sp2_x86};
//!
//! # fn physical() -> Rc<dyn AddressSpace> { unimplemented!() }
//! let profile = xp_sp2_x86(Config::default());
//! let kernel = WindowsKernel::from_physical(profile, physical())?;
//!
//! for process in plugins::pslist(&kernel)? {
//!     println!("{:?} {:?}", process.pid, process.name);
//! }
//! # Ok::<(), memscope_os_windows::WindowsError>(())
//! ```

pub mod comps;
mod error;
pub mod iter;
mod kernel;
pub mod magic;
pub mod plugins;
pub mod profile;

#[cfg(test)]
mod fixture;

pub use self::{
    comps::{
        WindowsHandleTable, WindowsHandleTableEntry, WindowsModule, WindowsProcess, WindowsRegion,
        WindowsThread,
    },
    error::WindowsError,
    iter::{HandleTableEntryIterator, ListEntryIterator, VadTreeIterator},
    kernel::WindowsKernel,
    magic::{DTB_SCANNER, DtbScanner, KPCR_DEFAULT, WellKnownAddress},
    profile::{WindowsConstants, xp_sp2_x86},
};
