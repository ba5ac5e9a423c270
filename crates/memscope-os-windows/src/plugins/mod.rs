//! Plugins.
//!
//! A plugin walks the structures reachable from a [`WindowsKernel`] and
//! returns plain rows. Rows use `Option` for every field read from memory,
//! so a corrupt structure shows up as a missing value instead of aborting
//! the whole listing.
//!
//! [`WindowsKernel`]: crate::WindowsKernel

mod handles;
mod modules;
mod pslist;
mod ssdt;
mod vads;

pub use self::{
    handles::{HandleInfo, handles},
    modules::{ModuleInfo, ModuleMap, modules},
    pslist::{ProcessInfo, pslist},
    ssdt::{ServiceEntry, ServiceTable, ssdt},
    vads::{VadInfo, vads},
};
use crate::{WindowsError, WindowsKernel, comps::WindowsProcess};

/// Returns the process selected by the `pid` option, or else the
/// `_EPROCESS` at the `offset` option.
///
/// A process selected by offset need not be linked into the process list.
fn selected_process(kernel: &WindowsKernel) -> Result<WindowsProcess, WindowsError> {
    let config = kernel.config();

    let pid = match (config.require_pid(), config.offset) {
        (Ok(pid), _) => pid,
        (Err(_), Some(offset)) => {
            let process = kernel.profile().object("_EPROCESS", offset, kernel.vm())?;
            return Ok(WindowsProcess::new(process));
        }
        (Err(err), None) => return Err(err.into()),
    };

    match kernel.find_process(pid)? {
        Some(process) => Ok(process),
        None => Err(WindowsError::ProcessNotFound(pid)),
    }
}
