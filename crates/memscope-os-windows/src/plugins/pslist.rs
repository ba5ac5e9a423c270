use chrono::{DateTime, Utc};

use crate::{WindowsError, WindowsKernel, comps::WindowsProcess};

/// A row of the process listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    /// Virtual address of the `_EPROCESS`.
    pub offset: u64,

    /// Image name.
    pub name: Option<String>,

    /// Process ID.
    pub pid: Option<u32>,

    /// Parent process ID.
    pub ppid: Option<u32>,

    /// Number of active threads.
    pub threads: Option<u64>,

    /// Creation time.
    pub create_time: Option<DateTime<Utc>>,

    /// Exit time, for processes that have exited.
    pub exit_time: Option<DateTime<Utc>>,

    /// Physical address of the page directory.
    pub dtb: Option<u64>,
}

impl From<&WindowsProcess> for ProcessInfo {
    fn from(process: &WindowsProcess) -> Self {
        Self {
            offset: process.offset(),
            name: process.name().ok(),
            pid: process.id().ok(),
            ppid: process.parent_id().ok(),
            threads: process.active_threads().ok(),
            create_time: process.create_time().ok().flatten(),
            exit_time: process.exit_time().ok().flatten(),
            dtb: process.directory_table_base().ok().map(|dtb| dtb.0),
        }
    }
}

/// Lists the active processes.
pub fn pslist(kernel: &WindowsKernel) -> Result<Vec<ProcessInfo>, WindowsError> {
    let result = kernel
        .processes()?
        .map(|process| ProcessInfo::from(&process))
        .collect::<Vec<_>>();

    tracing::debug!(count = result.len(), "listed processes");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use memscope_core::Config;

    use super::*;
    use crate::fixture;

    #[test]
    fn lists_active_processes() {
        let rows = pslist(&fixture::kernel(Config::default())).unwrap();
        let created = DateTime::from_timestamp(1_229_183_223, 278_361_600).unwrap();

        assert_eq!(
            rows,
            vec![
                ProcessInfo {
                    offset: fixture::SYSTEM,
                    name: Some(String::from("System")),
                    pid: Some(4),
                    ppid: Some(0),
                    threads: Some(1),
                    create_time: Some(created),
                    exit_time: None,
                    dtb: Some(fixture::KERNEL_DTB),
                },
                ProcessInfo {
                    offset: fixture::SMSS,
                    name: Some(String::from("smss.exe")),
                    pid: Some(368),
                    ppid: Some(4),
                    threads: Some(0),
                    create_time: Some(created),
                    exit_time: None,
                    dtb: Some(fixture::SMSS_DTB),
                },
            ]
        );
    }
}
