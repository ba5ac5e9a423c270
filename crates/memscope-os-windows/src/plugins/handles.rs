use super::selected_process;
use crate::{WindowsError, WindowsKernel, comps::WindowsHandleTableEntry};

/// A row of the handle listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleInfo {
    /// Handle value.
    pub handle: u64,

    /// Virtual address of the `_OBJECT_HEADER`.
    pub header: u64,

    /// Access mask granted to the handle.
    pub granted_access: Option<u64>,

    /// Object type name (e.g. `File`).
    pub object_type: Option<String>,

    /// Object name, empty for unnamed objects.
    pub name: Option<String>,

    /// Name of the file behind a `File` handle.
    pub file_name: Option<String>,
}

impl From<&WindowsHandleTableEntry> for HandleInfo {
    fn from(entry: &WindowsHandleTableEntry) -> Self {
        let object_type = entry.type_name().ok();
        let file_name = match object_type.as_deref() {
            Some("File") => entry.file_name().ok(),
            _ => None,
        };

        Self {
            handle: entry.handle(),
            header: entry.header().offset(),
            granted_access: entry.granted_access().ok(),
            object_type,
            name: entry.object_name().ok(),
            file_name,
        }
    }
}

/// Lists the open handles of the process selected by the `pid` or
/// `offset` option.
pub fn handles(kernel: &WindowsKernel) -> Result<Vec<HandleInfo>, WindowsError> {
    let process = selected_process(kernel)?;

    Ok(process
        .handles()
        .map(|entry| HandleInfo::from(&entry))
        .collect())
}

#[cfg(test)]
mod tests {
    use memscope_core::{Config, ConfigError};

    use super::*;
    use crate::fixture;

    #[test]
    fn lists_valid_handles() {
        let rows = handles(&fixture::kernel(fixture::with_pid(368))).unwrap();

        assert_eq!(
            rows,
            vec![HandleInfo {
                handle: 0x804,
                header: fixture::OBJECT_HEADER,
                granted_access: Some(0x0012_019f),
                object_type: Some(String::from("File")),
                name: Some(String::from("\\Device\\HarddiskVolume1")),
                file_name: Some(String::from("\\WINDOWS\\system32")),
            }]
        );

        let rows = handles(&fixture::kernel(fixture::with_pid(4))).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn requires_existing_pid() {
        let result = handles(&fixture::kernel(Config::default()));
        assert!(matches!(
            result,
            Err(WindowsError::Config(ConfigError::MissingOption("pid")))
        ));

        let result = handles(&fixture::kernel(fixture::with_pid(999)));
        assert!(matches!(result, Err(WindowsError::ProcessNotFound(999))));
    }

    #[test]
    fn selects_process_by_offset() {
        let rows = handles(&fixture::kernel(Config {
            offset: Some(fixture::SMSS),
            ..Default::default()
        }))
        .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].handle, 0x804);

        // The pid wins over the offset.
        let rows = handles(&fixture::kernel(Config {
            pid: Some(4),
            offset: Some(fixture::SMSS),
            ..Default::default()
        }))
        .unwrap();
        assert!(rows.is_empty());

        let result = handles(&fixture::kernel(Config {
            offset: Some(0x9000_0000),
            ..Default::default()
        }));
        assert!(matches!(result, Err(WindowsError::RootObject(_))));
    }
}
