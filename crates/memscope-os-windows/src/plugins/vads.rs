use super::selected_process;
use crate::{WindowsError, WindowsKernel, comps::WindowsRegion};

/// A row of the VAD listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VadInfo {
    /// Virtual address of the VAD node.
    pub offset: u64,

    /// Pool tag of the node.
    pub tag: Option<String>,

    /// First address of the region.
    pub start: Option<u64>,

    /// Last address of the region.
    pub end: Option<u64>,

    /// Protection name.
    pub protection: Option<&'static str>,

    /// Whether the region is private memory.
    pub private: Option<bool>,

    /// Number of committed pages.
    pub commit_charge: Option<u64>,

    /// Name of the mapped file, for file-backed regions.
    pub file_name: Option<String>,
}

impl From<&WindowsRegion> for VadInfo {
    fn from(region: &WindowsRegion) -> Self {
        Self {
            offset: region.offset(),
            tag: region.tag(),
            start: region.start().ok().map(|va| va.0),
            end: region.end().ok().map(|va| va.0),
            protection: region.protection_name().ok(),
            private: region.is_private().ok(),
            commit_charge: region.commit_charge().ok(),
            file_name: region.file_name().ok(),
        }
    }
}

/// Lists the VAD tree of the process selected by the `pid` or `offset`
/// option, in pre-order.
pub fn vads(kernel: &WindowsKernel) -> Result<Vec<VadInfo>, WindowsError> {
    let process = selected_process(kernel)?;

    Ok(process
        .regions()
        .map(|region| VadInfo::from(&region))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture;

    #[test]
    fn walks_vad_tree() {
        let rows = vads(&fixture::kernel(fixture::with_pid(368))).unwrap();

        assert_eq!(
            rows,
            vec![
                VadInfo {
                    offset: fixture::VAD_ROOT,
                    tag: Some(String::from("VadS")),
                    start: Some(0x40_0000),
                    end: Some(0x40_ffff),
                    protection: Some("PAGE_READWRITE"),
                    private: Some(true),
                    commit_charge: Some(0x10),
                    file_name: None,
                },
                VadInfo {
                    offset: fixture::VAD_LONG,
                    tag: Some(String::from("Vad ")),
                    start: Some(0x4858_0000),
                    end: Some(0x4858_efff),
                    protection: Some("PAGE_EXECUTE_WRITECOPY"),
                    private: Some(false),
                    commit_charge: Some(0),
                    file_name: Some(String::from("\\WINDOWS\\system32\\smss.exe")),
                },
            ]
        );
    }

    #[test]
    fn process_without_vads() {
        let rows = vads(&fixture::kernel(fixture::with_pid(4))).unwrap();
        assert!(rows.is_empty());
    }
}
