use std::{collections::HashMap, rc::Rc};

use memscope_core::{
    Hex, MaybeObject, NoneObject, Object, ObjectArgs, ObjectChain, ObjectClass, Profile, Va,
};

use super::{WindowsProcess, read_unicode_string};

/// Protection names indexed by the low three bits of the VAD protection.
const PROTECTION: [&str; 8] = [
    "PAGE_NOACCESS",
    "PAGE_READONLY",
    "PAGE_EXECUTE",
    "PAGE_EXECUTE_READ",
    "PAGE_READWRITE",
    "PAGE_WRITECOPY",
    "PAGE_EXECUTE_READWRITE",
    "PAGE_EXECUTE_WRITECOPY",
];

/// Class of `_MMVAD`.
///
/// The concrete VAD type is selected by the pool tag that precedes the
/// node. A VAD reached from an `_EPROCESS` lives in that process's address
/// space.
pub struct VadClass {
    tags: HashMap<[u8; 4], &'static str>,
}

impl VadClass {
    /// Creates the class with a tag table.
    pub fn new(tags: HashMap<[u8; 4], &'static str>) -> Self {
        Self { tags }
    }
}

impl ObjectClass for VadClass {
    fn instantiate(&self, profile: &Rc<Profile>, _type_name: &str, mut args: ObjectArgs) -> MaybeObject {
        if let Some(parent) = &args.parent
            && parent.type_name() == "_EPROCESS"
        {
            args.vm = WindowsProcess::new(parent.clone()).address_space()?;
        }

        let tag_offset = args.offset.wrapping_sub(4);
        let tag: [u8; 4] = args
            .vm
            .read_exact(tag_offset, 4)
            .and_then(|tag| tag.try_into().ok())
            .ok_or_else(|| {
                NoneObject::new(format!("VAD tag at {} is not readable", Hex(tag_offset)))
            })?;

        let Some(&type_name) = self.tags.get(&tag) else {
            tracing::debug!(
                offset = %Hex(args.offset),
                tag = %Hex(&tag[..]),
                "unknown VAD tag"
            );

            return Err(NoneObject::new(format!(
                "Unknown VAD tag {:?}",
                String::from_utf8_lossy(&tag)
            )));
        };

        profile
            .object_with(&type_name.into(), args)
            .map(|vad| vad.with_tag(tag.to_vec()))
    }
}

/// A Windows memory region.
///
/// A memory region represents a range of virtual memory allocated
/// within a process, described by a **Virtual Address Descriptor (VAD)**.
///
/// # Implementation Details
///
/// Corresponds to `_MMVAD_SHORT` or `_MMVAD_LONG`.
pub struct WindowsRegion {
    object: Object,
}

impl WindowsRegion {
    /// Creates a new Windows memory region.
    pub fn new(object: Object) -> Self {
        Self { object }
    }

    /// Returns the underlying VAD object.
    pub fn object(&self) -> &Object {
        &self.object
    }

    /// Returns the address of the VAD node.
    pub fn offset(&self) -> u64 {
        self.object.offset()
    }

    /// Returns the pool tag that selected the VAD type.
    pub fn tag(&self) -> Option<String> {
        self.object
            .tag()
            .map(|tag| String::from_utf8_lossy(tag).into_owned())
    }

    /// Checks whether this is a long VAD.
    pub fn is_long(&self) -> bool {
        self.object.type_name() == "_MMVAD_LONG"
    }

    /// Returns the first address of the region.
    ///
    /// # Implementation Details
    ///
    /// Corresponds to `_MMVAD.StartingVpn << 12`.
    pub fn start(&self) -> Result<Va, NoneObject> {
        Ok(Va(self.object.m("StartingVpn")?.value()? << 12))
    }

    /// Returns the last address of the region (inclusive).
    ///
    /// # Implementation Details
    ///
    /// Corresponds to `((_MMVAD.EndingVpn + 1) << 12) - 1`.
    pub fn end(&self) -> Result<Va, NoneObject> {
        Ok(Va(((self.object.m("EndingVpn")?.value()? + 1) << 12) - 1))
    }

    /// Returns the VAD flags.
    pub fn flags(&self) -> MaybeObject {
        self.object.m("Flags")
    }

    /// Returns the protection index.
    pub fn protection(&self) -> Result<u64, NoneObject> {
        self.flags()?.mask("Protection")
    }

    /// Returns the name of the protection.
    pub fn protection_name(&self) -> Result<&'static str, NoneObject> {
        let protection = self.protection()?;
        Ok(PROTECTION[(protection & 7) as usize])
    }

    /// Returns the number of committed pages.
    pub fn commit_charge(&self) -> Result<u64, NoneObject> {
        self.flags()?.mask("CommitCharge")
    }

    /// Checks whether the region is private memory.
    pub fn is_private(&self) -> Result<bool, NoneObject> {
        self.flags()?.has_flag("PrivateMemory")
    }

    /// Returns the control area of a mapped region.
    ///
    /// Only long VADs describe mapped memory.
    pub fn control_area(&self) -> MaybeObject {
        if !self.is_long() {
            return Err(NoneObject::new("short VAD has no control area"));
        }

        self.object.m("ControlArea").dereference()
    }

    /// Returns the name of the mapped file.
    ///
    /// # Implementation Details
    ///
    /// Corresponds to `_MMVAD_LONG.ControlArea->FilePointer->FileName`.
    pub fn file_name(&self) -> Result<String, NoneObject> {
        let name = self.control_area().m("FilePointer").m("FileName")?;
        read_unicode_string(&name)
    }
}

impl std::fmt::Debug for WindowsRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowsRegion")
            .field("offset", &Hex(self.offset()))
            .field("tag", &self.tag())
            .field("start", &self.start().ok())
            .field("end", &self.end().ok())
            .finish()
    }
}
