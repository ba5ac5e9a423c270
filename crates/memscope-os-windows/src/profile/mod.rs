//! Windows profiles.

mod overlays;
mod vtypes;

use std::{collections::HashMap, rc::Rc};

use memscope_core::{Config, NativeType, Profile, ProfileBuilder};

use crate::{
    comps::{ProcessClass, UnicodeStringClass, VadClass, WIN_TIMESTAMP, WinTimeStampClass},
    magic::{DTB_SCANNER, DtbScanner, KPCR_DEFAULT, WellKnownAddress},
};

/// Name of the profile constant holding the handle table level mask.
pub const HANDLE_TABLE_LEVEL_MASK: &str = "HandleTableLevelMask";

/// Name of the profile constant holding the deepest valid handle table
/// level.
pub const HANDLE_TABLE_MAX_LEVEL: &str = "HandleTableMaxLevel";

/// Name of the profile constant holding the handle object pointer mask.
pub const HANDLE_OBJECT_MASK: &str = "HandleObjectMask";

/// Name of the profile constant holding the number of entries of a leaf
/// handle table.
pub const HANDLE_LEAF_ENTRIES: &str = "HandleLeafEntries";

/// Name of the profile constant holding the number of entries of a non-leaf
/// handle table.
pub const HANDLE_MID_ENTRIES: &str = "HandleMidEntries";

/// Name of the profile constant holding the lowest kernel-mode address.
pub const KERNEL_SPACE_START: &str = "KernelSpaceStart";

/// Data that differs between Windows builds but is not part of the type
/// tables.
#[derive(Debug, Clone)]
pub struct WindowsConstants {
    /// Bits of `_HANDLE_TABLE.TableCode` that encode the table level.
    pub handle_table_level_mask: u64,

    /// Deepest level a `TableCode` may encode.
    pub handle_table_max_level: u64,

    /// Bits of `_HANDLE_TABLE_ENTRY.Object` that hold the header address.
    pub handle_object_mask: u64,

    /// Number of `_HANDLE_TABLE_ENTRY` in a leaf table.
    pub handle_leaf_entries: u64,

    /// Number of pointers in a non-leaf table.
    pub handle_mid_entries: u64,

    /// VAD pool tags and the type each one selects.
    pub vad_tags: HashMap<[u8; 4], &'static str>,

    /// Bytes at the start of every `_EPROCESS` (its dispatcher header).
    pub dtb_signature: Vec<u8>,

    /// Default virtual address of the `_KPCR`.
    pub kpcr: u64,

    /// Fixed virtual address of `_KUSER_SHARED_DATA`.
    pub kuser_shared_data: u64,

    /// Lowest kernel-mode virtual address.
    pub kernel_space_start: u64,
}

impl WindowsConstants {
    /// Constants of Windows XP SP2 x86.
    pub fn xp_sp2_x86() -> Self {
        Self {
            handle_table_level_mask: 7,
            handle_table_max_level: 2,
            handle_object_mask: 0xffff_fff8,
            handle_leaf_entries: 0x200,
            handle_mid_entries: 0x400,
            vad_tags: HashMap::from([
                (*b"Vadl", "_MMVAD_LONG"),
                (*b"Vad ", "_MMVAD_LONG"),
                (*b"VadS", "_MMVAD_SHORT"),
                (*b"VadF", "_MMVAD_SHORT"),
            ]),
            dtb_signature: vec![0x03, 0x00, 0x1b, 0x00],
            kpcr: 0xffdf_f000,
            kuser_shared_data: 0xffdf_0000,
            kernel_space_start: 0x8000_0000,
        }
    }
}

/// Builds the Windows XP SP2 x86 profile.
///
/// The profile registers the `_EPROCESS`, `_MMVAD` and `_UNICODE_STRING`
/// classes and the DTB scanner.
pub fn xp_sp2_x86(config: Config) -> Rc<Profile> {
    let constants = WindowsConstants::xp_sp2_x86();

    let mut builder = ProfileBuilder::new("WinXPSP2x86")
        .pointer_size(4)
        .vtypes(vtypes::xp_sp2_x86());

    for (name, patch) in overlays::xp_sp2_x86(&constants) {
        builder = builder.register_type_overlay(name, patch);
    }

    builder
        .register_object_class("_EPROCESS", ProcessClass)
        .register_object_class("_MMVAD", VadClass::new(constants.vad_tags.clone()))
        .register_object_class("_UNICODE_STRING", UnicodeStringClass)
        .native(WIN_TIMESTAMP, NativeType::unsigned(8))
        .register_object_class(WIN_TIMESTAMP, WinTimeStampClass)
        .register_magic(DTB_SCANNER, DtbScanner::new(constants.dtb_signature.clone()))
        .register_magic(KPCR_DEFAULT, WellKnownAddress(constants.kpcr))
        .constant(HANDLE_TABLE_LEVEL_MASK, constants.handle_table_level_mask)
        .constant(HANDLE_TABLE_MAX_LEVEL, constants.handle_table_max_level)
        .constant(HANDLE_OBJECT_MASK, constants.handle_object_mask)
        .constant(HANDLE_LEAF_ENTRIES, constants.handle_leaf_entries)
        .constant(HANDLE_MID_ENTRIES, constants.handle_mid_entries)
        .constant(KERNEL_SPACE_START, constants.kernel_space_start)
        .config(config)
        .build()
}
