//! Overlays that refine the XP SP2 x86 type tables.

use memscope_core::{
    Count, MagicValue, NativeType, TypeDef, TypeSpec, computed_count,
    magic::MAGIC_NAMESPACE,
};

use super::WindowsConstants;
use crate::{
    comps::WIN_TIMESTAMP,
    magic::{DTB_SCANNER, KPCR_DEFAULT},
};

/// `_MMVAD_SHORT.Flags` / `_MMVAD_LONG.Flags`.
fn mmvad_flags() -> TypeSpec {
    TypeSpec::flags(
        NativeType::unsigned(4),
        [
            ("PhysicalMapping", 0x13),
            ("ImageMap", 0x14),
            ("UserPhysicalPages", 0x15),
            ("NoChange", 0x16),
            ("WriteWatch", 0x17),
            ("LargePages", 0x1d),
            ("MemCommit", 0x1e),
            ("PrivateMemory", 0x1f),
        ],
        [("CommitCharge", (0x0, 0x13)), ("Protection", (0x18, 0x5))],
    )
}

/// `_MMVAD_LONG.Flags2`.
fn mmvad_flags2() -> TypeSpec {
    TypeSpec::flags(
        NativeType::unsigned(4),
        [
            ("SecNoChange", 0x18),
            ("OneSecured", 0x19),
            ("MultipleSecured", 0x1a),
            ("ReadOnly", 0x1b),
            ("LongVad", 0x1c),
            ("ExtendableFile", 0x1d),
            ("Inherit", 0x1e),
            ("CopyOnWrite", 0x1f),
        ],
        [("FileOffset", (0x0, 0x18))],
    )
}

/// `_CONTROL_AREA.Flags`.
fn control_area_flags() -> TypeSpec {
    TypeSpec::flags(
        NativeType::unsigned(4),
        [
            ("BeingDeleted", 0x0),
            ("BeingCreated", 0x1),
            ("BeingPurged", 0x2),
            ("NoModifiedWriting", 0x3),
            ("FailAllIo", 0x4),
            ("Image", 0x5),
            ("Based", 0x6),
            ("File", 0x7),
            ("Networked", 0x8),
            ("NoCache", 0x9),
            ("PhysicalMemory", 0xa),
            ("CopyOnWrite", 0xb),
            ("Reserve", 0xc),
            ("Commit", 0xd),
            ("FloppyMedia", 0xe),
            ("WasPurged", 0xf),
            ("UserReference", 0x10),
            ("GlobalMemory", 0x11),
            ("DeleteOnClose", 0x12),
            ("FilePointerNull", 0x13),
            ("DebugSymbolsLoaded", 0x14),
            ("SetMappedFileIoComplete", 0x15),
            ("CollidedFlush", 0x16),
            ("NoChange", 0x17),
            ("HadUserReference", 0x18),
            ("ImageMappedInSystemSpace", 0x19),
            ("UserWritable", 0x1a),
            ("Accessed", 0x1b),
            ("GlobalOnlyPerSession", 0x1c),
            ("Rom", 0x1d),
        ],
        [],
    )
}

/// Returns the overlays of the XP SP2 x86 profile.
pub(crate) fn xp_sp2_x86(constants: &WindowsConstants) -> Vec<(&'static str, TypeDef)> {
    vec![
        (
            MAGIC_NAMESPACE,
            TypeDef::patch()
                .field("DTB", 0x0, TypeSpec::magic_suggested(DTB_SCANNER, Some("DTB")))
                .field(
                    "DTBSignature",
                    0x0,
                    TypeSpec::magic(MagicValue::Bytes(constants.dtb_signature.clone())),
                )
                .field("KPCR", 0x0, TypeSpec::magic_suggested(KPCR_DEFAULT, Some("KPCR")))
                .field(
                    "KUSER_SHARED_DATA",
                    0x0,
                    TypeSpec::magic(MagicValue::Int(constants.kuser_shared_data)),
                ),
        ),
        (
            "_EPROCESS",
            TypeDef::patch()
                .retype("CreateTime", WIN_TIMESTAMP)
                .retype("ExitTime", WIN_TIMESTAMP)
                .retype("ImageFileName", TypeSpec::string(16u64))
                .retype("UniqueProcessId", "unsigned int")
                .retype("InheritedFromUniqueProcessId", "unsigned int")
                .retype("VadRoot", TypeSpec::pointer("_MMVAD")),
        ),
        (
            "_KUSER_SHARED_DATA",
            TypeDef::patch()
                .retype("SystemTime", WIN_TIMESTAMP)
                .retype("TimeZoneBias", WIN_TIMESTAMP),
        ),
        (
            "_ADDRESS_OBJECT",
            TypeDef::patch()
                .retype("LocalPort", "unsigned be short")
                .retype("CreateTime", WIN_TIMESTAMP),
        ),
        (
            "_TCPT_OBJECT",
            TypeDef::patch()
                .retype("RemotePort", "unsigned be short")
                .retype("LocalPort", "unsigned be short"),
        ),
        (
            "_CLIENT_ID",
            TypeDef::patch()
                .retype("UniqueProcess", "unsigned int")
                .retype("UniqueThread", "unsigned int"),
        ),
        (
            "_OBJECT_HEADER",
            TypeDef::patch().retype("Body", "unsigned int"),
        ),
        (
            "_KPCR",
            TypeDef::patch().retype("KdVersionBlock", TypeSpec::pointer("_DBGKD_GET_VERSION64")),
        ),
        (
            "_DBGKD_GET_VERSION64",
            TypeDef::patch().retype("DebuggerDataList", TypeSpec::pointer("unsigned long")),
        ),
        (
            "_KDDEBUGGER_DATA64",
            TypeDef::patch()
                .retype("PsActiveProcessHead", TypeSpec::pointer("_LIST_ENTRY"))
                .retype("PsLoadedModuleList", TypeSpec::pointer("_LIST_ENTRY")),
        ),
        (
            "_CM_KEY_NODE",
            TypeDef::patch()
                .retype("Signature", TypeSpec::string(2u64))
                .retype("LastWriteTime", WIN_TIMESTAMP)
                .retype("Name", TypeSpec::string(Count::member("NameLength"))),
        ),
        (
            "_CHILD_LIST",
            TypeDef::patch().retype(
                "List",
                TypeSpec::pointer(TypeSpec::array(
                    Count::member("Count"),
                    TypeSpec::pointer("_CM_KEY_VALUE"),
                )),
            ),
        ),
        (
            "_CM_KEY_VALUE",
            TypeDef::patch()
                .retype("Signature", TypeSpec::string(2u64))
                .retype("Name", TypeSpec::string(Count::member("NameLength"))),
        ),
        (
            "_CM_KEY_INDEX",
            TypeDef::patch()
                .retype("Signature", TypeSpec::string(2u64))
                .retype(
                    "List",
                    TypeSpec::array(
                        computed_count(|index| index.m("Count"), 2),
                        TypeSpec::pointer("_CM_KEY_NODE"),
                    ),
                ),
        ),
        (
            "_PHYSICAL_MEMORY_DESCRIPTOR",
            TypeDef::patch().retype(
                "Run",
                TypeSpec::array(Count::member("NumberOfRuns"), "_PHYSICAL_MEMORY_RUN"),
            ),
        ),
        (
            "_POOL_HEADER",
            TypeDef::patch()
                .field("PoolIndex", 0x0, TypeSpec::bitfield(9, 16))
                .field("BlockSize", 0x2, TypeSpec::bitfield(0, 9))
                .field("PoolType", 0x2, TypeSpec::bitfield(9, 16)),
        ),
        (
            "_CONTROL_AREA",
            TypeDef::patch().retype("Flags", control_area_flags()),
        ),
        (
            "_MMVAD_SHORT",
            TypeDef::patch().retype("Flags", mmvad_flags()),
        ),
        (
            "_MMVAD_LONG",
            TypeDef::patch()
                .retype("Flags", mmvad_flags())
                .retype("Flags2", mmvad_flags2()),
        ),
    ]
}
