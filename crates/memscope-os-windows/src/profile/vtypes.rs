//! Base type tables of Windows XP SP2 x86.

use memscope_core::{TypeDef, TypeSpec};

fn ptr(target: &str) -> TypeSpec {
    TypeSpec::pointer(target)
}

fn array(count: u64, element: impl Into<TypeSpec>) -> TypeSpec {
    TypeSpec::array(count, element)
}

/// Returns the composite definitions of the XP SP2 x86 kernel.
pub(crate) fn xp_sp2_x86() -> Vec<(&'static str, TypeDef)> {
    vec![
        (
            "_LIST_ENTRY",
            TypeDef::new(0x8)
                .field("Flink", 0x0, ptr("_LIST_ENTRY"))
                .field("Blink", 0x4, ptr("_LIST_ENTRY")),
        ),
        (
            "_UNICODE_STRING",
            TypeDef::new(0x8)
                .field("Length", 0x0, "unsigned short")
                .field("MaximumLength", 0x2, "unsigned short")
                .field("Buffer", 0x4, ptr("unsigned short")),
        ),
        (
            "_DISPATCHER_HEADER",
            TypeDef::new(0x10)
                .field("Type", 0x0, "unsigned char")
                .field("Absolute", 0x1, "unsigned char")
                .field("Size", 0x2, "unsigned char")
                .field("Inserted", 0x3, "unsigned char")
                .field("SignalState", 0x4, "long")
                .field("WaitListHead", 0x8, "_LIST_ENTRY"),
        ),
        (
            "_KPROCESS",
            TypeDef::new(0x6c)
                .field("Header", 0x0, "_DISPATCHER_HEADER")
                .field("ProfileListHead", 0x10, "_LIST_ENTRY")
                .field("DirectoryTableBase", 0x18, array(2, "unsigned long"))
                .field("ThreadListHead", 0x50, "_LIST_ENTRY"),
        ),
        (
            "_EPROCESS",
            TypeDef::new(0x260)
                .field("Pcb", 0x0, "_KPROCESS")
                .field("CreateTime", 0x70, "unsigned long long")
                .field("ExitTime", 0x78, "unsigned long long")
                .field("UniqueProcessId", 0x84, ptr("void"))
                .field("ActiveProcessLinks", 0x88, "_LIST_ENTRY")
                .field("ObjectTable", 0xc4, ptr("_HANDLE_TABLE"))
                .field("VadRoot", 0x11c, ptr("void"))
                .field("InheritedFromUniqueProcessId", 0x14c, ptr("void"))
                .field("ImageFileName", 0x174, array(16, "unsigned char"))
                .field("ThreadListHead", 0x190, "_LIST_ENTRY")
                .field("ActiveThreads", 0x1a0, "unsigned long")
                .field("Peb", 0x1b0, ptr("_PEB")),
        ),
        (
            "_KTHREAD",
            TypeDef::new(0x1c0)
                .field("Header", 0x0, "_DISPATCHER_HEADER")
                .field("ServiceTable", 0xe0, ptr("void"))
                .field("ThreadListEntry", 0x1b0, "_LIST_ENTRY"),
        ),
        (
            "_ETHREAD",
            TypeDef::new(0x258)
                .field("Tcb", 0x0, "_KTHREAD")
                .field("CreateTime", 0x1c0, "unsigned long long")
                .field("Cid", 0x1ec, "_CLIENT_ID")
                .field("ThreadListEntry", 0x22c, "_LIST_ENTRY"),
        ),
        (
            "_CLIENT_ID",
            TypeDef::new(0x8)
                .field("UniqueProcess", 0x0, ptr("void"))
                .field("UniqueThread", 0x4, ptr("void")),
        ),
        (
            "_HANDLE_TABLE",
            TypeDef::new(0x44)
                .field("TableCode", 0x0, "unsigned long")
                .field("QuotaProcess", 0x4, ptr("_EPROCESS"))
                .field("UniqueProcessId", 0x8, ptr("void"))
                .field("HandleTableList", 0x1c, "_LIST_ENTRY")
                .field("HandleCount", 0x3c, "long"),
        ),
        (
            "_HANDLE_TABLE_ENTRY",
            TypeDef::new(0x8)
                .field("Object", 0x0, ptr("void"))
                .field("GrantedAccess", 0x4, "unsigned long"),
        ),
        (
            "_OBJECT_HEADER",
            TypeDef::new(0x20)
                .field("PointerCount", 0x0, "long")
                .field("HandleCount", 0x4, "long")
                .field("Type", 0x8, ptr("_OBJECT_TYPE"))
                .field("NameInfoOffset", 0xc, "unsigned char")
                .field("HandleInfoOffset", 0xd, "unsigned char")
                .field("QuotaInfoOffset", 0xe, "unsigned char")
                .field("Flags", 0xf, "unsigned char")
                .field("ObjectCreateInfo", 0x10, ptr("void"))
                .field("SecurityDescriptor", 0x14, ptr("void"))
                .field("Body", 0x18, "unsigned long long"),
        ),
        (
            "_OBJECT_TYPE",
            TypeDef::new(0x190)
                .field("Name", 0x40, "_UNICODE_STRING")
                .field("TotalNumberOfObjects", 0x50, "unsigned long")
                .field("TotalNumberOfHandles", 0x54, "unsigned long")
                .field("Key", 0xac, "unsigned long"),
        ),
        (
            "_OBJECT_HEADER_NAME_INFO",
            TypeDef::new(0x10)
                .field("Directory", 0x0, ptr("void"))
                .field("Name", 0x4, "_UNICODE_STRING")
                .field("QueryReferences", 0xc, "unsigned long"),
        ),
        (
            "_PEB",
            TypeDef::new(0x210)
                .field("InheritedAddressSpace", 0x0, "unsigned char")
                .field("BeingDebugged", 0x2, "unsigned char")
                .field("ImageBaseAddress", 0x8, ptr("void"))
                .field("Ldr", 0xc, ptr("_PEB_LDR_DATA"))
                .field("ProcessParameters", 0x10, ptr("_RTL_USER_PROCESS_PARAMETERS")),
        ),
        (
            "_PEB_LDR_DATA",
            TypeDef::new(0x28)
                .field("Length", 0x0, "unsigned long")
                .field("Initialized", 0x4, "unsigned char")
                .field("InLoadOrderModuleList", 0xc, "_LIST_ENTRY")
                .field("InMemoryOrderModuleList", 0x14, "_LIST_ENTRY")
                .field("InInitializationOrderModuleList", 0x1c, "_LIST_ENTRY"),
        ),
        (
            "_RTL_USER_PROCESS_PARAMETERS",
            TypeDef::new(0x290)
                .field("ImagePathName", 0x38, "_UNICODE_STRING")
                .field("CommandLine", 0x40, "_UNICODE_STRING"),
        ),
        (
            "_LDR_DATA_TABLE_ENTRY",
            TypeDef::new(0x50)
                .field("InLoadOrderLinks", 0x0, "_LIST_ENTRY")
                .field("InMemoryOrderLinks", 0x8, "_LIST_ENTRY")
                .field("InInitializationOrderLinks", 0x10, "_LIST_ENTRY")
                .field("DllBase", 0x18, ptr("void"))
                .field("EntryPoint", 0x1c, ptr("void"))
                .field("SizeOfImage", 0x20, "unsigned long")
                .field("FullDllName", 0x24, "_UNICODE_STRING")
                .field("BaseDllName", 0x2c, "_UNICODE_STRING")
                .field("Flags", 0x34, "unsigned long")
                .field("LoadCount", 0x38, "unsigned short"),
        ),
        (
            "_MMVAD",
            TypeDef::new(0x28)
                .field("StartingVpn", 0x0, "unsigned long")
                .field("EndingVpn", 0x4, "unsigned long")
                .field("Parent", 0x8, ptr("_MMVAD"))
                .field("LeftChild", 0xc, ptr("_MMVAD"))
                .field("RightChild", 0x10, ptr("_MMVAD"))
                .field("Flags", 0x14, "unsigned long")
                .field("ControlArea", 0x18, ptr("_CONTROL_AREA")),
        ),
        (
            "_MMVAD_SHORT",
            TypeDef::new(0x18)
                .field("StartingVpn", 0x0, "unsigned long")
                .field("EndingVpn", 0x4, "unsigned long")
                .field("Parent", 0x8, ptr("_MMVAD"))
                .field("LeftChild", 0xc, ptr("_MMVAD"))
                .field("RightChild", 0x10, ptr("_MMVAD"))
                .field("Flags", 0x14, "unsigned long"),
        ),
        (
            "_MMVAD_LONG",
            TypeDef::new(0x34)
                .field("StartingVpn", 0x0, "unsigned long")
                .field("EndingVpn", 0x4, "unsigned long")
                .field("Parent", 0x8, ptr("_MMVAD"))
                .field("LeftChild", 0xc, ptr("_MMVAD"))
                .field("RightChild", 0x10, ptr("_MMVAD"))
                .field("Flags", 0x14, "unsigned long")
                .field("ControlArea", 0x18, ptr("_CONTROL_AREA"))
                .field("FirstPrototypePte", 0x1c, ptr("void"))
                .field("LastContiguousPte", 0x20, ptr("void"))
                .field("Flags2", 0x24, "unsigned long"),
        ),
        (
            "_CONTROL_AREA",
            TypeDef::new(0x30)
                .field("Segment", 0x0, ptr("void"))
                .field("DereferenceList", 0x4, "_LIST_ENTRY")
                .field("NumberOfSectionReferences", 0xc, "unsigned long")
                .field("NumberOfPfnReferences", 0x10, "unsigned long")
                .field("NumberOfMappedViews", 0x14, "unsigned long")
                .field("NumberOfSubsections", 0x18, "unsigned short")
                .field("FlushInProgressCount", 0x1a, "unsigned short")
                .field("NumberOfUserReferences", 0x1c, "unsigned long")
                .field("Flags", 0x20, "unsigned long")
                .field("FilePointer", 0x24, ptr("_FILE_OBJECT"))
                .field("WaitingForDeletion", 0x28, ptr("void"))
                .field("ModifiedWriteCount", 0x2c, "unsigned short")
                .field("NumberOfSystemCacheViews", 0x2e, "unsigned short"),
        ),
        (
            "_FILE_OBJECT",
            TypeDef::new(0x70)
                .field("Type", 0x0, "short")
                .field("Size", 0x2, "short")
                .field("DeviceObject", 0x4, ptr("void"))
                .field("FileName", 0x30, "_UNICODE_STRING"),
        ),
        (
            "_KPCR",
            TypeDef::new(0xd70)
                .field("SelfPcr", 0x1c, ptr("_KPCR"))
                .field("Prcb", 0x20, ptr("void"))
                .field("Irql", 0x24, "unsigned char")
                .field("KdVersionBlock", 0x34, ptr("void")),
        ),
        (
            "_DBGKD_GET_VERSION64",
            TypeDef::new(0x28)
                .field("MajorVersion", 0x0, "unsigned short")
                .field("MinorVersion", 0x2, "unsigned short")
                .field("KernBase", 0x10, "unsigned long long")
                .field("PsLoadedModuleList", 0x18, "unsigned long long")
                .field("DebuggerDataList", 0x20, "unsigned long long"),
        ),
        (
            "_KDDEBUGGER_DATA64",
            TypeDef::new(0x290)
                .field("KernBase", 0x18, "unsigned long long")
                .field("PsLoadedModuleList", 0x48, "unsigned long long")
                .field("PsActiveProcessHead", 0x50, "unsigned long long"),
        ),
        (
            "_KUSER_SHARED_DATA",
            TypeDef::new(0x338)
                .field("TickCountLow", 0x0, "unsigned long")
                .field("TickCountMultiplier", 0x4, "unsigned long")
                .field("InterruptTime", 0x8, "unsigned long long")
                .field("SystemTime", 0x14, "unsigned long long")
                .field("TimeZoneBias", 0x20, "unsigned long long")
                .field("NtSystemRoot", 0x30, array(260, "unsigned short"))
                .field("NtMajorVersion", 0x26c, "unsigned long")
                .field("NtMinorVersion", 0x270, "unsigned long"),
        ),
        (
            "_CM_KEY_NODE",
            TypeDef::new(0x50)
                .field("Signature", 0x0, "unsigned short")
                .field("Flags", 0x2, "unsigned short")
                .field("LastWriteTime", 0x4, "unsigned long long")
                .field("Parent", 0x10, "unsigned long")
                .field("SubKeyCounts", 0x14, array(2, "unsigned long"))
                .field("SubKeyLists", 0x1c, array(2, "unsigned long"))
                .field("ValueList", 0x24, "_CHILD_LIST")
                .field("Security", 0x2c, "unsigned long")
                .field("Class", 0x30, "unsigned long")
                .field("NameLength", 0x48, "unsigned short")
                .field("ClassLength", 0x4a, "unsigned short")
                .field("Name", 0x4c, array(1, "unsigned short")),
        ),
        (
            "_CHILD_LIST",
            TypeDef::new(0x8)
                .field("Count", 0x0, "unsigned long")
                .field("List", 0x4, "unsigned long"),
        ),
        (
            "_CM_KEY_VALUE",
            TypeDef::new(0x18)
                .field("Signature", 0x0, "unsigned short")
                .field("NameLength", 0x2, "unsigned short")
                .field("DataLength", 0x4, "unsigned long")
                .field("Data", 0x8, "unsigned long")
                .field("Type", 0xc, "unsigned long")
                .field("Flags", 0x10, "unsigned short")
                .field("Spare", 0x12, "unsigned short")
                .field("Name", 0x14, array(1, "unsigned short")),
        ),
        (
            "_CM_KEY_INDEX",
            TypeDef::new(0x8)
                .field("Signature", 0x0, "unsigned short")
                .field("Count", 0x2, "unsigned short")
                .field("List", 0x4, array(1, "unsigned long")),
        ),
        (
            "_POOL_HEADER",
            TypeDef::new(0x8)
                .field("PreviousSize", 0x0, TypeSpec::bitfield(0, 9))
                .field("Ulong1", 0x0, "unsigned long")
                .field("ProcessBilled", 0x4, ptr("_EPROCESS"))
                .field("PoolTag", 0x4, "unsigned long")
                .field("AllocatorBackTraceIndex", 0x4, "unsigned short")
                .field("PoolTagHash", 0x6, "unsigned short"),
        ),
        (
            "_PHYSICAL_MEMORY_DESCRIPTOR",
            TypeDef::new(0x10)
                .field("NumberOfRuns", 0x0, "unsigned long")
                .field("NumberOfPages", 0x4, "unsigned long")
                .field("Run", 0x8, array(1, "_PHYSICAL_MEMORY_RUN")),
        ),
        (
            "_PHYSICAL_MEMORY_RUN",
            TypeDef::new(0x8)
                .field("BasePage", 0x0, "unsigned long")
                .field("PageCount", 0x4, "unsigned long"),
        ),
        (
            "_ADDRESS_OBJECT",
            TypeDef::new(0x160)
                .field("Next", 0x0, ptr("_ADDRESS_OBJECT"))
                .field("LocalIpAddress", 0x2c, "unsigned long")
                .field("LocalPort", 0x30, "unsigned short")
                .field("Protocol", 0x32, "unsigned short")
                .field("Pid", 0x148, "unsigned long")
                .field("CreateTime", 0x158, "unsigned long long"),
        ),
        (
            "_TCPT_OBJECT",
            TypeDef::new(0x20)
                .field("Next", 0x0, ptr("_TCPT_OBJECT"))
                .field("RemoteIpAddress", 0xc, "unsigned long")
                .field("LocalIpAddress", 0x10, "unsigned long")
                .field("RemotePort", 0x14, "unsigned short")
                .field("LocalPort", 0x16, "unsigned short")
                .field("Pid", 0x18, "unsigned long"),
        ),
        (
            "_SERVICE_DESCRIPTOR_TABLE",
            TypeDef::new(0x40).field("Descriptors", 0x0, array(4, "_SERVICE_DESCRIPTOR_ENTRY")),
        ),
        (
            "_SERVICE_DESCRIPTOR_ENTRY",
            TypeDef::new(0x10)
                .field("KiServiceTable", 0x0, ptr("void"))
                .field("CounterBaseTable", 0x4, ptr("unsigned long"))
                .field("ServiceLimit", 0x8, "long")
                .field("ArgumentTable", 0xc, ptr("unsigned char")),
        ),
        ("VOLATILITY_MAGIC", TypeDef::new(0x0)),
    ]
}
