//! A small synthetic Windows XP SP2 x86 memory image.
//!
//! Physical memory holds two page directories. The kernel one maps three
//! 4 MiB kernel pages; the one of `smss.exe` additionally maps the user
//! page holding its PEB. On top of that live two processes, two kernel
//! modules, one thread with a service descriptor table, a handle table
//! and a VAD tree.

use std::rc::Rc;

use memscope_core::{AddressSpace, BufferSpace, Config};

use crate::{WindowsKernel, xp_sp2_x86};

pub(crate) const KERNEL_DTB: u64 = 0x1_0000;
pub(crate) const SMSS_DTB: u64 = 0x1_1000;

pub(crate) const PS_ACTIVE_PROCESS_HEAD: u64 = 0x8000_1000;
pub(crate) const PS_LOADED_MODULE_LIST: u64 = 0x8000_1100;
pub(crate) const KDBG: u64 = 0x8000_3000;

pub(crate) const SYSTEM: u64 = 0x8001_0000;
pub(crate) const SMSS: u64 = 0x8001_1000;
pub(crate) const SYSTEM_THREAD: u64 = 0x8003_0000;

pub(crate) const SERVICE_DESCRIPTOR_TABLE: u64 = 0x8004_0000;
pub(crate) const KI_SERVICE_TABLE: u64 = 0x804e_26a8;
pub(crate) const SHADOW_SERVICE_TABLE: u64 = 0x8070_0000;

pub(crate) const OBJECT_HEADER: u64 = 0x8005_3020;

pub(crate) const VAD_ROOT: u64 = 0x8006_0008;
pub(crate) const VAD_LONG: u64 = 0x8006_0108;

pub(crate) const PEB: u64 = 0x7ffd_f000;

const KD_VERSION_BLOCK: u64 = 0x8000_2000;
const DEBUGGER_DATA_LIST: u64 = 0x8000_2100;
const KPCR: u64 = 0xffdf_f000;

const NTOSKRNL_ENTRY: u64 = 0x8002_0000;
const HAL_ENTRY: u64 = 0x8002_0100;

const HANDLE_TABLE: u64 = 0x8005_0000;
const HANDLE_MID: u64 = 0x8005_1000;
const HANDLE_LEAF: u64 = 0x8005_2000;
const FILE_TYPE: u64 = 0x8005_4000;

const VAD_UNKNOWN: u64 = 0x8006_0208;
const CONTROL_AREA: u64 = 0x8006_1000;
const FILE_OBJECT: u64 = 0x8006_2000;

const LDR: u64 = 0x7ffd_f800;
const USER_MODULE: u64 = 0x7ffd_e000;

/// Page directory indices and the physical base of their 4 MiB page.
const LARGE_PAGES: [(u64, u64); 4] = [
    (0x1ff, 0x00c0_0000),
    (0x200, 0x0040_0000),
    (0x201, 0x0080_0000),
    (0x3ff, 0x0100_0000),
];

struct Image(BufferSpace);

impl Image {
    fn pa(va: u64) -> u64 {
        let (_, base) = LARGE_PAGES
            .iter()
            .find(|(index, _)| *index == va >> 22)
            .unwrap_or_else(|| panic!("{va:#x} is not mapped by the fixture"));

        base + (va & 0x3f_ffff)
    }

    fn write(&mut self, va: u64, data: &[u8]) {
        self.0.write(Self::pa(va), data);
    }

    fn u32(&mut self, va: u64, value: u64) {
        self.0.write_u32(Self::pa(va), value as u32);
    }

    fn list_entry(&mut self, va: u64, flink: u64, blink: u64) {
        self.u32(va, flink);
        self.u32(va + 4, blink);
    }

    fn unicode_string(&mut self, va: u64, buffer: u64, value: &str) {
        let data = value
            .encode_utf16()
            .flat_map(u16::to_le_bytes)
            .collect::<Vec<_>>();

        self.write(va, &(data.len() as u16).to_le_bytes());
        self.write(va + 2, &(data.len() as u16 + 2).to_le_bytes());
        self.u32(va + 4, buffer);
        self.write(buffer, &data);
    }

    fn page_directories(&mut self) {
        // Low memory, scanned for the idle process.
        self.0.write(0, &[0; 0x12000]);

        for (index, base) in LARGE_PAGES {
            let pde = base | 0x83;

            if index != 0x1ff {
                self.0.write_u32(KERNEL_DTB + index * 4, pde as u32);
            }

            self.0.write_u32(SMSS_DTB + index * 4, pde as u32);
        }

        // The idle process, in physical memory only.
        let idle = 0x5000;
        self.0.write(idle, &[0x03, 0x00, 0x1b, 0x00]);
        self.0.write_u32(idle + 0x18, KERNEL_DTB as u32);
        self.0.write(idle + 0x174, b"Idle");
    }

    fn debugger_data(&mut self) {
        self.write(KPCR, &[0; 0x100]);
        self.u32(KPCR + 0x1c, KPCR);
        self.u32(KPCR + 0x34, KD_VERSION_BLOCK);

        self.u32(KD_VERSION_BLOCK + 0x20, DEBUGGER_DATA_LIST);
        self.u32(DEBUGGER_DATA_LIST, KDBG);

        self.write(KDBG, &[0; 0x290]);
        self.u32(KDBG + 0x48, PS_LOADED_MODULE_LIST);
        self.u32(KDBG + 0x50, PS_ACTIVE_PROCESS_HEAD);
    }

    fn process(&mut self, va: u64, name: &[u8], pid: u64, ppid: u64, dtb: u64, links: (u64, u64)) {
        self.write(va, &[0; 0x260]);
        self.u32(va + 0x18, dtb);
        self.write(va + 0x70, &0x01c9_5d3a_0b1e_2f00_u64.to_le_bytes());
        self.u32(va + 0x84, pid);
        self.list_entry(va + 0x88, links.0, links.1);
        self.u32(va + 0x14c, ppid);
        self.write(va + 0x174, name);
    }

    fn processes(&mut self) {
        self.list_entry(PS_ACTIVE_PROCESS_HEAD, SYSTEM + 0x88, SMSS + 0x88);

        self.process(
            SYSTEM,
            b"System",
            4,
            0,
            KERNEL_DTB,
            (SMSS + 0x88, PS_ACTIVE_PROCESS_HEAD),
        );
        self.list_entry(SYSTEM + 0x190, SYSTEM_THREAD + 0x22c, SYSTEM_THREAD + 0x22c);
        self.u32(SYSTEM + 0x1a0, 1);

        self.process(
            SMSS,
            b"smss.exe",
            368,
            4,
            SMSS_DTB,
            (PS_ACTIVE_PROCESS_HEAD, SYSTEM + 0x88),
        );
        self.list_entry(SMSS + 0x190, SMSS + 0x190, SMSS + 0x190);
        self.u32(SMSS + 0xc4, HANDLE_TABLE);
        self.u32(SMSS + 0x11c, VAD_ROOT);
        self.u32(SMSS + 0x1b0, PEB);
    }

    fn modules(&mut self) {
        self.list_entry(PS_LOADED_MODULE_LIST, NTOSKRNL_ENTRY, HAL_ENTRY);

        self.list_entry(NTOSKRNL_ENTRY, HAL_ENTRY, PS_LOADED_MODULE_LIST);
        self.u32(NTOSKRNL_ENTRY + 0x18, 0x804d_7000);
        self.u32(NTOSKRNL_ENTRY + 0x1c, 0x806a_3ae0);
        self.u32(NTOSKRNL_ENTRY + 0x20, 0x1f_7000);
        self.unicode_string(
            NTOSKRNL_ENTRY + 0x24,
            0x8007_0000,
            "\\WINDOWS\\system32\\ntoskrnl.exe",
        );
        self.unicode_string(NTOSKRNL_ENTRY + 0x2c, 0x8007_0100, "ntoskrnl.exe");

        self.list_entry(HAL_ENTRY, PS_LOADED_MODULE_LIST, NTOSKRNL_ENTRY);
        self.u32(HAL_ENTRY + 0x18, 0x806c_e000);
        self.u32(HAL_ENTRY + 0x20, 0x2_0380);
        self.unicode_string(HAL_ENTRY + 0x24, 0x8007_0200, "\\WINDOWS\\system32\\hal.dll");
        self.unicode_string(HAL_ENTRY + 0x2c, 0x8007_0300, "hal.dll");
    }

    fn threads(&mut self) {
        self.write(SYSTEM_THREAD, &[0; 0x258]);
        self.u32(SYSTEM_THREAD + 0xe0, SERVICE_DESCRIPTOR_TABLE);
        self.u32(SYSTEM_THREAD + 0x1ec, 4);
        self.u32(SYSTEM_THREAD + 0x1f0, 8);
        self.list_entry(SYSTEM_THREAD + 0x22c, SYSTEM + 0x190, SYSTEM + 0x190);

        // Descriptor 0 is the native table, descriptor 2 is garbage.
        self.write(SERVICE_DESCRIPTOR_TABLE, &[0; 0x40]);
        self.u32(SERVICE_DESCRIPTOR_TABLE, KI_SERVICE_TABLE);
        self.u32(SERVICE_DESCRIPTOR_TABLE + 0x8, 3);

        // Mapped by a large page whose frame is absent.
        self.u32(SERVICE_DESCRIPTOR_TABLE + 0x10, SHADOW_SERVICE_TABLE);
        self.u32(SERVICE_DESCRIPTOR_TABLE + 0x18, 0x11c);

        // Both outside the kernel range.
        self.u32(SERVICE_DESCRIPTOR_TABLE + 0x20, 0x1000);
        self.u32(SERVICE_DESCRIPTOR_TABLE + 0x28, 5);
        self.u32(SERVICE_DESCRIPTOR_TABLE + 0x30, 0x8000_0000);
        self.u32(SERVICE_DESCRIPTOR_TABLE + 0x38, 1);

        self.u32(KI_SERVICE_TABLE, 0x805c_0000);
        self.u32(KI_SERVICE_TABLE + 4, 0x806c_f000);
        self.u32(KI_SERVICE_TABLE + 8, 0x9000_0000);
    }

    fn handles(&mut self) {
        self.write(HANDLE_TABLE, &[0; 0x44]);
        self.u32(HANDLE_TABLE, HANDLE_MID | 1);
        self.u32(HANDLE_TABLE + 0x3c, 1);

        self.write(HANDLE_MID, &[0; 0x1000]);
        self.u32(HANDLE_MID + 4, HANDLE_LEAF);

        // Entry 1 is a named file, entry 3 points to unmapped memory.
        self.write(HANDLE_LEAF, &[0; 0x1000]);
        self.u32(HANDLE_LEAF + 0x8, OBJECT_HEADER | 1);
        self.u32(HANDLE_LEAF + 0xc, 0x0012_019f);
        self.u32(HANDLE_LEAF + 0x18, 0x8005_8000);

        self.write(OBJECT_HEADER - 0x10, &[0; 0x30]);
        self.u32(OBJECT_HEADER + 0x8, FILE_TYPE);
        self.write(OBJECT_HEADER + 0xc, &[0x10]);
        self.unicode_string(OBJECT_HEADER - 0xc, 0x8005_3100, "\\Device\\HarddiskVolume1");

        // _FILE_OBJECT.FileName of the body.
        self.write(OBJECT_HEADER + 0x18, &[0; 0x70]);
        self.unicode_string(OBJECT_HEADER + 0x48, 0x8005_3200, "\\WINDOWS\\system32");

        self.unicode_string(FILE_TYPE + 0x40, 0x8005_4100, "File");
    }

    fn vad(&mut self, va: u64, tag: &[u8; 4], vpns: (u64, u64), children: (u64, u64), flags: u64) {
        self.write(va - 4, tag);
        self.write(va, &[0; 0x34]);
        self.u32(va, vpns.0);
        self.u32(va + 0x4, vpns.1);
        self.u32(va + 0xc, children.0);
        self.u32(va + 0x10, children.1);
        self.u32(va + 0x14, flags);
    }

    fn vads(&mut self) {
        // Private read-write memory with 0x10 committed pages.
        self.vad(VAD_ROOT, b"VadS", (0x400, 0x40f), (VAD_LONG, VAD_UNKNOWN), 0x8400_0010);

        // Mapped image, whose right child points back to the root.
        self.vad(VAD_LONG, b"Vad ", (0x48580, 0x4858e), (0, VAD_ROOT), 0x0700_0000);
        self.u32(VAD_LONG + 0x18, CONTROL_AREA);

        self.vad(VAD_UNKNOWN, b"XXXX", (0x500, 0x5ff), (0, 0), 0);

        self.write(CONTROL_AREA, &[0; 0x30]);
        self.u32(CONTROL_AREA + 0x24, FILE_OBJECT);
        self.write(FILE_OBJECT, &[0; 0x70]);
        self.unicode_string(
            FILE_OBJECT + 0x30,
            0x8006_2100,
            "\\WINDOWS\\system32\\smss.exe",
        );
    }

    fn peb(&mut self) {
        self.write(PEB, &[0; 0x210]);
        self.u32(PEB + 0x8, 0x4858_0000);
        self.u32(PEB + 0xc, LDR);

        self.write(LDR, &[0; 0x28]);
        self.list_entry(LDR + 0xc, USER_MODULE, USER_MODULE);

        self.write(USER_MODULE, &[0; 0x50]);
        self.list_entry(USER_MODULE, LDR + 0xc, LDR + 0xc);
        self.u32(USER_MODULE + 0x18, 0x4858_0000);
        self.u32(USER_MODULE + 0x20, 0xf000);
        self.unicode_string(
            USER_MODULE + 0x24,
            USER_MODULE + 0x900,
            "\\SystemRoot\\System32\\smss.exe",
        );
        self.unicode_string(USER_MODULE + 0x2c, USER_MODULE + 0x800, "smss.exe");
    }
}

/// Returns the physical memory of the image.
pub(crate) fn physical() -> Rc<dyn AddressSpace> {
    let mut image = Image(BufferSpace::new("physical"));

    image.page_directories();
    image.debugger_data();
    image.processes();
    image.modules();
    image.threads();
    image.handles();
    image.vads();
    image.peb();

    Rc::new(image.0)
}

/// Returns the kernel of the image.
///
/// The kernel DTB is configured unless `config` sets one.
pub(crate) fn kernel(config: Config) -> WindowsKernel {
    let config = Config {
        dtb: config.dtb.or(Some(KERNEL_DTB)),
        ..config
    };

    WindowsKernel::from_physical(xp_sp2_x86(config), physical())
        .expect("fixture kernel address space")
}

/// Returns a configuration selecting `pid`.
pub(crate) fn with_pid(pid: u32) -> Config {
    Config {
        pid: Some(pid),
        ..Default::default()
    }
}
