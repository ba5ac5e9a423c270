use std::{collections::BTreeSet, rc::Rc};

use memscope_core::{AddressSpace, Hex, ObjectChain, TypeSpec};

use super::{ModuleMap, modules};
use crate::{WindowsError, WindowsKernel, profile::KERNEL_SPACE_START};

/// Service limits at or above this value are treated as garbage.
const MAX_SERVICE_LIMIT: i64 = 0xffff;

/// A system service routine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEntry {
    /// Index of the entry in its table.
    pub index: u64,

    /// Address of the routine.
    pub address: Option<u64>,

    /// Base name of the module whose image contains the routine.
    pub owner: Option<String>,
}

/// A system service table referenced by a service descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceTable {
    /// Index of the descriptor within the descriptor table.
    pub index: usize,

    /// Virtual address of the table (`KiServiceTable`).
    pub address: u64,

    /// Number of entries.
    pub limit: u64,

    /// Name of the address space the table was read from, or `None` if
    /// the table is not resident in any of them.
    pub space: Option<String>,

    /// The entries. Empty for a table that is not resident.
    pub entries: Vec<ServiceEntry>,
}

/// Lists the system service tables and the module owning every routine.
///
/// Every thread carries a pointer to the descriptor table it dispatches
/// through. The distinct descriptor tables of all threads are collected
/// and every sane descriptor is read. A table may live in session space,
/// so it is read from the first process address space where it is mapped,
/// then from the kernel address space.
pub fn ssdt(kernel: &WindowsKernel) -> Result<Vec<ServiceTable>, WindowsError> {
    let processes = kernel.processes()?.collect::<Vec<_>>();
    let modules = ModuleMap::new(modules(kernel)?);
    let kernel_space_start = kernel.profile().constant(KERNEL_SPACE_START).unwrap_or(0);

    let tables = processes
        .iter()
        .flat_map(|process| process.threads())
        .filter_map(|thread| thread.service_table().ok())
        .map(|table| table.offset())
        .collect::<BTreeSet<_>>();

    tracing::debug!(count = tables.len(), "found service descriptor tables");

    let mut descriptors = BTreeSet::new();
    for &table in &tables {
        let entries = kernel
            .profile()
            .object("_SERVICE_DESCRIPTOR_TABLE", table, kernel.vm())
            .m("Descriptors");

        let entries = match entries {
            Ok(entries) => entries,
            Err(err) => {
                tracing::debug!(table = %Hex(table), %err, "unreadable service descriptor table");
                continue;
            }
        };

        for (index, descriptor) in entries.elements().enumerate() {
            let address = descriptor.m("KiServiceTable").value();
            let limit = descriptor.m("ServiceLimit").and_then(|limit| limit.signed_value());

            match (address, limit) {
                (Ok(address), Ok(limit))
                    if address > kernel_space_start && 0 < limit && limit < MAX_SERVICE_LIMIT =>
                {
                    descriptors.insert((index, address, limit as u64));
                }
                (Ok(0), Ok(0)) => {}
                (address, limit) => {
                    tracing::warn!(
                        table = %Hex(table),
                        index,
                        address = ?address.ok().map(Hex),
                        limit = ?limit.ok(),
                        "skipping service descriptor"
                    );
                }
            }
        }
    }

    let mut result = Vec::new();
    for (index, address, limit) in descriptors {
        let vm = processes
            .iter()
            .filter_map(|process| process.address_space().ok())
            .chain(std::iter::once(kernel.vm().clone()))
            .find(|vm| vm.is_valid_address(address));

        let Some(vm) = vm else {
            tracing::warn!(index, address = %Hex(address), "service table not resident");

            result.push(ServiceTable {
                index,
                address,
                limit,
                space: None,
                entries: Vec::new(),
            });
            continue;
        };

        let entries = read_entries(kernel, &vm, address, limit, &modules);

        result.push(ServiceTable {
            index,
            address,
            limit,
            space: Some(String::from(vm.name())),
            entries,
        });
    }

    Ok(result)
}

fn read_entries(
    kernel: &WindowsKernel,
    vm: &Rc<dyn AddressSpace>,
    address: u64,
    limit: u64,
    modules: &ModuleMap,
) -> Vec<ServiceEntry> {
    let table = kernel
        .profile()
        .object(TypeSpec::array(limit, "unsigned long"), address, vm);

    (0..limit)
        .map(|index| {
            let address = table.index(index).value().ok();
            let owner = address
                .and_then(|address| modules.find_module(address))
                .and_then(|module| module.name.clone());

            ServiceEntry {
                index,
                address,
                owner,
            }
        })
        .collect()
}
