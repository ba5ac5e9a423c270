//! Typed object overlay engine.
//!
//! Interprets flat, byte-addressable memory as a graph of typed objects.
//! Layouts come from declarative type tables ("vtypes") patched by
//! per-profile overlays; objects are produced lazily by the [`Profile`]
//! and degrade to [`NoneObject`] instead of failing when memory is corrupt
//! or unavailable.

mod config;
mod core;
mod error;
pub mod magic;
mod object;
mod profile;
mod registry;
pub mod space;
mod types;

pub use self::{
    config::{Config, ConfigError, DEFAULT_SCAN_BLOCK_SIZE, MAX_SCAN_BLOCK_SIZE},
    core::{Gfn, Hex, Pa, Va},
    error::MemscopeError,
    magic::{MagicProvider, MagicValue},
    object::{ArrayIter, MaybeObject, NoneObject, Object, ObjectArgs, ObjectChain},
    profile::{ObjectClass, Profile, ProfileBuilder},
    registry::{FieldDef, StructLayout, TypeDef, TypeRegistry, merge},
    space::{AddressSpace, BufferSpace},
    types::{Count, Endian, MagicSpec, NativeKind, NativeType, TypeSpec, Value, computed_count},
};
