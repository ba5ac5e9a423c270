//! Runtime objects.
//!
//! An [`Object`] binds a type to an offset in an address space. Objects are
//! cheap to clone and never cache memory contents: every value access reads
//! the address space again.

mod array;
mod chain;
mod render;

use std::{
    collections::BTreeMap,
    rc::{Rc, Weak},
};

use once_cell::unsync::OnceCell;

pub use self::{array::ArrayIter, chain::ObjectChain};
use crate::{
    AddressSpace, Hex, MemscopeError, NativeType, Profile, StructLayout, TypeSpec, Value,
    magic::{self, MagicValue},
    types::MagicSpec,
};

/// An object that could not be produced, with the reason why.
///
/// Invalid objects are the normal outcome of walking corrupt or partially
/// paged-out memory. They are values, not failures: member access,
/// indexing and dereferencing through [`ObjectChain`] propagate them
/// unchanged.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct NoneObject {
    reason: String,
}

impl NoneObject {
    /// Creates an invalid object with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Returns the reason.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl From<MemscopeError> for NoneObject {
    fn from(value: MemscopeError) -> Self {
        Self::new(value.to_string())
    }
}

/// Either an object or the reason it is invalid.
pub type MaybeObject = Result<Object, NoneObject>;

/// Location and context of an object being instantiated.
#[derive(Debug, Clone)]
pub struct ObjectArgs {
    /// Offset in the address space.
    pub offset: u64,

    /// Address space the object lives in.
    pub vm: Rc<dyn AddressSpace>,

    /// The object this one was reached from.
    pub parent: Option<Object>,

    /// Member name under which this object was reached.
    pub name: Option<String>,
}

impl ObjectArgs {
    /// Creates arguments for a root object.
    pub fn new(offset: u64, vm: Rc<dyn AddressSpace>) -> Self {
        Self {
            offset,
            vm,
            parent: None,
            name: None,
        }
    }

    /// Sets the parent object.
    pub fn with_parent(self, parent: &Object) -> Self {
        Self {
            parent: Some(parent.clone()),
            ..self
        }
    }

    /// Sets the member name.
    pub fn with_name(self, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..self
        }
    }
}

#[derive(Clone)]
pub(crate) enum ObjectKind {
    Native(NativeType),
    Void,
    Pointer(TypeSpec),
    Array {
        count: u64,
        element: TypeSpec,
        stride: u64,
    },
    BitField {
        target: NativeType,
        start_bit: u32,
        end_bit: u32,
    },
    Enumeration {
        target: NativeType,
        choices: Rc<BTreeMap<u64, String>>,
    },
    Flags {
        target: NativeType,
        bitmap: Rc<BTreeMap<String, u32>>,
        maskmap: Rc<BTreeMap<String, (u32, u32)>>,
    },
    String {
        length: u64,
    },
    Struct(Rc<StructLayout>),
    Magic {
        spec: MagicSpec,
        resolved: OnceCell<Result<MagicValue, NoneObject>>,
    },
}

#[derive(Clone)]
struct ObjectInner {
    profile: Rc<Profile>,
    type_name: String,
    kind: ObjectKind,
    offset: u64,
    vm: Rc<dyn AddressSpace>,
    parent: Option<Weak<ObjectInner>>,
    name: Option<String>,
    tag: Option<Vec<u8>>,
}

/// A typed view of memory at a given offset of an address space.
#[derive(Clone)]
pub struct Object(Rc<ObjectInner>);

impl Object {
    pub(crate) fn new(
        profile: Rc<Profile>,
        type_name: impl Into<String>,
        kind: ObjectKind,
        args: ObjectArgs,
    ) -> Self {
        Self(Rc::new(ObjectInner {
            profile,
            type_name: type_name.into(),
            kind,
            offset: args.offset,
            vm: args.vm,
            parent: args.parent.map(|parent| Rc::downgrade(&parent.0)),
            name: args.name,
            tag: None,
        }))
    }

    pub(crate) fn kind(&self) -> &ObjectKind {
        &self.0.kind
    }

    /// Returns the profile that created this object.
    pub fn profile(&self) -> &Rc<Profile> {
        &self.0.profile
    }

    /// Returns the type name.
    ///
    /// For composites and named natives this is the name from the type
    /// table; inline descriptors report their kind (`"Pointer"`,
    /// `"Array"`, ...).
    pub fn type_name(&self) -> &str {
        &self.0.type_name
    }

    /// Returns the offset in the address space.
    pub fn offset(&self) -> u64 {
        self.0.offset
    }

    /// Returns the address space.
    pub fn vm(&self) -> &Rc<dyn AddressSpace> {
        &self.0.vm
    }

    /// Returns the member name under which this object was reached.
    pub fn name(&self) -> Option<&str> {
        self.0.name.as_deref()
    }

    /// Returns the parent object, if it is still alive.
    pub fn parent(&self) -> Option<Object> {
        self.0.parent.as_ref()?.upgrade().map(Object)
    }

    /// Returns the discriminant attached by the class that constructed
    /// this object (e.g. a pool or VAD tag).
    pub fn tag(&self) -> Option<&[u8]> {
        self.0.tag.as_deref()
    }

    /// Returns a copy of this object carrying `tag`.
    pub fn with_tag(&self, tag: Vec<u8>) -> Object {
        let mut inner = (*self.0).clone();
        inner.tag = Some(tag);
        Object(Rc::new(inner))
    }

    /// Returns the struct layout if this is a composite.
    pub fn layout(&self) -> Option<&Rc<StructLayout>> {
        match &self.0.kind {
            ObjectKind::Struct(layout) => Some(layout),
            _ => None,
        }
    }

    /// Returns the size of the object in bytes.
    pub fn size(&self) -> u64 {
        match &self.0.kind {
            ObjectKind::Native(target)
            | ObjectKind::BitField { target, .. }
            | ObjectKind::Enumeration { target, .. }
            | ObjectKind::Flags { target, .. } => u64::from(target.size),
            ObjectKind::Pointer(_) => u64::from(self.profile().pointer_size()),
            ObjectKind::Array { count, stride, .. } => count.wrapping_mul(*stride),
            ObjectKind::String { length } => *length,
            ObjectKind::Struct(layout) => layout.size(),
            ObjectKind::Void | ObjectKind::Magic { .. } => 0,
        }
    }

    /// Checks whether the object is valid.
    ///
    /// Registered classes may apply semantic checks; otherwise the object is
    /// valid when its offset is readable.
    pub fn is_valid(&self) -> bool {
        match self.profile().class(self.type_name()) {
            Some(class) => class.is_valid(self),
            None => self.is_readable(),
        }
    }

    /// Checks whether the object's offset is readable.
    ///
    /// Magic values are not backed by memory and are always readable.
    pub fn is_readable(&self) -> bool {
        match &self.0.kind {
            ObjectKind::Magic { .. } => true,
            _ => self.vm().is_valid_address(self.offset()),
        }
    }

    /// Re-instantiates this location as another type.
    pub fn cast(&self, spec: impl Into<TypeSpec>) -> MaybeObject {
        let args = ObjectArgs {
            offset: self.offset(),
            vm: self.vm().clone(),
            parent: self.parent(),
            name: self.0.name.clone(),
        };

        self.profile().object_with(&spec.into(), args)
    }

    //
    // Values
    //

    /// Returns the scalar value.
    pub fn v(&self) -> Result<Value, NoneObject> {
        match &self.0.kind {
            ObjectKind::Native(target)
            | ObjectKind::Enumeration { target, .. }
            | ObjectKind::Flags { target, .. } => self.read_native(target),
            ObjectKind::Pointer(_) => self.read_native(&self.profile().pointer_type()),
            ObjectKind::BitField {
                target,
                start_bit,
                end_bit,
            } => {
                let raw = self.read_native(target)?.as_u64();
                Ok(Value::Unsigned(extract_bits(raw, *start_bit, *end_bit)))
            }
            ObjectKind::Magic { .. } => match self.magic_value()? {
                MagicValue::Int(value) => Ok(Value::Unsigned(value)),
                MagicValue::Bytes(_) => Err(NoneObject::new("Magic value is not numeric")),
            },
            _ => Err(NoneObject::new(format!(
                "{} has no scalar value",
                self.type_name()
            ))),
        }
    }

    /// Returns the scalar value as an unsigned integer.
    pub fn value(&self) -> Result<u64, NoneObject> {
        self.v().map(Value::as_u64)
    }

    /// Returns the scalar value as a signed integer.
    pub fn signed_value(&self) -> Result<i64, NoneObject> {
        self.v().map(Value::as_i64)
    }

    fn read_native(&self, target: &NativeType) -> Result<Value, NoneObject> {
        let length = target.size as usize;
        let data = self.vm().read_exact(self.offset(), length).ok_or_else(|| {
            NoneObject::new(format!(
                "short read at offset {} length {length}",
                Hex(self.offset())
            ))
        })?;

        target.decode(&data).ok_or_else(|| {
            NoneObject::new(format!("cannot decode {length} bytes as {target:?}"))
        })
    }

    /// Returns the decoded contents of a string.
    ///
    /// The string is cut at the first NUL byte; bytes that are not valid
    /// UTF-8 are replaced.
    pub fn string(&self) -> Result<String, NoneObject> {
        let ObjectKind::String { length } = &self.0.kind else {
            return Err(NoneObject::new(format!(
                "{} is not a string",
                self.type_name()
            )));
        };

        let length = *length as usize;
        let data = self.vm().read_exact(self.offset(), length).ok_or_else(|| {
            NoneObject::new(format!(
                "short read at offset {} length {length}",
                Hex(self.offset())
            ))
        })?;

        let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
        Ok(String::from_utf8_lossy(&data[..end]).into_owned())
    }

    /// Returns the label of an enumeration value.
    ///
    /// Values without a label render as `"Unknown choice <value>"`.
    pub fn label(&self) -> Result<String, NoneObject> {
        let ObjectKind::Enumeration { choices, .. } = &self.0.kind else {
            return Err(NoneObject::new(format!(
                "{} is not an enumeration",
                self.type_name()
            )));
        };

        let value = self.value()?;
        Ok(match choices.get(&value) {
            Some(label) => label.clone(),
            None => format!("Unknown choice {value}"),
        })
    }

    /// Returns the names of the flags that are set, ordered by bit.
    pub fn flag_names(&self) -> Result<Vec<String>, NoneObject> {
        let ObjectKind::Flags { bitmap, .. } = &self.0.kind else {
            return Err(NoneObject::new(format!(
                "{} is not a flags value",
                self.type_name()
            )));
        };

        let value = self.value()?;
        let mut names = bitmap
            .iter()
            .filter(|&(_, &bit)| bit < 64 && value & (1 << bit) != 0)
            .map(|(name, &bit)| (bit, name.clone()))
            .collect::<Vec<_>>();

        names.sort();
        Ok(names.into_iter().map(|(_, name)| name).collect())
    }

    /// Extracts a named bit range of a flags value.
    pub fn mask(&self, name: &str) -> Result<u64, NoneObject> {
        let ObjectKind::Flags { maskmap, .. } = &self.0.kind else {
            return Err(NoneObject::new(format!(
                "{} is not a flags value",
                self.type_name()
            )));
        };

        let &(start, width) = maskmap
            .get(name)
            .ok_or_else(|| NoneObject::new(format!("Mask {name} not known")))?;

        Ok(extract_bits(self.value()?, start, start.saturating_add(width)))
    }

    /// Checks whether a named flag is set.
    pub fn has_flag(&self, name: &str) -> Result<bool, NoneObject> {
        let ObjectKind::Flags { bitmap, .. } = &self.0.kind else {
            return Err(NoneObject::new(format!(
                "{} is not a flags value",
                self.type_name()
            )));
        };

        let &bit = bitmap
            .get(name)
            .ok_or_else(|| NoneObject::new(format!("Flag {name} not known")))?;

        Ok(extract_bits(self.value()?, bit, bit + 1) != 0)
    }

    /// Returns the value of a magic object.
    ///
    /// The value is resolved on first access and cached for the lifetime
    /// of this object.
    pub fn magic_value(&self) -> Result<MagicValue, NoneObject> {
        let ObjectKind::Magic { spec, resolved } = &self.0.kind else {
            return Err(NoneObject::new(format!(
                "{} is not a magic value",
                self.type_name()
            )));
        };

        resolved
            .get_or_init(|| magic::resolve(self.profile(), spec, self))
            .clone()
    }

    //
    // Navigation
    //

    /// Returns a member, giving the registered class a chance to provide
    /// it first.
    ///
    /// Pointers are dereferenced transparently, so `ptr.m("Field")` reads
    /// the field of the target.
    pub fn m(&self, name: &str) -> MaybeObject {
        if let Some(class) = self.profile().class(self.type_name())
            && let Some(result) = class.member(self, name)
        {
            return result;
        }

        self.member(name)
    }

    /// Returns a member as laid out in the type table.
    pub fn member(&self, name: &str) -> MaybeObject {
        let layout = match &self.0.kind {
            ObjectKind::Struct(layout) => layout,
            ObjectKind::Pointer(_) => return self.dereference()?.m(name),
            _ => {
                return Err(NoneObject::new(format!(
                    "{} has no member {name}",
                    self.type_name()
                )));
            }
        };

        let field = layout.field(name).ok_or_else(|| {
            NoneObject::new(format!("field not found: {}.{name}", layout.name()))
        })?;

        let offset = field.offset.ok_or_else(|| {
            NoneObject::new(format!("field has no offset: {}.{name}", layout.name()))
        })?;

        let args = ObjectArgs::new(self.offset().wrapping_add(offset), self.vm().clone())
            .with_parent(self)
            .with_name(name);

        self.profile().object_with(&field.spec, args)
    }

    /// Follows a pointer to its declared target type.
    pub fn dereference(&self) -> MaybeObject {
        match &self.0.kind {
            ObjectKind::Pointer(target) => self.dereference_as(target),
            _ => Err(NoneObject::new(format!(
                "{} is not a pointer",
                self.type_name()
            ))),
        }
    }

    /// Interprets the value of this object as an address of `spec`.
    ///
    /// The target is instantiated in the same address space, unless a
    /// registered class of the target type decides otherwise.
    pub fn dereference_as(&self, spec: impl Into<TypeSpec>) -> MaybeObject {
        let address = self.value()?;

        if address == 0 {
            return Err(NoneObject::new(format!(
                "NULL pointer at {}",
                Hex(self.offset())
            )));
        }

        if !self.vm().is_valid_address(address) {
            tracing::trace!(
                space = self.vm().name(),
                pointer = %Hex(self.offset()),
                target = %Hex(address),
                "pointer to invalid address"
            );

            return Err(NoneObject::new(format!(
                "pointer at {} to invalid address {}",
                Hex(self.offset()),
                Hex(address)
            )));
        }

        let args = ObjectArgs {
            offset: address,
            vm: self.vm().clone(),
            parent: self.parent(),
            name: self.0.name.clone(),
        };

        self.profile().object_with(&spec.into(), args)
    }

    /// Returns the number of elements of an array.
    pub fn count(&self) -> Option<u64> {
        match &self.0.kind {
            ObjectKind::Array { count, .. } => Some(*count),
            _ => None,
        }
    }

    /// Returns the element at `index` of an array.
    pub fn index(&self, index: u64) -> MaybeObject {
        let ObjectKind::Array {
            count,
            element,
            stride,
        } = &self.0.kind
        else {
            return Err(NoneObject::new(format!(
                "{} is not an array",
                self.type_name()
            )));
        };

        if index >= *count {
            return Err(NoneObject::new(format!(
                "index {index} out of bounds ({count} elements)"
            )));
        }

        let offset = self.offset().wrapping_add(index.wrapping_mul(*stride));
        let args = ObjectArgs::new(offset, self.vm().clone()).with_parent(self);
        self.profile().object_with(element, args)
    }

    /// Returns an iterator over the elements of an array.
    ///
    /// Objects that are not arrays have no elements.
    pub fn elements(&self) -> ArrayIter {
        ArrayIter::new(self.clone(), self.count().unwrap_or(0))
    }
}

impl std::fmt::Debug for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Object")
            .field("type_name", &self.type_name())
            .field("name", &self.name())
            .field("offset", &Hex(self.offset()))
            .field("vm", &self.vm().name())
            .finish()
    }
}

/// Extracts bits `[start_bit, end_bit)` of `value`.
fn extract_bits(value: u64, start_bit: u32, end_bit: u32) -> u64 {
    let width = end_bit.saturating_sub(start_bit);
    let mask = match width {
        0 => 0,
        64.. => u64::MAX,
        _ => (1u64 << width) - 1,
    };

    value.checked_shr(start_bit).unwrap_or(0) & mask
}

#[cfg(test)]
mod tests;
