use std::{collections::HashMap, rc::Rc};

use once_cell::unsync::OnceCell;

use crate::{
    AddressSpace, Config, Hex, MaybeObject, MemscopeError, NativeType, NoneObject, Object,
    ObjectArgs, TypeDef, TypeRegistry, TypeSpec,
    magic::{MAGIC_NAMESPACE, MagicNamespace, MagicProvider},
    object::ObjectKind,
    types::Count,
};

/// Strings longer than this are treated as corrupt.
const MAX_STRING_LENGTH: u64 = 0x10000;

/// Custom behavior for a named type.
///
/// A class is registered for a type name and takes over construction of
/// objects of that type. Every hook has a default that behaves like a plain
/// composite.
pub trait ObjectClass {
    /// Constructs an object of `type_name`.
    ///
    /// Implementations may switch the address space, choose another type,
    /// or refuse construction by returning an invalid object.
    fn instantiate(&self, profile: &Rc<Profile>, type_name: &str, args: ObjectArgs) -> MaybeObject {
        profile.new_struct(type_name, args)
    }

    /// Provides a member instead of the type table.
    ///
    /// Returns `None` to fall back to the layout.
    fn member(&self, object: &Object, name: &str) -> Option<MaybeObject> {
        let _ = (object, name);
        None
    }

    /// Checks whether `object` is valid.
    fn is_valid(&self, object: &Object) -> bool {
        object.is_readable()
    }

    /// Renders `object`.
    ///
    /// Returns `None` to use the default rendering.
    fn render(&self, object: &Object) -> Option<Result<String, NoneObject>> {
        let _ = object;
        None
    }
}

/// Everything needed to interpret the memory of one operating system
/// build.
///
/// # Examples
///
/// ```
/// # use std::rc::Rc;
/// # use memscope_core::{AddressSpace, BufferSpace, NativeType, ProfileBuilder, TypeDef};
/// let profile = ProfileBuilder::new("example")
///     .vtypes([(
///         "_HEADER",
///         TypeDef::new(8)
///             .field("Size", 0, "unsigned long")
///             .field("Flags", 4, NativeType::unsigned(2)),
///     )])
///     .build();
///
/// let vm: Rc<dyn AddressSpace> = Rc::new(BufferSpace::from_bytes("buf", &[0x10, 0, 0, 0, 3, 0]));
/// let header = profile.object("_HEADER", 0, &vm).unwrap();
/// assert_eq!(header.m("Size").unwrap().value(), Ok(0x10));
/// ```
pub struct Profile {
    name: String,
    pointer_size: u8,
    natives: HashMap<String, NativeType>,
    registry: TypeRegistry,
    classes: HashMap<String, Rc<dyn ObjectClass>>,
    providers: HashMap<String, Rc<dyn MagicProvider>>,
    constants: HashMap<String, u64>,
    config: Config,
}

impl Profile {
    /// Returns the profile name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the pointer width in bytes.
    pub fn pointer_size(&self) -> u8 {
        self.pointer_size
    }

    /// Returns the native type used to read pointers.
    pub fn pointer_type(&self) -> NativeType {
        NativeType::unsigned(self.pointer_size)
    }

    /// Returns the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns a profile constant.
    pub fn constant(&self, name: &str) -> Option<u64> {
        self.constants.get(name).copied()
    }

    /// Returns a native type by name.
    pub fn native(&self, name: &str) -> Option<NativeType> {
        self.natives.get(name).copied()
    }

    /// Returns the type registry.
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Checks whether a type of this name is known.
    pub fn has_type(&self, name: &str) -> bool {
        name == "void" || self.natives.contains_key(name) || self.registry.contains(name)
    }

    pub(crate) fn class(&self, type_name: &str) -> Option<Rc<dyn ObjectClass>> {
        self.classes.get(type_name).cloned()
    }

    pub(crate) fn magic_provider(&self, name: &str) -> Option<Rc<dyn MagicProvider>> {
        self.providers.get(name).cloned()
    }

    /// Returns the size of a type in bytes.
    pub fn size_of(&self, spec: &TypeSpec) -> Result<u64, MemscopeError> {
        match spec {
            TypeSpec::Named(name) if name == "void" => Ok(0),
            TypeSpec::Named(name) => match self.natives.get(name) {
                Some(native) => Ok(u64::from(native.size)),
                None => Ok(self.registry.resolve(name)?.size()),
            },
            TypeSpec::Native(target)
            | TypeSpec::BitField { target, .. }
            | TypeSpec::Enumeration { target, .. }
            | TypeSpec::Flags { target, .. } => Ok(u64::from(target.size)),
            TypeSpec::Void | TypeSpec::Magic(_) => Ok(0),
            TypeSpec::Pointer(_) => Ok(u64::from(self.pointer_size)),
            TypeSpec::Array {
                count: Count::Fixed(count),
                element,
            } => Ok(count.wrapping_mul(self.size_of(element)?)),
            TypeSpec::String {
                length: Count::Fixed(length),
            } => Ok(*length),
            TypeSpec::Array { .. } | TypeSpec::String { .. } => {
                Err(MemscopeError::UnsizedType(spec.kind_name().to_owned()))
            }
        }
    }

    /// Returns the offset of a member of a composite type.
    pub fn offset_of(&self, type_name: &str, member: &str) -> Result<u64, MemscopeError> {
        self.registry
            .resolve(type_name)?
            .field(member)
            .and_then(|field| field.offset)
            .ok_or(MemscopeError::Other("member has no offset"))
    }

    /// Instantiates a root object.
    pub fn object(
        self: &Rc<Self>,
        spec: impl Into<TypeSpec>,
        offset: u64,
        vm: &Rc<dyn AddressSpace>,
    ) -> MaybeObject {
        self.object_with(&spec.into(), ObjectArgs::new(offset, vm.clone()))
    }

    /// Instantiates an object.
    ///
    /// This is the single entry point through which all objects are
    /// created. Computed counts and lengths are evaluated against
    /// `args.parent` here.
    pub fn object_with(self: &Rc<Self>, spec: &TypeSpec, args: ObjectArgs) -> MaybeObject {
        match spec {
            TypeSpec::Named(name) => self.named_object(name, args),
            TypeSpec::Native(native) => self.located("Native", ObjectKind::Native(*native), args),
            TypeSpec::Void => self.located("void", ObjectKind::Void, args),
            TypeSpec::Pointer(target) => {
                self.located("Pointer", ObjectKind::Pointer((**target).clone()), args)
            }
            TypeSpec::Array { count, element } => {
                let count = count.resolve(args.parent.as_ref())?;
                let stride = self.size_of(element)?;

                let kind = ObjectKind::Array {
                    count,
                    element: (**element).clone(),
                    stride,
                };

                self.located("Array", kind, args)
            }
            TypeSpec::BitField {
                target,
                start_bit,
                end_bit,
            } => {
                let kind = ObjectKind::BitField {
                    target: *target,
                    start_bit: *start_bit,
                    end_bit: *end_bit,
                };

                self.located("BitField", kind, args)
            }
            TypeSpec::Enumeration { target, choices } => {
                let kind = ObjectKind::Enumeration {
                    target: *target,
                    choices: choices.clone(),
                };

                self.located("Enumeration", kind, args)
            }
            TypeSpec::Flags {
                target,
                bitmap,
                maskmap,
            } => {
                let kind = ObjectKind::Flags {
                    target: *target,
                    bitmap: bitmap.clone(),
                    maskmap: maskmap.clone(),
                };

                self.located("Flags", kind, args)
            }
            TypeSpec::String { length } => {
                let length = length.resolve(args.parent.as_ref())?;

                if length > MAX_STRING_LENGTH {
                    return Err(NoneObject::new(format!(
                        "string length {length} at {} is implausible",
                        Hex(args.offset)
                    )));
                }

                self.located("String", ObjectKind::String { length }, args)
            }
            TypeSpec::Magic(magic) => {
                let kind = ObjectKind::Magic {
                    spec: magic.clone(),
                    resolved: OnceCell::new(),
                };

                Ok(Object::new(self.clone(), "VolatilityMagic", kind, args))
            }
        }
    }

    fn named_object(self: &Rc<Self>, name: &str, args: ObjectArgs) -> MaybeObject {
        if name == "void" {
            return self.located(name, ObjectKind::Void, args);
        }

        if let Some(native) = self.natives.get(name) {
            return self.located(name, ObjectKind::Native(*native), args);
        }

        if let Some(class) = self.class(name) {
            return class.instantiate(self, name, args);
        }

        self.new_struct(name, args)
    }

    /// Instantiates a composite from the type table, bypassing any
    /// registered class.
    pub fn new_struct(self: &Rc<Self>, type_name: &str, args: ObjectArgs) -> MaybeObject {
        let layout = self.registry.resolve(type_name)?;
        self.located(type_name, ObjectKind::Struct(layout), args)
    }

    /// Instantiates a composite without checking that its offset is
    /// readable.
    pub fn new_struct_unchecked(
        self: &Rc<Self>,
        type_name: &str,
        args: ObjectArgs,
    ) -> MaybeObject {
        let layout = self.registry.resolve(type_name)?;
        Ok(Object::new(
            self.clone(),
            type_name,
            ObjectKind::Struct(layout),
            args,
        ))
    }

    fn located(self: &Rc<Self>, type_name: &str, kind: ObjectKind, args: ObjectArgs) -> MaybeObject {
        if !args.vm.is_valid_address(args.offset) {
            tracing::trace!(
                space = args.vm.name(),
                offset = %Hex(args.offset),
                type_name,
                "object at invalid offset"
            );

            return Err(NoneObject::new(format!(
                "invalid offset {} for {type_name} in {}",
                Hex(args.offset),
                args.vm.name()
            )));
        }

        Ok(Object::new(self.clone(), type_name, kind, args))
    }
}

impl std::fmt::Debug for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Profile")
            .field("name", &self.name)
            .field("pointer_size", &self.pointer_size)
            .finish()
    }
}

/// Builder for [`Profile`].
pub struct ProfileBuilder {
    name: String,
    pointer_size: u8,
    natives: HashMap<String, NativeType>,
    registry: TypeRegistry,
    classes: HashMap<String, Rc<dyn ObjectClass>>,
    providers: HashMap<String, Rc<dyn MagicProvider>>,
    constants: HashMap<String, u64>,
    config: Config,
}

impl ProfileBuilder {
    /// Creates a builder for a 32-bit profile with the default native
    /// types.
    pub fn new(name: impl Into<String>) -> Self {
        let mut classes: HashMap<String, Rc<dyn ObjectClass>> = HashMap::new();
        classes.insert(MAGIC_NAMESPACE.to_owned(), Rc::new(MagicNamespace));

        Self {
            name: name.into(),
            pointer_size: 4,
            natives: HashMap::new(),
            registry: TypeRegistry::new(),
            classes,
            providers: HashMap::new(),
            constants: HashMap::new(),
            config: Config::default(),
        }
    }

    /// Sets the pointer width in bytes.
    pub fn pointer_size(self, pointer_size: u8) -> Self {
        Self {
            pointer_size,
            ..self
        }
    }

    /// Adds or replaces a native type.
    pub fn native(mut self, name: &str, native: NativeType) -> Self {
        self.natives.insert(name.to_owned(), native);
        self
    }

    /// Adds base composite definitions.
    pub fn vtypes<I, S>(mut self, vtypes: I) -> Self
    where
        I: IntoIterator<Item = (S, TypeDef)>,
        S: Into<String>,
    {
        self.registry
            .add_vtypes(vtypes.into_iter().map(|(name, def)| (name.into(), def)));
        self
    }

    /// Adds an overlay patch for a composite type.
    pub fn register_type_overlay(mut self, name: &str, patch: TypeDef) -> Self {
        self.registry.add_overlay(name, patch);
        self
    }

    /// Registers a class for a type name.
    pub fn register_object_class(mut self, name: &str, class: impl ObjectClass + 'static) -> Self {
        self.classes.insert(name.to_owned(), Rc::new(class));
        self
    }

    /// Registers a magic suggestion provider.
    pub fn register_magic(mut self, name: &str, provider: impl MagicProvider + 'static) -> Self {
        self.providers.insert(name.to_owned(), Rc::new(provider));
        self
    }

    /// Sets a profile constant.
    pub fn constant(mut self, name: &str, value: u64) -> Self {
        self.constants.insert(name.to_owned(), value);
        self
    }

    /// Sets the configuration.
    pub fn config(self, config: Config) -> Self {
        Self { config, ..self }
    }

    /// Builds the profile.
    pub fn build(self) -> Rc<Profile> {
        let mut natives = default_natives(self.pointer_size);
        natives.extend(self.natives);

        Rc::new(Profile {
            name: self.name,
            pointer_size: self.pointer_size,
            natives,
            registry: self.registry,
            classes: self.classes,
            providers: self.providers,
            constants: self.constants,
            config: self.config,
        })
    }
}

/// Native types of an LLP64/ILP32 C environment.
fn default_natives(pointer_size: u8) -> HashMap<String, NativeType> {
    [
        ("char", NativeType::signed(1)),
        ("unsigned char", NativeType::unsigned(1)),
        ("short", NativeType::signed(2)),
        ("unsigned short", NativeType::unsigned(2)),
        ("unsigned be short", NativeType::unsigned(2).big_endian()),
        ("int", NativeType::signed(4)),
        ("unsigned int", NativeType::unsigned(4)),
        ("unsigned be int", NativeType::unsigned(4).big_endian()),
        ("long", NativeType::signed(4)),
        ("unsigned long", NativeType::unsigned(4)),
        ("long long", NativeType::signed(8)),
        ("unsigned long long", NativeType::unsigned(8)),
        ("float", NativeType::float(4)),
        ("double", NativeType::float(8)),
        ("address", NativeType::unsigned(pointer_size)),
    ]
    .into_iter()
    .map(|(name, native)| (name.to_owned(), native))
    .collect()
}
