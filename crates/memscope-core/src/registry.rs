use std::{cell::RefCell, collections::HashMap, num::NonZeroUsize, rc::Rc};

use indexmap::IndexMap;
use lru::LruCache;

use crate::{MemscopeError, TypeSpec};

/// A field of a composite type.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    /// Offset from the start of the composite.
    ///
    /// In overlays, `None` keeps the offset of the base definition.
    pub offset: Option<u64>,

    /// Type of the field.
    pub spec: TypeSpec,
}

/// A composite type definition, or an overlay patch for one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeDef {
    /// Total size in bytes.
    pub size: Option<u64>,

    /// Fields by name.
    pub fields: IndexMap<String, FieldDef>,
}

impl TypeDef {
    /// Creates a definition with the given size.
    pub fn new(size: u64) -> Self {
        Self {
            size: Some(size),
            fields: IndexMap::new(),
        }
    }

    /// Creates an overlay patch that keeps the base size.
    pub fn patch() -> Self {
        Self::default()
    }

    /// Adds a field at a fixed offset.
    pub fn field(mut self, name: &str, offset: u64, spec: impl Into<TypeSpec>) -> Self {
        self.fields.insert(
            name.to_owned(),
            FieldDef {
                offset: Some(offset),
                spec: spec.into(),
            },
        );
        self
    }

    /// Retypes a field, keeping the offset of the base definition.
    pub fn retype(mut self, name: &str, spec: impl Into<TypeSpec>) -> Self {
        self.fields.insert(
            name.to_owned(),
            FieldDef {
                offset: None,
                spec: spec.into(),
            },
        );
        self
    }

    /// Folds `other` into `self`; fields of `other` win.
    fn absorb(&mut self, other: TypeDef) {
        if other.size.is_some() {
            self.size = other.size;
        }

        for (name, field) in other.fields {
            self.fields.insert(name, field);
        }
    }
}

/// The effective layout of a composite type after overlays were applied.
#[derive(Debug, Clone, PartialEq)]
pub struct StructLayout {
    name: String,
    size: u64,
    fields: IndexMap<String, FieldDef>,
}

impl StructLayout {
    /// Returns the type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the total size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Returns a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.get(name)
    }

    /// Returns all fields in definition order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldDef)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }
}

/// Merges an overlay into a base definition.
///
/// - The overlay size overrides the base size when present.
/// - A field present in both keeps the base offset when the overlay offset
///   is `None`, and takes the overlay type.
/// - A field only present in the overlay is added.
///
/// Either side may be absent, but not both.
pub fn merge(
    name: &str,
    base: Option<&TypeDef>,
    overlay: Option<&TypeDef>,
) -> Result<StructLayout, MemscopeError> {
    if base.is_none() && overlay.is_none() {
        return Err(MemscopeError::UnknownType(name.to_owned()));
    }

    let mut size = base.and_then(|base| base.size);
    let mut fields = base.map(|base| base.fields.clone()).unwrap_or_default();

    if let Some(overlay) = overlay {
        if overlay.size.is_some() {
            size = overlay.size;
        }

        for (field_name, patch) in &overlay.fields {
            match fields.get_mut(field_name) {
                Some(field) => {
                    if let Some(offset) = patch.offset {
                        field.offset = Some(offset);
                    }

                    field.spec = patch.spec.clone();
                }
                None => {
                    fields.insert(field_name.clone(), patch.clone());
                }
            }
        }
    }

    Ok(StructLayout {
        name: name.to_owned(),
        size: size.unwrap_or(0),
        fields,
    })
}

/// Composite types of a profile with their overlays.
///
/// Resolved layouts are cached; the cache is owned by the registry, which
/// in turn is owned by a single profile.
pub struct TypeRegistry {
    vtypes: HashMap<String, TypeDef>,
    overlays: HashMap<String, TypeDef>,
    cache: RefCell<LruCache<String, Rc<StructLayout>>>,
}

impl TypeRegistry {
    const DEFAULT_CACHE_SIZE: NonZeroUsize = NonZeroUsize::new(512).unwrap();

    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            vtypes: HashMap::new(),
            overlays: HashMap::new(),
            cache: RefCell::new(LruCache::new(Self::DEFAULT_CACHE_SIZE)),
        }
    }

    /// Adds base definitions. Later definitions of the same name replace
    /// earlier ones.
    pub fn add_vtypes<I>(&mut self, vtypes: I)
    where
        I: IntoIterator<Item = (String, TypeDef)>,
    {
        self.vtypes.extend(vtypes);
        self.cache.get_mut().clear();
    }

    /// Adds an overlay patch. Patches for the same type accumulate.
    pub fn add_overlay(&mut self, name: &str, patch: TypeDef) {
        self.overlays
            .entry(name.to_owned())
            .or_default()
            .absorb(patch);
        self.cache.get_mut().clear();
    }

    /// Checks whether a composite type of this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.vtypes.contains_key(name) || self.overlays.contains_key(name)
    }

    /// Returns the effective layout of a composite type.
    pub fn resolve(&self, name: &str) -> Result<Rc<StructLayout>, MemscopeError> {
        if let Some(layout) = self.cache.borrow_mut().get(name) {
            return Ok(layout.clone());
        }

        let layout = Rc::new(merge(
            name,
            self.vtypes.get(name),
            self.overlays.get(name),
        )?);

        self.cache
            .borrow_mut()
            .put(name.to_owned(), layout.clone());

        Ok(layout)
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
