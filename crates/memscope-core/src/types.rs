use std::{collections::BTreeMap, rc::Rc};

use crate::{MaybeObject, NoneObject, Object, magic::MagicValue};

/// Byte order of a native value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endian {
    /// Little-endian.
    Little,

    /// Big-endian (network byte order).
    Big,
}

/// Interpretation of the bytes of a native value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeKind {
    /// Unsigned integer.
    Unsigned,

    /// Two's complement signed integer.
    Signed,

    /// IEEE 754 floating point number.
    Float,
}

/// A fixed-width scalar type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeType {
    /// Width in bytes (1, 2, 4 or 8).
    pub size: u8,

    /// How the bytes are interpreted.
    pub kind: NativeKind,

    /// Byte order.
    pub endian: Endian,
}

impl NativeType {
    /// Little-endian unsigned integer of `size` bytes.
    pub const fn unsigned(size: u8) -> Self {
        Self {
            size,
            kind: NativeKind::Unsigned,
            endian: Endian::Little,
        }
    }

    /// Little-endian signed integer of `size` bytes.
    pub const fn signed(size: u8) -> Self {
        Self {
            size,
            kind: NativeKind::Signed,
            endian: Endian::Little,
        }
    }

    /// Little-endian floating point number of `size` bytes.
    pub const fn float(size: u8) -> Self {
        Self {
            size,
            kind: NativeKind::Float,
            endian: Endian::Little,
        }
    }

    /// Returns the same type with big-endian byte order.
    pub const fn big_endian(self) -> Self {
        Self {
            endian: Endian::Big,
            ..self
        }
    }

    /// Decodes a value from exactly [`size`] bytes.
    ///
    /// Returns `None` if `data` has the wrong length or the width is not
    /// supported for the kind. Integers may be 1 to 8 bytes wide.
    ///
    /// [`size`]: Self::size
    pub fn decode(&self, data: &[u8]) -> Option<Value> {
        if self.size == 0 || self.size > 8 || data.len() != self.size as usize {
            return None;
        }

        let mut raw = [0u8; 8];
        match self.endian {
            Endian::Little => raw[..data.len()].copy_from_slice(data),
            Endian::Big => {
                for (index, byte) in data.iter().rev().enumerate() {
                    raw[index] = *byte;
                }
            }
        }

        let bits = u64::from_le_bytes(raw);

        match self.kind {
            NativeKind::Unsigned => Some(Value::Unsigned(bits)),
            NativeKind::Signed => {
                let shift = 64 - 8 * u32::from(self.size);
                Some(Value::Signed(((bits << shift) as i64) >> shift))
            }
            NativeKind::Float => match self.size {
                4 => Some(Value::Float(f64::from(f32::from_bits(bits as u32)))),
                8 => Some(Value::Float(f64::from_bits(bits))),
                _ => None,
            },
        }
    }
}

/// A decoded scalar value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// Unsigned integer.
    Unsigned(u64),

    /// Signed integer.
    Signed(i64),

    /// Floating point number.
    Float(f64),
}

impl Value {
    /// Returns the value as an unsigned integer.
    ///
    /// Signed values are reinterpreted (two's complement), floats are
    /// truncated.
    pub fn as_u64(self) -> u64 {
        match self {
            Self::Unsigned(value) => value,
            Self::Signed(value) => value as u64,
            Self::Float(value) => value as u64,
        }
    }

    /// Returns the value as a signed integer.
    pub fn as_i64(self) -> i64 {
        match self {
            Self::Unsigned(value) => value as i64,
            Self::Signed(value) => value,
            Self::Float(value) => value as i64,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unsigned(value) => write!(f, "{value}"),
            Self::Signed(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
        }
    }
}

/// A count or length that is either fixed or computed from the parent
/// object when the object is instantiated.
#[derive(Clone)]
pub enum Count {
    /// A fixed count.
    Fixed(u64),

    /// A count computed from the parent object.
    Computed(Rc<dyn Fn(&Object) -> Result<u64, NoneObject>>),
}

impl Count {
    /// Creates a count computed by `f` from the parent object.
    pub fn computed(f: impl Fn(&Object) -> Result<u64, NoneObject> + 'static) -> Self {
        Self::Computed(Rc::new(f))
    }

    /// Creates a count taken from the value of the parent's `member`.
    pub fn member(member: &'static str) -> Self {
        Self::computed(move |parent| parent.m(member).and_then(|object| object.value()))
    }

    /// Evaluates the count against `parent`.
    pub fn resolve(&self, parent: Option<&Object>) -> Result<u64, NoneObject> {
        match self {
            Self::Fixed(count) => Ok(*count),
            Self::Computed(f) => match parent {
                Some(parent) => f(parent),
                None => Err(NoneObject::new("computed count requires a parent object")),
            },
        }
    }
}

impl From<u64> for Count {
    fn from(value: u64) -> Self {
        Self::Fixed(value)
    }
}

impl PartialEq for Count {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Fixed(a), Self::Fixed(b)) => a == b,
            (Self::Computed(a), Self::Computed(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl std::fmt::Debug for Count {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fixed(count) => write!(f, "{count}"),
            Self::Computed(_) => write!(f, "<computed>"),
        }
    }
}

/// Parameters of a magic value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MagicSpec {
    /// Value known in advance.
    pub value: Option<MagicValue>,

    /// Name of the registered suggestion provider.
    pub provider: Option<String>,

    /// Configuration key that overrides suggestions when set.
    pub config_key: Option<String>,
}

/// A type descriptor.
///
/// Descriptors are declarative: they describe how bytes at some offset
/// should be interpreted, and are turned into objects by
/// [`Profile::object`].
///
/// [`Profile::object`]: crate::Profile::object
#[derive(Debug, Clone, PartialEq)]
pub enum TypeSpec {
    /// A type resolved by name: a native type, a registered class or a
    /// composite from the type table.
    Named(String),

    /// A native scalar.
    Native(NativeType),

    /// An opaque, valueless type.
    Void,

    /// A pointer of the profile's pointer width.
    Pointer(Box<TypeSpec>),

    /// A contiguous run of elements.
    Array {
        /// Number of elements.
        count: Count,

        /// Element type.
        element: Box<TypeSpec>,
    },

    /// A bit range `[start_bit, end_bit)` of an integer.
    BitField {
        /// The underlying integer.
        target: NativeType,

        /// First bit (inclusive).
        start_bit: u32,

        /// Last bit (exclusive).
        end_bit: u32,
    },

    /// An integer with labelled values.
    Enumeration {
        /// The underlying integer.
        target: NativeType,

        /// Value to label mapping.
        choices: Rc<BTreeMap<u64, String>>,
    },

    /// An integer whose bits carry names.
    Flags {
        /// The underlying integer.
        target: NativeType,

        /// Flag name to bit index mapping.
        bitmap: Rc<BTreeMap<String, u32>>,

        /// Mask name to `(start_bit, width)` mapping.
        maskmap: Rc<BTreeMap<String, (u32, u32)>>,
    },

    /// A NUL padded byte string.
    String {
        /// Number of bytes.
        length: Count,
    },

    /// A value that may need to be discovered per memory image.
    Magic(MagicSpec),
}

impl TypeSpec {
    /// Creates a named type.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Creates a pointer to `target`.
    pub fn pointer(target: impl Into<TypeSpec>) -> Self {
        Self::Pointer(Box::new(target.into()))
    }

    /// Creates an array of `count` elements.
    pub fn array(count: impl Into<Count>, element: impl Into<TypeSpec>) -> Self {
        Self::Array {
            count: count.into(),
            element: Box::new(element.into()),
        }
    }

    /// Creates a bit field over a 32-bit little-endian integer.
    pub fn bitfield(start_bit: u32, end_bit: u32) -> Self {
        Self::bitfield_of(NativeType::unsigned(4), start_bit, end_bit)
    }

    /// Creates a bit field over `target`.
    pub fn bitfield_of(target: NativeType, start_bit: u32, end_bit: u32) -> Self {
        Self::BitField {
            target,
            start_bit,
            end_bit,
        }
    }

    /// Creates an enumeration over `target`.
    pub fn enumeration<I, S>(target: NativeType, choices: I) -> Self
    where
        I: IntoIterator<Item = (u64, S)>,
        S: Into<String>,
    {
        Self::Enumeration {
            target,
            choices: Rc::new(
                choices
                    .into_iter()
                    .map(|(value, label)| (value, label.into()))
                    .collect(),
            ),
        }
    }

    /// Creates a flags type over `target`.
    pub fn flags<B, M>(target: NativeType, bitmap: B, maskmap: M) -> Self
    where
        B: IntoIterator<Item = (&'static str, u32)>,
        M: IntoIterator<Item = (&'static str, (u32, u32))>,
    {
        Self::Flags {
            target,
            bitmap: Rc::new(
                bitmap
                    .into_iter()
                    .map(|(name, bit)| (name.to_owned(), bit))
                    .collect(),
            ),
            maskmap: Rc::new(
                maskmap
                    .into_iter()
                    .map(|(name, range)| (name.to_owned(), range))
                    .collect(),
            ),
        }
    }

    /// Creates a string of `length` bytes.
    pub fn string(length: impl Into<Count>) -> Self {
        Self::String {
            length: length.into(),
        }
    }

    /// Creates a magic value with a fixed value.
    pub fn magic(value: MagicValue) -> Self {
        Self::Magic(MagicSpec {
            value: Some(value),
            ..Default::default()
        })
    }

    /// Creates a magic value resolved by the named suggestion provider.
    ///
    /// When `config_key` is given and set in the profile's configuration,
    /// the configured value wins over any suggestion.
    pub fn magic_suggested(provider: impl Into<String>, config_key: Option<&str>) -> Self {
        Self::Magic(MagicSpec {
            value: None,
            provider: Some(provider.into()),
            config_key: config_key.map(str::to_owned),
        })
    }

    /// Returns a short name describing the kind of the descriptor.
    pub fn kind_name(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::Native(_) => "Native",
            Self::Void => "void",
            Self::Pointer(_) => "Pointer",
            Self::Array { .. } => "Array",
            Self::BitField { .. } => "BitField",
            Self::Enumeration { .. } => "Enumeration",
            Self::Flags { .. } => "Flags",
            Self::String { .. } => "String",
            Self::Magic(_) => "VolatilityMagic",
        }
    }
}

impl From<&str> for TypeSpec {
    fn from(value: &str) -> Self {
        Self::Named(value.to_owned())
    }
}

impl From<String> for TypeSpec {
    fn from(value: String) -> Self {
        Self::Named(value)
    }
}

impl From<NativeType> for TypeSpec {
    fn from(value: NativeType) -> Self {
        Self::Native(value)
    }
}

impl From<&TypeSpec> for TypeSpec {
    fn from(value: &TypeSpec) -> Self {
        value.clone()
    }
}

/// Convenience for counts computed from arbitrary expressions over the
/// parent, e.g. `_CM_KEY_INDEX.List` whose count is `Count * 2`.
pub fn computed_count(
    f: impl Fn(&Object) -> MaybeObject + 'static,
    scale: u64,
) -> Count {
    Count::computed(move |parent| Ok(f(parent)?.value()?.wrapping_mul(scale)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_signed_and_big_endian() {
        assert_eq!(
            NativeType::signed(2).decode(&[0xfe, 0xff]),
            Some(Value::Signed(-2))
        );
        assert_eq!(
            NativeType::unsigned(2).big_endian().decode(&[0x01, 0xbb]),
            Some(Value::Unsigned(443))
        );
        assert_eq!(NativeType::unsigned(4).decode(&[0x01, 0x02]), None);
    }

    #[test]
    fn decode_odd_widths() {
        assert_eq!(NativeType::unsigned(0).decode(&[]), None);
        assert_eq!(NativeType::signed(0).decode(&[]), None);
        assert_eq!(NativeType::unsigned(16).decode(&[0xff; 16]), None);
        assert_eq!(NativeType::signed(16).decode(&[0xff; 16]), None);

        assert_eq!(
            NativeType::unsigned(3).decode(&[0x01, 0x02, 0x03]),
            Some(Value::Unsigned(0x030201))
        );
        assert_eq!(
            NativeType::signed(3).decode(&[0xff, 0xff, 0xff]),
            Some(Value::Signed(-1))
        );
    }

    #[test]
    fn decode_float() {
        let bytes = 1.5f32.to_le_bytes();
        assert_eq!(NativeType::float(4).decode(&bytes), Some(Value::Float(1.5)));
    }

    #[test]
    fn fixed_count_resolves_without_parent() {
        assert_eq!(Count::Fixed(4).resolve(None), Ok(4));
        assert!(Count::member("Count").resolve(None).is_err());
    }
}
