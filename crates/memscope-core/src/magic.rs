//! Magic values.
//!
//! A magic value is a constant that may differ between memory images of
//! the same profile (e.g. the kernel DTB). It is either known in advance,
//! set in the configuration, or discovered by a suggestion provider.

use std::rc::Rc;

use crate::{Hex, MaybeObject, NoneObject, Object, ObjectArgs, ObjectClass, Profile, types::MagicSpec};

/// Name of the composite that groups the magic values of a profile.
pub const MAGIC_NAMESPACE: &str = "VOLATILITY_MAGIC";

/// A resolved magic value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MagicValue {
    /// An integer, usually an address.
    Int(u64),

    /// A byte pattern, usually a signature.
    Bytes(Vec<u8>),
}

impl MagicValue {
    /// Returns the integer value, if this is one.
    pub fn as_int(&self) -> Option<u64> {
        match self {
            Self::Int(value) => Some(*value),
            Self::Bytes(_) => None,
        }
    }

    /// Returns the byte pattern, if this is one.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Int(_) => None,
            Self::Bytes(bytes) => Some(bytes),
        }
    }
}

impl std::fmt::Display for MagicValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value:#x}"),
            Self::Bytes(bytes) => write!(f, "{}", Hex(bytes.as_slice())),
        }
    }
}

/// Produces candidate values for a magic value.
///
/// Suggestions are produced lazily and in order of preference; only the
/// first one is used.
pub trait MagicProvider {
    /// Returns the candidates for `magic`.
    ///
    /// The magic object's parent is the namespace composite, through which
    /// sibling values (e.g. a signature) can be read.
    fn suggestions<'a>(&'a self, magic: &'a Object) -> Box<dyn Iterator<Item = MagicValue> + 'a>;
}

/// Resolves a magic value.
///
/// The fixed value wins, then a configured value, then the first
/// suggestion. A value that the configuration should be able to override
/// must therefore be given as a suggestion rather than a fixed value.
pub(crate) fn resolve(
    profile: &Profile,
    spec: &MagicSpec,
    magic: &Object,
) -> Result<MagicValue, NoneObject> {
    if let Some(value) = &spec.value {
        return Ok(value.clone());
    }

    if let Some(key) = &spec.config_key
        && let Some(value) = profile.config().get(key)
    {
        tracing::trace!(
            name = magic.name(),
            key = key.as_str(),
            value = %Hex(value),
            "configured magic value"
        );
        return Ok(MagicValue::Int(value));
    }

    let provider = spec
        .provider
        .as_deref()
        .and_then(|name| profile.magic_provider(name));

    let Some(provider) = provider else {
        tracing::debug!(name = magic.name(), "magic value has no provider");
        return Err(NoneObject::new("No suggestions available"));
    };

    match provider.suggestions(magic).next() {
        Some(value) => Ok(value),
        None => {
            tracing::debug!(name = magic.name(), "magic suggestions exhausted");
            Err(NoneObject::new("No suggestions available"))
        }
    }
}

/// Class of the magic namespace composite.
///
/// The namespace is not backed by memory, so it is instantiated at any
/// offset without checking the address space.
pub(crate) struct MagicNamespace;

impl ObjectClass for MagicNamespace {
    fn instantiate(&self, profile: &Rc<Profile>, type_name: &str, args: ObjectArgs) -> MaybeObject {
        profile.new_struct_unchecked(type_name, args)
    }

    fn is_valid(&self, _object: &Object) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::{BufferSpace, Config, MagicSpec, ObjectChain, ProfileBuilder, TypeDef, TypeSpec};

    struct Counting {
        calls: Rc<Cell<usize>>,
    }

    impl MagicProvider for Counting {
        fn suggestions<'a>(
            &'a self,
            _magic: &'a Object,
        ) -> Box<dyn Iterator<Item = MagicValue> + 'a> {
            self.calls.set(self.calls.get() + 1);
            Box::new([5, 7, 9].into_iter().map(MagicValue::Int))
        }
    }

    struct Empty;

    impl MagicProvider for Empty {
        fn suggestions<'a>(
            &'a self,
            _magic: &'a Object,
        ) -> Box<dyn Iterator<Item = MagicValue> + 'a> {
            Box::new(std::iter::empty())
        }
    }

    fn profile(calls: Rc<Cell<usize>>, config: Config) -> Rc<Profile> {
        ProfileBuilder::new("test")
            .register_type_overlay(
                MAGIC_NAMESPACE,
                TypeDef::patch()
                    .field("Fixed", 0, TypeSpec::magic(MagicValue::Int(0xffdff000)))
                    .field(
                        "Kpcr",
                        0,
                        TypeSpec::Magic(MagicSpec {
                            value: Some(MagicValue::Int(0xffdff000)),
                            provider: None,
                            config_key: Some(String::from("KPCR")),
                        }),
                    )
                    .field("Counted", 0, TypeSpec::magic_suggested("Counting", Some("DTB")))
                    .field(
                        "Configured",
                        0,
                        TypeSpec::Magic(MagicSpec {
                            value: None,
                            provider: None,
                            config_key: Some(String::from("KPCR")),
                        }),
                    )
                    .field("Nothing", 0, TypeSpec::magic_suggested("Empty", None)),
            )
            .register_magic("Counting", Counting { calls })
            .register_magic("Empty", Empty)
            .config(config)
            .build()
    }

    fn namespace(profile: &Rc<Profile>) -> MaybeObject {
        let vm: Rc<dyn crate::AddressSpace> = Rc::new(BufferSpace::new("empty"));
        profile.object(MAGIC_NAMESPACE, 0, &vm)
    }

    #[test]
    fn first_suggestion_is_cached() {
        let calls = Rc::new(Cell::new(0));
        let profile = profile(calls.clone(), Config::default());

        let magic = namespace(&profile).m("Counted").unwrap();
        assert_eq!(magic.value(), Ok(5));
        assert_eq!(magic.value(), Ok(5));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn fixed_and_configured_values() {
        let calls = Rc::new(Cell::new(0));
        let config = Config {
            dtb: Some(0x39000),
            kpcr: Some(0xffdfe000),
            ..Default::default()
        };
        let profile = profile(calls.clone(), config);
        let ns = namespace(&profile);

        assert_eq!(ns.m("Fixed").value(), Ok(0xffdff000));
        assert_eq!(ns.m("Counted").value(), Ok(0x39000));
        assert_eq!(ns.m("Configured").value(), Ok(0xffdfe000));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn fixed_value_beats_configured_value() {
        let config = Config {
            kpcr: Some(0xffdfe000),
            ..Default::default()
        };
        let profile = profile(Rc::new(Cell::new(0)), config);

        assert_eq!(namespace(&profile).m("Kpcr").value(), Ok(0xffdff000));
    }

    #[test]
    fn unset_configuration_falls_through() {
        let calls = Rc::new(Cell::new(0));
        let profile = profile(calls.clone(), Config::default());
        let ns = namespace(&profile);

        assert_eq!(ns.m("Kpcr").value(), Ok(0xffdff000));
        assert_eq!(ns.m("Counted").value(), Ok(5));
        assert!(ns.m("Configured").value().is_err());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn exhausted_suggestions() {
        let profile = profile(Rc::new(Cell::new(0)), Config::default());
        let err = namespace(&profile).m("Nothing").value().unwrap_err();
        assert_eq!(err.reason(), "No suggestions available");
        assert_eq!(namespace(&profile).m("Nothing").render(), "-");
    }
}
