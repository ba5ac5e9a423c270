use super::{MaybeObject, NoneObject};
use crate::TypeSpec;

/// Navigation on possibly invalid objects.
///
/// Every operation on an invalid object yields the same invalid object, so
/// traversals can be written as chains and checked once at the end:
///
/// ```ignore
/// let name = process.m("Peb").m("ProcessParameters").m("ImagePathName");
/// ```
pub trait ObjectChain {
    /// Returns a member (see [`Object::m`]).
    ///
    /// [`Object::m`]: crate::Object::m
    fn m(&self, name: &str) -> MaybeObject;

    /// Returns an array element (see [`Object::index`]).
    ///
    /// [`Object::index`]: crate::Object::index
    fn index(&self, index: u64) -> MaybeObject;

    /// Follows a pointer (see [`Object::dereference`]).
    ///
    /// [`Object::dereference`]: crate::Object::dereference
    fn dereference(&self) -> MaybeObject;

    /// Follows a pointer as another type (see [`Object::dereference_as`]).
    ///
    /// [`Object::dereference_as`]: crate::Object::dereference_as
    fn dereference_as(&self, spec: impl Into<TypeSpec>) -> MaybeObject;

    /// Returns the scalar value as an unsigned integer.
    fn value(&self) -> Result<u64, NoneObject>;

    /// Returns the decoded contents of a string.
    fn string(&self) -> Result<String, NoneObject>;

    /// Checks whether the object exists and is valid.
    fn is_valid(&self) -> bool;

    /// Renders the object, or `"-"` if it is invalid.
    fn render(&self) -> String;
}

impl ObjectChain for MaybeObject {
    fn m(&self, name: &str) -> MaybeObject {
        self.as_ref().map_err(Clone::clone)?.m(name)
    }

    fn index(&self, index: u64) -> MaybeObject {
        self.as_ref().map_err(Clone::clone)?.index(index)
    }

    fn dereference(&self) -> MaybeObject {
        self.as_ref().map_err(Clone::clone)?.dereference()
    }

    fn dereference_as(&self, spec: impl Into<TypeSpec>) -> MaybeObject {
        self.as_ref().map_err(Clone::clone)?.dereference_as(spec)
    }

    fn value(&self) -> Result<u64, NoneObject> {
        self.as_ref().map_err(Clone::clone)?.value()
    }

    fn string(&self) -> Result<String, NoneObject> {
        self.as_ref().map_err(Clone::clone)?.string()
    }

    fn is_valid(&self) -> bool {
        self.as_ref().is_ok_and(|object| object.is_valid())
    }

    fn render(&self) -> String {
        match self {
            Ok(object) => object.to_string(),
            Err(_) => String::from("-"),
        }
    }
}
