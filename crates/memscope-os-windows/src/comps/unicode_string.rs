use memscope_core::{Hex, NoneObject, Object, ObjectClass};

/// Reads the contents of a `_UNICODE_STRING`.
///
/// `Length` bytes are read from `Buffer` and decoded as UTF-16LE; invalid
/// code units are replaced. An empty string has no buffer to read.
pub fn read_unicode_string(object: &Object) -> Result<String, NoneObject> {
    let length = object.m("Length")?.value()?;
    if length == 0 {
        return Ok(String::new());
    }

    let buffer = object.m("Buffer")?.value()?;
    let data = object
        .vm()
        .read_exact(buffer, length as usize)
        .ok_or_else(|| {
            NoneObject::new(format!(
                "unicode string buffer at {} is not readable",
                Hex(buffer)
            ))
        })?;

    let units = data
        .chunks_exact(2)
        .map(|unit| u16::from_le_bytes([unit[0], unit[1]]));

    Ok(char::decode_utf16(units)
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect())
}

/// Class of `_UNICODE_STRING`.
///
/// Renders the decoded string instead of the composite.
pub struct UnicodeStringClass;

impl ObjectClass for UnicodeStringClass {
    fn render(&self, object: &Object) -> Option<Result<String, NoneObject>> {
        Some(read_unicode_string(object))
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use memscope_core::{AddressSpace, BufferSpace, Config, ObjectChain};

    use super::*;
    use crate::xp_sp2_x86;

    fn utf16(text: &str) -> Vec<u8> {
        text.encode_utf16().flat_map(u16::to_le_bytes).collect()
    }

    #[test]
    fn decodes_buffer() {
        let profile = xp_sp2_x86(Config::default());

        let mut space = BufferSpace::new("test");
        space.write(0x1000, &[0x10, 0, 0x12, 0]);
        space.write_u32(0x1004, 0x2000);
        space.write(0x2000, &utf16("ntdll.dllXXXX"));
        space.write(0x1010, &[0; 8]);
        let vm: Rc<dyn AddressSpace> = Rc::new(space);

        let name = profile.object("_UNICODE_STRING", 0x1000, &vm).unwrap();
        assert_eq!(read_unicode_string(&name), Ok(String::from("ntdll.dl")));
        assert_eq!(name.to_string(), "ntdll.dl");

        let empty = profile.object("_UNICODE_STRING", 0x1010, &vm);
        assert_eq!(empty.render(), "");
    }

    #[test]
    fn unreadable_buffer_renders_as_invalid() {
        let profile = xp_sp2_x86(Config::default());

        let mut space = BufferSpace::new("test");
        space.write(0x1000, &[0x4, 0, 0x4, 0]);
        space.write_u32(0x1004, 0x9000);
        let vm: Rc<dyn AddressSpace> = Rc::new(space);

        let name = profile.object("_UNICODE_STRING", 0x1000, &vm);
        assert!(read_unicode_string(name.as_ref().unwrap()).is_err());
        assert_eq!(name.render(), "-");
    }
}
