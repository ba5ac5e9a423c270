use std::fmt;

/// A hexadecimal representation of a value.
///
/// Integers are zero-padded to their natural width. Byte slices render as
/// space separated pairs, which is how tags and signatures are reported.
///
/// # Examples
///
/// ```
/// # use memscope_core::Hex;
/// assert_eq!(format!("{}", Hex(42u16)), "0x002a");
/// assert_eq!(format!("{}", Hex(&b"Vad"[..])), "56 61 64");
/// ```
pub struct Hex<T>(pub T);

macro_rules! hex_int {
    ($($type:ty),+) => {
        $(
            impl fmt::Display for Hex<$type> {
                fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                    write!(f, "0x{:0width$x}", self.0, width = 2 * size_of::<$type>())
                }
            }

            impl fmt::Debug for Hex<$type> {
                fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                    fmt::Display::fmt(self, f)
                }
            }
        )+
    };
}

hex_int!(u8, u16, u32, u64, usize);

impl fmt::Display for Hex<&[u8]> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (index, byte) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(" ")?;
            }

            write!(f, "{byte:02x}")?;
        }

        Ok(())
    }
}

impl fmt::Debug for Hex<&[u8]> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{self}]")
    }
}
