use std::fmt::{Display, Formatter, Result};

use super::{NoneObject, Object, ObjectKind};

/// Placeholder for values that cannot be rendered.
const INVALID: &str = "-";

impl Display for Object {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        if let Some(class) = self.profile().class(self.type_name())
            && let Some(rendered) = class.render(self)
        {
            return match rendered {
                Ok(text) => f.write_str(&text),
                Err(_) => f.write_str(INVALID),
            };
        }

        match self.kind() {
            ObjectKind::Native(_) | ObjectKind::BitField { .. } => {
                or_invalid(f, self.v(), |f, value| write!(f, "{value}"))
            }
            ObjectKind::Pointer(_) => or_invalid(f, self.value(), |f, value| write!(f, "{value:#x}")),
            ObjectKind::Enumeration { .. } => or_invalid(f, self.label(), |f, label| f.write_str(&label)),
            ObjectKind::Flags { .. } => or_invalid(f, self.flag_names(), |f, names| {
                f.write_str(&names.join(", "))
            }),
            ObjectKind::String { .. } => or_invalid(f, self.string(), |f, text| f.write_str(&text)),
            ObjectKind::Magic { .. } => {
                or_invalid(f, self.magic_value(), |f, value| write!(f, "{value}"))
            }
            ObjectKind::Array { count, element, .. } => write!(
                f,
                "[Array {count} x {}] @ {:#010x}",
                element.kind_name(),
                self.offset()
            ),
            ObjectKind::Struct(_) | ObjectKind::Void => {
                write!(f, "[{} @ {:#010x}]", self.type_name(), self.offset())
            }
        }
    }
}

fn or_invalid<T>(
    f: &mut Formatter<'_>,
    value: std::result::Result<T, NoneObject>,
    render: impl FnOnce(&mut Formatter<'_>, T) -> Result,
) -> Result {
    match value {
        Ok(value) => render(f, value),
        Err(_) => f.write_str(INVALID),
    }
}
