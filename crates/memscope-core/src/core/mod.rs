mod address;
mod hex;
pub(crate) mod macros;

pub use self::{
    address::{Gfn, Pa, Va},
    hex::Hex,
};
