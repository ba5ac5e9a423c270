mod handle;
mod list;
mod tree;

pub use self::{
    handle::HandleTableEntryIterator,
    list::ListEntryIterator,
    tree::VadTreeIterator,
};
