use super::macros::address_type;

address_type! {
    /// A physical frame number.
    Gfn
}

address_type! {
    /// A physical address.
    Pa
}

address_type! {
    /// A virtual address.
    Va
}

impl Pa {
    /// Returns the frame number of the page containing this address.
    pub const fn gfn(self, page_shift: u64) -> Gfn {
        Gfn(self.0 >> page_shift)
    }
}

impl Gfn {
    /// Returns the physical address of the first byte of this frame.
    pub const fn pa(self, page_shift: u64) -> Pa {
        Pa(self.0 << page_shift)
    }
}
