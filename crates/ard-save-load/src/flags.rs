use bitflags::bitflags;

bitflags! {
    /// Controls how fields are encoded when saving. Never changes the schema.
    #[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct SaveFlags: u32 {
        /// Enumerations are written by name instead of by value.
        const ENUMS_AS_STRINGS = 0b0000_0001;
        /// Fields are written under their compact spelling.
        const COMPACT_NAMES = 0b0000_0010;
    }
}

bitflags! {
    /// Controls how fields are decoded when loading. Reserved.
    #[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct LoadFlags: u32 {}
}
