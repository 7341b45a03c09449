//! Architecture description consumed by the type system.
//!
//! The frontend itself is target-independent; everything it needs to know
//! about a target fits in an [`ArchInfo`]: size and alignment of each basic
//! type, pointer size, and byte order. Backends supply a real table; tests
//! use [`ArchInfo::example`].

/// Byte order used when encoding constant initializer data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Endianness {
    Little,
    Big,
}

/// Size and alignment of one storage class, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct TypeLayout {
    pub size: u32,
    pub align: u32,
}

impl TypeLayout {
    pub const fn new(size: u32, align: u32) -> Self {
        Self { size, align }
    }
}

/// Basic-type layout table for one target architecture.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ArchInfo {
    pub endianness: Endianness,
    pub char_layout: TypeLayout,
    pub short_layout: TypeLayout,
    pub int_layout: TypeLayout,
    pub long_layout: TypeLayout,
    pub long_long_layout: TypeLayout,
    pub float_layout: TypeLayout,
    pub double_layout: TypeLayout,
    pub pointer_layout: TypeLayout,
}

impl ArchInfo {
    /// A small 32-bit little-endian machine: char 1, short 2, int 4,
    /// long 4, long long 8, float 4, double 8, pointers 4.
    pub fn example() -> Self {
        Self {
            endianness: Endianness::Little,
            char_layout: TypeLayout::new(1, 1),
            short_layout: TypeLayout::new(2, 2),
            int_layout: TypeLayout::new(4, 4),
            long_layout: TypeLayout::new(4, 4),
            long_long_layout: TypeLayout::new(8, 8),
            float_layout: TypeLayout::new(4, 4),
            double_layout: TypeLayout::new(8, 8),
            pointer_layout: TypeLayout::new(4, 4),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn example_arch_is_32_bit() {
        let arch = ArchInfo::example();
        assert_eq!(arch.int_layout.size, 4);
        assert_eq!(arch.pointer_layout.size, 4);
        assert_eq!(arch.endianness, Endianness::Little);
    }
}
