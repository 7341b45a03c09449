//! Frontend configuration.

use crate::arch::{ArchInfo, TypeLayout};

/// Supported C standards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CStandard {
    C89,
    C99,
    C11,
}

impl From<&str> for CStandard {
    fn from(s: &str) -> Self {
        match s {
            "c89" | "c90" => CStandard::C89,
            "c99" => CStandard::C99,
            "c11" => CStandard::C11,
            _ => CStandard::C99, // default to C99
        }
    }
}

/// Width of the `int` type, when overriding the architecture table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntWidth {
    W16,
    W32,
    W64,
}

impl IntWidth {
    pub fn bytes(self) -> u32 {
        match self {
            IntWidth::W16 => 2,
            IntWidth::W32 => 4,
            IntWidth::W64 => 8,
        }
    }
}

/// Options affecting how one translation unit is built.
///
/// Every field has deterministic semantics:
/// - `standard`: dialect selector. All standards currently accept the same
///   input; `//` comments are permitted regardless, matching common
///   compiler practice.
/// - `enable_trigraphs`: when true, `??X` trigraph sequences are translated
///   before lexing; when false they pass through untouched.
/// - `default_int_size`: when set, overrides the size and alignment of
///   `int` from the supplied [`ArchInfo`].
#[derive(Debug, Clone, Copy)]
pub struct COptions {
    pub standard: CStandard,
    pub enable_trigraphs: bool,
    pub default_int_size: Option<IntWidth>,
}

impl Default for COptions {
    fn default() -> Self {
        COptions {
            standard: CStandard::C99,
            enable_trigraphs: false,
            default_int_size: None,
        }
    }
}

impl COptions {
    /// Apply option-level overrides to an architecture table.
    pub fn apply_to(&self, mut arch: ArchInfo) -> ArchInfo {
        if let Some(width) = self.default_int_size {
            let bytes = width.bytes();
            arch.int_layout = TypeLayout::new(bytes, bytes);
        }
        arch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_from_str() {
        assert_eq!(CStandard::from("c89"), CStandard::C89);
        assert_eq!(CStandard::from("c11"), CStandard::C11);
        assert_eq!(CStandard::from("k&r"), CStandard::C99);
    }

    #[test]
    fn int_size_override() {
        let opts = COptions {
            default_int_size: Some(IntWidth::W16),
            ..Default::default()
        };
        let arch = opts.apply_to(ArchInfo::example());
        assert_eq!(arch.int_layout.size, 2);
    }
}
