use std::fmt::{Debug, Display, Formatter};

/// A position in the source text, 1-based.
#[derive(Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct SourceLoc {
    pub row: u32,
    pub column: u32,
}

impl SourceLoc {
    pub fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }

    /// Location of the first character of a file.
    pub fn start() -> Self {
        Self { row: 1, column: 1 }
    }
}

impl Default for SourceLoc {
    fn default() -> Self {
        Self::start()
    }
}

impl Display for SourceLoc {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.row, self.column)
    }
}

impl Debug for SourceLoc {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SourceLoc({}:{})", self.row, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loc_equality() {
        let a = SourceLoc::new(3, 14);
        let b = SourceLoc::new(3, 14);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "3:14");
    }
}
