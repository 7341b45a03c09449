//! A retargetable C frontend.
//!
//! Lowers a C translation unit into an architecture-independent basic-block
//! IR. The pipeline is lexer (escape decoding, object-like `#define`
//! macros), recursive-descent parser, semantic analysis (name resolution,
//! type layout, constant folding), then code generation. A structural
//! [`Verifier`] checks the produced module.
//!
//! ```
//! use kolak::{ArchInfo, CBuilder, COptions, Verifier};
//!
//! let src = "int add(int a, int b) { return a + b; }";
//! let builder = CBuilder::new(ArchInfo::example(), COptions::default());
//! let module = builder.build(src).unwrap();
//! Verifier::verify(&module).unwrap();
//! ```

pub mod arch;
pub mod ast;
pub mod codegen;
pub mod error;
pub mod escape;
pub mod ir;
pub mod lexer;
pub mod options;
pub mod parser;
pub mod printer;
pub mod scope;
pub mod sema;
pub mod source;
pub mod types;
pub mod verifier;

pub use arch::{ArchInfo, Endianness, TypeLayout};
pub use error::{CResult, CompilerError, ErrorKind};
pub use ir::IrModule;
pub use options::{COptions, CStandard, IntWidth};
pub use source::SourceLoc;
pub use verifier::{Verifier, VerifyError};

/// Interned identifier.
pub use symbol_table::GlobalSymbol as Symbol;

use log::debug;

/// Compiles C source to an [`IrModule`] for one target architecture.
pub struct CBuilder {
    arch: ArchInfo,
    options: COptions,
}

impl CBuilder {
    pub fn new(arch: ArchInfo, options: COptions) -> Self {
        CBuilder { arch, options }
    }

    /// Build one translation unit.
    pub fn build(&self, source: &str) -> CResult<IrModule> {
        debug!("building translation unit ({} bytes)", source.len());
        let arch = self.options.apply_to(self.arch.clone());
        let tokens = lexer::Lexer::new(source, &self.options).tokenize()?;
        let mut unit = parser::Parser::new(tokens).parse_translation_unit()?;
        let sema = sema::analyze(&mut unit, arch)?;
        codegen::generate(&unit, sema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_and_verifies_a_unit() {
        let builder = CBuilder::new(ArchInfo::example(), COptions::default());
        let module = builder
            .build("int square(int x) { return x * x; }")
            .unwrap();
        Verifier::verify(&module).unwrap();
        assert_eq!(module.functions[0].name, "square");
    }

    #[test]
    fn reports_lexical_errors_with_location() {
        let builder = CBuilder::new(ArchInfo::example(), COptions::default());
        let err = builder.build("int a = `;").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Lexical);
        assert_eq!(err.loc.row, 1);
    }
}
