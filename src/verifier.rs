//! Structural verification of IR modules.
//!
//! Run after code generation (and by tests) to catch malformed output:
//! missing terminators, dangling block or value references, unresolved call
//! targets, return arity mismatches. Verification is flow-insensitive; a
//! value counts as defined if any instruction or parameter defines it.

use crate::ir::{BlockId, Callee, Inst, IrFunction, IrModule, Terminator, ValueId};
use hashbrown::HashSet;
use log::debug;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("function '{function}': entry block {entry} does not exist")]
    MissingEntry { function: String, entry: BlockId },
    #[error("function '{function}': duplicate block id {block}")]
    DuplicateBlock { function: String, block: BlockId },
    #[error("function '{function}': block {block} has no terminator")]
    MissingTerminator { function: String, block: BlockId },
    #[error("function '{function}': block {block} jumps to unknown block {target}")]
    UnknownTarget {
        function: String,
        block: BlockId,
        target: BlockId,
    },
    #[error("function '{function}': value {value} defined more than once")]
    Redefined { function: String, value: ValueId },
    #[error("function '{function}': value {value} used but never defined")]
    UndefinedValue { function: String, value: ValueId },
    #[error("function '{function}': call to unknown symbol '{callee}'")]
    UnknownCallee { function: String, callee: String },
    #[error("function '{function}': unknown global '{global}'")]
    UnknownGlobal { function: String, global: String },
    #[error("function '{function}': data reference #{data} out of range")]
    UnknownData { function: String, data: usize },
    #[error("function '{function}': return value does not match signature")]
    ReturnMismatch { function: String },
}

pub struct Verifier;

impl Verifier {
    /// Check every function of `module`, collecting all findings.
    pub fn verify(module: &IrModule) -> Result<(), Vec<VerifyError>> {
        let mut errors = Vec::new();
        let mut symbols: HashSet<&str> = HashSet::new();
        for func in &module.functions {
            symbols.insert(&func.name);
        }
        for ext in &module.externals {
            symbols.insert(&ext.name);
        }
        let globals: HashSet<&str> = module.globals.iter().map(|g| g.name.as_str()).collect();

        for func in &module.functions {
            Self::verify_function(func, module, &symbols, &globals, &mut errors);
        }
        if errors.is_empty() {
            debug!(
                "verified module: {} functions, {} globals",
                module.functions.len(),
                module.globals.len()
            );
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn verify_function(
        func: &IrFunction,
        module: &IrModule,
        symbols: &HashSet<&str>,
        globals: &HashSet<&str>,
        errors: &mut Vec<VerifyError>,
    ) {
        let name = func.name.clone();

        let mut blocks: HashSet<BlockId> = HashSet::new();
        for block in &func.blocks {
            if !blocks.insert(block.id) {
                errors.push(VerifyError::DuplicateBlock {
                    function: name.clone(),
                    block: block.id,
                });
            }
        }
        if !blocks.contains(&func.entry) {
            errors.push(VerifyError::MissingEntry {
                function: name.clone(),
                entry: func.entry,
            });
        }

        let mut defined: HashSet<ValueId> = HashSet::new();
        for &param in &func.params {
            if !defined.insert(param) {
                errors.push(VerifyError::Redefined {
                    function: name.clone(),
                    value: param,
                });
            }
        }
        for block in &func.blocks {
            for inst in &block.insts {
                if let Some(result) = inst.result() {
                    if !defined.insert(result) {
                        errors.push(VerifyError::Redefined {
                            function: name.clone(),
                            value: result,
                        });
                    }
                }
            }
        }

        let mut check_use = |value: ValueId, errors: &mut Vec<VerifyError>| {
            if !defined.contains(&value) {
                errors.push(VerifyError::UndefinedValue {
                    function: name.clone(),
                    value,
                });
            }
        };

        for block in &func.blocks {
            for inst in &block.insts {
                let mut used = Vec::new();
                inst.uses(|v| used.push(v));
                for value in used {
                    check_use(value, errors);
                }
                match inst {
                    Inst::Call {
                        callee: Callee::Direct(callee),
                        ..
                    } => {
                        if !symbols.contains(callee.as_str()) {
                            errors.push(VerifyError::UnknownCallee {
                                function: name.clone(),
                                callee: callee.clone(),
                            });
                        }
                    }
                    Inst::GlobalAddr { name: global, .. } => {
                        if !globals.contains(global.as_str()) {
                            errors.push(VerifyError::UnknownGlobal {
                                function: name.clone(),
                                global: global.clone(),
                            });
                        }
                    }
                    Inst::FuncAddr { name: target, .. } => {
                        if !symbols.contains(target.as_str()) {
                            errors.push(VerifyError::UnknownCallee {
                                function: name.clone(),
                                callee: target.clone(),
                            });
                        }
                    }
                    Inst::DataAddr { data, .. } => {
                        if *data >= module.datas.len() {
                            errors.push(VerifyError::UnknownData {
                                function: name.clone(),
                                data: *data,
                            });
                        }
                    }
                    _ => {}
                }
            }

            match &block.terminator {
                None => errors.push(VerifyError::MissingTerminator {
                    function: name.clone(),
                    block: block.id,
                }),
                Some(terminator) => {
                    let mut targets = Vec::new();
                    terminator.successors(|t| targets.push(t));
                    for target in targets {
                        if !blocks.contains(&target) {
                            errors.push(VerifyError::UnknownTarget {
                                function: name.clone(),
                                block: block.id,
                                target,
                            });
                        }
                    }
                    if let Terminator::CondJump { lhs, rhs, .. } = terminator {
                        check_use(*lhs, errors);
                        check_use(*rhs, errors);
                    }
                    if let Terminator::Return(value) = terminator {
                        match (value, &func.sig.ret) {
                            (Some(v), Some(_)) => check_use(*v, errors),
                            (None, None) => {}
                            _ => errors.push(VerifyError::ReturnMismatch {
                                function: name.clone(),
                            }),
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BinOp, IrBuilder, IrSignature, IrType};

    fn sig() -> IrSignature {
        IrSignature {
            params: vec![IrType::I32],
            ret: Some(IrType::I32),
            variadic: false,
        }
    }

    fn module_with(func: crate::ir::IrFunction) -> IrModule {
        IrModule {
            functions: vec![func],
            ..Default::default()
        }
    }

    #[test]
    fn accepts_well_formed_function() {
        let mut b = IrBuilder::new("double_it".into(), sig());
        let p = b.params()[0];
        let sum = b.binop(IrType::I32, BinOp::Add, p, p);
        b.ret(Some(sum));
        assert!(Verifier::verify(&module_with(b.finish())).is_ok());
    }

    #[test]
    fn rejects_missing_terminator() {
        let mut b = IrBuilder::new("f".into(), sig());
        b.iconst(IrType::I32, 1);
        let errors = Verifier::verify(&module_with(b.finish())).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, VerifyError::MissingTerminator { .. })));
    }

    #[test]
    fn rejects_dangling_jump() {
        let mut b = IrBuilder::new("f".into(), sig());
        b.jump(BlockId(42));
        let errors = Verifier::verify(&module_with(b.finish())).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, VerifyError::UnknownTarget { .. })));
    }

    #[test]
    fn rejects_undefined_value_use() {
        let mut b = IrBuilder::new("f".into(), sig());
        let ghost = ValueId(99);
        b.store(IrType::I32, ghost, ghost);
        let zero = b.iconst(IrType::I32, 0);
        b.ret(Some(zero));
        let errors = Verifier::verify(&module_with(b.finish())).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, VerifyError::UndefinedValue { .. })));
    }

    #[test]
    fn rejects_unknown_callee() {
        let mut b = IrBuilder::new("f".into(), sig());
        b.call(None, crate::ir::Callee::Direct("nowhere".into()), Vec::new());
        let zero = b.iconst(IrType::I32, 0);
        b.ret(Some(zero));
        let errors = Verifier::verify(&module_with(b.finish())).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, VerifyError::UnknownCallee { .. })));
    }

    #[test]
    fn rejects_return_without_value() {
        let mut b = IrBuilder::new("f".into(), sig());
        b.ret(None);
        let errors = Verifier::verify(&module_with(b.finish())).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, VerifyError::ReturnMismatch { .. })));
    }
}
