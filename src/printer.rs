//! Textual rendering of IR modules.
//!
//! The format is for humans and golden tests; it round-trips nothing.

use crate::ir::{
    Callee, CmpOp, Inst, IrBlock, IrFunction, IrModule, IrSignature, IrType, Terminator,
};
use crate::ir::{BinOp, BlockId, ValueId};
use std::fmt;

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blk{}", self.0)
    }
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IrType::I8 => "i8",
            IrType::I16 => "i16",
            IrType::I32 => "i32",
            IrType::I64 => "i64",
            IrType::U8 => "u8",
            IrType::U16 => "u16",
            IrType::U32 => "u32",
            IrType::U64 => "u64",
            IrType::F32 => "f32",
            IrType::F64 => "f64",
            IrType::Ptr => "ptr",
        };
        f.write_str(s)
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Mul => "mul",
            BinOp::Div => "div",
            BinOp::Rem => "rem",
            BinOp::Shl => "shl",
            BinOp::Shr => "shr",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Xor => "xor",
        };
        f.write_str(s)
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        };
        f.write_str(s)
    }
}

impl fmt::Display for Inst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inst::Alloc {
                result,
                size,
                align,
            } => write!(f, "{result} = alloc {size} align {align}"),
            Inst::Load { result, ty, addr } => write!(f, "{result} = load {ty} [{addr}]"),
            Inst::Store { ty, value, addr } => write!(f, "store {ty} {value}, [{addr}]"),
            Inst::IntConst { result, ty, value } => write!(f, "{result} = {ty} {value}"),
            Inst::FloatConst { result, ty, value } => write!(f, "{result} = {ty} {value}"),
            Inst::Binop {
                result,
                ty,
                op,
                lhs,
                rhs,
            } => write!(f, "{result} = {op} {ty} {lhs}, {rhs}"),
            Inst::Cast {
                result,
                from,
                to,
                value,
            } => write!(f, "{result} = cast {from} {value} to {to}"),
            Inst::Call {
                result,
                callee,
                args,
            } => {
                match result {
                    Some((value, ty)) => write!(f, "{value} = call {ty} ")?,
                    None => write!(f, "call void ")?,
                }
                match callee {
                    Callee::Direct(name) => write!(f, "{name}(")?,
                    Callee::Indirect(value) => write!(f, "*{value}(")?,
                }
                for (i, (ty, value)) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{ty} {value}")?;
                }
                write!(f, ")")
            }
            Inst::GlobalAddr { result, name } => write!(f, "{result} = global @{name}"),
            Inst::FuncAddr { result, name } => write!(f, "{result} = func @{name}"),
            Inst::DataAddr { result, data } => write!(f, "{result} = data #{data}"),
        }
    }
}

impl fmt::Display for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terminator::Jump(target) => write!(f, "jump {target}"),
            Terminator::CondJump {
                lhs,
                op,
                rhs,
                then_blk,
                else_blk,
            } => write!(f, "if {lhs} {op} {rhs} then {then_blk} else {else_blk}"),
            Terminator::Return(Some(value)) => write!(f, "return {value}"),
            Terminator::Return(None) => write!(f, "return"),
        }
    }
}

impl fmt::Display for IrSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, ty) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{ty}")?;
        }
        if self.variadic {
            if !self.params.is_empty() {
                write!(f, ", ")?;
            }
            write!(f, "...")?;
        }
        write!(f, ")")?;
        match &self.ret {
            Some(ty) => write!(f, " -> {ty}"),
            None => Ok(()),
        }
    }
}

fn write_block(f: &mut fmt::Formatter<'_>, block: &IrBlock) -> fmt::Result {
    writeln!(f, "  {}:", block.id)?;
    for inst in &block.insts {
        writeln!(f, "    {inst}")?;
    }
    match &block.terminator {
        Some(terminator) => writeln!(f, "    {terminator}"),
        None => writeln!(f, "    <no terminator>"),
    }
}

impl fmt::Display for IrFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "function {}{}", self.name, self.sig)?;
        if !self.params.is_empty() {
            write!(f, " params")?;
            for value in &self.params {
                write!(f, " {value}")?;
            }
        }
        writeln!(f, " {{")?;
        for block in &self.blocks {
            write_block(f, block)?;
        }
        writeln!(f, "}}")
    }
}

impl fmt::Display for IrModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for global in &self.globals {
            write!(f, "global @{} align {} = ", global.name, global.align)?;
            write_bytes(f, &global.init)?;
            writeln!(f)?;
        }
        for (at, data) in self.datas.iter().enumerate() {
            write!(f, "data #{at} = ")?;
            write_bytes(f, data)?;
            writeln!(f)?;
        }
        for ext in &self.externals {
            writeln!(f, "extern {}{}", ext.name, ext.sig)?;
        }
        for func in &self.functions {
            write!(f, "{func}")?;
        }
        Ok(())
    }
}

fn write_bytes(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    write!(f, "\"")?;
    for &b in bytes {
        match b {
            b'"' => write!(f, "\\\"")?,
            b'\\' => write!(f, "\\\\")?,
            0x20..=0x7e => write!(f, "{}", b as char)?,
            _ => write!(f, "\\{b:02x}")?,
        }
    }
    write!(f, "\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::IrBuilder;

    #[test]
    fn renders_a_small_function() {
        let sig = IrSignature {
            params: vec![IrType::I32],
            ret: Some(IrType::I32),
            variadic: false,
        };
        let mut b = IrBuilder::new("twice".into(), sig);
        let p = b.params()[0];
        let sum = b.binop(IrType::I32, BinOp::Add, p, p);
        b.ret(Some(sum));
        let text = b.finish().to_string();
        assert!(text.contains("function twice(i32) -> i32"));
        assert!(text.contains("v1 = add i32 v0, v0"));
        assert!(text.contains("return v1"));
    }

    #[test]
    fn escapes_data_bytes() {
        let mut module = IrModule::default();
        module.add_data(b"hi\n\0".to_vec());
        let text = module.to_string();
        assert!(text.contains("data #0 = \"hi\\0a\\00\""));
    }
}
