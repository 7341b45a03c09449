//! Architecture-independent intermediate representation.
//!
//! A module holds byte-initialized globals, external declarations and
//! functions. Function bodies are basic blocks in SSA-ish form: every
//! instruction that produces a value defines a fresh [`ValueId`], control
//! flow lives only in block terminators, and conditional jumps carry their
//! comparison instead of consuming a boolean value. Construction goes
//! through [`IrBuilder`], which keeps a cursor on the block being filled.

use serde::Serialize;

/// Virtual register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ValueId(pub u32);

/// Basic-block handle, unique within one function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BlockId(pub u32);

/// Machine-level value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IrType {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Ptr,
}

impl IrType {
    pub fn is_float(self) -> bool {
        matches!(self, IrType::F32 | IrType::F64)
    }

    pub fn is_signed(self) -> bool {
        matches!(self, IrType::I8 | IrType::I16 | IrType::I32 | IrType::I64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    And,
    Or,
    Xor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Call target: a named symbol or a computed pointer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Callee {
    Direct(String),
    Indirect(ValueId),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Inst {
    /// Reserve stack space; the result is its address.
    Alloc {
        result: ValueId,
        size: u32,
        align: u32,
    },
    Load {
        result: ValueId,
        ty: IrType,
        addr: ValueId,
    },
    Store {
        ty: IrType,
        value: ValueId,
        addr: ValueId,
    },
    IntConst {
        result: ValueId,
        ty: IrType,
        value: i64,
    },
    FloatConst {
        result: ValueId,
        ty: IrType,
        value: f64,
    },
    Binop {
        result: ValueId,
        ty: IrType,
        op: BinOp,
        lhs: ValueId,
        rhs: ValueId,
    },
    Cast {
        result: ValueId,
        from: IrType,
        to: IrType,
        value: ValueId,
    },
    Call {
        result: Option<(ValueId, IrType)>,
        callee: Callee,
        args: Vec<(IrType, ValueId)>,
    },
    /// Address of a module global.
    GlobalAddr {
        result: ValueId,
        name: String,
    },
    /// Address of a function or external.
    FuncAddr {
        result: ValueId,
        name: String,
    },
    /// Address of an interned read-only byte string.
    DataAddr {
        result: ValueId,
        data: usize,
    },
}

impl Inst {
    pub fn result(&self) -> Option<ValueId> {
        match self {
            Inst::Alloc { result, .. }
            | Inst::Load { result, .. }
            | Inst::IntConst { result, .. }
            | Inst::FloatConst { result, .. }
            | Inst::Binop { result, .. }
            | Inst::Cast { result, .. }
            | Inst::GlobalAddr { result, .. }
            | Inst::FuncAddr { result, .. }
            | Inst::DataAddr { result, .. } => Some(*result),
            Inst::Store { .. } => None,
            Inst::Call { result, .. } => result.map(|(v, _)| v),
        }
    }

    /// Values read by this instruction.
    pub fn uses(&self, mut visit: impl FnMut(ValueId)) {
        match self {
            Inst::Alloc { .. }
            | Inst::IntConst { .. }
            | Inst::FloatConst { .. }
            | Inst::GlobalAddr { .. }
            | Inst::FuncAddr { .. }
            | Inst::DataAddr { .. } => {}
            Inst::Load { addr, .. } => visit(*addr),
            Inst::Store { value, addr, .. } => {
                visit(*value);
                visit(*addr);
            }
            Inst::Binop { lhs, rhs, .. } => {
                visit(*lhs);
                visit(*rhs);
            }
            Inst::Cast { value, .. } => visit(*value),
            Inst::Call { callee, args, .. } => {
                if let Callee::Indirect(value) = callee {
                    visit(*value);
                }
                for (_, arg) in args {
                    visit(*arg);
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Terminator {
    Jump(BlockId),
    /// Two-way branch on a comparison.
    CondJump {
        lhs: ValueId,
        op: CmpOp,
        rhs: ValueId,
        then_blk: BlockId,
        else_blk: BlockId,
    },
    Return(Option<ValueId>),
}

impl Terminator {
    pub fn successors(&self, mut visit: impl FnMut(BlockId)) {
        match self {
            Terminator::Jump(target) => visit(*target),
            Terminator::CondJump {
                then_blk, else_blk, ..
            } => {
                visit(*then_blk);
                visit(*else_blk);
            }
            Terminator::Return(_) => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IrBlock {
    pub id: BlockId,
    pub insts: Vec<Inst>,
    pub terminator: Option<Terminator>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IrSignature {
    pub params: Vec<IrType>,
    pub ret: Option<IrType>,
    pub variadic: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IrFunction {
    pub name: String,
    pub sig: IrSignature,
    /// One value per parameter, defined on entry.
    pub params: Vec<ValueId>,
    pub entry: BlockId,
    pub blocks: Vec<IrBlock>,
}

/// A module-level variable with its encoded initial contents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IrGlobal {
    pub name: String,
    pub align: u32,
    pub init: Vec<u8>,
}

/// A function declared but not defined in this unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IrExternal {
    pub name: String,
    pub sig: IrSignature,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct IrModule {
    pub globals: Vec<IrGlobal>,
    pub externals: Vec<IrExternal>,
    /// Read-only byte blobs referenced by `DataAddr`.
    pub datas: Vec<Vec<u8>>,
    pub functions: Vec<IrFunction>,
}

impl IrModule {
    /// Intern a read-only blob, reusing an identical existing one.
    pub fn add_data(&mut self, bytes: Vec<u8>) -> usize {
        if let Some(at) = self.datas.iter().position(|d| *d == bytes) {
            return at;
        }
        self.datas.push(bytes);
        self.datas.len() - 1
    }
}

/// Incremental function builder with a current-block cursor.
pub struct IrBuilder {
    func: IrFunction,
    next_value: u32,
    next_block: u32,
    current: BlockId,
}

impl IrBuilder {
    pub fn new(name: String, sig: IrSignature) -> Self {
        let mut builder = IrBuilder {
            func: IrFunction {
                name,
                sig,
                params: Vec::new(),
                entry: BlockId(0),
                blocks: Vec::new(),
            },
            next_value: 0,
            next_block: 0,
            current: BlockId(0),
        };
        let entry = builder.new_block();
        builder.func.entry = entry;
        builder.current = entry;
        for _ in 0..builder.func.sig.params.len() {
            let value = builder.new_value();
            builder.func.params.push(value);
        }
        builder
    }

    pub fn finish(self) -> IrFunction {
        self.func
    }

    pub fn params(&self) -> &[ValueId] {
        &self.func.params
    }

    fn new_value(&mut self) -> ValueId {
        let id = ValueId(self.next_value);
        self.next_value += 1;
        id
    }

    pub fn new_block(&mut self) -> BlockId {
        let id = BlockId(self.next_block);
        self.next_block += 1;
        self.func.blocks.push(IrBlock {
            id,
            insts: Vec::new(),
            terminator: None,
        });
        id
    }

    /// Blocks that do not yet end in a terminator.
    pub fn open_blocks(&self) -> Vec<BlockId> {
        self.func
            .blocks
            .iter()
            .filter(|b| b.terminator.is_none())
            .map(|b| b.id)
            .collect()
    }

    pub fn switch_to(&mut self, block: BlockId) {
        self.current = block;
    }

    fn block_mut(&mut self) -> &mut IrBlock {
        let at = self.current.0 as usize;
        &mut self.func.blocks[at]
    }

    /// True when the cursor block already ends in a terminator; further
    /// instructions would be unreachable and are dropped by the emitters.
    pub fn is_terminated(&self) -> bool {
        self.func.blocks[self.current.0 as usize].terminator.is_some()
    }

    fn push(&mut self, inst: Inst) {
        if !self.is_terminated() {
            self.block_mut().insts.push(inst);
        }
    }

    pub fn alloc(&mut self, size: u32, align: u32) -> ValueId {
        let result = self.new_value();
        self.push(Inst::Alloc {
            result,
            size,
            align,
        });
        result
    }

    pub fn load(&mut self, ty: IrType, addr: ValueId) -> ValueId {
        let result = self.new_value();
        self.push(Inst::Load { result, ty, addr });
        result
    }

    pub fn store(&mut self, ty: IrType, value: ValueId, addr: ValueId) {
        self.push(Inst::Store { ty, value, addr });
    }

    pub fn iconst(&mut self, ty: IrType, value: i64) -> ValueId {
        let result = self.new_value();
        self.push(Inst::IntConst { result, ty, value });
        result
    }

    pub fn fconst(&mut self, ty: IrType, value: f64) -> ValueId {
        let result = self.new_value();
        self.push(Inst::FloatConst { result, ty, value });
        result
    }

    pub fn binop(&mut self, ty: IrType, op: BinOp, lhs: ValueId, rhs: ValueId) -> ValueId {
        let result = self.new_value();
        self.push(Inst::Binop {
            result,
            ty,
            op,
            lhs,
            rhs,
        });
        result
    }

    pub fn cast(&mut self, from: IrType, to: IrType, value: ValueId) -> ValueId {
        if from == to {
            return value;
        }
        let result = self.new_value();
        self.push(Inst::Cast {
            result,
            from,
            to,
            value,
        });
        result
    }

    pub fn call(
        &mut self,
        ret: Option<IrType>,
        callee: Callee,
        args: Vec<(IrType, ValueId)>,
    ) -> Option<ValueId> {
        let result = ret.map(|ty| (self.new_value(), ty));
        self.push(Inst::Call {
            result,
            callee,
            args,
        });
        result.map(|(v, _)| v)
    }

    pub fn global_addr(&mut self, name: String) -> ValueId {
        let result = self.new_value();
        self.push(Inst::GlobalAddr { result, name });
        result
    }

    pub fn func_addr(&mut self, name: String) -> ValueId {
        let result = self.new_value();
        self.push(Inst::FuncAddr { result, name });
        result
    }

    pub fn data_addr(&mut self, data: usize) -> ValueId {
        let result = self.new_value();
        self.push(Inst::DataAddr { result, data });
        result
    }

    fn terminate(&mut self, terminator: Terminator) {
        if !self.is_terminated() {
            self.block_mut().terminator = Some(terminator);
        }
    }

    pub fn jump(&mut self, target: BlockId) {
        self.terminate(Terminator::Jump(target));
    }

    pub fn cond_jump(
        &mut self,
        lhs: ValueId,
        op: CmpOp,
        rhs: ValueId,
        then_blk: BlockId,
        else_blk: BlockId,
    ) {
        self.terminate(Terminator::CondJump {
            lhs,
            op,
            rhs,
            then_blk,
            else_blk,
        });
    }

    pub fn ret(&mut self, value: Option<ValueId>) {
        self.terminate(Terminator::Return(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_sig() -> IrSignature {
        IrSignature {
            params: vec![IrType::I32],
            ret: Some(IrType::I32),
            variadic: false,
        }
    }

    #[test]
    fn builder_numbers_values_densely() {
        let mut b = IrBuilder::new("f".into(), int_sig());
        let p = b.params()[0];
        let one = b.iconst(IrType::I32, 1);
        let sum = b.binop(IrType::I32, BinOp::Add, p, one);
        b.ret(Some(sum));
        let func = b.finish();
        assert_eq!(p, ValueId(0));
        assert_eq!(one, ValueId(1));
        assert_eq!(sum, ValueId(2));
        assert_eq!(func.blocks.len(), 1);
        assert_eq!(
            func.blocks[0].terminator,
            Some(Terminator::Return(Some(sum)))
        );
    }

    #[test]
    fn terminated_block_drops_further_code() {
        let mut b = IrBuilder::new("f".into(), int_sig());
        let zero = b.iconst(IrType::I32, 0);
        b.ret(Some(zero));
        b.iconst(IrType::I32, 9);
        b.ret(None);
        let func = b.finish();
        assert_eq!(func.blocks[0].insts.len(), 1);
        assert_eq!(
            func.blocks[0].terminator,
            Some(Terminator::Return(Some(zero)))
        );
    }

    #[test]
    fn data_interning_reuses_blobs() {
        let mut module = IrModule::default();
        let a = module.add_data(b"hi\0".to_vec());
        let b = module.add_data(b"hi\0".to_vec());
        let c = module.add_data(b"other\0".to_vec());
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn same_type_cast_is_identity() {
        let mut b = IrBuilder::new("f".into(), int_sig());
        let p = b.params()[0];
        assert_eq!(b.cast(IrType::I32, IrType::I32, p), p);
    }
}
