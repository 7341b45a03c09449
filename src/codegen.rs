//! IR generation from the annotated tree.
//!
//! Globals become byte-encoded images, functions become basic blocks.
//! Every local variable (parameters included) lives in a stack slot from
//! [`Inst::Alloc`]; expression values are virtual registers. Control flow
//! is emitted with explicit blocks: conditions branch directly via
//! [`Terminator::CondJump`], short-circuit operators never materialize a
//! boolean unless their value is actually used.

use crate::arch::Endianness;
use crate::ast::{
    AssignOp, BinaryOp, BlockItem, Declaration, Expr, ExprKind, ExternalDecl, ForInit,
    FunctionDef, Initializer, Resolved, Stmt, TranslationUnit, UnaryOp,
};
use crate::error::{CResult, CompilerError};
use crate::ir::{
    BinOp, BlockId, Callee, CmpOp, IrBuilder, IrExternal, IrGlobal, IrModule, IrSignature,
    IrType, ValueId,
};
use crate::sema::{
    const_eval, flatten_initializer, string_bytes, ConstValue, InitValue, LocalVar, SemaOutput,
};
use crate::source::SourceLoc;
use crate::types::{CType, Field, TypeId};
use hashbrown::{HashMap, HashSet};
use log::debug;
use symbol_table::GlobalSymbol as Symbol;

/// A resolved storage location for loads and stores.
enum Place {
    Addr {
        addr: ValueId,
        ty: IrType,
    },
    /// A bit-field inside its storage unit; `addr` points at the unit.
    Bitfield {
        addr: ValueId,
        unit: IrType,
        width: u32,
        bit_offset: u32,
    },
}

struct SwitchFrame {
    case_blocks: Vec<BlockId>,
    cursor: usize,
    default: Option<BlockId>,
}

/// Generate an IR module from an analyzed translation unit.
pub fn generate(unit: &TranslationUnit, sema: SemaOutput) -> CResult<IrModule> {
    let mut gen = CodeGenerator {
        sema,
        module: IrModule::default(),
        builder: None,
        ret_ty: None,
        current_fn: 0,
        local_addrs: Vec::new(),
        breaks: Vec::new(),
        continues: Vec::new(),
        switches: Vec::new(),
        labels: HashMap::new(),
    };
    gen.emit_globals()?;
    for decl in &unit.decls {
        if let ExternalDecl::FunctionDef(def) = decl {
            gen.gen_function(def)?;
        }
    }
    gen.emit_externals();
    debug!(
        "generated module: {} functions, {} externals, {} globals, {} datas",
        gen.module.functions.len(),
        gen.module.externals.len(),
        gen.module.globals.len(),
        gen.module.datas.len()
    );
    Ok(gen.module)
}

struct CodeGenerator {
    sema: SemaOutput,
    module: IrModule,
    builder: Option<IrBuilder>,
    ret_ty: Option<IrType>,
    current_fn: usize,
    /// One stack slot address per local, parameters first.
    local_addrs: Vec<ValueId>,
    breaks: Vec<BlockId>,
    continues: Vec<BlockId>,
    switches: Vec<SwitchFrame>,
    labels: HashMap<Symbol, BlockId>,
}

impl CodeGenerator {
    fn b(&mut self) -> &mut IrBuilder {
        self.builder.as_mut().expect("active function")
    }

    // Module-level data.

    fn emit_globals(&mut self) -> CResult<()> {
        for idx in 0..self.sema.globals.len() {
            let ty = self.sema.globals[idx].ty;
            let loc = self.sema.globals[idx].loc;
            let layout = self.sema.registry.layout_of(ty).ok_or_else(|| {
                CompilerError::semantic(
                    format!("Global '{}' has incomplete type", self.sema.globals[idx].name),
                    loc,
                )
            })?;
            let mut image = vec![0u8; layout.size as usize];
            if self.sema.globals[idx].init.is_some() {
                let endianness = self.sema.registry.arch().endianness;
                let init = self.sema.globals[idx].init.as_ref().expect("checked");
                let (slots, _) = flatten_initializer(&mut self.sema.registry, ty, init, loc)?;
                for (offset, slot_ty, value) in slots {
                    let start = offset as usize;
                    match value {
                        InitValue::Bytes(bytes) => {
                            let end = (start + bytes.len()).min(image.len());
                            image[start..end].copy_from_slice(&bytes[..end - start]);
                        }
                        InitValue::Expr(expr) => {
                            let size =
                                self.sema.registry.size_of(slot_ty).unwrap_or(0) as usize;
                            let constant = const_eval(&self.sema.registry, expr)?;
                            let is_float = self.sema.registry.is_float(slot_ty);
                            encode_scalar(
                                &mut image[start..start + size],
                                constant,
                                is_float,
                                endianness,
                            );
                        }
                    }
                }
            }
            let name = self.sema.globals[idx].ir_name.clone();
            self.module.globals.push(IrGlobal {
                name,
                align: layout.align,
                init: image,
            });
        }
        Ok(())
    }

    fn emit_externals(&mut self) {
        for info in &self.sema.functions {
            if !info.defined {
                self.module.externals.push(IrExternal {
                    name: info.name.as_str().to_string(),
                    sig: ir_signature_of(&self.sema, info.ty),
                });
            }
        }
    }

    // Functions.

    fn gen_function(&mut self, def: &FunctionDef) -> CResult<()> {
        let loc = def.declarator.loc;
        let name = def
            .declarator
            .name
            .ok_or_else(|| CompilerError::syntax("Expected identifier", loc))?;
        let index = self
            .sema
            .functions
            .iter()
            .position(|f| f.name == name)
            .expect("function registered during analysis");
        self.current_fn = index;

        let sig = ir_signature_of(&self.sema, self.sema.functions[index].ty);
        let locals: Vec<LocalVar> = self.sema.functions[index].locals.clone();
        let num_params = self.sema.functions[index].num_params;
        self.ret_ty = sig.ret;
        self.builder = Some(IrBuilder::new(name.as_str().to_string(), sig.clone()));
        self.local_addrs.clear();
        self.labels.clear();
        self.breaks.clear();
        self.continues.clear();
        self.switches.clear();

        for local in &locals {
            let layout = self.sema.registry.layout_of(local.ty).ok_or_else(|| {
                CompilerError::semantic("Variable has incomplete type", loc)
            })?;
            let addr = self.b().alloc(layout.size, layout.align);
            self.local_addrs.push(addr);
        }
        let params: Vec<ValueId> = self.b().params().to_vec();
        for i in 0..num_params {
            let ty = sig.params[i];
            let addr = self.local_addrs[i];
            let value = params[i];
            self.b().store(ty, value, addr);
        }

        self.gen_stmt(&def.body)?;

        // A path that runs off the end returns zero (or nothing for void).
        let ret = self.ret_ty;
        for block in self.b().open_blocks() {
            self.b().switch_to(block);
            match ret {
                Some(ty) if ty.is_float() => {
                    let zero = self.b().fconst(ty, 0.0);
                    self.b().ret(Some(zero));
                }
                Some(ty) => {
                    let zero = self.b().iconst(ty, 0);
                    self.b().ret(Some(zero));
                }
                None => self.b().ret(None),
            }
        }

        let func = self.builder.take().expect("active function").finish();
        self.module.functions.push(func);
        Ok(())
    }

    // Statements.

    fn gen_stmt(&mut self, stmt: &Stmt) -> CResult<()> {
        match stmt {
            Stmt::Compound(items) => {
                for item in items {
                    match item {
                        BlockItem::Declaration(decl) => self.gen_local_decl(decl)?,
                        BlockItem::Stmt(stmt) => self.gen_stmt(stmt)?,
                    }
                }
                Ok(())
            }
            Stmt::If {
                cond,
                then_stmt,
                else_stmt,
            } => {
                let then_blk = self.b().new_block();
                let end = self.b().new_block();
                let else_blk = match else_stmt {
                    Some(_) => self.b().new_block(),
                    None => end,
                };
                self.gen_condition(cond, then_blk, else_blk)?;
                self.b().switch_to(then_blk);
                self.gen_stmt(then_stmt)?;
                self.b().jump(end);
                if let Some(else_stmt) = else_stmt {
                    self.b().switch_to(else_blk);
                    self.gen_stmt(else_stmt)?;
                    self.b().jump(end);
                }
                self.b().switch_to(end);
                Ok(())
            }
            Stmt::While { cond, body } => {
                let test = self.b().new_block();
                let body_blk = self.b().new_block();
                let end = self.b().new_block();
                self.b().jump(test);
                self.b().switch_to(test);
                self.gen_condition(cond, body_blk, end)?;
                self.breaks.push(end);
                self.continues.push(test);
                self.b().switch_to(body_blk);
                let result = self.gen_stmt(body);
                self.breaks.pop();
                self.continues.pop();
                result?;
                self.b().jump(test);
                self.b().switch_to(end);
                Ok(())
            }
            Stmt::DoWhile { body, cond } => {
                let body_blk = self.b().new_block();
                let test = self.b().new_block();
                let end = self.b().new_block();
                self.b().jump(body_blk);
                self.breaks.push(end);
                self.continues.push(test);
                self.b().switch_to(body_blk);
                let result = self.gen_stmt(body);
                self.breaks.pop();
                self.continues.pop();
                result?;
                self.b().jump(test);
                self.b().switch_to(test);
                self.gen_condition(cond, body_blk, end)?;
                self.b().switch_to(end);
                Ok(())
            }
            Stmt::For {
                init,
                cond,
                step,
                body,
            } => {
                match init {
                    Some(ForInit::Declaration(decl)) => self.gen_local_decl(decl)?,
                    Some(ForInit::Expr(expr)) => {
                        self.gen_expr_maybe(expr)?;
                    }
                    None => {}
                }
                let test = self.b().new_block();
                let body_blk = self.b().new_block();
                let step_blk = self.b().new_block();
                let end = self.b().new_block();
                self.b().jump(test);
                self.b().switch_to(test);
                match cond {
                    Some(cond) => self.gen_condition(cond, body_blk, end)?,
                    None => self.b().jump(body_blk),
                }
                self.breaks.push(end);
                self.continues.push(step_blk);
                self.b().switch_to(body_blk);
                let result = self.gen_stmt(body);
                self.breaks.pop();
                self.continues.pop();
                result?;
                self.b().jump(step_blk);
                self.b().switch_to(step_blk);
                if let Some(step) = step {
                    self.gen_expr_maybe(step)?;
                }
                self.b().jump(test);
                self.b().switch_to(end);
                Ok(())
            }
            Stmt::Switch { cond, body, loc } => self.gen_switch(cond, body, *loc),
            Stmt::Case { stmt, loc, .. } => {
                let frame = self.switches.last_mut().ok_or_else(|| {
                    CompilerError::semantic("Case statement outside a switch", *loc)
                })?;
                let block = frame.case_blocks[frame.cursor];
                frame.cursor += 1;
                // Fall through from the preceding statement.
                self.b().jump(block);
                self.b().switch_to(block);
                self.gen_stmt(stmt)
            }
            Stmt::Default { stmt, loc } => {
                let frame = self.switches.last().ok_or_else(|| {
                    CompilerError::semantic("Default statement outside a switch", *loc)
                })?;
                let block = frame.default.expect("default block collected");
                self.b().jump(block);
                self.b().switch_to(block);
                self.gen_stmt(stmt)
            }
            Stmt::Break(loc) => {
                let target = *self.breaks.last().ok_or_else(|| {
                    CompilerError::semantic("Break statement outside a loop or switch", *loc)
                })?;
                self.b().jump(target);
                Ok(())
            }
            Stmt::Continue(loc) => {
                let target = *self.continues.last().ok_or_else(|| {
                    CompilerError::semantic("Continue statement outside a loop", *loc)
                })?;
                self.b().jump(target);
                Ok(())
            }
            Stmt::Goto { label, .. } => {
                let target = self.label_block(*label);
                self.b().jump(target);
                Ok(())
            }
            Stmt::Labeled { label, stmt, .. } => {
                let block = self.label_block(*label);
                self.b().jump(block);
                self.b().switch_to(block);
                self.gen_stmt(stmt)
            }
            Stmt::Return { value, .. } => {
                match value {
                    Some(expr) => {
                        let v = self.gen_expr(expr)?;
                        let from = self.expr_ir(expr);
                        let to = self.ret_ty.unwrap_or(from);
                        let v = self.b().cast(from, to, v);
                        self.b().ret(Some(v));
                    }
                    None => match self.ret_ty {
                        Some(ty) => {
                            let zero = if ty.is_float() {
                                self.b().fconst(ty, 0.0)
                            } else {
                                self.b().iconst(ty, 0)
                            };
                            self.b().ret(Some(zero));
                        }
                        None => self.b().ret(None),
                    },
                }
                Ok(())
            }
            Stmt::Expr(expr) => {
                self.gen_expr_maybe(expr)?;
                Ok(())
            }
            Stmt::Empty => Ok(()),
        }
    }

    fn gen_switch(&mut self, cond: &Expr, body: &Stmt, loc: SourceLoc) -> CResult<()> {
        let cond_v = self.gen_expr(cond)?;
        let cond_ir = self.expr_ir(cond);
        let end = self.b().new_block();

        let mut cases = Vec::new();
        let mut default = None;
        self.collect_cases(body, &mut cases, &mut default)?;

        // Dispatch: compare against each label in source order.
        let mut seen = HashSet::new();
        for &(value, block) in &cases {
            if !seen.insert(value) {
                return Err(CompilerError::semantic("Duplicate case value", loc));
            }
            let label = self.b().iconst(cond_ir, value);
            let next = self.b().new_block();
            self.b().cond_jump(cond_v, CmpOp::Eq, label, block, next);
            self.b().switch_to(next);
        }
        self.b().jump(default.unwrap_or(end));

        self.switches.push(SwitchFrame {
            case_blocks: cases.iter().map(|c| c.1).collect(),
            cursor: 0,
            default,
        });
        self.breaks.push(end);
        let result = self.gen_stmt(body);
        self.breaks.pop();
        self.switches.pop();
        result?;
        self.b().jump(end);
        self.b().switch_to(end);
        Ok(())
    }

    /// Collect case and default labels in source order, creating their
    /// blocks. Nested switches keep their labels to themselves.
    fn collect_cases(
        &mut self,
        stmt: &Stmt,
        cases: &mut Vec<(i64, BlockId)>,
        default: &mut Option<BlockId>,
    ) -> CResult<()> {
        match stmt {
            Stmt::Case { value, stmt, .. } => {
                let folded = const_eval(&self.sema.registry, value)?.as_int();
                let block = self.b().new_block();
                cases.push((folded, block));
                self.collect_cases(stmt, cases, default)
            }
            Stmt::Default { stmt, loc } => {
                if default.is_some() {
                    return Err(CompilerError::semantic(
                        "Multiple default labels in one switch",
                        *loc,
                    ));
                }
                *default = Some(self.b().new_block());
                self.collect_cases(stmt, cases, default)
            }
            Stmt::Compound(items) => {
                for item in items {
                    if let BlockItem::Stmt(stmt) = item {
                        self.collect_cases(stmt, cases, default)?;
                    }
                }
                Ok(())
            }
            Stmt::If {
                then_stmt,
                else_stmt,
                ..
            } => {
                self.collect_cases(then_stmt, cases, default)?;
                if let Some(else_stmt) = else_stmt {
                    self.collect_cases(else_stmt, cases, default)?;
                }
                Ok(())
            }
            Stmt::While { body, .. }
            | Stmt::DoWhile { body, .. }
            | Stmt::For { body, .. } => self.collect_cases(body, cases, default),
            Stmt::Labeled { stmt, .. } => self.collect_cases(stmt, cases, default),
            Stmt::Switch { .. } => Ok(()),
            _ => Ok(()),
        }
    }

    fn label_block(&mut self, label: Symbol) -> BlockId {
        if let Some(&block) = self.labels.get(&label) {
            return block;
        }
        let block = self.b().new_block();
        self.labels.insert(label, block);
        block
    }

    // Local declarations.

    fn gen_local_decl(&mut self, decl: &Declaration) -> CResult<()> {
        for init_decl in &decl.declarators {
            // Statics were promoted to module globals; typedefs and tag
            // declarations bind nothing at runtime.
            if let Some(Resolved::Local(slot)) = init_decl.resolved {
                if let Some(init) = &init_decl.init {
                    let ty = self.sema.functions[self.current_fn].locals[slot as usize].ty;
                    self.gen_local_init(slot, ty, init, init_decl.declarator.loc)?;
                }
            }
        }
        Ok(())
    }

    fn gen_local_init(
        &mut self,
        slot: u32,
        ty: TypeId,
        init: &Initializer,
        loc: SourceLoc,
    ) -> CResult<()> {
        let base = self.local_addrs[slot as usize];
        let (slots, _) = flatten_initializer(&mut self.sema.registry, ty, init, loc)?;
        for (offset, slot_ty, value) in slots {
            match value {
                InitValue::Expr(expr) => {
                    let v = self.gen_expr(expr)?;
                    let from = self.expr_ir(expr);
                    let to = self.ir_type(slot_ty);
                    let v = self.b().cast(from, to, v);
                    let addr = self.addr_add(base, offset);
                    self.b().store(to, v, addr);
                }
                InitValue::Bytes(bytes) => {
                    let len = bytes.len() as u32;
                    let data = self.module.add_data(bytes);
                    let src = self.b().data_addr(data);
                    for i in 0..len {
                        let from = self.addr_add(src, i);
                        let byte = self.b().load(IrType::U8, from);
                        let to = self.addr_add(base, offset + i);
                        self.b().store(IrType::U8, byte, to);
                    }
                }
            }
        }
        Ok(())
    }

    // Conditions.

    fn gen_condition(&mut self, cond: &Expr, then_blk: BlockId, else_blk: BlockId) -> CResult<()> {
        match &cond.kind {
            ExprKind::Binary { op, lhs, rhs } => match cmp_op(*op) {
                Some(op) => {
                    let (l, r) = self.gen_cmp_operands(lhs, rhs)?;
                    self.b().cond_jump(l, op, r, then_blk, else_blk);
                    Ok(())
                }
                None => match op {
                    BinaryOp::LogicalAnd => {
                        let mid = self.b().new_block();
                        self.gen_condition(lhs, mid, else_blk)?;
                        self.b().switch_to(mid);
                        self.gen_condition(rhs, then_blk, else_blk)
                    }
                    BinaryOp::LogicalOr => {
                        let mid = self.b().new_block();
                        self.gen_condition(lhs, then_blk, mid)?;
                        self.b().switch_to(mid);
                        self.gen_condition(rhs, then_blk, else_blk)
                    }
                    _ => self.gen_condition_value(cond, then_blk, else_blk),
                },
            },
            ExprKind::Unary {
                op: UnaryOp::LogicalNot,
                operand,
            } => self.gen_condition(operand, else_blk, then_blk),
            _ => self.gen_condition_value(cond, then_blk, else_blk),
        }
    }

    fn gen_condition_value(
        &mut self,
        cond: &Expr,
        then_blk: BlockId,
        else_blk: BlockId,
    ) -> CResult<()> {
        let v = self.gen_expr(cond)?;
        let decayed = self.sema.registry.decay(cond.ty.expect("annotated"));
        let ty = self.ir_type(decayed);
        let zero = if ty.is_float() {
            self.b().fconst(ty, 0.0)
        } else {
            self.b().iconst(ty, 0)
        };
        self.b().cond_jump(v, CmpOp::Ne, zero, then_blk, else_blk);
        Ok(())
    }

    /// Evaluate both comparison operands in their common type.
    fn gen_cmp_operands(&mut self, lhs: &Expr, rhs: &Expr) -> CResult<(ValueId, ValueId)> {
        let lt = self.sema.registry.decay(lhs.ty.expect("annotated"));
        let rt = self.sema.registry.decay(rhs.ty.expect("annotated"));
        let common = if self.sema.registry.is_arithmetic(lt) && self.sema.registry.is_arithmetic(rt)
        {
            let ty = self.sema.registry.usual_arithmetic(lt, rt);
            self.ir_type(ty)
        } else {
            IrType::Ptr
        };
        let l = self.gen_expr(lhs)?;
        let l = {
            let from = self.expr_ir(lhs);
            self.b().cast(from, common, l)
        };
        let r = self.gen_expr(rhs)?;
        let r = {
            let from = self.expr_ir(rhs);
            self.b().cast(from, common, r)
        };
        Ok((l, r))
    }

    // Expressions.

    fn gen_expr(&mut self, expr: &Expr) -> CResult<ValueId> {
        self.gen_expr_maybe(expr)?.ok_or_else(|| {
            CompilerError::semantic("Void value where a value is required", expr.loc)
        })
    }

    /// Produce the expression's value; `None` for a void call.
    fn gen_expr_maybe(&mut self, expr: &Expr) -> CResult<Option<ValueId>> {
        let ty = expr.ty.expect("annotated");
        let value = match &expr.kind {
            ExprKind::IntLiteral { value, .. } => {
                let ir = self.ir_type(ty);
                self.b().iconst(ir, *value)
            }
            ExprKind::FloatLiteral(value) => {
                let ir = self.ir_type(ty);
                self.b().fconst(ir, *value)
            }
            ExprKind::CharLiteral(value) => {
                let ir = self.ir_type(ty);
                self.b().iconst(ir, *value as i64)
            }
            ExprKind::StringLiteral(text) => {
                let data = self.module.add_data(string_bytes(text.as_str()));
                self.b().data_addr(data)
            }
            ExprKind::Ident { resolved, .. } => match resolved {
                Some(Resolved::EnumConst(value)) => {
                    let ir = self.ir_type(ty);
                    self.b().iconst(ir, *value)
                }
                Some(Resolved::Function(index)) => {
                    let name = self.sema.functions[*index as usize].name.as_str().to_string();
                    self.b().func_addr(name)
                }
                _ => self.gen_load(expr)?,
            },
            ExprKind::Index { .. } | ExprKind::Member { .. } => self.gen_load(expr)?,
            ExprKind::Unary {
                op: UnaryOp::Deref, ..
            } => self.gen_load(expr)?,
            ExprKind::Unary { op, operand } => match op {
                UnaryOp::AddrOf => self.gen_addr(operand)?,
                UnaryOp::Plus => {
                    let v = self.gen_expr(operand)?;
                    let from = self.expr_ir(operand);
                    let to = self.ir_type(ty);
                    self.b().cast(from, to, v)
                }
                UnaryOp::Neg => {
                    let v = self.gen_expr(operand)?;
                    let from = self.expr_ir(operand);
                    let to = self.ir_type(ty);
                    let v = self.b().cast(from, to, v);
                    let zero = if to.is_float() {
                        self.b().fconst(to, 0.0)
                    } else {
                        self.b().iconst(to, 0)
                    };
                    self.b().binop(to, BinOp::Sub, zero, v)
                }
                UnaryOp::BitNot => {
                    let v = self.gen_expr(operand)?;
                    let from = self.expr_ir(operand);
                    let to = self.ir_type(ty);
                    let v = self.b().cast(from, to, v);
                    let ones = self.b().iconst(to, -1);
                    self.b().binop(to, BinOp::Xor, v, ones)
                }
                UnaryOp::LogicalNot => self.gen_bool_value(expr)?,
                UnaryOp::Deref => unreachable!("handled above"),
            },
            ExprKind::Binary { op, lhs, rhs } => match op {
                BinaryOp::Lt
                | BinaryOp::Gt
                | BinaryOp::Le
                | BinaryOp::Ge
                | BinaryOp::Eq
                | BinaryOp::Ne
                | BinaryOp::LogicalAnd
                | BinaryOp::LogicalOr => self.gen_bool_value(expr)?,
                BinaryOp::Comma => {
                    self.gen_expr_maybe(lhs)?;
                    return self.gen_expr_maybe(rhs);
                }
                _ => self.gen_arith(*op, lhs, rhs, ty)?,
            },
            ExprKind::Assign { op, lhs, rhs } => self.gen_assign(*op, lhs, rhs)?,
            ExprKind::PreIncDec { inc, operand } => self.gen_incdec(*inc, operand, true)?,
            ExprKind::PostIncDec { inc, operand } => self.gen_incdec(*inc, operand, false)?,
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                let result_ir = self.ir_type(ty);
                let layout = self.sema.registry.layout_of(ty).ok_or_else(|| {
                    CompilerError::semantic("Incomplete type", expr.loc)
                })?;
                let tmp = self.b().alloc(layout.size, layout.align);
                let then_blk = self.b().new_block();
                let else_blk = self.b().new_block();
                let end = self.b().new_block();
                self.gen_condition(cond, then_blk, else_blk)?;
                self.b().switch_to(then_blk);
                let v = self.gen_expr(then_expr)?;
                let from = self.expr_ir(then_expr);
                let v = self.b().cast(from, result_ir, v);
                self.b().store(result_ir, v, tmp);
                self.b().jump(end);
                self.b().switch_to(else_blk);
                let v = self.gen_expr(else_expr)?;
                let from = self.expr_ir(else_expr);
                let v = self.b().cast(from, result_ir, v);
                self.b().store(result_ir, v, tmp);
                self.b().jump(end);
                self.b().switch_to(end);
                self.b().load(result_ir, tmp)
            }
            ExprKind::Call { callee, args } => return self.gen_call(callee, args),
            ExprKind::Cast { operand, .. } => {
                let v = self.gen_expr(operand)?;
                let from = self.expr_ir(operand);
                let to = self.ir_type(ty);
                self.b().cast(from, to, v)
            }
            ExprKind::SizeofExpr(_) | ExprKind::SizeofType(_) => {
                unreachable!("folded during analysis")
            }
        };
        Ok(Some(value))
    }

    /// Load through the expression's place; arrays yield their address.
    fn gen_load(&mut self, expr: &Expr) -> CResult<ValueId> {
        let ty = expr.ty.expect("annotated");
        let place = self.gen_place(expr)?;
        let is_aggregate = self.sema.registry.element_of(ty).is_some()
            || self.sema.registry.is_function(ty)
            || self.sema.registry.is_record(ty);
        if is_aggregate {
            return match place {
                Place::Addr { addr, .. } => Ok(addr),
                Place::Bitfield { .. } => Err(CompilerError::semantic(
                    "Invalid bit-field access",
                    expr.loc,
                )),
            };
        }
        Ok(self.load_place(&place))
    }

    fn gen_arith(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr, ty: TypeId) -> CResult<ValueId> {
        let lt = self.sema.registry.decay(lhs.ty.expect("annotated"));
        let rt = self.sema.registry.decay(rhs.ty.expect("annotated"));
        let l_ptr = self.sema.registry.is_pointer(lt);
        let r_ptr = self.sema.registry.is_pointer(rt);

        if (op == BinaryOp::Add || op == BinaryOp::Sub) && (l_ptr || r_ptr) {
            if l_ptr && r_ptr {
                // Pointer difference in elements.
                let size = self.pointee_size(lt, lhs.loc)?;
                let l = self.gen_expr(lhs)?;
                let r = self.gen_expr(rhs)?;
                let diff = self.b().binop(IrType::Ptr, BinOp::Sub, l, r);
                let int_ir = self.ir_type(ty);
                let diff = self.b().cast(IrType::Ptr, int_ir, diff);
                let size = self.b().iconst(int_ir, size as i64);
                return Ok(self.b().binop(int_ir, BinOp::Div, diff, size));
            }
            let (ptr_e, int_e) = if l_ptr { (lhs, rhs) } else { (rhs, lhs) };
            let ptr_ty = if l_ptr { lt } else { rt };
            let size = self.pointee_size(ptr_ty, ptr_e.loc)?;
            let base = self.gen_expr(ptr_e)?;
            let index = self.gen_expr(int_e)?;
            let index = {
                let from = self.expr_ir(int_e);
                self.b().cast(from, IrType::Ptr, index)
            };
            let scale = self.b().iconst(IrType::Ptr, size as i64);
            let scaled = self.b().binop(IrType::Ptr, BinOp::Mul, index, scale);
            let bin = if op == BinaryOp::Add {
                BinOp::Add
            } else {
                BinOp::Sub
            };
            return Ok(self.b().binop(IrType::Ptr, bin, base, scaled));
        }

        let common = self.ir_type(ty);
        let l = self.gen_expr(lhs)?;
        let l = {
            let from = self.expr_ir(lhs);
            self.b().cast(from, common, l)
        };
        let r = self.gen_expr(rhs)?;
        let r = {
            let from = self.expr_ir(rhs);
            self.b().cast(from, common, r)
        };
        let bin = match op {
            BinaryOp::Add => BinOp::Add,
            BinaryOp::Sub => BinOp::Sub,
            BinaryOp::Mul => BinOp::Mul,
            BinaryOp::Div => BinOp::Div,
            BinaryOp::Rem => BinOp::Rem,
            BinaryOp::Shl => BinOp::Shl,
            BinaryOp::Shr => BinOp::Shr,
            BinaryOp::BitAnd => BinOp::And,
            BinaryOp::BitOr => BinOp::Or,
            BinaryOp::BitXor => BinOp::Xor,
            _ => unreachable!("comparison handled elsewhere"),
        };
        Ok(self.b().binop(common, bin, l, r))
    }

    fn gen_assign(&mut self, op: AssignOp, lhs: &Expr, rhs: &Expr) -> CResult<ValueId> {
        let lt = lhs.ty.expect("annotated");
        let place = self.gen_place(lhs)?;
        let slot_ir = match &place {
            Place::Addr { ty, .. } => *ty,
            Place::Bitfield { unit, .. } => *unit,
        };

        if op == AssignOp::Assign {
            let v = self.gen_expr(rhs)?;
            let from = self.expr_ir(rhs);
            let v = self.b().cast(from, slot_ir, v);
            self.store_place(&place, v);
            return Ok(v);
        }

        let current = self.load_place(&place);
        let result = if self.sema.registry.is_pointer(lt)
            && matches!(op, AssignOp::Add | AssignOp::Sub)
        {
            let size = self.pointee_size(lt, lhs.loc)?;
            let index = self.gen_expr(rhs)?;
            let index = {
                let from = self.expr_ir(rhs);
                self.b().cast(from, IrType::Ptr, index)
            };
            let scale = self.b().iconst(IrType::Ptr, size as i64);
            let scaled = self.b().binop(IrType::Ptr, BinOp::Mul, index, scale);
            let bin = if op == AssignOp::Add {
                BinOp::Add
            } else {
                BinOp::Sub
            };
            self.b().binop(IrType::Ptr, bin, current, scaled)
        } else {
            let rt = self.sema.registry.decay(rhs.ty.expect("annotated"));
            let lt_d = self.sema.registry.decay(lt);
            let common_ty = self.sema.registry.usual_arithmetic(lt_d, rt);
            let common = self.ir_type(common_ty);
            let l = self.b().cast(slot_ir, common, current);
            let r = self.gen_expr(rhs)?;
            let r = {
                let from = self.expr_ir(rhs);
                self.b().cast(from, common, r)
            };
            let bin = match op {
                AssignOp::Add => BinOp::Add,
                AssignOp::Sub => BinOp::Sub,
                AssignOp::Mul => BinOp::Mul,
                AssignOp::Div => BinOp::Div,
                AssignOp::Rem => BinOp::Rem,
                AssignOp::Shl => BinOp::Shl,
                AssignOp::Shr => BinOp::Shr,
                AssignOp::BitAnd => BinOp::And,
                AssignOp::BitOr => BinOp::Or,
                AssignOp::BitXor => BinOp::Xor,
                AssignOp::Assign => unreachable!("handled above"),
            };
            let v = self.b().binop(common, bin, l, r);
            self.b().cast(common, slot_ir, v)
        };
        self.store_place(&place, result);
        Ok(result)
    }

    fn gen_incdec(&mut self, inc: bool, operand: &Expr, pre: bool) -> CResult<ValueId> {
        let ty = operand.ty.expect("annotated");
        let place = self.gen_place(operand)?;
        let slot_ir = match &place {
            Place::Addr { ty, .. } => *ty,
            Place::Bitfield { unit, .. } => *unit,
        };
        let old = self.load_place(&place);
        let delta = if self.sema.registry.is_pointer(ty) {
            let size = self.pointee_size(ty, operand.loc)?;
            self.b().iconst(IrType::Ptr, size as i64)
        } else if slot_ir.is_float() {
            self.b().fconst(slot_ir, 1.0)
        } else {
            self.b().iconst(slot_ir, 1)
        };
        let bin = if inc { BinOp::Add } else { BinOp::Sub };
        let new = self.b().binop(slot_ir, bin, old, delta);
        self.store_place(&place, new);
        Ok(if pre { new } else { old })
    }

    fn gen_call(&mut self, callee: &Expr, args: &[Expr]) -> CResult<Option<ValueId>> {
        let target = match &callee.kind {
            ExprKind::Ident {
                resolved: Some(Resolved::Function(index)),
                ..
            } => Callee::Direct(self.sema.functions[*index as usize].name.as_str().to_string()),
            _ => Callee::Indirect(self.gen_expr(callee)?),
        };

        let callee_ty = callee.ty.expect("annotated");
        let fn_ty = {
            let unq = self.sema.registry.unqualified(callee_ty);
            if self.sema.registry.is_function(unq) {
                unq
            } else {
                let target = self
                    .sema
                    .registry
                    .pointee(unq)
                    .expect("callable checked during analysis");
                self.sema.registry.unqualified(target)
            }
        };
        let (ret, params) = match self.sema.registry.kind(fn_ty) {
            CType::Function { ret, params, .. } => (*ret, params.to_vec()),
            _ => unreachable!("callable checked during analysis"),
        };

        let mut lowered = Vec::with_capacity(args.len());
        for (i, arg) in args.iter().enumerate() {
            let v = self.gen_expr(arg)?;
            let from = self.expr_ir(arg);
            let to = match params.get(i) {
                Some(&pt) => self.ir_type(pt),
                // Default argument promotions for variadic tails.
                None => match from {
                    IrType::F32 => IrType::F64,
                    IrType::I8 | IrType::I16 => IrType::I32,
                    IrType::U8 | IrType::U16 => IrType::U32,
                    other => other,
                },
            };
            let v = self.b().cast(from, to, v);
            lowered.push((to, v));
        }

        let ret_ir = if self.sema.registry.is_void(ret) {
            None
        } else {
            Some(self.ir_type(ret))
        };
        Ok(self.b().call(ret_ir, target, lowered))
    }

    /// Materialize a truth value: branch, then load 1 or 0 from a slot.
    fn gen_bool_value(&mut self, expr: &Expr) -> CResult<ValueId> {
        let ir = self.ir_type(expr.ty.expect("annotated"));
        let layout = self.sema.registry.arch().int_layout;
        let tmp = self.b().alloc(layout.size, layout.align);
        let then_blk = self.b().new_block();
        let else_blk = self.b().new_block();
        let end = self.b().new_block();
        self.gen_condition(expr, then_blk, else_blk)?;
        self.b().switch_to(then_blk);
        let one = self.b().iconst(ir, 1);
        self.b().store(ir, one, tmp);
        self.b().jump(end);
        self.b().switch_to(else_blk);
        let zero = self.b().iconst(ir, 0);
        self.b().store(ir, zero, tmp);
        self.b().jump(end);
        self.b().switch_to(end);
        Ok(self.b().load(ir, tmp))
    }

    // Places.

    fn gen_place(&mut self, expr: &Expr) -> CResult<Place> {
        match &expr.kind {
            ExprKind::Ident { resolved, .. } => match resolved {
                Some(Resolved::Local(slot)) => Ok(Place::Addr {
                    addr: self.local_addrs[*slot as usize],
                    ty: self.ir_type(expr.ty.expect("annotated")),
                }),
                Some(Resolved::Global(index)) => {
                    let name = self.sema.globals[*index as usize].ir_name.clone();
                    let addr = self.b().global_addr(name);
                    Ok(Place::Addr {
                        addr,
                        ty: self.ir_type(expr.ty.expect("annotated")),
                    })
                }
                Some(Resolved::Function(index)) => {
                    let name = self.sema.functions[*index as usize].name.as_str().to_string();
                    let addr = self.b().func_addr(name);
                    Ok(Place::Addr {
                        addr,
                        ty: IrType::Ptr,
                    })
                }
                _ => Err(CompilerError::semantic("Lvalue required", expr.loc)),
            },
            ExprKind::Unary {
                op: UnaryOp::Deref,
                operand,
            } => {
                let addr = self.gen_expr(operand)?;
                Ok(Place::Addr {
                    addr,
                    ty: self.ir_type(expr.ty.expect("annotated")),
                })
            }
            ExprKind::Index { base, index } => {
                let elem_ty = expr.ty.expect("annotated");
                let size = self
                    .sema
                    .registry
                    .size_of(elem_ty)
                    .ok_or_else(|| CompilerError::semantic("Incomplete type", expr.loc))?;
                let base_v = self.gen_expr(base)?;
                let idx = self.gen_expr(index)?;
                let idx = {
                    let from = self.expr_ir(index);
                    self.b().cast(from, IrType::Ptr, idx)
                };
                let scale = self.b().iconst(IrType::Ptr, size as i64);
                let scaled = self.b().binop(IrType::Ptr, BinOp::Mul, idx, scale);
                let addr = self.b().binop(IrType::Ptr, BinOp::Add, base_v, scaled);
                Ok(Place::Addr {
                    addr,
                    ty: self.ir_type(elem_ty),
                })
            }
            ExprKind::Member { base, field, arrow } => {
                let member = self.member_field(base, *field, *arrow)?;
                let base_addr = if *arrow {
                    self.gen_expr(base)?
                } else {
                    self.gen_addr(base)?
                };
                let addr = self.addr_add(base_addr, member.offset);
                match member.bits {
                    Some(bits) => Ok(Place::Bitfield {
                        addr,
                        unit: self.ir_type(member.ty),
                        width: bits.width,
                        bit_offset: bits.bit_offset,
                    }),
                    None => Ok(Place::Addr {
                        addr,
                        ty: self.ir_type(member.ty),
                    }),
                }
            }
            ExprKind::StringLiteral(text) => {
                let data = self.module.add_data(string_bytes(text.as_str()));
                let addr = self.b().data_addr(data);
                Ok(Place::Addr {
                    addr,
                    ty: IrType::U8,
                })
            }
            _ => Err(CompilerError::semantic("Lvalue required", expr.loc)),
        }
    }

    fn gen_addr(&mut self, expr: &Expr) -> CResult<ValueId> {
        match self.gen_place(expr)? {
            Place::Addr { addr, .. } => Ok(addr),
            Place::Bitfield { .. } => Err(CompilerError::semantic(
                "Cannot take the address of a bit-field",
                expr.loc,
            )),
        }
    }

    fn load_place(&mut self, place: &Place) -> ValueId {
        match *place {
            Place::Addr { addr, ty } => self.b().load(ty, addr),
            Place::Bitfield {
                addr,
                unit,
                width,
                bit_offset,
            } => {
                let raw = self.b().load(unit, addr);
                let bits = ir_bits(unit);
                if unit.is_signed() {
                    // Shift left then arithmetic right to sign-extend.
                    let up = self.b().iconst(unit, (bits - bit_offset - width) as i64);
                    let shifted = self.b().binop(unit, BinOp::Shl, raw, up);
                    let down = self.b().iconst(unit, (bits - width) as i64);
                    self.b().binop(unit, BinOp::Shr, shifted, down)
                } else {
                    let down = self.b().iconst(unit, bit_offset as i64);
                    let shifted = self.b().binop(unit, BinOp::Shr, raw, down);
                    let mask = self.b().iconst(unit, bit_mask(width));
                    self.b().binop(unit, BinOp::And, shifted, mask)
                }
            }
        }
    }

    fn store_place(&mut self, place: &Place, value: ValueId) {
        match *place {
            Place::Addr { addr, ty } => self.b().store(ty, value, addr),
            Place::Bitfield {
                addr,
                unit,
                width,
                bit_offset,
            } => {
                let raw = self.b().load(unit, addr);
                let keep_mask = self.b().iconst(unit, !(bit_mask(width) << bit_offset));
                let kept = self.b().binop(unit, BinOp::And, raw, keep_mask);
                let mask = self.b().iconst(unit, bit_mask(width));
                let trimmed = self.b().binop(unit, BinOp::And, value, mask);
                let up = self.b().iconst(unit, bit_offset as i64);
                let shifted = self.b().binop(unit, BinOp::Shl, trimmed, up);
                let merged = self.b().binop(unit, BinOp::Or, kept, shifted);
                self.b().store(unit, merged, addr);
            }
        }
    }

    // Small helpers.

    fn addr_add(&mut self, base: ValueId, offset: u32) -> ValueId {
        if offset == 0 {
            return base;
        }
        let off = self.b().iconst(IrType::Ptr, offset as i64);
        self.b().binop(IrType::Ptr, BinOp::Add, base, off)
    }

    fn pointee_size(&self, ptr_ty: TypeId, loc: SourceLoc) -> CResult<u32> {
        let target = self
            .sema
            .registry
            .pointee(self.sema.registry.unqualified(ptr_ty))
            .ok_or_else(|| CompilerError::semantic("Expected a pointer type", loc))?;
        self.sema
            .registry
            .size_of(target)
            .ok_or_else(|| CompilerError::semantic("Incomplete type", loc))
    }

    fn member_field(&self, base: &Expr, field: Symbol, arrow: bool) -> CResult<Field> {
        let base_ty = base.ty.expect("annotated");
        let registry = &self.sema.registry;
        let rec_ty = if arrow {
            let unq = registry.unqualified(base_ty);
            registry
                .pointee(unq)
                .or_else(|| registry.element_of(unq))
                .ok_or_else(|| {
                    CompilerError::semantic("Arrow access on non-pointer type", base.loc)
                })?
        } else {
            base_ty
        };
        let unq = registry.unqualified(rec_ty);
        match registry.kind(unq) {
            CType::Record { id, .. } => registry
                .record(*id)
                .field(field)
                .cloned()
                .ok_or_else(|| {
                    CompilerError::semantic(format!("Unknown field '{}'", field), base.loc)
                }),
            _ => Err(CompilerError::semantic(
                "Member access on non-struct type",
                base.loc,
            )),
        }
    }

    fn expr_ir(&self, expr: &Expr) -> IrType {
        self.ir_type(expr.ty.expect("annotated"))
    }

    fn ir_type(&self, ty: TypeId) -> IrType {
        ir_type_of(&self.sema, ty)
    }
}

fn ir_type_of(sema: &SemaOutput, ty: TypeId) -> IrType {
    let registry = &sema.registry;
    match *registry.kind(registry.unqualified(ty)) {
        CType::Basic(kind) => {
            let layout = kind.layout(registry.arch());
            match kind {
                crate::types::BasicKind::Float => IrType::F32,
                crate::types::BasicKind::Double => IrType::F64,
                _ => int_ir(layout.size, kind.is_signed()),
            }
        }
        CType::Enum(_) => int_ir(registry.arch().int_layout.size, true),
        CType::Pointer(_) | CType::Array { .. } | CType::Function { .. } => IrType::Ptr,
        // Aggregates and void are handled through addresses.
        _ => IrType::Ptr,
    }
}

fn ir_signature_of(sema: &SemaOutput, ty: TypeId) -> IrSignature {
    let registry = &sema.registry;
    match registry.kind(registry.unqualified(ty)) {
        CType::Function {
            ret,
            params,
            variadic,
            ..
        } => IrSignature {
            params: params.iter().map(|&p| ir_type_of(sema, p)).collect(),
            ret: if registry.is_void(*ret) {
                None
            } else {
                Some(ir_type_of(sema, *ret))
            },
            variadic: *variadic,
        },
        _ => IrSignature {
            params: Vec::new(),
            ret: None,
            variadic: false,
        },
    }
}

fn int_ir(size: u32, signed: bool) -> IrType {
    match (size, signed) {
        (1, true) => IrType::I8,
        (1, false) => IrType::U8,
        (2, true) => IrType::I16,
        (2, false) => IrType::U16,
        (8, true) => IrType::I64,
        (8, false) => IrType::U64,
        (_, true) => IrType::I32,
        (_, false) => IrType::U32,
    }
}

fn ir_bits(ty: IrType) -> u32 {
    match ty {
        IrType::I8 | IrType::U8 => 8,
        IrType::I16 | IrType::U16 => 16,
        IrType::I64 | IrType::U64 => 64,
        _ => 32,
    }
}

fn bit_mask(width: u32) -> i64 {
    if width >= 64 {
        -1
    } else {
        ((1u64 << width) - 1) as i64
    }
}

fn cmp_op(op: BinaryOp) -> Option<CmpOp> {
    match op {
        BinaryOp::Lt => Some(CmpOp::Lt),
        BinaryOp::Gt => Some(CmpOp::Gt),
        BinaryOp::Le => Some(CmpOp::Le),
        BinaryOp::Ge => Some(CmpOp::Ge),
        BinaryOp::Eq => Some(CmpOp::Eq),
        BinaryOp::Ne => Some(CmpOp::Ne),
        _ => None,
    }
}

/// Encode one constant scalar into `out` in the target byte order.
fn encode_scalar(out: &mut [u8], value: ConstValue, is_float: bool, endianness: Endianness) {
    let size = out.len();
    if is_float {
        let v = match value {
            ConstValue::Int(v) => v as f64,
            ConstValue::Float(v) => v,
        };
        match (size, endianness) {
            (4, Endianness::Little) => out.copy_from_slice(&(v as f32).to_bits().to_le_bytes()),
            (4, Endianness::Big) => out.copy_from_slice(&(v as f32).to_bits().to_be_bytes()),
            (8, Endianness::Little) => out.copy_from_slice(&v.to_bits().to_le_bytes()),
            (8, Endianness::Big) => out.copy_from_slice(&v.to_bits().to_be_bytes()),
            _ => {}
        }
        return;
    }
    let v = value.as_int() as u64;
    match endianness {
        Endianness::Little => out.copy_from_slice(&v.to_le_bytes()[..size]),
        Endianness::Big => out.copy_from_slice(&v.to_be_bytes()[8 - size..]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::ArchInfo;
    use crate::lexer::Lexer;
    use crate::options::COptions;
    use crate::parser::Parser;
    use crate::sema::analyze;
    use crate::verifier::Verifier;

    fn build(src: &str) -> CResult<IrModule> {
        let tokens = Lexer::new(src, &COptions::default()).tokenize()?;
        let mut unit = Parser::new(tokens).parse_translation_unit()?;
        let sema = analyze(&mut unit, ArchInfo::example())?;
        generate(&unit, sema)
    }

    fn build_verified(src: &str) -> IrModule {
        let module = build(src).unwrap();
        Verifier::verify(&module).unwrap();
        module
    }

    #[test]
    fn simple_function_verifies() {
        let module = build_verified("int add(int a, int b) { return a + b; }");
        assert_eq!(module.functions.len(), 1);
        assert_eq!(module.functions[0].sig.params.len(), 2);
    }

    #[test]
    fn undefined_function_becomes_external() {
        let module = build_verified(
            "void printf(char*, ...);\nvoid main() { printf(\"hi %i\\n\", 3); }\n",
        );
        assert_eq!(module.externals.len(), 1);
        assert_eq!(module.externals[0].name, "printf");
        assert!(module.externals[0].sig.variadic);
        assert_eq!(module.datas[0], b"hi %i\n\0".to_vec());
    }

    #[test]
    fn global_int_is_encoded_little_endian() {
        let module = build_verified("int x = 0x11223344;");
        assert_eq!(module.globals[0].init, vec![0x44, 0x33, 0x22, 0x11]);
    }

    #[test]
    fn global_pointer_from_cast_constant() {
        let module = build_verified("int* ptr = (int*)0x1000;");
        assert_eq!(module.globals[0].init, vec![0x00, 0x10, 0x00, 0x00]);
    }

    #[test]
    fn static_local_is_module_data() {
        let module = build_verified(
            "void putc(char);\nvoid main() { static unsigned char msg[] = \"Aa\"; putc(msg[0]); }\n",
        );
        let msg = module.globals.iter().find(|g| g.name == "main.msg").unwrap();
        assert_eq!(msg.init, b"Aa\0".to_vec());
    }

    #[test]
    fn control_flow_verifies() {
        build_verified(
            "int main() {\n  int i, sum;\n  sum = 0;\n  for (i = 0; i < 10; i++) {\n    if (i == 3) continue;\n    if (i == 8) break;\n    sum += i;\n  }\n  while (sum > 100) sum -= 3;\n  do { sum++; } while (sum < 5);\n  return sum;\n}\n",
        );
    }

    #[test]
    fn switch_with_fallthrough_verifies() {
        build_verified(
            "int classify(int v) {\n  int r;\n  r = 0;\n  switch (v) {\n    case 0: r = 1;\n    case 1: r += 2; break;\n    case 2: r = 9; break;\n    default: r = -1;\n  }\n  return r;\n}\n",
        );
    }

    #[test]
    fn goto_forward_and_back_verifies() {
        build_verified(
            "void main() {\n  int a;\n  a = 0;\nagain:\n  a++;\n  if (a < 3) goto again;\n  goto done;\n  a = 99;\ndone:\n  ;\n}\n",
        );
    }

    #[test]
    fn break_outside_loop_is_rejected() {
        let err = build("void main() { break; }").unwrap_err();
        assert!(err.message.contains("Break statement outside"));
    }

    #[test]
    fn continue_outside_loop_is_rejected() {
        let err = build("void main() { continue; }").unwrap_err();
        assert!(err.message.contains("Continue statement outside"));
    }

    #[test]
    fn bitfield_store_masks_the_unit() {
        let module = build_verified(
            "struct S { int b:2, c:9; };\nstruct S s;\nvoid main() { s.c = 5; }\n",
        );
        let main = module.functions.iter().find(|f| f.name == "main").unwrap();
        let has_or = main.blocks.iter().any(|blk| {
            blk.insts
                .iter()
                .any(|i| matches!(i, crate::ir::Inst::Binop { op: BinOp::Or, .. }))
        });
        assert!(has_or);
    }

    #[test]
    fn short_circuit_avoids_bool_materialization_in_branch() {
        let module = build_verified(
            "int f(int a, int b) { if (a < 3 && b != 0) { return 1; } return 0; }\n",
        );
        // Branching is done purely with conditional jumps.
        let f = &module.functions[0];
        assert!(f.blocks.len() >= 4);
    }
}
