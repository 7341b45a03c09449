//! Semantic analysis.
//!
//! Walks the parsed tree once, resolving names against scopes, building
//! types in the registry and annotating every expression in place with its
//! type and lvalue-ness. Constant expressions (array extents, bit widths,
//! enum values, case labels, `sizeof`) are folded here, so code generation
//! never needs scopes or constant evaluation of its own.

use crate::arch::ArchInfo;
use crate::ast::{
    AssignOp, BasicSpec, BinaryOp, BlockItem, DeclSpecifiers, Declaration, Declarator,
    DeclaratorPart, Expr, ExprKind, ExternalDecl, ForInit, FunctionDef, Initializer, ParamDecl,
    RecordKeyword, Resolved, Stmt, StorageClass, TranslationUnit, TypeName, TypeSpec, UnaryOp,
};
use crate::error::{CResult, CompilerError};
use crate::escape::encode_char;
use crate::lexer::{IntSuffix, Longness};
use crate::scope::{OrdinaryEntry, Scopes, TagEntry};
use crate::source::SourceLoc;
use crate::types::{BasicKind, CType, PendingField, TypeId, TypeRegistry};
use hashbrown::HashSet;
use log::debug;
use symbol_table::GlobalSymbol as Symbol;
use thin_vec::ThinVec;

/// A folded constant expression value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstValue {
    Int(i64),
    Float(f64),
}

impl ConstValue {
    pub fn as_int(&self) -> i64 {
        match self {
            ConstValue::Int(v) => *v,
            ConstValue::Float(v) => *v as i64,
        }
    }
}

/// A module-level variable, including promoted static locals.
#[derive(Debug)]
pub struct GlobalVar {
    pub name: Symbol,
    /// Symbol name in the produced module; static locals get a
    /// function-qualified name here.
    pub ir_name: String,
    pub ty: TypeId,
    pub init: Option<Initializer>,
    pub loc: SourceLoc,
}

#[derive(Debug, Clone)]
pub struct LocalVar {
    pub name: Option<Symbol>,
    pub ty: TypeId,
}

#[derive(Debug)]
pub struct FunctionInfo {
    pub name: Symbol,
    pub ty: TypeId,
    pub defined: bool,
    /// Slot table for defined functions; parameters occupy the first slots.
    pub locals: Vec<LocalVar>,
    pub num_params: usize,
}

/// Everything code generation needs besides the annotated tree.
#[derive(Debug)]
pub struct SemaOutput {
    pub registry: TypeRegistry,
    pub globals: Vec<GlobalVar>,
    pub functions: Vec<FunctionInfo>,
}

struct FuncCtx {
    name: String,
    ret_ty: TypeId,
    locals: Vec<LocalVar>,
    labels: HashSet<Symbol>,
    gotos: Vec<(Symbol, SourceLoc)>,
}

/// Analyze one translation unit, annotating it in place.
pub fn analyze(unit: &mut TranslationUnit, arch: ArchInfo) -> CResult<SemaOutput> {
    let mut analyzer = Analyzer {
        registry: TypeRegistry::new(arch),
        scopes: Scopes::new(),
        globals: Vec::new(),
        functions: Vec::new(),
        current: None,
    };
    for decl in &mut unit.decls {
        match decl {
            ExternalDecl::FunctionDef(def) => analyzer.check_function_def(def)?,
            ExternalDecl::Declaration(decl) => analyzer.check_global_decl(decl)?,
        }
    }
    debug!(
        "analyzed unit: {} globals, {} functions",
        analyzer.globals.len(),
        analyzer.functions.len()
    );
    Ok(SemaOutput {
        registry: analyzer.registry,
        globals: analyzer.globals,
        functions: analyzer.functions,
    })
}

struct Analyzer {
    registry: TypeRegistry,
    scopes: Scopes,
    globals: Vec<GlobalVar>,
    functions: Vec<FunctionInfo>,
    current: Option<FuncCtx>,
}

impl Analyzer {
    // Declarations.

    fn check_global_decl(&mut self, decl: &mut Declaration) -> CResult<()> {
        let storage = decl.specifiers.storage;
        let base = self.resolve_specifiers(&mut decl.specifiers)?;
        for init_decl in decl.declarators.iter_mut() {
            let mut ty = self.resolve_declarator(base, &mut init_decl.declarator)?;
            let Some(name) = init_decl.declarator.name else {
                continue;
            };
            let loc = init_decl.declarator.loc;

            if storage == Some(StorageClass::Typedef) {
                self.scopes.define(name, OrdinaryEntry::Typedef(ty));
                continue;
            }
            if self.registry.is_function(ty) {
                self.declare_function(name, ty, false, loc)?;
                continue;
            }

            if let Some(init) = &mut init_decl.init {
                self.check_initializer(&mut ty, init, loc)?;
            }
            let has_init = init_decl.init.is_some();

            match self.scopes.lookup_current(name) {
                Some(OrdinaryEntry::Global { ty: prior, index }) => {
                    if !self.registry.compatible(prior, ty) {
                        return Err(CompilerError::semantic(
                            format!("Redefinition of '{}' with a different type", name),
                            loc,
                        ));
                    }
                    let slot = index as usize;
                    if has_init {
                        if self.globals[slot].init.is_some() {
                            return Err(CompilerError::semantic(
                                format!("Redefinition of '{}'", name),
                                loc,
                            ));
                        }
                        self.globals[slot].init = init_decl.init.take();
                        self.globals[slot].ty = ty;
                        self.scopes.define(name, OrdinaryEntry::Global { ty, index });
                    }
                    init_decl.resolved = Some(Resolved::Global(index));
                }
                Some(_) => {
                    return Err(CompilerError::semantic(
                        format!("Redefinition of '{}'", name),
                        loc,
                    ));
                }
                None => {
                    let index = self.globals.len() as u32;
                    self.globals.push(GlobalVar {
                        name,
                        ir_name: name.as_str().to_string(),
                        ty,
                        init: init_decl.init.take(),
                        loc,
                    });
                    self.scopes.define(name, OrdinaryEntry::Global { ty, index });
                    init_decl.resolved = Some(Resolved::Global(index));
                }
            }
        }
        Ok(())
    }

    fn declare_function(
        &mut self,
        name: Symbol,
        ty: TypeId,
        defining: bool,
        loc: SourceLoc,
    ) -> CResult<usize> {
        match self.scopes.lookup_current(name) {
            Some(OrdinaryEntry::Function { ty: prior, index }) => {
                if !self.registry.compatible(prior, ty) {
                    return Err(CompilerError::semantic(
                        format!("Redefinition of '{}' with a different type", name),
                        loc,
                    ));
                }
                let at = index as usize;
                if defining {
                    if self.functions[at].defined {
                        return Err(CompilerError::semantic(
                            format!("Redefinition of '{}'", name),
                            loc,
                        ));
                    }
                    self.functions[at].ty = ty;
                    self.functions[at].defined = true;
                    self.scopes.define(name, OrdinaryEntry::Function { ty, index });
                }
                Ok(at)
            }
            Some(_) => Err(CompilerError::semantic(
                format!("Redefinition of '{}'", name),
                loc,
            )),
            None => {
                let index = self.functions.len();
                self.functions.push(FunctionInfo {
                    name,
                    ty,
                    defined: defining,
                    locals: Vec::new(),
                    num_params: 0,
                });
                self.scopes.define(
                    name,
                    OrdinaryEntry::Function {
                        ty,
                        index: index as u32,
                    },
                );
                Ok(index)
            }
        }
    }

    fn check_function_def(&mut self, def: &mut FunctionDef) -> CResult<()> {
        let base = self.resolve_specifiers(&mut def.specifiers)?;
        let ty = self.resolve_declarator(base, &mut def.declarator)?;
        let loc = def.declarator.loc;
        let name = def
            .declarator
            .name
            .ok_or_else(|| CompilerError::syntax("Expected identifier", loc))?;
        if !self.registry.is_function(ty) {
            return Err(CompilerError::semantic("Expected a function declarator", loc));
        }
        let index = self.declare_function(name, ty, true, loc)?;

        let ret_ty = match self.registry.kind(self.registry.unqualified(ty)) {
            CType::Function { ret, .. } => *ret,
            _ => unreachable!(),
        };
        let params: Vec<(Option<Symbol>, TypeId)> = match def.declarator.parts.first() {
            Some(DeclaratorPart::Function { params, .. }) => params
                .iter()
                .map(|p| (p.declarator.name, p.ty.expect("parameter type resolved")))
                .collect(),
            _ => Vec::new(),
        };

        self.scopes.push();
        let mut ctx = FuncCtx {
            name: name.as_str().to_string(),
            ret_ty,
            locals: Vec::new(),
            labels: HashSet::new(),
            gotos: Vec::new(),
        };
        for (pname, pty) in &params {
            let slot = ctx.locals.len() as u32;
            ctx.locals.push(LocalVar {
                name: *pname,
                ty: *pty,
            });
            if let Some(pname) = pname {
                self.scopes
                    .define(*pname, OrdinaryEntry::Local { ty: *pty, slot });
            }
        }
        self.current = Some(ctx);

        let result = self.check_stmt(&mut def.body);
        self.scopes.pop();
        let ctx = self.current.take().expect("function context");
        result?;

        for (label, loc) in &ctx.gotos {
            if !ctx.labels.contains(label) {
                return Err(CompilerError::semantic(
                    format!("Undefined label '{}'", label),
                    *loc,
                ));
            }
        }

        self.functions[index].locals = ctx.locals;
        self.functions[index].num_params = params.len();
        Ok(())
    }

    fn check_local_decl(&mut self, decl: &mut Declaration) -> CResult<()> {
        let storage = decl.specifiers.storage;
        let base = self.resolve_specifiers(&mut decl.specifiers)?;
        for init_decl in decl.declarators.iter_mut() {
            let mut ty = self.resolve_declarator(base, &mut init_decl.declarator)?;
            let Some(name) = init_decl.declarator.name else {
                continue;
            };
            let loc = init_decl.declarator.loc;

            match storage {
                Some(StorageClass::Typedef) => {
                    self.scopes.define(name, OrdinaryEntry::Typedef(ty));
                }
                Some(StorageClass::Static) => {
                    if let Some(init) = &mut init_decl.init {
                        self.check_initializer(&mut ty, init, loc)?;
                    }
                    let func = self
                        .current
                        .as_ref()
                        .map(|c| c.name.clone())
                        .unwrap_or_default();
                    let ir_name = format!("{}.{}", func, name);
                    let ir_name = if self.globals.iter().any(|g| g.ir_name == ir_name) {
                        format!("{}.{}", ir_name, self.globals.len())
                    } else {
                        ir_name
                    };
                    let index = self.globals.len() as u32;
                    self.globals.push(GlobalVar {
                        name,
                        ir_name,
                        ty,
                        init: init_decl.init.take(),
                        loc,
                    });
                    self.scopes.define(name, OrdinaryEntry::Global { ty, index });
                    init_decl.resolved = Some(Resolved::Global(index));
                }
                _ => {
                    if matches!(self.scopes.lookup_current(name), Some(OrdinaryEntry::Local { .. }))
                    {
                        return Err(CompilerError::semantic(
                            format!("Redefinition of '{}'", name),
                            loc,
                        ));
                    }
                    // The name is in scope for its own initializer, so
                    // `int w = sizeof w;` resolves.
                    let ctx = self.current.as_mut().expect("inside a function");
                    let slot = ctx.locals.len() as u32;
                    ctx.locals.push(LocalVar {
                        name: Some(name),
                        ty,
                    });
                    self.scopes.define(name, OrdinaryEntry::Local { ty, slot });
                    init_decl.resolved = Some(Resolved::Local(slot));
                    if let Some(init) = &mut init_decl.init {
                        self.check_initializer(&mut ty, init, loc)?;
                        let ctx = self.current.as_mut().expect("inside a function");
                        ctx.locals[slot as usize].ty = ty;
                        self.scopes.define(name, OrdinaryEntry::Local { ty, slot });
                    }
                }
            }
        }
        Ok(())
    }

    /// Annotate all initializer expressions, then complete unsized array
    /// types from the initializer shape.
    fn check_initializer(
        &mut self,
        ty: &mut TypeId,
        init: &mut Initializer,
        loc: SourceLoc,
    ) -> CResult<()> {
        self.annotate_init(init)?;
        let (_, completed) = flatten_initializer(&mut self.registry, *ty, init, loc)?;
        *ty = completed;
        Ok(())
    }

    fn annotate_init(&mut self, init: &mut Initializer) -> CResult<()> {
        match init {
            Initializer::Expr(expr) => {
                self.check_expr(expr)?;
            }
            Initializer::List(items) => {
                for item in items {
                    self.annotate_init(item)?;
                }
            }
        }
        Ok(())
    }

    // Type resolution.

    fn resolve_specifiers(&mut self, spec: &mut DeclSpecifiers) -> CResult<TypeId> {
        let loc = spec.type_spec.loc;
        let ty = match &mut spec.type_spec.kind {
            TypeSpec::Basic(basic) => {
                let basic = *basic;
                self.basic_type(&basic, loc)?
            }
            TypeSpec::Record {
                keyword,
                tag,
                members,
            } => {
                let keyword = *keyword;
                let tag = *tag;
                match members {
                    Some(members) => {
                        let mut taken = std::mem::take(members);
                        let ty = self.define_record(keyword, tag, &mut taken, loc)?;
                        *members = taken;
                        ty
                    }
                    None => self.reference_record(keyword, tag, loc)?,
                }
            }
            TypeSpec::Enum { tag, enumerators } => {
                let tag = *tag;
                match enumerators {
                    Some(enumerators) => {
                        let mut taken = std::mem::take(enumerators);
                        let ty = self.define_enum(tag, &mut taken, loc)?;
                        *enumerators = taken;
                        ty
                    }
                    None => match tag.and_then(|t| self.scopes.lookup_tag(t)) {
                        Some(TagEntry::Enum(id)) => self.registry.intern(CType::Enum(id)),
                        Some(TagEntry::Record { .. }) => {
                            return Err(CompilerError::semantic("Wrong tag kind", loc));
                        }
                        None => {
                            return Err(CompilerError::semantic(
                                format!(
                                    "Undefined enum '{}'",
                                    tag.map(|t| t.as_str()).unwrap_or("")
                                ),
                                loc,
                            ));
                        }
                    },
                }
            }
            TypeSpec::TypedefName(name) => match self.scopes.lookup(*name) {
                Some(OrdinaryEntry::Typedef(ty)) => ty,
                _ => {
                    return Err(CompilerError::semantic(
                        format!("Undeclared identifier '{}'", name),
                        loc,
                    ));
                }
            },
        };
        Ok(self.registry.qualified(ty, spec.qualifiers))
    }

    fn basic_type(&mut self, basic: &BasicSpec, loc: SourceLoc) -> CResult<TypeId> {
        let invalid = || CompilerError::semantic("Invalid type specification", loc);
        if basic.signed && basic.unsigned {
            return Err(invalid());
        }
        if basic.void {
            let only_void = !basic.char
                && !basic.short
                && !basic.int
                && basic.long_count == 0
                && !basic.float
                && !basic.double
                && !basic.signed
                && !basic.unsigned;
            if !only_void {
                return Err(invalid());
            }
            return Ok(self.registry.void());
        }
        if basic.float {
            if basic.char || basic.short || basic.int || basic.double || basic.long_count > 0 {
                return Err(invalid());
            }
            return Ok(self.registry.basic(BasicKind::Float));
        }
        if basic.double {
            // `long double` is measured as double here.
            if basic.char || basic.short || basic.int || basic.long_count > 1 {
                return Err(invalid());
            }
            return Ok(self.registry.basic(BasicKind::Double));
        }
        if basic.char {
            if basic.short || basic.long_count > 0 {
                return Err(invalid());
            }
            let kind = if basic.unsigned {
                BasicKind::UChar
            } else if basic.signed {
                BasicKind::SChar
            } else {
                BasicKind::Char
            };
            return Ok(self.registry.basic(kind));
        }
        if basic.short {
            if basic.long_count > 0 {
                return Err(invalid());
            }
            let kind = if basic.unsigned {
                BasicKind::UShort
            } else {
                BasicKind::Short
            };
            return Ok(self.registry.basic(kind));
        }
        let kind = match basic.long_count {
            0 => {
                if basic.unsigned {
                    BasicKind::UInt
                } else {
                    BasicKind::Int
                }
            }
            1 => {
                if basic.unsigned {
                    BasicKind::ULong
                } else {
                    BasicKind::Long
                }
            }
            2 => {
                if basic.unsigned {
                    BasicKind::ULongLong
                } else {
                    BasicKind::LongLong
                }
            }
            _ => return Err(invalid()),
        };
        Ok(self.registry.basic(kind))
    }

    fn define_record(
        &mut self,
        keyword: RecordKeyword,
        tag: Option<Symbol>,
        members: &mut [crate::ast::StructMemberDecl],
        loc: SourceLoc,
    ) -> CResult<TypeId> {
        let rec_id = match tag {
            Some(tag) => match self.scopes.lookup_tag_current(tag) {
                Some(TagEntry::Record { keyword: k, id }) if k == keyword => {
                    if self.registry.record(id).is_complete() {
                        return Err(CompilerError::semantic(
                            format!("Redefinition of '{}'", tag),
                            loc,
                        ));
                    }
                    id
                }
                Some(_) => return Err(CompilerError::semantic("Wrong tag kind", loc)),
                None => {
                    let id = self.registry.declare_record(keyword, Some(tag));
                    self.scopes.define_tag(tag, TagEntry::Record { keyword, id });
                    id
                }
            },
            None => self.registry.declare_record(keyword, None),
        };

        let mut pending = Vec::new();
        for member in members.iter_mut() {
            let base = self.resolve_specifiers(&mut member.specifiers)?;
            for decl in member.declarators.iter_mut() {
                let ty = self.resolve_declarator(base, &mut decl.declarator)?;
                let bit_width = match &mut decl.bit_width {
                    Some(expr) => {
                        self.check_expr(expr)?;
                        let value = const_eval(&self.registry, expr)?.as_int();
                        if value < 0 {
                            return Err(CompilerError::semantic(
                                "Negative bit-field width",
                                expr.loc,
                            ));
                        }
                        Some(value as u32)
                    }
                    None => None,
                };
                pending.push(PendingField {
                    name: decl.declarator.name,
                    ty,
                    bit_width,
                    loc: decl.declarator.loc,
                });
            }
        }
        self.registry.complete_record(rec_id, pending)?;
        Ok(self.registry.record_type(keyword, rec_id))
    }

    fn reference_record(
        &mut self,
        keyword: RecordKeyword,
        tag: Option<Symbol>,
        loc: SourceLoc,
    ) -> CResult<TypeId> {
        let tag = tag.ok_or_else(|| CompilerError::syntax("Expected identifier", loc))?;
        match self.scopes.lookup_tag(tag) {
            Some(TagEntry::Record { keyword: k, id }) => {
                if k != keyword {
                    return Err(CompilerError::semantic("Wrong tag kind", loc));
                }
                Ok(self.registry.record_type(k, id))
            }
            Some(TagEntry::Enum(_)) => Err(CompilerError::semantic("Wrong tag kind", loc)),
            None => {
                let id = self.registry.declare_record(keyword, Some(tag));
                self.scopes.define_tag(tag, TagEntry::Record { keyword, id });
                Ok(self.registry.record_type(keyword, id))
            }
        }
    }

    fn define_enum(
        &mut self,
        tag: Option<Symbol>,
        enumerators: &mut [crate::ast::Enumerator],
        loc: SourceLoc,
    ) -> CResult<TypeId> {
        if let Some(tag) = tag {
            if self.scopes.lookup_tag_current(tag).is_some() {
                return Err(CompilerError::semantic(
                    format!("Redefinition of '{}'", tag),
                    loc,
                ));
            }
        }
        let id = self.registry.declare_enum(tag, false);
        if let Some(tag) = tag {
            self.scopes.define_tag(tag, TagEntry::Enum(id));
        }
        let enum_ty = self.registry.intern(CType::Enum(id));
        let mut next = 0i64;
        for enumerator in enumerators.iter_mut() {
            if let Some(expr) = &mut enumerator.value {
                self.check_expr(expr)?;
                next = const_eval(&self.registry, expr)?.as_int();
            }
            self.scopes.define(
                enumerator.name,
                OrdinaryEntry::EnumConst {
                    ty: enum_ty,
                    value: next,
                },
            );
            next += 1;
        }
        self.registry.complete_enum(id);
        Ok(enum_ty)
    }

    fn resolve_declarator(&mut self, base: TypeId, declarator: &mut Declarator) -> CResult<TypeId> {
        let mut ty = base;
        for i in (0..declarator.parts.len()).rev() {
            // Indexed to appease the borrow checker while parts are mutated.
            match &mut declarator.parts[i] {
                DeclaratorPart::Pointer(quals) => {
                    let quals = *quals;
                    ty = self.registry.pointer_to(ty);
                    ty = self.registry.qualified(ty, quals);
                }
                DeclaratorPart::Array(size) => {
                    let extent = match size {
                        Some(expr) => {
                            self.check_expr(expr)?;
                            let value = const_eval(&self.registry, expr)?.as_int();
                            if value < 0 {
                                return Err(CompilerError::semantic(
                                    "Array size must be non-negative",
                                    expr.loc,
                                ));
                            }
                            Some(value as u32)
                        }
                        None => None,
                    };
                    ty = self.registry.array_of(ty, extent);
                }
                DeclaratorPart::Function {
                    params,
                    variadic,
                    unspecified,
                } => {
                    let variadic = *variadic;
                    let unspecified = *unspecified;
                    let mut taken = std::mem::take(params);
                    let mut param_tys = ThinVec::new();
                    for param in &mut taken {
                        param_tys.push(self.resolve_param(param)?);
                    }
                    declarator.parts[i] = DeclaratorPart::Function {
                        params: taken,
                        variadic,
                        unspecified,
                    };
                    ty = self.registry.intern(CType::Function {
                        ret: ty,
                        params: param_tys,
                        variadic,
                        unspecified,
                    });
                }
            }
        }
        Ok(ty)
    }

    fn resolve_param(&mut self, param: &mut ParamDecl) -> CResult<TypeId> {
        let base = self.resolve_specifiers(&mut param.specifiers)?;
        let ty = self.resolve_declarator(base, &mut param.declarator)?;
        let ty = self.registry.decay(ty);
        param.ty = Some(ty);
        Ok(ty)
    }

    fn resolve_type_name(&mut self, type_name: &mut TypeName) -> CResult<TypeId> {
        let base = self.resolve_specifiers(&mut type_name.specifiers)?;
        self.resolve_declarator(base, &mut type_name.declarator)
    }

    // Statements.

    fn check_stmt(&mut self, stmt: &mut Stmt) -> CResult<()> {
        match stmt {
            Stmt::Compound(items) => {
                self.scopes.push();
                let result = (|| {
                    for item in items.iter_mut() {
                        match item {
                            BlockItem::Declaration(decl) => self.check_local_decl(decl)?,
                            BlockItem::Stmt(stmt) => self.check_stmt(stmt)?,
                        }
                    }
                    Ok(())
                })();
                self.scopes.pop();
                result
            }
            Stmt::If {
                cond,
                then_stmt,
                else_stmt,
            } => {
                self.check_condition(cond)?;
                self.check_stmt(then_stmt)?;
                if let Some(else_stmt) = else_stmt {
                    self.check_stmt(else_stmt)?;
                }
                Ok(())
            }
            Stmt::While { cond, body } => {
                self.check_condition(cond)?;
                self.check_stmt(body)
            }
            Stmt::DoWhile { body, cond } => {
                self.check_stmt(body)?;
                self.check_condition(cond)
            }
            Stmt::For {
                init,
                cond,
                step,
                body,
            } => {
                self.scopes.push();
                let result = (|| {
                    match init {
                        Some(ForInit::Declaration(decl)) => self.check_local_decl(decl)?,
                        Some(ForInit::Expr(expr)) => {
                            self.check_expr(expr)?;
                        }
                        None => {}
                    }
                    if let Some(cond) = cond {
                        self.check_condition(cond)?;
                    }
                    if let Some(step) = step {
                        self.check_expr(step)?;
                    }
                    self.check_stmt(body)
                })();
                self.scopes.pop();
                result
            }
            Stmt::Switch { cond, body, loc } => {
                let ty = self.check_expr(cond)?;
                if !self.registry.is_integer(ty) {
                    return Err(CompilerError::semantic(
                        "Switch condition must have integer type",
                        *loc,
                    ));
                }
                self.check_stmt(body)
            }
            Stmt::Case { value, stmt, .. } => {
                self.check_expr(value)?;
                let folded = const_eval(&self.registry, value)?.as_int();
                let int = self.registry.int();
                // Fold the label so code generation reads a plain literal.
                *value = Expr {
                    kind: ExprKind::IntLiteral {
                        value: folded,
                        suffix: IntSuffix::default(),
                    },
                    loc: value.loc,
                    ty: Some(int),
                    lvalue: false,
                };
                self.check_stmt(stmt)
            }
            Stmt::Default { stmt, .. } => self.check_stmt(stmt),
            Stmt::Break(_) | Stmt::Continue(_) | Stmt::Empty => Ok(()),
            Stmt::Goto { label, loc } => {
                let ctx = self.current.as_mut().expect("inside a function");
                ctx.gotos.push((*label, *loc));
                Ok(())
            }
            Stmt::Labeled { label, stmt, loc } => {
                let ctx = self.current.as_mut().expect("inside a function");
                if !ctx.labels.insert(*label) {
                    return Err(CompilerError::semantic(
                        format!("Duplicate label '{}'", label),
                        *loc,
                    ));
                }
                self.check_stmt(stmt)
            }
            Stmt::Return { value, loc } => {
                let ret_ty = self.current.as_ref().expect("inside a function").ret_ty;
                match value {
                    Some(expr) => {
                        let ty = self.check_expr(expr)?;
                        let ty = self.registry.decay(ty);
                        if self.registry.is_void(ret_ty) {
                            return Err(CompilerError::semantic(
                                "Cannot return a value from a void function",
                                *loc,
                            ));
                        }
                        if !self.assignable(ret_ty, ty) {
                            return Err(CompilerError::semantic(
                                format!(
                                    "Cannot return '{}' as '{}'",
                                    self.registry.display(ty),
                                    self.registry.display(ret_ty)
                                ),
                                *loc,
                            ));
                        }
                        Ok(())
                    }
                    None => Ok(()),
                }
            }
            Stmt::Expr(expr) => {
                self.check_expr(expr)?;
                Ok(())
            }
        }
    }

    fn check_condition(&mut self, cond: &mut Expr) -> CResult<()> {
        let ty = self.check_expr(cond)?;
        let ty = self.registry.decay(ty);
        if !self.registry.is_scalar(ty) {
            return Err(CompilerError::semantic(
                "Condition must have scalar type",
                cond.loc,
            ));
        }
        Ok(())
    }

    // Expressions.

    fn check_expr(&mut self, expr: &mut Expr) -> CResult<TypeId> {
        let loc = expr.loc;
        let mut lvalue = false;
        let ty = match &mut expr.kind {
            ExprKind::IntLiteral { suffix, .. } => {
                let kind = match (suffix.longness, suffix.unsigned) {
                    (Longness::None, false) => BasicKind::Int,
                    (Longness::None, true) => BasicKind::UInt,
                    (Longness::Long, false) => BasicKind::Long,
                    (Longness::Long, true) => BasicKind::ULong,
                    (Longness::LongLong, false) => BasicKind::LongLong,
                    (Longness::LongLong, true) => BasicKind::ULongLong,
                };
                self.registry.basic(kind)
            }
            ExprKind::FloatLiteral(_) => self.registry.basic(BasicKind::Double),
            ExprKind::CharLiteral(_) => self.registry.char_type(),
            ExprKind::StringLiteral(text) => {
                let len = string_bytes(text.as_str()).len() as u32;
                let char_ty = self.registry.char_type();
                lvalue = true;
                self.registry.array_of(char_ty, Some(len))
            }
            ExprKind::Ident { name, resolved } => {
                let name = *name;
                match self.scopes.lookup(name) {
                    Some(OrdinaryEntry::Local { ty, slot }) => {
                        *resolved = Some(Resolved::Local(slot));
                        lvalue = true;
                        ty
                    }
                    Some(OrdinaryEntry::Global { ty, index }) => {
                        *resolved = Some(Resolved::Global(index));
                        lvalue = true;
                        ty
                    }
                    Some(OrdinaryEntry::Function { ty, index }) => {
                        *resolved = Some(Resolved::Function(index));
                        ty
                    }
                    Some(OrdinaryEntry::EnumConst { ty, value }) => {
                        *resolved = Some(Resolved::EnumConst(value));
                        ty
                    }
                    Some(OrdinaryEntry::Typedef(_)) | None => {
                        return Err(CompilerError::semantic(
                            format!("Undeclared identifier '{}'", name),
                            loc,
                        ));
                    }
                }
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let op = *op;
                let lt = self.check_expr(lhs)?;
                let rt = self.check_expr(rhs)?;
                self.binary_type(op, lt, rt, loc)?
            }
            ExprKind::Unary { op, operand } => {
                let op = *op;
                let ty = self.check_expr(operand)?;
                match op {
                    UnaryOp::Neg | UnaryOp::Plus => {
                        if !self.registry.is_arithmetic(ty) {
                            return Err(CompilerError::semantic(
                                "Operand must have arithmetic type",
                                loc,
                            ));
                        }
                        self.registry.promote(ty)
                    }
                    UnaryOp::BitNot => {
                        if !self.registry.is_integer(ty) {
                            return Err(CompilerError::semantic(
                                "Operand must have integer type",
                                loc,
                            ));
                        }
                        self.registry.promote(ty)
                    }
                    UnaryOp::LogicalNot => {
                        let decayed = self.registry.decay(ty);
                        if !self.registry.is_scalar(decayed) {
                            return Err(CompilerError::semantic(
                                "Operand must have scalar type",
                                loc,
                            ));
                        }
                        self.registry.int()
                    }
                    UnaryOp::Deref => {
                        let decayed = self.registry.decay(ty);
                        match self.registry.pointee(decayed) {
                            Some(target) => {
                                lvalue = true;
                                target
                            }
                            None => {
                                return Err(CompilerError::semantic(
                                    format!(
                                        "Cannot dereference non-pointer type '{}'",
                                        self.registry.display(ty)
                                    ),
                                    loc,
                                ));
                            }
                        }
                    }
                    UnaryOp::AddrOf => {
                        if !operand.lvalue && !self.registry.is_function(ty) {
                            return Err(CompilerError::semantic(
                                "Lvalue required to take an address",
                                loc,
                            ));
                        }
                        self.registry.pointer_to(ty)
                    }
                }
            }
            ExprKind::Assign { op, lhs, rhs } => {
                let op = *op;
                let lt = self.check_expr(lhs)?;
                if !lhs.lvalue {
                    return Err(CompilerError::semantic(
                        "Lvalue required in assignment",
                        lhs.loc,
                    ));
                }
                let rt = self.check_expr(rhs)?;
                let rd = self.registry.decay(rt);
                match op {
                    AssignOp::Assign => {
                        if !self.assignable(lt, rd) {
                            return Err(CompilerError::semantic(
                                format!(
                                    "Cannot assign '{}' to '{}'",
                                    self.registry.display(rd),
                                    self.registry.display(lt)
                                ),
                                loc,
                            ));
                        }
                    }
                    AssignOp::Add | AssignOp::Sub => {
                        let ok = (self.registry.is_pointer(lt) && self.registry.is_integer(rd))
                            || (self.registry.is_arithmetic(lt)
                                && self.registry.is_arithmetic(rd));
                        if !ok {
                            return Err(CompilerError::semantic(
                                "Invalid operands to compound assignment",
                                loc,
                            ));
                        }
                    }
                    AssignOp::Mul | AssignOp::Div => {
                        if !self.registry.is_arithmetic(lt) || !self.registry.is_arithmetic(rd) {
                            return Err(CompilerError::semantic(
                                "Invalid operands to compound assignment",
                                loc,
                            ));
                        }
                    }
                    _ => {
                        if !self.registry.is_integer(lt) || !self.registry.is_integer(rd) {
                            return Err(CompilerError::semantic(
                                "Invalid operands to compound assignment",
                                loc,
                            ));
                        }
                    }
                }
                self.registry.unqualified(lt)
            }
            ExprKind::PreIncDec { operand, .. } | ExprKind::PostIncDec { operand, .. } => {
                let ty = self.check_expr(operand)?;
                if !operand.lvalue {
                    return Err(CompilerError::semantic(
                        "Lvalue required for increment or decrement",
                        loc,
                    ));
                }
                if !self.registry.is_scalar(ty) {
                    return Err(CompilerError::semantic(
                        "Operand must have scalar type",
                        loc,
                    ));
                }
                self.registry.unqualified(ty)
            }
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                self.check_condition(cond)?;
                let tt = self.check_expr(then_expr)?;
                let et = self.check_expr(else_expr)?;
                let td = self.registry.decay(tt);
                let ed = self.registry.decay(et);
                if self.registry.is_arithmetic(td) && self.registry.is_arithmetic(ed) {
                    self.registry.usual_arithmetic(td, ed)
                } else if self.registry.compatible(td, ed) {
                    self.registry.unqualified(td)
                } else if self.registry.is_pointer(td) && self.registry.is_pointer(ed) {
                    self.registry.unqualified(td)
                } else {
                    return Err(CompilerError::semantic(
                        "Incompatible branches in conditional expression",
                        loc,
                    ));
                }
            }
            ExprKind::Call { callee, args } => {
                let ct = self.check_expr(callee)?;
                let fn_ty = {
                    let unq = self.registry.unqualified(ct);
                    if self.registry.is_function(unq) {
                        unq
                    } else {
                        match self.registry.pointee(unq) {
                            Some(target) if self.registry.is_function(target) => {
                                self.registry.unqualified(target)
                            }
                            _ => {
                                return Err(CompilerError::semantic(
                                    "Called object is not a function",
                                    callee.loc,
                                ));
                            }
                        }
                    }
                };
                let (ret, params, variadic, unspecified) = match self.registry.kind(fn_ty) {
                    CType::Function {
                        ret,
                        params,
                        variadic,
                        unspecified,
                    } => (*ret, params.clone(), *variadic, *unspecified),
                    _ => unreachable!(),
                };
                if !unspecified {
                    let ok = if variadic {
                        args.len() >= params.len()
                    } else {
                        args.len() == params.len()
                    };
                    if !ok {
                        return Err(CompilerError::semantic(
                            format!("Expected {} arguments, got {}", params.len(), args.len()),
                            loc,
                        ));
                    }
                }
                for (i, arg) in args.iter_mut().enumerate() {
                    let at = self.check_expr(arg)?;
                    let ad = self.registry.decay(at);
                    if let Some(&pt) = params.get(i) {
                        if !self.assignable(pt, ad) {
                            return Err(CompilerError::semantic(
                                format!(
                                    "Cannot pass '{}' as '{}'",
                                    self.registry.display(ad),
                                    self.registry.display(pt)
                                ),
                                arg.loc,
                            ));
                        }
                    }
                }
                ret
            }
            ExprKind::Index { base, index } => {
                let bt = self.check_expr(base)?;
                let it = self.check_expr(index)?;
                let bd = self.registry.decay(bt);
                let id = self.registry.decay(it);
                let (ptr, idx) = if self.registry.is_pointer(bd) {
                    (bd, id)
                } else {
                    (id, bd)
                };
                if !self.registry.is_pointer(ptr) || !self.registry.is_integer(idx) {
                    return Err(CompilerError::semantic(
                        "Subscripted value is not a pointer or array",
                        loc,
                    ));
                }
                lvalue = true;
                self.registry.pointee(ptr).expect("pointer has a pointee")
            }
            ExprKind::Member { base, field, arrow } => {
                let field = *field;
                let arrow = *arrow;
                let bt = self.check_expr(base)?;
                let rec_ty = if arrow {
                    let bd = self.registry.decay(bt);
                    self.registry.pointee(bd).ok_or_else(|| {
                        CompilerError::semantic(
                            format!(
                                "Arrow access on non-pointer type '{}'",
                                self.registry.display(bt)
                            ),
                            loc,
                        )
                    })?
                } else {
                    bt
                };
                let unq = self.registry.unqualified(rec_ty);
                let rec_id = match self.registry.kind(unq) {
                    CType::Record { id, .. } => *id,
                    _ => {
                        return Err(CompilerError::semantic(
                            format!(
                                "Member access on non-struct type '{}'",
                                self.registry.display(rec_ty)
                            ),
                            loc,
                        ));
                    }
                };
                let record = self.registry.record(rec_id);
                if !record.is_complete() {
                    return Err(CompilerError::semantic(
                        format!("Incomplete type '{}'", self.registry.display(unq)),
                        loc,
                    ));
                }
                let member = record.field(field).ok_or_else(|| {
                    CompilerError::semantic(
                        format!(
                            "Unknown field '{}' in '{}'",
                            field,
                            self.registry.display(unq)
                        ),
                        loc,
                    )
                })?;
                lvalue = arrow || base.lvalue;
                member.ty
            }
            ExprKind::Cast { type_name, operand } => {
                let ty = self.resolve_type_name(type_name)?;
                self.check_expr(operand)?;
                self.registry.unqualified(ty)
            }
            ExprKind::SizeofExpr(operand) => {
                self.check_expr(operand)?;
                let ty = operand.ty.expect("operand annotated");
                return self.fold_sizeof(expr, ty);
            }
            ExprKind::SizeofType(type_name) => {
                let ty = self.resolve_type_name(type_name)?;
                return self.fold_sizeof(expr, ty);
            }
        };
        expr.ty = Some(ty);
        expr.lvalue = lvalue;
        Ok(ty)
    }

    /// Replace a `sizeof` node with its folded value.
    fn fold_sizeof(&mut self, expr: &mut Expr, measured: TypeId) -> CResult<TypeId> {
        let size = self
            .registry
            .size_of(measured)
            .ok_or_else(|| {
                CompilerError::semantic(
                    format!(
                        "Cannot take the size of incomplete type '{}'",
                        self.registry.display(measured)
                    ),
                    expr.loc,
                )
            })?;
        let uint = self.registry.basic(BasicKind::UInt);
        expr.kind = ExprKind::IntLiteral {
            value: size as i64,
            suffix: IntSuffix {
                unsigned: true,
                longness: Longness::None,
            },
        };
        expr.ty = Some(uint);
        expr.lvalue = false;
        Ok(uint)
    }

    fn binary_type(
        &mut self,
        op: BinaryOp,
        lt: TypeId,
        rt: TypeId,
        loc: SourceLoc,
    ) -> CResult<TypeId> {
        let ld = self.registry.decay(lt);
        let rd = self.registry.decay(rt);
        let invalid = |a: &Self| {
            CompilerError::semantic(
                format!(
                    "Invalid operands to binary operator ('{}' and '{}')",
                    a.registry.display(ld),
                    a.registry.display(rd)
                ),
                loc,
            )
        };
        let ty = match op {
            BinaryOp::Add => {
                if self.registry.is_pointer(ld) && self.registry.is_integer(rd) {
                    self.registry.unqualified(ld)
                } else if self.registry.is_integer(ld) && self.registry.is_pointer(rd) {
                    self.registry.unqualified(rd)
                } else if self.registry.is_arithmetic(ld) && self.registry.is_arithmetic(rd) {
                    self.registry.usual_arithmetic(ld, rd)
                } else {
                    return Err(invalid(self));
                }
            }
            BinaryOp::Sub => {
                if self.registry.is_pointer(ld) && self.registry.is_integer(rd) {
                    self.registry.unqualified(ld)
                } else if self.registry.is_pointer(ld) && self.registry.is_pointer(rd) {
                    self.registry.int()
                } else if self.registry.is_arithmetic(ld) && self.registry.is_arithmetic(rd) {
                    self.registry.usual_arithmetic(ld, rd)
                } else {
                    return Err(invalid(self));
                }
            }
            BinaryOp::Mul | BinaryOp::Div => {
                if self.registry.is_arithmetic(ld) && self.registry.is_arithmetic(rd) {
                    self.registry.usual_arithmetic(ld, rd)
                } else {
                    return Err(invalid(self));
                }
            }
            BinaryOp::Rem | BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => {
                if self.registry.is_integer(ld) && self.registry.is_integer(rd) {
                    self.registry.usual_arithmetic(ld, rd)
                } else {
                    return Err(invalid(self));
                }
            }
            BinaryOp::Shl | BinaryOp::Shr => {
                if self.registry.is_integer(ld) && self.registry.is_integer(rd) {
                    self.registry.promote(ld)
                } else {
                    return Err(invalid(self));
                }
            }
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge | BinaryOp::Eq
            | BinaryOp::Ne => {
                let ok = (self.registry.is_arithmetic(ld) && self.registry.is_arithmetic(rd))
                    || (self.registry.is_pointer(ld)
                        && (self.registry.is_pointer(rd) || self.registry.is_integer(rd)))
                    || (self.registry.is_integer(ld) && self.registry.is_pointer(rd));
                if !ok {
                    return Err(invalid(self));
                }
                self.registry.int()
            }
            BinaryOp::LogicalAnd | BinaryOp::LogicalOr => {
                if self.registry.is_scalar(ld) && self.registry.is_scalar(rd) {
                    self.registry.int()
                } else {
                    return Err(invalid(self));
                }
            }
            BinaryOp::Comma => self.registry.unqualified(rd),
        };
        Ok(ty)
    }

    /// Lenient assignment compatibility: any scalar converts to any scalar,
    /// records must match structurally.
    fn assignable(&self, target: TypeId, source: TypeId) -> bool {
        if self.registry.is_scalar(target) && self.registry.is_scalar(source) {
            return true;
        }
        if self.registry.is_record(target) && self.registry.is_record(source) {
            return self.registry.compatible(target, source);
        }
        self.registry.compatible(target, source)
    }
}

/// Encode an escape-decoded string into its in-memory bytes, including the
/// terminating NUL. Code points up to U+00FF become single bytes.
pub(crate) fn string_bytes(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() + 1);
    for ch in text.chars() {
        encode_char(ch, &mut out);
    }
    out.push(0);
    out
}

/// Evaluate an annotated expression as a compile-time constant.
pub fn const_eval(registry: &TypeRegistry, expr: &Expr) -> CResult<ConstValue> {
    let not_const =
        || CompilerError::semantic("Expression is not constant", expr.loc);
    match &expr.kind {
        ExprKind::IntLiteral { value, .. } => Ok(ConstValue::Int(*value)),
        ExprKind::CharLiteral(value) => Ok(ConstValue::Int(*value as i64)),
        ExprKind::FloatLiteral(value) => Ok(ConstValue::Float(*value)),
        ExprKind::Ident { resolved, .. } => match resolved {
            Some(Resolved::EnumConst(value)) => Ok(ConstValue::Int(*value)),
            _ => Err(not_const()),
        },
        ExprKind::Unary { op, operand } => {
            let value = const_eval(registry, operand)?;
            match (op, value) {
                (UnaryOp::Neg, ConstValue::Int(v)) => Ok(ConstValue::Int(v.wrapping_neg())),
                (UnaryOp::Neg, ConstValue::Float(v)) => Ok(ConstValue::Float(-v)),
                (UnaryOp::Plus, v) => Ok(v),
                (UnaryOp::BitNot, ConstValue::Int(v)) => Ok(ConstValue::Int(!v)),
                (UnaryOp::LogicalNot, v) => Ok(ConstValue::Int((v.as_int() == 0) as i64)),
                _ => Err(not_const()),
            }
        }
        ExprKind::Binary { op, lhs, rhs } => {
            let l = const_eval(registry, lhs)?;
            if matches!(op, BinaryOp::LogicalAnd) && l.as_int() == 0 {
                return Ok(ConstValue::Int(0));
            }
            if matches!(op, BinaryOp::LogicalOr) && l.as_int() != 0 {
                return Ok(ConstValue::Int(1));
            }
            let r = const_eval(registry, rhs)?;
            if let (ConstValue::Int(a), ConstValue::Int(b)) = (l, r) {
                let div_guard = |b: i64| {
                    if b == 0 {
                        Err(CompilerError::semantic("Division by zero", expr.loc))
                    } else {
                        Ok(b)
                    }
                };
                let v = match op {
                    BinaryOp::Add => a.wrapping_add(b),
                    BinaryOp::Sub => a.wrapping_sub(b),
                    BinaryOp::Mul => a.wrapping_mul(b),
                    BinaryOp::Div => a.wrapping_div(div_guard(b)?),
                    BinaryOp::Rem => a.wrapping_rem(div_guard(b)?),
                    BinaryOp::Shl => a.wrapping_shl(b as u32 & 63),
                    BinaryOp::Shr => a.wrapping_shr(b as u32 & 63),
                    BinaryOp::BitAnd => a & b,
                    BinaryOp::BitOr => a | b,
                    BinaryOp::BitXor => a ^ b,
                    BinaryOp::Lt => (a < b) as i64,
                    BinaryOp::Gt => (a > b) as i64,
                    BinaryOp::Le => (a <= b) as i64,
                    BinaryOp::Ge => (a >= b) as i64,
                    BinaryOp::Eq => (a == b) as i64,
                    BinaryOp::Ne => (a != b) as i64,
                    BinaryOp::LogicalAnd => ((a != 0) && (b != 0)) as i64,
                    BinaryOp::LogicalOr => ((a != 0) || (b != 0)) as i64,
                    BinaryOp::Comma => b,
                };
                Ok(ConstValue::Int(v))
            } else {
                let a = match l {
                    ConstValue::Int(v) => v as f64,
                    ConstValue::Float(v) => v,
                };
                let b = match r {
                    ConstValue::Int(v) => v as f64,
                    ConstValue::Float(v) => v,
                };
                let v = match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                    BinaryOp::Lt => return Ok(ConstValue::Int((a < b) as i64)),
                    BinaryOp::Gt => return Ok(ConstValue::Int((a > b) as i64)),
                    BinaryOp::Le => return Ok(ConstValue::Int((a <= b) as i64)),
                    BinaryOp::Ge => return Ok(ConstValue::Int((a >= b) as i64)),
                    BinaryOp::Eq => return Ok(ConstValue::Int((a == b) as i64)),
                    BinaryOp::Ne => return Ok(ConstValue::Int((a != b) as i64)),
                    _ => return Err(not_const()),
                };
                Ok(ConstValue::Float(v))
            }
        }
        ExprKind::Conditional {
            cond,
            then_expr,
            else_expr,
        } => {
            let c = const_eval(registry, cond)?;
            if c.as_int() != 0 {
                const_eval(registry, then_expr)
            } else {
                const_eval(registry, else_expr)
            }
        }
        ExprKind::Cast { operand, .. } => {
            let value = const_eval(registry, operand)?;
            let target = expr.ty.expect("cast annotated");
            if registry.is_float(target) {
                Ok(ConstValue::Float(match value {
                    ConstValue::Int(v) => v as f64,
                    ConstValue::Float(v) => v,
                }))
            } else {
                Ok(ConstValue::Int(value.as_int()))
            }
        }
        _ => Err(not_const()),
    }
}

/// One scalar slot of a flattened initializer.
pub(crate) enum InitValue<'a> {
    Expr(&'a Expr),
    Bytes(Vec<u8>),
}

pub(crate) type InitSlots<'a> = Vec<(u32, TypeId, InitValue<'a>)>;

struct ItemStream<'a> {
    items: &'a [Initializer],
    pos: usize,
}

impl<'a> ItemStream<'a> {
    fn new(items: &'a [Initializer]) -> Self {
        ItemStream { items, pos: 0 }
    }

    fn next(&mut self) -> Option<&'a Initializer> {
        let item = self.items.get(self.pos);
        if item.is_some() {
            self.pos += 1;
        }
        item
    }

    fn peek(&self) -> Option<&'a Initializer> {
        self.items.get(self.pos)
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.items.len()
    }
}

/// Flatten an initializer into (offset, type, value) slots, in source
/// order. Returns the possibly completed type: an array of unknown extent
/// takes its length from the initializer. Excess items are ignored, and a
/// union consumes items only for its first member.
pub(crate) fn flatten_initializer<'a>(
    registry: &mut TypeRegistry,
    ty: TypeId,
    init: &'a Initializer,
    loc: SourceLoc,
) -> CResult<(InitSlots<'a>, TypeId)> {
    let mut out = Vec::new();
    let unq = registry.unqualified(ty);
    let completed = match registry.kind(unq).clone() {
        CType::Array { element, size } => {
            if let Initializer::Expr(expr) = init {
                if let ExprKind::StringLiteral(text) = &expr.kind {
                    let elem_size = registry.size_of(element).ok_or_else(|| {
                        CompilerError::semantic("Incomplete element type", loc)
                    })?;
                    if elem_size != 1 {
                        return Err(CompilerError::semantic(
                            "String initializer requires a character array",
                            expr.loc,
                        ));
                    }
                    let mut bytes = string_bytes(text.as_str());
                    let extent = match size {
                        Some(n) => {
                            bytes.resize(n as usize, 0);
                            n
                        }
                        None => bytes.len() as u32,
                    };
                    out.push((0, element, InitValue::Bytes(bytes)));
                    return Ok((out, registry.array_of(element, Some(extent))));
                }
                return Err(CompilerError::semantic("Invalid initializer", expr.loc));
            }
            let Initializer::List(items) = init else {
                unreachable!()
            };
            let elem_size = registry
                .size_of(element)
                .ok_or_else(|| CompilerError::semantic("Incomplete element type", loc))?;
            let mut stream = ItemStream::new(items);
            match size {
                Some(n) => {
                    for i in 0..n {
                        if stream.is_empty() {
                            break;
                        }
                        fill_item(registry, element, &mut stream, &mut out, i * elem_size, loc)?;
                    }
                    ty
                }
                None => {
                    let mut count = 0u32;
                    while !stream.is_empty() {
                        fill_item(
                            registry,
                            element,
                            &mut stream,
                            &mut out,
                            count * elem_size,
                            loc,
                        )?;
                        count += 1;
                    }
                    registry.array_of(element, Some(count))
                }
            }
        }
        _ => {
            match init {
                Initializer::Expr(expr) => {
                    if !registry.is_scalar(unq) {
                        return Err(CompilerError::semantic("Invalid initializer", expr.loc));
                    }
                    out.push((0, unq, InitValue::Expr(expr)));
                }
                Initializer::List(items) => {
                    let mut stream = ItemStream::new(items);
                    fill_value(registry, unq, &mut stream, &mut out, 0, loc)?;
                }
            }
            ty
        }
    };
    Ok((out, completed))
}

/// Consume one element's worth of items: a braced item fills the element
/// from its own sub-list, anything else is drawn from the flat stream.
fn fill_item<'a>(
    registry: &TypeRegistry,
    ty: TypeId,
    stream: &mut ItemStream<'a>,
    out: &mut InitSlots<'a>,
    offset: u32,
    loc: SourceLoc,
) -> CResult<()> {
    if matches!(stream.peek(), Some(Initializer::List(_))) {
        let Some(Initializer::List(sub)) = stream.next() else {
            unreachable!()
        };
        let mut sub_stream = ItemStream::new(sub);
        fill_value(registry, ty, &mut sub_stream, out, offset, loc)
    } else {
        fill_value(registry, ty, stream, out, offset, loc)
    }
}

fn fill_value<'a>(
    registry: &TypeRegistry,
    ty: TypeId,
    stream: &mut ItemStream<'a>,
    out: &mut InitSlots<'a>,
    offset: u32,
    loc: SourceLoc,
) -> CResult<()> {
    let unq = registry.unqualified(ty);
    if registry.is_scalar(unq) {
        match stream.next() {
            None => Ok(()),
            Some(Initializer::Expr(expr)) => {
                out.push((offset, unq, InitValue::Expr(expr)));
                Ok(())
            }
            Some(Initializer::List(sub)) => {
                let mut sub_stream = ItemStream::new(sub);
                fill_value(registry, unq, &mut sub_stream, out, offset, loc)
            }
        }
    } else {
        match registry.kind(unq).clone() {
            CType::Array {
                element,
                size: Some(n),
            } => {
                let elem_size = registry
                    .size_of(element)
                    .ok_or_else(|| CompilerError::semantic("Incomplete element type", loc))?;
                for i in 0..n {
                    if stream.is_empty() {
                        break;
                    }
                    fill_item(registry, element, stream, out, offset + i * elem_size, loc)?;
                }
                Ok(())
            }
            CType::Record { keyword, id } => {
                let fields = registry
                    .record(id)
                    .fields
                    .clone()
                    .ok_or_else(|| CompilerError::semantic("Incomplete type", loc))?;
                match keyword {
                    RecordKeyword::Struct => {
                        for field in &fields {
                            if stream.is_empty() {
                                break;
                            }
                            fill_item(
                                registry,
                                field.ty,
                                stream,
                                out,
                                offset + field.offset,
                                loc,
                            )?;
                        }
                        Ok(())
                    }
                    RecordKeyword::Union => match fields.first() {
                        Some(first) => fill_item(registry, first.ty, stream, out, offset, loc),
                        None => Ok(()),
                    },
                }
            }
            _ => Err(CompilerError::semantic("Invalid initializer", loc)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::options::COptions;
    use crate::parser::Parser;

    fn analyze_src(src: &str) -> CResult<SemaOutput> {
        let tokens = Lexer::new(src, &COptions::default()).tokenize()?;
        let mut unit = Parser::new(tokens).parse_translation_unit()?;
        analyze(&mut unit, ArchInfo::example())
    }

    #[test]
    fn wrong_tag_kind_reported_at_use() {
        let err = analyze_src("\nunion S { int x;};\nint B = sizeof(struct S);\n").unwrap_err();
        assert!(err.message.contains("Wrong tag kind"));
        assert_eq!(err.loc.row, 3);
    }

    #[test]
    fn undeclared_identifier() {
        let err = analyze_src("int main() { return missing; }").unwrap_err();
        assert!(err.message.contains("Undeclared identifier 'missing'"));
    }

    #[test]
    fn extern_then_definition_merges() {
        let out = analyze_src("extern char a;\nchar a = 2;\n").unwrap();
        assert_eq!(out.globals.len(), 1);
        assert!(out.globals[0].init.is_some());
    }

    #[test]
    fn conflicting_redefinition_rejected() {
        let err = analyze_src("int a = 1;\nint a = 2;\n").unwrap_err();
        assert!(err.message.contains("Redefinition of 'a'"));
    }

    #[test]
    fn sizeof_own_name_in_initializer() {
        analyze_src("int main() { int w = sizeof w; return w; }").unwrap();
    }

    #[test]
    fn array_extent_from_initializer() {
        let out = analyze_src("int b[] = {1, 2};\nint A[][3] = {1,2,3,4,5,6,7,8,9};\n").unwrap();
        assert_eq!(out.registry.size_of(out.globals[0].ty), Some(8));
        assert_eq!(out.registry.size_of(out.globals[1].ty), Some(36));
    }

    #[test]
    fn undefined_label_rejected() {
        let err = analyze_src("void main() { goto nowhere; }").unwrap_err();
        assert!(err.message.contains("Undefined label 'nowhere'"));
    }

    #[test]
    fn static_local_is_promoted() {
        let out =
            analyze_src("void main() { static unsigned char msg[] = \"hi\"; }").unwrap();
        assert_eq!(out.globals.len(), 1);
        assert_eq!(out.globals[0].ir_name, "main.msg");
        assert_eq!(out.registry.size_of(out.globals[0].ty), Some(3));
    }

    #[test]
    fn enum_constants_fold() {
        let out = analyze_src("enum E { A, B, C = A + 10 };\nint x = C;\n").unwrap();
        let global = &out.globals[0];
        let Some(Initializer::Expr(expr)) = &global.init else {
            panic!("expected expression initializer");
        };
        assert_eq!(
            const_eval(&out.registry, expr).unwrap(),
            ConstValue::Int(10)
        );
    }

    #[test]
    fn void_function_cannot_return_value() {
        let err = analyze_src("void main() { return 2; }").unwrap_err();
        assert!(err.message.contains("void function"));
    }
}
