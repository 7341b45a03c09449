//! Abstract syntax tree.
//!
//! Produced by the parser, annotated in place by semantic analysis:
//! expressions gain a [`TypeId`] and an lvalue flag, identifiers gain a
//! [`Resolved`] binding. Code generation reads the annotated tree and never
//! touches scopes again.

use crate::lexer::IntSuffix;
use crate::source::SourceLoc;
use crate::types::TypeId;
use thin_vec::ThinVec;
use symbol_table::GlobalSymbol as Symbol;

/// One parsed translation unit.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationUnit {
    pub decls: Vec<ExternalDecl>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExternalDecl {
    FunctionDef(FunctionDef),
    Declaration(Declaration),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub specifiers: DeclSpecifiers,
    pub declarator: Declarator,
    pub body: Stmt,
}

/// A declaration statement: specifiers plus zero or more init-declarators.
/// Zero declarators is the specifier-only form (`struct s { … };`).
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub specifiers: DeclSpecifiers,
    pub declarators: ThinVec<InitDeclarator>,
    pub loc: SourceLoc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InitDeclarator {
    pub declarator: Declarator,
    pub init: Option<Initializer>,
    /// Where the declared name landed; filled during analysis. Stays `None`
    /// for typedefs.
    pub resolved: Option<Resolved>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageClass {
    Typedef,
    Extern,
    Static,
    Auto,
    Register,
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TypeQualifiers: u8 {
        const CONST = 1 << 0;
        const VOLATILE = 1 << 1;
    }
}

/// Declaration specifiers as written, before type resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclSpecifiers {
    pub storage: Option<StorageClass>,
    pub qualifiers: TypeQualifiers,
    pub type_spec: TypeSpecNode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeSpecNode {
    pub kind: TypeSpec,
    pub loc: SourceLoc,
}

/// Record keyword used at a tag reference or definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKeyword {
    Struct,
    Union,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeSpec {
    Basic(BasicSpec),
    /// `struct tag`, `union tag { … }`, or an anonymous definition.
    Record {
        keyword: RecordKeyword,
        tag: Option<Symbol>,
        members: Option<Vec<StructMemberDecl>>,
    },
    /// `enum tag` or `enum tag { A, B = 4 }`.
    Enum {
        tag: Option<Symbol>,
        enumerators: Option<Vec<Enumerator>>,
    },
    /// A typedef name used as a type.
    TypedefName(Symbol),
}

/// Multiset of basic type keywords collected from the specifier list
/// (`unsigned long long`, `signed char`, …).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BasicSpec {
    pub void: bool,
    pub char: bool,
    pub short: bool,
    pub int: bool,
    pub long_count: u8,
    pub float: bool,
    pub double: bool,
    pub signed: bool,
    pub unsigned: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructMemberDecl {
    pub specifiers: DeclSpecifiers,
    pub declarators: ThinVec<StructMemberDeclarator>,
    pub loc: SourceLoc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructMemberDeclarator {
    pub declarator: Declarator,
    pub bit_width: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Enumerator {
    pub name: Symbol,
    pub value: Option<Expr>,
    pub loc: SourceLoc,
}

/// A declarator: optional name plus modifier parts.
///
/// Parts are stored in reading order starting from the name, so `int *a[3]`
/// stores `[Array(3), Pointer]` and `int (*p)[3]` stores
/// `[Pointer, Array(3)]`. Resolving against a base type folds the parts in
/// reverse.
#[derive(Debug, Clone, PartialEq)]
pub struct Declarator {
    pub name: Option<Symbol>,
    pub parts: ThinVec<DeclaratorPart>,
    pub loc: SourceLoc,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeclaratorPart {
    Pointer(TypeQualifiers),
    /// `[expr]` or `[]`; the extent is const-evaluated during analysis.
    Array(Option<Expr>),
    Function {
        params: Vec<ParamDecl>,
        variadic: bool,
        /// `()` with no parameter list at all, compatible with anything.
        unspecified: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    pub specifiers: DeclSpecifiers,
    pub declarator: Declarator,
    /// Resolved parameter type, after array and function decay.
    pub ty: Option<TypeId>,
}

/// A type name as used in casts and `sizeof`.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeName {
    pub specifiers: DeclSpecifiers,
    pub declarator: Declarator,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Initializer {
    Expr(Expr),
    List(Vec<Initializer>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Compound(Vec<BlockItem>),
    If {
        cond: Expr,
        then_stmt: Box<Stmt>,
        else_stmt: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        cond: Expr,
    },
    For {
        init: Option<ForInit>,
        cond: Option<Expr>,
        step: Option<Expr>,
        body: Box<Stmt>,
    },
    Switch {
        cond: Expr,
        body: Box<Stmt>,
        loc: SourceLoc,
    },
    Case {
        value: Expr,
        stmt: Box<Stmt>,
        loc: SourceLoc,
    },
    Default {
        stmt: Box<Stmt>,
        loc: SourceLoc,
    },
    Break(SourceLoc),
    Continue(SourceLoc),
    Goto {
        label: Symbol,
        loc: SourceLoc,
    },
    Labeled {
        label: Symbol,
        stmt: Box<Stmt>,
        loc: SourceLoc,
    },
    Return {
        value: Option<Expr>,
        loc: SourceLoc,
    },
    Expr(Expr),
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    Declaration(Declaration),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum BlockItem {
    Declaration(Declaration),
    Stmt(Stmt),
}

/// Where an identifier landed after name resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolved {
    /// Index into the enclosing function's local slot table.
    Local(u32),
    /// Index into the module's global variable table.
    Global(u32),
    /// Index into the module's function table.
    Function(u32),
    EnumConst(i64),
}

/// An expression node. `ty` and `lvalue` are filled by semantic analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub loc: SourceLoc,
    pub ty: Option<TypeId>,
    pub lvalue: bool,
}

impl Expr {
    pub fn new(kind: ExprKind, loc: SourceLoc) -> Self {
        Expr {
            kind,
            loc,
            ty: None,
            lvalue: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    LogicalAnd,
    LogicalOr,
    Comma,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    BitNot,
    LogicalNot,
    Deref,
    AddrOf,
}

/// Compound-assignment operator, `None` meaning plain `=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    IntLiteral {
        value: i64,
        suffix: IntSuffix,
    },
    FloatLiteral(f64),
    CharLiteral(u8),
    /// Escape-decoded contents; adjacent literals already concatenated.
    StringLiteral(Symbol),
    Ident {
        name: Symbol,
        resolved: Option<Resolved>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Assign {
        op: AssignOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    PreIncDec {
        inc: bool,
        operand: Box<Expr>,
    },
    PostIncDec {
        inc: bool,
        operand: Box<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    /// `.` or `->` access; the field is resolved during analysis.
    Member {
        base: Box<Expr>,
        field: Symbol,
        arrow: bool,
    },
    Cast {
        type_name: Box<TypeName>,
        operand: Box<Expr>,
    },
    SizeofExpr(Box<Expr>),
    SizeofType(Box<TypeName>),
}
