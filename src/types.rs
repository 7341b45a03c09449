//! C type representation and layout.
//!
//! Types are interned in a per-build [`TypeRegistry`]; a [`TypeId`] is an
//! index into it, so equal ids mean structurally equal types. Struct and
//! union bodies live in a separate record table, which lets an incomplete
//! tag (`struct s;`) be referenced through pointers before its body is
//! known and completed in place later.

use crate::arch::{ArchInfo, TypeLayout};
use crate::ast::{RecordKeyword, TypeQualifiers};
use crate::error::{CResult, CompilerError};
use crate::source::SourceLoc;
use hashbrown::HashMap;
use log::debug;
use symbol_table::GlobalSymbol as Symbol;
use thin_vec::ThinVec;

/// Handle to an interned type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) u32);

/// Handle to a struct or union in the record table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId(pub u32);

/// Handle to an enum definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnumId(pub u32);

/// The resolved basic types. Plain `char` keeps its own kind so it can
/// stay distinct from both `signed char` and `unsigned char`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicKind {
    Char,
    SChar,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    LongLong,
    ULongLong,
    Float,
    Double,
}

impl BasicKind {
    pub fn is_integer(self) -> bool {
        !matches!(self, BasicKind::Float | BasicKind::Double)
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            BasicKind::Char
                | BasicKind::SChar
                | BasicKind::Short
                | BasicKind::Int
                | BasicKind::Long
                | BasicKind::LongLong
        )
    }

    /// Integer conversion rank. Only meaningful for integer kinds.
    pub fn rank(self) -> u8 {
        match self {
            BasicKind::Char | BasicKind::SChar | BasicKind::UChar => 1,
            BasicKind::Short | BasicKind::UShort => 2,
            BasicKind::Int | BasicKind::UInt => 3,
            BasicKind::Long | BasicKind::ULong => 4,
            BasicKind::LongLong | BasicKind::ULongLong => 5,
            BasicKind::Float | BasicKind::Double => 0,
        }
    }

    pub fn layout(self, arch: &ArchInfo) -> TypeLayout {
        match self {
            BasicKind::Char | BasicKind::SChar | BasicKind::UChar => arch.char_layout,
            BasicKind::Short | BasicKind::UShort => arch.short_layout,
            BasicKind::Int | BasicKind::UInt => arch.int_layout,
            BasicKind::Long | BasicKind::ULong => arch.long_layout,
            BasicKind::LongLong | BasicKind::ULongLong => arch.long_long_layout,
            BasicKind::Float => arch.float_layout,
            BasicKind::Double => arch.double_layout,
        }
    }
}

/// Structure of one type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CType {
    Void,
    Basic(BasicKind),
    Pointer(TypeId),
    Array {
        element: TypeId,
        size: Option<u32>,
    },
    Function {
        ret: TypeId,
        params: ThinVec<TypeId>,
        variadic: bool,
        /// Declared as `()` with no parameter information at all.
        unspecified: bool,
    },
    Record {
        keyword: RecordKeyword,
        id: RecordId,
    },
    Enum(EnumId),
    Qualified {
        inner: TypeId,
        quals: TypeQualifiers,
    },
}

/// Bit placement of a bitfield inside its storage unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitfieldInfo {
    pub width: u32,
    /// Bit offset from the least significant bit of the unit.
    pub bit_offset: u32,
}

/// A laid-out struct or union member.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: Symbol,
    pub ty: TypeId,
    pub offset: u32,
    pub bits: Option<BitfieldInfo>,
}

/// A struct or union tag. `fields` is `None` while the tag is incomplete.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub keyword: RecordKeyword,
    pub tag: Option<Symbol>,
    pub fields: Option<Vec<Field>>,
    pub layout: Option<TypeLayout>,
}

impl Record {
    pub fn is_complete(&self) -> bool {
        self.fields.is_some()
    }

    pub fn field(&self, name: Symbol) -> Option<&Field> {
        self.fields.as_ref()?.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDef {
    pub tag: Option<Symbol>,
    pub complete: bool,
}

/// A member as collected by the analyzer, before layout.
#[derive(Debug, Clone)]
pub struct PendingField {
    pub name: Option<Symbol>,
    pub ty: TypeId,
    pub bit_width: Option<u32>,
    pub loc: SourceLoc,
}

/// Per-build type interner and record table.
#[derive(Debug)]
pub struct TypeRegistry {
    arch: ArchInfo,
    types: Vec<CType>,
    lookup: HashMap<CType, TypeId>,
    records: Vec<Record>,
    enums: Vec<EnumDef>,
}

impl TypeRegistry {
    pub fn new(arch: ArchInfo) -> Self {
        TypeRegistry {
            arch,
            types: Vec::new(),
            lookup: HashMap::new(),
            records: Vec::new(),
            enums: Vec::new(),
        }
    }

    pub fn arch(&self) -> &ArchInfo {
        &self.arch
    }

    pub fn intern(&mut self, ty: CType) -> TypeId {
        if let Some(&id) = self.lookup.get(&ty) {
            return id;
        }
        let id = TypeId(self.types.len() as u32);
        self.types.push(ty.clone());
        self.lookup.insert(ty, id);
        id
    }

    pub fn kind(&self, id: TypeId) -> &CType {
        &self.types[id.0 as usize]
    }

    // Common constructors.

    pub fn void(&mut self) -> TypeId {
        self.intern(CType::Void)
    }

    pub fn basic(&mut self, kind: BasicKind) -> TypeId {
        self.intern(CType::Basic(kind))
    }

    pub fn int(&mut self) -> TypeId {
        self.basic(BasicKind::Int)
    }

    pub fn char_type(&mut self) -> TypeId {
        self.basic(BasicKind::Char)
    }

    pub fn pointer_to(&mut self, target: TypeId) -> TypeId {
        self.intern(CType::Pointer(target))
    }

    pub fn array_of(&mut self, element: TypeId, size: Option<u32>) -> TypeId {
        self.intern(CType::Array { element, size })
    }

    pub fn qualified(&mut self, inner: TypeId, quals: TypeQualifiers) -> TypeId {
        if quals.is_empty() {
            return inner;
        }
        // Fold nested qualifiers into one wrapper.
        if let CType::Qualified {
            inner: deep,
            quals: existing,
        } = *self.kind(inner)
        {
            return self.intern(CType::Qualified {
                inner: deep,
                quals: existing | quals,
            });
        }
        self.intern(CType::Qualified { inner, quals })
    }

    /// Strip qualifier wrappers.
    pub fn unqualified(&self, id: TypeId) -> TypeId {
        match *self.kind(id) {
            CType::Qualified { inner, .. } => inner,
            _ => id,
        }
    }

    // Record and enum tags.

    pub fn declare_record(&mut self, keyword: RecordKeyword, tag: Option<Symbol>) -> RecordId {
        let id = RecordId(self.records.len() as u32);
        self.records.push(Record {
            keyword,
            tag,
            fields: None,
            layout: None,
        });
        id
    }

    pub fn record(&self, id: RecordId) -> &Record {
        &self.records[id.0 as usize]
    }

    pub fn record_type(&mut self, keyword: RecordKeyword, id: RecordId) -> TypeId {
        self.intern(CType::Record { keyword, id })
    }

    pub fn declare_enum(&mut self, tag: Option<Symbol>, complete: bool) -> EnumId {
        let id = EnumId(self.enums.len() as u32);
        self.enums.push(EnumDef { tag, complete });
        id
    }

    pub fn enum_def(&self, id: EnumId) -> &EnumDef {
        &self.enums[id.0 as usize]
    }

    pub fn complete_enum(&mut self, id: EnumId) {
        self.enums[id.0 as usize].complete = true;
    }

    /// Lay out a struct or union body and complete its tag.
    pub fn complete_record(&mut self, id: RecordId, members: Vec<PendingField>) -> CResult<()> {
        let keyword = self.records[id.0 as usize].keyword;
        let laid_out = match keyword {
            RecordKeyword::Struct => self.layout_struct(&members)?,
            RecordKeyword::Union => self.layout_union(&members)?,
        };
        let rec = &mut self.records[id.0 as usize];
        debug!(
            "completed {} '{}': size {} align {}",
            match keyword {
                RecordKeyword::Struct => "struct",
                RecordKeyword::Union => "union",
            },
            rec.tag.map(|t| t.as_str()).unwrap_or("<anonymous>"),
            laid_out.1.size,
            laid_out.1.align
        );
        rec.fields = Some(laid_out.0);
        rec.layout = Some(laid_out.1);
        Ok(())
    }

    fn member_layout(&self, member: &PendingField) -> CResult<TypeLayout> {
        self.layout_of(member.ty).ok_or_else(|| {
            CompilerError::semantic("Member has incomplete type", member.loc)
        })
    }

    fn layout_struct(&self, members: &[PendingField]) -> CResult<(Vec<Field>, TypeLayout)> {
        let mut fields = Vec::new();
        let mut offset: u32 = 0;
        let mut align: u32 = 1;
        // Active bitfield unit: (start offset, unit size in bytes, bits used).
        let mut unit: Option<(u32, u32, u32)> = None;

        for member in members {
            let member_layout = self.member_layout(member)?;
            align = align.max(member_layout.align);

            match member.bit_width {
                None => {
                    if let Some((start, size, _)) = unit.take() {
                        offset = start + size;
                    }
                    offset = align_up(offset, member_layout.align);
                    if let Some(name) = member.name {
                        fields.push(Field {
                            name,
                            ty: member.ty,
                            offset,
                            bits: None,
                        });
                    }
                    offset += member_layout.size;
                }
                Some(width) => {
                    let unit_bits = member_layout.size * 8;
                    if width > unit_bits {
                        return Err(CompilerError::semantic(
                            "Bit-field width exceeds its type",
                            member.loc,
                        ));
                    }
                    // Zero width closes the current unit.
                    if width == 0 {
                        if let Some((start, size, _)) = unit.take() {
                            offset = start + size;
                        }
                        continue;
                    }
                    let bit_offset = match &mut unit {
                        Some((_, size, used))
                            if *size == member_layout.size && *used + width <= unit_bits =>
                        {
                            let at = *used;
                            *used += width;
                            at
                        }
                        _ => {
                            if let Some((start, size, _)) = unit.take() {
                                offset = start + size;
                            }
                            offset = align_up(offset, member_layout.align);
                            unit = Some((offset, member_layout.size, width));
                            0
                        }
                    };
                    if let Some(name) = member.name {
                        let start = unit.as_ref().map(|(s, _, _)| *s).unwrap_or(offset);
                        fields.push(Field {
                            name,
                            ty: member.ty,
                            offset: start,
                            bits: Some(BitfieldInfo { width, bit_offset }),
                        });
                    }
                }
            }
        }
        if let Some((start, size, _)) = unit.take() {
            offset = start + size;
        }
        let size = align_up(offset.max(1), align);
        Ok((fields, TypeLayout::new(size, align)))
    }

    fn layout_union(&self, members: &[PendingField]) -> CResult<(Vec<Field>, TypeLayout)> {
        let mut fields = Vec::new();
        let mut size: u32 = 1;
        let mut align: u32 = 1;
        for member in members {
            let member_layout = self.member_layout(member)?;
            align = align.max(member_layout.align);
            size = size.max(member_layout.size);
            if let Some(name) = member.name {
                let bits = match member.bit_width {
                    Some(width) => {
                        if width == 0 || width > member_layout.size * 8 {
                            return Err(CompilerError::semantic(
                                "Bit-field width exceeds its type",
                                member.loc,
                            ));
                        }
                        Some(BitfieldInfo {
                            width,
                            bit_offset: 0,
                        })
                    }
                    None => None,
                };
                fields.push(Field {
                    name,
                    ty: member.ty,
                    offset: 0,
                    bits,
                });
            }
        }
        Ok((fields, TypeLayout::new(align_up(size, align), align)))
    }

    // Size queries.

    /// Size and alignment, or `None` for incomplete types and `void`.
    pub fn layout_of(&self, id: TypeId) -> Option<TypeLayout> {
        match *self.kind(id) {
            CType::Void => None,
            CType::Basic(kind) => Some(kind.layout(&self.arch)),
            CType::Pointer(_) => Some(self.arch.pointer_layout),
            CType::Array { element, size } => {
                let size = size?;
                let elem = self.layout_of(element)?;
                Some(TypeLayout::new(elem.size * size, elem.align))
            }
            // Function designators measure as pointers.
            CType::Function { .. } => Some(self.arch.pointer_layout),
            CType::Record { id, .. } => self.record(id).layout,
            CType::Enum(_) => Some(self.arch.int_layout),
            CType::Qualified { inner, .. } => self.layout_of(inner),
        }
    }

    pub fn size_of(&self, id: TypeId) -> Option<u32> {
        self.layout_of(id).map(|l| l.size)
    }

    // Classification.

    pub fn is_integer(&self, id: TypeId) -> bool {
        match *self.kind(self.unqualified(id)) {
            CType::Basic(kind) => kind.is_integer(),
            CType::Enum(_) => true,
            _ => false,
        }
    }

    pub fn is_float(&self, id: TypeId) -> bool {
        matches!(
            *self.kind(self.unqualified(id)),
            CType::Basic(BasicKind::Float) | CType::Basic(BasicKind::Double)
        )
    }

    pub fn is_arithmetic(&self, id: TypeId) -> bool {
        self.is_integer(id) || self.is_float(id)
    }

    pub fn is_pointer(&self, id: TypeId) -> bool {
        matches!(*self.kind(self.unqualified(id)), CType::Pointer(_))
    }

    pub fn is_scalar(&self, id: TypeId) -> bool {
        self.is_arithmetic(id) || self.is_pointer(id)
    }

    pub fn is_void(&self, id: TypeId) -> bool {
        matches!(*self.kind(self.unqualified(id)), CType::Void)
    }

    pub fn is_record(&self, id: TypeId) -> bool {
        matches!(*self.kind(self.unqualified(id)), CType::Record { .. })
    }

    pub fn is_function(&self, id: TypeId) -> bool {
        matches!(*self.kind(self.unqualified(id)), CType::Function { .. })
    }

    pub fn pointee(&self, id: TypeId) -> Option<TypeId> {
        match *self.kind(self.unqualified(id)) {
            CType::Pointer(target) => Some(target),
            _ => None,
        }
    }

    pub fn element_of(&self, id: TypeId) -> Option<TypeId> {
        match *self.kind(self.unqualified(id)) {
            CType::Array { element, .. } => Some(element),
            _ => None,
        }
    }

    pub fn is_signed_integer(&self, id: TypeId) -> bool {
        match *self.kind(self.unqualified(id)) {
            CType::Basic(kind) => kind.is_integer() && kind.is_signed(),
            CType::Enum(_) => true,
            _ => false,
        }
    }

    // Conversions.

    /// Array-to-pointer and function-to-pointer decay.
    pub fn decay(&mut self, id: TypeId) -> TypeId {
        match *self.kind(self.unqualified(id)) {
            CType::Array { element, .. } => self.pointer_to(element),
            CType::Function { .. } => {
                let unq = self.unqualified(id);
                self.pointer_to(unq)
            }
            _ => id,
        }
    }

    /// Integer promotion: anything of rank below `int` becomes `int`.
    pub fn promote(&mut self, id: TypeId) -> TypeId {
        match *self.kind(self.unqualified(id)) {
            CType::Basic(kind) if kind.is_integer() && kind.rank() < BasicKind::Int.rank() => {
                self.int()
            }
            CType::Enum(_) => self.int(),
            _ => self.unqualified(id),
        }
    }

    /// Usual arithmetic conversions for a binary operator.
    pub fn usual_arithmetic(&mut self, lhs: TypeId, rhs: TypeId) -> TypeId {
        let l = self.unqualified(lhs);
        let r = self.unqualified(rhs);
        let lk = self.basic_kind(l);
        let rk = self.basic_kind(r);
        match (lk, rk) {
            (Some(BasicKind::Double), _) | (_, Some(BasicKind::Double)) => {
                self.basic(BasicKind::Double)
            }
            (Some(BasicKind::Float), _) | (_, Some(BasicKind::Float)) => {
                self.basic(BasicKind::Float)
            }
            _ => {
                let lp = self.promote(l);
                let rp = self.promote(r);
                if lp == rp {
                    return lp;
                }
                let lk = self.basic_kind(lp).unwrap_or(BasicKind::Int);
                let rk = self.basic_kind(rp).unwrap_or(BasicKind::Int);
                let kind = if lk.rank() != rk.rank() {
                    if lk.rank() > rk.rank() {
                        lk
                    } else {
                        rk
                    }
                } else if !lk.is_signed() {
                    lk
                } else {
                    rk
                };
                self.basic(kind)
            }
        }
    }

    fn basic_kind(&self, id: TypeId) -> Option<BasicKind> {
        match *self.kind(self.unqualified(id)) {
            CType::Basic(kind) => Some(kind),
            CType::Enum(_) => Some(BasicKind::Int),
            _ => None,
        }
    }

    /// Structural compatibility, ignoring top-level qualifiers.
    pub fn compatible(&self, a: TypeId, b: TypeId) -> bool {
        let a = self.unqualified(a);
        let b = self.unqualified(b);
        if a == b {
            return true;
        }
        match (self.kind(a), self.kind(b)) {
            (CType::Pointer(pa), CType::Pointer(pb)) => self.compatible(*pa, *pb),
            (
                CType::Array {
                    element: ea,
                    size: sa,
                },
                CType::Array {
                    element: eb,
                    size: sb,
                },
            ) => {
                self.compatible(*ea, *eb)
                    && (sa.is_none() || sb.is_none() || sa == sb)
            }
            (
                CType::Function {
                    ret: ra,
                    params: pa,
                    variadic: va,
                    unspecified: ua,
                },
                CType::Function {
                    ret: rb,
                    params: pb,
                    variadic: vb,
                    unspecified: ub,
                },
            ) => {
                if !self.compatible(*ra, *rb) {
                    return false;
                }
                if *ua || *ub {
                    return true;
                }
                va == vb
                    && pa.len() == pb.len()
                    && pa.iter().zip(pb.iter()).all(|(x, y)| self.compatible(*x, *y))
            }
            _ => false,
        }
    }

    /// Human-readable type spelling for diagnostics.
    pub fn display(&self, id: TypeId) -> String {
        match self.kind(id) {
            CType::Void => "void".to_string(),
            CType::Basic(kind) => match kind {
                BasicKind::Char => "char",
                BasicKind::SChar => "signed char",
                BasicKind::UChar => "unsigned char",
                BasicKind::Short => "short",
                BasicKind::UShort => "unsigned short",
                BasicKind::Int => "int",
                BasicKind::UInt => "unsigned int",
                BasicKind::Long => "long",
                BasicKind::ULong => "unsigned long",
                BasicKind::LongLong => "long long",
                BasicKind::ULongLong => "unsigned long long",
                BasicKind::Float => "float",
                BasicKind::Double => "double",
            }
            .to_string(),
            CType::Pointer(target) => format!("{}*", self.display(*target)),
            CType::Array { element, size } => match size {
                Some(n) => format!("{}[{}]", self.display(*element), n),
                None => format!("{}[]", self.display(*element)),
            },
            CType::Function { ret, params, .. } => {
                let args: Vec<String> = params.iter().map(|p| self.display(*p)).collect();
                format!("{}({})", self.display(*ret), args.join(", "))
            }
            CType::Record { keyword, id } => {
                let kw = match keyword {
                    RecordKeyword::Struct => "struct",
                    RecordKeyword::Union => "union",
                };
                match self.record(*id).tag {
                    Some(tag) => format!("{} {}", kw, tag),
                    None => format!("{} <anonymous>", kw),
                }
            }
            CType::Enum(id) => match self.enum_def(*id).tag {
                Some(tag) => format!("enum {}", tag),
                None => "enum <anonymous>".to_string(),
            },
            CType::Qualified { inner, quals } => {
                let mut s = String::new();
                if quals.contains(TypeQualifiers::CONST) {
                    s.push_str("const ");
                }
                if quals.contains(TypeQualifiers::VOLATILE) {
                    s.push_str("volatile ");
                }
                s.push_str(&self.display(*inner));
                s
            }
        }
    }
}

fn align_up(value: u32, align: u32) -> u32 {
    debug_assert!(align > 0);
    (value + align - 1) / align * align
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TypeRegistry {
        TypeRegistry::new(ArchInfo::example())
    }

    fn field(reg: &mut TypeRegistry, name: &str, ty: TypeId, bits: Option<u32>) -> PendingField {
        let _ = reg;
        PendingField {
            name: Some(Symbol::from(name)),
            ty,
            bit_width: bits,
            loc: SourceLoc::start(),
        }
    }

    #[test]
    fn interning_is_stable() {
        let mut reg = registry();
        let a = reg.int();
        let p1 = reg.pointer_to(a);
        let p2 = reg.pointer_to(a);
        assert_eq!(p1, p2);
        assert_ne!(a, p1);
    }

    #[test]
    fn array_layout() {
        let mut reg = registry();
        let int = reg.int();
        let arr = reg.array_of(int, Some(10));
        assert_eq!(reg.size_of(arr), Some(40));
        let open = reg.array_of(int, None);
        assert_eq!(reg.size_of(open), None);
    }

    #[test]
    fn struct_packing_with_bitfields() {
        // struct { int *next; int b:7, c:9, d; }
        let mut reg = registry();
        let int = reg.int();
        let ptr = reg.pointer_to(int);
        let members = vec![
            field(&mut reg, "next", ptr, None),
            field(&mut reg, "b", int, Some(7)),
            field(&mut reg, "c", int, Some(9)),
            field(&mut reg, "d", int, None),
        ];
        let rec = reg.declare_record(RecordKeyword::Struct, None);
        reg.complete_record(rec, members).unwrap();
        let record = reg.record(rec);
        let layout = record.layout.unwrap();
        // next at 0, b/c share the unit at 4, d at 8.
        assert_eq!(layout.size, 12);
        assert_eq!(record.field(Symbol::from("b")).unwrap().offset, 4);
        assert_eq!(
            record.field(Symbol::from("b")).unwrap().bits,
            Some(BitfieldInfo {
                width: 7,
                bit_offset: 0
            })
        );
        assert_eq!(
            record.field(Symbol::from("c")).unwrap().bits,
            Some(BitfieldInfo {
                width: 9,
                bit_offset: 7
            })
        );
        assert_eq!(record.field(Symbol::from("d")).unwrap().offset, 8);
    }

    #[test]
    fn bitfield_overflow_starts_new_unit() {
        let mut reg = registry();
        let int = reg.int();
        let members = vec![
            field(&mut reg, "a", int, Some(30)),
            field(&mut reg, "b", int, Some(10)),
        ];
        let rec = reg.declare_record(RecordKeyword::Struct, None);
        reg.complete_record(rec, members).unwrap();
        let record = reg.record(rec);
        assert_eq!(record.field(Symbol::from("b")).unwrap().offset, 4);
        assert_eq!(record.layout.unwrap().size, 8);
    }

    #[test]
    fn union_layout_is_max() {
        let mut reg = registry();
        let int = reg.int();
        let ll = reg.basic(BasicKind::LongLong);
        let members = vec![
            field(&mut reg, "i", int, None),
            field(&mut reg, "q", ll, None),
        ];
        let rec = reg.declare_record(RecordKeyword::Union, None);
        reg.complete_record(rec, members).unwrap();
        let record = reg.record(rec);
        assert_eq!(record.layout.unwrap().size, 8);
        assert_eq!(record.field(Symbol::from("q")).unwrap().offset, 0);
    }

    #[test]
    fn incomplete_record_has_no_size() {
        let mut reg = registry();
        let rec = reg.declare_record(RecordKeyword::Struct, Some(Symbol::from("s")));
        let ty = reg.record_type(RecordKeyword::Struct, rec);
        assert_eq!(reg.size_of(ty), None);
        // A pointer to it still measures fine.
        let ptr = reg.pointer_to(ty);
        assert_eq!(reg.size_of(ptr), Some(4));
    }

    #[test]
    fn usual_arithmetic_conversions() {
        let mut reg = registry();
        let ch = reg.char_type();
        let int = reg.int();
        let uint = reg.basic(BasicKind::UInt);
        let dbl = reg.basic(BasicKind::Double);
        assert_eq!(reg.usual_arithmetic(ch, ch), int);
        assert_eq!(reg.usual_arithmetic(int, uint), uint);
        assert_eq!(reg.usual_arithmetic(int, dbl), dbl);
    }

    #[test]
    fn unspecified_params_are_compatible() {
        let mut reg = registry();
        let int = reg.int();
        let void = reg.void();
        let f1 = reg.intern(CType::Function {
            ret: void,
            params: ThinVec::new(),
            variadic: false,
            unspecified: true,
        });
        let f2 = reg.intern(CType::Function {
            ret: void,
            params: std::iter::once(int).collect(),
            variadic: false,
            unspecified: false,
        });
        assert!(reg.compatible(f1, f2));
    }

    #[test]
    fn function_measures_as_pointer() {
        let mut reg = registry();
        let int = reg.int();
        let ptr = reg.pointer_to(int);
        let f = reg.intern(CType::Function {
            ret: ptr,
            params: ThinVec::new(),
            variadic: false,
            unspecified: false,
        });
        assert_eq!(reg.size_of(f), Some(4));
    }

    #[test]
    fn display_spellings() {
        let mut reg = registry();
        let int = reg.int();
        let ptr = reg.pointer_to(int);
        let arr = reg.array_of(ptr, Some(3));
        assert_eq!(reg.display(arr), "int*[3]");
    }
}
