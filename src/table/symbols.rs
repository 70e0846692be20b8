// src/table/symbols.rs
//
// Resolved type metadata: one TypeSymbol per table index, with a
// kind-discriminated payload. Symbols refer to other symbols only through
// TypeId handles, never by reference; all traversal goes through the Table.

use crate::ast::Expr;
use crate::span::Pos;
use crate::table::TypeId;

/// Source language a symbol or function originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    Veld,
    C,
    Js,
}

/// Closed set of type kinds. Primitive kinds are flat so the reserved
/// builtin window and numeric promotion can match on them directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Placeholder,
    Void,
    VoidPtr,
    Bool,
    None,
    Int,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    IntLiteral,
    F32,
    F64,
    FloatLiteral,
    Char,
    Rune,
    String,
    Alias,
    Array,
    ArrayFixed,
    Map,
    Chan,
    Thread,
    Promise,
    MultiReturn,
    Function,
    Struct,
    Interface,
    SumType,
    Aggregate,
    Enum,
    GenericInst,
}

impl TypeKind {
    pub fn is_int(self) -> bool {
        matches!(
            self,
            TypeKind::Int
                | TypeKind::I8
                | TypeKind::I16
                | TypeKind::I32
                | TypeKind::I64
                | TypeKind::U8
                | TypeKind::U16
                | TypeKind::U32
                | TypeKind::U64
                | TypeKind::IntLiteral
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, TypeKind::F32 | TypeKind::F64 | TypeKind::FloatLiteral)
    }

    pub fn is_number(self) -> bool {
        self.is_int() || self.is_float()
    }

    pub fn is_literal(self) -> bool {
        matches!(self, TypeKind::IntLiteral | TypeKind::FloatLiteral)
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            TypeKind::Int
                | TypeKind::I8
                | TypeKind::I16
                | TypeKind::I32
                | TypeKind::I64
                | TypeKind::IntLiteral
        )
    }

    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            TypeKind::U8 | TypeKind::U16 | TypeKind::U32 | TypeKind::U64
        )
    }

    /// Bit width for sized numerics; machine-word kinds report 64.
    pub fn bit_width(self) -> u32 {
        match self {
            TypeKind::I8 | TypeKind::U8 => 8,
            TypeKind::I16 | TypeKind::U16 => 16,
            TypeKind::I32 | TypeKind::U32 | TypeKind::F32 => 32,
            TypeKind::Int
            | TypeKind::I64
            | TypeKind::U64
            | TypeKind::F64
            | TypeKind::IntLiteral
            | TypeKind::FloatLiteral => 64,
            _ => 0,
        }
    }

    pub fn is_primitive(self) -> bool {
        self.is_number()
            || matches!(
                self,
                TypeKind::Void
                    | TypeKind::VoidPtr
                    | TypeKind::Bool
                    | TypeKind::None
                    | TypeKind::Char
                    | TypeKind::Rune
                    | TypeKind::String
            )
    }
}

/// A struct, interface or sum-type field.
#[derive(Debug, Clone, Default)]
pub struct StructField {
    pub name: String,
    pub typ: TypeId,
    pub is_mut: bool,
    pub is_pub: bool,
    pub is_global: bool,
    pub attrs: Vec<String>,
    pub has_default: bool,
    pub default_expr: Option<Box<Expr>>,
    pub pos: Pos,
}

impl StructField {
    pub fn new(name: impl Into<String>, typ: TypeId) -> Self {
        Self {
            name: name.into(),
            typ,
            ..Self::default()
        }
    }
}

/// One function parameter.
#[derive(Debug, Clone, Default)]
pub struct FnParam {
    pub name: String,
    pub typ: TypeId,
    pub is_mut: bool,
    /// Receiver-style parameters injected by desugaring, hidden from arity.
    pub is_hidden: bool,
}

impl FnParam {
    pub fn new(name: impl Into<String>, typ: TypeId) -> Self {
        Self {
            name: name.into(),
            typ,
            is_mut: false,
            is_hidden: false,
        }
    }
}

/// Attribute set recognized on function declarations.
#[derive(Debug, Clone, Default)]
pub struct FnAttrs {
    pub is_pub: bool,
    pub is_deprecated: bool,
    pub deprecation_msg: String,
    pub is_noreturn: bool,
    pub is_unsafe: bool,
    pub is_main: bool,
    pub is_test: bool,
    pub is_variadic: bool,
    pub is_keep_alive: bool,
    pub is_method: bool,
    pub no_body: bool,
    /// `[if tag]` — call sites are elided when the tag is disabled.
    pub ctdefine: Option<String>,
}

/// Function descriptor: free functions, methods, and fn-type payloads.
#[derive(Debug, Clone, Default)]
pub struct FnSig {
    pub name: String,
    pub module: String,
    /// ZERO for free functions.
    pub receiver_type: TypeId,
    pub receiver_is_mut: bool,
    pub params: Vec<FnParam>,
    pub return_type: TypeId,
    pub attrs: FnAttrs,
    pub language: Language,
    pub generic_names: Vec<String>,
    /// Concrete tuples observed at call sites of this signature.
    pub concrete_types: Vec<TypeId>,
    pub pos: Pos,
}

impl FnSig {
    /// Fully-qualified registration key.
    pub fn qualified_name(&self) -> String {
        if self.module.is_empty() || self.module == "builtin" {
            self.name.clone()
        } else {
            format!("{}.{}", self.module, self.name)
        }
    }

    pub fn is_generic(&self) -> bool {
        !self.generic_names.is_empty()
    }

    /// Parameters that count toward call arity.
    pub fn visible_params(&self) -> impl Iterator<Item = &FnParam> {
        self.params.iter().filter(|p| !p.is_hidden)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StructInfo {
    pub fields: Vec<StructField>,
    pub embeds: Vec<TypeId>,
    pub generic_types: Vec<TypeId>,
    pub concrete_types: Vec<TypeId>,
    pub is_generic: bool,
    pub is_union: bool,
    pub is_heap: bool,
}

#[derive(Debug, Clone, Default)]
pub struct InterfaceInfo {
    pub fields: Vec<StructField>,
    pub methods: Vec<FnSig>,
    pub embeds: Vec<TypeId>,
    /// Types recorded as implementing this interface.
    pub types: Vec<TypeId>,
    pub generic_types: Vec<TypeId>,
    pub concrete_types: Vec<TypeId>,
    pub is_generic: bool,
    /// `[single_impl]` — stop recording implementations after the first.
    pub single_impl: bool,
    /// Embedded methods/fields already folded in (memoized expansion).
    pub is_expanded: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SumTypeInfo {
    pub variants: Vec<TypeId>,
    /// Fields shared by every variant, resolved lazily on first query.
    pub fields: Vec<StructField>,
    pub found_fields: bool,
    pub generic_types: Vec<TypeId>,
    pub concrete_types: Vec<TypeId>,
    pub is_generic: bool,
}

/// Synthetic union of sum-type variants matched simultaneously; exposes
/// only the intersection of their members.
#[derive(Debug, Clone, Default)]
pub struct AggregateInfo {
    pub types: Vec<TypeId>,
    /// Intersection of fields, cached on first query.
    pub fields: Vec<StructField>,
    pub found_fields: bool,
}

#[derive(Debug, Clone, Default)]
pub struct EnumVariant {
    pub name: String,
    pub value: Option<i64>,
    pub pos: Pos,
}

#[derive(Debug, Clone, Default)]
pub struct EnumInfo {
    pub variants: Vec<EnumVariant>,
    pub is_flag: bool,
    pub is_multi_allowed: bool,
}

impl EnumInfo {
    pub fn variant_names(&self) -> impl Iterator<Item = &str> {
        self.variants.iter().map(|v| v.name.as_str())
    }

    pub fn has_variant(&self, name: &str) -> bool {
        self.variants.iter().any(|v| v.name == name)
    }
}

/// Kind-specific payload of a TypeSymbol.
#[derive(Debug, Clone, Default)]
pub enum TypeInfo {
    #[default]
    Empty,
    Alias {
        parent: TypeId,
    },
    Array {
        elem: TypeId,
        nr_dims: u32,
    },
    ArrayFixed {
        elem: TypeId,
        size: i64,
        size_expr: Option<Box<Expr>>,
    },
    Map {
        key: TypeId,
        value: TypeId,
    },
    Chan {
        elem: TypeId,
        is_mut: bool,
    },
    Thread {
        ret: TypeId,
    },
    Promise {
        ret: TypeId,
    },
    MultiReturn {
        types: Vec<TypeId>,
    },
    Function {
        sig: Box<FnSig>,
    },
    Struct(StructInfo),
    Interface(InterfaceInfo),
    SumType(SumTypeInfo),
    Aggregate(AggregateInfo),
    Enum(EnumInfo),
    GenericInst {
        parent_idx: u32,
        concrete_types: Vec<TypeId>,
    },
}

/// Resolved metadata for one table index.
#[derive(Debug, Clone, Default)]
pub struct TypeSymbol {
    /// Canonical, deterministic spelling; the intern key.
    pub name: String,
    /// C-identifier-safe mangled spelling.
    pub cname: String,
    pub module: String,
    pub kind: TypeKind,
    pub info: TypeInfo,
    /// Alias chains and generic instances point back here; 0 = none.
    pub parent_idx: u32,
    pub methods: Vec<FnSig>,
    pub language: Language,
    pub is_pub: bool,
}

impl Default for TypeKind {
    fn default() -> Self {
        TypeKind::Placeholder
    }
}

impl TypeSymbol {
    pub fn placeholder(name: impl Into<String>, language: Language) -> Self {
        let name = name.into();
        let module = name
            .rsplit_once('.')
            .map(|(m, _)| m.to_string())
            .unwrap_or_default();
        Self {
            cname: mangle(&name),
            name,
            module,
            kind: TypeKind::Placeholder,
            language,
            ..Self::default()
        }
    }

    /// Method defined directly on this symbol (no parent/embed traversal).
    pub fn own_method(&self, name: &str) -> Option<&FnSig> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn register_method(&mut self, sig: FnSig) {
        if let Some(existing) = self.methods.iter_mut().find(|m| m.name == sig.name) {
            *existing = sig;
        } else {
            self.methods.push(sig);
        }
    }

    pub fn struct_info(&self) -> Option<&StructInfo> {
        match &self.info {
            TypeInfo::Struct(info) => Some(info),
            _ => None,
        }
    }

    pub fn interface_info(&self) -> Option<&InterfaceInfo> {
        match &self.info {
            TypeInfo::Interface(info) => Some(info),
            _ => None,
        }
    }

    pub fn enum_info(&self) -> Option<&EnumInfo> {
        match &self.info {
            TypeInfo::Enum(info) => Some(info),
            _ => None,
        }
    }

    pub fn sumtype_info(&self) -> Option<&SumTypeInfo> {
        match &self.info {
            TypeInfo::SumType(info) => Some(info),
            _ => None,
        }
    }

    /// Unqualified name (after the last dot).
    pub fn short_name(&self) -> &str {
        self.name.rsplit_once('.').map(|(_, s)| s).unwrap_or(&self.name)
    }
}

/// C-identifier-safe rendition of a canonical name.
pub fn mangle(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        match ch {
            '.' => out.push_str("__"),
            '[' => out.push_str("arr_"),
            ']' | ' ' => {}
            '<' | ',' => out.push('_'),
            '>' => {}
            '&' => out.push_str("ptr_"),
            '?' => out.push_str("opt_"),
            '(' => out.push('_'),
            ')' => {}
            c if c.is_ascii_alphanumeric() || c == '_' => out.push(c),
            _ => out.push('_'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_infers_module_from_dotted_name() {
        let sym = TypeSymbol::placeholder("geometry.Shape", Language::Veld);
        assert_eq!(sym.module, "geometry");
        assert_eq!(sym.short_name(), "Shape");
        assert_eq!(sym.kind, TypeKind::Placeholder);
    }

    #[test]
    fn placeholder_without_module() {
        let sym = TypeSymbol::placeholder("Shape", Language::Veld);
        assert_eq!(sym.module, "");
        assert_eq!(sym.short_name(), "Shape");
    }

    #[test]
    fn register_method_replaces_same_name() {
        let mut sym = TypeSymbol::placeholder("Foo", Language::Veld);
        let mut m = FnSig {
            name: "area".into(),
            return_type: TypeId::new(5),
            ..FnSig::default()
        };
        sym.register_method(m.clone());
        m.return_type = TypeId::new(6);
        sym.register_method(m);
        assert_eq!(sym.methods.len(), 1);
        assert_eq!(sym.own_method("area").unwrap().return_type, TypeId::new(6));
    }

    #[test]
    fn kind_predicates() {
        assert!(TypeKind::I32.is_int());
        assert!(TypeKind::I32.is_signed());
        assert!(TypeKind::U16.is_unsigned());
        assert!(TypeKind::FloatLiteral.is_float());
        assert!(TypeKind::FloatLiteral.is_literal());
        assert!(!TypeKind::String.is_number());
        assert_eq!(TypeKind::U16.bit_width(), 16);
        assert_eq!(TypeKind::Int.bit_width(), 64);
    }

    #[test]
    fn mangled_names_are_identifier_safe() {
        assert_eq!(mangle("[]int"), "arr_int");
        assert_eq!(mangle("map[string]int"), "maparr_stringint");
        assert_eq!(mangle("main.Box<int>"), "main__Box_int");
        for name in ["[]&main.Foo", "fn (int, string) bool", "?[]u8"] {
            let m = mangle(name);
            assert!(
                m.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'),
                "{m}"
            );
        }
    }

    #[test]
    fn qualified_fn_name() {
        let f = FnSig {
            name: "push".into(),
            module: "collections".into(),
            ..FnSig::default()
        };
        assert_eq!(f.qualified_name(), "collections.push");
        let b = FnSig {
            name: "println".into(),
            module: "builtin".into(),
            ..FnSig::default()
        };
        assert_eq!(b.qualified_name(), "println");
    }
}
