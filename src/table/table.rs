// src/table/table.rs
//
// The process-wide type registry: symbol storage, canonical-name interning,
// composite type constructors, and TypeId arithmetic that needs symbol
// metadata. Pure data + queries; diagnostics belong to the checker.

use hashbrown::HashMap;
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::span::Pos;
use crate::table::symbols::{
    mangle, AggregateInfo, EnumInfo, FnSig, InterfaceInfo, Language, StructField, TypeInfo,
    TypeKind, TypeSymbol,
};
use crate::table::type_id::{TypeFlags, TypeId, TypeIdVec};

// ----------------------------------------------------------------------
// Reserved builtin indices. The window 20..=23 (string/array/map/error)
// may be redefined by user-mode declarations; the overwrite preserves kind.
// ----------------------------------------------------------------------

pub const VOID_TYPE: TypeId = TypeId::from_idx(1);
pub const VOIDPTR_TYPE: TypeId = TypeId::from_idx(2);
pub const BOOL_TYPE: TypeId = TypeId::from_idx(3);
pub const NONE_TYPE: TypeId = TypeId::from_idx(4);
pub const INT_TYPE: TypeId = TypeId::from_idx(5);
pub const I8_TYPE: TypeId = TypeId::from_idx(6);
pub const I16_TYPE: TypeId = TypeId::from_idx(7);
pub const I32_TYPE: TypeId = TypeId::from_idx(8);
pub const I64_TYPE: TypeId = TypeId::from_idx(9);
pub const U8_TYPE: TypeId = TypeId::from_idx(10);
pub const U16_TYPE: TypeId = TypeId::from_idx(11);
pub const U32_TYPE: TypeId = TypeId::from_idx(12);
pub const U64_TYPE: TypeId = TypeId::from_idx(13);
pub const INT_LITERAL_TYPE: TypeId = TypeId::from_idx(14);
pub const F32_TYPE: TypeId = TypeId::from_idx(15);
pub const F64_TYPE: TypeId = TypeId::from_idx(16);
pub const FLOAT_LITERAL_TYPE: TypeId = TypeId::from_idx(17);
pub const CHAR_TYPE: TypeId = TypeId::from_idx(18);
pub const RUNE_TYPE: TypeId = TypeId::from_idx(19);
pub const STRING_TYPE: TypeId = TypeId::from_idx(20);
pub const ARRAY_TYPE: TypeId = TypeId::from_idx(21);
pub const MAP_TYPE: TypeId = TypeId::from_idx(22);
pub const ERROR_TYPE: TypeId = TypeId::from_idx(23);

const BUILTIN_REDEFINABLE: std::ops::RangeInclusive<u32> = 20..=23;

/// Invoked on table invariant violations. Must not return.
pub type PanicHandler = fn(&str) -> !;

#[track_caller]
fn default_panic_handler(msg: &str) -> ! {
    panic!("type table: {msg}");
}

pub struct Table {
    pub(crate) types: Vec<TypeSymbol>,
    pub(crate) type_idxs: HashMap<String, u32>,
    pub(crate) fns: FxHashMap<String, FnSig>,
    pub(crate) fn_generic_types: FxHashMap<String, Vec<TypeIdVec>>,
    panic_handler: PanicHandler,
}

impl Table {
    pub fn new() -> Self {
        let mut table = Self {
            types: Vec::with_capacity(64),
            type_idxs: HashMap::new(),
            fns: FxHashMap::default(),
            fn_generic_types: FxHashMap::default(),
            panic_handler: default_panic_handler,
        };
        table.register_builtin_symbols();
        table
    }

    pub fn set_panic_handler(&mut self, handler: PanicHandler) {
        self.panic_handler = handler;
    }

    fn register_builtin_symbols(&mut self) {
        // Index 0 is the unresolved sentinel; resolving it is a bug.
        self.types.push(TypeSymbol {
            name: "<unresolved>".into(),
            cname: "unresolved".into(),
            kind: TypeKind::Placeholder,
            ..TypeSymbol::default()
        });

        let prims: &[(&str, TypeKind)] = &[
            ("void", TypeKind::Void),
            ("voidptr", TypeKind::VoidPtr),
            ("bool", TypeKind::Bool),
            ("none", TypeKind::None),
            ("int", TypeKind::Int),
            ("i8", TypeKind::I8),
            ("i16", TypeKind::I16),
            ("i32", TypeKind::I32),
            ("i64", TypeKind::I64),
            ("u8", TypeKind::U8),
            ("u16", TypeKind::U16),
            ("u32", TypeKind::U32),
            ("u64", TypeKind::U64),
            ("int literal", TypeKind::IntLiteral),
            ("f32", TypeKind::F32),
            ("f64", TypeKind::F64),
            ("float literal", TypeKind::FloatLiteral),
            ("char", TypeKind::Char),
            ("rune", TypeKind::Rune),
            ("string", TypeKind::String),
        ];
        for (name, kind) in prims {
            self.register_sym(TypeSymbol {
                name: (*name).into(),
                cname: mangle(name),
                module: "builtin".into(),
                kind: *kind,
                is_pub: true,
                ..TypeSymbol::default()
            });
        }

        self.register_sym(TypeSymbol {
            name: "array".into(),
            cname: "array".into(),
            module: "builtin".into(),
            kind: TypeKind::Array,
            info: TypeInfo::Array {
                elem: VOID_TYPE,
                nr_dims: 1,
            },
            is_pub: true,
            ..TypeSymbol::default()
        });
        self.register_sym(TypeSymbol {
            name: "map".into(),
            cname: "map".into(),
            module: "builtin".into(),
            kind: TypeKind::Map,
            info: TypeInfo::Map {
                key: VOID_TYPE,
                value: VOID_TYPE,
            },
            is_pub: true,
            ..TypeSymbol::default()
        });

        // The builtin error interface: satisfied by any type with a
        // compatible msg method, and by `none`.
        let error_iface = InterfaceInfo {
            methods: vec![
                FnSig {
                    name: "msg".into(),
                    module: "builtin".into(),
                    return_type: STRING_TYPE,
                    ..FnSig::default()
                },
                FnSig {
                    name: "code".into(),
                    module: "builtin".into(),
                    return_type: INT_TYPE,
                    ..FnSig::default()
                },
            ],
            ..InterfaceInfo::default()
        };
        self.register_sym(TypeSymbol {
            name: "error".into(),
            cname: "error".into(),
            module: "builtin".into(),
            kind: TypeKind::Interface,
            info: TypeInfo::Interface(error_iface),
            is_pub: true,
            ..TypeSymbol::default()
        });

        debug_assert_eq!(self.type_idxs["error"], ERROR_TYPE.idx());
    }

    // ------------------------------------------------------------------
    // Symbol access
    // ------------------------------------------------------------------

    /// Resolve a handle to its symbol. Index 0 and out-of-range indices are
    /// invariant violations and go through the panic handler.
    #[track_caller]
    pub fn sym(&self, typ: TypeId) -> &TypeSymbol {
        let idx = typ.idx();
        if idx == 0 {
            (self.panic_handler)("sym() called on the unresolved sentinel");
        }
        match self.types.get(idx as usize) {
            Some(sym) => sym,
            None => (self.panic_handler)(&format!("sym() index {idx} out of range")),
        }
    }

    pub fn sym_by_idx(&self, idx: u32) -> &TypeSymbol {
        self.sym(TypeId::new(idx))
    }

    pub(crate) fn sym_mut(&mut self, typ: TypeId) -> &mut TypeSymbol {
        let idx = typ.idx();
        if idx == 0 || idx as usize >= self.types.len() {
            (self.panic_handler)(&format!("sym_mut() invalid index {idx}"));
        }
        &mut self.types[idx as usize]
    }

    /// Follow the alias chain to a non-alias symbol. Well-formed chains are
    /// short; a runaway chain is an invariant violation.
    #[track_caller]
    pub fn final_sym(&self, typ: TypeId) -> &TypeSymbol {
        let mut sym = self.sym(typ);
        for _ in 0..100 {
            if sym.kind != TypeKind::Alias {
                return sym;
            }
            if sym.parent_idx == 0 {
                return sym;
            }
            sym = self.sym_by_idx(sym.parent_idx);
        }
        (self.panic_handler)(&format!("alias chain for `{}` does not terminate", sym.name));
    }

    /// Resolve `typ` through aliases to the underlying kind.
    pub fn final_kind(&self, typ: TypeId) -> TypeKind {
        if typ.is_unresolved() {
            return TypeKind::Placeholder;
        }
        self.final_sym(typ).kind
    }

    /// Dereference an alias only when it renames a primitive numeric type;
    /// other handles pass through unchanged.
    pub fn unalias_num_type(&self, typ: TypeId) -> TypeId {
        if typ.is_unresolved() {
            return typ;
        }
        let sym = self.sym(typ);
        if sym.kind == TypeKind::Alias && sym.parent_idx != 0 {
            let parent = self.sym_by_idx(sym.parent_idx);
            if parent.kind.is_number() {
                return typ.derive(sym.parent_idx);
            }
        }
        typ
    }

    pub fn find_type_idx(&self, name: &str) -> u32 {
        self.type_idxs.get(name).copied().unwrap_or(0)
    }

    pub fn find_sym(&self, name: &str) -> Option<&TypeSymbol> {
        self.type_idxs
            .get(name)
            .map(|&idx| &self.types[idx as usize])
    }

    pub fn find_sym_and_idx(&self, name: &str) -> Option<(&TypeSymbol, u32)> {
        self.type_idxs
            .get(name)
            .map(|&idx| (&self.types[idx as usize], idx))
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Intern a symbol under its canonical name and return a stable handle.
    ///
    /// A placeholder at the same name is overwritten in place (keeping any
    /// methods accumulated on it); a builtin in the redefinable window keeps
    /// its kind but takes the new payload; anything else dedups silently in
    /// favor of the earlier registration.
    pub fn register_sym(&mut self, mut sym: TypeSymbol) -> TypeId {
        if sym.cname.is_empty() {
            sym.cname = mangle(&sym.name);
        }
        if let Some(&idx) = self.type_idxs.get(&sym.name) {
            let existing = &self.types[idx as usize];
            if existing.kind == TypeKind::Placeholder && idx != 0 {
                trace!(name = %sym.name, idx, "overwriting placeholder");
                let accumulated = existing.methods.clone();
                for m in accumulated {
                    if sym.own_method(&m.name).is_none() {
                        sym.methods.push(m);
                    }
                }
                self.types[idx as usize] = sym;
                return TypeId::new(idx);
            }
            if BUILTIN_REDEFINABLE.contains(&idx) && sym.language == Language::Veld {
                trace!(name = %sym.name, idx, "redefining builtin payload");
                let kind = existing.kind;
                let accumulated = existing.methods.clone();
                for m in accumulated {
                    if sym.own_method(&m.name).is_none() {
                        sym.methods.push(m);
                    }
                }
                sym.kind = kind;
                self.types[idx as usize] = sym;
                return TypeId::new(idx);
            }
            trace!(name = %sym.name, idx, "duplicate registration kept earlier symbol");
            return TypeId::new(idx);
        }

        let idx = self.types.len() as u32;
        self.type_idxs.insert(sym.name.clone(), idx);
        // `main` symbols are additionally reachable by their short name.
        if let Some(short) = sym.name.strip_prefix("main.") {
            self.type_idxs.entry_ref(short).or_insert(idx);
        }
        trace!(name = %sym.name, idx, kind = ?sym.kind, "registered type symbol");
        self.types.push(sym);
        TypeId::new(idx)
    }

    /// Register a forward declaration for a name referenced before its
    /// declaration; module is inferred from the dotted prefix.
    pub fn add_placeholder_type(&mut self, name: &str, language: Language) -> TypeId {
        if let Some(&idx) = self.type_idxs.get(name) {
            return TypeId::new(idx);
        }
        self.register_sym(TypeSymbol::placeholder(name, language))
    }

    // ------------------------------------------------------------------
    // Canonical names
    // ------------------------------------------------------------------

    /// Deterministic spelling of a handle, usable as an intern key.
    pub fn type_name(&self, typ: TypeId) -> String {
        let base = if typ.idx() == 0 {
            "unresolved".to_string()
        } else {
            self.sym(typ).name.clone()
        };
        let mut out = String::new();
        if typ.is_variadic() {
            out.push_str("...");
        }
        if typ.is_optional() {
            out.push('?');
        }
        for _ in 0..typ.nr_muls() {
            out.push('&');
        }
        out.push_str(&base);
        out
    }

    /// Human-oriented spelling for diagnostics.
    pub fn type_to_str(&self, typ: TypeId) -> String {
        self.type_name(typ)
    }

    fn names(&self, types: &[TypeId]) -> String {
        types
            .iter()
            .map(|&t| self.type_name(t))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn fn_type_name(&self, sig: &FnSig) -> String {
        let params = self.names(
            &sig.params
                .iter()
                .filter(|p| !p.is_hidden)
                .map(|p| p.typ)
                .collect::<Vec<_>>(),
        );
        if sig.return_type == VOID_TYPE || sig.return_type.is_unresolved() {
            format!("fn ({params})")
        } else {
            format!("fn ({params}) {}", self.type_name(sig.return_type))
        }
    }

    // ------------------------------------------------------------------
    // Composite constructors: look up by canonical name, register on miss.
    // ------------------------------------------------------------------

    fn find_or_register(&mut self, name: String, build: impl FnOnce() -> (TypeKind, TypeInfo)) -> TypeId {
        if let Some(&idx) = self.type_idxs.get(&name) {
            return TypeId::new(idx);
        }
        let (kind, info) = build();
        self.register_sym(TypeSymbol {
            cname: mangle(&name),
            name,
            module: "builtin".into(),
            kind,
            info,
            is_pub: true,
            ..TypeSymbol::default()
        })
    }

    pub fn find_or_register_array(&mut self, elem: TypeId) -> TypeId {
        let name = format!("[]{}", self.type_name(elem));
        self.find_or_register(name, || (TypeKind::Array, TypeInfo::Array { elem, nr_dims: 1 }))
    }

    pub fn find_or_register_array_with_dims(&mut self, elem: TypeId, nr_dims: u32) -> TypeId {
        if nr_dims <= 1 {
            return self.find_or_register_array(elem);
        }
        let inner = self.find_or_register_array_with_dims(elem, nr_dims - 1);
        self.find_or_register_array(inner)
    }

    pub fn find_or_register_array_fixed(
        &mut self,
        elem: TypeId,
        size: i64,
        size_expr: Option<Box<crate::ast::Expr>>,
    ) -> TypeId {
        let name = format!("[{size}]{}", self.type_name(elem));
        self.find_or_register(name, || {
            (
                TypeKind::ArrayFixed,
                TypeInfo::ArrayFixed {
                    elem,
                    size,
                    size_expr,
                },
            )
        })
    }

    pub fn find_or_register_map(&mut self, key: TypeId, value: TypeId) -> TypeId {
        let name = format!("map[{}]{}", self.type_name(key), self.type_name(value));
        self.find_or_register(name, || (TypeKind::Map, TypeInfo::Map { key, value }))
    }

    pub fn find_or_register_chan(&mut self, elem: TypeId, is_mut: bool) -> TypeId {
        let name = if is_mut {
            format!("chan mut {}", self.type_name(elem))
        } else {
            format!("chan {}", self.type_name(elem))
        };
        self.find_or_register(name, || (TypeKind::Chan, TypeInfo::Chan { elem, is_mut }))
    }

    pub fn find_or_register_thread(&mut self, ret: TypeId) -> TypeId {
        let name = if ret == VOID_TYPE {
            "thread".to_string()
        } else {
            format!("thread {}", self.type_name(ret))
        };
        self.find_or_register(name, || (TypeKind::Thread, TypeInfo::Thread { ret }))
    }

    pub fn find_or_register_promise(&mut self, ret: TypeId) -> TypeId {
        let name = format!("promise<{}>", self.type_name(ret));
        self.find_or_register(name, || (TypeKind::Promise, TypeInfo::Promise { ret }))
    }

    pub fn find_or_register_multi_return(&mut self, types: Vec<TypeId>) -> TypeId {
        let name = format!("({})", self.names(&types));
        self.find_or_register(name, || {
            (TypeKind::MultiReturn, TypeInfo::MultiReturn { types })
        })
    }

    pub fn find_or_register_fn_type(
        &mut self,
        module: &str,
        sig: FnSig,
        is_anon: bool,
        has_decl: bool,
    ) -> TypeId {
        let is_named = has_decl && !is_anon && !sig.name.is_empty();
        let name = if is_named {
            if module.is_empty() {
                sig.name.clone()
            } else {
                format!("{module}.{}", sig.name)
            }
        } else {
            self.fn_type_name(&sig)
        };
        if let Some(&idx) = self.type_idxs.get(&name) {
            return TypeId::new(idx);
        }
        self.register_sym(TypeSymbol {
            cname: mangle(&name),
            name,
            module: module.to_string(),
            kind: TypeKind::Function,
            info: TypeInfo::Function { sig: Box::new(sig) },
            is_pub: true,
            ..TypeSymbol::default()
        })
    }

    /// The synthetic union of several sum-type variants matched at once.
    pub fn find_or_register_aggregate(&mut self, types: Vec<TypeId>) -> TypeId {
        let name = types
            .iter()
            .map(|&t| self.type_name(t))
            .collect::<Vec<_>>()
            .join(" | ");
        self.find_or_register(name, || {
            (
                TypeKind::Aggregate,
                TypeInfo::Aggregate(AggregateInfo {
                    types,
                    ..AggregateInfo::default()
                }),
            )
        })
    }

    pub fn find_or_register_enum(&mut self, name: &str, module: &str, info: EnumInfo) -> TypeId {
        if let Some(&idx) = self.type_idxs.get(name) {
            return TypeId::new(idx);
        }
        self.register_sym(TypeSymbol {
            name: name.to_string(),
            cname: mangle(name),
            module: module.to_string(),
            kind: TypeKind::Enum,
            info: TypeInfo::Enum(info),
            ..TypeSymbol::default()
        })
    }

    // ------------------------------------------------------------------
    // Handle arithmetic that needs symbol metadata
    // ------------------------------------------------------------------

    /// The logical element produced by indexing into `typ`:
    /// arrays yield their element, maps their value, variadics their base,
    /// string indexing yields a byte, pointers dereference; anything else
    /// is void.
    pub fn value_type(&self, typ: TypeId) -> TypeId {
        if typ.is_variadic() {
            return typ.clear_flag(TypeFlags::VARIADIC);
        }
        if typ.is_unresolved() {
            return VOID_TYPE;
        }
        let sym = self.final_sym(typ);
        match &sym.info {
            TypeInfo::Array { elem, .. } => *elem,
            TypeInfo::ArrayFixed { elem, .. } => *elem,
            TypeInfo::Map { value, .. } => *value,
            TypeInfo::Chan { elem, .. } => *elem,
            _ => {
                if sym.kind == TypeKind::String {
                    if typ.is_ptr() {
                        return typ.deref();
                    }
                    return U8_TYPE;
                }
                if typ.is_ptr() {
                    return typ.deref();
                }
                VOID_TYPE
            }
        }
    }

    /// Numeric promotion for infix operands; None rejects the mix.
    ///
    /// Literals adopt the concrete side; two literals promote to the higher
    /// precision literal kind. Mixed signedness is accepted only when the
    /// signed type is strictly wider than the unsigned one.
    pub fn promote_num(&self, left: TypeId, right: TypeId) -> Option<TypeId> {
        if left.idx() == right.idx() {
            return Some(left);
        }
        let lt = self.unalias_num_type(left);
        let rt = self.unalias_num_type(right);
        let lk = self.final_kind(lt);
        let rk = self.final_kind(rt);
        if !lk.is_number() || !rk.is_number() {
            return None;
        }
        if lk.is_literal() && rk.is_literal() {
            if lk == TypeKind::FloatLiteral {
                return Some(lt);
            }
            return Some(rt);
        }
        if lk.is_literal() {
            return Some(rt);
        }
        if rk.is_literal() {
            return Some(lt);
        }
        if lk.is_float() || rk.is_float() {
            if lk.is_float() && rk.is_float() {
                return Some(if lk.bit_width() >= rk.bit_width() { lt } else { rt });
            }
            return Some(if lk.is_float() { lt } else { rt });
        }
        // Both concrete integers.
        if lk.is_signed() == rk.is_signed() {
            return Some(if lk.bit_width() >= rk.bit_width() { lt } else { rt });
        }
        let (signed, signed_t, unsigned) = if lk.is_signed() {
            (lk, lt, rk)
        } else {
            (rk, rt, lk)
        };
        if signed.bit_width() > unsigned.bit_width() {
            Some(signed_t)
        } else {
            None
        }
    }

    /// Fold a literal kind onto a concrete type where one exists.
    pub fn mktyp(&self, typ: TypeId) -> TypeId {
        match self.final_kind(typ) {
            TypeKind::IntLiteral => INT_TYPE,
            TypeKind::FloatLiteral => F64_TYPE,
            _ => typ,
        }
    }

    /// Final index after following alias chains.
    pub fn final_idx(&self, typ: TypeId) -> u32 {
        let mut idx = typ.idx();
        for _ in 0..100 {
            if idx == 0 {
                return 0;
            }
            let sym = &self.types[idx as usize];
            if sym.kind != TypeKind::Alias || sym.parent_idx == 0 {
                return idx;
            }
            idx = sym.parent_idx;
        }
        idx
    }

    /// Both handles resolve to the same symbol modulo aliases.
    pub fn same_final_idx(&self, a: TypeId, b: TypeId) -> bool {
        if a.idx() == b.idx() {
            return true;
        }
        if a.is_unresolved() || b.is_unresolved() {
            return false;
        }
        self.final_idx(a) == self.final_idx(b)
    }

    pub fn struct_fields(&self, typ: TypeId) -> &[StructField] {
        match &self.final_sym(typ).info {
            TypeInfo::Struct(info) => &info.fields,
            TypeInfo::Interface(info) => &info.fields,
            _ => &[],
        }
    }

    pub fn register_builtin_method(&mut self, typ: TypeId, sig: FnSig) {
        self.sym_mut(typ).register_method(sig);
    }

    /// Positions for builtin symbols that need one in diagnostics.
    pub fn builtin_pos() -> Pos {
        Pos::default()
    }
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("types", &self.types.len())
            .field("fns", &self.fns.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_at_reserved_indices() {
        let table = Table::new();
        assert_eq!(table.sym(VOID_TYPE).name, "void");
        assert_eq!(table.sym(INT_TYPE).name, "int");
        assert_eq!(table.sym(STRING_TYPE).name, "string");
        assert_eq!(table.sym(ERROR_TYPE).kind, TypeKind::Interface);
        assert_eq!(table.sym(INT_LITERAL_TYPE).kind, TypeKind::IntLiteral);
    }

    #[test]
    fn register_sym_is_idempotent() {
        let mut table = Table::new();
        let a = table.register_sym(TypeSymbol {
            name: "main.Point".into(),
            kind: TypeKind::Struct,
            info: TypeInfo::Struct(Default::default()),
            module: "main".into(),
            ..TypeSymbol::default()
        });
        let b = table.register_sym(TypeSymbol {
            name: "main.Point".into(),
            kind: TypeKind::Struct,
            info: TypeInfo::Struct(Default::default()),
            module: "main".into(),
            ..TypeSymbol::default()
        });
        assert_eq!(a, b);
    }

    #[test]
    fn main_types_reachable_by_short_name() {
        let mut table = Table::new();
        let id = table.register_sym(TypeSymbol {
            name: "main.Point".into(),
            kind: TypeKind::Struct,
            info: TypeInfo::Struct(Default::default()),
            module: "main".into(),
            ..TypeSymbol::default()
        });
        let (_, idx) = table.find_sym_and_idx("Point").unwrap();
        assert_eq!(idx, id.idx());
    }

    #[test]
    fn placeholder_overwrite_keeps_methods() {
        let mut table = Table::new();
        let ph = table.add_placeholder_type("main.Shape", Language::Veld);
        table.register_builtin_method(
            ph,
            FnSig {
                name: "area".into(),
                return_type: F64_TYPE,
                ..FnSig::default()
            },
        );
        let real = table.register_sym(TypeSymbol {
            name: "main.Shape".into(),
            kind: TypeKind::Struct,
            info: TypeInfo::Struct(Default::default()),
            module: "main".into(),
            ..TypeSymbol::default()
        });
        assert_eq!(ph, real);
        let sym = table.sym(real);
        assert_eq!(sym.kind, TypeKind::Struct);
        assert!(sym.own_method("area").is_some());
    }

    #[test]
    fn builtin_window_redefinition_keeps_kind() {
        let mut table = Table::new();
        let id = table.register_sym(TypeSymbol {
            name: "string".into(),
            kind: TypeKind::Struct,
            info: TypeInfo::Struct(Default::default()),
            module: "builtin".into(),
            language: Language::Veld,
            ..TypeSymbol::default()
        });
        assert_eq!(id, STRING_TYPE);
        let sym = table.sym(id);
        assert_eq!(sym.kind, TypeKind::String);
        assert!(matches!(sym.info, TypeInfo::Struct(_)));
    }

    #[test]
    fn array_interning_idempotent() {
        let mut table = Table::new();
        let a = table.find_or_register_array(INT_TYPE);
        let b = table.find_or_register_array(INT_TYPE);
        assert_eq!(a, b);
        let sym = table.sym(a);
        assert_eq!(sym.kind, TypeKind::Array);
        assert_eq!(sym.name, "[]int");
        match sym.info {
            TypeInfo::Array { elem, .. } => assert_eq!(elem, INT_TYPE),
            _ => panic!("expected array payload"),
        }
        let c = table.find_or_register_array(STRING_TYPE);
        assert_ne!(a, c);
    }

    #[test]
    fn composite_canonical_names() {
        let mut table = Table::new();
        let arr = table.find_or_register_array(INT_TYPE);
        assert_eq!(table.type_name(arr), "[]int");
        let fixed = table.find_or_register_array_fixed(U8_TYPE, 4, None);
        assert_eq!(table.type_name(fixed), "[4]u8");
        let map = table.find_or_register_map(STRING_TYPE, arr);
        assert_eq!(table.type_name(map), "map[string][]int");
        let chan = table.find_or_register_chan(INT_TYPE, true);
        assert_eq!(table.type_name(chan), "chan mut int");
        let mr = table.find_or_register_multi_return(vec![INT_TYPE, STRING_TYPE]);
        assert_eq!(table.type_name(mr), "(int, string)");
        let th = table.find_or_register_thread(VOID_TYPE);
        assert_eq!(table.type_name(th), "thread");
    }

    #[test]
    fn fn_type_names() {
        let mut table = Table::new();
        let sig = FnSig {
            name: "cb".into(),
            params: vec![
                crate::table::symbols::FnParam::new("a", INT_TYPE),
                crate::table::symbols::FnParam::new("b", STRING_TYPE),
            ],
            return_type: BOOL_TYPE,
            ..FnSig::default()
        };
        assert_eq!(table.fn_type_name(&sig), "fn (int, string) bool");
        let anon = table.find_or_register_fn_type("", sig, true, false);
        assert_eq!(table.sym(anon).kind, TypeKind::Function);
    }

    #[test]
    fn value_type_rules() {
        let mut table = Table::new();
        let arr = table.find_or_register_array(INT_TYPE);
        assert_eq!(table.value_type(arr), INT_TYPE);
        let map = table.find_or_register_map(STRING_TYPE, BOOL_TYPE);
        assert_eq!(table.value_type(map), BOOL_TYPE);
        assert_eq!(table.value_type(STRING_TYPE), U8_TYPE);
        let variadic = INT_TYPE.set_flag(TypeFlags::VARIADIC);
        assert_eq!(table.value_type(variadic), INT_TYPE);
        let ptr = INT_TYPE.ref_();
        assert_eq!(table.value_type(ptr), INT_TYPE);
        assert_eq!(table.value_type(BOOL_TYPE), VOID_TYPE);
    }

    #[test]
    fn alias_chain_resolution() {
        let mut table = Table::new();
        let a = table.register_sym(TypeSymbol {
            name: "main.Meters".into(),
            kind: TypeKind::Alias,
            info: TypeInfo::Alias { parent: INT_TYPE },
            parent_idx: INT_TYPE.idx(),
            module: "main".into(),
            ..TypeSymbol::default()
        });
        let b = table.register_sym(TypeSymbol {
            name: "main.Distance".into(),
            kind: TypeKind::Alias,
            info: TypeInfo::Alias { parent: a },
            parent_idx: a.idx(),
            module: "main".into(),
            ..TypeSymbol::default()
        });
        assert_eq!(table.final_sym(b).kind, TypeKind::Int);
        assert_eq!(table.unalias_num_type(a), INT_TYPE);
        // Non-numeric alias passes through unchanged.
        let s = table.register_sym(TypeSymbol {
            name: "main.Name".into(),
            kind: TypeKind::Alias,
            info: TypeInfo::Alias {
                parent: STRING_TYPE,
            },
            parent_idx: STRING_TYPE.idx(),
            module: "main".into(),
            ..TypeSymbol::default()
        });
        assert_eq!(table.unalias_num_type(s), s);
    }

    #[test]
    fn promote_num_literals_adopt_concrete() {
        let table = Table::new();
        assert_eq!(
            table.promote_num(INT_LITERAL_TYPE, F64_TYPE),
            Some(F64_TYPE)
        );
        assert_eq!(table.promote_num(I32_TYPE, INT_LITERAL_TYPE), Some(I32_TYPE));
        assert_eq!(
            table.promote_num(INT_LITERAL_TYPE, FLOAT_LITERAL_TYPE),
            Some(FLOAT_LITERAL_TYPE)
        );
        assert_eq!(
            table.promote_num(INT_LITERAL_TYPE, INT_LITERAL_TYPE),
            Some(INT_LITERAL_TYPE)
        );
    }

    #[test]
    fn promote_num_width_and_sign() {
        let table = Table::new();
        assert_eq!(table.promote_num(I16_TYPE, I64_TYPE), Some(I64_TYPE));
        assert_eq!(table.promote_num(F32_TYPE, F64_TYPE), Some(F64_TYPE));
        assert_eq!(table.promote_num(I32_TYPE, F32_TYPE), Some(F32_TYPE));
        // signed i64 can absorb u32 (strictly widening)
        assert_eq!(table.promote_num(I64_TYPE, U32_TYPE), Some(I64_TYPE));
        // same-width signed/unsigned mix rejected
        assert_eq!(table.promote_num(I32_TYPE, U32_TYPE), None);
        assert_eq!(table.promote_num(STRING_TYPE, INT_TYPE), None);
    }

    #[test]
    #[should_panic(expected = "unresolved sentinel")]
    fn sym_of_zero_panics() {
        let table = Table::new();
        let _ = table.sym(TypeId::ZERO);
    }
}
