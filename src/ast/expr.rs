// src/ast/expr.rs
//
// Expression nodes. The checker mutates `typ` fields in place so downstream
// phases read fully-resolved nodes. `NodeError` marks parser-reported
// failures and is skipped silently.

use crate::ast::stmt::Stmt;
use crate::span::Pos;
use crate::table::TypeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InfixOp {
    Plus,
    Minus,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    LogAnd,
    LogOr,
    BitAnd,
    BitOr,
    BitXor,
    In,
    NotIn,
    Is,
    NotIs,
}

impl InfixOp {
    pub fn symbol(self) -> &'static str {
        match self {
            InfixOp::Plus => "+",
            InfixOp::Minus => "-",
            InfixOp::Mul => "*",
            InfixOp::Div => "/",
            InfixOp::Mod => "%",
            InfixOp::Shl => "<<",
            InfixOp::Shr => ">>",
            InfixOp::Lt => "<",
            InfixOp::Gt => ">",
            InfixOp::Le => "<=",
            InfixOp::Ge => ">=",
            InfixOp::Eq => "==",
            InfixOp::Ne => "!=",
            InfixOp::LogAnd => "&&",
            InfixOp::LogOr => "||",
            InfixOp::BitAnd => "&",
            InfixOp::BitOr => "|",
            InfixOp::BitXor => "^",
            InfixOp::In => "in",
            InfixOp::NotIn => "!in",
            InfixOp::Is => "is",
            InfixOp::NotIs => "!is",
        }
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            InfixOp::Plus | InfixOp::Minus | InfixOp::Mul | InfixOp::Div | InfixOp::Mod
        )
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            InfixOp::Lt | InfixOp::Gt | InfixOp::Le | InfixOp::Ge
        )
    }

    pub fn is_equality(self) -> bool {
        matches!(self, InfixOp::Eq | InfixOp::Ne)
    }

    pub fn is_bitwise(self) -> bool {
        matches!(self, InfixOp::BitAnd | InfixOp::BitOr | InfixOp::BitXor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOp {
    /// Unary minus.
    Minus,
    /// Logical not.
    Not,
    /// Bitwise complement.
    BitNot,
    /// Address-of.
    Amp,
    /// Pointer dereference.
    Deref,
    /// Channel receive.
    Arrow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostfixOp {
    Inc,
    Dec,
}

/// How a variable was resolved; filled by the checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentKind {
    #[default]
    Unresolved,
    Variable,
    Constant,
    Global,
    Function,
}

#[derive(Debug, Clone, Default)]
pub struct Ident {
    pub name: String,
    pub pos: Pos,
    pub typ: TypeId,
    pub kind: IdentKind,
    pub is_mut: bool,
    /// `shared s := ...` declaration marker.
    pub is_shared: bool,
}

impl Ident {
    pub fn new(name: impl Into<String>, pos: Pos) -> Self {
        Self {
            name: name.into(),
            pos,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct InfixExpr {
    pub op: InfixOp,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
    pub pos: Pos,
    pub typ: TypeId,
    pub left_type: TypeId,
    pub right_type: TypeId,
}

#[derive(Debug, Clone)]
pub struct PrefixExpr {
    pub op: PrefixOp,
    pub right: Box<Expr>,
    pub pos: Pos,
    pub typ: TypeId,
}

#[derive(Debug, Clone)]
pub struct PostfixExpr {
    pub op: PostfixOp,
    pub expr: Box<Expr>,
    pub pos: Pos,
    pub typ: TypeId,
}

#[derive(Debug, Clone)]
pub struct IndexExpr {
    pub left: Box<Expr>,
    pub index: Box<Expr>,
    pub pos: Pos,
    pub typ: TypeId,
    pub left_type: TypeId,
    /// `#[..]` gated range form.
    pub is_gated: bool,
    /// Set by assignment checking when this index is a store target.
    pub is_setter: bool,
}

#[derive(Debug, Clone)]
pub struct SelectorExpr {
    pub expr: Box<Expr>,
    pub field_name: String,
    pub pos: Pos,
    pub typ: TypeId,
    pub expr_type: TypeId,
    /// Filled when the field was found on an embedded type.
    pub from_embed_type: TypeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrKind {
    #[default]
    Absent,
    Block,
    Propagate,
}

#[derive(Debug, Clone, Default)]
pub struct OrBlock {
    pub kind: OrKind,
    pub stmts: Vec<Stmt>,
    pub pos: Pos,
}

#[derive(Debug, Clone, Default)]
pub struct CallArg {
    pub expr: Box<Expr>,
    pub is_mut: bool,
    pub typ: TypeId,
    pub pos: Pos,
}

impl CallArg {
    pub fn new(expr: Expr) -> Self {
        Self {
            pos: expr.pos(),
            expr: Box::new(expr),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CallExpr {
    pub name: String,
    pub mod_name: String,
    /// Receiver expression for method calls.
    pub left: Option<Box<Expr>>,
    pub is_method: bool,
    pub args: Vec<CallArg>,
    /// Explicit instantiation: `f<int>(...)`.
    pub concrete_types: Vec<TypeId>,
    pub or_block: OrBlock,
    pub pos: Pos,
    pub typ: TypeId,
    pub return_type: TypeId,
    pub receiver_type: TypeId,
    /// Resolved callee carries `[noreturn]`.
    pub is_noreturn: bool,
}

#[derive(Debug, Clone)]
pub struct CastExpr {
    /// Target type: `T(expr)`.
    pub typ: TypeId,
    pub expr: Box<Expr>,
    pub pos: Pos,
    pub expr_type: TypeId,
}

#[derive(Debug, Clone)]
pub struct AsCast {
    /// `expr as T` (sum types and interfaces).
    pub expr: Box<Expr>,
    pub typ: TypeId,
    pub pos: Pos,
    pub expr_type: TypeId,
}

#[derive(Debug, Clone, Default)]
pub struct MatchBranch {
    /// Patterns: `TypeNode` entries for sum-type/interface matches, value
    /// expressions for everything else. Empty for `else`.
    pub exprs: Vec<Expr>,
    pub stmts: Vec<Stmt>,
    pub is_else: bool,
    /// `match x { Circle as c { ... } }`.
    pub as_name: Option<String>,
    pub pos: Pos,
}

#[derive(Debug, Clone)]
pub struct MatchExpr {
    pub cond: Box<Expr>,
    pub branches: Vec<MatchBranch>,
    pub pos: Pos,
    pub typ: TypeId,
    pub cond_type: TypeId,
    pub is_expr: bool,
    pub is_sum_type: bool,
}

#[derive(Debug, Clone, Default)]
pub struct IfBranch {
    pub cond: Option<Expr>,
    pub stmts: Vec<Stmt>,
    pub pos: Pos,
}

#[derive(Debug, Clone)]
pub struct IfExpr {
    pub branches: Vec<IfBranch>,
    pub has_else: bool,
    pub pos: Pos,
    pub typ: TypeId,
    pub is_expr: bool,
}

#[derive(Debug, Clone)]
pub struct IfGuardExpr {
    pub var_name: String,
    pub is_mut: bool,
    pub expr: Box<Expr>,
    pub pos: Pos,
    pub typ: TypeId,
}

#[derive(Debug, Clone, Default)]
pub struct StructInitField {
    pub name: String,
    pub expr: Box<Expr>,
    pub pos: Pos,
    pub typ: TypeId,
    pub expected_type: TypeId,
}

#[derive(Debug, Clone, Default)]
pub struct StructInit {
    pub typ: TypeId,
    pub fields: Vec<StructInitField>,
    pub pos: Pos,
    /// `Foo{1, 2}` positional form.
    pub is_short: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ArrayInit {
    pub exprs: Vec<Expr>,
    /// Declared element type, ZERO when inferred.
    pub elem_type: TypeId,
    pub typ: TypeId,
    pub pos: Pos,
    pub is_fixed: bool,
    pub len_expr: Option<Box<Expr>>,
    pub cap_expr: Option<Box<Expr>>,
    pub default_expr: Option<Box<Expr>>,
}

#[derive(Debug, Clone, Default)]
pub struct MapInit {
    pub keys: Vec<Expr>,
    pub vals: Vec<Expr>,
    pub key_type: TypeId,
    pub value_type: TypeId,
    pub typ: TypeId,
    pub pos: Pos,
}

#[derive(Debug, Clone, Default)]
pub struct ChanInit {
    pub elem_type: TypeId,
    pub cap_expr: Option<Box<Expr>>,
    pub typ: TypeId,
    pub pos: Pos,
}

/// `a, b` in multi-value return position.
#[derive(Debug, Clone, Default)]
pub struct ConcatExpr {
    pub vals: Vec<Expr>,
    pub pos: Pos,
    pub typ: TypeId,
}

#[derive(Debug, Clone, Default)]
pub struct RangeExpr {
    pub low: Option<Box<Expr>>,
    pub high: Option<Box<Expr>>,
    pub pos: Pos,
    pub typ: TypeId,
}

#[derive(Debug, Clone, Default)]
pub struct LockExpr {
    pub lockeds: Vec<Ident>,
    pub rlockeds: Vec<Ident>,
    pub stmts: Vec<Stmt>,
    pub pos: Pos,
    pub typ: TypeId,
}

#[derive(Debug, Clone)]
pub struct UnsafeExpr {
    pub expr: Box<Expr>,
    pub pos: Pos,
}

#[derive(Debug, Clone)]
pub struct ParExpr {
    pub expr: Box<Expr>,
    pub pos: Pos,
}

#[derive(Debug, Clone)]
pub struct GoExpr {
    pub call: Box<CallExpr>,
    pub pos: Pos,
    pub typ: TypeId,
}

#[derive(Debug, Clone, Default)]
pub struct SelectBranch {
    pub comm: Option<Box<Stmt>>,
    pub stmts: Vec<Stmt>,
    pub is_else: bool,
    pub is_timeout: bool,
    pub pos: Pos,
}

#[derive(Debug, Clone, Default)]
pub struct SelectExpr {
    pub branches: Vec<SelectBranch>,
    pub pos: Pos,
    pub typ: TypeId,
}

#[derive(Debug, Clone, Default)]
pub struct ComptimeCall {
    pub method_name: String,
    pub args_var: String,
    pub pos: Pos,
    pub typ: TypeId,
}

#[derive(Debug, Clone)]
pub struct ComptimeSelector {
    pub left: Box<Expr>,
    pub field_expr: Box<Expr>,
    pub pos: Pos,
    pub typ: TypeId,
}

#[derive(Debug, Clone, Default)]
pub struct EnumVal {
    /// Empty when inferred from the expected type (`.green`).
    pub enum_name: String,
    pub val: String,
    pub pos: Pos,
    pub typ: TypeId,
}

/// Struct update: `{ ...base | field: value }`.
#[derive(Debug, Clone, Default)]
pub struct Assoc {
    pub var_name: String,
    pub fields: Vec<String>,
    pub exprs: Vec<Expr>,
    pub pos: Pos,
    pub typ: TypeId,
}

#[derive(Debug, Clone, Default)]
pub struct StringInterLiteral {
    pub vals: Vec<String>,
    pub exprs: Vec<Expr>,
    /// Specifier letter per expr, '\0' when defaulted.
    pub fmts: Vec<char>,
    pub has_fmts: Vec<bool>,
    pub fwidths: Vec<i32>,
    pub precisions: Vec<i32>,
    pub pos: Pos,
    pub typ: TypeId,
}

#[derive(Debug, Clone, Default)]
pub struct SqlExpr {
    pub pos: Pos,
    pub typ: TypeId,
}

#[derive(Debug, Clone)]
pub enum Expr {
    NodeError {
        pos: Pos,
    },
    Ident(Ident),
    IntegerLiteral {
        val: String,
        pos: Pos,
    },
    FloatLiteral {
        val: String,
        pos: Pos,
    },
    StringLiteral {
        val: String,
        pos: Pos,
    },
    StringInterLiteral(StringInterLiteral),
    CharLiteral {
        val: char,
        pos: Pos,
    },
    BoolLiteral {
        val: bool,
        pos: Pos,
    },
    None {
        pos: Pos,
    },
    Prefix(PrefixExpr),
    Infix(InfixExpr),
    Postfix(PostfixExpr),
    Index(IndexExpr),
    Selector(SelectorExpr),
    Call(CallExpr),
    Cast(CastExpr),
    AsCast(AsCast),
    Match(MatchExpr),
    If(IfExpr),
    IfGuard(IfGuardExpr),
    StructInit(StructInit),
    ArrayInit(ArrayInit),
    MapInit(MapInit),
    ChanInit(ChanInit),
    Concat(ConcatExpr),
    Range(RangeExpr),
    Lock(LockExpr),
    Unsafe(UnsafeExpr),
    Par(ParExpr),
    Go(GoExpr),
    Select(SelectExpr),
    SizeOf {
        typ: TypeId,
        pos: Pos,
    },
    OffsetOf {
        struct_typ: TypeId,
        field: String,
        pos: Pos,
    },
    TypeOf {
        expr: Box<Expr>,
        pos: Pos,
    },
    At {
        name: String,
        pos: Pos,
    },
    ComptimeCall(ComptimeCall),
    ComptimeSelector(ComptimeSelector),
    EnumVal(EnumVal),
    Assoc(Assoc),
    Dump {
        expr: Box<Expr>,
        typ: TypeId,
        pos: Pos,
    },
    Likely {
        expr: Box<Expr>,
        is_likely: bool,
        pos: Pos,
    },
    Sql(SqlExpr),
    /// A type in expression position (cast targets, `is` right-hand sides,
    /// match patterns).
    TypeNode {
        typ: TypeId,
        pos: Pos,
    },
}

impl Default for Expr {
    fn default() -> Self {
        Expr::NodeError {
            pos: Pos::default(),
        }
    }
}

impl Expr {
    pub fn pos(&self) -> Pos {
        match self {
            Expr::NodeError { pos }
            | Expr::IntegerLiteral { pos, .. }
            | Expr::FloatLiteral { pos, .. }
            | Expr::StringLiteral { pos, .. }
            | Expr::CharLiteral { pos, .. }
            | Expr::BoolLiteral { pos, .. }
            | Expr::None { pos }
            | Expr::SizeOf { pos, .. }
            | Expr::OffsetOf { pos, .. }
            | Expr::TypeOf { pos, .. }
            | Expr::At { pos, .. }
            | Expr::Dump { pos, .. }
            | Expr::Likely { pos, .. }
            | Expr::TypeNode { pos, .. } => *pos,
            Expr::Ident(n) => n.pos,
            Expr::StringInterLiteral(n) => n.pos,
            Expr::Prefix(n) => n.pos,
            Expr::Infix(n) => n.pos,
            Expr::Postfix(n) => n.pos,
            Expr::Index(n) => n.pos,
            Expr::Selector(n) => n.pos,
            Expr::Call(n) => n.pos,
            Expr::Cast(n) => n.pos,
            Expr::AsCast(n) => n.pos,
            Expr::Match(n) => n.pos,
            Expr::If(n) => n.pos,
            Expr::IfGuard(n) => n.pos,
            Expr::StructInit(n) => n.pos,
            Expr::ArrayInit(n) => n.pos,
            Expr::MapInit(n) => n.pos,
            Expr::ChanInit(n) => n.pos,
            Expr::Concat(n) => n.pos,
            Expr::Range(n) => n.pos,
            Expr::Lock(n) => n.pos,
            Expr::Unsafe(n) => n.pos,
            Expr::Par(n) => n.pos,
            Expr::Go(n) => n.pos,
            Expr::Select(n) => n.pos,
            Expr::ComptimeCall(n) => n.pos,
            Expr::ComptimeSelector(n) => n.pos,
            Expr::EnumVal(n) => n.pos,
            Expr::Assoc(n) => n.pos,
            Expr::Sql(n) => n.pos,
        }
    }

    /// The recorded type, ZERO before checking.
    pub fn typ(&self) -> TypeId {
        match self {
            Expr::Ident(n) => n.typ,
            Expr::StringInterLiteral(n) => n.typ,
            Expr::Prefix(n) => n.typ,
            Expr::Infix(n) => n.typ,
            Expr::Postfix(n) => n.typ,
            Expr::Index(n) => n.typ,
            Expr::Selector(n) => n.typ,
            Expr::Call(n) => n.typ,
            Expr::Cast(n) => n.typ,
            Expr::AsCast(n) => n.typ,
            Expr::Match(n) => n.typ,
            Expr::If(n) => n.typ,
            Expr::IfGuard(n) => n.typ,
            Expr::StructInit(n) => n.typ,
            Expr::ArrayInit(n) => n.typ,
            Expr::MapInit(n) => n.typ,
            Expr::ChanInit(n) => n.typ,
            Expr::Concat(n) => n.typ,
            Expr::Range(n) => n.typ,
            Expr::Lock(n) => n.typ,
            Expr::Go(n) => n.typ,
            Expr::Select(n) => n.typ,
            Expr::ComptimeCall(n) => n.typ,
            Expr::ComptimeSelector(n) => n.typ,
            Expr::EnumVal(n) => n.typ,
            Expr::Assoc(n) => n.typ,
            Expr::Sql(n) => n.typ,
            Expr::Dump { typ, .. } | Expr::TypeNode { typ, .. } => *typ,
            Expr::Unsafe(n) => n.expr.typ(),
            Expr::Par(n) => n.expr.typ(),
            Expr::Likely { expr, .. } => expr.typ(),
            _ => TypeId::ZERO,
        }
    }

    /// A stable textual key for smartcast bookkeeping.
    pub fn smartcast_key(&self) -> String {
        match self {
            Expr::Ident(n) => n.name.clone(),
            Expr::Selector(n) => {
                format!("{}.{}", n.expr.smartcast_key(), n.field_name)
            }
            Expr::Par(n) => n.expr.smartcast_key(),
            Expr::Index(n) => format!("{}[]", n.left.smartcast_key()),
            _ => String::new(),
        }
    }

    pub fn is_lvalue(&self) -> bool {
        match self {
            Expr::Ident(_) | Expr::Selector(_) | Expr::Index(_) => true,
            Expr::Par(n) => n.expr.is_lvalue(),
            Expr::Prefix(n) => n.op == PrefixOp::Deref,
            _ => false,
        }
    }

    /// Compile-time integer value, where trivially known.
    pub fn const_int_value(&self) -> Option<i64> {
        match self {
            Expr::IntegerLiteral { val, .. } => parse_int_literal(val),
            Expr::Prefix(p) if p.op == PrefixOp::Minus => {
                p.right.const_int_value().map(|v| -v)
            }
            Expr::Par(n) => n.expr.const_int_value(),
            _ => None,
        }
    }
}

pub fn parse_int_literal(val: &str) -> Option<i64> {
    let cleaned = val.replace('_', "");
    if let Some(hex) = cleaned.strip_prefix("0x").or_else(|| cleaned.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).ok();
    }
    if let Some(oct) = cleaned.strip_prefix("0o").or_else(|| cleaned.strip_prefix("0O")) {
        return i64::from_str_radix(oct, 8).ok();
    }
    if let Some(bin) = cleaned.strip_prefix("0b").or_else(|| cleaned.strip_prefix("0B")) {
        return i64::from_str_radix(bin, 2).ok();
    }
    cleaned.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_literal_radixes() {
        assert_eq!(parse_int_literal("42"), Some(42));
        assert_eq!(parse_int_literal("0xff"), Some(255));
        assert_eq!(parse_int_literal("0b1010"), Some(10));
        assert_eq!(parse_int_literal("0o17"), Some(15));
        assert_eq!(parse_int_literal("1_000_000"), Some(1_000_000));
        assert_eq!(parse_int_literal("nope"), None);
    }

    #[test]
    fn const_int_value_through_wrappers() {
        let lit = Expr::IntegerLiteral {
            val: "7".into(),
            pos: Pos::default(),
        };
        let neg = Expr::Prefix(PrefixExpr {
            op: PrefixOp::Minus,
            right: Box::new(lit),
            pos: Pos::default(),
            typ: TypeId::ZERO,
        });
        assert_eq!(neg.const_int_value(), Some(-7));
    }

    #[test]
    fn smartcast_keys() {
        let base = Expr::Ident(Ident::new("shape", Pos::default()));
        let sel = Expr::Selector(SelectorExpr {
            expr: Box::new(base),
            field_name: "inner".into(),
            pos: Pos::default(),
            typ: TypeId::ZERO,
            expr_type: TypeId::ZERO,
            from_embed_type: TypeId::ZERO,
        });
        assert_eq!(sel.smartcast_key(), "shape.inner");
    }
}
