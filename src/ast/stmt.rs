// src/ast/stmt.rs
//
// Statement and declaration nodes. Declarations carry table-level payloads
// (StructField, FnParam) directly; the checker registers symbols from them.

use crate::ast::expr::Expr;
use crate::span::Pos;
use crate::table::{FnParam, StructField, TypeId};

#[derive(Debug, Clone, Default)]
pub struct Attr {
    pub name: String,
    pub arg: Option<String>,
    pub pos: Pos,
}

impl Attr {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_arg(name: impl Into<String>, arg: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arg: Some(arg.into()),
            pos: Pos::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    /// `=`
    Assign,
    /// `:=`
    Decl,
    Plus,
    Minus,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Xor,
    Shl,
    Shr,
}

impl AssignOp {
    pub fn symbol(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::Decl => ":=",
            AssignOp::Plus => "+=",
            AssignOp::Minus => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
            AssignOp::Mod => "%=",
            AssignOp::And => "&=",
            AssignOp::Or => "|=",
            AssignOp::Xor => "^=",
            AssignOp::Shl => "<<=",
            AssignOp::Shr => ">>=",
        }
    }

    pub fn is_arithmetic(self) -> bool {
        !matches!(self, AssignOp::Assign | AssignOp::Decl)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AssignStmt {
    pub op: AssignOp,
    pub left: Vec<Expr>,
    pub right: Vec<Expr>,
    pub pos: Pos,
    pub left_types: Vec<TypeId>,
    pub right_types: Vec<TypeId>,
}

impl Default for AssignOp {
    fn default() -> Self {
        AssignOp::Assign
    }
}

#[derive(Debug, Clone)]
pub struct ExprStmt {
    pub expr: Expr,
    pub pos: Pos,
    pub typ: TypeId,
}

#[derive(Debug, Clone, Default)]
pub struct Return {
    pub exprs: Vec<Expr>,
    pub pos: Pos,
}

#[derive(Debug, Clone, Default)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub is_unsafe: bool,
    pub pos: Pos,
}

#[derive(Debug, Clone)]
pub struct ForStmt {
    pub cond: Option<Expr>,
    pub stmts: Vec<Stmt>,
    pub pos: Pos,
}

#[derive(Debug, Clone)]
pub struct ForInStmt {
    pub key_var: String,
    pub val_var: String,
    pub val_is_mut: bool,
    pub cond: Expr,
    /// `for i in 0 .. n` upper bound.
    pub high: Option<Expr>,
    pub stmts: Vec<Stmt>,
    pub pos: Pos,
    pub key_type: TypeId,
    pub val_type: TypeId,
}

#[derive(Debug, Clone)]
pub struct ForCStmt {
    pub init: Option<Box<Stmt>>,
    pub cond: Option<Expr>,
    pub inc: Option<Box<Stmt>>,
    pub stmts: Vec<Stmt>,
    pub pos: Pos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchKind {
    Break,
    Continue,
}

#[derive(Debug, Clone)]
pub struct BranchStmt {
    pub kind: BranchKind,
    pub label: Option<String>,
    pub pos: Pos,
}

#[derive(Debug, Clone, Default)]
pub struct DeferStmt {
    pub stmts: Vec<Stmt>,
    pub pos: Pos,
}

#[derive(Debug, Clone, Default)]
pub struct ModuleDecl {
    pub name: String,
    pub attrs: Vec<Attr>,
    pub pos: Pos,
}

#[derive(Debug, Clone, Default)]
pub struct ImportSym {
    pub name: String,
    pub pos: Pos,
}

#[derive(Debug, Clone, Default)]
pub struct Import {
    pub mod_name: String,
    pub alias: String,
    /// `from X import { a, b }` selective symbols.
    pub syms: Vec<ImportSym>,
    pub pos: Pos,
}

#[derive(Debug, Clone, Default)]
pub struct ConstField {
    pub name: String,
    pub expr: Expr,
    pub pos: Pos,
    pub typ: TypeId,
}

#[derive(Debug, Clone, Default)]
pub struct ConstDecl {
    pub fields: Vec<ConstField>,
    pub is_pub: bool,
    pub pos: Pos,
}

#[derive(Debug, Clone, Default)]
pub struct GlobalField {
    pub name: String,
    pub expr: Option<Expr>,
    pub typ: TypeId,
    pub pos: Pos,
}

#[derive(Debug, Clone, Default)]
pub struct GlobalDecl {
    pub fields: Vec<GlobalField>,
    pub pos: Pos,
}

#[derive(Debug, Clone, Default)]
pub struct EnumVariantDecl {
    pub name: String,
    pub expr: Option<Expr>,
    pub pos: Pos,
}

#[derive(Debug, Clone, Default)]
pub struct EnumDecl {
    pub name: String,
    pub is_pub: bool,
    pub variants: Vec<EnumVariantDecl>,
    pub attrs: Vec<Attr>,
    pub pos: Pos,
}

#[derive(Debug, Clone)]
pub struct AliasTypeDecl {
    pub name: String,
    pub is_pub: bool,
    pub parent_type: TypeId,
    pub pos: Pos,
}

#[derive(Debug, Clone)]
pub struct FnTypeDecl {
    pub name: String,
    pub is_pub: bool,
    pub typ: TypeId,
    pub pos: Pos,
}

#[derive(Debug, Clone)]
pub struct SumTypeDecl {
    pub name: String,
    pub is_pub: bool,
    pub variants: Vec<TypeId>,
    pub generic_types: Vec<TypeId>,
    pub pos: Pos,
}

#[derive(Debug, Clone)]
pub enum TypeDecl {
    Alias(AliasTypeDecl),
    Fn(FnTypeDecl),
    Sum(SumTypeDecl),
}

impl TypeDecl {
    pub fn pos(&self) -> Pos {
        match self {
            TypeDecl::Alias(d) => d.pos,
            TypeDecl::Fn(d) => d.pos,
            TypeDecl::Sum(d) => d.pos,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TypeDecl::Alias(d) => &d.name,
            TypeDecl::Fn(d) => &d.name,
            TypeDecl::Sum(d) => &d.name,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StructDecl {
    pub name: String,
    pub fields: Vec<StructField>,
    pub embeds: Vec<TypeId>,
    pub generic_names: Vec<String>,
    pub is_pub: bool,
    pub is_union: bool,
    pub attrs: Vec<Attr>,
    pub pos: Pos,
}

/// Interface method declarations reuse FnSig shape minus body.
#[derive(Debug, Clone, Default)]
pub struct InterfaceMethodDecl {
    pub name: String,
    pub params: Vec<FnParam>,
    pub return_type: TypeId,
    pub receiver_is_mut: bool,
    pub pos: Pos,
}

#[derive(Debug, Clone, Default)]
pub struct InterfaceDecl {
    pub name: String,
    pub fields: Vec<StructField>,
    pub methods: Vec<InterfaceMethodDecl>,
    pub embeds: Vec<TypeId>,
    pub is_pub: bool,
    pub attrs: Vec<Attr>,
    pub pos: Pos,
}

#[derive(Debug, Clone, Default)]
pub struct Receiver {
    pub name: String,
    pub typ: TypeId,
    pub is_mut: bool,
    pub pos: Pos,
}

#[derive(Debug, Clone, Default)]
pub struct FnDecl {
    pub name: String,
    pub mod_name: String,
    pub receiver: Option<Receiver>,
    pub params: Vec<FnParam>,
    pub return_type: TypeId,
    pub stmts: Vec<Stmt>,
    pub attrs: Vec<Attr>,
    pub generic_names: Vec<String>,
    pub is_pub: bool,
    pub is_method: bool,
    pub no_body: bool,
    pub pos: Pos,
}

#[derive(Debug, Clone, Default)]
pub struct AssertStmt {
    pub expr: Expr,
    pub pos: Pos,
}

#[derive(Debug, Clone)]
pub struct ComptimeFor {
    pub var_name: String,
    pub typ: TypeId,
    pub stmts: Vec<Stmt>,
    pub pos: Pos,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    NodeError { pos: Pos },
    Assign(AssignStmt),
    ExprStmt(ExprStmt),
    Return(Return),
    Block(Block),
    For(ForStmt),
    ForIn(ForInStmt),
    ForC(ForCStmt),
    Branch(BranchStmt),
    Goto { label: String, pos: Pos },
    GotoLabel { name: String, pos: Pos },
    Defer(DeferStmt),
    Hash { val: String, pos: Pos },
    Module(ModuleDecl),
    Import(Import),
    ConstDecl(ConstDecl),
    GlobalDecl(GlobalDecl),
    EnumDecl(EnumDecl),
    TypeDecl(TypeDecl),
    InterfaceDecl(InterfaceDecl),
    StructDecl(StructDecl),
    FnDecl(FnDecl),
    Asm { pos: Pos },
    Assert(AssertStmt),
    ComptimeFor(ComptimeFor),
    SqlStmt { pos: Pos },
}

impl Stmt {
    pub fn pos(&self) -> Pos {
        match self {
            Stmt::NodeError { pos }
            | Stmt::Goto { pos, .. }
            | Stmt::GotoLabel { pos, .. }
            | Stmt::Hash { pos, .. }
            | Stmt::Asm { pos }
            | Stmt::SqlStmt { pos } => *pos,
            Stmt::Assign(s) => s.pos,
            Stmt::ExprStmt(s) => s.pos,
            Stmt::Return(s) => s.pos,
            Stmt::Block(s) => s.pos,
            Stmt::For(s) => s.pos,
            Stmt::ForIn(s) => s.pos,
            Stmt::ForC(s) => s.pos,
            Stmt::Branch(s) => s.pos,
            Stmt::Defer(s) => s.pos,
            Stmt::Module(s) => s.pos,
            Stmt::Import(s) => s.pos,
            Stmt::ConstDecl(s) => s.pos,
            Stmt::GlobalDecl(s) => s.pos,
            Stmt::EnumDecl(s) => s.pos,
            Stmt::TypeDecl(s) => s.pos(),
            Stmt::InterfaceDecl(s) => s.pos,
            Stmt::StructDecl(s) => s.pos,
            Stmt::FnDecl(s) => s.pos,
            Stmt::Assert(s) => s.pos,
            Stmt::ComptimeFor(s) => s.pos,
        }
    }

    pub fn is_decl(&self) -> bool {
        matches!(
            self,
            Stmt::Module(_)
                | Stmt::Import(_)
                | Stmt::ConstDecl(_)
                | Stmt::GlobalDecl(_)
                | Stmt::EnumDecl(_)
                | Stmt::TypeDecl(_)
                | Stmt::InterfaceDecl(_)
                | Stmt::StructDecl(_)
                | Stmt::FnDecl(_)
        )
    }
}
