// src/ast/mod.rs
pub mod expr;
pub mod stmt;

pub use expr::{
    ArrayInit, AsCast, Assoc, CallArg, CallExpr, CastExpr, ChanInit, ComptimeCall, ComptimeSelector,
    ConcatExpr, EnumVal, Expr, GoExpr, Ident, IdentKind, IfBranch, IfExpr, IfGuardExpr, IndexExpr,
    InfixExpr, InfixOp, LockExpr, MapInit, MatchBranch, MatchExpr, OrBlock, OrKind, ParExpr,
    PostfixExpr, PostfixOp, PrefixExpr, PrefixOp, RangeExpr, SelectBranch, SelectExpr,
    SelectorExpr, SqlExpr, StringInterLiteral, StructInit, StructInitField, UnsafeExpr,
};
pub use stmt::{
    AliasTypeDecl, AssertStmt, AssignOp, AssignStmt, Attr, Block, BranchKind, BranchStmt,
    ComptimeFor, ConstDecl, ConstField, DeferStmt, EnumDecl, EnumVariantDecl, ExprStmt, FnDecl,
    FnTypeDecl, ForCStmt, ForInStmt, ForStmt, GlobalDecl, GlobalField, Import, ImportSym,
    InterfaceDecl, InterfaceMethodDecl, ModuleDecl, Receiver, Return, Stmt, StructDecl,
    SumTypeDecl, TypeDecl,
};

use crate::scope::Scope;

/// One parsed source file: the checker's unit of work.
#[derive(Debug, Clone, Default)]
pub struct File {
    pub path: String,
    pub mod_name: String,
    pub imports: Vec<Import>,
    pub stmts: Vec<Stmt>,
    /// File-level scope, populated by the checker.
    pub scope: Scope,
    pub is_generated: bool,
    /// Machine-translated sources get relaxed mutability rules.
    pub is_translated: bool,
    pub is_test: bool,
}

impl File {
    pub fn new(path: impl Into<String>, mod_name: impl Into<String>, stmts: Vec<Stmt>) -> Self {
        Self {
            path: path.into(),
            mod_name: mod_name.into(),
            stmts,
            ..Self::default()
        }
    }
}
