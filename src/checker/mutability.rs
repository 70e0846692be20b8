// src/checker/mutability.rs
//
// Mutability, shared-state locking and unsafe enforcement.
// `fail_if_immutable` traverses assignment targets; lock/rlock blocks
// maintain the checker's locked-name lists.

use rustc_hash::FxHashSet;

use crate::ast::{Expr, LockExpr, PrefixOp, Stmt};
use crate::checker::Checker;
use crate::errors::SemanticError;
use crate::scope::{ScopeObject, ShareKind};
use crate::table::{TypeKind, VOID_TYPE};

impl Checker<'_> {
    /// Validate that `expr` may be mutated. Reports diagnostics for
    /// violations and returns the name of the shared variable that must be
    /// covered by an enclosing lock, when the target is `shared`.
    pub(crate) fn fail_if_immutable(&mut self, expr: &Expr) -> Option<String> {
        let relaxed = self.in_unsafe > 0 || self.file_is_translated || self.opts.translated_mode;
        match expr {
            Expr::Ident(ident) => {
                if ident.name == "_" {
                    return None;
                }
                let obj = self
                    .scopes
                    .iter()
                    .rev()
                    .find_map(|s| s.get(&ident.name).cloned())
                    .or_else(|| {
                        let qualified = self.qualify(&ident.name);
                        self.scopes
                            .iter()
                            .rev()
                            .find_map(|s| s.get(&qualified).cloned())
                    });
                match obj {
                    Some(ScopeObject::Const { .. }) => {
                        if !relaxed {
                            self.error(
                                SemanticError::ConstAssign {
                                    name: ident.name.clone(),
                                    span: ident.pos.into(),
                                },
                                ident.pos,
                            );
                        }
                        None
                    }
                    Some(ScopeObject::Global { .. }) => None,
                    Some(ScopeObject::Var(var)) => {
                        if var.share == ShareKind::Shared {
                            if self.rlocked_names.contains(&ident.name) {
                                self.error(
                                    SemanticError::RlockMutation {
                                        name: ident.name.clone(),
                                        span: ident.pos.into(),
                                    },
                                    ident.pos,
                                );
                            } else if !self.locked_names.contains(&ident.name) {
                                self.error(
                                    SemanticError::SharedNotLocked {
                                        name: ident.name.clone(),
                                        span: ident.pos.into(),
                                    },
                                    ident.pos,
                                );
                            }
                            self.mark_changed(&ident.name);
                            return Some(ident.name.clone());
                        }
                        if !var.is_mut && !relaxed {
                            self.error(
                                SemanticError::ImmutableAssign {
                                    name: ident.name.clone(),
                                    span: ident.pos.into(),
                                },
                                ident.pos,
                            );
                        }
                        self.mark_changed(&ident.name);
                        None
                    }
                    None => None,
                }
            }
            Expr::Selector(sel) => {
                let owner = sel.expr_type;
                if !owner.is_unresolved() {
                    if let Ok(field) = self
                        .table
                        .find_field_with_embeds(owner.plain(), &sel.field_name)
                        && !field.is_mut
                        && !relaxed
                    {
                        let typ = self.type_str(owner);
                        self.error(
                            SemanticError::FieldNotMut {
                                typ,
                                field: sel.field_name.clone(),
                                span: sel.pos.into(),
                            },
                            sel.pos,
                        );
                    }
                }
                self.fail_if_immutable(&sel.expr)
            }
            Expr::Index(idx) => {
                if self.table.final_kind(idx.left_type) == TypeKind::String {
                    let target = idx.left.smartcast_key();
                    self.error(
                        SemanticError::StringIndexAssign {
                            target: if target.is_empty() {
                                "string".to_string()
                            } else {
                                format!("{target}[i]")
                            },
                            span: idx.pos.into(),
                        },
                        idx.pos,
                    );
                    return None;
                }
                self.fail_if_immutable(&idx.left)
            }
            Expr::Par(p) => self.fail_if_immutable(&p.expr),
            Expr::Prefix(p) if p.op == PrefixOp::Deref => {
                // Storing through a raw pointer is an unsafe operation.
                if self.in_unsafe == 0 {
                    self.error(
                        SemanticError::RequiresUnsafe {
                            what: "writing through a pointer".to_string(),
                            span: p.pos.into(),
                        },
                        p.pos,
                    );
                }
                None
            }
            Expr::NodeError { .. } => None,
            other => {
                let pos = other.pos();
                self.error(SemanticError::NotAnLvalue { span: pos.into() }, pos);
                None
            }
        }
    }

    /// `lock a, b { ... }` / `rlock c { ... }`. Nesting is forbidden, every
    /// locked name must be a shared lvalue, and the block's value is its
    /// trailing expression's type.
    pub(crate) fn lock_expr(&mut self, n: &mut LockExpr) -> crate::table::TypeId {
        if self.in_lock {
            self.error(SemanticError::NestedLock { span: n.pos.into() }, n.pos);
        }
        let mut seen: FxHashSet<String> = FxHashSet::default();
        let mut write_names = Vec::new();
        let mut read_names = Vec::new();
        for (ident, is_rlock) in n
            .lockeds
            .iter_mut()
            .map(|i| (i, false))
            .chain(n.rlockeds.iter_mut().map(|i| (i, true)))
        {
            let name = ident.name.clone();
            match self.lookup_var(&name) {
                Some(var) => {
                    ident.typ = var.typ;
                    if var.share != ShareKind::Shared {
                        self.error(
                            SemanticError::LockNonShared {
                                name: name.clone(),
                                span: ident.pos.into(),
                            },
                            ident.pos,
                        );
                    }
                }
                None => {
                    self.error(
                        SemanticError::UndefinedIdent {
                            name: name.clone(),
                            span: ident.pos.into(),
                        },
                        ident.pos,
                    );
                }
            }
            if !seen.insert(name.clone()) {
                let already_other_mode = if is_rlock {
                    write_names.contains(&name)
                } else {
                    read_names.contains(&name)
                };
                if already_other_mode {
                    self.error(
                        SemanticError::LockAndRlock {
                            name: name.clone(),
                            span: ident.pos.into(),
                        },
                        ident.pos,
                    );
                } else {
                    self.error(
                        SemanticError::DuplicateLock {
                            name: name.clone(),
                            span: ident.pos.into(),
                        },
                        ident.pos,
                    );
                }
                continue;
            }
            if is_rlock {
                read_names.push(name);
            } else {
                write_names.push(name);
            }
        }

        let saved_lock = self.in_lock;
        let saved_locked = self.locked_names.clone();
        let saved_rlocked = self.rlocked_names.clone();
        self.in_lock = true;
        self.locked_names.extend(write_names);
        self.rlocked_names.extend(read_names);

        self.open_scope();
        self.stmts(&mut n.stmts);
        let typ = match n.stmts.last() {
            Some(Stmt::ExprStmt(es)) => es.typ,
            _ => VOID_TYPE,
        };
        self.close_scope();

        self.in_lock = saved_lock;
        self.locked_names = saved_locked;
        self.rlocked_names = saved_rlocked;

        n.typ = typ;
        typ
    }
}
