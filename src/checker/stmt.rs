// src/checker/stmt.rs
//
// Statement checking: loops, returns, blocks, defer, branch statements and
// the long tail of declaration-adjacent statements.

use crate::ast::{
    AssertStmt, Expr, ForCStmt, ForInStmt, ForStmt, Return, Stmt,
};
use crate::checker::Checker;
use crate::errors::{SemanticError, SemanticWarning};
use crate::scope::Var;
use crate::table::{TypeInfo, TypeKind, BOOL_TYPE, INT_TYPE, U8_TYPE, VOID_TYPE};

impl Checker<'_> {
    pub(crate) fn stmts(&mut self, stmts: &mut [Stmt]) {
        let mut after_exit = false;
        let mut warned = false;
        for s in stmts.iter_mut() {
            if self.diags.should_abort {
                break;
            }
            if after_exit && !warned && !matches!(s, Stmt::GotoLabel { .. }) {
                let pos = s.pos();
                self.warn(
                    SemanticWarning::UnreachableCode { span: pos.into() },
                    pos,
                );
                warned = true;
            }
            self.stmt(s);
            after_exit = after_exit
                || matches!(s, Stmt::Return(_))
                || matches!(s, Stmt::ExprStmt(es) if matches!(&es.expr, Expr::Call(c) if c.is_noreturn));
        }
    }

    pub(crate) fn stmt(&mut self, s: &mut Stmt) {
        if self.diags.should_abort {
            return;
        }
        self.stmt_level += 1;
        if self.stmt_level > self.opts.stmt_level_cutoff {
            self.stmt_level -= 1;
            let pos = s.pos();
            self.error(
                SemanticError::NestingTooDeep {
                    what: "statement",
                    span: pos.into(),
                },
                pos,
            );
            return;
        }
        self.stmt_inner(s);
        self.stmt_level -= 1;
    }

    fn stmt_inner(&mut self, s: &mut Stmt) {
        match s {
            // Parser-reported; skip silently.
            Stmt::NodeError { .. } => {}
            Stmt::Assign(a) => self.assign_stmt(a),
            Stmt::ExprStmt(es) => {
                es.typ = self.expr(&mut es.expr);
            }
            Stmt::Return(r) => self.return_stmt(r),
            Stmt::Block(b) => {
                if b.is_unsafe {
                    self.in_unsafe += 1;
                }
                self.open_scope();
                self.stmts(&mut b.stmts);
                self.close_scope();
                if b.is_unsafe {
                    self.in_unsafe -= 1;
                }
            }
            Stmt::For(f) => self.for_stmt(f),
            Stmt::ForIn(f) => self.for_in_stmt(f),
            Stmt::ForC(f) => self.for_c_stmt(f),
            Stmt::Branch(b) => {
                if self.loop_depth == 0 {
                    let err = match b.kind {
                        crate::ast::BranchKind::Break => SemanticError::BreakOutsideLoop {
                            span: b.pos.into(),
                        },
                        crate::ast::BranchKind::Continue => SemanticError::ContinueOutsideLoop {
                            span: b.pos.into(),
                        },
                    };
                    self.error(err, b.pos);
                }
            }
            Stmt::Goto { label, pos } => {
                if !self.goto_labels.contains(label.as_str()) {
                    let label = label.clone();
                    let pos = *pos;
                    self.error(
                        SemanticError::UndefinedIdent {
                            name: label,
                            span: pos.into(),
                        },
                        pos,
                    );
                }
            }
            Stmt::GotoLabel { .. } => {}
            Stmt::Defer(d) => {
                self.open_scope();
                self.stmts(&mut d.stmts);
                self.close_scope();
            }
            Stmt::Hash { .. } | Stmt::Asm { .. } | Stmt::SqlStmt { .. } => {}
            Stmt::Module(_) | Stmt::Import(_) => {}
            // Handled in their dedicated passes.
            Stmt::ConstDecl(_) | Stmt::GlobalDecl(_) => {}
            Stmt::EnumDecl(_) | Stmt::TypeDecl(_) | Stmt::InterfaceDecl(_) => {}
            Stmt::StructDecl(d) => self.struct_decl(d),
            Stmt::FnDecl(d) => self.fn_decl(d),
            Stmt::Assert(a) => self.assert_stmt(a),
            Stmt::ComptimeFor(cf) => {
                self.open_scope();
                self.stmts(&mut cf.stmts);
                self.close_scope();
            }
        }
    }

    fn assert_stmt(&mut self, a: &mut AssertStmt) {
        let got = self.expr(&mut a.expr);
        if !self.check_types(got, BOOL_TYPE) {
            let found = self.type_str(got);
            self.error(
                SemanticError::NonBoolCondition {
                    found,
                    span: a.pos.into(),
                },
                a.pos,
            );
        }
    }

    fn for_stmt(&mut self, f: &mut ForStmt) {
        if let Some(cond) = &mut f.cond {
            let got = self.expr(cond);
            if !self.check_types(got, BOOL_TYPE) {
                let found = self.type_str(got);
                let pos = cond.pos();
                self.error(
                    SemanticError::NonBoolCondition {
                        found,
                        span: pos.into(),
                    },
                    pos,
                );
            }
        }
        self.loop_depth += 1;
        self.open_scope();
        self.stmts(&mut f.stmts);
        self.close_scope();
        self.loop_depth -= 1;
    }

    fn for_in_stmt(&mut self, f: &mut ForInStmt) {
        let cond_type = self.expr(&mut f.cond);
        let (key_type, val_type) = if let Some(high) = &mut f.high {
            // Range form: `for i in low .. high`.
            let high_type = self.expr(high);
            for (t, pos) in [(cond_type, f.cond.pos()), (high_type, high.pos())] {
                if !self.table.final_kind(t).is_int() {
                    let found = self.type_str(t);
                    self.error(
                        SemanticError::NonIntegerIndex {
                            found,
                            span: pos.into(),
                        },
                        pos,
                    );
                }
            }
            (VOID_TYPE, INT_TYPE)
        } else {
            match &self.table.sym_by_idx(self.table.final_idx(cond_type)).info {
                TypeInfo::Array { elem, .. } | TypeInfo::ArrayFixed { elem, .. } => {
                    (INT_TYPE, *elem)
                }
                TypeInfo::Map { key, value } => (*key, *value),
                TypeInfo::Chan { elem, .. } => (VOID_TYPE, *elem),
                _ if self.table.final_kind(cond_type) == TypeKind::String => {
                    (INT_TYPE, U8_TYPE)
                }
                _ => {
                    let typ = self.type_str(cond_type);
                    self.error(
                        SemanticError::NotIndexable {
                            typ,
                            span: f.pos.into(),
                        },
                        f.pos,
                    );
                    (VOID_TYPE, VOID_TYPE)
                }
            }
        };
        f.key_type = key_type;
        f.val_type = val_type;

        self.loop_depth += 1;
        self.open_scope();
        if !f.key_var.is_empty() && f.key_var != "_" {
            self.define_var(Var {
                name: f.key_var.clone(),
                typ: key_type,
                pos: f.pos,
                ..Var::default()
            });
        }
        if !f.val_var.is_empty() && f.val_var != "_" {
            self.define_var(Var {
                name: f.val_var.clone(),
                typ: val_type,
                is_mut: f.val_is_mut,
                // `mut v` iteration variables mutate the container in place.
                is_changed: f.val_is_mut,
                pos: f.pos,
                ..Var::default()
            });
        }
        self.stmts(&mut f.stmts);
        self.close_scope();
        self.loop_depth -= 1;
    }

    fn for_c_stmt(&mut self, f: &mut ForCStmt) {
        self.open_scope();
        if let Some(init) = &mut f.init {
            self.stmt(init);
        }
        if let Some(cond) = &mut f.cond {
            let got = self.expr(cond);
            if !self.check_types(got, BOOL_TYPE) {
                let found = self.type_str(got);
                let pos = cond.pos();
                self.error(
                    SemanticError::NonBoolCondition {
                        found,
                        span: pos.into(),
                    },
                    pos,
                );
            }
        }
        self.loop_depth += 1;
        self.stmts(&mut f.stmts);
        if let Some(inc) = &mut f.inc {
            self.stmt(inc);
        }
        self.loop_depth -= 1;
        self.close_scope();
    }

    fn return_stmt(&mut self, r: &mut Return) {
        let expected = self.cur_fn_ret;
        let expected_types: Vec<_> = if expected.is_unresolved() {
            vec![expected]
        } else {
            match &self.table.sym_by_idx(self.table.final_idx(expected)).info {
                TypeInfo::MultiReturn { types } => types.clone(),
                _ => vec![expected],
            }
        };

        if r.exprs.is_empty() {
            if expected != VOID_TYPE && !expected.is_unresolved() && !expected.is_optional() {
                self.error(
                    SemanticError::ReturnCountMismatch {
                        expected: expected_types.len(),
                        found: 0,
                        span: r.pos.into(),
                    },
                    r.pos,
                );
            }
            return;
        }
        if expected == VOID_TYPE {
            // Returning a value from a void function.
            for e in &mut r.exprs {
                self.expr(e);
            }
            self.error(
                SemanticError::ReturnCountMismatch {
                    expected: 0,
                    found: r.exprs.len(),
                    span: r.pos.into(),
                },
                r.pos,
            );
            return;
        }

        let mut got_types = Vec::new();
        let exprs_len = r.exprs.len();
        for e in &mut r.exprs {
            let saved = self.expected_type;
            self.expected_type = if expected_types.len() == 1 {
                expected_types[0]
            } else {
                crate::table::TypeId::ZERO
            };
            let t = self.expr(e);
            self.expected_type = saved;
            if t.is_unresolved() {
                got_types.push(t);
                continue;
            }
            // A single multi-return expression flattens.
            match &self.table.sym_by_idx(self.table.final_idx(t)).info {
                TypeInfo::MultiReturn { types } if exprs_len == 1 => {
                    got_types.extend(types.iter().copied());
                }
                _ => got_types.push(t),
            }
        }
        if got_types.len() != expected_types.len() {
            self.error(
                SemanticError::ReturnCountMismatch {
                    expected: expected_types.len(),
                    found: got_types.len(),
                    span: r.pos.into(),
                },
                r.pos,
            );
            return;
        }
        for (got, want) in got_types.iter().zip(expected_types.iter()) {
            let want = want.clear_flag(crate::table::TypeFlags::OPTIONAL);
            if !self.check_types(*got, want)
                && self.table.final_kind(*got) != TypeKind::None
            {
                let expected = self.type_str(want);
                let found = self.type_str(*got);
                self.error(
                    SemanticError::TypeMismatch {
                        expected,
                        found,
                        span: r.pos.into(),
                    },
                    r.pos,
                );
            }
        }
    }
}
