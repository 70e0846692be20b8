// src/checker/match_expr.rs
//
// If/match checking: branch exhaustiveness for sum types and enums,
// optional-unwrapping if-guards, and smartcast scope management.

use rustc_hash::FxHashSet;

use crate::ast::{Expr, IfExpr, InfixOp, MatchExpr};
use crate::checker::Checker;
use crate::errors::SemanticError;
use crate::scope::{SmartcastKey, Var};
use crate::table::{TypeId, TypeKind, BOOL_TYPE, VOID_TYPE};

impl Checker<'_> {
    // ------------------------------------------------------------------
    // If
    // ------------------------------------------------------------------

    pub(crate) fn if_expr(&mut self, n: &mut IfExpr) -> TypeId {
        let mut result = VOID_TYPE;
        let mut have_result = false;
        for branch in &mut n.branches {
            self.open_scope();
            if let Some(cond) = &mut branch.cond {
                if let Expr::IfGuard(guard) = cond {
                    self.in_if_guard = true;
                    let inner = self.expr(&mut guard.expr);
                    self.in_if_guard = false;
                    let was_optional = match guard.expr.as_ref() {
                        Expr::Call(call) => call.return_type.is_optional(),
                        _ => inner.is_optional(),
                    };
                    if !was_optional {
                        let found = self.type_str(inner);
                        self.error(
                            SemanticError::TypeMismatch {
                                expected: "an optional value in the if guard".into(),
                                found,
                                span: guard.pos.into(),
                            },
                            guard.pos,
                        );
                    }
                    let unwrapped =
                        inner.clear_flag(crate::table::TypeFlags::OPTIONAL);
                    guard.typ = unwrapped;
                    if guard.var_name != "_" && !guard.var_name.is_empty() {
                        self.define_var(Var {
                            name: guard.var_name.clone(),
                            typ: unwrapped,
                            is_mut: guard.is_mut,
                            pos: guard.pos,
                            ..Var::default()
                        });
                    }
                } else {
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
                    let cond_snapshot = cond.clone();
                    self.apply_cond_smartcasts(&cond_snapshot);
                }
            }
            self.stmts(&mut branch.stmts);
            if n.is_expr {
                let branch_type = match branch.stmts.last() {
                    Some(crate::ast::Stmt::ExprStmt(es)) => es.typ,
                    _ => VOID_TYPE,
                };
                if !have_result {
                    result = self.table.mktyp(branch_type);
                    have_result = true;
                } else if !self.check_types(branch_type, result)
                    && !self.check_types(result, branch_type)
                {
                    let expected = self.type_str(result);
                    let found = self.type_str(branch_type);
                    self.error(
                        SemanticError::TypeMismatch {
                            expected,
                            found,
                            span: branch.pos.into(),
                        },
                        branch.pos,
                    );
                }
            }
            self.close_scope();
        }
        n.typ = if n.is_expr { result } else { VOID_TYPE };
        n.typ
    }

    /// Positive `is` checks in a condition refine the matched variable or
    /// selector for the branch scope. `&&` chains distribute; `||` does not.
    fn apply_cond_smartcasts(&mut self, cond: &Expr) {
        match cond {
            Expr::Par(p) => self.apply_cond_smartcasts(&p.expr),
            Expr::Infix(ix) if ix.op == InfixOp::LogAnd => {
                self.apply_cond_smartcasts(&ix.left);
                self.apply_cond_smartcasts(&ix.right);
            }
            Expr::Infix(ix) if ix.op == InfixOp::Is => {
                let Expr::TypeNode { typ, .. } = ix.right.as_ref() else {
                    return;
                };
                let variant = *typ;
                match ix.left.as_ref() {
                    Expr::Ident(ident) => {
                        self.push_smartcast(SmartcastKey::var(&ident.name), variant);
                    }
                    Expr::Selector(sel) => {
                        let key = SmartcastKey::selector(
                            &sel.expr.smartcast_key(),
                            sel.expr_type.plain(),
                            &sel.field_name,
                        );
                        self.push_smartcast(key, variant);
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }

    // ------------------------------------------------------------------
    // Match
    // ------------------------------------------------------------------

    pub(crate) fn match_expr(&mut self, n: &mut MatchExpr) -> TypeId {
        let cond_type = self.expr(&mut n.cond);
        n.cond_type = cond_type;
        let cond_kind = self.table.final_kind(cond_type);
        let is_type_match =
            matches!(cond_kind, TypeKind::SumType | TypeKind::Interface);
        n.is_sum_type = cond_kind == TypeKind::SumType;

        let mut covered_types: FxHashSet<u32> = FxHashSet::default();
        let mut covered_variants: FxHashSet<String> = FxHashSet::default();
        let mut has_else = false;
        let mut result = VOID_TYPE;
        let mut have_result = false;

        let cond_key = match n.cond.as_ref() {
            Expr::Ident(ident) => Some(SmartcastKey::var(&ident.name)),
            Expr::Selector(sel) => Some(SmartcastKey::selector(
                &sel.expr.smartcast_key(),
                sel.expr_type.plain(),
                &sel.field_name,
            )),
            _ => None,
        };

        for branch in &mut n.branches {
            self.open_scope();
            if branch.is_else {
                has_else = true;
            } else if is_type_match {
                let mut branch_types = Vec::new();
                for pattern in &mut branch.exprs {
                    let Expr::TypeNode { typ, pos } = pattern else {
                        let pos = pattern.pos();
                        let found = self.type_str(cond_type);
                        self.error(
                            SemanticError::IsOnInvalidType {
                                found,
                                span: pos.into(),
                            },
                            pos,
                        );
                        continue;
                    };
                    let variant = *typ;
                    if n.is_sum_type && !self.is_sumtype_variant(variant, cond_type) {
                        let variant_s = self.type_str(variant);
                        let sum = self.type_str(cond_type);
                        let pos = *pos;
                        self.error(
                            SemanticError::NotAVariant {
                                variant: variant_s,
                                sum,
                                span: pos.into(),
                            },
                            pos,
                        );
                        continue;
                    }
                    covered_types.insert(self.table.final_idx(variant));
                    branch_types.push(variant.plain());
                }
                // Matching several variants at once yields their synthetic
                // aggregate; one variant narrows directly.
                let refined = match branch_types.len() {
                    0 => TypeId::ZERO,
                    1 => branch_types[0],
                    _ => self.table.find_or_register_aggregate(branch_types),
                };
                if !refined.is_unresolved() {
                    if let Some(key) = &cond_key {
                        self.push_smartcast(key.clone(), refined);
                    }
                    if let Some(as_name) = &branch.as_name {
                        self.define_var(Var {
                            name: as_name.clone(),
                            typ: refined,
                            pos: branch.pos,
                            ..Var::default()
                        });
                    }
                }
            } else if cond_kind == TypeKind::Enum {
                for pattern in &mut branch.exprs {
                    let saved = self.expected_type;
                    self.expected_type = cond_type;
                    self.expr(pattern);
                    self.expected_type = saved;
                    if let Expr::EnumVal(ev) = pattern {
                        covered_variants.insert(ev.val.clone());
                    }
                }
            } else {
                for pattern in &mut branch.exprs {
                    let saved = self.expected_type;
                    self.expected_type = cond_type;
                    let got = self.expr(pattern);
                    self.expected_type = saved;
                    // Range patterns type as int and match numeric conds.
                    if !self.check_types(got, cond_type)
                        && !self.check_types(cond_type, got)
                    {
                        let expected = self.type_str(cond_type);
                        let found = self.type_str(got);
                        let pos = pattern.pos();
                        self.error(
                            SemanticError::TypeMismatch {
                                expected,
                                found,
                                span: pos.into(),
                            },
                            pos,
                        );
                    }
                }
            }

            self.stmts(&mut branch.stmts);
            if n.is_expr {
                let branch_type = match branch.stmts.last() {
                    Some(crate::ast::Stmt::ExprStmt(es)) => es.typ,
                    _ => VOID_TYPE,
                };
                if !have_result {
                    result = self.table.mktyp(branch_type);
                    have_result = true;
                } else if !self.check_types(branch_type, result)
                    && !self.check_types(result, branch_type)
                {
                    let expected = self.type_str(result);
                    let found = self.type_str(branch_type);
                    self.error(
                        SemanticError::TypeMismatch {
                            expected,
                            found,
                            span: branch.pos.into(),
                        },
                        branch.pos,
                    );
                }
            }
            self.close_scope();
        }

        if !has_else {
            self.check_exhaustiveness(n, cond_type, cond_kind, &covered_types, &covered_variants);
        }

        n.typ = if n.is_expr { result } else { VOID_TYPE };
        n.typ
    }

    fn check_exhaustiveness(
        &mut self,
        n: &MatchExpr,
        cond_type: TypeId,
        cond_kind: TypeKind,
        covered_types: &FxHashSet<u32>,
        covered_variants: &FxHashSet<String>,
    ) {
        match cond_kind {
            TypeKind::SumType => {
                let variants = self
                    .table
                    .sym_by_idx(self.table.final_idx(cond_type))
                    .sumtype_info()
                    .map(|i| i.variants.clone())
                    .unwrap_or_default();
                let missing: Vec<String> = variants
                    .iter()
                    .filter(|v| !covered_types.contains(&self.table.final_idx(**v)))
                    .map(|v| self.type_str(*v))
                    .collect();
                if !missing.is_empty() {
                    self.error(
                        SemanticError::MatchNonExhaustive {
                            missing: format!(
                                " (add match branches for: {})",
                                missing.join(", ")
                            ),
                            span: n.pos.into(),
                        },
                        n.pos,
                    );
                }
            }
            TypeKind::Enum => {
                let names: Vec<String> = self
                    .table
                    .sym_by_idx(self.table.final_idx(cond_type))
                    .enum_info()
                    .map(|i| i.variant_names().map(|s| s.to_string()).collect())
                    .unwrap_or_default();
                let missing: Vec<String> = names
                    .into_iter()
                    .filter(|v| !covered_variants.contains(v))
                    .map(|v| format!(".{v}"))
                    .collect();
                if !missing.is_empty() {
                    // Long variant listings are cut off to keep the message
                    // readable.
                    let listed = if missing.len() > self.opts.enum_variant_listing_cutoff {
                        String::new()
                    } else {
                        format!(" (add match branches for: {})", missing.join(", "))
                    };
                    self.error(
                        SemanticError::MatchNonExhaustive {
                            missing: listed,
                            span: n.pos.into(),
                        },
                        n.pos,
                    );
                }
            }
            TypeKind::Bool => {
                // `true` and `false` arms cover bool without an else.
            }
            _ => {
                self.error(
                    SemanticError::MatchNonExhaustive {
                        missing: String::new(),
                        span: n.pos.into(),
                    },
                    n.pos,
                );
            }
        }
    }
}
