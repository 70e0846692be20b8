// src/checker/assign.rs
//
// Assignment checking: declaration (`:=`) vs plain (`=`) vs compound
// arithmetic forms, multi-return count balance, addressability and
// mutability of targets.

use crate::ast::{AssignOp, AssignStmt, Expr};
use crate::checker::Checker;
use crate::errors::SemanticError;
use crate::scope::{ShareKind, Var};
use crate::table::{TypeFlags, TypeId, TypeInfo, TypeKind, VOID_TYPE};

impl Checker<'_> {
    pub(crate) fn assign_stmt(&mut self, a: &mut AssignStmt) {
        if a.op == AssignOp::Decl {
            self.decl_assign(a);
        } else {
            self.plain_assign(a);
        }
    }

    // ------------------------------------------------------------------
    // `x := rhs`
    // ------------------------------------------------------------------

    fn decl_assign(&mut self, a: &mut AssignStmt) {
        let mut right_types = Vec::new();
        for r in &mut a.right {
            let t = self.expr(r);
            right_types.push(t);
        }
        // A single multi-return call fans out across the targets.
        let flattened = self.flatten_multi_return(&right_types, a.left.len());
        a.right_types = flattened.clone();

        if a.left.len() != flattened.len() {
            self.error(
                SemanticError::AssignCountMismatch {
                    left: a.left.len(),
                    right: flattened.len(),
                    span: a.pos.into(),
                },
                a.pos,
            );
        }

        for (i, target) in a.left.iter_mut().enumerate() {
            let rhs_type = flattened.get(i).copied().unwrap_or(VOID_TYPE);
            let Expr::Ident(ident) = target else {
                let pos = target.pos();
                self.error(SemanticError::NotAnLvalue { span: pos.into() }, pos);
                continue;
            };
            if ident.name == "_" {
                ident.typ = rhs_type;
                a.left_types.push(rhs_type);
                continue;
            }
            if self.scope_has_in_current(&ident.name) {
                self.error(
                    SemanticError::Redefinition {
                        name: ident.name.clone(),
                        span: ident.pos.into(),
                    },
                    ident.pos,
                );
                continue;
            }
            let mut typ = self.table.mktyp(rhs_type);
            let share = if ident.is_shared || typ.is_shared() {
                typ = typ.set_flag(TypeFlags::SHARED);
                ShareKind::Shared
            } else {
                ShareKind::Plain
            };
            ident.typ = typ;
            a.left_types.push(typ);
            self.define_var(Var {
                name: ident.name.clone(),
                typ,
                is_mut: ident.is_mut,
                share,
                pos: ident.pos,
                ..Var::default()
            });
        }
    }

    // ------------------------------------------------------------------
    // `x = rhs` and compound forms
    // ------------------------------------------------------------------

    fn plain_assign(&mut self, a: &mut AssignStmt) {
        let mut left_types = Vec::new();
        for target in &mut a.left {
            let t = self.expr(target);
            left_types.push(t);
        }
        a.left_types = left_types.clone();

        let mut right_types = Vec::new();
        for (i, r) in a.right.iter_mut().enumerate() {
            let saved = self.expected_type;
            self.expected_type = left_types.get(i).copied().unwrap_or(TypeId::ZERO);
            let t = self.expr(r);
            self.expected_type = saved;
            right_types.push(t);
        }
        let flattened = self.flatten_multi_return(&right_types, a.left.len());
        a.right_types = flattened.clone();

        if a.left.len() != flattened.len() {
            self.error(
                SemanticError::AssignCountMismatch {
                    left: a.left.len(),
                    right: flattened.len(),
                    span: a.pos.into(),
                },
                a.pos,
            );
        }

        for (i, target) in a.left.iter().enumerate() {
            if matches!(target, Expr::Ident(id) if id.name == "_") {
                continue;
            }
            self.fail_if_immutable(target);
            let lt = left_types.get(i).copied().unwrap_or(VOID_TYPE);
            let rt = flattened.get(i).copied().unwrap_or(VOID_TYPE);
            if lt.is_unresolved() || rt.is_unresolved() {
                continue;
            }
            if a.op.is_arithmetic() {
                self.check_compound_op(a, lt, rt);
                continue;
            }
            if !self.check_types(rt, lt) {
                let expected = self.type_str(lt);
                let found = self.type_str(rt);
                let pos = target.pos();
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

    fn check_compound_op(&mut self, a: &AssignStmt, lt: TypeId, rt: TypeId) {
        let lk = self.table.final_kind(lt);
        let rk = self.table.final_kind(rt);
        let ok = match a.op {
            AssignOp::Plus => {
                (lk.is_number() && rk.is_number())
                    || (lk == TypeKind::String && rk == TypeKind::String)
                    || lk == TypeKind::Array
            }
            AssignOp::Minus | AssignOp::Mul | AssignOp::Div | AssignOp::Mod => {
                lk.is_number() && rk.is_number()
            }
            AssignOp::And | AssignOp::Or | AssignOp::Xor | AssignOp::Shl | AssignOp::Shr => {
                lk.is_int() && rk.is_int()
            }
            AssignOp::Assign | AssignOp::Decl => true,
        };
        if !ok {
            let left = self.type_str(lt);
            let right = self.type_str(rt);
            self.error(
                SemanticError::InvalidOperands {
                    op: a.op.symbol().to_string(),
                    left,
                    right,
                    span: a.pos.into(),
                },
                a.pos,
            );
            return;
        }
        if lk.is_number()
            && rk.is_number()
            && !rk.is_literal()
            && self.table.promote_num(lt, rt).map(|t| t.idx()) != Some(lt.idx())
            && !self.table.same_final_idx(lt, rt)
        {
            let expected = self.type_str(lt);
            let found = self.type_str(rt);
            self.error(
                SemanticError::TypeMismatch {
                    expected,
                    found,
                    span: a.pos.into(),
                },
                a.pos,
            );
        }
    }

    fn flatten_multi_return(&self, right_types: &[TypeId], left_len: usize) -> Vec<TypeId> {
        if right_types.len() == 1 && left_len > 1 && !right_types[0].is_unresolved() {
            if let TypeInfo::MultiReturn { types } = &self
                .table
                .sym_by_idx(self.table.final_idx(right_types[0]))
                .info
            {
                return types.clone();
            }
        }
        right_types.to_vec()
    }
}
