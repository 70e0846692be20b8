// src/checker/call.rs
//
// Call resolution: free functions, methods through receiver/embed search,
// and fn-typed variables. Handles argument checking, generic inference and
// instantiation recording, attribute enforcement, and or-block semantics.

use tracing::trace;

use crate::ast::{CallExpr, Expr, OrBlock, OrKind, Stmt};
use crate::checker::Checker;
use crate::errors::{SemanticError, SemanticNotice};
use crate::scope::{ShareKind, Var};
use crate::table::{
    FnSig, GenericInferError, Language, LookupError, TypeFlags, TypeId, TypeInfo, TypeKind,
    ERROR_TYPE, VOID_TYPE,
};

impl Checker<'_> {
    pub(crate) fn call_expr(&mut self, n: &mut CallExpr) -> TypeId {
        // The if-guard only covers the outermost call.
        let in_guard = std::mem::replace(&mut self.in_if_guard, false);
        let sig = if n.is_method || n.left.is_some() {
            match self.resolve_method(n) {
                Some(sig) => sig,
                None => {
                    n.typ = VOID_TYPE;
                    return VOID_TYPE;
                }
            }
        } else {
            match self.resolve_free_fn(n) {
                Some(sig) => sig,
                None => {
                    n.typ = VOID_TYPE;
                    return VOID_TYPE;
                }
            }
        };

        // `[if tag]` calls are statically elided when the tag is disabled.
        if let Some(tag) = &sig.attrs.ctdefine
            && !self.opts.enabled_tags.contains(tag)
        {
            trace!(name = %n.name, tag = %tag, "call elided by compile tag");
            n.typ = VOID_TYPE;
            n.return_type = VOID_TYPE;
            return VOID_TYPE;
        }
        if sig.attrs.is_deprecated {
            let msg = if sig.attrs.deprecation_msg.is_empty() {
                String::new()
            } else {
                format!("; {}", sig.attrs.deprecation_msg)
            };
            self.notice(
                SemanticNotice::Deprecated {
                    what: "function",
                    name: n.name.clone(),
                    msg,
                    span: n.pos.into(),
                },
                n.pos,
            );
        }
        if sig.attrs.is_unsafe && self.in_unsafe == 0 {
            self.error(
                SemanticError::RequiresUnsafe {
                    what: format!("function `{}`", n.name),
                    span: n.pos.into(),
                },
                n.pos,
            );
        }
        n.is_noreturn = sig.attrs.is_noreturn;

        self.check_call_args(n, &sig);
        let arg_types: Vec<TypeId> = n.args.iter().map(|a| a.typ).collect();

        // Generic instantiation.
        let mut return_type = sig.return_type;
        if sig.is_generic() {
            let concrete = if !n.concrete_types.is_empty() {
                n.concrete_types.clone()
            } else {
                match self.table.infer_fn_generic_types(&sig, &arg_types) {
                    Ok(c) => c,
                    Err(GenericInferError::Ambiguous { name }) => {
                        self.error(
                            SemanticError::GenericInferenceAmbiguous {
                                name,
                                span: n.pos.into(),
                            },
                            n.pos,
                        );
                        n.typ = VOID_TYPE;
                        return VOID_TYPE;
                    }
                    Err(GenericInferError::Unbound { name }) => {
                        self.error(
                            SemanticError::GenericInferenceUnbound {
                                name,
                                span: n.pos.into(),
                            },
                            n.pos,
                        );
                        n.typ = VOID_TYPE;
                        return VOID_TYPE;
                    }
                }
            };
            n.concrete_types = concrete.clone();
            let fully_concrete = concrete.iter().all(|t| {
                !t.has_generic()
                    && !t.is_unresolved()
                    && self.table.sym(*t).kind != TypeKind::Placeholder
            });
            if fully_concrete {
                let key = sig.qualified_name();
                if self.table.register_fn_concrete_types(&key, &concrete) {
                    trace!(name = %key, "new generic instantiation, scheduling re-check");
                    self.need_recheck = true;
                }
            }
            if let Some(resolved) = self.table.resolve_generic_to_concrete(
                return_type,
                &sig.generic_names,
                &concrete,
            ) {
                return_type = resolved;
            }
        }
        // Substitute the enclosing function's generics when re-checking an
        // instantiated body.
        if return_type.has_generic() && !self.cur_concrete_types.is_empty() {
            let names = self.cur_fn_generic_names.clone();
            let concrete = self.cur_concrete_types.clone();
            if let Some(resolved) =
                self.table
                    .resolve_generic_to_concrete(return_type, &names, &concrete)
            {
                return_type = resolved;
            }
        }
        n.return_type = return_type;

        let result = self.check_or_block(n, return_type, in_guard);
        n.typ = result;
        result
    }

    // ------------------------------------------------------------------
    // Callee resolution
    // ------------------------------------------------------------------

    fn resolve_free_fn(&mut self, n: &mut CallExpr) -> Option<FnSig> {
        let qualified = if n.mod_name.is_empty() {
            self.qualify(&n.name)
        } else {
            format!("{}.{}", n.mod_name, n.name)
        };
        if let Some(sig) = self
            .table
            .find_fn(&qualified)
            .or_else(|| self.table.find_fn(&n.name))
            .cloned()
        {
            return Some(sig);
        }
        // A variable of function type is callable.
        if let Some(var) = self.lookup_var(&n.name) {
            self.lookup_and_use(&n.name);
            let sym = self.table.sym(var.typ);
            if let TypeInfo::Function { sig } = &sym.info {
                return Some((**sig).clone());
            }
            let typ = self.type_str(var.typ);
            self.error(
                SemanticError::NotCallable {
                    name: n.name.clone(),
                    typ,
                    span: n.pos.into(),
                },
                n.pos,
            );
            return None;
        }
        self.error(
            SemanticError::UnknownFunction {
                name: n.name.clone(),
                span: n.pos.into(),
            },
            n.pos,
        );
        None
    }

    fn resolve_method(&mut self, n: &mut CallExpr) -> Option<FnSig> {
        let left = n.left.as_mut()?;
        let left_type = self.expr(left);
        n.receiver_type = left_type;
        if left_type.is_unresolved() {
            return None;
        }
        let method = match self.table.find_method_with_embeds(left_type.plain(), &n.name) {
            Ok(m) => m,
            Err(err @ LookupError::Ambiguous { .. }) => {
                self.error(
                    SemanticError::AmbiguousMember {
                        message: err.to_string(),
                        span: n.pos.into(),
                    },
                    n.pos,
                );
                return None;
            }
            Err(LookupError::NotFound { .. }) => {
                // A field holding a fn value is also callable.
                if let Ok(field) = self.table.find_field_with_embeds(left_type.plain(), &n.name)
                    && let TypeInfo::Function { sig } = &self.table.sym(field.typ).info
                {
                    return Some((**sig).clone());
                }
                let typ = self.type_str(left_type);
                self.error(
                    SemanticError::NoSuchMethod {
                        typ,
                        method: n.name.clone(),
                        span: n.pos.into(),
                    },
                    n.pos,
                );
                return None;
            }
        };

        // Shared receivers need a lock context; mutating methods a write lock.
        if let Expr::Ident(ident) = n.left.as_deref().unwrap()
            && let Some(var) = self.lookup_var(&ident.name)
            && var.share == ShareKind::Shared
        {
            let name = ident.name.clone();
            if method.receiver_is_mut {
                if self.rlocked_names.contains(&name) {
                    self.error(
                        SemanticError::RlockMutation {
                            name,
                            span: n.pos.into(),
                        },
                        n.pos,
                    );
                } else if !self.locked_names.contains(&name) {
                    self.error(
                        SemanticError::SharedNotLocked {
                            name,
                            span: n.pos.into(),
                        },
                        n.pos,
                    );
                }
            } else if !self.locked_names.contains(&name) && !self.rlocked_names.contains(&name) {
                self.error(
                    SemanticError::SharedNotLocked {
                        name,
                        span: n.pos.into(),
                    },
                    n.pos,
                );
            }
        } else if method.receiver_is_mut {
            let left = n.left.as_deref().unwrap().clone();
            self.fail_if_immutable(&left);
        }
        Some(method)
    }

    // ------------------------------------------------------------------
    // Arguments
    // ------------------------------------------------------------------

    fn check_call_args(&mut self, n: &mut CallExpr, sig: &FnSig) {
        let params: Vec<_> = sig.visible_params().cloned().collect();
        let is_variadic = sig.attrs.is_variadic
            || params.last().map(|p| p.typ.is_variadic()).unwrap_or(false);
        let min_args = if is_variadic {
            params.len().saturating_sub(1)
        } else {
            params.len()
        };
        if n.args.len() < min_args || (!is_variadic && n.args.len() > params.len()) {
            self.error(
                SemanticError::WrongArgCount {
                    name: n.name.clone(),
                    expected: params.len(),
                    found: n.args.len(),
                    span: n.pos.into(),
                },
                n.pos,
            );
        }

        for (i, arg) in n.args.iter_mut().enumerate() {
            let param = if i < params.len() {
                params.get(i)
            } else if is_variadic {
                params.last()
            } else {
                None
            };
            let Some(param) = param else {
                self.expr(&mut arg.expr);
                arg.typ = arg.expr.typ();
                continue;
            };
            let want = if param.typ.is_variadic() {
                param.typ.clear_flag(TypeFlags::VARIADIC)
            } else {
                param.typ
            };
            let saved = self.expected_type;
            self.expected_type = want;
            let got = self.expr(&mut arg.expr);
            self.expected_type = saved;
            arg.typ = got;
            arg.pos = arg.expr.pos();

            if param.is_mut {
                let expr = arg.expr.as_ref().clone();
                self.fail_if_immutable(&expr);
            }
            if !self.check_expected_call_arg(got, want, sig.language) {
                // Interface-typed parameters get the precise conformance
                // diagnostic instead of a generic mismatch.
                if !got.is_unresolved()
                    && !want.is_unresolved()
                    && self.table.final_kind(want) == TypeKind::Interface
                {
                    let iface = TypeId::new(self.table.final_idx(want));
                    self.report_missing_iface_member(got, iface, arg.pos);
                } else {
                    let expected = self.type_str(want);
                    let found = self.type_str(got);
                    self.error(
                        SemanticError::TypeMismatch {
                            expected,
                            found,
                            span: arg.pos.into(),
                        },
                        arg.pos,
                    );
                }
            }
        }
    }

    /// Language-aware argument compatibility: C callees widen liberally,
    /// native callees require identity modulo shared/auto-deref/literals.
    pub(crate) fn check_expected_call_arg(
        &mut self,
        got: TypeId,
        want: TypeId,
        language: Language,
    ) -> bool {
        if language == Language::C {
            return self.check_types_c_relaxed(got, want);
        }
        if self.check_types(got, want) {
            return true;
        }
        // Auto-(de)referencing: same symbol, different pointer depth.
        if self.table.same_final_idx(got, want) {
            return true;
        }
        // shared T passed where T is expected.
        if got.is_shared() && self.table.same_final_idx(got.clear_flags(), want) {
            return true;
        }
        false
    }

    // ------------------------------------------------------------------
    // Optionals and or-blocks
    // ------------------------------------------------------------------

    fn check_or_block(&mut self, n: &mut CallExpr, return_type: TypeId, in_guard: bool) -> TypeId {
        if !return_type.is_optional() {
            return return_type;
        }
        let unwrapped = return_type.clear_flag(TypeFlags::OPTIONAL);
        match n.or_block.kind {
            OrKind::Absent => {
                // An enclosing `if x := f() {}` guard handles the optional.
                if !in_guard {
                    self.error(
                        SemanticError::OptionalNotHandled {
                            name: n.name.clone(),
                            span: n.pos.into(),
                        },
                        n.pos,
                    );
                }
                unwrapped
            }
            OrKind::Propagate => {
                if !self.cur_fn_ret.is_optional() && self.cur_fn_name != "main" {
                    let fn_name = self.cur_fn_name.clone();
                    self.error(
                        SemanticError::PropagationRequiresOptional {
                            fn_name,
                            span: n.pos.into(),
                        },
                        n.pos,
                    );
                }
                unwrapped
            }
            OrKind::Block => {
                self.or_block_stmts(&mut n.or_block, unwrapped);
                unwrapped
            }
        }
    }

    fn or_block_stmts(&mut self, or_block: &mut OrBlock, expected: TypeId) {
        self.open_scope();
        // `err` is implicitly bound to the failure inside the block.
        self.define_var(Var {
            name: "err".into(),
            typ: ERROR_TYPE,
            is_used: true,
            ..Var::default()
        });
        self.stmts(&mut or_block.stmts);
        self.close_scope();

        let Some(last) = or_block.stmts.last() else {
            if expected != VOID_TYPE && !expected.is_unresolved() {
                let expected_s = self.type_str(expected);
                self.error(
                    SemanticError::OrBlockTypeMismatch {
                        expected: expected_s,
                        found: "an empty block".into(),
                        span: or_block.pos.into(),
                    },
                    or_block.pos,
                );
            }
            return;
        };
        match last {
            Stmt::Return(_) | Stmt::Branch(_) => {}
            Stmt::ExprStmt(es) => {
                if let Expr::Call(call) = &es.expr
                    && call.is_noreturn
                {
                    return;
                }
                let got = es.typ;
                if expected != VOID_TYPE
                    && !expected.is_unresolved()
                    && !self.check_types(got, expected)
                {
                    let expected_s = self.type_str(expected);
                    let found = self.type_str(got);
                    let pos = es.pos;
                    self.error(
                        SemanticError::OrBlockTypeMismatch {
                            expected: expected_s,
                            found,
                            span: pos.into(),
                        },
                        pos,
                    );
                }
            }
            other => {
                if expected != VOID_TYPE && !expected.is_unresolved() {
                    let expected_s = self.type_str(expected);
                    let pos = other.pos();
                    self.error(
                        SemanticError::OrBlockTypeMismatch {
                            expected: expected_s,
                            found: "a statement".into(),
                            span: pos.into(),
                        },
                        pos,
                    );
                }
            }
        }
    }
}
