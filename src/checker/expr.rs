// src/checker/expr.rs
//
// Expression typing: a single dispatcher returning the expression's TypeId,
// mutating nodes to record computed types. Failing paths report and fall
// back to void so downstream diagnostics still fire.

use crate::ast::{
    ArrayInit, Assoc, CastExpr, ChanInit, ConcatExpr, EnumVal, Expr, Ident, IdentKind, IndexExpr,
    InfixExpr, InfixOp, MapInit, PostfixExpr, PrefixExpr, PrefixOp, RangeExpr, SelectorExpr,
    StringInterLiteral, StructInit,
};
use crate::checker::Checker;
use crate::errors::{SemanticError, SemanticWarning};
use crate::scope::SmartcastKey;
use crate::table::{
    TypeId, TypeInfo, TypeKind, BOOL_TYPE, INT_TYPE, RUNE_TYPE, STRING_TYPE, U8_TYPE, VOID_TYPE,
};

impl Checker<'_> {
    pub(crate) fn expr(&mut self, e: &mut Expr) -> TypeId {
        if self.diags.should_abort {
            return VOID_TYPE;
        }
        self.expr_level += 1;
        if self.expr_level > self.opts.expr_level_cutoff {
            self.expr_level -= 1;
            let pos = e.pos();
            self.error(
                SemanticError::NestingTooDeep {
                    what: "expression",
                    span: pos.into(),
                },
                pos,
            );
            return VOID_TYPE;
        }
        let t = self.expr_inner(e);
        self.expr_level -= 1;
        t
    }

    fn expr_inner(&mut self, e: &mut Expr) -> TypeId {
        match e {
            // The parser already reported these.
            Expr::NodeError { .. } => VOID_TYPE,
            Expr::IntegerLiteral { .. } => crate::table::INT_LITERAL_TYPE,
            Expr::FloatLiteral { .. } => crate::table::FLOAT_LITERAL_TYPE,
            Expr::StringLiteral { .. } => STRING_TYPE,
            Expr::CharLiteral { .. } => RUNE_TYPE,
            Expr::BoolLiteral { .. } => BOOL_TYPE,
            Expr::None { .. } => crate::table::NONE_TYPE,
            Expr::Ident(n) => self.ident(n),
            Expr::StringInterLiteral(n) => self.string_inter_literal(n),
            Expr::Prefix(n) => self.prefix_expr(n),
            Expr::Infix(n) => self.infix_expr(n),
            Expr::Postfix(n) => self.postfix_expr(n),
            Expr::Index(n) => self.index_expr(n),
            Expr::Selector(n) => self.selector_expr(n),
            Expr::Call(n) => self.call_expr(n),
            Expr::Cast(n) => self.cast_expr(n),
            Expr::AsCast(n) => self.as_cast_expr(n),
            Expr::Match(n) => self.match_expr(n),
            Expr::If(n) => self.if_expr(n),
            Expr::IfGuard(n) => {
                // A guard outside `if` still types its inner call.
                let inner = self.expr(&mut n.expr);
                n.typ = inner;
                BOOL_TYPE
            }
            Expr::StructInit(n) => self.struct_init(n),
            Expr::ArrayInit(n) => self.array_init(n),
            Expr::MapInit(n) => self.map_init(n),
            Expr::ChanInit(n) => self.chan_init(n),
            Expr::Concat(n) => self.concat_expr(n),
            Expr::Range(n) => self.range_expr(n),
            Expr::Lock(n) => self.lock_expr(n),
            Expr::Unsafe(n) => {
                self.in_unsafe += 1;
                let t = self.expr(&mut n.expr);
                self.in_unsafe -= 1;
                t
            }
            Expr::Par(n) => self.expr(&mut n.expr),
            Expr::Go(n) => {
                let ret = self.call_expr(&mut n.call);
                let thread = self.table.find_or_register_thread(ret);
                n.typ = thread;
                thread
            }
            Expr::Select(n) => {
                for branch in &mut n.branches {
                    if let Some(comm) = &mut branch.comm {
                        self.stmt(comm);
                    }
                    self.stmts(&mut branch.stmts);
                }
                n.typ = BOOL_TYPE;
                BOOL_TYPE
            }
            Expr::SizeOf { .. } => INT_TYPE,
            Expr::OffsetOf {
                struct_typ,
                field,
                pos,
            } => {
                let struct_typ = *struct_typ;
                let field = field.clone();
                let pos = *pos;
                if !struct_typ.is_unresolved()
                    && self.table.find_field(struct_typ, &field).is_none()
                {
                    let typ = self.type_str(struct_typ);
                    self.error(
                        SemanticError::NoSuchField {
                            typ,
                            field,
                            span: pos.into(),
                        },
                        pos,
                    );
                }
                INT_TYPE
            }
            Expr::TypeOf { expr, .. } => {
                self.expr(expr);
                STRING_TYPE
            }
            Expr::At { .. } => STRING_TYPE,
            Expr::ComptimeCall(n) => {
                n.typ = VOID_TYPE;
                VOID_TYPE
            }
            Expr::ComptimeSelector(n) => {
                self.expr(&mut n.left);
                n.typ = VOID_TYPE;
                VOID_TYPE
            }
            Expr::EnumVal(n) => self.enum_val(n),
            Expr::Assoc(n) => self.assoc_expr(n),
            Expr::Dump { expr, typ, .. } => {
                let t = self.expr(expr);
                *typ = t;
                t
            }
            Expr::Likely { expr, pos, .. } => {
                let t = self.expr(expr);
                if !self.check_types(t, BOOL_TYPE) {
                    let found = self.type_str(t);
                    let pos = *pos;
                    self.error(
                        SemanticError::NonBoolCondition {
                            found,
                            span: pos.into(),
                        },
                        pos,
                    );
                }
                BOOL_TYPE
            }
            Expr::Sql(n) => {
                n.typ = VOID_TYPE;
                VOID_TYPE
            }
            Expr::TypeNode { typ, .. } => *typ,
        }
    }

    // ------------------------------------------------------------------
    // Identifiers
    // ------------------------------------------------------------------

    fn ident(&mut self, n: &mut Ident) -> TypeId {
        if n.name == "_" {
            n.typ = VOID_TYPE;
            return VOID_TYPE;
        }
        // Smartcast refinement wins over the declared type.
        if let Some(refined) = self.smartcast_lookup(&SmartcastKey::var(&n.name)) {
            self.lookup_and_use(&n.name);
            n.kind = IdentKind::Variable;
            n.typ = refined;
            return refined;
        }
        if let Some(obj) = self.lookup_and_use(&n.name) {
            let typ = obj.typ();
            n.kind = match obj {
                crate::scope::ScopeObject::Var(_) => IdentKind::Variable,
                crate::scope::ScopeObject::Const { .. } => IdentKind::Constant,
                crate::scope::ScopeObject::Global { .. } => IdentKind::Global,
            };
            n.typ = typ;
            return typ;
        }
        // A bare function name used as a value.
        let qualified = self.qualify(&n.name);
        let found = self
            .table
            .find_fn(&qualified)
            .or_else(|| self.table.find_fn(&n.name))
            .cloned();
        if let Some(sig) = found {
            let module = sig.module.clone();
            let typ = self.table.find_or_register_fn_type(&module, sig, false, true);
            n.kind = IdentKind::Function;
            n.typ = typ;
            return typ;
        }
        self.error(
            SemanticError::UndefinedIdent {
                name: n.name.clone(),
                span: n.pos.into(),
            },
            n.pos,
        );
        n.typ = VOID_TYPE;
        VOID_TYPE
    }

    // ------------------------------------------------------------------
    // Infix
    // ------------------------------------------------------------------

    fn infix_expr(&mut self, n: &mut InfixExpr) -> TypeId {
        let left_type = self.expr(&mut n.left);
        let saved_expected = self.expected_type;
        self.expected_type = left_type;
        let right_type = self.expr(&mut n.right);
        self.expected_type = saved_expected;
        n.left_type = left_type;
        n.right_type = right_type;

        let lk = self.table.final_kind(left_type);
        let rk = self.table.final_kind(right_type);

        // Flag enums admit a closed operator set.
        if lk == TypeKind::Enum && self.table.same_final_idx(left_type, right_type) {
            let is_flag = self
                .table
                .sym_by_idx(self.table.final_idx(left_type))
                .enum_info()
                .map(|i| i.is_flag)
                .unwrap_or(false);
            if is_flag {
                return match n.op {
                    InfixOp::Eq | InfixOp::Ne => self.finish(n, BOOL_TYPE),
                    InfixOp::BitAnd | InfixOp::BitOr | InfixOp::BitXor => {
                        self.finish(n, left_type)
                    }
                    _ => {
                        self.error(
                            SemanticError::FlagEnumBadOperator {
                                op: n.op.symbol().to_string(),
                                span: n.pos.into(),
                            },
                            n.pos,
                        );
                        self.finish(n, VOID_TYPE)
                    }
                };
            }
        }

        let typ = match n.op {
            InfixOp::LogAnd | InfixOp::LogOr => {
                self.check_bool_operand(&n.left, left_type);
                self.check_bool_operand(&n.right, right_type);
                // `a && b || c` must be parenthesized.
                let other = if n.op == InfixOp::LogAnd {
                    InfixOp::LogOr
                } else {
                    InfixOp::LogAnd
                };
                if infix_op_of(&n.left) == Some(other) || infix_op_of(&n.right) == Some(other) {
                    self.error(
                        SemanticError::AmbiguousBoolExpr {
                            span: n.pos.into(),
                        },
                        n.pos,
                    );
                }
                BOOL_TYPE
            }
            InfixOp::Eq | InfixOp::Ne => {
                let compatible = self.check_types(left_type, right_type)
                    || self.check_types(right_type, left_type)
                    || self.table.promote_num(left_type, right_type).is_some();
                if !compatible {
                    self.invalid_operands(n, left_type, right_type);
                }
                BOOL_TYPE
            }
            InfixOp::Lt | InfixOp::Gt | InfixOp::Le | InfixOp::Ge => {
                if lk == TypeKind::Struct && self.table.same_final_idx(left_type, right_type) {
                    if self.table.find_method(left_type, "<").is_none() {
                        let typ = self.type_str(left_type);
                        self.error(
                            SemanticError::StructComparisonUndefined {
                                typ,
                                span: n.pos.into(),
                            },
                            n.pos,
                        );
                    }
                } else if lk == TypeKind::String && rk == TypeKind::String {
                    // Strings order lexicographically.
                } else if self.table.promote_num(left_type, right_type).is_none() {
                    self.comparison_operand_error(n, left_type, right_type);
                }
                BOOL_TYPE
            }
            InfixOp::Plus if lk == TypeKind::String && rk == TypeKind::String => STRING_TYPE,
            InfixOp::Plus
            | InfixOp::Minus
            | InfixOp::Mul
            | InfixOp::Div
            | InfixOp::Mod => self.arith_expr(n, left_type, right_type),
            InfixOp::Shl => {
                if lk == TypeKind::Array {
                    self.append_expr(n, left_type, right_type)
                } else {
                    self.shift_expr(n, left_type, right_type, true)
                }
            }
            InfixOp::Shr => self.shift_expr(n, left_type, right_type, false),
            InfixOp::BitAnd | InfixOp::BitOr | InfixOp::BitXor => {
                if !lk.is_int() || !rk.is_int() {
                    self.invalid_operands(n, left_type, right_type);
                    VOID_TYPE
                } else {
                    self.table
                        .promote_num(left_type, right_type)
                        .unwrap_or(left_type)
                }
            }
            InfixOp::In | InfixOp::NotIn => {
                match &self.table.sym_by_idx(self.table.final_idx(right_type)).info {
                    TypeInfo::Array { elem, .. } | TypeInfo::ArrayFixed { elem, .. } => {
                        let elem = *elem;
                        if !self.check_types(left_type, elem) {
                            self.invalid_operands(n, left_type, right_type);
                        }
                    }
                    TypeInfo::Map { key, .. } => {
                        let key = *key;
                        if !self.check_types(left_type, key) {
                            self.invalid_operands(n, left_type, right_type);
                        }
                    }
                    _ => {
                        let found = self.type_str(right_type);
                        self.error(
                            SemanticError::InNeedsContainer {
                                found,
                                span: n.pos.into(),
                            },
                            n.pos,
                        );
                    }
                }
                BOOL_TYPE
            }
            InfixOp::Is | InfixOp::NotIs => {
                self.is_expr(n, left_type, right_type);
                BOOL_TYPE
            }
        };
        self.finish(n, typ)
    }

    fn finish(&mut self, n: &mut InfixExpr, typ: TypeId) -> TypeId {
        n.typ = typ;
        typ
    }

    fn check_bool_operand(&mut self, operand: &Expr, typ: TypeId) {
        if !self.check_types(typ, BOOL_TYPE) {
            let found = self.type_str(typ);
            let pos = operand.pos();
            self.error(
                SemanticError::NonBoolCondition {
                    found,
                    span: pos.into(),
                },
                pos,
            );
        }
    }

    fn invalid_operands(&mut self, n: &InfixExpr, left: TypeId, right: TypeId) {
        let left = self.type_str(left);
        let right = self.type_str(right);
        self.error(
            SemanticError::InvalidOperands {
                op: n.op.symbol().to_string(),
                left,
                right,
                span: n.pos.into(),
            },
            n.pos,
        );
    }

    fn comparison_operand_error(&mut self, n: &InfixExpr, left: TypeId, right: TypeId) {
        let lk = self.table.final_kind(left);
        let rk = self.table.final_kind(right);
        if lk.is_int() && rk.is_int() && lk.is_signed() != rk.is_signed() {
            let left = self.type_str(left);
            let right = self.type_str(right);
            self.error(
                SemanticError::MixedSignedness {
                    left,
                    right,
                    span: n.pos.into(),
                },
                n.pos,
            );
        } else {
            self.invalid_operands(n, left, right);
        }
    }

    fn arith_expr(&mut self, n: &InfixExpr, left: TypeId, right: TypeId) -> TypeId {
        // Pointer arithmetic is an unsafe-only operation.
        if left.is_ptr() || right.is_ptr() {
            if self.in_unsafe == 0 {
                self.error(
                    SemanticError::RequiresUnsafe {
                        what: "pointer arithmetic".to_string(),
                        span: n.pos.into(),
                    },
                    n.pos,
                );
            }
            return if left.is_ptr() { left } else { right };
        }
        if matches!(n.op, InfixOp::Div | InfixOp::Mod)
            && n.right.const_int_value() == Some(0)
        {
            self.error(
                SemanticError::DivisionByZero {
                    span: n.pos.into(),
                },
                n.pos,
            );
            return left;
        }
        match self.table.promote_num(left, right) {
            Some(t) => t,
            None => {
                self.comparison_operand_error(n, left, right);
                VOID_TYPE
            }
        }
    }

    /// `arr << elem` appends; interface-typed elements check conformance.
    fn append_expr(&mut self, n: &InfixExpr, left: TypeId, right: TypeId) -> TypeId {
        let elem = self.table.value_type(left);
        // Appending a whole array of the same type is also accepted.
        if self.check_types(right, elem) || self.check_types(right, left) {
            return left;
        }
        let elem_kind = self.table.final_kind(elem);
        if elem_kind == TypeKind::Interface {
            let iface = TypeId::new(self.table.final_idx(elem));
            if self.table.does_type_implement_interface(right.plain(), iface) {
                return left;
            }
        }
        let expected = self.type_str(elem);
        let found = self.type_str(right);
        self.error(
            SemanticError::TypeMismatch {
                expected,
                found,
                span: n.pos.into(),
            },
            n.pos,
        );
        left
    }

    fn shift_expr(
        &mut self,
        n: &InfixExpr,
        left: TypeId,
        right: TypeId,
        is_left_shift: bool,
    ) -> TypeId {
        let lk = self.table.final_kind(left);
        let rk = self.table.final_kind(right);
        if !lk.is_int() {
            let found = self.type_str(left);
            self.error(
                SemanticError::ShiftOnNonInteger {
                    found,
                    span: n.pos.into(),
                },
                n.pos,
            );
            return VOID_TYPE;
        }
        if !rk.is_int() {
            let found = self.type_str(right);
            self.error(
                SemanticError::ShiftOnNonInteger {
                    found,
                    span: n.pos.into(),
                },
                n.pos,
            );
            return left;
        }
        if is_left_shift && lk.is_signed() && lk != TypeKind::IntLiteral {
            self.warn(
                SemanticWarning::LeftShiftOfSigned {
                    span: n.pos.into(),
                },
                n.pos,
            );
        }
        if let Some(count) = n.right.const_int_value() {
            let bits = lk.bit_width();
            if bits > 0 && (count < 0 || count as u32 >= bits) {
                let typ = self.type_str(left);
                self.error(
                    SemanticError::ShiftCountOverflow {
                        count,
                        bits,
                        typ,
                        span: n.pos.into(),
                    },
                    n.pos,
                );
            }
        }
        left
    }

    /// `x is T` / `x !is T`: valid on interfaces and sum types only; the
    /// variant is recorded by the surrounding if/match for smartcasting.
    fn is_expr(&mut self, n: &InfixExpr, left: TypeId, right: TypeId) {
        let lk = self.table.final_kind(left);
        if !matches!(lk, TypeKind::Interface | TypeKind::SumType) {
            let found = self.type_str(left);
            self.error(
                SemanticError::IsOnInvalidType {
                    found,
                    span: n.pos.into(),
                },
                n.pos,
            );
            return;
        }
        if lk == TypeKind::SumType && !self.is_sumtype_variant(right, left) {
            let variant = self.type_str(right);
            let sum = self.type_str(left);
            self.error(
                SemanticError::NotAVariant {
                    variant,
                    sum,
                    span: n.pos.into(),
                },
                n.pos,
            );
        }
    }

    // ------------------------------------------------------------------
    // Prefix / postfix
    // ------------------------------------------------------------------

    fn prefix_expr(&mut self, n: &mut PrefixExpr) -> TypeId {
        let right = self.expr(&mut n.right);
        let rk = self.table.final_kind(right);
        let typ = match n.op {
            PrefixOp::Minus => {
                if !rk.is_number() {
                    self.prefix_operand_error(n, "-", right);
                    VOID_TYPE
                } else {
                    right
                }
            }
            PrefixOp::Not => {
                if !self.check_types(right, BOOL_TYPE) {
                    self.prefix_operand_error(n, "!", right);
                }
                BOOL_TYPE
            }
            PrefixOp::BitNot => {
                let is_flag_enum = rk == TypeKind::Enum
                    && self
                        .table
                        .sym_by_idx(self.table.final_idx(right))
                        .enum_info()
                        .map(|i| i.is_flag)
                        .unwrap_or(false);
                if !rk.is_int() && !is_flag_enum {
                    self.prefix_operand_error(n, "~", right);
                }
                right
            }
            PrefixOp::Amp => {
                match n.right.as_ref() {
                    Expr::ArrayInit(init) if !init.is_fixed => {
                        self.cannot_address(n.pos, "an array literal")
                    }
                    Expr::MapInit(_) => self.cannot_address(n.pos, "a map value"),
                    Expr::Index(idx)
                        if matches!(idx.index.as_ref(), Expr::Range(_))
                            && self.table.final_kind(idx.left_type) == TypeKind::String =>
                    {
                        self.cannot_address(n.pos, "a string slice")
                    }
                    _ => {}
                }
                right.ref_()
            }
            PrefixOp::Deref => {
                if !right.is_ptr() {
                    self.prefix_operand_error(n, "*", right);
                    VOID_TYPE
                } else {
                    right.deref()
                }
            }
            PrefixOp::Arrow => match &self.table.sym_by_idx(self.table.final_idx(right)).info {
                TypeInfo::Chan { elem, .. } => *elem,
                _ => {
                    self.prefix_operand_error(n, "<-", right);
                    VOID_TYPE
                }
            },
        };
        n.typ = typ;
        typ
    }

    fn prefix_operand_error(&mut self, n: &PrefixExpr, op: &str, right: TypeId) {
        let found = self.type_str(right);
        self.error(
            SemanticError::InvalidOperands {
                op: op.to_string(),
                left: found.clone(),
                right: found,
                span: n.pos.into(),
            },
            n.pos,
        );
    }

    fn cannot_address(&mut self, pos: crate::span::Pos, what: &str) {
        self.error(
            SemanticError::CannotAddress {
                what: what.to_string(),
                span: pos.into(),
            },
            pos,
        );
    }

    fn postfix_expr(&mut self, n: &mut PostfixExpr) -> TypeId {
        let typ = self.expr(&mut n.expr);
        if !self.table.final_kind(typ).is_number() {
            let found = self.type_str(typ);
            self.error(
                SemanticError::InvalidOperands {
                    op: if n.op == crate::ast::PostfixOp::Inc {
                        "++"
                    } else {
                        "--"
                    }
                    .to_string(),
                    left: found.clone(),
                    right: found,
                    span: n.pos.into(),
                },
                n.pos,
            );
        }
        let expr = n.expr.as_ref().clone();
        self.fail_if_immutable(&expr);
        n.typ = typ;
        typ
    }

    // ------------------------------------------------------------------
    // Index
    // ------------------------------------------------------------------

    fn index_expr(&mut self, n: &mut IndexExpr) -> TypeId {
        let left_type = self.expr(&mut n.left);
        n.left_type = left_type;
        let lk = self.table.final_kind(left_type);

        if matches!(n.index.as_ref(), Expr::Range(_)) {
            self.expr(&mut n.index);
            let typ = match lk {
                TypeKind::Array => left_type,
                TypeKind::String => STRING_TYPE,
                TypeKind::ArrayFixed => {
                    let elem = self.table.value_type(left_type);
                    self.table.find_or_register_array(elem)
                }
                _ => {
                    let typ = self.type_str(left_type);
                    self.error(
                        SemanticError::NotIndexable {
                            typ,
                            span: n.pos.into(),
                        },
                        n.pos,
                    );
                    VOID_TYPE
                }
            };
            n.typ = typ;
            return typ;
        }

        let index_type = self.expr(&mut n.index);
        let ik = self.table.final_kind(index_type);
        let typ = match lk {
            TypeKind::Array | TypeKind::ArrayFixed => {
                if !ik.is_int() && ik != TypeKind::Enum {
                    let found = self.type_str(index_type);
                    self.error(
                        SemanticError::NonIntegerIndex {
                            found,
                            span: n.pos.into(),
                        },
                        n.pos,
                    );
                }
                self.table.value_type(left_type)
            }
            TypeKind::Map => {
                let TypeInfo::Map { key, value } =
                    self.table.sym_by_idx(self.table.final_idx(left_type)).info.clone()
                else {
                    return VOID_TYPE;
                };
                if !self.check_types(index_type, key) {
                    let expected = self.type_str(key);
                    let found = self.type_str(index_type);
                    self.error(
                        SemanticError::MapKeyMismatch {
                            expected,
                            found,
                            span: n.pos.into(),
                        },
                        n.pos,
                    );
                }
                value
            }
            TypeKind::String => {
                if !ik.is_int() {
                    let found = self.type_str(index_type);
                    self.error(
                        SemanticError::NonIntegerIndex {
                            found,
                            span: n.pos.into(),
                        },
                        n.pos,
                    );
                }
                U8_TYPE
            }
            _ if left_type.is_ptr() => {
                if self.in_unsafe == 0 {
                    self.warn(
                        SemanticWarning::PointerIndexOutsideUnsafe {
                            span: n.pos.into(),
                        },
                        n.pos,
                    );
                }
                left_type.deref()
            }
            _ if left_type.is_variadic() => self.table.value_type(left_type),
            _ => {
                let typ = self.type_str(left_type);
                self.error(
                    SemanticError::NotIndexable {
                        typ,
                        span: n.pos.into(),
                    },
                    n.pos,
                );
                VOID_TYPE
            }
        };
        n.typ = typ;
        typ
    }

    // ------------------------------------------------------------------
    // Selector
    // ------------------------------------------------------------------

    fn selector_expr(&mut self, n: &mut SelectorExpr) -> TypeId {
        let prevent_unwrap = self.prevent_sum_type_unwrapping;
        self.prevent_sum_type_unwrapping = false;

        let expr_type = self.expr(&mut n.expr);
        n.expr_type = expr_type;
        if expr_type.is_unresolved() {
            n.typ = VOID_TYPE;
            return VOID_TYPE;
        }

        // Reading a member of a shared variable needs a lock/rlock context.
        if let Expr::Ident(ident) = n.expr.as_ref()
            && let Some(var) = self.lookup_var(&ident.name)
            && var.share == crate::scope::ShareKind::Shared
            && !self.locked_names.contains(&ident.name)
            && !self.rlocked_names.contains(&ident.name)
        {
            self.error(
                SemanticError::SharedNotLocked {
                    name: ident.name.clone(),
                    span: n.pos.into(),
                },
                n.pos,
            );
        }

        let owner = expr_type.plain();
        let field = match self.table.find_field_with_embeds(owner, &n.field_name) {
            Ok(f) => f,
            Err(crate::table::LookupError::Ambiguous { .. }) => {
                let err = self
                    .table
                    .find_field_with_embeds(owner, &n.field_name)
                    .unwrap_err();
                self.error(
                    SemanticError::AmbiguousMember {
                        message: err.to_string(),
                        span: n.pos.into(),
                    },
                    n.pos,
                );
                n.typ = VOID_TYPE;
                return VOID_TYPE;
            }
            Err(_) => {
                // Fall back to a method referenced as a value.
                if let Ok(m) = self.table.find_method_with_embeds(owner, &n.field_name) {
                    let module = m.module.clone();
                    let typ = self.table.find_or_register_fn_type(&module, m, false, true);
                    n.typ = typ;
                    return typ;
                }
                let typ = self.type_str(expr_type);
                self.error(
                    SemanticError::NoSuchField {
                        typ,
                        field: n.field_name.clone(),
                        span: n.pos.into(),
                    },
                    n.pos,
                );
                n.typ = VOID_TYPE;
                return VOID_TYPE;
            }
        };

        // Cross-module visibility.
        let owner_sym = self.table.sym_by_idx(self.table.final_idx(owner));
        let owner_mod = owner_sym.module.clone();
        if !field.is_pub
            && !owner_mod.is_empty()
            && owner_mod != "builtin"
            && owner_mod != self.file_mod
        {
            let typ = self.type_str(expr_type);
            self.error(
                SemanticError::PrivateField {
                    typ,
                    field: n.field_name.clone(),
                    span: n.pos.into(),
                },
                n.pos,
            );
        }

        let mut typ = field.typ;
        if !prevent_unwrap {
            let key =
                SmartcastKey::selector(&n.expr.smartcast_key(), expr_type.plain(), &n.field_name);
            if let Some(refined) = self.smartcast_lookup(&key) {
                typ = refined;
            }
        }
        n.typ = typ;
        typ
    }

    // ------------------------------------------------------------------
    // Casts
    // ------------------------------------------------------------------

    fn cast_expr(&mut self, n: &mut CastExpr) -> TypeId {
        let from = self.expr(&mut n.expr);
        n.expr_type = from;
        let to = n.typ;
        if to.is_unresolved() || from.is_unresolved() {
            return VOID_TYPE;
        }
        let fk = self.table.final_kind(from);
        let tk = self.table.final_kind(to);

        let ok = match tk {
            _ if self.table.same_final_idx(from, to) => true,
            TypeKind::SumType => {
                if self.is_sumtype_variant(from, to) {
                    true
                } else {
                    let from_s = self.type_str(from);
                    let sum = self.type_str(to);
                    self.error(
                        SemanticError::CastToSumTypeInvalid {
                            from: from_s,
                            sum,
                            span: n.pos.into(),
                        },
                        n.pos,
                    );
                    return to;
                }
            }
            TypeKind::Interface => {
                let iface = TypeId::new(self.table.final_idx(to));
                if self.table.final_kind(from) == TypeKind::Interface {
                    false
                } else if self.table.does_type_implement_interface(from.plain(), iface) {
                    true
                } else {
                    self.report_missing_iface_member(from, iface, n.pos);
                    return to;
                }
            }
            _ if tk.is_number() => {
                if fk.is_number() || fk == TypeKind::Enum || fk == TypeKind::Bool
                    || fk == TypeKind::Char
                    || fk == TypeKind::Rune
                {
                    true
                } else if fk == TypeKind::String {
                    let suggestion = match tk {
                        k if k.is_int() => "use `s.int()` instead",
                        _ => "use `s.f64()` instead",
                    };
                    return self.bad_cast(n, from, to, Some(suggestion));
                } else {
                    false
                }
            }
            TypeKind::Enum => {
                if fk.is_int() {
                    true
                } else if fk == TypeKind::String {
                    return self.bad_cast(n, from, to, Some("match on the enum variants instead"));
                } else {
                    false
                }
            }
            TypeKind::String => {
                // []u8 and rune/char convert to string.
                matches!(fk, TypeKind::Rune | TypeKind::Char)
                    || matches!(
                        &self.table.sym_by_idx(self.table.final_idx(from)).info,
                        TypeInfo::Array { elem, .. } if self.table.final_kind(*elem) == TypeKind::U8
                    )
            }
            TypeKind::VoidPtr => true,
            _ if to.is_ptr() => {
                if fk == TypeKind::String {
                    return self.bad_cast(n, from, to, Some("use `s.str` to get its pointer"));
                }
                let allowed = from.is_ptr() || fk == TypeKind::VoidPtr || fk.is_int();
                if allowed && self.in_unsafe == 0 {
                    self.error(
                        SemanticError::RequiresUnsafe {
                            what: "pointer casting".to_string(),
                            span: n.pos.into(),
                        },
                        n.pos,
                    );
                }
                allowed
            }
            _ if tk == TypeKind::Array && matches!(fk, TypeKind::String) => {
                // string -> []u8
                matches!(
                    &self.table.sym_by_idx(self.table.final_idx(to)).info,
                    TypeInfo::Array { elem, .. } if self.table.final_kind(*elem) == TypeKind::U8
                )
            }
            TypeKind::Alias => self.check_types(from, to),
            TypeKind::Struct => self.table.same_final_idx(from, to),
            TypeKind::Bool => fk.is_int(),
            _ => false,
        };
        if !ok {
            return self.bad_cast(n, from, to, None);
        }
        to
    }

    fn bad_cast(
        &mut self,
        n: &CastExpr,
        from: TypeId,
        to: TypeId,
        suggestion: Option<&str>,
    ) -> TypeId {
        let from = self.type_str(from);
        let to_s = self.type_str(to);
        self.error(
            SemanticError::CannotCast {
                from,
                to: to_s,
                suggestion: suggestion.map(|s| format!(" ({s})")).unwrap_or_default(),
                span: n.pos.into(),
            },
            n.pos,
        );
        to
    }

    pub(crate) fn report_missing_iface_member(
        &mut self,
        typ: TypeId,
        iface: TypeId,
        pos: crate::span::Pos,
    ) {
        let Some(info) = self.table.sym(iface).interface_info().cloned() else {
            return;
        };
        for method in &info.methods {
            match self.table.find_method_with_embeds(typ.plain(), &method.name) {
                Ok(found) => {
                    if found.return_type.idx() != method.return_type.idx()
                        || found.visible_params().count() != method.visible_params().count()
                    {
                        let t = self.type_str(typ);
                        let i = self.type_str(iface);
                        let expected = self.type_str(method.return_type);
                        self.error(
                            SemanticError::InterfaceMethodMismatch {
                                typ: t,
                                method: method.name.clone(),
                                iface: i,
                                expected,
                                span: pos.into(),
                            },
                            pos,
                        );
                        return;
                    }
                }
                Err(_) => {
                    let t = self.type_str(typ);
                    let i = self.type_str(iface);
                    self.error(
                        SemanticError::InterfaceNotImplemented {
                            typ: t,
                            iface: i,
                            missing: "method",
                            member: method.name.clone(),
                            span: pos.into(),
                        },
                        pos,
                    );
                    return;
                }
            }
        }
        for field in &info.fields {
            if self.table.find_field_with_embeds(typ.plain(), &field.name).is_err() {
                let t = self.type_str(typ);
                let i = self.type_str(iface);
                self.error(
                    SemanticError::InterfaceNotImplemented {
                        typ: t,
                        iface: i,
                        missing: "field",
                        member: field.name.clone(),
                        span: pos.into(),
                    },
                    pos,
                );
                return;
            }
        }
        // Mutability or parameter-type subtleties: report generically.
        let t = self.type_str(typ);
        let i = self.type_str(iface);
        self.error(
            SemanticError::InterfaceNotImplemented {
                typ: t,
                iface: i,
                missing: "member",
                member: "(signature mismatch)".into(),
                span: pos.into(),
            },
            pos,
        );
    }

    fn as_cast_expr(&mut self, n: &mut crate::ast::AsCast) -> TypeId {
        let from = self.expr(&mut n.expr);
        n.expr_type = from;
        let fk = self.table.final_kind(from);
        if !matches!(fk, TypeKind::SumType | TypeKind::Interface) {
            let found = self.type_str(from);
            self.error(
                SemanticError::IsOnInvalidType {
                    found,
                    span: n.pos.into(),
                },
                n.pos,
            );
            return n.typ;
        }
        if fk == TypeKind::SumType && !self.is_sumtype_variant(n.typ, from) {
            let variant = self.type_str(n.typ);
            let sum = self.type_str(from);
            self.error(
                SemanticError::NotAVariant {
                    variant,
                    sum,
                    span: n.pos.into(),
                },
                n.pos,
            );
        }
        n.typ
    }

    // ------------------------------------------------------------------
    // Initializers
    // ------------------------------------------------------------------

    fn struct_init(&mut self, n: &mut StructInit) -> TypeId {
        if n.typ.is_unresolved() {
            n.typ = self.expected_type;
        }
        if n.typ.is_unresolved() {
            self.error(
                SemanticError::UnknownType {
                    name: "struct initializer".into(),
                    span: n.pos.into(),
                },
                n.pos,
            );
            return VOID_TYPE;
        }
        let sym_idx = self.table.final_idx(n.typ);
        let (kind, sym_name, full_name, generic_unbound, required) = {
            let sym = self.table.sym_by_idx(sym_idx);
            let generic_unbound = sym
                .struct_info()
                .map(|i| i.is_generic && i.concrete_types.is_empty())
                .unwrap_or(false);
            let required: Vec<String> = sym
                .struct_info()
                .map(|i| {
                    i.fields
                        .iter()
                        .filter(|f| f.attrs.iter().any(|a| a == "required"))
                        .map(|f| f.name.clone())
                        .collect()
                })
                .unwrap_or_default();
            (
                sym.kind,
                sym.short_name().to_string(),
                sym.name.clone(),
                generic_unbound,
                required,
            )
        };
        if kind == TypeKind::Placeholder {
            self.error(
                SemanticError::UnknownType {
                    name: full_name,
                    span: n.pos.into(),
                },
                n.pos,
            );
            return VOID_TYPE;
        }
        if generic_unbound && !n.typ.has_generic() {
            self.error(
                SemanticError::GenericWithoutArgs {
                    name: sym_name.clone(),
                    span: n.pos.into(),
                },
                n.pos,
            );
        }
        // Required fields must appear in the initializer.
        for req in required {
            if !n.fields.iter().any(|f| f.name == req) {
                self.error(
                    SemanticError::StructFieldRequired {
                        typ: sym_name.clone(),
                        field: req.clone(),
                        span: n.pos.into(),
                    },
                    n.pos,
                );
            }
        }
        for init_field in &mut n.fields {
            let field = match self
                .table
                .find_field_with_embeds(n.typ.plain(), &init_field.name)
            {
                Ok(f) => f,
                Err(_) => {
                    self.error(
                        SemanticError::StructInitUnknownField {
                            name: sym_name.clone(),
                            field: init_field.name.clone(),
                            span: init_field.pos.into(),
                        },
                        init_field.pos,
                    );
                    continue;
                }
            };
            init_field.expected_type = field.typ;
            let saved = self.expected_type;
            self.expected_type = field.typ;
            let got = self.expr(&mut init_field.expr);
            self.expected_type = saved;
            init_field.typ = got;
            if !self.check_types(got, field.typ) {
                let expected = self.type_str(field.typ);
                let found = self.type_str(got);
                self.error(
                    SemanticError::TypeMismatch {
                        expected,
                        found,
                        span: init_field.pos.into(),
                    },
                    init_field.pos,
                );
            }
        }
        n.typ
    }

    fn array_init(&mut self, n: &mut ArrayInit) -> TypeId {
        if let Some(len) = &mut n.len_expr {
            self.expr(len);
        }
        if let Some(cap) = &mut n.cap_expr {
            self.expr(cap);
        }
        let declared_elem = n.elem_type;
        let mut elem = declared_elem;
        let expected_elem = if elem.is_unresolved() {
            let expected = self.expected_type;
            if !expected.is_unresolved()
                && self.table.final_kind(expected) == TypeKind::Array
            {
                self.table.value_type(expected)
            } else {
                TypeId::ZERO
            }
        } else {
            elem
        };
        for (i, value) in n.exprs.iter_mut().enumerate() {
            let saved = self.expected_type;
            self.expected_type = expected_elem;
            let got = self.expr(value);
            self.expected_type = saved;
            if elem.is_unresolved() {
                elem = self.table.mktyp(got);
            } else if !self.check_types(got, elem) {
                match self.table.promote_num(elem, got) {
                    Some(promoted) if declared_elem.is_unresolved() => elem = promoted,
                    _ => {
                        let expected = self.type_str(elem);
                        let found = self.type_str(got);
                        let pos = value.pos();
                        self.error(
                            SemanticError::TypeMismatch {
                                expected,
                                found,
                                span: pos.into(),
                            },
                            pos,
                        );
                        let _ = i;
                    }
                }
            }
        }
        if let Some(default) = &mut n.default_expr {
            self.expr(default);
        }
        if elem.is_unresolved() {
            n.typ = self.expected_type;
            return n.typ;
        }
        let typ = if n.is_fixed {
            let size = n
                .len_expr
                .as_ref()
                .and_then(|e| e.const_int_value())
                .unwrap_or(n.exprs.len() as i64);
            self.table.find_or_register_array_fixed(elem, size, None)
        } else {
            self.table.find_or_register_array(elem)
        };
        n.typ = typ;
        typ
    }

    fn map_init(&mut self, n: &mut MapInit) -> TypeId {
        let mut key_type = n.key_type;
        let mut value_type = n.value_type;
        for key in &mut n.keys {
            let got = self.expr(key);
            if key_type.is_unresolved() {
                key_type = self.table.mktyp(got);
            } else if !self.check_types(got, key_type) {
                let expected = self.type_str(key_type);
                let found = self.type_str(got);
                let pos = key.pos();
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
        for value in &mut n.vals {
            let got = self.expr(value);
            if value_type.is_unresolved() {
                value_type = self.table.mktyp(got);
            } else if !self.check_types(got, value_type) {
                let expected = self.type_str(value_type);
                let found = self.type_str(got);
                let pos = value.pos();
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
        if key_type.is_unresolved() || value_type.is_unresolved() {
            n.typ = self.expected_type;
            return n.typ;
        }
        n.key_type = key_type;
        n.value_type = value_type;
        let typ = self.table.find_or_register_map(key_type, value_type);
        n.typ = typ;
        typ
    }

    fn chan_init(&mut self, n: &mut ChanInit) -> TypeId {
        if let Some(cap) = &mut n.cap_expr {
            let got = self.expr(cap);
            if !self.table.final_kind(got).is_int() {
                let found = self.type_str(got);
                let pos = cap.pos();
                self.error(
                    SemanticError::TypeMismatch {
                        expected: "int".into(),
                        found,
                        span: pos.into(),
                    },
                    pos,
                );
            }
        }
        let typ = self.table.find_or_register_chan(n.elem_type, false);
        n.typ = typ;
        typ
    }

    fn concat_expr(&mut self, n: &mut ConcatExpr) -> TypeId {
        let types: Vec<TypeId> = n
            .vals
            .iter_mut()
            .map(|v| {
                let t = self.expr(v);
                self.table.mktyp(t)
            })
            .collect();
        let typ = if types.len() == 1 {
            types[0]
        } else {
            self.table.find_or_register_multi_return(types)
        };
        n.typ = typ;
        typ
    }

    fn range_expr(&mut self, n: &mut RangeExpr) -> TypeId {
        for bound in [&mut n.low, &mut n.high].into_iter().flatten() {
            let got = self.expr(bound);
            if !self.table.final_kind(got).is_int() {
                let found = self.type_str(got);
                let pos = bound.pos();
                self.error(
                    SemanticError::NonIntegerIndex {
                        found,
                        span: pos.into(),
                    },
                    pos,
                );
            }
        }
        n.typ = INT_TYPE;
        INT_TYPE
    }

    // ------------------------------------------------------------------
    // Enum values and assoc
    // ------------------------------------------------------------------

    fn enum_val(&mut self, n: &mut EnumVal) -> TypeId {
        let enum_typ = if n.enum_name.is_empty() {
            let expected = self.expected_type;
            if expected.is_unresolved()
                || self.table.final_kind(expected) != TypeKind::Enum
            {
                self.error(
                    SemanticError::UnknownType {
                        name: format!(".{}", n.val),
                        span: n.pos.into(),
                    },
                    n.pos,
                );
                return VOID_TYPE;
            }
            TypeId::new(self.table.final_idx(expected))
        } else {
            let qualified = self.qualify(&n.enum_name);
            match self.table.find_sym_and_idx(&qualified) {
                Some((_, idx)) => TypeId::new(idx),
                None => {
                    self.error(
                        SemanticError::UnknownType {
                            name: n.enum_name.clone(),
                            span: n.pos.into(),
                        },
                        n.pos,
                    );
                    return VOID_TYPE;
                }
            }
        };
        let sym = self.table.sym(enum_typ);
        let enum_display = sym.short_name().to_string();
        match sym.enum_info() {
            Some(info) if info.has_variant(&n.val) => {
                n.typ = enum_typ;
                enum_typ
            }
            Some(_) => {
                self.error(
                    SemanticError::UnknownEnumVariant {
                        enum_name: enum_display,
                        variant: n.val.clone(),
                        span: n.pos.into(),
                    },
                    n.pos,
                );
                VOID_TYPE
            }
            None => {
                self.error(
                    SemanticError::UnknownType {
                        name: enum_display,
                        span: n.pos.into(),
                    },
                    n.pos,
                );
                VOID_TYPE
            }
        }
    }

    fn assoc_expr(&mut self, n: &mut Assoc) -> TypeId {
        let Some(var) = self.lookup_var(&n.var_name) else {
            self.error(
                SemanticError::UndefinedIdent {
                    name: n.var_name.clone(),
                    span: n.pos.into(),
                },
                n.pos,
            );
            return VOID_TYPE;
        };
        for (field, value) in n.fields.iter().zip(n.exprs.iter_mut()) {
            match self.table.find_field_with_embeds(var.typ.plain(), field) {
                Ok(f) => {
                    let got = self.expr(value);
                    if !self.check_types(got, f.typ) {
                        let expected = self.type_str(f.typ);
                        let found = self.type_str(got);
                        let pos = value.pos();
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
                Err(_) => {
                    let typ = self.type_str(var.typ);
                    let pos = value.pos();
                    self.error(
                        SemanticError::NoSuchField {
                            typ,
                            field: field.clone(),
                            span: pos.into(),
                        },
                        pos,
                    );
                }
            }
        }
        n.typ = var.typ;
        var.typ
    }

    // ------------------------------------------------------------------
    // String interpolation
    // ------------------------------------------------------------------

    fn string_inter_literal(&mut self, n: &mut StringInterLiteral) -> TypeId {
        for i in 0..n.exprs.len() {
            if self.cur_fn_name == "str"
                && matches!(&n.exprs[i], Expr::Call(c) if c.name == "str")
            {
                let pos = n.exprs[i].pos();
                self.error(
                    SemanticError::RecursiveStrCall { span: pos.into() },
                    pos,
                );
            }
            let typ = self.expr(&mut n.exprs[i]);
            let kind = self.table.final_kind(typ);
            let has_fmt = n.has_fmts.get(i).copied().unwrap_or(false);
            if has_fmt {
                let spec = n.fmts.get(i).copied().unwrap_or('\0');
                if !format_spec_allowed(kind, spec) {
                    let typ = self.type_str(typ);
                    let pos = n.exprs[i].pos();
                    self.error(
                        SemanticError::BadFormatSpecifier {
                            spec,
                            typ,
                            span: pos.into(),
                        },
                        pos,
                    );
                }
                let has_width = n.fwidths.get(i).copied().unwrap_or(0) != 0
                    || n.precisions.get(i).copied().unwrap_or(0) != 0;
                if has_width && !kind.is_number() {
                    let pos = n.exprs[i].pos();
                    self.error(
                        SemanticError::FormatWidthNonNumeric { span: pos.into() },
                        pos,
                    );
                }
            } else if let Some(slot) = n.fmts.get_mut(i) {
                *slot = default_format_spec(kind);
            }
        }
        n.typ = STRING_TYPE;
        STRING_TYPE
    }
}

fn infix_op_of(e: &Expr) -> Option<InfixOp> {
    match e {
        Expr::Infix(i) => Some(i.op),
        _ => None,
    }
}

/// Specifier letters admitted per operand kind.
fn format_spec_allowed(kind: TypeKind, spec: char) -> bool {
    match spec {
        'd' | 'x' | 'X' | 'o' | 'b' => kind.is_int() || kind == TypeKind::Rune || kind == TypeKind::Char,
        'f' | 'e' | 'E' | 'g' | 'G' => kind.is_float() || kind == TypeKind::IntLiteral,
        's' | 'S' => kind == TypeKind::String || kind == TypeKind::Bool,
        'c' => matches!(kind, TypeKind::Rune | TypeKind::Char | TypeKind::U8),
        'p' => kind == TypeKind::VoidPtr,
        _ => false,
    }
}

fn default_format_spec(kind: TypeKind) -> char {
    if kind.is_float() {
        'f'
    } else if kind.is_int() {
        'd'
    } else {
        's'
    }
}
