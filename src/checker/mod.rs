// src/checker/mod.rs
//
// The semantic checker: walks parsed files, resolves identifiers, infers
// expression types, validates statements and declarations, and drives
// interface/generic bookkeeping through the Table. Never fails; every
// problem lands in the Diagnostics sink.

mod assign;
mod call;
mod decl;
mod expr;
mod match_expr;
mod mutability;
mod stmt;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use crate::ast::{File, Stmt};
use crate::errors::{Diagnostics, SemanticError, SemanticNotice, SemanticWarning};
use crate::scope::{Scope, ScopeObject, SmartcastKey, Var};
use crate::span::Pos;
use crate::table::{Table, TypeId, TypeKind, VOID_TYPE};

#[derive(Debug, Clone)]
pub struct CheckerOptions {
    /// Promote warnings to errors.
    pub strict: bool,
    pub message_limit: usize,
    pub expr_level_cutoff: u32,
    pub stmt_level_cutoff: u32,
    /// Max missing enum variants listed in a non-exhaustive-match error.
    pub enum_variant_listing_cutoff: usize,
    pub generic_recheck_cap: u32,
    /// Relaxed mutability for machine-translated sources.
    pub translated_mode: bool,
    pub is_test_build: bool,
    pub warn_unused: bool,
    /// `[if tag]` calls compile only when their tag is enabled.
    pub enabled_tags: Vec<String>,
}

impl Default for CheckerOptions {
    fn default() -> Self {
        Self {
            strict: false,
            message_limit: 100,
            expr_level_cutoff: 40,
            stmt_level_cutoff: 40,
            enum_variant_listing_cutoff: 8,
            generic_recheck_cap: 10,
            translated_mode: false,
            is_test_build: false,
            warn_unused: true,
            enabled_tags: Vec::new(),
        }
    }
}

/// Per-file lifecycle; transitions are linear and entered exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FileState {
    Fresh,
    ImportsResolved,
    ConstsTyped,
    GlobalsTyped,
    BodyChecked,
    ScopesSwept,
}

/// An unused/unchanged variable collected at scope close, reported in the
/// scope-sweep pass.
#[derive(Debug, Clone)]
pub(crate) enum SweptVar {
    Unused { name: String, pos: Pos },
    MutUnchanged { name: String, pos: Pos },
}

pub struct Checker<'a> {
    pub table: &'a mut Table,
    pub opts: CheckerOptions,
    pub diags: Diagnostics,

    /// scopes[0] is the program-global scope (consts, globals).
    scopes: Vec<Scope>,
    pub(crate) file_path: String,
    pub(crate) file_mod: String,
    pub(crate) file_is_translated: bool,
    pub(crate) file_is_test: bool,

    pub(crate) cur_fn_name: String,
    pub(crate) cur_fn_ret: TypeId,
    pub(crate) cur_fn_generic_names: Vec<String>,
    pub(crate) cur_concrete_types: Vec<TypeId>,

    pub(crate) in_unsafe: u32,
    pub(crate) in_lock: bool,
    pub(crate) locked_names: Vec<String>,
    pub(crate) rlocked_names: Vec<String>,
    pub(crate) loop_depth: u32,
    pub(crate) expr_level: u32,
    pub(crate) stmt_level: u32,
    /// One-shot: the next selector lookup skips sum-type unwrapping.
    pub(crate) prevent_sum_type_unwrapping: bool,
    /// Inside `if x := opt() {}`: the guard itself handles the optional.
    pub(crate) in_if_guard: bool,
    /// Expected type for context-dependent expressions (.enum_val, inits).
    pub(crate) expected_type: TypeId,

    pub(crate) need_recheck: bool,
    pub(crate) in_recheck: bool,
    pub(crate) has_main: bool,

    pub(crate) deprecated_modules: FxHashMap<String, String>,
    pub(crate) goto_labels: FxHashSet<String>,
    pub(crate) swept: Vec<SweptVar>,
}

impl<'a> Checker<'a> {
    pub fn new(table: &'a mut Table, opts: CheckerOptions) -> Self {
        let diags = Diagnostics::new(opts.message_limit, opts.strict);
        Self {
            table,
            opts,
            diags,
            scopes: vec![Scope::new()],
            file_path: String::new(),
            file_mod: String::new(),
            file_is_translated: false,
            file_is_test: false,
            cur_fn_name: String::new(),
            cur_fn_ret: VOID_TYPE,
            cur_fn_generic_names: Vec::new(),
            cur_concrete_types: Vec::new(),
            in_unsafe: 0,
            in_lock: false,
            locked_names: Vec::new(),
            rlocked_names: Vec::new(),
            loop_depth: 0,
            expr_level: 0,
            stmt_level: 0,
            prevent_sum_type_unwrapping: false,
            in_if_guard: false,
            expected_type: TypeId::ZERO,
            need_recheck: false,
            in_recheck: false,
            has_main: false,
            deprecated_modules: FxHashMap::default(),
            goto_labels: FxHashSet::default(),
            swept: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Public contract
    // ------------------------------------------------------------------

    /// Check an ordered list of parsed files. Mutates the AST in place and
    /// accumulates diagnostics; never fails.
    pub fn check_all(&mut self, files: &mut [File]) {
        let mut states = vec![FileState::Fresh; files.len()];

        for file in files.iter_mut() {
            self.begin_file(file);
            self.register_decls(file);
            self.scopes.pop();
        }
        self.table.generic_insts_to_concrete();
        self.expand_all_interfaces();

        for (i, file) in files.iter_mut().enumerate() {
            self.begin_file(file);
            self.check_imports(file);
            advance(&mut states[i], FileState::ImportsResolved);
            self.check_consts(file);
            advance(&mut states[i], FileState::ConstsTyped);
            self.check_globals(file);
            advance(&mut states[i], FileState::GlobalsTyped);
            self.check_body(file);
            advance(&mut states[i], FileState::BodyChecked);
            self.sweep_scopes(file);
            advance(&mut states[i], FileState::ScopesSwept);
            self.end_file(file);
            if self.diags.should_abort {
                return;
            }
        }

        self.generic_fn_fixed_point(files);
        self.finalize(files);
    }

    /// Re-enter bodies of files containing generic functions until no new
    /// concrete tuple is observed, bounded by a safety cap.
    fn generic_fn_fixed_point(&mut self, files: &mut [File]) {
        let mut pass = 0u32;
        while self.need_recheck {
            self.need_recheck = false;
            pass += 1;
            if pass > self.opts.generic_recheck_cap {
                let pos = files.first().map(|f| first_pos(f)).unwrap_or_default();
                self.error(
                    SemanticError::GenericRecheckDiverged { span: pos.into() },
                    pos,
                );
                return;
            }
            debug!(pass, "generic re-check pass");
            self.in_recheck = true;
            for file in files.iter_mut() {
                if !has_generic_fns(file) {
                    continue;
                }
                self.begin_file(file);
                self.check_body(file);
                self.end_file(file);
            }
            self.in_recheck = false;
        }
    }

    fn finalize(&mut self, files: &[File]) {
        self.table.complete_interface_check();
        if !self.opts.is_test_build && !self.has_main {
            let pos = files.first().map(first_pos).unwrap_or_default();
            let path = files
                .first()
                .map(|f| f.path.clone())
                .unwrap_or_default();
            let err = SemanticError::MissingMain { span: pos.into() };
            self.diags.error(&path, pos, &err);
        }
    }

    // ------------------------------------------------------------------
    // File lifecycle
    // ------------------------------------------------------------------

    fn begin_file(&mut self, file: &File) {
        self.file_path = file.path.clone();
        self.file_mod = file.mod_name.clone();
        self.file_is_translated = file.is_translated;
        self.file_is_test = file.is_test;
        self.open_scope();
        trace!(path = %file.path, "begin file");
    }

    fn end_file(&mut self, file: &mut File) {
        if let Some(scope) = self.scopes.pop() {
            file.scope = scope;
        }
    }

    fn check_body(&mut self, file: &mut File) {
        for s in &mut file.stmts {
            match s {
                Stmt::Import(_) | Stmt::Module(_) | Stmt::ConstDecl(_) | Stmt::GlobalDecl(_) => {}
                _ => self.stmt(s),
            }
            if self.diags.should_abort {
                break;
            }
        }
    }

    /// Pass 5: report unused variables collected while closing scopes.
    fn sweep_scopes(&mut self, _file: &File) {
        if !self.opts.warn_unused || self.in_recheck {
            self.swept.clear();
            return;
        }
        let swept = std::mem::take(&mut self.swept);
        for entry in swept {
            match entry {
                SweptVar::Unused { name, pos } => self.warn(
                    SemanticWarning::UnusedVariable {
                        name,
                        span: pos.into(),
                    },
                    pos,
                ),
                SweptVar::MutUnchanged { name, pos } => self.warn(
                    SemanticWarning::MutNeverChanged {
                        name,
                        span: pos.into(),
                    },
                    pos,
                ),
            }
        }
    }

    fn expand_all_interfaces(&mut self) {
        let iface_ids: Vec<u32> = (1..self.table.type_count() as u32)
            .filter(|&i| self.table.sym_by_idx(i).kind == TypeKind::Interface)
            .collect();
        for idx in iface_ids {
            if let Err(msg) = self.table.expand_interface_embeds(TypeId::new(idx)) {
                let pos = Pos::default();
                self.error(
                    SemanticError::AmbiguousMember {
                        message: msg,
                        span: pos.into(),
                    },
                    pos,
                );
            }
        }
    }

    // ------------------------------------------------------------------
    // Diagnostics helpers
    // ------------------------------------------------------------------

    pub(crate) fn error(&mut self, err: SemanticError, pos: Pos) {
        let path = self.file_path.clone();
        self.diags.error(&path, pos, &err);
    }

    pub(crate) fn warn(&mut self, warning: SemanticWarning, pos: Pos) {
        if self.in_recheck {
            return;
        }
        let path = self.file_path.clone();
        self.diags.warn(&path, pos, &warning);
    }

    pub(crate) fn notice(&mut self, notice: SemanticNotice, pos: Pos) {
        if self.in_recheck {
            return;
        }
        let path = self.file_path.clone();
        self.diags.notice(&path, pos, &notice);
    }

    // ------------------------------------------------------------------
    // Scopes
    // ------------------------------------------------------------------

    pub(crate) fn open_scope(&mut self) {
        self.scopes.push(Scope::new());
    }

    pub(crate) fn close_scope(&mut self) {
        let Some(scope) = self.scopes.pop() else {
            return;
        };
        for obj in scope.objects() {
            if let ScopeObject::Var(v) = obj {
                if v.is_arg || v.name == "_" || v.name == "err" {
                    continue;
                }
                if !v.is_used {
                    self.swept.push(SweptVar::Unused {
                        name: v.name.clone(),
                        pos: v.pos,
                    });
                } else if v.is_mut && !v.is_changed {
                    self.swept.push(SweptVar::MutUnchanged {
                        name: v.name.clone(),
                        pos: v.pos,
                    });
                }
            }
        }
    }

    pub(crate) fn cur_scope_mut(&mut self) -> &mut Scope {
        self.scopes.last_mut().expect("scope stack never empty")
    }

    pub(crate) fn define_var(&mut self, var: Var) {
        self.cur_scope_mut().define(ScopeObject::Var(var));
    }

    pub(crate) fn scope_has_in_current(&self, name: &str) -> bool {
        self.scopes
            .last()
            .map(|s| s.has(name))
            .unwrap_or(false)
    }

    /// Innermost-first object lookup; marks variables as read.
    pub(crate) fn lookup_and_use(&mut self, name: &str) -> Option<ScopeObject> {
        for scope in self.scopes.iter_mut().rev() {
            if let Some(obj) = scope.get_mut(name) {
                if let ScopeObject::Var(v) = obj {
                    v.is_used = true;
                }
                return Some(obj.clone());
            }
        }
        // Module-qualified consts and globals live in the global scope.
        let qualified = format!("{}.{}", self.file_mod, name);
        for scope in self.scopes.iter_mut().rev() {
            if let Some(obj) = scope.get_mut(&qualified) {
                return Some(obj.clone());
            }
        }
        None
    }

    pub(crate) fn lookup_var(&self, name: &str) -> Option<Var> {
        for scope in self.scopes.iter().rev() {
            if let Some(ScopeObject::Var(v)) = scope.get(name) {
                return Some(v.clone());
            }
        }
        None
    }

    pub(crate) fn mark_changed(&mut self, name: &str) {
        for scope in self.scopes.iter_mut().rev() {
            if let Some(ScopeObject::Var(v)) = scope.get_mut(name) {
                v.is_changed = true;
                return;
            }
        }
    }

    pub(crate) fn smartcast_lookup(&self, key: &SmartcastKey) -> Option<TypeId> {
        for scope in self.scopes.iter().rev() {
            if let Some(t) = scope.smartcast(key) {
                return Some(t);
            }
        }
        None
    }

    pub(crate) fn push_smartcast(&mut self, key: SmartcastKey, typ: TypeId) {
        self.cur_scope_mut().push_smartcast(key, typ);
    }

    // ------------------------------------------------------------------
    // Type compatibility
    // ------------------------------------------------------------------

    /// Can a value of type `got` be used where `want` is expected?
    pub(crate) fn check_types(&mut self, got: TypeId, want: TypeId) -> bool {
        if got.idx() == want.idx() && got.nr_muls() == want.nr_muls() {
            return !(got.is_optional() && !want.is_optional());
        }
        if got.is_unresolved() || want.is_unresolved() {
            return false;
        }
        if want.has_generic() || got.has_generic() {
            return true;
        }
        let gk = self.table.final_kind(got);
        let wk = self.table.final_kind(want);
        if gk == TypeKind::IntLiteral && wk.is_number() {
            return true;
        }
        if gk == TypeKind::FloatLiteral && wk.is_float() {
            return true;
        }
        if gk == TypeKind::None && (want.is_optional() || wk == TypeKind::Interface) {
            return wk != TypeKind::Interface
                || self.table.does_type_implement_interface(
                    got.plain(),
                    TypeId::new(self.table.final_idx(want)),
                );
        }
        // Pointer/voidptr interchange.
        if (got.is_ptr() || gk == TypeKind::VoidPtr)
            && (wk == TypeKind::VoidPtr || (gk == TypeKind::VoidPtr && want.is_ptr()))
        {
            return true;
        }
        if self.table.same_final_idx(got, want) && got.nr_muls() == want.nr_muls() {
            return true;
        }
        if wk == TypeKind::SumType && self.is_sumtype_variant(got, want) {
            return true;
        }
        if wk == TypeKind::Interface {
            let iface = TypeId::new(self.table.final_idx(want));
            return self.table.does_type_implement_interface(got.plain(), iface);
        }
        // char and u8 interconvert freely.
        if matches!(gk, TypeKind::Char | TypeKind::U8) && matches!(wk, TypeKind::Char | TypeKind::U8)
        {
            return true;
        }
        false
    }

    pub(crate) fn is_sumtype_variant(&self, got: TypeId, sum: TypeId) -> bool {
        let sum_idx = self.table.final_idx(sum);
        let Some(info) = self.table.sym_by_idx(sum_idx).sumtype_info() else {
            return false;
        };
        info.variants
            .iter()
            .any(|&v| self.table.same_final_idx(v, got))
    }

    /// C-callee argument relaxation: numerics, bools and pointers blur.
    pub(crate) fn check_types_c_relaxed(&mut self, got: TypeId, want: TypeId) -> bool {
        if self.check_types(got, want) {
            return true;
        }
        let gk = self.table.final_kind(got);
        let wk = self.table.final_kind(want);
        if gk.is_number() && wk.is_number() {
            return true;
        }
        if (gk == TypeKind::Bool && wk.is_int()) || (gk.is_int() && wk == TypeKind::Bool) {
            return true;
        }
        if (got.is_ptr() || gk == TypeKind::VoidPtr || gk == TypeKind::Placeholder)
            && (want.is_ptr() || wk == TypeKind::VoidPtr || wk == TypeKind::Placeholder)
        {
            return true;
        }
        false
    }

    pub(crate) fn type_str(&self, typ: TypeId) -> String {
        if typ.is_unresolved() {
            return "unknown".to_string();
        }
        self.table.type_to_str(typ)
    }

    /// Qualify an unqualified name with the current module.
    pub(crate) fn qualify(&self, name: &str) -> String {
        if name.contains('.') || self.file_mod.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.file_mod, name)
        }
    }
}

fn advance(state: &mut FileState, next: FileState) {
    debug_assert!(*state < next, "file state must advance linearly");
    *state = next;
}

fn first_pos(file: &File) -> Pos {
    file.stmts.first().map(|s| s.pos()).unwrap_or_default()
}

fn has_generic_fns(file: &File) -> bool {
    file.stmts.iter().any(|s| match s {
        Stmt::FnDecl(f) => !f.generic_names.is_empty(),
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{
        StructInfo, TypeInfo, TypeSymbol, BOOL_TYPE, F64_TYPE, INT_LITERAL_TYPE, INT_TYPE,
        STRING_TYPE, VOIDPTR_TYPE,
    };

    #[test]
    fn literal_compatibility() {
        let mut table = Table::new();
        let mut checker = Checker::new(&mut table, CheckerOptions::default());
        assert!(checker.check_types(INT_LITERAL_TYPE, INT_TYPE));
        assert!(checker.check_types(INT_LITERAL_TYPE, F64_TYPE));
        assert!(!checker.check_types(STRING_TYPE, INT_TYPE));
        assert!(!checker.check_types(F64_TYPE, INT_TYPE));
    }

    #[test]
    fn pointer_voidptr_interchange() {
        let mut table = Table::new();
        let mut checker = Checker::new(&mut table, CheckerOptions::default());
        let int_ptr = INT_TYPE.ref_();
        assert!(checker.check_types(int_ptr, VOIDPTR_TYPE));
        assert!(checker.check_types(VOIDPTR_TYPE, int_ptr));
        assert!(!checker.check_types(INT_TYPE, int_ptr));
    }

    #[test]
    fn sumtype_accepts_variant() {
        let mut table = Table::new();
        let a = table.register_sym(TypeSymbol {
            name: "main.Circle".into(),
            module: "main".into(),
            kind: TypeKind::Struct,
            info: TypeInfo::Struct(StructInfo::default()),
            ..TypeSymbol::default()
        });
        let sum = table.register_sym(TypeSymbol {
            name: "main.Shape".into(),
            module: "main".into(),
            kind: TypeKind::SumType,
            info: TypeInfo::SumType(crate::table::SumTypeInfo {
                variants: vec![a],
                ..Default::default()
            }),
            ..TypeSymbol::default()
        });
        let mut checker = Checker::new(&mut table, CheckerOptions::default());
        assert!(checker.check_types(a, sum));
        assert!(!checker.check_types(BOOL_TYPE, sum));
    }

    #[test]
    fn c_relaxed_widening() {
        let mut table = Table::new();
        let mut checker = Checker::new(&mut table, CheckerOptions::default());
        assert!(checker.check_types_c_relaxed(BOOL_TYPE, INT_TYPE));
        assert!(checker.check_types_c_relaxed(F64_TYPE, INT_TYPE));
        assert!(!checker.check_types_c_relaxed(STRING_TYPE, INT_TYPE));
    }
}
