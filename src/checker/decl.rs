// src/checker/decl.rs
//
// Declaration registration and checking: imports, consts, globals, enums,
// structs, interfaces, type declarations and function declarations.

use rustc_hash::FxHashSet;
use tracing::trace;

use crate::ast::{
    Attr, ConstDecl, EnumDecl, File, FnDecl, GlobalDecl, Import, InterfaceDecl, Stmt, StructDecl,
    TypeDecl,
};
use crate::checker::Checker;
use crate::errors::{SemanticError, SemanticNotice, SemanticWarning};
use crate::scope::{ScopeObject, ShareKind, Var};
use crate::table::{
    EnumInfo, EnumVariant, FnAttrs, FnSig, InterfaceInfo, Language, StructInfo, SumTypeInfo,
    TypeFlags, TypeId, TypeInfo, TypeKind, TypeSymbol, VOID_TYPE,
};

const KNOWN_FN_ATTRS: &[&str] = &[
    "deprecated",
    "noreturn",
    "unsafe",
    "inline",
    "if",
    "keep_alive",
    "console",
    "manualfree",
    "export",
];

const KNOWN_TYPE_ATTRS: &[&str] = &["heap", "flag", "single_impl", "params", "minify"];

impl Checker<'_> {
    // ------------------------------------------------------------------
    // Pre-pass: symbol registration (the parser-contract surrogate)
    // ------------------------------------------------------------------

    pub(crate) fn register_decls(&mut self, file: &mut File) {
        for s in &mut file.stmts {
            match s {
                Stmt::Module(m) => {
                    if let Some(attr) = m.attrs.iter().find(|a| a.name == "deprecated") {
                        self.deprecated_modules
                            .insert(m.name.clone(), attr.arg.clone().unwrap_or_default());
                    }
                }
                Stmt::StructDecl(decl) => self.register_struct(decl),
                Stmt::InterfaceDecl(decl) => self.register_interface(decl),
                Stmt::EnumDecl(decl) => self.register_enum(decl),
                Stmt::TypeDecl(decl) => self.register_type_decl(decl),
                Stmt::FnDecl(decl) => self.register_fn_decl(decl),
                _ => {}
            }
        }
    }

    fn generic_param_types(&mut self, names: &[String]) -> Vec<TypeId> {
        names
            .iter()
            .map(|n| {
                self.table
                    .add_placeholder_type(n, Language::Veld)
                    .set_flag(TypeFlags::GENERIC)
            })
            .collect()
    }

    fn register_struct(&mut self, decl: &StructDecl) {
        let name = self.qualify(&decl.name);
        let generic_types = self.generic_param_types(&decl.generic_names);
        let is_heap = decl.attrs.iter().any(|a| a.name == "heap");
        self.check_type_attrs(&decl.attrs);
        let info = StructInfo {
            fields: decl.fields.clone(),
            embeds: decl.embeds.clone(),
            is_generic: !generic_types.is_empty(),
            generic_types,
            is_union: decl.is_union,
            is_heap,
            ..StructInfo::default()
        };
        let id = self.table.register_sym(TypeSymbol {
            name: name.clone(),
            module: self.file_mod.clone(),
            kind: TypeKind::Struct,
            info: TypeInfo::Struct(info),
            is_pub: decl.is_pub,
            ..TypeSymbol::default()
        });
        trace!(name = %name, idx = id.idx(), "registered struct");
    }

    fn register_interface(&mut self, decl: &InterfaceDecl) {
        let name = self.qualify(&decl.name);
        let single_impl = decl.attrs.iter().any(|a| a.name == "single_impl");
        self.check_type_attrs(&decl.attrs);
        let methods: Vec<FnSig> = decl
            .methods
            .iter()
            .map(|m| FnSig {
                name: m.name.clone(),
                module: self.file_mod.clone(),
                params: m.params.clone(),
                return_type: m.return_type,
                receiver_is_mut: m.receiver_is_mut,
                attrs: FnAttrs {
                    is_method: true,
                    no_body: true,
                    ..FnAttrs::default()
                },
                pos: m.pos,
                ..FnSig::default()
            })
            .collect();
        let info = InterfaceInfo {
            fields: decl.fields.clone(),
            methods,
            embeds: decl.embeds.clone(),
            single_impl,
            ..InterfaceInfo::default()
        };
        self.table.register_sym(TypeSymbol {
            name,
            module: self.file_mod.clone(),
            kind: TypeKind::Interface,
            info: TypeInfo::Interface(info),
            is_pub: decl.is_pub,
            ..TypeSymbol::default()
        });
    }

    fn register_enum(&mut self, decl: &EnumDecl) {
        let name = self.qualify(&decl.name);
        let is_flag = decl.attrs.iter().any(|a| a.name == "flag");
        self.check_type_attrs(&decl.attrs);
        if is_flag && decl.variants.len() > 64 {
            self.error(
                SemanticError::FlagEnumTooLarge {
                    enum_name: decl.name.clone(),
                    span: decl.pos.into(),
                },
                decl.pos,
            );
        }
        let mut next_value: i64 = 0;
        let mut seen_values: FxHashSet<i64> = FxHashSet::default();
        let mut variants = Vec::with_capacity(decl.variants.len());
        for (i, variant) in decl.variants.iter().enumerate() {
            let value = match &variant.expr {
                Some(expr) => match expr.const_int_value() {
                    Some(v) => v,
                    None => {
                        self.error(
                            SemanticError::EnumValueNotInt {
                                span: variant.pos.into(),
                            },
                            variant.pos,
                        );
                        next_value
                    }
                },
                None if is_flag => 1i64.checked_shl(i as u32).unwrap_or(0),
                None => next_value,
            };
            if is_flag && !seen_values.insert(value) {
                self.error(
                    SemanticError::DuplicateFlagEnumValue {
                        enum_name: decl.name.clone(),
                        value,
                        span: variant.pos.into(),
                    },
                    variant.pos,
                );
            }
            next_value = value + 1;
            variants.push(EnumVariant {
                name: variant.name.clone(),
                value: Some(value),
                pos: variant.pos,
            });
        }
        self.table.find_or_register_enum(
            &name,
            &self.file_mod.clone(),
            EnumInfo {
                variants,
                is_flag,
                is_multi_allowed: is_flag,
            },
        );
    }

    fn register_type_decl(&mut self, decl: &TypeDecl) {
        match decl {
            TypeDecl::Alias(alias) => {
                let name = self.qualify(&alias.name);
                let parent = alias.parent_type;
                if parent.is_unresolved() {
                    self.error(
                        SemanticError::UnknownType {
                            name: alias.name.clone(),
                            span: alias.pos.into(),
                        },
                        alias.pos,
                    );
                    return;
                }
                let parent_sym = self.table.sym(parent);
                if parent_sym.kind == TypeKind::Placeholder {
                    let parent_name = parent_sym.name.clone();
                    if parent_name == name || parent_name == alias.name {
                        self.error(
                            SemanticError::SelfReferentialType {
                                name: alias.name.clone(),
                                span: alias.pos.into(),
                            },
                            alias.pos,
                        );
                    } else {
                        self.error(
                            SemanticError::UnknownType {
                                name: parent_name,
                                span: alias.pos.into(),
                            },
                            alias.pos,
                        );
                    }
                    return;
                }
                self.table.register_sym(TypeSymbol {
                    name,
                    module: self.file_mod.clone(),
                    kind: TypeKind::Alias,
                    info: TypeInfo::Alias { parent },
                    parent_idx: parent.idx(),
                    is_pub: alias.is_pub,
                    ..TypeSymbol::default()
                });
            }
            TypeDecl::Fn(fn_decl) => {
                let name = self.qualify(&fn_decl.name);
                self.table.register_sym(TypeSymbol {
                    name,
                    module: self.file_mod.clone(),
                    kind: TypeKind::Alias,
                    info: TypeInfo::Alias { parent: fn_decl.typ },
                    parent_idx: fn_decl.typ.idx(),
                    is_pub: fn_decl.is_pub,
                    ..TypeSymbol::default()
                });
            }
            TypeDecl::Sum(sum) => {
                let name = self.qualify(&sum.name);
                let id = self.table.register_sym(TypeSymbol {
                    name,
                    module: self.file_mod.clone(),
                    kind: TypeKind::SumType,
                    info: TypeInfo::SumType(SumTypeInfo {
                        variants: sum.variants.clone(),
                        is_generic: !sum.generic_types.is_empty(),
                        generic_types: sum.generic_types.clone(),
                        ..SumTypeInfo::default()
                    }),
                    is_pub: sum.is_pub,
                    ..TypeSymbol::default()
                });
                // The sum-type rejection rule: no variant may be the sum
                // type itself.
                if sum.variants.iter().any(|v| v.idx() == id.idx()) {
                    self.error(
                        SemanticError::SelfReferentialType {
                            name: sum.name.clone(),
                            span: sum.pos.into(),
                        },
                        sum.pos,
                    );
                }
            }
        }
    }

    fn register_fn_decl(&mut self, decl: &mut FnDecl) {
        if decl.mod_name.is_empty() {
            decl.mod_name = self.file_mod.clone();
        }
        let attrs = self.parse_fn_attrs(&decl.attrs, decl);
        let mut sig = FnSig {
            name: decl.name.clone(),
            module: decl.mod_name.clone(),
            params: decl.params.clone(),
            return_type: decl.return_type,
            attrs,
            language: Language::Veld,
            generic_names: decl.generic_names.clone(),
            pos: decl.pos,
            ..FnSig::default()
        };
        if decl.return_type.is_unresolved() {
            sig.return_type = VOID_TYPE;
        }
        // Generic parameter references in the signature stay as flagged
        // placeholders until instantiation.
        for name in &decl.generic_names {
            self.table.add_placeholder_type(name, Language::Veld);
        }
        if let Some(receiver) = &decl.receiver {
            decl.is_method = true;
            sig.attrs.is_method = true;
            sig.receiver_type = receiver.typ;
            sig.receiver_is_mut = receiver.is_mut;
            if !receiver.typ.is_unresolved() {
                self.table.sym_mut(receiver.typ).register_method(sig.clone());
            }
        } else {
            self.table.register_fn(sig.clone());
        }
        if !decl.generic_names.is_empty() {
            let key = sig.qualified_name();
            self.table.register_fn_generic_types(&key);
        }
    }

    pub(crate) fn parse_fn_attrs(&mut self, attrs: &[Attr], decl: &FnDecl) -> FnAttrs {
        let mut out = FnAttrs {
            is_pub: decl.is_pub,
            no_body: decl.no_body,
            is_main: decl.name == "main"
                && (decl.mod_name == "main" || decl.mod_name.is_empty()),
            ..FnAttrs::default()
        };
        for attr in attrs {
            match attr.name.as_str() {
                "deprecated" => {
                    out.is_deprecated = true;
                    out.deprecation_msg = attr.arg.clone().unwrap_or_default();
                }
                "noreturn" => out.is_noreturn = true,
                "unsafe" => out.is_unsafe = true,
                "if" => out.ctdefine = attr.arg.clone(),
                "keep_alive" => out.is_keep_alive = true,
                name if KNOWN_FN_ATTRS.contains(&name) => {}
                name => {
                    self.warn(
                        SemanticWarning::UnknownAttr {
                            name: name.to_string(),
                            span: attr.pos.into(),
                        },
                        attr.pos,
                    );
                }
            }
        }
        if decl.name.starts_with("test_") {
            out.is_test = true;
        }
        out
    }

    fn check_type_attrs(&mut self, attrs: &[Attr]) {
        for attr in attrs {
            if !KNOWN_TYPE_ATTRS.contains(&attr.name.as_str()) {
                self.warn(
                    SemanticWarning::UnknownAttr {
                        name: attr.name.clone(),
                        span: attr.pos.into(),
                    },
                    attr.pos,
                );
            }
        }
    }

    // ------------------------------------------------------------------
    // Pass 1: imports
    // ------------------------------------------------------------------

    pub(crate) fn check_imports(&mut self, file: &mut File) {
        let mut seen: FxHashSet<String> = FxHashSet::default();
        let imports: Vec<Import> = file.imports.clone();
        for imp in &imports {
            if !seen.insert(imp.mod_name.clone()) {
                self.warn(
                    SemanticWarning::DuplicateImport {
                        module: imp.mod_name.clone(),
                        span: imp.pos.into(),
                    },
                    imp.pos,
                );
                continue;
            }
            if let Some(msg) = self.deprecated_modules.get(&imp.mod_name).cloned() {
                let msg = if msg.is_empty() {
                    msg
                } else {
                    format!("; {msg}")
                };
                self.notice(
                    SemanticNotice::Deprecated {
                        what: "module",
                        name: imp.mod_name.clone(),
                        msg,
                        span: imp.pos.into(),
                    },
                    imp.pos,
                );
            }
            if !imp.alias.is_empty() {
                let shadowed = format!("{}.{}", self.file_mod, imp.alias);
                let is_const = matches!(
                    self.scopes[0].get(&shadowed),
                    Some(ScopeObject::Const { .. })
                );
                if is_const {
                    self.error(
                        SemanticError::ImportShadowsConst {
                            alias: imp.alias.clone(),
                            span: imp.pos.into(),
                        },
                        imp.pos,
                    );
                }
            }
            for sym in &imp.syms {
                let qualified = format!("{}.{}", imp.mod_name, sym.name);
                let exists = self.table.has_fn(&qualified)
                    || self.table.find_sym(&qualified).is_some()
                    || self.scopes[0].has(&qualified);
                if !exists {
                    self.error(
                        SemanticError::ImportSymbolMissing {
                            module: imp.mod_name.clone(),
                            sym: sym.name.clone(),
                            span: sym.pos.into(),
                        },
                        sym.pos,
                    );
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Pass 2: constants
    // ------------------------------------------------------------------

    pub(crate) fn check_consts(&mut self, file: &mut File) {
        for s in &mut file.stmts {
            let Stmt::ConstDecl(decl) = s else { continue };
            self.const_decl(decl);
        }
    }

    fn const_decl(&mut self, decl: &mut ConstDecl) {
        for field in &mut decl.fields {
            let qualified = format!("{}.{}", self.file_mod, field.name);
            if self.scopes[0].has(&qualified) {
                self.error(
                    SemanticError::DuplicateConst {
                        name: field.name.clone(),
                        span: field.pos.into(),
                    },
                    field.pos,
                );
                continue;
            }
            let typ = self.expr(&mut field.expr);
            let typ = self.table.mktyp(typ);
            field.typ = typ;
            self.scopes[0].define(ScopeObject::Const {
                name: qualified,
                typ,
                is_pub: decl.is_pub,
                pos: field.pos,
            });
        }
    }

    // ------------------------------------------------------------------
    // Pass 3: globals
    // ------------------------------------------------------------------

    pub(crate) fn check_globals(&mut self, file: &mut File) {
        for s in &mut file.stmts {
            let Stmt::GlobalDecl(decl) = s else { continue };
            self.global_decl(decl);
        }
    }

    fn global_decl(&mut self, decl: &mut GlobalDecl) {
        for field in &mut decl.fields {
            let qualified = format!("{}.{}", self.file_mod, field.name);
            if self.scopes[0].has(&qualified) {
                self.error(
                    SemanticError::Redefinition {
                        name: field.name.clone(),
                        span: field.pos.into(),
                    },
                    field.pos,
                );
                continue;
            }
            let typ = match &mut field.expr {
                Some(expr) => {
                    let got = self.expr(expr);
                    let got = self.table.mktyp(got);
                    if !field.typ.is_unresolved() && !self.check_types(got, field.typ) {
                        let expected = self.type_str(field.typ);
                        let found = self.type_str(got);
                        self.error(
                            SemanticError::TypeMismatch {
                                expected,
                                found,
                                span: field.pos.into(),
                            },
                            field.pos,
                        );
                    }
                    if field.typ.is_unresolved() {
                        got
                    } else {
                        field.typ
                    }
                }
                None => field.typ,
            };
            field.typ = typ;
            self.scopes[0].define(ScopeObject::Global {
                name: qualified,
                typ,
                pos: field.pos,
            });
        }
    }

    // ------------------------------------------------------------------
    // Body-pass declaration checks
    // ------------------------------------------------------------------

    pub(crate) fn struct_decl(&mut self, decl: &mut StructDecl) {
        let name = self.qualify(&decl.name);
        let own_idx = self.table.find_type_idx(&name);
        for field in &mut decl.fields {
            if field.typ.is_unresolved()
                || self.table.sym(field.typ).kind == TypeKind::Placeholder
                    && !field.typ.has_generic()
            {
                let field_type_name = if field.typ.is_unresolved() {
                    "unknown".to_string()
                } else {
                    self.table.sym(field.typ).name.clone()
                };
                self.error(
                    SemanticError::UnknownType {
                        name: field_type_name,
                        span: field.pos.into(),
                    },
                    field.pos,
                );
                continue;
            }
            // Struct containing itself by value has infinite size.
            if self.table.final_idx(field.typ) == own_idx
                && !field.typ.is_ptr()
                && !field.typ.is_optional()
            {
                self.error(
                    SemanticError::SelfReferentialType {
                        name: decl.name.clone(),
                        span: field.pos.into(),
                    },
                    field.pos,
                );
            }
            if let Some(default) = &mut field.default_expr {
                let saved = self.expected_type;
                self.expected_type = field.typ;
                let got = self.expr(default);
                self.expected_type = saved;
                if !self.check_types(got, field.typ) {
                    let expected = self.type_str(field.typ);
                    let found = self.type_str(got);
                    self.error(
                        SemanticError::TypeMismatch {
                            expected,
                            found,
                            span: field.pos.into(),
                        },
                        field.pos,
                    );
                }
            }
        }
    }

    pub(crate) fn fn_decl(&mut self, decl: &mut FnDecl) {
        let attrs = self.parse_fn_attrs(&decl.attrs.clone(), decl);
        if attrs.is_main {
            self.has_main = true;
            if !decl.params.is_empty()
                || (!decl.return_type.is_unresolved() && decl.return_type != VOID_TYPE)
                || !decl.generic_names.is_empty()
            {
                self.error(
                    SemanticError::MalformedMain {
                        span: decl.pos.into(),
                    },
                    decl.pos,
                );
            }
        }
        if attrs.is_test && !self.file_is_test && !self.opts.is_test_build {
            self.error(
                SemanticError::TestFnOutsideTestFile {
                    span: decl.pos.into(),
                },
                decl.pos,
            );
        }
        if decl.no_body {
            return;
        }

        let key = if decl.is_method {
            String::new()
        } else {
            FnSig {
                name: decl.name.clone(),
                module: decl.mod_name.clone(),
                ..FnSig::default()
            }
            .qualified_name()
        };

        if decl.generic_names.is_empty() {
            self.check_fn_body(decl, &[]);
        } else if self.in_recheck && !key.is_empty() {
            let tuples = self.table.fn_generic_types_for(&key).to_vec();
            for tuple in tuples {
                self.check_fn_body(decl, &tuple);
            }
        } else {
            // First pass checks the body generically.
            self.check_fn_body(decl, &[]);
        }
    }

    fn check_fn_body(&mut self, decl: &mut FnDecl, concrete: &[TypeId]) {
        let saved_ret = self.cur_fn_ret;
        let saved_name = std::mem::take(&mut self.cur_fn_name);
        let saved_generics = std::mem::take(&mut self.cur_fn_generic_names);
        let saved_concrete = std::mem::take(&mut self.cur_concrete_types);
        let saved_labels = std::mem::take(&mut self.goto_labels);

        self.cur_fn_name = decl.name.clone();
        self.cur_fn_generic_names = decl.generic_names.clone();
        self.cur_concrete_types = concrete.to_vec();
        self.cur_fn_ret = if decl.return_type.is_unresolved() {
            VOID_TYPE
        } else if !concrete.is_empty() {
            self.table
                .resolve_generic_to_concrete(
                    decl.return_type,
                    &decl.generic_names,
                    concrete,
                )
                .unwrap_or(decl.return_type)
        } else {
            decl.return_type
        };
        self.collect_goto_labels(&decl.stmts);

        self.open_scope();
        if let Some(receiver) = &decl.receiver {
            self.define_var(Var {
                name: receiver.name.clone(),
                typ: receiver.typ,
                is_mut: receiver.is_mut,
                is_arg: true,
                share: if receiver.typ.is_shared() {
                    ShareKind::Shared
                } else {
                    ShareKind::Plain
                },
                pos: receiver.pos,
                ..Var::default()
            });
        }
        for param in &decl.params {
            let mut typ = param.typ;
            if !concrete.is_empty()
                && let Some(t) = self.table.resolve_generic_to_concrete(
                    typ,
                    &decl.generic_names,
                    concrete,
                )
            {
                typ = t;
            }
            if typ.is_variadic() {
                let elem = typ.clear_flag(TypeFlags::VARIADIC);
                typ = self.table.find_or_register_array(elem);
            }
            self.define_var(Var {
                name: param.name.clone(),
                typ,
                is_mut: param.is_mut,
                is_arg: true,
                share: if typ.is_shared() {
                    ShareKind::Shared
                } else {
                    ShareKind::Plain
                },
                ..Var::default()
            });
        }

        self.stmts(&mut decl.stmts);
        self.close_scope();

        self.cur_fn_ret = saved_ret;
        self.cur_fn_name = saved_name;
        self.cur_fn_generic_names = saved_generics;
        self.cur_concrete_types = saved_concrete;
        self.goto_labels = saved_labels;
    }

    fn collect_goto_labels(&mut self, stmts: &[Stmt]) {
        for s in stmts {
            match s {
                Stmt::GotoLabel { name, .. } => {
                    self.goto_labels.insert(name.clone());
                }
                Stmt::Block(b) => self.collect_goto_labels(&b.stmts),
                Stmt::For(f) => self.collect_goto_labels(&f.stmts),
                Stmt::ForIn(f) => self.collect_goto_labels(&f.stmts),
                Stmt::ForC(f) => self.collect_goto_labels(&f.stmts),
                _ => {}
            }
        }
    }
}
