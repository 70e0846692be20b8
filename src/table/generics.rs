// src/table/generics.rs
//
// Generic resolution and substitution.
//
// Two complementary operations: `resolve_generic_to_concrete` substitutes
// named type parameters positionally inside a type handle, and
// `unwrap_generic_type` materializes full instantiated symbols for generic
// struct/interface/sum-type heads under their `Name<...>` canonical names.
// `generic_insts_to_concrete` rewrites parser-produced generic_inst
// placeholders, and `infer_fn_generic_types` binds call-site arguments to a
// function's type parameters.

use thiserror::Error;
use tracing::{debug, trace};

use crate::table::symbols::{FnSig, TypeInfo, TypeKind, TypeSymbol};
use crate::table::type_id::TypeFlags;
use crate::table::{Table, TypeId};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenericInferError {
    #[error("inferred generic type {name} is ambiguous")]
    Ambiguous { name: String },
    #[error("could not infer generic type {name}")]
    Unbound { name: String },
}

impl Table {
    // ------------------------------------------------------------------
    // Substitution
    // ------------------------------------------------------------------

    /// Substitute the named type parameters with the positional concrete
    /// types inside `generic_type`, returning the substituted handle.
    /// `None` means no parameter in the handle had a binding.
    pub fn resolve_generic_to_concrete(
        &mut self,
        generic_type: TypeId,
        generic_names: &[String],
        concrete_types: &[TypeId],
    ) -> Option<TypeId> {
        if generic_names.is_empty()
            || generic_names.len() != concrete_types.len()
            || generic_type.is_unresolved()
        {
            return None;
        }
        let sym = self.sym(generic_type).clone();
        if let Some(i) = generic_names.iter().position(|n| n == sym.short_name()) {
            let concrete = concrete_types[i];
            if concrete.is_unresolved() {
                return None;
            }
            return Some(
                generic_type
                    .derive(concrete.idx())
                    .clear_flag(TypeFlags::GENERIC),
            );
        }
        match &sym.info {
            TypeInfo::Array { elem, .. } => {
                let new_elem =
                    self.resolve_generic_to_concrete(*elem, generic_names, concrete_types)?;
                let id = self.find_or_register_array(new_elem);
                Some(rewrap(generic_type, id, new_elem.has_generic()))
            }
            TypeInfo::ArrayFixed {
                elem,
                size,
                size_expr,
            } => {
                let new_elem =
                    self.resolve_generic_to_concrete(*elem, generic_names, concrete_types)?;
                let id = self.find_or_register_array_fixed(new_elem, *size, size_expr.clone());
                Some(rewrap(generic_type, id, new_elem.has_generic()))
            }
            TypeInfo::Map { key, value } => {
                let new_key = self
                    .resolve_generic_to_concrete(*key, generic_names, concrete_types)
                    .unwrap_or(*key);
                let new_value = self
                    .resolve_generic_to_concrete(*value, generic_names, concrete_types)
                    .unwrap_or(*value);
                if new_key == *key && new_value == *value {
                    return None;
                }
                let id = self.find_or_register_map(new_key, new_value);
                Some(rewrap(
                    generic_type,
                    id,
                    new_key.has_generic() || new_value.has_generic(),
                ))
            }
            TypeInfo::Chan { elem, is_mut } => {
                let new_elem =
                    self.resolve_generic_to_concrete(*elem, generic_names, concrete_types)?;
                let id = self.find_or_register_chan(new_elem, *is_mut);
                Some(rewrap(generic_type, id, new_elem.has_generic()))
            }
            TypeInfo::Thread { ret } => {
                let new_ret =
                    self.resolve_generic_to_concrete(*ret, generic_names, concrete_types)?;
                let id = self.find_or_register_thread(new_ret);
                Some(rewrap(generic_type, id, new_ret.has_generic()))
            }
            TypeInfo::Promise { ret } => {
                let new_ret =
                    self.resolve_generic_to_concrete(*ret, generic_names, concrete_types)?;
                let id = self.find_or_register_promise(new_ret);
                Some(rewrap(generic_type, id, new_ret.has_generic()))
            }
            TypeInfo::MultiReturn { types } => {
                let mut changed = false;
                let new_types: Vec<TypeId> = types
                    .iter()
                    .map(|&t| {
                        match self.resolve_generic_to_concrete(t, generic_names, concrete_types) {
                            Some(n) => {
                                changed = true;
                                n
                            }
                            None => t,
                        }
                    })
                    .collect();
                if !changed {
                    return None;
                }
                let still = new_types.iter().any(|t| t.has_generic());
                let id = self.find_or_register_multi_return(new_types);
                Some(rewrap(generic_type, id, still))
            }
            TypeInfo::Function { sig } => {
                let mut new_sig = (**sig).clone();
                let mut changed = false;
                for param in &mut new_sig.params {
                    if let Some(n) =
                        self.resolve_generic_to_concrete(param.typ, generic_names, concrete_types)
                    {
                        param.typ = n;
                        changed = true;
                    }
                }
                if let Some(n) = self.resolve_generic_to_concrete(
                    new_sig.return_type,
                    generic_names,
                    concrete_types,
                ) {
                    new_sig.return_type = n;
                    changed = true;
                }
                if !changed {
                    return None;
                }
                let still = new_sig.params.iter().any(|p| p.typ.has_generic())
                    || new_sig.return_type.has_generic();
                let id = self.find_or_register_fn_type("", new_sig, true, false);
                Some(rewrap(generic_type, id, still))
            }
            TypeInfo::GenericInst {
                parent_idx,
                concrete_types: inst_args,
            } => {
                let parent_idx = *parent_idx;
                let mut changed = false;
                let resolved_args: Vec<TypeId> = inst_args
                    .iter()
                    .map(|&a| {
                        match self.resolve_generic_to_concrete(a, generic_names, concrete_types) {
                            Some(n) => {
                                changed = true;
                                n
                            }
                            None => a,
                        }
                    })
                    .collect();
                if !changed {
                    return None;
                }
                let head = TypeId::new(parent_idx);
                let head_names = self.head_param_names(head);
                let id = self.unwrap_generic_head(head, &head_names, &resolved_args);
                Some(rewrap(
                    generic_type,
                    id,
                    resolved_args.iter().any(|t| t.has_generic()),
                ))
            }
            TypeInfo::Struct(_) | TypeInfo::Interface(_) | TypeInfo::SumType(_) => {
                let head_params = self.head_params(generic_type);
                if head_params.is_empty() {
                    return None;
                }
                let mut changed = false;
                let args: Vec<TypeId> = head_params
                    .iter()
                    .map(|&p| {
                        match self.resolve_generic_to_concrete(p, generic_names, concrete_types) {
                            Some(n) => {
                                changed = true;
                                n
                            }
                            None => p,
                        }
                    })
                    .collect();
                if !changed {
                    return None;
                }
                let head_names = self.head_param_names(generic_type);
                let id = self.unwrap_generic_head(generic_type, &head_names, &args);
                Some(rewrap(
                    generic_type,
                    id,
                    args.iter().any(|t| t.has_generic()),
                ))
            }
            _ => None,
        }
    }

    fn head_params(&self, typ: TypeId) -> Vec<TypeId> {
        match &self.types[self.final_idx(typ) as usize].info {
            TypeInfo::Struct(info) => info.generic_types.clone(),
            TypeInfo::Interface(info) => info.generic_types.clone(),
            TypeInfo::SumType(info) => info.generic_types.clone(),
            _ => Vec::new(),
        }
    }

    fn head_param_names(&self, typ: TypeId) -> Vec<String> {
        self.head_params(typ)
            .iter()
            .map(|&p| self.sym(p).short_name().to_string())
            .collect()
    }

    // ------------------------------------------------------------------
    // Materialization
    // ------------------------------------------------------------------

    /// Materialize a generic struct/interface/sum-type under its canonical
    /// `Name<...>` key: new symbol, substituted fields and (for interfaces)
    /// method signatures, concrete-type sets recorded on every method.
    /// Idempotent: the same (head, args) tuple always yields the same id.
    pub fn unwrap_generic_type(
        &mut self,
        typ: TypeId,
        generic_names: &[String],
        concrete_types: &[TypeId],
    ) -> TypeId {
        let head_params = self.head_params(typ);
        if head_params.is_empty() {
            return self
                .resolve_generic_to_concrete(typ, generic_names, concrete_types)
                .unwrap_or(typ);
        }
        let args: Vec<TypeId> = head_params
            .iter()
            .map(|&p| {
                let name = self.sym(p).short_name().to_string();
                match generic_names.iter().position(|n| *n == name) {
                    Some(i) => concrete_types.get(i).copied().unwrap_or(p),
                    None => p,
                }
            })
            .collect();
        let head_names = self.head_param_names(typ);
        self.unwrap_generic_head(typ, &head_names, &args)
    }

    fn unwrap_generic_head(
        &mut self,
        head: TypeId,
        head_names: &[String],
        args: &[TypeId],
    ) -> TypeId {
        if args.iter().any(|t| t.is_unresolved() || t.has_generic()) {
            return head;
        }
        let head_idx = self.final_idx(head);
        let head_sym = self.types[head_idx as usize].clone();
        let base = head_sym
            .name
            .split('<')
            .next()
            .unwrap_or(&head_sym.name)
            .to_string();
        let arg_names: Vec<String> = args.iter().map(|&a| self.type_name(a)).collect();
        let nn = format!("{base}<{}>", arg_names.join(", "));
        if let Some(&idx) = self.type_idxs.get(&nn) {
            return TypeId::new(idx);
        }
        trace!(name = %nn, "materializing generic instance");

        // Register the shell first so self-referential fields resolve to
        // the instance being built.
        let mut shell = head_sym.clone();
        shell.name = nn.clone();
        shell.cname = crate::table::symbols::mangle(&nn);
        shell.parent_idx = head_idx;
        shell.methods = Vec::new();
        let new_id = self.register_sym(shell);

        let mut info = head_sym.info.clone();
        match &mut info {
            TypeInfo::Struct(si) => {
                for field in &mut si.fields {
                    if let Some(t) =
                        self.resolve_generic_to_concrete(field.typ, head_names, args)
                    {
                        field.typ = t;
                    }
                }
                for embed in &mut si.embeds {
                    if let Some(t) = self.resolve_generic_to_concrete(*embed, head_names, args) {
                        *embed = t;
                    }
                }
                si.is_generic = false;
                si.concrete_types = args.to_vec();
            }
            TypeInfo::Interface(ii) => {
                for field in &mut ii.fields {
                    if let Some(t) =
                        self.resolve_generic_to_concrete(field.typ, head_names, args)
                    {
                        field.typ = t;
                    }
                }
                let mut methods = ii.methods.clone();
                for m in &mut methods {
                    self.substitute_sig(m, head_names, args);
                    m.receiver_type = new_id;
                    m.concrete_types = args.to_vec();
                }
                ii.methods = methods;
                ii.is_generic = false;
                ii.concrete_types = args.to_vec();
                ii.types = Vec::new();
            }
            TypeInfo::SumType(sti) => {
                for variant in &mut sti.variants {
                    if let Some(t) = self.resolve_generic_to_concrete(*variant, head_names, args) {
                        *variant = t;
                    }
                }
                sti.fields = Vec::new();
                sti.found_fields = false;
                sti.is_generic = false;
                sti.concrete_types = args.to_vec();
            }
            _ => {}
        }

        let mut methods = head_sym.methods.clone();
        for m in &mut methods {
            self.substitute_sig(m, head_names, args);
            m.receiver_type = new_id;
            m.concrete_types = args.to_vec();
        }

        let idx = new_id.idx() as usize;
        self.types[idx].info = info;
        self.types[idx].methods = methods;
        debug!(name = %nn, idx, "generic instance registered");
        new_id
    }

    fn substitute_sig(&mut self, sig: &mut FnSig, names: &[String], args: &[TypeId]) {
        for param in &mut sig.params {
            if let Some(t) = self.resolve_generic_to_concrete(param.typ, names, args) {
                param.typ = t;
            }
        }
        if let Some(t) = self.resolve_generic_to_concrete(sig.return_type, names, args) {
            sig.return_type = t;
        }
    }

    /// Rewrite parser-produced `generic_inst` placeholders (`Foo<int>`
    /// written textually) into real instantiated symbols.
    pub fn generic_insts_to_concrete(&mut self) {
        for idx in 1..self.types.len() {
            let sym = &self.types[idx];
            if sym.kind != TypeKind::GenericInst {
                continue;
            }
            let TypeInfo::GenericInst {
                parent_idx,
                concrete_types,
            } = &sym.info
            else {
                continue;
            };
            let parent_idx = *parent_idx;
            let args = concrete_types.clone();
            if parent_idx == 0 {
                continue;
            }
            let parent = self.types[parent_idx as usize].clone();
            if parent.kind == TypeKind::Placeholder {
                // Unknown head; the checker reports it.
                continue;
            }
            if args.iter().any(|t| t.has_generic() || t.is_unresolved()) {
                continue;
            }
            let head_names = self.head_param_names(TypeId::new(parent_idx));
            trace!(name = %self.types[idx].name, "rewriting generic_inst");

            let mut info = parent.info.clone();
            let new_id = TypeId::new(idx as u32);
            match &mut info {
                TypeInfo::Struct(si) => {
                    for field in &mut si.fields {
                        if let Some(t) =
                            self.resolve_generic_to_concrete(field.typ, &head_names, &args)
                        {
                            field.typ = t;
                        }
                    }
                    si.is_generic = false;
                    si.concrete_types = args.clone();
                }
                TypeInfo::Interface(ii) => {
                    for field in &mut ii.fields {
                        if let Some(t) =
                            self.resolve_generic_to_concrete(field.typ, &head_names, &args)
                        {
                            field.typ = t;
                        }
                    }
                    let mut methods = ii.methods.clone();
                    for m in &mut methods {
                        self.substitute_sig(m, &head_names, &args);
                        m.receiver_type = new_id;
                        m.concrete_types = args.clone();
                    }
                    ii.methods = methods;
                    ii.is_generic = false;
                    ii.concrete_types = args.clone();
                    ii.types = Vec::new();
                }
                TypeInfo::SumType(sti) => {
                    for variant in &mut sti.variants {
                        if let Some(t) =
                            self.resolve_generic_to_concrete(*variant, &head_names, &args)
                        {
                            *variant = t;
                        }
                    }
                    sti.fields = Vec::new();
                    sti.found_fields = false;
                    sti.is_generic = false;
                    sti.concrete_types = args.clone();
                }
                _ => continue,
            }

            let mut methods = parent.methods.clone();
            for m in &mut methods {
                self.substitute_sig(m, &head_names, &args);
                m.receiver_type = new_id;
                m.concrete_types = args.clone();
            }

            let target = &mut self.types[idx];
            target.kind = parent.kind;
            target.info = info;
            target.methods = methods;
            target.parent_idx = parent_idx;
        }
    }

    // ------------------------------------------------------------------
    // Call-site inference
    // ------------------------------------------------------------------

    /// Infer a binding for every generic parameter of `func` from the call
    /// argument types. Inconsistent numeric bindings promote; other
    /// inconsistencies are ambiguous; unbound parameters are hard errors.
    pub fn infer_fn_generic_types(
        &self,
        func: &FnSig,
        arg_types: &[TypeId],
    ) -> Result<Vec<TypeId>, GenericInferError> {
        let params: Vec<_> = func.visible_params().cloned().collect();
        let mut bound = Vec::with_capacity(func.generic_names.len());
        for gname in &func.generic_names {
            let mut binding: Option<TypeId> = None;
            for (i, param) in params.iter().enumerate() {
                // A variadic tail binds from its first argument.
                let Some(arg) = arg_types.get(i).copied() else {
                    continue;
                };
                let Some(candidate) = self.infer_binding(gname, param.typ, arg) else {
                    continue;
                };
                match binding {
                    None => binding = Some(candidate),
                    Some(prev) if self.same_final_idx(prev, candidate) => {}
                    Some(prev) => match self.promote_num(prev, candidate) {
                        Some(promoted) => binding = Some(promoted),
                        None => {
                            return Err(GenericInferError::Ambiguous {
                                name: gname.clone(),
                            });
                        }
                    },
                }
            }
            match binding {
                Some(t) => bound.push(self.mktyp(t).plain()),
                None => {
                    return Err(GenericInferError::Unbound {
                        name: gname.clone(),
                    });
                }
            }
        }
        Ok(bound)
    }

    fn infer_binding(&self, gname: &str, param: TypeId, arg: TypeId) -> Option<TypeId> {
        if param.is_unresolved() || arg.is_unresolved() {
            return None;
        }
        let psym = self.sym(param);
        if psym.short_name() == gname {
            return Some(self.mktyp(arg).plain());
        }
        let asym = self.final_sym(arg);
        match (&psym.info, &asym.info) {
            (TypeInfo::Array { elem: pe, .. }, TypeInfo::Array { elem: ae, .. }) => {
                self.infer_binding(gname, *pe, *ae)
            }
            (TypeInfo::ArrayFixed { elem: pe, .. }, TypeInfo::ArrayFixed { elem: ae, .. }) => {
                self.infer_binding(gname, *pe, *ae)
            }
            (TypeInfo::Map { key: pk, value: pv }, TypeInfo::Map { key: ak, value: av }) => self
                .infer_binding(gname, *pk, *ak)
                .or_else(|| self.infer_binding(gname, *pv, *av)),
            (TypeInfo::Chan { elem: pe, .. }, TypeInfo::Chan { elem: ae, .. }) => {
                self.infer_binding(gname, *pe, *ae)
            }
            (TypeInfo::Thread { ret: pr }, TypeInfo::Thread { ret: ar }) => {
                self.infer_binding(gname, *pr, *ar)
            }
            (
                TypeInfo::GenericInst {
                    concrete_types: pargs,
                    ..
                },
                _,
            ) => {
                let aargs = self.instance_args(asym);
                self.positional_binding(gname, pargs, &aargs)
            }
            (TypeInfo::Struct(pi), _) if pi.is_generic => {
                let aargs = self.instance_args(asym);
                self.positional_binding(gname, &pi.generic_types, &aargs)
            }
            (TypeInfo::Interface(pi), _) if pi.is_generic => {
                let aargs = self.instance_args(asym);
                self.positional_binding(gname, &pi.generic_types, &aargs)
            }
            (TypeInfo::SumType(pi), _) if pi.is_generic => {
                let aargs = self.instance_args(asym);
                self.positional_binding(gname, &pi.generic_types, &aargs)
            }
            _ => None,
        }
    }

    fn instance_args(&self, sym: &TypeSymbol) -> Vec<TypeId> {
        match &sym.info {
            TypeInfo::Struct(info) => info.concrete_types.clone(),
            TypeInfo::Interface(info) => info.concrete_types.clone(),
            TypeInfo::SumType(info) => info.concrete_types.clone(),
            TypeInfo::GenericInst { concrete_types, .. } => concrete_types.clone(),
            _ => Vec::new(),
        }
    }

    fn positional_binding(
        &self,
        gname: &str,
        params: &[TypeId],
        args: &[TypeId],
    ) -> Option<TypeId> {
        for (i, &p) in params.iter().enumerate() {
            if p.is_unresolved() {
                continue;
            }
            if self.sym(p).short_name() == gname
                && let Some(&a) = args.get(i)
            {
                return Some(a);
            }
            if let Some(&a) = args.get(i)
                && let Some(found) = self.infer_binding(gname, p, a)
            {
                return Some(found);
            }
        }
        None
    }
}

fn rewrap(orig: TypeId, new_id: TypeId, still_generic: bool) -> TypeId {
    let t = orig.derive(new_id.idx());
    if still_generic {
        t.set_flag(TypeFlags::GENERIC)
    } else {
        t.clear_flag(TypeFlags::GENERIC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::symbols::{
        FnParam, Language, StructField, StructInfo, TypeSymbol,
    };
    use crate::table::{F64_TYPE, INT_LITERAL_TYPE, INT_TYPE, STRING_TYPE};

    fn generic_param(table: &mut Table, name: &str) -> TypeId {
        table
            .add_placeholder_type(name, Language::Veld)
            .set_flag(TypeFlags::GENERIC)
    }

    fn register_generic_struct(
        table: &mut Table,
        name: &str,
        params: &[TypeId],
        fields: Vec<StructField>,
    ) -> TypeId {
        table.register_sym(TypeSymbol {
            name: name.into(),
            module: "main".into(),
            kind: TypeKind::Struct,
            info: TypeInfo::Struct(StructInfo {
                fields,
                generic_types: params.to_vec(),
                is_generic: true,
                ..StructInfo::default()
            }),
            ..TypeSymbol::default()
        })
    }

    #[test]
    fn direct_substitution() {
        let mut table = Table::new();
        let t = generic_param(&mut table, "T");
        let resolved = table
            .resolve_generic_to_concrete(t, &["T".into()], &[INT_TYPE])
            .unwrap();
        assert_eq!(resolved.idx(), INT_TYPE.idx());
        assert!(!resolved.has_generic());
    }

    #[test]
    fn array_substitution() {
        let mut table = Table::new();
        let t = generic_param(&mut table, "T");
        let arr_t = table.find_or_register_array(t);
        let resolved = table
            .resolve_generic_to_concrete(arr_t, &["T".into()], &[STRING_TYPE])
            .unwrap();
        let expected = table.find_or_register_array(STRING_TYPE);
        assert_eq!(resolved.idx(), expected.idx());
        assert!(!resolved.has_generic());
    }

    #[test]
    fn map_substitution_partial_and_full() {
        let mut table = Table::new();
        let k = generic_param(&mut table, "K");
        let v = generic_param(&mut table, "V");
        let map_kv = table.find_or_register_map(k, v);
        let resolved = table
            .resolve_generic_to_concrete(
                map_kv,
                &["K".into(), "V".into()],
                &[STRING_TYPE, INT_TYPE],
            )
            .unwrap();
        let expected = table.find_or_register_map(STRING_TYPE, INT_TYPE);
        assert_eq!(resolved.idx(), expected.idx());
        // No binding at all.
        assert!(
            table
                .resolve_generic_to_concrete(map_kv, &["X".into()], &[INT_TYPE])
                .is_none()
        );
    }

    #[test]
    fn unbound_parameter_is_none() {
        let mut table = Table::new();
        let t = generic_param(&mut table, "T");
        assert!(
            table
                .resolve_generic_to_concrete(t, &["U".into()], &[INT_TYPE])
                .is_none()
        );
    }

    #[test]
    fn box_instantiation_roundtrip() {
        let mut table = Table::new();
        let t = generic_param(&mut table, "T");
        let boxed = register_generic_struct(
            &mut table,
            "main.Box",
            &[t],
            vec![StructField::new("value", t)],
        );
        let inst = table.unwrap_generic_type(boxed, &["T".into()], &[INT_TYPE]);
        assert_ne!(inst.idx(), boxed.idx());
        let sym = table.sym(inst);
        assert_eq!(sym.name, "main.Box<int>");
        let field = table.find_field(inst, "value").unwrap();
        assert_eq!(field.typ.idx(), INT_TYPE.idx());
        // Idempotent.
        let again = table.unwrap_generic_type(boxed, &["T".into()], &[INT_TYPE]);
        assert_eq!(inst, again);
    }

    #[test]
    fn nested_generic_instantiation() {
        let mut table = Table::new();
        let t = generic_param(&mut table, "T");
        let data_type = table.find_or_register_array(t);
        let list = register_generic_struct(
            &mut table,
            "main.List",
            &[t],
            vec![StructField::new("data", data_type)],
        );
        let list_int = table.unwrap_generic_type(list, &["T".into()], &[INT_TYPE]);

        let k = generic_param(&mut table, "K");
        let v = generic_param(&mut table, "V");
        let pair = register_generic_struct(
            &mut table,
            "main.Pair",
            &[k, v],
            vec![
                StructField::new("key", k),
                StructField::new("value", v),
            ],
        );
        let inst = table.unwrap_generic_type(
            pair,
            &["K".into(), "V".into()],
            &[STRING_TYPE, list_int.plain()],
        );
        let value = table.find_field(inst, "value").unwrap();
        // Resolves to the pre-registered List<int> id.
        assert_eq!(value.typ.idx(), list_int.idx());
    }

    #[test]
    fn generic_inst_sweep() {
        let mut table = Table::new();
        let t = generic_param(&mut table, "T");
        let boxed = register_generic_struct(
            &mut table,
            "main.Box",
            &[t],
            vec![StructField::new("value", t)],
        );
        // What the parser would register for a textual `Box<f64>`.
        let inst = table.register_sym(TypeSymbol {
            name: "main.Box<f64>".into(),
            module: "main".into(),
            kind: TypeKind::GenericInst,
            info: TypeInfo::GenericInst {
                parent_idx: boxed.idx(),
                concrete_types: vec![F64_TYPE],
            },
            parent_idx: boxed.idx(),
            ..TypeSymbol::default()
        });
        table.generic_insts_to_concrete();
        let sym = table.sym(inst);
        assert_eq!(sym.kind, TypeKind::Struct);
        let field = table.find_field(inst, "value").unwrap();
        assert_eq!(field.typ.idx(), F64_TYPE.idx());
    }

    #[test]
    fn infer_from_array_and_scalar() {
        let mut table = Table::new();
        let t = generic_param(&mut table, "T");
        let arr_t = table.find_or_register_array(t);
        let func = FnSig {
            name: "f".into(),
            module: "main".into(),
            params: vec![FnParam::new("a", arr_t), FnParam::new("b", t)],
            return_type: t,
            generic_names: vec!["T".into()],
            ..FnSig::default()
        };
        let arr_int = table.find_or_register_array(INT_TYPE);
        let bound = table
            .infer_fn_generic_types(&func, &[arr_int, INT_LITERAL_TYPE])
            .unwrap();
        assert_eq!(bound, vec![INT_TYPE]);
    }

    #[test]
    fn infer_ambiguous_mix() {
        let mut table = Table::new();
        let t = generic_param(&mut table, "T");
        let func = FnSig {
            name: "f".into(),
            module: "main".into(),
            params: vec![FnParam::new("x", t), FnParam::new("y", t)],
            return_type: t,
            generic_names: vec!["T".into()],
            ..FnSig::default()
        };
        let err = table
            .infer_fn_generic_types(&func, &[INT_TYPE, STRING_TYPE])
            .unwrap_err();
        assert_eq!(
            err,
            GenericInferError::Ambiguous { name: "T".into() }
        );
        // Numeric mixes promote instead.
        let ok = table
            .infer_fn_generic_types(&func, &[INT_LITERAL_TYPE, F64_TYPE])
            .unwrap();
        assert_eq!(ok, vec![F64_TYPE]);
    }

    #[test]
    fn infer_unbound_is_error() {
        let mut table = Table::new();
        let func = FnSig {
            name: "f".into(),
            module: "main".into(),
            params: vec![FnParam::new("x", INT_TYPE)],
            return_type: INT_TYPE,
            generic_names: vec!["T".into()],
            ..FnSig::default()
        };
        let err = table.infer_fn_generic_types(&func, &[INT_TYPE]).unwrap_err();
        assert_eq!(err, GenericInferError::Unbound { name: "T".into() });
    }

    #[test]
    fn infer_positional_from_generic_struct() {
        let mut table = Table::new();
        let t = generic_param(&mut table, "T");
        let boxed = register_generic_struct(
            &mut table,
            "main.Box",
            &[t],
            vec![StructField::new("value", t)],
        );
        let box_int = table.unwrap_generic_type(boxed, &["T".into()], &[INT_TYPE]);
        let func = FnSig {
            name: "open".into(),
            module: "main".into(),
            params: vec![FnParam::new("b", boxed.set_flag(TypeFlags::GENERIC))],
            return_type: t,
            generic_names: vec!["T".into()],
            ..FnSig::default()
        };
        let bound = table
            .infer_fn_generic_types(&func, &[box_int.plain()])
            .unwrap();
        assert_eq!(bound, vec![INT_TYPE]);
    }
}
