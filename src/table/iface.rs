// src/table/iface.rs
//
// Interface conformance: method/field satisfaction checks, implementing-type
// bookkeeping, memoized embedding expansion, and the final M×N sweep.

use tracing::{debug, trace};

use crate::table::symbols::{FnSig, Language, TypeInfo, TypeKind};
use crate::table::{Table, TypeId, ERROR_TYPE, NONE_TYPE, VOIDPTR_TYPE};

const IFACE_EMBED_DEPTH_LIMIT: u32 = 100;

impl Table {
    /// Fold embedded interfaces' methods and fields into `iface`.
    /// Memoized per interface; cycles are reported instead of overflowing.
    pub fn expand_interface_embeds(&mut self, iface: TypeId) -> Result<(), String> {
        self.expand_interface_bounded(iface, 0)
    }

    fn expand_interface_bounded(&mut self, iface: TypeId, depth: u32) -> Result<(), String> {
        if depth > IFACE_EMBED_DEPTH_LIMIT {
            return Err(format!(
                "interface embedding of `{}` is too deep (cycle?)",
                self.type_name(iface)
            ));
        }
        let idx = iface.idx() as usize;
        let embeds = match &self.types[idx].info {
            TypeInfo::Interface(info) => {
                if info.is_expanded || info.embeds.is_empty() {
                    return Ok(());
                }
                info.embeds.clone()
            }
            _ => return Ok(()),
        };
        for embed in &embeds {
            self.expand_interface_bounded(*embed, depth + 1)?;
        }
        let mut inherited_methods: Vec<FnSig> = Vec::new();
        let mut inherited_fields = Vec::new();
        for embed in &embeds {
            if let TypeInfo::Interface(embed_info) = &self.types[embed.idx() as usize].info {
                inherited_methods.extend(embed_info.methods.iter().cloned());
                inherited_fields.extend(embed_info.fields.iter().cloned());
            }
        }
        if let TypeInfo::Interface(info) = &mut self.types[idx].info {
            for m in inherited_methods {
                if !info.methods.iter().any(|own| own.name == m.name) {
                    info.methods.push(m);
                }
            }
            for f in inherited_fields {
                if !info.fields.iter().any(|own| own.name == f.name) {
                    info.fields.push(f);
                }
            }
            info.is_expanded = true;
        }
        Ok(())
    }

    /// Does `typ` satisfy `iface`? On success the interface's
    /// implementing-types set is extended with `typ` (and voidptr).
    pub fn does_type_implement_interface(&mut self, typ: TypeId, iface: TypeId) -> bool {
        if typ.idx() == iface.idx() {
            return true;
        }
        if typ.is_unresolved() || iface.is_unresolved() {
            return false;
        }
        // `none` satisfies the builtin error interface.
        if self.final_idx(typ) == NONE_TYPE.idx() && self.final_idx(iface) == ERROR_TYPE.idx() {
            return true;
        }
        let iface_idx = self.final_idx(iface);
        let (methods, fields, generic_names, concrete_types) =
            match &self.types[iface_idx as usize].info {
                TypeInfo::Interface(info) => {
                    if info.is_generic && info.concrete_types.is_empty() {
                        // Uninstantiated generic interface heads never match.
                        return false;
                    }
                    let names: Vec<String> = info
                        .generic_types
                        .iter()
                        .map(|&t| self.sym(t).short_name().to_string())
                        .collect();
                    (
                        info.methods.clone(),
                        info.fields.clone(),
                        names,
                        info.concrete_types.clone(),
                    )
                }
                _ => return false,
            };
        // Interface-to-interface "implementation" is forbidden.
        if self.final_kind(typ) == TypeKind::Interface {
            return false;
        }

        for required in &methods {
            let Ok(found) = self.find_method_with_embeds(typ, &required.name) else {
                trace!(
                    typ = %self.type_name(typ),
                    iface = %self.type_name(iface),
                    method = %required.name,
                    "missing interface method"
                );
                return false;
            };
            if !self.method_satisfies(&found, required, &generic_names, &concrete_types) {
                return false;
            }
        }
        for required in &fields {
            let Ok(found) = self.find_field_with_embeds(typ, &required.name) else {
                return false;
            };
            // voidptr-typed interface fields accept any same-named field.
            if required.typ.idx() != VOIDPTR_TYPE.idx() {
                let want = self
                    .resolve_generic_to_concrete(required.typ, &generic_names, &concrete_types)
                    .unwrap_or(required.typ);
                if !self.same_final_idx(found.typ, want) {
                    return false;
                }
            }
            if required.is_mut && !found.is_mut {
                return false;
            }
        }

        debug!(
            typ = %self.type_name(typ),
            iface = %self.type_name(iface),
            "interface satisfied"
        );
        self.record_interface_impl(TypeId::new(iface_idx), typ);
        true
    }

    fn method_satisfies(
        &mut self,
        found: &FnSig,
        required: &FnSig,
        generic_names: &[String],
        concrete_types: &[TypeId],
    ) -> bool {
        let found_params: Vec<_> = found.visible_params().cloned().collect();
        let required_params: Vec<_> = required.visible_params().cloned().collect();
        if found_params.len() != required_params.len() {
            return false;
        }
        let want_ret = self
            .resolve_generic_to_concrete(required.return_type, generic_names, concrete_types)
            .unwrap_or(required.return_type);
        if !self.same_final_idx(found.return_type, want_ret)
            || found.return_type.flags() != want_ret.flags()
        {
            return false;
        }
        let js_bridge = found.language == Language::Js || required.language == Language::Js;
        for (fp, rp) in found_params.iter().zip(required_params.iter()) {
            let want = self
                .resolve_generic_to_concrete(rp.typ, generic_names, concrete_types)
                .unwrap_or(rp.typ);
            if self.same_final_idx(fp.typ, want) {
                continue;
            }
            // JS-bridged signatures treat all numerics interchangeably.
            if js_bridge
                && self.final_kind(fp.typ).is_number()
                && self.final_kind(want).is_number()
            {
                continue;
            }
            return false;
        }
        if found.receiver_is_mut != required.receiver_is_mut {
            return false;
        }
        true
    }

    fn record_interface_impl(&mut self, iface: TypeId, typ: TypeId) {
        let idx = iface.idx() as usize;
        if let TypeInfo::Interface(info) = &mut self.types[idx].info {
            if info.single_impl && !info.types.is_empty() {
                return;
            }
            if !info.types.contains(&typ) {
                info.types.push(typ);
            }
            if !info.types.contains(&VOIDPTR_TYPE) {
                info.types.push(VOIDPTR_TYPE);
            }
        }
    }

    /// Exhaustive sweep once all declarations are known. Trivially-empty
    /// interfaces are only paired with same-module structs to keep the
    /// M×N product honest.
    pub fn complete_interface_check(&mut self) {
        let mut ifaces = Vec::new();
        let mut candidates = Vec::new();
        for (idx, sym) in self.types.iter().enumerate().skip(1) {
            match sym.kind {
                TypeKind::Interface => {
                    if let TypeInfo::Interface(info) = &sym.info {
                        if info.is_generic && info.concrete_types.is_empty() {
                            continue;
                        }
                        let trivial = info.methods.is_empty() && info.fields.is_empty();
                        ifaces.push((idx as u32, trivial, sym.module.clone()));
                    }
                }
                TypeKind::Struct | TypeKind::SumType => {
                    candidates.push((idx as u32, sym.module.clone()));
                }
                _ => {}
            }
        }
        for (iface_idx, trivial, iface_mod) in &ifaces {
            for (cand_idx, cand_mod) in &candidates {
                if *trivial && cand_mod != iface_mod {
                    continue;
                }
                let _ = self.does_type_implement_interface(
                    TypeId::new(*cand_idx),
                    TypeId::new(*iface_idx),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::symbols::{
        FnParam, InterfaceInfo, StructField, StructInfo, TypeSymbol,
    };
    use crate::table::{F64_TYPE, INT_TYPE, STRING_TYPE};

    fn iface_method(name: &str, params: Vec<FnParam>, ret: TypeId) -> FnSig {
        FnSig {
            name: name.into(),
            module: "main".into(),
            params,
            return_type: ret,
            ..FnSig::default()
        }
    }

    fn register_iface(table: &mut Table, name: &str, info: InterfaceInfo) -> TypeId {
        table.register_sym(TypeSymbol {
            name: name.into(),
            module: "main".into(),
            kind: TypeKind::Interface,
            info: TypeInfo::Interface(info),
            ..TypeSymbol::default()
        })
    }

    fn register_struct(table: &mut Table, name: &str, info: StructInfo) -> TypeId {
        table.register_sym(TypeSymbol {
            name: name.into(),
            module: "main".into(),
            kind: TypeKind::Struct,
            info: TypeInfo::Struct(info),
            ..TypeSymbol::default()
        })
    }

    #[test]
    fn satisfied_with_all_members() {
        let mut table = Table::new();
        let iface = register_iface(
            &mut table,
            "main.Speaker",
            InterfaceInfo {
                methods: vec![iface_method("speak", vec![], STRING_TYPE)],
                fields: vec![StructField::new("volume", INT_TYPE)],
                ..InterfaceInfo::default()
            },
        );
        let dog = register_struct(
            &mut table,
            "main.Dog",
            StructInfo {
                fields: vec![StructField::new("volume", INT_TYPE)],
                ..StructInfo::default()
            },
        );
        table.register_builtin_method(dog, iface_method("speak", vec![], STRING_TYPE));
        assert!(table.does_type_implement_interface(dog, iface));

        // Implementing set extended exactly once, plus the voidptr escape.
        assert!(table.does_type_implement_interface(dog, iface));
        let info = table.sym(iface).interface_info().unwrap();
        assert_eq!(info.types.iter().filter(|&&t| t == dog).count(), 1);
        assert!(info.types.contains(&VOIDPTR_TYPE));
    }

    #[test]
    fn missing_method_or_field_fails() {
        let mut table = Table::new();
        let iface = register_iface(
            &mut table,
            "main.Speaker",
            InterfaceInfo {
                methods: vec![iface_method("speak", vec![], STRING_TYPE)],
                fields: vec![StructField::new("volume", INT_TYPE)],
                ..InterfaceInfo::default()
            },
        );
        // Has the field, lacks the method.
        let mute = register_struct(
            &mut table,
            "main.Mute",
            StructInfo {
                fields: vec![StructField::new("volume", INT_TYPE)],
                ..StructInfo::default()
            },
        );
        assert!(!table.does_type_implement_interface(mute, iface));
        // Has the method, lacks the field.
        let loud = register_struct(&mut table, "main.Loud", StructInfo::default());
        table.register_builtin_method(loud, iface_method("speak", vec![], STRING_TYPE));
        assert!(!table.does_type_implement_interface(loud, iface));
    }

    #[test]
    fn wrong_return_type_fails() {
        let mut table = Table::new();
        let iface = register_iface(
            &mut table,
            "main.Worker",
            InterfaceInfo {
                methods: vec![iface_method("work", vec![], INT_TYPE)],
                ..InterfaceInfo::default()
            },
        );
        let s = register_struct(&mut table, "main.S", StructInfo::default());
        table.register_builtin_method(s, iface_method("work", vec![], STRING_TYPE));
        assert!(!table.does_type_implement_interface(s, iface));
    }

    #[test]
    fn mutable_field_requirement() {
        let mut table = Table::new();
        let mut want = StructField::new("count", INT_TYPE);
        want.is_mut = true;
        let iface = register_iface(
            &mut table,
            "main.Counter",
            InterfaceInfo {
                fields: vec![want],
                ..InterfaceInfo::default()
            },
        );
        let imm = register_struct(
            &mut table,
            "main.Frozen",
            StructInfo {
                fields: vec![StructField::new("count", INT_TYPE)],
                ..StructInfo::default()
            },
        );
        assert!(!table.does_type_implement_interface(imm, iface));
        let mut mf = StructField::new("count", INT_TYPE);
        mf.is_mut = true;
        let ok = register_struct(
            &mut table,
            "main.Live",
            StructInfo {
                fields: vec![mf],
                ..StructInfo::default()
            },
        );
        assert!(table.does_type_implement_interface(ok, iface));
    }

    #[test]
    fn voidptr_field_accepts_anything() {
        let mut table = Table::new();
        let iface = register_iface(
            &mut table,
            "main.Holder",
            InterfaceInfo {
                fields: vec![StructField::new("data", VOIDPTR_TYPE)],
                ..InterfaceInfo::default()
            },
        );
        let s = register_struct(
            &mut table,
            "main.S",
            StructInfo {
                fields: vec![StructField::new("data", F64_TYPE)],
                ..StructInfo::default()
            },
        );
        assert!(table.does_type_implement_interface(s, iface));
    }

    #[test]
    fn interface_never_implements_interface() {
        let mut table = Table::new();
        let a = register_iface(&mut table, "main.A", InterfaceInfo::default());
        let b = register_iface(&mut table, "main.B", InterfaceInfo::default());
        assert!(!table.does_type_implement_interface(a, b));
        assert!(table.does_type_implement_interface(a, a));
    }

    #[test]
    fn none_implements_error() {
        let mut table = Table::new();
        assert!(table.does_type_implement_interface(NONE_TYPE, ERROR_TYPE));
        assert!(!table.does_type_implement_interface(NONE_TYPE, NONE_TYPE.derive(3)));
    }

    #[test]
    fn single_impl_stops_recording() {
        let mut table = Table::new();
        let iface = register_iface(
            &mut table,
            "main.Only",
            InterfaceInfo {
                single_impl: true,
                ..InterfaceInfo::default()
            },
        );
        let a = register_struct(&mut table, "main.First", StructInfo::default());
        let b = register_struct(&mut table, "main.Second", StructInfo::default());
        assert!(table.does_type_implement_interface(a, iface));
        assert!(table.does_type_implement_interface(b, iface));
        let info = table.sym(iface).interface_info().unwrap();
        assert!(info.types.contains(&a));
        assert!(!info.types.contains(&b));
    }

    #[test]
    fn embed_expansion_is_memoized() {
        let mut table = Table::new();
        let base = register_iface(
            &mut table,
            "main.Base",
            InterfaceInfo {
                methods: vec![iface_method("id", vec![], INT_TYPE)],
                ..InterfaceInfo::default()
            },
        );
        let derived = register_iface(
            &mut table,
            "main.Derived",
            InterfaceInfo {
                methods: vec![iface_method("extra", vec![], INT_TYPE)],
                embeds: vec![base],
                ..InterfaceInfo::default()
            },
        );
        table.expand_interface_embeds(derived).unwrap();
        let info = table.sym(derived).interface_info().unwrap();
        assert!(info.is_expanded);
        assert_eq!(info.methods.len(), 2);
        // Second expansion is a no-op.
        table.expand_interface_embeds(derived).unwrap();
        let info = table.sym(derived).interface_info().unwrap();
        assert_eq!(info.methods.len(), 2);
    }

    #[test]
    fn sweep_registers_implementations() {
        let mut table = Table::new();
        let iface = register_iface(
            &mut table,
            "main.Named",
            InterfaceInfo {
                methods: vec![iface_method("name", vec![], STRING_TYPE)],
                ..InterfaceInfo::default()
            },
        );
        let s = register_struct(&mut table, "main.City", StructInfo::default());
        table.register_builtin_method(s, iface_method("name", vec![], STRING_TYPE));
        table.complete_interface_check();
        let info = table.sym(iface).interface_info().unwrap();
        assert!(info.types.contains(&s));
    }
}
