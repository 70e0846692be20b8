// src/table/lookup.rs
//
// Method and field lookup: direct members, parent/alias chains, embedded
// types, aggregate intersections, and lazily-computed sum-type common
// fields. Lookups that cache take &mut self; results are owned clones.

use thiserror::Error;

use crate::table::symbols::{FnSig, StructField, TypeInfo, TypeKind};
use crate::table::{Table, TypeId};

const LOOKUP_DEPTH_LIMIT: u32 = 100;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("type `{type_name}` has no {what} `{name}`")]
    NotFound {
        what: &'static str,
        name: String,
        type_name: String,
    },
    #[error("ambiguous {what} `{name}`: found in embedded types {}", .candidates.join(" and "))]
    Ambiguous {
        what: &'static str,
        name: String,
        candidates: Vec<String>,
    },
}

impl Table {
    // ------------------------------------------------------------------
    // Methods
    // ------------------------------------------------------------------

    /// Direct method lookup, walking parent/alias chains upward. Aggregates
    /// resolve to the intersection method of their members (cached).
    pub fn find_method(&mut self, typ: TypeId, name: &str) -> Option<FnSig> {
        let mut idx = typ.idx();
        for _ in 0..LOOKUP_DEPTH_LIMIT {
            if idx == 0 {
                return None;
            }
            let sym = &self.types[idx as usize];
            if let Some(m) = sym.own_method(name) {
                return Some(m.clone());
            }
            if let TypeInfo::Interface(info) = &sym.info
                && let Some(m) = info.methods.iter().find(|m| m.name == name)
            {
                return Some(m.clone());
            }
            if sym.kind == TypeKind::Aggregate {
                return self.aggregate_method(idx, name);
            }
            idx = sym.parent_idx;
        }
        None
    }

    /// Search the embedded types of `typ` in breadth order. More than one
    /// embed contributing the same name is ambiguous.
    pub fn find_method_from_embeds(
        &mut self,
        typ: TypeId,
        name: &str,
    ) -> Result<Option<(FnSig, TypeId)>, LookupError> {
        self.method_from_embeds_bounded(typ, name, 0)
    }

    fn method_from_embeds_bounded(
        &mut self,
        typ: TypeId,
        name: &str,
        depth: u32,
    ) -> Result<Option<(FnSig, TypeId)>, LookupError> {
        if depth > LOOKUP_DEPTH_LIMIT || typ.is_unresolved() {
            return Ok(None);
        }
        let sym = &self.types[typ.idx() as usize];
        let embeds: Vec<TypeId> = match &sym.info {
            TypeInfo::Struct(info) => info.embeds.clone(),
            TypeInfo::Interface(info) => info.embeds.clone(),
            TypeInfo::Aggregate(info) => info.types.clone(),
            TypeInfo::Alias { parent } => {
                let parent = *parent;
                return self.method_from_embeds_bounded(parent, name, depth + 1);
            }
            _ => return Ok(None),
        };
        let mut hits: Vec<(FnSig, TypeId)> = Vec::new();
        for embed in embeds {
            if let Some(m) = self.find_method(embed, name) {
                hits.push((m, embed));
            } else if let Some(hit) = self.method_from_embeds_bounded(embed, name, depth + 1)? {
                hits.push(hit);
            }
        }
        match hits.len() {
            0 => Ok(None),
            1 => Ok(hits.pop()),
            _ => Err(LookupError::Ambiguous {
                what: "method",
                name: name.to_string(),
                candidates: hits
                    .iter()
                    .map(|(_, t)| self.type_name(*t))
                    .collect(),
            }),
        }
    }

    /// Direct lookup first, embeds second.
    pub fn find_method_with_embeds(
        &mut self,
        typ: TypeId,
        name: &str,
    ) -> Result<FnSig, LookupError> {
        if let Some(m) = self.find_method(typ, name) {
            return Ok(m);
        }
        if let Some((m, _)) = self.find_method_from_embeds(typ, name)? {
            return Ok(m);
        }
        Err(LookupError::NotFound {
            what: "method",
            name: name.to_string(),
            type_name: self.type_name(typ),
        })
    }

    /// Intersection method of an aggregate: present on every member type,
    /// cached on the aggregate symbol once found.
    fn aggregate_method(&mut self, idx: u32, name: &str) -> Option<FnSig> {
        let members = match &self.types[idx as usize].info {
            TypeInfo::Aggregate(info) => info.types.clone(),
            _ => return None,
        };
        let mut found: Option<FnSig> = None;
        for member in &members {
            match self.find_method(*member, name) {
                Some(m) => {
                    if found.is_none() {
                        found = Some(m);
                    }
                }
                None => return None,
            }
        }
        let method = found?;
        self.types[idx as usize].register_method(method.clone());
        Some(method)
    }

    // ------------------------------------------------------------------
    // Fields
    // ------------------------------------------------------------------

    /// Direct field lookup, walking parent chains. Sum types expose the
    /// lazily-computed intersection of their variants' fields; aggregates
    /// expose the intersection of their members'.
    pub fn find_field(&mut self, typ: TypeId, name: &str) -> Option<StructField> {
        let mut idx = typ.idx();
        for _ in 0..LOOKUP_DEPTH_LIMIT {
            if idx == 0 {
                return None;
            }
            let sym = &self.types[idx as usize];
            match &sym.info {
                TypeInfo::Struct(info) => {
                    if let Some(f) = info.fields.iter().find(|f| f.name == name) {
                        return Some(f.clone());
                    }
                }
                TypeInfo::Interface(info) => {
                    if let Some(f) = info.fields.iter().find(|f| f.name == name) {
                        return Some(f.clone());
                    }
                }
                TypeInfo::SumType(info) => {
                    if info.found_fields {
                        return info.fields.iter().find(|f| f.name == name).cloned();
                    }
                    self.resolve_common_sumtype_fields(idx);
                    let TypeInfo::SumType(info) = &self.types[idx as usize].info else {
                        return None;
                    };
                    return info.fields.iter().find(|f| f.name == name).cloned();
                }
                TypeInfo::Aggregate(info) => {
                    if info.found_fields {
                        return info.fields.iter().find(|f| f.name == name).cloned();
                    }
                    self.resolve_aggregate_fields(idx);
                    let TypeInfo::Aggregate(info) = &self.types[idx as usize].info else {
                        return None;
                    };
                    return info.fields.iter().find(|f| f.name == name).cloned();
                }
                _ => {}
            }
            idx = self.types[idx as usize].parent_idx;
        }
        None
    }

    pub fn find_field_from_embeds(
        &mut self,
        typ: TypeId,
        name: &str,
    ) -> Result<Option<(StructField, TypeId)>, LookupError> {
        self.field_from_embeds_bounded(typ, name, 0)
    }

    fn field_from_embeds_bounded(
        &mut self,
        typ: TypeId,
        name: &str,
        depth: u32,
    ) -> Result<Option<(StructField, TypeId)>, LookupError> {
        if depth > LOOKUP_DEPTH_LIMIT || typ.is_unresolved() {
            return Ok(None);
        }
        let sym = &self.types[typ.idx() as usize];
        let embeds: Vec<TypeId> = match &sym.info {
            TypeInfo::Struct(info) => info.embeds.clone(),
            TypeInfo::Interface(info) => info.embeds.clone(),
            TypeInfo::Aggregate(info) => info.types.clone(),
            TypeInfo::Alias { parent } => {
                let parent = *parent;
                return self.field_from_embeds_bounded(parent, name, depth + 1);
            }
            _ => return Ok(None),
        };
        let mut hits: Vec<(StructField, TypeId)> = Vec::new();
        for embed in embeds {
            if let Some(f) = self.find_field(embed, name) {
                hits.push((f, embed));
            } else if let Some(hit) = self.field_from_embeds_bounded(embed, name, depth + 1)? {
                hits.push(hit);
            }
        }
        match hits.len() {
            0 => Ok(None),
            1 => Ok(hits.pop()),
            _ => Err(LookupError::Ambiguous {
                what: "field",
                name: name.to_string(),
                candidates: hits
                    .iter()
                    .map(|(_, t)| self.type_name(*t))
                    .collect(),
            }),
        }
    }

    pub fn find_field_with_embeds(
        &mut self,
        typ: TypeId,
        name: &str,
    ) -> Result<StructField, LookupError> {
        if let Some(f) = self.find_field(typ, name) {
            return Ok(f);
        }
        if let Some((f, _)) = self.find_field_from_embeds(typ, name)? {
            return Ok(f);
        }
        Err(LookupError::NotFound {
            what: "field",
            name: name.to_string(),
            type_name: self.type_name(typ),
        })
    }

    /// A sum-type field is common when every variant carries a field with
    /// the same name and the same type. Computed once, cached on the symbol.
    fn resolve_common_sumtype_fields(&mut self, idx: u32) {
        let variants = match &self.types[idx as usize].info {
            TypeInfo::SumType(info) => info.variants.clone(),
            _ => return,
        };
        let common = self.intersect_fields(&variants);
        if let TypeInfo::SumType(info) = &mut self.types[idx as usize].info {
            info.fields = common;
            info.found_fields = true;
        }
    }

    fn resolve_aggregate_fields(&mut self, idx: u32) {
        let members = match &self.types[idx as usize].info {
            TypeInfo::Aggregate(info) => info.types.clone(),
            _ => return,
        };
        let common = self.intersect_fields(&members);
        if let TypeInfo::Aggregate(info) = &mut self.types[idx as usize].info {
            info.fields = common;
            info.found_fields = true;
        }
    }

    fn intersect_fields(&mut self, types: &[TypeId]) -> Vec<StructField> {
        let Some((&first, rest)) = types.split_first() else {
            return Vec::new();
        };
        let candidates: Vec<StructField> = match &self.final_sym(first).info {
            TypeInfo::Struct(info) => info.fields.clone(),
            TypeInfo::Interface(info) => info.fields.clone(),
            _ => Vec::new(),
        };
        let mut common = Vec::new();
        'candidate: for mut field in candidates {
            for other in rest {
                match self.find_field(*other, &field.name) {
                    Some(f) if f.typ == field.typ => {
                        field.is_mut &= f.is_mut;
                        field.is_pub &= f.is_pub;
                    }
                    _ => continue 'candidate,
                }
            }
            common.push(field);
        }
        common
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::symbols::{
        AggregateInfo, FnSig, StructField, StructInfo, SumTypeInfo, TypeSymbol,
    };
    use crate::table::{BOOL_TYPE, F64_TYPE, INT_TYPE, STRING_TYPE};

    fn register_struct(table: &mut Table, name: &str, info: StructInfo) -> TypeId {
        table.register_sym(TypeSymbol {
            name: name.into(),
            module: "main".into(),
            kind: TypeKind::Struct,
            info: TypeInfo::Struct(info),
            ..TypeSymbol::default()
        })
    }

    fn method(name: &str, ret: TypeId) -> FnSig {
        FnSig {
            name: name.into(),
            module: "main".into(),
            return_type: ret,
            ..FnSig::default()
        }
    }

    #[test]
    fn direct_method_and_miss() {
        let mut table = Table::new();
        let point = register_struct(&mut table, "main.Point", StructInfo::default());
        table.register_builtin_method(point, method("dist", F64_TYPE));
        assert!(table.find_method(point, "dist").is_some());
        assert!(table.find_method(point, "missing").is_none());
    }

    #[test]
    fn method_through_alias_parent() {
        let mut table = Table::new();
        let point = register_struct(&mut table, "main.Point", StructInfo::default());
        table.register_builtin_method(point, method("dist", F64_TYPE));
        let alias = table.register_sym(TypeSymbol {
            name: "main.Location".into(),
            module: "main".into(),
            kind: TypeKind::Alias,
            info: TypeInfo::Alias { parent: point },
            parent_idx: point.idx(),
            ..TypeSymbol::default()
        });
        assert!(table.find_method(alias, "dist").is_some());
    }

    #[test]
    fn embedded_method_found_and_ambiguous() {
        let mut table = Table::new();
        let a = register_struct(&mut table, "main.A", StructInfo::default());
        table.register_builtin_method(a, method("go", INT_TYPE));
        let b = register_struct(&mut table, "main.B", StructInfo::default());
        table.register_builtin_method(b, method("go", INT_TYPE));

        let single = register_struct(
            &mut table,
            "main.Single",
            StructInfo {
                embeds: vec![a],
                ..StructInfo::default()
            },
        );
        let found = table.find_method_with_embeds(single, "go").unwrap();
        assert_eq!(found.name, "go");

        let both = register_struct(
            &mut table,
            "main.Both",
            StructInfo {
                embeds: vec![a, b],
                ..StructInfo::default()
            },
        );
        let err = table.find_method_with_embeds(both, "go").unwrap_err();
        assert!(matches!(err, LookupError::Ambiguous { .. }));
    }

    #[test]
    fn missing_member_is_structured_error() {
        let mut table = Table::new();
        let s = register_struct(&mut table, "main.S", StructInfo::default());
        let err = table.find_method_with_embeds(s, "nope").unwrap_err();
        assert_eq!(
            err,
            LookupError::NotFound {
                what: "method",
                name: "nope".into(),
                type_name: "main.S".into(),
            }
        );
    }

    #[test]
    fn sumtype_common_fields_lazy() {
        let mut table = Table::new();
        let circle = register_struct(
            &mut table,
            "main.Circle",
            StructInfo {
                fields: vec![
                    StructField::new("name", STRING_TYPE),
                    StructField::new("radius", F64_TYPE),
                ],
                ..StructInfo::default()
            },
        );
        let square = register_struct(
            &mut table,
            "main.Square",
            StructInfo {
                fields: vec![
                    StructField::new("name", STRING_TYPE),
                    StructField::new("side", F64_TYPE),
                ],
                ..StructInfo::default()
            },
        );
        let shape = table.register_sym(TypeSymbol {
            name: "main.Shape".into(),
            module: "main".into(),
            kind: TypeKind::SumType,
            info: TypeInfo::SumType(SumTypeInfo {
                variants: vec![circle, square],
                ..SumTypeInfo::default()
            }),
            ..TypeSymbol::default()
        });
        // Common: `name` in both variants with the same type.
        assert!(table.find_field(shape, "name").is_some());
        // `radius` exists only on Circle.
        assert!(table.find_field(shape, "radius").is_none());
        // Memoized after the first query.
        let info = table.sym(shape).sumtype_info().unwrap();
        assert!(info.found_fields);
        assert_eq!(info.fields.len(), 1);
    }

    #[test]
    fn aggregate_intersects_methods() {
        let mut table = Table::new();
        let a = register_struct(&mut table, "main.Dog", StructInfo::default());
        table.register_builtin_method(a, method("speak", STRING_TYPE));
        table.register_builtin_method(a, method("fetch", BOOL_TYPE));
        let b = register_struct(&mut table, "main.Cat", StructInfo::default());
        table.register_builtin_method(b, method("speak", STRING_TYPE));

        let agg = table.register_sym(TypeSymbol {
            name: "main.Dog|main.Cat".into(),
            module: "main".into(),
            kind: TypeKind::Aggregate,
            info: TypeInfo::Aggregate(AggregateInfo {
                types: vec![a, b],
                ..AggregateInfo::default()
            }),
            ..TypeSymbol::default()
        });
        // speak: on both members.
        assert!(table.find_method(agg, "speak").is_some());
        // fetch: only on Dog, not part of the intersection.
        assert!(table.find_method(agg, "fetch").is_none());
        // Cached on the aggregate symbol.
        assert!(table.sym(agg).own_method("speak").is_some());
    }

    #[test]
    fn embedded_field_lookup() {
        let mut table = Table::new();
        let base = register_struct(
            &mut table,
            "main.Base",
            StructInfo {
                fields: vec![StructField::new("id", INT_TYPE)],
                ..StructInfo::default()
            },
        );
        let derived = register_struct(
            &mut table,
            "main.Derived",
            StructInfo {
                embeds: vec![base],
                ..StructInfo::default()
            },
        );
        let f = table.find_field_with_embeds(derived, "id").unwrap();
        assert_eq!(f.typ, INT_TYPE);
    }
}
