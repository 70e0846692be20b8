// src/table/fns.rs
//
// Free-function registration and the per-function concrete-types ledger
// that drives generic re-check iterations in the checker.

use tracing::trace;

use crate::table::symbols::FnSig;
use crate::table::type_id::TypeIdVec;
use crate::table::{Table, TypeId};

impl Table {
    /// Store a function by fully-qualified name. Re-registrations collide
    /// silently in favor of the earlier symbol unless it had no body.
    pub fn register_fn(&mut self, sig: FnSig) {
        let key = sig.qualified_name();
        match self.fns.get(&key) {
            Some(existing) if !existing.attrs.no_body => {
                trace!(name = %key, "duplicate fn registration ignored");
            }
            _ => {
                trace!(name = %key, "registered fn");
                self.fns.insert(key, sig);
            }
        }
    }

    pub fn find_fn(&self, name: &str) -> Option<&FnSig> {
        self.fns.get(name)
    }

    pub fn find_fn_mut(&mut self, name: &str) -> Option<&mut FnSig> {
        self.fns.get_mut(name)
    }

    pub fn has_fn(&self, name: &str) -> bool {
        self.fns.contains_key(name)
    }

    pub fn fn_names(&self) -> impl Iterator<Item = &str> {
        self.fns.keys().map(|k| k.as_str())
    }

    /// Initialize the concrete-types ledger for a generic function.
    pub fn register_fn_generic_types(&mut self, key: &str) {
        self.fn_generic_types.entry(key.to_string()).or_default();
    }

    /// Record a concrete tuple observed at a call site. Returns true when
    /// the tuple is new, which drives checker re-check iterations.
    pub fn register_fn_concrete_types(&mut self, key: &str, types: &[TypeId]) -> bool {
        if types.is_empty() {
            return false;
        }
        let entry = self.fn_generic_types.entry(key.to_string()).or_default();
        if entry.iter().any(|t| t.as_slice() == types) {
            return false;
        }
        trace!(name = %key, ?types, "new concrete tuple");
        entry.push(TypeIdVec::from_slice(types));
        true
    }

    pub fn fn_generic_types_for(&self, key: &str) -> &[TypeIdVec] {
        self.fn_generic_types
            .get(key)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::symbols::FnAttrs;
    use crate::table::{INT_TYPE, STRING_TYPE, VOID_TYPE};

    fn sig(name: &str, ret: TypeId) -> FnSig {
        FnSig {
            name: name.into(),
            module: "main".into(),
            return_type: ret,
            ..FnSig::default()
        }
    }

    #[test]
    fn duplicate_registration_keeps_first() {
        let mut table = Table::new();
        table.register_fn(sig("greet", STRING_TYPE));
        table.register_fn(sig("greet", INT_TYPE));
        assert_eq!(
            table.find_fn("main.greet").unwrap().return_type,
            STRING_TYPE
        );
    }

    #[test]
    fn no_body_placeholder_is_replaced() {
        let mut table = Table::new();
        let mut fwd = sig("greet", VOID_TYPE);
        fwd.attrs = FnAttrs {
            no_body: true,
            ..FnAttrs::default()
        };
        table.register_fn(fwd);
        table.register_fn(sig("greet", STRING_TYPE));
        assert_eq!(
            table.find_fn("main.greet").unwrap().return_type,
            STRING_TYPE
        );
    }

    #[test]
    fn concrete_tuple_ledger() {
        let mut table = Table::new();
        table.register_fn_generic_types("main.f");
        assert!(table.register_fn_concrete_types("main.f", &[INT_TYPE]));
        assert!(!table.register_fn_concrete_types("main.f", &[INT_TYPE]));
        assert!(table.register_fn_concrete_types("main.f", &[STRING_TYPE]));
        assert_eq!(table.fn_generic_types_for("main.f").len(), 2);
        assert!(table.fn_generic_types_for("main.unknown").is_empty());
    }
}
