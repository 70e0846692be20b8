// src/scope.rs
//
// Lexical scopes: variable/const/global objects keyed by name, plus
// smartcast refinement stacks for sum-type and interface narrowing.
// The checker owns a stack of these; closed scopes are swept for unused
// objects before being dropped.

use rustc_hash::FxHashMap;

use crate::span::Pos;
use crate::table::TypeId;

/// Concurrency share mode of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShareKind {
    #[default]
    Plain,
    Shared,
    Atomic,
}

#[derive(Debug, Clone, Default)]
pub struct Var {
    pub name: String,
    pub typ: TypeId,
    pub is_mut: bool,
    pub is_used: bool,
    pub is_changed: bool,
    pub is_arg: bool,
    pub share: ShareKind,
    pub pos: Pos,
}

#[derive(Debug, Clone)]
pub enum ScopeObject {
    Var(Var),
    Const {
        name: String,
        typ: TypeId,
        is_pub: bool,
        pos: Pos,
    },
    Global {
        name: String,
        typ: TypeId,
        pos: Pos,
    },
}

impl ScopeObject {
    pub fn name(&self) -> &str {
        match self {
            ScopeObject::Var(v) => &v.name,
            ScopeObject::Const { name, .. } => name,
            ScopeObject::Global { name, .. } => name,
        }
    }

    pub fn typ(&self) -> TypeId {
        match self {
            ScopeObject::Var(v) => v.typ,
            ScopeObject::Const { typ, .. } => *typ,
            ScopeObject::Global { typ, .. } => *typ,
        }
    }

    pub fn pos(&self) -> Pos {
        match self {
            ScopeObject::Var(v) => v.pos,
            ScopeObject::Const { pos, .. } => *pos,
            ScopeObject::Global { pos, .. } => *pos,
        }
    }
}

/// Refinement key: bare variable name for ident casts, owner expression
/// string plus owner type for selector casts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SmartcastKey {
    pub key: String,
    pub owner_typ: u32,
}

impl SmartcastKey {
    pub fn var(name: &str) -> Self {
        Self {
            key: name.to_string(),
            owner_typ: 0,
        }
    }

    pub fn selector(owner_expr: &str, owner_typ: TypeId, field: &str) -> Self {
        Self {
            key: format!("{owner_expr}.{field}"),
            owner_typ: owner_typ.idx(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Scope {
    objects: FxHashMap<String, ScopeObject>,
    /// Stacks of refined types; the innermost refinement is last.
    smartcasts: FxHashMap<SmartcastKey, Vec<TypeId>>,
    pub start_pos: Pos,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, obj: ScopeObject) {
        self.objects.insert(obj.name().to_string(), obj);
    }

    pub fn get(&self, name: &str) -> Option<&ScopeObject> {
        self.objects.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ScopeObject> {
        self.objects.get_mut(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.objects.contains_key(name)
    }

    pub fn objects(&self) -> impl Iterator<Item = &ScopeObject> {
        self.objects.values()
    }

    pub fn push_smartcast(&mut self, key: SmartcastKey, typ: TypeId) {
        self.smartcasts.entry(key).or_default().push(typ);
    }

    pub fn pop_smartcast(&mut self, key: &SmartcastKey) {
        if let Some(stack) = self.smartcasts.get_mut(key) {
            stack.pop();
            if stack.is_empty() {
                self.smartcasts.remove(key);
            }
        }
    }

    pub fn smartcast(&self, key: &SmartcastKey) -> Option<TypeId> {
        self.smartcasts.get(key).and_then(|s| s.last()).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_and_lookup() {
        let mut scope = Scope::new();
        scope.define(ScopeObject::Var(Var {
            name: "x".into(),
            typ: TypeId::new(5),
            is_mut: true,
            ..Var::default()
        }));
        assert!(scope.has("x"));
        assert_eq!(scope.get("x").unwrap().typ(), TypeId::new(5));
        assert!(scope.get("y").is_none());
    }

    #[test]
    fn smartcast_stack_push_pop() {
        let mut scope = Scope::new();
        let key = SmartcastKey::var("shape");
        assert!(scope.smartcast(&key).is_none());
        scope.push_smartcast(key.clone(), TypeId::new(7));
        scope.push_smartcast(key.clone(), TypeId::new(9));
        assert_eq!(scope.smartcast(&key), Some(TypeId::new(9)));
        scope.pop_smartcast(&key);
        assert_eq!(scope.smartcast(&key), Some(TypeId::new(7)));
        scope.pop_smartcast(&key);
        assert!(scope.smartcast(&key).is_none());
    }

    #[test]
    fn selector_keys_distinguish_owner_type() {
        let a = SmartcastKey::selector("s", TypeId::new(1), "field");
        let b = SmartcastKey::selector("s", TypeId::new(2), "field");
        assert_ne!(a, b);
    }
}
