// src/table/type_id.rs
//
// Packed type handles.
//
// A TypeId is a u32 handle into the Table: the low 16 bits are the symbol
// index, the next 4 bits count pointer indirections (nr_muls), and the high
// bits carry type flags. Handle arithmetic (deref/ref/flag ops) never touches
// the index, so derived handles keep pointing at the same TypeSymbol.

use bitflags::bitflags;
use smallvec::SmallVec;

/// Inline storage for small type tuples (generic argument lists, method
/// signatures in flight).
pub type TypeIdVec = SmallVec<[TypeId; 4]>;

bitflags! {
    /// Per-handle type qualifiers, packed above index and pointer depth.
    #[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
    pub struct TypeFlags: u32 {
        /// `?T` — value may be absent or carry an error.
        const OPTIONAL = 1 << 20;
        /// `...T` — variadic tail parameter.
        const VARIADIC = 1 << 21;
        /// Contains an unsubstituted generic parameter.
        const GENERIC = 1 << 22;
        /// `shared T` — requires lock/rlock to access.
        const SHARED = 1 << 23;
        /// `atomic T` — lock-free share mode.
        const ATOMIC = 1 << 24;
    }
}

const IDX_MASK: u32 = 0xffff;
const MULS_SHIFT: u32 = 16;
const MULS_MASK: u32 = 0xf << MULS_SHIFT;
pub const MAX_NR_MULS: u32 = 15;

/// Compact handle to a TypeSymbol plus pointer depth and flags.
///
/// `TypeId::ZERO` (index 0, no flags) is the "unresolved" sentinel; the
/// Table keeps a reserved placeholder symbol at index 0 so resolving it is
/// always an internal error.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct TypeId(u32);

impl TypeId {
    pub const ZERO: TypeId = TypeId(0);

    pub fn new(idx: u32) -> Self {
        debug_assert!(idx <= IDX_MASK, "type index out of range: {idx}");
        Self(idx & IDX_MASK)
    }

    pub const fn from_idx(idx: u32) -> Self {
        Self(idx & IDX_MASK)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    /// Table index of the underlying symbol.
    pub fn idx(self) -> u32 {
        self.0 & IDX_MASK
    }

    pub fn is_unresolved(self) -> bool {
        self.idx() == 0
    }

    /// Same index as `self`, no flags, no pointer depth.
    pub fn plain(self) -> TypeId {
        TypeId(self.idx())
    }

    // ------------------------------------------------------------------
    // Pointer depth
    // ------------------------------------------------------------------

    pub fn nr_muls(self) -> u32 {
        (self.0 & MULS_MASK) >> MULS_SHIFT
    }

    pub fn is_ptr(self) -> bool {
        self.nr_muls() > 0
    }

    pub fn set_nr_muls(self, muls: u32) -> TypeId {
        debug_assert!(muls <= MAX_NR_MULS, "pointer depth out of range: {muls}");
        TypeId((self.0 & !MULS_MASK) | (muls << MULS_SHIFT))
    }

    /// `&T` — one more level of indirection.
    pub fn ref_(self) -> TypeId {
        let muls = self.nr_muls();
        debug_assert!(muls < MAX_NR_MULS, "cannot take reference: depth limit");
        self.set_nr_muls(muls + 1)
    }

    /// `*p` — one less level of indirection. Saturates at zero so a
    /// malformed input degrades to the value type instead of wrapping.
    pub fn deref(self) -> TypeId {
        let muls = self.nr_muls();
        self.set_nr_muls(muls.saturating_sub(1))
    }

    // ------------------------------------------------------------------
    // Flags
    // ------------------------------------------------------------------

    pub fn flags(self) -> TypeFlags {
        TypeFlags::from_bits_truncate(self.0)
    }

    pub fn has_flag(self, flag: TypeFlags) -> bool {
        self.flags().contains(flag)
    }

    pub fn set_flag(self, flag: TypeFlags) -> TypeId {
        TypeId(self.0 | flag.bits())
    }

    pub fn clear_flag(self, flag: TypeFlags) -> TypeId {
        TypeId(self.0 & !flag.bits())
    }

    pub fn clear_flags(self) -> TypeId {
        TypeId(self.0 & (IDX_MASK | MULS_MASK))
    }

    pub fn is_optional(self) -> bool {
        self.has_flag(TypeFlags::OPTIONAL)
    }

    pub fn is_variadic(self) -> bool {
        self.has_flag(TypeFlags::VARIADIC)
    }

    pub fn has_generic(self) -> bool {
        self.has_flag(TypeFlags::GENERIC)
    }

    pub fn is_shared(self) -> bool {
        self.has_flag(TypeFlags::SHARED)
    }

    // ------------------------------------------------------------------
    // Derivation
    // ------------------------------------------------------------------

    /// Keep this handle's flags and pointer depth, but point at `idx`.
    pub fn derive(self, idx: u32) -> TypeId {
        debug_assert!(idx <= IDX_MASK, "type index out of range: {idx}");
        TypeId((self.0 & !IDX_MASK) | idx)
    }

    /// Derive from `other`: other's index, this handle's flags and muls.
    pub fn derive_from(self, other: TypeId) -> TypeId {
        self.derive(other.idx())
    }
}

impl std::fmt::Debug for TypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TypeId(#{}", self.idx())?;
        if self.nr_muls() > 0 {
            write!(f, " muls={}", self.nr_muls())?;
        }
        let flags = self.flags();
        if !flags.is_empty() {
            write!(f, " {flags:?}")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_id_is_small() {
        assert_eq!(size_of::<TypeId>(), 4);
    }

    #[test]
    fn index_roundtrip() {
        let id = TypeId::new(1234);
        assert_eq!(id.idx(), 1234);
        assert_eq!(id.nr_muls(), 0);
        assert!(id.flags().is_empty());
    }

    #[test]
    fn flags_survive_deref_and_ref() {
        let id = TypeId::new(7).set_flag(TypeFlags::OPTIONAL).ref_();
        assert!(id.is_ptr());
        assert!(id.is_optional());
        let back = id.deref();
        assert!(!back.is_ptr());
        assert!(back.is_optional());
        assert_eq!(back.idx(), 7);
    }

    #[test]
    fn deref_saturates_at_zero() {
        let id = TypeId::new(3);
        assert_eq!(id.deref().nr_muls(), 0);
    }

    #[test]
    fn set_and_clear_flag() {
        let id = TypeId::new(9).set_flag(TypeFlags::GENERIC);
        assert!(id.has_generic());
        let cleared = id.clear_flag(TypeFlags::GENERIC);
        assert!(!cleared.has_generic());
        assert_eq!(cleared.idx(), 9);
    }

    #[test]
    fn derive_keeps_flags_and_muls() {
        let src = TypeId::new(5)
            .set_flag(TypeFlags::SHARED)
            .set_nr_muls(2);
        let derived = src.derive(42);
        assert_eq!(derived.idx(), 42);
        assert_eq!(derived.nr_muls(), 2);
        assert!(derived.is_shared());
    }

    #[test]
    fn zero_is_unresolved() {
        assert!(TypeId::ZERO.is_unresolved());
        assert!(!TypeId::new(1).is_unresolved());
        // Flags on the zero index still count as unresolved.
        assert!(TypeId::ZERO.set_flag(TypeFlags::OPTIONAL).is_unresolved());
    }
}
