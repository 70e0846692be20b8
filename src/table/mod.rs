// src/table/mod.rs
pub mod fns;
pub mod generics;
pub mod iface;
pub mod lookup;
pub mod symbols;
#[allow(clippy::module_inception)]
pub mod table;
pub mod type_id;

pub use generics::GenericInferError;
pub use lookup::LookupError;
pub use symbols::{
    AggregateInfo, EnumInfo, EnumVariant, FnAttrs, FnParam, FnSig, InterfaceInfo, Language,
    StructField, StructInfo, SumTypeInfo, TypeInfo, TypeKind, TypeSymbol,
};
pub use table::{
    Table, ARRAY_TYPE, BOOL_TYPE, CHAR_TYPE, ERROR_TYPE, F32_TYPE, F64_TYPE,
    FLOAT_LITERAL_TYPE, I16_TYPE, I32_TYPE, I64_TYPE, I8_TYPE, INT_LITERAL_TYPE, INT_TYPE,
    MAP_TYPE, NONE_TYPE, RUNE_TYPE, STRING_TYPE, U16_TYPE, U32_TYPE, U64_TYPE, U8_TYPE,
    VOIDPTR_TYPE, VOID_TYPE,
};
pub use type_id::{TypeFlags, TypeId};
