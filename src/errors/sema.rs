// src/errors/sema.rs
//! Semantic errors (E2xxx), warnings (W2xxx) and notices (N2xxx).

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum SemanticError {
    #[error("unknown type `{name}`")]
    #[diagnostic(code(E2001))]
    UnknownType {
        name: String,
        #[label("not found")]
        span: SourceSpan,
    },

    #[error("undefined ident `{name}`")]
    #[diagnostic(code(E2002))]
    UndefinedIdent {
        name: String,
        #[label("not found in scope")]
        span: SourceSpan,
    },

    #[error("expected {expected}, found {found}")]
    #[diagnostic(code(E2003))]
    TypeMismatch {
        expected: String,
        found: String,
        #[label("type mismatch")]
        span: SourceSpan,
    },

    #[error("duplicate const `{name}`")]
    #[diagnostic(code(E2004))]
    DuplicateConst {
        name: String,
        #[label("already declared")]
        span: SourceSpan,
    },

    #[error("type `{name}` cannot reference itself")]
    #[diagnostic(code(E2005))]
    SelfReferentialType {
        name: String,
        #[label("recursive without indirection")]
        span: SourceSpan,
    },

    #[error("unknown function `{name}`")]
    #[diagnostic(code(E2006))]
    UnknownFunction {
        name: String,
        #[label("not declared")]
        span: SourceSpan,
    },

    #[error("cannot call non-function `{name}` of type {typ}")]
    #[diagnostic(code(E2007))]
    NotCallable {
        name: String,
        typ: String,
        #[label("not a function")]
        span: SourceSpan,
    },

    #[error("expected {expected} arguments, found {found} in call to `{name}`")]
    #[diagnostic(code(E2008))]
    WrongArgCount {
        name: String,
        expected: usize,
        found: usize,
        #[label("wrong number of arguments")]
        span: SourceSpan,
    },

    #[error("`{typ}` incorrectly implements method `{method}` of `{iface}`: expected return type {expected}")]
    #[diagnostic(code(E2009))]
    InterfaceMethodMismatch {
        typ: String,
        method: String,
        iface: String,
        expected: String,
        #[label("signature mismatch")]
        span: SourceSpan,
    },

    #[error("`{typ}` does not implement interface `{iface}` (missing {missing} `{member}`)")]
    #[diagnostic(code(E2010))]
    InterfaceNotImplemented {
        typ: String,
        iface: String,
        missing: &'static str,
        member: String,
        #[label("does not satisfy the interface")]
        span: SourceSpan,
    },

    #[error("inferred generic type {name} is ambiguous")]
    #[diagnostic(code(E2011), help("use explicit instantiation: `f<T>(...)`"))]
    GenericInferenceAmbiguous {
        name: String,
        #[label("conflicting bindings")]
        span: SourceSpan,
    },

    #[error("could not infer generic type {name}")]
    #[diagnostic(code(E2012), help("use explicit instantiation: `f<T>(...)`"))]
    GenericInferenceUnbound {
        name: String,
        #[label("no binding")]
        span: SourceSpan,
    },

    #[error("`{name}` is immutable, declare it with `mut` to make it mutable")]
    #[diagnostic(code(E2013))]
    ImmutableAssign {
        name: String,
        #[label("cannot mutate")]
        span: SourceSpan,
    },

    #[error("cannot modify constant `{name}`")]
    #[diagnostic(code(E2014))]
    ConstAssign {
        name: String,
        #[label("constants are immutable")]
        span: SourceSpan,
    },

    #[error("`{name}` is shared and must be lock-ed to be mutated")]
    #[diagnostic(code(E2015))]
    SharedNotLocked {
        name: String,
        #[label("missing enclosing lock")]
        span: SourceSpan,
    },

    #[error("`{name}` is rlock-ed and cannot be mutated; use lock instead")]
    #[diagnostic(code(E2016))]
    RlockMutation {
        name: String,
        #[label("read lock only")]
        span: SourceSpan,
    },

    #[error("nested lock/rlock blocks are not allowed")]
    #[diagnostic(code(E2017))]
    NestedLock {
        #[label("already inside a lock")]
        span: SourceSpan,
    },

    #[error("`{name}` is already locked in this block")]
    #[diagnostic(code(E2018))]
    DuplicateLock {
        name: String,
        #[label("duplicate")]
        span: SourceSpan,
    },

    #[error("`{name}` cannot be both lock-ed and rlock-ed")]
    #[diagnostic(code(E2019))]
    LockAndRlock {
        name: String,
        #[label("conflicting lock modes")]
        span: SourceSpan,
    },

    #[error("`{name}` is not `shared` and cannot be locked")]
    #[diagnostic(code(E2020))]
    LockNonShared {
        name: String,
        #[label("not a shared variable")]
        span: SourceSpan,
    },

    #[error("field `{field}` of `{typ}` is immutable, declare it under `mut:`")]
    #[diagnostic(code(E2021))]
    FieldNotMut {
        typ: String,
        field: String,
        #[label("cannot mutate field")]
        span: SourceSpan,
    },

    #[error("type `{typ}` has no field `{field}`")]
    #[diagnostic(code(E2022))]
    NoSuchField {
        typ: String,
        field: String,
        #[label("unknown field")]
        span: SourceSpan,
    },

    #[error("type `{typ}` has no method `{method}`")]
    #[diagnostic(code(E2023))]
    NoSuchMethod {
        typ: String,
        method: String,
        #[label("unknown method")]
        span: SourceSpan,
    },

    #[error("{message}")]
    #[diagnostic(code(E2024))]
    AmbiguousMember {
        message: String,
        #[label("ambiguous")]
        span: SourceSpan,
    },

    #[error("invalid operands to `{op}`: {left} and {right}")]
    #[diagnostic(code(E2025))]
    InvalidOperands {
        op: String,
        left: String,
        right: String,
        #[label("operands do not match")]
        span: SourceSpan,
    },

    #[error("mixing signed and unsigned integers: {left} and {right}")]
    #[diagnostic(code(E2026))]
    MixedSignedness {
        left: String,
        right: String,
        #[label("no implicit conversion")]
        span: SourceSpan,
    },

    #[error("shift operand must be an integer, found {found}")]
    #[diagnostic(code(E2027))]
    ShiftOnNonInteger {
        found: String,
        #[label("expected integer")]
        span: SourceSpan,
    },

    #[error("shift count {count} exceeds the {bits}-bit width of {typ}")]
    #[diagnostic(code(E2028))]
    ShiftCountOverflow {
        count: i64,
        bits: u32,
        typ: String,
        #[label("shift too large")]
        span: SourceSpan,
    },

    #[error("division by zero")]
    #[diagnostic(code(E2029))]
    DivisionByZero {
        #[label("right operand is zero")]
        span: SourceSpan,
    },

    #[error("`in` requires an array or map on the right side, found {found}")]
    #[diagnostic(code(E2030))]
    InNeedsContainer {
        found: String,
        #[label("not a container")]
        span: SourceSpan,
    },

    #[error("`is` can only be used with interfaces and sum types, found {found}")]
    #[diagnostic(code(E2031))]
    IsOnInvalidType {
        found: String,
        #[label("not an interface or sum type")]
        span: SourceSpan,
    },

    #[error("`{variant}` is not a variant of `{sum}`")]
    #[diagnostic(code(E2032))]
    NotAVariant {
        variant: String,
        sum: String,
        #[label("unknown variant")]
        span: SourceSpan,
    },

    #[error("ambiguous boolean expression, use parentheses to clarify intent")]
    #[diagnostic(code(E2033))]
    AmbiguousBoolExpr {
        #[label("mixes && and ||")]
        span: SourceSpan,
    },

    #[error("cannot compare `{typ}` values: no `<` method defined")]
    #[diagnostic(code(E2034))]
    StructComparisonUndefined {
        typ: String,
        #[label("missing < method")]
        span: SourceSpan,
    },

    #[error("cannot cast {from} to {to}{suggestion}")]
    #[diagnostic(code(E2035))]
    CannotCast {
        from: String,
        to: String,
        /// Pre-formatted ` (hint)` suffix, empty when absent.
        suggestion: String,
        #[label("invalid cast")]
        span: SourceSpan,
    },

    #[error("cannot cast `{from}` to sum type `{sum}`: not a listed variant")]
    #[diagnostic(code(E2036))]
    CastToSumTypeInvalid {
        from: String,
        sum: String,
        #[label("not a variant")]
        span: SourceSpan,
    },

    #[error("`{name}` returns an optional, so it should have either an `or {{}}` block, or `?` at the end")]
    #[diagnostic(code(E2037))]
    OptionalNotHandled {
        name: String,
        #[label("unhandled optional")]
        span: SourceSpan,
    },

    #[error("last statement in the `or {{}}` block should be an expression of type {expected} or an exit statement, found {found}")]
    #[diagnostic(code(E2038))]
    OrBlockTypeMismatch {
        expected: String,
        found: String,
        #[label("wrong or-block result")]
        span: SourceSpan,
    },

    #[error("{what} must be used inside an `unsafe` block")]
    #[diagnostic(code(E2039))]
    RequiresUnsafe {
        what: String,
        #[label("unsafe context required")]
        span: SourceSpan,
    },

    #[error("condition must be a boolean, found {found}")]
    #[diagnostic(code(E2040))]
    NonBoolCondition {
        found: String,
        #[label("expected bool")]
        span: SourceSpan,
    },

    #[error("match must be exhaustive{missing}")]
    #[diagnostic(code(E2041))]
    MatchNonExhaustive {
        /// Pre-formatted ` (add match branches for: ...)` suffix.
        missing: String,
        #[label("uncovered cases")]
        span: SourceSpan,
    },

    #[error("assignment mismatch: {left} variable(s) but {right} value(s)")]
    #[diagnostic(code(E2042))]
    AssignCountMismatch {
        left: usize,
        right: usize,
        #[label("count mismatch")]
        span: SourceSpan,
    },

    #[error("cannot assign to this expression")]
    #[diagnostic(code(E2043))]
    NotAnLvalue {
        #[label("not addressable")]
        span: SourceSpan,
    },

    #[error("cannot take the address of {what}")]
    #[diagnostic(code(E2044))]
    CannotAddress {
        what: String,
        #[label("not addressable")]
        span: SourceSpan,
    },

    #[error("expected {expected} return value(s), found {found}")]
    #[diagnostic(code(E2045))]
    ReturnCountMismatch {
        expected: usize,
        found: usize,
        #[label("wrong number of return values")]
        span: SourceSpan,
    },

    #[error("unknown format specifier `{spec}` for type {typ}")]
    #[diagnostic(code(E2046))]
    BadFormatSpecifier {
        spec: char,
        typ: String,
        #[label("invalid specifier")]
        span: SourceSpan,
    },

    #[error("width and precision are only allowed for numeric values")]
    #[diagnostic(code(E2047))]
    FormatWidthNonNumeric {
        #[label("non-numeric operand")]
        span: SourceSpan,
    },

    #[error("enum `{enum_name}` has no variant `{variant}`")]
    #[diagnostic(code(E2048))]
    UnknownEnumVariant {
        enum_name: String,
        variant: String,
        #[label("unknown variant")]
        span: SourceSpan,
    },

    #[error("flag enum `{enum_name}` has duplicate value {value}")]
    #[diagnostic(code(E2049))]
    DuplicateFlagEnumValue {
        enum_name: String,
        value: i64,
        #[label("value reused")]
        span: SourceSpan,
    },

    #[error("flag enum `{enum_name}` cannot have more than 64 variants")]
    #[diagnostic(code(E2050))]
    FlagEnumTooLarge {
        enum_name: String,
        #[label("too many variants")]
        span: SourceSpan,
    },

    #[error("operator `{op}` is not defined on flag enums")]
    #[diagnostic(code(E2051))]
    FlagEnumBadOperator {
        op: String,
        #[label("invalid flag-enum operator")]
        span: SourceSpan,
    },

    #[error("enum variant value must be an integer constant")]
    #[diagnostic(code(E2052))]
    EnumValueNotInt {
        #[label("not an integer constant")]
        span: SourceSpan,
    },

    #[error("module `{module}` has no symbol `{sym}`")]
    #[diagnostic(code(E2053))]
    ImportSymbolMissing {
        module: String,
        sym: String,
        #[label("not exported")]
        span: SourceSpan,
    },

    #[error("import alias `{alias}` shadows a constant of the same name")]
    #[diagnostic(code(E2054))]
    ImportShadowsConst {
        alias: String,
        #[label("conflicting name")]
        span: SourceSpan,
    },

    #[error("{what} nesting is too deep")]
    #[diagnostic(code(E2055))]
    NestingTooDeep {
        what: &'static str,
        #[label("cutoff exceeded")]
        span: SourceSpan,
    },

    #[error("generic function instantiation did not converge")]
    #[diagnostic(code(E2056))]
    GenericRecheckDiverged {
        #[label("instantiations keep growing")]
        span: SourceSpan,
    },

    #[error("cannot assign to `{target}` since strings are immutable")]
    #[diagnostic(code(E2057))]
    StringIndexAssign {
        target: String,
        #[label("string contents are read-only")]
        span: SourceSpan,
    },

    #[error("`break` outside of a loop")]
    #[diagnostic(code(E2058))]
    BreakOutsideLoop {
        #[label("not inside a loop")]
        span: SourceSpan,
    },

    #[error("`continue` outside of a loop")]
    #[diagnostic(code(E2059))]
    ContinueOutsideLoop {
        #[label("not inside a loop")]
        span: SourceSpan,
    },

    #[error("function `main` must be declared in module main, take no arguments and return nothing")]
    #[diagnostic(code(E2060))]
    MalformedMain {
        #[label("invalid main signature")]
        span: SourceSpan,
    },

    #[error("program entry point `main` is missing")]
    #[diagnostic(code(E2061))]
    MissingMain {
        #[label("no main function")]
        span: SourceSpan,
    },

    #[error("index must be an integer or enum, found {found}")]
    #[diagnostic(code(E2062))]
    NonIntegerIndex {
        found: String,
        #[label("invalid index type")]
        span: SourceSpan,
    },

    #[error("map index must match key type {expected}, found {found}")]
    #[diagnostic(code(E2063))]
    MapKeyMismatch {
        expected: String,
        found: String,
        #[label("wrong key type")]
        span: SourceSpan,
    },

    #[error("type {typ} does not support indexing")]
    #[diagnostic(code(E2064))]
    NotIndexable {
        typ: String,
        #[label("cannot index")]
        span: SourceSpan,
    },

    #[error("`{name}` is generic but was instantiated without type arguments")]
    #[diagnostic(code(E2065))]
    GenericWithoutArgs {
        name: String,
        #[label("missing type arguments")]
        span: SourceSpan,
    },

    #[error("struct `{name}` has no field `{field}` in its initializer")]
    #[diagnostic(code(E2066))]
    StructInitUnknownField {
        name: String,
        field: String,
        #[label("unknown field")]
        span: SourceSpan,
    },

    #[error("test functions are only allowed inside test files")]
    #[diagnostic(code(E2067))]
    TestFnOutsideTestFile {
        #[label("misplaced test function")]
        span: SourceSpan,
    },

    #[error("redefinition of `{name}`")]
    #[diagnostic(code(E2068))]
    Redefinition {
        name: String,
        #[label("already defined in this scope")]
        span: SourceSpan,
    },

    #[error("to propagate the optional call, `{fn_name}` must return an optional")]
    #[diagnostic(code(E2069))]
    PropagationRequiresOptional {
        fn_name: String,
        #[label("? used in a non-optional function")]
        span: SourceSpan,
    },

    #[error("field `{field}` of `{typ}` is private")]
    #[diagnostic(code(E2070))]
    PrivateField {
        typ: String,
        field: String,
        #[label("not public")]
        span: SourceSpan,
    },

    #[error("field `{field}` of `{typ}` must be initialized")]
    #[diagnostic(code(E2071))]
    StructFieldRequired {
        typ: String,
        field: String,
        #[label("missing required field")]
        span: SourceSpan,
    },

    #[error("string interpolation inside `str` cannot call `str` recursively")]
    #[diagnostic(code(E2072))]
    RecursiveStrCall {
        #[label("recursive str call")]
        span: SourceSpan,
    },
}

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum SemanticWarning {
    #[error("unused variable: `{name}`")]
    #[diagnostic(code(W2001))]
    UnusedVariable {
        name: String,
        #[label("never read")]
        span: SourceSpan,
    },

    #[error("`{name}` is declared as mutable, but it was never changed")]
    #[diagnostic(code(W2002))]
    MutNeverChanged {
        name: String,
        #[label("declare without mut")]
        span: SourceSpan,
    },

    #[error("module `{module}` is already imported")]
    #[diagnostic(code(W2003))]
    DuplicateImport {
        module: String,
        #[label("duplicate import")]
        span: SourceSpan,
    },

    #[error("shifting a signed value")]
    #[diagnostic(code(W2004))]
    LeftShiftOfSigned {
        #[label("sign bit may be lost")]
        span: SourceSpan,
    },

    #[error("pointer indexing should only be done inside `unsafe` blocks")]
    #[diagnostic(code(W2005))]
    PointerIndexOutsideUnsafe {
        #[label("unsafe operation")]
        span: SourceSpan,
    },

    #[error("unknown attribute `{name}`")]
    #[diagnostic(code(W2006))]
    UnknownAttr {
        name: String,
        #[label("not recognized")]
        span: SourceSpan,
    },

    #[error("unreachable code")]
    #[diagnostic(code(W2007))]
    UnreachableCode {
        #[label("after a noreturn call")]
        span: SourceSpan,
    },
}

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum SemanticNotice {
    #[error("{what} `{name}` is deprecated{msg}")]
    #[diagnostic(code(N2001))]
    Deprecated {
        what: &'static str,
        name: String,
        /// Pre-formatted `; reason` suffix, empty when absent.
        msg: String,
        #[label("deprecated")]
        span: SourceSpan,
    },
}
