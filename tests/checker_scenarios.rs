// tests/checker_scenarios.rs
//
// End-to-end checker scenarios over hand-built ASTs: each test constructs
// the AST a parser would produce, runs check_all, and asserts on the
// diagnostic summaries.

use veld::ast::{
    AssignOp, AssignStmt, CallArg, CallExpr, ConstDecl, ConstField, Expr, ExprStmt, File, FnDecl,
    Ident, InterfaceDecl, InterfaceMethodDecl, LockExpr, Receiver, Return, SelectorExpr, Stmt,
    StructDecl, StructInit, TypeDecl,
};
use veld::ast::stmt::AliasTypeDecl;
use veld::errors::DiagKind;
use veld::span::Pos;
use veld::table::{
    FnParam, Language, StructField, TypeFlags, TypeId, INT_TYPE, STRING_TYPE,
};
use veld::{Checker, CheckerOptions, Diag, Table};

fn pos(line: u32) -> Pos {
    Pos::at_line(line)
}

fn int_lit(val: &str, line: u32) -> Expr {
    Expr::IntegerLiteral {
        val: val.into(),
        pos: pos(line),
    }
}

fn str_lit(val: &str, line: u32) -> Expr {
    Expr::StringLiteral {
        val: val.into(),
        pos: pos(line),
    }
}

fn ident(name: &str, line: u32) -> Expr {
    Expr::Ident(Ident::new(name, pos(line)))
}

fn decl_assign(left: Vec<Expr>, right: Vec<Expr>, line: u32) -> Stmt {
    Stmt::Assign(AssignStmt {
        op: AssignOp::Decl,
        left,
        right,
        pos: pos(line),
        ..AssignStmt::default()
    })
}

fn expr_stmt(expr: Expr, line: u32) -> Stmt {
    Stmt::ExprStmt(ExprStmt {
        expr,
        pos: pos(line),
        typ: TypeId::ZERO,
    })
}

fn main_fn(stmts: Vec<Stmt>, line: u32) -> Stmt {
    Stmt::FnDecl(FnDecl {
        name: "main".into(),
        mod_name: "main".into(),
        stmts,
        pos: pos(line),
        ..FnDecl::default()
    })
}

fn call(name: &str, args: Vec<Expr>, line: u32) -> Expr {
    Expr::Call(CallExpr {
        name: name.into(),
        args: args.into_iter().map(CallArg::new).collect(),
        pos: pos(line),
        ..CallExpr::default()
    })
}

fn run(build: impl FnOnce(&mut Table) -> Vec<Stmt>) -> Vec<Diag> {
    let mut table = Table::new();
    let stmts = build(&mut table);
    let mut files = vec![File::new("main.vd", "main", stmts)];
    let opts = CheckerOptions {
        is_test_build: true,
        ..CheckerOptions::default()
    };
    let mut checker = Checker::new(&mut table, opts);
    checker.check_all(&mut files);
    std::mem::take(&mut checker.diags).into_diags()
}

fn errors(diags: &[Diag]) -> Vec<&Diag> {
    diags.iter().filter(|d| d.kind == DiagKind::Error).collect()
}

fn warnings(diags: &[Diag]) -> Vec<&Diag> {
    diags
        .iter()
        .filter(|d| d.kind == DiagKind::Warning)
        .collect()
}

// ----------------------------------------------------------------------
// Scenario 1: duplicate const
// ----------------------------------------------------------------------

#[test]
fn duplicate_const_reports_once_at_second_line() {
    let diags = run(|_| {
        vec![
            Stmt::ConstDecl(ConstDecl {
                fields: vec![ConstField {
                    name: "a".into(),
                    expr: int_lit("1", 1),
                    pos: pos(1),
                    typ: TypeId::ZERO,
                }],
                is_pub: false,
                pos: pos(1),
            }),
            Stmt::ConstDecl(ConstDecl {
                fields: vec![ConstField {
                    name: "a".into(),
                    expr: int_lit("2", 2),
                    pos: pos(2),
                    typ: TypeId::ZERO,
                }],
                is_pub: false,
                pos: pos(2),
            }),
            main_fn(vec![], 3),
        ]
    });
    let errs = errors(&diags);
    assert_eq!(errs.len(), 1, "{diags:?}");
    assert!(errs[0].message.contains("duplicate const"), "{}", errs[0].message);
    assert_eq!(errs[0].pos.line, 2);
}

// ----------------------------------------------------------------------
// Scenario 2: mut but never changed
// ----------------------------------------------------------------------

#[test]
fn mut_never_changed_warns() {
    let diags = run(|_| {
        let mut x = Ident::new("x", pos(1));
        x.is_mut = true;
        vec![main_fn(
            vec![
                decl_assign(vec![Expr::Ident(x)], vec![int_lit("1", 1)], 1),
                decl_assign(vec![ident("_", 2)], vec![ident("x", 2)], 2),
            ],
            1,
        )]
    });
    assert!(errors(&diags).is_empty(), "{diags:?}");
    let warns = warnings(&diags);
    assert_eq!(warns.len(), 1, "{diags:?}");
    assert!(
        warns[0].message.contains("declared as mutable"),
        "{}",
        warns[0].message
    );
}

#[test]
fn unused_variable_warns() {
    let diags = run(|_| {
        vec![main_fn(
            vec![decl_assign(vec![ident("y", 1)], vec![int_lit("1", 1)], 1)],
            1,
        )]
    });
    let warns = warnings(&diags);
    assert_eq!(warns.len(), 1, "{diags:?}");
    assert!(warns[0].message.contains("unused variable"));
}

// ----------------------------------------------------------------------
// Scenario 3: self-referential alias
// ----------------------------------------------------------------------

#[test]
fn alias_cannot_reference_itself() {
    let diags = run(|table| {
        let ph = table.add_placeholder_type("main.Alias", Language::Veld);
        vec![
            Stmt::TypeDecl(TypeDecl::Alias(AliasTypeDecl {
                name: "Alias".into(),
                is_pub: false,
                parent_type: ph,
                pos: pos(1),
            })),
            main_fn(vec![], 2),
        ]
    });
    let errs = errors(&diags);
    assert_eq!(errs.len(), 1, "{diags:?}");
    assert!(
        errs[0].message.contains("cannot reference itself"),
        "{}",
        errs[0].message
    );
}

// ----------------------------------------------------------------------
// Scenario 4: incorrect interface implementation
// ----------------------------------------------------------------------

#[test]
fn wrong_interface_method_return_type() {
    let diags = run(|table| {
        let iface_ph = table.add_placeholder_type("main.I", Language::Veld);
        let struct_ph = table.add_placeholder_type("main.S", Language::Veld);
        vec![
            Stmt::InterfaceDecl(InterfaceDecl {
                name: "I".into(),
                methods: vec![InterfaceMethodDecl {
                    name: "work".into(),
                    params: vec![],
                    return_type: INT_TYPE,
                    receiver_is_mut: false,
                    pos: pos(1),
                }],
                pos: pos(1),
                ..InterfaceDecl::default()
            }),
            Stmt::StructDecl(StructDecl {
                name: "S".into(),
                pos: pos(2),
                ..StructDecl::default()
            }),
            Stmt::FnDecl(FnDecl {
                name: "work".into(),
                mod_name: "main".into(),
                receiver: Some(Receiver {
                    name: "s".into(),
                    typ: struct_ph,
                    is_mut: false,
                    pos: pos(3),
                }),
                return_type: STRING_TYPE,
                stmts: vec![Stmt::Return(Return {
                    exprs: vec![str_lit("", 3)],
                    pos: pos(3),
                })],
                is_method: true,
                pos: pos(3),
                ..FnDecl::default()
            }),
            Stmt::FnDecl(FnDecl {
                name: "use".into(),
                mod_name: "main".into(),
                params: vec![FnParam::new("_", iface_ph)],
                pos: pos(4),
                ..FnDecl::default()
            }),
            main_fn(
                vec![expr_stmt(
                    call(
                        "use",
                        vec![Expr::StructInit(StructInit {
                            typ: struct_ph,
                            pos: pos(5),
                            ..StructInit::default()
                        })],
                        5,
                    ),
                    5,
                )],
                5,
            ),
        ]
    });
    let errs = errors(&diags);
    assert_eq!(errs.len(), 1, "{diags:?}");
    assert!(
        errs[0]
            .message
            .contains("incorrectly implements method `work`"),
        "{}",
        errs[0].message
    );
    assert!(
        errs[0].message.contains("expected return type int"),
        "{}",
        errs[0].message
    );
}

// ----------------------------------------------------------------------
// Scenario 5: ambiguous generic inference
// ----------------------------------------------------------------------

#[test]
fn ambiguous_generic_inference() {
    let diags = run(|table| {
        let t = table
            .add_placeholder_type("T", Language::Veld)
            .set_flag(TypeFlags::GENERIC);
        vec![
            Stmt::FnDecl(FnDecl {
                name: "f".into(),
                mod_name: "main".into(),
                params: vec![FnParam::new("x", t), FnParam::new("y", t)],
                return_type: t,
                generic_names: vec!["T".into()],
                stmts: vec![Stmt::Return(Return {
                    exprs: vec![ident("x", 1)],
                    pos: pos(1),
                })],
                pos: pos(1),
                ..FnDecl::default()
            }),
            main_fn(
                vec![decl_assign(
                    vec![ident("_", 2)],
                    vec![call("f", vec![int_lit("1", 2), str_lit("x", 2)], 2)],
                    2,
                )],
                2,
            ),
        ]
    });
    let errs = errors(&diags);
    assert_eq!(errs.len(), 1, "{diags:?}");
    assert!(
        errs[0]
            .message
            .contains("inferred generic type T is ambiguous"),
        "{}",
        errs[0].message
    );
}

#[test]
fn generic_inference_converges() {
    let mut table = Table::new();
    let t = table
        .add_placeholder_type("T", Language::Veld)
        .set_flag(TypeFlags::GENERIC);
    let stmts = vec![
        Stmt::FnDecl(FnDecl {
            name: "same".into(),
            mod_name: "main".into(),
            params: vec![FnParam::new("x", t)],
            return_type: t,
            generic_names: vec!["T".into()],
            stmts: vec![Stmt::Return(Return {
                exprs: vec![ident("x", 1)],
                pos: pos(1),
            })],
            pos: pos(1),
            ..FnDecl::default()
        }),
        main_fn(
            vec![
                decl_assign(
                    vec![ident("_", 2)],
                    vec![call("same", vec![int_lit("1", 2)], 2)],
                    2,
                ),
                decl_assign(
                    vec![ident("_", 3)],
                    vec![call("same", vec![str_lit("s", 3)], 3)],
                    3,
                ),
            ],
            2,
        ),
    ];
    let mut files = vec![File::new("main.vd", "main", stmts)];
    let opts = CheckerOptions {
        is_test_build: true,
        ..CheckerOptions::default()
    };
    let mut checker = Checker::new(&mut table, opts);
    checker.check_all(&mut files);
    let diags = std::mem::take(&mut checker.diags).into_diags();
    drop(checker);
    assert!(errors(&diags).is_empty(), "{diags:?}");
    // Both instantiations were observed exactly once each.
    let tuples = table.fn_generic_types_for("main.same");
    assert_eq!(tuples.len(), 2);
}

// ----------------------------------------------------------------------
// Scenario 6: shared mutation without a lock
// ----------------------------------------------------------------------

fn shared_foo_program(table: &mut Table, body_after_decl: Vec<Stmt>) -> Vec<Stmt> {
    let foo_ph = table.add_placeholder_type("main.Foo", Language::Veld);
    let mut field = StructField::new("field", INT_TYPE);
    field.is_mut = true;
    field.is_pub = true;
    let mut s = Ident::new("s", pos(1));
    s.is_shared = true;
    let mut stmts = vec![Stmt::StructDecl(StructDecl {
        name: "Foo".into(),
        fields: vec![field],
        pos: pos(1),
        ..StructDecl::default()
    })];
    let mut body = vec![decl_assign(
        vec![Expr::Ident(s)],
        vec![Expr::StructInit(StructInit {
            typ: foo_ph,
            pos: pos(1),
            ..StructInit::default()
        })],
        1,
    )];
    body.extend(body_after_decl);
    stmts.push(main_fn(body, 1));
    stmts
}

fn assign_s_field(line: u32) -> Stmt {
    Stmt::Assign(AssignStmt {
        op: AssignOp::Assign,
        left: vec![Expr::Selector(SelectorExpr {
            expr: Box::new(ident("s", line)),
            field_name: "field".into(),
            pos: pos(line),
            typ: TypeId::ZERO,
            expr_type: TypeId::ZERO,
            from_embed_type: TypeId::ZERO,
        })],
        right: vec![int_lit("1", line)],
        pos: pos(line),
        ..AssignStmt::default()
    })
}

#[test]
fn shared_mutation_requires_lock() {
    let diags = run(|table| shared_foo_program(table, vec![assign_s_field(2)]));
    let errs = errors(&diags);
    assert_eq!(errs.len(), 1, "{diags:?}");
    assert!(
        errs[0]
            .message
            .contains("is shared and must be lock-ed to be mutated"),
        "{}",
        errs[0].message
    );
}

#[test]
fn shared_mutation_inside_lock_is_fine() {
    let diags = run(|table| {
        let lock = expr_stmt(
            Expr::Lock(LockExpr {
                lockeds: vec![Ident::new("s", pos(2))],
                stmts: vec![assign_s_field(3)],
                pos: pos(2),
                ..LockExpr::default()
            }),
            2,
        );
        shared_foo_program(table, vec![lock])
    });
    assert!(errors(&diags).is_empty(), "{diags:?}");
}

#[test]
fn rlock_rejects_mutation() {
    let diags = run(|table| {
        let rlock = expr_stmt(
            Expr::Lock(LockExpr {
                rlockeds: vec![Ident::new("s", pos(2))],
                stmts: vec![assign_s_field(3)],
                pos: pos(2),
                ..LockExpr::default()
            }),
            2,
        );
        shared_foo_program(table, vec![rlock])
    });
    let errs = errors(&diags);
    assert_eq!(errs.len(), 1, "{diags:?}");
    assert!(
        errs[0].message.contains("rlock"),
        "{}",
        errs[0].message
    );
}

#[test]
fn nested_lock_is_rejected() {
    let diags = run(|table| {
        let inner = expr_stmt(
            Expr::Lock(LockExpr {
                lockeds: vec![Ident::new("s", pos(3))],
                stmts: vec![],
                pos: pos(3),
                ..LockExpr::default()
            }),
            3,
        );
        let outer = expr_stmt(
            Expr::Lock(LockExpr {
                lockeds: vec![Ident::new("s", pos(2))],
                stmts: vec![inner],
                pos: pos(2),
                ..LockExpr::default()
            }),
            2,
        );
        shared_foo_program(table, vec![outer])
    });
    let errs = errors(&diags);
    assert_eq!(errs.len(), 1, "{diags:?}");
    assert!(
        errs[0].message.contains("nested lock"),
        "{}",
        errs[0].message
    );
}

// ----------------------------------------------------------------------
// Entry-point validation
// ----------------------------------------------------------------------

#[test]
fn missing_main_is_reported_for_executables() {
    let mut table = Table::new();
    let mut files = vec![File::new("main.vd", "main", vec![])];
    let opts = CheckerOptions::default();
    let mut checker = Checker::new(&mut table, opts);
    checker.check_all(&mut files);
    let diags = std::mem::take(&mut checker.diags).into_diags();
    let errs = errors(&diags);
    assert_eq!(errs.len(), 1, "{diags:?}");
    assert!(errs[0].message.contains("main"), "{}", errs[0].message);
}
