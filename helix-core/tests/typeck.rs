use std::collections::HashSet;

use helix_core::{
    CaptureKind, ErrorKind, NodeId, PlaceKind, Type, TypedBlock, TypedExpr, TypedExprKind,
    TypedStmtKind, check_program,
};
use helix_parse::parse_source;

fn check_err(src: &str) -> helix_core::CheckError {
    let program = parse_source(src).expect("parse");
    check_program(&program).expect_err("expected check error")
}

fn check_ok(src: &str) -> helix_core::CheckedProgram {
    let program = parse_source(src).expect("parse");
    check_program(&program).expect("check")
}

#[test]
fn mismatched_initializer_is_rejected() {
    let err = check_err("func main() as void { var x as int = true; }");
    assert_eq!(err.kind(), Some(ErrorKind::TypeMismatch));
    assert_eq!(err.message(), "expected type 'int', found 'bool'");
}

#[test]
fn arithmetic_on_booleans_is_invalid() {
    let err = check_err("func main() as int { return 1 + false; }");
    assert_eq!(err.kind(), Some(ErrorKind::InvalidOperands));
    assert!(err.message().contains("'+'"), "unexpected error message: {}", err.message());
}

#[test]
fn let_bindings_are_not_writable() {
    let err = check_err("func main() as void { let x = 1; x = 2; }");
    assert_eq!(err.kind(), Some(ErrorKind::NotWritable));
    assert!(err.message().contains("'x'"), "unexpected error message: {}", err.message());
}

#[test]
fn literals_cannot_be_assigned() {
    let err = check_err("func main() as void { 1 = 2; }");
    assert_eq!(err.kind(), Some(ErrorKind::NotAnLValue));
}

#[test]
fn address_of_requires_a_place() {
    let err = check_err("func main() as void { var p = &(1 + 2); }");
    assert_eq!(err.kind(), Some(ErrorKind::NotAnLValue));
}

#[test]
fn call_arity_is_checked() {
    let err = check_err("func f(a as int) as int { return a; }\nfunc main() as int { return f(1, 2); }");
    assert_eq!(err.kind(), Some(ErrorKind::InvalidArity));
}

#[test]
fn non_void_functions_must_return_on_every_path() {
    let err = check_err("func f(c as bool) as int { if c then { return 1; } }");
    assert_eq!(err.kind(), Some(ErrorKind::MissingReturn));

    check_ok("func f(c as bool) as int { if c then { return 1; } else { return 2; } }");
}

#[test]
fn writable_pointers_coerce_to_read_only() {
    check_ok(
        r#"
func read(p as &int) as int { return *p; }
func main() as int { var x = 1; return read(&x); }
"#,
    );

    let err = check_err(
        r#"
func write(p as *int) as void { *p = 1; }
func main() as void { let x = 1; write(&x); }
"#,
    );
    assert_eq!(err.kind(), Some(ErrorKind::TypeMismatch));
    assert_eq!(err.message(), "expected type '*int', found '&int'");
}

#[test]
fn read_only_pointers_cannot_be_written_through() {
    let err = check_err("func f(p as &int) as void { *p = 2; }");
    assert_eq!(err.kind(), Some(ErrorKind::NotWritable));
}

#[test]
fn member_access_dereferences_one_pointer_level() {
    let checked = check_ok(
        r#"
struct Point { var x as int; let y as int; };
func move_right(p as *Point) as void { p.x = p.x + 1; }
"#,
    );
    let TypedStmtKind::Assign { target, .. } = &checked.functions[0].body.stmts[0].kind else {
        panic!("expected assignment");
    };
    assert_eq!(target.place, PlaceKind::Writable);
    assert!(matches!(
        target.kind,
        TypedExprKind::Member {
            through_pointer: true,
            ..
        }
    ));

    let err = check_err(
        r#"
struct Point { var x as int; let y as int; };
func f(p as *Point) as void { p.y = 1; }
"#,
    );
    assert_eq!(err.kind(), Some(ErrorKind::NotWritable));
}

#[test]
fn unknown_members_are_reported() {
    let err = check_err(
        r#"
struct Point { var x as int; };
func f(p as Point) as int { return p.z; }
"#,
    );
    assert_eq!(err.kind(), Some(ErrorKind::InvalidMemberAccess));
    assert_eq!(err.message(), "the type 'Point' has no member named 'z'");
}

#[test]
fn struct_literals_must_set_pointer_members() {
    let err = check_err(
        r#"
struct Holder { var n as int; var p as *int; };
func main() as void { var h = new Holder { n = 1 }; }
"#,
    );
    assert_eq!(err.kind(), Some(ErrorKind::MissingMemberValue));
    assert!(err.message().contains("'p'"), "unexpected error message: {}", err.message());

    check_ok(
        r#"
struct Pair { var a as int; var b as bool; };
func main() as void { var pair = new Pair { b = true }; }
"#,
    );
}

#[test]
fn union_literals_set_exactly_one_member() {
    let err = check_err(
        r#"
union U { var i as int; var b as bool; };
func main() as void { var u = new U { i = 1, b = true }; }
"#,
    );
    assert_eq!(err.kind(), Some(ErrorKind::MissingMemberValue));
}

#[test]
fn is_requires_a_union() {
    let err = check_err(
        r#"
struct S { var i as int; };
func f(s as S) as bool { return s is i; }
"#,
    );
    assert_eq!(err.kind(), Some(ErrorKind::TypeMismatch));
}

#[test]
fn union_test_narrows_the_variable_in_the_then_block() {
    let src = r#"
union Value { var number as int; var flag as bool; };
func get(v as Value) as int {
    if v is number then {
        return *v + 1;
    }
    return 0;
}
"#;
    let checked = check_ok(src);
    let TypedStmtKind::If { then_block, .. } = &checked.functions[0].body.stmts[0].kind else {
        panic!("expected if");
    };
    let TypedStmtKind::UnionFlowVar { ty, member, writable, .. } = &then_block.stmts[0].kind else {
        panic!("expected union flow variable");
    };
    assert_eq!(*ty, Type::pointer(Type::Int, false));
    assert_eq!(member, "number");
    assert!(!writable);

    let err = check_err(
        r#"
union Value { var number as int; var flag as bool; };
func get(v as Value) as int { return v + 1; }
"#,
    );
    assert_eq!(err.kind(), Some(ErrorKind::InvalidOperands));
}

#[test]
fn narrowed_union_pointers_inherit_writability() {
    let src = r#"
union Value { var number as int; let flag as bool; };
func bump(p as *Value) as int {
    if p is number then {
        *p = *p + 1;
        return *p;
    }
    return 0;
}
"#;
    let checked = check_ok(src);
    let TypedStmtKind::If { then_block, .. } = &checked.functions[0].body.stmts[0].kind else {
        panic!("expected if");
    };
    let TypedStmtKind::UnionFlowVar { ty, writable, .. } = &then_block.stmts[0].kind else {
        panic!("expected union flow variable");
    };
    assert_eq!(*ty, Type::pointer(Type::Int, true));
    assert!(*writable);

    let err = check_err(
        r#"
union Value { var number as int; let flag as bool; };
func set(p as *Value) as void {
    if p is flag then { *p = true; }
}
"#,
    );
    assert_eq!(err.kind(), Some(ErrorKind::NotWritable));

    let err = check_err(
        r#"
union Value { var number as int; var flag as bool; };
func set(p as &Value) as void {
    if p is number then { *p = 1; }
}
"#,
    );
    assert_eq!(err.kind(), Some(ErrorKind::NotWritable));
}

#[test]
fn globals_need_constant_initializers() {
    let err = check_err("var g = 1 + 2;");
    assert_eq!(err.kind(), Some(ErrorKind::NonConstantGlobal));

    let checked = check_ok("var g = -4;\nlet flag = true;\nlet p = &g;");
    assert_eq!(checked.globals.len(), 3);
    assert_eq!(checked.globals[2].ty, Type::pointer(Type::Int, true));
}

#[test]
fn void_variables_are_rejected() {
    let err = check_err("func f() as void { }\nfunc main() as void { var x = f(); }");
    assert_eq!(err.kind(), Some(ErrorKind::TypeMismatch));
}

fn collect_ids(expr: &TypedExpr, ids: &mut Vec<NodeId>) {
    ids.push(expr.id);
    for child in expr.children() {
        collect_ids(child, ids);
    }
}

fn collect_block(block: &TypedBlock, ids: &mut Vec<NodeId>) {
    for stmt in &block.stmts {
        ids.push(stmt.id);
        match &stmt.kind {
            TypedStmtKind::VarDecl { value, .. } | TypedStmtKind::Expr(value) => collect_ids(value, ids),
            TypedStmtKind::Assign { target, value } => {
                collect_ids(target, ids);
                collect_ids(value, ids);
            }
            TypedStmtKind::Return(value) => {
                if let Some(value) = value {
                    collect_ids(value, ids);
                }
            }
            TypedStmtKind::If {
                cond,
                then_block,
                else_block,
            } => {
                collect_ids(cond, ids);
                collect_block(then_block, ids);
                if let Some(b) = else_block {
                    collect_block(b, ids);
                }
            }
            TypedStmtKind::While { cond, body } => {
                collect_ids(cond, ids);
                collect_block(body, ids);
            }
            TypedStmtKind::Block(b) => collect_block(b, ids),
            TypedStmtKind::UnionFlowVar { .. } => {}
        }
    }
}

#[test]
fn every_node_has_a_unique_id() {
    let checked = check_ok(
        r#"
var g = 3;
func main() as int {
    var total = 0;
    for i in 1 .. g do {
        total = total + i * 2;
    }
    if total > 10 then { return total; } else { return 0; }
}
"#,
    );
    let mut ids = Vec::new();
    for global in &checked.globals {
        collect_ids(&global.value, &mut ids);
    }
    for function in &checked.functions {
        collect_block(&function.body, &mut ids);
    }
    let unique: HashSet<NodeId> = ids.iter().copied().collect();
    assert_eq!(unique.len(), ids.len());
}

#[test]
fn taking_an_address_captures_the_location() {
    let checked = check_ok("func main() as void { var x = 1; var p = &x; var y = x; }");
    let stmts = &checked.functions[0].body.stmts;

    let TypedStmtKind::VarDecl { value, .. } = &stmts[1].kind else {
        panic!("expected declaration");
    };
    assert_eq!(value.captures.len(), 1);
    assert_eq!(value.captures[0].kind, CaptureKind::LocationCapture);
    assert_eq!(value.captures[0].path.to_string(), "main.x");

    let TypedStmtKind::VarDecl { value, .. } = &stmts[2].kind else {
        panic!("expected declaration");
    };
    assert_eq!(value.captures[0].kind, CaptureKind::ValueCapture);
}
