use helix_ast::{AggregateKind, BinOp, Decl, ExprKind, Stmt, TypeExprKind, UnaryOp};
use helix_lex::Lexer;
use helix_parse::{Parser, parse_expr, parse_source};

#[test]
fn parses_function_with_params_and_pointer_types() {
    let src = "func swap(a as *int, b as &int) as void { *a = *b; }";
    let program = parse_source(src).expect("parse");
    let Decl::Function(f) = &program.decls[0] else {
        panic!("expected function");
    };
    assert_eq!(f.name.node, "swap");
    assert_eq!(f.params.len(), 2);
    assert!(matches!(
        f.params[0].ty.kind,
        TypeExprKind::Pointer { writable: true, .. }
    ));
    assert!(matches!(
        f.params[1].ty.kind,
        TypeExprKind::Pointer { writable: false, .. }
    ));
    assert!(matches!(f.body.stmts[0], Stmt::Assign(_)));
}

#[test]
fn parses_struct_and_union_members() {
    let src = "struct Node { var value as int; let next as *Node; };\nunion Shape { var circle as int; var square as bool; };";
    let program = parse_source(src).expect("parse");
    let Decl::Aggregate(node) = &program.decls[0] else {
        panic!("expected aggregate");
    };
    assert_eq!(node.kind, AggregateKind::Struct);
    assert!(node.members[0].writable);
    assert!(!node.members[1].writable);

    let Decl::Aggregate(shape) = &program.decls[1] else {
        panic!("expected aggregate");
    };
    assert_eq!(shape.kind, AggregateKind::Union);
    assert_eq!(shape.members.len(), 2);
}

#[test]
fn parses_extern_and_globals() {
    let src = "extern func putchar(c as int) as int;\nvar counter = 0;\nlet limit as int = -5;";
    let program = parse_source(src).expect("parse");
    assert!(matches!(program.decls[0], Decl::Extern(_)));
    let Decl::Global(g) = &program.decls[2] else {
        panic!("expected global");
    };
    assert!(!g.writable);
    assert!(matches!(
        g.value.kind,
        ExprKind::Unary {
            op: UnaryOp::Neg,
            ..
        }
    ));
}

#[test]
fn operator_precedence_follows_grammar() {
    let expr = parse_expr("1 + 2 * 3 == 7 and true or false").expect("parse");
    let ExprKind::Binary { op: BinOp::Or, left, .. } = expr.kind else {
        panic!("expected `or` at the top");
    };
    let ExprKind::Binary { op: BinOp::And, left, .. } = left.kind else {
        panic!("expected `and` below `or`");
    };
    let ExprKind::Binary { op: BinOp::Eq, left, .. } = left.kind else {
        panic!("expected comparison below `and`");
    };
    assert!(matches!(left.kind, ExprKind::Binary { op: BinOp::Add, .. }));
}

#[test]
fn parses_member_chains_and_address_of() {
    let expr = parse_expr("&p.next.value").expect("parse");
    let ExprKind::AddressOf(inner) = expr.kind else {
        panic!("expected address-of");
    };
    let ExprKind::Member { base, member } = inner.kind else {
        panic!("expected member access");
    };
    assert_eq!(member.node, "value");
    assert!(matches!(base.kind, ExprKind::Member { .. }));
}

#[test]
fn parses_new_and_is() {
    let expr = parse_expr("new Point { x = 1, y = 2 }").expect("parse");
    let ExprKind::New { name, fields } = expr.kind else {
        panic!("expected new");
    };
    assert_eq!(name.node, "Point");
    assert_eq!(fields.len(), 2);

    let expr = parse_expr("s is circle").expect("parse");
    assert!(matches!(expr.kind, ExprKind::Is { .. }));
}

#[test]
fn parses_control_flow() {
    let src = r#"
func main() as int {
    var total = 0;
    for i in 0 .. 3 do {
        total = total + i;
    }
    while total > 0 do {
        total = total - 1;
    }
    if total == 0 then {
        return 1;
    } else if total == 1 then {
        return 2;
    } else {
        return 3;
    }
}
"#;
    let program = parse_source(src).expect("parse");
    let Decl::Function(f) = &program.decls[0] else {
        panic!("expected function");
    };
    assert!(matches!(f.body.stmts[1], Stmt::For(_)));
    assert!(matches!(f.body.stmts[2], Stmt::While(_)));
    let Stmt::If(i) = &f.body.stmts[3] else {
        panic!("expected if");
    };
    let else_block = i.else_block.as_ref().expect("else");
    assert!(matches!(else_block.stmts[0], Stmt::If(_)));
}

#[test]
fn rejects_chained_comparisons() {
    let tokens = Lexer::new("a < b < c").lex().expect("lex");
    let err = Parser::new(&tokens).parse_expr_eof().expect_err("expected parse error");
    assert!(err.message.contains("chained comparisons"), "unexpected error message: {}", err.message);
    assert_eq!(err.help.as_deref(), Some("use parentheses or boolean operators"));
}

#[test]
fn rejects_calls_on_non_names() {
    let err = parse_expr("p.f(1)").expect_err("expected parse error");
    assert!(err.to_string().contains("only named functions"));
}

#[test]
fn reports_missing_semicolon() {
    let err = parse_source("func f() as void { return }").expect_err("expected parse error");
    let msg = err.to_string();
    assert!(msg.contains("expected an expression"), "unexpected error message: {msg}");
}
