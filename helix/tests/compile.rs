use helix::{CompileError, CompileOptions, compile_source};
use helix_core::ErrorKind;
use proptest::prelude::*;

const LINKED_LIST: &str = r#"
struct Node { var value as int; var next as *Node; };

var empty = 0;

extern func sentinel() as *Node;

func sum(head as &Node, count as int) as int {
    var total = 0;
    var node = head;
    for i in 1 .. count do {
        total = total + node.value;
        node = node.next;
    }
    return total;
}

func main() as int {
    var last = new Node { value = 2, next = sentinel() };
    var first = new Node { value = 1, next = &last };
    return sum(&first, 2);
}
"#;

#[test]
fn compiles_a_complete_program() {
    let out = compile_source(LINKED_LIST, &CompileOptions::default()).expect("compile");
    assert!(out.contains("typedef struct Node Node;"));
    assert!(out.contains("struct Node {\n    int value;\n    Node* next;\n};"));
    assert!(out.contains("int empty = 0;"));
    assert!(out.contains("Node* sentinel(void);"));
    assert!(out.contains("int sum(Node* head, int count);"));
    assert!(out.contains("Node last = (Node){ .value = 2, .next = sentinel() };"));
    assert!(!out.contains("__t_"));
    assert!(out.contains("total = total + node->value;"));
    assert!(out.contains("Node first = (Node){ .value = 1, .next = &last };"));
    assert!(out.contains("return sum(&first, 2);"));
}

#[test]
fn lexical_errors_stop_compilation() {
    let err = compile_source("var __hidden = 1;", &CompileOptions::default())
        .expect_err("reserved identifier");
    assert!(matches!(err, CompileError::Lex(_)), "unexpected error: {err:?}");
}

#[test]
fn syntax_errors_stop_compilation() {
    let err = compile_source("func main( as int { }", &CompileOptions::default())
        .expect_err("syntax error");
    assert!(matches!(err, CompileError::Parse(_)), "unexpected error: {err:?}");
}

#[test]
fn escaping_references_are_reported_not_compiled() {
    let err = compile_source(
        "func leak() as *int { var x = 1; return &x; }",
        &CompileOptions::default(),
    )
    .expect_err("escape");
    let CompileError::Check(check) = &err else {
        panic!("unexpected error: {err:?}");
    };
    assert_eq!(check.kind(), Some(ErrorKind::LifetimeExceeded));
}

#[test]
fn line_comments_name_the_source_line() {
    let options = CompileOptions {
        line_comments: true,
        ..CompileOptions::default()
    };
    let out = compile_source("func main() as int {\n    return 7;\n}\n", &options).expect("compile");
    assert!(out.contains("    // Line 2: return 7;\n    return 7;\n"));
}

proptest! {
    #[test]
    fn loop_bounds_reach_the_generated_condition(start in -5i64..5, end in -5i64..8) {
        let src = format!(
            "func main() as int {{ var n = 0; for i in {start} .. {end} do {{ n = n + i; }} return n; }}"
        );
        let out = compile_source(&src, &CompileOptions::default()).expect("compile");
        let counter_init = format!("int __for_counter_0 = {start};");
        let condition = format!("while (__for_counter_0 <= {end}) {{");
        prop_assert!(out.contains(&counter_init), "missing counter in:\n{}", out);
        prop_assert!(out.contains(&condition), "missing condition in:\n{}", out);
    }
}
