use helix_core::{ErrorKind, Type, check_program};
use helix_parse::parse_source;

fn check_err(src: &str) -> helix_core::CheckError {
    let program = parse_source(src).expect("parse");
    check_program(&program).expect_err("expected check error")
}

#[test]
fn struct_containing_itself_by_value_is_circular() {
    let err = check_err("struct Node { var value as int; var next as Node; };");
    assert_eq!(err.kind(), Some(ErrorKind::CircularValueObject));
    assert!(err.message().contains("'Node'"), "unexpected error message: {}", err.message());
}

#[test]
fn mutual_containment_is_circular() {
    let err = check_err("struct A { var b as B; };\nstruct B { var a as A; };");
    assert_eq!(err.kind(), Some(ErrorKind::CircularValueObject));
    assert!(err.message().contains("'A'"), "unexpected error message: {}", err.message());
}

#[test]
fn recursion_through_pointers_is_allowed() {
    let src = "struct Node { var value as int; var next as *Node; };";
    let program = parse_source(src).expect("parse");
    check_program(&program).expect("check");
}

#[test]
fn union_members_cannot_be_pointers() {
    let err = check_err("union U { var i as int; var p as *int; };");
    assert_eq!(err.kind(), Some(ErrorKind::InvalidUnionMember));
    assert_eq!(err.message(), "The pointer type '*int' cannot be a union member.");
}

#[test]
fn union_members_cannot_contain_pointers_indirectly() {
    let src = r#"
struct Ref { var target as &bool; };
union U { var r as Ref; };
"#;
    let err = check_err(src);
    assert_eq!(err.kind(), Some(ErrorKind::InvalidUnionMember));
    assert!(err.message().contains("'&bool'"), "unexpected error message: {}", err.message());
}

#[test]
fn duplicate_members_are_rejected() {
    let err = check_err("struct P { var x as int; var x as bool; };");
    assert_eq!(err.kind(), Some(ErrorKind::IdentifierAlreadyDefined));
}

#[test]
fn void_members_are_rejected() {
    let err = check_err("struct P { var x as void; };");
    assert_eq!(err.kind(), Some(ErrorKind::TypeMismatch));
}

#[test]
fn members_may_reference_later_aggregates() {
    let src = r#"
struct Outer { var inner as Inner; };
struct Inner { var x as int; };
union Shape { var outer as Outer; var flag as bool; };
"#;
    let program = parse_source(src).expect("parse");
    let checked = check_program(&program).expect("check");
    assert_eq!(checked.context.aggregates.len(), 3);

    let thunks: Vec<String> = checked
        .context
        .type_declarations
        .keys()
        .map(Type::to_string)
        .collect();
    assert_eq!(thunks.len(), 3);
    assert!(thunks.contains(&"Inner".to_string()));
    assert!(thunks.contains(&"Shape".to_string()));
}
