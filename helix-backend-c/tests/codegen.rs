use helix_backend_c::{CodegenOptions, emit_module, generate};
use helix_core::check_program;
use helix_ir::DebugSource;
use helix_parse::parse_source;

fn compile_with(src: &str, options: &CodegenOptions) -> String {
    let program = parse_source(src).expect("parse");
    let checked = check_program(&program).expect("check");
    let module = generate(&checked, options).expect("codegen");
    emit_module(&module)
}

fn compile(src: &str) -> String {
    compile_with(src, &CodegenOptions::default())
}

fn position(out: &str, needle: &str) -> usize {
    out.find(needle)
        .unwrap_or_else(|| panic!("missing `{needle}` in:\n{out}"))
}

#[test]
fn mutually_referencing_aggregates_are_forward_declared_first() {
    let a = "struct A { var b as *B; var n as int; };\n";
    let b = "struct B { var a as *A; };\n";
    for src in [format!("{b}{a}"), format!("{a}{b}")] {
        let out = compile(&src);
        assert!(out.starts_with("#include <stdbool.h>\n\n"));
        let forwards = position(&out, "typedef struct A A;\ntypedef struct B B;\n");
        assert!(forwards < position(&out, "struct A {\n"), "layout before forwards in:\n{out}");
        assert!(forwards < position(&out, "struct B {\n"), "layout before forwards in:\n{out}");
        assert!(out.contains("struct A {\n    B* b;\n    int n;\n};\n"));
        assert!(out.contains("struct B {\n    A* a;\n};\n"));
    }
}

#[test]
fn forward_declarations_cover_every_aggregate() {
    let program = parse_source(
        r#"
union Shape { var radius as int; var side as int; };
struct List { var shape as Shape; var next as *List; };
func main() as int { return 0; }
"#,
    )
    .expect("parse");
    let checked = check_program(&program).expect("check");
    let module = generate(&checked, &CodegenOptions::default()).expect("codegen");
    let mut forwards: Vec<&str> = module.forward_declarations().collect();
    forwards.sort_unstable();
    assert_eq!(forwards, vec!["List", "Shape"]);
}

#[test]
fn by_value_members_are_laid_out_before_their_container() {
    let out = compile(
        r#"
struct A { var z as Z; };
struct Z { var n as int; };
"#,
    );
    assert!(position(&out, "struct Z {") < position(&out, "struct A {"));
}

#[test]
fn for_loops_become_counter_and_while() {
    let out = compile(
        r#"
func main() as int {
    var total = 0;
    for i in 0 .. 3 do {
        total = total + i;
    }
    return total;
}
"#,
    );
    assert!(out.contains("int main(void);\n"));
    assert!(out.contains("int __for_counter_0 = 0;"));
    assert!(out.contains("while (__for_counter_0 <= 3) {"));
    assert!(out.contains("int i = __for_counter_0;"));
    assert!(out.contains("__for_counter_0 = __for_counter_0 + 1;"));
    assert!(position(&out, "total = total + i;") < position(&out, "__for_counter_0 = __for_counter_0 + 1;"));
}

#[test]
fn impure_arguments_are_evaluated_in_order() {
    let out = compile(
        r#"
func g(x as int) as int { return x; }
func add(a as int, b as int) as int { return a + b; }
func main() as int { return add(g(1), g(2)); }
"#,
    );
    let first = position(&out, "int __t_0 = g(1);");
    let second = position(&out, "int __t_1 = g(2);");
    assert!(first < second);
    assert!(second < position(&out, "return add(__t_0, __t_1);"));
}

#[test]
fn only_values_a_call_could_change_are_materialized() {
    let out = compile(
        r#"
var total = 0;
func bump() as int { total = total + 1; return total; }
func add(a as int, b as int) as int { return a + b; }
func main() as int {
    var x = 1;
    var y = 2;
    var p = &y;
    var a = x + bump();
    var b = y + bump();
    var c = add(x, bump());
    var d = add(total, bump());
    return a + b + c + d + *p;
}
"#,
    );
    assert!(out.contains("    int a = x + bump();\n"));
    assert!(position(&out, "int __t_0 = y;") < position(&out, "int b = __t_0 + bump();"));
    assert!(out.contains("    int c = add(x, bump());\n"));
    let first = position(&out, "int __t_1 = total;");
    let second = position(&out, "int __t_2 = bump();");
    assert!(first < second);
    assert!(second < position(&out, "int d = add(__t_1, __t_2);"));
    assert!(out.contains("return a + b + c + d + *p;"));
}

#[test]
fn pure_arguments_stay_inline() {
    let out = compile(
        r#"
func add(a as int, b as int) as int { return a + b; }
func main() as int { var x = 2; return add(x, 1 + x); }
"#,
    );
    assert!(out.contains("return add(x, 1 + x);"));
    assert!(!out.contains("__t_"));
}

#[test]
fn unions_carry_a_tag_and_narrow_through_an_alias() {
    let out = compile(
        r#"
union Value { var number as int; var flag as bool; };
func get(v as Value) as int {
    if v is number then {
        return *v + 1;
    }
    return 0;
}
func main() as int { return get(new Value { number = 41 }); }
"#,
    );
    assert!(out.contains(
        "struct Value {\n    int tag;\n    union {\n        int number;\n        bool flag;\n    } data;\n};\n"
    ));
    assert!(out.contains("if (v.tag == 0) {"));
    assert!(out.contains("int* v_1 = &v.data.number;"));
    assert!(out.contains("return *v_1 + 1;"));
    assert!(out.contains("return get((Value){ .tag = 0, .data.number = 41 });"));
}

#[test]
fn narrowing_through_a_pointer_aliases_the_pointee() {
    let out = compile(
        r#"
union Value { var number as int; var flag as bool; };
func get(p as *Value) as int {
    if p is number then {
        *p = *p + 1;
        return *p;
    }
    return 0;
}
"#,
    );
    assert!(out.contains("if (p->tag == 0) {"));
    assert!(out.contains("int* p_1 = &p->data.number;"));
    assert!(out.contains("*p_1 = *p_1 + 1;"));
    assert!(out.contains("return *p_1;"));
}

#[test]
fn while_conditions_keep_their_temporaries_in_a_comma_expression() {
    let out = compile(
        r#"
func next() as int { return 0; }
func add(a as int, b as int) as int { return a + b; }
func main() as void {
    while add(next(), next()) > 0 do { }
}
"#,
    );
    assert!(out.contains("    int __t_0;\n    int __t_1;\n"));
    assert!(out.contains("while ((__t_0 = next(), __t_1 = next(), add(__t_0, __t_1) > 0)) {"));
}

#[test]
fn short_circuit_conditions_fall_back_to_an_explicit_break() {
    let out = compile(
        r#"
func ready() as bool { return true; }
func next() as int { return 0; }
func add(a as int, b as int) as int { return a + b; }
func main() as void {
    while ready() and add(next(), next()) > 0 do { }
}
"#,
    );
    assert!(out.contains("while (1) {"));
    assert!(out.contains("bool __t_2 = ready();"));
    assert!(out.contains("if (__t_2) {"));
    assert!(out.contains("__t_2 = add(__t_0, __t_1) > 0;"));
    assert!(out.contains("if (!__t_2) {\n            break;\n        }"));
}

#[test]
fn assignments_with_two_impure_sides_fix_the_target_first() {
    let out = compile(
        r#"
var g = 0;
func slot() as *int { return &g; }
func next() as int { return 1; }
func main() as void { *slot() = next(); }
"#,
    );
    assert!(position(&out, "int* __t_0 = slot();") < position(&out, "*__t_0 = next();"));
}

#[test]
fn line_comments_follow_source_lines() {
    let src = "func main() as int {\n    var x = 1;\n    return x;\n}\n";
    let options = CodegenOptions {
        line_comments: true,
        source: Some(DebugSource::new("main.hx".to_string(), src)),
    };
    let out = compile_with(src, &options);
    assert!(out.contains("    // Line 2: var x = 1;\n    int x = 1;\n    // Line 3: return x;\n    return x;\n"));

    assert!(!compile(src).contains("// Line"));
}

#[test]
fn c_keywords_are_renamed() {
    let out = compile(
        r#"
struct S { var char as int; };
func main() as int { var default = 1; var s = new S { char = default }; return s.char; }
"#,
    );
    assert!(out.contains("int char_;"));
    assert!(out.contains("int default_ = 1;"));
    assert!(out.contains("S s = (S){ .char_ = default_ };"));
    assert!(out.contains("return s.char_;"));
}

#[test]
fn shadowed_locals_get_distinct_names() {
    let out = compile(
        r#"
func main() as int {
    var x = 1;
    {
        var x = 2;
        x = x + 1;
    }
    return x;
}
"#,
    );
    assert!(out.contains("int x = 1;"));
    assert!(out.contains("int x_1 = 2;"));
    assert!(out.contains("x_1 = x_1 + 1;"));
    assert!(out.contains("return x;"));
}

#[test]
fn globals_and_externs_are_declared_before_functions() {
    let out = compile(
        r#"
extern func putchar(c as int) as int;
var counter = -3;
let p = &counter;
func main() as int { return putchar(*p); }
"#,
    );
    assert!(out.contains("int counter = -3;\nint* p = &counter;\n"));
    let extern_proto = position(&out, "int putchar(int c);");
    assert!(extern_proto < position(&out, "int main(void) {"));
    assert!(out.contains("return putchar(*p);"));
}

#[test]
fn generation_is_deterministic() {
    let src = r#"
struct P { var x as int; var y as int; };
union U { var i as int; var b as bool; };
var g = 1;
func f(p as *P) as int { return p.x + p.y + g; }
func main() as int { var p = new P { x = 1 }; return f(&p); }
"#;
    let first = compile(src);
    for _ in 0..4 {
        assert_eq!(compile(src), first);
    }
    assert!(first.contains("return p->x + p->y + g;"));
    assert!(first.contains("P p = (P){ .x = 1 };"));
}
