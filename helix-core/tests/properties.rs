use std::collections::HashMap;

use helix_ast::{BinOp, Expr, ExprKind, Spanned, Stmt, UnaryOp, span};
use helix_core::{IdentifierPath, NameTarget, SyntaxFrame, names};
use helix_parse::parse_source;
use proptest::prelude::*;

fn ident(name: &str) -> helix_ast::Ident {
    Spanned::new(span(0, name.len()), name.to_string())
}

/// Just enough of an interpreter to run integer loops that call `trace`.
struct Machine {
    env: HashMap<String, i64>,
    trace: Vec<i64>,
    fuel: usize,
}

impl Machine {
    fn eval(&self, expr: &Expr) -> i64 {
        match &expr.kind {
            ExprKind::IntLit(n) => *n,
            ExprKind::BoolLit(b) => i64::from(*b),
            ExprKind::Ident(name) => self.env[&name.node],
            ExprKind::Unary { op: UnaryOp::Neg, expr } => -self.eval(expr),
            ExprKind::Binary { left, op, right } => {
                let (l, r) = (self.eval(left), self.eval(right));
                match op {
                    BinOp::Add => l + r,
                    BinOp::Sub => l - r,
                    BinOp::Le => i64::from(l <= r),
                    other => panic!("unsupported operator {other:?}"),
                }
            }
            other => panic!("unsupported expression {other:?}"),
        }
    }

    fn run(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            match stmt {
                Stmt::VarDecl(v) => {
                    let value = self.eval(&v.value);
                    self.env.insert(v.name.node.clone(), value);
                }
                Stmt::Assign(a) => {
                    let ExprKind::Ident(name) = &a.target.kind else {
                        panic!("unsupported assignment target");
                    };
                    let value = self.eval(&a.value);
                    self.env.insert(name.node.clone(), value);
                }
                Stmt::While(w) => {
                    while self.eval(&w.cond) != 0 {
                        self.fuel = self.fuel.checked_sub(1).expect("loop did not terminate");
                        self.run(&w.body.stmts);
                    }
                }
                Stmt::Block(b) => self.run(&b.stmts),
                Stmt::Expr(Expr {
                    kind: ExprKind::Call { args, .. },
                    ..
                }) => {
                    let value = self.eval(&args[0]);
                    self.trace.push(value);
                }
                other => panic!("unsupported statement {other:?}"),
            }
        }
    }
}

fn desugared_body(src: &str) -> Vec<Stmt> {
    let program = parse_source(src).expect("parse");
    let mut frame = SyntaxFrame::new();
    names::declare_names(&program, &mut frame).expect("declare");
    let program = names::resolve_names(&program, &mut frame).expect("resolve");
    let helix_ast::Decl::Function(main) = &program.decls[0] else {
        panic!("expected function");
    };
    main.body.stmts.clone()
}

proptest! {
    #[test]
    fn append_then_pop_is_identity(
        segments in prop::collection::vec("[a-z]{1,6}", 0..6),
        extra in "[a-z]{1,6}",
    ) {
        let path = IdentifierPath::new(segments.clone());
        let child = path.append(extra.clone());
        prop_assert_eq!(child.pop(), path.clone());
        prop_assert!(path.is_prefix_of(&child));
        prop_assert!(!child.is_prefix_of(&path));
        prop_assert_eq!(child.last(), Some(extra.as_str()));

        let mut joined = segments.clone();
        joined.push(extra);
        prop_assert_eq!(child.to_string(), joined.join("."));
    }

    #[test]
    fn innermost_declaration_wins(depth in 1usize..8, pops in 0usize..8) {
        let mut frame = SyntaxFrame::new();
        frame.push_scope(Some("main"));

        let mut declared = Vec::new();
        for _ in 0..depth {
            let scope = frame.push_scope(None);
            let path = frame
                .declare_local_name(&ident("x"), NameTarget::Variable)
                .expect("declare");
            prop_assert_eq!(path.pop(), scope);
            declared.push(path);
        }
        prop_assert_eq!(frame.try_resolve_path("x"), declared.last().cloned());

        let pops = pops.min(depth);
        for _ in 0..pops {
            frame.pop_scope();
        }
        let expected = (pops < depth).then(|| declared[depth - pops - 1].clone());
        prop_assert_eq!(frame.try_resolve_path("x"), expected);
    }

    #[test]
    fn for_loops_visit_the_inclusive_range(start in -5i64..5, end in -5i64..8) {
        let src = format!(
            "func main() as void {{ for i in {start} .. {end} do {{ trace(i); }} }}"
        );
        let body = desugared_body(&src);

        prop_assert_eq!(body.len(), 1);
        let Stmt::Block(block) = &body[0] else {
            panic!("expected the loop to become a block");
        };
        prop_assert!(matches!(&block.stmts[0], Stmt::VarDecl(v) if v.writable && v.name.node.starts_with("$for_counter_")));
        prop_assert!(matches!(&block.stmts[1], Stmt::While(w) if matches!(w.cond.kind, ExprKind::Binary { op: BinOp::Le, .. })), "expected stmts[1] to be a While with a `<=` condition");

        let mut machine = Machine { env: HashMap::new(), trace: Vec::new(), fuel: 100 };
        machine.run(&body);
        prop_assert_eq!(machine.trace, (start..=end).collect::<Vec<_>>());
    }
}
