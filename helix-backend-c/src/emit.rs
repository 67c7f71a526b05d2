#![forbid(unsafe_code)]

use helix_ir::{CBinOp, CDeclaration, CExpr, CMember, CModule, CParameter, CStmt, CType, CUnaryOp};

const INDENT: &str = "    ";

/// Serializes a C module. Formatting is fixed: the same module always
/// produces the same text.
pub fn emit_module(module: &CModule) -> String {
    let mut out = String::new();
    out.push_str("#include <stdbool.h>\n\n");
    for decl in &module.declarations {
        emit_declaration(&mut out, decl);
    }
    out
}

fn emit_declaration(out: &mut String, decl: &CDeclaration) {
    match decl {
        CDeclaration::AggregateForward { name } => {
            out.push_str(&format!("typedef struct {name} {name};\n"));
        }
        CDeclaration::Struct { name, members } => {
            out.push_str(&format!("struct {name} {{\n"));
            emit_members(out, members, 1);
            out.push_str("};\n");
        }
        CDeclaration::TaggedUnion { name, members } => {
            out.push_str(&format!("struct {name} {{\n"));
            out.push_str(INDENT);
            out.push_str("int tag;\n");
            out.push_str(INDENT);
            out.push_str("union {\n");
            emit_members(out, members, 2);
            out.push_str(INDENT);
            out.push_str("} data;\n");
            out.push_str("};\n");
        }
        CDeclaration::FunctionPrototype { name, ret, params } => {
            emit_signature(out, name, ret, params);
            out.push_str(";\n");
        }
        CDeclaration::Function {
            name,
            ret,
            params,
            body,
        } => {
            emit_signature(out, name, ret, params);
            out.push_str(" {\n");
            for stmt in body {
                emit_stmt(out, stmt, 1);
            }
            out.push_str("}\n");
        }
        CDeclaration::Global { name, ty, value } => {
            out.push_str(&declarator(ty, name));
            if let Some(value) = value {
                out.push_str(" = ");
                out.push_str(&expr_text(value, 0));
            }
            out.push_str(";\n");
        }
        CDeclaration::EmptyLine => out.push('\n'),
    }
}

fn emit_members(out: &mut String, members: &[CMember], depth: usize) {
    let indent = INDENT.repeat(depth);
    if members.is_empty() {
        // C rejects empty aggregates.
        out.push_str(&indent);
        out.push_str("char __empty;\n");
    }
    for m in members {
        out.push_str(&indent);
        out.push_str(&declarator(&m.ty, &m.name));
        out.push_str(";\n");
    }
}

fn emit_signature(out: &mut String, name: &str, ret: &CType, params: &[CParameter]) {
    out.push_str(&declarator(ret, name));
    out.push('(');
    if params.is_empty() {
        out.push_str("void");
    }
    for (i, p) in params.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&declarator(&p.ty, &p.name));
    }
    out.push(')');
}

fn type_name(ty: &CType) -> String {
    match ty {
        CType::Void => "void".to_string(),
        CType::Int => "int".to_string(),
        CType::Bool => "bool".to_string(),
        CType::Named(name) => name.clone(),
        CType::Pointer(inner) => format!("{}*", type_name(inner)),
    }
}

fn declarator(ty: &CType, name: &str) -> String {
    format!("{} {name}", type_name(ty))
}

fn emit_block(out: &mut String, stmts: &[CStmt], depth: usize) {
    for stmt in stmts {
        emit_stmt(out, stmt, depth + 1);
    }
    out.push_str(&INDENT.repeat(depth));
    out.push('}');
}

fn emit_stmt(out: &mut String, stmt: &CStmt, depth: usize) {
    let indent = INDENT.repeat(depth);
    match stmt {
        CStmt::VariableDeclaration { name, ty, value } => {
            out.push_str(&indent);
            out.push_str(&declarator(ty, name));
            if let Some(value) = value {
                out.push_str(" = ");
                out.push_str(&expr_text(value, 0));
            }
            out.push_str(";\n");
        }
        CStmt::Assignment { target, value } => {
            out.push_str(&indent);
            out.push_str(&expr_text(target, PREC_UNARY));
            out.push_str(" = ");
            out.push_str(&expr_text(value, 0));
            out.push_str(";\n");
        }
        CStmt::Expression(expr) => {
            out.push_str(&indent);
            out.push_str(&expr_text(expr, 0));
            out.push_str(";\n");
        }
        CStmt::Block(stmts) => {
            out.push_str(&indent);
            out.push_str("{\n");
            emit_block(out, stmts, depth);
            out.push('\n');
        }
        CStmt::If {
            cond,
            then_block,
            else_block,
        } => {
            out.push_str(&indent);
            out.push_str(&format!("if ({}) {{\n", expr_text(cond, 0)));
            emit_block(out, then_block, depth);
            if !else_block.is_empty() {
                out.push_str(" else {\n");
                emit_block(out, else_block, depth);
            }
            out.push('\n');
        }
        CStmt::While { cond, body } => {
            out.push_str(&indent);
            out.push_str(&format!("while ({}) {{\n", expr_text(cond, 0)));
            emit_block(out, body, depth);
            out.push('\n');
        }
        CStmt::Break => {
            out.push_str(&indent);
            out.push_str("break;\n");
        }
        CStmt::Return(value) => {
            out.push_str(&indent);
            match value {
                Some(v) => out.push_str(&format!("return {};\n", expr_text(v, 0))),
                None => out.push_str("return;\n"),
            }
        }
        CStmt::Comment(text) => {
            out.push_str(&indent);
            out.push_str("// ");
            out.push_str(text);
            out.push('\n');
        }
        CStmt::EmptyLine => out.push('\n'),
    }
}

const PREC_ASSIGN: u8 = 1;
const PREC_UNARY: u8 = 8;
const PREC_POSTFIX: u8 = 9;
const PREC_PRIMARY: u8 = 10;

fn binary_prec(op: CBinOp) -> u8 {
    match op {
        CBinOp::LogicalOr => 2,
        CBinOp::LogicalAnd => 3,
        CBinOp::Eq | CBinOp::Ne => 4,
        CBinOp::Lt | CBinOp::Gt | CBinOp::Le | CBinOp::Ge => 5,
        CBinOp::Add | CBinOp::Sub => 6,
        CBinOp::Mul | CBinOp::Div | CBinOp::Mod => 7,
    }
}

fn binary_symbol(op: CBinOp) -> &'static str {
    match op {
        CBinOp::Add => "+",
        CBinOp::Sub => "-",
        CBinOp::Mul => "*",
        CBinOp::Div => "/",
        CBinOp::Mod => "%",
        CBinOp::Eq => "==",
        CBinOp::Ne => "!=",
        CBinOp::Lt => "<",
        CBinOp::Gt => ">",
        CBinOp::Le => "<=",
        CBinOp::Ge => ">=",
        CBinOp::LogicalAnd => "&&",
        CBinOp::LogicalOr => "||",
    }
}

fn prec(expr: &CExpr) -> u8 {
    match expr {
        CExpr::IntLiteral(n) if *n < 0 => PREC_UNARY,
        CExpr::IntLiteral(_) | CExpr::BoolLiteral(_) | CExpr::Variable(_) | CExpr::Comma(_) => {
            PREC_PRIMARY
        }
        CExpr::MemberAccess { .. } | CExpr::Call { .. } | CExpr::CompoundLiteral { .. } => {
            PREC_POSTFIX
        }
        CExpr::AddressOf(_) | CExpr::Deref(_) | CExpr::Unary { .. } => PREC_UNARY,
        CExpr::Binary { op, .. } => binary_prec(*op),
        CExpr::Assign { .. } => PREC_ASSIGN,
    }
}

/// Renders `expr`, parenthesized when it binds looser than `min`.
fn expr_text(expr: &CExpr, min: u8) -> String {
    let text = match expr {
        CExpr::IntLiteral(n) => n.to_string(),
        CExpr::BoolLiteral(b) => b.to_string(),
        CExpr::Variable(name) => name.clone(),
        CExpr::MemberAccess {
            target,
            member,
            through_pointer,
        } => {
            let sep = if *through_pointer { "->" } else { "." };
            format!("{}{sep}{member}", expr_text(target, PREC_POSTFIX))
        }
        CExpr::AddressOf(inner) => prefixed("&", inner),
        CExpr::Deref(inner) => prefixed("*", inner),
        CExpr::Unary { op, expr } => match op {
            CUnaryOp::Neg => prefixed("-", expr),
            CUnaryOp::Not => prefixed("!", expr),
        },
        CExpr::Binary { op, left, right } => {
            let p = binary_prec(*op);
            // `a || b && c` is legal but compilers warn about it.
            let mixed = |e: &CExpr| {
                *op == CBinOp::LogicalOr
                    && matches!(e, CExpr::Binary { op: CBinOp::LogicalAnd, .. })
            };
            let l = if mixed(left) { PREC_PRIMARY } else { p };
            let r = if mixed(right) { PREC_PRIMARY } else { p + 1 };
            format!(
                "{} {} {}",
                expr_text(left, l),
                binary_symbol(*op),
                expr_text(right, r)
            )
        }
        CExpr::Call { target, args } => {
            let args: Vec<String> = args.iter().map(|a| expr_text(a, PREC_ASSIGN)).collect();
            format!("{target}({})", args.join(", "))
        }
        CExpr::CompoundLiteral { ty, members } => {
            if members.is_empty() {
                format!("({}){{ 0 }}", type_name(ty))
            } else {
                let members: Vec<String> = members
                    .iter()
                    .map(|(name, value)| format!(".{name} = {}", expr_text(value, PREC_ASSIGN)))
                    .collect();
                format!("({}){{ {} }}", type_name(ty), members.join(", "))
            }
        }
        CExpr::Assign { target, value } => format!(
            "{} = {}",
            expr_text(target, PREC_UNARY),
            expr_text(value, PREC_ASSIGN)
        ),
        CExpr::Comma(items) => {
            let items: Vec<String> = items.iter().map(|e| expr_text(e, PREC_ASSIGN)).collect();
            format!("({})", items.join(", "))
        }
    };
    if prec(expr) < min {
        format!("({text})")
    } else {
        text
    }
}

fn prefixed(op: &str, operand: &CExpr) -> String {
    let inner = expr_text(operand, PREC_UNARY);
    // Keep `- -x` and `- -1` from fusing into a decrement.
    if op == "-" && inner.starts_with('-') {
        format!("{op}({inner})")
    } else {
        format!("{op}{inner}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_drives_parentheses() {
        let sum = CExpr::binary(CBinOp::Add, CExpr::var("a"), CExpr::var("b"));
        let product = CExpr::binary(CBinOp::Mul, sum.clone(), CExpr::IntLiteral(2));
        assert_eq!(expr_text(&product, 0), "(a + b) * 2");

        let left_assoc = CExpr::binary(CBinOp::Sub, CExpr::var("a"), sum);
        assert_eq!(expr_text(&left_assoc, 0), "a - (a + b)");

        let member = CExpr::member(CExpr::deref(CExpr::var("p")), "x", false);
        assert_eq!(expr_text(&member, 0), "(*p).x");
    }

    #[test]
    fn negation_never_fuses_into_decrement() {
        let neg = CExpr::Unary {
            op: CUnaryOp::Neg,
            expr: Box::new(CExpr::IntLiteral(-1)),
        };
        assert_eq!(expr_text(&neg, 0), "-(-1)");
    }

    #[test]
    fn empty_parameter_lists_are_void() {
        let mut module = CModule::new();
        module.push(CDeclaration::FunctionPrototype {
            name: "main".to_string(),
            ret: CType::Int,
            params: Vec::new(),
        });
        module.push(CDeclaration::Global {
            name: "p".to_string(),
            ty: CType::pointer(CType::Int),
            value: None,
        });
        assert_eq!(
            emit_module(&module),
            "#include <stdbool.h>\n\nint main(void);\nint* p;\n"
        );
    }
}
