#![forbid(unsafe_code)]

use std::collections::BTreeSet;
use std::fmt;

use helix_ast::{AggregateKind, Span};

use crate::frame::GlobalContext;
use crate::path::IdentifierPath;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Type {
    Void,
    Int,
    Bool,
    Pointer { inner: Box<Type>, writable: bool },
    Named(IdentifierPath),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Copiability {
    /// Plain bits; copies never alias anything.
    Copyable,
    /// Copies are legal but carry lifetimes with them.
    Conditional,
}

impl Type {
    pub fn pointer(inner: Type, writable: bool) -> Self {
        Type::Pointer {
            inner: Box::new(inner),
            writable,
        }
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Pointer { .. })
    }

    pub fn pointee(&self) -> Option<(&Type, bool)> {
        match self {
            Type::Pointer { inner, writable } => Some((inner, *writable)),
            _ => None,
        }
    }

    pub fn as_named(&self) -> Option<&IdentifierPath> {
        match self {
            Type::Named(path) => Some(path),
            _ => None,
        }
    }

    /// Every type reachable from this one, including itself. Pointers are
    /// leaves: their pointee is not part of the value's representation.
    pub fn contained_types(&self, ctx: &GlobalContext) -> BTreeSet<Type> {
        let mut out = BTreeSet::new();
        self.collect_contained(ctx, &mut out, true);
        out
    }

    /// Types reachable by value only; pointer members contribute nothing.
    pub fn contained_value_types(&self, ctx: &GlobalContext) -> BTreeSet<Type> {
        let mut out = BTreeSet::new();
        self.collect_contained(ctx, &mut out, false);
        out
    }

    fn collect_contained(&self, ctx: &GlobalContext, out: &mut BTreeSet<Type>, pointers: bool) {
        if self.is_pointer() && !pointers {
            return;
        }
        if !out.insert(self.clone()) {
            return;
        }
        let Type::Named(path) = self else {
            return;
        };
        if let Some(sig) = ctx.aggregates.get(path) {
            for mem in &sig.members {
                mem.ty.collect_contained(ctx, out, pointers);
            }
        }
    }

    /// True when no pointer is stored anywhere inside a value of this type.
    pub fn is_value_type(&self, ctx: &GlobalContext) -> bool {
        !self.contained_types(ctx).iter().any(Type::is_pointer)
    }

    pub fn copiability(&self, ctx: &GlobalContext) -> Copiability {
        if self.is_value_type(ctx) {
            Copiability::Copyable
        } else {
            Copiability::Conditional
        }
    }

    /// Relative member paths at which a value of this type stores a pointer.
    /// The empty path stands for the value itself.
    pub fn pointer_member_paths(&self, ctx: &GlobalContext) -> Vec<IdentifierPath> {
        let mut out = Vec::new();
        let mut visiting = BTreeSet::new();
        self.collect_pointer_paths(ctx, &IdentifierPath::root(), &mut visiting, &mut out);
        out
    }

    fn collect_pointer_paths(
        &self,
        ctx: &GlobalContext,
        prefix: &IdentifierPath,
        visiting: &mut BTreeSet<IdentifierPath>,
        out: &mut Vec<IdentifierPath>,
    ) {
        match self {
            Type::Pointer { .. } => out.push(prefix.clone()),
            Type::Named(path) => {
                let Some(sig) = ctx.aggregates.get(path) else {
                    return;
                };
                if sig.kind == AggregateKind::Union || !visiting.insert(path.clone()) {
                    return;
                }
                for mem in &sig.members {
                    mem.ty
                        .collect_pointer_paths(ctx, &prefix.append(&mem.name), visiting, out);
                }
                visiting.remove(path);
            }
            Type::Void | Type::Int | Type::Bool => {}
        }
    }

    /// Replaces every occurrence of `from` with `to`.
    pub fn substitute(&self, from: &Type, to: &Type) -> Type {
        if self == from {
            return to.clone();
        }
        match self {
            Type::Pointer { inner, writable } => Type::pointer(inner.substitute(from, to), *writable),
            other => other.clone(),
        }
    }

    /// Whether a value of type `self` may be used where `target` is expected.
    /// A writable pointer coerces to the read-only pointer of the same pointee.
    pub fn can_coerce_to(&self, target: &Type) -> bool {
        if self == target {
            return true;
        }
        match (self, target) {
            (
                Type::Pointer {
                    inner: a,
                    writable: wa,
                },
                Type::Pointer {
                    inner: b,
                    writable: wb,
                },
            ) => a == b && (*wa || !*wb),
            _ => false,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Int => write!(f, "int"),
            Type::Bool => write!(f, "bool"),
            Type::Pointer { inner, writable } => {
                write!(f, "{}{inner}", if *writable { "*" } else { "&" })
            }
            Type::Named(path) => write!(f, "{}", path.last().unwrap_or("<root>")),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AggregateMember {
    pub name: String,
    pub ty: Type,
    pub writable: bool,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AggregateSignature {
    pub kind: AggregateKind,
    pub path: IdentifierPath,
    pub members: Vec<AggregateMember>,
    pub span: Span,
}

impl AggregateSignature {
    pub fn member(&self, name: &str) -> Option<(usize, &AggregateMember)> {
        self.members.iter().enumerate().find(|(_, m)| m.name == name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParameterSignature {
    pub name: String,
    pub ty: Type,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionSignature {
    pub path: IdentifierPath,
    pub params: Vec<ParameterSignature>,
    pub ret: Type,
    pub is_extern: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VariableOrigin {
    Global,
    Parameter,
    Local,
    /// A union variable re-typed as one of its members inside an `is` branch.
    UnionAlias,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VariableSignature {
    pub path: IdentifierPath,
    pub ty: Type,
    pub writable: bool,
    pub origin: VariableOrigin,
}

#[cfg(test)]
mod tests {
    use super::*;
    use helix_ast::span;

    fn member(name: &str, ty: Type) -> AggregateMember {
        AggregateMember {
            name: name.to_string(),
            ty,
            writable: true,
            span: span(0, 0),
        }
    }

    fn context_with(kind: AggregateKind, name: &str, members: Vec<AggregateMember>) -> GlobalContext {
        let mut ctx = GlobalContext::default();
        let path = IdentifierPath::new([name]);
        ctx.aggregates.insert(
            path.clone(),
            AggregateSignature {
                kind,
                path,
                members,
                span: span(0, 0),
            },
        );
        ctx
    }

    fn named(name: &str) -> Type {
        Type::Named(IdentifierPath::new([name]))
    }

    #[test]
    fn pointers_are_leaves_of_contained_types() {
        let ctx = context_with(
            AggregateKind::Struct,
            "Node",
            vec![
                member("value", Type::Int),
                member("next", Type::pointer(named("Node"), true)),
            ],
        );
        let node = named("Node");
        let contained = node.contained_types(&ctx);
        assert!(contained.contains(&Type::Int));
        assert!(contained.contains(&Type::pointer(named("Node"), true)));
        assert!(!node.is_value_type(&ctx));
        assert_eq!(node.copiability(&ctx), Copiability::Conditional);

        let by_value = node.contained_value_types(&ctx);
        assert_eq!(by_value.len(), 2);
        assert!(!by_value.iter().any(Type::is_pointer));
    }

    #[test]
    fn pointer_member_paths_follow_struct_nesting() {
        let mut ctx = context_with(
            AggregateKind::Struct,
            "Pair",
            vec![
                member("a", Type::pointer(Type::Int, true)),
                member("n", Type::Int),
            ],
        );
        let outer = IdentifierPath::new(["Outer"]);
        ctx.aggregates.insert(
            outer.clone(),
            AggregateSignature {
                kind: AggregateKind::Struct,
                path: outer,
                members: vec![member("pair", named("Pair")), member("p", Type::pointer(Type::Bool, false))],
                span: span(0, 0),
            },
        );

        let paths: Vec<String> = named("Outer")
            .pointer_member_paths(&ctx)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(paths, vec!["pair.a".to_string(), "p".to_string()]);
        assert_eq!(
            Type::pointer(Type::Int, false).pointer_member_paths(&ctx),
            vec![IdentifierPath::root()]
        );
    }

    #[test]
    fn writable_pointers_coerce_to_read_only() {
        let w = Type::pointer(Type::Int, true);
        let r = Type::pointer(Type::Int, false);
        assert!(w.can_coerce_to(&r));
        assert!(!r.can_coerce_to(&w));
        assert!(!Type::Int.can_coerce_to(&Type::Bool));
    }

    #[test]
    fn substitute_rewrites_pointees() {
        let ty = Type::pointer(named("U"), false);
        assert_eq!(ty.substitute(&named("U"), &Type::Int), Type::pointer(Type::Int, false));
        assert_eq!(ty.to_string(), "&U");
    }
}
