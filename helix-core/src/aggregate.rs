#![forbid(unsafe_code)]

//! Struct and union declarations: registration, validation, and the
//! declaration thunks the code generator calls to emit their layouts.

use std::collections::HashSet;
use std::rc::Rc;

use helix_ast::{AggregateDecl, AggregateKind, Decl, Program};
use helix_ir::{CDeclaration, CMember};
use tracing::{debug, trace};

use crate::error::{CheckError, ErrorKind, SemanticError};
use crate::frame::{DeclarationThunk, DeclarationWriter, NameTarget, SyntaxFrame};
use crate::names::resolve_type;
use crate::path::IdentifierPath;
use crate::types::{AggregateMember, AggregateSignature, Type};

pub fn declare_names(decl: &AggregateDecl, frame: &mut SyntaxFrame) -> Result<IdentifierPath, SemanticError> {
    let target = match decl.kind {
        AggregateKind::Struct => NameTarget::Struct,
        AggregateKind::Union => NameTarget::Union,
    };
    frame.declare_global_name(&decl.name, target)
}

/// Registers the signature of every aggregate, then validates each one in
/// source order and registers its declaration thunk.
///
/// Signatures go in first so members may name aggregates declared later in
/// the file.
pub fn declare_types(program: &Program, frame: &mut SyntaxFrame) -> Result<(), CheckError> {
    let decls: Vec<&AggregateDecl> = program
        .decls
        .iter()
        .filter_map(|d| match d {
            Decl::Aggregate(a) => Some(a),
            _ => None,
        })
        .collect();

    for decl in &decls {
        let sig = build_signature(decl, frame)?;
        frame.context_mut().aggregates.insert(sig.path.clone(), sig);
    }

    for decl in &decls {
        let path = frame.resolve_path(&decl.name.node)?;
        let sig = frame.context().aggregate(&path)?.clone();
        check_recursion(&sig, frame)?;
        if sig.kind == AggregateKind::Union {
            check_union_members(&sig, frame)?;
        }

        trace!(aggregate = %sig.path, members = sig.members.len(), "registered declaration thunk");
        let ty = Type::Named(sig.path.clone());
        let thunk: DeclarationThunk = Rc::new(move |writer: &mut dyn DeclarationWriter| {
            write_aggregate(&sig, writer)
        });
        frame.context_mut().type_declarations.insert(ty, thunk);
    }

    debug!(aggregates = decls.len(), "declared types");
    Ok(())
}

fn build_signature(decl: &AggregateDecl, frame: &SyntaxFrame) -> Result<AggregateSignature, CheckError> {
    let mut seen = HashSet::new();
    let mut members = Vec::with_capacity(decl.members.len());

    for mem in &decl.members {
        if !seen.insert(mem.name.node.as_str()) {
            return Err(SemanticError::identifier_defined(mem.name.span, &mem.name.node).into());
        }
        let ty = resolve_type(frame, &mem.ty)?;
        if ty == Type::Void {
            return Err(SemanticError::new(
                ErrorKind::TypeMismatch,
                mem.ty.span,
                format!("the member '{}' cannot have type 'void'", mem.name.node),
            )
            .into());
        }
        members.push(AggregateMember {
            name: mem.name.node.clone(),
            ty,
            writable: mem.writable,
            span: mem.span,
        });
    }

    Ok(AggregateSignature {
        kind: decl.kind,
        path: frame.resolve_path(&decl.name.node)?,
        members,
        span: decl.name.span,
    })
}

/// An aggregate may not contain itself by value, directly or through other
/// aggregates. Containment through a pointer is fine.
fn check_recursion(sig: &AggregateSignature, frame: &SyntaxFrame) -> Result<(), SemanticError> {
    let this = Type::Named(sig.path.clone());
    let ctx = frame.context();
    let circular = sig
        .members
        .iter()
        .any(|m| m.ty.contained_value_types(ctx).contains(&this));

    if circular {
        return Err(SemanticError::circular_value_object(sig.span, &this));
    }
    Ok(())
}

/// Union members are reinterpreted in place, so none of them may hold a
/// pointer anywhere in its representation.
fn check_union_members(sig: &AggregateSignature, frame: &SyntaxFrame) -> Result<(), SemanticError> {
    let ctx = frame.context();
    for mem in &sig.members {
        if let Some(pointer) = mem.ty.contained_types(ctx).into_iter().find(Type::is_pointer) {
            return Err(SemanticError::new(
                ErrorKind::InvalidUnionMember,
                mem.span,
                format!("The pointer type '{pointer}' cannot be a union member."),
            ));
        }
    }
    Ok(())
}

fn write_aggregate(sig: &AggregateSignature, writer: &mut dyn DeclarationWriter) {
    for mem in &sig.members {
        writer.require_layout(&mem.ty);
    }

    let name = writer.aggregate_name(&sig.path);
    let members = sig
        .members
        .iter()
        .map(|m| CMember {
            name: writer.member_name(&m.name),
            ty: writer.convert_type(&m.ty),
        })
        .collect();

    writer.write_forward(CDeclaration::AggregateForward { name: name.clone() });
    writer.write_full(match sig.kind {
        AggregateKind::Struct => CDeclaration::Struct { name, members },
        AggregateKind::Union => CDeclaration::TaggedUnion { name, members },
    });
    writer.write_full(CDeclaration::EmptyLine);
}
