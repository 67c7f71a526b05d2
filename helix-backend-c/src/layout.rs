#![forbid(unsafe_code)]

//! Aggregate layouts. Each aggregate registered a declaration thunk during
//! checking; running the thunks against a [`LayoutWriter`] yields forward
//! declarations plus full layouts in by-value dependency order.

use std::collections::HashSet;

use helix_core::{DeclarationWriter, GlobalContext, IdentifierPath, Type};
use helix_ir::{CDeclaration, CType};
use tracing::trace;

use crate::naming::{NameTable, sanitize};

pub(crate) struct LayoutWriter<'a> {
    context: &'a GlobalContext,
    globals: &'a mut NameTable,
    pub(crate) forwards: Vec<CDeclaration>,
    pub(crate) layouts: Vec<CDeclaration>,
    emitted: HashSet<Type>,
}

impl<'a> LayoutWriter<'a> {
    pub(crate) fn new(context: &'a GlobalContext, globals: &'a mut NameTable) -> Self {
        Self {
            context,
            globals,
            forwards: Vec::new(),
            layouts: Vec::new(),
            emitted: HashSet::new(),
        }
    }

    pub(crate) fn write_all(&mut self) {
        let types: Vec<Type> = self.context.type_declarations.keys().cloned().collect();
        for ty in &types {
            self.require_layout(ty);
        }
    }
}

pub(crate) fn convert_type(ty: &Type, globals: &mut NameTable) -> CType {
    match ty {
        Type::Void => CType::Void,
        Type::Int => CType::Int,
        Type::Bool => CType::Bool,
        Type::Pointer { inner, .. } => CType::pointer(convert_type(inner, globals)),
        Type::Named(path) => CType::Named(globals.assign(path)),
    }
}

impl DeclarationWriter for LayoutWriter<'_> {
    fn convert_type(&mut self, ty: &Type) -> CType {
        convert_type(ty, self.globals)
    }

    fn aggregate_name(&mut self, path: &IdentifierPath) -> String {
        self.globals.assign(path)
    }

    fn member_name(&mut self, name: &str) -> String {
        sanitize(name)
    }

    fn require_layout(&mut self, ty: &Type) {
        if ty.is_pointer() || !self.emitted.insert(ty.clone()) {
            return;
        }
        let Some(thunk) = self.context.type_declarations.get(ty).cloned() else {
            return;
        };
        trace!(ty = %ty, "writing layout");
        thunk(self);
    }

    fn write_forward(&mut self, decl: CDeclaration) {
        self.forwards.push(decl);
    }

    fn write_full(&mut self, decl: CDeclaration) {
        self.layouts.push(decl);
    }
}
