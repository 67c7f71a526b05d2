#![forbid(unsafe_code)]

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use helix_ast::Ident;
use helix_ir::{CDeclaration, CType};

use crate::error::{InternalError, SemanticError};
use crate::index_vec::{IndexVec, define_idx};
use crate::lifetime::VariableLifetimes;
use crate::path::IdentifierPath;
use crate::types::{AggregateSignature, FunctionSignature, Type, VariableSignature};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NameTarget {
    Variable,
    Function,
    Region,
    Struct,
    Union,
}

/// What a resolved path denotes inside a frame.
#[derive(Clone, Debug, PartialEq)]
pub enum SyntaxValue {
    Type(Type),
    Name(NameTarget),
}

/// Sink used by registered aggregate declarations to emit themselves.
pub trait DeclarationWriter {
    fn convert_type(&mut self, ty: &Type) -> CType;

    fn aggregate_name(&mut self, path: &IdentifierPath) -> String;

    fn member_name(&mut self, name: &str) -> String;

    /// Makes sure the full layout of `ty` is emitted before the caller's.
    fn require_layout(&mut self, ty: &Type);

    fn write_forward(&mut self, decl: CDeclaration);

    fn write_full(&mut self, decl: CDeclaration);
}

pub type DeclarationThunk = Rc<dyn Fn(&mut dyn DeclarationWriter)>;

/// Tables shared by every frame of a compilation. Entries are only ever added.
#[derive(Default)]
pub struct GlobalContext {
    pub names: HashMap<IdentifierPath, NameTarget>,
    pub variables: HashMap<IdentifierPath, VariableSignature>,
    pub functions: HashMap<IdentifierPath, FunctionSignature>,
    pub aggregates: HashMap<IdentifierPath, AggregateSignature>,
    pub type_declarations: BTreeMap<Type, DeclarationThunk>,
}

impl fmt::Debug for GlobalContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalContext")
            .field("names", &self.names.len())
            .field("variables", &self.variables.len())
            .field("functions", &self.functions.len())
            .field("aggregates", &self.aggregates.len())
            .field(
                "type_declarations",
                &self.type_declarations.keys().collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl GlobalContext {
    pub fn variable(&self, path: &IdentifierPath) -> Result<&VariableSignature, InternalError> {
        self.variables
            .get(path)
            .ok_or_else(|| InternalError::missing_path(path))
    }

    pub fn function(&self, path: &IdentifierPath) -> Result<&FunctionSignature, InternalError> {
        self.functions
            .get(path)
            .ok_or_else(|| InternalError::missing_path(path))
    }

    pub fn aggregate(&self, path: &IdentifierPath) -> Result<&AggregateSignature, InternalError> {
        self.aggregates
            .get(path)
            .ok_or_else(|| InternalError::missing_path(path))
    }
}

define_idx! {
    pub struct FrameId;
}

#[derive(Debug, Default)]
pub struct FrameData {
    pub parent: Option<FrameId>,
    pub syntax_values: HashMap<IdentifierPath, SyntaxValue>,
    pub lifetime_roots: HashMap<IdentifierPath, VariableLifetimes>,
}

/// Arena of nested frames. Lookups fall through to the parent chain; writes
/// only ever touch the frame they name.
#[derive(Debug)]
pub struct Frames {
    frames: IndexVec<FrameId, FrameData>,
}

impl Default for Frames {
    fn default() -> Self {
        Self::new()
    }
}

impl Frames {
    pub fn new() -> Self {
        let mut frames = IndexVec::new();
        frames.push(FrameData::default());
        Self { frames }
    }

    pub fn root(&self) -> FrameId {
        FrameId(0)
    }

    pub fn push(&mut self, parent: FrameId) -> FrameId {
        self.frames.push(FrameData {
            parent: Some(parent),
            ..FrameData::default()
        })
    }

    /// Discards `frame` and everything nested in it, returning its parent.
    pub fn pop(&mut self, frame: FrameId) -> FrameId {
        let parent = self.frames[frame].parent.unwrap_or(frame);
        if frame != self.root() {
            self.frames.truncate(frame);
        }
        parent
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    fn chain(&self, frame: FrameId) -> impl Iterator<Item = &FrameData> {
        std::iter::successors(self.frames.get(frame), |f| {
            f.parent.and_then(|p| self.frames.get(p))
        })
    }

    pub fn syntax_value(&self, frame: FrameId, path: &IdentifierPath) -> Option<&SyntaxValue> {
        self.chain(frame).find_map(|f| f.syntax_values.get(path))
    }

    pub fn insert_syntax_value(&mut self, frame: FrameId, path: IdentifierPath, value: SyntaxValue) {
        self.frames[frame].syntax_values.insert(path, value);
    }

    pub fn lifetime_root(&self, frame: FrameId, path: &IdentifierPath) -> Option<&VariableLifetimes> {
        self.chain(frame).find_map(|f| f.lifetime_roots.get(path))
    }

    pub fn insert_lifetime_root(&mut self, frame: FrameId, path: IdentifierPath, roots: VariableLifetimes) {
        self.frames[frame].lifetime_roots.insert(path, roots);
    }
}

/// The frame used by the declaration and type-checking passes. It tracks the
/// current lexical scope so every declaration gets a unique absolute path.
#[derive(Debug)]
pub struct SyntaxFrame {
    context: GlobalContext,
    frames: Frames,
    current: FrameId,
    scope: IdentifierPath,
    next_block: u32,
    next_temp: u32,
}

impl Default for SyntaxFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntaxFrame {
    pub fn new() -> Self {
        let mut frames = Frames::new();
        let root = frames.root();
        for (name, ty) in [("void", Type::Void), ("int", Type::Int), ("bool", Type::Bool)] {
            frames.insert_syntax_value(root, IdentifierPath::new([name]), SyntaxValue::Type(ty));
        }

        Self {
            context: GlobalContext::default(),
            frames,
            current: root,
            scope: IdentifierPath::root(),
            next_block: 0,
            next_temp: 0,
        }
    }

    pub fn context(&self) -> &GlobalContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut GlobalContext {
        &mut self.context
    }

    pub fn into_context(self) -> GlobalContext {
        self.context
    }

    pub fn current_scope(&self) -> &IdentifierPath {
        &self.scope
    }

    pub fn declare_global_name(
        &mut self,
        name: &Ident,
        target: NameTarget,
    ) -> Result<IdentifierPath, SemanticError> {
        let path = IdentifierPath::root().append(&name.node);
        if self.context.names.contains_key(&path)
            || self.frames.syntax_value(self.current, &path).is_some()
        {
            return Err(SemanticError::identifier_defined(name.span, &name.node));
        }

        self.context.names.insert(path.clone(), target);
        let root = self.frames.root();
        self.frames
            .insert_syntax_value(root, path.clone(), syntax_value_for(&path, target));
        Ok(path)
    }

    pub fn declare_local_name(
        &mut self,
        name: &Ident,
        target: NameTarget,
    ) -> Result<IdentifierPath, SemanticError> {
        let path = self.scope.append(&name.node);
        if self.frames.syntax_value(self.current, &path).is_some() {
            return Err(SemanticError::identifier_defined(name.span, &name.node));
        }

        self.frames
            .insert_syntax_value(self.current, path.clone(), syntax_value_for(&path, target));
        Ok(path)
    }

    /// Innermost-to-outermost search from the current scope.
    pub fn try_resolve_path(&self, name: &str) -> Option<IdentifierPath> {
        let mut scope = self.scope.clone();
        loop {
            let path = scope.append(name);
            if self.frames.syntax_value(self.current, &path).is_some() {
                return Some(path);
            }
            if scope.is_root() {
                return None;
            }
            scope = scope.pop();
        }
    }

    pub fn resolve_path(&self, name: &str) -> Result<IdentifierPath, InternalError> {
        self.try_resolve_path(name).ok_or_else(|| InternalError {
            message: format!("the name '{name}' does not resolve from '{}'", self.scope),
        })
    }

    pub fn try_resolve_name(&self, name: &str) -> Option<(IdentifierPath, SyntaxValue)> {
        let path = self.try_resolve_path(name)?;
        let value = self.frames.syntax_value(self.current, &path)?.clone();
        Some((path, value))
    }

    /// Enters a nested scope. Anonymous blocks get a synthetic `$block{N}` segment.
    pub fn push_scope(&mut self, segment: Option<&str>) -> IdentifierPath {
        let segment = match segment {
            Some(s) => s.to_string(),
            None => {
                let n = self.next_block;
                self.next_block += 1;
                format!("$block{n}")
            }
        };
        self.scope = self.scope.append(segment);
        self.current = self.frames.push(self.current);
        self.scope.clone()
    }

    pub fn pop_scope(&mut self) {
        self.current = self.frames.pop(self.current);
        self.scope = self.scope.pop();
    }

    pub fn fresh_temp_name(&mut self) -> String {
        self.fresh_name("t")
    }

    /// Compiler-introduced names start with `$`, which no source identifier can.
    pub fn fresh_name(&mut self, prefix: &str) -> String {
        let n = self.next_temp;
        self.next_temp += 1;
        format!("${prefix}_{n}")
    }
}

fn syntax_value_for(path: &IdentifierPath, target: NameTarget) -> SyntaxValue {
    match target {
        NameTarget::Struct | NameTarget::Union => SyntaxValue::Type(Type::Named(path.clone())),
        other => SyntaxValue::Name(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helix_ast::{Spanned, span};

    fn ident(name: &str) -> Ident {
        Spanned::new(span(0, name.len()), name.to_string())
    }

    #[test]
    fn root_frame_binds_primitive_types() {
        let frame = SyntaxFrame::new();
        let (_, value) = frame.try_resolve_name("int").expect("int");
        assert_eq!(value, SyntaxValue::Type(Type::Int));
        assert!(frame.try_resolve_name("float").is_none());
    }

    #[test]
    fn inner_declaration_shadows_only_inside_its_scope() {
        let mut frame = SyntaxFrame::new();
        frame.push_scope(Some("main"));
        let outer = frame.declare_local_name(&ident("x"), NameTarget::Variable).unwrap();

        let block = frame.push_scope(None);
        assert_eq!(frame.try_resolve_path("x"), Some(outer.clone()));
        let inner = frame.declare_local_name(&ident("x"), NameTarget::Variable).unwrap();
        assert_eq!(inner, block.append("x"));
        assert_eq!(frame.try_resolve_path("x"), Some(inner));
        frame.pop_scope();

        assert_eq!(frame.try_resolve_path("x"), Some(outer));
    }

    #[test]
    fn redeclaring_in_the_same_scope_fails() {
        let mut frame = SyntaxFrame::new();
        frame.declare_global_name(&ident("f"), NameTarget::Function).unwrap();
        let err = frame
            .declare_global_name(&ident("f"), NameTarget::Variable)
            .unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::IdentifierAlreadyDefined);
    }

    #[test]
    fn popped_frames_are_released() {
        let mut frames = Frames::new();
        let root = frames.root();
        let child = frames.push(root);
        frames.insert_syntax_value(child, IdentifierPath::new(["a"]), SyntaxValue::Name(NameTarget::Variable));
        assert!(frames.syntax_value(child, &IdentifierPath::new(["a"])).is_some());
        assert_eq!(frames.pop(child), root);
        assert_eq!(frames.len(), 1);
        assert!(frames.syntax_value(root, &IdentifierPath::new(["a"])).is_none());
    }

    #[test]
    fn temp_names_are_unique_and_reserved() {
        let mut frame = SyntaxFrame::new();
        let a = frame.fresh_temp_name();
        let b = frame.fresh_name("for_counter");
        assert_eq!(a, "$t_0");
        assert_eq!(b, "$for_counter_1");
    }
}
