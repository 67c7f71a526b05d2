#![forbid(unsafe_code)]

//! Lifetime flow analysis.
//!
//! Every declared variable gets a location lifetime bounded by the region
//! (scope) that owns it, plus one value lifetime per pointer it stores.
//! Walking the checked tree computes, for each expression, the bundle of
//! lifetimes its pointers may refer to. A store widens the value lifetimes
//! of every variable the target may name, whether it is reached directly,
//! through a pointer, or through a call argument. Stores and returns record
//! obligations which are discharged once the whole function has been seen,
//! so bounds widened later in a loop body still take part in the check.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use helix_ast::Span;
use tracing::{debug, trace};

use crate::error::{CheckError, InternalError, SemanticError};
use crate::frame::{FrameId, Frames, GlobalContext};
use crate::lifetime::{
    LifetimeBounds, LifetimeBundle, LifetimeId, LifetimeOrigin, Lifetimes, VariableLifetimes,
};
use crate::path::IdentifierPath;
use crate::syntax::{
    NodeId, TypedBlock, TypedExpr, TypedExprKind, TypedFunction, TypedGlobal, TypedStmt,
    TypedStmtKind,
};
use crate::types::{Type, VariableOrigin};

/// What the flow pass leaves behind for later stages.
#[derive(Debug)]
pub struct FlowResults {
    pub lifetimes: Lifetimes,
    pub bundles: HashMap<NodeId, LifetimeBundle>,
}

#[derive(Clone, Debug)]
enum Bound {
    /// Stored into the location this lifetime stands for.
    Lifetime(LifetimeId),
    /// Handed out of the function, to the caller's region.
    Region(IdentifierPath),
}

#[derive(Clone, Debug)]
struct Obligation {
    value: LifetimeId,
    target: Bound,
    member: IdentifierPath,
    span: Span,
}

pub struct FlowFrame<'c> {
    context: &'c GlobalContext,
    frames: Frames,
    current: FrameId,
    regions: Vec<IdentifierPath>,
    lifetimes: Lifetimes,
    bundles: HashMap<NodeId, LifetimeBundle>,
    locations: HashMap<NodeId, LifetimeBounds>,
    /// Variables by the lifetime of their storage.
    owners: HashMap<LifetimeId, VariableLifetimes>,
    obligations: Vec<Obligation>,
}

pub fn analyze_program(
    context: &GlobalContext,
    globals: &[TypedGlobal],
    functions: &[TypedFunction],
) -> Result<FlowResults, CheckError> {
    let mut flow = FlowFrame::new(context);
    for global in globals {
        flow.declare_global(global)?;
    }
    for function in functions {
        flow.analyze_function(function)?;
    }
    debug!(
        lifetimes = flow.lifetimes.len(),
        nodes = flow.bundles.len(),
        "analyzed flow"
    );
    Ok(flow.into_results())
}

impl<'c> FlowFrame<'c> {
    pub fn new(context: &'c GlobalContext) -> Self {
        let frames = Frames::new();
        let current = frames.root();
        Self {
            context,
            frames,
            current,
            regions: vec![IdentifierPath::root()],
            lifetimes: Lifetimes::new(),
            bundles: HashMap::new(),
            locations: HashMap::new(),
            owners: HashMap::new(),
            obligations: Vec::new(),
        }
    }

    pub fn lifetimes(&self) -> &Lifetimes {
        &self.lifetimes
    }

    pub fn into_results(self) -> FlowResults {
        FlowResults {
            lifetimes: self.lifetimes,
            bundles: self.bundles,
        }
    }

    fn region(&self) -> IdentifierPath {
        self.regions.last().cloned().unwrap_or_default()
    }

    pub fn push_region(&mut self, region: IdentifierPath) {
        self.current = self.frames.push(self.current);
        self.regions.push(region);
    }

    pub fn pop_region(&mut self) {
        self.current = self.frames.pop(self.current);
        if self.regions.len() > 1 {
            self.regions.pop();
        }
    }

    fn variable(&self, path: &IdentifierPath) -> Result<&VariableLifetimes, InternalError> {
        self.frames
            .lifetime_root(self.current, path)
            .ok_or_else(|| InternalError::missing_path(path))
    }

    /// Mints the location and value roots of a new variable in the current
    /// frame. Local value roots start out depending on the initializer.
    fn declare_variable(
        &mut self,
        path: &IdentifierPath,
        ty: &Type,
        origin: VariableOrigin,
        init: &LifetimeBundle,
    ) -> VariableLifetimes {
        let root = IdentifierPath::root();
        let (location_origin, location_region, value_origin, value_region) = match origin {
            VariableOrigin::Global => (
                LifetimeOrigin::Global,
                root.clone(),
                LifetimeOrigin::Global,
                Some(root),
            ),
            VariableOrigin::Parameter => (
                LifetimeOrigin::LocalLocation,
                self.region(),
                LifetimeOrigin::Parameter,
                Some(root),
            ),
            VariableOrigin::Local | VariableOrigin::UnionAlias => (
                LifetimeOrigin::LocalLocation,
                self.region(),
                LifetimeOrigin::TempValue,
                None,
            ),
        };

        let location = self.lifetimes.add_root(
            path.clone(),
            location_origin,
            Some(location_region),
            BTreeSet::new(),
        );
        let mut values = BTreeMap::new();
        for member in ty.pointer_member_paths(self.context) {
            let id = self.lifetimes.add_root(
                path.append_path(&member),
                value_origin,
                value_region.clone(),
                init.get(&member).0,
            );
            values.insert(member, id);
        }

        let roots = VariableLifetimes { location, values };
        trace!(variable = %path, location = %location, values = roots.values.len(), "declared lifetimes");
        self.frames.insert_lifetime_root(self.current, path.clone(), roots.clone());
        self.owners.insert(location, roots.clone());
        roots
    }

    pub fn declare_global(&mut self, global: &TypedGlobal) -> Result<(), CheckError> {
        let init = self.analyze_expr(&global.value)?;
        self.declare_variable(&global.path, &global.ty, VariableOrigin::Global, &init);
        Ok(())
    }

    pub fn analyze_function(&mut self, function: &TypedFunction) -> Result<(), CheckError> {
        self.push_region(function.body.scope.clone());
        for param in &function.params {
            self.declare_variable(
                &param.path,
                &param.ty,
                VariableOrigin::Parameter,
                &LifetimeBundle::empty(),
            );
        }
        let result = self.analyze_stmts(&function.body.stmts);
        self.pop_region();
        result?;
        self.discharge(&function.path)
    }

    fn analyze_block(&mut self, block: &TypedBlock) -> Result<(), CheckError> {
        self.push_region(block.scope.clone());
        let result = self.analyze_stmts(&block.stmts);
        self.pop_region();
        result
    }

    fn analyze_stmts(&mut self, stmts: &[TypedStmt]) -> Result<(), CheckError> {
        for stmt in stmts {
            self.analyze_stmt(stmt)?;
        }
        Ok(())
    }

    fn analyze_stmt(&mut self, stmt: &TypedStmt) -> Result<(), CheckError> {
        match &stmt.kind {
            TypedStmtKind::VarDecl { path, ty, value, .. } => {
                let init = self.analyze_expr(value)?;
                self.declare_variable(path, ty, VariableOrigin::Local, &init);
            }
            TypedStmtKind::Assign { target, value } => self.analyze_assign(target, value)?,
            TypedStmtKind::Return(Some(value)) => {
                let bundle = self.analyze_expr(value)?;
                for (member, bounds) in bundle.iter() {
                    for lifetime in bounds.iter() {
                        self.oblige(lifetime, Bound::Region(IdentifierPath::root()), member, value.span);
                    }
                }
            }
            TypedStmtKind::Return(None) => {}
            TypedStmtKind::If {
                cond,
                then_block,
                else_block,
            } => {
                self.analyze_expr(cond)?;
                self.analyze_block(then_block)?;
                if let Some(else_block) = else_block {
                    self.analyze_block(else_block)?;
                }
            }
            TypedStmtKind::While { cond, body } => {
                self.analyze_expr(cond)?;
                self.analyze_block(body)?;
            }
            TypedStmtKind::Block(block) => self.analyze_block(block)?,
            TypedStmtKind::Expr(expr) => {
                self.analyze_expr(expr)?;
            }
            TypedStmtKind::UnionFlowVar { path, target, ty, .. } => {
                // The narrowed name points into the union's own storage.
                let bundle = self.analyze_expr(target)?;
                let storage = if target.ty.is_pointer() {
                    bundle.get(&IdentifierPath::root())
                } else {
                    self.location_of(target)
                };
                let init = LifetimeBundle::with_root(storage);
                self.declare_variable(path, ty, VariableOrigin::UnionAlias, &init);
            }
        }
        Ok(())
    }

    fn analyze_assign(&mut self, target: &TypedExpr, value: &TypedExpr) -> Result<(), CheckError> {
        self.analyze_expr(target)?;
        let bundle = self.analyze_expr(value)?;
        let locations = self.location_of(target);

        for (member, bounds) in bundle.iter() {
            for lifetime in bounds.iter() {
                for location in locations.iter() {
                    self.oblige(lifetime, Bound::Lifetime(location), member, value.span);
                }
            }
        }

        let prefix = target.member_path();
        for owner in self.owners_of(&locations) {
            for (member, bounds) in bundle.iter() {
                if let Some(id) = owner.values.get(&prefix.append_path(member)) {
                    self.lifetimes.extend_deps(*id, bounds.iter());
                }
            }
        }
        Ok(())
    }

    /// Every variable whose storage `locations` may stand for. A pointer's
    /// value lifetime depends on the locations it was taken from, so this
    /// also finds variables reached through pointers.
    fn owners_of(&self, locations: &LifetimeBounds) -> Vec<VariableLifetimes> {
        let mut reachable = BTreeSet::new();
        for location in locations.iter() {
            reachable.extend(self.lifetimes.closure(location));
        }
        reachable
            .iter()
            .filter_map(|id| self.owners.get(id))
            .cloned()
            .collect()
    }

    /// The bundle of a value of type `ty` loaded from `member` of whatever
    /// `storage` points to. Variables the pointer may reach contribute what
    /// they currently hold; the pointer itself bounds everything else.
    fn load(&self, ty: &Type, storage: &LifetimeBounds, member: &IdentifierPath) -> LifetimeBundle {
        let mut bundle = self.spread(ty, storage);
        for owner in self.owners_of(storage) {
            for (path, bounds) in owner.value_bundle().member(member).iter() {
                let merged = bundle.get(path).union(bounds);
                bundle.insert(path.clone(), merged);
            }
        }
        bundle
    }

    fn oblige(&mut self, value: LifetimeId, target: Bound, member: &IdentifierPath, span: Span) {
        trace!(value = %value, bound = ?target, member = %member, "recorded lifetime obligation");
        self.obligations.push(Obligation {
            value,
            target,
            member: member.clone(),
            span,
        });
    }

    fn discharge(&mut self, function: &IdentifierPath) -> Result<(), CheckError> {
        let obligations = std::mem::take(&mut self.obligations);
        for ob in &obligations {
            let value_regions = self.lifetimes.regions(ob.value);
            let target_regions = match &ob.target {
                Bound::Lifetime(target) => self.lifetimes.regions(*target),
                Bound::Region(region) => BTreeSet::from([region.clone()]),
            };
            if !self.lifetimes.outlives(&value_regions, &target_regions) {
                return Err(self.escape_error(ob, &value_regions, &target_regions).into());
            }
        }
        debug!(function = %function, obligations = obligations.len(), "discharged lifetime obligations");
        Ok(())
    }

    fn escape_error(
        &self,
        ob: &Obligation,
        value_regions: &BTreeSet<IdentifierPath>,
        target_regions: &BTreeSet<IdentifierPath>,
    ) -> SemanticError {
        let short = value_regions
            .iter()
            .find(|v| !target_regions.iter().all(|t| v.is_prefix_of(t)));
        let culprit = self
            .lifetimes
            .closure(ob.value)
            .into_iter()
            .map(|id| self.lifetimes.get(id))
            .find(|record| record.region.as_ref() == short)
            .and_then(|record| record.path.last().map(str::to_string))
            .unwrap_or_else(|| "a temporary".to_string());

        let mut message = match &ob.target {
            Bound::Region(_) => format!("a reference to '{culprit}' cannot be returned, it does not outlive the function"),
            Bound::Lifetime(_) => {
                format!("a reference to '{culprit}' is stored in a location that outlives it")
            }
        };
        if !ob.member.is_root() {
            message.push_str(&format!(" (through member '{}')", ob.member));
        }
        SemanticError::lifetime_exceeded(ob.span, message)
    }

    fn location_of(&self, expr: &TypedExpr) -> LifetimeBounds {
        self.locations.get(&expr.id).cloned().unwrap_or_default()
    }

    /// The same bounds at every pointer a value of `ty` stores.
    fn spread(&self, ty: &Type, bounds: &LifetimeBounds) -> LifetimeBundle {
        let mut bundle = LifetimeBundle::empty();
        for member in ty.pointer_member_paths(self.context) {
            bundle.insert(member, bounds.clone());
        }
        bundle
    }

    /// Computes the lifetime bundle of `expr`. A node is only ever analyzed
    /// once; asking again returns the stored bundle.
    pub fn analyze_expr(&mut self, expr: &TypedExpr) -> Result<LifetimeBundle, CheckError> {
        if let Some(bundle) = self.bundles.get(&expr.id) {
            return Ok(bundle.clone());
        }

        let (bundle, location) = self.compute(expr)?;
        if let Some(location) = location {
            self.locations.insert(expr.id, location);
        }
        self.bundles.insert(expr.id, bundle.clone());
        Ok(bundle)
    }

    fn compute(&mut self, expr: &TypedExpr) -> Result<(LifetimeBundle, Option<LifetimeBounds>), CheckError> {
        let root = IdentifierPath::root();
        Ok(match &expr.kind {
            TypedExprKind::IntLit(_) | TypedExprKind::BoolLit(_) => (LifetimeBundle::empty(), None),
            TypedExprKind::Variable(path) => {
                let roots = self.variable(path)?;
                (roots.value_bundle(), Some(LifetimeBounds::single(roots.location)))
            }
            TypedExprKind::Unary { expr: inner, .. } => {
                self.analyze_expr(inner)?;
                (LifetimeBundle::empty(), None)
            }
            TypedExprKind::Binary { left, right, .. } => {
                self.analyze_expr(left)?;
                self.analyze_expr(right)?;
                (LifetimeBundle::empty(), None)
            }
            TypedExprKind::Is { target, .. } => {
                self.analyze_expr(target)?;
                (LifetimeBundle::empty(), None)
            }
            TypedExprKind::AddressOf(target) => {
                self.analyze_expr(target)?;
                (LifetimeBundle::with_root(self.location_of(target)), None)
            }
            TypedExprKind::Deref(pointer) => {
                let storage = self.analyze_expr(pointer)?.get(&root);
                (self.load(&expr.ty, &storage, &root), Some(storage))
            }
            TypedExprKind::Member {
                base: pointer,
                member,
                through_pointer: true,
                ..
            } => {
                let storage = self.analyze_expr(pointer)?.get(&root);
                (self.load(&expr.ty, &storage, &root.append(member)), Some(storage))
            }
            TypedExprKind::Member { base, member, .. } => {
                let value = self.analyze_expr(base)?;
                let location = base.place.is_place().then(|| self.location_of(base));
                (value.member(&root.append(member)), location)
            }
            TypedExprKind::Call { function, args } => (self.analyze_call(function, &expr.ty, args)?, None),
            TypedExprKind::NewStruct { fields, .. } => {
                let mut bundle = LifetimeBundle::empty();
                for (name, value) in fields {
                    let field = self.analyze_expr(value)?;
                    for (member, bounds) in field.iter() {
                        bundle.insert(root.append(name).append_path(member), bounds.clone());
                    }
                }
                (bundle, None)
            }
            TypedExprKind::NewUnion { value, .. } => {
                self.analyze_expr(value)?;
                (LifetimeBundle::empty(), None)
            }
        })
    }

    /// The result may refer to anything any argument refers to, so it gets a
    /// derived lifetime over all of them. An argument pointing at
    /// pointer-bearing storage may have the others stored into it.
    fn analyze_call(
        &mut self,
        function: &IdentifierPath,
        ty: &Type,
        args: &[TypedExpr],
    ) -> Result<LifetimeBundle, CheckError> {
        let root = IdentifierPath::root();
        let mut bundles = Vec::with_capacity(args.len());
        for arg in args {
            bundles.push(self.analyze_expr(arg)?);
        }

        for (i, arg) in args.iter().enumerate() {
            let Some((pointee, _)) = arg.ty.pointee() else {
                continue;
            };
            if pointee.is_value_type(self.context) {
                continue;
            }
            let storage = bundles[i].get(&root);
            let owners = self.owners_of(&storage);
            for (j, other) in bundles.iter().enumerate() {
                if i == j {
                    continue;
                }
                let stored = other.all();
                for lifetime in stored.iter() {
                    for target in storage.iter() {
                        self.oblige(lifetime, Bound::Lifetime(target), &root, args[j].span);
                    }
                }
                // The callee may store the argument anywhere in the pointee.
                for owner in &owners {
                    for id in owner.values.values() {
                        self.lifetimes.extend_deps(*id, stored.iter());
                    }
                }
            }
        }

        let all: LifetimeBounds = bundles.iter().flat_map(|b| b.all().0).collect();
        if all.is_empty() || ty.pointer_member_paths(self.context).is_empty() {
            return Ok(LifetimeBundle::empty());
        }
        let result = self.lifetimes.add_derived(function.clone(), all.0);
        Ok(self.spread(ty, &LifetimeBounds::single(result)))
    }
}
