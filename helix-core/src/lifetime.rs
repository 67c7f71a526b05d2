#![forbid(unsafe_code)]

//! Lifetime records and the sets built from them.
//!
//! A lifetime is a handle into [`Lifetimes`]. Roots stand for one storage
//! location or one stored value; derived lifetimes are only ever described
//! through their dependencies. A record's `region` is the scope whose exit
//! ends it, and the regions reachable through `deps` bound every value that
//! was computed from it.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::index_vec::{IndexVec, define_idx};
use crate::path::IdentifierPath;

define_idx! {
    pub struct LifetimeId;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifetimeRole {
    Root,
    Derived,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifetimeOrigin {
    /// The storage of a declared variable.
    LocalLocation,
    /// Whatever a variable's pointer currently refers to.
    TempValue,
    /// Memory handed in by the caller through a parameter.
    Parameter,
    /// Static storage.
    Global,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LifetimeRecord {
    pub path: IdentifierPath,
    pub role: LifetimeRole,
    pub origin: LifetimeOrigin,
    pub region: Option<IdentifierPath>,
    pub deps: BTreeSet<LifetimeId>,
}

#[derive(Debug, Default)]
pub struct Lifetimes {
    records: IndexVec<LifetimeId, LifetimeRecord>,
}

impl Lifetimes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: LifetimeId) -> &LifetimeRecord {
        &self.records[id]
    }

    pub fn iter(&self) -> impl Iterator<Item = (LifetimeId, &LifetimeRecord)> {
        self.records.iter_enumerated()
    }

    pub fn add_root(
        &mut self,
        path: IdentifierPath,
        origin: LifetimeOrigin,
        region: Option<IdentifierPath>,
        deps: BTreeSet<LifetimeId>,
    ) -> LifetimeId {
        self.records.push(LifetimeRecord {
            path,
            role: LifetimeRole::Root,
            origin,
            region,
            deps,
        })
    }

    pub fn add_derived(&mut self, path: IdentifierPath, deps: BTreeSet<LifetimeId>) -> LifetimeId {
        self.records.push(LifetimeRecord {
            path,
            role: LifetimeRole::Derived,
            origin: LifetimeOrigin::TempValue,
            region: None,
            deps,
        })
    }

    pub fn extend_deps(&mut self, id: LifetimeId, deps: impl IntoIterator<Item = LifetimeId>) {
        self.records[id].deps.extend(deps);
    }

    /// `id` and everything it transitively depends on.
    pub fn closure(&self, id: LifetimeId) -> BTreeSet<LifetimeId> {
        let mut seen = BTreeSet::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if seen.insert(next) {
                stack.extend(self.records[next].deps.iter().copied());
            }
        }
        seen
    }

    /// Every region that bounds `id`, found by following dependencies.
    pub fn regions(&self, id: LifetimeId) -> BTreeSet<IdentifierPath> {
        self.closure(id)
            .into_iter()
            .filter_map(|l| self.records[l].region.clone())
            .collect()
    }

    /// `value` may be stored where `target` is only if every region bounding
    /// the value encloses every region bounding the target.
    pub fn outlives(&self, value: &BTreeSet<IdentifierPath>, target: &BTreeSet<IdentifierPath>) -> bool {
        value
            .iter()
            .all(|v| target.iter().all(|t| v.is_prefix_of(t)))
    }
}

/// The lifetimes one storage location's current pointee may be drawn from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LifetimeBounds(pub BTreeSet<LifetimeId>);

impl LifetimeBounds {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn single(id: LifetimeId) -> Self {
        Self(BTreeSet::from([id]))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = LifetimeId> + '_ {
        self.0.iter().copied()
    }

    pub fn union(&self, other: &LifetimeBounds) -> LifetimeBounds {
        LifetimeBounds(self.0.union(&other.0).copied().collect())
    }
}

impl FromIterator<LifetimeId> for LifetimeBounds {
    fn from_iter<T: IntoIterator<Item = LifetimeId>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Per-member lifetime bounds of a possibly composite value, keyed by the
/// relative member path (the empty path is the value itself).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LifetimeBundle(pub BTreeMap<IdentifierPath, LifetimeBounds>);

impl LifetimeBundle {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_root(bounds: LifetimeBounds) -> Self {
        let mut bundle = Self::default();
        bundle.insert(IdentifierPath::root(), bounds);
        bundle
    }

    pub fn insert(&mut self, path: IdentifierPath, bounds: LifetimeBounds) {
        self.0.insert(path, bounds);
    }

    pub fn get(&self, path: &IdentifierPath) -> LifetimeBounds {
        self.0.get(path).cloned().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&IdentifierPath, &LifetimeBounds)> {
        self.0.iter()
    }

    /// All lifetimes in the bundle, regardless of member.
    pub fn all(&self) -> LifetimeBounds {
        self.0.values().flat_map(LifetimeBounds::iter).collect()
    }

    /// The sub-bundle stored under `member`, re-rooted at the empty path.
    pub fn member(&self, member: &IdentifierPath) -> LifetimeBundle {
        let n = member.segments().len();
        LifetimeBundle(
            self.0
                .iter()
                .filter(|(path, _)| member.is_prefix_of(path))
                .map(|(path, bounds)| (IdentifierPath::new(path.segments()[n..].iter().cloned()), bounds.clone()))
                .collect(),
        )
    }
}

/// Lifetimes minted for one declared variable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariableLifetimes {
    /// The variable's own storage.
    pub location: LifetimeId,
    /// One value root per pointer-holding member path.
    pub values: BTreeMap<IdentifierPath, LifetimeId>,
}

impl VariableLifetimes {
    pub fn value_bundle(&self) -> LifetimeBundle {
        LifetimeBundle(
            self.values
                .iter()
                .map(|(path, id)| (path.clone(), LifetimeBounds::single(*id)))
                .collect(),
        )
    }
}

impl fmt::Display for LifetimeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &[&str]) -> IdentifierPath {
        IdentifierPath::new(s.iter().copied())
    }

    #[test]
    fn regions_follow_dependencies() {
        let mut lt = Lifetimes::new();
        let x = lt.add_root(path(&["f", "x"]), LifetimeOrigin::LocalLocation, Some(path(&["f"])), BTreeSet::new());
        let g = lt.add_root(path(&["g"]), LifetimeOrigin::Global, Some(IdentifierPath::root()), BTreeSet::new());
        let v = lt.add_root(path(&["f", "p"]), LifetimeOrigin::TempValue, None, BTreeSet::from([x]));
        lt.extend_deps(v, [g]);

        let regions = lt.regions(v);
        assert_eq!(regions.len(), 2);
        assert!(regions.contains(&path(&["f"])));
        assert!(regions.contains(&IdentifierPath::root()));
    }

    #[test]
    fn outer_regions_outlive_inner_ones() {
        let lt = Lifetimes::new();
        let outer = BTreeSet::from([path(&["f"])]);
        let inner = BTreeSet::from([path(&["f", "$block0"])]);
        assert!(lt.outlives(&outer, &inner));
        assert!(!lt.outlives(&inner, &outer));
        assert!(lt.outlives(&BTreeSet::new(), &outer));
    }

    #[test]
    fn member_bundle_is_rerooted() {
        let mut bundle = LifetimeBundle::empty();
        bundle.insert(path(&["a", "p"]), LifetimeBounds::single(LifetimeId(1)));
        bundle.insert(path(&["b"]), LifetimeBounds::single(LifetimeId(2)));

        let a = bundle.member(&path(&["a"]));
        assert_eq!(a.get(&path(&["p"])), LifetimeBounds::single(LifetimeId(1)));
        assert!(a.get(&path(&["b"])).is_empty());
        assert_eq!(bundle.all().0.len(), 2);
    }
}
