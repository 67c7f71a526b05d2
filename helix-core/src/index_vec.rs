//! Arena storage addressed by small integer handles.

use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

pub trait Idx: Copy + Eq {
    fn new(raw: u32) -> Self;
    fn index(self) -> usize;
}

#[derive(Debug, Clone)]
pub struct IndexVec<I: Idx, T> {
    raw: Vec<T>,
    _marker: PhantomData<fn(I) -> I>,
}

impl<I: Idx, T> Default for IndexVec<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Idx, T> IndexVec<I, T> {
    pub fn new() -> Self {
        Self {
            raw: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Push a value and return its index.
    pub fn push(&mut self, value: T) -> I {
        let idx = I::new(self.raw.len() as u32);
        self.raw.push(value);
        idx
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn get(&self, idx: I) -> Option<&T> {
        self.raw.get(idx.index())
    }

    /// Drops every entry at or after `idx`.
    pub fn truncate(&mut self, idx: I) {
        self.raw.truncate(idx.index());
    }

    pub fn iter_enumerated(&self) -> impl Iterator<Item = (I, &T)> {
        self.raw
            .iter()
            .enumerate()
            .map(|(i, v)| (I::new(i as u32), v))
    }
}

impl<I: Idx, T> Index<I> for IndexVec<I, T> {
    type Output = T;

    fn index(&self, idx: I) -> &T {
        &self.raw[idx.index()]
    }
}

impl<I: Idx, T> IndexMut<I> for IndexVec<I, T> {
    fn index_mut(&mut self, idx: I) -> &mut T {
        &mut self.raw[idx.index()]
    }
}

macro_rules! define_idx {
    ($(#[$meta:meta])* $vis:vis struct $name:ident;) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        $vis struct $name(pub u32);

        impl $crate::index_vec::Idx for $name {
            fn new(raw: u32) -> Self {
                Self(raw)
            }

            fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

pub(crate) use define_idx;
