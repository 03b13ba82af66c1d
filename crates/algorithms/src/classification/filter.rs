//! Cluster index filters
//!
//! A filter is a pure predicate over cluster indices `[0, K)`. Callers build
//! semantics such as "cloud clusters" or "everything not ignored" out of
//! flag arrays and combine them with [`IndexFilterExt`]; the model only ever
//! asks whether an index is accepted.

/// Predicate restricting which cluster indices take part in a computation.
pub trait IndexFilter {
    fn accept(&self, k: usize) -> bool;
}

impl<F> IndexFilter for F
where
    F: Fn(usize) -> bool,
{
    fn accept(&self, k: usize) -> bool {
        self(k)
    }
}

/// Accepts every index.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl IndexFilter for AcceptAll {
    fn accept(&self, _k: usize) -> bool {
        true
    }
}

/// Accepts only the listed indices.
#[derive(Debug, Clone, Default)]
pub struct AcceptOnly {
    indices: Vec<usize>,
}

impl AcceptOnly {
    pub fn new(indices: impl IntoIterator<Item = usize>) -> Self {
        let mut indices: Vec<usize> = indices.into_iter().collect();
        indices.sort_unstable();
        indices.dedup();
        Self { indices }
    }
}

impl IndexFilter for AcceptOnly {
    fn accept(&self, k: usize) -> bool {
        self.indices.binary_search(&k).is_ok()
    }
}

/// Accepts index `k` when `flags[k]` is set. Indices beyond the flag array are rejected.
#[derive(Debug, Clone, Default)]
pub struct Inclusive {
    flags: Vec<bool>,
}

impl Inclusive {
    pub fn new(flags: Vec<bool>) -> Self {
        Self { flags }
    }
}

impl IndexFilter for Inclusive {
    fn accept(&self, k: usize) -> bool {
        self.flags.get(k).copied().unwrap_or(false)
    }
}

/// Accepts index `k` when none of the flag arrays has `k` set.
///
/// `Exclusive::new([cloud, ignored])` accepts the surface clusters.
/// Indices beyond a flag array count as not flagged by it.
#[derive(Debug, Clone, Default)]
pub struct Exclusive {
    flag_sets: Vec<Vec<bool>>,
}

impl Exclusive {
    pub fn new(flag_sets: impl IntoIterator<Item = Vec<bool>>) -> Self {
        Self {
            flag_sets: flag_sets.into_iter().collect(),
        }
    }
}

impl IndexFilter for Exclusive {
    fn accept(&self, k: usize) -> bool {
        self.flag_sets
            .iter()
            .all(|flags| !flags.get(k).copied().unwrap_or(false))
    }
}

/// Logical AND of two filters
#[derive(Debug, Clone, Copy)]
pub struct And<A, B>(A, B);

impl<A: IndexFilter, B: IndexFilter> IndexFilter for And<A, B> {
    fn accept(&self, k: usize) -> bool {
        self.0.accept(k) && self.1.accept(k)
    }
}

/// Logical OR of two filters
#[derive(Debug, Clone, Copy)]
pub struct Or<A, B>(A, B);

impl<A: IndexFilter, B: IndexFilter> IndexFilter for Or<A, B> {
    fn accept(&self, k: usize) -> bool {
        self.0.accept(k) || self.1.accept(k)
    }
}

/// Logical NOT of a filter
#[derive(Debug, Clone, Copy)]
pub struct Not<A>(A);

impl<A: IndexFilter> IndexFilter for Not<A> {
    fn accept(&self, k: usize) -> bool {
        !self.0.accept(k)
    }
}

/// Combinators available on every sized filter.
pub trait IndexFilterExt: IndexFilter + Sized {
    fn and<B: IndexFilter>(self, other: B) -> And<Self, B> {
        And(self, other)
    }

    fn or<B: IndexFilter>(self, other: B) -> Or<Self, B> {
        Or(self, other)
    }

    fn not(self) -> Not<Self> {
        Not(self)
    }
}

impl<T: IndexFilter> IndexFilterExt for T {}
