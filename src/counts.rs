use crate::error::{Error, Result};
use crate::matrix::{BufferView, VariantMatrix};
use crate::views::SiteStates;

/// Number of countable allelic states: `0..MASK`.
pub const NUM_STATES: usize = VariantMatrix::MASK as usize;

/// Tally of the allelic states observed at a site.
///
/// Missing data (`VariantMatrix::MASK`) is skipped, so `n` is the number of
/// non-missing observations and always equals the sum of `counts`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateCounts {
    counts: Vec<i32>,
    refstate: Option<i8>,
    n: u32,
}

impl Default for StateCounts {
    fn default() -> Self {
        Self::new()
    }
}

impl StateCounts {
    /// Empty counts with no reference state.
    pub fn new() -> Self {
        Self {
            counts: vec![0; NUM_STATES],
            refstate: None,
            n: 0,
        }
    }

    /// Empty counts with `refstate` as the reference state.
    pub fn with_refstate(refstate: i8) -> Self {
        Self {
            refstate: Some(refstate),
            ..Self::new()
        }
    }

    /// Adds the states of `site` to the tally.
    ///
    /// Every state is checked before any slot is incremented, so an
    /// out-of-range state leaves the counts untouched.
    pub fn apply<V: SiteStates>(&mut self, site: &V) -> Result<()> {
        // MASK is i8::MAX, so every other non-negative code is countable.
        if let Some(value) = site.iter().find(|&s| s < 0) {
            return Err(Error::OutOfRange {
                value,
                max: NUM_STATES,
            });
        }
        for state in site.iter().filter(|&s| s != VariantMatrix::MASK) {
            self.counts[state as usize] += 1;
            self.n += 1;
        }
        Ok(())
    }

    /// Resets counts and `n`, keeping the reference state.
    pub fn clear(&mut self) {
        self.counts.iter_mut().for_each(|c| *c = 0);
        self.n = 0;
    }

    pub fn counts(&self) -> &[i32] {
        &self.counts
    }

    pub fn refstate(&self) -> Option<i8> {
        self.refstate
    }

    /// Number of non-missing observations.
    pub fn n(&self) -> u32 {
        self.n
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn get(&self, i: usize) -> Result<i32> {
        Error::check_index(i, self.counts.len())?;
        Ok(self.counts[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.counts.iter().copied()
    }

    /// `(state, count)` for every state seen at least once.
    pub fn observed(&self) -> impl Iterator<Item = (i8, i32)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, c)| **c > 0)
            .map(|(s, c)| (s as i8, *c))
    }

    /// Number of distinct states seen.
    pub fn nstates(&self) -> usize {
        self.counts.iter().filter(|&&c| c > 0).count()
    }

    pub fn is_polymorphic(&self) -> bool {
        self.nstates() > 1
    }

    /// Describes the count buffer for external array tooling.
    pub fn buffer(&self) -> BufferView<'_, i32> {
        BufferView::one_dimensional(&self.counts)
    }
}
