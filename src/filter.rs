//! Predicate-driven removal of sites and samples from a [`VariantMatrix`].
//!
//! Both filters evaluate the predicate over every site (or sample) before
//! touching the matrix, then compact the survivors in place, keeping their
//! relative order. The predicate only ever sees immutable views, so it
//! cannot modify the matrix mid-pass.

use crate::matrix::VariantMatrix;
use crate::views::{ColView, RowView};
use log::debug;

/// Removes every site for which `predicate` returns `true`.
///
/// Returns the number of sites removed.
pub fn filter_sites<F>(matrix: &mut VariantMatrix, mut predicate: F) -> usize
where
    F: FnMut(RowView<'_>) -> bool,
{
    let remove: Vec<bool> = matrix.sites().map(&mut predicate).collect();
    let nremoved = remove.iter().filter(|&&r| r).count();
    if nremoved == 0 {
        return 0;
    }

    let nsam = matrix.nsam;
    let mut kept = 0;
    for (site, _) in remove.iter().enumerate().filter(|(_, r)| !**r) {
        if kept != site {
            matrix
                .data
                .copy_within(site * nsam..(site + 1) * nsam, kept * nsam);
            matrix.positions[kept] = matrix.positions[site];
        }
        kept += 1;
    }
    matrix.data.truncate(kept * nsam);
    matrix.positions.truncate(kept);
    matrix.nsites = kept;

    debug!("filter_sites removed {} of {} sites", nremoved, remove.len());
    nremoved
}

/// Removes every sample for which `predicate` returns `true`.
///
/// Positions are untouched. Returns the number of samples removed.
pub fn filter_haplotypes<F>(matrix: &mut VariantMatrix, mut predicate: F) -> usize
where
    F: FnMut(ColView<'_>) -> bool,
{
    let remove: Vec<bool> = matrix.samples().map(&mut predicate).collect();
    let nremoved = remove.iter().filter(|&&r| r).count();
    if nremoved == 0 {
        return 0;
    }

    // The write cursor never overtakes the read cursor, so a single forward
    // sweep over the row-major buffer compacts it in place.
    let nsam = matrix.nsam;
    let mut write = 0;
    for read in 0..matrix.data.len() {
        if !remove[read % nsam] {
            matrix.data[write] = matrix.data[read];
            write += 1;
        }
    }
    matrix.data.truncate(write);
    matrix.nsam = nsam - nremoved;

    debug!("filter_haplotypes removed {} of {} samples", nremoved, nsam);
    nremoved
}
