//! Classic summary statistics of a sample, computed from per-site state
//! counts, Garud's haplotype homozygosity statistics and the per-site
//! haplotype statistics nSL and iHS.

use crate::counts::StateCounts;
use crate::error::{Error, Result};
use crate::matrix::VariantMatrix;
use crate::polytable::{PolySites, PolyTable, SimData};
use crate::sites::{process_variable_sites, RefStates};
use crate::views::StateView;
use rayon::prelude::*;
use std::collections::HashMap;
use std::hash::Hash;

/// Summary of the site frequency spectrum.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassicSummary {
    pub thetapi: f64,
    pub thetaw: f64,
    pub thetah: f64,
    /// `None` when there are no segregating sites or fewer than four samples.
    pub tajimas_d: Option<f64>,
    pub num_poly: usize,
    pub num_singletons: usize,
    pub num_external_mutations: usize,
}

/// Garud et al.'s haplotype homozygosity statistics.
#[derive(Clone, Debug, PartialEq)]
pub struct GarudStats {
    pub h1: f64,
    pub h12: f64,
    pub h2h1: f64,
}

/// nSL and iHS at one core site.
///
/// Carriers of state `0` are ancestral and carriers of state `1` derived.
/// For every pair of carriers of the same state, the run of identical,
/// non-missing sites around the core is measured in sites (nSL) and in
/// distance (iHS). Runs stop at the ends of the data.
#[derive(Clone, Debug, PartialEq)]
pub struct NslStats {
    pub position: f64,
    pub derived_count: usize,
    /// `ln(SL_A / SL_D)`. `None` unless both states have two carriers.
    pub nsl: Option<f64>,
    /// `ln(iHH_A / iHH_D)`. Also `None` when either mean run has zero length.
    pub ihs: Option<f64>,
}

pub trait Summarize {
    /// Computes the classic statistics.
    ///
    /// Matrices and `SimData` take state `0` as ancestral. `PolySites` has
    /// no reference state, so the statistics that need one are zero; use
    /// [`PolySites::state_counts`] with an outgroup for those.
    fn classic_summary(&self) -> Result<ClassicSummary>;

    fn garud_stats(&self) -> Result<GarudStats>;
}

impl Summarize for VariantMatrix {
    fn classic_summary(&self) -> Result<ClassicSummary> {
        let counts = process_variable_sites(self, &RefStates::Scalar(0))?;
        Ok(classic_summary(&counts))
    }

    fn garud_stats(&self) -> Result<GarudStats> {
        garud_stats(self)
    }
}

impl Summarize for SimData {
    fn classic_summary(&self) -> Result<ClassicSummary> {
        VariantMatrix::try_from(self)?.classic_summary()
    }

    fn garud_stats(&self) -> Result<GarudStats> {
        garud_stats(&VariantMatrix::try_from(self)?)
    }
}

impl Summarize for PolySites {
    fn classic_summary(&self) -> Result<ClassicSummary> {
        Ok(classic_summary(&self.state_counts(None)?))
    }

    fn garud_stats(&self) -> Result<GarudStats> {
        haplotype_homozygosity(self.haplotypes().iter().map(|h| h.to_ascii_uppercase()))
    }
}

impl SimData {
    /// nSL and iHS at every site.
    pub fn nsl(&self) -> Result<Vec<NslStats>> {
        Ok(nsl(&VariantMatrix::try_from(self)?))
    }
}

pub fn classic_summary(counts: &[StateCounts]) -> ClassicSummary {
    ClassicSummary {
        thetapi: thetapi(counts),
        thetaw: thetaw(counts),
        thetah: thetah(counts),
        tajimas_d: tajimas_d(counts),
        num_poly: num_poly(counts),
        num_singletons: num_singletons(counts),
        num_external_mutations: num_external_mutations(counts),
    }
}

/// Number of segregating sites.
pub fn num_poly(counts: &[StateCounts]) -> usize {
    counts.iter().filter(|c| c.is_polymorphic()).count()
}

/// Mean pairwise differences, summed over sites.
pub fn thetapi(counts: &[StateCounts]) -> f64 {
    counts
        .iter()
        .filter(|c| c.n() > 1)
        .map(|c| {
            let n = c.n() as f64;
            let pairs: f64 = c
                .observed()
                .map(|(_, k)| k as f64 * (n - k as f64))
                .sum();
            pairs / (n * (n - 1.0))
        })
        .sum()
}

/// Watterson's estimator, using each site's own sample size.
pub fn thetaw(counts: &[StateCounts]) -> f64 {
    counts
        .iter()
        .filter(|c| c.is_polymorphic())
        .map(|c| 1.0 / harmonic(c.n() as usize))
        .sum()
}

/// Fay and Wu's estimator. Sites without a reference state are skipped.
pub fn thetah(counts: &[StateCounts]) -> f64 {
    counts
        .iter()
        .filter(|c| c.n() > 1)
        .filter_map(|c| c.refstate().map(|r| (c, r)))
        .map(|(c, r)| {
            let n = c.n() as f64;
            let derived: f64 = c
                .observed()
                .filter(|&(s, _)| s != r)
                .map(|(_, k)| 2.0 * (k as f64).powi(2))
                .sum();
            derived / (n * (n - 1.0))
        })
        .sum()
}

/// Tajima's D with the largest per-site sample size as `n`.
pub fn tajimas_d(counts: &[StateCounts]) -> Option<f64> {
    let s = num_poly(counts) as f64;
    let n = counts.iter().map(|c| c.n() as usize).max().unwrap_or(0);
    if s == 0.0 || n < 4 {
        return None;
    }

    let nf = n as f64;
    let a1 = harmonic(n);
    let a2: f64 = (1..n).map(|i| 1.0 / (i as f64).powi(2)).sum();
    let b1 = (nf + 1.0) / (3.0 * (nf - 1.0));
    let b2 = 2.0 * (nf * nf + nf + 3.0) / (9.0 * nf * (nf - 1.0));
    let c1 = b1 - 1.0 / a1;
    let c2 = b2 - (nf + 2.0) / (a1 * nf) + a2 / (a1 * a1);
    let e1 = c1 / a1;
    let e2 = c2 / (a1 * a1 + a2);

    Some((thetapi(counts) - s / a1) / (e1 * s + e2 * s * (s - 1.0)).sqrt())
}

/// States seen exactly once at a segregating site.
pub fn num_singletons(counts: &[StateCounts]) -> usize {
    counts
        .iter()
        .filter(|c| c.is_polymorphic())
        .map(|c| c.observed().filter(|&(_, k)| k == 1).count())
        .sum()
}

/// Derived states seen exactly once. Sites without a reference state are
/// skipped.
pub fn num_external_mutations(counts: &[StateCounts]) -> usize {
    counts
        .iter()
        .filter_map(|c| c.refstate().map(|r| (c, r)))
        .map(|(c, r)| c.observed().filter(|&(s, k)| s != r && k == 1).count())
        .sum()
}

/// H1, H12 and H2/H1 from the frequencies of distinct sample haplotypes.
pub fn garud_stats(matrix: &VariantMatrix) -> Result<GarudStats> {
    haplotype_homozygosity(matrix.samples().map(|sample| sample.as_vec()))
}

fn haplotype_homozygosity<I, H>(haplotypes: I) -> Result<GarudStats>
where
    I: IntoIterator<Item = H>,
    H: Eq + Hash,
{
    let mut haplotype_counts: HashMap<H, usize> = HashMap::new();
    for haplotype in haplotypes {
        *haplotype_counts.entry(haplotype).or_insert(0) += 1;
    }
    if haplotype_counts.is_empty() {
        return Err(Error::invalid_argument(
            "haplotype statistics need at least one sample",
        ));
    }
    let mut counts: Vec<usize> = haplotype_counts.into_values().collect();
    counts.sort_unstable_by(|a, b| b.cmp(a));

    let nsam = counts.iter().sum::<usize>() as f64;
    let freqs: Vec<f64> = counts.iter().map(|&c| c as f64 / nsam).collect();
    let h1: f64 = freqs.iter().map(|p| p * p).sum();
    let top_two: f64 = freqs.iter().take(2).sum();
    let h12 = top_two * top_two + freqs.iter().skip(2).map(|p| p * p).sum::<f64>();
    let h2 = h1 - freqs[0] * freqs[0];

    Ok(GarudStats {
        h1,
        h12,
        h2h1: h2 / h1,
    })
}

/// nSL and iHS at every site of `matrix`, in site order.
pub fn nsl(matrix: &VariantMatrix) -> Vec<NslStats> {
    (0..matrix.nsites())
        .into_par_iter()
        .map(|core| nsl_at(matrix, core))
        .collect()
}

fn nsl_at(matrix: &VariantMatrix, core: usize) -> NslStats {
    let nsam = matrix.nsam();
    let row = &matrix.data()[core * nsam..(core + 1) * nsam];
    let carriers = |state: i8| -> Vec<usize> { (0..nsam).filter(|&k| row[k] == state).collect() };
    let ancestral = carriers(0);
    let derived = carriers(1);

    let (nsl, ihs) = match (
        mean_shared_run(matrix, core, &ancestral),
        mean_shared_run(matrix, core, &derived),
    ) {
        (Some((sl_a, ihh_a)), Some((sl_d, ihh_d))) => {
            let ihs = if ihh_a > 0.0 && ihh_d > 0.0 {
                Some((ihh_a / ihh_d).ln())
            } else {
                None
            };
            (Some((sl_a / sl_d).ln()), ihs)
        }
        _ => (None, None),
    };

    NslStats {
        position: matrix.positions()[core],
        derived_count: derived.len(),
        nsl,
        ihs,
    }
}

/// Mean run length around `core` over all pairs of `carriers`, in sites and
/// in distance.
fn mean_shared_run(matrix: &VariantMatrix, core: usize, carriers: &[usize]) -> Option<(f64, f64)> {
    if carriers.len() < 2 {
        return None;
    }
    let nsam = matrix.nsam();
    let data = matrix.data();
    let positions = matrix.positions();
    let same = |site: usize, a: usize, b: usize| {
        let (x, y) = (data[site * nsam + a], data[site * nsam + b]);
        x == y && x != VariantMatrix::MASK
    };

    let (mut sites, mut distance, mut pairs) = (0.0, 0.0, 0.0);
    for (i, &a) in carriers.iter().enumerate() {
        for &b in &carriers[i + 1..] {
            let mut left = core;
            while left > 0 && same(left - 1, a, b) {
                left -= 1;
            }
            let mut right = core;
            while right + 1 < matrix.nsites() && same(right + 1, a, b) {
                right += 1;
            }
            sites += (right - left + 1) as f64;
            distance += positions[right] - positions[left];
            pairs += 1.0;
        }
    }
    Some((sites / pairs, distance / pairs))
}

fn harmonic(n: usize) -> f64 {
    (1..n).map(|i| 1.0 / i as f64).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn sample() -> crate::Result<SimData> {
        SimData::from_sites(vec![(0.1, "0001"), (0.2, "0011"), (0.3, "0111")])
    }

    #[test]
    fn test_classic_summary() -> std::result::Result<(), Box<dyn Error>> {
        let summary = sample()?.classic_summary()?;
        assert_eq!(summary.num_poly, 3);
        assert!(approx_eq(summary.thetapi, 5.0 / 3.0));
        assert!(approx_eq(summary.thetaw, 3.0 / (1.0 + 1.0 / 2.0 + 1.0 / 3.0)));
        assert!(approx_eq(summary.thetah, 7.0 / 3.0));
        assert!(approx_eq(summary.tajimas_d.ok_or("no D")?, 0.1676557950339481));
        assert_eq!(summary.num_singletons, 2);
        assert_eq!(summary.num_external_mutations, 1);
        Ok(())
    }

    #[test]
    fn test_monomorphic_data() -> std::result::Result<(), Box<dyn Error>> {
        let data = SimData::from_sites(vec![(0.1, "0000"), (0.2, "1111")])?;
        let summary = data.classic_summary()?;
        assert_eq!(summary.num_poly, 0);
        assert_eq!(summary.thetapi, 0.0);
        assert_eq!(summary.thetaw, 0.0);
        assert_eq!(summary.tajimas_d, None);
        // Fixed derived sites still count towards thetah.
        assert!(approx_eq(summary.thetah, 2.0 * 16.0 / 12.0));
        Ok(())
    }

    #[test]
    fn test_missing_data_shrinks_site_sample_size() -> std::result::Result<(), Box<dyn Error>> {
        let mask = VariantMatrix::MASK;
        let m = VariantMatrix::new(vec![0, 1, mask, mask], vec![0.5])?;
        let counts = process_variable_sites(&m, &RefStates::Absent)?;
        assert!(approx_eq(thetapi(&counts), 1.0));
        assert!(approx_eq(thetaw(&counts), 1.0));
        assert_eq!(thetah(&counts), 0.0);
        assert_eq!(num_external_mutations(&counts), 0);
        Ok(())
    }

    #[test]
    fn test_garud_distinct_haplotypes() -> std::result::Result<(), Box<dyn Error>> {
        let stats = sample()?.garud_stats()?;
        assert!(approx_eq(stats.h1, 0.25));
        assert!(approx_eq(stats.h12, 0.375));
        assert!(approx_eq(stats.h2h1, 0.75));
        Ok(())
    }

    #[test]
    fn test_garud_sweep_like() -> std::result::Result<(), Box<dyn Error>> {
        let m = VariantMatrix::new(vec![0, 0, 0, 1, 1, 1, 1, 0], vec![0.1, 0.2])?;
        let stats = m.garud_stats()?;
        assert!(approx_eq(stats.h1, 0.625));
        assert!(approx_eq(stats.h12, 1.0));
        assert!(approx_eq(stats.h2h1, 0.1));
        Ok(())
    }

    #[test]
    fn test_polysites_summary_after_filtering() -> std::result::Result<(), Box<dyn Error>> {
        let mut table = PolySites::from_sites(vec![
            (0.1, "AAGGA"),
            (0.2, "CCCTC"),
            (0.3, "GGGGG"),
            (0.4, "ANTTA"),
        ])?;
        assert_eq!(table.remove_mono(None)?, 1);

        let summary = table.classic_summary()?;
        assert_eq!(summary.num_poly, 3);
        assert_eq!(summary.num_singletons, 1);
        assert_eq!(summary.thetah, 0.0);
        assert_eq!(summary.num_external_mutations, 0);

        // The last sample is the outgroup.
        let counts = table.state_counts(Some(4))?;
        assert_eq!(counts[0].refstate(), Some(b'A' as i8));
        assert_eq!(counts[2].n(), 3);
        let summary = classic_summary(&counts);
        assert_eq!(summary.num_poly, 3);
        assert_eq!(summary.num_singletons, 2);
        assert_eq!(summary.num_external_mutations, 1);
        assert!(approx_eq(summary.thetapi, 11.0 / 6.0));

        let stats = table.garud_stats()?;
        assert!(approx_eq(stats.h1, 0.28));
        assert!(table.state_counts(Some(5)).is_err());
        Ok(())
    }

    #[test]
    fn test_nsl_has_one_entry_per_site() -> std::result::Result<(), Box<dyn Error>> {
        let data = SimData::from_sites(vec![
            (0.1, "01010101"),
            (0.2, "01111111"),
            (0.3, "00011101"),
            (0.4, "11111000"),
            (0.5, "01010101"),
            (0.6, "00001111"),
        ])?;
        let stats = data.nsl()?;
        assert_eq!(stats.len(), data.numsites());
        assert_eq!(stats[0].position, 0.1);
        assert_eq!(stats[0].derived_count, 4);
        assert!(approx_eq(stats[0].nsl.ok_or("no nSL")?, (5.0f64 / 9.0).ln()));
        assert!(approx_eq(stats[0].ihs.ok_or("no iHS")?, (1.0f64 / 3.0).ln()));
        Ok(())
    }

    #[test]
    fn test_nsl_needs_two_carriers_of_each_state() -> std::result::Result<(), Box<dyn Error>> {
        let m = VariantMatrix::new(vec![0, 0, 0, 1, 0, 0, 1, 1], vec![0.1, 0.2])?;
        let stats = nsl(&m);
        assert_eq!(stats[0].nsl, None);
        assert_eq!(stats[0].derived_count, 1);
        assert!(approx_eq(stats[1].nsl.ok_or("no nSL")?, 2.0f64.ln()));
        // The derived pair shares only the core site.
        assert_eq!(stats[1].ihs, None);
        Ok(())
    }

    #[test]
    fn test_garud_needs_samples() -> std::result::Result<(), Box<dyn Error>> {
        let m = VariantMatrix::with_nsam(vec![], vec![0.1], 0)?;
        assert!(garud_stats(&m).is_err());
        Ok(())
    }
}
