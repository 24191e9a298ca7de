//! Sequence tables: one haplotype string per sample and one position per
//! site.
//!
//! [`SimData`] holds `0`/`1` data from simulations, [`PolySites`] holds
//! nucleotide data. Both implement the sealed [`PolyTable`] trait, which
//! carries the accessors and the site-level filters. Every filter works in
//! place and drops a site from the position list and from every haplotype
//! together, so the table never ends up ragged.

use crate::counts::StateCounts;
use crate::error::{Error, Result};
use crate::matrix::VariantMatrix;
use log::debug;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Default gap character for [`PolyTable::remove_gaps`].
pub const GAP: char = '-';

/// Missing data in a sequence table.
pub const MISSING: char = 'N';

const VALID: &[u8] = b"ACGTN-01";

mod sealed {
    use super::*;

    /// Storage shared by every table type.
    #[derive(Clone, Debug, Default, PartialEq)]
    pub struct TableData {
        pub positions: Vec<f64>,
        pub haplotypes: Vec<String>,
    }

    pub trait Sealed {
        fn table(&self) -> &TableData;
        fn table_mut(&mut self) -> &mut TableData;
    }

    impl TableData {
        /// Builds from positions and one string per sample.
        pub fn from_haplotypes<I, S>(positions: Vec<f64>, haplotypes: I) -> Result<Self>
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            let haplotypes: Vec<String> = haplotypes.into_iter().map(Into::into).collect();
            for (i, hap) in haplotypes.iter().enumerate() {
                if !hap.is_ascii() {
                    return Err(Error::invalid_argument(format!(
                        "haplotype {} contains non-ASCII characters",
                        i
                    )));
                }
                if hap.len() != positions.len() {
                    return Err(Error::invalid_argument(format!(
                        "haplotype {} has {} sites but there are {} positions",
                        i,
                        hap.len(),
                        positions.len()
                    )));
                }
            }
            Ok(Self {
                positions,
                haplotypes,
            })
        }

        /// Builds from `(position, site)` pairs, where character `k` of each
        /// site string is sample `k`'s state.
        pub fn from_sites<I, S>(sites: I) -> Result<Self>
        where
            I: IntoIterator<Item = (f64, S)>,
            S: AsRef<str>,
        {
            let mut positions = vec![];
            let mut haplotypes: Vec<String> = vec![];
            for (i, (position, site)) in sites.into_iter().enumerate() {
                let site = site.as_ref();
                if !site.is_ascii() {
                    return Err(Error::invalid_argument(format!(
                        "site {} contains non-ASCII characters",
                        i
                    )));
                }
                if i == 0 {
                    haplotypes = vec![String::new(); site.len()];
                } else if site.len() != haplotypes.len() {
                    return Err(Error::invalid_argument(format!(
                        "site {} has {} samples, expected {}",
                        i,
                        site.len(),
                        haplotypes.len()
                    )));
                }
                for (hap, state) in haplotypes.iter_mut().zip(site.chars()) {
                    hap.push(state);
                }
                positions.push(position);
            }
            Ok(Self {
                positions,
                haplotypes,
            })
        }

        pub fn check(&self) -> Result<()> {
            match self
                .haplotypes
                .iter()
                .position(|h| h.len() != self.positions.len())
            {
                Some(i) => Err(Error::invalid_state(format!(
                    "haplotype {} has {} sites but the table has {} positions",
                    i,
                    self.haplotypes[i].len(),
                    self.positions.len()
                ))),
                None => Ok(()),
            }
        }

        pub fn check_outgroup(&self, outgroup: Option<usize>) -> Result<()> {
            match outgroup {
                Some(o) => Error::check_index(o, self.haplotypes.len()),
                None => Ok(()),
            }
        }

        /// Upper-cased states at `site`, skipping the outgroup.
        pub fn column(&self, site: usize, outgroup: Option<usize>) -> impl Iterator<Item = u8> + '_ {
            self.haplotypes
                .iter()
                .enumerate()
                .filter(move |(k, _)| Some(*k) != outgroup)
                .map(move |(_, h)| h.as_bytes()[site].to_ascii_uppercase())
        }

        /// Drops every site for which `remove` is `true`. Decisions are all
        /// made before anything is dropped.
        pub fn remove_sites<F>(&mut self, mut remove: F) -> Result<usize>
        where
            F: FnMut(&Self, usize) -> bool,
        {
            self.check()?;
            let this: &Self = self;
            let flags: Vec<bool> = (0..this.positions.len()).map(|i| remove(this, i)).collect();
            let nremoved = flags.iter().filter(|&&r| r).count();
            if nremoved == 0 {
                return Ok(0);
            }

            let mut site = 0;
            self.positions.retain(|_| {
                site += 1;
                !flags[site - 1]
            });
            for hap in self.haplotypes.iter_mut() {
                let mut site = 0;
                hap.retain(|_| {
                    site += 1;
                    !flags[site - 1]
                });
            }
            Ok(nremoved)
        }
    }
}

use sealed::{Sealed, TableData};

/// Operations shared by [`SimData`] and [`PolySites`].
///
/// The trait is sealed: there is no table type besides those two.
pub trait PolyTable: Sealed {
    /// Number of samples.
    fn size(&self) -> usize {
        self.table().haplotypes.len()
    }

    fn numsites(&self) -> usize {
        self.table().positions.len()
    }

    fn is_empty(&self) -> bool {
        self.table().haplotypes.is_empty()
    }

    fn positions(&self) -> &[f64] {
        &self.table().positions
    }

    fn position(&self, site: usize) -> Result<f64> {
        Error::check_index(site, self.numsites())?;
        Ok(self.table().positions[site])
    }

    fn haplotypes(&self) -> &[String] {
        &self.table().haplotypes
    }

    fn haplotype(&self, sample: usize) -> Result<&str> {
        Error::check_index(sample, self.size())?;
        Ok(&self.table().haplotypes[sample])
    }

    /// The states of every sample at `site`, as a string.
    fn site(&self, site: usize) -> Result<String> {
        Error::check_index(site, self.numsites())?;
        Ok(self
            .table()
            .haplotypes
            .iter()
            .map(|h| h.as_bytes()[site] as char)
            .collect())
    }

    /// `true` when every character is one of `ACGTN-01`, in either case.
    fn is_valid(&self) -> bool {
        self.table()
            .haplotypes
            .iter()
            .flat_map(|h| h.bytes())
            .all(|c| VALID.contains(&c.to_ascii_uppercase()))
    }

    /// Removes every site where any sample has `gapchar`.
    fn remove_gaps(&mut self, gapchar: char) -> Result<usize> {
        let nremoved = self
            .table_mut()
            .remove_sites(|t, site| t.haplotypes.iter().any(|h| h[site..].starts_with(gapchar)))?;
        debug!("remove_gaps dropped {} sites", nremoved);
        Ok(nremoved)
    }

    /// Removes sites where the samples, minus the outgroup if given, show a
    /// single character.
    fn remove_mono(&mut self, outgroup: Option<usize>) -> Result<usize> {
        self.table().check_outgroup(outgroup)?;
        let nremoved = self.table_mut().remove_sites(|t, site| {
            t.column(site, outgroup).collect::<BTreeSet<_>>().len() == 1
        })?;
        debug!("remove_mono dropped {} sites", nremoved);
        Ok(nremoved)
    }

    /// Removes sites whose minor allele count is at most `mincount`.
    ///
    /// With an outgroup the derived allele count is used instead: the
    /// number of other samples whose state differs from the outgroup's.
    /// Missing data and gaps are not counted. If the outgroup itself is
    /// missing at a site, the minor allele count is used for that site.
    fn freq_filter(&mut self, mincount: u32, outgroup: Option<usize>) -> Result<usize> {
        self.table().check_outgroup(outgroup)?;
        let nremoved = self.table_mut().remove_sites(|t, site| {
            let mut counts: BTreeMap<u8, u32> = BTreeMap::new();
            for state in t.column(site, outgroup).filter(|&c| is_observed(c)) {
                *counts.entry(state).or_insert(0) += 1;
            }
            let n: u32 = counts.values().sum();
            let ancestral = outgroup
                .map(|o| t.haplotypes[o].as_bytes()[site].to_ascii_uppercase())
                .filter(|&c| is_observed(c));
            let count = match ancestral {
                Some(a) => n - counts.get(&a).copied().unwrap_or(0),
                None => n - counts.values().copied().max().unwrap_or(0),
            };
            count <= mincount
        })?;
        debug!("freq_filter(mincount = {}) dropped {} sites", mincount, nremoved);
        Ok(nremoved)
    }

    /// Removes sites where any considered sample is missing (`N`).
    fn remove_missing(&mut self, outgroup: Option<usize>) -> Result<usize> {
        self.table().check_outgroup(outgroup)?;
        let nremoved = self
            .table_mut()
            .remove_sites(|t, site| t.column(site, outgroup).any(|c| c == MISSING as u8))?;
        debug!("remove_missing dropped {} sites", nremoved);
        Ok(nremoved)
    }

    /// Removes sites with more than two observed states. Missing data and
    /// gaps are not states.
    fn remove_multi_hits(&mut self, outgroup: Option<usize>) -> Result<usize> {
        self.table().check_outgroup(outgroup)?;
        let nremoved = self.table_mut().remove_sites(|t, site| {
            t.column(site, outgroup)
                .filter(|&c| is_observed(c))
                .collect::<BTreeSet<_>>()
                .len()
                > 2
        })?;
        debug!("remove_multi_hits dropped {} sites", nremoved);
        Ok(nremoved)
    }

    /// Removes sites where a considered sample has a character outside
    /// `ACGTN01-`.
    fn remove_ambiguous(&mut self, outgroup: Option<usize>) -> Result<usize> {
        self.table().check_outgroup(outgroup)?;
        let nremoved = self
            .table_mut()
            .remove_sites(|t, site| t.column(site, outgroup).any(|c| !VALID.contains(&c)))?;
        debug!("remove_ambiguous dropped {} sites", nremoved);
        Ok(nremoved)
    }
}

fn is_observed(c: u8) -> bool {
    c != MISSING as u8 && c != GAP as u8
}

/// Binary data from a simulation: `0` ancestral, `1` derived, `N` missing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SimData {
    table: TableData,
}

/// Nucleotide polymorphism data.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PolySites {
    table: TableData,
}

impl SimData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds from positions and one haplotype per sample.
    pub fn from_haplotypes<I, S>(positions: Vec<f64>, haplotypes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::checked(TableData::from_haplotypes(positions, haplotypes)?)
    }

    /// Builds from `(position, states)` pairs, one pair per site.
    pub fn from_sites<I, S>(sites: I) -> Result<Self>
    where
        I: IntoIterator<Item = (f64, S)>,
        S: AsRef<str>,
    {
        Self::checked(TableData::from_sites(sites)?)
    }

    fn checked(table: TableData) -> Result<Self> {
        if let Some(c) = table
            .haplotypes
            .iter()
            .flat_map(|h| h.chars())
            .find(|c| !matches!(c, '0' | '1' | 'N' | 'n'))
        {
            return Err(Error::invalid_argument(format!(
                "{:?} is not a valid SimData state",
                c
            )));
        }
        Ok(Self { table })
    }
}

impl PolySites {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds from positions and one haplotype per sample.
    pub fn from_haplotypes<I, S>(positions: Vec<f64>, haplotypes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self {
            table: TableData::from_haplotypes(positions, haplotypes)?,
        })
    }

    /// Builds from `(position, states)` pairs, one pair per site.
    pub fn from_sites<I, S>(sites: I) -> Result<Self>
    where
        I: IntoIterator<Item = (f64, S)>,
        S: AsRef<str>,
    {
        Ok(Self {
            table: TableData::from_sites(sites)?,
        })
    }

    /// Tallies the nucleotides at every site.
    ///
    /// Each upper-cased character is counted under its ASCII code; `N` and
    /// gaps are missing data. With an outgroup, that sample is left out of
    /// the tally and its character becomes the site's reference state,
    /// unless it is itself missing there.
    pub fn state_counts(&self, outgroup: Option<usize>) -> Result<Vec<StateCounts>> {
        let table = self.table();
        table.check()?;
        table.check_outgroup(outgroup)?;

        let nsam = table.haplotypes.len() - usize::from(outgroup.is_some());
        let mut states = Vec::with_capacity(nsam * table.positions.len());
        for site in 0..table.positions.len() {
            states.extend(table.column(site, outgroup).map(nucleotide_state));
        }
        let matrix = VariantMatrix::with_nsam(states, table.positions.clone(), nsam)?;

        matrix
            .sites()
            .enumerate()
            .map(|(site, states)| {
                let reference = outgroup
                    .map(|o| nucleotide_state(table.haplotypes[o].as_bytes()[site].to_ascii_uppercase()))
                    .filter(|&s| s != VariantMatrix::MASK);
                let mut counts = reference.map_or_else(StateCounts::new, StateCounts::with_refstate);
                counts.apply(&states)?;
                Ok(counts)
            })
            .collect()
    }
}

fn nucleotide_state(c: u8) -> i8 {
    if is_observed(c) && c < VariantMatrix::MASK as u8 {
        c as i8
    } else {
        VariantMatrix::MASK
    }
}

impl Sealed for SimData {
    fn table(&self) -> &TableData {
        &self.table
    }

    fn table_mut(&mut self) -> &mut TableData {
        &mut self.table
    }
}

impl Sealed for PolySites {
    fn table(&self) -> &TableData {
        &self.table
    }

    fn table_mut(&mut self) -> &mut TableData {
        &mut self.table
    }
}

impl PolyTable for SimData {}
impl PolyTable for PolySites {}

/// `0` and `1` become states 0 and 1, `N` becomes [`VariantMatrix::MASK`].
impl TryFrom<&SimData> for VariantMatrix {
    type Error = Error;

    fn try_from(data: &SimData) -> Result<Self> {
        let nsam = data.size();
        let mut states = Vec::with_capacity(nsam * data.numsites());
        for site in 0..data.numsites() {
            for hap in data.haplotypes() {
                states.push(match hap.as_bytes()[site] {
                    b'0' => 0,
                    b'1' => 1,
                    b'N' | b'n' => VariantMatrix::MASK,
                    c => {
                        return Err(Error::invalid_argument(format!(
                            "{:?} is not a valid SimData state",
                            c as char
                        )))
                    }
                });
            }
        }
        VariantMatrix::with_nsam(states, data.positions().to_vec(), nsam)
    }
}

/// Writes the table as one `ms` replicate.
impl fmt::Display for SimData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "//")?;
        writeln!(f, "segsites: {}", self.numsites())?;
        if self.numsites() > 0 {
            write!(f, "positions:")?;
            for p in self.positions() {
                write!(f, " {}", p)?;
            }
            writeln!(f)?;
            for hap in self.haplotypes() {
                writeln!(f, "{}", hap)?;
            }
        }
        Ok(())
    }
}
