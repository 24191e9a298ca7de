#![crate_name = "polyvar"]
//! Variation data for population genetics.
//!
//! A [`VariantMatrix`] stores allelic states as a flat `nsites x nsam`
//! buffer with one row per variable site. Rows and columns are reached
//! through borrowed views ([`RowView`], [`ColView`] and their mutable
//! twins), [`StateCounts`] tallies the states at a site, and
//! [`filter_sites`] / [`filter_haplotypes`] drop sites or samples in place.
//!
//! Sequence data lives in [`SimData`] and [`PolySites`] tables, which carry
//! the usual site-level quality filters through the [`PolyTable`] trait.
//!
//! ```
//! use polyvar::prelude::*;
//!
//! # fn main() -> polyvar::Result<()> {
//! let m = VariantMatrix::new(vec![0, 1, 1, 0], vec![0.1, 0.2])?;
//! assert_eq!(m.site(0)?.as_vec(), vec![0, 1]);
//!
//! let counts = process_variable_sites(&m, &RefStates::Absent)?;
//! assert_eq!(counts[0].n(), 2);
//! # Ok(())
//! # }
//! ```

pub mod prelude;

pub mod counts;
pub mod error;
pub mod filter;
pub mod matrix;
pub mod ms;
pub mod observable;
pub mod polytable;
pub mod sites;
pub mod summstats;
pub mod views;

pub use counts::StateCounts;
pub use error::{Error, Result};
pub use filter::{filter_haplotypes, filter_sites};
pub use matrix::{BufferView, MatrixSnapshot, VariantMatrix};
pub use polytable::{PolySites, PolyTable, SimData};
pub use sites::{process_variable_sites, RefStates};
pub use views::{ColView, ColViewMut, RowView, RowViewMut, StateView};
