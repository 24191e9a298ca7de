pub use crate::counts::StateCounts;
pub use crate::error::{Error, Result};
pub use crate::filter::{filter_haplotypes, filter_sites};
pub use crate::matrix::{MatrixSnapshot, VariantMatrix};
pub use crate::ms::MsReader;
pub use crate::observable::{CsvBuilder, Records, SiteRecord, VariantSource};
pub use crate::polytable::{PolySites, PolyTable, SimData, GAP};
pub use crate::sites::{process_variable_sites, RefStates};
pub use crate::summstats::{NslStats, Summarize};
pub use crate::views::{ColView, ColViewMut, RowView, RowViewMut, SiteStates, StateView};
