use crate::counts::StateCounts;
use crate::error::{Error, Result};
use crate::matrix::VariantMatrix;
use log::debug;
use rayon::prelude::*;

/// Reference states handed to [`process_variable_sites`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum RefStates {
    /// No reference state at any site.
    #[default]
    Absent,
    /// The same reference state at every site.
    Scalar(i8),
    /// One reference state per site.
    PerSite(Vec<i8>),
}

impl RefStates {
    fn check(&self, nsites: usize) -> Result<()> {
        match self {
            RefStates::PerSite(states) if states.len() != nsites => {
                Err(Error::invalid_argument(format!(
                    "{} reference states given for {} sites",
                    states.len(),
                    nsites
                )))
            }
            _ => Ok(()),
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            RefStates::Absent => "no",
            RefStates::Scalar(_) => "scalar",
            RefStates::PerSite(_) => "per-site",
        }
    }

    fn at(&self, site: usize) -> Option<i8> {
        match self {
            RefStates::Absent => None,
            RefStates::Scalar(state) => Some(*state),
            RefStates::PerSite(states) => Some(states[site]),
        }
    }
}

impl From<i8> for RefStates {
    fn from(state: i8) -> Self {
        RefStates::Scalar(state)
    }
}

impl From<Vec<i8>> for RefStates {
    fn from(states: Vec<i8>) -> Self {
        RefStates::PerSite(states)
    }
}

impl From<Option<i8>> for RefStates {
    fn from(state: Option<i8>) -> Self {
        state.map_or(RefStates::Absent, RefStates::Scalar)
    }
}

/// Counts the states at every site of `matrix`, in site order.
///
/// Sites are independent and are counted in parallel.
pub fn process_variable_sites(
    matrix: &VariantMatrix,
    refstates: &RefStates,
) -> Result<Vec<StateCounts>> {
    refstates.check(matrix.nsites())?;
    debug!(
        "counting states at {} sites ({} reference)",
        matrix.nsites(),
        refstates.describe()
    );
    (0..matrix.nsites())
        .into_par_iter()
        .map(|i| -> Result<StateCounts> {
            let mut counts = match refstates.at(i) {
                Some(state) => StateCounts::with_refstate(state),
                None => StateCounts::new(),
            };
            counts.apply(&matrix.site(i)?)?;
            Ok(counts)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_no_reference_state() -> std::result::Result<(), Box<dyn Error>> {
        let m = VariantMatrix::new(vec![0, 1, 1, 0], vec![0.1, 0.2])?;
        let counts = process_variable_sites(&m, &RefStates::Absent)?;
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].get(0)?, 1);
        assert_eq!(counts[0].get(1)?, 1);
        assert_eq!(counts[0].n(), 2);
        assert!(counts.iter().all(|c| c.refstate().is_none()));
        Ok(())
    }

    #[test]
    fn test_scalar_reference_state() -> std::result::Result<(), Box<dyn Error>> {
        let m = VariantMatrix::new(vec![0, 1, 1, 0], vec![0.1, 0.2])?;
        let counts = process_variable_sites(&m, &RefStates::from(1i8))?;
        assert!(counts.iter().all(|c| c.refstate() == Some(1)));
        Ok(())
    }

    #[test]
    fn test_per_site_reference_states() -> std::result::Result<(), Box<dyn Error>> {
        let m = VariantMatrix::new(vec![0, 1, 1, 0, 2, 2], vec![0.1, 0.2, 0.3])?;
        let counts = process_variable_sites(&m, &RefStates::from(vec![0i8, 1, 2]))?;
        let refs: Vec<_> = counts.iter().map(|c| c.refstate()).collect();
        assert_eq!(refs, vec![Some(0), Some(1), Some(2)]);
        assert_eq!(counts[2].get(2)?, 2);
        Ok(())
    }

    #[test]
    fn test_per_site_length_mismatch() -> std::result::Result<(), Box<dyn Error>> {
        let m = VariantMatrix::new(vec![0, 1, 1, 0], vec![0.1, 0.2])?;
        let result = process_variable_sites(&m, &RefStates::PerSite(vec![0]));
        assert!(matches!(result, Err(crate::Error::InvalidArgument { .. })));
        Ok(())
    }

    #[test]
    fn test_bad_state_fails_whole_call() -> std::result::Result<(), Box<dyn Error>> {
        let m = VariantMatrix::new(vec![0, 1, -3, 0], vec![0.1, 0.2])?;
        assert!(process_variable_sites(&m, &RefStates::Absent).is_err());
        Ok(())
    }
}
