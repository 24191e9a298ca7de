use crate::error::{Error, Result};
use crate::observable::VariantSource;
use crate::views::{ColView, ColViewMut, RowView, RowViewMut};
use log::{debug, trace};
use ndarray::{ArrayView2, ArrayViewMut2};
use serde::{Deserialize, Serialize};

/// Variation data in matrix form.
///
/// Rows are variable sites and columns are samples. States are stored
/// row-major in one flat buffer, so `data.len() == nsites * nsam` and
/// `positions.len() == nsites` always hold.
#[derive(Clone, Debug)]
pub struct VariantMatrix {
    pub(crate) data: Vec<i8>,
    pub(crate) positions: Vec<f64>,
    pub(crate) nsites: usize,
    pub(crate) nsam: usize,
}

impl VariantMatrix {
    /// Reserved missing-data state. Never a countable allelic state.
    pub const MASK: i8 = i8::MAX;

    /// Constructs a matrix from flat row-major states and site positions.
    ///
    /// The number of samples is inferred as `data.len() / positions.len()`.
    pub fn new(data: Vec<i8>, positions: Vec<f64>) -> Result<Self> {
        if positions.is_empty() {
            if !data.is_empty() {
                return Err(Error::invalid_argument(
                    "cannot infer sample count: data is non-empty but there are no positions",
                ));
            }
            return Ok(Self::empty());
        }
        if data.len() % positions.len() != 0 {
            return Err(Error::invalid_argument(format!(
                "len(data) = {} is not a multiple of len(positions) = {}",
                data.len(),
                positions.len()
            )));
        }
        let nsam = data.len() / positions.len();
        Self::with_nsam(data, positions, nsam)
    }

    /// Constructs a matrix with an explicit sample count.
    pub fn with_nsam(data: Vec<i8>, positions: Vec<f64>, nsam: usize) -> Result<Self> {
        let nsites = positions.len();
        let expected = nsites.checked_mul(nsam).ok_or_else(|| {
            Error::invalid_argument(format!(
                "nsites ({}) * nsam ({}) overflows",
                nsites, nsam
            ))
        })?;
        if data.len() != expected {
            return Err(Error::invalid_argument(format!(
                "len(data) = {} does not equal nsites ({}) * nsam ({})",
                data.len(),
                nsites,
                nsam
            )));
        }
        debug!("VariantMatrix with {} sites and {} samples", nsites, nsam);
        Ok(Self {
            data,
            positions,
            nsites,
            nsam,
        })
    }

    /// Constructs a matrix from a 2-D array shaped `(nsites, nsam)`.
    pub fn from_array(data: ArrayView2<'_, i8>, positions: Vec<f64>) -> Result<Self> {
        let (rows, nsam) = data.dim();
        if rows != positions.len() {
            return Err(Error::invalid_argument(format!(
                "len(positions) = {} must equal data.shape[0] = {}",
                positions.len(),
                rows
            )));
        }
        // Logical iteration order is row-major whatever the array's memory order.
        Self::with_nsam(data.iter().copied().collect(), positions, nsam)
    }

    /// Fills a matrix from a per-site source, consuming it in order.
    pub fn from_source<S: VariantSource>(source: S) -> Result<Self> {
        let nsam = source.nsam();
        let nsites = source.nsites();
        let capacity = nsam.checked_mul(nsites).ok_or_else(|| {
            Error::invalid_argument(format!(
                "source declares {} sites of {} samples, which overflows",
                nsites, nsam
            ))
        })?;
        // Declared sizes are only a hint; the buffer grows as records arrive.
        let mut data = Vec::with_capacity(capacity.min(1 << 20));
        let mut positions = Vec::with_capacity(nsites.min(1 << 20));
        for record in source {
            let record = record?;
            if record.states.len() != nsam {
                return Err(Error::invalid_argument(format!(
                    "site at position {} has {} states, expected {}",
                    record.position,
                    record.states.len(),
                    nsam
                )));
            }
            trace!("ingesting site at position {}", record.position);
            data.extend_from_slice(&record.states);
            positions.push(record.position);
        }
        if positions.len() != nsites {
            return Err(Error::invalid_argument(format!(
                "source declared {} sites but yielded {}",
                nsites,
                positions.len()
            )));
        }
        Self::with_nsam(data, positions, nsam)
    }

    fn empty() -> Self {
        Self {
            data: vec![],
            positions: vec![],
            nsites: 0,
            nsam: 0,
        }
    }

    /// Flat row-major states.
    pub fn data(&self) -> &[i8] {
        &self.data
    }

    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    pub fn nsites(&self) -> usize {
        self.nsites
    }

    pub fn nsam(&self) -> usize {
        self.nsam
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// View of site `i`.
    pub fn site(&self, i: usize) -> Result<RowView<'_>> {
        Error::check_index(i, self.nsites)?;
        Ok(RowView::new(&self.data, i, self.nsam))
    }

    pub fn site_mut(&mut self, i: usize) -> Result<RowViewMut<'_>> {
        Error::check_index(i, self.nsites)?;
        Ok(RowViewMut::new(&mut self.data, i, self.nsam))
    }

    /// View of sample `j`.
    pub fn sample(&self, j: usize) -> Result<ColView<'_>> {
        Error::check_index(j, self.nsam)?;
        Ok(ColView::new(&self.data, j, self.nsites, self.nsam))
    }

    pub fn sample_mut(&mut self, j: usize) -> Result<ColViewMut<'_>> {
        Error::check_index(j, self.nsam)?;
        Ok(ColViewMut::new(&mut self.data, j, self.nsites, self.nsam))
    }

    /// Iterates over all sites in order.
    pub fn sites(&self) -> impl Iterator<Item = RowView<'_>> + '_ {
        (0..self.nsites).map(move |i| RowView::new(&self.data, i, self.nsam))
    }

    /// Iterates over all samples in order.
    pub fn samples(&self) -> impl Iterator<Item = ColView<'_>> + '_ {
        (0..self.nsam).map(move |j| ColView::new(&self.data, j, self.nsites, self.nsam))
    }

    /// The states as an `(nsites, nsam)` array view.
    pub fn array(&self) -> Result<ArrayView2<'_, i8>> {
        Ok(ArrayView2::from_shape((self.nsites, self.nsam), &self.data)?)
    }

    /// Mutable `(nsites, nsam)` array view. Writes land in the matrix.
    pub fn array_mut(&mut self) -> Result<ArrayViewMut2<'_, i8>> {
        Ok(ArrayViewMut2::from_shape(
            (self.nsites, self.nsam),
            &mut self.data,
        )?)
    }

    /// Describes the storage for external array tooling.
    pub fn buffer(&self) -> BufferView<'_, i8> {
        BufferView {
            data: &self.data,
            shape: vec![self.nsites, self.nsam],
            strides: vec![self.nsam, 1],
        }
    }

    /// Copies out the `(data, positions)` pair.
    pub fn snapshot(&self) -> MatrixSnapshot {
        MatrixSnapshot {
            data: self.data.clone(),
            positions: self.positions.clone(),
        }
    }

    /// Rebuilds a matrix from a snapshot.
    pub fn from_snapshot(snapshot: MatrixSnapshot) -> Result<Self> {
        Self::new(snapshot.data, snapshot.positions)
    }
}

/// Two matrices are equal when their states and positions are.
impl PartialEq for VariantMatrix {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data && self.positions == other.positions
    }
}

/// The `(data, positions)` pair a matrix round-trips through.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatrixSnapshot {
    pub data: Vec<i8>,
    pub positions: Vec<f64>,
}

impl TryFrom<MatrixSnapshot> for VariantMatrix {
    type Error = Error;

    fn try_from(snapshot: MatrixSnapshot) -> Result<Self> {
        Self::from_snapshot(snapshot)
    }
}

impl From<&VariantMatrix> for MatrixSnapshot {
    fn from(matrix: &VariantMatrix) -> Self {
        matrix.snapshot()
    }
}

/// Element types a [`BufferView`] can describe.
pub trait BufferElement: Copy {
    /// Struct-module style format character.
    const FORMAT: &'static str;
}

impl BufferElement for i8 {
    const FORMAT: &'static str = "b";
}

impl BufferElement for i32 {
    const FORMAT: &'static str = "i";
}

/// A borrowed description of a contiguous buffer: pointer, shape and
/// strides, valid for as long as its owner is borrowed.
#[derive(Clone, Debug)]
pub struct BufferView<'a, T: BufferElement> {
    data: &'a [T],
    shape: Vec<usize>,
    strides: Vec<usize>,
}

impl<'a, T: BufferElement> BufferView<'a, T> {
    pub(crate) fn one_dimensional(data: &'a [T]) -> Self {
        Self {
            data,
            shape: vec![data.len()],
            strides: vec![1],
        }
    }

    pub fn as_ptr(&self) -> *const T {
        self.data.as_ptr()
    }

    pub fn as_slice(&self) -> &'a [T] {
        self.data
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Strides in elements.
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Strides in bytes.
    pub fn byte_strides(&self) -> Vec<usize> {
        self.strides.iter().map(|s| s * self.itemsize()).collect()
    }

    pub fn itemsize(&self) -> usize {
        std::mem::size_of::<T>()
    }

    pub fn format(&self) -> &'static str {
        T::FORMAT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observable::{Records, SiteRecord};
    use crate::views::StateView;
    use ndarray::{array, Axis};
    use std::error::Error;

    #[test]
    fn test_construct_infers_nsam() -> std::result::Result<(), Box<dyn Error>> {
        let m = VariantMatrix::new(vec![0, 1, 1, 0, 0, 0, 0, 1], vec![0.1, 0.2])?;
        assert_eq!(m.nsam(), 4);
        assert_eq!(m.nsites(), 2);
        assert_eq!(m.positions(), &[0.1, 0.2]);
        assert_eq!(m.data().len(), m.nsites() * m.nsam());
        Ok(())
    }

    #[test]
    fn test_construct_rejects_ragged_data() {
        assert!(VariantMatrix::new(vec![0, 1, 1], vec![0.1, 0.2]).is_err());
        assert!(VariantMatrix::new(vec![0, 1], vec![]).is_err());
        assert!(VariantMatrix::with_nsam(vec![0, 1, 1, 0], vec![0.1], 3).is_err());
    }

    #[test]
    fn test_empty_matrix() -> std::result::Result<(), Box<dyn Error>> {
        let m = VariantMatrix::new(vec![], vec![])?;
        assert_eq!(m.nsites(), 0);
        assert_eq!(m.nsam(), 0);
        assert!(m.site(0).is_err());
        assert!(m.sample(0).is_err());
        Ok(())
    }

    #[test]
    fn test_from_array() -> std::result::Result<(), Box<dyn Error>> {
        let d = array![[0i8, 1, 1, 0], [0, 0, 0, 1]];
        let m = VariantMatrix::from_array(d.view(), vec![0.1, 0.2])?;
        let a = m.array()?;
        assert_eq!(a.sum_axis(Axis(0)), d.sum_axis(Axis(0)));
        assert_eq!(a.sum_axis(Axis(1)), d.sum_axis(Axis(1)));
        assert!(VariantMatrix::from_array(d.view(), vec![0.1]).is_err());
        Ok(())
    }

    #[test]
    fn test_from_array_in_fortran_order() -> std::result::Result<(), Box<dyn Error>> {
        let d = array![[0i8, 1], [2, 3], [4, 5]];
        let m = VariantMatrix::from_array(d.t(), vec![1.0, 2.0])?;
        assert_eq!(m.data(), &[0, 2, 4, 1, 3, 5]);
        Ok(())
    }

    #[test]
    fn test_snapshot_of_filtered_out_matrix() -> std::result::Result<(), Box<dyn Error>> {
        let m = VariantMatrix::with_nsam(vec![], vec![], 3)?;
        let restored = VariantMatrix::from_snapshot(m.snapshot())?;
        assert_eq!(restored, m);
        Ok(())
    }

    #[test]
    fn test_modify_through_array_view() -> std::result::Result<(), Box<dyn Error>> {
        let mut m = VariantMatrix::new(vec![0, 1, 1, 0, 0, 0, 0, 1], vec![0.1, 0.2])?;
        m.array_mut()?[[0, 2]] = 4;
        assert_eq!(m.site(0)?.get(2)?, 4);
        Ok(())
    }

    #[test]
    fn test_index_errors() -> std::result::Result<(), Box<dyn Error>> {
        let m = VariantMatrix::new(vec![0, 1, 1, 0], vec![0.1, 0.2])?;
        assert!(matches!(
            m.site(2),
            Err(crate::Error::Index { index: 2, len: 2 })
        ));
        assert!(m.sample(2).is_err());
        Ok(())
    }

    #[test]
    fn test_buffer_layout() -> std::result::Result<(), Box<dyn Error>> {
        let m = VariantMatrix::new(vec![0, 1, 1, 0, 0, 0], vec![0.1, 0.2])?;
        let b = m.buffer();
        assert_eq!(b.ndim(), 2);
        assert_eq!(b.shape(), &[2, 3]);
        assert_eq!(b.strides(), &[3, 1]);
        assert_eq!(b.byte_strides(), vec![3, 1]);
        assert_eq!(b.itemsize(), 1);
        assert_eq!(b.format(), "b");
        assert_eq!(b.as_ptr(), m.data().as_ptr());
        Ok(())
    }

    #[test]
    fn test_array_of_matrix_with_every_site_filtered() -> std::result::Result<(), Box<dyn Error>> {
        let mut m = VariantMatrix::new(vec![0, 1, 1, 0, 0, 0], vec![0.1, 0.2])?;
        crate::filter::filter_sites(&mut m, |_| true);
        assert_eq!((m.nsites(), m.nsam()), (0, 3));
        assert_eq!(m.array()?.dim(), (0, 3));
        assert_eq!(m.array_mut()?.dim(), (0, 3));

        let m = VariantMatrix::with_nsam(vec![], vec![0.1, 0.2], 0)?;
        assert_eq!(m.array()?.dim(), (2, 0));
        Ok(())
    }

    #[test]
    fn test_oversized_shapes_are_rejected() {
        assert!(matches!(
            VariantMatrix::with_nsam(vec![], vec![0.1, 0.2], usize::MAX),
            Err(crate::Error::InvalidArgument { .. })
        ));

        let one_site = Records::new(usize::MAX, vec![SiteRecord::new(0.1, vec![0])]);
        assert!(VariantMatrix::from_source(one_site).is_err());

        let two_sites = Records::new(
            usize::MAX,
            vec![SiteRecord::new(0.1, vec![0]), SiteRecord::new(0.2, vec![1])],
        );
        assert!(matches!(
            VariantMatrix::from_source(two_sites),
            Err(crate::Error::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_snapshot_through_json() -> std::result::Result<(), Box<dyn Error>> {
        let m = VariantMatrix::new(vec![0, 1, VariantMatrix::MASK, 0, 2, 1], vec![0.1, 0.2])?;
        let json = serde_json::to_string(&m.snapshot())?;
        let restored = VariantMatrix::from_snapshot(serde_json::from_str::<MatrixSnapshot>(&json)?)?;
        assert_eq!(restored, m);
        assert_eq!(restored.nsam(), 3);

        let mut emptied = m.clone();
        crate::filter::filter_sites(&mut emptied, |_| true);
        let json = serde_json::to_string(&MatrixSnapshot::from(&emptied))?;
        assert_eq!(json, r#"{"data":[],"positions":[]}"#);
        let restored = VariantMatrix::try_from(serde_json::from_str::<MatrixSnapshot>(&json)?)?;
        assert_eq!(restored, emptied);
        assert_eq!(restored.nsites(), 0);
        Ok(())
    }

    #[test]
    fn test_snapshot_round_trip() -> std::result::Result<(), Box<dyn Error>> {
        let m = VariantMatrix::new(vec![0, 1, 1, 0, 0, 0, 0, 1], vec![0.1, 0.2])?;
        let restored = VariantMatrix::try_from(m.snapshot())?;
        assert_eq!(restored, m);
        assert_eq!(restored.nsam(), m.nsam());
        Ok(())
    }
}
