//! Zero-copy row and column views over a [`VariantMatrix`](crate::VariantMatrix).
//!
//! A row view covers one site across all samples and is contiguous. A
//! column view covers one sample across all sites and steps through the
//! flat buffer with a stride of `nsam`. Views borrow the matrix, so the
//! borrow checker refuses to let one outlive a filtering pass.

use crate::error::{Error, Result};

/// Iterator over the states of a view.
///
/// Created by [`StateView::iter`]. Each call to `iter` starts over, so a view
/// can be walked any number of times.
#[derive(Clone, Debug)]
pub struct States<'a> {
    data: &'a [i8],
    next: usize,
    stride: usize,
    remaining: usize,
}

impl<'a> Iterator for States<'a> {
    type Item = i8;

    fn next(&mut self) -> Option<i8> {
        if self.remaining == 0 {
            return None;
        }
        let state = self.data[self.next];
        self.next += self.stride;
        self.remaining -= 1;
        Some(state)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a> ExactSizeIterator for States<'a> {}

/// Read access shared by all four view types.
pub trait StateView {
    /// Number of elements along the view's axis.
    fn size(&self) -> usize;

    /// The state at position `i` of the view.
    fn get(&self, i: usize) -> Result<i8>;

    /// Lazily walks the view.
    fn iter(&self) -> States<'_>;

    /// Copies the view into an owned vector, detached from the matrix.
    fn as_vec(&self) -> Vec<i8> {
        self.iter().collect()
    }
}

/// Marker for views that cover a single site.
///
/// [`StateCounts`](crate::StateCounts) only tallies site views.
pub trait SiteStates: StateView {}

macro_rules! impl_state_view {
    ($view:ident) => {
        impl<'a> StateView for $view<'a> {
            fn size(&self) -> usize {
                self.len
            }

            fn get(&self, i: usize) -> Result<i8> {
                Error::check_index(i, self.len)?;
                Ok(self.data[self.start + i * self.stride])
            }

            fn iter(&self) -> States<'_> {
                States {
                    data: &self.data[..],
                    next: self.start,
                    stride: self.stride,
                    remaining: self.len,
                }
            }
        }

        impl<'a, 'v> IntoIterator for &'v $view<'a> {
            type Item = i8;
            type IntoIter = States<'v>;

            fn into_iter(self) -> States<'v> {
                self.iter()
            }
        }

        impl<'a> PartialEq<[i8]> for $view<'a> {
            fn eq(&self, other: &[i8]) -> bool {
                self.len == other.len() && self.iter().eq(other.iter().copied())
            }
        }
    };
}

macro_rules! impl_view_mut {
    ($view:ident, $frozen:ident) => {
        impl<'a> $view<'a> {
            /// Writes `state` at position `i`. The write lands directly in the
            /// matrix buffer.
            pub fn set(&mut self, i: usize, state: i8) -> Result<()> {
                Error::check_index(i, self.len)?;
                self.data[self.start + i * self.stride] = state;
                Ok(())
            }

            /// Reborrows as an immutable view.
            pub fn as_view(&self) -> $frozen<'_> {
                $frozen {
                    data: &self.data[..],
                    start: self.start,
                    stride: self.stride,
                    len: self.len,
                }
            }
        }
    };
}

/// Immutable view of one site.
#[derive(Clone, Copy, Debug)]
pub struct RowView<'a> {
    data: &'a [i8],
    start: usize,
    stride: usize,
    len: usize,
}

/// Mutable view of one site.
#[derive(Debug)]
pub struct RowViewMut<'a> {
    data: &'a mut [i8],
    start: usize,
    stride: usize,
    len: usize,
}

/// Immutable view of one sample.
#[derive(Clone, Copy, Debug)]
pub struct ColView<'a> {
    data: &'a [i8],
    start: usize,
    stride: usize,
    len: usize,
}

/// Mutable view of one sample.
#[derive(Debug)]
pub struct ColViewMut<'a> {
    data: &'a mut [i8],
    start: usize,
    stride: usize,
    len: usize,
}

impl<'a> RowView<'a> {
    pub(crate) fn new(data: &'a [i8], site: usize, nsam: usize) -> Self {
        Self {
            data,
            start: site * nsam,
            stride: 1,
            len: nsam,
        }
    }

    /// The site's states as a contiguous slice.
    pub fn as_slice(&self) -> &'a [i8] {
        &self.data[self.start..self.start + self.len]
    }
}

impl<'a> RowViewMut<'a> {
    pub(crate) fn new(data: &'a mut [i8], site: usize, nsam: usize) -> Self {
        Self {
            data,
            start: site * nsam,
            stride: 1,
            len: nsam,
        }
    }
}

impl<'a> ColView<'a> {
    pub(crate) fn new(data: &'a [i8], sample: usize, nsites: usize, nsam: usize) -> Self {
        Self {
            data,
            start: sample,
            stride: nsam,
            len: nsites,
        }
    }
}

impl<'a> ColViewMut<'a> {
    pub(crate) fn new(data: &'a mut [i8], sample: usize, nsites: usize, nsam: usize) -> Self {
        Self {
            data,
            start: sample,
            stride: nsam,
            len: nsites,
        }
    }
}

impl_state_view!(RowView);
impl_state_view!(RowViewMut);
impl_state_view!(ColView);
impl_state_view!(ColViewMut);

impl_view_mut!(RowViewMut, RowView);
impl_view_mut!(ColViewMut, ColView);

impl<'a> SiteStates for RowView<'a> {}
impl<'a> SiteStates for RowViewMut<'a> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VariantMatrix;
    use std::error::Error;

    fn matrix() -> Result<VariantMatrix> {
        VariantMatrix::new(vec![0, 1, 1, 0, 0, 0, 0, 1], vec![0.1, 0.2])
    }

    #[test]
    fn test_rows_are_contiguous() -> std::result::Result<(), Box<dyn Error>> {
        let m = matrix()?;
        let row = m.site(1)?;
        assert_eq!(row.size(), 4);
        assert_eq!(row.as_slice(), &[0, 0, 0, 1]);
        assert_eq!(row.as_vec(), vec![0, 0, 0, 1]);
        Ok(())
    }

    #[test]
    fn test_columns_step_by_nsam() -> std::result::Result<(), Box<dyn Error>> {
        let m = matrix()?;
        let col = m.sample(3)?;
        assert_eq!(col.size(), 2);
        assert_eq!(col.as_vec(), vec![0, 1]);
        assert_eq!(col.get(1)?, 1);
        assert!(col.get(2).is_err());
        Ok(())
    }

    #[test]
    fn test_views_restart() -> std::result::Result<(), Box<dyn Error>> {
        let m = matrix()?;
        let col = m.sample(1)?;
        let first: Vec<i8> = col.iter().collect();
        let second: Vec<i8> = (&col).into_iter().collect();
        assert_eq!(first, second);
        assert_eq!(col.iter().len(), 2);
        Ok(())
    }

    #[test]
    fn test_mutable_views_alias_the_matrix() -> std::result::Result<(), Box<dyn Error>> {
        let mut m = matrix()?;
        m.site_mut(0)?.set(2, 4)?;
        assert_eq!(m.data()[2], 4);

        let mut col = m.sample_mut(3)?;
        col.set(0, 5)?;
        assert!(col.set(2, 5).is_err());
        assert_eq!(col.as_view().as_vec(), vec![5, 1]);
        assert_eq!(m.site(0)?.as_vec(), vec![0, 1, 4, 5]);
        Ok(())
    }

    #[test]
    fn test_view_equals_slice() -> std::result::Result<(), Box<dyn Error>> {
        let m = matrix()?;
        assert!(m.site(0)? == [0i8, 1, 1, 0][..]);
        assert!(m.sample(0)? != [0i8][..]);
        Ok(())
    }
}
