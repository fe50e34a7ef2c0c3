use ndarray::Array3;
use serde::{Serialize, Deserialize};
use crate::error::Error;
use crate::execution::{self, ExecutionMode};




/**
 * A rectangular block of zone data with a fixed number of fields per zone.
 * The data is row-major with the field index varying fastest. The starting
 * indexes may be negative, which is how guard zones are expressed: a patch
 * holding two guard zones on each edge of an interior region with shape
 * (ni, nj) has start [-2, -2] and count [ni + 4, nj + 4], and the interior
 * zones keep their (i, j) labels. Zone data is then borrowed by global
 * index, so stenciled kernels read across the interior edge with no
 * conditionals.
 */
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Patch {
    start: [i64; 2],
    count: [usize; 2],
    num_fields: usize,
    data: Vec<f64>,
}




// ============================================================================
impl Patch {

    /**
     * Create a zero-filled patch with the given start, count, and number of
     * fields per zone.
     */
    pub fn zeros(start: [i64; 2], count: [usize; 2], num_fields: usize) -> Self {
        Self {
            start,
            count,
            num_fields,
            data: vec![0.0; count[0] * count[1] * num_fields],
        }
    }

    /**
     * Create a patch from a flat data vector, whose length must match the
     * given shape.
     */
    pub fn from_vec(start: [i64; 2], count: [usize; 2], num_fields: usize, data: Vec<f64>) -> Self {
        assert_eq!(data.len(), count[0] * count[1] * num_fields);
        Self {
            start,
            count,
            num_fields,
            data,
        }
    }

    /**
     * Create a patch by evaluating a function of the global zone index,
     * which writes the fields of that zone.
     */
    pub fn from_fn<F>(start: [i64; 2], count: [usize; 2], num_fields: usize, f: F) -> Self
    where
        F: Fn((i64, i64), &mut [f64]),
    {
        let mut patch = Self::zeros(start, count, num_fields);
        for i in start[0]..start[0] + count[0] as i64 {
            for j in start[1]..start[1] + count[1] as i64 {
                f((i, j), patch.get_slice_mut([i, j]))
            }
        }
        patch
    }

    pub fn start(&self) -> [i64; 2] {
        self.start
    }

    pub fn count(&self) -> [usize; 2] {
        self.count
    }

    pub fn num_fields(&self) -> usize {
        self.num_fields
    }

    /// Whether the patch has exactly the given start, count, and field count
    pub fn has_extent(&self, start: [i64; 2], count: [usize; 2], num_fields: usize) -> bool {
        self.start == start && self.count == count && self.num_fields == num_fields
    }

    pub fn contains(&self, index: [i64; 2]) -> bool {
        let i = index[0] - self.start[0];
        let j = index[1] - self.start[1];
        0 <= i && i < self.count[0] as i64 && 0 <= j && j < self.count[1] as i64
    }

    /// Whether this patch has the same field count as another patch and
    /// spans at least its index space
    pub fn covers(&self, other: &Patch) -> bool {
        let start = other.start;
        let count = other.count;
        self.num_fields == other.num_fields
            && self.contains(start)
            && self.contains([start[0] + count[0] as i64 - 1, start[1] + count[1] as i64 - 1])
    }

    /// The fields of the zone at a global index
    pub fn get_slice(&self, index: [i64; 2]) -> &[f64] {
        let n = self.offset(index);
        &self.data[n..n + self.num_fields]
    }

    pub fn get_slice_mut(&mut self, index: [i64; 2]) -> &mut [f64] {
        let n = self.offset(index);
        let num_fields = self.num_fields;
        &mut self.data[n..n + num_fields]
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.data.clone()
    }

    /// A copy of the patch data as an ndarray with shape (ni, nj, fields)
    pub fn to_array(&self) -> Array3<f64> {
        Array3::from_shape_vec((self.count[0], self.count[1], self.num_fields), self.data.clone()).unwrap()
    }

    /// Adopt an ndarray with shape (ni, nj, fields) as a patch
    pub fn from_array(start: [i64; 2], array: Array3<f64>) -> Self {
        let dim = array.dim();
        let array = if array.is_standard_layout() {
            array
        } else {
            Array3::from_shape_vec(dim, array.iter().cloned().collect()).unwrap()
        };
        Self {
            start,
            count: [dim.0, dim.1],
            num_fields: dim.2,
            data: array.into_raw_vec(),
        }
    }

    fn offset(&self, index: [i64; 2]) -> usize {
        let i = (index[0] - self.start[0]) as usize;
        let j = (index[1] - self.start[1]) as usize;
        (i * self.count[1] + j) * self.num_fields
    }

    /**
     * Apply a fallible kernel to each i-row of the patch, under the given
     * execution mode. The kernel receives the global i-index of the row and
     * the mutable row data, spanning all of the row's zones and fields.
     */
    pub(crate) fn try_for_each_row_mut<F>(&mut self, mode: ExecutionMode, f: F) -> Result<(), Error>
    where
        F: Fn(i64, &mut [f64]) -> Result<(), Error> + Send + Sync,
    {
        let row_len = self.count[1] * self.num_fields;
        let i0 = self.start[0];
        execution::try_for_each_chunk_mut(&mut self.data, row_len, mode, |n, row| {
            f(i0 + n as i64, row)
        })
    }
}




// ============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_indexing_respects_negative_start() {
        let patch = Patch::from_fn([-2, -2], [8, 8], 2, |(i, j), zone| {
            zone[0] = i as f64;
            zone[1] = j as f64;
        });
        assert_eq!(patch.get_slice([-2, -2]), &[-2.0, -2.0]);
        assert_eq!(patch.get_slice([0, 3]), &[0.0, 3.0]);
        assert_eq!(patch.get_slice([5, -1]), &[5.0, -1.0]);
    }

    #[test]
    fn patch_round_trips_through_ndarray() {
        let patch = Patch::from_fn([0, 0], [4, 5], 3, |(i, j), zone| {
            zone[0] = (i * j) as f64;
            zone[2] = 1.0;
        });
        let array = patch.to_array();
        assert_eq!(array[[2, 3, 0]], 6.0);
        let patch2 = Patch::from_array([0, 0], array);
        assert_eq!(patch.to_vec(), patch2.to_vec());
    }

    #[test]
    fn row_iteration_covers_the_patch() {
        let mut patch = Patch::zeros([-1, -1], [5, 4], 1, );
        patch.try_for_each_row_mut(ExecutionMode::CPU, |i, row| {
            for x in row.iter_mut() {
                *x = i as f64;
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(patch.get_slice([-1, 0]), &[-1.0]);
        assert_eq!(patch.get_slice([3, 2]), &[3.0]);
    }

    #[test]
    fn gpu_mode_is_reported_unavailable() {
        let mut patch = Patch::zeros([0, 0], [2, 2], 1);
        assert!(patch.try_for_each_row_mut(ExecutionMode::GPU, |_, _| Ok(())).is_err());
    }
}
