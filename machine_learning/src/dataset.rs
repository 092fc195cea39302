use std::num::NonZeroUsize;

use ndarray::{ArrayView2, Axis};
use rand::{Rng, seq::SliceRandom};

use crate::{MlErr, Result};

/// An in-memory labeled dataset.
///
/// Every row holds `x_size` features followed by `y_size` targets, all rows are stored
/// contiguously.
#[derive(Debug, Clone)]
pub struct Dataset {
    data: Vec<f32>,
    x_size: usize,
    y_size: usize,
}

impl Dataset {
    /// Creates a new `Dataset`.
    ///
    /// # Arguments
    /// * `data` - The row-major samples.
    /// * `x_size` - The amount of features per row.
    /// * `y_size` - The amount of targets per row.
    ///
    /// # Returns
    /// The dataset, or an error if `data` doesn't hold a whole number of rows.
    pub fn new(data: Vec<f32>, x_size: usize, y_size: usize) -> Result<Self> {
        let row_size = x_size + y_size;

        if x_size == 0 || y_size == 0 || data.len() % row_size != 0 {
            return Err(MlErr::SizeMismatch {
                what: "dataset rows",
                got: data.len(),
                expected: row_size,
            });
        }

        Ok(Self {
            data,
            x_size,
            y_size,
        })
    }

    /// Returns the amount of examples.
    pub fn len(&self) -> usize {
        self.data.len() / self.row_size()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn x_size(&self) -> usize {
        self.x_size
    }

    pub fn y_size(&self) -> usize {
        self.y_size
    }

    /// Returns how many batches of `batch_size` one pass over the dataset yields.
    pub fn num_batches(&self, batch_size: NonZeroUsize) -> usize {
        self.len().div_ceil(batch_size.get())
    }

    /// Keeps only the first `max` examples.
    pub fn truncate(&mut self, max: usize) {
        let row_size = self.row_size();
        self.data.truncate(max * row_size);
    }

    /// Randomly reorders the examples in place.
    ///
    /// Only the row order and a single row of scratch space are allocated, the samples are
    /// moved around inside the existing buffer.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let row_size = self.row_size();
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.shuffle(rng);

        // Row `i` ends up holding the row that was at `order[i]`. Every cycle of the
        // permutation is rotated through the scratch row.
        let mut scratch = vec![0.; row_size];
        let mut placed = vec![false; order.len()];

        for start in 0..order.len() {
            if placed[start] || order[start] == start {
                continue;
            }

            scratch.copy_from_slice(&self.data[start * row_size..(start + 1) * row_size]);

            let mut dst = start;
            loop {
                placed[dst] = true;
                let src = order[dst];

                if src == start {
                    self.data[dst * row_size..(dst + 1) * row_size].copy_from_slice(&scratch);
                    break;
                }

                self.data
                    .copy_within(src * row_size..(src + 1) * row_size, dst * row_size);
                dst = src;
            }
        }
    }

    /// Iterates the dataset in order, `batch_size` rows at a time. The last batch holds the
    /// remaining rows and may be shorter.
    pub fn batches(
        &self,
        batch_size: NonZeroUsize,
    ) -> impl Iterator<Item = (ArrayView2<'_, f32>, ArrayView2<'_, f32>)> {
        let row_size = self.row_size();
        let x_size = self.x_size;

        self.data
            .chunks(batch_size.get() * row_size)
            .filter_map(move |chunk| {
                let rows = ArrayView2::from_shape((chunk.len() / row_size, row_size), chunk).ok()?;
                let (x, y) = rows.split_at(Axis(1), x_size);
                Some((x, y))
            })
    }

    /// Returns the rows in `[start, start + amount)` as feature and target views.
    pub fn get(
        &self,
        start: usize,
        amount: usize,
    ) -> Option<(ArrayView2<'_, f32>, ArrayView2<'_, f32>)> {
        let end = start.checked_add(amount)?;
        if end > self.len() {
            return None;
        }

        let row_size = self.row_size();
        let chunk = &self.data[start * row_size..end * row_size];
        let rows = ArrayView2::from_shape((amount, row_size), chunk).ok()?;

        Some(rows.split_at(Axis(1), self.x_size))
    }

    fn row_size(&self) -> usize {
        self.x_size + self.y_size
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn counting(len: usize) -> Dataset {
        // x = i, y = 10 * i
        let data = (0..len).flat_map(|i| [i as f32, 10.0 * i as f32]).collect();
        Dataset::new(data, 1, 1).unwrap()
    }

    #[test]
    fn new_rejects_partial_rows() {
        assert!(Dataset::new(vec![1.0, 2.0, 3.0], 1, 1).is_err());
        assert!(Dataset::new(vec![1.0, 2.0], 0, 2).is_err());
    }

    #[test]
    fn batches_cover_every_row_once_with_a_short_tail() {
        let ds = counting(5);

        let batches: Vec<_> = ds.batches(nz(2)).collect();

        assert_eq!(ds.num_batches(nz(2)), 3);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].0.column(0).to_vec(), [0.0, 1.0]);
        assert_eq!(batches[1].1.column(0).to_vec(), [20.0, 30.0]);
        assert_eq!(batches[2].0.nrows(), 1);
        assert_eq!(batches[2].1[[0, 0]], 40.0);
    }

    #[test]
    fn shuffle_keeps_rows_together() {
        let mut ds = counting(20);
        let mut rng = StdRng::seed_from_u64(7);

        ds.shuffle(&mut rng);

        let (x, y) = ds.get(0, 20).unwrap();
        let mut seen: Vec<_> = x.column(0).to_vec();
        for (x, y) in x.column(0).iter().zip(y.column(0)) {
            assert_eq!(*y, 10.0 * x);
        }

        seen.sort_by(f32::total_cmp);
        assert_eq!(seen, (0..20).map(|i| i as f32).collect::<Vec<_>>());
    }

    #[test]
    fn shuffle_reuses_the_buffer() {
        let mut ds = counting(1000);
        let buf = ds.data.as_ptr();
        let capacity = ds.data.capacity();

        ds.shuffle(&mut StdRng::seed_from_u64(11));

        assert_eq!(ds.data.as_ptr(), buf);
        assert_eq!(ds.data.capacity(), capacity);
        let first = ds.get(0, 1).unwrap().0[[0, 0]];
        let last = ds.get(999, 1).unwrap().0[[0, 0]];
        assert!(first != 0.0 || last != 999.0);
    }

    #[test]
    fn shuffle_applies_the_drawn_order() {
        let mut ds = counting(30);
        let mut order: Vec<usize> = (0..30).collect();
        order.shuffle(&mut StdRng::seed_from_u64(5));

        ds.shuffle(&mut StdRng::seed_from_u64(5));

        let (x, y) = ds.get(0, 30).unwrap();
        for (i, &src) in order.iter().enumerate() {
            assert_eq!(x[[i, 0]], src as f32);
            assert_eq!(y[[i, 0]], 10.0 * src as f32);
        }
    }

    #[test]
    fn same_seed_gives_the_same_order() {
        let mut a = counting(50);
        let mut b = counting(50);

        a.shuffle(&mut StdRng::seed_from_u64(3));
        b.shuffle(&mut StdRng::seed_from_u64(3));

        assert_eq!(a.get(0, 50).unwrap().0, b.get(0, 50).unwrap().0);
    }

    #[test]
    fn truncate_caps_the_dataset() {
        let mut ds = counting(10);

        ds.truncate(4);
        assert_eq!(ds.len(), 4);

        ds.truncate(100);
        assert_eq!(ds.len(), 4);

        assert!(ds.get(3, 2).is_none());
    }
}
