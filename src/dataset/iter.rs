use super::Dataset;
use ndarray::ArrayView1;

/// Iterates over `(record, target)` pairs of a dataset in row order
pub struct Iter<'a> {
    dataset: &'a Dataset,
    idx: usize,
}

impl<'a> Iter<'a> {
    pub fn new(dataset: &'a Dataset) -> Iter<'a> {
        Iter { dataset, idx: 0 }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = (ArrayView1<'a, f64>, f64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.idx >= self.dataset.nsamples() {
            return None;
        }

        let item = (
            self.dataset.records.row(self.idx),
            self.dataset.targets[self.idx],
        );
        self.idx += 1;

        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.dataset.nsamples().saturating_sub(self.idx);
        (remaining, Some(remaining))
    }
}

impl<'a> ExactSizeIterator for Iter<'a> {}
