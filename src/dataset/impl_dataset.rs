use ndarray::{s, ArrayView1, Axis};
use rand::{seq::SliceRandom, Rng};

use super::{is_missing, ColumnKind, Dataset};

impl Dataset {
    /// Returns a view on the `idx`-th record
    pub fn row(&self, idx: usize) -> ArrayView1<'_, f64> {
        self.records.row(idx)
    }

    /// Largest known value of column `col`
    ///
    /// Missing cells are skipped, `None` is returned when the column has no known value.
    pub fn column_max(&self, col: usize) -> Option<f64> {
        self.records
            .column(col)
            .iter()
            .copied()
            .filter(|x| !is_missing(*x))
            .fold(None, |acc, x| match acc {
                Some(max) if max >= x => Some(max),
                _ => Some(x),
            })
    }

    /// Number of nominal values of column `col`
    ///
    /// This is the largest observed code plus one. Continuous columns and columns without any
    /// known value report zero.
    pub fn arity(&self, col: usize) -> usize {
        if self.column_kind(col) == ColumnKind::Continuous {
            return 0;
        }

        self.column_max(col).map(|max| max as usize + 1).unwrap_or(0)
    }

    /// Most frequent known value of column `col`
    ///
    /// If two values are equally frequent the smaller one is returned.
    pub fn majority_value(&self, col: usize) -> Option<f64> {
        let mut values: Vec<f64> = self
            .records
            .column(col)
            .iter()
            .copied()
            .filter(|x| !is_missing(*x))
            .collect();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        // (value, count) of the longest run seen so far and of the current run
        let mut best: Option<(f64, usize)> = None;
        let mut current: Option<(f64, usize)> = None;
        for value in values {
            current = match current {
                Some((v, count)) if v == value => Some((v, count + 1)),
                _ => Some((value, 1)),
            };
            if let Some((v, count)) = current {
                if best.map(|(_, best_count)| count > best_count).unwrap_or(true) {
                    best = Some((v, count));
                }
            }
        }

        best.map(|(value, _)| value)
    }

    /// Returns true if any cell holds the missing sentinel
    pub fn has_missing(&self) -> bool {
        self.records.iter().any(|x| is_missing(*x))
    }

    /// Apply a random permutation to the rows, keeping records and targets paired
    pub fn shuffle<R: Rng>(self, rng: &mut R) -> Dataset {
        let mut indices = (0..self.nsamples()).collect::<Vec<_>>();
        indices.shuffle(rng);

        self.select(&indices)
    }

    /// Split dataset into two disjoint chunks
    ///
    /// This function splits the observations in a dataset into two disjoint chunks. The splitting
    /// threshold is calculated with the `ratio`. For example a ratio of `0.9` allocates 90% to the
    /// first chunk and 10% to the second. This is often used in training, validation splitting
    /// procedures.
    pub fn split_with_ratio(&self, ratio: f32) -> (Dataset, Dataset) {
        let n = (self.nsamples() as f32 * ratio).ceil() as usize;
        let n = n.min(self.nsamples());

        let first = Dataset {
            records: self.records.slice(s![..n, ..]).to_owned(),
            targets: self.targets.slice(s![..n]).to_owned(),
            feature_names: self.feature_names.clone(),
            column_kinds: self.column_kinds.clone(),
        };
        let second = Dataset {
            records: self.records.slice(s![n.., ..]).to_owned(),
            targets: self.targets.slice(s![n..]).to_owned(),
            feature_names: self.feature_names.clone(),
            column_kinds: self.column_kinds.clone(),
        };

        (first, second)
    }

    /// Performs K-folding on the dataset
    ///
    /// The dataset is divided into `k` consecutive chunks. For each chunk a pair of datasets is
    /// returned, where the chunk is the validation set and all remaining rows form the training
    /// set. Shuffle the dataset beforehand if the row order carries information.
    ///
    /// ### Panics
    ///
    /// If `k` is zero
    pub fn fold(&self, k: usize) -> Vec<(Dataset, Dataset)> {
        assert!(k > 0, "the number of folds has to be positive");

        let n = self.nsamples();
        (0..k)
            .map(|i| {
                let begin = i * n / k;
                let end = (i + 1) * n / k;

                let train = (0..begin).chain(end..n).collect::<Vec<_>>();
                let valid = (begin..end).collect::<Vec<_>>();

                (self.select(&train), self.select(&valid))
            })
            .collect()
    }

    fn select(&self, indices: &[usize]) -> Dataset {
        Dataset {
            records: self.records.select(Axis(0), indices),
            targets: self.targets.select(Axis(0), indices),
            feature_names: self.feature_names.clone(),
            column_kinds: self.column_kinds.clone(),
        }
    }
}
