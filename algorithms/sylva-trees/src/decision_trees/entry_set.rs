//! Dataset snapshots held by tree nodes
//!
use log::debug;
use ndarray::{s, Array1, Array2, ArrayView1, Axis};
use rand::{rngs::SmallRng, Rng, SeedableRng};

use sylva::{is_missing, Dataset, Error};

use super::algorithm::{induce, DecisionTree};
use crate::error::{Result, TreeError};

/// Feature table and aligned target vector of the rows that reach a node
///
/// Every tree node owns one `EntrySet`. Splitting on a feature removes that feature's column, so
/// the column indices of a snapshot are local to it. `columns()` maps them back to the column
/// numbers of the dataset the tree was trained on.
///
/// All cells of a snapshot are nominal codes, missing cells are either imputed or clamped away
/// on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct EntrySet {
    records: Array2<f64>,
    targets: Array1<f64>,
    columns: Vec<usize>,
}

impl EntrySet {
    fn new(records: Array2<f64>, targets: Array1<f64>) -> Result<Self> {
        if records.nrows() != targets.len() {
            return Err(Error::MismatchedShapes(records.nrows(), targets.len()).into());
        }

        let columns = (0..records.ncols()).collect();
        Ok(EntrySet {
            records,
            targets,
            columns,
        })
    }

    /// Builds the root snapshot of a dataset
    ///
    /// Missing cells are imputed when there are any, otherwise the records are clamped against
    /// their own column maxima.
    pub fn from_dataset<R: Rng>(dataset: &Dataset, rng: &mut R) -> Result<Self> {
        let records = dataset.records().to_owned();
        let targets = dataset.targets().to_owned();

        if dataset.has_missing() {
            EntrySet::imputed(records, targets, rng)
        } else {
            let maxima = (0..dataset.nfeatures())
                .map(|col| dataset.column_max(col).unwrap_or(-1.0))
                .collect::<Vec<_>>();
            EntrySet::clamped(records, targets, &maxima)
        }
    }

    /// Creates a snapshot where every value above `maxima[col]` becomes `maxima[col] + 1`
    ///
    /// The overflow code acts as one extra nominal category. The missing sentinel exceeds every
    /// maximum, so missing cells land in that category as well.
    pub fn clamped(mut records: Array2<f64>, targets: Array1<f64>, maxima: &[f64]) -> Result<Self> {
        if maxima.len() != records.ncols() {
            return Err(TreeError::Parameters(format!(
                "expected {} column maxima, got {}",
                records.ncols(),
                maxima.len()
            )));
        }

        for (mut column, &max) in records.columns_mut().into_iter().zip(maxima) {
            column.mapv_inplace(|x| clamp(x, max));
        }

        EntrySet::new(records, targets)
    }

    /// Creates a snapshot with every missing cell filled in
    ///
    /// Each pass visits the columns in order. For a column with missing cells, a decision tree is
    /// trained on the rows where the column is known, taking all other columns and the target as
    /// inputs and the column itself as label. Its predictions are written back right away, so
    /// columns later in the pass already see them. Passes repeat until no cell is missing.
    ///
    /// Fails with [`TreeError::NoKnownValues`] if a column has no known value at all.
    pub fn imputed<R: Rng>(
        records: Array2<f64>,
        targets: Array1<f64>,
        rng: &mut R,
    ) -> Result<Self> {
        let mut entries = EntrySet::new(records, targets)?;

        let mut pass = 0;
        while entries.has_unknown() {
            pass += 1;
            for col in 0..entries.nfeatures() {
                if entries.col_has_unknown(col) {
                    entries.impute_column(col, rng)?;
                }
            }
            debug!("imputation pass {} finished", pass);
        }

        Ok(entries)
    }

    fn impute_column<R: Rng>(&mut self, col: usize, rng: &mut R) -> Result<()> {
        let (known, unknown): (Vec<usize>, Vec<usize>) =
            (0..self.nsamples()).partition(|&row| !is_missing(self.records[(row, col)]));

        if known.is_empty() {
            return Err(TreeError::NoKnownValues(self.columns[col]));
        }

        // every other column followed by the real target
        let kept = (0..self.nfeatures()).filter(|&c| c != col).collect::<Vec<_>>();
        let mut inputs = Array2::zeros((self.nsamples(), kept.len() + 1));
        inputs
            .slice_mut(s![.., ..kept.len()])
            .assign(&self.records.select(Axis(1), &kept));
        inputs.column_mut(kept.len()).assign(&self.targets);

        let known_inputs = inputs.select(Axis(0), &known);
        let maxima = known_inputs
            .columns()
            .into_iter()
            .map(|column| known_max(column).unwrap_or(-1.0))
            .collect::<Vec<_>>();
        let labels = self.records.column(col).select(Axis(0), &known);

        let training = EntrySet::clamped(known_inputs, labels, &maxima)?;
        let inner = DecisionTree::from_induction(
            induce(training, None),
            SmallRng::seed_from_u64(rng.gen()),
        );

        for &row in &unknown {
            let input = inputs
                .row(row)
                .iter()
                .zip(&maxima)
                .map(|(&x, &max)| clamp(x, max))
                .collect::<Array1<_>>();
            self.records[(row, col)] = inner.predict_row(input.view());
        }
        debug!(
            "imputed {} cells of column {} from {} known rows",
            unknown.len(),
            self.columns[col],
            known.len()
        );

        Ok(())
    }

    /// Number of rows
    pub fn nsamples(&self) -> usize {
        self.records.nrows()
    }

    /// Number of feature columns left in this snapshot
    pub fn nfeatures(&self) -> usize {
        self.records.ncols()
    }

    pub fn records(&self) -> &Array2<f64> {
        &self.records
    }

    pub fn targets(&self) -> &Array1<f64> {
        &self.targets
    }

    /// Column numbers of the training dataset, indexed by local column
    pub fn columns(&self) -> &[usize] {
        &self.columns
    }

    /// Largest value of column `col`, `None` if the snapshot is empty
    pub fn column_max(&self, col: usize) -> Option<f64> {
        known_max(self.records.column(col))
    }

    /// Number of nominal values of column `col`, zero for an empty snapshot
    pub fn arity(&self, col: usize) -> usize {
        self.column_max(col).map(|max| max as usize + 1).unwrap_or(0)
    }

    /// Number of target classes observed in this snapshot
    pub fn target_arity(&self) -> usize {
        known_max(self.targets.view())
            .map(|max| max as usize + 1)
            .unwrap_or(0)
    }

    /// Returns true if column `col` still contains the missing sentinel
    pub fn col_has_unknown(&self, col: usize) -> bool {
        self.records.column(col).iter().any(|x| is_missing(*x))
    }

    /// Returns true if any cell contains the missing sentinel
    pub fn has_unknown(&self) -> bool {
        self.records.iter().any(|x| is_missing(*x))
    }

    /// Most frequent target, ties go to the lowest class code
    pub fn majority_target(&self) -> Option<f64> {
        self.class_counts()
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, usize)>, (class, &count)| match best {
                Some((_, best_count)) if best_count >= count => best,
                _ => Some((class, count)),
            })
            .map(|(class, _)| class as f64)
    }

    /// Entropy of the target distribution in bits
    ///
    /// Classes without rows contribute nothing, an empty snapshot has zero entropy.
    pub fn info(&self) -> f64 {
        entropy(&self.class_counts(), self.nsamples())
    }

    /// Information gain of splitting on each column
    ///
    /// The gain is the entropy of the targets minus the entropy left after partitioning the rows
    /// by the column's value, weighted by partition size. A pure snapshot gains nothing from any
    /// column and gets a zero vector.
    pub fn feature_info_gains(&self) -> Array1<f64> {
        let total_info = self.info();
        if total_info == 0.0 {
            return Array1::zeros(self.nfeatures());
        }

        let nsamples = self.nsamples();
        let nclasses = self.target_arity();

        self.records
            .columns()
            .into_iter()
            .map(|column| {
                let arity = known_max(column).map(|max| max as usize + 1).unwrap_or(0);

                // rows are feature values, columns are target classes
                let mut contingency = Array2::<usize>::zeros((arity, nclasses));
                for (value, target) in column.iter().zip(self.targets.iter()) {
                    contingency[(*value as usize, *target as usize)] += 1;
                }

                let weighted_info: f64 = contingency
                    .outer_iter()
                    .map(|class_counts| {
                        let value_total = class_counts.sum();
                        if value_total == 0 {
                            return 0.0;
                        }
                        let class_counts = class_counts.to_vec();
                        value_total as f64 / nsamples as f64 * entropy(&class_counts, value_total)
                    })
                    .sum();

                total_info - weighted_info
            })
            .collect()
    }

    /// Partitions the rows by the value of column `col`
    ///
    /// Returns one snapshot per value `0..arity(col)`, in value order, each without column `col`.
    /// Values that no row takes still get their (empty) slot, so a child can always be addressed
    /// by value.
    pub fn split_on_feature(&self, col: usize) -> Vec<EntrySet> {
        let kept = (0..self.nfeatures()).filter(|&c| c != col).collect::<Vec<_>>();
        let columns = kept.iter().map(|&c| self.columns[c]).collect::<Vec<_>>();
        let remaining = self.records.select(Axis(1), &kept);

        (0..self.arity(col))
            .map(|value| {
                let rows = self
                    .records
                    .column(col)
                    .iter()
                    .enumerate()
                    .filter(|(_, &x)| x as usize == value)
                    .map(|(row, _)| row)
                    .collect::<Vec<_>>();

                EntrySet {
                    records: remaining.select(Axis(0), &rows),
                    targets: self.targets.select(Axis(0), &rows),
                    columns: columns.clone(),
                }
            })
            .collect()
    }

    /// Returns true if column `col` takes at least two different values
    pub(crate) fn separates(&self, col: usize) -> bool {
        let column = self.records.column(col);
        match column.iter().next() {
            Some(first) => column.iter().any(|x| x != first),
            None => false,
        }
    }

    fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.target_arity()];
        for target in self.targets.iter() {
            counts[*target as usize] += 1;
        }
        counts
    }
}

fn clamp(x: f64, max: f64) -> f64 {
    if x > max {
        max + 1.0
    } else {
        x
    }
}

fn known_max(column: ArrayView1<f64>) -> Option<f64> {
    column
        .iter()
        .copied()
        .filter(|x| !is_missing(*x))
        .fold(None, |acc, x| match acc {
            Some(max) if max >= x => Some(max),
            _ => Some(x),
        })
}

/// Given class frequencies calculates the entropy of the subset in bits
fn entropy(class_counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }

    class_counts
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| count as f64 / total as f64)
        .map(|p| -p * p.log2())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use sylva::MISSING;

    fn weather() -> EntrySet {
        let records = array![
            [0., 0., 1.],
            [0., 1., 1.],
            [1., 0., 0.],
            [2., 0., 1.],
            [2., 1., 0.],
            [1., 1., 1.],
        ];
        let targets = array![0., 0., 1., 1., 0., 1.];
        EntrySet::clamped(records, targets, &[2., 1., 1.]).unwrap()
    }

    #[test]
    fn entropy_example() {
        // Class 0 occurs 75% of the time
        // Class 1 occurs 25% of the time
        // Class 2 occurs 0% of the time
        // Entropy is -0.75*log2(0.75) - 0.25*log2(0.25) - 0*log2(0) = 0.81127812
        assert_abs_diff_eq!(entropy(&[6, 2, 0], 8), 0.81127, epsilon = 1e-5);

        // If split is perfect then entropy is zero
        assert_abs_diff_eq!(entropy(&[8, 0, 0], 8), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(entropy(&[], 0), 0.0);
    }

    #[test]
    fn info_is_zero_iff_pure() {
        let pure = EntrySet::clamped(array![[0.], [1.]], array![1., 1.], &[1.]).unwrap();
        assert_abs_diff_eq!(pure.info(), 0.0);

        let mixed = EntrySet::clamped(array![[0.], [1.]], array![0., 1.], &[1.]).unwrap();
        assert!(mixed.info() > 0.0);
    }

    #[test]
    fn info_is_maximal_for_uniform_classes() {
        let records = Array2::zeros((8, 1));
        let targets = array![0., 1., 2., 3., 0., 1., 2., 3.];
        let entries = EntrySet::clamped(records, targets, &[0.]).unwrap();

        assert_abs_diff_eq!(entries.info(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn gains_of_pure_snapshot_are_zero() {
        let records = array![[0., 1.], [1., 0.], [2., 1.]];
        let entries = EntrySet::clamped(records, array![1., 1., 1.], &[2., 1.]).unwrap();

        assert_eq!(entries.feature_info_gains(), Array1::<f64>::zeros(2));
    }

    #[test]
    fn gains_prefer_the_informative_column() {
        let entries = weather();
        let gains = entries.feature_info_gains();

        // values 0 and 1 of column 0 are pure, value 2 is mixed
        let total = entries.info();
        assert_abs_diff_eq!(total, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(gains[0], 1.0 - 2.0 / 6.0, epsilon = 1e-12);
        assert_abs_diff_eq!(gains[1], 1.0 - entropy(&[1, 2], 3), epsilon = 1e-12);
        assert_abs_diff_eq!(gains[2], 0.0, epsilon = 1e-12);
        assert!(gains[0] > gains[1]);
        assert!(gains[0] > gains[2]);
    }

    #[test]
    fn split_removes_the_column_and_keeps_every_row() {
        let entries = weather();
        let parts = entries.split_on_feature(1);

        assert_eq!(parts.len(), 2);
        assert_eq!(
            parts.iter().map(|p| p.nsamples()).sum::<usize>(),
            entries.nsamples()
        );
        for part in &parts {
            assert_eq!(part.nfeatures(), 2);
            assert_eq!(part.columns(), &[0, 2]);
        }
        assert_eq!(parts[0].records(), &array![[0., 1.], [1., 0.], [2., 1.]]);
        assert_eq!(parts[0].targets(), &array![0., 1., 1.]);
        assert_eq!(parts[1].records(), &array![[0., 1.], [2., 0.], [1., 1.]]);
    }

    #[test]
    fn split_keeps_slots_for_unobserved_values() {
        let records = array![[0., 1.], [2., 0.]];
        let entries = EntrySet::clamped(records, array![0., 1.], &[2., 1.]).unwrap();
        let parts = entries.split_on_feature(0);

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[1].nsamples(), 0);
        assert_eq!(parts[1].nfeatures(), 1);
        assert_abs_diff_eq!(parts[1].info(), 0.0);
        assert_eq!(parts[1].majority_target(), None);
    }

    #[test]
    fn clamping_maps_overflow_and_missing_to_one_category() {
        let records = array![[0., 4.], [1., MISSING], [7., 1.]];
        let entries = EntrySet::clamped(records, array![0., 1., 0.], &[1., 2.]).unwrap();

        assert_eq!(entries.records(), &array![[0., 3.], [1., 3.], [2., 1.]]);
        assert!(!entries.has_unknown());
    }

    #[test]
    fn clamping_checks_shapes() {
        assert_eq!(
            EntrySet::clamped(array![[0.], [1.]], array![0.], &[1.]),
            Err(TreeError::BaseCrate(Error::MismatchedShapes(2, 1)))
        );
        assert!(EntrySet::clamped(array![[0.], [1.]], array![0., 1.], &[]).is_err());
    }

    #[test]
    fn majority_ties_go_to_lowest_class() {
        let records = array![[0.], [0.], [0.], [0.]];
        let entries = EntrySet::clamped(records, array![2., 1., 2., 1.], &[0.]).unwrap();
        assert_eq!(entries.majority_target(), Some(1.0));
    }

    #[test]
    fn imputing_known_data_matches_clamping() {
        let mut rng = SmallRng::seed_from_u64(42);
        let records = array![[0., 1., 2.], [1., 0., 2.], [1., 1., 0.], [0., 0., 1.]];
        let targets = array![0., 1., 1., 0.];

        let imputed = EntrySet::imputed(records.clone(), targets.clone(), &mut rng).unwrap();
        let clamped = EntrySet::clamped(records, targets, &[1., 1., 2.]).unwrap();

        assert_eq!(imputed, clamped);
    }

    #[test]
    fn imputation_fills_from_related_column() {
        let mut rng = SmallRng::seed_from_u64(42);
        // column 1 is a copy of column 0
        let records = array![
            [0., 0.],
            [1., 1.],
            [0., 0.],
            [1., 1.],
            [0., 0.],
            [1., MISSING],
            [1., 1.],
        ];
        let targets = array![0., 0., 1., 1., 0., 1., 0.];

        let entries = EntrySet::imputed(records, targets, &mut rng).unwrap();

        assert!(!entries.has_unknown());
        assert_abs_diff_eq!(entries.records()[(5, 1)], 1.0);
    }

    #[test]
    fn imputation_handles_several_missing_columns() {
        let mut rng = SmallRng::seed_from_u64(7);
        let records = array![
            [0., 1., MISSING],
            [1., MISSING, 0.],
            [MISSING, 0., 1.],
            [1., 0., 0.],
            [0., 1., 1.],
            [1., 1., MISSING],
        ];
        let targets = array![0., 1., 1., 1., 0., 0.];

        let entries = EntrySet::imputed(records, targets, &mut rng).unwrap();

        for col in 0..entries.nfeatures() {
            assert!(!entries.col_has_unknown(col));
        }
        // nothing outside the observed codes was invented
        assert!(entries.records().iter().all(|x| *x == 0.0 || *x == 1.0));
    }

    #[test]
    fn imputation_needs_a_known_value() {
        let mut rng = SmallRng::seed_from_u64(42);
        let records = array![[0., MISSING], [1., MISSING]];

        assert_eq!(
            EntrySet::imputed(records, array![0., 1.], &mut rng),
            Err(TreeError::NoKnownValues(1))
        );
    }
}
