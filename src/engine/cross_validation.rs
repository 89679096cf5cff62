//! k-fold cross validation

use crate::core::{BridgeError, EngineModel, LogSink, Result, SvmNode};
use crate::engine::{group_classes, train_rows, TrainingConfig};
use log::{debug, warn};

/// Partition row indices into `nr_fold` folds
///
/// Classification problems with fewer folds than rows are stratified: the
/// rows of each class are dealt to the folds in turn, continuing from where
/// the previous class stopped, so every fold keeps the class proportions and
/// no fold holds more than `ceil(l / nr_fold)` rows even when classes are
/// smaller than `nr_fold`. Otherwise folds are contiguous runs of the row
/// order. Assignment is deterministic.
pub fn fold_assignment(labels: &[f64], stratified: bool, nr_fold: usize) -> Vec<Vec<usize>> {
    let mut folds = vec![Vec::new(); nr_fold];
    let l = labels.len();

    if stratified {
        let dealt = group_classes(labels).members.into_iter().flatten();
        for (k, row) in dealt.enumerate() {
            folds[k % nr_fold].push(row);
        }
    } else {
        for (f, fold) in folds.iter_mut().enumerate() {
            fold.extend(f * l / nr_fold..(f + 1) * l / nr_fold);
        }
    }

    folds
}

/// Train on all folds but one and predict the held-out rows into `target`
pub fn cross_validate(
    rows: &[&[SvmNode]],
    labels: &[f64],
    config: &TrainingConfig,
    nr_fold: usize,
    target: &mut [f64],
    sink: &dyn LogSink,
) -> Result<()> {
    let l = rows.len();
    if nr_fold == 0 {
        return Err(BridgeError::InvalidArgument(
            "nr_fold must be positive".to_string(),
        ));
    }
    if target.len() != l {
        return Err(BridgeError::DimensionMismatch {
            expected: l,
            actual: target.len(),
        });
    }

    let nr_fold = if nr_fold > l {
        warn!("{nr_fold} folds requested for {l} rows, using leave-one-out");
        sink.print(
            "WARNING: # folds > # data. Will use # folds = # data instead \
             (i.e., leave-one-out cross validation)\n",
        );
        l
    } else {
        nr_fold
    };

    let stratified = config.svm_type.is_classification() && nr_fold < l;
    let folds = fold_assignment(labels, stratified, nr_fold);
    debug!("cross validation over {nr_fold} folds, stratified: {stratified}");

    let mut held_out = vec![false; l];
    for fold in &folds {
        if fold.is_empty() {
            continue;
        }
        held_out.iter_mut().for_each(|h| *h = false);
        for &r in fold {
            held_out[r] = true;
        }

        let (kept_rows, kept_labels): (Vec<&[SvmNode]>, Vec<f64>) = (0..l)
            .filter(|&r| !held_out[r])
            .map(|r| (rows[r], labels[r]))
            .unzip();
        let model = train_rows(&kept_rows, &kept_labels, config, sink)?;

        if config.wants_probability() {
            let mut prob = vec![0.0; model.nr_class()];
            for &r in fold {
                target[r] = model.predict_probability(rows[r], &mut prob);
            }
        } else {
            for &r in fold {
                target[r] = model.predict(rows[r]);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SvmType;
    use crate::kernel::linear::nodes;
    use crate::logging::SilentSink;
    use crate::marshal::Parameters;

    fn linear_config() -> TrainingConfig {
        let params = Parameters::builder().linear().build().unwrap();
        TrainingConfig::from_parameter(params.raw()).unwrap()
    }

    #[test]
    fn test_stratified_folds_keep_classes_balanced() {
        let labels = [1.0, 1.0, -1.0, -1.0, 1.0, -1.0];
        let folds = fold_assignment(&labels, true, 3);

        assert_eq!(folds.len(), 3);
        for fold in &folds {
            let positives = fold.iter().filter(|&&r| labels[r] > 0.0).count();
            assert_eq!(positives, 1);
            assert_eq!(fold.len(), 2);
        }
    }

    #[test]
    fn test_singleton_classes_spread_over_folds() {
        let folds = fold_assignment(&[1.0, 2.0, 3.0, 4.0], true, 2);
        assert_eq!(folds, vec![vec![0, 2], vec![1, 3]]);
    }

    #[test]
    fn test_cross_validation_with_singleton_classes() {
        let data: Vec<Vec<SvmNode>> = [0.0, 1.0, 2.0, 3.0]
            .iter()
            .map(|&v| nodes(&[(1, v)]))
            .collect();
        let rows: Vec<&[SvmNode]> = data.iter().map(Vec::as_slice).collect();
        let labels = [1.0, 2.0, 3.0, 4.0];
        let mut target = [f64::NAN; 4];

        cross_validate(&rows, &labels, &linear_config(), 2, &mut target, &SilentSink).unwrap();

        assert!(target[0] == 2.0 || target[0] == 4.0);
        assert!(target[2] == 2.0 || target[2] == 4.0);
        assert!(target[1] == 1.0 || target[1] == 3.0);
        assert!(target[3] == 1.0 || target[3] == 3.0);
    }

    #[test]
    fn test_contiguous_folds_cover_every_row() {
        let labels = [0.5, 1.5, 2.5, 3.5, 4.5];
        let folds = fold_assignment(&labels, false, 2);

        assert_eq!(folds, vec![vec![0, 1], vec![2, 3, 4]]);
    }

    #[test]
    fn test_cross_validation_on_separable_line() {
        let data: Vec<Vec<SvmNode>> = [2.0, 1.5, -2.0, -1.5]
            .iter()
            .map(|&v| nodes(&[(1, v)]))
            .collect();
        let rows: Vec<&[SvmNode]> = data.iter().map(Vec::as_slice).collect();
        let labels = [1.0, 1.0, -1.0, -1.0];
        let mut target = [0.0; 4];

        cross_validate(&rows, &labels, &linear_config(), 2, &mut target, &SilentSink).unwrap();

        assert_eq!(target, labels);
    }

    #[test]
    fn test_too_many_folds_falls_back_to_leave_one_out() {
        let data: Vec<Vec<SvmNode>> = [1.0, 2.0, 3.0].iter().map(|&v| nodes(&[(1, v)])).collect();
        let rows: Vec<&[SvmNode]> = data.iter().map(Vec::as_slice).collect();
        let mut config = linear_config();
        config.svm_type = SvmType::EpsilonSvr;

        let messages = std::cell::RefCell::new(String::new());
        let sink = |m: &str| messages.borrow_mut().push_str(m);
        let mut target = [f64::NAN; 3];

        cross_validate(&rows, &[1.0, 2.0, 3.0], &config, 10, &mut target, &sink).unwrap();

        assert!(messages.borrow().contains("leave-one-out"));
        assert!(target.iter().all(|t| t.is_finite()));
    }

    #[test]
    fn test_target_length_checked() {
        let data = [nodes(&[(1, 1.0)]), nodes(&[(1, -1.0)])];
        let rows: Vec<&[SvmNode]> = data.iter().map(Vec::as_slice).collect();
        let mut target = [0.0; 1];

        let result = cross_validate(
            &rows,
            &[1.0, -1.0],
            &linear_config(),
            2,
            &mut target,
            &SilentSink,
        );
        assert!(matches!(result, Err(BridgeError::DimensionMismatch { .. })));
    }
}
