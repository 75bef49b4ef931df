//! Stateless classification metrics over label and score vectors
//!
//! Labels are `usize` class indices; scores are `f32`. Every function checks
//! its inputs and returns a [`MetricError`] instead of panicking.

use std::cmp::Ordering;

use ndarray::parallel::prelude::*;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use super::reduction::{class_reduce, reduce, safe_divide, ClassAverage, Reduction};
use crate::error::{MetricError, Result};
use crate::types::Tensor;

/// Counts of a single class in one-vs-rest fashion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatScores {
    pub tp: usize,
    pub fp: usize,
    pub tn: usize,
    pub fn_: usize,
    pub support: usize,
}

/// Per-class counts, indexed by class
#[derive(Debug, Clone, PartialEq)]
pub struct ClassStats {
    pub tp: Array1<f32>,
    pub fp: Array1<f32>,
    pub tn: Array1<f32>,
    pub fn_: Array1<f32>,
    pub support: Array1<f32>,
}

impl ClassStats {
    pub fn num_classes(&self) -> usize {
        self.tp.len()
    }
}

/// Receiver operating characteristic curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    pub fpr: Array1<f32>,
    pub tpr: Array1<f32>,
    pub thresholds: Array1<f32>,
}

/// Precision-recall curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrCurve {
    pub precision: Array1<f32>,
    pub recall: Array1<f32>,
    pub thresholds: Array1<f32>,
}

fn check_pair(len_a: usize, len_b: usize) -> Result<()> {
    if len_a != len_b {
        return Err(MetricError::shape_mismatch(
            format!("{} samples", len_a),
            format!("{} samples", len_b),
        ));
    }
    if len_a == 0 {
        return Err(MetricError::invalid_input("prediction and target are empty"));
    }
    Ok(())
}

fn class_count(max_label: Option<&usize>) -> Result<usize> {
    match max_label {
        None => Ok(0),
        Some(&m) => m
            .checked_add(1)
            .ok_or_else(|| MetricError::invalid_input(format!("label {} is out of range", m))),
    }
}

/// Convert class labels into a one-hot `(N, C)` matrix
pub fn to_onehot(labels: ArrayView1<usize>, num_classes: Option<usize>) -> Result<Array2<f32>> {
    let observed = class_count(labels.iter().max())?;
    let classes = match num_classes {
        Some(n) if n < observed => {
            return Err(MetricError::invalid_parameter(
                "num_classes".to_string(),
                format!("{} is smaller than the {} classes present in the labels", n, observed),
            ))
        }
        Some(n) => n,
        None => observed,
    };

    let mut onehot = Array2::zeros((labels.len(), classes));
    for (row, &label) in labels.iter().enumerate() {
        onehot[[row, label]] = 1.0;
    }
    Ok(onehot)
}

/// Convert `(N, C)` class scores into labels by taking the row-wise argmax.
///
/// Ties resolve to the lowest class index; NaN scores never win.
pub fn to_categorical(scores: ArrayView2<f32>) -> Array1<usize> {
    scores
        .axis_iter(Axis(0))
        .map(|row| {
            let mut best = 0;
            let mut best_value = f32::NEG_INFINITY;
            for (idx, &value) in row.iter().enumerate() {
                if value > best_value {
                    best = idx;
                    best_value = value;
                }
            }
            best
        })
        .collect()
}

/// Number of classes implied by the labels, or the validated explicit count
pub fn get_num_classes(
    pred: ArrayView1<usize>,
    target: ArrayView1<usize>,
    num_classes: Option<usize>,
) -> Result<usize> {
    let observed = class_count(pred.iter().chain(target.iter()).max())?;

    match num_classes {
        Some(0) => Err(MetricError::invalid_parameter(
            "num_classes".to_string(),
            "must be positive".to_string(),
        )),
        Some(n) if n < observed => Err(MetricError::invalid_parameter(
            "num_classes".to_string(),
            format!("{} is smaller than the {} classes present in the labels", n, observed),
        )),
        Some(n) => Ok(n),
        None => Ok(observed),
    }
}

/// True/false positives and negatives for one class
pub fn stat_scores(pred: ArrayView1<usize>, target: ArrayView1<usize>, class_index: usize) -> Result<StatScores> {
    check_pair(pred.len(), target.len())?;

    let mut scores = StatScores::default();
    for (&p, &t) in pred.iter().zip(target.iter()) {
        match (p == class_index, t == class_index) {
            (true, true) => scores.tp += 1,
            (true, false) => scores.fp += 1,
            (false, true) => scores.fn_ += 1,
            (false, false) => scores.tn += 1,
        }
    }
    scores.support = scores.tp + scores.fn_;
    Ok(scores)
}

/// Per-class true/false positives and negatives in a single pass
pub fn stat_scores_multiple_classes(
    pred: ArrayView1<usize>,
    target: ArrayView1<usize>,
    num_classes: Option<usize>,
) -> Result<ClassStats> {
    check_pair(pred.len(), target.len())?;
    let classes = get_num_classes(pred, target, num_classes)?;

    let mut tp = Array1::<f32>::zeros(classes);
    let mut fp = Array1::<f32>::zeros(classes);
    let mut fn_ = Array1::<f32>::zeros(classes);
    let mut support = Array1::<f32>::zeros(classes);

    for (&p, &t) in pred.iter().zip(target.iter()) {
        if p == t {
            tp[p] += 1.0;
        } else {
            fp[p] += 1.0;
            fn_[t] += 1.0;
        }
        support[t] += 1.0;
    }

    let total = pred.len() as f32;
    let tn = tp.iter()
        .zip(fp.iter())
        .zip(fn_.iter())
        .map(|((tp, fp), fn_)| total - tp - fp - fn_)
        .collect();

    Ok(ClassStats { tp, fp, tn, fn_, support })
}

/// Fraction of samples whose predicted label equals the target label
pub fn accuracy(pred: ArrayView1<usize>, target: ArrayView1<usize>) -> Result<f32> {
    check_pair(pred.len(), target.len())?;
    let correct = pred.iter()
        .zip(target.iter())
        .filter(|(p, t)| p == t)
        .count();
    Ok(correct as f32 / pred.len() as f32)
}

/// Count table with true classes as rows and predicted classes as columns.
///
/// With `normalize` each row is divided by its sum; rows without samples stay zero.
pub fn confusion_matrix(
    pred: ArrayView1<usize>,
    target: ArrayView1<usize>,
    num_classes: Option<usize>,
    normalize: bool,
) -> Result<Array2<f32>> {
    check_pair(pred.len(), target.len())?;
    let classes = get_num_classes(pred, target, num_classes)?;

    let mut matrix = Array2::<f32>::zeros((classes, classes));
    for (&p, &t) in pred.iter().zip(target.iter()) {
        matrix[[t, p]] += 1.0;
    }

    if normalize {
        for mut row in matrix.axis_iter_mut(Axis(0)) {
            let total = row.sum();
            if total > 0.0 {
                row.mapv_inplace(|v| v / total);
            }
        }
    }

    Ok(matrix)
}

/// Precision and recall under the same averaging mode
pub fn precision_recall(
    pred: ArrayView1<usize>,
    target: ArrayView1<usize>,
    num_classes: Option<usize>,
    average: ClassAverage,
    zero_division: f32,
) -> Result<(Tensor, Tensor)> {
    let stats = stat_scores_multiple_classes(pred, target, num_classes)?;
    let predicted = &stats.tp + &stats.fp;
    let actual = &stats.tp + &stats.fn_;

    let precision = class_reduce(stats.tp.view(), predicted.view(), stats.support.view(), average, zero_division)?;
    let recall = class_reduce(stats.tp.view(), actual.view(), stats.support.view(), average, zero_division)?;
    Ok((precision, recall))
}

/// Fraction of predicted positives that are correct
pub fn precision(
    pred: ArrayView1<usize>,
    target: ArrayView1<usize>,
    num_classes: Option<usize>,
    average: ClassAverage,
    zero_division: f32,
) -> Result<Tensor> {
    precision_recall(pred, target, num_classes, average, zero_division).map(|(p, _)| p)
}

/// Fraction of actual positives that are found
pub fn recall(
    pred: ArrayView1<usize>,
    target: ArrayView1<usize>,
    num_classes: Option<usize>,
    average: ClassAverage,
    zero_division: f32,
) -> Result<Tensor> {
    precision_recall(pred, target, num_classes, average, zero_division).map(|(_, r)| r)
}

/// Weighted harmonic mean of precision and recall.
///
/// `beta > 1` favours recall, `beta < 1` favours precision.
pub fn fbeta_score(
    pred: ArrayView1<usize>,
    target: ArrayView1<usize>,
    beta: f32,
    num_classes: Option<usize>,
    average: ClassAverage,
    zero_division: f32,
) -> Result<Tensor> {
    if !(beta.is_finite() && beta > 0.0) {
        return Err(MetricError::invalid_parameter(
            "beta".to_string(),
            format!("must be a positive finite number, got {}", beta),
        ));
    }

    let stats = stat_scores_multiple_classes(pred, target, num_classes)?;
    let b2 = beta * beta;
    let num = stats.tp.mapv(|tp| (1.0 + b2) * tp);
    let denom = &num + &stats.fn_.mapv(|f| b2 * f) + &stats.fp;

    class_reduce(num.view(), denom.view(), stats.support.view(), average, zero_division)
}

/// F-beta with `beta = 1`
pub fn f1_score(
    pred: ArrayView1<usize>,
    target: ArrayView1<usize>,
    num_classes: Option<usize>,
    average: ClassAverage,
    zero_division: f32,
) -> Result<Tensor> {
    fbeta_score(pred, target, 1.0, num_classes, average, zero_division)
}

/// Cumulative false and true positives at each distinct score, highest first
fn binary_clf_curve(
    scores: ArrayView1<f32>,
    target: ArrayView1<usize>,
    sample_weight: Option<ArrayView1<f32>>,
    pos_label: usize,
) -> Result<(Vec<f32>, Vec<f32>, Vec<f32>)> {
    check_pair(scores.len(), target.len())?;
    if let Some(weights) = sample_weight {
        if weights.len() != scores.len() {
            return Err(MetricError::shape_mismatch(
                format!("{} sample weights", scores.len()),
                format!("{} sample weights", weights.len()),
            ));
        }
    }
    if scores.iter().any(|s| !s.is_finite()) {
        return Err(MetricError::invalid_input("scores must be finite"));
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].partial_cmp(&scores[a]).unwrap_or(Ordering::Equal));

    let mut fps = Vec::new();
    let mut tps = Vec::new();
    let mut thresholds = Vec::new();
    let (mut fp, mut tp) = (0.0f32, 0.0f32);

    for (pos, &idx) in order.iter().enumerate() {
        let weight = sample_weight.map_or(1.0, |w| w[idx]);
        if target[idx] == pos_label {
            tp += weight;
        } else {
            fp += weight;
        }

        let is_last_of_value = order
            .get(pos + 1)
            .map_or(true, |&next| scores[next] != scores[idx]);
        if is_last_of_value {
            fps.push(fp);
            tps.push(tp);
            thresholds.push(scores[idx]);
        }
    }

    Ok((fps, tps, thresholds))
}

fn normalize_by_last(values: &[f32]) -> Array1<f32> {
    let last = values.last().copied().unwrap_or(0.0);
    let denom = Array1::from_elem(values.len(), last);
    safe_divide(ArrayView1::from(values), denom.view(), 0.0)
}

/// ROC curve for a binary problem where `pos_label` marks the positive class.
///
/// The curve starts at `(0, 0)` with threshold `max(score) + 1`, or positive
/// infinity when the scores are too large for `+ 1` to register. When the
/// target holds no negatives (or no positives) that axis is all zeros.
pub fn roc(
    scores: ArrayView1<f32>,
    target: ArrayView1<usize>,
    sample_weight: Option<ArrayView1<f32>>,
    pos_label: usize,
) -> Result<Curve> {
    let (mut fps, mut tps, mut thresholds) = binary_clf_curve(scores, target, sample_weight, pos_label)?;

    fps.insert(0, 0.0);
    tps.insert(0, 0.0);
    // `+ 1` is lost on scores at or above 2^24
    let top = thresholds[0];
    let lead = if top + 1.0 > top { top + 1.0 } else { f32::INFINITY };
    thresholds.insert(0, lead);

    Ok(Curve {
        fpr: normalize_by_last(&fps),
        tpr: normalize_by_last(&tps),
        thresholds: Array1::from(thresholds),
    })
}

/// One-vs-rest ROC curves for every class of a `(N, C)` score matrix
pub fn multiclass_roc(
    scores: ArrayView2<f32>,
    target: ArrayView1<usize>,
    sample_weight: Option<ArrayView1<f32>>,
    num_classes: Option<usize>,
) -> Result<Vec<Curve>> {
    let classes = num_classes.unwrap_or(scores.ncols());
    if classes != scores.ncols() {
        return Err(MetricError::shape_mismatch(
            format!("{} score columns", classes),
            format!("{} score columns", scores.ncols()),
        ));
    }

    (0..classes)
        .into_par_iter()
        .map(|class| roc(scores.column(class), target, sample_weight, class))
        .collect()
}

/// Precision-recall pairs for decreasing thresholds.
///
/// The curve stops once full recall is reached and ends at `(recall 0,
/// precision 1)` without a threshold.
pub fn precision_recall_curve(
    scores: ArrayView1<f32>,
    target: ArrayView1<usize>,
    sample_weight: Option<ArrayView1<f32>>,
    pos_label: usize,
) -> Result<PrCurve> {
    let (fps, tps, thresholds) = binary_clf_curve(scores, target, sample_weight, pos_label)?;

    let predicted: Vec<f32> = tps.iter().zip(fps.iter()).map(|(t, f)| t + f).collect();
    let precision = safe_divide(ArrayView1::from(&tps[..]), ArrayView1::from(&predicted[..]), 0.0);
    let recall = normalize_by_last(&tps);

    let total_tp = tps.last().copied().unwrap_or(0.0);
    let last_ind = tps.iter().position(|&t| t == total_tp).unwrap_or(0);

    let mut precision: Vec<f32> = precision.iter().take(last_ind + 1).rev().copied().collect();
    let mut recall: Vec<f32> = recall.iter().take(last_ind + 1).rev().copied().collect();
    let thresholds: Vec<f32> = thresholds.iter().take(last_ind + 1).rev().copied().collect();
    precision.push(1.0);
    recall.push(0.0);

    Ok(PrCurve {
        precision: Array1::from(precision),
        recall: Array1::from(recall),
        thresholds: Array1::from(thresholds),
    })
}

/// One-vs-rest precision-recall curves for every class of a `(N, C)` score matrix
pub fn multiclass_precision_recall_curve(
    scores: ArrayView2<f32>,
    target: ArrayView1<usize>,
    sample_weight: Option<ArrayView1<f32>>,
    num_classes: Option<usize>,
) -> Result<Vec<PrCurve>> {
    let classes = num_classes.unwrap_or(scores.ncols());
    if classes != scores.ncols() {
        return Err(MetricError::shape_mismatch(
            format!("{} score columns", classes),
            format!("{} score columns", scores.ncols()),
        ));
    }

    (0..classes)
        .into_par_iter()
        .map(|class| precision_recall_curve(scores.column(class), target, sample_weight, class))
        .collect()
}

/// Area under a curve by the trapezoidal rule.
///
/// `x` must be monotonic unless `reorder` is set; a decreasing `x` integrates
/// with negative direction so the area stays positive.
pub fn auc(x: ArrayView1<f32>, y: ArrayView1<f32>, reorder: bool) -> Result<f32> {
    if x.len() != y.len() {
        return Err(MetricError::shape_mismatch(
            format!("{} x values", x.len()),
            format!("{} y values", y.len()),
        ));
    }
    if x.len() < 2 {
        return Err(MetricError::invalid_input("at least two points are needed to compute an area"));
    }

    let mut points: Vec<(f32, f32)> = x.iter().copied().zip(y.iter().copied()).collect();
    if reorder {
        points.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
    }

    let increasing = points.windows(2).all(|w| w[1].0 >= w[0].0);
    let decreasing = points.windows(2).all(|w| w[1].0 <= w[0].0);
    let direction = if increasing {
        1.0
    } else if decreasing {
        -1.0
    } else {
        return Err(MetricError::invalid_input(
            "x is neither increasing nor decreasing; pass reorder to sort it",
        ));
    };

    let area: f32 = points
        .windows(2)
        .map(|w| (w[1].0 - w[0].0) * (w[1].1 + w[0].1) / 2.0)
        .sum();
    Ok(direction * area)
}

/// Area under the ROC curve.
///
/// Undefined, and rejected, when the target holds a single class.
pub fn auroc(
    scores: ArrayView1<f32>,
    target: ArrayView1<usize>,
    sample_weight: Option<ArrayView1<f32>>,
    pos_label: usize,
) -> Result<f32> {
    let positives = target.iter().filter(|&&t| t == pos_label).count();
    if positives == 0 || positives == target.len() {
        return Err(MetricError::invalid_input(
            "AUROC is undefined when the target contains a single class",
        ));
    }

    let curve = roc(scores, target, sample_weight, pos_label)?;
    auc(curve.fpr.view(), curve.tpr.view(), false)
}

/// Weighted mean of precisions achieved at each threshold
pub fn average_precision(
    scores: ArrayView1<f32>,
    target: ArrayView1<usize>,
    sample_weight: Option<ArrayView1<f32>>,
    pos_label: usize,
) -> Result<f32> {
    let curve = precision_recall_curve(scores, target, sample_weight, pos_label)?;
    let n = curve.recall.len();
    let ap = (0..n - 1)
        .map(|i| (curve.recall[i] - curve.recall[i + 1]) * curve.precision[i])
        .sum();
    Ok(ap)
}

/// Dice coefficient `2tp / (2tp + fp + fn)` per class of a `(N, C)` score matrix.
///
/// Class 0 is background and skipped unless `background` is set. Classes
/// absent from the target score `no_fg_score`; empty denominators score
/// `nan_score`.
pub fn dice_score(
    scores: ArrayView2<f32>,
    target: ArrayView1<usize>,
    background: bool,
    nan_score: f32,
    no_fg_score: f32,
    reduction: Reduction,
) -> Result<Tensor> {
    let classes = scores.ncols();
    let offset = if background { 0 } else { 1 };
    if classes <= offset {
        return Err(MetricError::invalid_parameter(
            "background".to_string(),
            format!("{} classes leave nothing to score", classes),
        ));
    }

    let pred = to_categorical(scores);
    let stats = stat_scores_multiple_classes(pred.view(), target, Some(classes))?;

    let per_class: Array1<f32> = (offset..classes)
        .map(|class| {
            if stats.support[class] == 0.0 {
                return no_fg_score;
            }
            let denom = 2.0 * stats.tp[class] + stats.fp[class] + stats.fn_[class];
            if denom == 0.0 {
                nan_score
            } else {
                2.0 * stats.tp[class] / denom
            }
        })
        .collect();

    Ok(reduce(per_class.view(), reduction))
}

/// Intersection over union `tp / (tp + fp + fn)` per class.
///
/// Classes absent from both prediction and target score `absent_score`.
/// `ignore_index` drops that class from the result.
pub fn iou(
    pred: ArrayView1<usize>,
    target: ArrayView1<usize>,
    ignore_index: Option<usize>,
    absent_score: f32,
    num_classes: Option<usize>,
    reduction: Reduction,
) -> Result<Tensor> {
    let stats = stat_scores_multiple_classes(pred, target, num_classes)?;
    let classes = stats.num_classes();

    if let Some(ignored) = ignore_index {
        if ignored >= classes {
            return Err(MetricError::invalid_parameter(
                "ignore_index".to_string(),
                format!("{} is out of range for {} classes", ignored, classes),
            ));
        }
    }

    let per_class: Array1<f32> = (0..classes)
        .filter(|&class| Some(class) != ignore_index)
        .map(|class| {
            let union = stats.tp[class] + stats.fp[class] + stats.fn_[class];
            if union == 0.0 {
                absent_score
            } else {
                stats.tp[class] / union
            }
        })
        .collect();

    Ok(reduce(per_class.view(), reduction))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_accuracy_fraction_of_matches() {
        let pred = array![0usize, 1, 2, 3];
        let target = array![0usize, 1, 2, 2];
        assert_eq!(accuracy(pred.view(), target.view()).unwrap(), 0.75);
    }

    #[test]
    fn test_accuracy_rejects_mismatched_lengths() {
        let pred = array![0usize, 1];
        let target = array![0usize];
        assert!(matches!(
            accuracy(pred.view(), target.view()),
            Err(MetricError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_to_onehot_and_back() {
        let labels = array![0usize, 2, 1];
        let onehot = to_onehot(labels.view(), None).unwrap();
        assert_eq!(onehot, array![[1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]]);
        assert_eq!(to_categorical(onehot.view()), labels);
        assert!(to_onehot(labels.view(), Some(2)).is_err());
    }

    #[test]
    fn test_to_categorical_first_max_wins() {
        let scores = array![[0.5f32, 0.5], [f32::NAN, 0.1]];
        assert_eq!(to_categorical(scores.view()), array![0usize, 1]);
    }

    #[test]
    fn test_stat_scores() {
        let pred = array![1usize, 0, 1, 1];
        let target = array![1usize, 1, 0, 1];
        let s = stat_scores(pred.view(), target.view(), 1).unwrap();
        assert_eq!(s, StatScores { tp: 2, fp: 1, tn: 0, fn_: 1, support: 3 });
    }

    #[test]
    fn test_confusion_matrix() {
        let pred = array![0usize, 1, 1, 2];
        let target = array![0usize, 1, 2, 2];
        let cm = confusion_matrix(pred.view(), target.view(), None, false).unwrap();
        assert_eq!(cm, array![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 1.0, 1.0]]);

        let normalized = confusion_matrix(pred.view(), target.view(), Some(4), true).unwrap();
        assert_eq!(normalized.dim(), (4, 4));
        assert_eq!(normalized[[2, 1]], 0.5);
        assert_eq!(normalized.row(3).sum(), 0.0);
    }

    #[test]
    fn test_precision_recall_macro() {
        let pred = array![0usize, 1, 1, 2, 2];
        let target = array![0usize, 1, 2, 2, 0];
        let (p, r) = precision_recall(pred.view(), target.view(), None, ClassAverage::Macro, 0.0).unwrap();
        assert!(close(p[[]], (1.0 + 0.5 + 0.5) / 3.0));
        assert!(close(r[[]], (0.5 + 1.0 + 0.5) / 3.0));
    }

    #[test]
    fn test_precision_zero_division_fallback() {
        // class 2 is never predicted
        let pred = array![0usize, 1, 1];
        let target = array![0usize, 1, 2];
        let p = precision(pred.view(), target.view(), None, ClassAverage::None, 0.25).unwrap();
        assert_eq!(p, array![1.0f32, 0.5, 0.25].into_dyn());
    }

    #[test]
    fn test_f1_matches_precision_recall_micro() {
        let pred = array![0usize, 1, 1, 0, 1, 0];
        let target = array![0usize, 1, 0, 0, 1, 1];
        let (p, r) = precision_recall(pred.view(), target.view(), None, ClassAverage::None, 0.0).unwrap();
        let f1 = f1_score(pred.view(), target.view(), None, ClassAverage::None, 0.0).unwrap();
        for c in 0..2 {
            let expected = 2.0 * p[[c]] * r[[c]] / (p[[c]] + r[[c]]);
            assert!(close(f1[[c]], expected));
        }
    }

    #[test]
    fn test_fbeta_rejects_bad_beta() {
        let labels = array![0usize, 1];
        assert!(fbeta_score(labels.view(), labels.view(), 0.0, None, ClassAverage::Micro, 0.0).is_err());
        assert!(fbeta_score(labels.view(), labels.view(), f32::NAN, None, ClassAverage::Micro, 0.0).is_err());
    }

    #[test]
    fn test_roc_known_curve() {
        let scores = array![0.1f32, 0.4, 0.35, 0.8];
        let target = array![0usize, 0, 1, 1];
        let curve = roc(scores.view(), target.view(), None, 1).unwrap();
        assert_eq!(curve.fpr, array![0.0, 0.0, 0.5, 0.5, 1.0]);
        assert_eq!(curve.tpr, array![0.0, 0.5, 0.5, 1.0, 1.0]);
        assert!(close(curve.thresholds[0], 1.8));
        assert_eq!(curve.thresholds.slice(ndarray::s![1..]), array![0.8f32, 0.4, 0.35, 0.1]);
    }

    #[test]
    fn test_roc_without_negatives_uses_zero_axis() {
        let scores = array![0.2f32, 0.9];
        let target = array![1usize, 1];
        let curve = roc(scores.view(), target.view(), None, 1).unwrap();
        assert!(curve.fpr.iter().all(|&v| v == 0.0));
        assert_eq!(curve.tpr[curve.tpr.len() - 1], 1.0);
    }

    #[test]
    fn test_auroc_known_value() {
        let scores = array![0.1f32, 0.4, 0.35, 0.8];
        let target = array![0usize, 0, 1, 1];
        assert!(close(auroc(scores.view(), target.view(), None, 1).unwrap(), 0.75));
    }

    #[test]
    fn test_auroc_single_class_is_rejected() {
        let scores = array![0.1f32, 0.4];
        let target = array![1usize, 1];
        assert!(matches!(auroc(scores.view(), target.view(), None, 1), Err(MetricError::InvalidInput(_))));
    }

    #[test]
    fn test_weighted_roc_and_auroc() {
        let scores = array![0.1f32, 0.4, 0.35, 0.8];
        let target = array![0usize, 0, 1, 1];
        // the negative at 0.4 counts twice
        let weights = array![1.0f32, 2.0, 1.0, 1.0];
        let curve = roc(scores.view(), target.view(), Some(weights.view()), 1).unwrap();
        let expected_fpr = [0.0, 0.0, 2.0 / 3.0, 2.0 / 3.0, 1.0];
        assert!(curve.fpr.iter().zip(expected_fpr).all(|(&a, b)| close(a, b)));
        assert_eq!(curve.tpr, array![0.0, 0.5, 0.5, 1.0, 1.0]);

        let area = auroc(scores.view(), target.view(), Some(weights.view()), 1).unwrap();
        assert!(close(area, 2.0 / 3.0));
    }

    #[test]
    fn test_sample_weight_count_must_match() {
        let scores = array![0.1f32, 0.4, 0.35, 0.8];
        let target = array![0usize, 0, 1, 1];
        let weights = array![1.0f32, 2.0, 1.0];
        assert!(matches!(
            roc(scores.view(), target.view(), Some(weights.view()), 1),
            Err(MetricError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            precision_recall_curve(scores.view(), target.view(), Some(weights.view()), 1),
            Err(MetricError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_roc_lead_threshold_for_large_scores() {
        let scores = array![1e8f32, 3e8, 2e8];
        let target = array![0usize, 1, 1];
        let curve = roc(scores.view(), target.view(), None, 1).unwrap();
        assert_eq!(curve.thresholds[0], f32::INFINITY);
        for w in curve.thresholds.windows(2) {
            assert!(w[1] < w[0]);
        }
    }

    #[test]
    fn test_label_count_overflow_is_rejected() {
        let pred = array![usize::MAX];
        let target = array![0usize];
        assert!(matches!(get_num_classes(pred.view(), target.view(), None), Err(MetricError::InvalidInput(_))));
        assert!(matches!(to_onehot(pred.view(), None), Err(MetricError::InvalidInput(_))));
    }

    #[test]
    fn test_auc_directions() {
        let x = array![0.0f32, 1.0, 2.0];
        let y = array![0.0f32, 1.0, 1.0];
        assert!(close(auc(x.view(), y.view(), false).unwrap(), 1.5));

        let x_rev = array![2.0f32, 1.0, 0.0];
        let y_rev = array![1.0f32, 1.0, 0.0];
        assert!(close(auc(x_rev.view(), y_rev.view(), false).unwrap(), 1.5));

        let x_mixed = array![0.0f32, 2.0, 1.0];
        assert!(auc(x_mixed.view(), y.view(), false).is_err());
        assert!(auc(x_mixed.view(), y.view(), true).is_ok());
    }

    #[test]
    fn test_precision_recall_curve() {
        let scores = array![0.1f32, 0.4, 0.35, 0.8];
        let target = array![0usize, 0, 1, 1];
        let curve = precision_recall_curve(scores.view(), target.view(), None, 1).unwrap();
        assert_eq!(curve.recall, array![1.0, 0.5, 0.5, 0.0]);
        assert_eq!(curve.thresholds, array![0.35, 0.4, 0.8]);
        assert!(close(curve.precision[0], 2.0 / 3.0));
        assert_eq!(curve.precision[curve.precision.len() - 1], 1.0);
    }

    #[test]
    fn test_average_precision() {
        let scores = array![0.1f32, 0.4, 0.35, 0.8];
        let target = array![0usize, 0, 1, 1];
        let ap = average_precision(scores.view(), target.view(), None, 1).unwrap();
        assert!(close(ap, 0.5 * (2.0 / 3.0) + 0.5 * 1.0));
    }

    #[test]
    fn test_multiclass_roc_one_curve_per_class() {
        let scores = array![[0.7f32, 0.2, 0.1], [0.1, 0.8, 0.1], [0.2, 0.2, 0.6], [0.5, 0.3, 0.2]];
        let target = array![0usize, 1, 2, 1];
        let curves = multiclass_roc(scores.view(), target.view(), None, None).unwrap();
        assert_eq!(curves.len(), 3);
        assert!(multiclass_roc(scores.view(), target.view(), None, Some(4)).is_err());
    }

    #[test]
    fn test_dice_score() {
        let scores = array![[0.9f32, 0.1], [0.2, 0.8], [0.3, 0.7], [0.6, 0.4]];
        let target = array![0usize, 1, 0, 1];
        // class 1: tp 1, fp 1, fn 1
        let dice = dice_score(scores.view(), target.view(), false, 0.0, 0.0, Reduction::Mean).unwrap();
        assert!(close(dice[[]], 0.5));

        let per_class = dice_score(scores.view(), target.view(), true, 0.0, 0.0, Reduction::None).unwrap();
        assert_eq!(per_class.shape(), &[2]);
    }

    #[test]
    fn test_dice_no_foreground() {
        let scores = array![[0.9f32, 0.1], [0.8, 0.2]];
        let target = array![0usize, 0];
        let dice = dice_score(scores.view(), target.view(), false, 0.0, 0.7, Reduction::Mean).unwrap();
        assert!(close(dice[[]], 0.7));
    }

    #[test]
    fn test_iou_with_absent_and_ignored_classes() {
        let pred = array![0usize, 0, 1, 1];
        let target = array![0usize, 1, 1, 1];
        let scores = iou(pred.view(), target.view(), None, 0.0, Some(3), Reduction::None).unwrap();
        assert_eq!(scores, array![0.5f32, 2.0 / 3.0, 0.0].into_dyn());

        let scores = iou(pred.view(), target.view(), Some(0), 1.0, Some(3), Reduction::None).unwrap();
        assert_eq!(scores, array![2.0f32 / 3.0, 1.0].into_dyn());
    }
}
