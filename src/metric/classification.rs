//! Classification metrics
//!
//! Label metrics accept predictions as labels `(N,)` or class scores `(N, C)`;
//! curve metrics take scores, `(N,)` for binary or `(N, C)` for one-vs-rest.
//! Targets are always labels `(N,)`.
//!
//! Curve metrics default to [`ReduceOp::None`]: curves computed on different
//! shards rarely share a length, so averaging them point-wise is opt-in.

use super::{Metric, SyncContext};
use crate::config::ClassificationConfig;
use crate::distributed::ReduceOp;
use crate::error::Result;
use crate::functional::{self, ClassAverage, Reduction};
use crate::types::{as_labels, as_matrix, as_vector, check_leading_dim, resolve_labels, IntoTensor, Tensor};

type CurveTensors = (Tensor, Tensor, Tensor);

macro_rules! classification_setters {
    ($metric:ty) => {
        impl $metric {
            pub fn with_config(mut self, config: ClassificationConfig) -> Self {
                self.config = config;
                self
            }

            pub fn with_num_classes(mut self, num_classes: usize) -> Self {
                self.config.num_classes = Some(num_classes);
                self
            }

            pub fn with_average(mut self, average: ClassAverage) -> Self {
                self.config.average = average;
                self
            }

            /// Score used when a class ratio has a zero denominator
            pub fn with_zero_division(mut self, value: f32) -> Self {
                self.config.zero_division = value;
                self
            }

            pub fn config(&self) -> &ClassificationConfig {
                &self.config
            }
        }
    };
}

fn curve_inputs(pred: &Tensor, target: &Tensor) -> Result<ndarray::Array1<usize>> {
    check_leading_dim(pred, target)?;
    as_labels(as_vector(target, "target")?)
}

/// Fraction of exact matches
#[derive(Debug, Clone, Default)]
pub struct Accuracy {
    sync: SyncContext,
}

impl Accuracy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl_synchronized!(Accuracy, "accuracy");

impl Metric for Accuracy {
    type Output = Tensor;

    fn compute(&self, pred: &Tensor, target: &Tensor) -> Result<Tensor> {
        let (pred, target) = resolve_labels(pred, target)?;
        Ok(functional::accuracy(pred.view(), target.view())?.into_tensor())
    }
}

/// Count table of true (rows) against predicted (columns) classes.
///
/// Set `num_classes` when reducing across ranks so every shard produces a
/// table of the same size.
#[derive(Debug, Clone)]
pub struct ConfusionMatrix {
    num_classes: Option<usize>,
    normalize: bool,
    sync: SyncContext,
}

impl ConfusionMatrix {
    pub fn new() -> Self {
        Self {
            num_classes: None,
            normalize: false,
            sync: SyncContext::new(ReduceOp::Sum),
        }
    }

    pub fn with_num_classes(mut self, num_classes: usize) -> Self {
        self.num_classes = Some(num_classes);
        self
    }

    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }
}

impl Default for ConfusionMatrix {
    fn default() -> Self {
        Self::new()
    }
}

impl_synchronized!(ConfusionMatrix, "confusion_matrix");

impl Metric for ConfusionMatrix {
    type Output = Tensor;

    fn compute(&self, pred: &Tensor, target: &Tensor) -> Result<Tensor> {
        let (pred, target) = resolve_labels(pred, target)?;
        let matrix = functional::confusion_matrix(pred.view(), target.view(), self.num_classes, self.normalize)?;
        Ok(matrix.into_tensor())
    }
}

/// Fraction of predicted positives that are correct
#[derive(Debug, Clone, Default)]
pub struct Precision {
    config: ClassificationConfig,
    sync: SyncContext,
}

impl Precision {
    pub fn new() -> Self {
        Self::default()
    }
}

classification_setters!(Precision);
impl_synchronized!(Precision, "precision");

impl Metric for Precision {
    type Output = Tensor;

    fn compute(&self, pred: &Tensor, target: &Tensor) -> Result<Tensor> {
        self.config.validate()?;
        let (pred, target) = resolve_labels(pred, target)?;
        let c = &self.config;
        functional::precision(pred.view(), target.view(), c.num_classes, c.average, c.zero_division)
    }
}

/// Fraction of actual positives that are found
#[derive(Debug, Clone, Default)]
pub struct Recall {
    config: ClassificationConfig,
    sync: SyncContext,
}

impl Recall {
    pub fn new() -> Self {
        Self::default()
    }
}

classification_setters!(Recall);
impl_synchronized!(Recall, "recall");

impl Metric for Recall {
    type Output = Tensor;

    fn compute(&self, pred: &Tensor, target: &Tensor) -> Result<Tensor> {
        self.config.validate()?;
        let (pred, target) = resolve_labels(pred, target)?;
        let c = &self.config;
        functional::recall(pred.view(), target.view(), c.num_classes, c.average, c.zero_division)
    }
}

/// F-beta score; [`FBeta::f1`] gives the balanced F1 score
#[derive(Debug, Clone)]
pub struct FBeta {
    name: String,
    config: ClassificationConfig,
    sync: SyncContext,
}

impl FBeta {
    pub fn new(beta: f32) -> Self {
        Self {
            name: format!("f{}", beta),
            config: ClassificationConfig {
                beta,
                ..Default::default()
            },
            sync: SyncContext::default(),
        }
    }

    pub fn f1() -> Self {
        Self::new(1.0)
    }

    pub fn beta(&self) -> f32 {
        self.config.beta
    }
}

classification_setters!(FBeta);
impl_synchronized!(FBeta, |metric| &metric.name);

impl Metric for FBeta {
    type Output = Tensor;

    fn compute(&self, pred: &Tensor, target: &Tensor) -> Result<Tensor> {
        self.config.validate()?;
        let (pred, target) = resolve_labels(pred, target)?;
        let c = &self.config;
        functional::fbeta_score(pred.view(), target.view(), c.beta, c.num_classes, c.average, c.zero_division)
    }
}

/// ROC curve as `(fpr, tpr, thresholds)` from `(N,)` scores
#[derive(Debug, Clone)]
pub struct Roc {
    pos_label: usize,
    sync: SyncContext,
}

impl Roc {
    pub fn new() -> Self {
        Self {
            pos_label: 1,
            sync: SyncContext::new(ReduceOp::None),
        }
    }

    pub fn with_pos_label(mut self, pos_label: usize) -> Self {
        self.pos_label = pos_label;
        self
    }
}

impl Default for Roc {
    fn default() -> Self {
        Self::new()
    }
}

impl_synchronized!(Roc, "roc");

impl Metric for Roc {
    type Output = CurveTensors;

    fn compute(&self, pred: &Tensor, target: &Tensor) -> Result<CurveTensors> {
        let labels = curve_inputs(pred, target)?;
        let curve = functional::roc(as_vector(pred, "scores")?, labels.view(), None, self.pos_label)?;
        Ok((curve.fpr.into_tensor(), curve.tpr.into_tensor(), curve.thresholds.into_tensor()))
    }
}

/// One-vs-rest ROC curves from `(N, C)` scores
#[derive(Debug, Clone)]
pub struct MulticlassRoc {
    num_classes: Option<usize>,
    sync: SyncContext,
}

impl MulticlassRoc {
    pub fn new() -> Self {
        Self {
            num_classes: None,
            sync: SyncContext::new(ReduceOp::None),
        }
    }

    pub fn with_num_classes(mut self, num_classes: usize) -> Self {
        self.num_classes = Some(num_classes);
        self
    }
}

impl Default for MulticlassRoc {
    fn default() -> Self {
        Self::new()
    }
}

impl_synchronized!(MulticlassRoc, "multiclass_roc");

impl Metric for MulticlassRoc {
    type Output = Vec<CurveTensors>;

    fn compute(&self, pred: &Tensor, target: &Tensor) -> Result<Vec<CurveTensors>> {
        let labels = curve_inputs(pred, target)?;
        let curves = functional::multiclass_roc(as_matrix(pred, "scores")?, labels.view(), None, self.num_classes)?;
        Ok(curves
            .into_iter()
            .map(|c| (c.fpr.into_tensor(), c.tpr.into_tensor(), c.thresholds.into_tensor()))
            .collect())
    }
}

/// Precision-recall curve as `(precision, recall, thresholds)` from `(N,)` scores
#[derive(Debug, Clone)]
pub struct PrecisionRecallCurve {
    pos_label: usize,
    sync: SyncContext,
}

impl PrecisionRecallCurve {
    pub fn new() -> Self {
        Self {
            pos_label: 1,
            sync: SyncContext::new(ReduceOp::None),
        }
    }

    pub fn with_pos_label(mut self, pos_label: usize) -> Self {
        self.pos_label = pos_label;
        self
    }
}

impl Default for PrecisionRecallCurve {
    fn default() -> Self {
        Self::new()
    }
}

impl_synchronized!(PrecisionRecallCurve, "precision_recall_curve");

impl Metric for PrecisionRecallCurve {
    type Output = CurveTensors;

    fn compute(&self, pred: &Tensor, target: &Tensor) -> Result<CurveTensors> {
        let labels = curve_inputs(pred, target)?;
        let curve = functional::precision_recall_curve(as_vector(pred, "scores")?, labels.view(), None, self.pos_label)?;
        Ok((curve.precision.into_tensor(), curve.recall.into_tensor(), curve.thresholds.into_tensor()))
    }
}

/// One-vs-rest precision-recall curves from `(N, C)` scores
#[derive(Debug, Clone)]
pub struct MulticlassPrecisionRecallCurve {
    num_classes: Option<usize>,
    sync: SyncContext,
}

impl MulticlassPrecisionRecallCurve {
    pub fn new() -> Self {
        Self {
            num_classes: None,
            sync: SyncContext::new(ReduceOp::None),
        }
    }

    pub fn with_num_classes(mut self, num_classes: usize) -> Self {
        self.num_classes = Some(num_classes);
        self
    }
}

impl Default for MulticlassPrecisionRecallCurve {
    fn default() -> Self {
        Self::new()
    }
}

impl_synchronized!(MulticlassPrecisionRecallCurve, "multiclass_precision_recall_curve");

impl Metric for MulticlassPrecisionRecallCurve {
    type Output = Vec<CurveTensors>;

    fn compute(&self, pred: &Tensor, target: &Tensor) -> Result<Vec<CurveTensors>> {
        let labels = curve_inputs(pred, target)?;
        let curves = functional::multiclass_precision_recall_curve(
            as_matrix(pred, "scores")?,
            labels.view(),
            None,
            self.num_classes,
        )?;
        Ok(curves
            .into_iter()
            .map(|c| (c.precision.into_tensor(), c.recall.into_tensor(), c.thresholds.into_tensor()))
            .collect())
    }
}

/// Area under the ROC curve from `(N,)` scores
#[derive(Debug, Clone)]
pub struct Auroc {
    pos_label: usize,
    sync: SyncContext,
}

impl Auroc {
    pub fn new() -> Self {
        Self {
            pos_label: 1,
            sync: SyncContext::default(),
        }
    }

    pub fn with_pos_label(mut self, pos_label: usize) -> Self {
        self.pos_label = pos_label;
        self
    }
}

impl Default for Auroc {
    fn default() -> Self {
        Self::new()
    }
}

impl_synchronized!(Auroc, "auroc");

impl Metric for Auroc {
    type Output = Tensor;

    fn compute(&self, pred: &Tensor, target: &Tensor) -> Result<Tensor> {
        let labels = curve_inputs(pred, target)?;
        Ok(functional::auroc(as_vector(pred, "scores")?, labels.view(), None, self.pos_label)?.into_tensor())
    }
}

/// Average precision from `(N,)` scores
#[derive(Debug, Clone)]
pub struct AveragePrecision {
    pos_label: usize,
    sync: SyncContext,
}

impl AveragePrecision {
    pub fn new() -> Self {
        Self {
            pos_label: 1,
            sync: SyncContext::default(),
        }
    }

    pub fn with_pos_label(mut self, pos_label: usize) -> Self {
        self.pos_label = pos_label;
        self
    }
}

impl Default for AveragePrecision {
    fn default() -> Self {
        Self::new()
    }
}

impl_synchronized!(AveragePrecision, "average_precision");

impl Metric for AveragePrecision {
    type Output = Tensor;

    fn compute(&self, pred: &Tensor, target: &Tensor) -> Result<Tensor> {
        let labels = curve_inputs(pred, target)?;
        Ok(functional::average_precision(as_vector(pred, "scores")?, labels.view(), None, self.pos_label)?
            .into_tensor())
    }
}

/// Dice coefficient from `(N, C)` scores
#[derive(Debug, Clone)]
pub struct Dice {
    background: bool,
    nan_score: f32,
    no_fg_score: f32,
    reduction: Reduction,
    sync: SyncContext,
}

impl Dice {
    pub fn new() -> Self {
        Self {
            background: false,
            nan_score: 0.0,
            no_fg_score: 0.0,
            reduction: Reduction::Mean,
            sync: SyncContext::default(),
        }
    }

    /// Also score class 0
    pub fn with_background(mut self, background: bool) -> Self {
        self.background = background;
        self
    }

    pub fn with_nan_score(mut self, score: f32) -> Self {
        self.nan_score = score;
        self
    }

    pub fn with_no_fg_score(mut self, score: f32) -> Self {
        self.no_fg_score = score;
        self
    }

    pub fn with_reduction(mut self, reduction: Reduction) -> Self {
        self.reduction = reduction;
        self
    }
}

impl Default for Dice {
    fn default() -> Self {
        Self::new()
    }
}

impl_synchronized!(Dice, "dice");

impl Metric for Dice {
    type Output = Tensor;

    fn compute(&self, pred: &Tensor, target: &Tensor) -> Result<Tensor> {
        let labels = curve_inputs(pred, target)?;
        functional::dice_score(
            as_matrix(pred, "scores")?,
            labels.view(),
            self.background,
            self.nan_score,
            self.no_fg_score,
            self.reduction,
        )
    }
}

/// Intersection over union per class
#[derive(Debug, Clone)]
pub struct Iou {
    ignore_index: Option<usize>,
    absent_score: f32,
    num_classes: Option<usize>,
    reduction: Reduction,
    sync: SyncContext,
}

impl Iou {
    pub fn new() -> Self {
        Self {
            ignore_index: None,
            absent_score: 0.0,
            num_classes: None,
            reduction: Reduction::Mean,
            sync: SyncContext::default(),
        }
    }

    pub fn with_ignore_index(mut self, class: usize) -> Self {
        self.ignore_index = Some(class);
        self
    }

    pub fn with_absent_score(mut self, score: f32) -> Self {
        self.absent_score = score;
        self
    }

    pub fn with_num_classes(mut self, num_classes: usize) -> Self {
        self.num_classes = Some(num_classes);
        self
    }

    pub fn with_reduction(mut self, reduction: Reduction) -> Self {
        self.reduction = reduction;
        self
    }
}

impl Default for Iou {
    fn default() -> Self {
        Self::new()
    }
}

impl_synchronized!(Iou, "iou");

impl Metric for Iou {
    type Output = Tensor;

    fn compute(&self, pred: &Tensor, target: &Tensor) -> Result<Tensor> {
        let (pred, target) = resolve_labels(pred, target)?;
        functional::iou(
            pred.view(),
            target.view(),
            self.ignore_index,
            self.absent_score,
            self.num_classes,
            self.reduction,
        )
    }
}
