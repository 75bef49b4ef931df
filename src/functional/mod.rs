//! Pure, stateless metric functions.
//!
//! These never communicate; the wrappers in [`crate::metric`] add the
//! distributed reduction on top.

pub mod classification;
pub mod reduction;
pub mod regression;

pub use classification::{
    accuracy, auc, auroc, average_precision, confusion_matrix, dice_score, f1_score, fbeta_score,
    get_num_classes, iou, multiclass_precision_recall_curve, multiclass_roc, precision,
    precision_recall, precision_recall_curve, recall, roc, stat_scores,
    stat_scores_multiple_classes, to_categorical, to_onehot, ClassStats, Curve, PrCurve,
    StatScores,
};
pub use reduction::{class_reduce, reduce, ClassAverage, Reduction};
pub use regression::{mae, mse, psnr, rmse, rmsle};
