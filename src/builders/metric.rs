use std::sync::Arc;

use crate::config::{ClassificationConfig, MetricConfig};
use crate::distributed::{single_process, ReduceOp, Reducer};
use crate::error::Result;
use crate::functional::ClassAverage;
use crate::metric::{
    Accuracy, AveragePrecision, Auroc, ConfusionMatrix, Dice, FBeta, Iou, Mae, Mse,
    MulticlassPrecisionRecallCurve, MulticlassRoc, Precision, PrecisionRecallCurve, Psnr, Recall, Rmse,
    Rmsle, Roc,
};

/// Builds metrics that share one configuration and one process group.
///
/// Scalar metrics take the configured reduce op. The confusion matrix keeps
/// summing and the curve metrics keep `ReduceOp::None`, since those are the
/// only reductions that make sense for their outputs.
pub struct MetricBuilder {
    config: MetricConfig,
    reducer: Arc<dyn Reducer>,
}

impl MetricBuilder {
    /// Create a builder with default configuration and no process group
    pub fn new() -> Self {
        Self::from_config(MetricConfig::default())
    }

    pub fn from_config(config: MetricConfig) -> Self {
        MetricBuilder {
            config,
            reducer: single_process(),
        }
    }

    /// Set the process group every built metric reduces over
    pub fn with_reducer(mut self, reducer: Arc<dyn Reducer>) -> Self {
        self.reducer = reducer;
        self
    }

    pub fn with_reduce_op(mut self, op: ReduceOp) -> Self {
        self.config.sync.reduce_op = op;
        self
    }

    pub fn with_num_classes(mut self, num_classes: usize) -> Self {
        self.config.classification.num_classes = Some(num_classes);
        self
    }

    pub fn with_average(mut self, average: ClassAverage) -> Self {
        self.config.classification.average = average;
        self
    }

    pub fn with_zero_division(mut self, value: f32) -> Self {
        self.config.classification.zero_division = value;
        self
    }

    pub fn with_pos_label(mut self, pos_label: usize) -> Self {
        self.config.classification.pos_label = pos_label;
        self
    }

    pub fn with_beta(mut self, beta: f32) -> Self {
        self.config.classification.beta = beta;
        self
    }

    pub fn config(&self) -> &MetricConfig {
        &self.config
    }

    fn classification(&self) -> Result<ClassificationConfig> {
        self.config.validate()?;
        Ok(self.config.classification)
    }

    fn reducer(&self) -> Arc<dyn Reducer> {
        Arc::clone(&self.reducer)
    }

    fn op(&self) -> ReduceOp {
        self.config.sync.reduce_op
    }

    pub fn accuracy(&self) -> Accuracy {
        Accuracy::new().with_reduce_op(self.op()).with_reducer(self.reducer())
    }

    pub fn precision(&self) -> Result<Precision> {
        Ok(Precision::new()
            .with_config(self.classification()?)
            .with_reduce_op(self.op())
            .with_reducer(self.reducer()))
    }

    pub fn recall(&self) -> Result<Recall> {
        Ok(Recall::new()
            .with_config(self.classification()?)
            .with_reduce_op(self.op())
            .with_reducer(self.reducer()))
    }

    /// F-beta with the configured beta
    pub fn fbeta(&self) -> Result<FBeta> {
        let config = self.classification()?;
        Ok(FBeta::new(config.beta)
            .with_config(config)
            .with_reduce_op(self.op())
            .with_reducer(self.reducer()))
    }

    /// F1 regardless of the configured beta
    pub fn f1(&self) -> Result<FBeta> {
        let config = ClassificationConfig {
            beta: 1.0,
            ..self.classification()?
        };
        Ok(FBeta::f1()
            .with_config(config)
            .with_reduce_op(self.op())
            .with_reducer(self.reducer()))
    }

    pub fn confusion_matrix(&self) -> Result<ConfusionMatrix> {
        let config = self.classification()?;
        let mut metric = ConfusionMatrix::new().with_reducer(self.reducer());
        if let Some(classes) = config.num_classes {
            metric = metric.with_num_classes(classes);
        }
        Ok(metric)
    }

    pub fn roc(&self) -> Result<Roc> {
        let config = self.classification()?;
        Ok(Roc::new().with_pos_label(config.pos_label).with_reducer(self.reducer()))
    }

    pub fn multiclass_roc(&self) -> Result<MulticlassRoc> {
        let config = self.classification()?;
        let mut metric = MulticlassRoc::new().with_reducer(self.reducer());
        if let Some(classes) = config.num_classes {
            metric = metric.with_num_classes(classes);
        }
        Ok(metric)
    }

    pub fn precision_recall_curve(&self) -> Result<PrecisionRecallCurve> {
        let config = self.classification()?;
        Ok(PrecisionRecallCurve::new()
            .with_pos_label(config.pos_label)
            .with_reducer(self.reducer()))
    }

    pub fn multiclass_precision_recall_curve(&self) -> Result<MulticlassPrecisionRecallCurve> {
        let config = self.classification()?;
        let mut metric = MulticlassPrecisionRecallCurve::new().with_reducer(self.reducer());
        if let Some(classes) = config.num_classes {
            metric = metric.with_num_classes(classes);
        }
        Ok(metric)
    }

    pub fn auroc(&self) -> Result<Auroc> {
        let config = self.classification()?;
        Ok(Auroc::new()
            .with_pos_label(config.pos_label)
            .with_reduce_op(self.op())
            .with_reducer(self.reducer()))
    }

    pub fn average_precision(&self) -> Result<AveragePrecision> {
        let config = self.classification()?;
        Ok(AveragePrecision::new()
            .with_pos_label(config.pos_label)
            .with_reduce_op(self.op())
            .with_reducer(self.reducer()))
    }

    pub fn dice(&self) -> Dice {
        Dice::new().with_reduce_op(self.op()).with_reducer(self.reducer())
    }

    pub fn iou(&self) -> Result<Iou> {
        let config = self.classification()?;
        let mut metric = Iou::new().with_reduce_op(self.op()).with_reducer(self.reducer());
        if let Some(classes) = config.num_classes {
            metric = metric.with_num_classes(classes);
        }
        Ok(metric)
    }

    pub fn mse(&self) -> Mse {
        Mse::new().with_reduce_op(self.op()).with_reducer(self.reducer())
    }

    pub fn rmse(&self) -> Rmse {
        Rmse::new().with_reduce_op(self.op()).with_reducer(self.reducer())
    }

    pub fn mae(&self) -> Mae {
        Mae::new().with_reduce_op(self.op()).with_reducer(self.reducer())
    }

    pub fn rmsle(&self) -> Rmsle {
        Rmsle::new().with_reduce_op(self.op()).with_reducer(self.reducer())
    }

    pub fn psnr(&self) -> Psnr {
        Psnr::new().with_reduce_op(self.op()).with_reducer(self.reducer())
    }
}

impl Default for MetricBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributed::LocalProcessGroup;
    use crate::error::MetricError;
    use crate::metric::Synchronized;
    use std::time::Duration;

    #[test]
    fn test_builder_applies_config() {
        let builder = MetricBuilder::new()
            .with_reduce_op(ReduceOp::Sum)
            .with_num_classes(4)
            .with_average(ClassAverage::Macro);

        let precision = builder.precision().unwrap();
        assert_eq!(precision.sync_context().op(), ReduceOp::Sum);
        assert_eq!(precision.config().num_classes, Some(4));
        assert_eq!(precision.config().average, ClassAverage::Macro);

        assert_eq!(builder.roc().unwrap().sync_context().op(), ReduceOp::None);
        assert_eq!(builder.confusion_matrix().unwrap().sync_context().op(), ReduceOp::Sum);
    }

    #[test]
    fn test_builder_f1_ignores_configured_beta() {
        let builder = MetricBuilder::new().with_beta(2.0);
        assert_eq!(builder.fbeta().unwrap().beta(), 2.0);
        assert_eq!(builder.f1().unwrap().beta(), 1.0);
        assert_eq!(builder.f1().unwrap().name(), "f1");
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let builder = MetricBuilder::new().with_num_classes(2).with_pos_label(5);
        assert!(matches!(builder.auroc(), Err(MetricError::InvalidParameter { .. })));
    }

    #[test]
    fn test_builder_shares_reducer() {
        let mut reducers = LocalProcessGroup::new(2, Duration::from_secs(1)).unwrap();
        let builder = MetricBuilder::new().with_reducer(Arc::new(reducers.remove(0)));
        let accuracy = builder.accuracy();
        let mse = builder.mse();
        assert!(accuracy.sync_context().is_active());
        assert_eq!(mse.sync_context().reducer().world_size(), 2);
    }
}
