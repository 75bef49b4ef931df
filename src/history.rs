//! Per-step record of reduced metric values
//!
//! Every rank ends up with the same reduced values, so one rank (usually 0)
//! is enough to keep the history and write it out.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MetricError, Result};
use crate::types::Tensor;

/// One recorded value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub step: u64,
    pub value: f32,
}

/// Summary statistics of one metric series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricSummary {
    pub mean: f32,
    pub std_dev: f32,
    pub min: f32,
    pub max: f32,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricHistory {
    series: BTreeMap<String, Vec<Record>>,
}

impl MetricHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a metric result; tensors with more than one element are
    /// recorded by their mean
    pub fn record(&mut self, name: &str, step: u64, value: &Tensor) -> Result<()> {
        let value = value.mean().ok_or_else(|| {
            MetricError::invalid_input(format!("cannot record empty result for {}", name))
        })?;
        self.record_scalar(name, step, value);
        Ok(())
    }

    pub fn record_scalar(&mut self, name: &str, step: u64, value: f32) {
        self.series
            .entry(name.to_string())
            .or_default()
            .push(Record { step, value });
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&[Record]> {
        self.series.get(name).map(Vec::as_slice)
    }

    pub fn latest(&self, name: &str) -> Option<f32> {
        self.series.get(name)?.last().map(|r| r.value)
    }

    /// Mean of the last `window` values, or `None` until that many exist
    pub fn moving_average(&self, name: &str, window: usize) -> Option<f32> {
        let records = self.series.get(name)?;
        if window == 0 || records.len() < window {
            return None;
        }
        let sum: f32 = records.iter().rev().take(window).map(|r| r.value).sum();
        Some(sum / window as f32)
    }

    pub fn summary(&self, name: &str) -> Option<MetricSummary> {
        let records = self.series.get(name)?;
        if records.is_empty() {
            return None;
        }

        let count = records.len();
        let mean = records.iter().map(|r| r.value).sum::<f32>() / count as f32;
        let variance = records
            .iter()
            .map(|r| (r.value - mean).powi(2))
            .sum::<f32>()
            / count as f32;

        Some(MetricSummary {
            mean,
            std_dev: variance.sqrt(),
            min: records.iter().map(|r| r.value).fold(f32::INFINITY, f32::min),
            max: records.iter().map(|r| r.value).fold(f32::NEG_INFINITY, f32::max),
            count,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn clear(&mut self) {
        self.series.clear();
    }

    /// Save as JSON.
    ///
    /// JSON has no encoding for infinities (a perfect PSNR, for instance);
    /// use [`MetricHistory::save_binary`] for such histories.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some((name, record)) = self.non_finite() {
            return Err(MetricError::Serialization(format!(
                "{} at step {} is {}, which JSON cannot represent",
                name, record.step, record.value
            )));
        }
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn save_binary<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(writer, self)?;
        Ok(())
    }

    pub fn load_binary<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(bincode::deserialize_from(reader)?)
    }

    /// Write every record as `step,tag,value` rows, ordered by tag then step
    pub fn write_csv<W: Write>(&self, mut writer: W) -> Result<()> {
        writeln!(writer, "step,tag,value")?;
        for (name, records) in &self.series {
            for record in records {
                writeln!(writer, "{},{},{}", record.step, csv_field(name), record.value)?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    pub fn export_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.write_csv(BufWriter::new(File::create(path)?))
    }

    fn non_finite(&self) -> Option<(&str, &Record)> {
        self.series.iter().find_map(|(name, records)| {
            records
                .iter()
                .find(|r| !r.value.is_finite())
                .map(|r| (name.as_str(), r))
        })
    }
}

/// Quote a CSV field when it holds a separator, quote or line break
fn csv_field(field: &str) -> Cow<'_, str> {
    if field.contains(|c: char| matches!(c, ',' | '"' | '\n' | '\r')) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IntoTensor;
    use ndarray::array;

    fn sample() -> MetricHistory {
        let mut history = MetricHistory::new();
        for (step, value) in [0.5f32, 0.6, 0.7, 0.8].iter().enumerate() {
            history.record("accuracy", step as u64, &value.into_tensor()).unwrap();
        }
        history
    }

    #[test]
    fn test_latest_and_moving_average() {
        let history = sample();
        assert_eq!(history.latest("accuracy"), Some(0.8));
        assert!((history.moving_average("accuracy", 2).unwrap() - 0.75).abs() < 1e-6);
        assert_eq!(history.moving_average("accuracy", 5), None);
        assert_eq!(history.latest("loss"), None);
    }

    #[test]
    fn test_non_scalar_recorded_by_mean() {
        let mut history = MetricHistory::new();
        history.record("iou", 3, &array![0.2f32, 0.4].into_dyn()).unwrap();
        let records = history.get("iou").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].step, 3);
        assert!((records[0].value - 0.3).abs() < 1e-6);

        let empty = Tensor::zeros(ndarray::IxDyn(&[0]));
        assert!(history.record("iou", 4, &empty).is_err());
    }

    #[test]
    fn test_summary() {
        let summary = sample().summary("accuracy").unwrap();
        assert_eq!(summary.count, 4);
        assert_eq!(summary.min, 0.5);
        assert_eq!(summary.max, 0.8);
        assert!((summary.mean - 0.65).abs() < 1e-6);
    }

    #[test]
    fn test_json_and_binary_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let history = sample();

        let json = dir.path().join("history.json");
        history.save_json(&json).unwrap();
        assert_eq!(MetricHistory::load_json(&json).unwrap(), history);

        let bin = dir.path().join("history.bin");
        history.save_binary(&bin).unwrap();
        assert_eq!(MetricHistory::load_binary(&bin).unwrap(), history);
    }

    #[test]
    fn test_infinite_values_need_binary_format() {
        let dir = tempfile::tempdir().unwrap();
        let mut history = MetricHistory::new();
        history.record_scalar("psnr", 0, f32::INFINITY);

        let err = history.save_json(dir.path().join("h.json")).unwrap_err();
        assert!(matches!(err, MetricError::Serialization(_)));

        let bin = dir.path().join("h.bin");
        history.save_binary(&bin).unwrap();
        assert_eq!(MetricHistory::load_binary(&bin).unwrap().latest("psnr"), Some(f32::INFINITY));
    }

    #[test]
    fn test_csv_export() {
        let mut history = MetricHistory::new();
        history.record_scalar("mse", 1, 0.25);
        history.record_scalar("accuracy", 1, 0.5);

        let mut out = Vec::new();
        history.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "step,tag,value\n1,accuracy,0.5\n1,mse,0.25\n");
    }

    #[test]
    fn test_csv_quotes_awkward_tags() {
        let mut history = MetricHistory::new();
        history.record_scalar("f1,macro", 1, 0.5);
        history.record_scalar("say \"hi\"", 2, 0.25);

        let mut out = Vec::new();
        history.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "step,tag,value\n1,\"f1,macro\",0.5\n2,\"say \"\"hi\"\"\",0.25\n");
    }
}
