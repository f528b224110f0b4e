// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Plotting keyed records (`{"loss": 0.3, "reward": 1.2}`) without declaring
//! the series up front.

use tracing::debug;

use crate::buffer::CircularSeriesBuffer;
use crate::error::{SrvError, SrvResult};
use crate::options::SrvOptions;

/// Lazily-created series buffer fed with keyed records.
///
/// The first record fixes the legend: either its own keys in iteration order,
/// or the configured `(key, weight)` pairs, in which case `weight * value` is
/// plotted for each key. x is the running sample count.
#[derive(Debug)]
pub struct DictPlot {
    options: SrvOptions,
    weights: Option<Vec<(String, f64)>>,
    buffer: Option<CircularSeriesBuffer>,
}

impl DictPlot {
    pub fn new(options: SrvOptions) -> Self {
        Self {
            options,
            weights: None,
            buffer: None,
        }
    }

    /// Plot only these keys, scaled by their weights.
    pub fn with_weights<I, K>(mut self, weights: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        self.weights = Some(weights.into_iter().map(|(k, w)| (k.into(), w)).collect());
        self
    }

    /// Append one record, creating the buffer (and its viewer) on first use.
    pub fn append<I, K>(&mut self, record: I) -> SrvResult<()>
    where
        I: IntoIterator<Item = (K, f64)>,
        K: AsRef<str>,
    {
        let record: Vec<(K, f64)> = record.into_iter().collect();

        let values: Vec<(String, f64)> = match &self.weights {
            Some(weights) => weights
                .iter()
                .map(|(key, weight)| {
                    record
                        .iter()
                        .find(|(k, _)| k.as_ref() == key.as_str())
                        .map(|(_, value)| (key.clone(), weight * value))
                        .ok_or_else(|| SrvError::KeyNotFound(key.clone()))
                })
                .collect::<SrvResult<_>>()?,
            None => record
                .iter()
                .map(|(k, v)| (k.as_ref().to_string(), *v))
                .collect(),
        };

        if self.buffer.is_none() {
            let legends: Vec<String> = values.iter().map(|(k, _)| k.clone()).collect();
            debug!("Creating dict plot with series {:?}", legends);
            let options = self.options.clone().with_legends(legends);
            self.buffer = Some(CircularSeriesBuffer::new(options)?);
        }
        match &mut self.buffer {
            Some(buffer) => buffer.append_values(&values),
            None => Err(SrvError::NoSeries),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.buffer.is_some()
    }

    pub fn buffer(&self) -> Option<&CircularSeriesBuffer> {
        self.buffer.as_ref()
    }

    /// Clear every series; a no-op before the first record.
    pub fn clear(&mut self) -> SrvResult<()> {
        match &mut self.buffer {
            Some(buffer) => buffer.clear_all(),
            None => Ok(()),
        }
    }

    /// Close the underlying buffer, if one was created.
    pub fn close(self) -> SrvResult<()> {
        match self.buffer {
            Some(buffer) => buffer.close(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::LaunchMode;

    fn options(dir: &tempfile::TempDir) -> SrvOptions {
        SrvOptions::default()
            .with_capacity(16)
            .with_region_dir(dir.path())
            .with_launch_mode(LaunchMode::Detached)
    }

    #[test]
    fn test_lazy_creation_from_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let mut plot = DictPlot::new(options(&tmp));
        assert!(!plot.is_initialized());
        plot.clear().unwrap();

        plot.append([("a", 1.0), ("b", 2.0)]).unwrap();
        plot.append([("a", 3.0), ("b", 4.0)]).unwrap();

        let buffer = plot.buffer().unwrap();
        assert_eq!(buffer.legends(), vec!["a", "b"]);
        assert_eq!(&buffer.series("b").unwrap().y[..2], &[2.0, 4.0]);
        assert_eq!(&buffer.series("b").unwrap().x[..2], &[0.0, 1.0]);
        plot.close().unwrap();
    }

    #[test]
    fn test_weighted_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let mut plot = DictPlot::new(options(&tmp)).with_weights([("reward", 0.5)]);
        plot.append([("reward", 10.0), ("ignored", 3.0)]).unwrap();

        let buffer = plot.buffer().unwrap();
        assert_eq!(buffer.legends(), vec!["reward"]);
        assert_eq!(buffer.series("reward").unwrap().y[0], 5.0);

        let missing = plot.append([("ignored", 1.0)]);
        assert!(matches!(missing, Err(SrvError::KeyNotFound(k)) if k == "reward"));
        plot.close().unwrap();
    }

    #[test]
    fn test_clear_then_continue() {
        let tmp = tempfile::tempdir().unwrap();
        let mut plot = DictPlot::new(options(&tmp));
        for i in 0..5 {
            plot.append([("a", i as f64)]).unwrap();
        }
        plot.clear().unwrap();
        plot.append([("a", 42.0)]).unwrap();

        let a = plot.buffer().unwrap().series("a").unwrap();
        assert_eq!((a.x[0], a.y[0]), (0.0, 42.0));
        plot.close().unwrap();
    }
}
