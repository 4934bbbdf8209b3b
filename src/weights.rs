//! Success-metric weights.
//!
//! Each of the four outcome metrics contributes `count * weight` to a row's
//! successes. A weight is either supplied explicitly or inferred from the
//! data as the cost (in cents) per unit of that metric.

use std::{collections::BTreeMap, fmt, fs::File, io::BufReader, path::Path, str::FromStr};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::{PrepError, PrepResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Impression,
    Engagement,
    Click,
    Conversion,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Impression,
        Metric::Engagement,
        Metric::Click,
        Metric::Conversion,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Metric::Impression => "impression",
            Metric::Engagement => "engagement",
            Metric::Click => "click",
            Metric::Conversion => "conversion",
        }
    }

    /// Canonical column holding this metric's counts.
    pub fn column(self) -> &'static str {
        match self {
            Metric::Impression => "impressions",
            Metric::Engagement => "engagements",
            Metric::Click => "clicks",
            Metric::Conversion => "conversions",
        }
    }

    fn position(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = PrepError;

    fn from_str(value: &str) -> PrepResult<Self> {
        let lowered = value.trim().to_ascii_lowercase();
        let base = lowered.strip_suffix("_weight").unwrap_or(&lowered);
        let singular = base.strip_suffix('s').unwrap_or(base);
        Metric::ALL
            .into_iter()
            .find(|metric| metric.name() == singular)
            .ok_or_else(|| PrepError::invalid_weight(value.trim(), "unknown metric"))
    }
}

/// Explicit weights supplied by the caller. Metrics without an entry are
/// inferred from the data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightOverrides(BTreeMap<Metric, f64>);

impl WeightOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, metric: Metric, weight: f64) -> PrepResult<()> {
        validate_weight(metric, weight)?;
        self.0.insert(metric, weight);
        Ok(())
    }

    pub fn with(mut self, metric: Metric, weight: f64) -> PrepResult<Self> {
        self.set(metric, weight)?;
        Ok(self)
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.0.get(&metric).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parses `metric=value` assignments such as `click=2.5`.
    pub fn parse_assignments(assignments: &[String]) -> PrepResult<Self> {
        let mut overrides = Self::new();
        for assignment in assignments {
            let (metric, weight) = parse_assignment(assignment)?;
            overrides.set(metric, weight)?;
        }
        Ok(overrides)
    }

    /// Loads a YAML mapping of metric name to weight, e.g. `click: 2.5`.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening weights file {path:?}"))?;
        let overrides: Self = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing weights YAML {path:?}"))?;
        overrides.validate()?;
        Ok(overrides)
    }

    /// Layers `other` on top of `self`; entries in `other` win.
    pub fn merged(mut self, other: &WeightOverrides) -> Self {
        for (metric, weight) in &other.0 {
            self.0.insert(*metric, *weight);
        }
        self
    }

    pub fn validate(&self) -> PrepResult<()> {
        self.0
            .iter()
            .try_for_each(|(metric, weight)| validate_weight(*metric, *weight))
    }

    /// Resolves all four weights against the column totals of the rows that
    /// survived inactive-row exclusion.
    pub fn resolve(&self, totals: &MetricTotals) -> PrepResult<MetricWeights> {
        self.validate()?;
        let mut resolved = [0.0; 4];
        for metric in Metric::ALL {
            resolved[metric.position()] = match self.get(metric) {
                Some(weight) => weight,
                None => totals.inferred_weight(metric),
            };
        }
        Ok(MetricWeights(resolved))
    }
}

fn parse_assignment(assignment: &str) -> PrepResult<(Metric, f64)> {
    let (name, raw) = assignment
        .split_once('=')
        .ok_or_else(|| PrepError::invalid_weight(assignment.trim(), "expected metric=value"))?;
    let metric = name.parse::<Metric>()?;
    let raw = raw.trim();
    let weight = raw.parse::<f64>().map_err(|_| {
        PrepError::invalid_weight(metric.name(), format!("'{raw}' is not a number"))
    })?;
    Ok((metric, weight))
}

fn validate_weight(metric: Metric, weight: f64) -> PrepResult<()> {
    if !weight.is_finite() {
        return Err(PrepError::invalid_weight(metric.name(), "must be finite"));
    }
    if weight < 0.0 {
        return Err(PrepError::invalid_weight(
            metric.name(),
            format!("{weight} is negative"),
        ));
    }
    Ok(())
}

/// Column sums used for weight inference.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricTotals {
    pub cost: f64,
    pub counts: [f64; 4],
}

impl MetricTotals {
    pub fn add(&mut self, cost: f64, counts: &[f64; 4]) {
        self.cost += cost;
        for (total, count) in self.counts.iter_mut().zip(counts) {
            *total += count;
        }
    }

    pub fn count(&self, metric: Metric) -> f64 {
        self.counts[metric.position()]
    }

    /// `sum(cost) * 100 / sum(metric)`, or zero for a metric never observed.
    pub fn inferred_weight(&self, metric: Metric) -> f64 {
        let observed = self.count(metric);
        if observed == 0.0 {
            0.0
        } else {
            self.cost * 100.0 / observed
        }
    }
}

/// Fully resolved weights for one normalizer run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricWeights([f64; 4]);

impl MetricWeights {
    pub fn get(&self, metric: Metric) -> f64 {
        self.0[metric.position()]
    }

    /// Weighted blend of the four outcome counts.
    pub fn successes(&self, counts: &[f64; 4]) -> f64 {
        self.0.iter().zip(counts).map(|(w, c)| w * c).sum()
    }
}

impl Serialize for MetricWeights {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let map = Metric::ALL
            .into_iter()
            .map(|metric| (metric, self.get(metric)))
            .collect::<BTreeMap<_, _>>();
        map.serialize(serializer)
    }
}
