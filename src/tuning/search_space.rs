//! Hyperparameter values, search spaces and regular grids

use crate::error::{BenchError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Concrete hyperparameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Str(String),
}

impl ParamValue {
    /// Get as float (integers widen)
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::Str(_) => None,
        }
    }

    /// Get as int. Floats are accepted only when integral.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            ParamValue::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Str(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

/// Transformation applied to a range before spacing grid levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scale {
    Linear,
    /// `low`/`high` are base-10 exponents
    Log10,
    /// `low`/`high` are base-2 exponents
    Log2,
}

/// Candidate values for one tunable hyperparameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchSpace {
    /// Explicit candidate values, used in the given order
    Values(Vec<ParamValue>),
    /// `levels` evenly spaced points between `low` and `high` on `scale`
    Range {
        low: f64,
        high: f64,
        scale: Scale,
        integer: bool,
    },
    /// Integers from `low` up to the number of predictors after preprocessing
    PredictorCount { low: i64 },
}

impl SearchSpace {
    pub fn values(values: Vec<ParamValue>) -> Self {
        SearchSpace::Values(values)
    }

    pub fn int_range(low: i64, high: i64) -> Self {
        SearchSpace::Range {
            low: low as f64,
            high: high as f64,
            scale: Scale::Linear,
            integer: true,
        }
    }

    pub fn float_range(low: f64, high: f64) -> Self {
        SearchSpace::Range {
            low,
            high,
            scale: Scale::Linear,
            integer: false,
        }
    }

    /// Range given as base-10 exponents
    pub fn log10_range(low_exp: f64, high_exp: f64) -> Self {
        SearchSpace::Range {
            low: low_exp,
            high: high_exp,
            scale: Scale::Log10,
            integer: false,
        }
    }

    /// Range given as base-2 exponents
    pub fn log2_range(low_exp: f64, high_exp: f64) -> Self {
        SearchSpace::Range {
            low: low_exp,
            high: high_exp,
            scale: Scale::Log2,
            integer: false,
        }
    }

    /// Expand into concrete candidate values.
    ///
    /// `n_predictors` resolves [`SearchSpace::PredictorCount`]. Integer
    /// ranges are rounded and deduplicated.
    pub fn levels(&self, levels: usize, n_predictors: usize) -> Result<Vec<ParamValue>> {
        if levels == 0 {
            return Err(BenchError::ConfigError(
                "grid levels must be at least 1".to_string(),
            ));
        }
        match self {
            SearchSpace::Values(values) => {
                if values.is_empty() {
                    return Err(BenchError::ConfigError(
                        "explicit search space has no values".to_string(),
                    ));
                }
                Ok(values.clone())
            }
            SearchSpace::Range {
                low,
                high,
                scale,
                integer,
            } => {
                if !(low.is_finite() && high.is_finite()) || low > high {
                    return Err(BenchError::ConfigError(format!(
                        "invalid range [{}, {}]",
                        low, high
                    )));
                }
                Ok(spaced(*low, *high, *scale, *integer, levels))
            }
            SearchSpace::PredictorCount { low } => {
                let high = n_predictors.max(1) as f64;
                let low = (*low as f64).min(high);
                Ok(spaced(low, high, Scale::Linear, true, levels))
            }
        }
    }
}

fn spaced(low: f64, high: f64, scale: Scale, integer: bool, levels: usize) -> Vec<ParamValue> {
    let untransform = |v: f64| match scale {
        Scale::Linear => v,
        Scale::Log10 => 10f64.powf(v),
        Scale::Log2 => 2f64.powf(v),
    };

    let raw: Vec<f64> = if levels == 1 {
        vec![untransform(low)]
    } else {
        (0..levels)
            .map(|i| untransform(low + (high - low) * i as f64 / (levels - 1) as f64))
            .collect()
    };

    if integer {
        let mut ints: Vec<i64> = raw.iter().map(|v| v.round() as i64).collect();
        ints.dedup();
        ints.into_iter().map(ParamValue::Int).collect()
    } else {
        raw.into_iter().map(ParamValue::Float).collect()
    }
}

/// How a hyperparameter is treated by the tuning runner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HyperParam {
    /// Held at one value for every fit
    Fixed(ParamValue),
    /// Searched over during tuning
    #[serde(rename = "tune")]
    Tunable(SearchSpace),
}

impl HyperParam {
    pub fn fixed(value: impl Into<ParamValue>) -> Self {
        HyperParam::Fixed(value.into())
    }

    pub fn tune(space: SearchSpace) -> Self {
        HyperParam::Tunable(space)
    }

    pub fn is_tunable(&self) -> bool {
        matches!(self, HyperParam::Tunable(_))
    }
}

/// One combination of tunable hyperparameter values, keyed by name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridPoint(BTreeMap<String, ParamValue>);

impl GridPoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for GridPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "(no tuned parameters)");
        }
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// Regular grid: the cartesian product of every parameter's candidate values.
///
/// Enumeration order is lexicographic over parameter names, with the last
/// name varying fastest.
pub fn regular_grid(axes: &BTreeMap<String, Vec<ParamValue>>) -> Vec<GridPoint> {
    let mut points = vec![GridPoint::new()];
    for (name, values) in axes {
        points = points
            .into_iter()
            .flat_map(|point| {
                values
                    .iter()
                    .map(move |v| point.clone().with(name.clone(), v.clone()))
                    .collect::<Vec<_>>()
            })
            .collect();
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_int_levels() {
        let values = SearchSpace::int_range(1, 15).levels(3, 0).unwrap();
        assert_eq!(values, vec![ParamValue::Int(1), ParamValue::Int(8), ParamValue::Int(15)]);
    }

    #[test]
    fn test_log_levels() {
        let values = SearchSpace::log10_range(-3.0, -1.0).levels(3, 0).unwrap();
        let floats: Vec<f64> = values.iter().map(|v| v.as_float().unwrap()).collect();
        assert!((floats[0] - 0.001).abs() < 1e-12);
        assert!((floats[1] - 0.01).abs() < 1e-12);
        assert!((floats[2] - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_integer_levels_deduplicated() {
        let values = SearchSpace::int_range(1, 2).levels(5, 0).unwrap();
        assert_eq!(values, vec![ParamValue::Int(1), ParamValue::Int(2)]);
    }

    #[test]
    fn test_predictor_count_resolved() {
        let values = SearchSpace::PredictorCount { low: 1 }.levels(3, 9).unwrap();
        assert_eq!(values, vec![ParamValue::Int(1), ParamValue::Int(5), ParamValue::Int(9)]);
    }

    #[test]
    fn test_regular_grid_order() {
        let mut axes = BTreeMap::new();
        axes.insert("a".to_string(), vec![ParamValue::Int(1), ParamValue::Int(2)]);
        axes.insert("b".to_string(), vec![ParamValue::from("x"), ParamValue::from("y")]);
        let grid = regular_grid(&axes);

        assert_eq!(grid.len(), 4);
        assert_eq!(grid[0], GridPoint::new().with("a", 1i64).with("b", "x"));
        assert_eq!(grid[1], GridPoint::new().with("a", 1i64).with("b", "y"));
        assert_eq!(grid[2], GridPoint::new().with("a", 2i64).with("b", "x"));
    }

    #[test]
    fn test_empty_axes_give_single_point() {
        let grid = regular_grid(&BTreeMap::new());
        assert_eq!(grid.len(), 1);
        assert!(grid[0].is_empty());
    }

    #[test]
    fn test_hyperparam_serde() {
        let fixed: HyperParam = serde_json::from_str(r#"{"fixed": 0.1}"#).unwrap();
        assert_eq!(fixed, HyperParam::fixed(0.1));

        let tuned: HyperParam =
            serde_json::from_str(r#"{"tune": {"values": [1, 3, 5]}}"#).unwrap();
        assert!(tuned.is_tunable());
    }

    #[test]
    fn test_invalid_range() {
        assert!(SearchSpace::float_range(2.0, 1.0).levels(3, 0).is_err());
        assert!(SearchSpace::values(vec![]).levels(3, 0).is_err());
    }
}
