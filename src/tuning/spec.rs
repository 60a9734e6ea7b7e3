//! Model specifications: a family plus fixed or tunable hyperparameters

use super::search_space::{regular_grid, GridPoint, HyperParam, ParamValue, Scale, SearchSpace};
use crate::error::{BenchError, Result};
use crate::training::{
    Classifier, GradientBoostingClassifier, GradientBoostingConfig, KNNClassifier, KNNConfig,
    LogisticRegression, MLPClassifier, MLPConfig, ModelFamily, RandomForest, SVMClassifier,
    SVMConfig, WeightFunc,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Anything the tuning runner can turn into fresh classifiers
pub trait EstimatorFactory: Send + Sync {
    /// Label used in logs and errors
    fn label(&self) -> String;

    /// Candidate points, in enumeration order
    fn grid(&self, levels: usize, n_predictors: usize) -> Result<Vec<GridPoint>>;

    /// An unfitted classifier for one grid point
    fn build(&self, point: &GridPoint) -> Result<Box<dyn Classifier>>;
}

/// Legal values of one hyperparameter
#[derive(Debug, Clone, PartialEq)]
enum Domain {
    Int { min: i64 },
    Float { low: f64, high: f64, low_open: bool },
    Choice(&'static [&'static str]),
}

impl Domain {
    /// Check a value and normalise its kind (ints widen to floats and
    /// integral floats narrow to ints)
    fn check(&self, name: &str, value: &ParamValue) -> Result<ParamValue> {
        let invalid = |reason: String| BenchError::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
            reason,
        };
        match self {
            Domain::Int { min } => {
                let v = value
                    .as_int()
                    .ok_or_else(|| invalid("expected an integer".to_string()))?;
                if v < *min {
                    return Err(invalid(format!("must be at least {}", min)));
                }
                Ok(ParamValue::Int(v))
            }
            Domain::Float {
                low,
                high,
                low_open,
            } => {
                let v = value
                    .as_float()
                    .ok_or_else(|| invalid("expected a number".to_string()))?;
                let above = if *low_open { v > *low } else { v >= *low };
                if !above || v > *high || !v.is_finite() {
                    let open = if *low_open { "(" } else { "[" };
                    return Err(invalid(format!("must lie in {}{}, {}]", open, low, high)));
                }
                Ok(ParamValue::Float(v))
            }
            Domain::Choice(options) => match value.as_str() {
                Some(s) if options.contains(&s) => Ok(value.clone()),
                _ => Err(invalid(format!("must be one of {:?}", options))),
            },
        }
    }
}

struct ParamDef {
    name: &'static str,
    domain: Domain,
    fixed_only: bool,
    /// Allows `SearchSpace::PredictorCount`
    predictor_bound: bool,
    default: HyperParam,
}

const WEIGHT_FUNCS: &[&str] = &["rectangular", "triangular", "inv", "gaussian"];

fn int_at_least(min: i64) -> Domain {
    Domain::Int { min }
}

fn non_negative() -> Domain {
    Domain::Float {
        low: 0.0,
        high: f64::INFINITY,
        low_open: false,
    }
}

fn positive() -> Domain {
    Domain::Float {
        low: 0.0,
        high: f64::INFINITY,
        low_open: true,
    }
}

fn def(name: &'static str, domain: Domain, default: HyperParam) -> ParamDef {
    ParamDef {
        name,
        domain,
        fixed_only: false,
        predictor_bound: false,
        default,
    }
}

/// Hyperparameters of each family with their default treatment
fn catalog(family: ModelFamily) -> Vec<ParamDef> {
    use HyperParam as H;
    use SearchSpace as S;

    match family {
        ModelFamily::NeuralNetwork => vec![
            def("hidden_units", int_at_least(1), H::tune(S::int_range(1, 10))),
            def("penalty", non_negative(), H::tune(S::log10_range(-10.0, 0.0))),
            def("epochs", int_at_least(1), H::tune(S::int_range(10, 1000))),
            ParamDef {
                fixed_only: true,
                ..def("learn_rate", positive(), H::fixed(0.05))
            },
        ],
        ModelFamily::GradientBoosting => vec![
            def("trees", int_at_least(1), H::tune(S::int_range(50, 500))),
            def("tree_depth", int_at_least(1), H::tune(S::int_range(1, 15))),
            def("min_n", int_at_least(2), H::tune(S::int_range(2, 40))),
            def(
                "learn_rate",
                Domain::Float {
                    low: 0.0,
                    high: 1.0,
                    low_open: true,
                },
                H::tune(S::log10_range(-3.0, -0.5)),
            ),
        ],
        ModelFamily::Svm => vec![
            def("cost", positive(), H::tune(S::log2_range(-10.0, 5.0))),
            def("rbf_sigma", positive(), H::tune(S::log10_range(-10.0, 0.0))),
        ],
        ModelFamily::LogisticRegression => vec![
            def("penalty", non_negative(), H::tune(S::log10_range(-10.0, 0.0))),
            def(
                "mixture",
                Domain::Float {
                    low: 0.0,
                    high: 1.0,
                    low_open: false,
                },
                H::tune(S::float_range(0.0, 1.0)),
            ),
        ],
        ModelFamily::Knn => vec![
            def("neighbors", int_at_least(1), H::tune(S::int_range(1, 15))),
            def(
                "weight_func",
                Domain::Choice(WEIGHT_FUNCS),
                H::tune(S::values(WEIGHT_FUNCS.iter().map(|&w| w.into()).collect())),
            ),
            def(
                "dist_power",
                Domain::Float {
                    low: 1.0,
                    high: f64::INFINITY,
                    low_open: false,
                },
                H::tune(S::float_range(1.0, 2.0)),
            ),
        ],
        ModelFamily::RandomForest => vec![
            ParamDef {
                predictor_bound: true,
                ..def("mtry", int_at_least(1), H::tune(S::PredictorCount { low: 1 }))
            },
            def("trees", int_at_least(1), H::tune(S::int_range(100, 1000))),
            def("min_n", int_at_least(2), H::tune(S::int_range(2, 40))),
        ],
    }
}

/// Validate a search space against a parameter definition
fn check_space(def: &ParamDef, space: &SearchSpace) -> Result<()> {
    let invalid = |reason: &str| BenchError::InvalidParameter {
        name: def.name.to_string(),
        value: format!("{:?}", space),
        reason: reason.to_string(),
    };

    match space {
        SearchSpace::Values(values) => {
            if values.is_empty() {
                return Err(invalid("search space has no values"));
            }
            for v in values {
                def.domain.check(def.name, v)?;
            }
        }
        SearchSpace::Range {
            low,
            high,
            scale,
            integer,
        } => {
            if matches!(def.domain, Domain::Choice(_)) {
                return Err(invalid("categorical parameters need explicit values"));
            }
            if matches!(def.domain, Domain::Int { .. }) && !integer {
                return Err(invalid("integer parameters need an integer range"));
            }
            if !(low.is_finite() && high.is_finite()) || low > high {
                return Err(invalid("range bounds must be finite with low <= high"));
            }
            for bound in [low, high] {
                let v = match scale {
                    Scale::Linear => *bound,
                    Scale::Log10 => 10f64.powf(*bound),
                    Scale::Log2 => 2f64.powf(*bound),
                };
                let v = if *integer {
                    ParamValue::Int(v.round() as i64)
                } else {
                    ParamValue::Float(v)
                };
                def.domain.check(def.name, &v)?;
            }
        }
        SearchSpace::PredictorCount { low } => {
            if !def.predictor_bound {
                return Err(invalid("only mtry can range up to the predictor count"));
            }
            def.domain.check(def.name, &ParamValue::Int(*low))?;
        }
    }
    Ok(())
}

/// A model family plus the treatment of each of its hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSpec")]
pub struct ModelSpec {
    family: ModelFamily,
    params: BTreeMap<String, HyperParam>,
    seed: u64,
}

/// Serialized spec; every parameter goes back through [`ModelSpec::set`]
#[derive(Deserialize)]
struct RawSpec {
    family: ModelFamily,
    params: BTreeMap<String, HyperParam>,
    seed: u64,
}

impl TryFrom<RawSpec> for ModelSpec {
    type Error = BenchError;

    fn try_from(raw: RawSpec) -> Result<Self> {
        ModelSpec::new(raw.family)
            .with_seed(raw.seed)
            .with_overrides(&raw.params)
    }
}

impl ModelSpec {
    /// Default specification of `family`
    pub fn new(family: ModelFamily) -> Self {
        let params = catalog(family)
            .into_iter()
            .map(|d| (d.name.to_string(), d.default))
            .collect();
        Self {
            family,
            params,
            seed: 42,
        }
    }

    /// Seed for stochastic model components
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Override one hyperparameter. Rejects unknown names, values outside
    /// the family's domain and tuning of fixed-only parameters.
    pub fn set(mut self, name: &str, param: HyperParam) -> Result<Self> {
        let defs = catalog(self.family);
        let def = defs.iter().find(|d| d.name == name).ok_or_else(|| {
            BenchError::ConfigError(format!(
                "{} has no hyperparameter '{}' (known: {})",
                self.family,
                name,
                defs.iter().map(|d| d.name).collect::<Vec<_>>().join(", ")
            ))
        })?;

        let param = match param {
            HyperParam::Fixed(value) => HyperParam::Fixed(def.domain.check(name, &value)?),
            HyperParam::Tunable(space) => {
                if def.fixed_only {
                    return Err(BenchError::ConfigError(format!(
                        "{} supports '{}' only as a fixed value",
                        self.family, name
                    )));
                }
                check_space(def, &space)?;
                HyperParam::Tunable(space)
            }
        };

        self.params.insert(name.to_string(), param);
        Ok(self)
    }

    /// Apply several overrides in name order
    pub fn with_overrides(self, overrides: &BTreeMap<String, HyperParam>) -> Result<Self> {
        overrides
            .iter()
            .try_fold(self, |spec, (name, param)| spec.set(name, param.clone()))
    }

    pub fn family(&self) -> ModelFamily {
        self.family
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn get(&self, name: &str) -> Option<&HyperParam> {
        self.params.get(name)
    }

    pub fn params(&self) -> impl Iterator<Item = (&str, &HyperParam)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Names of the parameters searched during tuning
    pub fn tunable_names(&self) -> Vec<&str> {
        self.params
            .iter()
            .filter(|(_, p)| p.is_tunable())
            .map(|(k, _)| k.as_str())
            .collect()
    }

    /// Replace every tunable with its value from `point`.
    ///
    /// The point must name exactly the tunable parameters.
    pub fn finalize(&self, point: &GridPoint) -> Result<ModelSpec> {
        if let Some((extra, _)) = point.iter().find(|(name, _)| {
            !self.params.get(*name).map_or(false, HyperParam::is_tunable)
        }) {
            return Err(BenchError::ConfigError(format!(
                "'{}' is not a tunable parameter of {}",
                extra, self.family
            )));
        }

        let mut spec = self.clone();
        for name in self.tunable_names() {
            let value = point.get(name).ok_or_else(|| {
                BenchError::ConfigError(format!("grid point has no value for '{}'", name))
            })?;
            spec = spec.set(name, HyperParam::Fixed(value.clone()))?;
        }
        Ok(spec)
    }

    /// Build the classifier for a fully fixed specification
    pub fn build_fixed(&self) -> Result<Box<dyn Classifier>> {
        self.build(&GridPoint::new())
    }

    fn resolve<'a>(&'a self, point: &'a GridPoint) -> Result<Resolved<'a>> {
        let mut values = BTreeMap::new();
        for (name, param) in &self.params {
            let value = match param {
                HyperParam::Fixed(v) => v,
                HyperParam::Tunable(_) => point.get(name).ok_or_else(|| {
                    BenchError::ConfigError(format!(
                        "tunable '{}' of {} has no value",
                        name, self.family
                    ))
                })?,
            };
            values.insert(name.as_str(), value);
        }
        Ok(Resolved(values))
    }
}

/// Concrete value of every hyperparameter for one fit
struct Resolved<'a>(BTreeMap<&'a str, &'a ParamValue>);

impl Resolved<'_> {
    fn value(&self, name: &str) -> Result<&ParamValue> {
        self.0
            .get(name)
            .copied()
            .ok_or_else(|| BenchError::ConfigError(format!("missing hyperparameter '{}'", name)))
    }

    fn int(&self, name: &str) -> Result<usize> {
        let v = self.value(name)?;
        v.as_int()
            .and_then(|i| usize::try_from(i).ok())
            .ok_or_else(|| BenchError::InvalidParameter {
                name: name.to_string(),
                value: v.to_string(),
                reason: "expected a non-negative integer".to_string(),
            })
    }

    fn float(&self, name: &str) -> Result<f64> {
        let v = self.value(name)?;
        v.as_float().ok_or_else(|| BenchError::InvalidParameter {
            name: name.to_string(),
            value: v.to_string(),
            reason: "expected a number".to_string(),
        })
    }

    fn text(&self, name: &str) -> Result<&str> {
        let v = self.value(name)?;
        v.as_str().ok_or_else(|| BenchError::InvalidParameter {
            name: name.to_string(),
            value: v.to_string(),
            reason: "expected a string".to_string(),
        })
    }
}

impl EstimatorFactory for ModelSpec {
    fn label(&self) -> String {
        self.family.to_string()
    }

    fn grid(&self, levels: usize, n_predictors: usize) -> Result<Vec<GridPoint>> {
        let mut axes = BTreeMap::new();
        for (name, param) in &self.params {
            if let HyperParam::Tunable(space) = param {
                axes.insert(name.clone(), space.levels(levels, n_predictors)?);
            }
        }
        Ok(regular_grid(&axes))
    }

    fn build(&self, point: &GridPoint) -> Result<Box<dyn Classifier>> {
        let p = self.resolve(point)?;
        let seed = self.seed;

        let model: Box<dyn Classifier> = match self.family {
            ModelFamily::NeuralNetwork => Box::new(MLPClassifier::new(MLPConfig {
                hidden_units: p.int("hidden_units")?,
                alpha: p.float("penalty")?,
                epochs: p.int("epochs")?,
                learning_rate: p.float("learn_rate")?,
                random_state: seed,
                ..Default::default()
            })),
            ModelFamily::GradientBoosting => {
                Box::new(GradientBoostingClassifier::new(GradientBoostingConfig {
                    n_estimators: p.int("trees")?,
                    max_depth: p.int("tree_depth")?,
                    min_samples_split: p.int("min_n")?,
                    learning_rate: p.float("learn_rate")?,
                    random_state: seed,
                    ..Default::default()
                }))
            }
            ModelFamily::Svm => Box::new(SVMClassifier::new(SVMConfig {
                c: p.float("cost")?,
                sigma: p.float("rbf_sigma")?,
                random_state: seed,
                ..Default::default()
            })),
            ModelFamily::LogisticRegression => Box::new(
                LogisticRegression::new()
                    .with_penalty(p.float("penalty")?)
                    .with_mixture(p.float("mixture")?),
            ),
            ModelFamily::Knn => Box::new(KNNClassifier::new(KNNConfig {
                k: p.int("neighbors")?,
                weight_func: p.text("weight_func")?.parse::<WeightFunc>()?,
                dist_power: p.float("dist_power")?,
            })),
            ModelFamily::RandomForest => Box::new(
                RandomForest::new(p.int("trees")?)
                    .with_max_features(p.int("mtry")?)
                    .with_min_samples_split(p.int("min_n")?)
                    .with_random_state(seed),
            ),
        };
        Ok(model)
    }
}
