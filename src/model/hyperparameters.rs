//! Training hyperparameters and the model complexity rule

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ValidationError;
use crate::extract::{construct, Collector, Node};
use crate::path::FieldPath;

/// Lower bound for `max_depth + n_estimators`
pub const COMPLEXITY_THRESHOLD: u64 = 4;

/// Loss function kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Loss {
    SquaredError,
    AbsoluteError,
    Huber,
    Quantile,
}

impl Loss {
    pub const ALL: [Loss; 4] = [
        Loss::SquaredError,
        Loss::AbsoluteError,
        Loss::Huber,
        Loss::Quantile,
    ];

    /// Accepted tokens, in declaration order
    pub const TOKENS: &'static [&'static str] =
        &["squared_error", "absolute_error", "huber", "quantile"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Loss::SquaredError => "squared_error",
            Loss::AbsoluteError => "absolute_error",
            Loss::Huber => "huber",
            Loss::Quantile => "quantile",
        }
    }

    fn parse_node(node: &Node<'_>) -> Result<Self, ValidationError> {
        let token = node.text()?;
        token.parse().map_err(|_| ValidationError::InvalidEnumValue {
            path: node.path().clone(),
            value: token,
            allowed: Self::TOKENS,
        })
    }
}

impl fmt::Display for Loss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Loss {
    type Err = ValidationError;

    /// Exact, case-sensitive token match
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|loss| loss.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidEnumValue {
                path: FieldPath::root(),
                value: s.to_string(),
                allowed: Self::TOKENS,
            })
    }
}

/// Gradient boosting hyperparameters
///
/// Fields are private: the only ways in are [`Hyperparameters::new`] and
/// [`Hyperparameters::from_value`], both of which enforce the field ranges
/// and then the complexity rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value")]
pub struct Hyperparameters {
    loss: Loss,
    learning_rate: f64,
    n_estimators: u64,
    max_depth: u64,
    min_samples_split: u64,
}

impl Hyperparameters {
    pub(crate) const FIELDS: &'static [&'static str] = &[
        "loss",
        "learning_rate",
        "n_estimators",
        "max_depth",
        "min_samples_split",
    ];

    pub fn new(
        loss: Loss,
        learning_rate: f64,
        n_estimators: u64,
        max_depth: u64,
        min_samples_split: u64,
    ) -> Result<Self, ValidationError> {
        let root = FieldPath::root();
        let learning_rate = check_learning_rate(&root.field("learning_rate"), learning_rate)?;
        let n_estimators = check_positive(&root.field("n_estimators"), n_estimators as i128)?;
        let max_depth = check_positive(&root.field("max_depth"), max_depth as i128)?;
        let min_samples_split =
            check_positive(&root.field("min_samples_split"), min_samples_split as i128)?;
        check_complexity(max_depth, n_estimators)?;

        Ok(Self {
            loss,
            learning_rate,
            n_estimators,
            max_depth,
            min_samples_split,
        })
    }

    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        construct(value, Self::parse)
    }

    pub(crate) fn parse(node: &Node<'_>, c: &mut Collector) -> Option<Self> {
        let object = c.take(node.object())?;
        c.warn_unknown(&object, Self::FIELDS);

        let loss = c.take(object.field("loss").and_then(|n| Loss::parse_node(&n)));
        let learning_rate = c.take(
            object
                .field("learning_rate")
                .and_then(|n| check_learning_rate(n.path(), n.number()?)),
        );
        let n_estimators = c.take(object.field("n_estimators").and_then(|n| positive(&n)));
        let max_depth = c.take(object.field("max_depth").and_then(|n| positive(&n)));
        let min_samples_split =
            c.take(object.field("min_samples_split").and_then(|n| positive(&n)));

        // Field-level failures stop here; the cross-field rule needs them all
        let (loss, learning_rate, n_estimators, max_depth, min_samples_split) = (
            loss?,
            learning_rate?,
            n_estimators?,
            max_depth?,
            min_samples_split?,
        );

        c.take(check_complexity(max_depth, n_estimators))?;

        Some(Self {
            loss,
            learning_rate,
            n_estimators,
            max_depth,
            min_samples_split,
        })
    }

    pub fn loss(&self) -> Loss {
        self.loss
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn n_estimators(&self) -> u64 {
        self.n_estimators
    }

    pub fn max_depth(&self) -> u64 {
        self.max_depth
    }

    pub fn min_samples_split(&self) -> u64 {
        self.min_samples_split
    }

    /// `max_depth + n_estimators`, the quantity the complexity rule bounds
    pub fn complexity(&self) -> u64 {
        self.max_depth.saturating_add(self.n_estimators)
    }
}

fn check_learning_rate(path: &FieldPath, value: f64) -> Result<f64, ValidationError> {
    // NaN fails both comparisons
    if value > 0.0 && value < 1.0 {
        Ok(value)
    } else {
        Err(ValidationError::ConstraintViolation {
            path: path.clone(),
            constraint: "0.0 < x < 1.0".to_string(),
            value: value.to_string(),
        })
    }
}

/// `1 <= x <= i64::MAX`, the same range parsed input can reach
fn check_positive(path: &FieldPath, value: i128) -> Result<u64, ValidationError> {
    if value > i64::MAX as i128 {
        Err(ValidationError::ConstraintViolation {
            path: path.clone(),
            constraint: format!("x <= {}", i64::MAX),
            value: value.to_string(),
        })
    } else if value >= 1 {
        Ok(value as u64)
    } else {
        Err(ValidationError::ConstraintViolation {
            path: path.clone(),
            constraint: "x >= 1".to_string(),
            value: value.to_string(),
        })
    }
}

fn positive(node: &Node<'_>) -> Result<u64, ValidationError> {
    check_positive(node.path(), node.integer()? as i128)
}

fn check_complexity(max_depth: u64, n_estimators: u64) -> Result<(), ValidationError> {
    let sum = max_depth.saturating_add(n_estimators);
    if sum >= COMPLEXITY_THRESHOLD {
        Ok(())
    } else {
        Err(ValidationError::ComplexityViolation {
            sum,
            threshold: COMPLEXITY_THRESHOLD,
        })
    }
}

impl fmt::Display for Hyperparameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "loss={} learning_rate={} n_estimators={} max_depth={} min_samples_split={}",
            self.loss, self.learning_rate, self.n_estimators, self.max_depth, self.min_samples_split
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid() -> Value {
        json!({
            "loss": "huber",
            "learning_rate": 0.1,
            "n_estimators": 3,
            "max_depth": 2,
            "min_samples_split": 1
        })
    }

    fn with(key: &str, value: Value) -> Value {
        let mut v = valid();
        v[key] = value;
        v
    }

    #[test]
    fn test_loss_tokens_round_trip() {
        for loss in Loss::ALL {
            assert_eq!(loss.as_str().parse::<Loss>().unwrap(), loss);
            assert_eq!(serde_json::to_value(loss).unwrap(), json!(loss.as_str()));
        }
        assert_eq!(Loss::TOKENS.len(), Loss::ALL.len());
    }

    #[test]
    fn test_loss_is_case_sensitive() {
        assert!("Huber".parse::<Loss>().is_err());
        assert!("squared-error".parse::<Loss>().is_err());
    }

    #[test]
    fn test_valid_hyperparameters() {
        let hp = Hyperparameters::from_value(&valid()).unwrap();
        assert_eq!(hp.loss(), Loss::Huber);
        assert_eq!(hp.learning_rate(), 0.1);
        assert_eq!(hp.complexity(), 5);
    }

    #[test]
    fn test_invalid_loss_token() {
        let err = Hyperparameters::from_value(&with("loss", json!("hinge"))).unwrap_err();
        match err {
            ValidationError::InvalidEnumValue { path, value, allowed } => {
                assert_eq!(path.to_string(), "loss");
                assert_eq!(value, "hinge");
                assert_eq!(allowed, Loss::TOKENS);
            }
            other => panic!("expected InvalidEnumValue, got {:?}", other),
        }
    }

    #[test]
    fn test_learning_rate_bounds_are_exclusive() {
        for bad in [json!(0.0), json!(1.0), json!(-0.5), json!(1.5), json!("NaN")] {
            let err = Hyperparameters::from_value(&with("learning_rate", bad.clone())).unwrap_err();
            assert!(
                matches!(err, ValidationError::ConstraintViolation { .. }),
                "{} should violate the range, got {:?}",
                bad,
                err
            );
        }
        assert!(Hyperparameters::from_value(&with("learning_rate", json!(0.5))).is_ok());
    }

    #[test]
    fn test_counts_must_be_at_least_one() {
        for key in ["n_estimators", "max_depth", "min_samples_split"] {
            let err = Hyperparameters::from_value(&with(key, json!(0))).unwrap_err();
            assert_eq!(err.path().unwrap().to_string(), key);
        }
    }

    #[test]
    fn test_complexity_boundary() {
        let mut v = valid();
        v["max_depth"] = json!(1);
        v["n_estimators"] = json!(3);
        assert!(Hyperparameters::from_value(&v).is_ok());

        v["n_estimators"] = json!(2);
        assert_eq!(
            Hyperparameters::from_value(&v).unwrap_err(),
            ValidationError::ComplexityViolation { sum: 3, threshold: 4 }
        );
    }

    #[test]
    fn test_field_error_reported_before_complexity() {
        let mut v = valid();
        v["max_depth"] = json!(1);
        v["n_estimators"] = json!(1);
        v["learning_rate"] = json!(2.0);
        let err = Hyperparameters::from_value(&v).unwrap_err();
        assert!(err.is_field_error());
    }

    #[test]
    fn test_typed_constructor_applies_same_rules() {
        assert!(Hyperparameters::new(Loss::Quantile, 0.3, 2, 2, 2).is_ok());
        assert!(matches!(
            Hyperparameters::new(Loss::Quantile, 0.3, 1, 1, 2),
            Err(ValidationError::ComplexityViolation { .. })
        ));
        assert!(matches!(
            Hyperparameters::new(Loss::Quantile, 0.3, 0, 9, 2),
            Err(ValidationError::ConstraintViolation { .. })
        ));
    }

    #[test]
    fn test_typed_constructor_rejects_counts_beyond_i64() {
        let err = Hyperparameters::new(Loss::Huber, 0.1, u64::MAX, 2, 1).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::ConstraintViolation { ref path, .. } if path.to_string() == "n_estimators"
        ));

        let largest = i64::MAX as u64;
        let hp = Hyperparameters::new(Loss::Huber, 0.1, largest, 2, 1).unwrap();
        let back = Hyperparameters::from_value(&serde_json::to_value(&hp).unwrap()).unwrap();
        assert_eq!(back, hp);
    }

    #[test]
    fn test_deserialize_runs_validation() {
        let yaml = "loss: huber\nlearning_rate: 0.1\nn_estimators: 1\nmax_depth: 1\nmin_samples_split: 1\n";
        let err = serde_yaml::from_str::<Hyperparameters>(yaml).unwrap_err();
        assert!(err.to_string().contains("not complex enough"));
    }
}
