//! Property-based tests for configuration construction
//!
//! Uses proptest to cover the field rules and the complexity rule over
//! generated inputs, plus override parsing on arbitrary strings.

use hyperflow::errors::ValidationError;
use hyperflow::model::{Configuration, Hyperparameters, Loss};
use proptest::prelude::*;
use serde_json::{json, Value};

fn arb_loss() -> impl Strategy<Value = Loss> {
    prop::sample::select(Loss::ALL.to_vec())
}

prop_compose! {
    /// Hyperparameters where every field and the complexity rule hold
    fn arb_valid_hyperparameters()(
        loss in arb_loss(),
        learning_rate in 0.0001f64..0.9999,
        max_depth in 1u64..64,
        n_estimators in 1u64..512,
        min_samples_split in 1u64..32,
    ) -> Value {
        let n_estimators = n_estimators.max(4u64.saturating_sub(max_depth));
        json!({
            "loss": loss.as_str(),
            "learning_rate": learning_rate,
            "n_estimators": n_estimators,
            "max_depth": max_depth,
            "min_samples_split": min_samples_split,
        })
    }
}

prop_compose! {
    fn arb_configuration()(
        hyperparameters in arb_valid_hyperparameters(),
        feature_count in 0usize..8,
        username in "[a-z]{1,12}",
        password in "[A-Za-z0-9!@#%^&*]{0,24}",
        port in any::<u16>(),
    ) -> Value {
        let features: Vec<Value> = (0..feature_count)
            .map(|i| json!({"name": format!("x{}", i), "type": "float", "description": format!("feature {}", i)}))
            .collect();
        json!({
            "connection": {"driver": "postgres", "username": username, "password": password,
                           "host": "localhost", "port": port, "database": "db"},
            "structure": {"target": {"name": "y", "type": "float", "description": "label"},
                          "features": features},
            "hyperparameters": hyperparameters,
        })
    }
}

proptest! {
    /// Property: valid inputs construct and serialize back to the same tree
    #[test]
    fn test_valid_configuration_round_trips(input in arb_configuration()) {
        let config = Configuration::from_value(&input).unwrap();
        prop_assert_eq!(serde_json::to_value(&config).unwrap(), input);
    }

    /// Property: learning_rate outside the open interval (0, 1) is rejected on that field
    #[test]
    fn test_learning_rate_out_of_range(
        mut hp in arb_valid_hyperparameters(),
        rate in prop_oneof![-1.0e6f64..=0.0, 1.0f64..1.0e6],
    ) {
        hp["learning_rate"] = json!(rate);
        match Hyperparameters::from_value(&hp) {
            Err(ValidationError::ConstraintViolation { path, .. }) => {
                prop_assert_eq!(path.to_string(), "learning_rate");
            }
            other => prop_assert!(false, "expected ConstraintViolation, got {:?}", other),
        }
    }

    /// Property: any token outside the four loss names is rejected
    #[test]
    fn test_unknown_loss_token(mut hp in arb_valid_hyperparameters(), token in "[A-Za-z_]{1,20}") {
        prop_assume!(!Loss::TOKENS.contains(&token.as_str()));
        hp["loss"] = json!(token);
        let is_enum_error = matches!(
            Hyperparameters::from_value(&hp),
            Err(ValidationError::InvalidEnumValue { .. })
        );
        prop_assert!(is_enum_error);
    }

    /// Property: sum below the threshold fails with the cross-field error only
    #[test]
    fn test_insufficient_complexity(
        mut hp in arb_valid_hyperparameters(),
        (max_depth, n_estimators) in (1u64..=2).prop_flat_map(|d| (Just(d), 1u64..(4 - d))),
    ) {
        hp["max_depth"] = json!(max_depth);
        hp["n_estimators"] = json!(n_estimators);
        prop_assert_eq!(
            Hyperparameters::from_value(&hp).unwrap_err(),
            ValidationError::ComplexityViolation { sum: max_depth + n_estimators, threshold: 4 }
        );
    }

    /// Property: fail-fast construction reports the first aggregate error
    #[test]
    fn test_fail_fast_matches_first_aggregate_error(
        input in arb_configuration(),
        port in "[a-z]{1,8}",
        rate in 1.0f64..10.0,
    ) {
        let mut input = input;
        input["connection"]["port"] = json!(port);
        input["hyperparameters"]["learning_rate"] = json!(rate);

        let report = Configuration::validate(&input, "generated");
        let first = Configuration::from_value(&input).unwrap_err();
        prop_assert_eq!(report.errors.len(), 2);
        prop_assert_eq!(report.first_error(), Some(&first));
    }

    /// Property: override parsing never panics
    #[test]
    fn test_override_parsing_never_panics(input in ".*") {
        let _ = input.parse::<hyperflow::loader::Override>();
    }
}

#[test]
fn test_complexity_boundaries() {
    let base = |max_depth: u64, n_estimators: u64| {
        json!({"loss": "quantile", "learning_rate": 0.5, "n_estimators": n_estimators,
               "max_depth": max_depth, "min_samples_split": 2})
    };
    assert!(Hyperparameters::from_value(&base(1, 3)).is_ok());
    assert!(matches!(
        Hyperparameters::from_value(&base(1, 2)),
        Err(ValidationError::ComplexityViolation { sum: 3, .. })
    ));
    assert!(matches!(
        Hyperparameters::from_value(&base(1, 1)),
        Err(ValidationError::ComplexityViolation { sum: 2, .. })
    ));
}
