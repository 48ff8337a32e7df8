//! Configuration model
//!
//! The typed tree every run starts from:
//!
//! ```text
//! Configuration
//! ├── connection: Connection
//! ├── structure: Structure { target: Column, features: [Column] }
//! └── hyperparameters: Hyperparameters { loss: Loss, ... }
//! ```
//!
//! Each entity has a `from_value` constructor that parses an untyped
//! `serde_json::Value` and validates it eagerly. Field-level rules run first;
//! the cross-field complexity rule on [`Hyperparameters`] runs only once every
//! hyperparameter is individually valid.
//!
//! ```rust
//! use hyperflow::model::Configuration;
//! use serde_json::json;
//!
//! let config = Configuration::from_value(&json!({
//!     "connection": {"driver": "postgres", "username": "u", "password": "p",
//!                    "host": "h", "port": 5432, "database": "db"},
//!     "structure": {"target": {"name": "y", "type": "float", "description": "label"},
//!                   "features": [{"name": "x1", "type": "float", "description": "feat1"}]},
//!     "hyperparameters": {"loss": "huber", "learning_rate": 0.1, "n_estimators": 3,
//!                         "max_depth": 2, "min_samples_split": 1}
//! })).unwrap();
//!
//! assert_eq!(config.structure().features().len(), 1);
//! ```

mod configuration;
mod connection;
mod hyperparameters;
mod structure;

pub use configuration::Configuration;
pub use connection::{mask_secret, Connection};
pub use hyperparameters::{Hyperparameters, Loss, COMPLEXITY_THRESHOLD};
pub use structure::{Column, Structure};

/// `serde(try_from = "Value")` glue: every entity deserializes through its
/// validating `from_value`
macro_rules! validated_try_from {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl TryFrom<serde_json::Value> for $ty {
                type Error = crate::errors::ValidationError;

                fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
                    <$ty>::from_value(&value)
                }
            }
        )+
    };
}

validated_try_from!(Configuration, Connection, Column, Structure, Hyperparameters);
