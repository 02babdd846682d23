//! Configuration loading, layering and validation

pub mod traits;
pub mod validation;

pub use traits::{LinkStateConfig, ENV_PREFIX};
pub use validation::{ConfigValidator, ValidationError, ValidationResult};
