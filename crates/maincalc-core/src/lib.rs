pub mod error;
pub mod input;
pub mod presentation;
pub mod types;

#[cfg(feature = "finance")]
pub mod finance;

#[cfg(feature = "health")]
pub mod health;

#[cfg(feature = "math")]
pub mod math;

#[cfg(feature = "automotive")]
pub mod automotive;

#[cfg(feature = "keywords")]
pub mod keywords;

pub use error::CalcError;
pub use types::*;

/// Standard result type for all calculator operations
pub type CalcResult<T> = Result<T, CalcError>;
