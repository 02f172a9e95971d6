pub mod automotive;
pub mod finance;
pub mod health;
pub mod keywords;
pub mod math;
