pub mod bmi;
pub mod body_fat;
pub mod metabolic;
