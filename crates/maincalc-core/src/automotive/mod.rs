pub mod horsepower;
pub mod tire;
