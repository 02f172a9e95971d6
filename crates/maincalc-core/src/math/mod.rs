pub mod gcf;
pub mod half_life;
pub mod percentage;
pub mod statistics;
