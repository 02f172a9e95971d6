//! Presentation adapter: result records to typed charts and display strings.

pub mod chart;
pub mod format;
pub mod pages;
pub mod view;

pub use chart::{Chart, ChartError, Series};
pub use view::{evaluate_form, render, PageView, Present, SummaryLine};
