pub mod compound_interest;
pub mod loan;
pub mod mortgage;
