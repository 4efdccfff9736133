pub mod appeal;
pub mod valuation;
