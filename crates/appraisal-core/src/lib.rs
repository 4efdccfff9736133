//! Stateless three-approach real-estate valuation engine.
//!
//! Four cooperating calculators (sales comparison, income capitalization,
//! cost, reconciliation) plus appeal economics (tax savings, OVER/FAIR/
//! UNDER classification) and shared confidence/validation helpers. Each
//! call is pure and synchronous: plain data in, a [`types::ValuationResult`]
//! envelope out. Input-shape problems surface in the envelope's `errors`
//! list, never as an `Err` across the public boundary.

pub mod confidence;
pub mod cost;
pub mod decision;
pub mod error;
pub mod income;
pub mod reconciliation;
pub mod sales_comparison;
pub mod tax_savings;
pub mod types;

pub use error::AppraisalError;
pub use types::*;

/// Standard result type for fallible internal operations.
pub type AppraisalResult<T> = Result<T, AppraisalError>;
