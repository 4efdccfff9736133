use chrono::{NaiveDate, Utc};
use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use appraisal_core::cost::{self, CostApproachRequest};
use appraisal_core::income::{self, IncomeApproachRequest};
use appraisal_core::sales_comparison::{self, SalesComparisonRequest};

use crate::input;

/// Arguments for the sales comparison approach
#[derive(Args)]
pub struct SalesArgs {
    /// Path to JSON input file with the comparable set
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for the income capitalization approach
#[derive(Args)]
pub struct IncomeArgs {
    /// Path to JSON input file with rent roll and expense assumptions
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for the cost approach
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct CostArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Property identifier
    #[arg(long)]
    pub property_id: Option<String>,

    /// Valuation date (YYYY-MM-DD, defaults to today)
    #[arg(long)]
    pub as_of: Option<NaiveDate>,

    /// Land value in dollars
    #[arg(long)]
    pub land_value: Option<Decimal>,

    /// Base replacement cost of improvements
    #[arg(long)]
    pub improvement_cost: Option<Decimal>,

    /// Physical deterioration rate (e.g. 0.15 for 15%)
    #[arg(long, default_value = "0")]
    pub physical: Decimal,

    /// Functional obsolescence rate
    #[arg(long, default_value = "0")]
    pub functional: Decimal,

    /// External obsolescence rate
    #[arg(long, default_value = "0")]
    pub external: Decimal,

    /// Actual age in years
    #[arg(long, default_value = "0")]
    pub age: Decimal,

    /// Effective age in years
    #[arg(long, default_value = "0")]
    pub effective_age: Decimal,

    /// Total economic life in years
    #[arg(long)]
    pub economic_life: Option<Decimal>,
}

pub fn run_sales_comparison(args: SalesArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: SalesComparisonRequest = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("provide --input or pipe a JSON request on stdin".into());
    };

    let output = sales_comparison::calculate_sales_comparison(&request);
    Ok(serde_json::to_value(output)?)
}

pub fn run_income(args: IncomeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: IncomeApproachRequest = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("provide --input or pipe a JSON request on stdin".into());
    };

    let output = income::calculate_income_approach(&request);
    Ok(serde_json::to_value(output)?)
}

pub fn run_cost(args: CostArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: CostApproachRequest = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        CostApproachRequest {
            property_id: args
                .property_id
                .ok_or("--property-id is required (or provide --input)")?,
            as_of: args.as_of.unwrap_or_else(|| Utc::now().date_naive()),
            land_value: args
                .land_value
                .ok_or("--land-value is required (or provide --input)")?,
            land_value_source: Default::default(),
            improvement_cost: args
                .improvement_cost
                .ok_or("--improvement-cost is required (or provide --input)")?,
            replacement_cost_per_sf: None,
            total_sf: None,
            builder_profit_rate: Decimal::ZERO,
            entrepreneurial_incentive_rate: Decimal::ZERO,
            depreciation_method: Default::default(),
            physical_deterioration: args.physical,
            functional_obsolescence: args.functional,
            external_obsolescence: args.external,
            age: args.age,
            effective_age: args.effective_age,
            economic_life: args
                .economic_life
                .ok_or("--economic-life is required (or provide --input)")?,
        }
    };

    let output = cost::calculate_cost_approach(&request);
    Ok(serde_json::to_value(output)?)
}
