use chrono::{NaiveDate, Utc};
use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use appraisal_core::decision::{self, AppealDecisionRequest};
use appraisal_core::reconciliation::{self, ApproachWeights, ReconciliationRequest};
use appraisal_core::tax_savings::{self, TaxSavingsRequest};

use crate::input;

/// Arguments for OVER/FAIR/UNDER appeal classification
#[derive(Args)]
pub struct DecisionArgs {
    /// Path to JSON input file with the assessment and confidence band
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for weighted reconciliation
#[derive(Args)]
pub struct ReconcileArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Property identifier
    #[arg(long)]
    pub property_id: Option<String>,

    /// Valuation date (YYYY-MM-DD, defaults to today)
    #[arg(long)]
    pub as_of: Option<NaiveDate>,

    /// Income approach indicated value
    #[arg(long)]
    pub income_value: Option<Decimal>,

    /// Sales comparison indicated value
    #[arg(long)]
    pub sales_value: Option<Decimal>,

    /// Cost approach indicated value
    #[arg(long)]
    pub cost_value: Option<Decimal>,

    /// Income weight in whole percent
    #[arg(long)]
    pub weight_income: Option<Decimal>,

    /// Sales weight in whole percent
    #[arg(long)]
    pub weight_sales: Option<Decimal>,

    /// Cost weight in whole percent
    #[arg(long)]
    pub weight_cost: Option<Decimal>,

    /// Appraiser override for the final value
    #[arg(long)]
    pub r#final: Option<Decimal>,
}

/// Arguments for appeal tax-savings analysis
#[derive(Args)]
pub struct TaxSavingsArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Current assessed value
    #[arg(long)]
    pub current: Option<Decimal>,

    /// Proposed assessed value after appeal
    #[arg(long)]
    pub proposed: Option<Decimal>,

    /// Tax rate per $1000 of assessed value
    #[arg(long)]
    pub tax_rate: Option<Decimal>,

    /// Appeal filing fee
    #[arg(long, default_value = "0")]
    pub filing_fee: Decimal,

    /// Attorney/consultant fee
    #[arg(long, default_value = "0")]
    pub attorney_fee: Decimal,

    /// Years of savings to accumulate (1-10)
    #[arg(long, default_value = "1")]
    pub years: u32,
}

pub fn run_reconcile(args: ReconcileArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: ReconciliationRequest = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        ReconciliationRequest {
            property_id: args
                .property_id
                .ok_or("--property-id is required (or provide --input)")?,
            as_of: args.as_of.unwrap_or_else(|| Utc::now().date_naive()),
            income_value: args
                .income_value
                .ok_or("--income-value is required (or provide --input)")?,
            sales_value: args
                .sales_value
                .ok_or("--sales-value is required (or provide --input)")?,
            cost_value: args
                .cost_value
                .ok_or("--cost-value is required (or provide --input)")?,
            weights: ApproachWeights {
                income: args
                    .weight_income
                    .ok_or("--weight-income is required (or provide --input)")?,
                sales: args
                    .weight_sales
                    .ok_or("--weight-sales is required (or provide --input)")?,
                cost: args
                    .weight_cost
                    .ok_or("--weight-cost is required (or provide --input)")?,
            },
            final_override: args.r#final,
            notes: Vec::new(),
            ai_suggested: None,
        }
    };

    let output = reconciliation::reconcile(&request);
    Ok(serde_json::to_value(output)?)
}

pub fn run_decision(args: DecisionArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: AppealDecisionRequest = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("provide --input or pipe a JSON request on stdin".into());
    };

    let output = decision::classify_appeal(&request);
    Ok(serde_json::to_value(output)?)
}

pub fn run_tax_savings(args: TaxSavingsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: TaxSavingsRequest = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        TaxSavingsRequest {
            current_assessed_value: args
                .current
                .ok_or("--current is required (or provide --input)")?,
            proposed_assessed_value: args
                .proposed
                .ok_or("--proposed is required (or provide --input)")?,
            tax_rate: args
                .tax_rate
                .ok_or("--tax-rate is required (or provide --input)")?,
            tax_rate_per_thousand: true,
            filing_fee: args.filing_fee,
            attorney_fee: args.attorney_fee,
            other_costs: Decimal::ZERO,
            years_of_savings: args.years,
        }
    };

    let output = tax_savings::calculate_tax_savings(&request);
    Ok(serde_json::to_value(output)?)
}
