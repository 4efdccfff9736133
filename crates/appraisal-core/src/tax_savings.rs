//! Appeal economics: what a successful assessment reduction is worth
//! after filing and representation costs.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::Money;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxSavingsRequest {
    pub current_assessed_value: Money,
    pub proposed_assessed_value: Money,
    /// Rate per $1000 of assessed value (or mills; the arithmetic is the
    /// same, the flag only tracks which convention the caller used)
    pub tax_rate: Decimal,
    #[serde(default = "default_per_thousand")]
    pub tax_rate_per_thousand: bool,
    #[serde(default)]
    pub filing_fee: Money,
    #[serde(default)]
    pub attorney_fee: Money,
    #[serde(default)]
    pub other_costs: Money,
    #[serde(default = "default_years")]
    pub years_of_savings: u32,
}

fn default_per_thousand() -> bool {
    true
}

fn default_years() -> u32 {
    1
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaxSavingsOutput {
    pub annual_tax_current: Money,
    pub annual_tax_proposed: Money,
    pub annual_savings: Money,
    pub total_appeal_costs: Money,
    pub net_first_year_savings: Money,
    pub cumulative_savings: Money,
    /// Years to recoup appeal costs; None when there are no savings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payback_period_years: Option<Decimal>,
    /// Return on appeal costs over the horizon; None when costs are zero
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roi_pct: Option<Decimal>,
    /// Proposed value is higher than current ("Under" scenario)
    pub value_increase_warning: bool,
    /// Appeal would increase taxes
    pub negative_savings_warning: bool,
    pub errors: Vec<String>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Compute savings from a successful appeal over the requested horizon.
pub fn calculate_tax_savings(req: &TaxSavingsRequest) -> TaxSavingsOutput {
    let mut errors: Vec<String> = Vec::new();

    if req.current_assessed_value <= Decimal::ZERO || req.proposed_assessed_value <= Decimal::ZERO
    {
        errors.push("Assessed values must be greater than 0".into());
    }
    if req.tax_rate <= Decimal::ZERO {
        errors.push("Tax rate must be greater than 0".into());
    }
    if req.tax_rate > dec!(200) {
        errors.push(if req.tax_rate_per_thousand {
            "Tax rate per $1000 seems too high (>$200); verify the rate convention".into()
        } else {
            "Mill rate seems too high (>200 mills); verify the rate convention".into()
        });
    }
    if !(1..=10).contains(&req.years_of_savings) {
        errors.push("Years of savings must be between 1 and 10".into());
    }

    if !errors.is_empty() {
        return TaxSavingsOutput {
            errors,
            ..TaxSavingsOutput::default()
        };
    }

    let annual_tax_current = annual_tax(req.current_assessed_value, req.tax_rate);
    let annual_tax_proposed = annual_tax(req.proposed_assessed_value, req.tax_rate);
    let annual_savings = annual_tax_current - annual_tax_proposed;

    let total_appeal_costs = req.filing_fee + req.attorney_fee + req.other_costs;
    let net_first_year_savings = annual_savings - total_appeal_costs;
    let cumulative_savings =
        annual_savings * Decimal::from(req.years_of_savings) - total_appeal_costs;

    let payback_period_years = if annual_savings > Decimal::ZERO {
        Some(round_currency(total_appeal_costs / annual_savings))
    } else {
        None
    };
    let roi_pct = if total_appeal_costs > Decimal::ZERO {
        Some(round_currency(
            cumulative_savings / total_appeal_costs * dec!(100),
        ))
    } else {
        None
    };

    TaxSavingsOutput {
        annual_tax_current: round_currency(annual_tax_current),
        annual_tax_proposed: round_currency(annual_tax_proposed),
        annual_savings: round_currency(annual_savings),
        total_appeal_costs: round_currency(total_appeal_costs),
        net_first_year_savings: round_currency(net_first_year_savings),
        cumulative_savings: round_currency(cumulative_savings),
        payback_period_years,
        roi_pct,
        value_increase_warning: req.proposed_assessed_value > req.current_assessed_value,
        negative_savings_warning: annual_savings < Decimal::ZERO,
        errors,
    }
}

/// Both per-$1000 rates and mill rates divide assessed value by 1000.
fn annual_tax(assessed_value: Money, rate: Decimal) -> Money {
    assessed_value / dec!(1000) * rate
}

fn round_currency(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
