//! Appeal classification: is the property over-, fairly, or
//! under-assessed, and is an appeal worth filing?
//!
//! Combines the assessment ratio, the valuation confidence band, and
//! jurisdiction priors into an OVER/FAIR/UNDER call with expected-savings
//! economics. Priors are plain historical statistics; conservative
//! defaults apply when a jurisdiction has none.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{ConfidenceTag, Money, Rate};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AppealClassification {
    /// Over-assessed; appeal recommended
    Over,
    /// Fairly assessed; appeal not recommended
    Fair,
    /// Under-assessed; appealing risks a higher assessment
    Under,
}

/// Confidence band around the market value estimate, as produced by the
/// reconciliation step or an upstream valuation service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceBand {
    pub central_estimate: Money,
    /// Half-width of the band as a share of the central estimate
    pub band_pct: Rate,
    pub lower_bound: Money,
    pub upper_bound: Money,
    /// Overall valuation confidence in [0, 1]
    pub confidence_score: Decimal,
    /// A/B/C/D reliability grade
    pub reliability_grade: String,
    #[serde(default)]
    pub risk_factors: Vec<String>,
}

impl ConfidenceBand {
    pub fn contains(&self, value: Money) -> bool {
        self.lower_bound <= value && value <= self.upper_bound
    }
}

/// Historical appeal statistics for a jurisdiction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JurisdictionPriors {
    pub jurisdiction_id: String,
    pub jurisdiction_name: String,
    pub state: String,
    /// Historical share of appeals that succeed
    pub appeal_success_rate: Rate,
    /// Average assessment reduction when an appeal succeeds
    pub average_reduction_pct: Rate,
    pub typical_filing_fee: Money,
    pub typical_attorney_cost: Money,
    /// Coefficient-of-dispersion target for the ratio study
    pub cod_target: Rate,
    /// Historical risk of an assessment increase on review
    pub reassessment_risk_factor: Rate,
}

impl Default for JurisdictionPriors {
    /// Conservative statewide defaults for jurisdictions with no history.
    fn default() -> Self {
        JurisdictionPriors {
            jurisdiction_id: "default".into(),
            jurisdiction_name: "Default Jurisdiction".into(),
            state: "TX".into(),
            appeal_success_rate: dec!(0.30),
            average_reduction_pct: dec!(0.12),
            typical_filing_fee: dec!(500),
            typical_attorney_cost: dec!(3000),
            cod_target: dec!(0.10),
            reassessment_risk_factor: dec!(0.05),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppealDecisionRequest {
    pub property_id: String,
    pub as_of: NaiveDate,
    pub assessed_value: Money,
    pub estimated_market_value: Money,
    pub band: ConfidenceBand,
    #[serde(default)]
    pub priors: JurisdictionPriors,
    /// Effective tax rate as a decimal (0.025 = 2.5%)
    pub tax_rate: Rate,
    #[serde(default)]
    pub filing_fee: Money,
    #[serde(default)]
    pub attorney_fee: Money,
    #[serde(default)]
    pub other_costs: Money,
    /// Minimum ROI in percent for an appeal to be recommended
    #[serde(default = "default_min_roi")]
    pub min_roi_threshold: Decimal,
    /// Minimum annual savings for an appeal to be recommended
    #[serde(default = "default_min_savings")]
    pub min_savings_threshold: Money,
    #[serde(default = "default_horizon")]
    pub horizon_years: u32,
}

fn default_min_roi() -> Decimal {
    dec!(2.0)
}

fn default_min_savings() -> Money {
    dec!(1000)
}

fn default_horizon() -> u32 {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppealDecisionOutput {
    pub classification: AppealClassification,
    pub confidence_level: ConfidenceTag,
    /// Assessed value over estimated market value, rounded to 2dp
    pub assessment_ratio: Decimal,
    pub within_confidence_band: bool,
    /// Estimated probability the appeal succeeds, in [0.05, 0.95]
    pub success_probability: Decimal,
    pub reassessment_risk_warning: bool,
    pub expected_annual_savings: Money,
    pub total_appeal_costs: Money,
    pub net_first_year_savings: Money,
    pub cumulative_net_savings: Money,
    /// Horizon ROI in percent; None when appeal costs are zero
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_roi: Option<Decimal>,
    /// Assessment reduction (as a share) needed to break even
    pub breakeven_reduction_pct: Rate,
    pub rationale: Vec<String>,
    pub risk_factors: Vec<String>,
    pub supporting_factors: Vec<String>,
    pub errors: Vec<String>,
}

impl AppealDecisionOutput {
    fn failed(errors: Vec<String>) -> Self {
        AppealDecisionOutput {
            classification: AppealClassification::Fair,
            confidence_level: ConfidenceTag::Low,
            assessment_ratio: Decimal::ZERO,
            within_confidence_band: false,
            success_probability: Decimal::ZERO,
            reassessment_risk_warning: false,
            expected_annual_savings: Decimal::ZERO,
            total_appeal_costs: Decimal::ZERO,
            net_first_year_savings: Decimal::ZERO,
            cumulative_net_savings: Decimal::ZERO,
            expected_roi: None,
            breakeven_reduction_pct: Decimal::ZERO,
            rationale: Vec::new(),
            risk_factors: Vec::new(),
            supporting_factors: Vec::new(),
            errors,
        }
    }
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Ratios below this are treated as clearly under-assessed.
const UNDER_RATIO: Decimal = dec!(0.90);
/// Effective tax rates above 10% fail the sanity check.
const MAX_TAX_RATE: Decimal = dec!(0.10);
/// Success-probability boost from sitting outside the band is capped here.
const MAX_BAND_BOOST: Decimal = dec!(0.30);
const MIN_SUCCESS_PROBABILITY: Decimal = dec!(0.05);
const MAX_SUCCESS_PROBABILITY: Decimal = dec!(0.95);

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Classify an assessment as OVER/FAIR/UNDER and work out the appeal
/// economics under the jurisdiction's typical reduction.
pub fn classify_appeal(req: &AppealDecisionRequest) -> AppealDecisionOutput {
    let mut errors: Vec<String> = Vec::new();

    if req.assessed_value <= Decimal::ZERO {
        errors.push("Assessed value must be greater than 0".into());
    }
    if req.estimated_market_value <= Decimal::ZERO {
        errors.push("Estimated market value must be greater than 0".into());
    }
    if req.tax_rate <= Decimal::ZERO {
        errors.push("Tax rate must be greater than 0".into());
    } else if req.tax_rate > MAX_TAX_RATE {
        errors.push("Tax rate seems unreasonably high (>10%)".into());
    }
    if !(1..=10).contains(&req.horizon_years) {
        errors.push("Appeal horizon must be between 1 and 10 years".into());
    }

    if !errors.is_empty() {
        return AppealDecisionOutput::failed(errors);
    }

    let assessment_ratio = req.assessed_value / req.estimated_market_value;
    let within_confidence_band = req.band.contains(req.assessed_value);

    // --- Expected savings under the jurisdiction's typical reduction ---
    let reduced = (req.assessed_value * (Decimal::ONE - req.priors.average_reduction_pct))
        .max(req.estimated_market_value);
    let annual_savings = (req.assessed_value - reduced) * req.tax_rate;

    let mut total_costs = req.filing_fee + req.attorney_fee + req.other_costs;
    if total_costs.is_zero() {
        total_costs = req.priors.typical_filing_fee + req.priors.typical_attorney_cost;
    }

    let horizon = Decimal::from(req.horizon_years);
    let net_first_year = annual_savings - total_costs;
    let cumulative = annual_savings * horizon - total_costs;

    let expected_roi = if total_costs > Decimal::ZERO {
        Some(round_pct(
            (annual_savings * horizon - total_costs) / total_costs * dec!(100),
        ))
    } else {
        None
    };

    let breakeven_reduction_pct = if total_costs > Decimal::ZERO {
        // Annual savings that just recover costs over the horizon,
        // expressed as a share of the current assessment
        round_pct(total_costs / horizon / req.tax_rate / req.assessed_value)
    } else {
        Decimal::ZERO
    };

    // --- Success probability: jurisdiction baseline, band-adjusted ---
    let mut success_probability = req.priors.appeal_success_rate;
    if !within_confidence_band {
        if assessment_ratio > Decimal::ONE {
            let excess = assessment_ratio - Decimal::ONE;
            if excess > req.band.band_pct {
                let boost = (excess * dec!(0.5)).min(MAX_BAND_BOOST);
                success_probability = (success_probability + boost).min(dec!(0.9));
            }
        } else {
            // Under-assessed: an appeal is more likely to backfire
            success_probability = (success_probability * dec!(0.3)).min(dec!(0.2));
        }
    }
    success_probability = (success_probability
        + (req.band.confidence_score - dec!(0.5)) * dec!(0.2))
        .clamp(MIN_SUCCESS_PROBABILITY, MAX_SUCCESS_PROBABILITY);

    // --- Classification ---
    let mut rationale: Vec<String> = Vec::new();
    let mut risk_factors: Vec<String> = Vec::new();
    let mut supporting_factors: Vec<String> = Vec::new();
    let mut reassessment_risk_warning = false;

    let classification = if assessment_ratio < UNDER_RATIO {
        reassessment_risk_warning = true;
        rationale.push(format!(
            "Assessment is {:.2}% below estimated market value",
            round_pct((Decimal::ONE - assessment_ratio) * dec!(100))
        ));
        rationale.push("Appealing could result in a higher assessment".into());
        risk_factors.push("High risk of assessment increase upon review".into());
        if req.priors.reassessment_risk_factor > dec!(0.1) {
            risk_factors.push("Jurisdiction has history of reassessment increases".into());
        }
        AppealClassification::Under
    } else if assessment_ratio <= Decimal::ONE + req.priors.cod_target && within_confidence_band {
        rationale.push("Assessment is within reasonable bounds of market value".into());
        rationale.push("Assessment falls within valuation confidence band".into());
        match expected_roi {
            Some(roi) if roi > req.min_roi_threshold && annual_savings > req.min_savings_threshold => {
                supporting_factors.push(format!("Appeal could still provide {roi}% ROI"));
            }
            _ => {
                risk_factors.push("Expected savings may not justify appeal costs".into());
            }
        }
        AppealClassification::Fair
    } else {
        rationale.push(format!(
            "Assessment appears {:.2}% above estimated market value",
            round_pct((assessment_ratio - Decimal::ONE) * dec!(100))
        ));
        if !within_confidence_band {
            rationale.push(format!(
                "Assessment is outside the {:.2}% confidence band",
                round_pct(req.band.band_pct * dec!(100))
            ));
        }
        match expected_roi {
            Some(roi) if roi > req.min_roi_threshold => {
                rationale.push(format!(
                    "Expected ROI of {roi}% exceeds {}% threshold",
                    req.min_roi_threshold
                ));
            }
            Some(roi) => {
                risk_factors.push(format!(
                    "Expected ROI of {roi}% is below {}% threshold",
                    req.min_roi_threshold
                ));
            }
            None => {
                risk_factors.push("Appeal costs may exceed potential savings".into());
            }
        }
        if annual_savings > req.min_savings_threshold {
            supporting_factors.push(format!(
                "Expected annual savings of {:.2} exceeds threshold",
                round_currency(annual_savings)
            ));
        } else {
            risk_factors.push(format!(
                "Expected annual savings below {:.2} threshold",
                req.min_savings_threshold
            ));
        }
        AppealClassification::Over
    };

    let confidence_level = confidence_level(
        assessment_ratio,
        success_probability,
        &req.band,
    );

    if req.band.reliability_grade == "C" || req.band.reliability_grade == "D" {
        risk_factors.push(format!(
            "Valuation reliability grade: {}",
            req.band.reliability_grade
        ));
    }
    if success_probability < dec!(0.4) {
        risk_factors.push("Below-average probability of success in this jurisdiction".into());
    }
    if classification == AppealClassification::Over {
        if success_probability > dec!(0.6) {
            supporting_factors.push("Above-average probability of success".into());
        }
        if req.band.reliability_grade == "A" || req.band.reliability_grade == "B" {
            supporting_factors.push(format!(
                "High-quality valuation (Grade {})",
                req.band.reliability_grade
            ));
        }
    }

    AppealDecisionOutput {
        classification,
        confidence_level,
        assessment_ratio: round_pct(assessment_ratio),
        within_confidence_band,
        success_probability: round_pct(success_probability),
        reassessment_risk_warning,
        expected_annual_savings: round_currency(annual_savings),
        total_appeal_costs: round_currency(total_costs),
        net_first_year_savings: round_currency(net_first_year),
        cumulative_net_savings: round_currency(cumulative),
        expected_roi,
        breakeven_reduction_pct,
        rationale,
        risk_factors,
        supporting_factors,
        errors,
    }
}

/// Count the signals that make the call trustworthy, then bucket.
fn confidence_level(
    assessment_ratio: Decimal,
    success_probability: Decimal,
    band: &ConfidenceBand,
) -> ConfidenceTag {
    let mut factors = 0u32;

    if band.confidence_score > dec!(0.7) {
        factors += 2;
    } else if band.confidence_score > dec!(0.5) {
        factors += 1;
    }

    if assessment_ratio > dec!(1.15) || assessment_ratio < dec!(0.85) {
        factors += 2;
    } else if assessment_ratio > dec!(1.10) || assessment_ratio < dec!(0.90) {
        factors += 1;
    }

    if success_probability > dec!(0.6) {
        factors += 1;
    }
    if band.risk_factors.len() <= 2 {
        factors += 1;
    }

    if factors >= 5 {
        ConfidenceTag::High
    } else if factors >= 3 {
        ConfidenceTag::Medium
    } else {
        ConfidenceTag::Low
    }
}

fn round_currency(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn round_pct(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
