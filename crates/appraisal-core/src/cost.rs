use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::confidence::{ConfidencePenalty, ConfidenceStrategy, StandardConfidence};
use crate::types::{workfile_id, Money, Rate, ValuationResult};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandValueSource {
    Assessment,
    Extraction,
    Allocation,
    #[default]
    Manual,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepreciationMethod {
    #[default]
    StraightLine,
    Observed,
    /// Physical component computed as effective age over economic life
    AgeLife,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostApproachRequest {
    pub property_id: String,
    pub as_of: NaiveDate,
    pub land_value: Money,
    #[serde(default)]
    pub land_value_source: LandValueSource,
    /// Base replacement cost of improvements. When `replacement_cost_per_sf`
    /// and `total_sf` are both present they take precedence.
    pub improvement_cost: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replacement_cost_per_sf: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_sf: Option<Decimal>,
    /// Builder profit as a share of base cost
    #[serde(default)]
    pub builder_profit_rate: Rate,
    /// Entrepreneurial incentive as a share of base cost
    #[serde(default)]
    pub entrepreneurial_incentive_rate: Rate,
    #[serde(default)]
    pub depreciation_method: DepreciationMethod,
    pub physical_deterioration: Rate,
    pub functional_obsolescence: Rate,
    pub external_obsolescence: Rate,
    pub age: Decimal,
    pub effective_age: Decimal,
    pub economic_life: Decimal,
}

impl CostApproachRequest {
    /// Base improvement cost before profit and incentive load.
    pub fn base_improvement_cost(&self) -> Money {
        match (self.replacement_cost_per_sf, self.total_sf) {
            (Some(per_sf), Some(sf)) => per_sf * sf,
            _ => self.improvement_cost,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DepreciationBreakdown {
    pub physical: Money,
    pub functional: Money,
    pub external: Money,
    /// Sum of components, capped at 95% of total replacement cost
    pub total: Money,
    /// True when the 95% cap bound the total
    pub capped: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CostApproachData {
    pub land_value: Money,
    pub base_improvement_cost: Money,
    pub builder_profit: Money,
    pub entrepreneurial_incentive: Money,
    pub total_replacement_cost: Money,
    pub depreciation: DepreciationBreakdown,
    pub improvement_value: Money,
    pub indicated_value: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostApproachOutput {
    pub result: ValuationResult,
    pub cost_data: CostApproachData,
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const BASE_CONFIDENCE: Decimal = dec!(0.90);
/// Total depreciation can never absorb more than this share of
/// replacement cost. Hard invariant, not a configuration knob.
const MAX_DEPRECIATION_RATIO: Decimal = dec!(0.95);
/// Scales the effective-age fraction into a confidence penalty.
const AGE_PENALTY_WEIGHT: Decimal = dec!(0.40);

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Derive an indicated value as land value plus depreciated replacement
/// cost of the improvements.
pub fn calculate_cost_approach(req: &CostApproachRequest) -> CostApproachOutput {
    calculate_cost_approach_with(req, &StandardConfidence)
}

pub fn calculate_cost_approach_with(
    req: &CostApproachRequest,
    strategy: &dyn ConfidenceStrategy,
) -> CostApproachOutput {
    let wf = workfile_id("CA", &req.property_id, req.as_of);

    // All validation failures are reported together, not just the first.
    let mut errors: Vec<String> = Vec::new();
    if req.property_id.trim().is_empty() {
        errors.push("Property ID is required".into());
    }
    if req.land_value <= Decimal::ZERO {
        errors.push("Land value must be greater than 0".into());
    }
    if req.base_improvement_cost() <= Decimal::ZERO {
        errors.push("Improvement cost must be greater than 0".into());
    }
    if req.age < Decimal::ZERO
        || req.effective_age < Decimal::ZERO
        || req.economic_life <= Decimal::ZERO
    {
        errors.push("Age and economic life values must be valid".into());
    }

    if !errors.is_empty() {
        return CostApproachOutput {
            result: ValuationResult::failed(wf, errors),
            cost_data: CostApproachData::default(),
        };
    }

    // --- Replacement cost ---
    let base = req.base_improvement_cost();
    let builder_profit = base * req.builder_profit_rate;
    let entrepreneurial_incentive = base * req.entrepreneurial_incentive_rate;
    let total_replacement_cost = base + builder_profit + entrepreneurial_incentive;

    // --- Depreciation ---
    let age_ratio = req.effective_age / req.economic_life;
    let physical_rate = match req.depreciation_method {
        DepreciationMethod::StraightLine | DepreciationMethod::Observed => {
            req.physical_deterioration
        }
        DepreciationMethod::AgeLife => age_ratio,
    };
    let physical = total_replacement_cost * physical_rate;
    let functional = total_replacement_cost * req.functional_obsolescence;
    let external = total_replacement_cost * req.external_obsolescence;

    let uncapped_total = physical + functional + external;
    let cap = total_replacement_cost * MAX_DEPRECIATION_RATIO;
    let capped = uncapped_total > cap;
    let total = if capped { cap } else { uncapped_total };

    let depreciation = DepreciationBreakdown {
        physical,
        functional,
        external,
        total,
        capped,
    };

    let improvement_value = total_replacement_cost - total;
    let indicated_value = (req.land_value + improvement_value).round();

    // --- Confidence: strictly decreasing in effective age fraction ---
    let penalties = vec![ConfidencePenalty::new(
        format!(
            "Effective age is {:.0}% of economic life",
            age_ratio * dec!(100)
        ),
        age_ratio * AGE_PENALTY_WEIGHT,
    )];

    let confidence = match strategy.score(BASE_CONFIDENCE, &penalties) {
        Ok(c) => c,
        Err(e) => {
            return CostApproachOutput {
                result: ValuationResult::failed(
                    wf,
                    vec![format!("Cost approach calculation failed: {e}")],
                ),
                cost_data: CostApproachData::default(),
            };
        }
    };

    let mut rationale = vec![format!(
        "Land value {:.0} plus improvements of {:.0} after {:.0} depreciation",
        req.land_value, improvement_value, total
    )];
    if capped {
        rationale.push("Total depreciation capped at 95% of replacement cost".into());
    }
    rationale.extend(penalties.iter().map(|p| p.reason.clone()));

    CostApproachOutput {
        result: ValuationResult {
            workfile_id: wf,
            indicated_value,
            confidence,
            rationale,
            errors,
        },
        cost_data: CostApproachData {
            land_value: req.land_value,
            base_improvement_cost: base,
            builder_profit,
            entrepreneurial_incentive,
            total_replacement_cost,
            depreciation,
            improvement_value,
            indicated_value,
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confidence::FailingConfidence;
    use pretty_assertions::assert_eq;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn sample_request() -> CostApproachRequest {
        CostApproachRequest {
            property_id: "parcel-001".into(),
            as_of: as_of(),
            land_value: dec!(800000),
            land_value_source: LandValueSource::Assessment,
            improvement_cost: dec!(2500000),
            replacement_cost_per_sf: None,
            total_sf: None,
            builder_profit_rate: Decimal::ZERO,
            entrepreneurial_incentive_rate: Decimal::ZERO,
            depreciation_method: DepreciationMethod::Observed,
            physical_deterioration: dec!(0.15),
            functional_obsolescence: dec!(0.05),
            external_obsolescence: Decimal::ZERO,
            age: dec!(20),
            effective_age: dec!(15),
            economic_life: dec!(50),
        }
    }

    #[test]
    fn test_depreciation_breakdown_example() {
        let out = calculate_cost_approach(&sample_request());
        let d = &out.cost_data;

        assert!(out.result.is_ok(), "{:?}", out.result.errors);
        assert_eq!(d.total_replacement_cost, dec!(2500000));
        // 2,500,000 * 0.15 and * 0.05
        assert_eq!(d.depreciation.physical, dec!(375000));
        assert_eq!(d.depreciation.functional, dec!(125000));
        assert_eq!(d.depreciation.external, Decimal::ZERO);
        assert_eq!(d.depreciation.total, dec!(500000));
        assert!(!d.depreciation.capped);

        // Improvement = 2,500,000 - 500,000; indicated = round(land + improvement)
        assert_eq!(d.improvement_value, dec!(2000000));
        assert_eq!(out.result.indicated_value, dec!(2800000));
    }

    #[test]
    fn test_builder_profit_and_incentive_load() {
        let mut req = sample_request();
        req.builder_profit_rate = dec!(0.10);
        req.entrepreneurial_incentive_rate = dec!(0.05);
        let out = calculate_cost_approach(&req);
        let d = &out.cost_data;

        assert_eq!(d.builder_profit, dec!(250000));
        assert_eq!(d.entrepreneurial_incentive, dec!(125000));
        assert_eq!(d.total_replacement_cost, dec!(2875000));
        // Depreciation rates apply to the loaded replacement cost
        assert_eq!(d.depreciation.physical, dec!(2875000) * dec!(0.15));
    }

    #[test]
    fn test_per_sf_inputs_take_precedence() {
        let mut req = sample_request();
        req.replacement_cost_per_sf = Some(dec!(125));
        req.total_sf = Some(dec!(20000));
        let out = calculate_cost_approach(&req);

        assert_eq!(out.cost_data.base_improvement_cost, dec!(2500000));
    }

    #[test]
    fn test_depreciation_capped_at_95_percent() {
        let mut req = sample_request();
        req.physical_deterioration = dec!(0.80);
        req.functional_obsolescence = dec!(0.40);
        req.external_obsolescence = dec!(0.20);
        let out = calculate_cost_approach(&req);
        let d = &out.cost_data;

        assert!(d.depreciation.capped);
        assert_eq!(d.depreciation.total, d.total_replacement_cost * dec!(0.95));
        assert!(d.depreciation.total / d.total_replacement_cost <= dec!(0.95));
        // Improvement value never goes below 5% of replacement cost
        assert_eq!(d.improvement_value, d.total_replacement_cost * dec!(0.05));
        assert!(out
            .result
            .rationale
            .iter()
            .any(|r| r.contains("capped at 95%")));
    }

    #[test]
    fn test_age_life_method_uses_age_ratio() {
        let mut req = sample_request();
        req.depreciation_method = DepreciationMethod::AgeLife;
        req.effective_age = dec!(10);
        req.economic_life = dec!(50);
        let out = calculate_cost_approach(&req);

        // Physical = TRC * 10/50, regardless of the observed rate
        assert_eq!(
            out.cost_data.depreciation.physical,
            dec!(2500000) * dec!(0.2)
        );
    }

    #[test]
    fn test_validation_completeness() {
        let req = CostApproachRequest {
            property_id: String::new(),
            as_of: as_of(),
            land_value: dec!(-1),
            land_value_source: LandValueSource::Manual,
            improvement_cost: Decimal::ZERO,
            replacement_cost_per_sf: None,
            total_sf: None,
            builder_profit_rate: Decimal::ZERO,
            entrepreneurial_incentive_rate: Decimal::ZERO,
            depreciation_method: DepreciationMethod::StraightLine,
            physical_deterioration: Decimal::ZERO,
            functional_obsolescence: Decimal::ZERO,
            external_obsolescence: Decimal::ZERO,
            age: dec!(-5),
            effective_age: dec!(-3),
            economic_life: Decimal::ZERO,
        };
        let out = calculate_cost_approach(&req);
        let errors = &out.result.errors;

        // Every failing check is reported, not just the first encountered.
        assert_eq!(errors.len(), 4, "{errors:?}");
        assert!(errors.iter().any(|e| e == "Property ID is required"));
        assert!(errors.iter().any(|e| e == "Land value must be greater than 0"));
        assert!(errors
            .iter()
            .any(|e| e == "Improvement cost must be greater than 0"));
        assert!(errors
            .iter()
            .any(|e| e == "Age and economic life values must be valid"));
        assert_eq!(out.result.indicated_value, Decimal::ZERO);
    }

    #[test]
    fn test_zero_economic_life_rejected() {
        let mut req = sample_request();
        req.economic_life = Decimal::ZERO;
        let out = calculate_cost_approach(&req);

        assert!(out
            .result
            .errors
            .iter()
            .any(|e| e == "Age and economic life values must be valid"));
    }

    #[test]
    fn test_confidence_monotonic_in_age() {
        let mut newer = sample_request();
        newer.age = dec!(2);
        newer.effective_age = dec!(2);

        let mut older = sample_request();
        older.age = dec!(45);
        older.effective_age = dec!(45);

        let newer_out = calculate_cost_approach(&newer);
        let older_out = calculate_cost_approach(&older);

        assert!(newer_out.result.confidence >= older_out.result.confidence);
        assert!(newer_out.result.confidence > older_out.result.confidence);
    }

    #[test]
    fn test_confidence_bounded() {
        let mut req = sample_request();
        req.effective_age = dec!(200);
        req.economic_life = dec!(50);
        let out = calculate_cost_approach(&req);

        assert!(out.result.confidence > Decimal::ZERO);
        assert!(out.result.confidence <= Decimal::ONE);
    }

    #[test]
    fn test_failing_strategy_becomes_error_string() {
        let out = calculate_cost_approach_with(&sample_request(), &FailingConfidence);

        assert_eq!(out.result.errors.len(), 1);
        assert!(out.result.errors[0].starts_with("Cost approach calculation failed:"));
        assert_eq!(out.result.indicated_value, Decimal::ZERO);
    }

    #[test]
    fn test_indicated_value_rounds() {
        let mut req = sample_request();
        req.land_value = dec!(800000.40);
        let out = calculate_cost_approach(&req);

        assert_eq!(out.result.indicated_value, dec!(2800000));
    }

    #[test]
    fn test_idempotent_for_fixed_as_of() {
        let req = sample_request();
        let a = calculate_cost_approach(&req);
        let b = calculate_cost_approach(&req);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }
}
