use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::confidence::{ConfidencePenalty, ConfidenceStrategy, StandardConfidence};
use crate::types::{
    sums_to, workfile_id, ConfidenceTag, Money, ValuationResult, WEIGHT_SUM_TOLERANCE,
};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Optional IAAO attributes on a comparable. Advisory only: they inform
/// confidence scoring, never the indicated value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IaaoAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lot_size_sf: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_built: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub construction_quality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_rating: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stories: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parking_spaces: Option<u32>,
}

/// One comparable sale. Caller-supplied `adjusted_price` and
/// `adjusted_price_per_sf` are recomputed by the engine, never trusted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyComparable {
    pub address: String,
    pub sale_date: NaiveDate,
    pub sale_price: Money,
    pub square_footage: Decimal,
    /// Condition adjustment (signed dollars)
    #[serde(default)]
    pub condition_adjustment: Money,
    /// Location adjustment (signed dollars)
    #[serde(default)]
    pub location_adjustment: Money,
    /// Market-time adjustment (signed dollars)
    #[serde(default)]
    pub time_adjustment: Money,
    /// Other adjustment (signed dollars)
    #[serde(default)]
    pub other_adjustment: Money,
    /// Recomputed; accepted on input for round-tripping only
    #[serde(default)]
    pub adjusted_price: Money,
    #[serde(default)]
    pub adjusted_price_per_sf: Money,
    /// Contribution to the weighted average, in [0, 1]
    pub weight: Decimal,
    #[serde(default)]
    pub confidence: ConfidenceTag,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iaao: Option<IaaoAttributes>,
}

impl PropertyComparable {
    /// Sum of the four signed dollar adjustments.
    pub fn total_adjustment(&self) -> Money {
        self.condition_adjustment
            + self.location_adjustment
            + self.time_adjustment
            + self.other_adjustment
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesComparisonRequest {
    pub property_id: String,
    /// Valuation date; recency penalties are measured against this
    pub as_of: NaiveDate,
    pub comparables: Vec<PropertyComparable>,
}

/// A comparable after the engine recomputed its derived figures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustedComparable {
    pub address: String,
    pub sale_date: NaiveDate,
    pub sale_price: Money,
    pub total_adjustment: Money,
    pub adjusted_price: Money,
    pub adjusted_price_per_sf: Money,
    pub weight: Decimal,
    pub confidence: ConfidenceTag,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesComparisonOutput {
    pub result: ValuationResult,
    pub comparables: Vec<AdjustedComparable>,
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const BASE_CONFIDENCE: Decimal = dec!(0.95);
/// Sales older than this many days draw a recency penalty.
const STALE_SALE_DAYS: i64 = 365;
/// Total adjustments above this share of sale price draw a penalty.
const LARGE_ADJUSTMENT_RATIO: Decimal = dec!(0.10);
/// Comp sets smaller than this draw a thin-data penalty.
const MIN_COMPARABLE_COUNT: usize = 3;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Derive an indicated value from a weighted set of adjusted comparables.
pub fn calculate_sales_comparison(req: &SalesComparisonRequest) -> SalesComparisonOutput {
    calculate_sales_comparison_with(req, &StandardConfidence)
}

/// As [`calculate_sales_comparison`], with an injectable confidence
/// strategy. A strategy failure is converted into a single
/// "Sales comparison calculation failed" error, never a panic.
pub fn calculate_sales_comparison_with(
    req: &SalesComparisonRequest,
    strategy: &dyn ConfidenceStrategy,
) -> SalesComparisonOutput {
    let wf = workfile_id("SC", &req.property_id, req.as_of);
    let mut errors: Vec<String> = Vec::new();

    if req.property_id.trim().is_empty() {
        errors.push("Property ID is required".into());
    }

    if req.comparables.is_empty() {
        errors.push("At least one comparable is required".into());
        return SalesComparisonOutput {
            result: ValuationResult::failed(wf, errors),
            comparables: Vec::new(),
        };
    }

    let weight_sum: Decimal = req.comparables.iter().map(|c| c.weight).sum();
    if !sums_to(weight_sum, Decimal::ONE, WEIGHT_SUM_TOLERANCE) {
        errors.push("Comparable weights must sum to 1.0".into());
    }

    // --- Recompute derived figures per comparable ---
    let mut adjusted: Vec<AdjustedComparable> = Vec::with_capacity(req.comparables.len());
    for comp in &req.comparables {
        if comp.square_footage <= Decimal::ZERO {
            errors.push(format!(
                "Comparable at {} must have square footage greater than 0",
                comp.address
            ));
            continue;
        }
        let adjusted_price = comp.sale_price + comp.total_adjustment();
        adjusted.push(AdjustedComparable {
            address: comp.address.clone(),
            sale_date: comp.sale_date,
            sale_price: comp.sale_price,
            total_adjustment: comp.total_adjustment(),
            adjusted_price,
            adjusted_price_per_sf: adjusted_price / comp.square_footage,
            weight: comp.weight,
            confidence: comp.confidence,
        });
    }

    if !errors.is_empty() {
        return SalesComparisonOutput {
            result: ValuationResult::failed(wf, errors),
            comparables: Vec::new(),
        };
    }

    // --- Weighted sum of dollar-adjusted prices ---
    let indicated_value: Money = adjusted
        .iter()
        .map(|c| c.adjusted_price * c.weight)
        .sum();

    // --- Confidence penalties ---
    let mut penalties: Vec<ConfidencePenalty> = Vec::new();
    for comp in &adjusted {
        let age_days = (req.as_of - comp.sale_date).num_days();
        if age_days > STALE_SALE_DAYS {
            penalties.push(ConfidencePenalty::new(
                format!("Sale at {} is more than 12 months old", comp.address),
                dec!(0.05),
            ));
        }
        if comp.sale_price > Decimal::ZERO
            && comp.total_adjustment.abs() / comp.sale_price > LARGE_ADJUSTMENT_RATIO
        {
            penalties.push(ConfidencePenalty::new(
                format!(
                    "Adjustments for {} exceed 10% of its sale price",
                    comp.address
                ),
                dec!(0.05),
            ));
        }
        if comp.confidence == ConfidenceTag::Low {
            penalties.push(ConfidencePenalty::new(
                format!("Comparable at {} is tagged low confidence", comp.address),
                dec!(0.03),
            ));
        }
    }
    if adjusted.len() < MIN_COMPARABLE_COUNT {
        penalties.push(ConfidencePenalty::new(
            format!(
                "Only {} comparable(s); three or more preferred",
                adjusted.len()
            ),
            dec!(0.10),
        ));
    }

    let confidence = match strategy.score(BASE_CONFIDENCE, &penalties) {
        Ok(c) => c,
        Err(e) => {
            return SalesComparisonOutput {
                result: ValuationResult::failed(
                    wf,
                    vec![format!("Sales comparison calculation failed: {e}")],
                ),
                comparables: Vec::new(),
            };
        }
    };

    // --- Rationale ---
    let low_per_sf = adjusted
        .iter()
        .map(|c| c.adjusted_price_per_sf)
        .min()
        .unwrap_or(Decimal::ZERO);
    let high_per_sf = adjusted
        .iter()
        .map(|c| c.adjusted_price_per_sf)
        .max()
        .unwrap_or(Decimal::ZERO);

    let mut rationale = vec![format!(
        "Indicated value based on {} comparable sale(s) with adjusted prices from {:.2}/SF to {:.2}/SF",
        adjusted.len(),
        low_per_sf,
        high_per_sf
    )];
    rationale.extend(penalties.iter().map(|p| p.reason.clone()));

    SalesComparisonOutput {
        result: ValuationResult {
            workfile_id: wf,
            indicated_value,
            confidence,
            rationale,
            errors,
        },
        comparables: adjusted,
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

    fn comp(
        address: &str,
        sale_price: Decimal,
        sf: Decimal,
        weight: Decimal,
        sale_date: NaiveDate,
    ) -> PropertyComparable {
        PropertyComparable {
            address: address.into(),
            sale_date,
            sale_price,
            square_footage: sf,
            condition_adjustment: Decimal::ZERO,
            location_adjustment: Decimal::ZERO,
            time_adjustment: Decimal::ZERO,
            other_adjustment: Decimal::ZERO,
            adjusted_price: Decimal::ZERO,
            adjusted_price_per_sf: Decimal::ZERO,
            weight,
            confidence: ConfidenceTag::Medium,
            iaao: None,
        }
    }

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn recent() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, 15).unwrap()
    }

    fn sample_request() -> SalesComparisonRequest {
        let mut a = comp("100 Main St", dec!(3150000), dec!(21000), dec!(0.4), recent());
        a.time_adjustment = dec!(2000);
        let b = comp("200 Oak Ave", dec!(2945000), dec!(19500), dec!(0.6), recent());
        SalesComparisonRequest {
            property_id: "parcel-001".into(),
            as_of: as_of(),
            comparables: vec![a, b],
        }
    }

    #[test]
    fn test_adjusted_price_recomputed_from_components() {
        let mut req = sample_request();
        // Caller-supplied derived fields are garbage; engine must recompute.
        req.comparables[0].adjusted_price = dec!(999);
        req.comparables[0].adjusted_price_per_sf = dec!(1);

        let out = calculate_sales_comparison(&req);
        assert!(out.result.is_ok());
        assert_eq!(out.comparables[0].adjusted_price, dec!(3152000));
        assert_eq!(
            out.comparables[0].adjusted_price_per_sf,
            dec!(3152000) / dec!(21000)
        );
    }

    #[test]
    fn test_weighted_value_example() {
        let req = sample_request();
        let out = calculate_sales_comparison(&req);

        // 3,152,000 * 0.4 + 2,945,000 * 0.6 = 3,027,800
        assert!(out.result.is_ok());
        assert_eq!(out.result.indicated_value, dec!(3027800.0));
    }

    #[test]
    fn test_empty_comparables() {
        let req = SalesComparisonRequest {
            property_id: "parcel-001".into(),
            as_of: as_of(),
            comparables: vec![],
        };
        let out = calculate_sales_comparison(&req);

        assert_eq!(out.result.indicated_value, Decimal::ZERO);
        assert!(out
            .result
            .errors
            .iter()
            .any(|e| e == "At least one comparable is required"));
    }

    #[test]
    fn test_missing_property_id() {
        let mut req = sample_request();
        req.property_id = "  ".into();
        let out = calculate_sales_comparison(&req);

        assert!(out
            .result
            .errors
            .iter()
            .any(|e| e == "Property ID is required"));
        assert_eq!(out.result.indicated_value, Decimal::ZERO);
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let mut req = sample_request();
        req.comparables[0].weight = dec!(0.4);
        req.comparables[1].weight = dec!(0.4);
        let out = calculate_sales_comparison(&req);

        assert!(out
            .result
            .errors
            .iter()
            .any(|e| e == "Comparable weights must sum to 1.0"));
        assert_eq!(out.result.indicated_value, Decimal::ZERO);
    }

    #[test]
    fn test_weight_sum_within_tolerance_accepted() {
        let mut req = sample_request();
        req.comparables[0].weight = dec!(0.4003);
        req.comparables[1].weight = dec!(0.5999);
        let out = calculate_sales_comparison(&req);
        assert!(out.result.is_ok(), "errors: {:?}", out.result.errors);
    }

    #[test]
    fn test_errors_accumulate() {
        let mut req = sample_request();
        req.property_id = String::new();
        req.comparables[0].weight = dec!(0.9);
        let out = calculate_sales_comparison(&req);

        assert!(out.result.errors.len() >= 2, "{:?}", out.result.errors);
    }

    #[test]
    fn test_zero_square_footage_rejected() {
        let mut req = sample_request();
        req.comparables[1].square_footage = Decimal::ZERO;
        let out = calculate_sales_comparison(&req);

        assert!(out
            .result
            .errors
            .iter()
            .any(|e| e.contains("200 Oak Ave") && e.contains("square footage")));
        assert_eq!(out.result.indicated_value, Decimal::ZERO);
    }

    #[test]
    fn test_rationale_names_count_and_range() {
        let req = sample_request();
        let out = calculate_sales_comparison(&req);

        let first = &out.result.rationale[0];
        assert!(first.contains("2 comparable"), "rationale: {first}");
        assert!(first.contains("/SF"), "rationale: {first}");
    }

    #[test]
    fn test_stale_sales_reduce_confidence() {
        let fresh = calculate_sales_comparison(&sample_request());

        let mut stale_req = sample_request();
        let old = NaiveDate::from_ymd_opt(2023, 1, 10).unwrap();
        stale_req.comparables[0].sale_date = old;
        stale_req.comparables[1].sale_date = old;
        let stale = calculate_sales_comparison(&stale_req);

        assert!(stale.result.confidence < fresh.result.confidence);
        assert!(stale
            .result
            .rationale
            .iter()
            .any(|r| r.contains("more than 12 months old")));
    }

    #[test]
    fn test_large_adjustments_reduce_confidence() {
        let baseline = calculate_sales_comparison(&sample_request());

        let mut req = sample_request();
        req.comparables[0].location_adjustment = dec!(500000); // ~16% of sale price
        let adjusted = calculate_sales_comparison(&req);

        assert!(adjusted.result.confidence < baseline.result.confidence);
    }

    #[test]
    fn test_few_comparables_reduce_confidence() {
        let two_comps = calculate_sales_comparison(&sample_request());

        let mut req = sample_request();
        req.comparables.push(comp(
            "300 Elm Dr",
            dec!(3000000),
            dec!(20000),
            Decimal::ZERO,
            recent(),
        ));
        let three_comps = calculate_sales_comparison(&req);

        assert!(two_comps.result.confidence < three_comps.result.confidence);
    }

    #[test]
    fn test_low_tagged_comparable_reduces_confidence() {
        let baseline = calculate_sales_comparison(&sample_request());

        let mut req = sample_request();
        req.comparables[1].confidence = ConfidenceTag::Low;
        let tagged = calculate_sales_comparison(&req);

        assert!(tagged.result.confidence < baseline.result.confidence);
        assert!(tagged
            .result
            .rationale
            .iter()
            .any(|r| r.contains("low confidence")));
    }

    #[test]
    fn test_confidence_bounded() {
        let mut req = sample_request();
        let old = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        for c in &mut req.comparables {
            c.sale_date = old;
            c.location_adjustment = c.sale_price; // 100% adjustment
        }
        let out = calculate_sales_comparison(&req);

        assert!(out.result.confidence > Decimal::ZERO);
        assert!(out.result.confidence <= Decimal::ONE);
    }

    #[test]
    fn test_failing_strategy_becomes_error_string() {
        let req = sample_request();
        let out = calculate_sales_comparison_with(&req, &FailingConfidence);

        assert_eq!(out.result.errors.len(), 1);
        assert!(out.result.errors[0].starts_with("Sales comparison calculation failed:"));
        assert_eq!(out.result.indicated_value, Decimal::ZERO);
    }

    #[test]
    fn test_idempotent_for_fixed_as_of() {
        let req = sample_request();
        let a = calculate_sales_comparison(&req);
        let b = calculate_sales_comparison(&req);

        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_workfile_id_shape() {
        let out = calculate_sales_comparison(&sample_request());
        assert_eq!(out.result.workfile_id, "SC-parcel-001-20250601");
    }
}
