use crate::definitions::Real;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use time::Date;

use super::days_between;

/// Time buckets for liquidity cash-flow aggregation.
///
/// Boundaries are a contract, not configuration: a cash flow `d` days after
/// the reference date lands in the first bucket whose upper bound is `>= d`
/// (boundaries belong to the lower bucket). Non-positive day differences map
/// to `Overnight`, so the mapping is total over all date pairs.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub enum LiquidityBucket {
    #[serde(rename = "overnight")]
    Overnight,
    #[serde(rename = "2-7d")]
    Days2To7,
    #[serde(rename = "8-14d")]
    Days8To14,
    #[serde(rename = "15-30d")]
    Days15To30,
    #[serde(rename = "30-90d")]
    Days30To90,
    #[serde(rename = "90-180d")]
    Days90To180,
    #[serde(rename = "180-365d")]
    Days180To365,
    #[serde(rename = "1-2y")]
    Years1To2,
    #[serde(rename = "2y+")]
    Over2Years,
}

impl LiquidityBucket {
    /// Canonical aggregation order.
    pub const ALL: [LiquidityBucket; 9] = [
        LiquidityBucket::Overnight,
        LiquidityBucket::Days2To7,
        LiquidityBucket::Days8To14,
        LiquidityBucket::Days15To30,
        LiquidityBucket::Days30To90,
        LiquidityBucket::Days90To180,
        LiquidityBucket::Days180To365,
        LiquidityBucket::Years1To2,
        LiquidityBucket::Over2Years,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LiquidityBucket::Overnight => "overnight",
            LiquidityBucket::Days2To7 => "2-7d",
            LiquidityBucket::Days8To14 => "8-14d",
            LiquidityBucket::Days15To30 => "15-30d",
            LiquidityBucket::Days30To90 => "30-90d",
            LiquidityBucket::Days90To180 => "90-180d",
            LiquidityBucket::Days180To365 => "180-365d",
            LiquidityBucket::Years1To2 => "1-2y",
            LiquidityBucket::Over2Years => "2y+",
        }
    }

    /// Total mapping from a day difference to a bucket.
    pub fn from_days(days: i64) -> LiquidityBucket {
        if days <= 1 {
            LiquidityBucket::Overnight
        } else if days <= 7 {
            LiquidityBucket::Days2To7
        } else if days <= 14 {
            LiquidityBucket::Days8To14
        } else if days <= 30 {
            LiquidityBucket::Days15To30
        } else if days <= 90 {
            LiquidityBucket::Days30To90
        } else if days <= 180 {
            LiquidityBucket::Days90To180
        } else if days <= 365 {
            LiquidityBucket::Days180To365
        } else if days <= 730 {
            LiquidityBucket::Years1To2
        } else {
            LiquidityBucket::Over2Years
        }
    }

    /// Bucket of a `(base, target)` date pair.
    pub fn assign(base: Date, target: Date) -> LiquidityBucket {
        LiquidityBucket::from_days(days_between(base, target))
    }

    /// Midpoint day used to back-allocate bucketed run-off amounts to dates.
    pub fn midpoint_days(&self) -> i64 {
        match self {
            LiquidityBucket::Overnight => 1,
            LiquidityBucket::Days2To7 => 4,
            LiquidityBucket::Days8To14 => 11,
            LiquidityBucket::Days15To30 => 22,
            LiquidityBucket::Days30To90 => 60,
            LiquidityBucket::Days90To180 => 135,
            LiquidityBucket::Days180To365 => 270,
            LiquidityBucket::Years1To2 => 548,
            LiquidityBucket::Over2Years => 1095,
        }
    }

    /// Upper-bound day count reported as the survival horizon when the
    /// cumulative gap first turns negative in this bucket.
    pub fn horizon_days(&self) -> i64 {
        match self {
            LiquidityBucket::Overnight => 1,
            LiquidityBucket::Days2To7 => 7,
            LiquidityBucket::Days8To14 => 14,
            LiquidityBucket::Days15To30 => 30,
            LiquidityBucket::Days30To90 => 90,
            LiquidityBucket::Days90To180 => 180,
            LiquidityBucket::Days180To365 => 365,
            LiquidityBucket::Years1To2 => 730,
            LiquidityBucket::Over2Years => 1095,
        }
    }
}

impl std::fmt::Display for LiquidityBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LiquidityBucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LiquidityBucket::ALL
            .iter()
            .find(|b| b.as_str() == s)
            .copied()
            .ok_or_else(|| format!("Invalid liquidity bucket: {}", s))
    }
}

/// Time buckets for interest-rate repricing aggregation.
///
/// `from_days` returns `None` for negative day differences: a repricing date
/// in the past is discarded from the IRR ladder rather than binned.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub enum RepricingBucket {
    #[serde(rename = "0-1m")]
    Months0To1,
    #[serde(rename = "1-3m")]
    Months1To3,
    #[serde(rename = "3-6m")]
    Months3To6,
    #[serde(rename = "6-12m")]
    Months6To12,
    #[serde(rename = "1-2y")]
    Years1To2,
    #[serde(rename = "2-3y")]
    Years2To3,
    #[serde(rename = "3-5y")]
    Years3To5,
    #[serde(rename = "5-7y")]
    Years5To7,
    #[serde(rename = "7-10y")]
    Years7To10,
    #[serde(rename = "10y+")]
    Over10Years,
}

impl RepricingBucket {
    /// Canonical aggregation order.
    pub const ALL: [RepricingBucket; 10] = [
        RepricingBucket::Months0To1,
        RepricingBucket::Months1To3,
        RepricingBucket::Months3To6,
        RepricingBucket::Months6To12,
        RepricingBucket::Years1To2,
        RepricingBucket::Years2To3,
        RepricingBucket::Years3To5,
        RepricingBucket::Years5To7,
        RepricingBucket::Years7To10,
        RepricingBucket::Over10Years,
    ];

    /// Buckets contributing to the one-year NII sensitivity.
    pub const WITHIN_1Y: [RepricingBucket; 4] = [
        RepricingBucket::Months0To1,
        RepricingBucket::Months1To3,
        RepricingBucket::Months3To6,
        RepricingBucket::Months6To12,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RepricingBucket::Months0To1 => "0-1m",
            RepricingBucket::Months1To3 => "1-3m",
            RepricingBucket::Months3To6 => "3-6m",
            RepricingBucket::Months6To12 => "6-12m",
            RepricingBucket::Years1To2 => "1-2y",
            RepricingBucket::Years2To3 => "2-3y",
            RepricingBucket::Years3To5 => "3-5y",
            RepricingBucket::Years5To7 => "5-7y",
            RepricingBucket::Years7To10 => "7-10y",
            RepricingBucket::Over10Years => "10y+",
        }
    }

    pub fn from_days(days: i64) -> Option<RepricingBucket> {
        if days < 0 {
            return None;
        }
        let bucket = if days <= 30 {
            RepricingBucket::Months0To1
        } else if days <= 90 {
            RepricingBucket::Months1To3
        } else if days <= 180 {
            RepricingBucket::Months3To6
        } else if days <= 365 {
            RepricingBucket::Months6To12
        } else if days <= 730 {
            RepricingBucket::Years1To2
        } else if days <= 1095 {
            RepricingBucket::Years2To3
        } else if days <= 1825 {
            RepricingBucket::Years3To5
        } else if days <= 2555 {
            RepricingBucket::Years5To7
        } else if days <= 3650 {
            RepricingBucket::Years7To10
        } else {
            RepricingBucket::Over10Years
        };
        Some(bucket)
    }

    pub fn assign(base: Date, repricing: Date) -> Option<RepricingBucket> {
        RepricingBucket::from_days(days_between(base, repricing))
    }

    /// Fixed midpoint duration (in years) used by the EVE impact model.
    pub fn duration_midpoint_years(&self) -> Real {
        match self {
            RepricingBucket::Months0To1 => 0.5 / 12.0,
            RepricingBucket::Months1To3 => 2.0 / 12.0,
            RepricingBucket::Months3To6 => 4.5 / 12.0,
            RepricingBucket::Months6To12 => 9.0 / 12.0,
            RepricingBucket::Years1To2 => 1.5,
            RepricingBucket::Years2To3 => 2.5,
            RepricingBucket::Years3To5 => 4.0,
            RepricingBucket::Years5To7 => 6.0,
            RepricingBucket::Years7To10 => 8.5,
            RepricingBucket::Over10Years => 12.0,
        }
    }
}

impl std::fmt::Display for RepricingBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn test_liquidity_bucket_boundaries() {
        let cases = [
            (-5, LiquidityBucket::Overnight),
            (0, LiquidityBucket::Overnight),
            (1, LiquidityBucket::Overnight),
            (2, LiquidityBucket::Days2To7),
            (7, LiquidityBucket::Days2To7),
            (8, LiquidityBucket::Days8To14),
            (14, LiquidityBucket::Days8To14),
            (15, LiquidityBucket::Days15To30),
            (30, LiquidityBucket::Days15To30),
            (90, LiquidityBucket::Days30To90),
            (180, LiquidityBucket::Days90To180),
            (365, LiquidityBucket::Days180To365),
            (730, LiquidityBucket::Years1To2),
            (731, LiquidityBucket::Over2Years),
            (10_000, LiquidityBucket::Over2Years),
        ];
        for (days, expected) in cases {
            assert_eq!(LiquidityBucket::from_days(days), expected, "days = {}", days);
        }
    }

    #[test]
    fn test_repricing_bucket_boundaries() {
        assert_eq!(RepricingBucket::from_days(-1), None);
        let cases = [
            (0, RepricingBucket::Months0To1),
            (30, RepricingBucket::Months0To1),
            (31, RepricingBucket::Months1To3),
            (90, RepricingBucket::Months1To3),
            (180, RepricingBucket::Months3To6),
            (365, RepricingBucket::Months6To12),
            (730, RepricingBucket::Years1To2),
            (1095, RepricingBucket::Years2To3),
            (1825, RepricingBucket::Years3To5),
            (2555, RepricingBucket::Years5To7),
            (3650, RepricingBucket::Years7To10),
            (3651, RepricingBucket::Over10Years),
        ];
        for (days, expected) in cases {
            assert_eq!(
                RepricingBucket::from_days(days),
                Some(expected),
                "days = {}",
                days
            );
        }
    }

    #[test]
    fn test_assign_uses_whole_day_difference() {
        let base = date!(2025 - 01 - 15);
        assert_eq!(
            LiquidityBucket::assign(base, date!(2025 - 02 - 10)),
            LiquidityBucket::Days15To30
        );
        assert_eq!(
            RepricingBucket::assign(base, date!(2026 - 01 - 15)),
            Some(RepricingBucket::Months6To12)
        );
        assert_eq!(RepricingBucket::assign(base, date!(2025 - 01 - 14)), None);
    }

    #[test]
    fn test_bucket_serde_names() {
        let bucket = LiquidityBucket::Days2To7;
        assert_eq!(serde_json::to_string(&bucket).unwrap(), "\"2-7d\"");
        let parsed: LiquidityBucket = serde_json::from_str("\"180-365d\"").unwrap();
        assert_eq!(parsed, LiquidityBucket::Days180To365);
        assert_eq!(
            serde_json::to_string(&RepricingBucket::Over10Years).unwrap(),
            "\"10y+\""
        );
    }
}
