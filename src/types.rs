use crate::util::{display_amount, display_blank, display_optional};
use serde::{Deserialize, Serialize};
use std::fmt;
use tabled::Tabled;

/// The master-table columns the pipeline reads; everything else in the
/// export is skipped by the deserializer.
#[derive(Debug, Deserialize)]
pub struct RawMasterRow {
    #[serde(rename = "hhid")]
    pub household_id: Option<String>,
    #[serde(rename = "rural")]
    pub rural: Option<String>,
    #[serde(rename = "total_debt")]
    pub total_debt: Option<String>,
    #[serde(rename = "total_asset")]
    pub total_asset: Option<String>,
    #[serde(rename = "weight_hh")]
    pub sample_weight: Option<String>,
    #[serde(rename = "total_income")]
    pub total_income: Option<String>,
    #[serde(rename = "city_lab")]
    pub city_code: Option<String>,
    #[serde(rename = "city_level")]
    pub city_level: Option<String>,
    #[serde(rename = "region")]
    pub region: Option<String>,
    #[serde(rename = "prov")]
    pub province: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawLinkedRow {
    #[serde(rename = "hhid")]
    pub household_id: Option<String>,
    #[serde(rename = "house01num")]
    pub house_count: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Settlement {
    Urban,
    Rural,
}

impl Settlement {
    pub fn label(self) -> &'static str {
        match self {
            Settlement::Urban => "Urban",
            Settlement::Rural => "Rural",
        }
    }
}

impl fmt::Display for Settlement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Coarse city classification. A missing tier field is `None` on the
/// record and shows up as "Unknown".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum CityTier {
    Tier1,
    Tier2,
    Tier3AndBelow,
    Other,
}

impl CityTier {
    pub fn label(self) -> &'static str {
        match self {
            CityTier::Tier1 => "Tier 1 / New Tier 1",
            CityTier::Tier2 => "Tier 2",
            CityTier::Tier3AndBelow => "Tier 3 & Below",
            CityTier::Other => "Other",
        }
    }

    /// Tiers that make up the distribution view, in display order.
    pub const RANKED: [CityTier; 3] = [CityTier::Tier1, CityTier::Tier2, CityTier::Tier3AndBelow];
}

impl fmt::Display for CityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One surveyed household after cleaning. Immutable from here on.
#[derive(Debug, Clone, PartialEq)]
pub struct HouseholdRecord {
    pub household_id: String,
    /// `None` when the rural flag was neither 0 nor 1.
    pub settlement: Option<Settlement>,
    pub total_debt: f64,
    pub total_income: f64,
    pub total_asset: f64,
    /// Always > 0 once loaded.
    pub sample_weight: f64,
    /// Supplementary field from the linked table.
    pub house_count: Option<f64>,
    pub raw_city_code: Option<String>,
    pub raw_province: Option<String>,
    pub canonical_city: Option<String>,
    pub canonical_province: Option<String>,
    pub tier: Option<CityTier>,
    pub region: Option<String>,
}

impl HouseholdRecord {
    pub fn is_rural(&self) -> Option<bool> {
        self.settlement.map(|s| s == Settlement::Rural)
    }
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct SettlementSummaryRow {
    #[serde(rename = "Group")]
    #[tabled(rename = "Group")]
    pub group: String,
    #[serde(rename = "Households")]
    #[tabled(rename = "Households")]
    pub households: usize,
    #[serde(rename = "AvgDebt")]
    #[tabled(rename = "AvgDebt", display_with = "display_optional")]
    pub avg_debt: Option<f64>,
    #[serde(rename = "AvgIncome")]
    #[tabled(rename = "AvgIncome", display_with = "display_optional")]
    pub avg_income: Option<f64>,
    #[serde(rename = "DebtIncomeRatio")]
    #[tabled(rename = "DebtIncomeRatio", display_with = "display_optional")]
    pub debt_income_ratio: Option<f64>,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct RegionSummaryRow {
    #[serde(rename = "Region")]
    #[tabled(rename = "Region")]
    pub region: String,
    #[serde(rename = "Households")]
    #[tabled(rename = "Households")]
    pub households: usize,
    #[serde(rename = "AvgDebt")]
    #[tabled(rename = "AvgDebt", display_with = "display_optional")]
    pub avg_debt: Option<f64>,
    #[serde(rename = "AvgIncome")]
    #[tabled(rename = "AvgIncome", display_with = "display_optional")]
    pub avg_income: Option<f64>,
    #[serde(rename = "DebtIncomeRatio")]
    #[tabled(rename = "DebtIncomeRatio", display_with = "display_optional")]
    pub debt_income_ratio: Option<f64>,
    #[serde(rename = "UrbanAvgDebt")]
    #[tabled(rename = "UrbanAvgDebt", display_with = "display_optional")]
    pub urban_avg_debt: Option<f64>,
    #[serde(rename = "RuralAvgDebt")]
    #[tabled(rename = "RuralAvgDebt", display_with = "display_optional")]
    pub rural_avg_debt: Option<f64>,
}

/// A province or city row with map coordinates attached.
#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct GeoSummaryRow {
    #[serde(rename = "Place")]
    #[tabled(rename = "Place")]
    pub place: String,
    #[serde(rename = "AvgDebt")]
    #[tabled(rename = "AvgDebt", display_with = "display_amount")]
    pub avg_debt: f64,
    #[serde(rename = "DebtIncomeRatio")]
    #[tabled(rename = "DebtIncomeRatio", display_with = "display_optional")]
    pub debt_income_ratio: Option<f64>,
    #[serde(rename = "Longitude")]
    #[tabled(rename = "Longitude")]
    pub longitude: f64,
    #[serde(rename = "Latitude")]
    #[tabled(rename = "Latitude")]
    pub latitude: f64,
}

/// One household's debt for the per-tier distribution.
#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct TierDebtPoint {
    #[serde(rename = "Tier")]
    #[tabled(rename = "Tier")]
    pub tier: String,
    #[serde(rename = "TotalDebt")]
    #[tabled(rename = "TotalDebt", display_with = "display_amount")]
    pub total_debt: f64,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct TierSpreadRow {
    #[serde(rename = "Tier")]
    #[tabled(rename = "Tier")]
    pub tier: String,
    #[serde(rename = "Households")]
    #[tabled(rename = "Households")]
    pub households: usize,
    #[serde(rename = "Q1")]
    #[tabled(rename = "Q1", display_with = "display_optional")]
    pub q1: Option<f64>,
    #[serde(rename = "Median")]
    #[tabled(rename = "Median", display_with = "display_optional")]
    pub median: Option<f64>,
    #[serde(rename = "Q3")]
    #[tabled(rename = "Q3", display_with = "display_optional")]
    pub q3: Option<f64>,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RankCategory {
    Top,
    Average,
    Bottom,
}

impl fmt::Display for RankCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankCategory::Top => write!(f, "top"),
            RankCategory::Average => write!(f, "average"),
            RankCategory::Bottom => write!(f, "bottom"),
        }
    }
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct CityRankingRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank_label: String,
    #[serde(rename = "City")]
    #[tabled(rename = "City", display_with = "display_blank")]
    pub city: Option<String>,
    #[serde(rename = "AvgDebt")]
    #[tabled(rename = "AvgDebt", display_with = "display_amount")]
    pub avg_debt: f64,
    #[serde(rename = "Category")]
    #[tabled(rename = "Category")]
    pub category: RankCategory,
}

/// One node of the urban/rural > region > province > tier tree. Deeper
/// columns are empty on ancestor rows.
#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct HierarchyRow {
    #[serde(rename = "UrbanRural")]
    #[tabled(rename = "UrbanRural")]
    pub settlement: String,
    #[serde(rename = "Region")]
    #[tabled(rename = "Region", display_with = "display_blank")]
    pub region: Option<String>,
    #[serde(rename = "Province")]
    #[tabled(rename = "Province", display_with = "display_blank")]
    pub province: Option<String>,
    #[serde(rename = "Tier")]
    #[tabled(rename = "Tier", display_with = "display_blank")]
    pub tier: Option<String>,
    #[serde(rename = "Depth")]
    #[tabled(rename = "Depth")]
    pub depth: usize,
    #[serde(rename = "WeightedDebt")]
    #[tabled(rename = "WeightedDebt", display_with = "display_amount")]
    pub weighted_debt: f64,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SummaryStats {
    pub households: usize,
    pub total_weight: f64,
    pub avg_debt: Option<f64>,
    pub avg_income: Option<f64>,
    pub avg_asset: Option<f64>,
    pub debt_income_ratio: Option<f64>,
    pub indebted_share: Option<f64>,
    pub avg_houses_owned: Option<f64>,
}
