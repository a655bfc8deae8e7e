use crate::geo::{attach_coordinates, cap_by_avg_debt, PlaceMatch};
use crate::registry::Registries;
use crate::types::{
    CityRankingRow, CityTier, GeoSummaryRow, HierarchyRow, HouseholdRecord, RankCategory,
    RegionSummaryRow, Settlement, SettlementSummaryRow, SummaryStats, TierDebtPoint,
    TierSpreadRow,
};
use crate::util::quantile;
use crate::weighted::{
    group_weighted_stats, ratio, weighted_mean, weighted_sum_tree, GroupKey, GroupStats,
    ValueField, WeightedSums,
};
use std::cmp::Ordering;

/// Every table handed to the chart layer for one dataset.
#[derive(Debug, Clone)]
pub struct ReportSet {
    pub summary: SummaryStats,
    pub urban_rural: Vec<SettlementSummaryRow>,
    pub regions: Vec<RegionSummaryRow>,
    pub province_geo: Vec<GeoSummaryRow>,
    pub tier_distribution: Vec<TierDebtPoint>,
    pub tier_spread: Vec<TierSpreadRow>,
    /// `None` when there are too few cities to rank.
    pub city_ranking: Option<Vec<CityRankingRow>>,
    pub city_geo: Vec<GeoSummaryRow>,
    pub hierarchy: Vec<HierarchyRow>,
}

pub fn generate_all(
    data: &[HouseholdRecord],
    registries: &Registries,
    ranking_size: usize,
    geo_city_cap: usize,
) -> ReportSet {
    ReportSet {
        summary: generate_summary(data),
        urban_rural: generate_urban_rural(data),
        regions: generate_regions(data),
        province_geo: generate_province_geo(data, registries),
        tier_distribution: generate_tier_distribution(data),
        tier_spread: generate_tier_spread(data),
        city_ranking: generate_city_ranking(data, ranking_size),
        city_geo: generate_city_geo(data, registries, geo_city_cap),
        hierarchy: generate_hierarchy(data),
    }
}

pub fn generate_summary(data: &[HouseholdRecord]) -> SummaryStats {
    let sums = WeightedSums::from_records(data);
    let indebted_weight: f64 = data
        .iter()
        .filter(|r| r.total_debt > 0.0)
        .map(|r| r.sample_weight)
        .sum();
    let owners: Vec<(f64, f64)> = data
        .iter()
        .filter_map(|r| r.house_count.map(|n| (n, r.sample_weight)))
        .collect();
    SummaryStats {
        households: sums.households,
        total_weight: sums.weight,
        avg_debt: sums.mean(ValueField::Debt),
        avg_income: sums.mean(ValueField::Income),
        avg_asset: sums.mean(ValueField::Asset),
        debt_income_ratio: sums.debt_income_ratio(),
        indebted_share: ratio(indebted_weight, sums.weight),
        avg_houses_owned: weighted_mean(&owners, |(n, _)| *n, |(_, w)| *w),
    }
}

fn find_group<'a>(groups: &'a [GroupStats], keys: &[&str]) -> Option<&'a GroupStats> {
    groups
        .iter()
        .find(|g| g.keys.iter().map(String::as_str).eq(keys.iter().copied()))
}

/// Urban first, then rural; a side with no households is omitted.
pub fn generate_urban_rural(data: &[HouseholdRecord]) -> Vec<SettlementSummaryRow> {
    let groups = group_weighted_stats(data, &[GroupKey::Settlement]);
    [Settlement::Urban, Settlement::Rural]
        .iter()
        .filter_map(|s| find_group(&groups, &[s.label()]))
        .map(|g| SettlementSummaryRow {
            group: g.keys[0].clone(),
            households: g.sums.households,
            avg_debt: g.mean(ValueField::Debt),
            avg_income: g.mean(ValueField::Income),
            debt_income_ratio: g.debt_income_ratio(),
        })
        .collect()
}

/// Region averages with the urban/rural split stacked alongside.
pub fn generate_regions(data: &[HouseholdRecord]) -> Vec<RegionSummaryRow> {
    let by_region = group_weighted_stats(data, &[GroupKey::Region]);
    let split = group_weighted_stats(data, &[GroupKey::Region, GroupKey::Settlement]);
    by_region
        .iter()
        .map(|g| {
            let region = g.keys[0].as_str();
            let side = |s: Settlement| {
                find_group(&split, &[region, s.label()]).and_then(|g| g.mean(ValueField::Debt))
            };
            RegionSummaryRow {
                region: region.to_string(),
                households: g.sums.households,
                avg_debt: g.mean(ValueField::Debt),
                avg_income: g.mean(ValueField::Income),
                debt_income_ratio: g.debt_income_ratio(),
                urban_avg_debt: side(Settlement::Urban),
                rural_avg_debt: side(Settlement::Rural),
            }
        })
        .collect()
}

pub fn generate_province_geo(data: &[HouseholdRecord], registries: &Registries) -> Vec<GeoSummaryRow> {
    let groups = group_weighted_stats(data, &[GroupKey::Province]);
    attach_coordinates(&groups, &registries.provinces, PlaceMatch::Contains)
}

pub fn generate_city_geo(
    data: &[HouseholdRecord],
    registries: &Registries,
    cap: usize,
) -> Vec<GeoSummaryRow> {
    let groups = group_weighted_stats(data, &[GroupKey::City]);
    let rows = attach_coordinates(&groups, &registries.cities, PlaceMatch::Exact);
    cap_by_avg_debt(rows, cap)
}

fn ranked_tier(r: &HouseholdRecord) -> Option<CityTier> {
    r.tier.filter(|t| CityTier::RANKED.contains(t))
}

/// Raw per-household points for the distribution chart: indebted households
/// in tiers 1, 2, and 3-and-below, grouped in tier order.
pub fn generate_tier_distribution(data: &[HouseholdRecord]) -> Vec<TierDebtPoint> {
    CityTier::RANKED
        .iter()
        .flat_map(|tier| {
            data.iter()
                .filter(move |r| ranked_tier(r) == Some(*tier) && r.total_debt > 0.0)
                .map(move |r| TierDebtPoint {
                    tier: tier.label().to_string(),
                    total_debt: r.total_debt,
                })
        })
        .collect()
}

pub fn generate_tier_spread(data: &[HouseholdRecord]) -> Vec<TierSpreadRow> {
    CityTier::RANKED
        .iter()
        .map(|tier| {
            let mut debts: Vec<f64> = data
                .iter()
                .filter(|r| ranked_tier(r) == Some(*tier) && r.total_debt > 0.0)
                .map(|r| r.total_debt)
                .collect();
            debts.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
            TierSpreadRow {
                tier: tier.label().to_string(),
                households: debts.len(),
                q1: quantile(&debts, 0.25),
                median: quantile(&debts, 0.5),
                q3: quantile(&debts, 0.75),
            }
        })
        .collect()
}

/// Top-k and bottom-k cities by weighted average debt around the national
/// reference. Needs at least 2k distinct cities, otherwise `None`.
pub fn generate_city_ranking(data: &[HouseholdRecord], k: usize) -> Option<Vec<CityRankingRow>> {
    let mut cities: Vec<(String, f64)> = group_weighted_stats(data, &[GroupKey::City])
        .into_iter()
        .filter_map(|g| {
            let avg = g.mean(ValueField::Debt)?;
            Some((g.keys.into_iter().next()?, avg))
        })
        .collect();
    if k == 0 || cities.len() < 2 * k {
        log::info!(
            "city ranking unavailable: {} cities resolved, {} needed",
            cities.len(),
            2 * k
        );
        return None;
    }
    cities.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    let located = data.iter().filter(|r| r.canonical_city.is_some());
    let national = WeightedSums::from_records(located).mean(ValueField::Debt)?;

    let mut rows: Vec<CityRankingRow> = Vec::with_capacity(2 * k + 1);
    for (idx, (city, avg)) in cities.iter().take(k).enumerate() {
        rows.push(CityRankingRow {
            rank_label: format!("Top{}", idx + 1),
            city: Some(city.clone()),
            avg_debt: *avg,
            category: RankCategory::Top,
        });
    }
    rows.push(CityRankingRow {
        rank_label: "National Avg".to_string(),
        city: None,
        avg_debt: national,
        category: RankCategory::Average,
    });
    for (idx, (city, avg)) in cities.iter().rev().take(k).enumerate() {
        rows.push(CityRankingRow {
            rank_label: format!("Last{}", idx + 1),
            city: Some(city.clone()),
            avg_debt: *avg,
            category: RankCategory::Bottom,
        });
    }
    Some(rows)
}

/// Weighted debt summed over urban/rural > region > province > tier.
pub fn generate_hierarchy(data: &[HouseholdRecord]) -> Vec<HierarchyRow> {
    let levels = [
        GroupKey::Settlement,
        GroupKey::Region,
        GroupKey::Province,
        GroupKey::Tier,
    ];
    weighted_sum_tree(data, &levels, ValueField::Debt)
        .into_iter()
        .map(|node| HierarchyRow {
            settlement: node.path[0].clone(),
            region: node.path.get(1).cloned(),
            province: node.path.get(2).cloned(),
            tier: node.path.get(3).cloned(),
            depth: node.path.len(),
            weighted_debt: node.value,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn household(id: &str, settlement: Settlement, weight: f64, debt: f64, income: f64) -> HouseholdRecord {
        HouseholdRecord {
            household_id: id.to_string(),
            settlement: Some(settlement),
            total_debt: debt,
            total_income: income,
            total_asset: 0.0,
            sample_weight: weight,
            house_count: None,
            raw_city_code: None,
            raw_province: None,
            canonical_city: None,
            canonical_province: None,
            tier: None,
            region: None,
        }
    }

    fn in_city(mut r: HouseholdRecord, city: &str) -> HouseholdRecord {
        r.canonical_city = Some(city.to_string());
        r
    }

    #[test]
    fn two_household_scenario() {
        let data = vec![
            household("u", Settlement::Urban, 2.0, 100.0, 50.0),
            household("r", Settlement::Rural, 1.0, 10.0, 20.0),
        ];
        let rows = generate_urban_rural(&data);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].group, "Urban");
        assert_eq!(rows[0].avg_debt, Some(100.0));
        assert_eq!(rows[0].debt_income_ratio, Some(2.0));
        assert_eq!(rows[1].group, "Rural");
        assert_eq!(rows[1].avg_debt, Some(10.0));

        let summary = generate_summary(&data);
        assert!((summary.avg_debt.unwrap() - 70.0).abs() < 1e-9);
        assert_eq!(summary.total_weight, 3.0);
        assert_eq!(summary.indebted_share, Some(1.0));
        assert_eq!(summary.avg_houses_owned, None);
    }

    #[test]
    fn regions_stack_urban_and_rural() {
        let mut data = vec![
            household("a", Settlement::Urban, 1.0, 40.0, 10.0),
            household("b", Settlement::Rural, 3.0, 20.0, 10.0),
            household("c", Settlement::Urban, 1.0, 5.0, 10.0),
        ];
        data[0].region = Some("East".to_string());
        data[1].region = Some("East".to_string());
        data[2].region = Some("West".to_string());
        let rows = generate_regions(&data);
        assert_eq!(rows.len(), 2);
        let east = &rows[0];
        assert_eq!(east.region, "East");
        assert_eq!(east.avg_debt, Some(25.0));
        assert_eq!(east.debt_income_ratio, Some(2.5));
        assert_eq!(east.urban_avg_debt, Some(40.0));
        assert_eq!(east.rural_avg_debt, Some(20.0));
        assert_eq!(rows[1].rural_avg_debt, None);
    }

    #[test]
    fn ranking_needs_twice_k_cities() {
        let data: Vec<HouseholdRecord> = (0..9)
            .map(|i| in_city(household(&i.to_string(), Settlement::Urban, 1.0, i as f64, 1.0), &format!("City{i}")))
            .collect();
        assert_eq!(generate_city_ranking(&data, 5), None);
    }

    #[test]
    fn ranking_orders_extremes_around_national_average() {
        let mut data: Vec<HouseholdRecord> = (0..12)
            .map(|i| {
                in_city(
                    household(&i.to_string(), Settlement::Urban, 1.0, (i * 10) as f64, 1.0),
                    &format!("City{i:02}"),
                )
            })
            .collect();
        // A household without a resolved city does not count toward the band.
        data.push(household("x", Settlement::Rural, 5.0, 9999.0, 1.0));

        let rows = generate_city_ranking(&data, 5).unwrap();
        assert_eq!(rows.len(), 11);
        assert_eq!(rows[0].rank_label, "Top1");
        assert_eq!(rows[0].city.as_deref(), Some("City11"));
        assert_eq!(rows[5].category, RankCategory::Average);
        assert_eq!(rows[5].avg_debt, 55.0);
        assert_eq!(rows[6].rank_label, "Last1");
        assert_eq!(rows[6].city.as_deref(), Some("City00"));
        assert_eq!(rows[10].city.as_deref(), Some("City04"));
    }

    #[test]
    fn geo_outputs_keep_only_plottable_places() {
        let data = vec![
            in_city(household("a", Settlement::Urban, 1.0, 10.0, 5.0), "Beijing"),
            in_city(household("b", Settlement::Urban, 1.0, 30.0, 5.0), "Jiangmen"),
        ];
        let geo = generate_city_geo(&data, Registries::builtin(), 80);
        assert_eq!(geo.len(), 1);
        assert_eq!(geo[0].place, "Beijing");

        let grouped = group_weighted_stats(&data, &[GroupKey::City]);
        assert_eq!(grouped.len(), 2);
    }

    #[test]
    fn tier_views_skip_other_unknown_and_debt_free() {
        let mut data = vec![
            household("a", Settlement::Urban, 1.0, 10.0, 5.0),
            household("b", Settlement::Urban, 1.0, 0.0, 5.0),
            household("c", Settlement::Urban, 1.0, 30.0, 5.0),
            household("d", Settlement::Urban, 1.0, 50.0, 5.0),
            household("e", Settlement::Urban, 1.0, 20.0, 5.0),
        ];
        data[0].tier = Some(CityTier::Tier2);
        data[1].tier = Some(CityTier::Tier1);
        data[2].tier = Some(CityTier::Other);
        data[4].tier = Some(CityTier::Tier1);

        let points = generate_tier_distribution(&data);
        assert_eq!(
            points,
            vec![
                TierDebtPoint { tier: "Tier 1 / New Tier 1".to_string(), total_debt: 20.0 },
                TierDebtPoint { tier: "Tier 2".to_string(), total_debt: 10.0 },
            ]
        );

        let spread = generate_tier_spread(&data);
        assert_eq!(spread.len(), 3);
        assert_eq!(spread[0].households, 1);
        assert_eq!(spread[0].median, Some(20.0));
        assert_eq!(spread[2].households, 0);
        assert_eq!(spread[2].median, None);
    }

    #[test]
    fn hierarchy_paths_fill_unknown_and_sum_upward() {
        let mut data = vec![
            household("a", Settlement::Urban, 2.0, 10.0, 5.0),
            household("b", Settlement::Urban, 1.0, 4.0, 5.0),
        ];
        data[0].region = Some("East".to_string());
        data[0].canonical_province = Some("Zhejiang".to_string());
        data[0].tier = Some(CityTier::Tier2);

        let rows = generate_hierarchy(&data);
        let root = rows.iter().find(|r| r.depth == 1).unwrap();
        assert_eq!(root.settlement, "Urban");
        assert_eq!(root.weighted_debt, 24.0);

        let leaf = rows
            .iter()
            .find(|r| r.depth == 4 && r.province.as_deref() == Some("Zhejiang"))
            .unwrap();
        assert_eq!(leaf.tier.as_deref(), Some("Tier 2"));
        assert_eq!(leaf.weighted_debt, 20.0);

        let unknown_leaf = rows
            .iter()
            .find(|r| r.depth == 4 && r.region.as_deref() == Some("Unknown"))
            .unwrap();
        assert_eq!(unknown_leaf.tier.as_deref(), Some("Unknown"));
        assert_eq!(unknown_leaf.weighted_debt, 4.0);
    }
}
