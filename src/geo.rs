// Attach map coordinates to aggregated place rows.
use crate::registry::{Coordinate, CoordinateRegistry};
use crate::types::GeoSummaryRow;
use crate::weighted::{GroupStats, ValueField};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceMatch {
    /// Canonical name must equal a registry key.
    Exact,
    /// First registry key contained in the row's name wins.
    Contains,
}

pub fn find_coordinate(
    name: &str,
    registry: &CoordinateRegistry,
    mode: PlaceMatch,
) -> Option<Coordinate> {
    match mode {
        PlaceMatch::Exact => registry.get(name),
        PlaceMatch::Contains => registry
            .iter()
            .find(|(key, _)| name.contains(key))
            .map(|(_, coord)| coord),
    }
}

/// Geo rows for single-key groups. Rows without a coordinate (or without a
/// defined average) are dropped here and only here.
pub fn attach_coordinates(
    groups: &[GroupStats],
    registry: &CoordinateRegistry,
    mode: PlaceMatch,
) -> Vec<GeoSummaryRow> {
    let mut dropped = 0usize;
    let rows: Vec<GeoSummaryRow> = groups
        .iter()
        .filter_map(|g| {
            let place = g.keys.first()?;
            let joined = find_coordinate(place, registry, mode)
                .zip(g.mean(ValueField::Debt))
                .map(|(coord, avg_debt)| GeoSummaryRow {
                    place: place.clone(),
                    avg_debt,
                    debt_income_ratio: g.debt_income_ratio(),
                    longitude: coord.longitude,
                    latitude: coord.latitude,
                });
            if joined.is_none() {
                dropped += 1;
            }
            joined
        })
        .collect();
    if dropped > 0 {
        log::debug!("geo-join dropped {dropped} places without coordinates");
    }
    rows
}

/// Keep the `cap` rows with the highest average debt, highest first.
pub fn cap_by_avg_debt(mut rows: Vec<GeoSummaryRow>, cap: usize) -> Vec<GeoSummaryRow> {
    rows.sort_by(|a, b| {
        b.avg_debt
            .partial_cmp(&a.avg_debt)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.place.cmp(&b.place))
    });
    rows.truncate(cap);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weighted::WeightedSums;

    fn group(place: &str, weight: f64, debt: f64, income: f64) -> GroupStats {
        GroupStats {
            keys: vec![place.to_string()],
            sums: WeightedSums {
                households: 1,
                weight,
                debt: debt * weight,
                income: income * weight,
                asset: 0.0,
            },
        }
    }

    fn registry() -> CoordinateRegistry {
        CoordinateRegistry::from_entries([
            ("Guangxi", 108.33, 22.84),
            ("Beijing", 116.40, 39.90),
        ])
    }

    #[test]
    fn unmatched_places_are_dropped() {
        let groups = vec![group("Beijing", 1.0, 10.0, 5.0), group("Jiangmen", 1.0, 3.0, 1.0)];
        let rows = attach_coordinates(&groups, &registry(), PlaceMatch::Exact);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].place, "Beijing");
        assert_eq!(rows[0].longitude, 116.40);
        assert_eq!(rows[0].debt_income_ratio, Some(2.0));
    }

    #[test]
    fn province_names_match_by_containment() {
        let groups = vec![group("Guangxi Zhuang", 1.0, 10.0, 0.0)];
        assert!(attach_coordinates(&groups, &registry(), PlaceMatch::Exact).is_empty());
        let rows = attach_coordinates(&groups, &registry(), PlaceMatch::Contains);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].latitude, 22.84);
        assert_eq!(rows[0].debt_income_ratio, None);
    }

    #[test]
    fn zero_weight_group_is_not_plotted() {
        let groups = vec![group("Beijing", 0.0, 10.0, 5.0)];
        assert!(attach_coordinates(&groups, &registry(), PlaceMatch::Exact).is_empty());
    }

    #[test]
    fn cap_keeps_the_heaviest_places() {
        let groups = vec![
            group("Beijing", 1.0, 10.0, 5.0),
            group("Guangxi", 1.0, 30.0, 5.0),
        ];
        let rows = attach_coordinates(&groups, &registry(), PlaceMatch::Exact);
        let capped = cap_by_avg_debt(rows, 1);
        assert_eq!(capped.len(), 1);
        assert_eq!(capped[0].place, "Guangxi");
    }
}
