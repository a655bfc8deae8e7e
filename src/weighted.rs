// Survey-weighted statistics.
//
// Every average is a ratio of weighted sums, sum(value * w) / sum(w), and a
// group's debt-to-income ratio is sum(debt * w) / sum(income * w), never the
// mean of per-household ratios. A zero denominator yields `None`.
use crate::types::{CityTier, HouseholdRecord};
use std::collections::BTreeMap;

pub const UNKNOWN_LABEL: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueField {
    Debt,
    Income,
    Asset,
}

impl ValueField {
    pub fn of(self, r: &HouseholdRecord) -> f64 {
        match self {
            ValueField::Debt => r.total_debt,
            ValueField::Income => r.total_income,
            ValueField::Asset => r.total_asset,
        }
    }
}

/// A categorical dimension households can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKey {
    Settlement,
    Region,
    Province,
    City,
    Tier,
}

impl GroupKey {
    /// The record's label for this dimension, `None` when it is unresolved.
    pub fn label(self, r: &HouseholdRecord) -> Option<String> {
        match self {
            GroupKey::Settlement => r.settlement.map(|s| s.label().to_string()),
            GroupKey::Region => r.region.clone(),
            GroupKey::Province => r.canonical_province.clone(),
            GroupKey::City => r.canonical_city.clone(),
            GroupKey::Tier => r.tier.map(|t: CityTier| t.label().to_string()),
        }
    }

    pub fn label_or_unknown(self, r: &HouseholdRecord) -> String {
        self.label(r).unwrap_or_else(|| UNKNOWN_LABEL.to_string())
    }
}

/// `num / den`, or `None` when the denominator is not positive.
pub fn ratio(num: f64, den: f64) -> Option<f64> {
    (den > 0.0).then(|| num / den)
}

/// Generic weighted mean. Items with a non-positive weight are ignored.
pub fn weighted_mean<T>(
    items: &[T],
    value: impl Fn(&T) -> f64,
    weight: impl Fn(&T) -> f64,
) -> Option<f64> {
    let (num, den) = items
        .iter()
        .map(|it| (value(it), weight(it)))
        .filter(|(_, w)| *w > 0.0)
        .fold((0.0, 0.0), |(n, d), (v, w)| (n + v * w, d + w));
    ratio(num, den)
}

/// Running weighted sums for one group of households.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WeightedSums {
    pub households: usize,
    pub weight: f64,
    pub debt: f64,
    pub income: f64,
    pub asset: f64,
}

impl WeightedSums {
    pub fn add(&mut self, r: &HouseholdRecord) {
        let w = r.sample_weight;
        if w <= 0.0 {
            return;
        }
        self.households += 1;
        self.weight += w;
        self.debt += r.total_debt * w;
        self.income += r.total_income * w;
        self.asset += r.total_asset * w;
    }

    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a HouseholdRecord>) -> Self {
        let mut sums = WeightedSums::default();
        for r in records {
            sums.add(r);
        }
        sums
    }

    /// Weighted total of a field, sum(value * w).
    pub fn total(&self, field: ValueField) -> f64 {
        match field {
            ValueField::Debt => self.debt,
            ValueField::Income => self.income,
            ValueField::Asset => self.asset,
        }
    }

    pub fn mean(&self, field: ValueField) -> Option<f64> {
        ratio(self.total(field), self.weight)
    }

    pub fn debt_income_ratio(&self) -> Option<f64> {
        ratio(self.debt, self.income)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupStats {
    /// One label per requested group key, in the same order.
    pub keys: Vec<String>,
    pub sums: WeightedSums,
}

impl GroupStats {
    pub fn mean(&self, field: ValueField) -> Option<f64> {
        self.sums.mean(field)
    }

    pub fn debt_income_ratio(&self) -> Option<f64> {
        self.sums.debt_income_ratio()
    }
}

/// Weighted sums per combination of `keys`, ordered by key labels.
///
/// A record missing any of the requested labels is left out of this
/// grouping only.
pub fn group_weighted_stats(records: &[HouseholdRecord], keys: &[GroupKey]) -> Vec<GroupStats> {
    let mut groups: BTreeMap<Vec<String>, WeightedSums> = BTreeMap::new();
    for r in records {
        let labels: Option<Vec<String>> = keys.iter().map(|k| k.label(r)).collect();
        if let Some(labels) = labels {
            groups.entry(labels).or_default().add(r);
        }
    }
    groups
        .into_iter()
        .map(|(keys, sums)| GroupStats { keys, sums })
        .collect()
}

/// One node of a sum-aggregation tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub path: Vec<String>,
    pub value: f64,
}

/// Weighted totals of `field` at every prefix of `levels`.
///
/// Leaves hold sum(value * w) over their households and each ancestor is the
/// sum of its descendants. Missing labels become "Unknown". Nodes come out
/// in path order, so a parent always precedes its children.
pub fn weighted_sum_tree(
    records: &[HouseholdRecord],
    levels: &[GroupKey],
    field: ValueField,
) -> Vec<TreeNode> {
    let mut nodes: BTreeMap<Vec<String>, f64> = BTreeMap::new();
    for r in records.iter().filter(|r| r.sample_weight > 0.0) {
        let contribution = field.of(r) * r.sample_weight;
        let path: Vec<String> = levels.iter().map(|k| k.label_or_unknown(r)).collect();
        for depth in 1..=path.len() {
            *nodes.entry(path[..depth].to_vec()).or_insert(0.0) += contribution;
        }
    }
    nodes
        .into_iter()
        .map(|(path, value)| TreeNode { path, value })
        .collect()
}
