use crate::error::{PipelineError, PipelineResult, TableKind};
use crate::normalize::{normalize_city, normalize_province};
use crate::registry::Registries;
use crate::types::{CityTier, HouseholdRecord, RawLinkedRow, RawMasterRow, Settlement};
use crate::util::{non_negative_amount, normalize_household_id, parse_f64_safe};
use csv::{ReaderBuilder, StringRecord};
use serde::Serialize;
use std::collections::hash_map::{DefaultHasher, Entry};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::io::Read;
use std::path::Path;

/// Columns the master export must carry.
pub const MASTER_COLUMNS: [&str; 10] = [
    "hhid",
    "rural",
    "total_debt",
    "total_asset",
    "weight_hh",
    "total_income",
    "city_lab",
    "city_level",
    "region",
    "prov",
];

/// Columns the linked household export must carry.
pub const LINKED_COLUMNS: [&str; 2] = ["hhid", "house01num"];

const REGION_LABELS: &[(&str, &str)] = &[
    ("东部", "East"),
    ("中部", "Central"),
    ("西部", "West"),
    ("东北", "Northeast"),
];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadReport {
    pub master_rows: usize,
    pub linked_rows: usize,
    pub parse_errors: usize,
    pub missing_id: usize,
    pub dropped_weight: usize,
    pub unmatched_linked: usize,
    pub duplicate_linked_ids: usize,
    pub unresolved_cities: usize,
    pub unresolved_provinces: usize,
    pub households: usize,
}

/// A cleaned household table plus what happened while building it.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub records: Vec<HouseholdRecord>,
    pub report: LoadReport,
    /// Hash of the raw input bytes; identical inputs give identical tables.
    pub fingerprint: u64,
}

/// Fail with every required column that is absent from `headers`.
pub fn validate_columns(
    headers: &StringRecord,
    required: &[&str],
    table: TableKind,
) -> PipelineResult<()> {
    let missing: Vec<String> = required
        .iter()
        .filter(|col| !headers.iter().any(|h| h.trim() == **col))
        .map(|col| col.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::MissingColumns { table, missing })
    }
}

pub fn map_settlement(rural: Option<&str>) -> Option<Settlement> {
    match parse_f64_safe(rural) {
        Some(v) if v == 0.0 => Some(Settlement::Urban),
        Some(v) if v == 1.0 => Some(Settlement::Rural),
        _ => None,
    }
}

/// Free-text tier field -> tier. "非一线" (not tier 1) must be checked
/// before "一线" since it contains it.
pub fn map_tier(level: Option<&str>) -> Option<CityTier> {
    let level = level?.trim();
    if level.is_empty() {
        return None;
    }
    let tier = if level.contains("非一线") || level.contains("三线") || level.contains("以下") {
        CityTier::Tier3AndBelow
    } else if level.contains("一线") {
        CityTier::Tier1
    } else if level.contains("二线") {
        CityTier::Tier2
    } else {
        CityTier::Other
    };
    Some(tier)
}

/// Chinese region names become English; anything else passes through.
pub fn map_region(region: Option<&str>) -> Option<String> {
    let region = region?.trim();
    if region.is_empty() {
        return None;
    }
    let label = REGION_LABELS
        .iter()
        .find(|(zh, _)| *zh == region)
        .map(|(_, en)| *en)
        .unwrap_or(region);
    Some(label.to_string())
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Join the linked table onto the master table and clean every row.
///
/// Both headers are checked before any row is parsed. Rows without a
/// positive sample weight never make it into the table.
pub fn load<M: Read, L: Read>(
    master: M,
    linked: L,
    registries: &Registries,
) -> PipelineResult<(Vec<HouseholdRecord>, LoadReport)> {
    let mut master_rdr = ReaderBuilder::new().flexible(true).from_reader(master);
    let mut linked_rdr = ReaderBuilder::new().flexible(true).from_reader(linked);
    validate_columns(master_rdr.headers()?, &MASTER_COLUMNS, TableKind::Master)?;
    validate_columns(linked_rdr.headers()?, &LINKED_COLUMNS, TableKind::Linked)?;

    let mut report = LoadReport::default();

    let mut house_counts: HashMap<String, Option<f64>> = HashMap::new();
    for result in linked_rdr.deserialize::<RawLinkedRow>() {
        report.linked_rows += 1;
        let row = match result {
            Ok(r) => r,
            Err(_) => { report.parse_errors += 1; continue; }
        };
        let Some(id) = normalize_household_id(row.household_id.as_deref()) else {
            report.missing_id += 1;
            continue;
        };
        match house_counts.entry(id) {
            Entry::Occupied(_) => report.duplicate_linked_ids += 1,
            Entry::Vacant(slot) => {
                slot.insert(parse_f64_safe(row.house_count.as_deref()));
            }
        }
    }

    let mut records: Vec<HouseholdRecord> = Vec::new();
    for result in master_rdr.deserialize::<RawMasterRow>() {
        report.master_rows += 1;
        let row = match result {
            Ok(r) => r,
            Err(_) => { report.parse_errors += 1; continue; }
        };

        let sample_weight = match parse_f64_safe(row.sample_weight.as_deref()) {
            Some(w) if w > 0.0 => w,
            _ => { report.dropped_weight += 1; continue; }
        };
        let Some(household_id) = normalize_household_id(row.household_id.as_deref()) else {
            report.missing_id += 1;
            continue;
        };

        let house_count = match house_counts.get(&household_id) {
            Some(count) => *count,
            None => { report.unmatched_linked += 1; None }
        };

        let raw_city_code = non_empty(row.city_code);
        let raw_province = non_empty(row.province);
        let canonical_city = raw_city_code
            .as_deref()
            .and_then(|raw| normalize_city(raw, registries));
        let canonical_province = raw_province
            .as_deref()
            .and_then(|raw| normalize_province(raw, registries));
        if raw_city_code.is_some() && canonical_city.is_none() {
            report.unresolved_cities += 1;
        }
        if raw_province.is_some() && canonical_province.is_none() {
            report.unresolved_provinces += 1;
        }

        records.push(HouseholdRecord {
            household_id,
            settlement: map_settlement(row.rural.as_deref()),
            total_debt: non_negative_amount(row.total_debt.as_deref()),
            total_income: non_negative_amount(row.total_income.as_deref()),
            total_asset: non_negative_amount(row.total_asset.as_deref()),
            sample_weight,
            house_count,
            raw_city_code,
            raw_province,
            canonical_city,
            canonical_province,
            tier: map_tier(row.city_level.as_deref()),
            region: map_region(row.region.as_deref()),
        });
    }

    report.households = records.len();
    log::info!(
        "loaded {} households ({} master rows, {} linked rows)",
        report.households,
        report.master_rows,
        report.linked_rows
    );
    if report.dropped_weight > 0 {
        log::info!("dropped {} rows without a positive sample weight", report.dropped_weight);
    }
    if report.duplicate_linked_ids > 0 {
        log::warn!(
            "{} duplicate household ids in the linked table; first row kept",
            report.duplicate_linked_ids
        );
    }
    if report.unresolved_cities > 0 || report.unresolved_provinces > 0 {
        log::warn!(
            "unresolved places: {} cities, {} provinces",
            report.unresolved_cities,
            report.unresolved_provinces
        );
    }
    Ok((records, report))
}

/// Read a whole input file, refusing anything over `limit` bytes.
pub fn read_input(path: &Path, limit: u64) -> PipelineResult<Vec<u8>> {
    let io_err = |source| PipelineError::Io { path: path.to_path_buf(), source };
    let size = std::fs::metadata(path).map_err(io_err)?.len();
    if size > limit {
        return Err(PipelineError::InputTooLarge { path: path.to_path_buf(), size, limit });
    }
    std::fs::read(path).map_err(io_err)
}

pub fn fingerprint(master: &[u8], linked: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    master.hash(&mut hasher);
    linked.hash(&mut hasher);
    hasher.finish()
}

impl Dataset {
    pub fn from_bytes(master: &[u8], linked: &[u8], registries: &Registries) -> PipelineResult<Self> {
        let (records, report) = load(master, linked, registries)?;
        Ok(Dataset { records, report, fingerprint: fingerprint(master, linked) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER: &str = "\
hhid,rural,total_debt,total_asset,weight_hh,total_income,city_lab,city_level,region,prov,extra
1,0,100,500,2,50,北京市,一线城市,东部,北京市,x
2,1,-10,20,1,20,20171001,非一线城市,西部,四川省,y
3,0,999,0,0,10,上海市,一线城市,东部,上海市,z
4,1,,,1.5,abc,,,东北,,w
";

    const LINKED: &str = "\
hhid,house01num
1.0,2
2,1
2,3
";

    fn load_str(master: &str, linked: &str) -> PipelineResult<(Vec<HouseholdRecord>, LoadReport)> {
        load(master.as_bytes(), linked.as_bytes(), Registries::builtin())
    }

    #[test]
    fn join_filter_and_clean() {
        let (records, report) = load_str(MASTER, LINKED).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(report.master_rows, 4);
        assert_eq!(report.dropped_weight, 1);
        assert_eq!(report.duplicate_linked_ids, 1);
        assert_eq!(report.unmatched_linked, 1);

        let first = &records[0];
        assert_eq!(first.household_id, "1");
        assert_eq!(first.is_rural(), Some(false));
        assert_eq!(first.house_count, Some(2.0));
        assert_eq!(first.canonical_city.as_deref(), Some("Beijing"));
        assert_eq!(first.canonical_province.as_deref(), Some("Beijing"));
        assert_eq!(first.tier, Some(CityTier::Tier1));
        assert_eq!(first.region.as_deref(), Some("East"));

        let second = &records[1];
        assert_eq!(second.total_debt, 0.0);
        assert_eq!(second.house_count, Some(1.0));
        assert_eq!(second.canonical_city.as_deref(), Some("Nanjing"));
        assert_eq!(second.tier, Some(CityTier::Tier3AndBelow));

        let fourth = &records[2];
        assert_eq!(fourth.total_income, 0.0);
        assert_eq!(fourth.canonical_city, None);
        assert_eq!(fourth.tier, None);
        assert_eq!(fourth.region.as_deref(), Some("Northeast"));
        assert_eq!(fourth.house_count, None);
    }

    #[test]
    fn missing_columns_are_listed_together() {
        let err = load_str("hhid,rural,total_debt\n1,0,5\n", LINKED).unwrap_err();
        match err {
            PipelineError::MissingColumns { table, missing } => {
                assert_eq!(table, TableKind::Master);
                assert_eq!(missing.len(), 7);
                assert!(missing.contains(&"weight_hh".to_string()));
                assert!(missing.contains(&"prov".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = load_str(MASTER, "hhid\n1\n").unwrap_err();
        assert!(err.to_string().contains("house01num"));
    }

    #[test]
    fn scientific_notation_cells_are_numbers() {
        let master = "\
hhid,rural,total_debt,total_asset,weight_hh,total_income,city_lab,city_level,region,prov
1,0,100,0,2.5e3,50,北京市,一线城市,东部,北京市
2,1,1.2E5,0,1,20,北京市,一线城市,东部,北京市
";
        let (records, report) = load_str(master, LINKED).unwrap();
        assert_eq!(report.dropped_weight, 0);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].sample_weight, 2500.0);
        assert_eq!(records[1].total_debt, 120000.0);
    }

    #[test]
    fn labels_pass_through_or_null() {
        assert_eq!(map_region(Some("华南")), Some("华南".to_string()));
        assert_eq!(map_region(Some(" ")), None);
        assert_eq!(map_tier(Some("二线城市")), Some(CityTier::Tier2));
        assert_eq!(map_tier(Some("新一线")), Some(CityTier::Tier1));
        assert_eq!(map_tier(Some("县城")), Some(CityTier::Other));
        assert_eq!(map_tier(None), None);
        assert_eq!(map_settlement(Some("2")), None);
    }

    #[test]
    fn identical_bytes_share_a_fingerprint() {
        let a = Dataset::from_bytes(MASTER.as_bytes(), LINKED.as_bytes(), Registries::builtin()).unwrap();
        let b = Dataset::from_bytes(MASTER.as_bytes(), LINKED.as_bytes(), Registries::builtin()).unwrap();
        assert_eq!(a.fingerprint, b.fingerprint);
        assert_eq!(a.records, b.records);
        assert_ne!(a.fingerprint, fingerprint(MASTER.as_bytes(), b"hhid,house01num\n"));
    }
}
