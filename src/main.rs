// Entry point and high-level CLI flow.
//
// - Option [1] loads and cleans both survey extracts, printing diagnostics.
// - Option [2] generates every report table and the JSON summary.
// - After generating reports, the user can choose to go back to the
//   selection menu or exit.
// `--batch` runs [1] then [2] once and exits.
mod args;

use crate::args::CliArgs;
use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use household_debt_report::config::PipelineConfig;
use household_debt_report::error::{PipelineError, PipelineResult};
use household_debt_report::loader::{self, Dataset};
use household_debt_report::output::{self, SummaryFile};
use household_debt_report::registry::Registries;
use household_debt_report::reports;
use household_debt_report::util;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard};
use tabled::Tabled;

// The cleaned table is kept between menu actions and reused as long as the
// input bytes are unchanged.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState { dataset: None }));

struct AppState {
    dataset: Option<Dataset>,
}

fn app_state() -> MutexGuard<'static, AppState> {
    APP_STATE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Print `label` and read one trimmed line. `None` once stdin is closed.
fn prompt(label: &str) -> Option<String> {
    print!("{label}");
    io::stdout().flush().ok();
    let mut line = String::new();
    match io::stdin().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim().to_string()),
    }
}

/// Asked after each report run. A closed stdin counts as "no".
fn back_to_menu() -> bool {
    loop {
        let Some(answer) = prompt("Back to Report Selection (Y/N): ") else {
            return false;
        };
        match answer.to_ascii_uppercase().as_str() {
            "Y" | "YES" => return true,
            "N" | "NO" => return false,
            _ => println!("Please answer Y or N."),
        }
    }
}

fn build_config(args: &CliArgs) -> anyhow::Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(p) = &args.master {
        config.master_path = p.clone();
    }
    if let Some(p) = &args.linked {
        config.linked_path = p.clone();
    }
    if let Some(p) = &args.out {
        config.output_dir = p.clone();
    }
    if let Some(k) = args.top_k {
        config.ranking_size = k;
    }
    if let Some(cap) = args.geo_cap {
        config.geo_city_cap = cap;
    }
    config.validate()?;
    Ok(config)
}

/// Option [1]: read both extracts and build the household table, unless the
/// cached table came from the same bytes.
fn handle_load(config: &PipelineConfig) -> PipelineResult<()> {
    let master = loader::read_input(&config.master_path, config.max_input_bytes)?;
    let remaining = config.max_input_bytes.saturating_sub(master.len() as u64);
    let linked = loader::read_input(&config.linked_path, remaining)?;

    let fingerprint = loader::fingerprint(&master, &linked);
    let mut state = app_state();
    if state.dataset.as_ref().is_some_and(|d| d.fingerprint == fingerprint) {
        log::info!("input unchanged, reusing cached household table");
        println!("Input files unchanged; using the already loaded table.\n");
        return Ok(());
    }

    let dataset = Dataset::from_bytes(&master, &linked, Registries::builtin())?;
    let load_report = &dataset.report;
    println!(
        "Processing dataset... ({} master rows read, {} households kept)",
        util::format_int(load_report.master_rows as i64),
        util::format_int(load_report.households as i64)
    );
    println!(
        "Note: {} rows skipped due to parse errors, {} without a positive weight.",
        util::format_int(load_report.parse_errors as i64),
        util::format_int(load_report.dropped_weight as i64)
    );
    if load_report.unresolved_cities > 0 || load_report.unresolved_provinces > 0 {
        println!(
            "Info: {} city and {} province values could not be resolved.",
            util::format_int(load_report.unresolved_cities as i64),
            util::format_int(load_report.unresolved_provinces as i64)
        );
    }
    println!();
    state.dataset = Some(dataset);
    Ok(())
}

/// Console label and CSV file of each report, in output order.
const REPORTS: [(&str, &str); 8] = [
    ("1", "report1_urban_rural.csv"),
    ("2", "report2_regions.csv"),
    ("3", "report3_province_geo.csv"),
    ("4a", "report4_tier_distribution.csv"),
    ("4b", "report4_tier_spread.csv"),
    ("5", "report5_city_ranking.csv"),
    ("6", "report6_city_geo.csv"),
    ("7", "report7_hierarchy.csv"),
];

fn emit_report<T>(
    config: &PipelineConfig,
    (label, file): (&str, &str),
    title: &str,
    note: &str,
    rows: &[T],
) -> PipelineResult<()>
where
    T: Serialize + Tabled + Clone,
{
    let path = config.output_path(file);
    output::write_csv(&path, rows)?;
    println!("Report {label}: {title}");
    println!("({note})\n");
    println!("{}\n", output::render_preview(rows, config.preview_rows));
    println!("(Full table exported to {})\n", path.display());
    Ok(())
}

/// Option [2]: write every report CSV plus `summary.json` and print
/// markdown previews.
fn handle_generate_reports(config: &PipelineConfig) -> PipelineResult<()> {
    let dataset = app_state().dataset.clone();
    let Some(dataset) = dataset else {
        println!("Error: No data loaded. Please load the files first (option 1).\n");
        return Ok(());
    };
    std::fs::create_dir_all(&config.output_dir).map_err(|source| PipelineError::Io {
        path: config.output_dir.clone(),
        source,
    })?;

    println!("Generating reports...");
    println!("Outputs saved to individual files...\n");

    let set = reports::generate_all(
        &dataset.records,
        Registries::builtin(),
        config.ranking_size,
        config.geo_city_cap,
    );

    emit_report(
        config,
        REPORTS[0],
        "Urban vs Rural Household Debt",
        "Weighted averages by urban/rural status",
        &set.urban_rural,
    )?;
    emit_report(
        config,
        REPORTS[1],
        "Regional Debt Summary",
        "Weighted averages by region, urban and rural stacked",
        &set.regions,
    )?;
    emit_report(
        config,
        REPORTS[2],
        "Provincial Debt Map",
        "Provinces with known coordinates",
        &set.province_geo,
    )?;
    emit_report(
        config,
        REPORTS[3],
        "Debt Distribution by City Tier",
        "Indebted households in Tier 1, 2 and 3-and-below cities",
        &set.tier_distribution,
    )?;
    emit_report(
        config,
        REPORTS[4],
        "Debt Spread by City Tier",
        "Quartiles of household debt per tier",
        &set.tier_spread,
    )?;
    match &set.city_ranking {
        Some(ranking) => emit_report(
            config,
            REPORTS[5],
            "City Debt Ranking",
            &format!("Top {k} and bottom {k} cities around the national average", k = config.ranking_size),
            ranking,
        )?,
        None => println!(
            "Report 5: City Debt Ranking\n(Unavailable: fewer than {} cities resolved)\n",
            2 * config.ranking_size
        ),
    }
    emit_report(
        config,
        REPORTS[6],
        "City Debt Map",
        &format!("Up to {} cities by average debt", config.geo_city_cap),
        &set.city_geo,
    )?;
    emit_report(
        config,
        REPORTS[7],
        "Debt Hierarchy",
        "Weighted debt by urban/rural > region > province > tier",
        &set.hierarchy,
    )?;

    let summary_path = config.output_path("summary.json");
    let summary = SummaryFile {
        generated_at: Utc::now(),
        stats: &set.summary,
        load: &dataset.report,
    };
    output::write_json(&summary_path, &summary)?;
    println!("Summary Stats ({}):", summary_path.display());
    println!(
        "{{\"avg_debt\": {}, \"debt_income_ratio\": {}, \"indebted_share\": {}}}\n",
        util::display_optional(&set.summary.avg_debt),
        util::display_optional(&set.summary.debt_income_ratio),
        util::display_optional(&set.summary.indebted_share)
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = CliArgs::parse();
    let config = build_config(&args)?;

    if args.batch {
        handle_load(&config).context("loading survey extracts")?;
        handle_generate_reports(&config).context("writing reports")?;
        return Ok(());
    }

    loop {
        println!("Select Option:");
        println!("[1] Load the files");
        println!("[2] Generate Reports\n");
        let Some(choice) = prompt("Enter choice: ") else {
            break;
        };
        match choice.as_str() {
            "1" => {
                if let Err(e) = handle_load(&config) {
                    eprintln!("Failed to load files: {e}\n");
                }
            }
            "2" => {
                println!();
                if let Err(e) = handle_generate_reports(&config) {
                    eprintln!("Report generation failed: {e}\n");
                }
                if !back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => println!("Invalid choice. Please enter 1 or 2.\n"),
        }
    }
    Ok(())
}
