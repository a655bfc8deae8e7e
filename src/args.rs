use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for the household debt report
#[derive(Debug, Parser)]
#[command(
    name = "household_debt_report",
    version,
    about = "Weighted household debt tables from the 2019 household finance survey"
)]
pub struct CliArgs {
    /// JSON config file; flags below override its values
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Master survey extract (default: chfs2019_master_202112.csv)
    #[arg(short = 'm', long = "master")]
    pub master: Option<PathBuf>,

    /// Linked household extract (default: chfs2019_hh_202112.csv)
    #[arg(short = 'l', long = "linked")]
    pub linked: Option<PathBuf>,

    /// Directory the report files are written to
    #[arg(short = 'o', long = "out")]
    pub out: Option<PathBuf>,

    /// Cities shown at each end of the ranking
    #[arg(short = 'k', long = "top-k")]
    pub top_k: Option<usize>,

    /// Most cities plotted on the city map
    #[arg(long = "geo-cap")]
    pub geo_cap: Option<usize>,

    /// Load, write every report and exit instead of showing the menu
    #[arg(long = "batch")]
    pub batch: bool,
}
