//! Common functionality.

use byte_unit::{Byte, UnitType};
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};

/// Commonly used command line arguments.
#[derive(Parser, Debug)]
pub struct Args {
    /// Verbosity of the program
    #[clap(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            verbose: Verbosity::new(0, 0),
        }
    }
}

/// Helper to print the current memory resident set size via `tracing`.
pub fn trace_rss_now() {
    let me = procfs::process::Process::myself().unwrap();
    let page_size = procfs::page_size();
    tracing::debug!(
        "RSS now: {}",
        Byte::from_u64(me.stat().unwrap().rss * page_size).get_appropriate_unit(UnitType::Binary)
    );
}

/// Definition of canonical chromosome names.
pub const CHROMS: &[&str] = &[
    "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12", "13", "14", "15", "16", "17",
    "18", "19", "20", "21", "22", "X", "Y", "MT",
];

/// Normalize a chromosome name: strip an optional `chr` prefix and map the
/// mitochondrial spellings to `MT`.
pub fn canonical_chrom(chrom: &str) -> String {
    let stripped = chrom.strip_prefix("chr").unwrap_or(chrom);
    match stripped {
        "M" | "m" | "mt" | "MT" => String::from("MT"),
        "x" | "X" => String::from("X"),
        "y" | "Y" => String::from("Y"),
        _ => stripped.to_string(),
    }
}

/// Fixed numeric rank of a chromosome (1-22, X=23, Y=24, MT=25) so that
/// result ordering never falls back to textual sorting.
pub fn chrom_rank(chrom: &str) -> Option<i32> {
    let canonical = canonical_chrom(chrom);
    match canonical.as_str() {
        "X" => Some(23),
        "Y" => Some(24),
        "MT" => Some(25),
        _ => canonical.parse::<i32>().ok().filter(|no| (1..=22).contains(no)),
    }
}

/// Select the genome release to use.
#[derive(
    clap::ValueEnum, Clone, Copy, Debug, strum::Display, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub enum GenomeRelease {
    /// GRCh37 / hg19
    #[strum(serialize = "grch37")]
    Grch37,
    /// GRCh38 / hg38
    #[strum(serialize = "grch38")]
    Grch38,
}

impl GenomeRelease {
    /// Whether the given release string (as carried on variant records)
    /// denotes this release.
    pub fn matches(&self, release: &str) -> bool {
        release.eq_ignore_ascii_case(&self.to_string())
    }
}
