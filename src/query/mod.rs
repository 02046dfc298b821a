//! Code implementing the `query run` and `query reload` sub commands.

pub mod executor;
pub mod interpreter;
pub mod output;
pub mod prefetch;
pub mod recessive;
pub mod schema;
pub mod sorting;
pub mod store;

use std::time::Instant;

use clap::Parser;
use itertools::Itertools;
use thousands::Separable;

use crate::common::{trace_rss_now, GenomeRelease};
use crate::query::executor::QueryExecutor;
use crate::query::interpreter::genes::{GeneXrefEntry, InMemoryGeneXref};
use crate::query::output::OutputFormat;
use crate::query::prefetch::{FsResultSetStore, MemResultSetStore, ResultSetStore};
use crate::query::schema::data::{Case, CaseRecord};
use crate::query::schema::query::CaseQuery;
use crate::query::store::{
    ConservationProvider, MemConservationProvider, MemVariantStore, VariantStore,
};

/// Definition of the case or cohort a query runs against.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct QueryTarget {
    /// Name of the case or cohort.
    pub name: String,
    /// The cases with their pedigrees.
    pub cases: Vec<Case>,
}

/// Command line arguments for `query run` sub command.
#[derive(Parser, Debug)]
#[command(author, version, about = "Run a filter query for a case or cohort", long_about = None)]
pub struct RunArgs {
    /// Genome release to assume.
    #[arg(long, value_enum)]
    pub genome_release: GenomeRelease,
    /// Path to the case/cohort JSON file.
    #[arg(long, required = true)]
    pub path_cases: String,
    /// Per-case variant JSONL input as `CASE=PATH` (repeatable).
    #[arg(long, required = true)]
    pub path_input: Vec<String>,
    /// Path to query JSON file.
    #[arg(long, required = true)]
    pub path_query_json: String,
    /// Path to the output file.
    #[arg(long, required = true)]
    pub path_output: String,
    /// Output shape to write.
    #[arg(long, value_enum, default_value_t = OutputFormat::Render)]
    pub output_format: OutputFormat,
    /// Path to the gene cross-reference TSV, if any.
    #[arg(long)]
    pub path_gene_xref: Option<String>,
    /// Path to the conservation alignment TSV (table export only).
    #[arg(long)]
    pub path_conservation: Option<String>,
    /// Materialize the ordered result keys under a fresh job UUID.
    #[arg(long, requires = "path_results_db")]
    pub materialize: bool,
    /// Path to the result set storage directory.
    #[arg(long)]
    pub path_results_db: Option<String>,
    /// Optional maximal number of result rows, applied on top of the
    /// query's own limit.
    #[arg(long)]
    pub max_results: Option<usize>,
}

/// Command line arguments for `query reload` sub command.
#[derive(Parser, Debug)]
#[command(author, version, about = "Replay a materialized result set", long_about = None)]
pub struct ReloadArgs {
    /// Job UUID of the materialized result set.
    #[arg(long)]
    pub job_id: uuid::Uuid,
    /// Path to the result set storage directory.
    #[arg(long, required = true)]
    pub path_results_db: String,
    /// Path to the case/cohort JSON file.
    #[arg(long, required = true)]
    pub path_cases: String,
    /// Per-case variant JSONL input as `CASE=PATH` (repeatable).
    #[arg(long, required = true)]
    pub path_input: Vec<String>,
    /// Path to query JSON file (for output shaping only; no predicate is
    /// re-evaluated on reload).
    #[arg(long, required = true)]
    pub path_query_json: String,
    /// Path to the output file.
    #[arg(long, required = true)]
    pub path_output: String,
    /// Output shape to write.
    #[arg(long, value_enum, default_value_t = OutputFormat::Render)]
    pub output_format: OutputFormat,
    /// Path to the conservation alignment TSV (table export only).
    #[arg(long)]
    pub path_conservation: Option<String>,
}

/// Load the case/cohort definition from JSON.
fn load_target(path: &str) -> Result<QueryTarget, anyhow::Error> {
    let file = std::fs::File::open(path)
        .map_err(|e| anyhow::anyhow!("could not open cases file {}: {}", path, e))?;
    serde_json::from_reader(std::io::BufReader::new(file))
        .map_err(|e| anyhow::anyhow!("could not load cases from {}: {}", path, e))
}

/// Load the query settings from JSON.
fn load_query(path: &str) -> Result<CaseQuery, anyhow::Error> {
    let file = std::fs::File::open(path)
        .map_err(|e| anyhow::anyhow!("could not open query file {}: {}", path, e))?;
    serde_json::from_reader(std::io::BufReader::new(file))
        .map_err(|e| anyhow::anyhow!("could not load query from {}: {}", path, e))
}

/// Load the per-case variant sets given as `CASE=PATH` arguments and check
/// them against the expected genome release.
fn load_variant_store(
    path_input: &[String],
    target: &QueryTarget,
    genome_release: GenomeRelease,
) -> Result<MemVariantStore, anyhow::Error> {
    let mut store = MemVariantStore::default();
    for spec in path_input {
        let (case_name, path) = spec.split_once('=').ok_or_else(|| {
            anyhow::anyhow!("malformed --path-input value {:?}, expected CASE=PATH", spec)
        })?;
        let count = store.load_jsonl(case_name, std::path::Path::new(path))?;
        tracing::info!(
            "loaded {} records for case {} from {}",
            count.separate_with_commas(),
            case_name,
            path
        );
    }
    for case in &target.cases {
        let records = store.case_records(&case.name)?;
        if let Some(record) = records
            .iter()
            .find(|record| !genome_release.matches(&record.release))
        {
            anyhow::bail!(
                "record {} of case {} has genome release {} but {} was requested",
                record.key(),
                &case.name,
                &record.release,
                genome_release
            );
        }
    }
    Ok(store)
}

/// Load the gene cross-reference TSV, if given.
fn load_gene_xref(path: Option<&str>) -> Result<InMemoryGeneXref, anyhow::Error> {
    let Some(path) = path else {
        return Ok(InMemoryGeneXref::default());
    };
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_path(path)?;
    let mut entries: Vec<GeneXrefEntry> = Vec::new();
    for row in reader.deserialize() {
        entries.push(row?);
    }
    tracing::info!(
        "loaded {} gene cross-reference entries from {}",
        entries.len().separate_with_commas(),
        path
    );
    Ok(InMemoryGeneXref::new(entries))
}

/// Write the passed rows in the requested output shape.
fn write_output(
    executor: &QueryExecutor<'_>,
    query: &CaseQuery,
    target: &QueryTarget,
    rows: &[CaseRecord],
    output_format: OutputFormat,
    path_output: &str,
) -> Result<(), anyhow::Error> {
    use std::io::Write;

    let file = std::fs::File::create(path_output)
        .map_err(|e| anyhow::anyhow!("could not create output file {}: {}", path_output, e))?;
    let mut writer = std::io::BufWriter::new(file);
    match output_format {
        OutputFormat::Render => {
            let rows = executor.render_rows(query, rows)?;
            output::write_render(&mut writer, &rows)?;
        }
        OutputFormat::Table => {
            let rows = executor.table_rows(query, rows)?;
            output::write_table(&mut writer, &rows)?;
        }
        OutputFormat::Vcf => {
            // Union of the pedigree samples across cases, in pedigree order.
            let samples: Vec<String> = target
                .cases
                .iter()
                .flat_map(|case| case.pedigree.iter().map(|entry| entry.sample.clone()))
                .unique()
                .collect();
            output::write_vcf(&mut writer, query, &samples, rows)?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Main entry point for `query run` sub command.
pub fn run(args_common: &crate::common::Args, args: &RunArgs) -> Result<(), anyhow::Error> {
    let before_anything = Instant::now();
    tracing::info!("args_common = {:?}", &args_common);
    tracing::info!("args = {:?}", &args);

    tracing::info!("Loading query...");
    let mut query = load_query(&args.path_query_json)?;
    if let Some(max_results) = args.max_results {
        query.result_rows_limit = Some(
            query
                .result_rows_limit
                .map_or(max_results, |limit| limit.min(max_results)),
        );
    }

    tracing::info!("Loading cases and variant sets...");
    let target = load_target(&args.path_cases)?;
    let store = load_variant_store(&args.path_input, &target, args.genome_release)?;
    let xref = load_gene_xref(args.path_gene_xref.as_deref())?;
    let conservation = args
        .path_conservation
        .as_deref()
        .map(|path| MemConservationProvider::load_tsv(std::path::Path::new(path)))
        .transpose()?;

    trace_rss_now();

    let fs_results = args.path_results_db.as_deref().map(FsResultSetStore::new);
    let mem_results = MemResultSetStore::default();
    let results: &dyn ResultSetStore = fs_results
        .as_ref()
        .map(|store| store as &dyn ResultSetStore)
        .unwrap_or(&mem_results);
    let executor = QueryExecutor {
        store: &store,
        xref: &xref,
        results,
        conservation: conservation
            .as_ref()
            .map(|provider| provider as &dyn ConservationProvider),
    };

    tracing::info!("Running query...");
    let rows = if args.materialize {
        let (result, rows) = executor.materialize(&target.name, &target.cases, &query)?;
        println!("{}", result.sodar_uuid);
        rows
    } else {
        let (rows, _stats) = executor.run(&target.cases, &query)?;
        rows
    };

    tracing::info!("Writing {} output...", args.output_format);
    write_output(
        &executor,
        &query,
        &target,
        &rows,
        args.output_format,
        &args.path_output,
    )?;

    trace_rss_now();
    tracing::info!(
        "All of `query run` completed in {:?}",
        before_anything.elapsed()
    );
    Ok(())
}

/// Main entry point for `query reload` sub command.
pub fn run_reload(
    args_common: &crate::common::Args,
    args: &ReloadArgs,
) -> Result<(), anyhow::Error> {
    let before_anything = Instant::now();
    tracing::info!("args_common = {:?}", &args_common);
    tracing::info!("args = {:?}", &args);

    let query = load_query(&args.path_query_json)?;
    let target = load_target(&args.path_cases)?;

    let mut store = MemVariantStore::default();
    for spec in &args.path_input {
        let (case_name, path) = spec.split_once('=').ok_or_else(|| {
            anyhow::anyhow!("malformed --path-input value {:?}, expected CASE=PATH", spec)
        })?;
        store.load_jsonl(case_name, std::path::Path::new(path))?;
    }
    let xref = InMemoryGeneXref::default();
    let conservation = args
        .path_conservation
        .as_deref()
        .map(|path| MemConservationProvider::load_tsv(std::path::Path::new(path)))
        .transpose()?;
    let results = FsResultSetStore::new(&args.path_results_db);
    let executor = QueryExecutor {
        store: &store,
        xref: &xref,
        results: &results,
        conservation: conservation
            .as_ref()
            .map(|provider| provider as &dyn ConservationProvider),
    };

    tracing::info!("Reloading result set {}...", args.job_id);
    let rows = executor.reload(args.job_id, &target.cases)?;

    tracing::info!("Writing {} output...", args.output_format);
    write_output(
        &executor,
        &query,
        &target,
        &rows,
        args.output_format,
        &args.path_output,
    )?;

    trace_rss_now();
    tracing::info!(
        "All of `query reload` completed in {:?}",
        before_anything.elapsed()
    );
    Ok(())
}

#[cfg(test)]
mod test {
    use super::QueryTarget;
    use crate::query::schema::data::Case;

    #[test]
    fn query_target_round_trip() {
        let target = QueryTarget {
            name: String::from("project"),
            cases: vec![Case {
                sodar_uuid: uuid::Uuid::new_v4(),
                name: String::from("trio"),
                pedigree: vec![],
            }],
        };

        let json = serde_json::to_string(&target).unwrap();
        let back: QueryTarget = serde_json::from_str(&json).unwrap();
        assert_eq!(back, target);
    }

    #[test]
    fn malformed_path_input_is_rejected() {
        let target = QueryTarget {
            name: String::from("trio"),
            cases: vec![],
        };
        let result = super::load_variant_store(
            &[String::from("no-equals-sign")],
            &target,
            crate::common::GenomeRelease::Grch37,
        );

        assert!(result.is_err());
    }
}
