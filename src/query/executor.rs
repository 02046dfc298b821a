//! Query orchestration: run, materialize, and reload.

use indexmap::IndexMap;
use thousands::Separable;

use crate::common::trace_rss_now;
use crate::query::interpreter::genes::GeneXref;
use crate::query::interpreter::QueryInterpreter;
use crate::query::output::{RenderRecord, TableRecord};
use crate::query::prefetch::{PrefetchedResult, ResultKey, ResultSetStore};
use crate::query::recessive;
use crate::query::schema::data::{Case, CaseRecord, VariantKey, VariantRecord};
use crate::query::schema::query::CaseQuery;
use crate::query::sorting::ByCoordinate;
use crate::query::store::{ConservationProvider, VariantStore};

/// Statistics of one query run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct QueryStats {
    /// Number of records read from the store.
    pub count_total: usize,
    /// Number of records that passed all filters.
    pub count_passed: usize,
}

/// Bundle of collaborators the query engine runs against.
pub struct QueryExecutor<'a> {
    /// The variant store.
    pub store: &'a dyn VariantStore,
    /// The gene cross-reference.
    pub xref: &'a dyn GeneXref,
    /// The result set store for materialization and reload.
    pub results: &'a dyn ResultSetStore,
    /// The conservation table, if available (table export only).
    pub conservation: Option<&'a dyn ConservationProvider>,
}

impl<'a> QueryExecutor<'a> {
    /// Run the query over the given cases and return the passing rows in
    /// canonical `(chromosome rank, start)` order.
    ///
    /// Cohort queries repeat the single-case logic per case and union the
    /// results; compound-het phase resolution is strictly per case.
    pub fn run(
        &self,
        cases: &[Case],
        query: &CaseQuery,
    ) -> Result<(Vec<CaseRecord>, QueryStats), anyhow::Error> {
        let before_query = std::time::Instant::now();
        let interpreter = QueryInterpreter::new(query.clone(), self.xref);
        let mut stats = QueryStats::default();
        let mut rows: Vec<ByCoordinate> = Vec::new();

        for case in cases {
            let records = self.store.case_records(&case.name)?;
            stats.count_total += records.len();

            let annotated: Vec<VariantRecord> = records
                .into_iter()
                .filter(|record| interpreter.passes_annotation(record))
                .collect();

            let passed = if let Some(index_sample) =
                query.compound_recessive_indices.get(&case.name)
            {
                recessive::compound_het_filter(query, case, index_sample, annotated)?
            } else if let Some(index_sample) = query.recessive_indices.get(&case.name) {
                recessive::recessive_filter(query, case, index_sample, annotated)?
            } else {
                let mut kept = Vec::new();
                for record in annotated {
                    if interpreter.passes_genotype(&record)? {
                        kept.push(record);
                    }
                }
                kept
            };

            tracing::debug!(
                "case {}: {} records passed",
                &case.name,
                passed.len().separate_with_commas()
            );
            rows.extend(passed.into_iter().map(|record| {
                ByCoordinate::from(CaseRecord {
                    case_name: case.name.clone(),
                    case_uuid: case.sodar_uuid,
                    record,
                })
            }));
        }

        rows.sort();
        let mut rows: Vec<CaseRecord> = rows.into_iter().map(|wrapped| wrapped.row).collect();
        if let Some(limit) = query.result_rows_limit {
            rows.truncate(limit);
        }
        stats.count_passed = rows.len();

        tracing::info!(
            "query passed {} of {} records in {:?}",
            stats.count_passed.separate_with_commas(),
            stats.count_total.separate_with_commas(),
            before_query.elapsed()
        );
        trace_rss_now();

        Ok((rows, stats))
    }

    /// Run the query and freeze its ordered result keys under a fresh job
    /// UUID.  The stored record is write-once; reloads replay it.
    pub fn materialize(
        &self,
        target: &str,
        cases: &[Case],
        query: &CaseQuery,
    ) -> Result<(PrefetchedResult, Vec<CaseRecord>), anyhow::Error> {
        let (rows, _stats) = self.run(cases, query)?;
        let result = PrefetchedResult {
            sodar_uuid: uuid::Uuid::new_v4(),
            target: target.to_string(),
            created: chrono::Utc::now(),
            result_keys: rows
                .iter()
                .map(|row| ResultKey {
                    case_name: row.case_name.clone(),
                    variant: row.record.key(),
                })
                .collect(),
        };
        self.results.save(&result)?;
        tracing::info!(
            "materialized result set {} with {} keys",
            &result.sodar_uuid,
            result.result_keys.len().separate_with_commas()
        );
        Ok((result, rows))
    }

    /// Replay a materialized result set: re-fetch the frozen keys from the
    /// variant store in their stored order.  No genotype, frequency, or
    /// compound-het predicate is re-evaluated.
    pub fn reload(
        &self,
        job_id: uuid::Uuid,
        cases: &[Case],
    ) -> Result<Vec<CaseRecord>, anyhow::Error> {
        let result = self.results.load(job_id)?;

        let case_uuids: IndexMap<&str, uuid::Uuid> = cases
            .iter()
            .map(|case| (case.name.as_str(), case.sodar_uuid))
            .collect();

        // One store fetch per case, then reassembly in the frozen order.
        let mut keys_by_case: IndexMap<String, Vec<VariantKey>> = IndexMap::new();
        for key in &result.result_keys {
            keys_by_case
                .entry(key.case_name.clone())
                .or_default()
                .push(key.variant.clone());
        }
        let mut fetched: IndexMap<(String, VariantKey), VariantRecord> = IndexMap::new();
        for (case_name, keys) in &keys_by_case {
            let records = self.store.records_by_keys(case_name, keys)?;
            for (key, record) in keys.iter().zip(records) {
                fetched.insert((case_name.clone(), key.clone()), record);
            }
        }

        let mut rows = Vec::with_capacity(result.result_keys.len());
        for key in &result.result_keys {
            let case_uuid = case_uuids
                .get(key.case_name.as_str())
                .copied()
                .ok_or_else(|| {
                    anyhow::anyhow!("case {} of result set {} not provided", &key.case_name, job_id)
                })?;
            let record = fetched
                .get(&(key.case_name.clone(), key.variant.clone()))
                .cloned()
                .expect("fetched above");
            rows.push(CaseRecord {
                case_name: key.case_name.clone(),
                case_uuid,
                record,
            });
        }
        tracing::info!(
            "reloaded result set {} with {} rows",
            job_id,
            rows.len().separate_with_commas()
        );
        Ok(rows)
    }

    /// Build the render rows for the given passed records (the annotation
    /// join work shared by run and reload).
    pub fn render_rows(
        &self,
        query: &CaseQuery,
        rows: &[CaseRecord],
    ) -> Result<Vec<RenderRecord>, anyhow::Error> {
        rows.iter()
            .map(|row| RenderRecord::from_case_record(query, row))
            .collect()
    }

    /// Build the table-export rows: render fields plus the conservation
    /// join.
    pub fn table_rows(
        &self,
        query: &CaseQuery,
        rows: &[CaseRecord],
    ) -> Result<Vec<TableRecord>, anyhow::Error> {
        rows.iter()
            .map(|row| {
                let render = RenderRecord::from_case_record(query, row)?;
                let conservation = self
                    .conservation
                    .map(|provider| {
                        provider.overlapping(&row.record.chrom, row.record.start, row.record.end)
                    })
                    .unwrap_or_default();
                Ok(TableRecord {
                    render,
                    conservation,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::QueryExecutor;
    use crate::query::interpreter::genes::InMemoryGeneXref;
    use crate::query::prefetch::MemResultSetStore;
    use crate::query::schema::data::{
        CallInfo, Case, Genotype, PedigreeEntry, PedigreeRole, TranscriptAnnotation,
        VariantRecord,
    };
    use crate::query::schema::query::{CaseQuery, GenotypeChoice};
    use crate::query::store::MemVariantStore;

    fn trio_case(name: &str) -> Case {
        Case {
            sodar_uuid: uuid::Uuid::new_v4(),
            name: name.to_string(),
            pedigree: vec![
                PedigreeEntry {
                    sample: String::from("child"),
                    role: PedigreeRole::Index,
                    affected: true,
                    ..Default::default()
                },
                PedigreeEntry {
                    sample: String::from("father"),
                    role: PedigreeRole::Father,
                    affected: false,
                    ..Default::default()
                },
                PedigreeEntry {
                    sample: String::from("mother"),
                    role: PedigreeRole::Mother,
                    affected: false,
                    ..Default::default()
                },
            ],
        }
    }

    fn call(genotype: Genotype) -> CallInfo {
        CallInfo {
            genotype,
            ..Default::default()
        }
    }

    fn record(
        chrom: (&str, i32),
        start: i32,
        gene_id: &str,
        child: Genotype,
        father: Genotype,
        mother: Genotype,
    ) -> VariantRecord {
        VariantRecord {
            release: String::from("GRCh37"),
            chrom: chrom.0.to_string(),
            chrom_no: chrom.1,
            start,
            end: start,
            reference: String::from("A"),
            alternative: String::from("T"),
            refseq: TranscriptAnnotation {
                gene_id: Some(gene_id.to_string()),
                ..Default::default()
            },
            call_infos: vec![
                (String::from("child"), call(child)),
                (String::from("father"), call(father)),
                (String::from("mother"), call(mother)),
            ]
            .into_iter()
            .collect(),
            ..Default::default()
        }
    }

    fn de_novo_query() -> CaseQuery {
        CaseQuery {
            genotype: vec![
                (String::from("child"), Some(GenotypeChoice::Het)),
                (String::from("father"), Some(GenotypeChoice::Ref)),
                (String::from("mother"), Some(GenotypeChoice::Ref)),
            ]
            .into_iter()
            .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn de_novo_scenario() -> Result<(), anyhow::Error> {
        let case = trio_case("trio");
        let mut store = MemVariantStore::default();
        store.insert(
            "trio",
            vec![
                record(("1", 1), 100, "G1", Genotype::Het, Genotype::HomRef, Genotype::HomRef),
                record(("1", 1), 200, "G1", Genotype::Het, Genotype::Het, Genotype::HomRef),
            ],
        );
        let xref = InMemoryGeneXref::default();
        let results = MemResultSetStore::default();
        let executor = QueryExecutor {
            store: &store,
            xref: &xref,
            results: &results,
            conservation: None,
        };

        let (rows, stats) = executor.run(std::slice::from_ref(&case), &de_novo_query())?;

        assert_eq!(stats.count_total, 2);
        assert_eq!(stats.count_passed, 1);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].record.start, 100);

        Ok(())
    }

    #[test]
    fn cohort_union_keeps_canonical_order() -> Result<(), anyhow::Error> {
        let case_a = trio_case("case-a");
        let case_b = trio_case("case-b");
        let mut store = MemVariantStore::default();
        // case-a has hits on chr2 and chrX, case-b on chr1 and chr2.
        store.insert(
            "case-a",
            vec![
                record(("X", 23), 50, "G1", Genotype::Het, Genotype::HomRef, Genotype::HomRef),
                record(("2", 2), 300, "G1", Genotype::Het, Genotype::HomRef, Genotype::HomRef),
            ],
        );
        store.insert(
            "case-b",
            vec![
                record(("2", 2), 100, "G1", Genotype::Het, Genotype::HomRef, Genotype::HomRef),
                record(("1", 1), 900, "G1", Genotype::Het, Genotype::HomRef, Genotype::HomRef),
            ],
        );
        let xref = InMemoryGeneXref::default();
        let results = MemResultSetStore::default();
        let executor = QueryExecutor {
            store: &store,
            xref: &xref,
            results: &results,
            conservation: None,
        };

        let (rows, _stats) =
            executor.run(&[case_a.clone(), case_b.clone()], &de_novo_query())?;

        let order: Vec<(i32, i32, &str)> = rows
            .iter()
            .map(|row| (row.record.chrom_no, row.record.start, row.case_name.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                (1, 900, "case-b"),
                (2, 100, "case-b"),
                (2, 300, "case-a"),
                (23, 50, "case-a"),
            ]
        );

        Ok(())
    }

    #[test]
    fn run_is_deterministic() -> Result<(), anyhow::Error> {
        let case = trio_case("trio");
        let mut store = MemVariantStore::default();
        store.insert(
            "trio",
            vec![
                record(("2", 2), 300, "G1", Genotype::Het, Genotype::HomRef, Genotype::HomRef),
                record(("1", 1), 100, "G1", Genotype::Het, Genotype::HomRef, Genotype::HomRef),
                record(("1", 1), 50, "G1", Genotype::Het, Genotype::HomRef, Genotype::HomRef),
            ],
        );
        let xref = InMemoryGeneXref::default();
        let results = MemResultSetStore::default();
        let executor = QueryExecutor {
            store: &store,
            xref: &xref,
            results: &results,
            conservation: None,
        };

        let (first, _) = executor.run(std::slice::from_ref(&case), &de_novo_query())?;
        let (second, _) = executor.run(std::slice::from_ref(&case), &de_novo_query())?;

        assert_eq!(first, second);
        let starts: Vec<i32> = first.iter().map(|row| row.record.start).collect();
        assert_eq!(starts, vec![50, 100, 300]);

        Ok(())
    }

    #[test]
    fn result_rows_limit_applies_after_ordering() -> Result<(), anyhow::Error> {
        let case = trio_case("trio");
        let mut store = MemVariantStore::default();
        store.insert(
            "trio",
            vec![
                record(("2", 2), 300, "G1", Genotype::Het, Genotype::HomRef, Genotype::HomRef),
                record(("1", 1), 100, "G1", Genotype::Het, Genotype::HomRef, Genotype::HomRef),
            ],
        );
        let xref = InMemoryGeneXref::default();
        let results = MemResultSetStore::default();
        let executor = QueryExecutor {
            store: &store,
            xref: &xref,
            results: &results,
            conservation: None,
        };

        let query = CaseQuery {
            result_rows_limit: Some(1),
            ..de_novo_query()
        };
        let (rows, stats) = executor.run(std::slice::from_ref(&case), &query)?;

        assert_eq!(stats.count_passed, 1);
        assert_eq!(rows[0].record.chrom_no, 1);

        Ok(())
    }

    #[test]
    fn compound_het_selection_per_case() -> Result<(), anyhow::Error> {
        let case = trio_case("trio");
        let mut store = MemVariantStore::default();
        store.insert(
            "trio",
            vec![
                record(("1", 1), 100, "G1", Genotype::Het, Genotype::Het, Genotype::HomRef),
                record(("1", 1), 200, "G1", Genotype::Het, Genotype::HomRef, Genotype::Het),
                record(("1", 1), 300, "G2", Genotype::Het, Genotype::Het, Genotype::HomRef),
            ],
        );
        let xref = InMemoryGeneXref::default();
        let results = MemResultSetStore::default();
        let executor = QueryExecutor {
            store: &store,
            xref: &xref,
            results: &results,
            conservation: None,
        };

        let query = CaseQuery {
            compound_recessive_indices: vec![(String::from("trio"), String::from("child"))]
                .into_iter()
                .collect(),
            ..Default::default()
        };
        let (rows, _stats) = executor.run(std::slice::from_ref(&case), &query)?;

        let starts: Vec<i32> = rows.iter().map(|row| row.record.start).collect();
        assert_eq!(starts, vec![100, 200]);

        Ok(())
    }

    #[test]
    fn prefetch_round_trip() -> Result<(), anyhow::Error> {
        let case = trio_case("trio");
        let mut store = MemVariantStore::default();
        store.insert(
            "trio",
            vec![
                record(("1", 1), 100, "G1", Genotype::Het, Genotype::HomRef, Genotype::HomRef),
                record(("2", 2), 200, "G1", Genotype::Het, Genotype::HomRef, Genotype::HomRef),
                record(("1", 1), 300, "G1", Genotype::HomRef, Genotype::HomRef, Genotype::HomRef),
            ],
        );
        let xref = InMemoryGeneXref::default();
        let results = MemResultSetStore::default();
        let executor = QueryExecutor {
            store: &store,
            xref: &xref,
            results: &results,
            conservation: None,
        };

        let (result, rows) =
            executor.materialize("trio", std::slice::from_ref(&case), &de_novo_query())?;
        let reloaded = executor.reload(result.sodar_uuid, std::slice::from_ref(&case))?;

        assert_eq!(reloaded, rows);
        let keys: Vec<String> = result
            .result_keys
            .iter()
            .map(|key| key.variant.to_string())
            .collect();
        assert_eq!(keys, vec!["GRCh37-1-100-A-T", "GRCh37-2-200-A-T"]);

        Ok(())
    }

    #[test]
    fn reload_unknown_job_is_fatal() {
        let store = MemVariantStore::default();
        let xref = InMemoryGeneXref::default();
        let results = MemResultSetStore::default();
        let executor = QueryExecutor {
            store: &store,
            xref: &xref,
            results: &results,
            conservation: None,
        };

        assert!(executor.reload(uuid::Uuid::new_v4(), &[]).is_err());
    }

    #[test]
    fn missing_variant_set_is_fatal() {
        let store = MemVariantStore::default();
        let xref = InMemoryGeneXref::default();
        let results = MemResultSetStore::default();
        let executor = QueryExecutor {
            store: &store,
            xref: &xref,
            results: &results,
            conservation: None,
        };

        assert!(executor
            .run(&[trio_case("trio")], &CaseQuery::default())
            .is_err());
    }
}
