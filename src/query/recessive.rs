//! Compound-heterozygous and homozygous recessive genotype filtering.
//!
//! Compound-het filtering runs in three stages over records that already
//! passed the annotation predicates:
//!
//! 1. evaluate the paternal-phase and maternal-phase candidate terms on
//!    every record,
//! 2. union the candidates and count paternal/maternal hits per gene,
//! 3. keep the candidates of genes with at least one hit inherited from
//!    each side.
//!
//! Parent terms are omitted when the pedigree does not resolve the relative
//! (duo/singleton); this weakens phase resolution but preserves the
//! two-hits-per-gene requirement on the available relatives.

use std::collections::{BTreeSet, HashSet};

use multimap::MultiMap;

use crate::query::interpreter::genotype::{self, SampleTerm};
use crate::query::schema::data::{Case, PedigreeRole, VariantRecord};
use crate::query::schema::query::{CaseQuery, GenotypeChoice};

/// Error type for recessive filtering.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The configured index sample cannot be resolved from the pedigree.
    #[error("recessive index sample {sample} not in pedigree of case {case}")]
    UnknownIndexSample {
        /// Name of the sample.
        sample: String,
        /// Name of the case.
        case: String,
    },
    /// Genotype term evaluation failed.
    #[error(transparent)]
    Genotype(#[from] genotype::Error),
}

/// Phase of a heterozygous variant with respect to the parents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Phase {
    /// Inherited from the father.
    Paternal,
    /// Inherited from the mother.
    Maternal,
}

/// The index sample and its parents, as far as the pedigree resolves them.
#[derive(Debug, Clone)]
struct Trio {
    index: String,
    father: Option<String>,
    mother: Option<String>,
}

/// Resolve the index and parent samples by pedigree role.  An index sample
/// that is not in the pedigree is a fatal configuration error; an absent
/// parent entry omits the corresponding term.
fn resolve_trio(case: &Case, index_sample: &str) -> Result<Trio, Error> {
    if case.entry(index_sample).is_none() {
        return Err(Error::UnknownIndexSample {
            sample: index_sample.to_string(),
            case: case.name.clone(),
        });
    }
    Ok(Trio {
        index: index_sample.to_string(),
        father: case
            .sample_with_role(PedigreeRole::Father)
            .map(str::to_string),
        mother: case
            .sample_with_role(PedigreeRole::Mother)
            .map(str::to_string),
    })
}

/// The stage-1 candidate terms of both phases.
#[derive(Debug, Clone)]
struct PhaseTerms {
    paternal: Vec<SampleTerm>,
    maternal: Vec<SampleTerm>,
}

fn phase_terms(query: &CaseQuery, trio: &Trio) -> PhaseTerms {
    let mut paternal = vec![SampleTerm::new(query, &trio.index, GenotypeChoice::Het)];
    let mut maternal = vec![SampleTerm::new(query, &trio.index, GenotypeChoice::Het)];
    if let Some(father) = &trio.father {
        paternal.push(SampleTerm::new(query, father, GenotypeChoice::Het));
        maternal.push(SampleTerm::new(query, father, GenotypeChoice::Ref));
    }
    if let Some(mother) = &trio.mother {
        paternal.push(SampleTerm::new(query, mother, GenotypeChoice::Ref));
        maternal.push(SampleTerm::new(query, mother, GenotypeChoice::Het));
    }
    PhaseTerms { paternal, maternal }
}

/// Filter `records` down to the compound-heterozygous candidates of the
/// given index sample.
///
/// Every returned record belongs to a gene with at least one
/// paternal-phase and one maternal-phase candidate in this run; input
/// order is preserved.
pub fn compound_het_filter(
    query: &CaseQuery,
    case: &Case,
    index_sample: &str,
    records: Vec<VariantRecord>,
) -> Result<Vec<VariantRecord>, Error> {
    let trio = resolve_trio(case, index_sample)?;
    let terms = phase_terms(query, &trio);
    let database = query.database_select;

    // Stage 1: evaluate both phase terms on every record.  With an omitted
    // parent a record can be a candidate for both phases.
    let mut phases: Vec<BTreeSet<Phase>> = Vec::with_capacity(records.len());
    for record in &records {
        let mut record_phases = BTreeSet::new();
        if genotype::passes_all(&terms.paternal, record)? {
            record_phases.insert(Phase::Paternal);
        }
        if genotype::passes_all(&terms.maternal, record)? {
            record_phases.insert(Phase::Maternal);
        }
        phases.push(record_phases);
    }

    // Stage 2: union the candidates and partition them by gene.
    let mut by_gene: MultiMap<String, usize> = MultiMap::new();
    for (idx, record) in records.iter().enumerate() {
        if phases[idx].is_empty() {
            continue;
        }
        if let Some(gene_id) = record.annotation(database).gene_id.as_ref() {
            by_gene.insert(gene_id.clone(), idx);
        }
    }

    // Stage 3: a gene qualifies with at least one candidate from each side.
    let mut qualifying: HashSet<String> = HashSet::new();
    for (gene_id, idxs) in by_gene.iter_all() {
        let paternal = idxs
            .iter()
            .filter(|&&idx| phases[idx].contains(&Phase::Paternal))
            .count();
        let maternal = idxs
            .iter()
            .filter(|&&idx| phases[idx].contains(&Phase::Maternal))
            .count();
        if paternal > 0 && maternal > 0 {
            qualifying.insert(gene_id.clone());
        }
    }
    tracing::debug!(
        "compound het for case {}: {} of {} genes qualify",
        &case.name,
        qualifying.len(),
        by_gene.keys().count()
    );

    Ok(records
        .into_iter()
        .enumerate()
        .filter(|(idx, record)| {
            !phases[*idx].is_empty()
                && record
                    .annotation(database)
                    .gene_id
                    .as_ref()
                    .is_some_and(|gene_id| qualifying.contains(gene_id))
        })
        .map(|(_, record)| record)
        .collect())
}

/// Filter `records` with the plain homozygous recessive hypothesis: index
/// hom, both resolvable parents het.
pub fn recessive_filter(
    query: &CaseQuery,
    case: &Case,
    index_sample: &str,
    records: Vec<VariantRecord>,
) -> Result<Vec<VariantRecord>, Error> {
    let trio = resolve_trio(case, index_sample)?;
    let mut terms = vec![SampleTerm::new(query, &trio.index, GenotypeChoice::Hom)];
    if let Some(father) = &trio.father {
        terms.push(SampleTerm::new(query, father, GenotypeChoice::Het));
    }
    if let Some(mother) = &trio.mother {
        terms.push(SampleTerm::new(query, mother, GenotypeChoice::Het));
    }

    let mut result = Vec::new();
    for record in records {
        if genotype::passes_all(&terms, &record)? {
            result.push(record);
        }
    }
    Ok(result)
}
