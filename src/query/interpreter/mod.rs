//! Apply settings from a `CaseQuery` to `VariantRecord`s.

pub mod clinvar;
pub mod effects;
pub mod flags;
pub mod frequency;
pub mod genes;
pub mod genotype;
pub mod hgmd;
pub mod regions;

use crate::query::schema::data::VariantRecord;
use crate::query::schema::query::CaseQuery;

/// Hold the compiled form of one `CaseQuery` for application to many
/// variant records.
///
/// Filters that impose no restriction are compiled away (no gene predicate,
/// no genotype terms) rather than represented as a literal tautology.
#[derive(Debug)]
pub struct QueryInterpreter {
    /// The case query settings.
    pub query: CaseQuery,
    /// Compiled gene allow/block predicate, if the lists restrict anything.
    pub genes: Option<genes::GeneListPredicate>,
    /// Compiled flat per-sample genotype terms.
    pub sample_terms: Vec<genotype::SampleTerm>,
}

impl QueryInterpreter {
    /// Construct with the given query settings, resolving gene lists
    /// through the cross-reference collaborator.
    pub fn new(query: CaseQuery, xref: &dyn genes::GeneXref) -> Self {
        let genes = genes::compile(&query, xref);
        let sample_terms = genotype::compile(&query);
        QueryInterpreter {
            query,
            genes,
            sample_terms,
        }
    }

    /// Determine whether the record passes all annotation predicates, i.e.
    /// everything except the genotype terms.  The recessive engines run
    /// their own genotype stages on top of this.
    pub fn passes_annotation(&self, record: &VariantRecord) -> bool {
        frequency::passes(&self.query, record)
            && effects::passes(&self.query, record)
            && regions::passes(&self.query, record)
            && self
                .genes
                .as_ref()
                .map(|genes| genes.passes(self.query.database_select, record))
                .unwrap_or(true)
            && clinvar::passes(&self.query, record)
            && hgmd::passes(&self.query, record)
            && flags::passes(&self.query, record)
    }

    /// Determine whether the record passes the flat per-sample genotype
    /// conjunction.
    pub fn passes_genotype(&self, record: &VariantRecord) -> Result<bool, genotype::Error> {
        genotype::passes_all(&self.sample_terms, record)
    }

    /// Determine whether the record passes all criteria of the query.
    pub fn passes(&self, record: &VariantRecord) -> Result<bool, genotype::Error> {
        Ok(self.passes_annotation(record) && self.passes_genotype(record)?)
    }
}
