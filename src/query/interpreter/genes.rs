//! Gene allow/block list filter.

use std::collections::{HashMap, HashSet};

use crate::query::schema::data::VariantRecord;
use crate::query::schema::query::{CaseQuery, Database};

/// One row of the symbol/Entrez/ENSEMBL gene cross-reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GeneXrefEntry {
    /// Official gene symbol.
    pub symbol: String,
    /// Entrez gene ID.
    #[serde(default)]
    pub entrez_id: Option<String>,
    /// ENSEMBL gene ID.
    #[serde(default)]
    pub ensembl_gene_id: Option<String>,
}

/// Collaborator resolving a gene name (symbol, Entrez ID, or ENSEMBL gene
/// ID, interchangeably) to its cross-reference row.
pub trait GeneXref {
    /// Look up one name in any of the three namespaces.
    fn resolve(&self, name: &str) -> Option<&GeneXrefEntry>;
}

/// Cross-reference held in memory, indexed by all three namespaces.
#[derive(Debug, Default)]
pub struct InMemoryGeneXref {
    entries: Vec<GeneXrefEntry>,
    by_name: HashMap<String, usize>,
}

impl InMemoryGeneXref {
    /// Build the index over the given entries.
    pub fn new(entries: Vec<GeneXrefEntry>) -> Self {
        let mut by_name = HashMap::new();
        for (idx, entry) in entries.iter().enumerate() {
            by_name.insert(entry.symbol.to_uppercase(), idx);
            if let Some(entrez_id) = &entry.entrez_id {
                by_name.insert(entrez_id.to_uppercase(), idx);
            }
            if let Some(ensembl_gene_id) = &entry.ensembl_gene_id {
                by_name.insert(ensembl_gene_id.to_uppercase(), idx);
            }
        }
        Self { entries, by_name }
    }
}

impl GeneXref for InMemoryGeneXref {
    fn resolve(&self, name: &str) -> Option<&GeneXrefEntry> {
        self.by_name
            .get(&name.to_uppercase())
            .map(|&idx| &self.entries[idx])
    }
}

/// Compiled allow/block gene membership predicate.
#[derive(Debug, Clone, Default)]
pub struct GeneListPredicate {
    /// Identifiers of the allow list; `None` means no restriction.
    allow: Option<HashSet<String>>,
    /// Identifiers of the block list.
    block: HashSet<String>,
}

/// Compile the gene lists of the query; `None` when neither list imposes a
/// restriction.
pub fn compile(query: &CaseQuery, xref: &dyn GeneXref) -> Option<GeneListPredicate> {
    let allow = query
        .gene_allowlist
        .as_ref()
        .filter(|names| !names.is_empty())
        .map(|names| resolve_ids(names, xref));
    let block = query
        .gene_blocklist
        .as_ref()
        .filter(|names| !names.is_empty())
        .map(|names| resolve_ids(names, xref))
        .unwrap_or_default();

    if allow.is_none() && block.is_empty() {
        None
    } else {
        Some(GeneListPredicate { allow, block })
    }
}

/// Resolve the given names into the set of all their identifiers.  Names
/// that are not in the cross-reference are kept verbatim so that plain
/// gene-ID lists work without a cross-reference table.
fn resolve_ids(names: &[String], xref: &dyn GeneXref) -> HashSet<String> {
    let mut result = HashSet::new();
    for name in names {
        if let Some(entry) = xref.resolve(name) {
            result.insert(entry.symbol.to_uppercase());
            if let Some(entrez_id) = &entry.entrez_id {
                result.insert(entrez_id.to_uppercase());
            }
            if let Some(ensembl_gene_id) = &entry.ensembl_gene_id {
                result.insert(ensembl_gene_id.to_uppercase());
            }
        } else {
            tracing::warn!("gene {:?} not in cross-reference, using it verbatim", name);
            result.insert(name.to_uppercase());
        }
    }
    result
}

impl GeneListPredicate {
    /// Determine whether the record passes the gene lists, evaluated on the
    /// gene ID of the selected transcript database.
    pub fn passes(&self, database: Database, record: &VariantRecord) -> bool {
        let gene_id = record
            .annotation(database)
            .gene_id
            .as_ref()
            .map(|gene_id| gene_id.to_uppercase());
        let is_member = |set: &HashSet<String>| {
            gene_id
                .as_ref()
                .map(|gene_id| set.contains(gene_id))
                .unwrap_or(false)
        };

        if let Some(allow) = &self.allow {
            if !is_member(allow) {
                tracing::trace!("variant {} fails gene allow list", record.key());
                return false;
            }
        }
        if is_member(&self.block) {
            tracing::trace!("variant {} fails gene block list", record.key());
            return false;
        }
        true
    }
}
