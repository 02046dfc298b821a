//! ClinVar pathogenicity classification and membership filter.
//!
//! Aggregation always runs in "paranoid" mode: a pathogenicity label counts
//! for the variant if any submitter assigned it.

use std::collections::BTreeSet;

use crate::query::schema::data::{ClinVarSubmission, Pathogenicity, VariantOrigin, VariantRecord};
use crate::query::schema::query::CaseQuery;

/// Direction of a pathogenicity label, for conflict detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Direction {
    /// Benign or likely benign.
    Benign,
    /// Uncertain significance.
    Uncertain,
    /// Pathogenic or likely pathogenic.
    Pathogenic,
}

fn direction(pathogenicity: Pathogenicity) -> Direction {
    match pathogenicity {
        Pathogenicity::Benign | Pathogenicity::LikelyBenign => Direction::Benign,
        Pathogenicity::UncertainSignificance => Direction::Uncertain,
        Pathogenicity::Pathogenic | Pathogenicity::LikelyPathogenic => Direction::Pathogenic,
    }
}

/// Aggregated view over all ClinVar submissions of one variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Assessment {
    /// Union of the pathogenicity labels of all submissions.
    pub labels: BTreeSet<Pathogenicity>,
    /// Whether the labels span more than one direction.
    pub conflicting: bool,
}

impl Assessment {
    /// The most severe aggregated label, if any.
    pub fn max_significance(&self) -> Option<Pathogenicity> {
        self.labels.iter().max().copied()
    }
}

/// Aggregate the submissions of one variant; `None` when the variant has no
/// ClinVar submission at all.
pub fn assess(submissions: &[ClinVarSubmission]) -> Option<Assessment> {
    if submissions.is_empty() {
        return None;
    }
    let labels: BTreeSet<Pathogenicity> = submissions
        .iter()
        .flat_map(|submission| submission.pathogenicity.iter().copied())
        .collect();
    let directions: BTreeSet<Direction> = labels.iter().map(|&label| direction(label)).collect();
    Some(Assessment {
        conflicting: directions.len() >= 2,
        labels,
    })
}

/// Determine whether the record passes the ClinVar filter.
///
/// Without `require_in_clinvar` no restriction applies.  Otherwise the
/// variant needs at least one submission, must not be conflicting if
/// conflict exclusion is requested, must match at least one requested
/// pathogenicity bucket, and must satisfy the origin and review-status
/// conjuncts.
pub fn passes(query: &CaseQuery, record: &VariantRecord) -> bool {
    if !query.require_in_clinvar {
        return true;
    }

    let Some(assessment) = assess(&record.clinvar) else {
        tracing::trace!("variant {} has no ClinVar submission", record.key());
        return false;
    };

    if query.clinvar_exclude_conflicting && assessment.conflicting {
        tracing::trace!(
            "variant {} has conflicting interpretations {:?}",
            record.key(),
            &assessment.labels
        );
        return false;
    }

    let bucket_ok = assessment
        .labels
        .iter()
        .any(|&label| query.clinvar_include(label));
    let origin_ok = record.clinvar.iter().any(|submission| match submission.origin {
        VariantOrigin::Germline => query.clinvar_origin_germline,
        VariantOrigin::Somatic => query.clinvar_origin_somatic,
        VariantOrigin::Unknown => true,
    });
    let status_ok = record
        .clinvar
        .iter()
        .any(|submission| query.clinvar_status.includes(submission.review_status));

    let result = bucket_ok && origin_ok && status_ok;
    if !result {
        tracing::trace!(
            "variant {} fails ClinVar filter with labels {:?}",
            record.key(),
            &assessment.labels
        );
    }
    result
}
