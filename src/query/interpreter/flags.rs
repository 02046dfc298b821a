//! User flag filter.

use crate::query::schema::data::{VariantFlags, VariantRecord};
use crate::query::schema::query::CaseQuery;

/// Determine whether the record passes the flags filter.
///
/// All requested flag predicates are OR-combined; at least one match
/// suffices.  A query with no selected flag option at all imposes no
/// restriction.  The `empty` value of a valued flag also matches variants
/// without any flag record.
pub fn passes(query: &CaseQuery, record: &VariantRecord) -> bool {
    let settings = &query.flags;
    if !settings.any_selected() {
        return true;
    }

    let fallback = VariantFlags::default();
    let flags = record.flags.as_ref().unwrap_or(&fallback);

    let result = settings.bookmarked && flags.bookmarked
        || settings.candidate && flags.candidate
        || settings.final_causative && flags.final_causative
        || settings.for_validation && flags.for_validation
        || settings.incidental && flags.incidental
        || settings.no_disease_association && flags.no_disease_association
        || settings.segregates && flags.segregates
        || settings.doesnt_segregate && flags.doesnt_segregate
        || settings.simple_empty && flags.no_simple_flag_set()
        || settings.visual.selects(flags.visual)
        || settings.validation.selects(flags.validation)
        || settings.phenotype_match.selects(flags.phenotype_match)
        || settings.summary.selects(flags.summary);
    if !result {
        tracing::trace!("variant {} fails flags filter", record.key());
    }
    result
}
