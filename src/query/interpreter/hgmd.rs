//! HGMD public membership filter.

use crate::query::schema::data::VariantRecord;
use crate::query::schema::query::CaseQuery;

/// Determine whether the record passes the HGMD membership filter.
pub fn passes(query: &CaseQuery, record: &VariantRecord) -> bool {
    if !query.require_in_hgmd_public {
        return true;
    }
    let result = record.hgmd.is_some();
    if !result {
        tracing::trace!("variant {} is not in public HGMD", record.key());
    }
    result
}

#[cfg(test)]
mod test {
    use rstest::rstest;

    use crate::query::schema::data::{HgmdRecord, VariantRecord};
    use crate::query::schema::query::CaseQuery;

    #[rstest]
    #[case(false, false, true)]
    #[case(false, true, true)]
    #[case(true, false, false)]
    #[case(true, true, true)]
    fn passes(#[case] require: bool, #[case] is_member: bool, #[case] expected: bool) {
        let query = CaseQuery {
            require_in_hgmd_public: require,
            ..Default::default()
        };
        let record = VariantRecord {
            hgmd: is_member.then(|| HgmdRecord {
                accession: String::from("CM000001"),
                variant_class: None,
            }),
            ..Default::default()
        };

        assert_eq!(super::passes(&query, &record), expected);
    }
}
