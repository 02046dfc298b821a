//! Variant type, variant effect, and transcript-class filter.

use std::collections::BTreeSet;

use crate::query::schema::data::{VarType, VariantRecord};
use crate::query::schema::query::CaseQuery;

/// Determine whether the record passes the variant-type, effect, transcript
/// class, and exon-distance filters, evaluated on the annotation of the
/// selected transcript database.
pub fn passes(query: &CaseQuery, record: &VariantRecord) -> bool {
    let result = passes_var_type(query, record)
        && passes_transcript_class(query, record)
        && passes_effects(query, record)
        && passes_exon_dist(query, record);
    if !result {
        tracing::trace!("variant {} fails effect filter", record.key());
    }
    result
}

fn passes_var_type(query: &CaseQuery, record: &VariantRecord) -> bool {
    match record.var_type {
        VarType::Snv => query.var_type_snv,
        VarType::Mnv => query.var_type_mnv,
        VarType::Indel => query.var_type_indel,
    }
}

fn passes_transcript_class(query: &CaseQuery, record: &VariantRecord) -> bool {
    if record.annotation(query.database_select).transcript_coding {
        query.transcripts_coding
    } else {
        query.transcripts_noncoding
    }
}

/// Whether the requested effects overlap the annotated effects.  An empty
/// requested set imposes no restriction.
fn passes_effects(query: &CaseQuery, record: &VariantRecord) -> bool {
    if query.effects.is_empty() {
        return true;
    }
    let requested = BTreeSet::from_iter(query.effects.iter().cloned());
    let annotated = BTreeSet::from_iter(
        record
            .annotation(query.database_select)
            .effects
            .iter()
            .cloned(),
    );
    requested.intersection(&annotated).count() > 0
}

fn passes_exon_dist(query: &CaseQuery, record: &VariantRecord) -> bool {
    if let Some(max_exon_dist) = query.max_exon_dist {
        record
            .annotation(query.database_select)
            .exon_dist
            .is_some_and(|exon_dist| exon_dist <= max_exon_dist)
    } else {
        true
    }
}

#[cfg(test)]
mod test {
    use rstest::rstest;

    use crate::query::schema::data::{
        TranscriptAnnotation, VarType, VariantEffect, VariantRecord,
    };
    use crate::query::schema::query::CaseQuery;

    fn record(
        var_type: VarType,
        effects: Vec<VariantEffect>,
        coding: bool,
        exon_dist: Option<i32>,
    ) -> VariantRecord {
        VariantRecord {
            var_type,
            refseq: TranscriptAnnotation {
                gene_id: Some(String::from("672")),
                effects,
                transcript_coding: coding,
                exon_dist,
            },
            ..Default::default()
        }
    }

    #[rstest]
    #[case(VarType::Snv, true, true, true, true)]
    #[case(VarType::Snv, false, true, true, false)]
    #[case(VarType::Mnv, true, false, true, false)]
    #[case(VarType::Indel, true, true, false, false)]
    fn var_type_selection(
        #[case] var_type: VarType,
        #[case] snv: bool,
        #[case] mnv: bool,
        #[case] indel: bool,
        #[case] expected: bool,
    ) {
        let query = CaseQuery {
            var_type_snv: snv,
            var_type_mnv: mnv,
            var_type_indel: indel,
            ..Default::default()
        };
        let record = record(
            var_type,
            vec![VariantEffect::MissenseVariant],
            true,
            None,
        );

        assert_eq!(super::passes(&query, &record), expected);
    }

    #[rstest]
    #[case(true, true, true, true)]
    #[case(true, false, true, false)]
    #[case(false, true, false, false)]
    #[case(false, true, true, true)]
    fn transcript_class_selection(
        #[case] record_coding: bool,
        #[case] transcripts_coding: bool,
        #[case] transcripts_noncoding: bool,
        #[case] expected: bool,
    ) {
        let query = CaseQuery {
            transcripts_coding,
            transcripts_noncoding,
            ..Default::default()
        };
        let record = record(
            VarType::Snv,
            vec![VariantEffect::MissenseVariant],
            record_coding,
            None,
        );

        assert_eq!(super::passes(&query, &record), expected);
    }

    #[rstest]
    #[case(vec![VariantEffect::MissenseVariant], vec![VariantEffect::MissenseVariant], true)]
    #[case(
        vec![VariantEffect::MissenseVariant, VariantEffect::StopGained],
        vec![VariantEffect::SynonymousVariant, VariantEffect::StopGained],
        true
    )]
    #[case(vec![VariantEffect::MissenseVariant], vec![VariantEffect::SynonymousVariant], false)]
    #[case(vec![], vec![VariantEffect::SynonymousVariant], true)]
    fn effect_overlap(
        #[case] requested: Vec<VariantEffect>,
        #[case] annotated: Vec<VariantEffect>,
        #[case] expected: bool,
    ) {
        let query = CaseQuery {
            effects: requested,
            ..Default::default()
        };
        let record = record(VarType::Snv, annotated, true, None);

        assert_eq!(super::passes(&query, &record), expected);
    }

    #[rstest]
    #[case(None, None, true)]
    #[case(Some(100), Some(50), true)]
    #[case(Some(100), Some(100), true)]
    #[case(Some(100), Some(101), false)]
    #[case(Some(100), None, false)]
    fn exon_dist_ceiling(
        #[case] max_exon_dist: Option<i32>,
        #[case] exon_dist: Option<i32>,
        #[case] expected: bool,
    ) {
        let query = CaseQuery {
            max_exon_dist,
            ..Default::default()
        };
        let record = record(
            VarType::Snv,
            vec![VariantEffect::MissenseVariant],
            true,
            exon_dist,
        );

        assert_eq!(super::passes(&query, &record), expected);
    }
}
