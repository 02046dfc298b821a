//! Per-sample genotype terms with quality thresholds and fail policy.

use crate::query::schema::data::{CallInfo, Genotype, VariantRecord};
use crate::query::schema::query::{CaseQuery, FailChoice, GenotypeChoice, QualitySettings};

/// Error type for genotype term evaluation.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Genotype data for a constrained sample is missing from a record.
    #[error("no call information for sample {sample} at {key}")]
    MissingCallInfo {
        /// Name of the sample.
        sample: String,
        /// Key of the record.
        key: String,
    },
}

/// One compiled per-sample term: a genotype pattern combined with the
/// sample's quality thresholds under its fail policy.
///
/// - `ignore`: the quality thresholds are not evaluated,
/// - `drop-variant`: the term is `quality AND genotype`,
/// - `no-call`: the term is `NOT quality OR genotype`, i.e. calls failing
///   quality are silenced rather than excluded.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleTerm {
    /// Name of the sample the term applies to.
    pub sample: String,
    /// Requested genotype pattern.
    pub genotype: GenotypeChoice,
    /// Quality thresholds and fail policy.
    pub quality: QualitySettings,
}

impl SampleTerm {
    /// Build the term for one sample, taking the quality settings from the
    /// query (samples without settings get the defaults, fail = ignore).
    pub fn new(query: &CaseQuery, sample: &str, genotype: GenotypeChoice) -> Self {
        Self {
            sample: sample.to_string(),
            genotype,
            quality: query.quality.get(sample).cloned().unwrap_or_default(),
        }
    }

    /// Evaluate the term on one record.
    pub fn passes(&self, record: &VariantRecord) -> Result<bool, Error> {
        let call_info =
            record
                .call_infos
                .get(&self.sample)
                .ok_or_else(|| Error::MissingCallInfo {
                    sample: self.sample.clone(),
                    key: record.key().to_string(),
                })?;
        let genotype_ok = self.genotype.matches(call_info.genotype);
        Ok(match self.quality.fail {
            FailChoice::Ignore => genotype_ok,
            FailChoice::Drop => quality_passes(&self.quality, call_info) && genotype_ok,
            FailChoice::NoCall => !quality_passes(&self.quality, call_info) || genotype_ok,
        })
    }
}

/// Compile the flat per-sample terms of the query; samples without a
/// genotype choice are unconstrained and yield no term.
pub fn compile(query: &CaseQuery) -> Vec<SampleTerm> {
    query
        .genotype
        .iter()
        .filter_map(|(sample, choice)| choice.map(|choice| SampleTerm::new(query, sample, choice)))
        .collect()
}

/// Determine whether the record passes the conjunction of the given terms.
pub fn passes_all(terms: &[SampleTerm], record: &VariantRecord) -> Result<bool, Error> {
    for term in terms {
        if !term.passes(record)? {
            tracing::trace!(
                "variant {} fails genotype term for sample {}",
                record.key(),
                &term.sample
            );
            return Ok(false);
        }
    }
    Ok(true)
}

/// Determine whether the record passes the flat genotype filter of the query.
pub fn passes(query: &CaseQuery, record: &VariantRecord) -> Result<bool, Error> {
    passes_all(&compile(query), record)
}

/// Whether the call satisfies all quality thresholds of the settings.
///
/// Depth is checked against `dp_het` for het calls and against `dp_hom` for
/// hom and hemi calls; `ad`/`ad_max` only apply to non-reference calls and
/// allele balance only to het calls with positive depth.
fn quality_passes(settings: &QualitySettings, call_info: &CallInfo) -> bool {
    match call_info.genotype {
        Genotype::Het => {
            if let (Some(dp_het), Some(dp)) = (settings.dp_het, call_info.dp) {
                if dp < dp_het {
                    return false;
                }
            }

            if let (Some(settings_ab), Some(dp), Some(ad)) =
                (settings.ab, call_info.dp, call_info.ad)
            {
                if dp > 0 {
                    let ab_raw = ad as f64 / dp as f64;
                    let ab = if ab_raw > 0.5 { 1.0 - ab_raw } else { ab_raw };
                    let eps = 1e-6f64;
                    if ab + eps < settings_ab as f64 {
                        return false;
                    }
                }
            }
        }
        Genotype::HomAlt | Genotype::Hemi => {
            if let (Some(dp_hom), Some(dp)) = (settings.dp_hom, call_info.dp) {
                if dp < dp_hom {
                    return false;
                }
            }
        }
        Genotype::HomRef | Genotype::Missing => (),
    }

    if let (Some(settings_gq), Some(gq)) = (settings.gq, call_info.gq) {
        if gq < settings_gq {
            return false;
        }
    }

    if !matches!(call_info.genotype, Genotype::HomRef) {
        if let (Some(settings_ad), Some(ad)) = (settings.ad, call_info.ad) {
            if ad < settings_ad {
                return false;
            }
        }
        if let (Some(settings_ad_max), Some(ad)) = (settings.ad_max, call_info.ad) {
            if ad > settings_ad_max {
                return false;
            }
        }
    }

    true
}

#[cfg(test)]
mod test {
    use rstest::rstest;

    use super::*;
    use crate::query::schema::data::{CallInfo, Genotype, VariantRecord};
    use crate::query::schema::query::{
        CaseQuery, FailChoice, GenotypeChoice, QualitySettings,
    };

    fn record_with_call(sample: &str, call_info: CallInfo) -> VariantRecord {
        VariantRecord {
            call_infos: vec![(sample.to_string(), call_info)].into_iter().collect(),
            ..Default::default()
        }
    }

    #[rstest]
    // het, pass dp
    #[case(Some(10), None, None, None, None, None, Genotype::Het, None, Some(10), None, true)]
    // het, fail dp
    #[case(Some(10), None, None, None, None, None, Genotype::Het, None, Some(9), None, false)]
    // hom, pass dp
    #[case(None, Some(10), None, None, None, None, Genotype::HomAlt, None, Some(10), None, true)]
    // hom, fail dp
    #[case(None, Some(10), None, None, None, None, Genotype::HomAlt, None, Some(9), None, false)]
    // hemi uses the hom depth threshold
    #[case(None, Some(10), None, None, None, None, Genotype::Hemi, None, Some(9), None, false)]
    // pass gq
    #[case(None, None, Some(10), None, None, None, Genotype::Het, Some(10), None, None, true)]
    // fail gq
    #[case(None, None, Some(10), None, None, None, Genotype::Het, Some(9), None, None, false)]
    // het, pass ab lower
    #[case(None, None, None, Some(0.2), None, None, Genotype::Het, None, Some(100), Some(20), true)]
    // het, pass ab upper
    #[case(None, None, None, Some(0.2), None, None, Genotype::Het, None, Some(100), Some(80), true)]
    // het, fail ab lower
    #[case(None, None, None, Some(0.2), None, None, Genotype::Het, None, Some(100), Some(19), false)]
    // het, fail ab upper
    #[case(None, None, None, Some(0.2), None, None, Genotype::Het, None, Some(100), Some(81), false)]
    // hom, ab ignored
    #[case(None, None, None, Some(0.2), None, None, Genotype::HomAlt, None, Some(100), Some(100), true)]
    // het, ab skipped for zero depth
    #[case(None, None, None, Some(0.2), None, None, Genotype::Het, None, Some(0), Some(0), true)]
    // pass ad
    #[case(None, None, None, None, Some(10), None, Genotype::Het, None, None, Some(10), true)]
    // fail ad
    #[case(None, None, None, None, Some(10), None, Genotype::Het, None, None, Some(9), false)]
    // ref, ad not evaluated
    #[case(None, None, None, None, Some(10), None, Genotype::HomRef, None, None, Some(0), true)]
    // pass ad_max
    #[case(None, None, None, None, None, Some(10), Genotype::Het, None, None, Some(10), true)]
    // fail ad_max
    #[case(None, None, None, None, None, Some(10), Genotype::Het, None, None, Some(11), false)]
    // all none
    #[case(None, None, None, None, None, None, Genotype::Het, None, None, None, true)]
    #[allow(clippy::too_many_arguments)]
    fn quality_passes(
        #[case] q_dp_het: Option<i32>,
        #[case] q_dp_hom: Option<i32>,
        #[case] q_gq: Option<i32>,
        #[case] q_ab: Option<f32>,
        #[case] q_ad: Option<i32>,
        #[case] q_ad_max: Option<i32>,
        #[case] c_genotype: Genotype,
        #[case] c_gq: Option<i32>,
        #[case] c_dp: Option<i32>,
        #[case] c_ad: Option<i32>,
        #[case] expected: bool,
    ) {
        let settings = QualitySettings {
            dp_het: q_dp_het,
            dp_hom: q_dp_hom,
            gq: q_gq,
            ab: q_ab,
            ad: q_ad,
            ad_max: q_ad_max,
            fail: FailChoice::Drop,
        };
        let call_info = CallInfo {
            genotype: c_genotype,
            gq: c_gq,
            dp: c_dp,
            ad: c_ad,
        };

        assert_eq!(
            super::quality_passes(&settings, &call_info),
            expected,
            "settings: {:?}, call info: {:?}",
            settings,
            call_info
        );
    }

    #[rstest]
    // genotype matches, quality passes: all policies pass
    #[case(FailChoice::Ignore, true, true, true)]
    #[case(FailChoice::Drop, true, true, true)]
    #[case(FailChoice::NoCall, true, true, true)]
    // genotype matches, quality fails: drop-variant excludes, no-call keeps
    #[case(FailChoice::Ignore, false, true, true)]
    #[case(FailChoice::Drop, false, true, false)]
    #[case(FailChoice::NoCall, false, true, true)]
    // genotype mismatch, quality passes: always excluded
    #[case(FailChoice::Ignore, true, false, false)]
    #[case(FailChoice::Drop, true, false, false)]
    #[case(FailChoice::NoCall, true, false, false)]
    // genotype mismatch, quality fails: no-call silences the mismatch
    #[case(FailChoice::Ignore, false, false, false)]
    #[case(FailChoice::Drop, false, false, false)]
    #[case(FailChoice::NoCall, false, false, true)]
    fn fail_policy_composition(
        #[case] fail: FailChoice,
        #[case] quality_ok: bool,
        #[case] genotype_ok: bool,
        #[case] expected: bool,
    ) -> Result<(), Error> {
        let term = SampleTerm {
            sample: String::from("sample"),
            genotype: if genotype_ok {
                GenotypeChoice::Het
            } else {
                GenotypeChoice::Ref
            },
            quality: QualitySettings {
                gq: if quality_ok { None } else { Some(40) },
                fail,
                ..Default::default()
            },
        };
        let record = record_with_call(
            "sample",
            CallInfo {
                genotype: Genotype::Het,
                gq: Some(30),
                ..Default::default()
            },
        );

        assert_eq!(term.passes(&record)?, expected);

        Ok(())
    }

    #[test]
    fn missing_call_info_is_an_error() {
        let term = SampleTerm {
            sample: String::from("other"),
            genotype: GenotypeChoice::Any,
            quality: Default::default(),
        };
        let record = record_with_call("sample", Default::default());

        assert!(matches!(
            term.passes(&record),
            Err(Error::MissingCallInfo { .. })
        ));
    }

    #[test]
    fn de_novo_pattern() -> Result<(), Error> {
        let query = CaseQuery {
            genotype: vec![
                (String::from("child"), Some(GenotypeChoice::Het)),
                (String::from("father"), Some(GenotypeChoice::Ref)),
                (String::from("mother"), Some(GenotypeChoice::Ref)),
            ]
            .into_iter()
            .collect(),
            ..Default::default()
        };

        let mut record = VariantRecord {
            call_infos: vec![
                (
                    String::from("child"),
                    CallInfo {
                        genotype: Genotype::Het,
                        ..Default::default()
                    },
                ),
                (
                    String::from("father"),
                    CallInfo {
                        genotype: Genotype::HomRef,
                        ..Default::default()
                    },
                ),
                (
                    String::from("mother"),
                    CallInfo {
                        genotype: Genotype::HomRef,
                        ..Default::default()
                    },
                ),
            ]
            .into_iter()
            .collect(),
            ..Default::default()
        };

        assert!(super::passes(&query, &record)?);

        // The same pattern must reject an inherited variant.
        record.call_infos["father"] = CallInfo {
            genotype: Genotype::Het,
            ..Default::default()
        };
        assert!(!super::passes(&query, &record)?);

        Ok(())
    }

    #[test]
    fn unconstrained_sample_yields_no_term() {
        let query = CaseQuery {
            genotype: vec![
                (String::from("child"), Some(GenotypeChoice::Het)),
                (String::from("father"), None),
            ]
            .into_iter()
            .collect(),
            ..Default::default()
        };

        let terms = super::compile(&query);
        assert_eq!(terms.len(), 1);
        assert_eq!(terms[0].sample, "child");
    }
}
