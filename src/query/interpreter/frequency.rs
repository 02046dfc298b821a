//! Population frequency filter.

use crate::query::schema::data::{AlleleCounts, VariantRecord};
use crate::query::schema::query::{
    CaseQuery, InHouseFrequencySettings, MitochondrialFrequencySettings, NuclearFrequencySettings,
};

/// Determine whether the record passes all enabled frequency ceilings.
///
/// Thresholds of disabled sources are ignored entirely.  A source without
/// an annotation record for the variant carries all-zero counts and thus
/// passes every threshold of that source; this is a policy decision, not
/// an omission.
pub fn passes(query: &CaseQuery, record: &VariantRecord) -> bool {
    let settings = &query.frequency;
    let freqs = &record.population_frequencies;

    let result = nuclear_passes(&settings.exac, &freqs.exac)
        && nuclear_passes(&settings.thousand_genomes, &freqs.thousand_genomes)
        && nuclear_passes(&settings.gnomad_exomes, &freqs.gnomad_exomes)
        && nuclear_passes(&settings.gnomad_genomes, &freqs.gnomad_genomes)
        && mitochondrial_passes(&settings.helixmtdb, &freqs.helixmtdb)
        && mitochondrial_passes(&settings.mitomap, &freqs.mitomap)
        && inhouse_passes(&settings.inhouse, &freqs.inhouse);
    if !result {
        tracing::trace!(
            "variant {} fails frequency filter {:?}",
            record.key(),
            settings
        );
    }
    result
}

/// Whether the counts stay below the ceilings of one nuclear-DNA source.
fn nuclear_passes(
    settings: &NuclearFrequencySettings,
    counts: &impl AlleleCounts,
) -> bool {
    if !settings.enabled {
        return true;
    }
    !(settings.frequency.is_some_and(|max_af| counts.af() > max_af)
        || settings.heterozygous.is_some_and(|max_het| counts.het() > max_het)
        || settings.homozygous.is_some_and(|max_hom| counts.hom() > max_hom)
        || settings.hemizygous.is_some_and(|max_hemi| counts.hemi() > max_hemi))
}

/// Whether the counts stay below the ceilings of one mitochondrial source.
fn mitochondrial_passes(
    settings: &MitochondrialFrequencySettings,
    counts: &impl AlleleCounts,
) -> bool {
    if !settings.enabled {
        return true;
    }
    !(settings.frequency.is_some_and(|max_af| counts.af() > max_af)
        || settings
            .heteroplasmic
            .is_some_and(|max_het| counts.het() > max_het)
        || settings
            .homoplasmic
            .is_some_and(|max_hom| counts.hom() > max_hom))
}

/// Whether the counts stay below the ceilings of the in-house cohort.
fn inhouse_passes(settings: &InHouseFrequencySettings, counts: &impl AlleleCounts) -> bool {
    if !settings.enabled {
        return true;
    }
    !(settings
        .carriers
        .is_some_and(|max_carriers| counts.carriers() > max_carriers)
        || settings.heterozygous.is_some_and(|max_het| counts.het() > max_het)
        || settings.homozygous.is_some_and(|max_hom| counts.hom() > max_hom)
        || settings.hemizygous.is_some_and(|max_hemi| counts.hemi() > max_hemi))
}
