//! Supporting code for query definition.
//!
//! Queries are represented as a serde JSON value object whose `Default`
//! makes all variants pass; individual options tighten the filter.

use indexmap::IndexMap;

use super::data::{Genotype, Pathogenicity, ReviewStatus, VariantEffect};

/// Transcript database to evaluate annotation against.
#[derive(
    serde::Serialize,
    serde::Deserialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Debug,
    Clone,
    Copy,
    Default,
)]
pub enum Database {
    /// RefSeq.
    #[default]
    #[serde(rename = "refseq")]
    Refseq,
    /// ENSEMBL.
    #[serde(rename = "ensembl")]
    Ensembl,
}

/// Choices for failing quality thresholds on genotypes.
#[derive(
    serde::Serialize,
    serde::Deserialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Debug,
    Clone,
    Copy,
    Default,
)]
pub enum FailChoice {
    /// Ignore failure.
    #[default]
    #[serde(rename = "ignore")]
    Ignore,
    /// Drop whole variant.
    #[serde(rename = "drop-variant")]
    Drop,
    /// Interpret as "no-call".
    #[serde(rename = "no-call")]
    NoCall,
}

/// Choice for genotype.
#[derive(
    serde::Serialize,
    serde::Deserialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Debug,
    Clone,
    Copy,
    Default,
    strum::EnumIter,
)]
pub enum GenotypeChoice {
    /// Any genotype.
    #[default]
    #[serde(rename = "any")]
    Any,
    /// Ref. genotype.
    #[serde(rename = "ref")]
    Ref,
    /// Het. genotype.
    #[serde(rename = "het")]
    Het,
    /// Hom. genotype.
    #[serde(rename = "hom")]
    Hom,
    /// Variant genotype.
    #[serde(rename = "variant")]
    Variant,
    /// Non-hom. genotype.
    #[serde(rename = "non-hom")]
    NonHom,
    /// Non-variant genotype.
    #[serde(rename = "non-variant")]
    NonVariant,
    /// Non-reference genotype.
    #[serde(rename = "non-reference")]
    NonReference,
}

impl GenotypeChoice {
    /// Whether the choice matches the given genotype call.
    ///
    /// The mapping is total over the genotype universe; the complement
    /// patterns and `any` also match hemizygous and no-call genotypes.
    pub fn matches(self, genotype: Genotype) -> bool {
        match self {
            GenotypeChoice::Any => true,
            GenotypeChoice::Ref => matches!(genotype, Genotype::HomRef),
            GenotypeChoice::Het => matches!(genotype, Genotype::Het),
            GenotypeChoice::Hom => matches!(genotype, Genotype::HomAlt),
            GenotypeChoice::Variant => matches!(genotype, Genotype::Het | Genotype::HomAlt),
            GenotypeChoice::NonHom => !matches!(genotype, Genotype::HomAlt),
            GenotypeChoice::NonVariant => !matches!(genotype, Genotype::Het | Genotype::HomAlt),
            GenotypeChoice::NonReference => !matches!(genotype, Genotype::HomRef),
        }
    }
}

/// Quality settings for one sample.
#[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug, Clone, Default)]
#[serde(default)]
pub struct QualitySettings {
    /// Minimal coverage for het. sites.
    pub dp_het: Option<i32>,
    /// Minimal coverage for hom. sites.
    pub dp_hom: Option<i32>,
    /// Minimal genotype quality.
    pub gq: Option<i32>,
    /// Minimal allele balance.
    pub ab: Option<f32>,
    /// Minimal number of alternate reads.
    pub ad: Option<i32>,
    /// Maximal number of alternate reads.
    pub ad_max: Option<i32>,
    /// Behaviour on failing quality thresholds.
    pub fail: FailChoice,
}

/// Data structure to hold a half-open `[start, end)` range.
#[derive(
    serde::Serialize, serde::Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone,
)]
pub struct Range {
    /// Start of range.
    pub start: i32,
    /// End of range (exclusive).
    pub end: i32,
}

/// Data structure to hold a genomic region.
#[derive(
    serde::Serialize, serde::Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone,
)]
pub struct GenomicRegion {
    /// Chromosome.
    pub chrom: String,
    /// Range of region; the whole chromosome if absent.
    pub range: Option<Range>,
}

/// Frequency/count ceilings for one nuclear-DNA source.
#[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug, Clone, Default)]
#[serde(default)]
pub struct NuclearFrequencySettings {
    /// Whether to enable filtration by the source.
    pub enabled: bool,
    /// Maximal allele frequency.
    pub frequency: Option<f32>,
    /// Maximal number of heterozygous carriers.
    pub heterozygous: Option<i32>,
    /// Maximal number of homozygous carriers.
    pub homozygous: Option<i32>,
    /// Maximal number of hemizygous carriers.
    pub hemizygous: Option<i32>,
}

/// Frequency/count ceilings for one mitochondrial source.
#[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug, Clone, Default)]
#[serde(default)]
pub struct MitochondrialFrequencySettings {
    /// Whether to enable filtration by the source.
    pub enabled: bool,
    /// Maximal allele frequency.
    pub frequency: Option<f32>,
    /// Maximal number of heteroplasmic carriers.
    pub heteroplasmic: Option<i32>,
    /// Maximal number of homoplasmic carriers.
    pub homoplasmic: Option<i32>,
}

/// Count ceilings for the in-house cohort.
#[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug, Clone, Default)]
#[serde(default)]
pub struct InHouseFrequencySettings {
    /// Whether to enable filtration by the in-house cohort.
    pub enabled: bool,
    /// Maximal number of carriers.
    pub carriers: Option<i32>,
    /// Maximal number of heterozygous carriers.
    pub heterozygous: Option<i32>,
    /// Maximal number of homozygous carriers.
    pub homozygous: Option<i32>,
    /// Maximal number of hemizygous carriers.
    pub hemizygous: Option<i32>,
}

/// Frequency settings for all configured sources.
#[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug, Clone, Default)]
#[serde(default)]
pub struct FrequencySettings {
    /// ExAC.
    pub exac: NuclearFrequencySettings,
    /// 1000 Genomes.
    pub thousand_genomes: NuclearFrequencySettings,
    /// gnomAD exomes.
    pub gnomad_exomes: NuclearFrequencySettings,
    /// gnomAD genomes.
    pub gnomad_genomes: NuclearFrequencySettings,
    /// HelixMtDb.
    pub helixmtdb: MitochondrialFrequencySettings,
    /// MITOMAP.
    pub mitomap: MitochondrialFrequencySettings,
    /// In-house cohort.
    pub inhouse: InHouseFrequencySettings,
}

/// Selection of ClinVar review statuses.
#[derive(serde::Serialize, serde::Deserialize, PartialEq, Eq, Debug, Clone)]
#[serde(default)]
pub struct ClinVarStatusSettings {
    /// Practice guideline.
    pub practice_guideline: bool,
    /// Reviewed by expert panel.
    pub expert_panel: bool,
    /// Criteria provided, multiple submitters, no conflicts.
    pub multiple_no_conflict: bool,
    /// Criteria provided, conflicting interpretations.
    pub conflict: bool,
    /// Criteria provided, single submitter.
    pub single: bool,
    /// No assertion criteria provided.
    pub no_criteria: bool,
    /// No assertion provided.
    pub no_assertion: bool,
}

impl Default for ClinVarStatusSettings {
    fn default() -> Self {
        Self {
            practice_guideline: true,
            expert_panel: true,
            multiple_no_conflict: true,
            conflict: true,
            single: true,
            no_criteria: true,
            no_assertion: true,
        }
    }
}

impl ClinVarStatusSettings {
    /// Whether submissions with the given review status are selected.
    pub fn includes(&self, status: ReviewStatus) -> bool {
        match status {
            ReviewStatus::PracticeGuideline => self.practice_guideline,
            ReviewStatus::ExpertPanel => self.expert_panel,
            ReviewStatus::MultipleNoConflict => self.multiple_no_conflict,
            ReviewStatus::Conflict => self.conflict,
            ReviewStatus::Single => self.single,
            ReviewStatus::NoCriteria => self.no_criteria,
            ReviewStatus::NoAssertion => self.no_assertion,
        }
    }
}

/// Selection of values of one valued user flag.
#[derive(serde::Serialize, serde::Deserialize, PartialEq, Eq, Debug, Clone)]
#[serde(default)]
pub struct FlagValueSettings {
    /// Select positive values.
    pub positive: bool,
    /// Select negative values.
    pub negative: bool,
    /// Select uncertain values.
    pub uncertain: bool,
    /// Select empty values (including variants without a flag record).
    pub empty: bool,
}

impl Default for FlagValueSettings {
    fn default() -> Self {
        Self {
            positive: true,
            negative: true,
            uncertain: true,
            empty: true,
        }
    }
}

impl FlagValueSettings {
    /// Whether the given flag value is selected.
    pub fn selects(&self, value: super::data::FlagValue) -> bool {
        match value {
            super::data::FlagValue::Positive => self.positive,
            super::data::FlagValue::Negative => self.negative,
            super::data::FlagValue::Uncertain => self.uncertain,
            super::data::FlagValue::Empty => self.empty,
        }
    }

    /// Whether any value of the flag is selected.
    pub fn any_selected(&self) -> bool {
        self.positive || self.negative || self.uncertain || self.empty
    }
}

/// Selection of user flags; requested predicates are OR-combined.
#[derive(serde::Serialize, serde::Deserialize, PartialEq, Eq, Debug, Clone)]
#[serde(default)]
pub struct FlagSettings {
    /// Bookmarked.
    pub bookmarked: bool,
    /// Candidate variant.
    pub candidate: bool,
    /// Final causative variant.
    pub final_causative: bool,
    /// Selected for validation.
    pub for_validation: bool,
    /// Incidental finding.
    pub incidental: bool,
    /// No known disease association.
    pub no_disease_association: bool,
    /// Segregates with the phenotype.
    pub segregates: bool,
    /// Does not segregate with the phenotype.
    pub doesnt_segregate: bool,
    /// All simple flags false or absent.
    pub simple_empty: bool,
    /// Visual inspection flag values.
    pub visual: FlagValueSettings,
    /// Validation result flag values.
    pub validation: FlagValueSettings,
    /// Phenotype match flag values.
    pub phenotype_match: FlagValueSettings,
    /// Summary flag values.
    pub summary: FlagValueSettings,
}

impl Default for FlagSettings {
    fn default() -> Self {
        Self {
            bookmarked: true,
            candidate: true,
            final_causative: true,
            for_validation: true,
            incidental: true,
            no_disease_association: true,
            segregates: true,
            doesnt_segregate: true,
            simple_empty: true,
            visual: Default::default(),
            validation: Default::default(),
            phenotype_match: Default::default(),
            summary: Default::default(),
        }
    }
}

impl FlagSettings {
    /// Whether any flag option is selected at all.
    pub fn any_selected(&self) -> bool {
        self.bookmarked
            || self.candidate
            || self.final_causative
            || self.for_validation
            || self.incidental
            || self.no_disease_association
            || self.segregates
            || self.doesnt_segregate
            || self.simple_empty
            || self.visual.any_selected()
            || self.validation.any_selected()
            || self.phenotype_match.any_selected()
            || self.summary.any_selected()
    }
}

/// Data structure with a single query.
#[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug, Clone)]
#[serde(default)]
pub struct CaseQuery {
    /// Transcript database to evaluate annotation against.
    pub database_select: Database,

    /// Whether to include SNVs.
    pub var_type_snv: bool,
    /// Whether to include MNVs.
    pub var_type_mnv: bool,
    /// Whether to include indels.
    pub var_type_indel: bool,

    /// Effects to consider.
    pub effects: Vec<VariantEffect>,
    /// Maximal distance to next exon, if any.
    pub max_exon_dist: Option<i32>,
    /// Whether to include coding transcripts.
    pub transcripts_coding: bool,
    /// Whether to include non-coding transcripts.
    pub transcripts_noncoding: bool,

    /// List of gene symbols, Entrez IDs, or ENSEMBL gene IDs to restrict
    /// the resulting variants to.
    pub gene_allowlist: Option<Vec<String>>,
    /// List of gene symbols, Entrez IDs, or ENSEMBL gene IDs to remove
    /// from the resulting variants.
    pub gene_blocklist: Option<Vec<String>>,
    /// List of genomic regions to restrict the resulting variants to.
    pub genomic_regions: Option<Vec<GenomicRegion>>,

    /// Frequency settings for all sources.
    pub frequency: FrequencySettings,

    /// Quality settings for each individual.
    pub quality: IndexMap<String, QualitySettings>,
    /// Genotype choice for each individual.
    pub genotype: IndexMap<String, Option<GenotypeChoice>>,

    /// Index sample for homozygous recessive filtration, by case name.
    pub recessive_indices: IndexMap<String, String>,
    /// Index sample for compound heterozygous filtration, by case name.
    pub compound_recessive_indices: IndexMap<String, String>,

    /// Whether to require ClinVar membership.
    pub require_in_clinvar: bool,
    /// Whether to include benign ClinVar variants.
    pub clinvar_include_benign: bool,
    /// Whether to include likely benign ClinVar variants.
    pub clinvar_include_likely_benign: bool,
    /// Whether to include uncertain significance ClinVar variants.
    pub clinvar_include_uncertain_significance: bool,
    /// Whether to include likely pathogenic ClinVar variants.
    pub clinvar_include_likely_pathogenic: bool,
    /// Whether to include pathogenic ClinVar variants.
    pub clinvar_include_pathogenic: bool,
    /// Whether to exclude variants with conflicting interpretations.
    pub clinvar_exclude_conflicting: bool,
    /// Whether to include germline-origin submissions.
    pub clinvar_origin_germline: bool,
    /// Whether to include somatic-origin submissions.
    pub clinvar_origin_somatic: bool,
    /// Selection of review statuses.
    pub clinvar_status: ClinVarStatusSettings,

    /// Whether to require membership in public HGMD.
    pub require_in_hgmd_public: bool,
    /// Whether to display public HGMD membership on output rows.
    pub display_hgmd_public_membership: bool,

    /// Selection of user flags.
    pub flags: FlagSettings,

    /// Maximal number of result rows.
    pub result_rows_limit: Option<usize>,
}

impl Default for CaseQuery {
    /// Returns default values for a `CaseQuery` which makes all variants pass.
    fn default() -> Self {
        Self {
            database_select: Default::default(),
            var_type_snv: true,
            var_type_mnv: true,
            var_type_indel: true,
            effects: VariantEffect::all(),
            max_exon_dist: Default::default(),
            transcripts_coding: true,
            transcripts_noncoding: true,
            gene_allowlist: Default::default(),
            gene_blocklist: Default::default(),
            genomic_regions: Default::default(),
            frequency: Default::default(),
            quality: Default::default(),
            genotype: Default::default(),
            recessive_indices: Default::default(),
            compound_recessive_indices: Default::default(),
            require_in_clinvar: Default::default(),
            clinvar_include_benign: true,
            clinvar_include_likely_benign: true,
            clinvar_include_uncertain_significance: true,
            clinvar_include_likely_pathogenic: true,
            clinvar_include_pathogenic: true,
            clinvar_exclude_conflicting: Default::default(),
            clinvar_origin_germline: true,
            clinvar_origin_somatic: true,
            clinvar_status: Default::default(),
            require_in_hgmd_public: Default::default(),
            display_hgmd_public_membership: Default::default(),
            flags: Default::default(),
            result_rows_limit: Default::default(),
        }
    }
}

impl CaseQuery {
    /// Whether variants of the given aggregated pathogenicity bucket are
    /// requested.
    pub fn clinvar_include(&self, pathogenicity: Pathogenicity) -> bool {
        match pathogenicity {
            Pathogenicity::Benign => self.clinvar_include_benign,
            Pathogenicity::LikelyBenign => self.clinvar_include_likely_benign,
            Pathogenicity::UncertainSignificance => self.clinvar_include_uncertain_significance,
            Pathogenicity::LikelyPathogenic => self.clinvar_include_likely_pathogenic,
            Pathogenicity::Pathogenic => self.clinvar_include_pathogenic,
        }
    }
}
