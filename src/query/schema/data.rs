//! Code for representing annotated variant records, case structure, and the
//! side-table payloads joined onto records upstream.

use indexmap::IndexMap;

/// A single genotype call.
///
/// Genotypes are an explicit enumeration with fixed serde spellings; phased
/// forms are accepted on input and normalized away.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumIter,
)]
pub enum Genotype {
    /// Homozygous reference.
    #[serde(rename = "0/0", alias = "0|0", alias = "0")]
    #[strum(serialize = "0/0")]
    HomRef,
    /// Heterozygous.
    #[serde(rename = "0/1", alias = "1/0", alias = "0|1", alias = "1|0")]
    #[strum(serialize = "0/1")]
    Het,
    /// Homozygous alternative.
    #[serde(rename = "1/1", alias = "1|1")]
    #[strum(serialize = "1/1")]
    HomAlt,
    /// Hemizygous alternative.
    #[serde(rename = "1")]
    #[strum(serialize = "1")]
    Hemi,
    /// No-call.
    #[default]
    #[serde(rename = ".", alias = "./.", alias = ".|.")]
    #[strum(serialize = ".")]
    Missing,
}

/// Information on one genotype call of a sample.
///
/// Quality values are optional; thresholds only apply where a value is
/// present.  Allele balance is only defined for heterozygous calls with
/// positive depth.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CallInfo {
    /// The genotype call.
    pub genotype: Genotype,
    /// Genotype quality.
    pub gq: Option<i32>,
    /// Total read coverage at the site in the sample.
    pub dp: Option<i32>,
    /// Alternate allele depth in the sample.
    pub ad: Option<i32>,
}

/// Variant types.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
)]
pub enum VarType {
    /// Single nucleotide variant.
    #[default]
    #[serde(rename = "snv")]
    #[strum(serialize = "snv")]
    Snv,
    /// Multi nucleotide variant.
    #[serde(rename = "mnv")]
    #[strum(serialize = "mnv")]
    Mnv,
    /// Insertion/deletion.
    #[serde(rename = "indel")]
    #[strum(serialize = "indel")]
    Indel,
}

/// Variant effects.
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
    strum::EnumIter,
)]
pub enum VariantEffect {
    /// 3' UTR exon variant.
    #[serde(rename = "3_prime_UTR_exon_variant")]
    ThreePrimeUtrExonVariant,
    /// 3' UTR intron variant.
    #[serde(rename = "3_prime_UTR_intron_variant")]
    ThreePrimeUtrIntronVariant,
    /// 5' UTR exon variant.
    #[serde(rename = "5_prime_UTR_exon_variant")]
    FivePrimeUtrExonVariant,
    /// 5' UTR intron variant.
    #[serde(rename = "5_prime_UTR_intron_variant")]
    FivePrimeUtrIntronVariant,
    /// Coding transcript intron variant.
    #[serde(rename = "coding_transcript_intron_variant")]
    CodingTranscriptIntronVariant,
    /// Complex substitution.
    #[serde(rename = "complex_substitution")]
    ComplexSubstitution,
    /// Direct tandem duplication.
    #[serde(rename = "direct_tandem_duplication")]
    DirectTandemDuplication,
    /// Disruptive in-frame deletion.
    #[serde(rename = "disruptive_inframe_deletion")]
    DisruptiveInframeDeletion,
    /// Disruptive in-frame insertion.
    #[serde(rename = "disruptive_inframe_insertion")]
    DisruptiveInframeInsertion,
    /// Downstream gene variant.
    #[serde(rename = "downstream_gene_variant")]
    DownstreamGeneVariant,
    /// Exon loss variant.
    #[serde(rename = "exon_loss_variant")]
    ExonLossVariant,
    /// Feature truncation.
    #[serde(rename = "feature_truncation")]
    FeatureTruncation,
    /// Frameshift elongation.
    #[serde(rename = "frameshift_elongation")]
    FrameshiftElongation,
    /// Frameshift truncation.
    #[serde(rename = "frameshift_truncation")]
    FrameshiftTruncation,
    /// Frameshift variant.
    #[serde(rename = "frameshift_variant")]
    FrameshiftVariant,
    /// In-frame deletion.
    #[serde(rename = "inframe_deletion")]
    InframeDeletion,
    /// In-frame insertion.
    #[serde(rename = "inframe_insertion")]
    InframeInsertion,
    /// Intergenic variant.
    #[serde(rename = "intergenic_variant")]
    IntergenicVariant,
    /// Internal feature elongation.
    #[serde(rename = "internal_feature_elongation")]
    InternalFeatureElongation,
    /// Missense variant.
    #[serde(rename = "missense_variant")]
    MissenseVariant,
    /// MNV.
    #[serde(rename = "mnv")]
    Mnv,
    /// Non-coding transcript exon variant.
    #[serde(rename = "non_coding_transcript_exon_variant")]
    NonCodingTranscriptExonVariant,
    /// Non-coding transcript intron variant.
    #[serde(rename = "non_coding_transcript_intron_variant")]
    NonCodingTranscriptIntronVariant,
    /// Splice acceptor variant.
    #[serde(rename = "splice_acceptor_variant")]
    SpliceAcceptorVariant,
    /// Splice donor variant.
    #[serde(rename = "splice_donor_variant")]
    SpliceDonorVariant,
    /// Splice region variant.
    #[serde(rename = "splice_region_variant")]
    SpliceRegionVariant,
    /// Start lost.
    #[serde(rename = "start_lost")]
    StartLost,
    /// Stop gained.
    #[serde(rename = "stop_gained")]
    StopGained,
    /// Stop lost.
    #[serde(rename = "stop_lost")]
    StopLost,
    /// Stop retained variant.
    #[serde(rename = "stop_retained_variant")]
    StopRetainedVariant,
    /// Synonymous variant.
    #[serde(rename = "synonymous_variant")]
    SynonymousVariant,
    /// Transcript ablation.
    #[serde(rename = "transcript_ablation")]
    TranscriptAblation,
    /// Upstream gene variant.
    #[serde(rename = "upstream_gene_variant")]
    UpstreamGeneVariant,
}

impl VariantEffect {
    /// Return vector of all values of `VariantEffect`.
    pub fn all() -> Vec<Self> {
        use strum::IntoEnumIterator;
        Self::iter().collect()
    }
}

/// Annotation of a variant with respect to one transcript database.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TranscriptAnnotation {
    /// Gene identifier in the database's namespace, if any gene is hit.
    pub gene_id: Option<String>,
    /// Predicted effects on the most severe transcript.
    pub effects: Vec<VariantEffect>,
    /// Whether the annotated transcript is coding.
    pub transcript_coding: bool,
    /// Distance to the next exon, if any.
    pub exon_dist: Option<i32>,
}

/// Access to the allele counts of one frequency record.
///
/// Derived values (`ac`, `af`, `carriers`) have nuclear-DNA defaults;
/// mitochondrial records override `ac` since homoplasmic carriers only
/// contribute one allele.
pub trait AlleleCounts {
    /// Total number of alleles covered.
    fn an(&self) -> i32;
    /// Number of heterozygous (or heteroplasmic) carriers.
    fn het(&self) -> i32;
    /// Number of homozygous (or homoplasmic) carriers.
    fn hom(&self) -> i32;
    /// Number of hemizygous carriers.
    fn hemi(&self) -> i32 {
        0
    }
    /// Number of alternate alleles.
    fn ac(&self) -> i32 {
        2 * self.hom() + self.het() + self.hemi()
    }
    /// Alternate allele frequency.
    fn af(&self) -> f32 {
        if self.an() == 0 {
            0.0
        } else {
            self.ac() as f32 / self.an() as f32
        }
    }
    /// Total number of carriers.
    fn carriers(&self) -> i32 {
        self.hom() + self.het() + self.hemi()
    }
}

/// Population frequencies of one nuclear-DNA source.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NuclearFrequencies {
    /// Number of alleles.
    pub an: i32,
    /// Number of heterozygous carriers.
    pub het: i32,
    /// Number of homozygous carriers.
    pub hom: i32,
    /// Number of hemizygous carriers.
    pub hemi: i32,
}

impl AlleleCounts for NuclearFrequencies {
    fn an(&self) -> i32 {
        self.an
    }
    fn het(&self) -> i32 {
        self.het
    }
    fn hom(&self) -> i32 {
        self.hom
    }
    fn hemi(&self) -> i32 {
        self.hemi
    }
}

/// Population frequencies of one mitochondrial source.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MitochondrialFrequencies {
    /// Number of alleles.
    pub an: i32,
    /// Number of heteroplasmic carriers.
    pub het: i32,
    /// Number of homoplasmic carriers.
    pub hom: i32,
}

impl AlleleCounts for MitochondrialFrequencies {
    fn an(&self) -> i32 {
        self.an
    }
    fn het(&self) -> i32 {
        self.het
    }
    fn hom(&self) -> i32 {
        self.hom
    }
    fn ac(&self) -> i32 {
        self.hom + self.het
    }
}

/// In-house cohort counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct InHouseFrequencies {
    /// Number of alleles.
    pub an: i32,
    /// Number of heterozygous carriers.
    pub het: i32,
    /// Number of homozygous carriers.
    pub hom: i32,
    /// Number of hemizygous carriers.
    pub hemi: i32,
}

impl AlleleCounts for InHouseFrequencies {
    fn an(&self) -> i32 {
        self.an
    }
    fn het(&self) -> i32 {
        self.het
    }
    fn hom(&self) -> i32 {
        self.hom
    }
    fn hemi(&self) -> i32 {
        self.hemi
    }
}

/// Frequency annotation of one variant across all configured sources.
///
/// A source without an annotation record for the variant carries the
/// defaulted all-zero counts; the frequency filter thus treats missing
/// annotation as frequency 0 by construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PopulationFrequencies {
    /// ExAC.
    pub exac: NuclearFrequencies,
    /// 1000 Genomes.
    pub thousand_genomes: NuclearFrequencies,
    /// gnomAD exomes.
    pub gnomad_exomes: NuclearFrequencies,
    /// gnomAD genomes.
    pub gnomad_genomes: NuclearFrequencies,
    /// HelixMtDb.
    pub helixmtdb: MitochondrialFrequencies,
    /// MITOMAP.
    pub mitomap: MitochondrialFrequencies,
    /// In-house cohort.
    pub inhouse: InHouseFrequencies,
}

/// Pathogenicity assessment of one ClinVar submission, ordered by
/// ascending severity.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumIter,
)]
pub enum Pathogenicity {
    /// Benign.
    #[serde(rename = "benign")]
    #[strum(serialize = "benign")]
    Benign,
    /// Likely benign.
    #[serde(rename = "likely_benign")]
    #[strum(serialize = "likely benign")]
    LikelyBenign,
    /// Uncertain significance.
    #[serde(rename = "uncertain_significance")]
    #[strum(serialize = "uncertain significance")]
    UncertainSignificance,
    /// Likely pathogenic.
    #[serde(rename = "likely_pathogenic")]
    #[strum(serialize = "likely pathogenic")]
    LikelyPathogenic,
    /// Pathogenic.
    #[serde(rename = "pathogenic")]
    #[strum(serialize = "pathogenic")]
    Pathogenic,
}

/// ClinVar review status of one submission.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum ReviewStatus {
    /// Practice guideline.
    #[serde(rename = "practice_guideline")]
    PracticeGuideline,
    /// Reviewed by expert panel.
    #[serde(rename = "expert_panel")]
    ExpertPanel,
    /// Criteria provided, multiple submitters, no conflicts.
    #[serde(rename = "multiple_no_conflict")]
    MultipleNoConflict,
    /// Criteria provided, conflicting interpretations.
    #[serde(rename = "conflict")]
    Conflict,
    /// Criteria provided, single submitter.
    #[default]
    #[serde(rename = "single")]
    Single,
    /// No assertion criteria provided.
    #[serde(rename = "no_criteria")]
    NoCriteria,
    /// No assertion provided.
    #[serde(rename = "no_assertion")]
    NoAssertion,
}

/// Origin of the variant allele of one ClinVar submission.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum VariantOrigin {
    /// Germline.
    #[serde(rename = "germline")]
    Germline,
    /// Somatic.
    #[serde(rename = "somatic")]
    Somatic,
    /// Origin not provided.
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

/// One ClinVar submission for a variant.
///
/// A variant may have zero, one, or many submissions; classification
/// aggregates across all of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ClinVarSubmission {
    /// Pathogenicity labels assigned by the submitter.
    pub pathogenicity: Vec<Pathogenicity>,
    /// Review status of the submission.
    #[serde(default)]
    pub review_status: ReviewStatus,
    /// Variant origin of the submission.
    #[serde(default)]
    pub origin: VariantOrigin,
}

/// HGMD public membership record of a variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct HgmdRecord {
    /// HGMD accession.
    pub accession: String,
    /// HGMD variant class, if known.
    #[serde(default)]
    pub variant_class: Option<String>,
}

/// Value of one user-authored valued flag.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumIter,
)]
pub enum FlagValue {
    /// Positive.
    #[serde(rename = "positive")]
    #[strum(serialize = "positive")]
    Positive,
    /// Negative.
    #[serde(rename = "negative")]
    #[strum(serialize = "negative")]
    Negative,
    /// Uncertain.
    #[serde(rename = "uncertain")]
    #[strum(serialize = "uncertain")]
    Uncertain,
    /// No value set.
    #[default]
    #[serde(rename = "empty")]
    #[strum(serialize = "empty")]
    Empty,
}

/// User-authored flags of one variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct VariantFlags {
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
    /// Variant segregates with the phenotype.
    pub segregates: bool,
    /// Variant does not segregate with the phenotype.
    pub doesnt_segregate: bool,
    /// Visual inspection flag.
    pub visual: FlagValue,
    /// Validation result flag.
    pub validation: FlagValue,
    /// Phenotype match flag.
    pub phenotype_match: FlagValue,
    /// Summary flag.
    pub summary: FlagValue,
}

impl VariantFlags {
    /// Whether none of the simple flags is set.
    pub fn no_simple_flag_set(&self) -> bool {
        !(self.bookmarked
            || self.candidate
            || self.final_causative
            || self.for_validation
            || self.incidental
            || self.no_disease_association
            || self.segregates
            || self.doesnt_segregate)
    }
}

/// One user comment on a variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct VariantComment {
    /// Author user name.
    pub author: String,
    /// Comment text.
    pub text: String,
    /// Creation time, if recorded.
    #[serde(default)]
    pub date: Option<chrono::DateTime<chrono::Utc>>,
}

/// Role of a sample within the pedigree of a case.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum PedigreeRole {
    /// The index patient.
    #[serde(rename = "index")]
    Index,
    /// Father of the index.
    #[serde(rename = "father")]
    Father,
    /// Mother of the index.
    #[serde(rename = "mother")]
    Mother,
    /// Sibling of the index.
    #[serde(rename = "sibling")]
    Sibling,
    /// Any other relative.
    #[default]
    #[serde(rename = "other")]
    Other,
}

/// Sex of a sample.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum Sex {
    /// Male.
    #[serde(rename = "male")]
    Male,
    /// Female.
    #[serde(rename = "female")]
    Female,
    /// Unknown.
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

/// One entry of the pedigree of a case.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PedigreeEntry {
    /// Sample name.
    pub sample: String,
    /// Role within the pedigree.
    pub role: PedigreeRole,
    /// Whether the sample is affected.
    pub affected: bool,
    /// Sex of the sample.
    #[serde(default)]
    pub sex: Sex,
}

/// A case with its ordered pedigree.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Case {
    /// UUID of the case.
    pub sodar_uuid: uuid::Uuid,
    /// Name of the case.
    pub name: String,
    /// The ordered pedigree.
    pub pedigree: Vec<PedigreeEntry>,
}

impl Case {
    /// Return the pedigree entry of the given sample, if any.
    pub fn entry(&self, sample: &str) -> Option<&PedigreeEntry> {
        self.pedigree.iter().find(|entry| entry.sample == sample)
    }

    /// Return the sample name of the first pedigree entry with the given
    /// role, if any.
    pub fn sample_with_role(&self, role: PedigreeRole) -> Option<&str> {
        self.pedigree
            .iter()
            .find(|entry| entry.role == role)
            .map(|entry| entry.sample.as_str())
    }
}

/// Canonical identity of one variant record.
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct VariantKey {
    /// Genome release.
    pub release: String,
    /// Chromosome name.
    pub chrom: String,
    /// 1-based start position.
    pub start: i32,
    /// Reference allele.
    pub reference: String,
    /// Alternative allele.
    pub alternative: String,
}

impl std::fmt::Display for VariantKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}-{}",
            self.release, self.chrom, self.start, self.reference, self.alternative
        )
    }
}

/// An annotated small-variant record as provided by the variant store.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VariantRecord {
    /// Genome release of the coordinate.
    pub release: String,
    /// Chromosome name.
    pub chrom: String,
    /// Chromosome rank for sorting.
    pub chrom_no: i32,
    /// 1-based start position.
    pub start: i32,
    /// 1-based end position.
    pub end: i32,
    /// UCSC bin of the record.
    pub bin: u32,
    /// Reference allele.
    pub reference: String,
    /// Alternative allele.
    pub alternative: String,
    /// Variant type.
    pub var_type: VarType,
    /// Annotation with respect to RefSeq transcripts.
    #[serde(default)]
    pub refseq: TranscriptAnnotation,
    /// Annotation with respect to ENSEMBL transcripts.
    #[serde(default)]
    pub ensembl: TranscriptAnnotation,
    /// Mapping of sample name to genotype call information.
    pub call_infos: IndexMap<String, CallInfo>,
    /// Population frequency annotation.
    #[serde(default)]
    pub population_frequencies: PopulationFrequencies,
    /// Whether the variant has any ClinVar submission.
    #[serde(default)]
    pub in_clinvar: bool,
    /// The ClinVar submissions of the variant.
    #[serde(default)]
    pub clinvar: Vec<ClinVarSubmission>,
    /// HGMD public membership, if any.
    #[serde(default)]
    pub hgmd: Option<HgmdRecord>,
    /// User-authored flags, if any flag record exists.
    #[serde(default)]
    pub flags: Option<VariantFlags>,
    /// User comments on the variant.
    #[serde(default)]
    pub comments: Vec<VariantComment>,
}

impl VariantRecord {
    /// Return the transcript annotation for the given database.
    pub fn annotation(&self, database: super::query::Database) -> &TranscriptAnnotation {
        match database {
            super::query::Database::Refseq => &self.refseq,
            super::query::Database::Ensembl => &self.ensembl,
        }
    }

    /// Return the canonical identity of the record.
    pub fn key(&self) -> VariantKey {
        VariantKey {
            release: self.release.clone(),
            chrom: self.chrom.clone(),
            start: self.start,
            reference: self.reference.clone(),
            alternative: self.alternative.clone(),
        }
    }
}

/// One variant record paired with the case it was evaluated in.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CaseRecord {
    /// Name of the case.
    pub case_name: String,
    /// UUID of the case.
    pub case_uuid: uuid::Uuid,
    /// The variant record.
    pub record: VariantRecord,
}

/// Compute the UCSC bin of the 0-based half-open interval `[start, end)`.
pub fn ucsc_bin(start: i32, end: i32) -> u32 {
    let mut start_bin = (start.max(0) >> 17) as u32;
    let mut end_bin = ((end.max(1) - 1) >> 17) as u32;
    let offsets = [585u32, 73, 9, 1, 0];
    for offset in offsets {
        if start_bin == end_bin {
            return offset + start_bin;
        }
        start_bin >>= 3;
        end_bin >>= 3;
    }
    0
}
