//! Output shapes and writers for query results.
//!
//! All three shapes share the same WHERE-clause construction and row
//! order; they differ in the breadth of fields and annotation joins:
//! `render` for interactive display, `table` for bulk export (TSV with a
//! JSON payload column plus the conservation join), `vcf` for a minimal
//! VCF without annotation joins.

use std::io::Write;

use indexmap::IndexMap;

use crate::query::interpreter::clinvar;
use crate::query::schema::data::{
    CallInfo, CaseRecord, Pathogenicity, PopulationFrequencies, VarType, VariantComment,
    VariantEffect, VariantFlags,
};
use crate::query::schema::query::CaseQuery;
use crate::query::store::ConservationRecord;

/// The output shape to write.
#[derive(clap::ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq, strum::Display)]
pub enum OutputFormat {
    /// Rich JSONL rows for interactive display.
    #[default]
    #[strum(serialize = "render")]
    Render,
    /// TSV rows for bulk export, with conservation join.
    #[strum(serialize = "table")]
    Table,
    /// Minimal VCF.
    #[strum(serialize = "vcf")]
    Vcf,
}

/// ClinVar summary carried on output rows.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ClinVarSummary {
    /// The most severe aggregated pathogenicity label.
    pub significance: Pathogenicity,
    /// Whether the aggregated labels span more than one direction.
    pub conflicting: bool,
}

/// Rich result row for interactive display.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, derive_builder::Builder)]
pub struct RenderRecord {
    /// UUID for the row.
    pub sodar_uuid: uuid::Uuid,
    /// Name of the case.
    pub case: String,
    /// Genome release for the coordinate.
    pub release: String,
    /// Chromosome name.
    pub chromosome: String,
    /// Chromosome rank.
    pub chromosome_no: i32,
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
    /// Gene ID in the selected transcript database.
    pub gene_id: Option<String>,
    /// Effects in the selected transcript database.
    pub effects: Vec<VariantEffect>,
    /// Whether the annotated transcript is coding.
    pub transcript_coding: bool,
    /// Genotype call information per sample.
    pub call_infos: IndexMap<String, CallInfo>,
    /// Population frequency annotation.
    pub population_frequencies: PopulationFrequencies,
    /// User flags, if any.
    pub flags: Option<VariantFlags>,
    /// User comments.
    pub comments: Vec<VariantComment>,
    /// ClinVar summary, if the variant has submissions.
    pub clinvar: Option<ClinVarSummary>,
    /// HGMD accession; only populated when HGMD display is requested.
    pub hgmd_accession: Option<String>,
}

impl RenderRecord {
    /// Build the render row for one passed record.
    pub fn from_case_record(
        query: &CaseQuery,
        case_record: &CaseRecord,
    ) -> Result<Self, anyhow::Error> {
        let record = &case_record.record;
        let annotation = record.annotation(query.database_select);
        let clinvar_summary = clinvar::assess(&record.clinvar).and_then(|assessment| {
            assessment.max_significance().map(|significance| ClinVarSummary {
                significance,
                conflicting: assessment.conflicting,
            })
        });
        let hgmd_accession = if query.display_hgmd_public_membership {
            record.hgmd.as_ref().map(|hgmd| hgmd.accession.clone())
        } else {
            None
        };

        RenderRecordBuilder::default()
            .sodar_uuid(uuid::Uuid::new_v4())
            .case(case_record.case_name.clone())
            .release(record.release.clone())
            .chromosome(record.chrom.clone())
            .chromosome_no(record.chrom_no)
            .start(record.start)
            .end(record.end)
            .bin(record.bin)
            .reference(record.reference.clone())
            .alternative(record.alternative.clone())
            .var_type(record.var_type)
            .gene_id(annotation.gene_id.clone())
            .effects(annotation.effects.clone())
            .transcript_coding(annotation.transcript_coding)
            .call_infos(record.call_infos.clone())
            .population_frequencies(record.population_frequencies.clone())
            .flags(record.flags.clone())
            .comments(record.comments.clone())
            .clinvar(clinvar_summary)
            .hgmd_accession(hgmd_accession)
            .build()
            .map_err(|e| anyhow::anyhow!("problem building render record: {}", e))
    }
}

/// Table-export row: the render fields plus the conservation join.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TableRecord {
    /// The shared render fields.
    pub render: RenderRecord,
    /// Overlapping conservation alignment rows.
    pub conservation: Vec<ConservationRecord>,
}

/// The JSON payload column of the table export.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
struct TablePayload {
    var_type: VarType,
    gene_id: Option<String>,
    effects: Vec<VariantEffect>,
    transcript_coding: bool,
    call_infos: IndexMap<String, CallInfo>,
    population_frequencies: PopulationFrequencies,
    flags: Option<VariantFlags>,
    comments: Vec<VariantComment>,
    clinvar: Option<ClinVarSummary>,
    hgmd_accession: Option<String>,
    conservation: Vec<ConservationRecord>,
}

/// Write render rows as JSONL.
pub fn write_render<W: Write>(writer: &mut W, rows: &[RenderRecord]) -> Result<(), anyhow::Error> {
    for row in rows {
        serde_json::to_writer(&mut *writer, row)?;
        writeln!(writer)?;
    }
    Ok(())
}

/// Write table rows as TSV: scalar columns for sorting plus a JSON payload
/// column with the structured data.
pub fn write_table<W: Write>(writer: W, rows: &[TableRecord]) -> Result<(), anyhow::Error> {
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(writer);
    csv_writer.write_record([
        "sodar_uuid",
        "case",
        "release",
        "chromosome",
        "chromosome_no",
        "start",
        "end",
        "bin",
        "reference",
        "alternative",
        "payload",
    ])?;
    for row in rows {
        let render = &row.render;
        let payload = TablePayload {
            var_type: render.var_type,
            gene_id: render.gene_id.clone(),
            effects: render.effects.clone(),
            transcript_coding: render.transcript_coding,
            call_infos: render.call_infos.clone(),
            population_frequencies: render.population_frequencies.clone(),
            flags: render.flags.clone(),
            comments: render.comments.clone(),
            clinvar: render.clinvar.clone(),
            hgmd_accession: render.hgmd_accession.clone(),
            conservation: row.conservation.clone(),
        };
        csv_writer.write_record([
            render.sodar_uuid.to_string(),
            render.case.clone(),
            render.release.clone(),
            render.chromosome.clone(),
            render.chromosome_no.to_string(),
            render.start.to_string(),
            render.end.to_string(),
            render.bin.to_string(),
            render.reference.clone(),
            render.alternative.clone(),
            serde_json::to_string(&payload)?,
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write the minimal VCF shape: coordinates, genotypes, and gene ID only.
///
/// Samples missing from a row's call information are written as no-call so
/// that cohort unions with differing pedigrees stay rectangular.
pub fn write_vcf<W: Write>(
    writer: &mut W,
    query: &CaseQuery,
    samples: &[String],
    rows: &[CaseRecord],
) -> Result<(), anyhow::Error> {
    writeln!(writer, "##fileformat=VCFv4.2")?;
    writeln!(
        writer,
        "##INFO=<ID=GENE,Number=1,Type=String,Description=\"Gene ID\">"
    )?;
    writeln!(
        writer,
        "##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">"
    )?;
    write!(writer, "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT")?;
    for sample in samples {
        write!(writer, "\t{}", sample)?;
    }
    writeln!(writer)?;

    for row in rows {
        let record = &row.record;
        let info = record
            .annotation(query.database_select)
            .gene_id
            .as_ref()
            .map(|gene_id| format!("GENE={}", gene_id))
            .unwrap_or_else(|| String::from("."));
        write!(
            writer,
            "{}\t{}\t.\t{}\t{}\t.\t.\t{}\tGT",
            record.chrom, record.start, record.reference, record.alternative, info
        )?;
        for sample in samples {
            let genotype = record
                .call_infos
                .get(sample)
                .map(|call_info| call_info.genotype.to_string())
                .unwrap_or_else(|| String::from("."));
            write!(writer, "\t{}", genotype)?;
        }
        writeln!(writer)?;
    }
    Ok(())
}
