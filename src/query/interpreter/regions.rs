//! Genomic region restriction.

use crate::common::canonical_chrom;
use crate::query::schema::data::VariantRecord;
use crate::query::schema::query::{CaseQuery, GenomicRegion, Range};

/// Determine whether the record passes the genomic region restriction; an
/// absent or empty region list imposes no restriction.
pub fn passes(query: &CaseQuery, record: &VariantRecord) -> bool {
    match &query.genomic_regions {
        None => true,
        Some(regions) if regions.is_empty() => true,
        Some(regions) => {
            let result = regions
                .iter()
                .any(|region| overlaps(region, &record.chrom, record.start, record.end));
            if !result {
                tracing::trace!(
                    "variant {} fails region restriction {:?}",
                    record.key(),
                    regions
                );
            }
            result
        }
    }
}

/// Whether the half-open region `[start, end)` overlaps the 1-based
/// inclusive variant interval.
fn overlaps(region: &GenomicRegion, chrom: &str, start: i32, end: i32) -> bool {
    if canonical_chrom(&region.chrom) != canonical_chrom(chrom) {
        return false;
    }
    if let Some(Range {
        start: region_start,
        end: region_end,
    }) = region.range
    {
        start < region_end && end >= region_start
    } else {
        true
    }
}

#[cfg(test)]
mod test {
    use rstest::rstest;

    use crate::query::schema::data::VariantRecord;
    use crate::query::schema::query::{CaseQuery, GenomicRegion, Range};

    #[rstest]
    #[case("1", Some((100, 200)), "1", 100, 100, true)]
    #[case("chr1", Some((100, 200)), "1", 100, 100, true)]
    #[case("1", Some((100, 200)), "chr1", 199, 199, true)]
    // the end of a half-open region is excluded
    #[case("1", Some((100, 200)), "1", 200, 200, false)]
    // a deletion reaching into the region overlaps
    #[case("1", Some((100, 200)), "1", 90, 100, true)]
    #[case("1", Some((100, 200)), "1", 90, 99, false)]
    // region without range covers the whole chromosome
    #[case("1", None, "1", 5, 5, true)]
    // other chromosome never overlaps
    #[case("1", Some((100, 200)), "2", 150, 150, false)]
    #[case("chrM", Some((1, 100)), "MT", 50, 50, true)]
    fn overlaps(
        #[case] region_chrom: &str,
        #[case] region_range: Option<(i32, i32)>,
        #[case] chrom: &str,
        #[case] start: i32,
        #[case] end: i32,
        #[case] expected: bool,
    ) {
        let region = GenomicRegion {
            chrom: String::from(region_chrom),
            range: region_range.map(|(start, end)| Range { start, end }),
        };

        assert_eq!(super::overlaps(&region, chrom, start, end), expected);
    }

    #[test]
    fn empty_region_list_passes() {
        let record = VariantRecord {
            chrom: String::from("1"),
            start: 100,
            end: 100,
            ..Default::default()
        };

        let query = CaseQuery::default();
        assert!(super::passes(&query, &record));

        let query = CaseQuery {
            genomic_regions: Some(vec![]),
            ..Default::default()
        };
        assert!(super::passes(&query, &record));
    }

    #[test]
    fn region_disjunction() {
        let query = CaseQuery {
            genomic_regions: Some(vec![
                GenomicRegion {
                    chrom: String::from("2"),
                    range: Some(Range { start: 1, end: 10 }),
                },
                GenomicRegion {
                    chrom: String::from("1"),
                    range: Some(Range {
                        start: 100,
                        end: 200,
                    }),
                },
            ]),
            ..Default::default()
        };
        let record = VariantRecord {
            chrom: String::from("1"),
            start: 150,
            end: 150,
            ..Default::default()
        };

        assert!(super::passes(&query, &record));
    }
}
