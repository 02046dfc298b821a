//! Sorting of result records in canonical chromosome/position order.

use crate::query::schema::data::CaseRecord;

/// Helper wrapper that allows sorting `CaseRecord`s by canonical
/// coordinate: chromosome rank, start position, alleles, and case name as
/// the final tie breaker so that cohort unions order deterministically.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ByCoordinate {
    /// The sort key.
    pub coordinate: (i32, i32, String, String, String),
    /// The wrapped record.
    pub row: CaseRecord,
}

impl From<CaseRecord> for ByCoordinate {
    fn from(val: CaseRecord) -> Self {
        Self {
            coordinate: (
                val.record.chrom_no,
                val.record.start,
                val.record.reference.clone(),
                val.record.alternative.clone(),
                val.case_name.clone(),
            ),
            row: val,
        }
    }
}

impl PartialEq for ByCoordinate {
    fn eq(&self, other: &Self) -> bool {
        self.coordinate == other.coordinate
    }
}

impl Eq for ByCoordinate {}

impl PartialOrd for ByCoordinate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ByCoordinate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.coordinate.cmp(&other.coordinate)
    }
}

#[cfg(test)]
mod test {
    use super::ByCoordinate;
    use crate::query::schema::data::{CaseRecord, VariantRecord};

    fn row(case_name: &str, chrom: &str, chrom_no: i32, start: i32) -> CaseRecord {
        CaseRecord {
            case_name: case_name.to_string(),
            case_uuid: uuid::Uuid::nil(),
            record: VariantRecord {
                chrom: chrom.to_string(),
                chrom_no,
                start,
                end: start,
                reference: String::from("A"),
                alternative: String::from("T"),
                ..Default::default()
            },
        }
    }

    #[test]
    fn chromosome_rank_beats_position() {
        // X (rank 23) sorts after 22 even though "X" < "22" textually is
        // false and "10" < "2" textually is true.
        let mut rows: Vec<ByCoordinate> = vec![
            row("case", "X", 23, 1),
            row("case", "2", 2, 500),
            row("case", "10", 10, 1),
            row("case", "MT", 25, 1),
            row("case", "2", 2, 100),
        ]
        .into_iter()
        .map(Into::into)
        .collect();
        rows.sort();

        let order: Vec<(i32, i32)> = rows
            .iter()
            .map(|wrapped| (wrapped.row.record.chrom_no, wrapped.row.record.start))
            .collect();
        assert_eq!(
            order,
            vec![(2, 100), (2, 500), (10, 1), (23, 1), (25, 1)]
        );
    }

    #[test]
    fn case_name_is_the_tie_breaker() {
        let mut rows: Vec<ByCoordinate> = vec![
            row("case-b", "1", 1, 100),
            row("case-a", "1", 1, 100),
        ]
        .into_iter()
        .map(Into::into)
        .collect();
        rows.sort();

        let cases: Vec<&str> = rows
            .iter()
            .map(|wrapped| wrapped.row.case_name.as_str())
            .collect();
        assert_eq!(cases, vec!["case-a", "case-b"]);
    }
}
