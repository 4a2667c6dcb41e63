//! Reduction of same-tag records into one column per tag.

use crate::data::error::ExtractError;
use crate::data::record::{LogRecord, Origin, ReductionKind, parse_output};
use std::collections::BTreeMap;

/// Tag -> reduced value. Iterates in lexicographic tag order, which is what
/// gives every column a stable position across runs.
pub type ReducedRow = BTreeMap<String, String>;

/// Parse a captured stdout and reduce the records of one origin into columns.
pub fn extract(
    stdout: &str,
    origin: Origin,
    expected_columns: usize,
) -> Result<Vec<String>, ExtractError> {
    let records = parse_output(stdout)?;
    reduce(
        records.iter().filter(|r| r.origin == origin),
        expected_columns,
    )
}

/// Reduce records (already filtered to one origin) into labeled columns
/// `"tag: value"`, sorted by tag and padded with empty strings up to
/// `expected_columns`. Extra tags are never truncated.
pub fn reduce<'a>(
    records: impl IntoIterator<Item = &'a LogRecord>,
    expected_columns: usize,
) -> Result<Vec<String>, ExtractError> {
    let row = reduce_tags(records)?;

    let mut out: Vec<String> = row
        .into_iter()
        .map(|(tag, value)| format!("{}: {}", tag, value))
        .collect();
    while out.len() < expected_columns {
        out.push(String::new());
    }
    Ok(out)
}

/// Group by tag and reduce each group according to its kind.
pub fn reduce_tags<'a>(
    records: impl IntoIterator<Item = &'a LogRecord>,
) -> Result<ReducedRow, ExtractError> {
    let mut groups: BTreeMap<&str, Vec<&LogRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.tag.as_str()).or_default().push(record);
    }

    let mut row = ReducedRow::new();
    for (tag, mut group) in groups {
        let kind = group[0].kind;
        if group.iter().any(|r| r.kind != kind) {
            return Err(ExtractError::MixedReductionKind {
                tag: tag.to_string(),
            });
        }

        // Stable: equal timestamps keep emission order.
        group.sort_by_key(|r| r.timestamp);

        let value = match kind {
            ReductionKind::List => group
                .iter()
                .map(|r| r.payload.as_str())
                .collect::<Vec<_>>()
                .join(","),
            ReductionKind::Average => average(tag, &group)?,
        };
        row.insert(tag.to_string(), value);
    }

    Ok(row)
}

fn average(tag: &str, group: &[&LogRecord]) -> Result<String, ExtractError> {
    let mut values = Vec::with_capacity(group.len());
    for record in group {
        let value: i128 =
            record
                .payload
                .trim()
                .parse()
                .map_err(|_| ExtractError::NonNumericAverage {
                    tag: tag.to_string(),
                    payload: record.payload.clone(),
                })?;
        values.push(value);
    }
    let count = values.len() as f64;
    let mean = match values.iter().try_fold(0i128, |sum, v| sum.checked_add(*v)) {
        Some(sum) => sum as f64 / count,
        None => values.iter().map(|v| *v as f64).sum::<f64>() / count,
    };
    // Debug formatting keeps the fractional part: 20.0, not 20.
    Ok(format!("{:?}", mean))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rec(timestamp: i64, kind: ReductionKind, tag: &str, payload: &str) -> LogRecord {
        LogRecord {
            timestamp,
            kind,
            origin: Origin::BackEnd,
            tag: tag.to_string(),
            payload: payload.to_string(),
        }
    }

    #[test]
    fn columns_sorted_by_tag() {
        let records = vec![
            rec(0, ReductionKind::List, "b", "1"),
            rec(0, ReductionKind::List, "a", "2"),
        ];
        assert_eq!(reduce(&records, 0).unwrap(), vec!["a: 2", "b: 1"]);

        let reversed: Vec<LogRecord> = records.into_iter().rev().collect();
        assert_eq!(reduce(&reversed, 0).unwrap(), vec!["a: 2", "b: 1"]);
    }

    #[test]
    fn average_is_true_mean() {
        let records = vec![
            rec(0, ReductionKind::Average, "t", "10"),
            rec(1, ReductionKind::Average, "t", "20"),
            rec(2, ReductionKind::Average, "t", "30"),
        ];
        assert_eq!(reduce_tags(&records).unwrap()["t"], "20.0");

        let uneven = vec![
            rec(0, ReductionKind::Average, "t", "1"),
            rec(1, ReductionKind::Average, "t", "2"),
        ];
        assert_eq!(reduce_tags(&uneven).unwrap()["t"], "1.5");
    }

    #[test]
    fn average_accepts_integers_wider_than_64_bits() {
        let records = vec![
            rec(0, ReductionKind::Average, "t", "18446744073709551616"),
            rec(1, ReductionKind::Average, "t", " -18446744073709551616 "),
            rec(2, ReductionKind::Average, "t", "18446744073709551616"),
        ];
        let mean: f64 = reduce_tags(&records).unwrap()["t"].parse().unwrap();
        assert_eq!(mean, 2f64.powi(64) / 3.0);

        let stdout = "[DATA,0,AVERAGE,WHOLE,t] 18446744073709551616\n";
        let columns = extract(stdout, Origin::Whole, 0).unwrap();
        let value: f64 = columns[0].strip_prefix("t: ").unwrap().parse().unwrap();
        assert_eq!(value, 2f64.powi(64));
    }

    #[test]
    fn average_survives_sum_overflow() {
        let big = i128::MAX.to_string();
        let records = vec![
            rec(0, ReductionKind::Average, "t", &big),
            rec(1, ReductionKind::Average, "t", &big),
        ];
        let mean: f64 = reduce_tags(&records).unwrap()["t"].parse().unwrap();
        assert_eq!(mean, i128::MAX as f64);
    }

    #[test]
    fn list_keeps_trailing_payload_whitespace() {
        let stdout = "[DATA,0,LIST,WHOLE,t] a  \n[DATA,1,LIST,WHOLE,t] b\n";
        assert_eq!(extract(stdout, Origin::Whole, 0).unwrap(), vec!["t: a  ,b"]);
    }

    #[test]
    fn list_ordered_by_timestamp() {
        let records = vec![
            rec(5, ReductionKind::List, "t", "y"),
            rec(1, ReductionKind::List, "t", "x"),
        ];
        assert_eq!(reduce(&records, 0).unwrap(), vec!["t: x,y"]);
    }

    #[test]
    fn list_ties_keep_emission_order() {
        let records = vec![
            rec(7, ReductionKind::List, "t", "first"),
            rec(7, ReductionKind::List, "t", "second"),
            rec(3, ReductionKind::List, "t", "zero"),
        ];
        assert_eq!(reduce(&records, 0).unwrap(), vec!["t: zero,first,second"]);
    }

    #[test]
    fn groups_non_adjacent_tags() {
        let records = vec![
            rec(0, ReductionKind::List, "a", "1"),
            rec(1, ReductionKind::List, "b", "2"),
            rec(2, ReductionKind::List, "a", "3"),
        ];
        assert_eq!(reduce(&records, 0).unwrap(), vec!["a: 1,3", "b: 2"]);
    }

    #[test]
    fn mixed_kinds_rejected() {
        let records = vec![
            rec(0, ReductionKind::List, "t", "1"),
            rec(1, ReductionKind::Average, "t", "2"),
        ];
        assert_eq!(
            reduce(&records, 0).unwrap_err(),
            ExtractError::MixedReductionKind {
                tag: "t".to_string()
            }
        );
    }

    #[test]
    fn non_numeric_average_rejected() {
        let records = vec![rec(0, ReductionKind::Average, "t", "abc")];
        assert_eq!(
            reduce(&records, 0).unwrap_err(),
            ExtractError::NonNumericAverage {
                tag: "t".to_string(),
                payload: "abc".to_string(),
            }
        );
    }

    #[test]
    fn pads_to_expected_columns() {
        let records = vec![
            rec(0, ReductionKind::List, "a", "1"),
            rec(0, ReductionKind::List, "b", "2"),
        ];
        assert_eq!(
            reduce(&records, 5).unwrap(),
            vec!["a: 1", "b: 2", "", "", ""]
        );
    }

    #[test]
    fn never_truncates_extra_tags() {
        let records = vec![
            rec(0, ReductionKind::List, "a", "1"),
            rec(0, ReductionKind::List, "b", "2"),
            rec(0, ReductionKind::List, "c", "3"),
        ];
        assert_eq!(reduce(&records, 1).unwrap().len(), 3);
    }

    #[test]
    fn extract_filters_by_origin() {
        let stdout = "\
[DATA,0,AVERAGE,BACK-END,score] 42
[DATA,0,LIST,FRONT-END,passes] mem2reg
program output
[DATA,1,AVERAGE,BACK-END,score] 44
";
        assert_eq!(
            extract(stdout, Origin::BackEnd, 2).unwrap(),
            vec!["score: 43.0", ""]
        );
        assert_eq!(
            extract(stdout, Origin::FrontEnd, 1).unwrap(),
            vec!["passes: mem2reg"]
        );
        assert_eq!(extract(stdout, Origin::Whole, 2).unwrap(), vec!["", ""]);
    }
}
