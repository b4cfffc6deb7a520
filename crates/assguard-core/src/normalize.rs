use std::cmp::Ordering;

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};

use crate::model::{AssertionRecord, NormalizedRecord};

/// Coerces one upstream RFC 3339 value to a timezone-naive UTC timestamp
/// rounded to microseconds. Anything unparseable becomes `None`.
pub fn parse_event_time(raw: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc).round_subsecs(6).naive_utc())
}

/// Pure normalization transform: per-field timestamp coercion followed by
/// a stable sort on start time descending with null start times last.
/// Relative input order is preserved for equal keys so a fixed input
/// always yields the same output.
pub fn normalize_records(records: Vec<AssertionRecord>) -> Vec<NormalizedRecord> {
    let mut normalized: Vec<NormalizedRecord> = records
        .into_iter()
        .map(|record| NormalizedRecord {
            start_time: record.start_time.as_deref().and_then(parse_event_time),
            end_time: record.end_time.as_deref().and_then(parse_event_time),
            invocation_name: record.invocation_name,
            action_name: record.action_name,
            database: record.database,
            schema: record.schema,
            state: record.state,
            failure_reason: record.failure_reason,
        })
        .collect();

    normalized.sort_by(|a, b| match (&a.start_time, &b.start_time) {
        (Some(left), Some(right)) => right.cmp(left),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(name: &str, start_time: Option<&str>) -> AssertionRecord {
        AssertionRecord {
            start_time: start_time.map(str::to_string),
            end_time: None,
            invocation_name: "inv-1".to_string(),
            action_name: name.to_string(),
            database: "N/A".to_string(),
            schema: "N/A".to_string(),
            state: "SUCCEEDED".to_string(),
            failure_reason: "N/A".to_string(),
        }
    }

    #[test]
    fn parses_rfc3339_and_strips_timezone() {
        let parsed = parse_event_time("2024-03-05T10:30:00+02:00").expect("parses");
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn rounds_subseconds_to_microseconds() {
        let parsed = parse_event_time("2024-01-01T00:00:00.123456789Z").expect("parses");
        let expected = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_micro_opt(0, 0, 0, 123_457)
            .unwrap();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn unparseable_time_becomes_null_not_error() {
        assert!(parse_event_time("last tuesday").is_none());
        assert!(parse_event_time("").is_none());

        let normalized = normalize_records(vec![record("a", Some("not a timestamp"))]);
        assert_eq!(normalized.len(), 1);
        assert!(normalized[0].start_time.is_none());
    }

    #[test]
    fn sorts_descending_with_nulls_last() {
        let batch = vec![
            record("t3", Some("2024-01-03T00:00:00Z")),
            record("null", None),
            record("t1", Some("2024-01-01T00:00:00Z")),
            record("t2", Some("2024-01-02T00:00:00Z")),
        ];
        let normalized = normalize_records(batch);
        let order: Vec<&str> = normalized
            .iter()
            .map(|row| row.action_name.as_str())
            .collect();
        assert_eq!(order, vec!["t3", "t2", "t1", "null"]);
    }

    #[test]
    fn equal_start_times_preserve_input_order() {
        let batch = vec![
            record("first", Some("2024-01-01T00:00:00Z")),
            record("second", Some("2024-01-01T00:00:00Z")),
            record("third", Some("2024-01-01T00:00:00Z")),
        ];
        let normalized = normalize_records(batch);
        let order: Vec<&str> = normalized
            .iter()
            .map(|row| row.action_name.as_str())
            .collect();
        assert_eq!(order, vec!["first", "second", "third"]);
    }
}
