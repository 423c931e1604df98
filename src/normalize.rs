use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

/// Why a raw row was dropped. Normalizers return this instead of failing;
/// callers count it in a [`SkipTally`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("missing {0}")]
    Missing(&'static str),
    #[error("empty {0}")]
    Empty(&'static str),
    #[error("unparseable position `{0}`")]
    BadPosition(String),
    #[error("unparseable time `{0}`")]
    BadTime(String),
}

impl SkipReason {
    /// Reason without the offending raw text, used as the tally key.
    pub fn label(&self) -> String {
        match self {
            SkipReason::Missing(field) => format!("missing {field}"),
            SkipReason::Empty(field) => format!("empty {field}"),
            SkipReason::BadPosition(_) => "unparseable position".to_string(),
            SkipReason::BadTime(_) => "unparseable time".to_string(),
        }
    }
}

pub type RowOutcome<T> = Result<T, SkipReason>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SkipTally {
    pub total: usize,
    pub by_reason: BTreeMap<String, usize>,
}

impl SkipTally {
    pub fn record(&mut self, reason: &SkipReason) {
        self.total += 1;
        *self.by_reason.entry(reason.label()).or_insert(0) += 1;
    }

    pub fn merge(&mut self, other: &SkipTally) {
        self.total += other.total;
        for (reason, count) in &other.by_reason {
            *self.by_reason.entry(reason.clone()).or_insert(0) += count;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// Keep the normalized rows, tallying and dropping the rest.
pub fn keep_parsed<T>(rows: Vec<RowOutcome<T>>, tally: &mut SkipTally) -> Vec<T> {
    let mut kept = Vec::with_capacity(rows.len());
    for row in rows {
        match row {
            Ok(record) => kept.push(record),
            Err(reason) => {
                tracing::debug!(%reason, "row skipped");
                tally.record(&reason);
            }
        }
    }
    kept
}

pub fn collapse_ws(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn entry_number(raw: &str) -> RowOutcome<String> {
    let number = raw.trim().trim_start_matches('#').trim();
    if number.is_empty() {
        return Err(SkipReason::Empty("entry number"));
    }
    Ok(number.to_string())
}

/// `"12."` -> 12.
pub fn finish_position(raw: &str) -> RowOutcome<u32> {
    let cleaned: String = raw.chars().filter(|c| *c != '.').collect();
    let cleaned = cleaned.trim();
    cleaned
        .parse::<u32>()
        .ok()
        .filter(|p| *p > 0)
        .ok_or_else(|| SkipReason::BadPosition(cleaned.to_string()))
}

/// Driver and codriver from the children of a name cell, labels already removed.
pub fn crew<I>(parts: I) -> RowOutcome<(String, String)>
where
    I: IntoIterator<Item = String>,
{
    let mut names = parts
        .into_iter()
        .map(|part| collapse_ws(&part))
        .filter(|part| !part.is_empty());
    let driver = names.next().ok_or(SkipReason::Missing("driver"))?;
    let codriver = names.next().ok_or(SkipReason::Missing("codriver"))?;
    Ok((driver, codriver))
}

/// Elapsed seconds from `H:MM:SS.ffffff`, or `MM:SS.ffffff` once the hour is zero.
pub fn parse_time_secs(raw: &str) -> RowOutcome<f64> {
    let text = raw.trim();
    let bad = || SkipReason::BadTime(text.to_string());

    let fields = text.split(':').collect::<Vec<_>>();
    let (hours, minutes, seconds) = match fields.as_slice() {
        [h, m, s] => (clock_field(h).ok_or_else(bad)?, *m, *s),
        [m, s] => (0, *m, *s),
        _ => return Err(bad()),
    };
    let minutes = clock_field(minutes).filter(|m| *m < 60).ok_or_else(bad)?;
    let seconds = seconds_field(seconds).ok_or_else(bad)?;

    Ok(f64::from(hours) * 3600.0 + f64::from(minutes) * 60.0 + seconds)
}

fn clock_field(raw: &str) -> Option<u32> {
    if raw.is_empty() || raw.len() > 2 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

fn seconds_field(raw: &str) -> Option<f64> {
    let (whole, frac) = match raw.split_once('.') {
        Some((whole, frac)) => (whole, Some(frac)),
        None => (raw, None),
    };
    let whole = clock_field(whole).filter(|s| *s < 60)?;
    let frac = match frac {
        Some(digits) => {
            if digits.is_empty() || digits.len() > 6 || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            format!("0.{digits}").parse::<f64>().ok()?
        }
        None => 0.0,
    };
    Some(f64::from(whole) + frac)
}

/// Tags from an event detail label such as `"21. 1. 2021 • 320.5 km - gravel - cancelled"`.
pub fn conditions_from_label(label: &str) -> Vec<String> {
    let details = label.split('•').nth(1).unwrap_or(label);
    let details = details.replace("km", "").replace("cancelled", "");
    details
        .chars()
        .filter(|c| c.is_alphabetic() || *c == '-')
        .collect::<String>()
        .split('-')
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_with_hours() {
        assert_eq!(parse_time_secs("1:02:03.5"), Ok(3723.5));
        assert_eq!(parse_time_secs(" 3:00:00.000001 ").map(|t| t > 10800.0), Ok(true));
    }

    #[test]
    fn time_without_hours_falls_back() {
        assert_eq!(parse_time_secs("02:03.25"), Ok(123.25));
        assert_eq!(parse_time_secs("59:59.5"), Ok(3599.5));
    }

    #[test]
    fn time_rejects_garbage() {
        assert!(parse_time_secs("").is_err());
        assert!(parse_time_secs("DNF").is_err());
        assert!(parse_time_secs("1:75:00.0").is_err());
        assert!(parse_time_secs("12:3x.1").is_err());
        assert!(parse_time_secs("1:2:3:4").is_err());
    }

    #[test]
    fn position_strips_dot() {
        assert_eq!(finish_position(" 12. "), Ok(12));
        assert_eq!(
            finish_position("R"),
            Err(SkipReason::BadPosition("R".to_string()))
        );
    }

    #[test]
    fn entry_number_strips_hash() {
        assert_eq!(entry_number(" #33 "), Ok("33".to_string()));
        assert_eq!(entry_number("#"), Err(SkipReason::Empty("entry number")));
    }

    #[test]
    fn crew_uses_first_two_non_empty_parts() {
        let parts = vec![
            "\n  Ogier \n Sébastien ".to_string(),
            "\n".to_string(),
            " Ingrassia   Julien".to_string(),
        ];
        assert_eq!(
            crew(parts),
            Ok(("Ogier Sébastien".to_string(), "Ingrassia Julien".to_string()))
        );
        assert_eq!(
            crew(vec!["Solo".to_string()]),
            Err(SkipReason::Missing("codriver"))
        );
    }

    #[test]
    fn conditions_drop_distance_and_cancelled_marker() {
        assert_eq!(
            conditions_from_label(" • 320.5 km - gravel - cancelled"),
            vec!["gravel".to_string()]
        );
        assert_eq!(
            conditions_from_label("21. 1. 2021 • 257.64 km - asphalt-snow"),
            vec!["asphalt".to_string(), "snow".to_string()]
        );
    }

    #[test]
    fn tally_groups_by_label() {
        let mut tally = SkipTally::default();
        tally.record(&SkipReason::BadTime("x".into()));
        tally.record(&SkipReason::BadTime("y".into()));
        tally.record(&SkipReason::Missing("car"));
        assert_eq!(tally.total, 3);
        assert_eq!(tally.by_reason.get("unparseable time"), Some(&2));
        assert_eq!(tally.by_reason.get("missing car"), Some(&1));
    }
}
