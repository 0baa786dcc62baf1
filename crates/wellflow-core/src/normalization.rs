//! Per-column value domains for well records.
//!
//! Every rule maps a raw string to a value inside its domain or to `None`.
//! Out-of-domain input is expected data, not an error.

use chrono::NaiveDate;
use polars::prelude::*;

use crate::error::{PipelineError, Result};
use crate::json::epoch_days;

const DIRECTIONS: &[&str] = &["horizontal", "vertical"];
const WELL_TYPES: &[&str] = &["oil", "gas"];
const BASINS: &[&str] = &["anadarko", "barnett", "eagle ford", "other", "permian"];
const SUBBASINS: &[&str] = &[
    "barnett",
    "central basin platform",
    "central eagle ford",
    "delaware",
    "eastern shelf",
    "granite wash",
    "maverick basin",
    "midland",
    "northeastern eagle ford",
    "northwest shelf",
    "other",
    "scoop",
];
const STATES: &[&str] = &["texas"];
const COUNTIES: &[&str] = &[
    "anderson", "atascosa", "borden", "cooke", "crane", "dewitt", "knox", "martin", "matagorda",
    "nolan", "pecos", "refugio", "robertson", "runnels", "yoakum", "young",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NormalizationRule {
    Direction,
    Welltype,
    Basin,
    Subbasin,
    State,
    County,
    Spuddate,
    Cum12moil,
    Cum12mgas,
    Cum12mwater,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// Case-insensitive match against a fixed list, emitted upper case.
    Enumerated(&'static [&'static str]),
    /// Plain ASCII digits, no sign.
    NonNegativeInteger,
    /// `YYYY-MM-DD`, not after the reference date.
    PastDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedValue {
    Text(String),
    Count(i64),
    Date(NaiveDate),
}

impl NormalizationRule {
    pub const ALL: [NormalizationRule; 10] = [
        NormalizationRule::Direction,
        NormalizationRule::Welltype,
        NormalizationRule::Basin,
        NormalizationRule::Subbasin,
        NormalizationRule::State,
        NormalizationRule::County,
        NormalizationRule::Spuddate,
        NormalizationRule::Cum12moil,
        NormalizationRule::Cum12mgas,
        NormalizationRule::Cum12mwater,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NormalizationRule::Direction => "direction",
            NormalizationRule::Welltype => "welltype",
            NormalizationRule::Basin => "basin",
            NormalizationRule::Subbasin => "subbasin",
            NormalizationRule::State => "state",
            NormalizationRule::County => "county",
            NormalizationRule::Spuddate => "spuddate",
            NormalizationRule::Cum12moil => "cum12moil",
            NormalizationRule::Cum12mgas => "cum12mgas",
            NormalizationRule::Cum12mwater => "cum12mwater",
        }
    }

    /// Resolves the rule for a configured column name (trimmed, ASCII case-folded).
    pub fn for_column(column: &str) -> Result<Self> {
        let key = column.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|rule| rule.name() == key)
            .ok_or_else(|| {
                PipelineError::Configuration(format!(
                    "no normalization rule for column '{column}'"
                ))
            })
    }

    pub fn kind(self) -> RuleKind {
        match self {
            NormalizationRule::Direction => RuleKind::Enumerated(DIRECTIONS),
            NormalizationRule::Welltype => RuleKind::Enumerated(WELL_TYPES),
            NormalizationRule::Basin => RuleKind::Enumerated(BASINS),
            NormalizationRule::Subbasin => RuleKind::Enumerated(SUBBASINS),
            NormalizationRule::State => RuleKind::Enumerated(STATES),
            NormalizationRule::County => RuleKind::Enumerated(COUNTIES),
            NormalizationRule::Spuddate => RuleKind::PastDate,
            NormalizationRule::Cum12moil
            | NormalizationRule::Cum12mgas
            | NormalizationRule::Cum12mwater => RuleKind::NonNegativeInteger,
        }
    }

    pub fn apply(self, raw: &str, today: NaiveDate) -> Option<NormalizedValue> {
        match self.kind() {
            RuleKind::Enumerated(domain) => {
                let candidate = raw.trim().to_lowercase();
                domain
                    .iter()
                    .find(|allowed| **allowed == candidate)
                    .map(|allowed| NormalizedValue::Text(allowed.to_uppercase()))
            }
            RuleKind::NonNegativeInteger => {
                if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                raw.parse::<i64>().ok().map(NormalizedValue::Count)
            }
            RuleKind::PastDate => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .filter(|date| *date <= today)
                .map(NormalizedValue::Date),
        }
    }

    /// Normalizes a whole column. Input of any dtype is read through its string
    /// form; the output dtype is `String`, `Int64` or `Date` depending on the rule.
    pub fn normalize_column(self, column: &Column, today: NaiveDate) -> Result<Column> {
        let name = column.name().clone();
        let as_text = column.cast(&DataType::String)?;
        let raw = as_text.str()?;

        let series = match self.kind() {
            RuleKind::Enumerated(_) => {
                let values: Vec<Option<String>> = raw
                    .into_iter()
                    .map(|value| match value.and_then(|v| self.apply(v, today)) {
                        Some(NormalizedValue::Text(text)) => Some(text),
                        _ => None,
                    })
                    .collect();
                Series::new(name, values)
            }
            RuleKind::NonNegativeInteger => {
                let values: Vec<Option<i64>> = raw
                    .into_iter()
                    .map(|value| match value.and_then(|v| self.apply(v, today)) {
                        Some(NormalizedValue::Count(count)) => Some(count),
                        _ => None,
                    })
                    .collect();
                Series::new(name, values)
            }
            RuleKind::PastDate => {
                let values: Vec<Option<i32>> = raw
                    .into_iter()
                    .map(|value| match value.and_then(|v| self.apply(v, today)) {
                        Some(NormalizedValue::Date(date)) => Some(epoch_days(date)),
                        _ => None,
                    })
                    .collect();
                Series::new(name, values).cast(&DataType::Date)?
            }
        };

        Ok(series.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
    }

    fn text(value: &str) -> Option<NormalizedValue> {
        Some(NormalizedValue::Text(value.to_string()))
    }

    #[test]
    fn enumerated_rules_trim_fold_and_upper_case() {
        let cases = [
            (NormalizationRule::Direction, "Horizontal", text("HORIZONTAL")),
            (NormalizationRule::Direction, "horizontal", text("HORIZONTAL")),
            (NormalizationRule::Direction, "VERTICAL", text("VERTICAL")),
            (NormalizationRule::Direction, "invalid", None),
            (NormalizationRule::Direction, "", None),
            (NormalizationRule::Welltype, "oil", text("OIL")),
            (NormalizationRule::Welltype, "Gas ", text("GAS")),
            (NormalizationRule::Welltype, "invalid", None),
            (NormalizationRule::Basin, "Anadarko", text("ANADARKO")),
            (NormalizationRule::Basin, "PERMIAN ", text("PERMIAN")),
            (NormalizationRule::Basin, "eagle ford", text("EAGLE FORD")),
            (NormalizationRule::Basin, "invalid", None),
            (NormalizationRule::Subbasin, "Central Eagle Ford", text("CENTRAL EAGLE FORD")),
            (NormalizationRule::Subbasin, " scoop", text("SCOOP")),
            (NormalizationRule::Subbasin, "invalid", None),
            (NormalizationRule::State, "Texas ", text("TEXAS")),
            (NormalizationRule::State, "oklahoma ", None),
            (NormalizationRule::County, "pecos", text("PECOS")),
            (NormalizationRule::County, "DeWitt", text("DEWITT")),
            (NormalizationRule::County, "invalid", None),
        ];

        for (rule, raw, expected) in cases {
            assert_eq!(rule.apply(raw, today()), expected, "{} <- {raw:?}", rule.name());
        }
    }

    #[test]
    fn cumulative_volumes_accept_only_plain_digits() {
        for rule in [
            NormalizationRule::Cum12moil,
            NormalizationRule::Cum12mgas,
            NormalizationRule::Cum12mwater,
        ] {
            assert_eq!(rule.apply("44697", today()), Some(NormalizedValue::Count(44697)));
            assert_eq!(rule.apply("0", today()), Some(NormalizedValue::Count(0)));
            assert_eq!(rule.apply("-44697", today()), None);
            assert_eq!(rule.apply("seventeen", today()), None);
            assert_eq!(rule.apply("12.5", today()), None);
            assert_eq!(rule.apply(" 12", today()), None);
            assert_eq!(rule.apply("", today()), None);
            assert_eq!(rule.apply("99999999999999999999999", today()), None);
        }
    }

    #[test]
    fn spud_dates_must_parse_and_not_be_in_the_future() {
        let rule = NormalizationRule::Spuddate;
        assert_eq!(
            rule.apply("2023-07-01", today()),
            Some(NormalizedValue::Date(NaiveDate::from_ymd_opt(2023, 7, 1).unwrap()))
        );
        assert_eq!(
            rule.apply("2025-01-15", today()),
            Some(NormalizedValue::Date(today()))
        );
        assert_eq!(rule.apply("2025-01-16", today()), None);
        assert_eq!(rule.apply("2033-01-01", today()), None);
        assert_eq!(rule.apply("invalid", today()), None);
        assert_eq!(rule.apply("", today()), None);
    }

    #[test]
    fn column_names_resolve_case_insensitively() {
        assert_eq!(
            NormalizationRule::for_column("Direction").unwrap(),
            NormalizationRule::Direction
        );
        assert_eq!(
            NormalizationRule::for_column(" CUM12MGAS ").unwrap(),
            NormalizationRule::Cum12mgas
        );
        assert!(matches!(
            NormalizationRule::for_column("api10"),
            Err(PipelineError::Configuration(_))
        ));
    }

    #[test]
    fn normalize_column_emits_rule_dtypes() {
        let raw: Column = Series::new("cum12moil".into(), &[Some("10"), Some("x"), None]).into();
        let out = NormalizationRule::Cum12moil
            .normalize_column(&raw, today())
            .unwrap();
        assert_eq!(out.dtype(), &DataType::Int64);
        assert_eq!(out.i64().unwrap().get(0), Some(10));
        assert_eq!(out.null_count(), 2);

        let raw: Column = Series::new("spuddate".into(), &["2023-07-01", "2099-01-01"]).into();
        let out = NormalizationRule::Spuddate
            .normalize_column(&raw, today())
            .unwrap();
        assert_eq!(out.dtype(), &DataType::Date);
        assert_eq!(out.null_count(), 1);
    }
}
