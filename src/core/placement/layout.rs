//! Directory layouts derived from a capture date.

use crate::error::ConfigError;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Folder for files without a capture date
pub const UNKNOWN_DATE_DIR: &str = "Unknown_Date";

/// Folder structure under the destination root
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DirectoryLayout {
    /// Year/Month (e.g., 2024/Mar/)
    #[default]
    YearMonth,
    /// Year/Month/Day (e.g., 2024/Mar/5/)
    YearMonthDay,
}

impl DirectoryLayout {
    pub const ALL: [DirectoryLayout; 2] = [DirectoryLayout::YearMonth, DirectoryLayout::YearMonthDay];

    /// The layout as written on the command line
    pub fn pattern(&self) -> &'static str {
        match self {
            DirectoryLayout::YearMonth => "YYYY/MMM",
            DirectoryLayout::YearMonthDay => "YYYY/MMM/DD",
        }
    }

    fn name(&self) -> &'static str {
        match self {
            DirectoryLayout::YearMonth => "YEAR_MONTH",
            DirectoryLayout::YearMonthDay => "YEAR_MONTH_DAY",
        }
    }

    /// Relative folder for a date. Months use English short names and days
    /// are not zero-padded.
    pub fn format(&self, date: NaiveDate) -> PathBuf {
        let year = date.year().to_string();
        let month = date.format("%b").to_string();
        let mut path = PathBuf::from(year);
        path.push(month);
        if *self == DirectoryLayout::YearMonthDay {
            path.push(date.day().to_string());
        }
        path
    }

    /// Relative folder for an optional date
    pub fn folder_for(&self, date: Option<NaiveDate>) -> PathBuf {
        match date {
            Some(date) => self.format(date),
            None => PathBuf::from(UNKNOWN_DATE_DIR),
        }
    }
}

impl fmt::Display for DirectoryLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.pattern())
    }
}

impl FromStr for DirectoryLayout {
    type Err = ConfigError;

    /// Accepts the pattern (`YYYY/MMM`), the name (`YEAR_MONTH`), or the
    /// name with `/` for `_`; case and surrounding whitespace are ignored.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim();
        Self::ALL
            .into_iter()
            .find(|layout| {
                wanted.eq_ignore_ascii_case(layout.pattern())
                    || wanted.eq_ignore_ascii_case(layout.name())
                    || wanted.eq_ignore_ascii_case(&layout.name().replace('_', "/"))
            })
            .ok_or_else(|| ConfigError::UnknownLayout {
                value: value.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn march_5() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
    }

    #[test]
    fn month_layout() {
        assert_eq!(
            DirectoryLayout::YearMonth.format(march_5()),
            Path::new("2024/Mar")
        );
    }

    #[test]
    fn day_layout_is_not_zero_padded() {
        assert_eq!(
            DirectoryLayout::YearMonthDay.format(march_5()),
            Path::new("2024/Mar/5")
        );
        let dec_31 = NaiveDate::from_ymd_opt(1999, 12, 31).unwrap();
        assert_eq!(
            DirectoryLayout::YearMonthDay.format(dec_31),
            Path::new("1999/Dec/31")
        );
    }

    #[test]
    fn missing_date_goes_to_unknown_bucket() {
        assert_eq!(
            DirectoryLayout::YearMonthDay.folder_for(None),
            Path::new(UNKNOWN_DATE_DIR)
        );
    }

    #[test]
    fn parse_is_lenient() {
        for value in ["YYYY/MMM", " yyyy/mmm ", "YEAR_MONTH", "year/month"] {
            assert_eq!(
                value.parse::<DirectoryLayout>().unwrap(),
                DirectoryLayout::YearMonth,
                "{value}"
            );
        }
        for value in ["YYYY/MMM/DD", "year_month_day", "YEAR/MONTH/DAY"] {
            assert_eq!(
                value.parse::<DirectoryLayout>().unwrap(),
                DirectoryLayout::YearMonthDay,
                "{value}"
            );
        }
    }

    #[test]
    fn unknown_layout_is_a_config_error() {
        let err = "YYYY-MM".parse::<DirectoryLayout>().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownLayout { .. }));
    }

    #[test]
    fn display_round_trips() {
        for layout in DirectoryLayout::ALL {
            assert_eq!(layout.to_string().parse::<DirectoryLayout>().unwrap(), layout);
        }
    }
}
