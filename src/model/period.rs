use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// A calendar month. Stored as the first day of that month and rendered
/// as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period(NaiveDate);

impl Period {
    pub fn from_date(date: NaiveDate) -> Self {
        Period(date.with_day(1).unwrap_or(date))
    }

    pub fn first_day(&self) -> NaiveDate {
        self.0
    }
}

impl From<NaiveDate> for Period {
    fn from(date: NaiveDate) -> Self {
        Period::from_date(date)
    }
}

impl FromStr for Period {
    type Err = AppError;

    /// Accepts `YYYY-MM` or a full `YYYY-MM-DD` date inside the month.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parsed = NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d"));

        match parsed {
            Ok(date) => Ok(Period::from_date(date)),
            Err(_) => Err(AppError::unprocessable(format!(
                "Invalid month '{s}', expected YYYY-MM"
            ))),
        }
    }
}

impl TryFrom<String> for Period {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Period> for String {
    fn from(period: Period) -> Self {
        period.to_string()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m"))
    }
}
