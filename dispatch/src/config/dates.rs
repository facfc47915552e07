use crate::catalog::DATE_FORMAT;
use chrono::{Days, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A configured date, either fixed or relative to the day of the run
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(try_from = "String", into = "String")]
pub enum DateSpec {
    Today,
    Fixed(NaiveDate),
}

impl TryFrom<String> for DateSpec {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let value = value.trim();

        if value.eq_ignore_ascii_case("today") {
            Ok(Self::Today)
        } else {
            NaiveDate::parse_from_str(value, DATE_FORMAT)
                .map(Self::Fixed)
                .map_err(|error| {
                    format!("Error parsing date '{value}': {error}. Ensure it follows the format 'dd-mm-yyyy' or is 'today'")
                })
        }
    }
}

impl From<DateSpec> for String {
    fn from(value: DateSpec) -> Self {
        value.to_string()
    }
}

impl fmt::Display for DateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Today => f.write_str("today"),
            Self::Fixed(date) => write!(f, "{}", date.format(DATE_FORMAT)),
        }
    }
}

impl DateSpec {
    pub fn resolve_start(&self, today: NaiveDate) -> NaiveDate {
        match self {
            Self::Today => today,
            Self::Fixed(date) => *date,
        }
    }

    /// `today` as an end date means yesterday, the current day is still being published
    pub fn resolve_end(&self, today: NaiveDate) -> NaiveDate {
        match self {
            Self::Today => today.checked_sub_days(Days::new(1)).unwrap_or(today),
            Self::Fixed(date) => *date,
        }
    }
}

pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}
