use crate::model::DayKind;
use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    #[error("invalid year/month: {year}-{month:02}")]
    InvalidMonth { year: i32, month: u32 },
}

/// Un jour du mois, avec sa classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayInfo {
    pub date: NaiveDate,
    /// 0 = lundi … 6 = dimanche
    pub weekday: u8,
    pub is_weekend: bool,
}

impl DayInfo {
    pub fn new(date: NaiveDate) -> Self {
        let weekday = date.weekday().num_days_from_monday() as u8;
        Self {
            date,
            weekday,
            is_weekend: weekday >= 5,
        }
    }

    pub fn iso(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    pub fn kind(&self) -> DayKind {
        if self.is_weekend {
            DayKind::Weekend
        } else {
            DayKind::Weekday
        }
    }
}

pub fn day_kind(date: NaiveDate) -> DayKind {
    match date.weekday() {
        Weekday::Sat | Weekday::Sun => DayKind::Weekend,
        _ => DayKind::Weekday,
    }
}

/// Bornes `[début, fin)` du mois.
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate), CalendarError> {
    let invalid = || CalendarError::InvalidMonth { year, month };
    let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let end = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(invalid)?;
    Ok((start, end))
}

pub fn month_days(year: i32, month: u32) -> Result<Vec<DayInfo>, CalendarError> {
    let (start, end) = month_bounds(year, month)?;
    Ok(start
        .iter_days()
        .take_while(|d| *d < end)
        .map(DayInfo::new)
        .collect())
}

/// Jours de semaine du mois hors jours fériés : base de l'objectif d'heures minimal.
pub fn count_weekdays_excluding_holidays(
    year: i32,
    month: u32,
    holidays: &BTreeSet<NaiveDate>,
) -> Result<u32, CalendarError> {
    let days = month_days(year, month)?;
    let count = days
        .iter()
        .filter(|d| !d.is_weekend && !holidays.contains(&d.date))
        .count();
    Ok(count as u32)
}

pub fn in_month(year: i32, month: u32, date: NaiveDate) -> bool {
    date.year() == year && date.month() == month
}
