use chrono::{Datelike, NaiveDate, TimeDelta, Weekday};
use std::ops::Add;

/// Polish statutory holidays on fixed dates, as (month, day)
const FIXED_HOLIDAYS: [(u32, u32); 9] = [
    (1, 1),   // New Year
    (1, 6),   // Epiphany
    (5, 1),   // Labour Day
    (5, 3),   // Constitution Day
    (8, 15),  // Assumption
    (11, 1),  // All Saints
    (11, 11), // Independence Day
    (12, 25), // Christmas Day
    (12, 26), // Second Christmas Day
];

/// Offsets in days from Easter Sunday for the moveable holidays:
/// Easter Sunday, Easter Monday, Pentecost, Corpus Christi
const EASTER_OFFSETS: [i64; 4] = [0, 1, 49, 60];

/// Returns the date of Western Easter Sunday for the given year.
///
/// Uses the anonymous Gregorian computus, valid for any year from 1583 on.
///
/// # Arguments
///
/// * 'year' - Gregorian calendar year
pub fn easter_sunday(year: i32) -> NaiveDate {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;

    NaiveDate::from_ymd_opt(year, month as u32, day as u32).unwrap()
}

/// Returns whether the given date is a Polish statutory holiday
///
/// # Arguments
///
/// * 'date' - date to check
pub fn is_holiday(date: NaiveDate) -> bool {
    if FIXED_HOLIDAYS.contains(&(date.month(), date.day())) {
        return true;
    }

    let easter = easter_sunday(date.year());
    EASTER_OFFSETS.iter().any(|o| easter.add(TimeDelta::days(*o)) == date)
}

/// Returns whether the given date is a non-working day in Poland,
/// i.e. a weekend day or a statutory holiday
///
/// # Arguments
///
/// * 'date' - date to check
pub fn is_non_working_day(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun) || is_holiday(date)
}
