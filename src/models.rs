use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Display unit for computed sensor values
///
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub enum PriceUnit {
    #[serde(rename = "PLN/MWh")]
    PlnPerMwh,
    #[serde(rename = "PLN/kWh")]
    PlnPerKwh,
    #[serde(rename = "EUR/MWh")]
    EurPerMwh,
    #[serde(rename = "EUR/kWh")]
    EurPerKwh,
}

impl fmt::Display for PriceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self {
            PriceUnit::PlnPerMwh => "PLN/MWh",
            PriceUnit::PlnPerKwh => "PLN/kWh",
            PriceUnit::EurPerMwh => "EUR/MWh",
            PriceUnit::EurPerKwh => "EUR/kWh",
        };
        write!(f, "{}", unit)
    }
}

/// One delivery hour from the day-ahead report.
///
/// TGE numbers delivery hours 1..=24 where hour 1 covers 00:00-01:00 local
/// time. During the autumn DST transition the report repeats an hour number
/// with a suffix letter (e.g. H02a); such entries are kept as-is.
#[derive(Clone, Serialize, Debug)]
pub struct HourlyPrice {
    pub hour: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dst_suffix: Option<char>,
    pub price: f64,
}

/// A full day of raw day-ahead prices plus day statistics
///
#[derive(Clone, Serialize, Debug)]
pub struct DayPrices {
    pub date: NaiveDate,
    pub hours: Vec<HourlyPrice>,
    pub average_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub negative_hours: usize,
}

impl DayPrices {
    /// Builds a DayPrices from parsed report rows, ordered by delivery hour.
    /// Returns None when no rows were supplied.
    ///
    /// # Arguments
    ///
    /// * 'date' - the delivery date the prices belong to
    /// * 'hours' - hourly prices in report order
    pub fn from_hours(date: NaiveDate, mut hours: Vec<HourlyPrice>) -> Option<DayPrices> {
        if hours.is_empty() {
            return None;
        }
        hours.sort_by_key(|h| h.hour);

        let sum: f64 = hours.iter().map(|h| h.price).sum();
        let min = hours.iter().map(|h| h.price).fold(f64::INFINITY, f64::min);
        let max = hours.iter().map(|h| h.price).fold(f64::NEG_INFINITY, f64::max);
        let negative = hours.iter().filter(|h| h.price < 0.0).count();

        Some(DayPrices {
            date,
            average_price: sum / hours.len() as f64,
            min_price: min,
            max_price: max,
            negative_hours: negative,
            hours,
        })
    }

    /// Returns the price record for a delivery hour (1..=24).
    /// When the autumn DST switch duplicates an hour number, the first
    /// record in report order wins.
    ///
    /// # Arguments
    ///
    /// * 'hour' - delivery hour in TGE numbering
    pub fn price_for_hour(&self, hour: u32) -> Option<&HourlyPrice> {
        self.hours.iter().find(|h| h.hour == hour)
    }
}

/// Per-hour breakdown of the gross end-consumer price, all parts in PLN/MWh
///
#[derive(Clone, Serialize, Debug)]
pub struct PriceComponents {
    pub original_price: f64,
    pub effective_price: f64,
    pub is_negative: bool,
    pub energy_with_vat: f64,
    pub exchange_fee: f64,
    pub distribution_rate: f64,
    pub total_gross: f64,
}

/// A sensor value in the configured unit together with its breakdown
///
#[derive(Clone, Serialize, Debug)]
pub struct SensorValue {
    pub value: f64,
    pub components: PriceComponents,
}

/// Snapshot of all three sensors for one poll cycle
///
#[derive(Serialize, Debug)]
pub struct SensorReadings {
    pub valid_time: DateTime<Local>,
    pub unit: PriceUnit,
    pub current_price: Option<SensorValue>,
    pub next_hour_price: Option<SensorValue>,
    pub daily_average: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hp(hour: u32, price: f64) -> HourlyPrice {
        HourlyPrice { hour, dst_suffix: None, price }
    }

    #[test]
    fn from_hours_computes_day_statistics() {
        let date = NaiveDate::from_ymd_opt(2025, 7, 8).unwrap();
        let day = DayPrices::from_hours(date, vec![hp(2, 300.0), hp(1, -100.0), hp(3, 400.0)]).unwrap();

        assert_eq!(day.hours[0].hour, 1);
        assert_eq!(day.average_price, 200.0);
        assert_eq!(day.min_price, -100.0);
        assert_eq!(day.max_price, 400.0);
        assert_eq!(day.negative_hours, 1);
    }

    #[test]
    fn from_hours_rejects_empty_day() {
        let date = NaiveDate::from_ymd_opt(2025, 7, 8).unwrap();
        assert!(DayPrices::from_hours(date, Vec::new()).is_none());
    }

    #[test]
    fn duplicate_dst_hour_resolves_to_first_record() {
        let date = NaiveDate::from_ymd_opt(2025, 10, 26).unwrap();
        let hours = vec![
            hp(1, 350.0),
            hp(2, 340.0),
            HourlyPrice { hour: 2, dst_suffix: Some('a'), price: 330.0 },
            hp(3, 320.0),
        ];
        let day = DayPrices::from_hours(date, hours).unwrap();

        assert_eq!(day.price_for_hour(2).unwrap().price, 340.0);
        assert_eq!(day.hours.len(), 4);
    }

    #[test]
    fn missing_hour_yields_none() {
        let date = NaiveDate::from_ymd_opt(2025, 7, 8).unwrap();
        let day = DayPrices::from_hours(date, vec![hp(1, 100.0)]).unwrap();
        assert!(day.price_for_hour(5).is_none());
    }
}
