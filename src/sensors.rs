use chrono::{DateTime, Local, TimeDelta, Timelike};
use crate::models::{DayPrices, SensorReadings, SensorValue};
use crate::tariff::Tariff;

/// Computes all three sensor readings for one poll cycle.
///
/// Absent data (a day not yet published, or a delivery hour missing from
/// the report) yields None for the affected sensors; this is a routine
/// state, not an error.
///
/// # Arguments
///
/// * 'tariff' - the tariff engine
/// * 'today' - cached prices for the current day, if available
/// * 'tomorrow' - cached prices for the next day, if available
/// * 'now' - the current local time
pub fn read_all(
    tariff: &Tariff,
    today: Option<&DayPrices>,
    tomorrow: Option<&DayPrices>,
    now: DateTime<Local>,
) -> SensorReadings {
    SensorReadings {
        valid_time: now,
        unit: tariff.unit(),
        current_price: current_price(tariff, today, now),
        next_hour_price: next_hour_price(tariff, today, tomorrow, now),
        daily_average: daily_average(tariff, today),
    }
}

/// Gross price for the delivery hour containing 'now'.
/// TGE delivery hour N covers local [N-1, N), so the running hour is
/// now.hour() + 1 in TGE numbering.
///
/// # Arguments
///
/// * 'tariff' - the tariff engine
/// * 'today' - cached prices for the current day, if available
/// * 'now' - the current local time
pub fn current_price(tariff: &Tariff, today: Option<&DayPrices>, now: DateTime<Local>) -> Option<SensorValue> {
    let record = today?.price_for_hour(now.hour() + 1)?;
    let components = tariff.components(record.price, now.naive_local());

    Some(SensorValue {
        value: tariff.convert(components.total_gross),
        components,
    })
}

/// Gross price for the delivery hour after the one containing 'now'.
/// Past hour 24 the lookup rolls into tomorrow's data; band selection
/// always uses now + 1h, which rolls into tomorrow's date with it.
///
/// # Arguments
///
/// * 'tariff' - the tariff engine
/// * 'today' - cached prices for the current day, if available
/// * 'tomorrow' - cached prices for the next day, if available
/// * 'now' - the current local time
pub fn next_hour_price(
    tariff: &Tariff,
    today: Option<&DayPrices>,
    tomorrow: Option<&DayPrices>,
    now: DateTime<Local>,
) -> Option<SensorValue> {
    let next_hour = now.hour() + 2;
    let at = now + TimeDelta::hours(1);

    let record = if next_hour > 24 {
        tomorrow?.price_for_hour(next_hour - 24)?
    } else {
        today?.price_for_hour(next_hour)?
    };
    let components = tariff.components(record.price, at.naive_local());

    Some(SensorValue {
        value: tariff.convert(components.total_gross),
        components,
    })
}

/// Mean gross price over all of today's delivery hours, each priced with
/// its own local timestamp for band selection
///
/// # Arguments
///
/// * 'tariff' - the tariff engine
/// * 'today' - cached prices for the current day, if available
pub fn daily_average(tariff: &Tariff, today: Option<&DayPrices>) -> Option<f64> {
    let day = today?;
    if day.hours.is_empty() {
        return None;
    }

    let sum: f64 = day.hours.iter()
        .map(|h| {
            let at = day.date.and_hms_opt(h.hour - 1, 0, 0).unwrap();
            tariff.components(h.price, at).total_gross
        })
        .sum();

    Some(tariff.convert(sum / day.hours.len() as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use crate::config::FeeParameters;
    use crate::models::{HourlyPrice, PriceUnit};

    fn tariff(unit: PriceUnit) -> Tariff {
        Tariff::new(&FeeParameters {
            unit,
            exchange_fee: 2.0,
            vat_rate: 0.23,
            dist_low: 90.0,
            dist_med: 120.0,
            dist_high: 150.0,
            eur_pln_rate: 4.3,
        })
    }

    fn day(y: i32, m: u32, d: u32, prices: &[(u32, f64)]) -> DayPrices {
        let hours = prices.iter()
            .map(|(hour, price)| HourlyPrice { hour: *hour, dst_suffix: None, price: *price })
            .collect();
        DayPrices::from_hours(NaiveDate::from_ymd_opt(y, m, d).unwrap(), hours).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn current_price_uses_running_delivery_hour() {
        let t = tariff(PriceUnit::PlnPerMwh);
        // Tuesday in July, 09:30 falls into delivery hour 10, morning peak
        let today = day(2025, 7, 8, &[(9, 50.0), (10, 100.0), (11, 200.0)]);
        let value = current_price(&t, Some(&today), at(2025, 7, 8, 9, 30)).unwrap();

        assert_eq!(value.components.original_price, 100.0);
        assert!((value.value - 245.0).abs() < 1e-9);
    }

    #[test]
    fn current_price_without_data_is_unavailable() {
        let t = tariff(PriceUnit::PlnPerMwh);
        assert!(current_price(&t, None, at(2025, 7, 8, 9, 30)).is_none());

        let sparse = day(2025, 7, 8, &[(1, 50.0)]);
        assert!(current_price(&t, Some(&sparse), at(2025, 7, 8, 9, 30)).is_none());
    }

    #[test]
    fn next_hour_within_today() {
        let t = tariff(PriceUnit::PlnPerMwh);
        let today = day(2025, 7, 8, &[(11, 100.0), (12, 300.0)]);
        let value = next_hour_price(&t, Some(&today), None, at(2025, 7, 8, 10, 15)).unwrap();

        // Delivery hour 12 priced at 11:15, still in the morning peak
        assert_eq!(value.components.original_price, 300.0);
        assert_eq!(value.components.distribution_rate, 120.0);
    }

    #[test]
    fn next_hour_rolls_into_tomorrow_after_23() {
        let t = tariff(PriceUnit::PlnPerMwh);
        let today = day(2025, 7, 8, &[(24, 500.0)]);
        let tomorrow = day(2025, 7, 9, &[(1, 80.0)]);
        let value = next_hour_price(&t, Some(&today), Some(&tomorrow), at(2025, 7, 8, 23, 10)).unwrap();

        // Tomorrow's hour 1, band selected at 00:10 of the rolled-over date
        assert_eq!(value.components.original_price, 80.0);
        assert_eq!(value.components.distribution_rate, 90.0);
        assert!((value.value - (80.0 * 1.23 + 2.0 + 90.0)).abs() < 1e-9);
    }

    #[test]
    fn next_hour_rollover_band_uses_tomorrows_calendar() {
        let t = tariff(PriceUnit::PlnPerMwh);
        // Friday 2025-07-11 23:xx: tomorrow is a Saturday, so even though
        // the rolled timestamp is a peakless night hour anyway, a Saturday
        // morning lookup from hour 24 must price with the low weekend rate.
        let tomorrow = day(2025, 7, 12, &[(1, 100.0)]);
        let value = next_hour_price(&t, None, Some(&tomorrow), at(2025, 7, 11, 23, 0)).unwrap();

        assert_eq!(value.components.distribution_rate, 90.0);
    }

    #[test]
    fn next_hour_without_tomorrow_is_unavailable() {
        let t = tariff(PriceUnit::PlnPerMwh);
        let today = day(2025, 7, 8, &[(24, 500.0)]);
        assert!(next_hour_price(&t, Some(&today), None, at(2025, 7, 8, 23, 10)).is_none());
    }

    #[test]
    fn daily_average_prices_each_hour_at_its_own_time() {
        let t = tariff(PriceUnit::PlnPerMwh);
        // Tuesday in July: hour 6 is off-peak (low), hour 10 morning peak (med)
        let today = day(2025, 7, 8, &[(6, 100.0), (10, 100.0)]);
        let avg = daily_average(&t, Some(&today)).unwrap();

        let expected = ((100.0 * 1.23 + 2.0 + 90.0) + (100.0 * 1.23 + 2.0 + 120.0)) / 2.0;
        assert!((avg - expected).abs() < 1e-9);
    }

    #[test]
    fn daily_average_converts_to_configured_unit() {
        let t = tariff(PriceUnit::PlnPerKwh);
        let today = day(2025, 7, 8, &[(6, 100.0)]);
        let avg = daily_average(&t, Some(&today)).unwrap();

        assert!((avg - (100.0 * 1.23 + 2.0 + 90.0) / 1000.0).abs() < 1e-12);
    }

    #[test]
    fn readings_report_unavailable_sensors_as_none() {
        let t = tariff(PriceUnit::PlnPerMwh);
        let readings = read_all(&t, None, None, at(2025, 7, 8, 9, 30));

        assert!(readings.current_price.is_none());
        assert!(readings.next_hour_price.is_none());
        assert!(readings.daily_average.is_none());
        assert_eq!(readings.unit, PriceUnit::PlnPerMwh);
    }

    #[test]
    fn july_morning_peak_current_price_in_pln_kwh() {
        let t = tariff(PriceUnit::PlnPerKwh);
        let today = day(2025, 7, 8, &[(10, 100.0)]);
        let value = current_price(&t, Some(&today), at(2025, 7, 8, 9, 0)).unwrap();

        assert_eq!(value.components.total_gross, 245.0);
        assert_eq!(value.value, 0.245);
    }
}
