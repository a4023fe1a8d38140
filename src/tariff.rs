use chrono::{Datelike, NaiveDateTime, Timelike};
use crate::calendar;
use crate::config::FeeParameters;
use crate::models::{PriceComponents, PriceUnit};

/// Converts raw day-ahead prices into gross end-consumer prices.
///
/// Holds the fee configuration for the lifetime of the process; all
/// methods are pure over their arguments, the timestamp is always passed
/// in by the caller.
pub struct Tariff {
    unit: PriceUnit,
    exchange_fee: f64,
    vat_rate: f64,
    dist_low: f64,
    dist_med: f64,
    dist_high: f64,
    eur_pln_rate: f64,
}

impl Tariff {
    /// Returns a new Tariff engine
    ///
    /// # Arguments
    ///
    /// * 'config' - fee configuration parameters
    pub fn new(config: &FeeParameters) -> Tariff {
        Tariff {
            unit: config.unit,
            exchange_fee: config.exchange_fee,
            vat_rate: config.vat_rate,
            dist_low: config.dist_low,
            dist_med: config.dist_med,
            dist_high: config.dist_high,
            eur_pln_rate: config.eur_pln_rate,
        }
    }

    /// Returns the configured display unit
    ///
    pub fn unit(&self) -> PriceUnit {
        self.unit
    }

    /// Selects the distribution rate for a local timestamp.
    ///
    /// Non-working days (weekends and Polish statutory holidays) are billed
    /// at the low rate for all 24 hours. Working days use half-open hour
    /// bands that differ between summer (April-September) and winter
    /// (October-March).
    ///
    /// # Arguments
    ///
    /// * 'local_time' - local wall-clock time of the delivery hour
    pub fn distribution_rate(&self, local_time: NaiveDateTime) -> f64 {
        let date = local_time.date();
        if calendar::is_non_working_day(date) {
            return self.dist_low;
        }

        let hour = local_time.hour();
        let summer = (4..=9).contains(&date.month());

        if (7..13).contains(&hour) {
            self.dist_med
        } else if summer && (19..22).contains(&hour) {
            self.dist_high
        } else if !summer && (16..21).contains(&hour) {
            self.dist_high
        } else {
            self.dist_low
        }
    }

    /// Computes the gross price breakdown for one delivery hour in PLN/MWh.
    ///
    /// Negative market prices yield zero energy cost (prosumer rule) while
    /// the exchange fee and the distribution rate are still charged; VAT is
    /// applied to the floored energy price only.
    ///
    /// # Arguments
    ///
    /// * 'raw_price' - raw day-ahead price in PLN/MWh, may be negative
    /// * 'local_time' - local wall-clock time of the delivery hour
    pub fn components(&self, raw_price: f64, local_time: NaiveDateTime) -> PriceComponents {
        let effective = raw_price.max(0.0);
        let energy_with_vat = effective * (1.0 + self.vat_rate);
        let distribution_rate = self.distribution_rate(local_time);

        PriceComponents {
            original_price: raw_price,
            effective_price: effective,
            is_negative: raw_price < 0.0,
            energy_with_vat,
            exchange_fee: self.exchange_fee,
            distribution_rate,
            total_gross: energy_with_vat + self.exchange_fee + distribution_rate,
        }
    }

    /// Converts a PLN/MWh value into the configured display unit
    ///
    /// # Arguments
    ///
    /// * 'pln_per_mwh' - gross price in PLN/MWh
    pub fn convert(&self, pln_per_mwh: f64) -> f64 {
        match self.unit {
            PriceUnit::PlnPerMwh => pln_per_mwh,
            PriceUnit::PlnPerKwh => pln_per_mwh / 1000.0,
            PriceUnit::EurPerMwh => pln_per_mwh / self.eur_pln_rate,
            PriceUnit::EurPerKwh => pln_per_mwh / self.eur_pln_rate / 1000.0,
        }
    }
}
