use std::{fs, thread};
use std::time::Duration;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use glob::glob;
use log::{debug, error, info, warn};
use thiserror::Error;
use crate::config::{Config, Files};
use crate::initialization::Mgr;
use crate::manager_tge::TgeError;
use crate::models::{DayPrices, SensorReadings};
use crate::sensors;
use crate::{retry, wrapper};

/// Artifacts older than this are pruned from the state directories
const KEEP_HOURS: i64 = 48;

/// Explicit state carried across poll cycles.
///
/// The cached days, the tomorrow-published flag and the hour tracker all
/// live here and nowhere else; every cycle receives the state and the
/// sampled clock as arguments.
pub struct PollState {
    pub today: Option<DayPrices>,
    pub tomorrow: Option<DayPrices>,
    pub tomorrow_available: bool,
    pub last_hour: Option<u32>,
    pub alerted_on: Option<NaiveDate>,
}

impl PollState {
    pub fn new() -> PollState {
        PollState {
            today: None,
            tomorrow: None,
            tomorrow_available: false,
            last_hour: None,
            alerted_on: None,
        }
    }

    /// Advances the cached days to a new calendar date.
    ///
    /// When the date has rolled past the cached "today", a cached
    /// "tomorrow" matching the new date is promoted and the published
    /// flag starts over. A cached tomorrow is left alone as long as the
    /// date has not advanced, even when today's fetch keeps failing.
    ///
    /// # Arguments
    ///
    /// * 'date' - the current calendar date
    fn roll_over(&mut self, date: NaiveDate) {
        let stale = self.today.as_ref().is_some_and(|d| d.date != date);
        let promotable = self.tomorrow.as_ref().is_some_and(|d| d.date == date);

        if promotable {
            info!("rolling over to {}: promoting cached tomorrow", date);
            self.today = self.tomorrow.take();
            self.tomorrow_available = false;
        } else if stale {
            self.today = None;
            self.tomorrow = None;
            self.tomorrow_available = false;
        }
    }
}

/// Runs the polling loop until a fatal error occurs.
///
/// Fetch failures are absorbed (the cache keeps serving), while failures
/// to persist state or to alert are fatal and propagate to the caller.
///
/// # Arguments
///
/// * 'config' - configuration
/// * 'mgr' - struct with configured managers
pub fn run(config: &Config, mgr: &Mgr) -> Result<(), WorkerError> {
    let mut state = PollState::new();
    info!("entering poll loop");

    loop {
        let now = Local::now();
        poll_once(&mut state, now, mgr, &config.files)?;
        thread::sleep(poll_interval(now.time()));
    }
}

/// Executes one poll cycle: refresh the cached days, compute the three
/// sensor readings and persist a snapshot
///
/// # Arguments
///
/// * 'state' - poll state carried between cycles
/// * 'now' - the sampled local time for this cycle
/// * 'mgr' - struct with configured managers
/// * 'files' - artifact directory configuration
pub fn poll_once(state: &mut PollState, now: DateTime<Local>, mgr: &Mgr, files: &Files) -> Result<(), WorkerError> {
    let today_date = now.date_naive();
    state.roll_over(today_date);

    // Today's report is refetched every cycle since corrected reports are
    // republished during the day; the cache covers fetch failures.
    match retry!(||mgr.tge.get_day_prices(today_date)) {
        Ok(day) => {
            save_day_prices(&files.prices_dir, &day, now.naive_local())?;
            state.today = Some(day);
        }
        Err(TgeError::NotPublished(date)) => info!("report for {} not yet published", date),
        Err(e) => warn!("failed fetching today's prices: {}", e),
    }

    let tomorrow_date = today_date
        .succ_opt()
        .ok_or(WorkerError::DateError(format!("no successor for {}", today_date)))?;

    // Tomorrow's report is routinely absent until mid-afternoon, so a
    // single attempt per cycle is enough; the poll cadence is the retry.
    if should_fetch_tomorrow(now.time(), state.tomorrow_available) {
        match mgr.tge.get_day_prices(tomorrow_date) {
            Ok(day) => {
                info!("tomorrow's prices available: {} hours", day.hours.len());
                save_day_prices(&files.prices_dir, &day, now.naive_local())?;
                state.tomorrow = Some(day);
                state.tomorrow_available = true;
            }
            Err(TgeError::NotPublished(date)) => debug!("report for {} not yet published", date),
            Err(e) => warn!("failed fetching tomorrow's prices: {}", e),
        }
    }

    if state.last_hour != Some(now.hour()) {
        if let Some(prev) = state.last_hour {
            info!("hour {} -> {}", prev, now.hour());
        }
        state.last_hour = Some(now.hour());
    }

    let readings = sensors::read_all(&mgr.tariff, state.today.as_ref(), state.tomorrow.as_ref(), now);
    save_sensor_state(&files.state_dir, &readings)?;

    // One alert per day at most; recovery is visible in the snapshots
    if state.today.is_none() && state.alerted_on != Some(today_date) {
        error!("no prices available for {}", today_date);
        mgr.mail.send_alert(
            "No prices for today",
            format!("No day-ahead prices could be retrieved for {}.", today_date),
        ).map_err(|e| WorkerError::AlertError(e.to_string()))?;
        state.alerted_on = Some(today_date);
    }

    Ok(())
}

/// Poll cadence over the day: tight after midnight while the current day
/// settles, tighter again around the early-afternoon publication window,
/// relaxed otherwise
///
/// # Arguments
///
/// * 'time' - local wall-clock time
pub fn poll_interval(time: NaiveTime) -> Duration {
    let minute = time.hour() * 60 + time.minute();

    let secs = if (5..=60).contains(&minute) {
        300
    } else if (660..=720).contains(&minute) {
        900
    } else if (720..=960).contains(&minute) {
        600
    } else {
        1800
    };

    Duration::from_secs(secs)
}

/// Whether tomorrow's report should be requested this cycle: always during
/// the 12:00-16:00 publication window, and until the first success between
/// 16:00 and 22:00
///
/// # Arguments
///
/// * 'time' - local wall-clock time
/// * 'tomorrow_available' - whether tomorrow's report was already obtained
pub fn should_fetch_tomorrow(time: NaiveTime, tomorrow_available: bool) -> bool {
    let minute = time.hour() * 60 + time.minute();

    (720..=960).contains(&minute) || ((961..1320).contains(&minute) && !tomorrow_available)
}

/// Saves a sensor snapshot for consumption by the presentation side
///
/// # Arguments
///
/// * 'path' - path to the state directory
/// * 'readings' - the snapshot to save
fn save_sensor_state(path: &str, readings: &SensorReadings) -> Result<(), WorkerError> {
    let filename = format!("{}{}_sensors.json", path, readings.valid_time.format("%Y%m%d%H%M"));

    let json = serde_json::to_string_pretty(readings)
        .map_err(|e| WorkerError::SaveStateError(format!("error serializing snapshot: {}", e)))?;

    fs::write(&filename, json)
        .map_err(|e| WorkerError::SaveStateError(format!("error writing snapshot to file: {}", e)))?;

    clean_up_files(&format!("{}*_sensors.json", path), readings.valid_time.naive_local())?;

    debug!("sensor snapshot saved to {}", filename);

    Ok(())
}

/// Saves a day of raw prices, overwriting any earlier revision of the day
///
/// # Arguments
///
/// * 'path' - path to the prices directory
/// * 'day' - the day prices to save
/// * 'gate_date_time' - the cycle time used to judge artifact age
fn save_day_prices(path: &str, day: &DayPrices, gate_date_time: NaiveDateTime) -> Result<(), WorkerError> {
    let filename = format!("{}{}0000_prices.json", path, day.date.format("%Y%m%d"));

    let json = serde_json::to_string_pretty(day)
        .map_err(|e| WorkerError::SavePricesError(format!("error serializing day prices: {}", e)))?;

    fs::write(&filename, json)
        .map_err(|e| WorkerError::SavePricesError(format!("error writing day prices to file: {}", e)))?;

    clean_up_files(&format!("{}*_prices.json", path), gate_date_time)?;

    Ok(())
}

/// Removes any files following the pattern that are older than KEEP_HOURS,
/// judged by their 12-digit timestamp prefix
///
/// # Arguments
///
/// * 'pattern' - file pattern
/// * 'gate_date_time' - the date time representing a newly created file
fn clean_up_files(pattern: &str, gate_date_time: NaiveDateTime) -> Result<(), WorkerError> {
    let entries = glob(pattern)
        .map_err(|e| WorkerError::CleanUpError(format!("error reading files with pattern {}: {}", pattern, e)))?;

    for path in entries.flatten() {
        let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if filename.len() < 12 {
            continue;
        }
        let Ok(datetime) = NaiveDateTime::parse_from_str(&filename[0..12], "%Y%m%d%H%M") else {
            debug!("skipping file without timestamp prefix: {}", filename);
            continue;
        };
        if gate_date_time - datetime > TimeDelta::hours(KEEP_HOURS) {
            fs::remove_file(&path)
                .map_err(|e| WorkerError::CleanUpError(format!("error removing file: {}", e)))?;
        }
    }

    Ok(())
}

/// Error depicting errors that occur while running the poll loop
///
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("error while saving sensor snapshot: {0}")]
    SaveStateError(String),
    #[error("error while saving day prices: {0}")]
    SavePricesError(String),
    #[error("error while cleaning up old files: {0}")]
    CleanUpError(String),
    #[error("error while sending alert: {0}")]
    AlertError(String),
    #[error("error while handling dates: {0}")]
    DateError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HourlyPrice;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> DayPrices {
        DayPrices::from_hours(
            NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            vec![HourlyPrice { hour: 1, dst_suffix: None, price: 100.0 }],
        ).unwrap()
    }

    #[test]
    fn poll_cadence_over_the_day() {
        assert_eq!(poll_interval(t(0, 4)), Duration::from_secs(1800));
        assert_eq!(poll_interval(t(0, 5)), Duration::from_secs(300));
        assert_eq!(poll_interval(t(1, 0)), Duration::from_secs(300));
        assert_eq!(poll_interval(t(1, 1)), Duration::from_secs(1800));
        assert_eq!(poll_interval(t(11, 0)), Duration::from_secs(900));
        assert_eq!(poll_interval(t(12, 0)), Duration::from_secs(900));
        assert_eq!(poll_interval(t(12, 1)), Duration::from_secs(600));
        assert_eq!(poll_interval(t(16, 0)), Duration::from_secs(600));
        assert_eq!(poll_interval(t(16, 1)), Duration::from_secs(1800));
        assert_eq!(poll_interval(t(22, 30)), Duration::from_secs(1800));
    }

    #[test]
    fn tomorrow_window_gating() {
        assert!(!should_fetch_tomorrow(t(11, 59), false));
        assert!(should_fetch_tomorrow(t(12, 0), false));
        assert!(should_fetch_tomorrow(t(16, 0), true));
        assert!(should_fetch_tomorrow(t(17, 0), false));
        assert!(!should_fetch_tomorrow(t(17, 0), true));
        assert!(!should_fetch_tomorrow(t(22, 0), false));
        assert!(!should_fetch_tomorrow(t(3, 0), false));
    }

    #[test]
    fn roll_over_promotes_matching_tomorrow() {
        let mut state = PollState::new();
        state.today = Some(day(2025, 7, 8));
        state.tomorrow = Some(day(2025, 7, 9));
        state.tomorrow_available = true;

        state.roll_over(NaiveDate::from_ymd_opt(2025, 7, 9).unwrap());

        assert_eq!(state.today.as_ref().unwrap().date, NaiveDate::from_ymd_opt(2025, 7, 9).unwrap());
        assert!(state.tomorrow.is_none());
        assert!(!state.tomorrow_available);
    }

    #[test]
    fn roll_over_clears_stale_days() {
        let mut state = PollState::new();
        state.today = Some(day(2025, 7, 8));
        state.tomorrow = Some(day(2025, 7, 9));

        // Two days later, neither cached day is usable
        state.roll_over(NaiveDate::from_ymd_opt(2025, 7, 11).unwrap());

        assert!(state.today.is_none());
        assert!(state.tomorrow.is_none());
    }

    #[test]
    fn roll_over_keeps_tomorrow_while_date_is_unchanged() {
        let mut state = PollState::new();
        state.tomorrow = Some(day(2025, 7, 9));
        state.tomorrow_available = true;

        // Today's fetch has been failing all day; the cached tomorrow
        // must survive cycles where today is absent
        state.roll_over(NaiveDate::from_ymd_opt(2025, 7, 8).unwrap());

        assert!(state.today.is_none());
        assert!(state.tomorrow.is_some());
        assert!(state.tomorrow_available);
    }

    #[test]
    fn roll_over_is_a_noop_on_the_current_day() {
        let mut state = PollState::new();
        state.today = Some(day(2025, 7, 8));
        state.tomorrow = Some(day(2025, 7, 9));
        state.tomorrow_available = true;

        state.roll_over(NaiveDate::from_ymd_opt(2025, 7, 8).unwrap());

        assert!(state.today.is_some());
        assert!(state.tomorrow.is_some());
        assert!(state.tomorrow_available);
    }
}
