use std::io::Cursor;
use std::time::Duration;
use calamine::{Data, Range, Reader, Xlsx, XlsxError};
use chrono::{Datelike, NaiveDate};
use log::{debug, info};
use reqwest::blocking::Client;
use thiserror::Error;
use crate::config::TgeParameters;
use crate::models::{DayPrices, HourlyPrice};

/// Sheet holding the auction results in the daily report workbook
const RESULTS_SHEET: &str = "WYNIKI";

/// Known column layout of the results sheet, used when the header row
/// cannot be located: delivery-hour label, Fixing I price, Fixing II price
const TIME_LABEL_COL: usize = 8;
const FIXING_I_COL: usize = 10;
const FIXING_II_COL: usize = 12;

/// Suffixes under which a delivery-day report may be published.
/// Corrected reports are uploaded under a new name, so all variants are
/// tried in order until one responds with a workbook.
const REPORT_SUFFIXES: [&str; 9] = ["", "_2", "_3", "_4", "ost", "_ost", "_final", "_v2", "_v3"];

/// Manager for retrieving day-ahead prices from the TGE RDN daily reports
///
pub struct Tge {
    client: Client,
    base_url: String,
}

impl Tge {
    /// Returns a Tge struct ready for fetching day-ahead reports
    ///
    /// # Arguments
    ///
    /// * 'config' - TGE endpoint configuration
    pub fn new(config: &TgeParameters) -> Result<Tge, TgeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Tge {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Retrieves day-ahead prices for the given delivery date.
    ///
    /// A missing report is a routine state (tomorrow's prices are published
    /// mid-afternoon) and is reported as TgeError::NotPublished.
    ///
    /// # Arguments
    ///
    /// * 'date' - the delivery date to retrieve prices for
    pub fn get_day_prices(&self, date: NaiveDate) -> Result<DayPrices, TgeError> {
        let bytes = self.download_report(date)?;
        self.parse_report(&bytes, date)
    }

    /// Candidate report URLs for a delivery date, in publication order
    ///
    /// # Arguments
    ///
    /// * 'date' - the delivery date the report covers
    fn report_urls(&self, date: NaiveDate) -> Vec<String> {
        let base = format!(
            "{}/A_SDAC%20{}/RDN/Raport_RDN_dzie_dostawy_delivery_day_{}_{:02}_{:02}",
            self.base_url, date.year(), date.year(), date.month(), date.day());

        REPORT_SUFFIXES.iter().map(|s| format!("{}{}.xlsx", base, s)).collect()
    }

    /// Downloads the report workbook, trying all published name variants
    ///
    /// # Arguments
    ///
    /// * 'date' - the delivery date the report covers
    fn download_report(&self, date: NaiveDate) -> Result<Vec<u8>, TgeError> {
        let urls = self.report_urls(date);

        for (attempt, url) in urls.iter().enumerate() {
            let response = match self.client.get(url).send() {
                Ok(r) => r,
                Err(e) => {
                    debug!("report attempt {}/{} failed: {}", attempt + 1, urls.len(), e);
                    continue;
                }
            };
            if !response.status().is_success() {
                continue;
            }
            let bytes = match response.bytes() {
                Ok(b) => b,
                Err(e) => {
                    debug!("report attempt {}/{} failed reading body: {}", attempt + 1, urls.len(), e);
                    continue;
                }
            };
            // Error pages come back as 200 with HTML; a real report is a ZIP container
            if bytes.len() > 100 && bytes.starts_with(b"PK") {
                info!("report for {} found at attempt {}/{}", date, attempt + 1, urls.len());
                return Ok(bytes.to_vec());
            }
        }

        Err(TgeError::NotPublished(date))
    }

    /// Parses the results sheet of a report workbook into DayPrices
    ///
    /// # Arguments
    ///
    /// * 'bytes' - the workbook content
    /// * 'date' - the delivery date the report covers
    fn parse_report(&self, bytes: &[u8], date: NaiveDate) -> Result<DayPrices, TgeError> {
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))?;

        let range = match workbook.worksheet_range(RESULTS_SHEET) {
            Ok(r) => r,
            Err(_) => {
                let names = workbook.sheet_names().to_vec();
                let first = names.first().ok_or(TgeError::EmptyReport)?;
                workbook.worksheet_range(first)?
            }
        };

        let (fixing_i_col, fixing_ii_col) = locate_price_columns(&range);

        let mut hours: Vec<HourlyPrice> = Vec::new();
        for row in range.rows() {
            let Some(label) = row.get(TIME_LABEL_COL).and_then(cell_text) else {
                continue;
            };
            let Some((hour, dst_suffix)) = parse_delivery_hour(label) else {
                continue;
            };
            // Fixing I is the canonical price, Fixing II the fallback
            let price = row.get(fixing_i_col).and_then(cell_price)
                .or_else(|| row.get(fixing_ii_col).and_then(cell_price));
            let Some(price) = price else {
                continue;
            };

            hours.push(HourlyPrice { hour, dst_suffix, price });
        }

        DayPrices::from_hours(date, hours).ok_or(TgeError::EmptyReport)
    }
}

/// Locates the Fixing I and Fixing II price columns from the sheet header,
/// falling back to the known report layout when no header is found
///
/// # Arguments
///
/// * 'range' - the results sheet
fn locate_price_columns(range: &Range<Data>) -> (usize, usize) {
    let mut fixing_i = None;
    let mut fixing_ii = None;

    for row in range.rows().take(10) {
        for (idx, cell) in row.iter().enumerate() {
            if let Data::String(s) = cell {
                let header = s.to_lowercase();
                if header.contains("fixing ii") {
                    fixing_ii.get_or_insert(idx);
                } else if header.contains("fixing i") {
                    fixing_i.get_or_insert(idx);
                }
            }
        }
        if fixing_i.is_some() && fixing_ii.is_some() {
            break;
        }
    }

    (fixing_i.unwrap_or(FIXING_I_COL), fixing_ii.unwrap_or(FIXING_II_COL))
}

/// Extracts the text content of a label cell
///
fn cell_text(cell: &Data) -> Option<&str> {
    match cell {
        Data::String(s) => Some(s.as_str()),
        _ => None,
    }
}

/// Extracts a price from a cell, tolerating string cells with a decimal comma
///
fn cell_price(cell: &Data) -> Option<f64> {
    match cell {
        Data::Float(f) => Some(*f),
        Data::Int(i) => Some(*i as f64),
        Data::String(s) => {
            let cleaned: String = s.replace(',', ".").chars().filter(|c| !c.is_whitespace()).collect();
            if cleaned.is_empty() || cleaned == "-" {
                None
            } else {
                cleaned.parse().ok()
            }
        }
        _ => None,
    }
}

/// Parses a delivery-hour label such as "25-11-21_H03" or "2025-10-26_H02a".
///
/// Quarter-hour product rows ("..._Q00:15") and anything else that does not
/// name a delivery hour 1..=24 yield None. The optional trailing letter is
/// the DST marker for the repeated hour of the autumn transition.
///
/// # Arguments
///
/// * 'label' - the label cell content
fn parse_delivery_hour(label: &str) -> Option<(u32, Option<char>)> {
    let (date_part, hour_part) = label.split_once('_')?;
    if date_part.is_empty() || !date_part.chars().all(|c| c.is_ascii_digit() || c == '-') {
        return None;
    }

    let digits_and_suffix = hour_part.strip_prefix('H')?;
    let digits: String = digits_and_suffix.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }

    let rest = &digits_and_suffix[digits.len()..];
    let dst_suffix = match rest.len() {
        0 => None,
        1 => {
            let c = rest.chars().next().unwrap();
            if c.is_ascii_lowercase() { Some(c) } else { return None }
        }
        _ => return None,
    };

    let hour: u32 = digits.parse().ok()?;
    (1..=24).contains(&hour).then_some((hour, dst_suffix))
}

/// Error depicting errors that occur while retrieving day-ahead prices
///
#[derive(Error, Debug)]
pub enum TgeError {
    #[error("NetworkError: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("WorkbookError: {0}")]
    WorkbookError(#[from] XlsxError),
    #[error("report for {0} not yet published")]
    NotPublished(NaiveDate),
    #[error("no hourly prices found in report")]
    EmptyReport,
}
