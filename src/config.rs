use std::fs;
use log::LevelFilter;
use serde::Deserialize;
use thiserror::Error;
use crate::models::PriceUnit;

/// End-consumer fee configuration, all monetary values in PLN/MWh
///
#[derive(Deserialize)]
pub struct FeeParameters {
    #[serde(default = "default_unit")]
    pub unit: PriceUnit,
    #[serde(default)]
    pub exchange_fee: f64,
    #[serde(default = "default_vat_rate")]
    pub vat_rate: f64,
    #[serde(default)]
    pub dist_low: f64,
    #[serde(default)]
    pub dist_med: f64,
    #[serde(default)]
    pub dist_high: f64,
    #[serde(default = "default_eur_pln_rate")]
    pub eur_pln_rate: f64,
}

#[derive(Deserialize)]
pub struct TgeParameters {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Deserialize)]
pub struct MailParameters {
    pub smtp_user: String,
    pub smtp_password: String,
    pub smtp_endpoint: String,
    pub from: String,
    pub to: String,
}

#[derive(Deserialize)]
pub struct Files {
    pub state_dir: String,
    pub prices_dir: String,
}

#[derive(Deserialize)]
pub struct General {
    pub log_path: String,
    pub log_level: LevelFilter,
    pub log_to_stdout: bool,
}

#[derive(Deserialize)]
pub struct Config {
    pub fees: FeeParameters,
    pub tge: TgeParameters,
    pub mail: MailParameters,
    pub files: Files,
    pub general: General,
}

fn default_unit() -> PriceUnit {
    PriceUnit::PlnPerMwh
}

fn default_vat_rate() -> f64 {
    0.23
}

fn default_eur_pln_rate() -> f64 {
    4.3
}

fn default_base_url() -> String {
    "https://tge.pl/pub/TGE".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Loads the configuration file and returns a struct with all configuration items
///
/// # Arguments
///
/// * 'config_path' - path to the configuration file
pub fn load_config(config_path: &str) -> Result<Config, LoadConfigurationError> {
    let toml = fs::read_to_string(config_path)?;
    let config: Config = toml::from_str(&toml)?;

    validate_fees(&config.fees)?;

    Ok(config)
}

/// Rejects fee values the tariff engine is not defined for.
/// Computation itself never validates, so malformed numbers must not get
/// past this point.
///
/// # Arguments
///
/// * 'fees' - fee configuration to validate
fn validate_fees(fees: &FeeParameters) -> Result<(), LoadConfigurationError> {
    if fees.vat_rate < 0.0 || !fees.vat_rate.is_finite() {
        return Err(LoadConfigurationError::InvalidConfiguration(
            format!("vat_rate must be a non-negative fraction, got {}", fees.vat_rate)));
    }
    for (name, value) in [
        ("exchange_fee", fees.exchange_fee),
        ("dist_low", fees.dist_low),
        ("dist_med", fees.dist_med),
        ("dist_high", fees.dist_high),
    ] {
        if value < 0.0 || !value.is_finite() {
            return Err(LoadConfigurationError::InvalidConfiguration(
                format!("{} must be a non-negative PLN/MWh value, got {}", name, value)));
        }
    }
    if fees.eur_pln_rate <= 0.0 || !fees.eur_pln_rate.is_finite() {
        return Err(LoadConfigurationError::InvalidConfiguration(
            format!("eur_pln_rate must be positive, got {}", fees.eur_pln_rate)));
    }

    Ok(())
}

/// Error depicting errors that occur while loading the configuration
///
#[derive(Debug, Error)]
pub enum LoadConfigurationError {
    #[error("IoError: {0}")]
    IoError(#[from] std::io::Error),
    #[error("ParseError: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("InvalidConfiguration: {0}")]
    InvalidConfiguration(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [fees]
        unit = "PLN/kWh"
        exchange_fee = 2.0
        vat_rate = 0.23
        dist_low = 90.0
        dist_med = 120.0
        dist_high = 150.0

        [tge]

        [mail]
        smtp_user = "user"
        smtp_password = "secret"
        smtp_endpoint = "smtp.example.com"
        from = "monitor@example.com"
        to = "owner@example.com"

        [files]
        state_dir = "/var/lib/tge/state/"
        prices_dir = "/var/lib/tge/prices/"

        [general]
        log_path = "/var/log/tge/monitor.log"
        log_level = "INFO"
        log_to_stdout = false
    "#;

    #[test]
    fn parses_config_with_defaults() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        validate_fees(&config.fees).unwrap();

        assert_eq!(config.fees.unit, PriceUnit::PlnPerKwh);
        assert_eq!(config.fees.eur_pln_rate, 4.3);
        assert_eq!(config.tge.base_url, "https://tge.pl/pub/TGE");
        assert_eq!(config.tge.timeout_secs, 30);
    }

    #[test]
    fn rejects_negative_vat_rate() {
        let toml = MINIMAL.replace("vat_rate = 0.23", "vat_rate = -0.5");
        let config: Config = toml::from_str(&toml).unwrap();
        assert!(matches!(
            validate_fees(&config.fees),
            Err(LoadConfigurationError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn rejects_negative_distribution_rate() {
        let toml = MINIMAL.replace("dist_med = 120.0", "dist_med = -1.0");
        let config: Config = toml::from_str(&toml).unwrap();
        assert!(matches!(
            validate_fees(&config.fees),
            Err(LoadConfigurationError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn unit_uses_display_names() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.fees.unit.to_string(), "PLN/kWh");
    }
}
