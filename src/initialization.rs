use std::env;
use log::info;
use thiserror::Error;
use crate::config::{load_config, Config, LoadConfigurationError};
use crate::logging::{setup_logger, LoggerError};
use crate::manager_mail::{Mail, MailError};
use crate::manager_tge::{Tge, TgeError};
use crate::tariff::Tariff;

pub struct Mgr {
    pub tge: Tge,
    pub tariff: Tariff,
    pub mail: Mail,
}

/// Initializes and returns configuration and a Mgr struct holding various of initialized structs
///
pub fn init() -> Result<(Config, Mgr), InitializationError> {
    let args: Vec<String> = env::args().collect();
    let config_path = args.iter()
        .find(|p| p.starts_with("--config="))
        .expect("config file argument should be present");
    let config_path = config_path
        .split_once('=')
        .expect("config file argument should be correct")
        .1;

    // Load configuration
    let config = load_config(config_path)?;

    // Setup logging
    let _ = setup_logger(&config.general.log_path, config.general.log_level, config.general.log_to_stdout)?;

    // Print version
    info!("starting TGE RDN price monitor version: {}", env!("CARGO_PKG_VERSION"));
    info!("sensor unit: {}", config.fees.unit);

    // Instantiate structs
    let tge = Tge::new(&config.tge)?;
    let tariff = Tariff::new(&config.fees);
    let mail = Mail::new(&config.mail)?;

    let mgr = Mgr {
        tge,
        tariff,
        mail,
    };

    Ok((config, mgr))
}

/// Error depicting errors that occur while initializing the monitor
///
#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("ConfigurationError: {0}")]
    ConfigurationError(#[from] LoadConfigurationError),
    #[error("SetupLoggerError: {0}")]
    SetupLoggerError(#[from] LoggerError),
    #[error("TgeSetupError: {0}")]
    TgeSetupError(#[from] TgeError),
    #[error("MailSetupError: {0}")]
    MailSetupError(#[from] MailError),
}
