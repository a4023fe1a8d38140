use anyhow::Result;
use log::error;
use crate::errors::MonitorError;
use crate::initialization::init;
use crate::worker::run;

mod calendar;
mod config;
mod errors;
mod initialization;
mod logging;
mod macros;
mod manager_mail;
mod manager_tge;
pub mod models;
mod sensors;
mod tariff;
mod worker;

fn main() -> Result<()> {
    // Load config and set up all managers. If initialization fails, we are pretty much out of luck
    // and can't even log or send notification mail.
    let (config, mgr) = match init() {
        Ok((c, m)) => (c, m),
        Err(e) => {
            return Err(MonitorError(format!("Initialization failed: {}", e)))?;
        }
    };

    // Run the poll loop; it only returns on fatal errors
    if let Err(e) = run(&config, &mgr) {
        error!("Run failed: {}", e);
        mgr.mail.send_alert("Monitor stopped", format!("Run failed: {}", e))?;
        return Err(e)?;
    }

    Ok(())
}
