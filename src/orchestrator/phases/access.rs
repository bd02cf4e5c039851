//! Step 5: access information.

use crate::config::SequencerConfig;
use crate::models::StepOutcome;
use crate::system::SystemWrapper;
use std::net::Ipv4Addr;

/// Placeholder shown when no address could be determined.
pub const UNKNOWN_HOST: &str = "<this-host-ip>";

pub fn access_url(ip: Option<Ipv4Addr>, web_port: u16) -> String {
    let host = ip
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| UNKNOWN_HOST.to_string());
    format!("http://{}:{}", host, web_port)
}

pub fn render_access_info(ip: Option<Ipv4Addr>, config: &SequencerConfig) -> String {
    format!(
        "Splunk Web: {}\n  Username:  {}\n  Password:  {}\n",
        access_url(ip, config.web_port),
        config.admin_user,
        config.admin_password
    )
}

/// Print access details. Address lookup is best-effort and never fails the run.
pub fn report_access(config: &SequencerConfig, system: &dyn SystemWrapper) -> StepOutcome {
    let ip = system.primary_ipv4();
    if ip.is_none() {
        log::warn!("[Install] [ACCESS] Could not determine a primary IPv4 address");
    }
    print!("{}", render_access_info(ip, config));
    log::info!("[Install] [ACCESS] {}", access_url(ip, config.web_port));
    StepOutcome::Done
}
