//! Shared binary-boundary helpers: failure reporting and exit.

use crate::error::ProvisionError;
use crate::log_collector::LogCollector;

/// Print a run-ending error for the operator and return the exit code.
pub fn report_failure(tool: &str, err: &ProvisionError) -> i32 {
    if err.is_voluntary() {
        println!("{}: {}. Nothing was changed.", tool, err);
        log::info!("[Main] Voluntary stop: {}", err);
        return err.exit_code();
    }

    let tail = err.output_tail();
    if !tail.is_empty() {
        eprintln!("----- last {} lines of output -----", tail.len());
        for line in tail {
            eprintln!("{}", line);
        }
        eprintln!("-----------------------------------");
    }
    // echoed to stderr by the collector
    log::error!("{}: {}", tool, err);
    err.exit_code()
}

/// Drain the log pipeline, then exit.
pub fn finish(logger: &LogCollector, code: i32) -> ! {
    if let Err(e) = logger.wait_for_empty() {
        eprintln!("[Log] Final flush failed: {}", e);
    }
    if let Some(path) = logger.log_path() {
        eprintln!("Log: {}", path.display());
    }
    std::process::exit(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_failure_codes() {
        let step = ProvisionError::StepFailed {
            step: "install".to_string(),
            code: 100,
            tail: vec!["E: broken".to_string()],
        };
        assert_eq!(report_failure("install_splunk", &step), 100);
        assert_eq!(report_failure("install_splunk", &ProvisionError::Declined), 1);
    }
}
