//! Remote-login banner integration for sshd.

use crate::config::ProvisionerConfig;
use crate::error::Result;
use crate::models::{CommandSpec, StepOutcome};
use crate::system::paths::{SSHD_CONFIG, SSH_BANNER_FILE};
use crate::system::{files, PathRegistry, SystemWrapper};
use std::fs;
use std::os::unix::fs::PermissionsExt;

/// Service unit names tried for the reload, in order.
const SSH_UNITS: [&str; 2] = ["sshd", "ssh"];

/// Split a config line into (commented, keyword, rest).
fn parse_directive(line: &str) -> (bool, &str, &str) {
    let trimmed = line.trim_start();
    let (commented, body) = match trimmed.strip_prefix('#') {
        Some(rest) => (true, rest.trim_start_matches('#').trim_start()),
        None => (false, trimmed),
    };
    let mut parts = body.splitn(2, char::is_whitespace);
    let keyword = parts.next().unwrap_or("");
    let rest = parts.next().unwrap_or("").trim();
    (commented, keyword, rest)
}

fn is_banner_line(line: &str) -> Option<bool> {
    let (commented, keyword, _) = parse_directive(line);
    if keyword.eq_ignore_ascii_case("banner") {
        Some(commented)
    } else {
        None
    }
}

fn is_match_line(line: &str) -> bool {
    let (commented, keyword, _) = parse_directive(line);
    !commented && keyword.eq_ignore_ascii_case("match")
}

/// Ensure exactly one active global `Banner <banner_path>` directive.
///
/// Only the global section (everything before the first `Match`) is touched.
/// The first `Banner` line there, commented or not, is rewritten in place and
/// any later active ones are commented out. With no candidate the directive
/// is inserted just before the first `Match`, or appended.
pub fn ensure_banner_directive(config: &str, banner_path: &str) -> String {
    let directive = format!("Banner {}", banner_path);
    let mut out: Vec<String> = Vec::new();
    let mut placed = false;
    let mut in_match = false;

    for line in config.lines() {
        if !in_match && is_match_line(line) {
            in_match = true;
            if !placed {
                out.push(directive.clone());
                placed = true;
            }
        }

        if in_match {
            out.push(line.to_string());
            continue;
        }

        match is_banner_line(line) {
            Some(_) if !placed => {
                out.push(directive.clone());
                placed = true;
            }
            Some(false) => out.push(format!("# {}", line.trim_start())),
            _ => out.push(line.to_string()),
        }
    }

    if !placed {
        out.push(directive);
    }

    let mut result = out.join("\n");
    result.push('\n');
    result
}

/// Number of active global `Banner` directives.
pub fn active_banner_count(config: &str) -> usize {
    config
        .lines()
        .take_while(|l| !is_match_line(l))
        .filter(|l| is_banner_line(l) == Some(false))
        .count()
}

fn reload_sshd(system: &dyn SystemWrapper) -> Option<String> {
    let mut last_error = String::new();
    for unit in SSH_UNITS {
        let spec = CommandSpec::new("systemctl").arg("reload").arg(unit);
        match system.run(&spec) {
            Ok(output) if output.success() => {
                log::info!("[Bootstrap] [SSHD] Reloaded {}", unit);
                return None;
            }
            Ok(output) => {
                last_error = format!("systemctl reload {} exited with {:?}", unit, output.code)
            }
            Err(e) => last_error = e.user_message(),
        }
    }
    Some(last_error)
}

/// Point sshd at the lab banner and reload it.
pub fn configure_ssh_banner(
    config: &ProvisionerConfig,
    pre_login: &str,
    system: &dyn SystemWrapper,
    paths: &PathRegistry,
) -> Result<StepOutcome> {
    if !config.configure_ssh_banner {
        log::info!("[Bootstrap] [SSHD] Disabled by CONFIGURE_SSH_BANNER=0");
        return Ok(StepOutcome::Ignored);
    }

    let sshd_config = paths.resolve(SSHD_CONFIG);
    if !sshd_config.exists() {
        log::info!("[Bootstrap] [SSHD] {} not found, skipping", sshd_config.display());
        return Ok(StepOutcome::Ignored);
    }

    files::write_atomic(&paths.resolve(SSH_BANNER_FILE), pre_login.as_bytes(), 0o644)?;

    files::backup_if_exists(&sshd_config)?;
    let original = fs::read_to_string(&sshd_config)?;
    let updated = ensure_banner_directive(&original, SSH_BANNER_FILE);
    if updated != original {
        let mode = fs::metadata(&sshd_config)?.permissions().mode() & 0o7777;
        files::write_atomic(&sshd_config, updated.as_bytes(), mode)?;
        log::info!("[Bootstrap] [SSHD] Banner directive set in {}", sshd_config.display());
    } else {
        log::info!("[Bootstrap] [SSHD] Banner directive already in place");
    }

    match reload_sshd(system) {
        None => Ok(StepOutcome::Done),
        Some(reason) => {
            log::warn!("[Bootstrap] [SSHD] Reload failed: {}", reason);
            Ok(StepOutcome::Recovered(reason))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const BANNER: &str = "/etc/ssh/lab_banner";

    #[test]
    fn test_rewrites_commented_default() {
        let input = "Port 22\n#Banner none\nUsePAM yes\n";
        assert_eq!(
            ensure_banner_directive(input, BANNER),
            "Port 22\nBanner /etc/ssh/lab_banner\nUsePAM yes\n"
        );
    }

    #[test]
    fn test_comments_out_extra_active_directives() {
        let input = "Banner /etc/issue.net\nPort 22\nBanner /etc/other\n";
        let out = ensure_banner_directive(input, BANNER);
        assert_eq!(
            out,
            "Banner /etc/ssh/lab_banner\nPort 22\n# Banner /etc/other\n"
        );
        assert_eq!(active_banner_count(&out), 1);
    }

    #[test]
    fn test_inserts_before_match_block() {
        let input = "Port 22\nMatch User backup\n    Banner none\n";
        let out = ensure_banner_directive(input, BANNER);
        assert_eq!(
            out,
            "Port 22\nBanner /etc/ssh/lab_banner\nMatch User backup\n    Banner none\n"
        );
    }

    #[test]
    fn test_appends_when_absent() {
        assert_eq!(
            ensure_banner_directive("Port 22", BANNER),
            "Port 22\nBanner /etc/ssh/lab_banner\n"
        );
    }

    fn config_line() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("Port 22".to_string()),
            Just("#Banner none".to_string()),
            Just("# Banner /etc/issue.net".to_string()),
            Just("Banner /etc/issue.net".to_string()),
            Just("  banner /srv/x".to_string()),
            Just("PermitRootLogin no".to_string()),
            Just("".to_string()),
            Just("# comment".to_string()),
        ]
    }

    proptest! {
        #[test]
        fn prop_exactly_one_active_banner(lines in prop::collection::vec(config_line(), 0..12)) {
            let input = lines.join("\n");
            let out = ensure_banner_directive(&input, BANNER);
            prop_assert_eq!(active_banner_count(&out), 1);
            prop_assert!(out.lines().any(|l| l == "Banner /etc/ssh/lab_banner"));
        }

        #[test]
        fn prop_rewrite_is_idempotent(lines in prop::collection::vec(config_line(), 0..12)) {
            let once = ensure_banner_directive(&lines.join("\n"), BANNER);
            let twice = ensure_banner_directive(&once, BANNER);
            prop_assert_eq!(once, twice);
        }
    }
}
