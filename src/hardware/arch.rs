//! CPU architecture detection.

use crate::error::HostError;
use crate::models::normalize_arch;
use std::process::Command;

/// Detect the host architecture in `uname -m` spelling.
///
/// Falls back to the architecture this binary was compiled for when `uname`
/// is unavailable; the two only differ under emulation.
pub fn detect_arch() -> Result<String, HostError> {
    match Command::new("uname").arg("-m").output() {
        Ok(output) if output.status.success() => {
            let raw = String::from_utf8_lossy(&output.stdout);
            let arch = normalize_arch(&raw);
            if arch.is_empty() {
                return Err(HostError::ArchDetectionFailed(
                    "uname -m printed nothing".to_string(),
                ));
            }
            Ok(arch)
        }
        Ok(output) => {
            log::warn!(
                "[Host] [ARCH] uname -m exited with {:?}, using compile-time architecture",
                output.status.code()
            );
            Ok(normalize_arch(std::env::consts::ARCH))
        }
        Err(e) => {
            log::warn!("[Host] [ARCH] uname unavailable ({}), using compile-time architecture", e);
            Ok(normalize_arch(std::env::consts::ARCH))
        }
    }
}

/// Check `arch` against an allow-list, tolerating alias spellings on either side.
pub fn arch_allowed(arch: &str, allowed: &[String]) -> bool {
    let arch = normalize_arch(arch);
    allowed.iter().any(|a| normalize_arch(a) == arch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_arch_returns_normalized() {
        let arch = detect_arch().unwrap();
        assert!(!arch.is_empty());
        assert_eq!(arch, normalize_arch(&arch));
    }

    #[test]
    fn test_arch_allowed() {
        let allowed = vec!["x86_64".to_string()];
        assert!(arch_allowed("x86_64", &allowed));
        assert!(arch_allowed("amd64", &allowed));
        assert!(!arch_allowed("aarch64", &allowed));
        assert!(!arch_allowed("arm64", &allowed));
    }

    #[test]
    fn test_allow_list_aliases() {
        let allowed = vec!["arm64".to_string()];
        assert!(arch_allowed("aarch64", &allowed));
    }
}
