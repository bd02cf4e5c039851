//! Root-relative path registry.
//!
//! Every fixed host location the provisioner writes lives here. Logical
//! paths are the absolute paths as they appear on a real host; `resolve`
//! maps them under the registry root so a whole run can be pointed at a
//! scratch directory.

use std::path::{Component, Path, PathBuf};

pub const SUDOERS_DIR: &str = "/etc/sudoers.d";
pub const ISSUE_FILE: &str = "/etc/issue";
pub const MOTD_FILE: &str = "/etc/motd";
pub const PROFILE_SNIPPET: &str = "/etc/profile.d/splunk-lab.sh";
pub const SSHD_CONFIG: &str = "/etc/ssh/sshd_config";
pub const SSH_BANNER_FILE: &str = "/etc/ssh/lab_banner";
pub const HOME_ROOT: &str = "/home";

/// Maps logical host paths onto a filesystem root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathRegistry {
    root: PathBuf,
}

impl PathRegistry {
    /// Registry for the live host.
    pub fn host() -> Self {
        PathRegistry {
            root: PathBuf::from("/"),
        }
    }

    /// Registry rooted somewhere other than `/`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        PathRegistry { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_host(&self) -> bool {
        self.root == Path::new("/")
    }

    /// Resolve a logical absolute path under the root.
    ///
    /// Leading `/` and any `..` components are dropped, so the result never
    /// escapes the root.
    pub fn resolve(&self, logical: impl AsRef<Path>) -> PathBuf {
        let mut out = self.root.clone();
        for component in logical.as_ref().components() {
            if let Component::Normal(part) = component {
                out.push(part);
            }
        }
        out
    }

    /// Per-user elevation policy file.
    pub fn sudoers_file(&self, user: &str) -> PathBuf {
        self.resolve(Path::new(SUDOERS_DIR).join(format!("{}-splunk-installer", user)))
    }

    pub fn home_dir(&self, user: &str) -> PathBuf {
        self.resolve(Path::new(HOME_ROOT).join(user))
    }
}

impl Default for PathRegistry {
    fn default() -> Self {
        Self::host()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_registry_is_identity() {
        let paths = PathRegistry::host();
        assert!(paths.is_host());
        assert_eq!(paths.resolve(ISSUE_FILE), PathBuf::from("/etc/issue"));
        assert_eq!(
            paths.sudoers_file("splunk"),
            PathBuf::from("/etc/sudoers.d/splunk-splunk-installer")
        );
    }

    #[test]
    fn test_rooted_registry() {
        let paths = PathRegistry::new("/tmp/root");
        assert!(!paths.is_host());
        assert_eq!(
            paths.resolve(SSHD_CONFIG),
            PathBuf::from("/tmp/root/etc/ssh/sshd_config")
        );
        assert_eq!(paths.home_dir("lab"), PathBuf::from("/tmp/root/home/lab"));
    }

    #[test]
    fn test_resolve_cannot_escape_root() {
        let paths = PathRegistry::new("/tmp/root");
        assert_eq!(
            paths.resolve("/etc/../../shadow"),
            PathBuf::from("/tmp/root/etc/shadow")
        );
    }
}
