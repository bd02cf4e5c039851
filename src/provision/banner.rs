//! Login banners: pre-login (`/etc/issue`), post-login (`/etc/motd`) and an
//! interactive-shell snippet under `/etc/profile.d`.

use crate::config::{ProvisionerConfig, DEFAULT_ADMIN_PASSWORD, DEFAULT_ADMIN_USER};
use crate::error::Result;
use crate::models::StepOutcome;
use crate::system::paths::{ISSUE_FILE, MOTD_FILE, PROFILE_SNIPPET};
use crate::system::{files, PathRegistry};

const PRE_LOGIN_TEMPLATE: &str = "\
==============================================================
                    SPLUNK LAB VIRTUAL MACHINE
==============================================================
  Log in with:
      Username: {user}
      Password: {password}

  After logging in, follow the instructions on screen.
==============================================================
";

const POST_LOGIN_TEMPLATE: &str = "\
==============================================================
  Welcome to the Splunk lab, {user}!
==============================================================
  1. Install Splunk Enterprise and load the tutorial data:

         sudo {script}

  2. When it finishes, open the URL it prints in a browser
     and sign in to Splunk Web as:

         Username: {admin_user}
         Password: {admin_password}

  Re-running the installer is safe; completed steps are skipped.
==============================================================
";

/// Heredoc delimiter for the profile snippet.
const HEREDOC_TAG: &str = "SPLUNK_LAB_BANNER";

/// Rendered banner texts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BannerSet {
    pub pre_login: String,
    pub post_login: String,
    pub profile_snippet: String,
}

pub fn render_banners(config: &ProvisionerConfig) -> BannerSet {
    let user = &config.lab_user;
    let pre_login = PRE_LOGIN_TEMPLATE
        .replace("{user}", &user.name)
        .replace("{password}", &user.password);
    let post_login = POST_LOGIN_TEMPLATE
        .replace("{user}", &user.name)
        .replace("{script}", &config.delivered_script().display().to_string())
        .replace("{admin_user}", DEFAULT_ADMIN_USER)
        .replace("{admin_password}", DEFAULT_ADMIN_PASSWORD);
    let profile_snippet = render_profile_snippet(&post_login);

    BannerSet {
        pre_login,
        post_login,
        profile_snippet,
    }
}

/// Shell snippet that prints `text` only in interactive shells.
pub fn render_profile_snippet(text: &str) -> String {
    let mut out = String::new();
    out.push_str("# Splunk lab instructions, managed by lab_bootstrap\n");
    out.push_str("case $- in\n");
    out.push_str("    *i*)\n");
    out.push_str(&format!("        cat <<'{}'\n", HEREDOC_TAG));
    out.push_str(text);
    if !text.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(HEREDOC_TAG);
    out.push('\n');
    out.push_str("        ;;\n");
    out.push_str("esac\n");
    out
}

/// getty expands `\x` escapes in `/etc/issue`; double backslashes so the
/// text prints literally.
pub fn escape_issue(text: &str) -> String {
    text.replace('\\', "\\\\")
}

/// Back up and overwrite all three banner files.
pub fn write_banners(banners: &BannerSet, paths: &PathRegistry) -> Result<StepOutcome> {
    let targets = [
        (ISSUE_FILE, escape_issue(&banners.pre_login), 0o644),
        (MOTD_FILE, banners.post_login.clone(), 0o644),
        (PROFILE_SNIPPET, banners.profile_snippet.clone(), 0o644),
    ];

    for (logical, content, mode) in targets.iter() {
        let path = paths.resolve(logical);
        files::backup_if_exists(&path)?;
        files::write_atomic(&path, content.as_bytes(), *mode)?;
        log::info!("[Bootstrap] [BANNER] Wrote {}", path.display());
    }
    Ok(StepOutcome::Done)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LabUser;

    fn config() -> ProvisionerConfig {
        ProvisionerConfig {
            lab_user: LabUser {
                name: "student7".to_string(),
                password: "Pa55-word".to_string(),
            },
            ..ProvisionerConfig::default()
        }
    }

    #[test]
    fn test_pre_login_contains_credentials() {
        let banners = render_banners(&config());
        assert!(banners.pre_login.contains("student7"));
        assert!(banners.pre_login.contains("Pa55-word"));
        assert!(!banners.pre_login.contains('{'));
    }

    #[test]
    fn test_post_login_points_at_delivered_script() {
        let banners = render_banners(&config());
        assert!(banners
            .post_login
            .contains("sudo /home/student7/InstallSplunk.sh"));
        assert!(!banners.post_login.contains("{admin_user}"));
    }

    #[test]
    fn test_profile_snippet_is_interactive_only() {
        let snippet = render_profile_snippet("hello\n");
        assert!(snippet.contains("case $- in"));
        assert!(snippet.contains("*i*)"));
        assert!(snippet.contains("cat <<'SPLUNK_LAB_BANNER'\nhello\nSPLUNK_LAB_BANNER\n"));
        assert!(snippet.ends_with("esac\n"));
    }

    #[test]
    fn test_issue_escaping() {
        assert_eq!(escape_issue("a\\b"), "a\\\\b");
        assert_eq!(escape_issue("plain"), "plain");
    }
}
