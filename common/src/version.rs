// build information shown by `rip --version`

/// Build version information
///
/// The semantic version comes from Cargo.toml, git information is best effort and provided by
/// build.rs when the crate is built from a git checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildVersion {
    /// Semantic version from Cargo.toml (e.g., "0.3.0")
    pub semantic: String,

    /// Git describe output (e.g., "v0.2.1-7-g644da27")
    pub git_describe: Option<String>,

    /// Full git commit hash
    pub git_hash: Option<String>,

    /// UTC build timestamp, only for builds with `SOURCE_DATE_EPOCH` set
    pub build_date: Option<String>,
}

impl BuildVersion {
    /// Get the version of the current build
    pub fn current() -> Self {
        Self {
            semantic: env!("CARGO_PKG_VERSION").to_string(),
            git_describe: option_env!("RIP_GIT_DESCRIBE").map(String::from),
            git_hash: option_env!("RIP_GIT_HASH").map(String::from),
            build_date: option_env!("RIP_BUILD_DATE").map(String::from),
        }
    }

    /// Short commit hash, only when the full hash is long enough to be a real one
    pub fn short_hash(&self) -> Option<&str> {
        self.git_hash
            .as_deref()
            .filter(|hash| hash.len() > 6)
            .map(|hash| &hash[..7])
    }

    /// Get a human-readable version string
    ///
    /// # Examples
    ///
    /// ```
    /// use common::version::BuildVersion;
    ///
    /// let v = BuildVersion {
    ///     semantic: "0.3.0".to_string(),
    ///     git_describe: Some("v0.2.1-7-g644da27".to_string()),
    ///     git_hash: None,
    ///     build_date: None,
    /// };
    ///
    /// assert_eq!(v.display(), "0.3.0 (v0.2.1-7-g644da27)");
    /// ```
    pub fn display(&self) -> String {
        if let Some(ref git_describe) = self.git_describe {
            format!("{} ({})", self.semantic, git_describe)
        } else {
            self.semantic.clone()
        }
    }

    /// Multi-line report printed by `--version`
    pub fn report(&self, program: &str) -> String {
        let mut lines = vec![program.to_string(), format!(" Version:    {}", self.display())];
        if let Some(hash) = self.short_hash() {
            lines.push(format!(" Git Commit: {hash}"));
        }
        if let Some(date) = &self.build_date {
            lines.push(format!(" Build Date: {date}"));
        }
        lines.push(format!(
            " OS/Arch:    {}/{}",
            std::env::consts::OS,
            std::env::consts::ARCH
        ));
        lines.join("\n")
    }
}

impl std::fmt::Display for BuildVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_version() {
        let version = BuildVersion::current();
        assert!(!version.semantic.is_empty());
    }

    #[test]
    fn test_display() {
        let v1 = BuildVersion {
            semantic: "0.3.0".to_string(),
            git_describe: None,
            git_hash: None,
            build_date: None,
        };
        assert_eq!(v1.display(), "0.3.0");
        assert_eq!(v1.to_string(), "0.3.0");
    }

    #[test]
    fn test_report() {
        let v = BuildVersion {
            semantic: "0.3.0".to_string(),
            git_describe: None,
            git_hash: Some("644da27abcdef".to_string()),
            build_date: None,
        };
        let report = v.report("rip");
        assert!(report.starts_with("rip\n Version:    0.3.0\n Git Commit: 644da27\n"));
        assert!(report.contains(" OS/Arch:    "));
        assert!(!report.contains("Build Date"));
        let short = BuildVersion {
            git_hash: Some("abc".to_string()),
            ..v
        };
        assert_eq!(short.short_hash(), None);
        assert!(!short.report("rip").contains("Git Commit"));
    }

    #[test]
    fn test_report_with_build_date() {
        let v = BuildVersion {
            semantic: "0.3.0".to_string(),
            git_describe: None,
            git_hash: Some("644da27abcdef".to_string()),
            build_date: Some("2026-10-18T12:00:00Z".to_string()),
        };
        assert!(v.report("rip").starts_with(
            "rip\n Version:    0.3.0\n Git Commit: 644da27\n Build Date: 2026-10-18T12:00:00Z\n OS/Arch:"
        ));
    }
}
