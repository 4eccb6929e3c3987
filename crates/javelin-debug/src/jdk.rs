//! Local platform (JDK) discovery.
//!
//! The compiler needs a local JDK whose major version equals the target
//! runtime's, so the generated wrapper resolves platform classes exactly the
//! way the target will. Search order: the target's own `java.home` when it
//! is visible on this filesystem, then well-known installation roots, then a
//! version-named scan of those roots.

use std::path::{Path, PathBuf};

use crate::error::{DebugError, Result};

#[derive(Debug, Clone)]
pub struct PlatformRuntime {
    pub home: PathBuf,
    pub major: u32,
}

/// Parses a Java version string into its feature (major) release.
/// Handles both the legacy `1.8.0_392` and the modern `17.0.9` forms.
pub fn major_version(version: &str) -> Option<u32> {
    let version = version.trim();
    let rest = version.strip_prefix("1.").unwrap_or(version);
    let digits: String = rest.chars().take_while(|ch| ch.is_ascii_digit()).collect();
    digits.parse().ok().filter(|major| *major > 0)
}

/// A directory is a usable platform home when it carries either the modern
/// module image, the modern runtime filesystem jar, or the legacy runtime
/// jar (possibly nested under `jre/`).
pub fn is_valid_platform_home(home: &Path) -> bool {
    home.join("jmods").is_dir()
        || home.join("lib").join("jrt-fs.jar").is_file()
        || home.join("lib").join("rt.jar").is_file()
        || home.join("jre").join("lib").join("rt.jar").is_file()
}

fn well_known_roots(user_home: &Path) -> Vec<PathBuf> {
    if cfg!(windows) {
        vec![
            PathBuf::from("C:\\Program Files\\Java"),
            PathBuf::from("C:\\Program Files (x86)\\Java"),
            PathBuf::from("C:\\Program Files\\Eclipse Adoptium"),
        ]
    } else {
        vec![
            PathBuf::from("/usr/lib/jvm"),
            PathBuf::from("/usr/java"),
            PathBuf::from("/opt/java"),
            PathBuf::from("/Library/Java/JavaVirtualMachines"),
            user_home.join(".sdkman/candidates/java"),
            user_home.join(".jdks"),
        ]
    }
}

/// True when a directory name carries the major version as a standalone
/// digit run (`jdk-17.0.9` carries 17; `jdk-18` does not carry 8).
fn name_carries_major(name: &str, major: u32) -> bool {
    let mut digits = String::new();
    let mut runs = Vec::new();
    for ch in name.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
        } else if !digits.is_empty() {
            runs.push(std::mem::take(&mut digits));
        }
    }
    if !digits.is_empty() {
        runs.push(digits);
    }

    // Legacy installs name an 8 JDK `jdk1.8.0_xxx`; treat the `1.N` pair as N.
    for window in runs.windows(2) {
        if window[0] == "1" && window[1].parse() == Ok(major) {
            return true;
        }
    }
    runs.iter().any(|run| run.parse() == Ok(major))
}

/// Resolves a candidate directory to its platform home, descending into the
/// macOS `Contents/Home` layout when present.
fn normalize_candidate(path: &Path) -> PathBuf {
    let contents_home = path.join("Contents").join("Home");
    if contents_home.is_dir() {
        contents_home
    } else {
        path.to_path_buf()
    }
}

/// Locates a local platform installation matching the target's major
/// version. `target_java_home` is the target runtime's own `java.home`
/// property, which is often directly usable when target and engine share a
/// filesystem.
pub fn find_platform(major: u32, target_java_home: Option<&str>) -> Result<PlatformRuntime> {
    let user_home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let mut probed: Vec<String> = Vec::new();

    if let Some(java_home) = target_java_home {
        let home = normalize_candidate(Path::new(java_home));
        if is_valid_platform_home(&home) {
            tracing::debug!(home = %home.display(), "using target java.home directly");
            return Ok(PlatformRuntime { home, major });
        }
        // A `java.home` ending in `jre` still carries a usable parent on
        // legacy installs.
        if let Some(parent) = home.parent() {
            if home.file_name().map(|n| n == "jre").unwrap_or(false)
                && is_valid_platform_home(parent)
            {
                return Ok(PlatformRuntime {
                    home: parent.to_path_buf(),
                    major,
                });
            }
        }
        probed.push(java_home.to_string());
    }

    for root in well_known_roots(&user_home) {
        probed.push(root.display().to_string());
        let Ok(entries) = std::fs::read_dir(&root) else {
            continue;
        };
        let mut candidates: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .map(|name| name_carries_major(name, major))
                    .unwrap_or(false)
            })
            .collect();
        candidates.sort();

        for candidate in candidates {
            let home = normalize_candidate(&candidate);
            if is_valid_platform_home(&home) {
                tracing::debug!(home = %home.display(), major, "matched platform installation");
                return Ok(PlatformRuntime { home, major });
            }
        }
    }

    Err(DebugError::PlatformNotFound(format!(
        "need a JDK with major version {major}; probed: {}",
        probed.join(", ")
    )))
}

/// The `javac` executable inside a platform home.
pub fn javac_path(home: &Path) -> PathBuf {
    let name = if cfg!(windows) { "javac.exe" } else { "javac" };
    home.join("bin").join(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn major_version_parses_legacy_and_modern_forms() {
        assert_eq!(major_version("1.8.0_392"), Some(8));
        assert_eq!(major_version("17.0.9"), Some(17));
        assert_eq!(major_version("11"), Some(11));
        assert_eq!(major_version("21.0.1+12"), Some(21));
        assert_eq!(major_version("garbage"), None);
    }

    #[test]
    fn name_matching_requires_a_standalone_digit_run() {
        assert!(name_carries_major("jdk-17.0.9", 17));
        assert!(name_carries_major("temurin-8.0.392", 8));
        assert!(name_carries_major("jdk1.8.0_392", 8));
        assert!(!name_carries_major("jdk-18", 8));
        assert!(!name_carries_major("jdk-17.0.9", 9));
    }

    #[test]
    fn validity_predicate_accepts_each_layout() {
        let dir = tempfile::tempdir().unwrap();
        let home = dir.path();
        assert!(!is_valid_platform_home(home));

        std::fs::create_dir_all(home.join("jmods")).unwrap();
        assert!(is_valid_platform_home(home));

        let legacy = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(legacy.path().join("jre/lib")).unwrap();
        std::fs::write(legacy.path().join("jre/lib/rt.jar"), b"jar").unwrap();
        assert!(is_valid_platform_home(legacy.path()));

        let modern = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(modern.path().join("lib")).unwrap();
        std::fs::write(modern.path().join("lib/jrt-fs.jar"), b"jar").unwrap();
        assert!(is_valid_platform_home(modern.path()));
    }

    #[test]
    fn discovery_uses_a_valid_target_java_home() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("jmods")).unwrap();
        let found = find_platform(17, Some(dir.path().to_str().unwrap())).unwrap();
        assert_eq!(found.home, dir.path());
    }

    #[test]
    fn discovery_failure_names_probed_directories() {
        let missing = "/definitely/not/a/jdk/home";
        let err = find_platform(3, Some(missing)).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("major version 3"));
        assert!(message.contains(missing));
    }
}
