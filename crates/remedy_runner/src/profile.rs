//! Runtime-profile detection.
//!
//! Pure inspection of manifest files at the repository root (or the `app/`
//! subdirectory): no execution, no side effects. Node is tried before
//! Python and the first match wins; the check command is chosen from the
//! project's own declarations, test preferred, then lint, then build as a
//! smoke check. No match is fatal for a healing run.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Technology stack of a detected project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stack {
    Node,
    Python,
}

impl Stack {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Python => "python",
        }
    }
}

/// Which rung of the test > lint > build ladder the check command came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckKind {
    Test,
    Lint,
    Build,
}

/// The install/check command set and execution image for a detected project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeProfile {
    pub stack: Stack,
    pub image: String,
    pub tag: String,
    /// Dependency installation step, run before the check in the same shell.
    pub install: Option<String>,
    /// The test/lint/build command itself.
    pub check: String,
    pub check_kind: CheckKind,
    /// Output markers that force failure even on exit code 0, to compensate
    /// for tools that exit clean while reporting actionable problems.
    /// Per-profile data, not hardcoded policy.
    pub failure_markers: Vec<String>,
}

impl RuntimeProfile {
    pub fn full_image(&self) -> String {
        format!("{}:{}", self.image, self.tag)
    }

    /// The single shell invocation the sandbox runs: install && check.
    pub fn shell_command(&self) -> String {
        match &self.install {
            Some(install) => format!("{} && {}", install, self.check),
            None => self.check.clone(),
        }
    }

    /// The override predicate: does the captured output carry a marker
    /// strong enough to call the run failed regardless of exit code?
    pub fn output_indicates_failure(&self, output: &str) -> bool {
        self.failure_markers.iter().any(|m| output.contains(m))
    }

    /// Replace the failure markers (for callers plugging in their own
    /// predicate data).
    pub fn with_markers(mut self, markers: Vec<String>) -> Self {
        self.failure_markers = markers;
        self
    }
}

/// Inspect `root` (and its `app/` subdirectory) for a known project layout.
pub fn detect(root: &Path) -> Option<RuntimeProfile> {
    for dir in candidate_dirs(root) {
        if let Some(profile) = detect_node(&dir) {
            debug!(dir = %dir.display(), "detected Node project");
            return Some(profile);
        }
        if let Some(profile) = detect_python(&dir) {
            debug!(dir = %dir.display(), "detected Python project");
            return Some(profile);
        }
    }
    None
}

fn candidate_dirs(root: &Path) -> Vec<PathBuf> {
    vec![root.to_path_buf(), root.join("app")]
}

fn detect_node(dir: &Path) -> Option<RuntimeProfile> {
    let manifest = dir.join("package.json");
    let content = fs::read_to_string(manifest).ok()?;
    let parsed: serde_json::Value = serde_json::from_str(&content).ok()?;
    let scripts = parsed.get("scripts")?.as_object()?;

    let (script, check_kind) = ["test", "lint", "build"]
        .iter()
        .zip([CheckKind::Test, CheckKind::Lint, CheckKind::Build])
        .find(|(name, _)| {
            scripts
                .get(**name)
                .and_then(|v| v.as_str())
                .map_or(false, |s| !s.trim().is_empty())
        })?;

    Some(RuntimeProfile {
        stack: Stack::Node,
        image: "node".to_string(),
        tag: "20-slim".to_string(),
        install: Some("npm install --no-audit --no-fund".to_string()),
        check: format!("npm run {}", script),
        check_kind,
        failure_markers: vec!["SyntaxError".to_string(), "no-unused-vars".to_string()],
    })
}

fn detect_python(dir: &Path) -> Option<RuntimeProfile> {
    let has_requirements = dir.join("requirements.txt").exists();
    let has_pyproject = dir.join("pyproject.toml").exists();
    let has_setup = dir.join("setup.py").exists();

    if !has_requirements && !has_pyproject && !has_setup {
        return None;
    }

    let mut install_steps = Vec::new();
    if has_requirements {
        install_steps.push("pip install -q -r requirements.txt".to_string());
    }

    let (check, check_kind) = if python_has_tests(dir) {
        install_steps.push("pip install -q pytest".to_string());
        ("python -m pytest -v --tb=short".to_string(), CheckKind::Test)
    } else if python_declares_flake8(dir) {
        install_steps.push("pip install -q flake8".to_string());
        ("python -m flake8 .".to_string(), CheckKind::Lint)
    } else {
        ("python -m compileall -q .".to_string(), CheckKind::Build)
    };

    let install = if install_steps.is_empty() {
        None
    } else {
        Some(install_steps.join(" && "))
    };

    Some(RuntimeProfile {
        stack: Stack::Python,
        image: "python".to_string(),
        tag: "3.12-slim".to_string(),
        install,
        check,
        check_kind,
        failure_markers: vec!["SyntaxError".to_string(), "F401".to_string()],
    })
}

fn python_has_tests(dir: &Path) -> bool {
    if dir.join("tests").is_dir() {
        return true;
    }
    if pyproject_table(dir, &["tool", "pytest"]) {
        return true;
    }
    // Top-level test modules only; this is detection, not discovery.
    fs::read_dir(dir)
        .map(|entries| {
            entries.filter_map(|e| e.ok()).any(|e| {
                let name = e.file_name();
                let name = name.to_string_lossy();
                name.starts_with("test_") && name.ends_with(".py")
            })
        })
        .unwrap_or(false)
}

fn python_declares_flake8(dir: &Path) -> bool {
    if pyproject_table(dir, &["tool", "flake8"]) {
        return true;
    }
    fs::read_to_string(dir.join("requirements.txt"))
        .map(|content| {
            content
                .lines()
                .any(|line| line.trim().starts_with("flake8"))
        })
        .unwrap_or(false)
}

fn pyproject_table(dir: &Path, keys: &[&str]) -> bool {
    let Ok(content) = fs::read_to_string(dir.join("pyproject.toml")) else {
        return false;
    };
    let Ok(parsed) = content.parse::<toml::Value>() else {
        return false;
    };
    let mut node = &parsed;
    for key in keys {
        match node.get(key) {
            Some(next) => node = next,
            None => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_node_prefers_test_script() {
        let temp = tempdir().unwrap();
        fs::write(
            temp.path().join("package.json"),
            r#"{"scripts": {"build": "tsc", "test": "jest", "lint": "eslint ."}}"#,
        )
        .unwrap();

        let profile = detect(temp.path()).unwrap();
        assert_eq!(profile.stack, Stack::Node);
        assert_eq!(profile.check, "npm run test");
        assert_eq!(profile.check_kind, CheckKind::Test);
        assert!(profile.shell_command().starts_with("npm install"));
    }

    #[test]
    fn test_node_falls_back_to_lint_then_build() {
        let temp = tempdir().unwrap();
        fs::write(
            temp.path().join("package.json"),
            r#"{"scripts": {"build": "tsc", "lint": "eslint ."}}"#,
        )
        .unwrap();

        let profile = detect(temp.path()).unwrap();
        assert_eq!(profile.check, "npm run lint");
        assert_eq!(profile.check_kind, CheckKind::Lint);
    }

    #[test]
    fn test_node_without_usable_scripts_is_no_match() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("package.json"), r#"{"name": "x"}"#).unwrap();
        assert!(detect(temp.path()).is_none());
    }

    #[test]
    fn test_python_with_tests_uses_pytest() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("requirements.txt"), "requests\n").unwrap();
        fs::create_dir(temp.path().join("tests")).unwrap();

        let profile = detect(temp.path()).unwrap();
        assert_eq!(profile.stack, Stack::Python);
        assert_eq!(profile.check_kind, CheckKind::Test);
        assert!(profile.check.contains("pytest"));
        assert!(profile.shell_command().contains("requirements.txt"));
    }

    #[test]
    fn test_python_flake8_ladder_rung() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("requirements.txt"), "flake8==7.0\n").unwrap();

        let profile = detect(temp.path()).unwrap();
        assert_eq!(profile.check_kind, CheckKind::Lint);
        assert!(profile.check.contains("flake8"));
    }

    #[test]
    fn test_python_smoke_check_fallback() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("setup.py"), "from setuptools import setup\n").unwrap();

        let profile = detect(temp.path()).unwrap();
        assert_eq!(profile.check_kind, CheckKind::Build);
        assert!(profile.check.contains("compileall"));
        assert!(profile.install.is_none());
    }

    #[test]
    fn test_node_takes_precedence_over_python() {
        let temp = tempdir().unwrap();
        fs::write(
            temp.path().join("package.json"),
            r#"{"scripts": {"test": "jest"}}"#,
        )
        .unwrap();
        fs::write(temp.path().join("requirements.txt"), "flask\n").unwrap();

        let profile = detect(temp.path()).unwrap();
        assert_eq!(profile.stack, Stack::Node);
    }

    #[test]
    fn test_app_subdirectory_is_inspected() {
        let temp = tempdir().unwrap();
        let app = temp.path().join("app");
        fs::create_dir(&app).unwrap();
        fs::write(
            app.join("package.json"),
            r#"{"scripts": {"test": "vitest"}}"#,
        )
        .unwrap();

        let profile = detect(temp.path()).unwrap();
        assert_eq!(profile.stack, Stack::Node);
    }

    #[test]
    fn test_no_manifest_is_no_match() {
        let temp = tempdir().unwrap();
        assert!(detect(temp.path()).is_none());
    }

    #[test]
    fn test_failure_marker_override() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("requirements.txt"), "flake8\n").unwrap();
        let profile = detect(temp.path()).unwrap();

        assert!(profile.output_indicates_failure("app.py:3:1: F401 'os' imported but unused"));
        assert!(profile.output_indicates_failure("SyntaxError: invalid syntax"));
        assert!(!profile.output_indicates_failure("42 passed in 1.2s"));
    }

    #[test]
    fn test_markers_are_pluggable() {
        let temp = tempdir().unwrap();
        fs::write(
            temp.path().join("package.json"),
            r#"{"scripts": {"test": "jest"}}"#,
        )
        .unwrap();

        let profile = detect(temp.path())
            .unwrap()
            .with_markers(vec!["CUSTOM_FATAL".to_string()]);
        assert!(profile.output_indicates_failure("CUSTOM_FATAL: nope"));
        assert!(!profile.output_indicates_failure("SyntaxError"));
    }
}
