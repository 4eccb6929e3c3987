//! Driver for the platform `javac`, compiling one generated wrapper unit
//! into an in-memory map of class bytes.
//!
//! The compiler is configured once per session with the discovered platform
//! home and the discovered application classpath. Output targets the legacy
//! 8/8 bytecode level so the wrapper loads on any target from that era
//! forward, and `-g` keeps local-variable debug information.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{DebugError, Diagnostic, Result};
use crate::jdk;

#[derive(Debug)]
pub struct JavacCompiler {
    javac: PathBuf,
    classpath: String,
    compile_count: AtomicU64,
}

impl JavacCompiler {
    pub fn new(platform_home: &Path, classpath: String) -> Self {
        Self {
            javac: jdk::javac_path(platform_home),
            classpath,
            compile_count: AtomicU64::new(0),
        }
    }

    /// Number of javac invocations so far. A repeated evaluation with an
    /// identical context must not move this counter.
    pub fn compile_count(&self) -> u64 {
        self.compile_count.load(Ordering::Relaxed)
    }

    pub fn classpath(&self) -> &str {
        &self.classpath
    }

    /// Compiles a single unit. `class_name` is the fully-qualified binary
    /// name of the unit's public class. Returns every emitted class
    /// (inner classes included) keyed by binary name. Scratch files live in
    /// a temp dir that is removed on success and failure alike.
    pub fn compile(&self, class_name: &str, source: &str) -> Result<HashMap<String, Vec<u8>>> {
        self.compile_count.fetch_add(1, Ordering::Relaxed);

        let scratch = tempfile::Builder::new()
            .prefix("javelin-eval-")
            .tempdir()
            .map_err(|err| {
                DebugError::InvalidRequest(format!("failed to create scratch directory: {err}"))
            })?;

        let simple_name = class_name.rsplit('.').next().unwrap_or(class_name);
        let source_path = scratch.path().join(format!("{simple_name}.java"));
        std::fs::write(&source_path, source).map_err(|err| {
            DebugError::InvalidRequest(format!(
                "failed to write generated source {}: {err}",
                source_path.display()
            ))
        })?;

        let output = Command::new(&self.javac)
            .arg("-g")
            .arg("-encoding")
            .arg("UTF-8")
            .arg("-source")
            .arg("1.8")
            .arg("-target")
            .arg("1.8")
            .arg("-classpath")
            .arg(&self.classpath)
            .arg("-d")
            .arg(scratch.path())
            .arg(&source_path)
            .output()
            .map_err(|err| {
                DebugError::InvalidRequest(format!(
                    "failed to run {}: {err}",
                    self.javac.display()
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::debug!(%stderr, "javac rejected generated unit");
            return Err(DebugError::CompilationFailed(parse_javac_diagnostics(
                &stderr,
            )));
        }

        let mut classes = HashMap::new();
        collect_class_files(scratch.path(), scratch.path(), &mut classes).map_err(|err| {
            DebugError::InvalidRequest(format!("failed to read compiled classes: {err}"))
        })?;

        if !classes.contains_key(class_name) {
            return Err(DebugError::InvalidRequest(format!(
                "javac did not produce expected class `{class_name}`"
            )));
        }

        Ok(classes)
    }
}

fn collect_class_files(
    root: &Path,
    dir: &Path,
    out: &mut HashMap<String, Vec<u8>>,
) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_class_files(root, &path, out)?;
        } else if path.extension().and_then(|ext| ext.to_str()) == Some("class") {
            if let Some(name) = class_name_from_path(root, &path) {
                out.insert(name, std::fs::read(&path)?);
            }
        }
    }
    Ok(())
}

fn class_name_from_path(root: &Path, class_file: &Path) -> Option<String> {
    let rel = class_file.strip_prefix(root).ok()?;
    let mut parts: Vec<String> = rel
        .components()
        .filter_map(|component| match component {
            std::path::Component::Normal(os) => Some(os.to_string_lossy().to_string()),
            _ => None,
        })
        .collect();
    let last = parts.pop()?;
    parts.push(last.strip_suffix(".class").unwrap_or(&last).to_string());
    Some(parts.join("."))
}

/// Parses `javac` stderr into per-line diagnostics. Lines that do not match
/// the `<file>:<line>: <kind>: <message>` shape are folded into one catch-all
/// entry so the raw output is never lost.
pub fn parse_javac_diagnostics(stderr: &str) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for line in stderr.lines() {
        let Some(diag) = parse_diagnostic_line(line) else {
            continue;
        };
        diagnostics.push(diag);
    }

    if diagnostics.is_empty() {
        let message = stderr.trim();
        if !message.is_empty() {
            diagnostics.push(Diagnostic {
                file: "<javac>".to_string(),
                line: 0,
                message: message.to_string(),
            });
        }
    }
    diagnostics
}

fn parse_diagnostic_line(line: &str) -> Option<Diagnostic> {
    // `/tmp/Expr.java:4: error: cannot find symbol`; the message itself may
    // contain colons, so only the first two separators are structural.
    let (file, rest) = split_path_and_rest(line)?;
    let (line_no, rest) = rest.split_once(':')?;
    let line_no: u32 = line_no.trim().parse().ok()?;
    let message = rest.trim();

    let message = message
        .strip_prefix("error:")
        .map(str::trim)
        .unwrap_or(message);
    if message.starts_with("warning:") || message.starts_with("Note:") {
        return None;
    }

    Some(Diagnostic {
        file,
        line: line_no,
        message: message.to_string(),
    })
}

fn split_path_and_rest(line: &str) -> Option<(String, &str)> {
    // Windows paths start with a drive letter, so the structural `:` is the
    // first one followed by a digit run and another `:`.
    for (idx, _) in line.match_indices(':') {
        let rest = &line[idx + 1..];
        let digits_end = rest.find(':')?;
        if digits_end > 0 && rest[..digits_end].trim().chars().all(|c| c.is_ascii_digit()) {
            return Some((line[..idx].to_string(), rest));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_standard_javac_error_lines() {
        let stderr = concat!(
            "/tmp/scratch/Expr1.java:4: error: cannot find symbol\n",
            "        return (Object)(reqest.size());\n",
            "                        ^\n",
            "  symbol:   variable reqest\n",
            "1 error\n",
        );
        let diagnostics = parse_javac_diagnostics(stderr);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].file, "/tmp/scratch/Expr1.java");
        assert_eq!(diagnostics[0].line, 4);
        assert_eq!(diagnostics[0].message, "cannot find symbol");
    }

    #[test]
    fn messages_with_colons_survive_parsing() {
        let stderr =
            "/tmp/Expr.java:7: error: incompatible types: int cannot be converted to String\n";
        let diagnostics = parse_javac_diagnostics(stderr);
        assert_eq!(
            diagnostics[0].message,
            "incompatible types: int cannot be converted to String"
        );
    }

    #[test]
    fn unstructured_output_becomes_a_catch_all_diagnostic() {
        let diagnostics = parse_javac_diagnostics("javac: invalid flag: --nope\n");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].file, "<javac>");
        assert!(diagnostics[0].message.contains("invalid flag"));
    }

    #[test]
    fn class_names_are_derived_from_package_directories() {
        let root = Path::new("/out");
        let file = Path::new("/out/javelin/eval/Expr1.class");
        assert_eq!(
            class_name_from_path(root, file),
            Some("javelin.eval.Expr1".to_string())
        );
    }
}
