//! Style Enforcement Tests
//!
//! Production code must propagate errors instead of panicking and must not
//! silence dead code. Unit test modules and test-only files are exempt.

use std::fs;
use std::path::{Path, PathBuf};

const FORBIDDEN: &[&str] = &[".unwrap()", ".expect(", "#[allow(dead_code)]"];

/// Files compiled only for tests.
const TEST_ONLY: &[&str] = &["mock.rs"];

#[derive(Debug)]
struct Violation {
    file_path: String,
    line_number: usize,
    context: String,
}

fn find_rust_files(dir: &Path, files: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            find_rust_files(&path, files)?;
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            files.push(path);
        }
    }
    Ok(())
}

/// Lines before the first `#[cfg(test)] mod tests` block.
fn production_lines(source: &str) -> Vec<(usize, &str)> {
    let lines: Vec<&str> = source.lines().collect();
    let end = lines
        .windows(2)
        .position(|pair| {
            pair[0].trim() == "#[cfg(test)]" && pair[1].trim_start().starts_with("mod tests")
        })
        .unwrap_or(lines.len());

    lines[..end]
        .iter()
        .enumerate()
        .map(|(i, line)| (i + 1, *line))
        .collect()
}

fn check_file(path: &Path, violations: &mut Vec<Violation>) {
    let source = fs::read_to_string(path).unwrap();

    for (line_number, line) in production_lines(&source) {
        let code = line.split("//").next().unwrap_or("");
        if FORBIDDEN.iter().any(|pattern| code.contains(pattern)) {
            violations.push(Violation {
                file_path: path.display().to_string(),
                line_number,
                context: line.trim().to_string(),
            });
        }
    }
}

#[test]
fn production_code_does_not_panic_on_errors() {
    let src = Path::new(env!("CARGO_MANIFEST_DIR")).join("src");
    let mut files = Vec::new();
    find_rust_files(&src, &mut files).unwrap();
    assert!(!files.is_empty());

    let mut violations = Vec::new();
    for file in &files {
        let name = file.file_name().unwrap().to_string_lossy();
        if TEST_ONLY.contains(&name.as_ref()) {
            continue;
        }
        check_file(file, &mut violations);
    }

    assert!(
        violations.is_empty(),
        "Found {} violations in {} files:\n{}",
        violations.len(),
        files.len(),
        violations
            .iter()
            .map(|v| format!("  {}:{} {}", v.file_path, v.line_number, v.context))
            .collect::<Vec<_>>()
            .join("\n")
    );
}

#[test]
fn production_lines_stop_at_test_module() {
    let source = "fn a() {}\n#[cfg(test)]\nmod tests {\n    fn b() { x.unwrap(); }\n}\n";
    let lines = production_lines(source);
    assert_eq!(lines, vec![(1, "fn a() {}")]);
}
