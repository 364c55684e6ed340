//! Shared helper functions for CLI commands.

use std::path::{Path, PathBuf};

use console::style;

use docsift::{BatchReport, ProcessingResult};

/// Expand directories to the PDFs beneath them.
///
/// Files are passed through as given, so missing paths still reach the batch
/// and are reported there. Files found in directories are sorted.
pub fn collect_pdf_paths(inputs: &[PathBuf]) -> std::io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found = Vec::new();
            walk_pdfs(input, &mut found)?;
            found.sort();
            paths.extend(found);
        } else {
            paths.push(input.clone());
        }
    }
    Ok(paths)
}

fn walk_pdfs(dir: &Path, found: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk_pdfs(&path, found)?;
        } else if is_pdf(&path) {
            found.push(path);
        }
    }
    Ok(())
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Truncate a string for display.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

fn describe(result: &ProcessingResult) -> String {
    let kind = result.kind().map(|k| k.as_str()).unwrap_or("-");
    let method = result.method.map(|m| m.as_str()).unwrap_or("-");
    let chars = result.text.as_deref().map(|t| t.chars().count()).unwrap_or(0);
    format!("{:<13} {:<8} {:>8} chars", kind, method, chars)
}

/// Print a per-file table followed by totals.
pub fn print_summary(report: &BatchReport) {
    println!("\n{}", style("Extraction Summary").bold());
    println!("{}", "-".repeat(72));

    for result in &report.results {
        let name = result
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let marker = if result.is_success() {
            style("✓").green()
        } else {
            style("✗").red()
        };
        println!("{} {:<36} {}", marker, truncate(&name, 36), describe(result));
        if let Some(ref error) = result.error {
            println!("    {}", style(&error.message).dim());
        }
        if let Some(ref artifact) = result.artifact {
            println!("    {} {}", style("→").dim(), artifact.display());
        }
    }

    for error in &report.errors {
        println!(
            "{} {:<36} {}",
            style("✗").red(),
            truncate(&error.path.display().to_string(), 36),
            style(error.kind.as_str()).red()
        );
    }

    println!("{}", "-".repeat(72));
    println!(
        "{} {} succeeded, {} failed, peak OCR {} ({:.1}s)",
        style("→").cyan(),
        report.succeeded(),
        report.failed(),
        report.peak_ocr_tasks,
        report.elapsed_ms as f64 / 1000.0
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer name.pdf", 10), "a much ...");
    }

    #[test]
    fn test_collect_pdf_paths_walks_and_sorts() {
        let temp = TempDir::new().unwrap();
        let sub = temp.path().join("maths");
        std::fs::create_dir_all(&sub).unwrap();
        std::fs::write(sub.join("b.PDF"), b"%PDF").unwrap();
        std::fs::write(temp.path().join("a.pdf"), b"%PDF").unwrap();
        std::fs::write(temp.path().join("notes.txt"), b"text").unwrap();

        let explicit = PathBuf::from("/missing/explicit.pdf");
        let paths = collect_pdf_paths(&[temp.path().to_path_buf(), explicit.clone()]).unwrap();

        assert_eq!(
            paths,
            vec![temp.path().join("a.pdf"), sub.join("b.PDF"), explicit]
        );
    }
}
