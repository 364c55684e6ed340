//! External command plumbing shared by the Poppler and Tesseract adapters.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::EngineError;

/// Binaries the production engine shells out to.
pub const REQUIRED_TOOLS: [&str; 4] = ["pdfinfo", "pdftotext", "pdftoppm", "tesseract"];

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Package that provides a tool, for install hints.
pub fn install_hint(tool: &str) -> &'static str {
    match tool {
        "tesseract" => "tesseract-ocr",
        _ => "poppler-utils",
    }
}

/// Check if a binary is available in PATH.
pub fn check_binary(name: &str) -> bool {
    which::which(name).is_ok()
}

/// Availability of every required tool, in a stable order.
pub fn check_tools() -> Vec<(String, bool)> {
    REQUIRED_TOOLS
        .iter()
        .map(|tool| (tool.to_string(), check_binary(tool)))
        .collect()
}

/// Run a command to completion, killing it once `deadline` has passed.
///
/// Output pipes are drained on background threads so a chatty child cannot
/// block on a full pipe while we poll.
pub(crate) fn run_with_deadline(
    mut cmd: Command,
    tool: &str,
    deadline: Duration,
) -> Result<Output, EngineError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(EngineError::ToolNotFound(format!(
                "{} (install {})",
                tool,
                install_hint(tool)
            )));
        }
        Err(e) => return Err(EngineError::Io(e)),
    };

    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let started = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if started.elapsed() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            tracing::warn!("{} killed after {:?}", tool, deadline);
            return Err(EngineError::Timeout {
                tool: tool.to_string(),
                secs: deadline.as_secs(),
            });
        }
        thread::sleep(POLL_INTERVAL);
    };

    Ok(Output {
        status,
        stdout: join_drain(stdout),
        stderr: join_drain(stderr),
    })
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn join_drain(handle: Option<thread::JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

/// Stdout of a finished command, or the error built from its stderr.
pub(crate) fn handle_cmd_output(
    output: Output,
    on_failure: impl FnOnce(String) -> EngineError,
) -> Result<String, EngineError> {
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(on_failure(stderr.trim().to_string()))
    }
}

/// Parse the `Pages:` line of `pdfinfo` output.
pub(crate) fn parse_page_count(pdfinfo: &str) -> Option<u32> {
    pdfinfo
        .lines()
        .find(|line| line.starts_with("Pages:"))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse().ok())
}

/// Find the image file pdftoppm wrote for a 1-based page number.
///
/// pdftoppm pads the page number to the width of the document's last page
/// number, so the exact name depends on the page count.
pub(crate) fn find_page_image(dir: &Path, page_num: u32) -> Option<PathBuf> {
    (1..=6)
        .map(|digits| dir.join(format!("page-{:0width$}.png", page_num, width = digits)))
        .find(|path| path.exists())
}
