//! External tools: the text recognizer and the page merger.
//!
//! Both are opaque processes that take file paths and either produce an output
//! file or exit non-zero. The traits are the seam the pipeline is generic over.

use std::ffi::OsStr;
use std::future::Future;
use std::path::Path;
use std::process::Stdio;

use tracing::debug;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ToolError {
    #[error("failed to run {program}: {reason}")]
    Spawn { program: String, reason: String },

    #[error("{program} exited with {}: {stderr}", exit_label(.code))]
    Failed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },
}

fn exit_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| c.to_string())
}

/// Produces a text-searchable copy of `input` for one language.
pub trait Recognizer: Send + Sync {
    fn recognize(
        &self,
        input: &Path,
        language: &str,
        output: &Path,
    ) -> impl Future<Output = Result<(), ToolError>> + Send;
}

/// Interleaves front pages with back pages into a single document.
pub trait Merger: Send + Sync {
    fn collate(
        &self,
        front: &Path,
        back: &Path,
        output: &Path,
    ) -> impl Future<Output = Result<(), ToolError>> + Send;
}

/// `ocrmypdf -q <input> -l <lang> -- <output>`
#[derive(Debug, Clone)]
pub struct OcrMyPdf {
    program: String,
    extra_args: Vec<String>,
}

impl Default for OcrMyPdf {
    fn default() -> Self {
        Self::new("ocrmypdf")
    }
}

impl OcrMyPdf {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            extra_args: Vec::new(),
        }
    }

    /// Arguments passed before the input path, e.g. `--deskew`.
    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }
}

impl Recognizer for OcrMyPdf {
    async fn recognize(
        &self,
        input: &Path,
        language: &str,
        output: &Path,
    ) -> Result<(), ToolError> {
        let mut args: Vec<&OsStr> = vec![OsStr::new("-q")];
        args.extend(self.extra_args.iter().map(OsStr::new));
        args.extend([
            input.as_os_str(),
            OsStr::new("-l"),
            OsStr::new(language),
            OsStr::new("--"),
            output.as_os_str(),
        ]);
        run_tool(&self.program, &args).await
    }
}

/// `qpdf --collate --empty --pages <front> <back> z-1 -- <output>`
///
/// The back file is read last page first, matching a flipped stack.
#[derive(Debug, Clone)]
pub struct Qpdf {
    program: String,
}

impl Default for Qpdf {
    fn default() -> Self {
        Self::new("qpdf")
    }
}

impl Qpdf {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Merger for Qpdf {
    async fn collate(&self, front: &Path, back: &Path, output: &Path) -> Result<(), ToolError> {
        let args = [
            OsStr::new("--collate"),
            OsStr::new("--empty"),
            OsStr::new("--pages"),
            front.as_os_str(),
            back.as_os_str(),
            OsStr::new("z-1"),
            OsStr::new("--"),
            output.as_os_str(),
        ];
        run_tool(&self.program, &args).await
    }
}

/// Run `program` to completion, mapping spawn failures and non-zero exits.
async fn run_tool(program: &str, args: &[&OsStr]) -> Result<(), ToolError> {
    debug!(program, ?args, "running external tool");
    let output = tokio::process::Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| ToolError::Spawn {
            program: program.to_string(),
            reason: e.to_string(),
        })?;
    if !output.status.success() {
        return Err(ToolError::Failed {
            program: program.to_string(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}
