#![allow(dead_code)]

use duplex::{Merger, Pipeline, PipelineConfig, ReadinessPolicy, Recognizer, ToolError};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

/// Writes a small file per language and remembers every call.
#[derive(Clone, Default)]
pub struct FakeRecognizer {
    pub calls: Arc<Mutex<Vec<(PathBuf, String)>>>,
    pub fail_for: Arc<Mutex<Option<String>>>,
}

impl FakeRecognizer {
    /// File names recognized, in order, once per file (first language only).
    pub fn recognized_names(&self) -> Vec<String> {
        let calls = self.calls.lock().unwrap();
        let first_lang = calls.first().map(|(_, l)| l.clone());
        calls
            .iter()
            .filter(|(_, l)| Some(l) == first_lang.as_ref())
            .map(|(p, _)| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    pub fn fail_for(&self, file_name: &str) {
        *self.fail_for.lock().unwrap() = Some(file_name.to_string());
    }
}

impl Recognizer for FakeRecognizer {
    async fn recognize(
        &self,
        input: &Path,
        language: &str,
        output: &Path,
    ) -> Result<(), ToolError> {
        self.calls
            .lock()
            .unwrap()
            .push((input.to_path_buf(), language.to_string()));

        let failing = self.fail_for.lock().unwrap().clone();
        if failing.as_deref() == input.file_name().and_then(|n| n.to_str()) {
            return Err(ToolError::Failed {
                program: "ocrmypdf".to_string(),
                code: Some(2),
                stderr: "unreadable input".to_string(),
            });
        }

        std::fs::write(output, format!("{} [{}]", input.display(), language)).unwrap();
        Ok(())
    }
}

/// Writes the collated output and remembers `(front, back, output)`.
#[derive(Clone, Default)]
pub struct FakeMerger {
    pub calls: Arc<Mutex<Vec<(PathBuf, PathBuf, PathBuf)>>>,
    pub fail: Arc<Mutex<bool>>,
}

impl FakeMerger {
    pub fn calls(&self) -> Vec<(PathBuf, PathBuf, PathBuf)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }
}

impl Merger for FakeMerger {
    async fn collate(&self, front: &Path, back: &Path, output: &Path) -> Result<(), ToolError> {
        self.calls.lock().unwrap().push((
            front.to_path_buf(),
            back.to_path_buf(),
            output.to_path_buf(),
        ));
        if *self.fail.lock().unwrap() {
            return Err(ToolError::Failed {
                program: "qpdf".to_string(),
                code: Some(3),
                stderr: "damaged file".to_string(),
            });
        }
        std::fs::write(output, b"collated").unwrap();
        Ok(())
    }
}

/// An input directory and an output root inside one temp dir.
pub struct Fixture {
    pub tmp: TempDir,
    pub input: PathBuf,
    pub output: PathBuf,
    pub recognizer: FakeRecognizer,
    pub merger: FakeMerger,
}

impl Fixture {
    pub fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("input");
        let output = tmp.path().join("out");
        std::fs::create_dir_all(&input).unwrap();
        std::fs::create_dir_all(&output).unwrap();
        Self {
            tmp,
            input,
            output,
            recognizer: FakeRecognizer::default(),
            merger: FakeMerger::default(),
        }
    }

    pub fn config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::new(&self.input, &self.output);
        config.readiness = ReadinessPolicy {
            attempts: 5,
            delay: Duration::from_millis(10),
        };
        config
    }

    pub fn pipeline(&self) -> Pipeline<FakeRecognizer, FakeMerger> {
        Pipeline::new(self.config(), self.recognizer.clone(), self.merger.clone())
    }

    /// Drop a scan into the input directory with a given arrival offset.
    pub fn scan(&self, name: &str, secs: u64) -> PathBuf {
        write_with_mtime(&self.input.join(name), b"%PDF-1.4 scan", at(secs))
    }

    /// Output directories (not hidden) under the output root, sorted.
    pub fn output_dirs(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.output)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| !n.starts_with('.'))
            .collect();
        names.sort();
        names
    }

    pub fn hidden_entries(&self) -> Vec<String> {
        std::fs::read_dir(&self.output)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with(".scratch-"))
            .collect()
    }
}

pub fn at(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000 + secs)
}

pub fn write_with_mtime(path: &Path, contents: &[u8], mtime: SystemTime) -> PathBuf {
    std::fs::write(path, contents).unwrap();
    let file = std::fs::File::options().write(true).open(path).unwrap();
    file.set_modified(mtime).unwrap();
    path.to_path_buf()
}
