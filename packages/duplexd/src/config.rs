use anyhow::{Result, bail};
use duplex::{
    DeliveryMode, OcrMyPdf, PairingPolicy, PipelineConfig, Qpdf, ReadinessPolicy, SweepConfig,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// =============================================================================
// File config (figment-deserialized from defaults / duplex.toml / env vars)
// =============================================================================
//
//   duplex.toml:     [readiness]
//                    attempts = 20
//
//   env var:         DUPLEX_READINESS__ATTEMPTS=20   (double underscore = nesting)

/// Name of the config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "duplex.toml";

/// Delivery mode as written in config or on the command line.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Filesystem notifications
    Live,
    /// Rescan on a fixed interval
    Poll,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default = "default_watch_dir")]
    pub watch_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Unset means "decide from `poll_interval_secs`".
    #[serde(default)]
    pub mode: Option<Mode>,
    #[serde(default)]
    pub poll_interval_secs: u64,
    #[serde(default)]
    pub readiness: ReadinessFileConfig,
    #[serde(default)]
    pub pairing: PairingFileConfig,
    #[serde(default)]
    pub recognizer: RecognizerFileConfig,
    #[serde(default)]
    pub merger: MergerFileConfig,
    #[serde(default)]
    pub sweep: SweepFileConfig,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            watch_dir: default_watch_dir(),
            output_dir: default_output_dir(),
            mode: None,
            poll_interval_secs: 0,
            readiness: Default::default(),
            pairing: Default::default(),
            recognizer: Default::default(),
            merger: Default::default(),
            sweep: Default::default(),
        }
    }
}

/// `[readiness]`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReadinessFileConfig {
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    #[serde(default = "default_delay_secs")]
    pub delay_secs: u64,
}

impl Default for ReadinessFileConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            delay_secs: default_delay_secs(),
        }
    }
}

/// `[pairing]`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PairingFileConfig {
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

impl Default for PairingFileConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
        }
    }
}

/// `[recognizer]`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecognizerFileConfig {
    #[serde(default = "default_recognizer_program")]
    pub program: String,
    #[serde(default = "duplex::pipeline::default_languages")]
    pub languages: Vec<String>,
    /// Inserted before the input path on every invocation.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for RecognizerFileConfig {
    fn default() -> Self {
        Self {
            program: default_recognizer_program(),
            languages: duplex::pipeline::default_languages(),
            extra_args: Vec::new(),
        }
    }
}

/// `[merger]`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MergerFileConfig {
    #[serde(default = "default_merger_program")]
    pub program: String,
}

impl Default for MergerFileConfig {
    fn default() -> Self {
        Self {
            program: default_merger_program(),
        }
    }
}

/// `[sweep]`, used by `duplexd merge-sweep`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SweepFileConfig {
    #[serde(default)]
    pub input_dir: Option<PathBuf>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub archive_dir: Option<PathBuf>,
    #[serde(default)]
    pub interval_secs: u64,
}

fn default_watch_dir() -> PathBuf {
    PathBuf::from("/input")
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("/out")
}
fn default_attempts() -> u32 {
    10
}
fn default_delay_secs() -> u64 {
    5
}
fn default_window_secs() -> u64 {
    60
}
fn default_recognizer_program() -> String {
    "ocrmypdf".to_string()
}
fn default_merger_program() -> String {
    "qpdf".to_string()
}

/// Build a figment that layers: defaults → duplex.toml → DUPLEX_* env vars.
///
/// A missing config file contributes nothing.
///   `DUPLEX_POLL_INTERVAL_SECS=30`  →  `poll_interval_secs = 30`
///   `DUPLEX_MERGER__PROGRAM=/usr/local/bin/qpdf`  →  `merger.program = ...`
pub fn load_config(config_file: &Path) -> figment::Figment {
    use figment::{
        Figment,
        providers::{Env, Format, Serialized, Toml},
    };

    Figment::from(Serialized::defaults(FileConfig::default()))
        .merge(Toml::file(config_file))
        .merge(Env::prefixed("DUPLEX_").split("__"))
}

impl FileConfig {
    pub fn pipeline_config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::new(&self.watch_dir, &self.output_dir);
        config.languages = self.recognizer.languages.clone();
        config.readiness = ReadinessPolicy {
            attempts: self.readiness.attempts,
            delay: Duration::from_secs(self.readiness.delay_secs),
        };
        config.pairing = PairingPolicy {
            window: Duration::from_secs(self.pairing.window_secs),
        };
        config
    }

    pub fn delivery_mode(&self) -> Result<DeliveryMode> {
        let interval = Duration::from_secs(self.poll_interval_secs);
        match self.mode {
            None => Ok(DeliveryMode::from_poll_interval(interval)),
            Some(Mode::Live) => Ok(DeliveryMode::Live),
            Some(Mode::Poll) if interval.is_zero() => {
                bail!("poll mode needs a poll interval above zero")
            }
            Some(Mode::Poll) => Ok(DeliveryMode::Poll(interval)),
        }
    }

    pub fn recognizer(&self) -> OcrMyPdf {
        OcrMyPdf::new(&self.recognizer.program).with_extra_args(self.recognizer.extra_args.clone())
    }

    pub fn merger(&self) -> Qpdf {
        Qpdf::new(&self.merger.program)
    }

    /// Sweep directories; all three must be set by file, env or flags.
    pub fn sweep_config(&self) -> Result<SweepConfig> {
        let (Some(input_dir), Some(output_dir), Some(archive_dir)) = (
            self.sweep.input_dir.clone(),
            self.sweep.output_dir.clone(),
            self.sweep.archive_dir.clone(),
        ) else {
            bail!("merge-sweep needs input, output and archive directories");
        };
        Ok(SweepConfig {
            input_dir,
            output_dir,
            archive_dir,
        })
    }
}
