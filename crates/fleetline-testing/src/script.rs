//! The scripted line-protocol the `fleetline-fake-agent` binary plays back.
//!
//! A [`Script`] is a short, ordered list of steps a real OS process executes
//! over its own stdin/stdout, so runtime tests exercise a genuine child
//! process and real pipes through the actual Process Supervisor rather than
//! an in-memory stand-in for it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptStep {
    /// Write `frame` to stdout as one line of JSON.
    Emit { frame: Value },
    /// Sleep before continuing; simulates streaming pace.
    SleepMs { millis: u64 },
    /// Block until one line arrives on stdin, discarding it.
    WaitForLine,
    /// Block until a received stdin line contains `needle`.
    WaitForContains { needle: String },
    /// Exit the process immediately with `code`.
    Exit { code: i32 },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Script {
    pub steps: Vec<ScriptStep>,
}

impl Script {
    pub fn builder() -> ScriptBuilder {
        ScriptBuilder::default()
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Writes the script to a temp file the fake-agent binary can be pointed
    /// at via its first argument. The returned guard must outlive the child
    /// process reading the file.
    pub fn into_file(self) -> anyhow::Result<ScriptFile> {
        let mut temp = tempfile::NamedTempFile::new()?;
        temp.write_all(serde_json::to_string(&self)?.as_bytes())?;
        temp.flush()?;
        let path = temp.path().to_path_buf();
        Ok(ScriptFile { _temp: temp, path })
    }
}

/// Keeps the backing temp file alive for as long as the scripted child needs
/// to read it.
pub struct ScriptFile {
    _temp: tempfile::NamedTempFile,
    path: PathBuf,
}

impl ScriptFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn path_str(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScriptBuilder {
    steps: Vec<ScriptStep>,
}

impl ScriptBuilder {
    pub fn emit(mut self, frame: Value) -> Self {
        self.steps.push(ScriptStep::Emit { frame });
        self
    }

    pub fn sleep_ms(mut self, millis: u64) -> Self {
        self.steps.push(ScriptStep::SleepMs { millis });
        self
    }

    pub fn wait_for_line(mut self) -> Self {
        self.steps.push(ScriptStep::WaitForLine);
        self
    }

    pub fn wait_for_contains(mut self, needle: impl Into<String>) -> Self {
        self.steps.push(ScriptStep::WaitForContains {
            needle: needle.into(),
        });
        self
    }

    pub fn exit(mut self, code: i32) -> Self {
        self.steps.push(ScriptStep::Exit { code });
        self
    }

    pub fn build(self) -> Script {
        Script { steps: self.steps }
    }
}
