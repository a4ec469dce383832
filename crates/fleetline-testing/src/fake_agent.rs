//! Locates the compiled `fleetline-fake-agent` binary for integration tests
//! in other workspace crates to spawn through the real Process Supervisor,
//! and wraps it so it can be registered as a dialect's agent binary even
//! though the Manager's `agent_binaries` map carries no argv slot.

use std::io::Write;
use std::path::PathBuf;

use crate::script::ScriptFile;

/// Cargo places every workspace binary — including bins owned by a
/// library crate — in the same `target/<profile>/` directory, so a
/// sibling-binary lookup relative to the currently running test executable
/// finds it regardless of which crate's `tests/` binary is asking.
pub fn fake_agent_binary() -> PathBuf {
    let mut dir = std::env::current_exe()
        .expect("current test executable path")
        .parent()
        .expect("executable directory")
        .to_path_buf();
    if dir.ends_with("deps") {
        dir.pop();
    }
    dir.push(format!(
        "fleetline-fake-agent{}",
        std::env::consts::EXE_SUFFIX
    ));
    dir
}

/// A tiny generated shell wrapper around [`fake_agent_binary`] with one
/// script's path baked in, so the wrapper's own path can be registered
/// directly in `ManagerConfig::agent_binaries`.
pub struct WrapperBinary {
    _temp: tempfile::NamedTempFile,
    path: PathBuf,
}

impl WrapperBinary {
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    pub fn path_str(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

#[cfg(unix)]
pub fn wrapper_for(script: &ScriptFile) -> anyhow::Result<WrapperBinary> {
    use std::os::unix::fs::PermissionsExt;

    let mut wrapper = tempfile::NamedTempFile::new()?;
    writeln!(
        wrapper,
        "#!/bin/sh\nexec \"{}\" \"{}\"\n",
        fake_agent_binary().display(),
        script.path().display()
    )?;
    wrapper.flush()?;
    let path = wrapper.path().to_path_buf();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
    Ok(WrapperBinary { _temp: wrapper, path })
}

#[cfg(not(unix))]
pub fn wrapper_for(_script: &ScriptFile) -> anyhow::Result<WrapperBinary> {
    anyhow::bail!("fake-agent wrapper scripts are only supported on unix")
}
