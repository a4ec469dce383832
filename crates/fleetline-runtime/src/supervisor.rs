use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncWriteExt, ChildStdin, ChildStdout};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use fleetline_core::config::StopTimeline;

use crate::codec::LineReader;
use crate::error::{Error, Result};

/// Owns one child agent process plus its three stdio streams.
///
/// `WriteFrame`/`ReadLine` are exposed through [`LineReader`]/the stdin
/// handle rather than on `Supervisor` directly, so the reader and writer can
/// be moved into separate tasks without fighting over `&mut self`.
pub struct Supervisor {
    child: Mutex<Option<Child>>,
    stdin: Mutex<Option<ChildStdin>>,
    stop_timeline: StopTimeline,
    started: std::sync::atomic::AtomicBool,
    stopping: std::sync::atomic::AtomicBool,
}

/// What `Start` hands back: the reader half (wrapped for line framing), the
/// raw stderr stream for the drain worker, and a `Wait` future the caller
/// can poll for the child's exit status.
pub struct StartedStreams {
    pub stdout: LineReader,
    pub stderr: tokio::process::ChildStderr,
}

impl Supervisor {
    pub fn new(stop_timeline: StopTimeline) -> Self {
        Self {
            child: Mutex::new(None),
            stdin: Mutex::new(None),
            stop_timeline,
            started: std::sync::atomic::AtomicBool::new(false),
            stopping: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Spawn the child in its own process group so a later interrupt/kill
    /// can be delivered to every descendant it forks, not just itself.
    pub async fn start(
        &self,
        binary: &str,
        args: &[String],
        env: &HashMap<String, String>,
        cwd: &str,
    ) -> Result<StartedStreams> {
        if self.started.swap(true, std::sync::atomic::Ordering::SeqCst) {
            return Err(Error::AlreadyStarted);
        }

        let mut command = Command::new(binary);
        command
            .args(args)
            .current_dir(cwd)
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            unsafe {
                command.pre_exec(|| {
                    // SAFETY: async-signal-safe libc call made before exec in the
                    // forked child; puts the child in its own process group so
                    // Stop can signal the whole group, not just this PID.
                    if libc::setpgid(0, 0) != 0 {
                        return Err(std::io::Error::last_os_error());
                    }
                    Ok(())
                });
            }
        }

        let mut child = command.spawn().map_err(Error::ProcessSpawn)?;
        let stdin = child.stdin.take().expect("piped stdin");
        let stdout = child.stdout.take().expect("piped stdout");
        let stderr = child.stderr.take().expect("piped stderr");

        *self.stdin.lock().await = Some(stdin);
        *self.child.lock().await = Some(child);

        Ok(StartedStreams {
            stdout: LineReader::new(stdout),
            stderr,
        })
    }

    /// Append a single newline if absent and write the frame. Serialized
    /// under a mutex so concurrent writers (turn-runner, correlator replies)
    /// never interleave bytes on the wire.
    pub async fn write_frame(&self, bytes: &[u8]) -> Result<()> {
        if self.stopping.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(Error::Stopping);
        }
        let mut guard = self.stdin.lock().await;
        let stdin = guard.as_mut().ok_or(Error::NotStarted)?;
        stdin.write_all(bytes).await?;
        if bytes.last() != Some(&b'\n') {
            stdin.write_all(b"\n").await?;
        }
        stdin.flush().await?;
        Ok(())
    }

    /// Idempotent two-phase termination: close stdin, wait, interrupt the
    /// process group, wait, kill the process group, wait. Never returns an
    /// error — cleanup is best-effort.
    pub async fn stop(&self) {
        if self
            .stopping
            .swap(true, std::sync::atomic::Ordering::SeqCst)
        {
            return;
        }

        let pid = {
            let guard = self.child.lock().await;
            guard.as_ref().and_then(|c| c.id())
        };

        // Close stdin: drop the handle so the child observes EOF on its stdin.
        self.stdin.lock().await.take();

        if self.wait_for_exit(self.stop_timeline.stdin_close_wait).await {
            return;
        }

        if let Some(pid) = pid {
            send_group_signal(pid, Signal::Interrupt);
        }
        if self.wait_for_exit(self.stop_timeline.interrupt_wait).await {
            return;
        }

        if let Some(pid) = pid {
            send_group_signal(pid, Signal::Kill);
        }
        self.wait_for_exit(self.stop_timeline.kill_wait).await;
    }

    /// Poll-with-timeout for child exit, used between each phase of `stop`.
    async fn wait_for_exit(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            {
                let mut guard = self.child.lock().await;
                if let Some(child) = guard.as_mut() {
                    if let Ok(Some(_status)) = child.try_wait() {
                        return true;
                    }
                } else {
                    return true;
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    /// OS-level poll of whether the child is still running, used by tests
    /// verifying scenario 6 (`Stop while streaming`).
    pub async fn is_running(&self) -> bool {
        let mut guard = self.child.lock().await;
        match guard.as_mut() {
            Some(child) => !matches!(child.try_wait(), Ok(Some(_))),
            None => false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Signal {
    Interrupt,
    Kill,
}

#[cfg(unix)]
fn send_group_signal(pid: u32, signal: Signal) {
    let sig = match signal {
        Signal::Interrupt => libc::SIGINT,
        Signal::Kill => libc::SIGKILL,
    };
    // SAFETY: signalling the negative pid targets the whole process group
    // `start` placed the child in via `setpgid`; `kill` with an invalid pid
    // just returns -1, nothing unsafe about the call itself.
    unsafe {
        libc::kill(-(pid as i32), sig);
    }
}

#[cfg(not(unix))]
fn send_group_signal(_pid: u32, _signal: Signal) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_before_start_fails() {
        let sup = Supervisor::new(StopTimeline::default());
        let err = sup.write_frame(b"{}").await.unwrap_err();
        assert!(matches!(err, Error::NotStarted));
    }

    #[tokio::test]
    async fn double_start_fails() {
        let sup = Supervisor::new(StopTimeline::default());
        sup.start("cat", &[], &HashMap::new(), ".").await.unwrap();
        let err = sup
            .start("cat", &[], &HashMap::new(), ".")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyStarted));
        sup.stop().await;
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let sup = Supervisor::new(StopTimeline {
            stdin_close_wait: Duration::from_millis(20),
            interrupt_wait: Duration::from_millis(20),
            kill_wait: Duration::from_millis(20),
        });
        sup.start("cat", &[], &HashMap::new(), ".").await.unwrap();
        sup.stop().await;
        sup.stop().await;
        assert!(!sup.is_running().await);
    }
}
