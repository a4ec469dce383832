use tokio::io::{AsyncReadExt, BufReader};
use tokio::process::ChildStdout;

use crate::error::{Error, Result};

/// The canonical EOF sentinel `ReadLine` returns once the child closes
/// stdout.
pub const EOF: &str = "\u{0}__FLEETLINE_EOF__\u{0}";

const MIN_BUFFER: usize = 1024 * 1024;
const MAX_LINE: usize = 10 * 1024 * 1024;

/// Buffered reader over the agent's stdout that reads one newline-delimited
/// JSON frame at a time. Implemented as a manual read-until-newline
/// loop rather than `AsyncBufReadExt::lines()` so the 10 MiB cap can be
/// enforced incrementally, not after buffering an unbounded line.
pub struct LineReader {
    inner: BufReader<ChildStdout>,
    scratch: Vec<u8>,
}

impl LineReader {
    pub fn new(stdout: ChildStdout) -> Self {
        Self {
            inner: BufReader::with_capacity(MIN_BUFFER, stdout),
            scratch: Vec::with_capacity(4096),
        }
    }

    /// Returns the next newline-terminated frame with the terminator
    /// stripped, [`EOF`] when the child closes stdout, or
    /// `Error::FrameTooLarge` if a single line exceeds the cap — in which
    /// case the oversize line is discarded and reading continues on the
    /// next call.
    pub async fn read_line(&mut self) -> Result<String> {
        self.scratch.clear();
        let mut byte = [0u8; 1];
        loop {
            let n = self.inner.read(&mut byte).await?;
            if n == 0 {
                if self.scratch.is_empty() {
                    return Ok(EOF.to_string());
                }
                break;
            }
            if byte[0] == b'\n' {
                break;
            }
            self.scratch.push(byte[0]);
            if self.scratch.len() > MAX_LINE {
                let len = self.scratch.len();
                // Drain the rest of this oversize line before returning, so
                // the next call starts at the following frame.
                while self.inner.read(&mut byte).await? > 0 && byte[0] != b'\n' {}
                return Err(Error::FrameTooLarge { len });
            }
        }
        Ok(String::from_utf8_lossy(&self.scratch).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Stdio;
    use tokio::process::Command;

    #[tokio::test]
    async fn reads_lines_and_signals_eof() {
        let mut child = Command::new("printf")
            .arg("a\nb\n")
            .stdout(Stdio::piped())
            .spawn()
            .unwrap();
        let stdout = child.stdout.take().unwrap();
        let mut reader = LineReader::new(stdout);
        assert_eq!(reader.read_line().await.unwrap(), "a");
        assert_eq!(reader.read_line().await.unwrap(), "b");
        assert_eq!(reader.read_line().await.unwrap(), EOF);
        child.wait().await.unwrap();
    }

    #[tokio::test]
    async fn oversize_line_is_skipped_not_fatal() {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg("yes x | head -c 11000000; echo; echo ok")
            .stdout(Stdio::piped())
            .spawn()
            .unwrap();
        let stdout = child.stdout.take().unwrap();
        let mut reader = LineReader::new(stdout);
        let err = reader.read_line().await.unwrap_err();
        assert!(matches!(err, Error::FrameTooLarge { .. }));
        assert_eq!(reader.read_line().await.unwrap(), "ok");
        child.wait().await.unwrap();
    }
}
