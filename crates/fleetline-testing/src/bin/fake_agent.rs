//! A tiny scripted stand-in for a real agent CLI, driven by a JSON
//! [`fleetline_testing::Script`] passed as argv\[1\]. Emits each `Emit`
//! frame as one line of JSON on stdout and can block on input from the
//! host, so runtime tests exercise the real Process Supervisor's stdio
//! plumbing end to end instead of mocking it.

use std::io::{BufRead, Write};
use std::time::Duration;

use fleetline_testing::script::{Script, ScriptStep};

fn main() {
    let script_path = std::env::args()
        .nth(1)
        .expect("usage: fleetline-fake-agent <script.json>");
    let script =
        Script::load(std::path::Path::new(&script_path)).expect("failed to load script file");

    let (tx, rx) = std::sync::mpsc::channel::<String>();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    for step in script.steps {
        match step {
            ScriptStep::Emit { frame } => {
                let line = serde_json::to_string(&frame).expect("serialise scripted frame");
                writeln!(out, "{line}").expect("write scripted frame to stdout");
                out.flush().expect("flush stdout");
            }
            ScriptStep::SleepMs { millis } => {
                std::thread::sleep(Duration::from_millis(millis));
            }
            ScriptStep::WaitForLine => {
                let _ = rx.recv();
            }
            ScriptStep::WaitForContains { needle } => loop {
                match rx.recv() {
                    Ok(line) if line.contains(&needle) => break,
                    Ok(_) => continue,
                    Err(_) => break,
                }
            },
            ScriptStep::Exit { code } => {
                std::process::exit(code);
            }
        }
    }
}
