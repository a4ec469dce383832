//! OS-level process liveness check, used by scenario tests that verify a
//! session's `Stop` actually terminated the child rather than just marking
//! the Session struct stopped.

#[cfg(unix)]
pub fn is_process_alive(pid: u32) -> bool {
    // SAFETY: signal 0 sends no signal, only checks whether the process
    // exists and is signalable by this user; `pid` is a plain integer.
    unsafe { libc::kill(pid as i32, 0) == 0 }
}

#[cfg(not(unix))]
pub fn is_process_alive(_pid: u32) -> bool {
    false
}
