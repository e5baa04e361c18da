//! PID-level soft-stop → forced-kill escalation (spec §4.5).

use std::time::Duration;

/// A single PID's termination outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillOutcome {
    AlreadyGone,
    Terminated,
    StillAlive,
}

/// Sends SIGTERM, polls for up to `soft_wait`, escalates to SIGKILL, polls
/// again for up to `hard_wait`. Mirrors the orphan-cleanup PID killer: no
/// `Child` handle is available here, only a bare PID, possibly on a remote
/// host (spec §4.5 failure policy).
#[cfg(unix)]
pub async fn kill_pid(pid: u32, soft_wait: Duration, hard_wait: Duration) -> KillOutcome {
    use nix::errno::Errno;
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    let nix_pid = Pid::from_raw(pid as i32);

    if let Err(e) = signal::kill(nix_pid, Signal::SIGTERM) {
        if e == Errno::ESRCH {
            return KillOutcome::AlreadyGone;
        }
        tracing::warn!(pid, error = %e, "SIGTERM failed");
    }

    if poll_for_exit(nix_pid, soft_wait).await {
        return KillOutcome::Terminated;
    }

    if let Err(e) = signal::kill(nix_pid, Signal::SIGKILL) {
        if e == Errno::ESRCH {
            return KillOutcome::Terminated;
        }
        tracing::warn!(pid, error = %e, "SIGKILL failed");
    }

    if poll_for_exit(nix_pid, hard_wait).await {
        KillOutcome::Terminated
    } else {
        KillOutcome::StillAlive
    }
}

#[cfg(unix)]
async fn poll_for_exit(pid: nix::unistd::Pid, budget: Duration) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal;

    let poll_interval = Duration::from_millis(100);
    let attempts = (budget.as_millis() / poll_interval.as_millis()).max(1) as u32;

    for _ in 0..attempts {
        tokio::time::sleep(poll_interval).await;
        match signal::kill(pid, None) {
            Ok(_) => continue,
            Err(Errno::ESRCH) => return true,
            Err(_) => continue,
        }
    }
    false
}

#[cfg(not(unix))]
pub async fn kill_pid(_pid: u32, _soft_wait: Duration, _hard_wait: Duration) -> KillOutcome {
    KillOutcome::StillAlive
}

/// Checks whether `pid` still refers to a live process, for `verify_clean`.
pub fn pid_is_alive(pid: u32, system: &sysinfo::System) -> bool {
    system.process(sysinfo::Pid::from_u32(pid)).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[tokio::test]
    async fn already_gone_pid_is_reported_as_such() {
        let outcome = kill_pid(999_999, Duration::from_millis(50), Duration::from_millis(50)).await;
        assert_eq!(outcome, KillOutcome::AlreadyGone);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn terminates_a_real_child_process() {
        let mut child = tokio::process::Command::new("sleep").arg("60").spawn().expect("spawn sleep");
        let pid = child.id().expect("pid");

        let outcome = kill_pid(pid, Duration::from_millis(500), Duration::from_millis(500)).await;
        let _ = child.wait().await;

        assert_eq!(outcome, KillOutcome::Terminated);
    }
}
