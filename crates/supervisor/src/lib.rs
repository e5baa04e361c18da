//! Device Process Supervisor (C5, spec §4.5).

mod pid;

use std::collections::HashMap;
use std::time::Duration;

use orchestrator_core::{EdgePids, EdgeRole, Error};
use parking_lot::RwLock;

pub use pid::KillOutcome;

/// Outcome of `terminate`, one flag/error pair per role — spec §8 requires
/// these never both be absent.
#[derive(Debug, Clone, Default)]
pub struct TerminationReport {
    pub capture_terminated: bool,
    pub player_terminated: bool,
    pub errors: Vec<Error>,
}

#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub soft_stop_wait: Duration,
    pub forced_kill_wait: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self { soft_stop_wait: Duration::from_secs(3), forced_kill_wait: Duration::from_secs(2) }
    }
}

/// Tracks which OS PIDs belong to which session's edge capture/player
/// processes and drives their termination. PIDs may live on a remote host;
/// this implementation assumes a local process reachable by OS signal, and
/// a remote deployment substitutes a different `kill`/`verify` transport
/// behind the same operations (spec §4.5 failure policy).
pub struct DeviceProcessSupervisor {
    config: SupervisorConfig,
    registered: RwLock<HashMap<String, EdgePids>>,
}

impl DeviceProcessSupervisor {
    pub fn new(config: SupervisorConfig) -> Self {
        Self { config, registered: RwLock::new(HashMap::new()) }
    }

    pub fn register(&self, session_id: &str, role: EdgeRole, pid: u32) {
        let mut registered = self.registered.write();
        registered.entry(session_id.to_string()).or_default().set(role, pid);
    }

    /// Terminates every registered PID for `session_id`, capture before
    /// player. The bookkeeping entry is left in place so a subsequent
    /// `verify_clean` poll still has PIDs to check against — it is only
    /// dropped once `verify_clean` itself observes the session is clean.
    pub async fn terminate(&self, session_id: &str) -> TerminationReport {
        let edge_pids = self.registered.read().get(session_id).cloned().unwrap_or_default();
        let mut report = TerminationReport::default();

        for role in [EdgeRole::Capture, EdgeRole::Player] {
            let terminated = match edge_pids.get(role) {
                None => true,
                Some(pid) => {
                    let outcome =
                        pid::kill_pid(pid, self.config.soft_stop_wait, self.config.forced_kill_wait).await;
                    match outcome {
                        KillOutcome::AlreadyGone | KillOutcome::Terminated => true,
                        KillOutcome::StillAlive => {
                            report.errors.push(Error::TerminationFailed {
                                pid,
                                reason: format!("{} did not exit after forced kill", role.as_str()),
                            });
                            false
                        }
                    }
                }
            };

            match role {
                EdgeRole::Capture => report.capture_terminated = terminated,
                EdgeRole::Player => report.player_terminated = terminated,
            }
        }

        report
    }

    /// Confirms no registered PID for `session_id` is still alive. Once
    /// confirmed, the bookkeeping entry `terminate` left behind is dropped —
    /// this is the only place the registration is actually purged.
    pub fn verify_clean(&self, session_id: &str) -> bool {
        let mut registered = self.registered.write();
        let Some(edge_pids) = registered.get(session_id) else {
            return true;
        };

        let system = sysinfo::System::new_all();
        let clean = edge_pids.as_map().values().all(|pid| !pid::pid_is_alive(*pid, &system));
        if clean {
            registered.remove(session_id);
        }
        clean
    }
}
