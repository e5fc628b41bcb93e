// Process reaper implementation
// reason: sysinfo for cross-platform process table access, nix for signals
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use sysinfo::{Pid, ProcessRefreshKind, ProcessStatus, System, UpdateKind};
use tokio::process::Command;
use tracing::{debug, info, warn};

use trainlaunch_core::application::constants::{REAP_POLL_INTERVAL, TERM_GRACE_PERIOD_MS};
use trainlaunch_core::domain::KillSignal;
use trainlaunch_core::port::{ProcessReaper, ReapError, TimeProvider};

/// Process reaper backed by the live process table
///
/// Matches `pkill -f` semantics: the pattern is searched for in the full,
/// space-joined command line of every process.
pub struct SystemProcessReaper {
    system: Arc<Mutex<System>>,
    time_provider: Arc<dyn TimeProvider>,
}

impl SystemProcessReaper {
    pub fn new(time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            system: Arc::new(Mutex::new(System::new())),
            time_provider,
        }
    }

    /// Pids whose command line contains `pattern`, excluding ourselves and our parent
    fn find_matching(&self, pattern: &str) -> Vec<Pid> {
        let own = sysinfo::get_current_pid().ok();
        let mut sys = self.system.lock().unwrap_or_else(|e| e.into_inner());
        // A bare refresh leaves cmd() empty
        sys.refresh_processes_specifics(
            ProcessRefreshKind::new().with_cmd(UpdateKind::OnlyIfNotSet),
        );

        let parent = own.and_then(|pid| sys.process(pid)).and_then(|p| p.parent());

        sys.processes()
            .iter()
            .filter(|(pid, _)| Some(**pid) != own && Some(**pid) != parent)
            .filter(|(_, process)| process.status() != ProcessStatus::Zombie)
            .filter(|(_, process)| {
                let cmd = process.cmd();
                // Unreadable cmdline (kernel threads, other users on hardened hosts)
                if cmd.is_empty() {
                    process.name().contains(pattern)
                } else {
                    cmd.join(" ").contains(pattern)
                }
            })
            .map(|(pid, _)| *pid)
            .collect()
    }

    /// A pid counts as gone once it is absent or a zombie
    ///
    /// Refreshes only this pid, not the whole table.
    fn is_alive(&self, pid: Pid) -> bool {
        let mut sys = self.system.lock().unwrap_or_else(|e| e.into_inner());
        if !sys.refresh_process_specifics(pid, ProcessRefreshKind::new()) {
            return false;
        }
        sys.process(pid)
            .map(|p| p.status() != ProcessStatus::Zombie)
            .unwrap_or(false)
    }

    #[cfg(unix)]
    fn send_signal(&self, pid: Pid, signal: KillSignal) -> Result<bool, ReapError> {
        use nix::errno::Errno;
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid as NixPid;

        let sig = match signal {
            KillSignal::Term => Signal::SIGTERM,
            KillSignal::Kill => Signal::SIGKILL,
        };

        match kill(NixPid::from_raw(pid.as_u32() as i32), sig) {
            Ok(()) => Ok(true),
            // Exited between scan and signal
            Err(Errno::ESRCH) => Ok(false),
            Err(e) => Err(ReapError::Signal(format!("{} to {}: {}", signal, pid, e))),
        }
    }

    #[cfg(not(unix))]
    fn send_signal(&self, pid: Pid, signal: KillSignal) -> Result<bool, ReapError> {
        let sys = self.system.lock().unwrap_or_else(|e| e.into_inner());
        let sig = match signal {
            KillSignal::Term => sysinfo::Signal::Term,
            KillSignal::Kill => sysinfo::Signal::Kill,
        };
        match sys.process(pid) {
            Some(process) => match process.kill_with(sig) {
                Some(true) => Ok(true),
                Some(false) => Err(ReapError::Signal(format!("{} to {} refused", signal, pid))),
                None => Ok(process.kill()),
            },
            None => Ok(false),
        }
    }

    /// Wait for SIGTERMed processes, then SIGKILL the survivors
    async fn escalate(&self, mut pending: Vec<Pid>) {
        let start_time = self.time_provider.now_millis();

        loop {
            tokio::time::sleep(REAP_POLL_INTERVAL).await;
            pending.retain(|pid| self.is_alive(*pid));

            if pending.is_empty() {
                info!("All signalled processes exited after SIGTERM");
                return;
            }

            if self.time_provider.now_millis() - start_time > TERM_GRACE_PERIOD_MS {
                for pid in pending {
                    warn!(pid = %pid, "Process did not exit after SIGTERM, sending SIGKILL");
                    if let Err(e) = self.send_signal(pid, KillSignal::Kill) {
                        warn!(pid = %pid, error = %e, "SIGKILL failed");
                    }
                }
                return;
            }
        }
    }
}

#[async_trait]
impl ProcessReaper for SystemProcessReaper {
    async fn run_stop_command(&self, argv: &[String]) -> Result<(), ReapError> {
        let (program, args) = argv.split_first().ok_or(ReapError::EmptyCommand)?;

        info!(command = ?argv, "Running stop command");

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ReapError::CommandSpawn(format!("{}: {}", program, e)))?;

        debug!(
            command = ?argv,
            stdout = %String::from_utf8_lossy(&output.stdout),
            stderr = %String::from_utf8_lossy(&output.stderr),
            "Stop command output"
        );

        if output.status.success() {
            Ok(())
        } else {
            Err(ReapError::CommandFailed(output.status.code()))
        }
    }

    async fn terminate_matching(
        &self,
        pattern: &str,
        signal: KillSignal,
    ) -> Result<usize, ReapError> {
        if pattern.is_empty() {
            warn!("Empty kill pattern would match every process, skipping");
            return Ok(0);
        }

        let candidates = self.find_matching(pattern);
        let mut signalled = Vec::with_capacity(candidates.len());

        for pid in candidates {
            match self.send_signal(pid, signal) {
                Ok(true) => {
                    info!(pid = %pid, signal = %signal, "Signalled stale process");
                    signalled.push(pid);
                }
                Ok(false) => debug!(pid = %pid, "Process already gone"),
                // Best effort: e.g. EPERM on another user's process
                Err(e) => warn!(pid = %pid, error = %e, "Could not signal process"),
            }
        }

        let count = signalled.len();
        if signal == KillSignal::Term && !signalled.is_empty() {
            self.escalate(signalled).await;
        }

        info!(pattern = %pattern, signalled = count, "Process cleanup completed");
        Ok(count)
    }
}
