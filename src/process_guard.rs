//! Lifecycle of processes spawned by demo steps
//!
//! Scripts and terminal commands run in their own process group and are
//! tracked in a global registry. When the presenter quits (Ctrl-C, SIGTERM,
//! SIGHUP, or the guard going out of scope) every tracked group gets SIGTERM,
//! then SIGKILL after a grace period.

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::collections::HashSet;
use std::io;
use std::process::{Child, Command, Output};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

static CHILD_REGISTRY: OnceLock<Arc<Mutex<ChildRegistry>>> = OnceLock::new();

/// Process group ids of running step processes
#[derive(Debug, Default)]
pub struct ChildRegistry {
    pids: HashSet<u32>,
    cleanup_initiated: bool,
}

impl ChildRegistry {
    pub fn global() -> Arc<Mutex<ChildRegistry>> {
        CHILD_REGISTRY
            .get_or_init(|| Arc::new(Mutex::new(ChildRegistry::default())))
            .clone()
    }

    pub fn register(&mut self, pid: u32) {
        self.pids.insert(pid);
        debug!("Tracking step process {}", pid);
    }

    pub fn unregister(&mut self, pid: u32) {
        self.pids.remove(&pid);
        debug!("Step process {} finished", pid);
    }

    pub fn count(&self) -> usize {
        self.pids.len()
    }

    /// SIGTERM every tracked group, SIGKILL whatever survives `grace_period`
    pub fn terminate_all(&mut self, grace_period: Duration) {
        if self.cleanup_initiated {
            return;
        }
        self.cleanup_initiated = true;
        if self.pids.is_empty() {
            return;
        }

        info!("Stopping {} step process(es)", self.pids.len());
        let pids: Vec<u32> = self.pids.drain().collect();
        for &pid in &pids {
            signal_group_or_process(pid, Signal::SIGTERM);
        }

        let start = Instant::now();
        while start.elapsed() < grace_period {
            if pids.iter().all(|&pid| !is_process_alive(pid)) {
                debug!("All step processes exited");
                return;
            }
            std::thread::sleep(Duration::from_millis(50));
        }

        for &pid in pids.iter().filter(|&&pid| is_process_alive(pid)) {
            warn!("Step process {} ignored SIGTERM, killing it", pid);
            signal_group_or_process(pid, Signal::SIGKILL);
        }
    }
}

/// Signal the process group led by `pid`, or the process alone if that fails
fn signal_group_or_process(pid: u32, sig: Signal) {
    let Ok(raw) = i32::try_from(pid) else {
        return;
    };
    if signal::kill(Pid::from_raw(-raw), sig).is_err() {
        if let Err(e) = signal::kill(Pid::from_raw(raw), sig) {
            debug!("Could not send {:?} to {}: {}", sig, pid, e);
        }
    }
}

/// Running and not a zombie
fn is_process_alive(pid: u32) -> bool {
    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    if signal::kill(Pid::from_raw(raw), None).is_err() {
        return false;
    }
    match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        // third field is the state letter
        Ok(stat) => !matches!(stat.split_whitespace().nth(2), Some("Z" | "X")),
        Err(_) => true,
    }
}

/// Terminates tracked step processes when dropped
pub struct ProcessGuard {
    registry: Arc<Mutex<ChildRegistry>>,
    grace_period: Duration,
}

impl ProcessGuard {
    pub fn new() -> Self {
        Self {
            registry: ChildRegistry::global(),
            grace_period: Duration::from_secs(3),
        }
    }

    pub fn child_count(&self) -> usize {
        self.registry.lock().map(|r| r.count()).unwrap_or(0)
    }
}

impl Default for ProcessGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProcessGuard {
    fn drop(&mut self) {
        if let Ok(mut registry) = self.registry.lock() {
            registry.terminate_all(self.grace_period);
        }
    }
}

/// Install SIGINT/SIGTERM/SIGHUP handlers that stop step processes and exit
pub fn init_signal_handlers() -> io::Result<()> {
    use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])?;
    std::thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            info!("Received signal {}, stopping step processes", sig);
            if let Ok(mut registry) = ChildRegistry::global().lock() {
                registry.terminate_all(Duration::from_secs(2));
            }
            std::process::exit(128 + sig);
        }
    });
    Ok(())
}

/// Run a command in a process group of its own
pub trait CommandProcessGroup {
    fn in_new_process_group(&mut self) -> &mut Self;
}

impl CommandProcessGroup for Command {
    fn in_new_process_group(&mut self) -> &mut Self {
        use std::os::unix::process::CommandExt;
        self.process_group(0)
    }
}

/// A spawned step process, registered until it is waited on
pub struct TrackedChild {
    child: Child,
    pid: u32,
}

impl TrackedChild {
    /// Spawn `cmd` in its own process group and track it
    pub fn spawn(cmd: &mut Command) -> io::Result<Self> {
        let child = cmd.in_new_process_group().spawn()?;
        let pid = child.id();
        if let Ok(mut registry) = ChildRegistry::global().lock() {
            registry.register(pid);
        }
        Ok(Self { child, pid })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn wait_with_output(self) -> io::Result<Output> {
        let pid = self.pid;
        let output = self.child.wait_with_output();
        if let Ok(mut registry) = ChildRegistry::global().lock() {
            registry.unregister(pid);
        }
        output
    }
}
