use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use sysinfo::{Pid, System};

use crate::results::ResourceSnapshot;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// An open measurement window.
struct Window {
    started_at: DateTime<Utc>,
    started: Instant,
    cpu_start: Option<Duration>,
    memory_start_mb: f64,
}

// ---------------------------------------------------------------------------
// ResourceSampler
// ---------------------------------------------------------------------------

/// Measures the current process's CPU time and resident memory over a
/// window opened by [`start`](Self::start) and closed by [`stop`](Self::stop).
///
/// OS query failures never surface: an unavailable reading contributes 0.
pub struct ResourceSampler {
    system: System,
    pid: Option<Pid>,
    window: Option<Window>,
    last: Option<ResourceSnapshot>,
}

impl ResourceSampler {
    pub fn new() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                tracing::warn!(error = e, "cannot resolve current pid, memory will read as 0");
                None
            }
        };
        Self {
            system: System::new(),
            pid,
            window: None,
            last: None,
        }
    }

    /// Open a window. Does nothing if one is already open.
    pub fn start(&mut self) {
        if self.window.is_some() {
            tracing::debug!("sampler window already open, keeping it");
            return;
        }
        let memory_start_mb = self.resident_memory_mb();
        self.window = Some(Window {
            started_at: Utc::now(),
            started: Instant::now(),
            cpu_start: process_cpu_time(),
            memory_start_mb,
        });
        tracing::info!(memory_mb = memory_start_mb, "resource sampling started");
    }

    /// Close the open window and freeze its snapshot. Without an open window
    /// the last snapshot (or a zeroed one) is returned unchanged.
    pub fn stop(&mut self) -> ResourceSnapshot {
        let Some(window) = self.window.take() else {
            return self.snapshot();
        };

        let elapsed = window.started.elapsed();
        let duration_seconds = elapsed.as_secs_f64();
        let memory_end_mb = self.resident_memory_mb();

        let cpu_time_percent = match (window.cpu_start, process_cpu_time()) {
            (Some(start), Some(end)) if duration_seconds > 0.0 => {
                end.saturating_sub(start).as_secs_f64() / duration_seconds * 100.0
            }
            _ => 0.0,
        };

        let snapshot = ResourceSnapshot {
            started_at: Some(window.started_at),
            stopped_at: Some(Utc::now()),
            duration_seconds,
            cpu_time_percent,
            memory_start_mb: window.memory_start_mb,
            memory_end_mb,
            memory_increase_mb: memory_end_mb - window.memory_start_mb,
        };
        tracing::info!(
            duration_s = duration_seconds,
            cpu_percent = cpu_time_percent,
            memory_increase_mb = snapshot.memory_increase_mb,
            "resource sampling stopped"
        );
        self.last = Some(snapshot.clone());
        snapshot
    }

    pub fn is_open(&self) -> bool {
        self.window.is_some()
    }

    /// The last frozen snapshot, or a zeroed one.
    pub fn snapshot(&self) -> ResourceSnapshot {
        self.last.clone().unwrap_or_default()
    }

    fn resident_memory_mb(&mut self) -> f64 {
        let Some(pid) = self.pid else {
            return 0.0;
        };
        if !self.system.refresh_process(pid) {
            return 0.0;
        }
        self.system
            .process(pid)
            .map(|p| p.memory() as f64 / BYTES_PER_MB)
            .unwrap_or(0.0)
    }
}

impl Default for ResourceSampler {
    fn default() -> Self {
        Self::new()
    }
}

/// User plus system CPU time consumed by this process so far.
#[cfg(unix)]
fn process_cpu_time() -> Option<Duration> {
    let mut usage = std::mem::MaybeUninit::<libc::rusage>::zeroed();
    // SAFETY: usage points to writable memory sized for a rusage struct
    let rc = unsafe { libc::getrusage(libc::RUSAGE_SELF, usage.as_mut_ptr()) };
    if rc != 0 {
        return None;
    }
    // SAFETY: getrusage returned 0, so the struct is initialized
    let usage = unsafe { usage.assume_init() };
    Some(timeval_to_duration(usage.ru_utime) + timeval_to_duration(usage.ru_stime))
}

#[cfg(unix)]
fn timeval_to_duration(tv: libc::timeval) -> Duration {
    Duration::from_secs(tv.tv_sec.max(0) as u64) + Duration::from_micros(tv.tv_usec.max(0) as u64)
}

#[cfg(not(unix))]
fn process_cpu_time() -> Option<Duration> {
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
