use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant};
use sysinfo::{System, SystemExt};

/// Cached available/total RAM ratio, refreshed at most every `REFRESH_EVERY`.
struct MemProbe {
    sys: System,
    checked_at: Instant,
    frac: f64,
}

static PROBE: OnceLock<Mutex<MemProbe>> = OnceLock::new();
const REFRESH_EVERY: Duration = Duration::from_millis(500);
const BACKOFF: Duration = Duration::from_millis(25);

/// Recent estimate of available memory fraction (0.0..1.0).
pub fn available_memory_fraction() -> f64 {
    let probe = PROBE.get_or_init(|| {
        let mut sys = System::new();
        sys.refresh_memory();
        Mutex::new(MemProbe { sys, checked_at: Instant::now() - REFRESH_EVERY * 2, frac: 1.0 })
    });
    let mut p = probe.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let now = Instant::now();
    if now.duration_since(p.checked_at) >= REFRESH_EVERY {
        p.sys.refresh_memory();
        let total = p.sys.total_memory() as f64;
        let avail = p.sys.available_memory() as f64;
        p.frac = if total > 0.0 { (avail / total).clamp(0.0, 1.0) } else { 1.0 };
        p.checked_at = now;
    }
    p.frac
}

/// Sleep briefly when available memory is under `threshold` (e.g. 0.10).
/// The decoder calls this between chunks so a 128 MiB read never piles onto a starved host.
pub fn maybe_throttle_low_memory(threshold: f64) {
    if available_memory_fraction() < threshold {
        tracing::debug!(threshold, "low memory, backing off");
        std::thread::sleep(BACKOFF);
    }
}
