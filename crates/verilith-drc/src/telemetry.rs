//! Best-effort process-memory telemetry for run logging.
//!
//! Reads the Linux procfs counters when available and degrades to silence
//! elsewhere; a failed read never affects a run.

use std::fs;

/// Current VmSize in kB, if the platform exposes it.
pub fn memory_usage_kb() -> Option<u64> {
    let status = fs::read_to_string("/proc/self/status").ok()?;
    parse_kb_line(&status, "VmSize:")
}

/// MemAvailable in kB, if the platform exposes it.
pub fn available_memory_kb() -> Option<u64> {
    let meminfo = fs::read_to_string("/proc/meminfo").ok()?;
    parse_kb_line(&meminfo, "MemAvailable:")
}

fn parse_kb_line(text: &str, prefix: &str) -> Option<u64> {
    text.lines()
        .find(|l| l.starts_with(prefix))?
        .split_whitespace()
        .nth(1)?
        .parse()
        .ok()
}

/// Suffix appended to per-rule log lines, e.g. " (VmSize 123456 kB)".
pub(crate) fn mem_log_suffix() -> String {
    match memory_usage_kb() {
        Some(kb) => format!(" (VmSize {kb} kB)"),
        None => String::new(),
    }
}

/// Warn when available memory drops under `threshold_kb`. The mitigation
/// for a large run is tiled or deep mode, not anything the engine can do
/// mid-rule.
pub(crate) fn warn_if_low_memory(threshold_kb: u64) {
    if let Some(avail) = available_memory_kb() {
        if avail < threshold_kb {
            log::warn!(
                "available memory low ({avail} kB); consider tiled or deep run mode"
            );
        }
    }
}
