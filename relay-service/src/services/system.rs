//! Process resource sampling for the health endpoint.

use serde::Serialize;

/// Memory figures in bytes; fields are absent where the platform does not
/// expose them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryUsage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resident_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virtual_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_resident_bytes: Option<u64>,
}

/// Sample the current process. Never fails; unknown figures stay `None`.
pub fn memory_usage() -> MemoryUsage {
    #[cfg(target_os = "linux")]
    {
        match std::fs::read_to_string("/proc/self/status") {
            Ok(status) => parse_proc_status(&status),
            Err(e) => {
                tracing::debug!(error = %e, "Could not read /proc/self/status");
                MemoryUsage::default()
            }
        }
    }

    #[cfg(not(target_os = "linux"))]
    {
        MemoryUsage::default()
    }
}

/// Parse the `Vm*` lines of `/proc/<pid>/status`, which report kB.
pub(crate) fn parse_proc_status(status: &str) -> MemoryUsage {
    let mut usage = MemoryUsage::default();

    for line in status.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let bytes = value
            .trim()
            .trim_end_matches("kB")
            .trim()
            .parse::<u64>()
            .ok()
            .map(|kb| kb * 1024);

        match key {
            "VmRSS" => usage.resident_bytes = bytes,
            "VmSize" => usage.virtual_bytes = bytes,
            "VmHWM" => usage.peak_resident_bytes = bytes,
            _ => {}
        }
    }

    usage
}
