//! Machine description attached to report submissions.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineInfo {
    pub os: String,

    pub arch: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_cores_logical: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_cores_physical: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_ram_bytes: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
}

impl Default for MachineInfo {
    fn default() -> Self {
        MachineInfo {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            os_version: None,
            cpu_model: None,
            cpu_cores_logical: None,
            cpu_cores_physical: None,
            total_ram_bytes: None,
            hostname: None,
        }
    }
}

impl MachineInfo {
    /// Detect machine information from the current system
    pub fn detect() -> Self {
        use sysinfo::System;

        let mut sys = System::new_all();
        sys.refresh_all();

        MachineInfo {
            os: System::name().unwrap_or_else(|| std::env::consts::OS.to_string()),
            arch: std::env::consts::ARCH.to_string(),
            os_version: System::long_os_version(),
            cpu_model: sys.cpus().first().map(|c| c.brand().to_string()),
            cpu_cores_logical: Some(sys.cpus().len()),
            cpu_cores_physical: sys.physical_core_count(),
            total_ram_bytes: Some(sys.total_memory()),
            hostname: System::host_name(),
        }
    }
}
