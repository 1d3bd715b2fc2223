// memory.rs
//! Cross-platform helpers to query process memory usage and total RAM.
//! Every probe returns `None` when the platform does not expose the figure.

use std::sync::OnceLock;

/// Physical memory installed in the machine.
#[derive(Debug, Clone, Copy)]
pub struct SystemMemory {
    pub total_ram: Option<u64>, // bytes
}

impl SystemMemory {
    pub fn detect() -> Self {
        static INSTANCE: OnceLock<SystemMemory> = OnceLock::new();
        *INSTANCE.get_or_init(|| Self {
            total_ram: total_ram_bytes(),
        })
    }
}

/// Memory held by the current process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessMemory {
    pub resident: u64, // bytes
    pub reserved: u64, // bytes
}

impl ProcessMemory {
    /// Sample the current process. Reads procfs on Linux, so keep it off
    /// the per-frame path.
    pub fn sample() -> Option<Self> {
        process_memory()
    }
}

/* -------------------------- Windows -------------------------- */

#[cfg(target_os = "windows")]
fn total_ram_bytes() -> Option<u64> {
    use windows_sys::Win32::System::Memory::{GlobalMemoryStatusEx, MEMORYSTATUSEX};
    unsafe {
        let mut st: MEMORYSTATUSEX = std::mem::zeroed();
        st.dwLength = std::mem::size_of::<MEMORYSTATUSEX>() as u32;
        if GlobalMemoryStatusEx(&mut st) != 0 { Some(st.ullTotalPhys) } else { None }
    }
}

#[cfg(target_os = "windows")]
fn process_memory() -> Option<ProcessMemory> {
    use windows_sys::Win32::System::ProcessStatus::{GetProcessMemoryInfo, PROCESS_MEMORY_COUNTERS};
    use windows_sys::Win32::System::Threading::GetCurrentProcess;
    unsafe {
        let mut counters: PROCESS_MEMORY_COUNTERS = std::mem::zeroed();
        let cb = std::mem::size_of::<PROCESS_MEMORY_COUNTERS>() as u32;
        counters.cb = cb;
        if GetProcessMemoryInfo(GetCurrentProcess(), &mut counters, cb) == 0 { return None; }
        Some(ProcessMemory {
            resident: counters.WorkingSetSize as u64,
            reserved: counters.PagefileUsage as u64,
        })
    }
}

/* --------------------- macOS / iOS (Darwin) --------------------- */

#[cfg(any(target_os = "macos", target_os = "ios"))]
fn sysctl_u64(name: &str) -> Option<u64> {
    use libc::{c_void, size_t, sysctlbyname};
    let cname = std::ffi::CString::new(name).ok()?;
    let mut val: u64 = 0;
    let mut len: size_t = std::mem::size_of::<u64>() as _;
    let rc = unsafe { sysctlbyname(cname.as_ptr(), &mut val as *mut _ as *mut c_void, &mut len, std::ptr::null_mut(), 0) };
    if rc == 0 && val != 0 { Some(val) } else { None }
}
#[cfg(any(target_os = "macos", target_os = "ios"))]
fn total_ram_bytes() -> Option<u64> { sysctl_u64("hw.memsize") }

#[cfg(any(target_os = "macos", target_os = "ios"))]
fn process_memory() -> Option<ProcessMemory> {
    // Darwin reports ru_maxrss in bytes; only the peak is exposed here.
    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::getrusage(libc::RUSAGE_SELF, &mut usage) };
    if rc != 0 || usage.ru_maxrss <= 0 { return None; }
    let peak = usage.ru_maxrss as u64;
    Some(ProcessMemory { resident: peak, reserved: peak })
}

/* --------------------- Linux / Android --------------------- */

/// Pull a `kB` field such as `VmRSS:   123 kB` out of a procfs text file.
#[cfg_attr(not(any(target_os = "linux", target_os = "android")), allow(dead_code))]
fn parse_kb_field(text: &str, key: &str) -> Option<u64> {
    for line in text.lines() {
        if let Some(rest) = line.strip_prefix(key) {
            let kb: u64 = rest.split_whitespace().next()?.parse().ok()?;
            return Some(kb * 1024);
        }
    }
    None
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn total_ram_bytes() -> Option<u64> {
    // /proc/meminfo: "MemTotal:  16367168 kB"
    let text = std::fs::read_to_string("/proc/meminfo").ok()?;
    parse_kb_field(&text, "MemTotal:")
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn process_memory() -> Option<ProcessMemory> {
    let text = std::fs::read_to_string("/proc/self/status").ok()?;
    Some(ProcessMemory {
        resident: parse_kb_field(&text, "VmRSS:")?,
        reserved: parse_kb_field(&text, "VmSize:")?,
    })
}

/* --------------------- Other / WASM / Fallbacks --------------------- */

#[cfg(not(any(
    target_os = "windows",
    target_os = "macos",
    target_os = "ios",
    target_os = "linux",
    target_os = "android"
)))]
fn total_ram_bytes() -> Option<u64> { None }
#[cfg(not(any(
    target_os = "windows",
    target_os = "macos",
    target_os = "ios",
    target_os = "linux",
    target_os = "android"
)))]
fn process_memory() -> Option<ProcessMemory> { None }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_procfs_fields() {
        let status = "Name:\tstress3d\nVmSize:\t  204800 kB\nVmRSS:\t   51200 kB\n";
        assert_eq!(parse_kb_field(status, "VmRSS:"), Some(51200 * 1024));
        assert_eq!(parse_kb_field(status, "VmSize:"), Some(204800 * 1024));
        assert_eq!(parse_kb_field(status, "VmSwap:"), None);
    }

    #[test]
    fn malformed_field_is_none() {
        assert_eq!(parse_kb_field("VmRSS:\tlots kB\n", "VmRSS:"), None);
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[test]
    fn samples_current_process() {
        let mem = ProcessMemory::sample().expect("procfs available");
        assert!(mem.resident > 0);
        assert!(mem.reserved >= mem.resident);
    }

    #[test]
    fn system_memory_is_cached() {
        let a = SystemMemory::detect();
        let b = SystemMemory::detect();
        assert_eq!(a.total_ram, b.total_ram);
    }
}
