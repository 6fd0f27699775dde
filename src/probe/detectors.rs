//! Detector strategies for the probe battery.
//!
//! Each metric has an explicit, ordered list of [`Strategy`] entries. The
//! battery folds over the list: the first command that both executes cleanly
//! and parses wins; when the list is exhausted the metric's hard-coded
//! default is used instead of failing the probe.

use thiserror::Error;

/// A remote command that could not be executed (transport error, or stderr
/// carrying a command-not-found message).
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct CommandError(pub String);

/// Executes one command on an already-open session and returns trimmed
/// stdout. Implemented by the SSH session; tests substitute scripted fakes.
pub trait CommandRunner {
    fn run(&mut self, command: &str) -> Result<String, CommandError>;
}

/// One detection attempt: a command plus the parser for its output.
pub struct Strategy<T> {
    pub command: &'static str,
    pub parse: fn(&str) -> Option<T>,
}

/// Folds over the strategies in order, returning the first parsed value, or
/// `default` once every strategy has failed.
pub fn detect<T, R>(runner: &mut R, strategies: &[Strategy<T>], default: T) -> T
where
    R: CommandRunner + ?Sized,
{
    for strategy in strategies {
        if let Ok(output) = runner.run(strategy.command) {
            if let Some(value) = (strategy.parse)(&output) {
                return value;
            }
        }
    }
    default
}

pub const CPU_CORES: &[Strategy<i32>] = &[
    Strategy {
        command: "nproc",
        parse: parse_core_count,
    },
    Strategy {
        command: "grep -c ^processor /proc/cpuinfo",
        parse: parse_core_count,
    },
];

pub const MEMORY_GB: &[Strategy<f64>] = &[
    Strategy {
        command: "grep MemTotal /proc/meminfo | awk '{print $2}'",
        parse: parse_meminfo_kb_to_gb,
    },
    Strategy {
        command: "free -g | grep Mem | awk '{print $2}'",
        parse: parse_float,
    },
];

pub const DISK_GB: &[Strategy<f64>] = &[Strategy {
    command: "df -BG / | tail -1 | awk '{print $2}' | sed 's/G//'",
    parse: parse_float,
}];

fn parse_core_count(output: &str) -> Option<i32> {
    output.trim().parse::<i32>().ok().filter(|count| *count >= 1)
}

/// `/proc/meminfo` reports kilobytes; convert to GB and round to 2 decimals.
fn parse_meminfo_kb_to_gb(output: &str) -> Option<f64> {
    let kb = output.trim().parse::<u64>().ok()?;
    let gb = kb as f64 / (1024.0 * 1024.0);
    Some((gb * 100.0).round() / 100.0)
}

fn parse_float(output: &str) -> Option<f64> {
    output.trim().parse::<f64>().ok()
}

/// OS type, version and kernel release of a probed host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsIdentity {
    pub os_type: String,
    pub os_version: String,
    pub kernel_version: String,
}

impl OsIdentity {
    fn unknown() -> Self {
        OsIdentity {
            os_type: "Unknown".to_string(),
            os_version: "Unknown".to_string(),
            kernel_version: "Unknown".to_string(),
        }
    }
}

/// Detects OS identity: `/etc/os-release` plus `uname -r` preferred, a single
/// `uname -a` as the degraded path, all-Unknown as the last resort.
pub fn detect_os_identity<R>(runner: &mut R) -> OsIdentity
where
    R: CommandRunner + ?Sized,
{
    let release = runner.run("cat /etc/os-release");
    if let Ok(release) = release {
        if let Ok(kernel) = runner.run("uname -r") {
            let (os_type, os_version) = parse_os_release(&release);
            return OsIdentity {
                os_type,
                os_version,
                kernel_version: kernel,
            };
        }
    }

    match runner.run("uname -a") {
        Ok(uname) => parse_uname(&uname),
        Err(_) => OsIdentity::unknown(),
    }
}

/// Extracts NAME and VERSION from an os-release document, stripping any
/// surrounding quotes. Missing fields keep their generic defaults.
pub fn parse_os_release(output: &str) -> (String, String) {
    let mut os_type = "Linux".to_string();
    let mut os_version = "Unknown".to_string();

    for line in output.lines() {
        if let Some(value) = line.strip_prefix("NAME=") {
            os_type = value.trim().trim_matches('"').to_string();
        } else if let Some(value) = line.strip_prefix("VERSION=") {
            os_version = value.trim().trim_matches('"').to_string();
        }
    }
    (os_type, os_version)
}

/// Degraded OS identity from `uname -a`: the third whitespace-separated token
/// is the kernel release.
pub fn parse_uname(output: &str) -> OsIdentity {
    let os_type = if output.contains("Linux") {
        "Linux"
    } else {
        "Unix"
    };
    let kernel_version = output
        .split_whitespace()
        .nth(2)
        .unwrap_or("Unknown")
        .to_string();

    OsIdentity {
        os_type: os_type.to_string(),
        os_version: "Unknown".to_string(),
        kernel_version,
    }
}
