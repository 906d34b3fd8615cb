//! Platform utility plumbing.
//!
//! The driver has no native serial binding. Line discipline is configured
//! with `stty`, and raw I/O goes through a relay child process whose
//! stdin/stdout are attached to the device node. Lock checks are advisory
//! heuristics only: a lock-file convention on Linux, a speculative open
//! elsewhere. None of this guarantees mutual exclusion across processes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::process::{Child, Command};
use tracing::debug;

use crate::config::{Parity, PortSettings};
use crate::error::{PortError, Result};

/// Build the `stty` invocation for a device, or `None` when the platform
/// has no supported utility.
pub fn configure_command(path: &Path, settings: &PortSettings) -> Option<Command> {
    let device_flag = if cfg!(target_os = "linux") {
        "-F"
    } else if cfg!(unix) {
        "-f"
    } else {
        return None;
    };

    let mut cmd = Command::new("stty");
    cmd.arg(device_flag)
        .arg(path)
        .arg("raw")
        .arg("-echo")
        .arg(settings.baud.to_string())
        .arg(format!("cs{}", settings.data_bits))
        .arg(if settings.stop_bits >= 2 {
            "cstopb"
        } else {
            "-cstopb"
        });
    match settings.parity {
        Parity::None => {
            cmd.arg("-parenb");
        }
        Parity::Even => {
            cmd.args(["parenb", "-parodd"]);
        }
        Parity::Odd => {
            cmd.args(["parenb", "parodd"]);
        }
    }
    Some(cmd)
}

/// Build the long-running relay process for a device.
///
/// A background `cat` streams the device to stdout; the exec'd foreground
/// `cat` relays stdin into the device. One child, duplex over its standard
/// pipes. The child is placed in its own process group so the background
/// half can be signaled together with the foreground half.
pub fn relay_command(path: &Path) -> Option<Command> {
    #[cfg(unix)]
    {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(r#"cat -- "$0" & exec cat > "$0""#)
            .arg(path);
        unsafe {
            cmd.pre_exec(|| {
                libc::setpgid(0, 0);
                Ok(())
            });
        }
        Some(cmd)
    }
    #[cfg(not(unix))]
    {
        let _ = path;
        None
    }
}

/// UUCP-style lock file path for a device, on platforms that use one.
fn lock_path(device: &Path) -> Option<PathBuf> {
    if !cfg!(target_os = "linux") {
        return None;
    }
    let name = device.file_name()?.to_str()?;
    Some(PathBuf::from(format!("/var/lock/LCK..{name}")))
}

/// Best-effort check that no other live process holds the device.
pub fn check_lock(device: &Path) -> Result<()> {
    if let Some(lock) = lock_path(device) {
        if let Ok(contents) = std::fs::read_to_string(&lock) {
            if let Ok(pid) = contents.trim().parse::<i32>() {
                if pid != std::process::id() as i32 && process_alive(pid) {
                    return Err(PortError::Locked {
                        path: device.to_path_buf(),
                    });
                }
            }
            debug!(?lock, "clearing stale lock file");
            let _ = std::fs::remove_file(&lock);
        }
        return Ok(());
    }
    speculative_open(device)
}

/// Record our claim on the device. Failures are ignored; the lock is an
/// advisory artifact, not a correctness mechanism.
pub fn claim_lock(device: &Path) {
    if let Some(lock) = lock_path(device) {
        if let Err(err) = std::fs::write(&lock, format!("{}\n", std::process::id())) {
            debug!(?lock, %err, "could not write lock file");
        }
    }
}

/// Remove our lock artifact if it is still ours.
pub fn release_lock(device: &Path) {
    if let Some(lock) = lock_path(device) {
        let ours = std::fs::read_to_string(&lock)
            .ok()
            .and_then(|s| s.trim().parse::<u32>().ok())
            == Some(std::process::id());
        if ours {
            let _ = std::fs::remove_file(&lock);
        }
    }
}

#[cfg(unix)]
fn process_alive(pid: i32) -> bool {
    // SAFETY: signal 0 performs existence/permission checks only.
    unsafe { libc::kill(pid, 0) == 0 }
}

#[cfg(not(unix))]
fn process_alive(_pid: i32) -> bool {
    false
}

#[cfg(unix)]
fn speculative_open(device: &Path) -> Result<()> {
    match std::fs::OpenOptions::new().read(true).open(device) {
        Err(err) if err.raw_os_error() == Some(libc::EBUSY) => Err(PortError::Busy {
            path: device.to_path_buf(),
        }),
        // Other failures get a proper diagnosis from the open path itself.
        _ => Ok(()),
    }
}

#[cfg(not(unix))]
fn speculative_open(_device: &Path) -> Result<()> {
    Ok(())
}

/// Terminate the relay: SIGTERM to its process group, then SIGKILL after
/// the grace period. Always reaps the child.
pub async fn terminate(child: &mut Child, grace: Duration) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        // SAFETY: negative pid signals the process group created at spawn.
        unsafe { libc::kill(-(pid as i32), libc::SIGTERM) };
    }
    if tokio::time::timeout(grace, child.wait()).await.is_err() {
        #[cfg(unix)]
        if let Some(pid) = child.id() {
            // SAFETY: as above, forceful this time.
            unsafe { libc::kill(-(pid as i32), libc::SIGKILL) };
        }
        let _ = child.kill().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(unix)]
    fn configure_command_reflects_settings() {
        let settings = PortSettings::default();
        let cmd = configure_command(Path::new("/dev/ttyUSB0"), &settings).unwrap();
        let args: Vec<String> = cmd
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert!(args.contains(&"9600".to_string()));
        assert!(args.contains(&"cs8".to_string()));
        assert!(args.contains(&"-cstopb".to_string()));
        assert!(args.contains(&"-parenb".to_string()));
        assert!(args.contains(&"raw".to_string()));
    }

    #[test]
    #[cfg(unix)]
    fn relay_command_targets_the_device() {
        let cmd = relay_command(Path::new("/dev/ttyUSB0")).unwrap();
        let args: Vec<String> = cmd
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(args.last().map(String::as_str), Some("/dev/ttyUSB0"));
    }

    #[test]
    fn check_lock_passes_for_unlocked_paths() {
        // No lock artifact exists for a freshly made temp file.
        let dir = std::env::temp_dir().join(format!("thermolink-lock-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let device = dir.join("fakeport");
        std::fs::write(&device, b"").unwrap();
        assert!(check_lock(&device).is_ok());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
