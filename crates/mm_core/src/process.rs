//! Foreign-process tracking and privileged spawn.
//!
//! The overlay daemon and the LAN-broadcast helper are
//! launched elevated and can't be inherited as child handles. Instead of
//! each caller re-implementing its own process-table sweep, every
//! caller here goes through one reusable `ForeignProcess` adapter that
//! detects and controls a process by executable name via `sysinfo`.

use std::time::Duration;

use sysinfo::{Pid, System};

use crate::{err, pt};

/// A process tracked only by executable name, because it was spawned
/// elevated and we hold no child handle for it.
///
/// Exposes `poll` / `terminate` / `kill`, a thin object implemented on
/// top of PID-keyed OS calls. Never rely on an exit code from this:
/// "process gone by name" is the only termination signal available.
pub struct ForeignProcess {
    exe_name: String,
}

impl ForeignProcess {
    #[must_use]
    pub fn by_name(exe_name: impl Into<String>) -> Self {
        Self {
            exe_name: exe_name.into(),
        }
    }

    /// All PIDs currently running under this executable name.
    #[must_use]
    pub fn poll(&self) -> Vec<u32> {
        let mut sys = System::new();
        sys.refresh_processes(sysinfo::ProcessesToUpdate::All, true);
        sys.processes_by_name(self.exe_name.as_ref())
            .map(|p| p.pid().as_u32())
            .collect()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.poll().is_empty()
    }

    /// Politely asks every matching process to exit.
    ///
    /// Returns the number of processes signaled.
    pub fn terminate(&self) -> usize {
        let mut sys = System::new();
        sys.refresh_processes(sysinfo::ProcessesToUpdate::All, true);
        let mut n = 0;
        for process in sys.processes_by_name(self.exe_name.as_ref()) {
            if process.kill_with(sysinfo::Signal::Term).unwrap_or(true) {
                n += 1;
            }
        }
        n
    }

    /// Forcefully kills every matching process.
    ///
    /// Returns the number of processes signaled.
    pub fn kill(&self) -> usize {
        let mut sys = System::new();
        sys.refresh_processes(sysinfo::ProcessesToUpdate::All, true);
        let mut n = 0;
        for process in sys.processes_by_name(self.exe_name.as_ref()) {
            if process.kill() {
                n += 1;
            }
        }
        n
    }

    /// Terminate-then-kill sweep: ask nicely, wait `grace`, then kill
    /// whatever's left.
    pub async fn terminate_then_kill(&self, grace: Duration) -> usize {
        self.terminate();
        tokio::time::sleep(grace).await;
        let remaining = self.poll();
        if remaining.is_empty() {
            return 0;
        }
        pt!("{} processes survived termination, killing", remaining.len());
        self.kill()
    }

    /// As a last resort, shells out to a platform kill-by-name tool.
    /// Only attempted when already elevated; never silently escalates.
    pub async fn force_kill_via_os_tool(&self) -> bool {
        if !is_admin() {
            return false;
        }
        #[cfg(target_os = "windows")]
        {
            tokio::process::Command::new("taskkill")
                .args(["/f", "/im", &self.exe_name])
                .output()
                .await
                .is_ok_and(|o| o.status.success())
        }
        #[cfg(not(target_os = "windows"))]
        {
            tokio::process::Command::new("pkill")
                .args(["-f", &self.exe_name])
                .output()
                .await
                .is_ok_and(|o| o.status.success())
        }
    }
}

/// Whether the current process already has administrative/root rights.
#[must_use]
pub fn is_admin() -> bool {
    #[cfg(target_os = "windows")]
    {
        windows_is_admin().unwrap_or(false)
    }
    #[cfg(not(target_os = "windows"))]
    {
        // SAFETY: `geteuid` takes no arguments and never fails.
        unsafe { libc::geteuid() == 0 }
    }
}

#[cfg(target_os = "windows")]
fn windows_is_admin() -> Option<bool> {
    use windows::Win32::Foundation::HANDLE;
    use windows::Win32::Security::{
        GetTokenInformation, TokenElevation, TOKEN_ELEVATION, TOKEN_QUERY,
    };
    use windows::Win32::System::Threading::{GetCurrentProcess, OpenProcessToken};

    unsafe {
        let mut token = HANDLE::default();
        OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &mut token).ok()?;
        let mut elevation = TOKEN_ELEVATION::default();
        let mut size = 0u32;
        GetTokenInformation(
            token,
            TokenElevation,
            Some(std::ptr::from_mut(&mut elevation).cast()),
            std::mem::size_of::<TOKEN_ELEVATION>() as u32,
            &mut size,
        )
        .ok()?;
        Some(elevation.TokenIsElevated != 0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ElevationError {
    #[error("elevation was denied or cancelled by the user")]
    Denied,
    #[error("could not locate the spawned process by name after elevation")]
    ProcessNotFound,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Spawns `exe` elevated (administrator on Windows, `sudo` elsewhere)
/// with `args`, and returns the PID of the resulting process, found by
/// diffing the process table for `exe`'s filename before/after spawn.
///
/// Invokes the system shell-execute API with a `runAs` verb on Windows
/// (`sudo` elsewhere). Because the spawned process cannot be inherited
/// as a child handle, the caller locates it by executable name and
/// records its PID instead.
///
/// # Errors
/// If the user cancels the UAC/sudo prompt, or if no new matching
/// process appears within `settle_timeout`.
pub async fn spawn_elevated(
    exe: &std::path::Path,
    args: &[String],
    working_dir: Option<&std::path::Path>,
    settle_timeout: Duration,
) -> Result<u32, ElevationError> {
    let exe_name = exe
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let tracker = ForeignProcess::by_name(exe_name);
    let before: std::collections::HashSet<u32> = tracker.poll().into_iter().collect();

    #[cfg(target_os = "windows")]
    {
        windows_shell_execute_runas(exe, args, working_dir)?;
    }
    #[cfg(not(target_os = "windows"))]
    {
        let mut cmd = tokio::process::Command::new("sudo");
        cmd.arg(exe).args(args);
        if let Some(dir) = working_dir {
            cmd.current_dir(dir);
        }
        let status = cmd.status().await?;
        if !status.success() {
            return Err(ElevationError::Denied);
        }
    }

    wait_for_new_pid(&tracker, &before, settle_timeout)
        .await
        .ok_or(ElevationError::ProcessNotFound)
}

async fn wait_for_new_pid(
    tracker: &ForeignProcess,
    before: &std::collections::HashSet<u32>,
    timeout: Duration,
) -> Option<u32> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        for pid in tracker.poll() {
            if !before.contains(&pid) {
                return Some(pid);
            }
        }
        if tokio::time::Instant::now() >= deadline {
            return None;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}

#[cfg(target_os = "windows")]
fn windows_shell_execute_runas(
    exe: &std::path::Path,
    args: &[String],
    working_dir: Option<&std::path::Path>,
) -> Result<(), ElevationError> {
    use windows::core::HSTRING;
    use windows::Win32::UI::Shell::ShellExecuteW;
    use windows::Win32::UI::WindowsAndMessaging::SW_HIDE;

    let verb = HSTRING::from("runas");
    let file = HSTRING::from(exe.as_os_str());
    let params = HSTRING::from(args.join(" "));
    let dir = working_dir.map(|d| HSTRING::from(d.as_os_str()));

    // SAFETY: all string arguments are kept alive for the duration of
    // the call via the locals above.
    let result = unsafe {
        ShellExecuteW(
            None,
            &verb,
            &file,
            &params,
            dir.as_ref().map_or(&HSTRING::new(), |d| d),
            SW_HIDE,
        )
    };

    // Per the Windows docs, a return value > 32 indicates success.
    if (result.0 as isize) > 32 {
        Ok(())
    } else {
        err!("ShellExecuteW runas failed with code {}", result.0 as isize);
        Err(ElevationError::Denied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_process_name_polls_empty() {
        let p = ForeignProcess::by_name("definitely-not-a-real-process.exe");
        assert!(p.poll().is_empty());
        assert!(!p.is_running());
    }
}
