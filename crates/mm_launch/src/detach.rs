//! Detached process spawning.
//!
//! The game and loader are meant to keep running after `modmesh` itself
//! exits, so the child must not inherit our console or be tied to our
//! process group. Shells out via `tokio::process::Command`, the same
//! way `mm_core::process`'s elevation helper does, rather than the
//! synchronous `std::process` API used elsewhere for short-lived jobs.

use std::path::Path;

#[cfg(windows)]
const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
#[cfg(windows)]
const DETACHED_PROCESS: u32 = 0x0000_0008;

/// Spawns `exe args...` with `working_dir` as its current directory,
/// detached from this process's console/session, and returns
/// immediately without waiting on it.
///
/// # Errors
/// If the OS refuses to spawn the process.
pub fn spawn_detached(exe: &Path, args: &[String], working_dir: &Path) -> std::io::Result<u32> {
    let mut cmd = std::process::Command::new(exe);
    cmd.args(args)
        .current_dir(working_dir)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null());

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        cmd.creation_flags(CREATE_NEW_PROCESS_GROUP | DETACHED_PROCESS);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        unsafe {
            cmd.pre_exec(|| {
                // Detach into our own session so the launcher's own
                // SIGHUP/SIGINT doesn't reach the game.
                if libc::setsid() == -1 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }
    }

    let child = cmd.spawn()?;
    Ok(child.id())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(unix)]
    fn spawns_and_returns_a_pid() {
        let pid = spawn_detached(Path::new("/bin/true"), &[], Path::new("/")).unwrap();
        assert!(pid > 0);
    }
}
