//! Starting processes at a [`PriorityClass`].

use std::process::{Child, Command};

use crate::platform::{FilesystemPlatform, Platform};
use crate::PriorityClass;

/// Set the scheduling priority of the process `pid`.
///
/// Lowering the priority of a process we own is always allowed, raising it above
/// [`PriorityClass::Normal`] generally requires elevated privileges.
pub fn set_priority(pid: u32, class: PriorityClass) -> Result<(), crate::Error> {
    tracing::debug!(pid, %class, "setting process priority");
    FilesystemPlatform::set_priority(pid, class)
}

/// Spawn `command` at the priority `class`.
///
/// With [`PriorityClass::Inherit`] the child keeps our priority.
pub fn spawn(command: &mut Command, class: PriorityClass) -> Result<Child, crate::Error> {
    tracing::debug!(program = ?command.get_program(), %class, "spawning process");

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;

        if let Some(nice) = class.nice_value() {
            // SAFETY: `setpriority` is a single syscall, it doesn't allocate or take locks.
            unsafe {
                command.pre_exec(move || {
                    if libc::setpriority(libc::PRIO_PROCESS, 0, nice) == -1 {
                        return Err(std::io::Error::last_os_error());
                    }
                    Ok(())
                });
            }
        }
        let child = command.spawn()?;
        Ok(child)
    }

    #[cfg(not(unix))]
    {
        let mut child = command.spawn()?;
        if let Err(err) = set_priority(child.id(), class) {
            let _ = child.kill();
            return Err(err);
        }
        Ok(child)
    }
}
