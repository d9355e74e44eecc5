//! Best-effort CPU affinity pinning.
//!
//! Pinning the benchmarking thread to one logical CPU reduces scheduler-induced noise in the
//! measurements. It is never required: failures are reported to the caller, which only logs them.

use thiserror::Error;
use tracing::{info, warn};

/// Errors raised when pinning the current thread.
#[derive(Debug, Error)]
pub enum AffinityError {
    #[error("core pinning is not supported on this platform")]
    Unsupported,
    #[error("core {0} is out of range")]
    InvalidCore(usize),
    #[error("failed to set thread affinity: {0}")]
    Os(#[from] std::io::Error),
}

/// Pins the current thread to logical CPU `core_id`.
#[cfg(target_os = "linux")]
pub fn pin_to_core(core_id: usize) -> Result<(), AffinityError> {
    use std::mem::{size_of, zeroed};

    if core_id >= libc::CPU_SETSIZE as usize {
        return Err(AffinityError::InvalidCore(core_id));
    }

    // SAFETY: `cpu_set_t` is a plain bit mask and `core_id` was checked against its capacity.
    let rc = unsafe {
        let mut set: libc::cpu_set_t = zeroed();
        libc::CPU_ZERO(&mut set);
        libc::CPU_SET(core_id, &mut set);
        libc::sched_setaffinity(0, size_of::<libc::cpu_set_t>(), &set)
    };
    if rc == -1 {
        return Err(std::io::Error::last_os_error().into());
    }
    Ok(())
}

/// Pins the current thread to logical CPU `core_id`.
#[cfg(windows)]
pub fn pin_to_core(core_id: usize) -> Result<(), AffinityError> {
    use winapi::um::{processthreadsapi::GetCurrentThread, winbase::SetThreadAffinityMask};

    if core_id >= usize::BITS as usize {
        return Err(AffinityError::InvalidCore(core_id));
    }

    let mask = 1_usize << core_id;
    // SAFETY: `GetCurrentThread` returns a pseudo handle that is always valid for the caller.
    if unsafe { SetThreadAffinityMask(GetCurrentThread(), mask) } == 0 {
        return Err(std::io::Error::last_os_error().into());
    }
    Ok(())
}

/// Pins the current thread to logical CPU `core_id`.
#[cfg(not(any(target_os = "linux", windows)))]
pub fn pin_to_core(_core_id: usize) -> Result<(), AffinityError> {
    Err(AffinityError::Unsupported)
}

/// Pins the current thread to `core` if requested, logging the outcome.
///
/// Returns `true` if the thread was pinned.
pub fn pin_current_thread(core: Option<usize>) -> bool {
    let Some(core_id) = core else {
        info!("core pinning disabled");
        return false;
    };

    match pin_to_core(core_id) {
        Ok(()) => {
            info!(core = core_id, "pinned to core");
            true
        }
        Err(err) => {
            warn!(core = core_id, %err, "failed to pin to core");
            false
        }
    }
}
