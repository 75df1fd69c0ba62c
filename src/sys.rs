use rustix::{ io::Errno, process::{ sched_getaffinity, sched_setaffinity, CpuSet, Pid } };

use crate::{ error::{ Error, Result }, mask::CoreMask };

/// `None` and `Some(0)` both address the calling thread.
fn to_pid(pid: Option<u32>) -> Result<Option<Pid>> {
    let raw = pid.unwrap_or(0);
    match i32::try_from(raw) {
        Ok(raw) => Ok(Pid::from_raw(raw)),
        Err(_) => Err(Error::PermissionOrNotFound { pid: raw, source: Errno::SRCH }),
    }
}

/// Read the affinity mask of `pid` (the calling thread if `None`).
pub fn get_affinity(pid: Option<u32>) -> Result<CoreMask> {
    let set = sched_getaffinity(to_pid(pid)?).map_err(|source| Error::PermissionOrNotFound {
        pid: pid.unwrap_or(0),
        source,
    })?;
    Ok(CoreMask::from_cpu_set(&set, CpuSet::MAX_CPU))
}

/// Cores `pid` may run on, in ascending order.
pub fn allocated_cores(pid: Option<u32>) -> Result<Vec<usize>> {
    let cores = get_affinity(pid)?.to_vec();
    log::trace!("allocated cores of {}: {:?}", pid.unwrap_or(0), cores);
    Ok(cores)
}

/// Restrict `pid` to the cores of `mask`.
pub fn set_affinity(pid: Option<u32>, mask: &CoreMask) -> Result<()> {
    let set = mask.to_cpu_set()?;
    sched_setaffinity(to_pid(pid)?, &set).map_err(|source| Error::PermissionOrNotFound {
        pid: pid.unwrap_or(0),
        source,
    })
}

pub fn pin_current_thread(core: usize) -> Result<()> {
    let mut mask = CoreMask::platform();
    mask.set(core)?;
    set_affinity(None, &mask)
}
