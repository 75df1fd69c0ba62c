//! Discovery of the cpus a process may run on, ordered by physical package.
//!
//! ```no_run
//! use coremap::{ allocated_cores_preferred, format_ranges, sys };
//!
//! let cores = allocated_cores_preferred().unwrap();
//! println!("running on {}", format_ranges(&cores));
//! sys::pin_current_thread(cores[0]).unwrap();
//! ```

pub use error::{ Error, Result };
pub use mask::CoreMask;
pub use ranges::{ format_ranges, parse_ranges, CoreList };
pub use sys::allocated_cores;
pub use topology::{
    decode_sibling_mask,
    SiblingFile,
    SysfsTopology,
    Topology,
    TopologyConfig,
    TopologySource,
};

mod error;
pub mod mask;
pub mod ranges;
pub mod sys;
pub mod topology;

/// Cores allocated to this process, grouped by physical package.
///
/// The affinity mask is read with the width of `config.max_cpus` and the
/// sibling masks come from the sysfs tree at `config.root`. Fails if any
/// sibling mask cannot be read or decoded.
pub fn try_allocated_cores_by_package(config: &TopologyConfig) -> Result<Vec<usize>> {
    let affinity = sys::get_affinity(None)?;
    let mut working = CoreMask::new(config.max_cpus);
    for core in affinity.iter().take_while(|&core| core < config.max_cpus) {
        working.set(core)?;
    }
    Topology::new(config).reorder(&working)
}

/// Cores allocated to this process, grouped by physical package.
///
/// Returns an empty list when the topology cannot be read. Since the
/// affinity of a running process is never empty, an empty result means the
/// ordering is unavailable and [`allocated_cores`] should be used instead.
pub fn allocated_cores_by_package() -> Vec<usize> {
    allocated_cores_by_package_with(&TopologyConfig::default())
}

/// [`allocated_cores_by_package`] with topology read as `config` says.
pub fn allocated_cores_by_package_with(config: &TopologyConfig) -> Vec<usize> {
    match try_allocated_cores_by_package(config) {
        Ok(cores) => cores,
        Err(err) => {
            log::warn!("cannot order cores by package: {}", err);
            Vec::new()
        }
    }
}

/// Package ordered cores, or the plain ascending list if topology is unavailable.
pub fn allocated_cores_preferred() -> Result<Vec<usize>> {
    allocated_cores_preferred_with(&TopologyConfig::default())
}

pub fn allocated_cores_preferred_with(config: &TopologyConfig) -> Result<Vec<usize>> {
    let cores = allocated_cores_by_package_with(config);
    if !cores.is_empty() {
        return Ok(cores);
    }
    log::debug!("falling back to the ascending affinity list");
    allocated_cores(None)
}
