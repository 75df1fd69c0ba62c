//! Grouping of allocated cores by physical package.
//!
//! Linux describes the topology of every logical cpu under
//! `/sys/devices/system/cpu/cpuN/topology/`. The `core_siblings` file holds a
//! hexadecimal mask of all logical cpus sharing a package with `cpuN`, and
//! `thread_siblings` the ones sharing a physical core. [`Topology::reorder`]
//! walks an affinity mask and emits each sibling group together.

use std::{ fs, path::PathBuf };

use rustix::process::CpuSet;

use crate::{ error::{ Error, Result }, mask::CoreMask };

pub const DEFAULT_SYSFS_ROOT: &str = "/sys/devices/system/cpu";

/// Which sibling mask to group by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SiblingFile {
    /// Cpus in the same physical package (`core_siblings`).
    #[default]
    Package,
    /// Hardware threads of the same core (`thread_siblings`).
    Thread,
}

impl SiblingFile {
    pub fn file_name(self) -> &'static str {
        match self {
            SiblingFile::Package => "core_siblings",
            SiblingFile::Thread => "thread_siblings",
        }
    }
}

/// Where and how topology is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyConfig {
    pub root: PathBuf,
    pub sibling_file: SiblingFile,
    /// Width of the working affinity mask.
    pub max_cpus: usize,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_SYSFS_ROOT),
            sibling_file: SiblingFile::default(),
            max_cpus: CpuSet::MAX_CPU,
        }
    }
}

impl TopologyConfig {
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn with_sibling_file(mut self, sibling_file: SiblingFile) -> Self {
        self.sibling_file = sibling_file;
        self
    }

    pub fn with_max_cpus(mut self, max_cpus: usize) -> Self {
        self.max_cpus = max_cpus;
        self
    }
}

/// Provider of the sibling mask text of a logical cpu.
pub trait TopologySource {
    /// Raw mask text for `core`, e.g. `"00000000,0000000f\n"`.
    fn sibling_mask_text(&self, core: usize) -> Result<String>;
}

impl<F> TopologySource for F where F: Fn(usize) -> Result<String> {
    fn sibling_mask_text(&self, core: usize) -> Result<String> {
        self(core)
    }
}

/// Reads sibling masks from a sysfs style directory tree.
#[derive(Debug, Clone)]
pub struct SysfsTopology {
    root: PathBuf,
    sibling_file: SiblingFile,
}

impl SysfsTopology {
    pub fn new(config: &TopologyConfig) -> Self {
        Self {
            root: config.root.clone(),
            sibling_file: config.sibling_file,
        }
    }

    pub fn path(&self, core: usize) -> PathBuf {
        self.root
            .join(format!("cpu{}", core))
            .join("topology")
            .join(self.sibling_file.file_name())
    }
}

impl TopologySource for SysfsTopology {
    fn sibling_mask_text(&self, core: usize) -> Result<String> {
        let path = self.path(core);
        match fs::read_to_string(&path) {
            // the mask is the first line; anything after it is ignored
            Ok(text) => Ok(text.lines().next().unwrap_or_default().to_string()),
            Err(source) => Err(Error::TopologySourceUnavailable { core, path, source }),
        }
    }
}

/// Decode the sibling mask text of `core` into ascending cpu ids.
///
/// The text is a big-endian hex number: its last digit holds cpus 0-3, the
/// digit before it cpus 4-7 and so on. Trailing whitespace is ignored and
/// `,` separates the 32-bit words the kernel prints for wide masks.
pub fn decode_sibling_mask(core: usize, text: &str) -> Result<Vec<usize>> {
    let mut ids = Vec::new();
    let mut base = 0;
    for character in text.trim_end().chars().rev() {
        if character == ',' {
            continue;
        }
        let nibble = character
            .to_digit(16)
            .ok_or(Error::InvalidTopologyData { core, character })?;
        ids.extend((0..4usize).filter(|bit| (nibble >> bit) & 1 == 1).map(|bit| base + bit));
        base += 4;
    }
    Ok(ids)
}

/// Orders cores so that members of a sibling group are adjacent.
pub struct Topology<S = SysfsTopology> {
    source: S,
}

impl Topology<SysfsTopology> {
    pub fn new(config: &TopologyConfig) -> Self {
        Self::with_source(SysfsTopology::new(config))
    }
}

impl<S: TopologySource> Topology<S> {
    pub fn with_source(source: S) -> Self {
        Self { source }
    }

    /// Reorder the cores of `affinity` by sibling group.
    ///
    /// Cores are scanned in ascending order. The first core of a group that is
    /// still unclaimed triggers a read of its sibling mask, and every allocated
    /// sibling is emitted and removed from the working copy, so it is reported
    /// under one group only. Groups appear in the order of their lowest member.
    ///
    /// Any unreadable or malformed mask aborts the whole reorder: there is no
    /// partial result.
    pub fn reorder(&self, affinity: &CoreMask) -> Result<Vec<usize>> {
        let mut remaining = affinity.clone();
        let mut order = Vec::with_capacity(affinity.count());

        for core in affinity {
            if !remaining.is_set(core) {
                continue;
            }

            let text = self.source.sibling_mask_text(core)?;
            let group_start = order.len();
            for id in decode_sibling_mask(core, &text)? {
                if remaining.clear(id) {
                    order.push(id);
                }
            }

            // a mask that does not name its own cpu still must not lose it
            if remaining.clear(core) {
                log::debug!("cpu {} is missing from its own sibling mask {:?}", core, text);
                order.push(core);
            }
            log::trace!("sibling group of cpu {}: {:?}", core, &order[group_start..]);
        }

        Ok(order)
    }
}
