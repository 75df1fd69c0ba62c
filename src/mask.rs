use std::fmt;

use rustix::process::CpuSet;

use crate::error::{ Error, Result };

const WORD_BITS: usize = u64::BITS as usize;

/// A set of logical CPUs, stored as a bitmask wide enough for `max` cpus.
///
/// Unlike [`CpuSet`], whose width is fixed by the platform, the width of a
/// `CoreMask` is chosen at construction time. Cpu ids at or above `max` are
/// rejected by [`CoreMask::set`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CoreMask {
    words: Vec<u64>,
    max: usize,
}

impl CoreMask {
    /// An empty mask able to hold cpus `0..max`.
    pub fn new(max: usize) -> Self {
        Self {
            words: vec![0; max.div_ceil(WORD_BITS)],
            max,
        }
    }

    /// An empty mask as wide as the platform affinity mask.
    pub fn platform() -> Self {
        Self::new(CpuSet::MAX_CPU)
    }

    /// Build a mask with exactly the bits of `cores` set.
    ///
    /// Duplicates are ignored. Fails with [`Error::OutOfRange`] on the first
    /// id that does not fit below `max`.
    pub fn from_cores(cores: &[usize], max: usize) -> Result<Self> {
        let mut mask = Self::new(max);
        for &core in cores {
            mask.set(core)?;
        }
        Ok(mask)
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn set(&mut self, core: usize) -> Result<()> {
        if core >= self.max {
            return Err(Error::OutOfRange { core, max: self.max });
        }
        self.words[core / WORD_BITS] |= 1u64 << (core % WORD_BITS);
        Ok(())
    }

    /// Clear `core`. Returns whether it was set before.
    pub fn clear(&mut self, core: usize) -> bool {
        if !self.is_set(core) {
            return false;
        }
        self.words[core / WORD_BITS] &= !(1u64 << (core % WORD_BITS));
        true
    }

    pub fn is_set(&self, core: usize) -> bool {
        core < self.max && (self.words[core / WORD_BITS] >> (core % WORD_BITS)) & 1 == 1
    }

    pub fn count(&self) -> usize {
        self.words
            .iter()
            .map(|w| w.count_ones() as usize)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Iterate the set cpus in ascending order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            words: &self.words,
            index: 0,
            current: self.words.first().copied().unwrap_or(0),
        }
    }

    pub fn to_vec(&self) -> Vec<usize> {
        self.iter().collect()
    }

    /// Copy the cpus of an OS affinity set that fit below `max`.
    pub fn from_cpu_set(set: &CpuSet, max: usize) -> Self {
        let mut mask = Self::new(max);
        for core in (0..max.min(CpuSet::MAX_CPU)).filter(|&core| set.is_set(core)) {
            mask.words[core / WORD_BITS] |= 1u64 << (core % WORD_BITS);
        }
        mask
    }

    /// Convert into an OS affinity set, ready for `sched_setaffinity`.
    pub fn to_cpu_set(&self) -> Result<CpuSet> {
        let mut set = CpuSet::new();
        for core in self.iter() {
            if core >= CpuSet::MAX_CPU {
                return Err(Error::OutOfRange { core, max: CpuSet::MAX_CPU });
            }
            set.set(core);
        }
        Ok(set)
    }
}

impl fmt::Debug for CoreMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<'a> IntoIterator for &'a CoreMask {
    type Item = usize;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

pub struct Iter<'a> {
    words: &'a [u64],
    index: usize,
    /// Bits of `words[index]` not yielded yet.
    current: u64,
}

impl Iterator for Iter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        while self.current == 0 {
            self.index += 1;
            self.current = *self.words.get(self.index)?;
        }
        let bit = self.current.trailing_zeros() as usize;
        // drop the lowest set bit
        self.current &= self.current - 1;
        Some(self.index * WORD_BITS + bit)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use rand::Rng;

    use super::*;

    #[test]
    fn from_cores_sets_exactly_the_given_bits() {
        let mask = CoreMask::from_cores(&[3, 0, 64, 3, 127], 128).unwrap();
        assert_eq!(mask.to_vec(), vec![0, 3, 64, 127]);
        assert_eq!(mask.count(), 4);
        for core in 0..128 {
            assert_eq!(mask.is_set(core), [0, 3, 64, 127].contains(&core));
        }
    }

    #[test]
    fn out_of_range_core_is_rejected() {
        let err = CoreMask::from_cores(&[1, 8], 8).unwrap_err();
        assert!(matches!(err, Error::OutOfRange { core: 8, max: 8 }));
        assert!(!CoreMask::new(8).is_set(100));
    }

    #[test]
    fn clear_reports_previous_state() {
        let mut mask = CoreMask::from_cores(&[5], 16).unwrap();
        assert!(mask.clear(5));
        assert!(!mask.clear(5));
        assert!(!mask.clear(99));
        assert!(mask.is_empty());
    }

    #[test]
    fn empty_and_zero_width_masks() {
        assert_eq!(CoreMask::new(0).iter().next(), None);
        assert_eq!(CoreMask::new(200).to_vec(), Vec::<usize>::new());
        assert_eq!(format!("{:?}", CoreMask::from_cores(&[2, 1], 4).unwrap()), "{1, 2}");
    }

    #[test]
    fn random_lists_survive_the_mask_as_sets() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let max = rng.gen_range(1..=300);
            let len = rng.gen_range(0..64);
            let cores: Vec<usize> = (0..len).map(|_| rng.gen_range(0..max)).collect();

            let mask = CoreMask::from_cores(&cores, max).unwrap();
            let expected: BTreeSet<usize> = cores.iter().copied().collect();

            assert_eq!(mask.to_vec(), expected.iter().copied().collect::<Vec<_>>());
            assert_eq!(mask.count(), expected.len());
        }
    }

    #[test]
    fn cpu_set_conversion_keeps_bits() {
        let mask = CoreMask::from_cores(&[0, 2, 31], CpuSet::MAX_CPU).unwrap();
        let set = mask.to_cpu_set().unwrap();
        assert!(set.is_set(0) && set.is_set(2) && set.is_set(31));
        assert!(!set.is_set(1));
        assert_eq!(CoreMask::from_cpu_set(&set, CpuSet::MAX_CPU), mask);

        // narrower masks drop the cpus they cannot hold
        assert_eq!(CoreMask::from_cpu_set(&set, 3).to_vec(), vec![0, 2]);
    }

    #[test]
    fn too_wide_for_the_platform() {
        let mask = CoreMask::from_cores(&[CpuSet::MAX_CPU], CpuSet::MAX_CPU + 1).unwrap();
        assert!(matches!(mask.to_cpu_set(), Err(Error::OutOfRange { .. })));
    }
}
