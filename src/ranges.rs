use std::fmt;

use crate::error::{ Error, Result };

/// Render `cores` as comma separated runs, e.g. `1-3,7,9-10`.
///
/// Only neighbours that differ by exactly one collapse into a range. The
/// input is never sorted, so a topology ordered list keeps its order.
pub fn format_ranges(cores: &[usize]) -> String {
    CoreList(cores).to_string()
}

/// Parse a list in the format produced by [`format_ranges`].
///
/// * `"1,2-4,6"` gives `[1, 2, 3, 4, 6]`
/// * an empty (or blank) string gives an empty list
pub fn parse_ranges(list: &str) -> Result<Vec<usize>> {
    let list = list.trim();
    let mut cores = Vec::new();
    if list.is_empty() {
        return Ok(cores);
    }

    let invalid = || Error::InvalidCoreList(list.to_string());
    for run in list.split(',') {
        let run = run.trim();
        match run.split_once('-') {
            None => cores.push(run.parse().map_err(|_| invalid())?),
            Some((first, last)) => {
                let first: usize = first.trim().parse().map_err(|_| invalid())?;
                let last: usize = last.trim().parse().map_err(|_| invalid())?;
                if first > last {
                    return Err(invalid());
                }
                cores.extend(first..=last);
            }
        }
    }
    Ok(cores)
}

/// `Display` adapter printing a core list as ranges.
#[derive(Debug, Clone, Copy)]
pub struct CoreList<'a>(pub &'a [usize]);

impl fmt::Display for CoreList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let list = self.0;
        let mut begin = 0;
        while begin < list.len() {
            let mut end = begin + 1;
            while end < list.len() && list[end - 1].checked_add(1) == Some(list[end]) {
                end += 1;
            }

            if begin != 0 {
                f.write_str(",")?;
            }
            if end == begin + 1 {
                write!(f, "{}", list[begin])?;
            } else {
                write!(f, "{}-{}", list[begin], list[end - 1])?;
            }
            begin = end;
        }
        Ok(())
    }
}
