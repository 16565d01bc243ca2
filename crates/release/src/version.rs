//! Release version comparison

use std::cmp::Ordering;

use crate::error::{Error, Result};

fn components(version: &str) -> Result<Vec<u64>> {
    let trimmed = version.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
    // Pre-release and build suffixes do not take part in ordering
    let core = trimmed.split(['-', '+']).next().unwrap_or_default();

    if core.is_empty() {
        return Err(Error::InvalidVersion(version.to_string()));
    }

    core.split('.')
        .map(|part| {
            part.parse::<u64>()
                .map_err(|_| Error::InvalidVersion(version.to_string()))
        })
        .collect()
}

/// Compare two dotted release versions, e.g. `v1.2.0` against `1.10`.
///
/// Missing trailing components count as zero.
pub fn compare_versions(current: &str, other: &str) -> Result<Ordering> {
    let a = components(current)?;
    let b = components(other)?;

    let len = a.len().max(b.len());
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            ord => return Ok(ord),
        }
    }
    Ok(Ordering::Equal)
}
