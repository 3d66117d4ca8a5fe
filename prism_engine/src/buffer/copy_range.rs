//! Copy-range policy for buffer-to-buffer copies
//!
//! Shared by `copy_from` and `copy_to` of every backend so both call sites
//! resolve an open-ended size the same way.

use crate::error::{Error, Result};

/// Number of bytes a copy moves
///
/// `size == None` copies `min(dest_size - dest_pos, src_size - src_pos)`.
/// An explicit size must fit both remaining ranges.
///
/// # Errors
///
/// `OutOfRange` when a position lies past the end of its buffer or an
/// explicit size overruns either side.
pub fn resolve_copy_size(
    dest_size: usize,
    dest_pos: usize,
    src_size: usize,
    src_pos: usize,
    size: Option<usize>,
) -> Result<usize> {
    let dest_remaining = dest_size.checked_sub(dest_pos).ok_or_else(|| {
        Error::OutOfRange(format!(
            "copy: destination offset {} past end of {} byte buffer",
            dest_pos, dest_size
        ))
    })?;
    let src_remaining = src_size.checked_sub(src_pos).ok_or_else(|| {
        Error::OutOfRange(format!(
            "copy: source offset {} past end of {} byte buffer",
            src_pos, src_size
        ))
    })?;

    match size {
        None => Ok(dest_remaining.min(src_remaining)),
        Some(size) if size <= dest_remaining && size <= src_remaining => Ok(size),
        Some(size) => Err(Error::OutOfRange(format!(
            "copy: {} bytes requested, {} available at source and {} at destination",
            size, src_remaining, dest_remaining
        ))),
    }
}

#[cfg(test)]
#[path = "copy_range_tests.rs"]
mod tests;
