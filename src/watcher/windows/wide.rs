//! UTF-16 conversions for the Win32 "wide" string APIs.

use std::ffi::{OsStr, OsString};
use std::os::windows::ffi::{OsStrExt, OsStringExt};

/// Encode `s` as a null-terminated UTF-16 buffer suitable for passing to a
/// `*W` Win32 function.
pub(crate) fn to_wide(s: impl AsRef<OsStr>) -> Vec<u16> {
    s.as_ref().encode_wide().chain(std::iter::once(0)).collect()
}

/// Decode a null-terminated wide string starting at `ptr`.
///
/// Safety: `ptr` must point at a valid null-terminated UTF-16 buffer.
pub(crate) unsafe fn from_wide(ptr: *const u16) -> OsString {
    let mut len = 0usize;
    while *ptr.add(len) != 0 {
        len += 1;
    }
    let slice = std::slice::from_raw_parts(ptr, len);
    OsString::from_wide(slice)
}
