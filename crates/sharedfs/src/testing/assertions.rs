//! Custom assertions for volume tests.
//!
//! Failures print the errno by name so a mismatch reads as `EACCES` versus
//! `ENOENT` rather than two bare integers.

use crate::error::SharedFsResult;
use std::fmt::Debug;

/// Assert that a volume result is an error with a specific errno.
pub fn assert_errno<T: Debug>(result: SharedFsResult<T>, expected_errno: i32, context: &str) {
    match result {
        Ok(value) => {
            panic!(
                "{}: expected errno {} ({}) but got success with {:?}",
                context,
                expected_errno,
                errno_name(expected_errno),
                value
            );
        }
        Err(err) => {
            let actual_errno = err.to_errno();
            if actual_errno != expected_errno {
                panic!(
                    "{}: expected errno {} ({}), got errno {} ({}): {}",
                    context,
                    expected_errno,
                    errno_name(expected_errno),
                    actual_errno,
                    errno_name(actual_errno),
                    err
                );
            }
        }
    }
}

/// Assert that a volume result reports a missing entry.
pub fn assert_not_found<T: Debug>(result: SharedFsResult<T>, context: &str) {
    assert_errno(result, libc::ENOENT, context);
}

/// Get a human-readable name for the errno values a volume produces.
fn errno_name(errno: i32) -> &'static str {
    match errno {
        libc::ENOENT => "ENOENT",
        libc::EEXIST => "EEXIST",
        libc::ENOTEMPTY => "ENOTEMPTY",
        libc::EACCES => "EACCES",
        libc::EPERM => "EPERM",
        libc::EINVAL => "EINVAL",
        libc::EIO => "EIO",
        libc::ENOMEM => "ENOMEM",
        libc::EPROTO => "EPROTO",
        _ => "UNKNOWN",
    }
}
