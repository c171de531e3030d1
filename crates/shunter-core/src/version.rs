//! Pre-GA version lifecycle
//!
//! Maps a release title to the next milestone title. The lifecycle has five
//! states (`GA`, `M1`, `M2`, `M3`, `RC1`) forming the straight line
//! `M1 -> M2 -> M3 -> RC1 -> GA`, plus the infinite `GA -> GA` patch chain.

use crate::error::VersionError;

/// Compute the next milestone title for a release title
///
/// - `X.Y.Z` (GA): next is `X.Y.(Z+1)`
/// - `X.Y.Z-M1` / `-M2`: next milestone in the sequence
/// - `X.Y.Z-M3`: next is `X.Y.Z-RC1`
/// - `X.Y.Z-RC1`: next is `X.Y.Z` (GA of the same version)
///
/// Anything else fails with [`VersionError::InvalidFormat`].
pub fn next_version(title: &str) -> Result<String, VersionError> {
    let invalid = || VersionError::InvalidFormat(title.to_string());

    match title.split_once('-') {
        None => {
            let (major, minor, patch) = split_ga(title).ok_or_else(invalid)?;
            Ok(format!("{major}.{minor}.{}", patch + 1))
        }
        Some((base, suffix)) => {
            // The base of a pre-release must itself be GA-shaped.
            split_ga(base).ok_or_else(invalid)?;
            match suffix {
                "M1" => Ok(format!("{base}-M2")),
                "M2" => Ok(format!("{base}-M3")),
                "M3" => Ok(format!("{base}-RC1")),
                "RC1" => Ok(base.to_string()),
                _ => Err(invalid()),
            }
        }
    }
}

/// Split a GA title into numeric components, or `None` if not `X.Y.Z`
fn split_ga(title: &str) -> Option<(u64, u64, u64)> {
    let mut parts = title.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    let patch = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((major, minor, patch))
}
