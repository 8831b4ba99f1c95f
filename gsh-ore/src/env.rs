//! Helpers for reading configuration out of environment variables.

use std::ffi::OsStr;
use std::str::FromStr;

/// Returns true if the environment variable is set and is _not_ one of the following (ignoring
/// case): `'0', '', 'no', 'false', 'off'`.
pub fn is_truthy<K: AsRef<OsStr>>(var: K) -> bool {
    static FALSEY: &[&str] = &["0", "", "no", "false", "off"];

    let Some(mut value) = std::env::var_os(var) else {
        return false;
    };

    OsStr::make_ascii_lowercase(&mut value);
    !FALSEY.iter().any(|falsey| value == *falsey)
}

/// Parses the environment variable `var` as a `T`.
///
/// Returns `Ok(None)` if the variable is unset, and `Err` with a description of the problem if
/// it's set but isn't valid unicode or fails to parse.
pub fn parse<K, T>(var: K) -> Result<Option<T>, String>
where
    K: AsRef<OsStr>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let var = var.as_ref();
    let Some(value) = std::env::var_os(var) else {
        return Ok(None);
    };
    let value = value
        .into_string()
        .map_err(|raw| format!("{var:?} is not valid unicode: {raw:?}"))?;
    value
        .trim()
        .parse()
        .map(Some)
        .map_err(|err| format!("{var:?}={value:?}: {err}"))
}
