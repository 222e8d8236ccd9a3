//! Environment lookups behind the `#[serde(default = "...")]` functions of the
//! config sections.

use std::str::FromStr;

/// `name` parsed as `T`. Unset, empty and unparsable variables read as `None`.
pub fn env_var<T: FromStr>(name: &str) -> Option<T> {
	std::env::var(name).ok().filter(|value| !value.is_empty()).and_then(|value| value.parse().ok())
}

/// Whether `name` holds a non empty value.
pub fn env_is_set(name: &str) -> bool {
	std::env::var(name).is_ok_and(|value| !value.is_empty())
}

/// Declares `pub fn $name()` reading `$env` through [`env_var`], falling back to
/// `$default`. Without a default the function returns an `Option`.
#[macro_export]
macro_rules! env_default {
	($name:ident, $env:literal, $ty:ty, $default:expr) => {
		pub fn $name() -> $ty {
			$crate::env::env_var::<$ty>($env).unwrap_or_else(|| $default)
		}
	};
	($name:ident, $env:literal, $ty:ty) => {
		pub fn $name() -> Option<$ty> {
			$crate::env::env_var::<$ty>($env)
		}
	};
}
