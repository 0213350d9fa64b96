// Lenient query-string parameters shared by the history filters
use serde::{de, Deserialize, Deserializer};
use std::fmt::Display;
use std::str::FromStr;

/// Blank values and the "All" placeholder mean no filter; anything else is
/// parsed with `FromStr`.
pub fn optional_param<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) if value.eq_ignore_ascii_case("all") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(de::Error::custom),
    }
}
