use std::str::FromStr as _;

use serde::{Deserialize as _, Deserializer, de::Error as _};
use tracing::Level;

/// Parse a level name such as `info` or `DEBUG`
pub(super) fn level<'de, D>(deserializer: D) -> Result<Level, D::Error>
where
    D: Deserializer<'de>,
{
    let name = String::deserialize(deserializer)?;
    Level::from_str(name.trim()).map_err(|_| {
        D::Error::custom(format!(
            "unknown log level `{name}`, expected one of trace, debug, info, warn, error"
        ))
    })
}
