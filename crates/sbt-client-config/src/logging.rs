//! Format of the client's own diagnostic log on stderr.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How client log records are written. Build output on stdout is unaffected.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One terse line per record, for reading in a terminal.
    #[default]
    Compact,
    /// One JSON object per record.
    Json,
}
