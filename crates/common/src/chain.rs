//! Certificate chain ordering.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order in which a retrieved chain is requested and returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ChainOrder {
    /// Leaf first, root last.
    #[default]
    RootLast,
    /// Root first, leaf last.
    RootFirst,
    /// Do not request the chain.
    Ignore,
}

impl ChainOrder {
    /// Parse a caller-facing option, falling back to root-last.
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "root-first" => ChainOrder::RootFirst,
            "ignore" => ChainOrder::Ignore,
            _ => ChainOrder::RootLast,
        }
    }

    pub fn includes_chain(&self) -> bool {
        !matches!(self, ChainOrder::Ignore)
    }
}

impl fmt::Display for ChainOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChainOrder::RootLast => "root-last",
            ChainOrder::RootFirst => "root-first",
            ChainOrder::Ignore => "ignore",
        };
        f.write_str(s)
    }
}
