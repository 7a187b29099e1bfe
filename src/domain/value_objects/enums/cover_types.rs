use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CoverType {
    Hard,
    Soft,
}

impl CoverType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoverType::Hard => "hard",
            CoverType::Soft => "soft",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "hard" => Some(CoverType::Hard),
            "soft" => Some(CoverType::Soft),
            _ => None,
        }
    }
}

impl Display for CoverType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
