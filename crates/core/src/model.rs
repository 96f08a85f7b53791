//! The fixed set of chat models the backend accepts.

use serde::{Deserialize, Serialize};

/// A model identifier understood by the chat backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SupportedModel {
    /// Most capable model.
    #[default]
    #[serde(rename = "gpt-5.1")]
    Gpt51,
    /// Balanced performance.
    #[serde(rename = "gpt-5-mini")]
    Gpt5Mini,
    /// Fast and efficient.
    #[serde(rename = "gpt-5.1-nano")]
    Gpt51Nano,
}

impl SupportedModel {
    pub const ALL: [SupportedModel; 3] = [Self::Gpt51, Self::Gpt5Mini, Self::Gpt51Nano];

    /// The identifier sent on the wire.
    pub fn id(&self) -> &'static str {
        match self {
            Self::Gpt51 => "gpt-5.1",
            Self::Gpt5Mini => "gpt-5-mini",
            Self::Gpt51Nano => "gpt-5.1-nano",
        }
    }

    /// Short label shown in model pickers.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Gpt51 => "Thinking",
            Self::Gpt5Mini => "Moderate",
            Self::Gpt51Nano => "Fast",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Gpt51 => "Most capable model",
            Self::Gpt5Mini => "Balanced performance",
            Self::Gpt51Nano => "Fast and efficient",
        }
    }
}

impl std::fmt::Display for SupportedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

impl std::str::FromStr for SupportedModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.id() == wanted || m.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|m| m.id()).collect();
                format!("unknown model '{wanted}' (expected one of: {})", known.join(", "))
            })
    }
}
