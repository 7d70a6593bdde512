use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Canonical provider identifiers used in metadata and envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    /// Exchange listing service.
    Krx,
    /// Chart feed and finance portal.
    Naver,
    /// Built-in instrument list used when the listing is unreachable.
    Builtin,
}

impl ProviderId {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Krx => "krx",
            Self::Naver => "naver",
            Self::Builtin => "builtin",
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
