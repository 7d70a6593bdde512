use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Time bucket size used to aggregate price bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// Bars exactly as the provider returns them (daily for the chart feed).
    #[default]
    Daily,
    /// Sunday-ending calendar weeks.
    Weekly,
    /// Calendar months.
    Monthly,
}

impl Granularity {
    pub const ALL: [Self; 3] = [Self::Daily, Self::Weekly, Self::Monthly];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl Display for Granularity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "daily" | "day" | "d" | "native" => Ok(Self::Daily),
            "weekly" | "week" | "w" => Ok(Self::Weekly),
            "monthly" | "month" | "m" => Ok(Self::Monthly),
            other => Err(ValidationError::InvalidGranularity {
                value: other.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_granularity_aliases() {
        assert_eq!(Granularity::from_str("W").expect("parse"), Granularity::Weekly);
        assert_eq!(
            Granularity::from_str("native").expect("parse"),
            Granularity::Daily
        );
    }

    #[test]
    fn rejects_invalid_granularity() {
        let err = Granularity::from_str("hourly").expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidGranularity { .. }));
    }
}
