use serde::{Deserialize, Serialize};

use super::ModelError;

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($(#[$vmeta:meta])* $variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($(#[$vmeta])* #[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ModelError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

// Strict parsing: only the exact literals are accepted here. Lenient mapping
// of upstream values lives in `normalize::normalize_status`.
str_enum!(CaseStatus {
    #[default]
    New => "NEW",
    Processed => "PROCESSED",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn case_status_round_trip() {
        for status in [CaseStatus::New, CaseStatus::Processed] {
            assert_eq!(CaseStatus::from_str(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn case_status_rejects_lowercase() {
        let err = CaseStatus::from_str("processed").unwrap_err();
        assert!(err.to_string().contains("CaseStatus"));
    }

    #[test]
    fn case_status_serializes_as_literal() {
        assert_eq!(serde_json::to_string(&CaseStatus::Processed).unwrap(), "\"PROCESSED\"");
        let parsed: CaseStatus = serde_json::from_str("\"NEW\"").unwrap();
        assert_eq!(parsed, CaseStatus::New);
    }

    #[test]
    fn case_status_defaults_to_new() {
        assert_eq!(CaseStatus::default(), CaseStatus::New);
    }
}
