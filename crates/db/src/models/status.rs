//! Status vocabularies stored as lowercase TEXT columns.
//!
//! The accepted strings match the CHECK constraints in the migrations.

use serde::{Deserialize, Serialize};

/// A TEXT column held a value outside its vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {kind} '{value}'")]
pub struct UnknownStatus {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! define_text_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Return the stored column value.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $val ),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownStatus;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $( $val => Ok($name::$variant), )+
                    other => Err(UnknownStatus {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

define_text_enum! {
    /// Submission and feedback status of a deposit.
    DepositStatus {
        Waiting = "waiting",
        NotApplicable = "notapplicable",
        Error = "error",
        Success = "success",
    }
}

define_text_enum! {
    /// Which part of the deposit lifecycle an event belongs to.
    LogEventType {
        General = "general",
        Submission = "submission",
    }
}

define_text_enum! {
    /// Severity of a log event.
    LogEventStatus {
        Info = "info",
        Success = "success",
        Error = "error",
        NotApplicable = "notapplicable",
    }
}
