use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Returns the underlying UUID.
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates the identifier from a string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

uuid_id!(
    /// Identifier of a payment intent. Also sent to the gateway as its order id.
    PaymentId
);

uuid_id!(
    /// Identifier of a finalized order.
    OrderId
);

string_id!(
    /// Ticket number of a held reservation.
    TicketNumber
);

string_id!(
    /// Identifier of a user profile.
    UserId
);

string_id!(
    /// Identifier of a catalog event.
    EventId
);

/// Monetary amount in whole rupiah.
///
/// The gateway only accepts integral IDR amounts, so there is no minor unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates an amount from whole rupiah.
    pub fn from_rupiah(rupiah: i64) -> Self {
        Self(rupiah)
    }

    /// Returns the amount in whole rupiah.
    pub fn rupiah(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Rp{}", self.0)
    }
}

/// Error returned when parsing a bank code outside the accepted set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported bank code '{0}', expected one of bca, bni, permata")]
pub struct UnknownBankCode(pub String);

/// Banks that can issue a virtual account for a bank-transfer charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BankCode {
    Bca,
    Bni,
    Permata,
}

impl BankCode {
    /// Returns the wire tag the gateway uses for this bank.
    pub fn as_str(&self) -> &'static str {
        match self {
            BankCode::Bca => "bca",
            BankCode::Bni => "bni",
            BankCode::Permata => "permata",
        }
    }
}

impl std::fmt::Display for BankCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BankCode {
    type Err = UnknownBankCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bca" => Ok(BankCode::Bca),
            "bni" => Ok(BankCode::Bni),
            "permata" => Ok(BankCode::Permata),
            other => Err(UnknownBankCode(other.to_string())),
        }
    }
}

/// Transaction status as reported by the payment gateway.
///
/// Statuses this service does not act on are preserved verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransactionStatus {
    Pending,
    Settlement,
    Expire,
    Cancel,
    Deny,
    Failure,
    Other(String),
}

impl TransactionStatus {
    /// Returns the gateway's tag for this status.
    pub fn as_str(&self) -> &str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Settlement => "settlement",
            TransactionStatus::Expire => "expire",
            TransactionStatus::Cancel => "cancel",
            TransactionStatus::Deny => "deny",
            TransactionStatus::Failure => "failure",
            TransactionStatus::Other(s) => s,
        }
    }

    /// Returns true for statuses after which the charge can never settle.
    pub fn is_terminal_failure(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Expire
                | TransactionStatus::Cancel
                | TransactionStatus::Deny
                | TransactionStatus::Failure
        )
    }
}

impl From<String> for TransactionStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => TransactionStatus::Pending,
            "settlement" => TransactionStatus::Settlement,
            "expire" => TransactionStatus::Expire,
            "cancel" => TransactionStatus::Cancel,
            "deny" => TransactionStatus::Deny,
            "failure" => TransactionStatus::Failure,
            _ => TransactionStatus::Other(s),
        }
    }
}

impl From<&str> for TransactionStatus {
    fn from(s: &str) -> Self {
        TransactionStatus::from(s.to_string())
    }
}

impl From<TransactionStatus> for String {
    fn from(status: TransactionStatus) -> Self {
        match status {
            TransactionStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
