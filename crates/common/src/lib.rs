//! Shared types for the payment service crates.

pub mod types;

pub use types::{
    BankCode, EventId, Money, OrderId, PaymentId, TicketNumber, TransactionStatus,
    UnknownBankCode, UserId,
};
