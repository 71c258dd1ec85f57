//! releve-core: transaction types and amount normalization shared across the workspace

pub mod amount;
pub mod finance;
pub mod text;

pub use amount::{AmountError, normalize_amount};
pub use finance::{
    ClassifiedTransaction, Direction, Source, TransactionCandidate, UnknownDirection,
    iso_week_key, period_key,
};
