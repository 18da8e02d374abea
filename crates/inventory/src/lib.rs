//! Stock accounting for the marketplace.
//!
//! [`StockLedger`] performs single conditional adjustments (restock, manual
//! corrections). [`ReservationCoordinator`] applies the stock side of an
//! order as one unit of work: every line item is adjusted or none is.

pub mod error;
pub mod ledger;
pub mod reservation;

pub use error::{LedgerError, ReservationError};
pub use ledger::StockLedger;
pub use reservation::{LOW_STOCK_THRESHOLD, Reservation, ReservationCoordinator};
