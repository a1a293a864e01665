//! Database query functions organized by domain.

pub mod ancestry;
pub mod ledger;
pub mod notifications;
pub mod presale;
pub mod users;
