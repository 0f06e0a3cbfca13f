//! Data models for the lending engine

pub mod inventory;
pub mod loan;
pub mod title;

pub use inventory::InventoryItem;
pub use loan::LoanRecord;
pub use title::{Title, TitleCorrections, TitleMetadata};
