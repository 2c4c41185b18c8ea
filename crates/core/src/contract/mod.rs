pub mod entity;
pub mod error;
pub mod index;

pub use entity::{Contract, ContractKey, roll_date};
pub use index::ContractIndex;
