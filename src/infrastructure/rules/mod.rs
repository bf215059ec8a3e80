//! Rule data loading

mod catalog;

pub use catalog::RuleCatalog;
