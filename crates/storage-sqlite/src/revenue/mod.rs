//! SQLite storage implementation for revenue connections and monthly reports.

mod model;
mod repository;

pub use model::{RevenueConnectionDB, RevenueReportDB};
pub use repository::RevenueRepository;
