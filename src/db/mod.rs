mod journal;
mod pool;
mod reports;

pub use journal::PgJournal;
pub use pool::create_pool;
pub use reports::PgReportStore;
