pub mod ingestion;
pub mod rollup_refresher;
pub mod diagnostic;
