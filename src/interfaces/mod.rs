pub mod message_source;
pub mod price_store;
pub mod view_refresher;
pub mod dead_letter_sink;
pub mod diagnostic_probe;
