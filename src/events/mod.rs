pub mod trade;
pub mod dead_letter;
