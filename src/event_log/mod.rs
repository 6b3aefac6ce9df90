pub mod consumer;
pub mod decoder;
pub mod dead_letter;
