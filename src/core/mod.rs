// File: src/core/mod.rs
pub mod deriver;
pub mod dictionary;
pub mod engine;
pub mod generator;
pub mod glyphs;
pub mod history;
pub mod letters;
pub mod matcher;
pub mod threshold;
pub mod types;
