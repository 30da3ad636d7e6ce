// File: src/oracle/mod.rs
pub mod bits;
pub mod entropy;
pub mod scorer;
