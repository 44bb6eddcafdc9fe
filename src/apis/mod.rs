pub mod greenhouse;
