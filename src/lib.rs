// Core infrastructure modules
pub mod config;
pub mod core;

// Feature-specific modules
pub mod students;

#[cfg(test)]
pub(crate) mod test_utils;
