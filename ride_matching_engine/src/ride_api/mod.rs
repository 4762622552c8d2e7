pub mod errors;
pub mod matcher;
pub mod matching_api;
