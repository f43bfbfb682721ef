pub mod json;
pub mod sha;
pub mod time;
