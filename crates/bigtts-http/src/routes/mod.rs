pub mod clean;
pub mod result;
pub mod status;
pub mod upload;
