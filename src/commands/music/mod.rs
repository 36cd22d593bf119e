pub mod leave;
pub mod play;

// Shared music functionality
pub mod utils;
