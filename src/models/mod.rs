// Core models
pub mod game_record;
pub mod player;
pub mod withdrawal;

// Re-export commonly used types
pub use game_record::*;
pub use player::*;
pub use withdrawal::*;
