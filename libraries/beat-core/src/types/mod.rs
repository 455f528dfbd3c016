mod ids;
mod song;

pub use ids::{SongId, UserId};
pub use song::Song;
