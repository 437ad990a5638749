pub mod config;
pub mod errors;
pub mod models;
pub mod music;
pub mod naming;

pub use config::AppConfig;
pub use errors::{DispatchError, DispatchResult};
pub use music::{MusicCatalog, MusicTrack};
