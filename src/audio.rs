//! Audio playback: the session coordinator, the rodio backend and the thread
//! that owns them.

mod backend;
mod coordinator;
mod player;
mod sink;
mod thread;
mod types;

pub use backend::{Notifier, NowPlaying};
pub use coordinator::fraction_target;
pub use player::AudioPlayer;
pub use thread::AudioThreadConfig;
pub use types::{AudioCmd, AudioEvent, PlaybackHandle, PlaybackInfo};
