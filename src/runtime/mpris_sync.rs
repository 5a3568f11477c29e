use crate::audio::PlaybackInfo;
use crate::mpris::MprisHandle;

/// Keep the MPRIS `Position` property close to the real playback position.
/// State changes are published by the coordinator itself.
pub fn update_mpris_position(mpris: &MprisHandle, info: &PlaybackInfo) {
    if info.current.is_some() {
        mpris.set_position(info.position);
    }
}
