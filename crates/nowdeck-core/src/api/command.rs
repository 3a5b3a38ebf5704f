//! Transport, volume and library commands.

use core::fmt::Write;

use heapless::String;

use crate::{
    http::{Method, URL_BYTES},
    snapshot::TRACK_ID_BYTES,
};

pub const API_BASE: &str = "https://api.spotify.com/v1";
pub const PLAYER_STATE_URL: &str = "https://api.spotify.com/v1/me/player";

pub type RequestUrl = String<URL_BYTES>;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PlayerCommand {
    Next,
    Previous,
    Play,
    Pause,
    /// Percent; values above 100 are sent as 100.
    SetVolume(u8),
    /// Position in the current track.
    Seek(u32),
    /// Adds the track to the user's library.
    SaveTrack(String<TRACK_ID_BYTES>),
}

impl PlayerCommand {
    pub const fn method(&self) -> Method {
        match self {
            Self::Next | Self::Previous => Method::Post,
            _ => Method::Put,
        }
    }

    pub fn url(&self) -> RequestUrl {
        let mut url = RequestUrl::new();
        let _ = match self {
            Self::Next => write!(url, "{API_BASE}/me/player/next"),
            Self::Previous => write!(url, "{API_BASE}/me/player/previous"),
            Self::Play => write!(url, "{API_BASE}/me/player/play"),
            Self::Pause => write!(url, "{API_BASE}/me/player/pause"),
            Self::SetVolume(percent) => write!(
                url,
                "{API_BASE}/me/player/volume?volume_percent={}",
                (*percent).min(100)
            ),
            Self::Seek(position_ms) => {
                write!(url, "{API_BASE}/me/player/seek?position_ms={position_ms}")
            }
            Self::SaveTrack(id) => write!(url, "{API_BASE}/me/tracks?ids={id}"),
        };
        url
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Self::Next => "next",
            Self::Previous => "previous",
            Self::Play => "play",
            Self::Pause => "pause",
            Self::SetVolume(_) => "volume",
            Self::Seek(_) => "seek",
            Self::SaveTrack(_) => "save",
        }
    }
}

/// Applies a signed step to a volume, saturating at 0 and 100.
pub fn volume_with_delta(current: u8, delta: i8) -> u8 {
    (current as i16 + delta as i16).clamp(0, 100) as u8
}

/// Adds `device_id=<id>` as a query parameter. Returns `false` if the URL
/// buffer is full, leaving `url` unchanged.
pub fn append_device_id(url: &mut RequestUrl, device_id: &str) -> bool {
    let before = url.len();
    let separator = if url.contains('?') { '&' } else { '?' };
    if write!(url, "{separator}device_id={device_id}").is_err() {
        url.truncate(before);
        return false;
    }
    true
}
