//! Projection of the player-state payload.
//!
//! Only the consumed fields are named; serde skips the rest of the document
//! (markets, external urls, context) without allocating for it. Every field
//! is optional so a partial payload updates what it carries and leaves the
//! remaining snapshot fields as they were.

use alloc::{string::String, vec::Vec};

use serde::Deserialize;

use crate::{snapshot::PlaybackSnapshot, text::set_truncated};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PlayerState {
    #[serde(default)]
    device: Option<Device>,
    #[serde(default)]
    is_playing: Option<bool>,
    #[serde(default)]
    progress_ms: Option<u64>,
    #[serde(default)]
    item: Option<Item>,
}

#[derive(Debug, Default, Deserialize)]
struct Device {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    volume_percent: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct Item {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    duration_ms: Option<u64>,
    #[serde(default)]
    album: Option<Album>,
    #[serde(default)]
    artists: Option<Vec<Artist>>,
}

#[derive(Debug, Default, Deserialize)]
struct Album {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    images: Option<Vec<Image>>,
}

#[derive(Debug, Deserialize)]
struct Artist {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Image {
    pub url: String,
}

/// Prefers the second (mid-size) image over the full-resolution cover.
pub(crate) fn select_artwork(images: &[Image]) -> Option<&str> {
    images
        .get(1)
        .or_else(|| images.first())
        .map(|image| image.url.as_str())
}

fn clamp_ms(ms: u64) -> u32 {
    ms.min(u32::MAX as u64) as u32
}

impl PlayerState {
    pub(crate) fn device_id(&self) -> Option<&str> {
        self.device
            .as_ref()
            .and_then(|device| device.id.as_deref())
            .filter(|id| !id.is_empty())
    }

    /// Folds this payload into `snapshot`.
    pub(crate) fn apply_to(&self, snapshot: &mut PlaybackSnapshot, artwork_enabled: bool) {
        if let Some(device) = &self.device {
            if let Some(name) = &device.name {
                let _ = set_truncated(&mut snapshot.device, name);
            }
            if let Some(volume) = device.volume_percent {
                snapshot.volume_percent = volume.min(100) as u8;
            }
        }

        if let Some(playing) = self.is_playing {
            snapshot.playing = playing;
        }

        let mut duration_ms = snapshot.duration_ms;
        if let Some(item) = &self.item {
            if let Some(name) = &item.name {
                let _ = set_truncated(&mut snapshot.track, name);
            }
            if let Some(id) = &item.id {
                let _ = set_truncated(&mut snapshot.track_id, id);
            }
            if let Some(artist) = item
                .artists
                .as_ref()
                .and_then(|artists| artists.first())
                .and_then(|artist| artist.name.as_ref())
            {
                let _ = set_truncated(&mut snapshot.artist, artist);
            }
            if let Some(album) = &item.album {
                if let Some(name) = &album.name {
                    let _ = set_truncated(&mut snapshot.album, name);
                }
                if artwork_enabled {
                    if let Some(images) = &album.images {
                        snapshot.artwork_url = select_artwork(images).and_then(|url| {
                            let mut bounded = heapless::String::new();
                            set_truncated(&mut bounded, url).then_some(bounded)
                        });
                    }
                }
            }
            if let Some(duration) = item.duration_ms {
                duration_ms = clamp_ms(duration);
            }
        }
        if !artwork_enabled {
            snapshot.artwork_url = None;
        }

        let progress_ms = self
            .progress_ms
            .map(clamp_ms)
            .unwrap_or(snapshot.progress_ms);
        snapshot.set_progress(progress_ms, duration_ms);
        snapshot.logged_in = true;
    }
}
