use core::fmt::Write;

use embedded_graphics::{
    mono_font::{
        MonoFont, MonoTextStyle,
        ascii::{FONT_6X10, FONT_9X15, FONT_10X20},
    },
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{PrimitiveStyle, PrimitiveStyleBuilder, Rectangle, RoundedRectangle},
    text::{Alignment, Baseline, Text, TextStyle, TextStyleBuilder},
};
use heapless::String;
use nowdeck_core::{
    render::PopupTone,
    snapshot::{DEVICE_NAME_BYTES, PlaybackSnapshot, TEXT_BYTES},
    text::write_clock,
};

use crate::platform::panel::{FrameBuffer, HEIGHT, WIDTH};

use super::{FrameRenderer, Screen};

const MARGIN: i32 = 12;
const HEADER_H: i32 = 22;
const BAR_Y: i32 = 186;
const BAR_H: u32 = 8;
const LOGIN_LINE_CHARS: usize = 60;

const INK: BinaryColor = BinaryColor::On;
const PAPER: BinaryColor = BinaryColor::Off;

const BAR_W: u32 = WIDTH as u32 - 2 * MARGIN as u32;

/// What a now-playing frame actually shows; two snapshots with equal
/// visible state produce identical pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleState {
    track: String<TEXT_BYTES>,
    artist: String<TEXT_BYTES>,
    album: String<TEXT_BYTES>,
    device: String<DEVICE_NAME_BYTES>,
    volume_percent: u8,
    playing: bool,
    bar_px: u32,
    elapsed_s: u32,
    total_s: u32,
}

impl VisibleState {
    pub fn of(snapshot: &PlaybackSnapshot) -> Self {
        Self {
            track: snapshot.track.clone(),
            artist: snapshot.artist.clone(),
            album: snapshot.album.clone(),
            device: snapshot.device.clone(),
            volume_percent: snapshot.volume_percent,
            playing: snapshot.playing,
            bar_px: bar_width(snapshot.progress_ms, snapshot.duration_ms),
            elapsed_s: snapshot.progress_ms / 1_000,
            total_s: snapshot.duration_ms / 1_000,
        }
    }
}

fn bar_width(progress_ms: u32, duration_ms: u32) -> u32 {
    if duration_ms == 0 {
        return 0;
    }
    (BAR_W as u64 * progress_ms.min(duration_ms) as u64 / duration_ms as u64) as u32
}

/// Text-only layout for the 400x240 panel.
#[derive(Debug, Default, Clone, Copy)]
pub struct NowPlayingPainter;

impl FrameRenderer for NowPlayingPainter {
    fn render(&mut self, screen: Screen<'_>, frame: &mut FrameBuffer) {
        match screen {
            Screen::Splash => {
                frame.fill(false);
                centered(frame, "nowdeck", &FONT_10X20, HEIGHT as i32 / 2 - 20, INK);
                centered(frame, "starting", &FONT_6X10, HEIGHT as i32 / 2 + 8, INK);
            }
            Screen::Connecting => {
                frame.fill(false);
                centered(frame, "Connecting...", &FONT_10X20, HEIGHT as i32 / 2 - 10, INK);
            }
            Screen::Login { url, title, footer } => draw_login(frame, url, title, footer),
            Screen::Popup { text, tone } => draw_popup(frame, text, tone),
            Screen::NowPlaying(snapshot) => draw_now_playing(frame, snapshot),
        }
    }
}

fn draw_now_playing(frame: &mut FrameBuffer, snapshot: &PlaybackSnapshot) {
    frame.fill(false);

    let header = Rectangle::new(Point::zero(), Size::new(WIDTH as u32, HEADER_H as u32));
    let _ = header.into_styled(PrimitiveStyle::with_fill(INK)).draw(frame);
    let device = if snapshot.device.is_empty() {
        "-"
    } else {
        snapshot.device.as_str()
    };
    left(frame, fit(device, 40), &FONT_9X15, MARGIN, 4, PAPER);

    let mut volume = String::<12>::new();
    let _ = write!(volume, "VOL {:>3}%", snapshot.volume_percent);
    right(frame, &volume, &FONT_9X15, WIDTH as i32 - MARGIN, 4, PAPER);

    left(frame, fit(&snapshot.track, 37), &FONT_10X20, MARGIN, 52, INK);
    left(frame, fit(&snapshot.artist, 42), &FONT_9X15, MARGIN, 86, INK);
    left(frame, fit(&snapshot.album, 62), &FONT_6X10, MARGIN, 112, INK);

    let state = if snapshot.playing { "> PLAYING" } else { "|| PAUSED" };
    left(frame, state, &FONT_9X15, MARGIN, 146, INK);

    draw_progress(frame, snapshot.progress_ms, snapshot.duration_ms);
}

fn draw_progress(frame: &mut FrameBuffer, progress_ms: u32, duration_ms: u32) {
    let outline = Rectangle::new(Point::new(MARGIN, BAR_Y), Size::new(BAR_W, BAR_H));
    let _ = outline
        .into_styled(PrimitiveStyle::with_stroke(INK, 1))
        .draw(frame);

    let filled = bar_width(progress_ms, duration_ms);
    if filled > 0 {
        let bar = Rectangle::new(Point::new(MARGIN, BAR_Y), Size::new(filled, BAR_H));
        let _ = bar.into_styled(PrimitiveStyle::with_fill(INK)).draw(frame);
    }

    let mut elapsed = String::<12>::new();
    write_clock(&mut elapsed, progress_ms);
    let mut total = String::<12>::new();
    write_clock(&mut total, duration_ms);
    let label_y = BAR_Y + BAR_H as i32 + 6;
    left(frame, &elapsed, &FONT_6X10, MARGIN, label_y, INK);
    right(frame, &total, &FONT_6X10, WIDTH as i32 - MARGIN, label_y, INK);
}

fn draw_login(frame: &mut FrameBuffer, url: &str, title: &str, footer: &str) {
    frame.fill(false);
    centered(frame, title, &FONT_10X20, 16, INK);

    // No on-device QR encoder; the login address is printed instead.
    let mut y = 70;
    let mut rest = url;
    while !rest.is_empty() && y < HEIGHT as i32 - 40 {
        let line = fit(rest, LOGIN_LINE_CHARS);
        centered(frame, line, &FONT_6X10, y, INK);
        rest = &rest[line.len()..];
        y += 14;
    }

    centered(frame, footer, &FONT_9X15, HEIGHT as i32 - 28, INK);
}

fn draw_popup(frame: &mut FrameBuffer, text: &str, tone: PopupTone) {
    let width = 300u32;
    let height = 72u32;
    let origin = Point::new((WIDTH as u32 - width) as i32 / 2, (HEIGHT as u32 - height) as i32 / 2);
    let area = Rectangle::new(origin, Size::new(width, height));

    let (fill, stroke, text_color) = match tone {
        PopupTone::Danger | PopupTone::Accent => (INK, 0, PAPER),
        PopupTone::Warning => (PAPER, 4, INK),
        PopupTone::Info => (PAPER, 2, INK),
    };
    let style = PrimitiveStyleBuilder::new()
        .fill_color(fill)
        .stroke_color(INK)
        .stroke_width(stroke)
        .build();
    let _ = RoundedRectangle::with_equal_corners(area, Size::new(10, 10))
        .into_styled(style)
        .draw(frame);

    centered(
        frame,
        fit(text, (width as usize - 20) / 10),
        &FONT_10X20,
        origin.y + (height as i32 - 20) / 2,
        text_color,
    );
}

/// Longest prefix of `text` that fits `max_chars` glyphs on a char boundary.
fn fit(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

fn top_aligned(alignment: Alignment) -> TextStyle {
    TextStyleBuilder::new()
        .alignment(alignment)
        .baseline(Baseline::Top)
        .build()
}

fn draw_text(
    frame: &mut FrameBuffer,
    text: &str,
    font: &MonoFont<'_>,
    at: Point,
    color: BinaryColor,
    alignment: Alignment,
) {
    let style = MonoTextStyle::new(font, color);
    let _ = Text::with_text_style(text, at, style, top_aligned(alignment)).draw(frame);
}

fn left(frame: &mut FrameBuffer, text: &str, font: &MonoFont<'_>, x: i32, y: i32, color: BinaryColor) {
    draw_text(frame, text, font, Point::new(x, y), color, Alignment::Left);
}

fn right(frame: &mut FrameBuffer, text: &str, font: &MonoFont<'_>, x: i32, y: i32, color: BinaryColor) {
    draw_text(frame, text, font, Point::new(x, y), color, Alignment::Right);
}

fn centered(frame: &mut FrameBuffer, text: &str, font: &MonoFont<'_>, y: i32, color: BinaryColor) {
    draw_text(frame, text, font, Point::new(WIDTH as i32 / 2, y), color, Alignment::Center);
}
