//! Presentation surface: draws stimuli and waits for a keyed response.
//!
//! [`Screen`] is the seam the trial loop talks to. [`WindowScreen`] is the
//! real window; tests drive the loop with a scripted screen instead.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use image::RgbImage;
use image::imageops::FilterType;
use minifb::{Key, KeyRepeat, Window, WindowOptions};
use tracing::{debug, instrument};

use crate::core::types::Category;
use crate::io::config::{DisplayConfig, ResponseConfig};

/// How a wait for input ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// A response key was pressed before the deadline.
    Key(Category),
    /// The deadline passed without a response key.
    Timeout,
    /// The participant closed the window or pressed the quit key.
    Closed,
}

/// Something the trial loop can show images on and read responses from.
pub trait Screen {
    /// Draw `image` and make it visible. The deadline for the next
    /// [`wait_for_response`](Screen::wait_for_response) starts after this returns.
    fn show(&mut self, image: &Path) -> Result<()>;

    /// Block until a response key, a close request, or `timeout`.
    ///
    /// The wait ends on the first frame that carries a bound key; anything
    /// pressed afterwards within the same wait is dropped. When several
    /// bound keys arrive in one frame the window reports them in key-code
    /// order, not press order, so the lowest key code wins (with the default
    /// bindings `z` beats `/`).
    fn wait_for_response(&mut self, timeout: Duration) -> Result<WaitOutcome>;
}

impl<S: Screen + ?Sized> Screen for &mut S {
    fn show(&mut self, image: &Path) -> Result<()> {
        (**self).show(image)
    }

    fn wait_for_response(&mut self, timeout: Duration) -> Result<WaitOutcome> {
        (**self).wait_for_response(timeout)
    }
}

/// Window and image geometry for composing frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    pub width: usize,
    pub height: usize,
    pub image_width: usize,
    pub image_height: usize,
    /// `0x00RRGGBB`, the pixel format minifb expects.
    pub background: u32,
}

impl From<&DisplayConfig> for FrameLayout {
    fn from(cfg: &DisplayConfig) -> Self {
        Self {
            width: cfg.window_width,
            height: cfg.window_height,
            image_width: cfg.image_width,
            image_height: cfg.image_height,
            background: cfg.background,
        }
    }
}

impl FrameLayout {
    pub fn blank(&self) -> Vec<u32> {
        vec![self.background; self.width * self.height]
    }
}

/// Decode `path` and scale it to the layout's image size.
///
/// Scaling ignores the aspect ratio so every stimulus covers the same area.
pub fn load_image(path: &Path, layout: &FrameLayout) -> Result<RgbImage> {
    let image = image::open(path).with_context(|| format!("decode image {}", path.display()))?;
    Ok(image
        .resize_exact(
            layout.image_width as u32,
            layout.image_height as u32,
            FilterType::Triangle,
        )
        .to_rgb8())
}

/// Render `image` centered on a background-filled frame.
///
/// Pixels falling outside the frame are clipped.
pub fn compose_frame(image: &RgbImage, layout: &FrameLayout) -> Vec<u32> {
    let mut frame = layout.blank();
    let image_width = image.width() as usize;
    let image_height = image.height() as usize;
    let left = layout.width.saturating_sub(image_width) / 2;
    let top = layout.height.saturating_sub(image_height) / 2;

    for (x, y, pixel) in image.enumerate_pixels() {
        let (x, y) = (left + x as usize, top + y as usize);
        if x >= layout.width || y >= layout.height {
            continue;
        }
        let [r, g, b] = pixel.0;
        frame[y * layout.width + x] = rgb(r, g, b);
    }
    frame
}

fn rgb(r: u8, g: u8, b: u8) -> u32 {
    (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
}

/// Map a config key name to a window key.
///
/// Accepts single letters and digits, a few punctuation keys by symbol or
/// name (`/` or `slash`), and named keys such as `space` or `escape`.
/// Matching is case-insensitive.
pub fn parse_key(name: &str) -> Option<Key> {
    let key = match name.trim().to_ascii_lowercase().as_str() {
        "a" => Key::A,
        "b" => Key::B,
        "c" => Key::C,
        "d" => Key::D,
        "e" => Key::E,
        "f" => Key::F,
        "g" => Key::G,
        "h" => Key::H,
        "i" => Key::I,
        "j" => Key::J,
        "k" => Key::K,
        "l" => Key::L,
        "m" => Key::M,
        "n" => Key::N,
        "o" => Key::O,
        "p" => Key::P,
        "q" => Key::Q,
        "r" => Key::R,
        "s" => Key::S,
        "t" => Key::T,
        "u" => Key::U,
        "v" => Key::V,
        "w" => Key::W,
        "x" => Key::X,
        "y" => Key::Y,
        "z" => Key::Z,
        "0" => Key::Key0,
        "1" => Key::Key1,
        "2" => Key::Key2,
        "3" => Key::Key3,
        "4" => Key::Key4,
        "5" => Key::Key5,
        "6" => Key::Key6,
        "7" => Key::Key7,
        "8" => Key::Key8,
        "9" => Key::Key9,
        "/" | "slash" => Key::Slash,
        "\\" | "backslash" => Key::Backslash,
        "." | "period" => Key::Period,
        "," | "comma" => Key::Comma,
        ";" | "semicolon" => Key::Semicolon,
        "'" | "apostrophe" => Key::Apostrophe,
        "-" | "minus" => Key::Minus,
        "=" | "equal" => Key::Equal,
        "space" => Key::Space,
        "enter" | "return" => Key::Enter,
        "escape" | "esc" => Key::Escape,
        "left" => Key::Left,
        "right" => Key::Right,
        "up" => Key::Up,
        "down" => Key::Down,
        _ => return None,
    };
    Some(key)
}

/// Resolved key bindings for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBindings {
    pub same: Key,
    pub different: Key,
    pub quit: Key,
}

impl KeyBindings {
    pub fn from_config(cfg: &ResponseConfig) -> Result<Self> {
        let resolve = |field: &str, name: &str| {
            parse_key(name).ok_or_else(|| anyhow!("response.{field} {name:?} is not a known key"))
        };
        Ok(Self {
            same: resolve("same_key", &cfg.same_key)?,
            different: resolve("different_key", &cfg.different_key)?,
            quit: resolve("quit_key", &cfg.quit_key)?,
        })
    }

    /// What pressing `key` means, if anything.
    pub fn classify(&self, key: Key) -> Option<WaitOutcome> {
        if key == self.same {
            Some(WaitOutcome::Key(Category::Same))
        } else if key == self.different {
            Some(WaitOutcome::Key(Category::Different))
        } else if key == self.quit {
            Some(WaitOutcome::Closed)
        } else {
            None
        }
    }
}

/// A native window. The window closes when the `minifb::Window` inside is
/// dropped, on every exit path out of a session.
pub struct WindowScreen {
    window: Window,
    layout: FrameLayout,
    keys: KeyBindings,
    frame: Vec<u32>,
}

impl WindowScreen {
    #[instrument(skip_all, fields(width = display_config.window_width, height = display_config.window_height))]
    pub fn open(display_config: &DisplayConfig, response: &ResponseConfig) -> Result<Self> {
        let keys = KeyBindings::from_config(response)?;
        let layout = FrameLayout::from(display_config);
        let mut window = Window::new(
            &display_config.title,
            layout.width,
            layout.height,
            WindowOptions::default(),
        )
        .map_err(|err| anyhow!("create window: {err}"))?;
        window.set_target_fps(display_config.target_fps);

        let mut screen = Self {
            window,
            layout,
            keys,
            frame: layout.blank(),
        };
        screen.present()?;
        debug!("window opened");
        Ok(screen)
    }

    fn present(&mut self) -> Result<()> {
        self.window
            .update_with_buffer(&self.frame, self.layout.width, self.layout.height)
            .map_err(|err| anyhow!("update window: {err}"))
    }
}

impl Screen for WindowScreen {
    fn show(&mut self, image: &Path) -> Result<()> {
        let image = load_image(image, &self.layout)?;
        self.frame = compose_frame(&image, &self.layout);
        self.present()
    }

    fn wait_for_response(&mut self, timeout: Duration) -> Result<WaitOutcome> {
        let deadline = Instant::now() + timeout;
        loop {
            let open = self.window.is_open();
            let pressed = self.window.get_keys_pressed(KeyRepeat::No);
            if let Some(outcome) = poll(open, &pressed, Instant::now(), deadline, &self.keys) {
                return Ok(outcome);
            }
            // Pumps pending window events; paced by the target fps.
            self.window.update();
        }
    }
}

/// Decide one frame of a response wait.
///
/// A closed window wins over any key in the same frame, a bound key wins over
/// the deadline, and `None` means keep waiting. Within `pressed` the first
/// bound key is taken and the rest are dropped.
pub fn poll(
    open: bool,
    pressed: &[Key],
    now: Instant,
    deadline: Instant,
    keys: &KeyBindings,
) -> Option<WaitOutcome> {
    if !open {
        return Some(WaitOutcome::Closed);
    }
    if let Some(outcome) = pressed.iter().find_map(|key| keys.classify(*key)) {
        return Some(outcome);
    }
    if now >= deadline {
        return Some(WaitOutcome::Timeout);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn layout() -> FrameLayout {
        FrameLayout {
            width: 8,
            height: 6,
            image_width: 4,
            image_height: 2,
            background: 0xFF_FF_FF,
        }
    }

    #[test]
    fn centers_image_on_background() {
        let layout = layout();
        let image = RgbImage::from_pixel(4, 2, Rgb([0x12, 0x34, 0x56]));
        let frame = compose_frame(&image, &layout);
        assert_eq!(frame.len(), 48);

        for y in 0..6 {
            for x in 0..8 {
                let inside = (2..6).contains(&x) && (2..4).contains(&y);
                let expected = if inside { 0x12_34_56 } else { 0xFF_FF_FF };
                assert_eq!(frame[y * 8 + x], expected, "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn clips_oversized_image() {
        let layout = layout();
        let image = RgbImage::from_pixel(10, 10, Rgb([0, 0, 0]));
        let frame = compose_frame(&image, &layout);
        assert_eq!(frame.len(), 48);
        assert!(frame.iter().all(|pixel| *pixel == 0));
    }

    #[test]
    fn load_image_scales_to_layout() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("face.png");
        RgbImage::from_pixel(9, 7, Rgb([10, 20, 30]))
            .save(&path)
            .expect("save png");
        let image = load_image(&path, &layout()).expect("load");
        assert_eq!(image.dimensions(), (4, 2));
    }

    #[test]
    fn load_image_reports_undecodable_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("face.jpg");
        std::fs::write(&path, b"not a jpeg").expect("write");
        let err = load_image(&path, &layout()).expect_err("decode fails");
        assert!(format!("{err:#}").contains("decode image"));
    }

    #[test]
    fn parses_default_bindings() {
        let keys = KeyBindings::from_config(&ResponseConfig::default()).expect("bindings");
        assert_eq!(keys.same, Key::Slash);
        assert_eq!(keys.different, Key::Z);
        assert_eq!(keys.quit, Key::Escape);
        assert_eq!(parse_key(" Z "), Some(Key::Z));
        assert_eq!(parse_key("slash"), Some(Key::Slash));
        assert_eq!(parse_key("hyper"), None);
    }

    fn default_keys() -> KeyBindings {
        KeyBindings::from_config(&ResponseConfig::default()).expect("bindings")
    }

    #[test]
    fn poll_takes_response_key_before_deadline() {
        let now = Instant::now();
        let deadline = now + Duration::from_secs(8);
        let keys = default_keys();
        assert_eq!(
            poll(true, &[Key::A, Key::Slash], now, deadline, &keys),
            Some(WaitOutcome::Key(Category::Same))
        );
        assert_eq!(
            poll(true, &[Key::Z], now, deadline, &keys),
            Some(WaitOutcome::Key(Category::Different))
        );
    }

    #[test]
    fn poll_close_beats_key_in_same_frame() {
        let now = Instant::now();
        let keys = default_keys();
        assert_eq!(
            poll(false, &[Key::Slash], now, now + Duration::from_secs(8), &keys),
            Some(WaitOutcome::Closed)
        );
        assert_eq!(
            poll(true, &[Key::Escape, Key::Slash], now, now + Duration::from_secs(8), &keys),
            Some(WaitOutcome::Closed)
        );
    }

    #[test]
    fn poll_keeps_waiting_then_times_out() {
        let start = Instant::now();
        let deadline = start + Duration::from_millis(500);
        let keys = default_keys();
        assert_eq!(poll(true, &[], start, deadline, &keys), None);
        assert_eq!(poll(true, &[Key::A, Key::Space], start, deadline, &keys), None);
        assert_eq!(poll(true, &[], deadline, deadline, &keys), Some(WaitOutcome::Timeout));
    }

    #[test]
    fn poll_key_on_deadline_frame_still_counts() {
        let start = Instant::now();
        let deadline = start + Duration::from_millis(500);
        let late = deadline + Duration::from_millis(1);
        assert_eq!(
            poll(true, &[Key::Slash], late, deadline, &default_keys()),
            Some(WaitOutcome::Key(Category::Same))
        );
    }

    #[test]
    fn poll_first_bound_key_in_frame_wins() {
        let now = Instant::now();
        let deadline = now + Duration::from_secs(8);
        let keys = default_keys();
        assert_eq!(
            poll(true, &[Key::Z, Key::Slash], now, deadline, &keys),
            Some(WaitOutcome::Key(Category::Different))
        );
        assert_eq!(
            poll(true, &[Key::Slash, Key::Z], now, deadline, &keys),
            Some(WaitOutcome::Key(Category::Same))
        );
    }

    #[test]
    fn classifies_keys() {
        let keys = KeyBindings::from_config(&ResponseConfig::default()).expect("bindings");
        assert_eq!(
            keys.classify(Key::Slash),
            Some(WaitOutcome::Key(Category::Same))
        );
        assert_eq!(
            keys.classify(Key::Z),
            Some(WaitOutcome::Key(Category::Different))
        );
        assert_eq!(keys.classify(Key::Escape), Some(WaitOutcome::Closed));
        assert_eq!(keys.classify(Key::A), None);
    }
}
