//! Shared filesystem fixtures for tests: scoped temp directories and
//! writers for the on-disk font layout the resolver expects.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use image::{Rgba, RgbaImage};

static NEXT: AtomicUsize = AtomicUsize::new(0);

pub struct TempDir(PathBuf);

impl TempDir {
    pub fn new(tag: &str) -> TempDir {
        let _ = env_logger::builder().is_test(true).try_init();
        let path = std::env::temp_dir().join(format!(
            "pixfont-{}-{}-{}",
            tag,
            std::process::id(),
            NEXT.fetch_add(1, Ordering::Relaxed)
        ));
        fs::create_dir_all(&path).unwrap();
        TempDir(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.0);
    }
}

/// Write `{root}/{name}/{height}{infix}.txt` with the given text.
pub fn write_info_file(root: &Path, name: &str, height: i32, infix: &str, text: &str) {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(format!("{}{}.txt", height, infix)), text).unwrap();
}

/// Write a black-on-white glyph sheet at
/// `{root}/{name}/{height}{infix}/{base:08x}.png` with the given cell
/// geometry. Every cell gets a one-pixel stroke so the sheet indexes
/// to a two-colour greyscale palette.
pub fn write_plain_sheet(
    root: &Path,
    name: &str,
    height: i32,
    infix: &str,
    base: u32,
    cell_w: u32,
    cell_h: u32,
) {
    let dir = root.join(name).join(format!("{}{}", height, infix));
    fs::create_dir_all(&dir).unwrap();
    let mut img = RgbaImage::from_pixel(cell_w * 32, cell_h * 8, Rgba([255, 255, 255, 255]));
    for row in 0..8 {
        for col in 0..32 {
            img.put_pixel(col * cell_w + 1, row * cell_h + 1, Rgba([0, 0, 0, 255]));
        }
    }
    img.save(dir.join(format!("{:08x}.png", base))).unwrap();
}
