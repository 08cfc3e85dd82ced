use std::borrow::Cow;

use anyhow::{anyhow, Context, Result};
use arboard::{Clipboard, ImageData};
use image::RgbaImage;

/// `Ok(None)` when the clipboard holds no image.
pub fn read_image_from_clipboard() -> Result<Option<RgbaImage>> {
    let mut clipboard = Clipboard::new().context("cannot initialize clipboard")?;
    let data = match clipboard.get_image() {
        Ok(data) => data,
        Err(arboard::Error::ContentNotAvailable) => return Ok(None),
        Err(err) => return Err(err).context("cannot read clipboard image"),
    };
    image_from_clipboard_data(data).map(Some)
}

pub fn write_image_to_clipboard(image: &RgbaImage) -> Result<()> {
    let mut clipboard = Clipboard::new().context("cannot initialize clipboard")?;
    clipboard
        .set_image(ImageData {
            width: image.width() as usize,
            height: image.height() as usize,
            bytes: Cow::Borrowed(image.as_raw()),
        })
        .context("cannot write image to clipboard")
}

fn image_from_clipboard_data(data: ImageData<'_>) -> Result<RgbaImage> {
    let width = u32::try_from(data.width).context("clipboard image too wide")?;
    let height = u32::try_from(data.height).context("clipboard image too tall")?;
    RgbaImage::from_raw(width, height, data.bytes.into_owned())
        .ok_or_else(|| anyhow!("clipboard image has invalid shape"))
}
