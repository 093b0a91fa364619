use image::imageops::{self, FilterType};
use image::RgbImage;

/// Packs `image` into `dst` as a `(1, side, side, 3)` RGB byte tensor.
///
/// `dst` is cleared and refilled so its allocation is reused across frames.
/// Images that are not `side` x `side` are resized first.
pub fn pack_rgb(image: &RgbImage, side: u32, dst: &mut Vec<u8>) {
    let len = side as usize * side as usize * 3;
    dst.clear();
    if image.width() == side && image.height() == side {
        dst.extend_from_slice(&image.as_raw()[..len]);
    } else {
        tracing::trace!(
            "resizing {}x{} frame to {side}x{side}",
            image.width(),
            image.height()
        );
        let resized = imageops::resize(image, side, side, FilterType::Triangle);
        dst.extend_from_slice(&resized.as_raw()[..len]);
    }
}
