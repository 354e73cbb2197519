//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Height for `target_width` that preserves the source aspect ratio.
///
/// Never returns 0: a 1px-wide rendition of a panorama still gets one row.
///
/// # Examples
/// ```
/// # use picset::imaging::calculate_scaled_height;
/// // 3:2 landscape at 400px wide → 267px tall
/// assert_eq!(calculate_scaled_height((3000, 2000), 400), 267);
///
/// // Upscaling keeps the ratio too
/// assert_eq!(calculate_scaled_height((1000, 500), 4000), 2000);
/// ```
pub fn calculate_scaled_height(source: (u32, u32), target_width: u32) -> u32 {
    let (src_w, src_h) = source;
    if src_w == 0 {
        return src_h.max(1);
    }
    let h = (target_width as f64 * src_h as f64 / src_w as f64).round() as u32;
    h.max(1)
}
