//! Pure calculation functions for thumbnail dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Scale `original` so its longer edge equals `max_edge`, preserving aspect.
///
/// The shorter edge is scaled proportionally and truncated, never below 1px.
/// Square images are treated like portraits (height is the longer edge).
/// Images smaller than `max_edge` are scaled up.
///
/// # Examples
/// ```
/// # use photosync::imaging::fit_longer_edge;
/// assert_eq!(fit_longer_edge((4000, 3000), 300), (300, 225));
/// assert_eq!(fit_longer_edge((3000, 4000), 300), (225, 300));
/// ```
pub fn fit_longer_edge(original: (u32, u32), max_edge: u32) -> (u32, u32) {
    let (w, h) = original;
    if w == 0 || h == 0 {
        return (max_edge.max(1), max_edge.max(1));
    }

    if w > h {
        let scaled = (h as f64 * (max_edge as f64 / w as f64)) as u32;
        (max_edge, scaled.max(1))
    } else {
        let scaled = (w as f64 * (max_edge as f64 / h as f64)) as u32;
        (scaled.max(1), max_edge)
    }
}
