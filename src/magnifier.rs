pub(crate) const ZOOM_LEVEL: f64 = 1.25;
pub(crate) const LENS_SIZE: f64 = 200.0;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct PointerPos {
    pub(crate) x_percent: f64,
    pub(crate) y_percent: f64,
    pub(crate) raw_x: f64,
    pub(crate) raw_y: f64,
}

/// Maps a client-space pointer to container-relative coordinates: raw pixel
/// offsets plus position as a percentage of the container box.
pub(crate) fn pointer_position(
    client_x: f64,
    client_y: f64,
    rect_left: f64,
    rect_top: f64,
    width: f64,
    height: f64,
) -> PointerPos {
    if width <= 0.0 || height <= 0.0 {
        return PointerPos::default();
    }
    let raw_x = client_x - rect_left;
    let raw_y = client_y - rect_top;
    PointerPos {
        x_percent: raw_x / width * 100.0,
        y_percent: raw_y / height * 100.0,
        raw_x,
        raw_y,
    }
}

/// The lens only shows when the pointer hovers the result, no conversion is
/// in flight, and both the original raster and the outline are available.
pub(crate) fn lens_visible(hovering: bool, loading: bool, has_source: bool, has_outline: bool) -> bool {
    hovering && !loading && has_source && has_outline
}

/// The lens also needs a measured container; until the stage has been
/// measured the zoomed background layers would collapse to zero width.
pub(crate) fn lens_ready(container_width: f64) -> bool {
    container_width > 0.0
}

pub(crate) fn lens_background_size(container_width: f64) -> String {
    format!("{}px auto", container_width * ZOOM_LEVEL)
}

/// Inline style for the lens overlay: a fixed-size circle centered on the
/// pointer, with the outline layered over the original raster, both zoomed
/// relative to the container width and positioned so the magnified content
/// matches the true pointer location.
pub(crate) fn lens_style(
    pos: &PointerPos,
    container_width: f64,
    outline_url: &str,
    source_url: &str,
) -> String {
    let size = lens_background_size(container_width);
    format!(
        "left: {left}px; top: {top}px; width: {lens}px; height: {lens}px; \
         background-image: url({outline_url}), url({source_url}); \
         background-size: {size}, {size}; \
         background-position: {x}% {y}%, {x}% {y}%;",
        left = pos.raw_x - LENS_SIZE * 0.5,
        top = pos.raw_y - LENS_SIZE * 0.5,
        lens = LENS_SIZE,
        x = pos.x_percent,
        y = pos.y_percent,
    )
}
