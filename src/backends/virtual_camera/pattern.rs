// SPDX-License-Identifier: GPL-3.0-only

//! Synthetic NV12 test pattern
//!
//! Eight vertical colour bars with a sweeping luminance marker. Zoom is
//! rendered as a centre crop of the pattern; the torch lifts luminance.

/// BT.601 limited-range YUV of white, yellow, cyan, green, magenta, red, blue, black
const BARS: [(u8, u8, u8); 8] = [
    (235, 128, 128),
    (210, 16, 146),
    (170, 166, 16),
    (145, 54, 34),
    (106, 202, 222),
    (81, 90, 240),
    (41, 240, 110),
    (16, 128, 128),
];

/// Luma added while the torch is on
pub const TORCH_BOOST: u8 = 40;

/// Inputs for one rendered frame
#[derive(Debug, Clone, Copy)]
pub struct PatternParams {
    pub width: u32,
    pub height: u32,
    /// Crop ratio, 1.0 shows the whole pattern
    pub zoom_ratio: f32,
    pub torch: bool,
    /// Frame counter driving the marker position
    pub tick: u64,
}

/// Map an output coordinate to pattern space for a centre crop
fn source_coord(pos: u32, extent: u32, ratio: f32) -> u32 {
    let centre = extent as f32 / 2.0;
    let src = centre + (pos as f32 + 0.5 - centre) / ratio;
    (src.max(0.0) as u32).min(extent.saturating_sub(1))
}

fn bar_at(src_x: u32, width: u32) -> (u8, u8, u8) {
    let index = (src_x as usize * BARS.len()) / width.max(1) as usize;
    BARS[index.min(BARS.len() - 1)]
}

/// Render a tightly packed NV12 frame (`width * height * 3 / 2` bytes)
pub fn render_nv12(params: &PatternParams) -> Vec<u8> {
    let PatternParams {
        width,
        height,
        zoom_ratio,
        torch,
        tick,
    } = *params;
    let ratio = zoom_ratio.max(1.0);
    let w = width as usize;
    let h = height as usize;
    let mut data = vec![0u8; w * h + w * (h / 2)];

    let marker_x = (tick.wrapping_mul(8) % width.max(1) as u64) as u32;
    let boost = if torch { TORCH_BOOST } else { 0 };

    let src_xs: Vec<u32> = (0..width).map(|x| source_coord(x, width, ratio)).collect();

    let (y_plane, uv_plane) = data.split_at_mut(w * h);
    for y in 0..h {
        let row = &mut y_plane[y * w..(y + 1) * w];
        for (x, out) in row.iter_mut().enumerate() {
            let src_x = src_xs[x];
            let luma = if src_x.abs_diff(marker_x) < 2 {
                255
            } else {
                bar_at(src_x, width).0
            };
            *out = luma.saturating_add(boost);
        }
    }

    for cy in 0..h / 2 {
        let row = &mut uv_plane[cy * w..(cy + 1) * w];
        for cx in 0..w / 2 {
            let (_, u, v) = bar_at(src_xs[cx * 2], width);
            row[cx * 2] = u;
            row[cx * 2 + 1] = v;
        }
    }

    data
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(zoom_ratio: f32, torch: bool) -> PatternParams {
        PatternParams {
            width: 64,
            height: 16,
            zoom_ratio,
            torch,
            tick: 1,
        }
    }

    #[test]
    fn test_frame_size() {
        let frame = render_nv12(&params(1.0, false));
        assert_eq!(frame.len(), 64 * 16 * 3 / 2);
    }

    #[test]
    fn test_zoom_narrows_field_of_view() {
        let full = render_nv12(&params(1.0, false));
        let zoomed = render_nv12(&params(4.0, false));
        // Leftmost column: white bar at 1x, a middle bar when zoomed in
        assert_eq!(full[0], BARS[0].0);
        assert_ne!(zoomed[0], BARS[0].0);
    }

    #[test]
    fn test_torch_brightens() {
        let dark = render_nv12(&params(1.0, false));
        let lit = render_nv12(&params(1.0, true));
        let sum = |data: &[u8]| data[..64 * 16].iter().map(|&b| b as u64).sum::<u64>();
        assert!(sum(&lit) > sum(&dark));
    }
}
