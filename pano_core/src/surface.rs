//! Off-screen surfaces and the seam to the host's live render target.

use crate::error::{CoreError, Result};

/// RGBA, one byte per channel.
pub const BYTES_PER_PIXEL: usize = 4;

/// Largest view edge we will back with an off-screen surface. Requests beyond
/// this fail the allocation, which the transition engine degrades from.
pub const MAX_VIEW_EDGE: u32 = 8192;

/// An owned off-screen pixel buffer. Dropping the surface releases it; there
/// is no other lifetime to manage.
#[derive(Debug, Clone)]
pub struct Surface {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Surface {
    pub fn allocate(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 || width > MAX_VIEW_EDGE || height > MAX_VIEW_EDGE {
            return Err(CoreError::SurfaceAlloc {
                width,
                height,
                reason: "view size out of range".to_string(),
            });
        }
        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|area| area.checked_mul(BYTES_PER_PIXEL))
            .ok_or_else(|| CoreError::SurfaceAlloc {
                width,
                height,
                reason: "pixel count overflow".to_string(),
            })?;
        Ok(Surface {
            width,
            height,
            pixels: vec![0u8; len],
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    pub fn fill(&mut self, rgba: [u8; 4]) {
        for pixel in self.pixels.chunks_exact_mut(BYTES_PER_PIXEL) {
            pixel.copy_from_slice(&rgba);
        }
    }
}

/// Where the host is currently sending rendered frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTarget {
    Screen,
    Offscreen,
}

/// Adapter for the host scene/render loop. The core snapshots the live view
/// through it, parks rendering off-screen for the length of a transition and
/// hands finished transition frames back for presentation.
pub trait RenderHost {
    fn view_size(&self) -> (u32, u32);
    fn render_target(&self) -> RenderTarget;
    fn snapshot_view(&mut self, into: &mut Surface);
    fn redirect_offscreen(&mut self);
    fn restore_screen(&mut self);
    fn present_frame(&mut self, _frame: &Surface) {}
}

/// Host with a fixed view that renders a solid color. Enough to drive the
/// transition protocol headlessly.
#[derive(Debug)]
pub struct PlainViewHost {
    width: u32,
    height: u32,
    view_color: [u8; 4],
    target: RenderTarget,
    frames_presented: u64,
}

impl PlainViewHost {
    pub fn new(width: u32, height: u32, view_color: [u8; 4]) -> Self {
        PlainViewHost {
            width,
            height,
            view_color,
            target: RenderTarget::Screen,
            frames_presented: 0,
        }
    }

    pub fn set_view_color(&mut self, view_color: [u8; 4]) {
        self.view_color = view_color;
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }
}

impl RenderHost for PlainViewHost {
    fn view_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn render_target(&self) -> RenderTarget {
        self.target
    }

    fn snapshot_view(&mut self, into: &mut Surface) {
        into.fill(self.view_color);
    }

    fn redirect_offscreen(&mut self) {
        self.target = RenderTarget::Offscreen;
    }

    fn restore_screen(&mut self) {
        self.target = RenderTarget::Screen;
    }

    fn present_frame(&mut self, _frame: &Surface) {
        self.frames_presented += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::{RenderHost, RenderTarget, PlainViewHost, Surface, BYTES_PER_PIXEL, MAX_VIEW_EDGE};

    #[test]
    fn allocation_matches_view_size() {
        let surface = Surface::allocate(320, 240).expect("surface");
        assert_eq!(
            surface.pixels().len(),
            320 * 240 * BYTES_PER_PIXEL
        );
    }

    #[test]
    fn out_of_range_views_fail_allocation() {
        assert!(Surface::allocate(0, 240).is_err());
        assert!(Surface::allocate(320, 0).is_err());
        assert!(Surface::allocate(MAX_VIEW_EDGE + 1, 240).is_err());
    }

    #[test]
    fn plain_host_round_trips_the_render_target() {
        let mut host = PlainViewHost::new(64, 64, [10, 20, 30, 255]);
        assert_eq!(host.render_target(), RenderTarget::Screen);
        host.redirect_offscreen();
        assert_eq!(host.render_target(), RenderTarget::Offscreen);
        host.restore_screen();
        assert_eq!(host.render_target(), RenderTarget::Screen);

        let mut snap = Surface::allocate(64, 64).expect("surface");
        host.snapshot_view(&mut snap);
        assert_eq!(&snap.pixels()[..4], &[10, 20, 30, 255]);
    }
}
