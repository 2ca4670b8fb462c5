//! Pan/zoom state of the canvas view and the window → grid transform.

pub const MIN_SCALE: f32 = 1.0 / 64.0;
pub const MAX_SCALE: f32 = 256.0;

/// View transform.  Grid pixel `(gx, gy)` is drawn at window position
/// `g * scale + shift + window_size / 2`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub shift: (f32, f32),
    pub scale: f32,
    pub window_size: (f32, f32),
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            shift: (0.0, 0.0),
            scale: 1.0,
            window_size: (0.0, 0.0),
        }
    }
}

impl Viewport {
    pub fn new(window_width: f32, window_height: f32) -> Self {
        Self {
            window_size: (window_width, window_height),
            ..Self::default()
        }
    }

    fn center(&self) -> (f32, f32) {
        (self.window_size.0 * 0.5, self.window_size.1 * 0.5)
    }

    /// Window position → grid coordinate (floored, may be out of bounds).
    pub fn to_canvas_point(&self, pos: (f32, f32)) -> (i32, i32) {
        let (cx, cy) = self.center();
        let gx = (pos.0 - self.shift.0 - cx) / self.scale;
        let gy = (pos.1 - self.shift.1 - cy) / self.scale;
        (gx.floor() as i32, gy.floor() as i32)
    }

    /// Top-left window position of grid pixel `(x, y)`.
    pub fn to_window_point(&self, x: i32, y: i32) -> (f32, f32) {
        let (cx, cy) = self.center();
        (
            x as f32 * self.scale + self.shift.0 + cx,
            y as f32 * self.scale + self.shift.1 + cy,
        )
    }

    /// Double the scale, keeping the grid point under `pos` in place.
    pub fn zoom_in_at(&mut self, pos: (f32, f32)) {
        if self.scale * 2.0 > MAX_SCALE {
            return;
        }
        let (cx, cy) = self.center();
        self.shift.0 += self.shift.0 + cx - pos.0;
        self.shift.1 += self.shift.1 + cy - pos.1;
        self.scale *= 2.0;
    }

    /// Halve the scale, keeping the grid point under `pos` in place.
    pub fn zoom_out_at(&mut self, pos: (f32, f32)) {
        if self.scale * 0.5 < MIN_SCALE {
            return;
        }
        let (cx, cy) = self.center();
        self.shift.0 += (pos.0 - (self.shift.0 + cx)) * 0.5;
        self.shift.1 += (pos.1 - (self.shift.1 + cy)) * 0.5;
        self.scale *= 0.5;
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.shift.0 += dx;
        self.shift.1 += dy;
    }

    pub fn set_scale(&mut self, scale: f32) {
        if scale.is_finite() {
            self.scale = scale.clamp(MIN_SCALE, MAX_SCALE);
        }
    }

    pub fn set_window_size(&mut self, width: f32, height: f32) {
        self.window_size = (width, height);
    }

    /// Back to 1:1 with the grid origin at the window center.
    pub fn reset(&mut self) {
        self.shift = (0.0, 0.0);
        self.scale = 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_canvas_point_centered() {
        let vp = Viewport::new(200.0, 100.0);
        assert_eq!(vp.to_canvas_point((100.0, 50.0)), (0, 0));
        assert_eq!(vp.to_canvas_point((103.5, 52.0)), (3, 2));
        // Left of the origin floors towards negative infinity.
        assert_eq!(vp.to_canvas_point((99.5, 50.0)), (-1, 0));
    }

    #[test]
    fn test_to_canvas_point_scaled_and_shifted() {
        let mut vp = Viewport::new(200.0, 100.0);
        vp.set_scale(4.0);
        vp.pan_by(-40.0, -20.0);
        // Window (60, 30) is now the grid origin.
        assert_eq!(vp.to_canvas_point((60.0, 30.0)), (0, 0));
        assert_eq!(vp.to_canvas_point((67.9, 33.9)), (1, 0));
        assert_eq!(vp.to_window_point(1, 1), (64.0, 34.0));
    }

    #[test]
    fn test_zoom_keeps_point_fixed() {
        let mut vp = Viewport::new(200.0, 100.0);
        vp.pan_by(-64.0, -32.0);
        let cursor = (110.0, 58.0);
        let before = vp.to_canvas_point(cursor);

        vp.zoom_in_at(cursor);
        assert_eq!(vp.scale, 2.0);
        assert_eq!(vp.to_canvas_point(cursor), before);

        vp.zoom_in_at(cursor);
        assert_eq!(vp.to_canvas_point(cursor), before);

        vp.zoom_out_at(cursor);
        vp.zoom_out_at(cursor);
        assert_eq!(vp.scale, 1.0);
        assert_eq!(vp.to_canvas_point(cursor), before);
    }

    #[test]
    fn test_zoom_limits() {
        let mut vp = Viewport::new(10.0, 10.0);
        vp.set_scale(MAX_SCALE);
        vp.zoom_in_at((0.0, 0.0));
        assert_eq!(vp.scale, MAX_SCALE);
        vp.set_scale(MIN_SCALE);
        vp.zoom_out_at((0.0, 0.0));
        assert_eq!(vp.scale, MIN_SCALE);
    }

    #[test]
    fn test_reset() {
        let mut vp = Viewport::new(10.0, 10.0);
        vp.zoom_in_at((3.0, 3.0));
        vp.reset();
        assert_eq!(vp.shift, (0.0, 0.0));
        assert_eq!(vp.scale, 1.0);
        assert_eq!(vp.window_size, (10.0, 10.0));
    }
}
