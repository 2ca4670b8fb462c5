use image::Rgba;

use crate::canvas::PixelGrid;
use crate::viewport::Viewport;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash)]
pub enum Tool {
    #[default]
    Pen,
    Stroke,
    Picker,
    Fill,
}

impl Tool {
    pub fn all() -> &'static [Tool] {
        &[Tool::Pen, Tool::Stroke, Tool::Picker, Tool::Fill]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Tool::Pen => "pen",
            Tool::Stroke => "stroke",
            Tool::Picker => "picker",
            Tool::Fill => "fill",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Direct-draw tools mutate the active layer as the pointer moves.
    /// The others draw into the preview grid, which is reset from the active
    /// layer before every update and committed on pointer-up.
    pub fn is_direct_draw(&self) -> bool {
        !matches!(self, Tool::Stroke)
    }

    /// Run one tool step against `ctx.target`.
    pub fn apply(&self, ctx: &mut ToolContext<'_>, mouse: &MouseState, color: Rgba<u8>) -> ToolOutcome {
        let (cx, cy) = ctx.viewport.to_canvas_point(mouse.current_pos);
        match self {
            Tool::Pen => {
                // Connect to the previous sample so fast moves leave no holes
                let (px, py) = ctx.viewport.to_canvas_point(mouse.prev_pos);
                let mut plotted = ctx.target.set_pixel_checked(cx, cy, color) as usize;
                plotted += ctx.target.draw_line(px, py, cx, cy, color);
                ToolOutcome::modified_if(plotted > 0)
            }
            Tool::Stroke => {
                // Start point is stored in grid space so zooming mid-gesture
                // does not move it.
                let (sx, sy) = mouse.canvas_start_pos;
                let plotted = ctx.target.draw_line(sx, sy, cx, cy, color);
                ToolOutcome::modified_if(plotted > 0)
            }
            Tool::Picker => match ctx.target.get_pixel_checked(cx, cy) {
                Some(picked) => ToolOutcome::ColorPicked(picked),
                None => ToolOutcome::Unchanged,
            },
            Tool::Fill => {
                let filled = ctx.target.fill(cx, cy, color);
                ToolOutcome::modified_if(filled > 0)
            }
        }
    }
}

/// What one tool step did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolOutcome {
    Unchanged,
    Modified,
    ColorPicked(Rgba<u8>),
}

impl ToolOutcome {
    fn modified_if(changed: bool) -> Self {
        if changed {
            ToolOutcome::Modified
        } else {
            ToolOutcome::Unchanged
        }
    }
}

/// Grid a tool step writes to, plus the view used to map pointer positions.
pub struct ToolContext<'a> {
    pub target: &'a mut PixelGrid,
    pub viewport: &'a Viewport,
}

/// Pointer state carried across a gesture.  Positions are window-space;
/// `canvas_start_pos` is already converted to grid space at press time.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct MouseState {
    pub pressed: bool,
    pub current_pos: (f32, f32),
    pub prev_pos: (f32, f32),
    pub canvas_start_pos: (i32, i32),
}

impl MouseState {
    /// Shift `current_pos` into `prev_pos` and record a new sample.
    pub fn advance(&mut self, pos: (f32, f32)) {
        self.prev_pos = self.current_pos;
        self.current_pos = pos;
    }
}
