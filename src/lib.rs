//! PixelForge: layered raster pixel-art editing engine.
//!
//! The editing core ([`project::Project`]) owns a stack of RGBA layers, a
//! preview buffer for tools that show their result before committing, a
//! snapshot history and the view transform.  Front ends feed it pointer
//! events and read back flattened RGBA buffers.

pub mod canvas;
pub mod cli;
pub mod components;
pub mod compositor;
pub mod io;
pub mod logger;
pub mod ops;
pub mod project;
pub mod settings;
pub mod viewport;

pub use canvas::{BlendMode, CanvasError, CanvasState, Layer, PixelGrid};
pub use components::history::{CanvasSnapshot, HistoryEntry, HistoryManager};
pub use components::layers::LayerManager;
pub use components::tools::{MouseState, Tool, ToolOutcome};
pub use io::{ImageIoError, SaveFormat};
pub use project::Project;
pub use settings::EngineSettings;
pub use viewport::Viewport;
