//! # Visualizers
//!
//! The renderers that turn reactive frames into pictures. Every renderer
//! implements [`Visualizer`] and is driven through `init → update* → dispose`.
//!
//! ## Built-in Visualizers
//!
//! - **pulse**: bass-driven orb with kick rings
//! - **bars**: band meters with peak hold
//! - **particles**: onset-triggered particle bursts
//!
//! ## Usage
//!
//! ```rust,no_run
//! use reactive_reel::visuals::{Surface, VisualParams, VisualizerRegistry};
//! use reactive_reel::audio::ReactiveFrame;
//!
//! # fn main() -> reactive_reel::Result<()> {
//! let registry = VisualizerRegistry::new();
//! let mut pulse = registry.create("pulse")?;
//!
//! let mut surface = Surface::new_black(720, 1280);
//! pulse.init(&surface)?;
//! pulse.update(&mut surface, &VisualParams::default().input_for(ReactiveFrame::default()), 1.0 / 30.0)?;
//! pulse.dispose();
//! # Ok(())
//! # }
//! ```

pub mod overlay;
pub mod registry;
pub mod surface;
pub mod traits;

mod bars;
mod particles;
mod pulse;

pub use overlay::{Overlay, OverlayLayer, OverlayPosition};
pub use registry::VisualizerRegistry;
pub use surface::{scale_color, Surface};
pub use traits::{
    parse_hex_color, ControlKind, ControlSpec, ParamValue, ReactiveInput, VisualParams, Visualizer,
};

pub use bars::BarsVisualizer;
pub use particles::ParticleVisualizer;
pub use pulse::PulseVisualizer;
