//! Viewer objects built on the CARTA object model.
//!
//! These are the concrete classes a viewer session is made of. A
//! [`Controller`] stands for one image view and is the link target for the
//! objects that configure it: a [`Colormap`] pushes color settings to its
//! linked controllers, an [`Animator`] steps their image and channel frames.
//! [`Colormaps`] and [`TransformsData`] are singleton lookup tables, and
//! [`Histogram`] forwards to whichever plugin implements the histogram hook.

mod animator;
mod animator_type;
mod colormap;
mod colormaps;
mod controller;
mod histogram;
mod settings;
mod transforms;
mod util;

pub use animator::Animator;
pub use animator_type::AnimatorType;
pub use colormap::Colormap;
pub use colormaps::Colormaps;
pub use controller::Controller;
pub use histogram::Histogram;
pub use settings::Settings;
pub use transforms::TransformsData;
pub use util::{gamma_from_scales, round_to_digits};

use carta_object::ObjectRegistry;
use tracing::debug;

/// Animation kinds an [`Animator`] can drive.
pub mod selection {
    pub const IMAGE: &str = "image";
    pub const CHANNEL: &str = "channel";
}

/// Registers every viewer class with `registry`.
pub fn initialize(registry: &mut ObjectRegistry) {
    registry.register_factory(Controller::CLASS_NAME, Controller::create);
    registry.register_factory(Colormap::CLASS_NAME, Colormap::create);
    registry.register_factory(Colormaps::CLASS_NAME, Colormaps::create);
    registry.register_factory(TransformsData::CLASS_NAME, TransformsData::create);
    registry.register_factory(Settings::CLASS_NAME, Settings::create);
    registry.register_factory(Animator::CLASS_NAME, Animator::create);
    registry.register_factory(AnimatorType::CLASS_NAME, AnimatorType::create);
    registry.register_factory(Histogram::CLASS_NAME, Histogram::create);
    debug!(classes = registry.class_names().len(), "Viewer classes registered");
}
