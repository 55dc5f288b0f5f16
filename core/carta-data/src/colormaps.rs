//! Singleton table of known colormap names.

use carta_hooks::HookRequest;
use carta_hooks::hooks::ColormapNamesHook;
use carta_object::{CartaObject, ObjectContext, ObjectCore, ObjectInit, ObjectResult};
use serde_json::json;
use tracing::debug;

const MAPS: &str = "maps";

/// Names every server knows without plugins.
const BUILTIN_MAPS: &[&str] = &[
    "Gray", "Heat", "Rainbow", "Hot", "Cool", "Jet", "Cubehelix", "Spring", "Summer", "Autumn",
    "Winter", "Bone", "Copper", "Pink",
];

pub struct Colormaps {
    core: ObjectCore,
    names: Vec<String>,
}

impl Colormaps {
    pub const CLASS_NAME: &'static str = "Colormaps";

    pub fn create(init: ObjectInit) -> ObjectResult<Box<dyn CartaObject>> {
        Ok(Box::new(Self {
            core: init.into_core(Self::CLASS_NAME),
            names: BUILTIN_MAPS.iter().map(|name| name.to_string()).collect(),
        }))
    }

    pub fn is_map(&self, name: &str) -> bool {
        self.names.iter().any(|known| known == name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl CartaObject for Colormaps {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    /// Adds names contributed by plugins after the built-in ones.
    fn initialize(&mut self, ctx: &mut ObjectContext<'_>) -> ObjectResult<()> {
        let mut request = HookRequest::<ColormapNamesHook>::new(());
        let contributors = ctx.hooks().broadcast(&mut request);
        for name in request.into_output().unwrap_or_default() {
            if !self.is_map(&name) {
                self.names.push(name);
            }
        }
        debug!(maps = self.names.len(), contributors, "Colormap names loaded");
        self.core.state_mut().insert_json(MAPS, json!(self.names))?;
        Ok(())
    }
}
