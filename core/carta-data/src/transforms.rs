//! Singleton table of data transforms.

use carta_object::{CartaObject, ObjectCore, ObjectInit, ObjectResult};
use serde_json::json;

const DATA_TRANSFORMS: &str = "dataTransforms";

const TRANSFORMS: &[&str] = &["None", "Square Root", "Logarithm", "Polynomial"];

pub struct TransformsData {
    core: ObjectCore,
}

impl TransformsData {
    pub const CLASS_NAME: &'static str = "TransformsData";

    pub fn create(init: ObjectInit) -> ObjectResult<Box<dyn CartaObject>> {
        let mut core = init.into_core(Self::CLASS_NAME);
        core.state_mut().insert_json(DATA_TRANSFORMS, json!(TRANSFORMS))?;
        Ok(Box::new(Self { core }))
    }

    /// Canonical name of a transform, matched case-insensitively.
    pub fn canonical(&self, name: &str) -> Option<&'static str> {
        TRANSFORMS
            .iter()
            .copied()
            .find(|transform| transform.eq_ignore_ascii_case(name.trim()))
    }

    pub fn transforms(&self) -> &'static [&'static str] {
        TRANSFORMS
    }
}

impl CartaObject for TransformsData {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }
}
