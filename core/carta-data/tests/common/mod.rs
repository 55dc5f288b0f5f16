#![allow(dead_code)]

use carta_hooks::HookDispatcher;
use carta_object::{ObjectRegistry, RegistryConfig};
use carta_state::NullSink;
use carta_types::ObjectPath;
use std::sync::Arc;

pub fn registry_with_hooks(hooks: HookDispatcher) -> ObjectRegistry {
    let mut registry = ObjectRegistry::new(RegistryConfig::default(), Arc::new(hooks), Arc::new(NullSink)).unwrap();
    carta_data::initialize(&mut registry);
    registry
}

pub fn registry() -> ObjectRegistry {
    registry_with_hooks(HookDispatcher::new())
}

/// Creates a controller and loads one image per entry in `channels`.
pub fn controller_with_images(registry: &mut ObjectRegistry, channels: &[usize]) -> ObjectPath {
    let controller = registry.create(carta_data::Controller::CLASS_NAME).unwrap();
    for (index, count) in channels.iter().enumerate() {
        let result = registry
            .dispatch(&controller, "loadImage", &format!("name:image{index}.fits,channels:{count}"), None)
            .unwrap();
        assert_eq!(result, "");
    }
    controller
}
