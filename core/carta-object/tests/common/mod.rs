#![allow(dead_code)]

use carta_hooks::HookDispatcher;
use carta_object::{
    CartaObject, CommandRouter, Linkable, LinkableSet, ObjectContext, ObjectCore, ObjectError,
    ObjectInit, ObjectRegistry, ObjectResult, RegistryConfig,
};
use carta_state::{StateSink, StateUpdate};
use carta_types::ObjectPath;
use std::sync::{Arc, Mutex};

/// Linkable test object holding one integer level.
pub struct Probe {
    core: ObjectCore,
    links: LinkableSet,
    commands: Arc<CommandRouter<Probe>>,
    pub changes_seen: usize,
}

impl Probe {
    pub const CLASS: &'static str = "Probe";

    pub fn factory(init: ObjectInit) -> ObjectResult<Box<dyn CartaObject>> {
        let mut core = init.into_core(Self::CLASS);
        core.state_mut().insert_value("level", 0i64)?;
        let links = LinkableSet::new(core.state_mut())?;
        Ok(Box::new(Self {
            core,
            links,
            commands: Arc::new(Self::router()),
            changes_seen: 0,
        }))
    }

    pub fn router() -> CommandRouter<Self> {
        let mut router: CommandRouter<Self> = CommandRouter::new();
        router.add_command("setLevel", &["level"], |probe, params, ctx| {
            let Some(level) = params.get_i32("level") else {
                return Ok(format!("Invalid level: {}", params.raw()));
            };
            if level < 0 {
                return Ok("level must be non-negative".to_string());
            }
            probe.core.state_mut().set_value("level", i64::from(level))?;
            let path = probe.core.path().clone();
            ctx.notify_changed(&path);
            Ok(String::new())
        });
        router.add_query("getLevel", &[], |probe, _, _| {
            Ok(probe.core.state().get_value::<i64>("level")?.to_string())
        });
        router
    }

    pub fn level(&self) -> i64 {
        self.core.state().get_value("level").unwrap_or_default()
    }
}

impl CartaObject for Probe {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn invoke_command(&mut self, name: &str, raw: &str, ctx: &mut ObjectContext<'_>) -> ObjectResult<String> {
        let commands = Arc::clone(&self.commands);
        let path = self.core.path().to_string();
        commands.invoke(self, &path, name, raw, ctx)
    }

    fn as_linkable(&self) -> Option<&dyn Linkable> {
        Some(self)
    }

    fn as_linkable_mut(&mut self) -> Option<&mut dyn Linkable> {
        Some(self)
    }
}

impl Linkable for Probe {
    fn link_set(&self) -> &LinkableSet {
        &self.links
    }

    fn add_link(&mut self, target: &mut dyn CartaObject, _ctx: &mut ObjectContext<'_>) -> ObjectResult<bool> {
        if !target.is::<Probe>() {
            return Err(ObjectError::InvalidTarget(target.path().to_string()));
        }
        self.links.add_link(self.core.state_mut(), target.path())
    }

    fn remove_link(&mut self, target: &mut dyn CartaObject, _ctx: &mut ObjectContext<'_>) -> ObjectResult<bool> {
        self.links.remove_link(self.core.state_mut(), target.path())
    }

    fn on_link_changed(&mut self, target: &mut dyn CartaObject, _ctx: &mut ObjectContext<'_>) {
        self.changes_seen += 1;
        let level = target.state().get_value::<i64>("level").unwrap_or_default();
        self.core.state_mut().insert_value("seenLevel", level).unwrap();
    }
}

/// Object with no commands and no links.
pub struct Plain {
    core: ObjectCore,
}

impl Plain {
    pub const CLASS: &'static str = "Plain";

    pub fn factory(init: ObjectInit) -> ObjectResult<Box<dyn CartaObject>> {
        Ok(Box::new(Self {
            core: init.into_core(Self::CLASS),
        }))
    }
}

impl CartaObject for Plain {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }
}

/// Owns one `Probe` child for its whole lifetime.
pub struct Parent {
    core: ObjectCore,
    pub child: Option<ObjectPath>,
}

impl Parent {
    pub const CLASS: &'static str = "Parent";

    pub fn factory(init: ObjectInit) -> ObjectResult<Box<dyn CartaObject>> {
        Ok(Box::new(Self {
            core: init.into_core(Self::CLASS),
            child: None,
        }))
    }
}

impl CartaObject for Parent {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn initialize(&mut self, ctx: &mut ObjectContext<'_>) -> ObjectResult<()> {
        let child = ctx.create(Probe::CLASS)?;
        self.core.state_mut().insert_value("child", child.to_string())?;
        self.child = Some(child);
        Ok(())
    }

    fn teardown(&mut self, ctx: &mut ObjectContext<'_>) {
        if let Some(child) = self.child.take() {
            ctx.destroy_path(&child).unwrap();
        }
    }
}

/// Collects every published update.
#[derive(Default)]
pub struct RecordingSink {
    pub updates: Mutex<Vec<StateUpdate>>,
}

impl StateSink for RecordingSink {
    fn publish(&self, update: &StateUpdate) {
        self.updates.lock().unwrap().push(update.clone());
    }
}

pub fn registry_with_sink(sink: Arc<dyn StateSink>) -> ObjectRegistry {
    let mut registry =
        ObjectRegistry::new(RegistryConfig::default(), Arc::new(HookDispatcher::new()), sink).unwrap();
    registry.register_factory(Probe::CLASS, Probe::factory);
    registry.register_factory(Plain::CLASS, Plain::factory);
    registry.register_factory(Parent::CLASS, Parent::factory);
    registry
}

pub fn registry() -> ObjectRegistry {
    registry_with_sink(Arc::new(carta_state::NullSink))
}
