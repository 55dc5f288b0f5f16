//! Per-colormap preferences panel state.

use carta_object::{CartaObject, CommandRouter, ObjectContext, ObjectCore, ObjectInit, ObjectResult};
use std::sync::Arc;

const VISIBLE: &str = "visible";

pub struct Settings {
    core: ObjectCore,
    commands: Arc<CommandRouter<Self>>,
}

impl Settings {
    pub const CLASS_NAME: &'static str = "Settings";

    pub fn create(init: ObjectInit) -> ObjectResult<Box<dyn CartaObject>> {
        let mut core = init.into_core(Self::CLASS_NAME);
        core.state_mut().insert_value(VISIBLE, false)?;

        let mut router: CommandRouter<Self> = CommandRouter::new();
        router.add_command("setVisible", &[VISIBLE], |settings, params, _| {
            let Some(visible) = params.get_bool(VISIBLE) else {
                return Ok(format!("Settings visibility must be true/false: {}", params.raw()));
            };
            settings.core.state_mut().set_value(VISIBLE, visible)?;
            Ok(String::new())
        });

        Ok(Box::new(Self {
            core,
            commands: Arc::new(router),
        }))
    }

    pub fn is_visible(&self) -> bool {
        self.core.state().get_value(VISIBLE).unwrap_or_default()
    }
}

impl CartaObject for Settings {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn invoke_command(&mut self, name: &str, raw_params: &str, ctx: &mut ObjectContext<'_>) -> ObjectResult<String> {
        let commands = Arc::clone(&self.commands);
        let path = self.core.path().to_string();
        commands.invoke(self, &path, name, raw_params, ctx)
    }
}
