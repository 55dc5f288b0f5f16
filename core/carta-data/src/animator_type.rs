//! One animation axis (image or channel) owned by an [`Animator`].

use crate::animator::Animator;
use carta_object::{CartaObject, CommandRouter, ObjectContext, ObjectCore, ObjectInit, ObjectResult};
use carta_types::ObjectPath;
use std::sync::Arc;

const KIND: &str = "type";
const FRAME: &str = "frame";
const FRAME_END: &str = "frameEnd";
const FRAME_STEP: &str = "frameStep";
const FRAME_RATE: &str = "frameRate";
const END_BEHAVIOR: &str = "endBehavior";
const REMOVED: &str = "removed";

const END_BEHAVIORS: &[&str] = &["Wrap", "Reverse", "Jump"];

/// Frame position and playback settings for one animation kind.
///
/// `frameEnd` is the highest valid frame index. A frame set by a remote
/// command is reported to the owning animator, which forwards it to the
/// linked controllers; a frame set by the animator itself is not echoed.
pub struct AnimatorType {
    core: ObjectCore,
    parent: Option<ObjectPath>,
    commands: Arc<CommandRouter<Self>>,
}

impl AnimatorType {
    pub const CLASS_NAME: &'static str = "AnimatorType";

    pub fn create(init: ObjectInit) -> ObjectResult<Box<dyn CartaObject>> {
        let mut core = init.into_core(Self::CLASS_NAME);
        let state = core.state_mut();
        state.insert_value(KIND, String::new())?;
        state.insert_value(FRAME, 0i64)?;
        state.insert_value(FRAME_END, 0i64)?;
        state.insert_value(FRAME_STEP, 1i64)?;
        state.insert_value(FRAME_RATE, 20i64)?;
        state.insert_value(END_BEHAVIOR, "Wrap".to_string())?;
        state.insert_value(REMOVED, false)?;
        Ok(Box::new(Self {
            core,
            parent: None,
            commands: Arc::new(Self::router()),
        }))
    }

    fn router() -> CommandRouter<Self> {
        let mut router: CommandRouter<Self> = CommandRouter::new();
        router.add_command("setFrame", &[FRAME], |animator, params, ctx| {
            match params.get(FRAME).parse::<i64>() {
                Ok(frame) => animator.set_frame(frame, ctx),
                Err(_) => Ok(format!("Animation frame must be an integer: {}", params.raw())),
            }
        });
        router.add_command("setUpperBound", &["upperBound"], |animator, params, _| {
            match params.get("upperBound").parse::<i64>() {
                Ok(bound) if bound >= 0 => {
                    animator.set_upper_bound(bound)?;
                    Ok(String::new())
                }
                _ => Ok(format!("Upper bound must be a non-negative integer: {}", params.raw())),
            }
        });
        router.add_command("setFrameStep", &[FRAME_STEP], |animator, params, _| {
            match positive(params.get(FRAME_STEP)) {
                Some(step) => {
                    animator.core.state_mut().set_value(FRAME_STEP, step)?;
                    Ok(String::new())
                }
                None => Ok(format!("Frame step must be a positive integer: {}", params.raw())),
            }
        });
        router.add_command("setFrameRate", &[FRAME_RATE], |animator, params, _| {
            match positive(params.get(FRAME_RATE)) {
                Some(rate) => {
                    animator.core.state_mut().set_value(FRAME_RATE, rate)?;
                    Ok(String::new())
                }
                None => Ok(format!("Frame rate must be a positive integer: {}", params.raw())),
            }
        });
        router.add_command("setEndBehavior", &[END_BEHAVIOR], |animator, params, _| {
            let requested = params.get(END_BEHAVIOR);
            match END_BEHAVIORS.iter().find(|b| b.eq_ignore_ascii_case(requested)) {
                Some(behavior) => {
                    animator.core.state_mut().set_value(END_BEHAVIOR, behavior.to_string())?;
                    Ok(String::new())
                }
                None => Ok(format!("Unrecognized animation end behavior: {requested}")),
            }
        });
        router
    }

    /// Binds this axis to its owning animator.
    pub fn attach(&mut self, parent: ObjectPath, kind: &str) -> ObjectResult<()> {
        self.core.state_mut().set_value(KIND, kind.to_string())?;
        self.parent = Some(parent);
        Ok(())
    }

    pub fn kind(&self) -> String {
        self.core.state().get_value(KIND).unwrap_or_default()
    }

    pub fn frame(&self) -> i64 {
        self.core.state().get_value(FRAME).unwrap_or_default()
    }

    pub fn upper_bound(&self) -> i64 {
        self.core.state().get_value(FRAME_END).unwrap_or_default()
    }

    pub fn is_removed(&self) -> bool {
        self.core.state().get_value(REMOVED).unwrap_or_default()
    }

    pub fn set_removed(&mut self, removed: bool) -> ObjectResult<()> {
        Ok(self.core.state_mut().set_value(REMOVED, removed)?)
    }

    /// Sets the highest valid frame, pulling the current frame back inside.
    pub fn set_upper_bound(&mut self, bound: i64) -> ObjectResult<()> {
        let bound = bound.max(0);
        let state = self.core.state_mut();
        state.set_value(FRAME_END, bound)?;
        if self.frame() > bound {
            self.core.state_mut().set_value(FRAME, bound)?;
        }
        Ok(())
    }

    /// Moves to `index` without notifying the owner. Out-of-range indexes
    /// are ignored.
    pub fn set_index(&mut self, index: i64) -> ObjectResult<bool> {
        if !(0..=self.upper_bound()).contains(&index) || index == self.frame() {
            return Ok(false);
        }
        self.core.state_mut().set_value(FRAME, index)?;
        Ok(true)
    }

    /// Moves to `frame` and tells the owning animator.
    pub fn set_frame(&mut self, frame: i64, ctx: &mut ObjectContext<'_>) -> ObjectResult<String> {
        let end = self.upper_bound();
        if !(0..=end).contains(&frame) {
            return Ok(format!("Animation frame {frame} out of range [0,{end}]"));
        }
        if self.set_index(frame)? {
            if let Some(parent) = self.parent.clone() {
                let kind = self.kind();
                ctx.with_object::<Animator, _>(&parent, |animator, ctx| {
                    animator.index_changed(&kind, frame, ctx)
                })??;
            }
        }
        Ok(String::new())
    }
}

fn positive(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().filter(|value| *value > 0)
}

impl CartaObject for AnimatorType {
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
