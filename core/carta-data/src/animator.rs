//! Animator: steps the image and channel frames of linked controllers.

use crate::animator_type::AnimatorType;
use crate::controller::Controller;
use crate::selection::{CHANNEL, IMAGE};
use carta_object::{
    command_post_process, CartaObject, CommandRouter, Linkable, LinkableSet, ObjectContext, ObjectCore,
    ObjectError, ObjectInit, ObjectResult,
};
use carta_types::ObjectPath;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

const ANIMATORS: &str = "animators";

/// What the animator needs to know about one linked controller.
#[derive(Debug, Clone, Copy)]
struct FrameExtent {
    image_count: usize,
    channel_high_key: i64,
}

impl From<&Controller> for FrameExtent {
    fn from(controller: &Controller) -> Self {
        Self {
            image_count: controller.image_count(),
            channel_high_key: controller.channel_high_key(),
        }
    }
}

pub struct Animator {
    core: ObjectCore,
    links: LinkableSet,
    /// Animation kind to its owned [`AnimatorType`], including removed ones.
    animators: BTreeMap<String, ObjectPath>,
    commands: Arc<CommandRouter<Self>>,
}

impl Animator {
    pub const CLASS_NAME: &'static str = "Animator";

    pub fn create(init: ObjectInit) -> ObjectResult<Box<dyn CartaObject>> {
        let mut core = init.into_core(Self::CLASS_NAME);
        core.state_mut().insert_object(ANIMATORS)?;
        let links = LinkableSet::new(core.state_mut())?;

        let mut router: CommandRouter<Self> = CommandRouter::new();
        router.add_query("addAnimator", &["type"], |animator, params, ctx| {
            animator.add_animator(params.get("type"), ctx)
        });
        router.add_command("removeAnimator", &["type"], |animator, params, ctx| {
            animator.remove_animator(params.get("type"), ctx)
        });

        Ok(Box::new(Self {
            core,
            links,
            animators: BTreeMap::new(),
            commands: Arc::new(router),
        }))
    }

    /// Adds (or re-activates) the animator for `kind` and returns its path.
    pub fn add_animator(&mut self, kind: &str, ctx: &mut ObjectContext<'_>) -> ObjectResult<String> {
        if let Some(path) = self.animators.get(kind).cloned() {
            ctx.with_object::<AnimatorType, _>(&path, |animator, _| animator.set_removed(false))??;
            self.sync_animator_state(ctx)?;
            return Ok(path.to_string());
        }
        if kind != IMAGE && kind != CHANNEL {
            return Ok(command_post_process(
                self.core.path().as_str(),
                "addAnimator",
                format!("Unrecognized animation initialization type={kind}"),
            ));
        }

        let path = ctx.create(AnimatorType::CLASS_NAME)?;
        let parent = self.core.path().clone();
        ctx.with_object::<AnimatorType, _>(&path, |animator, _| animator.attach(parent, kind))??;
        self.animators.insert(kind.to_string(), path.clone());
        self.sync_animator_state(ctx)?;

        let extents = self.linked_extents(ctx, None);
        let selected = if kind == IMAGE { self.selected_image(ctx) } else { None };
        self.reset_animation_parameters(&extents, selected, ctx)?;
        debug!(animator = %self.core.path(), kind, path = %path, "Animator added");
        Ok(path.to_string())
    }

    /// Marks the animator for `kind` removed. It is kept so re-adding it
    /// restores its settings.
    pub fn remove_animator(&mut self, kind: &str, ctx: &mut ObjectContext<'_>) -> ObjectResult<String> {
        let Some(path) = self.animators.get(kind).cloned() else {
            return Ok(format!("Error removing animator; unrecognized type={kind}"));
        };
        ctx.with_object::<AnimatorType, _>(&path, |animator, _| animator.set_removed(true))??;
        self.sync_animator_state(ctx)?;
        Ok(String::new())
    }

    pub fn animator_path(&self, kind: &str) -> Option<&ObjectPath> {
        self.animators.get(kind)
    }

    /// A frame moved on one of this animator's axes.
    pub fn index_changed(&mut self, kind: &str, frame: i64, ctx: &mut ObjectContext<'_>) -> ObjectResult<()> {
        match kind {
            IMAGE => {
                let Ok(index) = usize::try_from(frame) else {
                    return Ok(());
                };
                for target in self.links.targets() {
                    ctx.with_object::<Controller, _>(target, |controller, ctx| {
                        controller.set_frame_image(index, ctx)
                    })??;
                }
                // The image axis is the caller and already sits on `index`.
                let extents = self.linked_extents(ctx, None);
                self.reset_channel_axis(&extents, ctx)
            }
            CHANNEL => {
                for target in self.links.targets() {
                    ctx.with_object::<Controller, _>(target, |controller, _| controller.set_frame_channel(frame))??;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Recomputes each axis's upper bound from the linked controllers and
    /// optionally moves the image axis to `selected_image`.
    fn reset_animation_parameters(
        &mut self,
        extents: &[FrameExtent],
        selected_image: Option<usize>,
        ctx: &mut ObjectContext<'_>,
    ) -> ObjectResult<()> {
        self.reset_image_axis(extents, selected_image, ctx)?;
        self.reset_channel_axis(extents, ctx)
    }

    fn reset_image_axis(
        &mut self,
        extents: &[FrameExtent],
        selected_image: Option<usize>,
        ctx: &mut ObjectContext<'_>,
    ) -> ObjectResult<()> {
        let Some(path) = self.animators.get(IMAGE) else {
            return Ok(());
        };
        let max_images = extents.iter().map(|e| e.image_count).max().unwrap_or(0);
        let bound = i64::try_from(max_images.saturating_sub(1)).unwrap_or(i64::MAX);
        ctx.with_object::<AnimatorType, _>(path, |animator, _| -> ObjectResult<()> {
            animator.set_upper_bound(bound)?;
            if let Some(selected) = selected_image.and_then(|s| i64::try_from(s).ok()) {
                animator.set_index(selected)?;
            }
            Ok(())
        })?
    }

    fn reset_channel_axis(&mut self, extents: &[FrameExtent], ctx: &mut ObjectContext<'_>) -> ObjectResult<()> {
        let Some(path) = self.animators.get(CHANNEL) else {
            return Ok(());
        };
        let bound = extents.iter().map(|e| e.channel_high_key).max().unwrap_or(0);
        ctx.with_object::<AnimatorType, _>(path, |animator, _| animator.set_upper_bound(bound))?
    }

    /// Extents of every linked controller. `checked_out` supplies the one
    /// controller currently borrowed by a link callback, which the context
    /// cannot see.
    fn linked_extents(&self, ctx: &ObjectContext<'_>, checked_out: Option<(&ObjectPath, &Controller)>) -> Vec<FrameExtent> {
        self.links
            .targets()
            .iter()
            .filter_map(|target| match checked_out {
                Some((path, controller)) if path == target => Some(FrameExtent::from(controller)),
                _ => ctx.get_as::<Controller>(target).map(FrameExtent::from),
            })
            .collect()
    }

    fn selected_image(&self, ctx: &ObjectContext<'_>) -> Option<usize> {
        self.links
            .targets()
            .iter()
            .filter_map(|target| ctx.get_as::<Controller>(target))
            .find_map(Controller::selected_image)
    }

    /// Mirrors the active animators into state as `animators/<kind>: path`.
    fn sync_animator_state(&mut self, ctx: &ObjectContext<'_>) -> ObjectResult<()> {
        let active: Map<String, Value> = self
            .animators
            .iter()
            .filter(|(_, path)| ctx.get_as::<AnimatorType>(path).is_some_and(|a| !a.is_removed()))
            .map(|(kind, path)| (kind.clone(), Value::String(path.to_string())))
            .collect();
        self.core.state_mut().insert_json(ANIMATORS, Value::Object(active))?;
        Ok(())
    }
}

impl CartaObject for Animator {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    /// Every animator starts with a channel axis.
    fn initialize(&mut self, ctx: &mut ObjectContext<'_>) -> ObjectResult<()> {
        self.add_animator(CHANNEL, ctx)?;
        Ok(())
    }

    fn teardown(&mut self, ctx: &mut ObjectContext<'_>) {
        for (kind, path) in std::mem::take(&mut self.animators) {
            if let Err(err) = ctx.destroy_path(&path) {
                warn!(kind = %kind, path = %path, error = %err, "Failed to destroy animator type");
            }
        }
    }

    fn invoke_command(&mut self, name: &str, raw_params: &str, ctx: &mut ObjectContext<'_>) -> ObjectResult<String> {
        let commands = Arc::clone(&self.commands);
        let path = self.core.path().to_string();
        commands.invoke(self, &path, name, raw_params, ctx)
    }

    fn as_linkable(&self) -> Option<&dyn Linkable> {
        Some(self)
    }

    fn as_linkable_mut(&mut self) -> Option<&mut dyn Linkable> {
        Some(self)
    }
}

impl Linkable for Animator {
    fn link_set(&self) -> &LinkableSet {
        &self.links
    }

    fn add_link(&mut self, target: &mut dyn CartaObject, ctx: &mut ObjectContext<'_>) -> ObjectResult<bool> {
        let path = target.path().clone();
        let Some(controller) = target.downcast_ref::<Controller>() else {
            return Err(ObjectError::InvalidTarget(format!(
                "{path}; animator only supports linking to images"
            )));
        };
        let added = self.links.add_link(self.core.state_mut(), &path)?;
        let extents = self.linked_extents(ctx, Some((&path, controller)));
        self.reset_animation_parameters(&extents, None, ctx)?;
        Ok(added)
    }

    fn remove_link(&mut self, target: &mut dyn CartaObject, ctx: &mut ObjectContext<'_>) -> ObjectResult<bool> {
        let removed = self.links.remove_link(self.core.state_mut(), target.path())?;
        if removed {
            let extents = self.linked_extents(ctx, None);
            self.reset_animation_parameters(&extents, None, ctx)?;
        }
        Ok(removed)
    }

    /// A linked controller loaded data or changed its selected image.
    fn on_link_changed(&mut self, target: &mut dyn CartaObject, ctx: &mut ObjectContext<'_>) {
        let path = target.path().clone();
        let Some(controller) = target.downcast_ref::<Controller>() else {
            return;
        };
        let selected = controller.selected_image();
        let extents = self.linked_extents(ctx, Some((&path, controller)));
        if let Err(err) = self.reset_animation_parameters(&extents, selected, ctx) {
            warn!(animator = %self.core.path(), error = %err, "Failed to reset animation parameters");
        }
    }
}
