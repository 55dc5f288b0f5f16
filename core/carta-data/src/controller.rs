//! Image controller: the link target colormaps and animators configure.

use carta_object::{CartaObject, CommandRouter, ObjectContext, ObjectCore, ObjectInit, ObjectResult};
use std::sync::Arc;

const IMAGES: &str = "images";
const SELECTED_IMAGE: &str = "selectedImage";
const CHANNEL: &str = "channel";
const CHANNEL_FRAME: &str = "channel/frame";
const CHANNEL_HIGH_KEY: &str = "channel/highKey";
const COLOR: &str = "color";
const COLOR_MAP: &str = "color/colorMapName";
const COLOR_INVERT: &str = "color/invert";
const COLOR_REVERSE: &str = "color/reverse";
const COLOR_MIX: &str = "color/colorMix";
const COLOR_RED: &str = "color/colorMix/redPercent";
const COLOR_GREEN: &str = "color/colorMix/greenPercent";
const COLOR_BLUE: &str = "color/colorMix/bluePercent";
const COLOR_GAMMA: &str = "color/gamma";
const COLOR_TRANSFORM: &str = "color/dataTransform";

/// One image view.
///
/// Holds the list of loaded images with their channel counts, the selected
/// image and channel frame, and the color settings pushed to it by a linked
/// colormap. Loading an image or changing the selected image reports a
/// change, which linked hosts react to.
pub struct Controller {
    core: ObjectCore,
    channel_counts: Vec<usize>,
    commands: Arc<CommandRouter<Self>>,
}

impl Controller {
    pub const CLASS_NAME: &'static str = "Controller";

    pub fn create(init: ObjectInit) -> ObjectResult<Box<dyn CartaObject>> {
        let mut core = init.into_core(Self::CLASS_NAME);
        let state = core.state_mut();
        state.insert_array(IMAGES, 0)?;
        state.insert_value(SELECTED_IMAGE, -1i64)?;
        state.insert_object(CHANNEL)?;
        state.insert_value(CHANNEL_FRAME, 0i64)?;
        state.insert_value(CHANNEL_HIGH_KEY, 0i64)?;
        state.insert_object(COLOR)?;
        state.insert_value(COLOR_MAP, "Gray".to_string())?;
        state.insert_value(COLOR_INVERT, false)?;
        state.insert_value(COLOR_REVERSE, false)?;
        state.insert_object(COLOR_MIX)?;
        state.insert_value(COLOR_RED, 1.0)?;
        state.insert_value(COLOR_GREEN, 1.0)?;
        state.insert_value(COLOR_BLUE, 1.0)?;
        state.insert_value(COLOR_GAMMA, 1.0)?;
        state.insert_value(COLOR_TRANSFORM, "None".to_string())?;
        Ok(Box::new(Self {
            core,
            channel_counts: Vec::new(),
            commands: Arc::new(Self::router()),
        }))
    }

    fn router() -> CommandRouter<Self> {
        let mut router: CommandRouter<Self> = CommandRouter::new();
        router.add_command("loadImage", &["name", "channels"], |controller, params, ctx| {
            let name = params.get("name");
            if name.is_empty() {
                return Ok(format!("Image name is required: {}", params.raw()));
            }
            let channels = if params.contains("channels") {
                match params.get("channels").parse::<usize>() {
                    Ok(channels) if channels > 0 => channels,
                    _ => return Ok(format!("Channel count must be a positive integer: {}", params.raw())),
                }
            } else {
                1
            };
            controller.load_image(name, channels, ctx)?;
            Ok(String::new())
        });
        router.add_command("setFrameImage", &["frame"], |controller, params, ctx| {
            match params.get("frame").parse::<usize>() {
                Ok(frame) if frame < controller.image_count() => {
                    controller.set_frame_image(frame, ctx)?;
                    Ok(String::new())
                }
                _ => Ok(format!("Invalid image frame: {}", params.raw())),
            }
        });
        router.add_command("setFrameChannel", &["frame"], |controller, params, _| {
            match params.get("frame").parse::<i64>() {
                Ok(frame) if (0..=controller.channel_high_key()).contains(&frame) => {
                    controller.set_frame_channel(frame)?;
                    Ok(String::new())
                }
                _ => Ok(format!("Invalid channel frame: {}", params.raw())),
            }
        });
        router
    }

    // ── Images ───────────────────────────────────────────────────

    /// Appends an image with `channels` channels and selects it.
    pub fn load_image(&mut self, name: &str, channels: usize, ctx: &mut ObjectContext<'_>) -> ObjectResult<()> {
        let index = self.channel_counts.len();
        self.channel_counts.push(channels);
        let state = self.core.state_mut();
        state.resize_array(IMAGES, index + 1)?;
        state.set_value(&format!("{IMAGES}/{index}"), name.to_string())?;
        self.select(index)?;
        let path = self.core.path().clone();
        ctx.notify_changed(&path);
        Ok(())
    }

    /// Selects image `index`. Returns `false` when it was already selected
    /// or does not exist.
    pub fn set_frame_image(&mut self, index: usize, ctx: &mut ObjectContext<'_>) -> ObjectResult<bool> {
        if index >= self.channel_counts.len() || self.selected_image() == Some(index) {
            return Ok(false);
        }
        self.select(index)?;
        let path = self.core.path().clone();
        ctx.notify_changed(&path);
        Ok(true)
    }

    /// Moves the channel frame, clamped to the selected image's channels.
    pub fn set_frame_channel(&mut self, frame: i64) -> ObjectResult<()> {
        let frame = frame.clamp(0, self.channel_high_key());
        self.core.state_mut().set_value(CHANNEL_FRAME, frame)?;
        Ok(())
    }

    pub fn image_count(&self) -> usize {
        self.channel_counts.len()
    }

    pub fn selected_image(&self) -> Option<usize> {
        let selected: i64 = self.core.state().get_value(SELECTED_IMAGE).unwrap_or(-1);
        usize::try_from(selected).ok()
    }

    /// Highest channel index of the selected image.
    pub fn channel_high_key(&self) -> i64 {
        self.core.state().get_value(CHANNEL_HIGH_KEY).unwrap_or_default()
    }

    pub fn channel_frame(&self) -> i64 {
        self.core.state().get_value(CHANNEL_FRAME).unwrap_or_default()
    }

    fn select(&mut self, index: usize) -> ObjectResult<()> {
        let channels = self.channel_counts.get(index).copied().unwrap_or(1);
        let high_key = i64::try_from(channels.saturating_sub(1)).unwrap_or(i64::MAX);
        let frame = self.channel_frame().min(high_key);
        let state = self.core.state_mut();
        state.set_value(SELECTED_IMAGE, i64::try_from(index).unwrap_or(i64::MAX))?;
        state.set_value(CHANNEL_HIGH_KEY, high_key)?;
        state.set_value(CHANNEL_FRAME, frame)?;
        Ok(())
    }

    // ── Color settings ───────────────────────────────────────────

    pub fn set_color_map(&mut self, name: &str) -> ObjectResult<()> {
        Ok(self.core.state_mut().set_value(COLOR_MAP, name.to_string())?)
    }

    pub fn set_color_inverted(&mut self, invert: bool) -> ObjectResult<()> {
        Ok(self.core.state_mut().set_value(COLOR_INVERT, invert)?)
    }

    pub fn set_color_reversed(&mut self, reverse: bool) -> ObjectResult<()> {
        Ok(self.core.state_mut().set_value(COLOR_REVERSE, reverse)?)
    }

    pub fn set_color_amounts(&mut self, red: f64, green: f64, blue: f64) -> ObjectResult<()> {
        let state = self.core.state_mut();
        state.set_value(COLOR_RED, red)?;
        state.set_value(COLOR_GREEN, green)?;
        state.set_value(COLOR_BLUE, blue)?;
        Ok(())
    }

    pub fn set_gamma(&mut self, gamma: f64) -> ObjectResult<()> {
        Ok(self.core.state_mut().set_value(COLOR_GAMMA, gamma)?)
    }

    pub fn set_transform_data(&mut self, transform: &str) -> ObjectResult<()> {
        Ok(self.core.state_mut().set_value(COLOR_TRANSFORM, transform.to_string())?)
    }

    pub fn color_map(&self) -> String {
        self.core.state().get_value(COLOR_MAP).unwrap_or_default()
    }

    pub fn is_color_inverted(&self) -> bool {
        self.core.state().get_value(COLOR_INVERT).unwrap_or_default()
    }

    pub fn is_color_reversed(&self) -> bool {
        self.core.state().get_value(COLOR_REVERSE).unwrap_or_default()
    }

    pub fn color_amounts(&self) -> (f64, f64, f64) {
        let state = self.core.state();
        (
            state.get_value(COLOR_RED).unwrap_or(1.0),
            state.get_value(COLOR_GREEN).unwrap_or(1.0),
            state.get_value(COLOR_BLUE).unwrap_or(1.0),
        )
    }

    pub fn gamma(&self) -> f64 {
        self.core.state().get_value(COLOR_GAMMA).unwrap_or(1.0)
    }

    pub fn transform_data(&self) -> String {
        self.core.state().get_value(COLOR_TRANSFORM).unwrap_or_default()
    }
}

impl CartaObject for Controller {
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
