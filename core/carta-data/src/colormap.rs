//! Colormap: color settings shared by every linked image controller.

use crate::colormaps::Colormaps;
use crate::controller::Controller;
use crate::settings::Settings;
use crate::transforms::TransformsData;
use crate::util::{gamma_from_scales, round_to_digits};
use carta_object::{
    CartaObject, CommandRouter, Linkable, LinkableSet, ObjectContext, ObjectCore, ObjectError,
    ObjectInit, ObjectResult,
};
use carta_types::ObjectPath;
use std::sync::Arc;
use tracing::warn;

const COLOR_MAP_NAME: &str = "colorMapName";
const REVERSE: &str = "reverse";
const INVERT: &str = "invert";
const GAMMA: &str = "gamma";
const SCALE_1: &str = "scale1";
const SCALE_2: &str = "scale2";
const COLOR_MIX: &str = "colorMix";
const RED_PERCENT: &str = "redPercent";
const GREEN_PERCENT: &str = "greenPercent";
const BLUE_PERCENT: &str = "bluePercent";
const SIGNIFICANT_DIGITS: &str = "significantDigits";
const TRANSFORM_IMAGE: &str = "imageTransform";
const TRANSFORM_DATA: &str = "dataTransform";

/// Smallest color-mix change that counts as a change.
const MIX_THRESHOLD: f64 = 0.001;

/// Precision of an `f64`; more digits than this cannot be represented.
const MAX_SIGNIFICANT_DIGITS: i32 = 15;

fn mix_path(channel: &str) -> String {
    format!("{COLOR_MIX}/{channel}")
}

/// Color settings for a group of image controllers.
///
/// Every setting change is pushed to all linked controllers, and a newly
/// linked controller receives the full current settings. The colormap owns
/// a [`Settings`] child for its preferences panel.
pub struct Colormap {
    core: ObjectCore,
    links: LinkableSet,
    settings: Option<ObjectPath>,
    colormaps: Option<ObjectPath>,
    transforms: Option<ObjectPath>,
    commands: Arc<CommandRouter<Self>>,
}

impl Colormap {
    pub const CLASS_NAME: &'static str = "Colormap";

    pub fn create(init: ObjectInit) -> ObjectResult<Box<dyn CartaObject>> {
        let mut core = init.into_core(Self::CLASS_NAME);
        let state = core.state_mut();
        state.insert_value(COLOR_MAP_NAME, "Gray".to_string())?;
        state.insert_value(REVERSE, false)?;
        state.insert_value(INVERT, false)?;
        state.insert_value(GAMMA, 1.0)?;
        state.insert_value(SCALE_1, 0.0)?;
        state.insert_value(SCALE_2, 0.0)?;
        state.insert_object(COLOR_MIX)?;
        state.insert_value(&mix_path(RED_PERCENT), 1.0)?;
        state.insert_value(&mix_path(GREEN_PERCENT), 1.0)?;
        state.insert_value(&mix_path(BLUE_PERCENT), 1.0)?;
        state.insert_value(SIGNIFICANT_DIGITS, 6i32)?;
        state.insert_value(TRANSFORM_IMAGE, "Gamma".to_string())?;
        state.insert_value(TRANSFORM_DATA, "None".to_string())?;
        let links = LinkableSet::new(state)?;
        Ok(Box::new(Self {
            core,
            links,
            settings: None,
            colormaps: None,
            transforms: None,
            commands: Arc::new(Self::router()),
        }))
    }

    fn router() -> CommandRouter<Self> {
        let mut router: CommandRouter<Self> = CommandRouter::new();

        router.add_query("registerPreferences", &[], |colormap, _, _| {
            Ok(colormap.preferences_id().unwrap_or_default())
        });

        router.add_command("setColormap", &["name"], |colormap, params, ctx| {
            colormap.set_color_map(params.get("name"), ctx)
        });

        router.add_command("invertColormap", &[INVERT], |colormap, params, ctx| {
            match params.get_bool(INVERT) {
                Some(invert) => colormap.invert_color_map(invert, ctx),
                None => Ok(format!("Invert color map parameters must be true/false: {}", params.raw())),
            }
        });

        router.add_command("reverseColormap", &[REVERSE], |colormap, params, ctx| {
            match params.get_bool(REVERSE) {
                Some(reverse) => colormap.reverse_color_map(reverse, ctx),
                None => Ok(format!("Invalid color map reverse parameters: {}", params.raw())),
            }
        });

        router.add_command(
            "setColorMix",
            &[RED_PERCENT, GREEN_PERCENT, BLUE_PERCENT],
            |colormap, params, ctx| {
                match (
                    params.get_f64(RED_PERCENT),
                    params.get_f64(GREEN_PERCENT),
                    params.get_f64(BLUE_PERCENT),
                ) {
                    (Some(red), Some(green), Some(blue)) => colormap.set_color_mix(red, green, blue, ctx),
                    _ => Ok(format!("Color mix values must be numbers: {}", params.raw())),
                }
            },
        );

        router.add_command("setScales", &[SCALE_1, SCALE_2], |colormap, params, ctx| {
            match (params.get_f64(SCALE_1), params.get_f64(SCALE_2)) {
                (Some(scale1), Some(scale2)) => colormap.set_scales(scale1, scale2, ctx),
                _ => Ok(format!("Invalid color scale: {}", params.raw())),
            }
        });

        router.add_command("setSignificantDigits", &[SIGNIFICANT_DIGITS], |colormap, params, _| {
            match params.get_i32(SIGNIFICANT_DIGITS) {
                Some(digits) => colormap.set_significant_digits(digits),
                None => Ok(format!(
                    "Colormap significant digits must be an integer: {}",
                    params.raw()
                )),
            }
        });

        router.add_command("setDataTransform", &[TRANSFORM_DATA], |colormap, params, ctx| {
            colormap.set_data_transform(params.get(TRANSFORM_DATA), ctx)
        });

        router
    }

    // ========================================================================
    // Settings
    // ========================================================================

    /// Selects a colormap by name. Unknown names are rejected.
    pub fn set_color_map(&mut self, name: &str, ctx: &mut ObjectContext<'_>) -> ObjectResult<String> {
        let known = self
            .colormaps
            .as_ref()
            .and_then(|path| ctx.get_as::<Colormaps>(path))
            .is_some_and(|maps| maps.is_map(name));
        if !known {
            return Ok(format!("Invalid colormap: {name}"));
        }
        if name != self.color_map_name() {
            self.core.state_mut().set_value(COLOR_MAP_NAME, name.to_string())?;
            self.for_each_controller(ctx, |controller| controller.set_color_map(name))?;
            self.changed(ctx);
        }
        Ok(String::new())
    }

    pub fn invert_color_map(&mut self, invert: bool, ctx: &mut ObjectContext<'_>) -> ObjectResult<String> {
        if invert != self.is_inverted() {
            self.core.state_mut().set_value(INVERT, invert)?;
            self.for_each_controller(ctx, |controller| controller.set_color_inverted(invert))?;
            self.changed(ctx);
        }
        Ok(String::new())
    }

    pub fn reverse_color_map(&mut self, reverse: bool, ctx: &mut ObjectContext<'_>) -> ObjectResult<String> {
        if reverse != self.is_reversed() {
            self.core.state_mut().set_value(REVERSE, reverse)?;
            self.for_each_controller(ctx, |controller| controller.set_color_reversed(reverse))?;
            self.changed(ctx);
        }
        Ok(String::new())
    }

    /// Sets the red, green, and blue mix. Every value must lie in `[0,1]`;
    /// if any does not, nothing changes and the message names each bad
    /// channel.
    pub fn set_color_mix(
        &mut self,
        red: f64,
        green: f64,
        blue: f64,
        ctx: &mut ObjectContext<'_>,
    ) -> ObjectResult<String> {
        let channels = [(RED_PERCENT, red), (GREEN_PERCENT, green), (BLUE_PERCENT, blue)];
        let errors: String = channels
            .iter()
            .filter(|(_, value)| !(0.0..=1.0).contains(value))
            .map(|(key, _)| format!("{} mix must be in [0,1]. ", mix_path(key)))
            .collect();
        if !errors.is_empty() {
            return Ok(errors);
        }

        let mut changed = false;
        for (key, value) in channels {
            let path = mix_path(key);
            let old: f64 = self.core.state().get_value(&path)?;
            if (value - old).abs() >= MIX_THRESHOLD {
                self.core.state_mut().set_value(&path, value)?;
                changed = true;
            }
        }
        if changed {
            let (red, green, blue) = self.color_mix();
            self.for_each_controller(ctx, |controller| controller.set_color_amounts(red, green, blue))?;
            self.changed(ctx);
        }
        Ok(String::new())
    }

    /// Stores the two scale sliders and derives gamma from them.
    pub fn set_scales(&mut self, scale1: f64, scale2: f64, ctx: &mut ObjectContext<'_>) -> ObjectResult<String> {
        let state = self.core.state();
        let changed = scale1 != state.get_value::<f64>(SCALE_1)? || scale2 != state.get_value::<f64>(SCALE_2)?;
        if !changed {
            return Ok(String::new());
        }
        let gamma = gamma_from_scales(scale1, scale2);
        if !gamma.is_finite() || gamma == 0.0 {
            return Ok(format!("Color scales out of range: scale1={scale1}, scale2={scale2}"));
        }
        let state = self.core.state_mut();
        state.set_value(SCALE_1, scale1)?;
        state.set_value(SCALE_2, scale2)?;
        self.set_gamma(gamma, ctx)
    }

    /// Sets gamma, rounded to the significant digits. Changes smaller than
    /// one unit in the last significant digit are ignored.
    pub fn set_gamma(&mut self, gamma: f64, ctx: &mut ObjectContext<'_>) -> ObjectResult<String> {
        let digits = self.significant_digits();
        if (gamma - self.gamma()).abs() > self.error_margin() {
            let rounded = round_to_digits(gamma, digits);
            self.core.state_mut().set_value(GAMMA, rounded)?;
            self.for_each_controller(ctx, |controller| controller.set_gamma(rounded))?;
            self.changed(ctx);
        }
        Ok(String::new())
    }

    pub fn set_significant_digits(&mut self, digits: i32) -> ObjectResult<String> {
        if digits <= 0 {
            return Ok(format!("Invalid significant digits; must be positive: {digits}"));
        }
        if digits > MAX_SIGNIFICANT_DIGITS {
            return Ok(format!(
                "Invalid significant digits; at most {MAX_SIGNIFICANT_DIGITS} are supported: {digits}"
            ));
        }
        if digits != self.significant_digits() {
            self.core.state_mut().set_value(SIGNIFICANT_DIGITS, digits)?;
        }
        Ok(String::new())
    }

    /// Selects a data transform by name, case-insensitively.
    pub fn set_data_transform(&mut self, name: &str, ctx: &mut ObjectContext<'_>) -> ObjectResult<String> {
        let canonical = self
            .transforms
            .as_ref()
            .and_then(|path| ctx.get_as::<TransformsData>(path))
            .and_then(|transforms| transforms.canonical(name));
        let Some(transform) = canonical else {
            return Ok(format!("Invalid data transform: {name}"));
        };
        if transform != self.data_transform() {
            self.core.state_mut().set_value(TRANSFORM_DATA, transform.to_string())?;
            self.for_each_controller(ctx, |controller| controller.set_transform_data(transform))?;
            self.changed(ctx);
        }
        Ok(String::new())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Path of the owned preferences object.
    pub fn preferences_id(&self) -> Option<String> {
        self.settings.as_ref().map(ToString::to_string)
    }

    pub fn color_map_name(&self) -> String {
        self.core.state().get_value(COLOR_MAP_NAME).unwrap_or_default()
    }

    pub fn is_inverted(&self) -> bool {
        self.core.state().get_value(INVERT).unwrap_or_default()
    }

    pub fn is_reversed(&self) -> bool {
        self.core.state().get_value(REVERSE).unwrap_or_default()
    }

    pub fn color_mix(&self) -> (f64, f64, f64) {
        let state = self.core.state();
        (
            state.get_value(&mix_path(RED_PERCENT)).unwrap_or(1.0),
            state.get_value(&mix_path(GREEN_PERCENT)).unwrap_or(1.0),
            state.get_value(&mix_path(BLUE_PERCENT)).unwrap_or(1.0),
        )
    }

    pub fn gamma(&self) -> f64 {
        self.core.state().get_value(GAMMA).unwrap_or(1.0)
    }

    pub fn significant_digits(&self) -> i32 {
        self.core.state().get_value(SIGNIFICANT_DIGITS).unwrap_or(6)
    }

    pub fn data_transform(&self) -> String {
        self.core.state().get_value(TRANSFORM_DATA).unwrap_or_default()
    }

    fn error_margin(&self) -> f64 {
        10f64.powi(-self.significant_digits())
    }

    fn changed(&self, ctx: &mut ObjectContext<'_>) {
        ctx.notify_changed(self.core.path());
    }

    fn for_each_controller(
        &self,
        ctx: &mut ObjectContext<'_>,
        apply: impl Fn(&mut Controller) -> ObjectResult<()>,
    ) -> ObjectResult<()> {
        for target in self.links.targets() {
            ctx.with_object::<Controller, _>(target, |controller, _| apply(controller))??;
        }
        Ok(())
    }

    /// Pushes every current setting to one controller.
    fn apply_to(&self, controller: &mut Controller) -> ObjectResult<()> {
        let (red, green, blue) = self.color_mix();
        controller.set_color_map(&self.color_map_name())?;
        controller.set_color_inverted(self.is_inverted())?;
        controller.set_color_reversed(self.is_reversed())?;
        controller.set_color_amounts(red, green, blue)?;
        controller.set_gamma(self.gamma())?;
        controller.set_transform_data(&self.data_transform())
    }
}

impl CartaObject for Colormap {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn initialize(&mut self, ctx: &mut ObjectContext<'_>) -> ObjectResult<()> {
        self.colormaps = Some(ctx.find_singleton(Colormaps::CLASS_NAME)?);
        self.transforms = Some(ctx.find_singleton(TransformsData::CLASS_NAME)?);
        self.settings = Some(ctx.create(Settings::CLASS_NAME)?);
        Ok(())
    }

    fn teardown(&mut self, ctx: &mut ObjectContext<'_>) {
        if let Some(settings) = self.settings.take() {
            if let Err(err) = ctx.destroy_path(&settings) {
                warn!(path = %settings, error = %err, "Failed to destroy colormap settings");
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

impl Linkable for Colormap {
    fn link_set(&self) -> &LinkableSet {
        &self.links
    }

    fn add_link(&mut self, target: &mut dyn CartaObject, _ctx: &mut ObjectContext<'_>) -> ObjectResult<bool> {
        let path = target.path().clone();
        let Some(controller) = target.downcast_mut::<Controller>() else {
            return Err(ObjectError::InvalidTarget(format!(
                "{path}; color map only supports linking to images"
            )));
        };
        let added = self.links.add_link(self.core.state_mut(), &path)?;
        self.apply_to(controller)?;
        Ok(added)
    }

    fn remove_link(&mut self, target: &mut dyn CartaObject, _ctx: &mut ObjectContext<'_>) -> ObjectResult<bool> {
        if !target.is::<Controller>() {
            return Err(ObjectError::InvalidTarget(format!(
                "{}; color map only supports links to images",
                target.path()
            )));
        }
        self.links.remove_link(self.core.state_mut(), target.path())
    }

    /// A controller loaded new data; give it the current settings again.
    fn on_link_changed(&mut self, target: &mut dyn CartaObject, _ctx: &mut ObjectContext<'_>) {
        if let Some(controller) = target.downcast_mut::<Controller>() {
            if let Err(err) = self.apply_to(controller) {
                warn!(error = %err, "Failed to refresh controller color settings");
            }
        }
    }
}
