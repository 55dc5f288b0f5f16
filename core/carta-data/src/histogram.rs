//! Histogram: asks a plugin for intensity counts and publishes them.

use carta_hooks::HookError;
use carta_hooks::hooks::{HistogramHook, HistogramParams, HistogramResult};
use carta_object::{CartaObject, CommandRouter, ObjectContext, ObjectCore, ObjectInit, ObjectResult, ParamMap};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, warn};

const BIN_COUNT: &str = "binCount";
const CHANNEL_MIN: &str = "channelMin";
const CHANNEL_MAX: &str = "channelMax";
const NAME: &str = "name";
const UNIT: &str = "unit";
const DATA: &str = "data";

pub struct Histogram {
    core: ObjectCore,
    commands: Arc<CommandRouter<Self>>,
}

impl Histogram {
    pub const CLASS_NAME: &'static str = "Histogram";

    pub fn create(init: ObjectInit) -> ObjectResult<Box<dyn CartaObject>> {
        let defaults = HistogramParams::default();
        let mut core = init.into_core(Self::CLASS_NAME);
        let state = core.state_mut();
        state.insert_value(BIN_COUNT, defaults.bin_count)?;
        state.insert_value(CHANNEL_MIN, defaults.min_channel)?;
        state.insert_value(CHANNEL_MAX, defaults.max_channel)?;
        state.insert_value(NAME, String::new())?;
        state.insert_value(UNIT, String::new())?;
        state.insert_json(DATA, Value::Array(Vec::new()))?;

        let mut router: CommandRouter<Self> = CommandRouter::new();
        router.add_command(
            "computeHistogram",
            &[BIN_COUNT, CHANNEL_MIN, CHANNEL_MAX],
            |histogram, params, ctx| histogram.compute_command(params, ctx),
        );
        Ok(Box::new(Self {
            core,
            commands: Arc::new(router),
        }))
    }

    fn compute_command(&mut self, params: &ParamMap, ctx: &mut ObjectContext<'_>) -> ObjectResult<String> {
        let mut request = self.current_params();
        if params.contains(BIN_COUNT) {
            match params.get(BIN_COUNT).parse::<usize>() {
                Ok(bins) if bins > 0 => request.bin_count = bins,
                _ => return Ok(format!("Bin count must be a positive integer: {}", params.raw())),
            }
        }
        for (key, slot) in [
            (CHANNEL_MIN, &mut request.min_channel),
            (CHANNEL_MAX, &mut request.max_channel),
        ] {
            if params.contains(key) {
                match params.get_i32(key) {
                    Some(channel) => *slot = channel,
                    None => return Ok(format!("Invalid {key}: {}", params.raw())),
                }
            }
        }
        if request.min_channel >= 0 && request.max_channel >= 0 && request.min_channel > request.max_channel {
            return Ok(format!(
                "Channel range is empty: [{},{}]",
                request.min_channel, request.max_channel
            ));
        }
        self.compute(request, ctx)
    }

    /// Request built from the current state.
    pub fn current_params(&self) -> HistogramParams {
        let state = self.core.state();
        let defaults = HistogramParams::default();
        HistogramParams {
            bin_count: state.get_value(BIN_COUNT).unwrap_or(defaults.bin_count),
            min_channel: state.get_value(CHANNEL_MIN).unwrap_or(defaults.min_channel),
            max_channel: state.get_value(CHANNEL_MAX).unwrap_or(defaults.max_channel),
            ..defaults
        }
    }

    /// Runs the histogram hook with `params`. On success the request and
    /// result are both published; on failure nothing changes and the
    /// returned message says why.
    pub fn compute(&mut self, params: HistogramParams, ctx: &mut ObjectContext<'_>) -> ObjectResult<String> {
        let result = match ctx.hooks().call::<HistogramHook>(params.clone()) {
            Ok(result) => result,
            Err(HookError::NoHandler(_)) => return Ok("No histogram plugin available".to_string()),
            Err(err) => {
                warn!(histogram = %self.core.path(), error = %err, "Histogram hook failed");
                return Ok(format!("Histogram computation failed: {err}"));
            }
        };
        debug!(
            histogram = %self.core.path(),
            bins = params.bin_count,
            points = result.data.len(),
            "Histogram computed"
        );
        self.publish(&params, result)?;
        Ok(String::new())
    }

    fn publish(&mut self, params: &HistogramParams, result: HistogramResult) -> ObjectResult<()> {
        let state = self.core.state_mut();
        state.set_value(BIN_COUNT, params.bin_count)?;
        state.set_value(CHANNEL_MIN, params.min_channel)?;
        state.set_value(CHANNEL_MAX, params.max_channel)?;
        state.set_value(NAME, result.name)?;
        state.set_value(UNIT, result.unit)?;
        let data: Vec<Value> = result.data.iter().map(|(x, y)| json!([x, y])).collect();
        state.insert_json(DATA, Value::Array(data))?;
        Ok(())
    }

    pub fn data(&self) -> Vec<(f64, f64)> {
        let Ok(Value::Array(points)) = self.core.state().get_json(DATA) else {
            return Vec::new();
        };
        points
            .iter()
            .filter_map(|point| Some((point.get(0)?.as_f64()?, point.get(1)?.as_f64()?)))
            .collect()
    }
}

impl CartaObject for Histogram {
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
