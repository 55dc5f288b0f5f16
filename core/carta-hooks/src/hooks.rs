//! Hook types defined by the core.

use crate::hook::{Hook, HookId};
use serde::{Deserialize, Serialize};

/// Sent once after all plugins are loaded. Dispatched with
/// [`broadcast`](crate::HookDispatcher::broadcast) so every plugin sees it.
pub struct Initialize;

#[derive(Debug, Clone, Default)]
pub struct InitializeParams {
    /// Names of every loaded plugin, in load order.
    pub plugin_names: Vec<String>,
}

impl Hook for Initialize {
    const ID: HookId = HookId::new("Initialize");
    type Params = InitializeParams;
    type Output = ();
}

/// Computes an intensity histogram for the current image.
pub struct HistogramHook;

/// Histogram request bounds. Channels are inclusive; a negative channel
/// means "unbounded" on that side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramParams {
    pub bin_count: usize,
    pub min_channel: i32,
    pub max_channel: i32,
    pub min_frequency: f64,
    pub max_frequency: f64,
    pub range_unit: String,
}

impl Default for HistogramParams {
    fn default() -> Self {
        Self {
            bin_count: 25,
            min_channel: -1,
            max_channel: -1,
            min_frequency: -1.0,
            max_frequency: -1.0,
            range_unit: "GHz".to_string(),
        }
    }
}

/// Histogram data as `(intensity, count)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistogramResult {
    pub name: String,
    pub unit: String,
    pub data: Vec<(f64, f64)>,
}

impl Hook for HistogramHook {
    const ID: HookId = HookId::new("HistogramHook");
    type Params = HistogramParams;
    type Output = HistogramResult;
}

/// Asks plugins for additional colormap names. Broadcast: each plugin
/// appends its names to the output, creating it if it is still empty.
pub struct ColormapNamesHook;

impl Hook for ColormapNamesHook {
    const ID: HookId = HookId::new("ColormapNamesHook");
    type Params = ();
    type Output = Vec<String>;
}
