//! Hook identifiers and typed payloads.

use serde::Serialize;
use std::any::Any;
use std::fmt;

/// Stable identifier of an extension point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct HookId(&'static str);

impl HookId {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for HookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A typed extension point: an id plus the shape of its input and result.
pub trait Hook: 'static {
    const ID: HookId;
    type Params: Send + 'static;
    type Output: Clone + Send + 'static;
}

/// The concrete payload passed to plugins for hook `H`. The handling plugin
/// fills in `output`.
pub struct HookRequest<H: Hook> {
    pub params: H::Params,
    pub output: Option<H::Output>,
}

impl<H: Hook> HookRequest<H> {
    pub fn new(params: H::Params) -> Self {
        Self {
            params,
            output: None,
        }
    }

    pub fn into_output(self) -> Option<H::Output> {
        self.output
    }
}

/// Type-erased hook request as seen by the dispatcher and plugins.
///
/// Plugins recover the typed request with [`downcast_mut`](dyn HookPayload::downcast_mut),
/// which returns `None` instead of panicking on a mismatched hook type.
pub trait HookPayload: Any + Send {
    fn hook_id(&self) -> HookId;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Copy of the current output, for [`restore_output`](Self::restore_output).
    fn save_output(&self) -> Box<dyn Any + Send>;

    /// Puts back output taken with [`save_output`](Self::save_output).
    /// A saved value of another hook type is ignored.
    fn restore_output(&mut self, saved: Box<dyn Any + Send>);
}

impl<H: Hook> HookPayload for HookRequest<H> {
    fn hook_id(&self) -> HookId {
        H::ID
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn save_output(&self) -> Box<dyn Any + Send> {
        Box::new(self.output.clone())
    }

    fn restore_output(&mut self, saved: Box<dyn Any + Send>) {
        if let Ok(output) = saved.downcast::<Option<H::Output>>() {
            self.output = *output;
        }
    }
}

impl<'a> dyn HookPayload + 'a {
    /// Returns true if this payload carries hook `H`.
    pub fn is<H: Hook>(&self) -> bool {
        self.as_any().is::<HookRequest<H>>()
    }

    pub fn downcast_ref<H: Hook>(&self) -> Option<&HookRequest<H>> {
        self.as_any().downcast_ref::<HookRequest<H>>()
    }

    pub fn downcast_mut<H: Hook>(&mut self) -> Option<&mut HookRequest<H>> {
        self.as_any_mut().downcast_mut::<HookRequest<H>>()
    }
}
