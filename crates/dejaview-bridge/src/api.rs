//! Native API Surface
//!
//! The embedding application defines an arbitrary method set and installs it
//! on the object the bridge binds into the script scope.

use std::rc::Rc;

use rquickjs::{Context, Ctx, Object};

use crate::lifecycle::BindingName;
use crate::surface::HostWindow;

/// Back-references handed to the API before it is bound.
#[derive(Clone)]
pub struct BridgeHost {
    window: Rc<dyn HostWindow>,
    context: Context,
    binding: BindingName,
}

impl BridgeHost {
    pub fn new(window: Rc<dyn HostWindow>, context: Context, binding: BindingName) -> Self {
        Self {
            window,
            context,
            binding,
        }
    }

    pub fn window(&self) -> &Rc<dyn HostWindow> {
        &self.window
    }

    /// The script scope. Only enter it outside of script execution, such as
    /// from a task re-scheduled onto the interface thread; a method being
    /// called from script already has its `Ctx`.
    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn binding(&self) -> &BindingName {
        &self.binding
    }
}

/// A native object exposed to script under the configured binding name.
///
/// Every method must take script-native arguments (primitives, strings,
/// [`CallbackHandle`](crate::CallbackHandle)s) and either return a value
/// directly or answer through a callback.
pub trait NativeApi: 'static {
    /// Called once per attach, before [`NativeApi::expose`].
    fn init(&self, host: BridgeHost) {
        let _ = host;
    }

    /// Called when the bridge detaches or is dropped. Drop any [`BridgeHost`]
    /// kept from `init`: it holds the context, and the context holds the
    /// exposed methods.
    fn release(&self) {}

    /// Install the method set on `target`.
    fn expose<'js>(self: Rc<Self>, ctx: &Ctx<'js>, target: &Object<'js>) -> rquickjs::Result<()>;
}
