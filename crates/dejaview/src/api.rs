//! Demo API
//!
//! The method set the stock `dejaview` binary exposes to pages. Every method
//! runs on the interface thread; the choosers block script until answered.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use rquickjs::{Ctx, Function, Object};
use serde_json::json;
use tracing::{debug, warn};

use dejaview_bridge::{BridgeError, BridgeHost, BridgeResult, CallbackHandle, NativeApi};

use crate::dialogs::FileDialogs;

pub struct DemoApi {
    dialogs: Box<dyn FileDialogs>,
    host: RefCell<Option<BridgeHost>>,
}

impl DemoApi {
    pub fn new(dialogs: impl FileDialogs + 'static) -> Self {
        Self {
            dialogs: Box::new(dialogs),
            host: RefCell::new(None),
        }
    }

    /// Back-references, available while the bridge is attached.
    pub fn host(&self) -> BridgeResult<BridgeHost> {
        self.host.borrow().clone().ok_or(BridgeError::NotAttached)
    }

    pub fn hello_world(&self) -> String {
        "Hello World".to_string()
    }

    /// Widened so the sum of two script ints never wraps.
    pub fn add(x: i32, y: i32) -> i64 {
        i64::from(x) + i64::from(y)
    }

    pub fn log(&self, message: &str) {
        println!("{}", message);
    }

    pub fn minimize(&self) -> BridgeResult<()> {
        self.host()?.window().minimize();
        Ok(())
    }

    /// Ask the host to shut down. The bridge closes once the host acts on it.
    pub fn exit(&self) -> BridgeResult<()> {
        self.host()?.window().request_close();
        Ok(())
    }

    /// A cancelled chooser answers `null`.
    fn answer<'js>(
        ctx: &Ctx<'js>,
        callback: &CallbackHandle<'js>,
        choice: Option<PathBuf>,
    ) -> BridgeResult<()> {
        let argument = match choice {
            Some(path) => json!(path.display().to_string()),
            None => {
                debug!("chooser cancelled");
                serde_json::Value::Null
            }
        };
        callback.invoke(ctx, &[argument])
    }
}

impl NativeApi for DemoApi {
    fn init(&self, host: BridgeHost) {
        let mut slot = self.host.borrow_mut();
        if slot.is_some() {
            warn!("API attached twice, keeping the first host");
            return;
        }
        *slot = Some(host);
    }

    fn release(&self) {
        self.host.borrow_mut().take();
    }

    fn expose<'js>(self: Rc<Self>, ctx: &Ctx<'js>, target: &Object<'js>) -> rquickjs::Result<()> {
        target.set(
            "adderCallback",
            Function::new(
                ctx.clone(),
                |ctx: Ctx<'js>, x: i32, y: i32, callback: CallbackHandle<'js>| -> rquickjs::Result<()> {
                    callback
                        .invoke(&ctx, &[json!(DemoApi::add(x, y))])
                        .map_err(|e| e.throw(&ctx))
                },
            )?
            .with_name("adderCallback")?,
        )?;

        let api = Rc::clone(&self);
        target.set(
            "helloWorld",
            Function::new(ctx.clone(), move || api.hello_world())?.with_name("helloWorld")?,
        )?;

        let api = Rc::clone(&self);
        target.set(
            "openDirChooser",
            Function::new(
                ctx.clone(),
                move |ctx: Ctx<'js>, callback: CallbackHandle<'js>| -> rquickjs::Result<()> {
                    let choice = api.dialogs.choose_directory();
                    DemoApi::answer(&ctx, &callback, choice).map_err(|e| e.throw(&ctx))
                },
            )?
            .with_name("openDirChooser")?,
        )?;

        let api = Rc::clone(&self);
        target.set(
            "openFileChooser",
            Function::new(
                ctx.clone(),
                move |ctx: Ctx<'js>, callback: CallbackHandle<'js>| -> rquickjs::Result<()> {
                    let choice = api.dialogs.choose_file();
                    DemoApi::answer(&ctx, &callback, choice).map_err(|e| e.throw(&ctx))
                },
            )?
            .with_name("openFileChooser")?,
        )?;

        let api = Rc::clone(&self);
        target.set(
            "log",
            Function::new(ctx.clone(), move |message: String| api.log(&message))?.with_name("log")?,
        )?;

        let api = Rc::clone(&self);
        target.set(
            "minimize",
            Function::new(ctx.clone(), move |ctx: Ctx<'js>| -> rquickjs::Result<()> {
                api.minimize().map_err(|e| e.throw(&ctx))
            })?
            .with_name("minimize")?,
        )?;

        let api = self;
        target.set(
            "exit",
            Function::new(ctx.clone(), move |ctx: Ctx<'js>| -> rquickjs::Result<()> {
                api.exit().map_err(|e| e.throw(&ctx))
            })?
            .with_name("exit")?,
        )?;

        Ok(())
    }
}
