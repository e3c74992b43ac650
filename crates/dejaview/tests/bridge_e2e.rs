//! End-to-end launches of a page with the demo API bound into it.

use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use tempfile::TempDir;

use dejaview::dialogs::PresetDialogs;
use dejaview::{DejaviewConfig, DemoApi, Dejaview, Hooks};
use dejaview_bridge::{BridgeState, BufferedSink, ConsoleLevel, ProcessControl, Style};

#[derive(Default)]
struct RecordingExit {
    codes: RefCell<Vec<i32>>,
}

impl ProcessControl for RecordingExit {
    fn terminate(&self, code: i32) {
        self.codes.borrow_mut().push(code);
    }
}

struct Launch {
    _dir: TempDir,
    app: Dejaview<DemoApi>,
    sink: BufferedSink,
    exit: Rc<RecordingExit>,
}

fn launch_with(page: Option<&str>, dialogs: PresetDialogs, tweak: impl FnOnce(&mut DejaviewConfig)) -> Launch {
    let dir = TempDir::new().unwrap();
    let mut config = DejaviewConfig {
        resource_root: Some(dir.path().to_path_buf()),
        ..DejaviewConfig::default()
    };
    if let Some(page) = page {
        fs::write(dir.path().join("index.html"), page).unwrap();
        config.page_relative_path = "index.html".to_string();
    }
    tweak(&mut config);

    let sink = BufferedSink::new();
    let exit = Rc::new(RecordingExit::default());
    let hooks = Hooks {
        console: Rc::new(sink.clone()),
        process: exit.clone(),
        style: Style::Plain,
    };

    let app = Dejaview::open(&config, DemoApi::new(dialogs), hooks).unwrap();
    Launch {
        _dir: dir,
        app,
        sink,
        exit,
    }
}

fn launch(page: &str) -> Launch {
    launch_with(Some(page), PresetDialogs::default(), |_| {})
}

fn global_string(app: &Dejaview<DemoApi>, name: &str) -> String {
    app.with_scope(|scope| scope.globals().get::<_, String>(name).unwrap())
}

#[test]
fn test_hello_world_after_ready() {
    let launch = launch("<h1>demo</h1>");
    assert_eq!(launch.app.state(), BridgeState::Ready);

    let raw = launch
        .app
        .with_scope(|scope| scope.ctx().eval::<String, _>("_api.helloWorld()").unwrap());
    assert_eq!(raw, "Hello World");
    assert_eq!(launch.app.eval("_api.helloWorld()").unwrap(), "\"Hello World\"");
}

#[test]
fn test_adder_callback_called_once_with_sum() {
    let launch = launch(
        r#"<script>
            var calls = [];
            _api.adderCallback(1, 2, function () { calls.push(Array.from(arguments)); });
        </script>"#,
    );

    assert_eq!(launch.app.eval("JSON.stringify(calls)").unwrap(), r#""[[3]]""#);
}

#[test]
fn test_console_log_from_page() {
    let launch = launch(r#"<script>console.log("bar");</script>"#);

    assert_eq!(
        launch.sink.lines(),
        vec![(ConsoleLevel::Log, "=> \"bar\"".to_string())]
    );
}

#[test]
fn test_console_warn_object_from_page() {
    let launch = launch(r#"<script>console.warn({ foo: "bar" });</script>"#);

    assert_eq!(
        launch.sink.lines(),
        vec![(ConsoleLevel::Warn, r#"!> {"foo":"bar"}"#.to_string())]
    );
}

#[test]
fn test_missing_page_fails_and_exits_zero() {
    let launch = launch_with(None, PresetDialogs::default(), |config| {
        config.page_relative_path = "missing.html".to_string();
    });

    assert_eq!(launch.app.state(), BridgeState::Failed);
    assert_eq!(*launch.exit.codes.borrow(), vec![0]);
    assert!(!launch.app.window().is_visible());
    assert!(launch.app.eval("1").is_err());
}

#[test]
fn test_fallback_page_when_no_entry() {
    let launch = launch_with(None, PresetDialogs::default(), |_| {});

    assert_eq!(launch.app.state(), BridgeState::Ready);
    assert!(launch.app.window().is_visible());
    assert_eq!(launch.app.eval("typeof _api.helloWorld").unwrap(), "\"function\"");
}

#[test]
fn test_fallback_page_exercises_console() {
    let launch = launch_with(None, PresetDialogs::default(), |_| {});
    let lines = launch.sink.lines();

    let plain: Vec<(ConsoleLevel, &str)> = lines
        .iter()
        .filter(|(_, line)| !line.starts_with("=> function"))
        .map(|(level, line)| (*level, line.as_str()))
        .collect();
    assert_eq!(
        plain,
        vec![
            (ConsoleLevel::Log, "=> \"test\""),
            (ConsoleLevel::Log, r#"=> {"foo":"bar"}"#),
            (ConsoleLevel::Log, "=> null"),
            (ConsoleLevel::Log, "=> null"),
            (ConsoleLevel::Log, "=> true"),
            (ConsoleLevel::Log, "=> 5"),
            (ConsoleLevel::Log, "=> 5.123153"),
            (ConsoleLevel::Info, "?> \"console.info\""),
            (ConsoleLevel::Warn, "!> \"console.warn\""),
            (ConsoleLevel::Error, "x> \"console.error\""),
        ]
    );

    let functions: Vec<&str> = lines
        .iter()
        .filter(|(_, line)| line.starts_with("=> function"))
        .map(|(_, line)| line.as_str())
        .collect();
    assert_eq!(functions.len(), 2);
    assert!(functions[0].contains("output('test')"));
    assert!(functions[1].contains("Date"));
    assert_eq!(lines.len(), 12);
}

#[test]
fn test_fallback_page_wrappers_call_the_api() {
    let dialogs = PresetDialogs::new([Some(PathBuf::from("/srv/data"))]);
    let launch = launch_with(None, dialogs, |_| {});

    launch.app.eval("adder()").unwrap();
    assert_eq!(launch.app.eval("lastOutput").unwrap(), "3");

    launch.app.eval("helloWorld()").unwrap();
    assert_eq!(launch.app.eval("lastOutput").unwrap(), "\"Hello World\"");

    launch.app.eval("dirChooser()").unwrap();
    assert_eq!(launch.app.eval("lastOutput").unwrap(), "\"/srv/data\"");

    launch.app.eval("minimize()").unwrap();
    assert!(launch.app.window().is_minimized());
}

#[test]
fn test_window_configured_in_launch_order() {
    let launch = launch_with(Some("<p></p>"), PresetDialogs::default(), |config| {
        config.title = "Demo".to_string();
        config.width = 640.0;
        config.height = 480.0;
    });

    let window = launch.app.window();
    assert_eq!(window.title(), "Demo");
    assert_eq!(window.size(), (640.0, 480.0));
    assert!(!launch.app.surface().context_menu_enabled());
}

#[test]
fn test_right_click_can_stay_enabled() {
    let launch = launch_with(Some("<p></p>"), PresetDialogs::default(), |config| {
        config.disable_right_click = false;
    });

    assert!(launch.app.surface().context_menu_enabled());
}

#[test]
fn test_icon_is_optional() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("icon.png"), [0x89, b'P', b'N', b'G']).unwrap();
    let root = dir.path().to_path_buf();

    let with_icon = launch_with(Some("<p></p>"), PresetDialogs::default(), |config| {
        config.resource_root = Some(root.clone());
        config.page_relative_path = String::new();
        config.icon_relative_path = "icon.png".to_string();
    });
    assert_eq!(with_icon.app.window().icon(), Some(root.join("icon.png")));

    let missing = launch_with(Some("<p></p>"), PresetDialogs::default(), |config| {
        config.icon_relative_path = "nope.png".to_string();
    });
    assert_eq!(missing.app.window().icon(), None);
    assert_eq!(missing.app.state(), BridgeState::Ready);
}

#[test]
fn test_custom_binding_name() {
    let launch = launch_with(
        Some("<script>var greeting = native.helloWorld();</script>"),
        PresetDialogs::default(),
        |config| config.api_var_name = "native".to_string(),
    );

    assert_eq!(global_string(&launch.app, "greeting"), "Hello World");
    assert_eq!(launch.app.eval("typeof _api").unwrap(), "\"undefined\"");
}

#[test]
fn test_cancelled_chooser_answers_null() {
    let dialogs = PresetDialogs::new([None, Some(PathBuf::from("/home/user/notes.txt"))]);
    let launch = launch_with(
        Some(
            r#"<script>
                var answers = [];
                _api.openDirChooser(function (path) { answers.push(path); });
                _api.openFileChooser(function (path) { answers.push(path); });
            </script>"#,
        ),
        dialogs,
        |_| {},
    );

    assert_eq!(launch.app.state(), BridgeState::Ready);
    assert_eq!(
        launch.app.eval("JSON.stringify(answers)").unwrap(),
        r#""[null,"/home/user/notes.txt"]""#
    );
}

#[test]
fn test_minimize_and_exit() {
    let mut launch = launch("<p></p>");

    launch.app.eval("_api.minimize()").unwrap();
    assert!(launch.app.window().is_minimized());
    assert!(!launch.app.close_requested());

    launch.app.eval("_api.exit()").unwrap();
    assert!(launch.app.close_requested());

    launch.app.close();
    assert_eq!(launch.app.state(), BridgeState::Closed);
    assert!(launch.app.eval("_api").is_err());
    assert!(launch.exit.codes.borrow().is_empty());
}

#[test]
fn test_kept_api_reference_stops_after_close() {
    let mut launch = launch("<script>var keep = _api; var r = 'unset';</script>");
    assert_eq!(launch.app.eval("keep.helloWorld()").unwrap(), "\"Hello World\"");

    launch.app.close();
    assert_eq!(launch.app.state(), BridgeState::Closed);

    let outcome = launch.app.with_scope(|scope| {
        scope
            .ctx()
            .eval::<String, _>(
                "var out = []; \
                 try { keep.helloWorld(); out.push('called'); } catch (e) { out.push('threw'); } \
                 try { keep.adderCallback(1, 2, v => { r = v; }); } catch (e) { out.push('threw'); } \
                 out.concat([String(r)]).join(',')",
            )
            .unwrap()
    });
    assert_eq!(outcome, "threw,threw,unset");
}

#[test]
fn test_page_script_error_does_not_fail_load() {
    let launch = launch(
        r#"<script>notDefined();</script>
           <script>console.info("still running");</script>"#,
    );

    assert_eq!(launch.app.state(), BridgeState::Ready);
    assert_eq!(
        launch.sink.lines(),
        vec![(ConsoleLevel::Info, "?> \"still running\"".to_string())]
    );
}

#[test]
fn test_callback_type_checked() {
    let launch = launch("<p></p>");

    let message = launch
        .app
        .eval("try { _api.adderCallback(1, 2, 'not a function'); 'no error' } catch (e) { 'caught' }")
        .unwrap();
    assert_eq!(message, "\"caught\"");
}

#[test]
fn test_eval_renders_marshalled_values() {
    let launch = launch("<p></p>");

    assert_eq!(launch.app.eval("null").unwrap(), "null");
    assert_eq!(launch.app.eval("2.5").unwrap(), "2.5");
    assert_eq!(launch.app.eval("({ a: [1, 2] })").unwrap(), r#"{"a":[1,2]}"#);
    assert!(launch.app.eval("throw new Error('nope')").is_err());
}
