//! Resource lookup relative to the application root.

use std::path::{Path, PathBuf};

use tracing::info;

use dejaview_bridge::EntryContent;

use crate::config::DejaviewConfig;

/// Loaded when no entry page is configured.
///
/// Its script walks every console level and value kind once, then defines one
/// wrapper per demo API method for use from the REPL.
pub const FALLBACK_PAGE: &str = r#"<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>DeJaView test page</title>
</head>
<body>
<h1>test page</h1>
<script>
    _api.log('hello from the frontend');

    console.log('test');
    console.log({"foo":"bar"});
    console.log(null);
    console.log(undefined);
    console.log(true);
    console.log(5);
    console.log(5.123153);
    console.log(function () { output('test'); });
    console.log(Date);
    console.info('console.info');
    console.warn('console.warn');
    console.error('console.error');

    var lastOutput = null;

    function output(value) {
        lastOutput = value;
        _api.log(String(value));
    }

    function dirChooser() {
        _api.openDirChooser(dir => output(dir));
    }

    function fileChooser() {
        _api.openFileChooser(file => output(file));
    }

    function helloWorld() {
        output(_api.helloWorld());
    }

    function adder() {
        _api.adderCallback(1, 2, sum => output(sum));
    }

    function minimize() {
        _api.minimize();
    }

    function exit() {
        _api.exit();
    }
</script>
</body>
</html>
"#;

/// Resolves configured relative paths.
#[derive(Debug, Clone)]
pub struct Resources {
    root: PathBuf,
}

impl Resources {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(config: &DejaviewConfig) -> Self {
        Self::new(config.resource_root.clone().unwrap_or_else(app_path))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// A leading `/` still means "under the root".
    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.root.join(relative.trim_start_matches(['/', '\\']))
    }

    /// The entry content for `page_relative_path`.
    pub fn entry(&self, page_relative_path: &str) -> EntryContent {
        if page_relative_path.is_empty() {
            info!("No entry path given - loading test page");
            return EntryContent::Markup(FALLBACK_PAGE.to_string());
        }
        EntryContent::Page(self.resolve(page_relative_path))
    }

    pub fn icon(&self, icon_relative_path: &str) -> Option<PathBuf> {
        (!icon_relative_path.is_empty()).then(|| self.resolve(icon_relative_path))
    }
}

/// The directory the application runs from.
pub fn app_path() -> PathBuf {
    std::env::current_dir()
        .and_then(|dir| dir.canonicalize())
        .unwrap_or_else(|_| PathBuf::from("."))
}
