//! DeJaView
//!
//! Loads a page, binds the demo API into it and optionally evaluates script
//! typed on standard input.

use std::io::{IsTerminal, Write};

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use dejaview::dialogs::PromptDialogs;
use dejaview::{Args, DejaviewConfig, DemoApi, InterfaceHandle, ShellError, spawn_interface};

fn main() -> Result<()> {
    let args = Args::parse();
    let config = DejaviewConfig::load(&args)?;

    if args.print_config {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("dejaview=info,dejaview_bridge=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(args, config))
}

async fn async_main(args: Args, config: DejaviewConfig) -> Result<()> {
    info!("Starting DeJaView v{}", env!("CARGO_PKG_VERSION"));

    let interactive =
        args.repl || (config.page_relative_path.is_empty() && std::io::stdin().is_terminal());
    let binding = config.api_var_name.clone();

    let handle = spawn_interface(config, || DemoApi::new(PromptDialogs))?;

    if interactive {
        repl(&handle, &binding).await?;
    }

    handle.shutdown();
    let state = tokio::task::spawn_blocking(move || handle.join()).await??;
    info!(?state, "DeJaView stopped");
    Ok(())
}

/// Evaluate one line at a time until end of input or the page closes.
async fn repl(handle: &InterfaceHandle, binding: &str) -> Result<()> {
    println!("Script typed here runs in the page. `{}` is the native API; Ctrl-D quits.", binding);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        match handle.eval(line).await {
            Ok(rendered) => println!("{}", rendered),
            Err(ShellError::JavaScript(message)) => println!("x> {}", message),
            Err(e) => {
                warn!("interface stopped: {}", e);
                break;
            }
        }

        if handle.is_closed() {
            break;
        }
    }

    Ok(())
}
