//! Trade chart annotator.
//!
//! Opens one journal trade's chart either on the annotate page (draw and save
//! POI boxes, BOS lines and circles) or on the teach page (correct the
//! model's proposed shapes and submit the corrections as a lesson).

slint::include_modules!();

mod callbacks;
mod utils;

use anyhow::Result;
use callbacks::{AppContext, PageHandle};
use clap::Parser;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::info;
use trade_annotator::client::JournalClient;
use trade_annotator::config::{load_config, load_config_from};
use trade_annotator::overlay::TeachSession;
use trade_annotator::state::PageSession;

/// Annotate a journal trade's chart
#[derive(Parser, Debug)]
#[command(name = "trade-annotator")]
#[command(version)]
#[command(about = "Annotate trade charts and teach the chart model", long_about = None)]
struct Args {
    /// Journal trade to open
    #[arg(long)]
    trade_id: i64,

    /// Open the teach page instead of the annotate page
    #[arg(long)]
    teach: bool,

    /// Journal backend base URL, overriding the config file
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Config file to read instead of the default location
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("trade_annotator=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => load_config_from(path),
        None => load_config(),
    };
    if let Some(url) = args.base_url {
        config.server.base_url = url;
    }

    info!(
        "Opening trade {} on the {} page against {}",
        args.trade_id,
        if args.teach { "teach" } else { "annotate" },
        config.server.base_url
    );

    let client = Arc::new(JournalClient::new(
        &config.server.base_url,
        config.server.request_timeout_secs,
    )?);
    let canvas = Arc::new(config.canvas.clone());

    // Gestures and saves wait until the chart's natural size is known.
    let page = if args.teach {
        PageHandle::Teach(Arc::new(Mutex::new(TeachSession::awaiting_chart(args.trade_id, &canvas))))
    } else {
        PageHandle::Annotate(PageSession::awaiting_chart(args.trade_id, &canvas).shared())
    };

    let ui = AppWindow::new()?;
    ui.set_teach_mode(args.teach);
    ui.set_trade_title(format!("Trade #{}", args.trade_id).into());
    ui.set_chart(utils::placeholder_image());
    ui.set_tools(callbacks::drawing::tool_entries(args.teach));
    ui.set_palette(callbacks::drawing::palette_entries(&canvas));

    let ctx = AppContext {
        trade_id: args.trade_id,
        page,
        client,
        canvas,
    };
    callbacks::register_all(&ui, &ctx);
    ctx.page.refresh(&ui)?;
    callbacks::backend::load_page(&ui, &ctx);

    info!("UI ready, running event loop");
    ui.run()?;

    info!("Annotator closed");
    Ok(())
}
