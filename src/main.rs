use clap::Parser;
use fyrechat::models::settings::OverlaySettings;
use fyrechat::services::bubble_service::BubbleService;
use fyrechat::services::catalog_service::{CatalogHandle, CatalogService};
use fyrechat::services::debug_banner::StatusReporter;
use fyrechat::services::demo_service::DemoService;
use fyrechat::services::diagnostic_logger;
use fyrechat::services::irc_service::{FixedBackoff, IrcService};
use fyrechat::services::overlay_server::{self, BroadcastSink};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "fyrechat", version, about = "Live Twitch chat overlay engine")]
struct Args {
    /// Settings file (JSON). Falls back to the per-user config location.
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// Query-string overrides, e.g. `ch=somechannel&max=12&debug=1`.
    #[arg(long = "overrides", default_value = "")]
    overrides: String,

    /// Overlay server port.
    #[arg(long = "port")]
    port: Option<u16>,

    /// Run the sample matrix instead of connecting to chat.
    #[arg(long = "demo")]
    demo: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    diagnostic_logger::init_logging();
    let args = Args::parse();

    let mut settings = OverlaySettings::load(args.config.as_deref()).unwrap_or_else(|e| {
        log::warn!("[Settings] Failed to load settings, using defaults: {}", e);
        OverlaySettings::default()
    });
    settings.apply_overrides(args.overrides.trim_start_matches('?'));
    if let Some(port) = args.port {
        settings.port = port;
    }
    if args.demo {
        settings.demo = true;
    }
    settings.normalize();
    diagnostic_logger::set_diagnostics_enabled(settings.debug);
    let settings = Arc::new(settings);

    let sink = Arc::new(BroadcastSink::new());
    let bubbles = Arc::new(BubbleService::new(settings.lifecycle(), sink.clone()));
    let catalogs = CatalogHandle::new();
    let reporter = StatusReporter::new(settings.clone(), catalogs.clone(), sink.clone());

    let addr = SocketAddr::from(([127, 0, 0, 1], settings.port));
    let _server = overlay_server::serve(sink.clone(), &settings, addr);

    reporter.report("Boot…").await;
    let catalog_service = Arc::new(CatalogService::new(settings.clone(), catalogs.clone()));
    catalog_service.refresh().await;
    let _refresh = catalog_service.spawn_refresh_loop();
    reporter.report("Ready").await;

    if settings.demo {
        DemoService::new(settings.clone(), bubbles, catalogs).run().await;
    } else {
        IrcService::new(&settings.channel, settings.emotes.enabled, bubbles, catalogs)
            .with_reporter(reporter)
            .run(FixedBackoff::default())
            .await;
    }

    Ok(())
}
