mod app;

use std::sync::Arc;

use confession_core::{
    ApiClient, AppConfig, DeploymentContext, EmbedPolicy, NoEmbedSdk, OverlayContext, SessionStore,
};
use eframe::{egui, NativeOptions};
use tokio::runtime::Runtime;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::app::{AppInit, ConfessionApp};

fn main() -> eframe::Result<()> {
    init_tracing();

    let runtime = Arc::new(Runtime::new().expect("failed to initialise Tokio runtime"));
    let config = AppConfig::load();
    let session = load_session(&runtime);
    let client =
        ApiClient::new(&config.api, session).expect("failed to build HTTP client");
    let auth_events = client.auth_events();

    let overlay_ctx = OverlayContext::new(
        Arc::new(NoEmbedSdk),
        DeploymentContext::new(
            config.deployment_host.clone(),
            config.embed.production_hosts.clone(),
        ),
        EmbedPolicy::from(&config.embed),
    );

    let init = AppInit {
        runtime,
        config,
        client,
        auth_events,
        overlay_ctx,
    };

    eframe::run_native(
        "Confession Board",
        NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size([900.0, 800.0])
                .with_min_inner_size([600.0, 500.0]),
            ..Default::default()
        },
        Box::new(move |_cc| Box::new(ConfessionApp::new(init))),
    )
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn load_session(runtime: &Arc<Runtime>) -> SessionStore {
    match AppConfig::session_file_path() {
        Ok(path) => runtime.block_on(SessionStore::load_from(&path)),
        Err(e) => {
            warn!(error = %e, "no config dir, admin session will not persist");
            SessionStore::in_memory()
        }
    }
}
