use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::{header, HeaderValue};
use axum::routing::{get, patch, post};
use axum::Router;
use clap::Parser;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

mod handlers;
mod logic;
mod reviews;
mod state;
mod storage;

use crate::handlers::{
    assets_handler, create_comment_handler, delete_comment_handler, list_comments_handler, ping_handler,
    review_handler, root_handler, update_comment_handler, upload_url_handler,
};
use crate::reviews::flush_dirty;
use crate::state::AppState;
use crate::storage::{AssetStore, FileStorage, LocalAssetStore, S3AssetStore, S3Storage, S3StorageConfig, Storage};

const FLUSH_INTERVAL: Duration = Duration::from_secs(60);
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,
    /// Review files when no bucket is configured.
    #[arg(long, env = "FRAMEREVIEW_DATA_DIR")]
    data_dir: Option<PathBuf>,
    #[arg(long, env = "FRAMEREVIEW_PUBLIC_DIR")]
    public_dir: Option<PathBuf>,
    /// Local assets, served under `/media`.
    #[arg(long, env = "FRAMEREVIEW_MEDIA_DIR")]
    media_dir: Option<PathBuf>,
    #[arg(long, env = "FRAMEREVIEW_S3_BUCKET")]
    s3_bucket: Option<String>,
    #[arg(long, env = "FRAMEREVIEW_S3_PREFIX")]
    s3_prefix: Option<String>,
    #[arg(long, env = "FRAMEREVIEW_S3_REGION")]
    s3_region: Option<String>,
    #[arg(long, env = "FRAMEREVIEW_S3_ENDPOINT")]
    s3_endpoint: Option<String>,
    #[arg(long, env = "FRAMEREVIEW_S3_FORCE_PATH_STYLE")]
    s3_force_path_style: bool,
    #[arg(long, env = "FRAMEREVIEW_S3_ACCESS_KEY_ID")]
    s3_access_key_id: Option<String>,
    #[arg(long, env = "FRAMEREVIEW_S3_SECRET_ACCESS_KEY", hide_env_values = true)]
    s3_secret_access_key: Option<String>,
    /// Public URL prefix of uploaded assets. Defaults to the bucket's virtual-host URL.
    #[arg(long, env = "FRAMEREVIEW_ASSET_BASE_URL")]
    asset_base_url: Option<String>,
    #[arg(long, env = "FRAMEREVIEW_TLS_CERT", requires = "tls_key")]
    tls_cert: Option<PathBuf>,
    #[arg(long, env = "FRAMEREVIEW_TLS_KEY", requires = "tls_cert")]
    tls_key: Option<PathBuf>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,framereview_server=debug"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn manifest_relative(dir: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(dir)
}

async fn build_stores(args: &Args) -> anyhow::Result<(Arc<dyn Storage>, Arc<dyn AssetStore>)> {
    if let Some(bucket) = args.s3_bucket.clone() {
        let mut config = S3StorageConfig::new(bucket.clone());
        config.prefix = args.s3_prefix.clone();
        config.region = args.s3_region.clone();
        config.endpoint_url = args.s3_endpoint.clone();
        config.force_path_style = args.s3_force_path_style;
        config.access_key_id = args.s3_access_key_id.clone();
        config.secret_access_key = args.s3_secret_access_key.clone();
        let client = config.client().await;
        let public_base = args
            .asset_base_url
            .clone()
            .unwrap_or_else(|| format!("https://{bucket}.s3.amazonaws.com"));
        tracing::info!(%bucket, "storing reviews and assets in s3");
        return Ok((
            Arc::new(S3Storage::new(client.clone(), &config)),
            Arc::new(S3AssetStore::new(client, bucket, &public_base)),
        ));
    }

    let data_dir = args
        .data_dir
        .clone()
        .unwrap_or_else(|| manifest_relative("../reviews"));
    tokio::fs::create_dir_all(&data_dir)
        .await
        .with_context(|| format!("failed to create data dir {}", data_dir.display()))?;
    let media_dir = args
        .media_dir
        .clone()
        .unwrap_or_else(|| manifest_relative("../media"));
    tracing::info!(data_dir = %data_dir.display(), media_dir = %media_dir.display(), "storing reviews on disk");
    Ok((
        Arc::new(FileStorage::new(data_dir)),
        Arc::new(LocalAssetStore::new(media_dir)),
    ))
}

fn router(state: AppState, public_dir: PathBuf, media_dir: PathBuf) -> Router {
    let index_file = public_dir.join("index.html");
    let static_files = ServeDir::new(public_dir).append_index_html_on_directories(true);
    Router::new()
        .route("/", get(root_handler))
        .route("/ping", get(ping_handler))
        .route("/review/:video_id", get(review_handler))
        .route(
            "/api/videos/:video_id/comments",
            get(list_comments_handler).post(create_comment_handler),
        )
        .route(
            "/api/videos/:video_id/comments/:comment_id",
            patch(update_comment_handler).delete(delete_comment_handler),
        )
        .route("/api/upload-url", post(upload_url_handler))
        .route("/api/assets", get(assets_handler))
        .nest_service("/media", ServeDir::new(media_dir))
        .fallback_service(static_files)
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache"),
        ))
        .layer(axum::Extension(index_file))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn spawn_flush_task(state: AppState) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(FLUSH_INTERVAL);
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            flush_dirty(&state).await;
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::warn!(%error, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::warn!(%error, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let (storage, assets) = build_stores(&args).await?;
    let state = AppState::new(storage, assets);
    let public_dir = args
        .public_dir
        .clone()
        .unwrap_or_else(|| manifest_relative("../public"));
    let media_dir = args
        .media_dir
        .clone()
        .unwrap_or_else(|| manifest_relative("../media"));
    let app = router(state.clone(), public_dir, media_dir);
    let flush_task = spawn_flush_task(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    match (args.tls_cert.as_ref(), args.tls_key.as_ref()) {
        (Some(cert), Some(key)) => {
            let tls = axum_server::tls_rustls::RustlsConfig::from_pem_file(cert, key)
                .await
                .context("failed to load TLS certificate")?;
            let handle = axum_server::Handle::new();
            let shutdown_handle = handle.clone();
            tokio::spawn(async move {
                shutdown_signal().await;
                shutdown_handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
            });
            tracing::info!("review server running at https://localhost:{}", args.port);
            axum_server::bind_rustls(addr, tls)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .context("server crashed")?;
        }
        _ => {
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("failed to bind {addr}"))?;
            tracing::info!("review server running at http://localhost:{}", args.port);
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("server crashed")?;
        }
    }

    flush_task.abort();
    let saved = flush_dirty(&state).await;
    tracing::info!(saved, "final flush complete");
    Ok(())
}
