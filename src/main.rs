use std::collections::HashMap;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use facciata::{
    application::{
        error::AppError,
        pipeline::RequestPipeline,
        render::JsonRenderer,
        resolver::UpstreamResolver,
        site::Site,
    },
    cache::{InvalidationSink, SiteRegistry},
    config,
    domain::types::SiteId,
    infra::{
        error::InfraError,
        http::{self, GatewayState, SiteContext},
        purge::HttpPurgeSink,
        telemetry,
        upstream::HttpFetcher,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;
use url::Url;

const UPSTREAM_TIMEOUT_SECS: u64 = 30;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(config::ServeArgs::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    settings.validate()?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(UPSTREAM_TIMEOUT_SECS))
        .build()
        .map_err(|err| InfraError::http_client(err.to_string()))?;
    let fetcher = Arc::new(HttpFetcher::new(client.clone()));

    let mut sites = HashMap::new();
    for site_settings in &settings.sites {
        let endpoint = Url::parse(&site_settings.endpoint).map_err(|err| {
            InfraError::configuration(format!(
                "site `{}` has an invalid endpoint: {err}",
                site_settings.id
            ))
        })?;

        let sink: Option<Arc<dyn InvalidationSink>> =
            match &site_settings.config.cache.invalidator {
                Some(invalidator) => {
                    let purge_endpoint = Url::parse(invalidator).map_err(|err| {
                        InfraError::configuration(format!(
                            "site `{}` has an invalid invalidator: {err}",
                            site_settings.id
                        ))
                    })?;
                    Some(Arc::new(HttpPurgeSink::new(client.clone(), purge_endpoint)))
                }
                None => None,
            };

        let site = Arc::new(Site::new(
            SiteId::new(site_settings.id.as_str()),
            site_settings.config.clone(),
            endpoint,
            fetcher.clone(),
            sink,
        ));

        let context = Arc::new(SiteContext {
            pipeline: RequestPipeline::new(
                site,
                Arc::new(UpstreamResolver),
                Arc::new(JsonRenderer),
            ),
        });

        for host in &site_settings.hosts {
            sites.insert(host.clone(), context.clone());
        }

        info!(
            target = "facciata::server",
            site = %site_settings.id,
            hosts = ?site_settings.hosts,
            "site provisioned"
        );
    }

    let site_count = settings.sites.len();
    let registry = Arc::new(SiteRegistry::new());
    let router = http::build_router(GatewayState::new(sites, registry));

    let addr = settings.server.addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "facciata::server",
        addr = %addr,
        sites = site_count,
        "gateway listening"
    );

    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}
