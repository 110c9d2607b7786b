use std::{process, sync::Arc};

use spacetravelling::{
    application::{
        detail::DetailService,
        error::AppError,
        feed::FeedService,
        repos::PostsRepo,
    },
    cache::PageCache,
    config,
    infra::{
        content::ContentClient,
        error::InfraError,
        http::{self, HttpState},
        telemetry,
    },
    presentation::views::{CommentsView, SiteChrome},
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

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
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repo: Arc<dyn PostsRepo> =
        Arc::new(ContentClient::new(&settings.content).map_err(AppError::from)?);
    let cache = Arc::new(PageCache::new(settings.cache.page_capacity));

    let site = SiteChrome {
        title: settings.site.title.clone(),
        base_url: settings.site.base_url.clone(),
    };
    let comments = CommentsView {
        repo: settings.comments.repo.clone(),
        issue_term: settings.comments.issue_term.clone(),
        label: settings.comments.label.clone(),
        theme: settings.comments.theme.clone(),
    };

    let feed = Arc::new(FeedService::new(repo.clone(), settings.content.page_size));
    let detail = Arc::new(DetailService::new(
        repo.clone(),
        cache,
        site.clone(),
        comments,
    ));

    let state = HttpState {
        feed,
        detail,
        posts: repo,
        site,
        repository: settings.content.repository.clone(),
    };
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.public_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "spacetravelling::serve",
        addr = %settings.server.public_addr,
        "Listening"
    );

    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}
