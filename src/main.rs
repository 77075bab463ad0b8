use std::{path::Path, process, sync::Arc};

use folio::{
    application::{
        content::{ContentOptions, ContentService},
        error::{AppError, ErrorReport},
        render::{DiffHtmlOptions, DiffRenderer},
        repos::{CreateFolderParams, CreatePageParams, FoldersRepo, PagesRepo, Repositories},
    },
    cache::{CacheConfig, CacheContext},
    config::{self, DiffArgs, Settings, TreeArgs},
    domain::entities::{FolderRecord, PageRecord},
    infra::{
        diff::SimilarDiffRenderer, error::InfraError, memory::InMemoryStore,
        registry::RegistryVersionLookup, telemetry,
    },
};
use serde::de::DeserializeOwned;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

const SOURCE: &str = "folio::main";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    let report = ErrorReport::from_error(SOURCE, error);
    if dispatcher::has_been_set() {
        error!(source = report.source, error = %report.joined(), "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(source = report.source, error = %report.joined(), "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match cli_args.command {
        config::Command::Tree(args) => run_tree(&settings, args).await,
        config::Command::Diff(args) => run_diff(&settings, args).await,
        config::Command::Version(_) => run_version(&settings).await,
    }
}

fn build_service(settings: &Settings, store: Arc<InMemoryStore>) -> Result<ContentService, AppError> {
    let cache = Arc::new(CacheContext::new(CacheConfig::from(&settings.cache)));
    let renderer = Arc::new(SimilarDiffRenderer::new(settings.diffs.max_input_bytes));
    let version = Arc::new(RegistryVersionLookup::new(
        settings.version.registry_url.as_str(),
        settings.version.timeout,
    )?);

    Ok(ContentService::new(
        Repositories::from_store(store),
        cache,
        renderer,
        version,
        ContentOptions {
            max_diffs: settings.diffs.max_diffs.get(),
            package: settings.version.package.clone(),
        },
    ))
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let bytes = tokio::fs::read(path).await.map_err(InfraError::from)?;
    let value = serde_json::from_slice(&bytes).map_err(InfraError::from)?;
    Ok(value)
}

async fn run_tree(settings: &Settings, args: TreeArgs) -> Result<(), AppError> {
    let folders: Vec<FolderRecord> = read_json(&args.records).await?;
    let pages: Vec<PageRecord> = match args.pages.as_deref() {
        Some(path) => read_json(path).await?,
        None => Vec::new(),
    };

    let store = Arc::new(InMemoryStore::new());
    for folder in &folders {
        store
            .create_folder(CreateFolderParams {
                id: folder.id.clone(),
                name: folder.name.clone(),
                parent: folder.parent.clone(),
                created_at: folder.created_at,
            })
            .await?;
    }
    for page in &pages {
        store
            .create_page(CreatePageParams {
                id: page.id.clone(),
                metadata: page.metadata(),
                created_at: page.created_at,
            })
            .await?;
    }

    let service = build_service(settings, store)?;
    let tree = if args.pages.is_some() {
        service.folder_tree().await?
    } else {
        service.page_folder_tree().await?
    };
    info!(
        folders = folders.len(),
        pages = pages.len(),
        roots = tree.len(),
        "Folder tree built"
    );

    let json = serde_json::to_string_pretty(tree.as_ref()).map_err(InfraError::from)?;
    println!("{json}");
    Ok(())
}

async fn run_diff(settings: &Settings, args: DiffArgs) -> Result<(), AppError> {
    let (old, new) = tokio::try_join!(
        tokio::fs::read_to_string(&args.old),
        tokio::fs::read_to_string(&args.new)
    )
    .map_err(InfraError::from)?;

    let renderer = SimilarDiffRenderer::new(settings.diffs.max_input_bytes);
    let label = args
        .new
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.new.display().to_string());
    let diff = renderer.unified_diff(&label, &old, &new)?;

    if args.html || args.side_by_side {
        let html = renderer.render_html(
            &diff,
            &DiffHtmlOptions {
                side_by_side: args.side_by_side,
                line_numbers: true,
                title: args.title,
            },
        )?;
        print!("{html}");
    } else {
        print!("{diff}");
    }
    Ok(())
}

async fn run_version(settings: &Settings) -> Result<(), AppError> {
    let service = build_service(settings, Arc::new(InMemoryStore::new()))?;
    let info = service.latest_version().await?;
    println!("{} {}", info.package, info.version);
    Ok(())
}
