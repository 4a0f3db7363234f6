//! Demo entry-point: seeds an in-memory catalogue and walks a patron through
//! the loan lifecycle, then runs the background reconciler briefly.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::io;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use futures_util::TryStreamExt;
use lending::config::LibrarySettings;
use lending::domain::{
    AccessGate, BookDraft, CatalogueListing, CatalogueService, CurrentUser, DomainError,
    LoanEngine, ReconciliationWorker, Reconciler, Role,
};
use lending::outbound::memory::{InMemoryIdentityProvider, InMemoryLending};
use mockable::{Clock, DefaultClock};
use ortho_config::OrthoConfig;
use tokio::runtime::Builder;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

const SEED_BOOKS: [(&str, &str); 5] = [
    ("星の王子さま", "サン＝テグジュペリ"),
    ("吾輩は猫である", "夏目漱石"),
    ("ノルウェイの森", "村上春樹"),
    ("銀河鉄道の夜", "宮沢賢治"),
    ("こころ", "夏目漱石"),
];

/// `lending-demo` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "lending-demo",
    about = "Walk a patron through borrowing and returning books against in-memory stores",
    version
)]
struct CliArgs {
    /// Patron identifier used for the walkthrough.
    #[arg(long = "patron", value_name = "id", default_value = "patron-1")]
    patron: String,
    /// Keep the background reconciler running for this many milliseconds.
    #[arg(long = "worker-millis", value_name = "ms", default_value_t = 0)]
    worker_millis: u64,
}

fn main() -> io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let runtime = Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|error| io::Error::other(format!("create Tokio runtime: {error}")))?;
    runtime.block_on(async_main())
}

async fn async_main() -> io::Result<()> {
    let args = CliArgs::try_parse().map_err(io::Error::other)?;
    // Command-line flags belong to the demo; settings come from the
    // environment and configuration files only.
    let settings = LibrarySettings::load_from_iter([OsString::from("lending")])
        .map_err(|error| io::Error::other(format!("load settings: {error}")))?;
    let engine_config = settings.loan_engine().map_err(io::Error::other)?;
    let catalogue_config = settings.catalogue().map_err(io::Error::other)?;
    let reconciliation_config = settings.reconciliation().map_err(io::Error::other)?;

    let stores = InMemoryLending::new();
    let ports = stores.ports();
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let reconciler = Reconciler::new(ports.clone(), Arc::clone(&clock), reconciliation_config);
    let engine = LoanEngine::with_reconciler(
        ports.clone(),
        Arc::clone(&clock),
        engine_config,
        reconciler.clone(),
    );

    let admin = CurrentUser::try_from_strings("admin-1", Role::Admin.as_str())
        .map_err(io::Error::other)?;
    let curation = CatalogueService::new(
        Arc::clone(&ports.catalogue),
        Arc::clone(&ports.loans),
        catalogue_config,
    );
    seed_catalogue(&curation, &admin).await.map_err(domain_failure)?;

    let patron = CurrentUser::try_from_strings(&args.patron, Role::User.as_str())
        .map_err(io::Error::other)?;
    let identity = Arc::new(InMemoryIdentityProvider::signed_in_as(patron));
    let gate = AccessGate::new(identity, settings.store_deadline());
    walkthrough(&gate, &engine).await.map_err(domain_failure)?;

    let first_page = curation
        .list_books(&admin, &CatalogueListing::default())
        .await
        .map_err(domain_failure)?;
    println!(
        "catalogue page {}/{} ({} books)",
        first_page.page(),
        first_page.total_pages(),
        first_page.total_count()
    );

    let report = reconciler.reconcile_all().await.map_err(domain_failure)?;
    println!(
        "reconciled {} books, repaired {}",
        report.books_checked, report.flags_repaired
    );

    if args.worker_millis > 0 {
        run_worker(reconciler, Duration::from_millis(args.worker_millis)).await;
    }
    Ok(())
}

async fn seed_catalogue(
    curation: &CatalogueService,
    admin: &CurrentUser,
) -> Result<(), DomainError> {
    for (title, author) in SEED_BOOKS {
        let draft = BookDraft::try_from_strings(title, author)
            .map_err(|err| DomainError::invalid_request(err.to_string()))?;
        curation.create_book(admin, &draft).await?;
    }
    info!(count = SEED_BOOKS.len(), "catalogue seeded");
    Ok(())
}

async fn walkthrough(gate: &AccessGate, engine: &LoanEngine) -> Result<(), DomainError> {
    let patron = gate.require_user().await?;
    let landing = gate.landing().await?;
    println!("signed in as {} ({landing:?})", patron.id());

    let mut available = pin!(engine.list_available(None).stream());
    let Some(book) = available.try_next().await? else {
        println!("nothing to borrow");
        return Ok(());
    };

    let loan = engine.borrow(patron.id(), book.id()).await?;
    println!(
        "borrowed {} (loan {}), due {}",
        loan.book_title(),
        loan.id(),
        loan.due_at().to_rfc3339()
    );
    if let Err(err) = engine.borrow(patron.id(), book.id()).await {
        println!("second borrow refused: {err}");
    }

    let still_available = engine.list_available(None).collect().await?;
    println!("{} books still available", still_available.len());

    let closed = engine.return_loan(loan.id(), book.id()).await?;
    if let Some(returned_at) = closed.returned_at() {
        println!("returned {} at {}", closed.book_title(), returned_at.to_rfc3339());
    }

    for entry in engine.list_history(patron.id()).await? {
        println!(
            "history: {} borrowed {} returned {}",
            entry.book_title,
            entry.borrowed_at.to_rfc3339(),
            entry
                .returned_at
                .map_or_else(|| "-".to_owned(), |at| at.to_rfc3339())
        );
    }
    Ok(())
}

async fn run_worker(reconciler: Reconciler, runtime: Duration) {
    let (stop, shutdown) = watch::channel(false);
    let worker = ReconciliationWorker::new(Arc::new(reconciler));
    let handle = tokio::spawn(worker.run(shutdown));
    tokio::time::sleep(runtime).await;
    if stop.send(true).is_err() {
        warn!("reconciliation worker already stopped");
    }
    match handle.await {
        Ok(passes) => info!(passes, "reconciliation worker stopped"),
        Err(error) => warn!(%error, "reconciliation worker panicked"),
    }
}

fn domain_failure(error: DomainError) -> io::Error {
    io::Error::other(error)
}
