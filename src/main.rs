use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;

use groupscholar_student_progress::provider::ProgressProvider;
use groupscholar_student_progress::session::{Outcome, ProgressSession};
use groupscholar_student_progress::{api, db, report, topics};

#[derive(Parser)]
#[command(name = "student-progress")]
#[command(
    about = "Monthly progress reports per student and topic for Group Scholar",
    long_about = None
)]
struct Cli {
    /// Where rosters, topics and evaluations are read from
    #[arg(long, value_enum, default_value_t = Source::Db, global = true)]
    source: Source,
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    database_url: Option<String>,
    #[arg(long, env = "PROGRESS_API_URL", global = true)]
    api_base_url: Option<String>,
    /// JSON lesson context(s) supplying topic trees for the api source
    #[arg(long, global = true)]
    lesson_file: Option<PathBuf>,
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Source {
    Db,
    Api,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Markdown,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a demo class with topics and evaluation history
    Seed,
    /// Import evaluation rows from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// List the students of a class
    Students {
        #[arg(long)]
        class: i64,
    },
    /// List every topic and sub-topic of a lesson
    Topics {
        #[arg(long)]
        lesson: i64,
    },
    /// Build the twelve-month progress chart for one student and topic
    Progress {
        #[arg(long)]
        class: i64,
        #[arg(long)]
        lesson: i64,
        #[arg(long)]
        student: i64,
        #[arg(long)]
        topic: i64,
        #[arg(long, value_enum, default_value_t = Format::Markdown)]
        format: Format,
        /// Write the report to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::InitDb => {
            let pool = connect(cli.database_url.as_deref()).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect(cli.database_url.as_deref()).await?;
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let pool = connect(cli.database_url.as_deref()).await?;
            let inserted = db::import_csv(&pool, csv).await?;
            println!("Inserted {inserted} evaluations from {}.", csv.display());
        }
        Commands::Students { class } => {
            let provider = build_provider(&cli).await?;
            let students = provider.students(*class).await?;
            print!("{}", report::render_students(&students));
        }
        Commands::Topics { lesson } => {
            let provider = build_provider(&cli).await?;
            let forest = provider.topics(*lesson).await?;
            print!("{}", report::render_topic_options(&topics::flatten(&forest)));
        }
        Commands::Progress {
            class,
            lesson,
            student,
            topic,
            format,
            out,
        } => {
            let provider = build_provider(&cli).await?;
            let session = ProgressSession::new(provider);
            session.load_students(*class).await?;
            session.load_topics(*lesson).await?;
            session.select_student(*student)?;
            session.select_topic(*topic)?;

            let series = match session.apply().await? {
                Outcome::Applied(series) => series,
                Outcome::Superseded => bail!("progress request was superseded"),
            };
            let (Some(student), Some(topic)) =
                (session.selected_student(), session.selected_topic())
            else {
                bail!("selection was cleared while loading");
            };

            let rendered = match format {
                Format::Markdown => {
                    report::render_markdown(&student, &topic, Utc::now().date_naive(), &series)
                }
                Format::Json => report::render_json(&series)?,
            };

            match out {
                Some(path) => {
                    std::fs::write(path, rendered)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Report written to {}.", path.display());
                }
                None => print!("{rendered}"),
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

async fn connect(database_url: Option<&str>) -> anyhow::Result<PgPool> {
    let database_url = database_url
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")
}

async fn build_provider(cli: &Cli) -> anyhow::Result<Box<dyn ProgressProvider>> {
    match cli.source {
        Source::Db => {
            let pool = connect(cli.database_url.as_deref()).await?;
            Ok(Box::new(db::PgProvider::new(pool)))
        }
        Source::Api => {
            let base_url = cli
                .api_base_url
                .as_deref()
                .context("PROGRESS_API_URL must be set when reading from the api")?;
            let lessons = match &cli.lesson_file {
                Some(path) => api::load_lessons(path)?,
                None => Vec::new(),
            };
            Ok(Box::new(api::ApiProvider::new(base_url, lessons)))
        }
    }
}
