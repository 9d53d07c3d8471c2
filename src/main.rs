use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gpa_calculator::{aggregate, config, import, report, GradingPolicy, Preset, Score};

#[derive(Parser)]
#[command(name = "gpa-calculator")]
#[command(about = "Semester GPA and cumulative CGPA calculator for Group Scholar", long_about = None)]
struct Cli {
    #[command(flatten)]
    policy: PolicyArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct PolicyArgs {
    /// Built-in grading scale
    #[arg(long, global = true, env = "GPA_POLICY", default_value_t = Preset::Strict)]
    policy: Preset,

    /// TOML grading scale overriding the preset
    #[arg(long, global = true, env = "GPA_SCALE")]
    scale: Option<PathBuf>,

    /// Count unknown letter grades as 0.0 points instead of failing
    #[arg(long, global = true)]
    allow_unknown_letters: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// GPA per semester, CGPA and course totals
    Summary {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// GPA for a single semester
    Semester {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        semester: u32,
    },
    /// CGPA over semesters 1 through N
    Cumulative {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        upto: u32,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Convert one score to grade points
    #[command(group(
        ArgGroup::new("score")
            .args(["marks", "letter", "points"])
            .required(true)
            .multiple(false)
    ))]
    Convert {
        #[arg(long)]
        marks: Option<f64>,
        #[arg(long)]
        letter: Option<String>,
        #[arg(long)]
        points: Option<f64>,
    },
    /// Print the active grading tables
    Scales,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let policy = config::load_policy(
        cli.policy.policy,
        cli.policy.scale.as_deref(),
        cli.policy.allow_unknown_letters,
    )?;

    match cli.command {
        Commands::Summary { csv, format } => {
            let records = import::import_csv(&csv)?;
            let (summary, trend) = aggregate::summarize_with_trend(&records, &policy)
                .with_context(|| format!("failed to summarize {}", csv.display()))?;
            match format {
                Format::Text => print!("{}", report::render_text(&policy, &summary)),
                Format::Json => {
                    let json = report::build_json(&policy, &summary, &trend);
                    println!("{}", serde_json::to_string_pretty(&json)?);
                }
            }
        }
        Commands::Semester { csv, semester } => {
            let records = import::import_csv(&csv)?;
            let summary = aggregate::compute_semester_gpa(&records, semester, &policy)?;
            println!("{}", report::render_semester(&policy, &summary));
        }
        Commands::Cumulative { csv, upto } => {
            let records = import::import_csv(&csv)?;
            let summary = aggregate::compute_cumulative_gpa(&records, upto, &policy)?;
            println!("{}", report::render_cumulative(&policy, &summary));
        }
        Commands::Report { csv, out } => {
            let records = import::import_csv(&csv)?;
            let (summary, trend) = aggregate::summarize_with_trend(&records, &policy)?;
            let source = csv.display().to_string();
            let output =
                report::build_report(&source, &policy, &summary, &trend, chrono::Utc::now());
            std::fs::write(&out, output)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Convert {
            marks,
            letter,
            points,
        } => {
            let score = match (marks, letter, points) {
                (Some(marks), _, _) => Score::Marks(marks),
                (_, Some(letter), _) => Score::Letter(letter),
                (_, _, Some(points)) => Score::Points(points),
                _ => anyhow::bail!("one of --marks, --letter or --points is required"),
            };
            print_conversion(&policy, &score)?;
        }
        Commands::Scales => print!("{}", report::render_scales(&policy)),
    }

    Ok(())
}

fn print_conversion(policy: &GradingPolicy, score: &Score) -> anyhow::Result<()> {
    let points = policy.points_for(score)?;
    let letter = policy.letter_from_points(points)?;
    println!("{points:.2} grade points ({letter}) on the {} scale", policy.name());
    Ok(())
}
