//! `annotator` command-line front end

mod render;
mod session;

use annotator_schema::experiment_json_schema;
use annotator_store::pipeline::decode;
use annotator_store::sample::SAMPLE_JSON;
use annotator_store::{
    export_today, import_file, read_source, sample_experiment, write_export, AnnotatorConfig,
    BootSource, ExperimentStore, FileBackend, Persistence,
};
use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn cli() -> Command {
    Command::new("annotator")
        .version(annotator_store::VERSION)
        .about("Step through evaluation entries and label them pass/fail")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Config file (defaults to ./annotator.toml when present)"),
        )
        .subcommand(
            Command::new("validate")
                .about("Check a file against the experiment schema")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Experiment JSON file"),
                ),
        )
        .subcommand(
            Command::new("import")
                .about("Validate a file and make it the current experiment")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Experiment JSON file"),
                ),
        )
        .subcommand(
            Command::new("export")
                .about("Write the current experiment to experiment_YYYY-MM-DD.json")
                .arg(
                    Arg::new("out")
                        .long("out")
                        .value_parser(value_parser!(PathBuf))
                        .help("Target directory (defaults to the configured export_dir)"),
                )
                .arg(
                    Arg::new("stdout")
                        .long("stdout")
                        .action(ArgAction::SetTrue)
                        .conflicts_with("out")
                        .help("Print instead of writing a file"),
                ),
        )
        .subcommand(Command::new("status").about("Show name, progress and the first entry"))
        .subcommand(
            Command::new("clear")
                .about("Discard the current experiment and its stored snapshot")
                .arg(
                    Arg::new("yes")
                        .long("yes")
                        .short('y')
                        .action(ArgAction::SetTrue)
                        .help("Skip the confirmation prompt"),
                ),
        )
        .subcommand(Command::new("schema").about("Print the JSON Schema of the file format"))
        .subcommand(Command::new("sample").about("Print the bundled sample experiment"))
        .subcommand(Command::new("annotate").about("Interactive keyboard session"))
}

fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn open_store(config: &AnnotatorConfig) -> ExperimentStore<FileBackend> {
    let persistence = Persistence::new(
        FileBackend::new(&config.storage_dir),
        config.storage_key.as_str(),
    );
    let (store, source) = ExperimentStore::boot(persistence, sample_experiment());
    if source == BootSource::Fallback {
        tracing::debug!("No stored experiment, using bundled sample");
    }
    store
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    print!("{prompt} [y/N] ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let matches = cli().get_matches();

    let config = AnnotatorConfig::load(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))
        .context("failed to load configuration")?;
    init_tracing(&config.log_filter);

    match matches.subcommand() {
        Some(("validate", args)) => validate(args).await,
        Some(("import", args)) => {
            let path = required_path(args, "file")?;
            let mut store = open_store(&config);
            match import_file(&mut store, &path).await {
                Ok(report) => {
                    println!(
                        "Imported '{}' ({} entries, {} annotated)",
                        report.name, report.entries, report.annotated
                    );
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    eprintln!("Import failed:");
                    for line in e.diagnostics() {
                        eprintln!("  {line}");
                    }
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Some(("export", args)) => {
            let store = open_store(&config);
            let file = export_today(&store)?;
            if args.get_flag("stdout") {
                print!("{}", file.contents);
            } else {
                let dir = args
                    .get_one::<PathBuf>("out")
                    .cloned()
                    .unwrap_or_else(|| config.export_dir.clone());
                let path = write_export(&dir, &file)?;
                println!("Exported to {}", path.display());
            }
            Ok(ExitCode::SUCCESS)
        }
        Some(("status", _)) => {
            let store = open_store(&config);
            println!("{}", render::header(&store));
            println!("{}", render::current(&store));
            Ok(ExitCode::SUCCESS)
        }
        Some(("clear", args)) => {
            let mut store = open_store(&config);
            if args.get_flag("yes") || confirm("Clear all annotations and stored data?")? {
                store.clear();
                println!("Cleared.");
            } else {
                println!("Clear cancelled.");
            }
            Ok(ExitCode::SUCCESS)
        }
        Some(("schema", _)) => {
            println!("{}", serde_json::to_string_pretty(&experiment_json_schema())?);
            Ok(ExitCode::SUCCESS)
        }
        Some(("sample", _)) => {
            print!("{SAMPLE_JSON}");
            Ok(ExitCode::SUCCESS)
        }
        Some(("annotate", _)) => {
            let store = open_store(&config);
            let mut session = session::Session::new(store, config.export_dir.clone());
            let stdin = std::io::stdin();
            let mut stdout = std::io::stdout();
            session.run(stdin.lock(), &mut stdout).await?;
            Ok(ExitCode::SUCCESS)
        }
        _ => Ok(ExitCode::FAILURE),
    }
}

async fn validate(args: &ArgMatches) -> anyhow::Result<ExitCode> {
    let path = required_path(args, "file")?;
    let outcome = match read_source(&path).await {
        Ok(bytes) => decode(&bytes),
        Err(e) => Err(e),
    };
    match outcome {
        Ok(experiment) => {
            println!(
                "OK: '{}' ({} entries, {} annotated)",
                experiment.name,
                experiment.len(),
                experiment.annotated_count()
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{}:", path.display());
            for line in e.diagnostics() {
                eprintln!("  {line}");
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

fn required_path(args: &ArgMatches, id: &str) -> anyhow::Result<PathBuf> {
    args.get_one::<PathBuf>(id)
        .cloned()
        .with_context(|| format!("missing <{id}> argument"))
}
