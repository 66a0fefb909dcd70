mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use output::{OutputFormat, print_error};
use webbuild_lib::settings::Verbosity;

/// webbuild - Local builds for web applications
#[derive(Parser)]
#[command(name = "webbuild")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Increase verbosity (repeatable)
  #[arg(short, long, global = true, action = ArgAction::Count, conflicts_with = "quiet")]
  verbose: u8,

  /// Only report warnings and errors
  #[arg(short, long, global = true)]
  quiet: bool,

  #[command(subcommand)]
  command: Commands,
}

impl Cli {
  fn verbosity(&self) -> Verbosity {
    if self.quiet {
      return Verbosity::Quiet;
    }
    match self.verbose {
      0 => Verbosity::Normal,
      1 => Verbosity::Verbose,
      2 => Verbosity::VeryVerbose,
      _ => Verbosity::Debug,
    }
  }
}

#[derive(Subcommand)]
enum Commands {
  /// Build the applications of a project into its builds directory
  Build {
    /// Project source directory
    #[arg(default_value = ".")]
    source: PathBuf,

    /// Where web roots are published (default: the project's www link)
    #[arg(short, long)]
    destination: Option<PathBuf>,

    /// Copy files into the build instead of symlinking them
    #[arg(long)]
    copy: bool,

    /// Use absolute symlink targets
    #[arg(long)]
    abslinks: bool,

    /// Keep old builds
    #[arg(long)]
    no_clean: bool,

    /// Neither restore nor save build archives
    #[arg(long)]
    no_archive: bool,

    /// Disable dependency manager caches (implies --no-archive)
    #[arg(long)]
    no_cache: bool,

    /// Skip the applications' build hooks
    #[arg(long)]
    no_build_hooks: bool,

    /// Environment id used to name build and shared directories
    #[arg(long = "env")]
    environment_id: Option<String>,

    /// Override the document root of every application
    #[arg(long)]
    document_root: Option<PathBuf>,

    /// Drush make concurrency
    #[arg(long)]
    concurrency: Option<u32>,

    /// Keep VCS checkouts of Drush make projects
    #[arg(long)]
    working_copy: bool,

    /// Use and write Drush make lock files
    #[arg(long)]
    lock: bool,

    /// Only build these applications (repeatable)
    #[arg(long = "app", value_name = "ID")]
    apps: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },

  /// Delete old builds of a project
  Clean {
    /// Project directory
    #[arg(default_value = ".")]
    project: PathBuf,

    /// Only delete builds older than this (e.g. 1d, 12h)
    #[arg(long, value_parser = humantime::parse_duration)]
    max_age: Option<std::time::Duration>,

    /// Number of recent builds to keep (default: from configuration)
    #[arg(long)]
    keep: Option<usize>,

    /// Also delete builds the web root points at
    #[arg(long)]
    include_active: bool,

    /// Also delete archives no remaining build came from
    #[arg(long)]
    archives: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },

  /// Print the toolstack that would build an application
  Detect {
    /// Application root
    #[arg(default_value = ".")]
    app_root: PathBuf,
  },
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  let verbosity = cli.verbosity();

  let default_level = match verbosity {
    Verbosity::Quiet => "warn",
    Verbosity::Normal => "info",
    Verbosity::Verbose | Verbosity::VeryVerbose => "debug",
    Verbosity::Debug => "trace",
  };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let result = match cli.command {
    Commands::Build {
      source,
      destination,
      copy,
      abslinks,
      no_clean,
      no_archive,
      no_cache,
      no_build_hooks,
      environment_id,
      document_root,
      concurrency,
      working_copy,
      lock,
      apps,
      output,
    } => cmd::cmd_build(cmd::BuildArgs {
      source,
      destination,
      copy,
      abslinks,
      no_clean,
      no_archive,
      no_cache,
      no_build_hooks,
      environment_id,
      document_root,
      concurrency,
      working_copy,
      lock,
      apps,
      verbosity,
      output,
    }),
    Commands::Clean {
      project,
      max_age,
      keep,
      include_active,
      archives,
      output,
    } => cmd::cmd_clean(&project, max_age, keep, include_active, archives, output),
    Commands::Detect { app_root } => cmd::cmd_detect(&app_root),
  };

  match result {
    Ok(true) => ExitCode::SUCCESS,
    Ok(false) => ExitCode::FAILURE,
    Err(e) => {
      print_error(&format!("{e:#}"));
      ExitCode::FAILURE
    }
  }
}
