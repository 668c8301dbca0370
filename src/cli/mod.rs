mod combine;
mod count_support;
mod shared;
mod utils;

use camino::Utf8Path;
use clap::{Parser, Subcommand};
use simple_error::{SimpleResult, bail};

use self::combine::validate_and_fix_combine_settings;
pub use self::combine::CombineSettings;
use self::count_support::validate_and_fix_count_support_settings;
pub use self::count_support::CountSupportSettings;
use self::shared::validate_and_fix_shared_settings;
pub use self::shared::SharedSettings;

#[derive(Subcommand)]
pub enum Commands {
    /// Merge the split partial alignments of each read into single gapped alignments
    Combine(CombineSettings),

    /// Count the reads supporting each candidate SV breakpoint from contig alignments
    CountSupport(CountSupportSettings),
}

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    help_template = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}"
)]
#[clap(propagate_version = true, rename_all = "kebab_case")]
pub struct Settings {
    #[command(flatten)]
    pub shared: SharedSettings,

    #[command(subcommand)]
    pub command: Commands,
}

impl Settings {
    pub fn get_output_dir(&self) -> &Utf8Path {
        match &self.command {
            Commands::Combine(x) => &x.output_dir,
            Commands::CountSupport(x) => &x.output_dir,
        }
    }
}

/// Checks if a directory does not exist
///
pub fn check_novel_dirname(dirname: &Utf8Path, label: &str) -> SimpleResult<()> {
    if dirname.exists() {
        bail!("{label} already exists: \"{dirname}\"");
    }
    Ok(())
}

/// Validate settings and update parameters that can't be processed by clap
///
/// Assumes that the logger is not setup
///
fn validate_and_fix_settings_impl(mut settings: Settings) -> SimpleResult<Settings> {
    settings.shared = validate_and_fix_shared_settings(settings.shared)?;

    settings.command = match settings.command {
        Commands::Combine(x) => {
            let x = validate_and_fix_combine_settings(x)?;
            Commands::Combine(x)
        }
        Commands::CountSupport(x) => {
            let x = validate_and_fix_count_support_settings(x)?;
            Commands::CountSupport(x)
        }
    };

    Ok(settings)
}

/// Validate settings and update to parameters that can't be processed automatically by clap.
///
pub fn validate_and_fix_settings(settings: Settings) -> Settings {
    match validate_and_fix_settings_impl(settings) {
        Ok(x) => x,
        Err(msg) => {
            eprintln!("Invalid command-line setting: {msg}");
            std::process::exit(exitcode::USAGE);
        }
    }
}

pub fn parse_settings() -> Settings {
    Settings::parse()
}
