mod commands;
mod context;
mod examples;
mod output;
mod theme;
mod utils;

use anyhow::Result;
use clap::{
    ColorChoice, Command, CommandFactory, FromArgMatches, Parser, Subcommand,
    builder::{Styles, styling::AnsiColor},
    error::ErrorKind,
};

use colored::{Color as ThemeColor, Colorize, control::ShouldColorize};
use std::fmt::Write;
use std::io::{self, Write as IoWrite};
use std::path::PathBuf;

use commands::{
    CommandStatus,
    apply::{ApplyArgs, handle_apply},
    diff::{DiffArgs, handle_diff},
    generate::{GenerateArgs, handle_generate},
};
use context::SyncContext;
use examples::{ExampleGroup, command_examples};
use output::{GlobalOptions, OutputFormat, OutputManager};
use theme::{ICONS, THEME};

const ENVIRONMENT_VARIABLES: &[(&str, &str)] = &[
    ("DIRECTUS_URL", "Base URL of the Directus instance"),
    ("SERVER_MIGRATION_URL", "Fallback for DIRECTUS_URL"),
    ("NEXT_PUBLIC_API_URL", "Second fallback for DIRECTUS_URL"),
    ("ADMIN_EMAIL", "Admin email for password login"),
    ("ADMIN_PASSWORD", "Admin password for password login"),
    ("DIRECTUS_TOKEN", "Static access token (wins over email and password)"),
    ("SCHEMASYNC_DIR", "Snapshot directory (default ./directus)"),
    ("RUST_LOG", "Log filter, e.g. schemasync=debug"),
];

#[derive(Parser)]
#[command(name = "schemasync")]
#[command(version)]
#[command(
    about = "Keep a Directus schema in version control",
    long_about = r#"Schema snapshot CLI for Directus that provides:

• Snapshots of the live schema as plain JSON
• A preview of every create, update and delete before it happens
• Ordered application through the REST API, one request at a time
• A backup of the last applied snapshot

Commands:
  generate  Capture the live schema into schema.current.json
  diff      Compare schema.json against schema.current.json
  apply     Apply schema.json to the live instance

Settings are read from flags, the environment (and a .env file), then
schemasync.toml in the working directory.
"#
)]
#[command(subcommand_required = true, arg_required_else_help = true)]
struct Cli {
    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    output: OutputFormat,

    /// Suppress output (only errors will be shown)
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Enable verbose output
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Directory holding schema.json, schema.current.json and schema.previous.json
    #[arg(long, env = "SCHEMASYNC_DIR")]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn parse_with_styles() -> Self {
        let matches = match build_cli_command().try_get_matches() {
            Ok(matches) => matches,
            Err(err) if err.kind() == ErrorKind::MissingSubcommand => print_long_help_and_exit(err),
            Err(err) => err.exit(),
        };
        Cli::from_arg_matches(&matches).unwrap_or_else(|err| err.exit())
    }
}

/// Global flags alone (e.g. `schemasync -v`) show the full help, appendix included.
fn print_long_help_and_exit(error: clap::error::Error) -> ! {
    eprintln!("error: a command is required\n");
    let mut stderr = io::stderr();
    if build_cli_command().write_long_help(&mut stderr).is_ok() {
        let _ = IoWrite::flush(&mut stderr);
    }
    std::process::exit(error.exit_code());
}

fn build_cli_command() -> Command {
    let use_color = detect_color_support();
    let appendix = render_top_level_appendix(use_color);
    let mut command = Cli::command()
        .styles(help_styles())
        .after_long_help(appendix);
    command = command.color(if use_color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    });
    attach_command_examples(&mut command, use_color);
    command
}

fn attach_command_examples(command: &mut Command, use_color: bool) {
    for example in command_examples() {
        if let Some(subcommand) = command.find_subcommand_mut(example.name) {
            let help_text = render_examples(example.groups, use_color);
            *subcommand = subcommand.clone().after_long_help(help_text);
        }
    }
}

fn render_examples(groups: &[ExampleGroup], use_color: bool) -> String {
    let theme = &THEME;
    let mut buffer = String::new();

    let heading = stylize("Examples:", theme.highlight, true, use_color);
    let _ = writeln!(buffer, "{heading}");

    for (index, group) in groups.iter().enumerate() {
        let title = stylize(group.title, theme.heading, true, use_color);
        let _ = writeln!(buffer, "  {title}");

        for command in group.commands {
            let arrow = stylize(ICONS.arrow, theme.accent, false, use_color);
            let command_text = stylize(command, theme.accent, false, use_color);
            let _ = writeln!(buffer, "    {arrow} {command_text}");
        }

        if index + 1 < groups.len() {
            buffer.push('\n');
        }
    }

    if !buffer.ends_with('\n') {
        buffer.push('\n');
    }

    buffer
}

fn render_top_level_appendix(use_color: bool) -> String {
    let theme = &THEME;
    let mut buffer = String::new();

    let env_heading = stylize("Environment Variables:", theme.highlight, true, use_color);
    let _ = writeln!(buffer, "{env_heading}");
    for (key, description) in ENVIRONMENT_VARIABLES {
        let key_text = stylize(key, theme.key, true, use_color);
        let value_text = stylize(description, theme.value, false, use_color);
        let _ = writeln!(buffer, "  {key_text}  {value_text}");
    }

    buffer.push('\n');

    let tip_heading = stylize("Tip:", theme.highlight, true, use_color);
    let tip_text = stylize(
        "Use 'schemasync <command> --help' to view examples for each command.",
        theme.accent,
        false,
        use_color,
    );
    let _ = writeln!(buffer, "{tip_heading} {tip_text}");

    if !buffer.ends_with('\n') {
        buffer.push('\n');
    }

    buffer
}

fn stylize(text: &str, color: ThemeColor, bold: bool, use_color: bool) -> String {
    if use_color {
        let styled = text.color(color);
        if bold {
            styled.bold().to_string()
        } else {
            styled.to_string()
        }
    } else {
        text.to_string()
    }
}

fn detect_color_support() -> bool {
    ShouldColorize::from_env().should_colorize()
}

/// Help screen styles, in the same roles as `THEME`
fn help_styles() -> Styles {
    Styles::styled()
        .usage(AnsiColor::BrightBlue.on_default().bold())
        .header(AnsiColor::Cyan.on_default().bold())
        .literal(AnsiColor::Magenta.on_default())
        .placeholder(AnsiColor::BrightBlack.on_default())
        .valid(AnsiColor::Green.on_default())
        .invalid(AnsiColor::Yellow.on_default())
        .error(AnsiColor::Red.on_default().bold())
}

#[derive(Subcommand)]
enum Commands {
    /// Capture the live schema into schema.current.json
    Generate(GenerateArgs),

    /// Show what an apply would change, without touching the CMS
    Diff(DiffArgs),

    /// Apply schema.json to the live instance and back up the current snapshot
    Apply(ApplyArgs),
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse_with_styles();

    match execute(cli).await {
        Ok(CommandStatus::Success) => {}
        Ok(status) => std::process::exit(status.exit_code()),
        Err(err) => {
            eprintln!("Error: {err:#}");
            std::process::exit(1);
        }
    }
}

async fn execute(cli: Cli) -> Result<CommandStatus> {
    let global_options = GlobalOptions {
        output_format: cli.output,
        quiet: cli.quiet,
        verbose: cli.verbose,
        no_color: cli.no_color,
    };

    let output = OutputManager::new(global_options);
    let ctx = SyncContext::load(cli.dir)?;
    if ctx.config.is_some() {
        output.verbose(&format!("Loaded {}", ctx.config_path.display()));
    }

    let status = match cli.command {
        Commands::Generate(args) => handle_generate(args, &ctx, &output).await?,
        Commands::Diff(args) => handle_diff(args, &ctx, &output).await?,
        Commands::Apply(args) => handle_apply(args, &ctx, &output).await?,
    };

    Ok(status)
}
