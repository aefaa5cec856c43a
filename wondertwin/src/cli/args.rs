//! Clap derive structs for `wt` command-line parsing.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

// ============================================================================
// Root CLI
// ============================================================================

/// Fleet controller for behavioral twins.
#[derive(Parser, Debug)]
#[command(name = "wt", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the fleet manifest.
    #[arg(short, long, global = true, env = "WT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

// ============================================================================
// Top-Level Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start every twin declared in the manifest.
    Up,

    /// Stop the running fleet.
    Down,

    /// Show pid, port, and health for every twin.
    Status,

    /// Reset one twin, or every running twin.
    Reset(ResetArgs),

    /// POST a seed file to a twin's admin state.
    Seed(SeedArgs),

    /// Tail-follow a twin's log file.
    Logs(LogsArgs),

    /// Fetch and print a twin's admin resource.
    Inspect(InspectArgs),

    /// Install twin binaries from a registry.
    Install(InstallArgs),

    /// Run scenario files against the fleet.
    Test(TestArgs),

    /// License management.
    Auth(AuthCommand),

    /// Named registry management.
    Registry(RegistryCommand),

    /// Serve the agent bridge over stdin/stdout.
    Mcp,

    /// Check a twin binary against the admin control plane contract.
    Conformance(ConformanceArgs),

    /// Registry catalog CI tools.
    Catalog(CatalogCommand),

    /// Generate shell completion scripts.
    Completions(CompletionsArgs),

    /// Display version information.
    Version(VersionArgs),
}

// ============================================================================
// Fleet Commands
// ============================================================================

/// Arguments for `reset`.
#[derive(Args, Debug)]
pub struct ResetArgs {
    /// Twin to reset; omitted resets every running twin.
    pub twin: Option<String>,
}

/// Arguments for `seed`.
#[derive(Args, Debug)]
pub struct SeedArgs {
    /// Twin to seed.
    pub twin: String,

    /// JSON seed file.
    pub file: PathBuf,
}

/// Arguments for `logs`.
#[derive(Args, Debug)]
pub struct LogsArgs {
    /// Twin whose log to follow.
    pub twin: String,
}

/// Admin resources `inspect` can fetch.
#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum InspectResource {
    /// The state snapshot.
    #[default]
    State,
    /// The request log ring.
    Requests,
    /// Registered faults.
    Faults,
    /// Real and simulated time.
    Time,
}

impl InspectResource {
    /// Admin path segment.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::State => "state",
            Self::Requests => "requests",
            Self::Faults => "faults",
            Self::Time => "time",
        }
    }
}

/// Arguments for `inspect`.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Twin to inspect.
    pub twin: String,

    /// Which admin resource to fetch.
    #[arg(value_enum, default_value_t = InspectResource::State)]
    pub resource: InspectResource,
}

// ============================================================================
// Registry Commands
// ============================================================================

/// Arguments for `install`.
#[derive(Args, Debug)]
pub struct InstallArgs {
    /// A `twin` or `twin@version` spec resolved against the public
    /// registry; omitted installs every versioned manifest twin.
    pub spec: Option<String>,
}

/// License management commands.
#[derive(Args, Debug)]
pub struct AuthCommand {
    /// Auth subcommand.
    #[command(subcommand)]
    pub subcommand: AuthSubcommand,
}

/// Auth subcommands.
#[derive(Subcommand, Debug)]
pub enum AuthSubcommand {
    /// Validate and store a license key.
    Login {
        /// The `wt_...` license key.
        key: String,
    },

    /// Show the stored license.
    Status,

    /// Forget the stored license.
    Logout,
}

/// Named registry commands.
#[derive(Args, Debug)]
pub struct RegistryCommand {
    /// Registry subcommand.
    #[command(subcommand)]
    pub subcommand: RegistrySubcommand,
}

/// Registry subcommands.
#[derive(Subcommand, Debug)]
pub enum RegistrySubcommand {
    /// Add or update a named registry.
    Add {
        /// Registry name.
        name: String,

        /// Catalog URL.
        url: String,

        /// Bearer token for private catalogs.
        #[arg(long)]
        token: Option<String>,
    },

    /// Remove a named registry.
    Remove {
        /// Registry name.
        name: String,
    },

    /// List configured registries.
    List,
}

// ============================================================================
// Testing Commands
// ============================================================================

/// Arguments for `test`.
#[derive(Args, Debug)]
pub struct TestArgs {
    /// Scenario file or directory; defaults to `scenarios/`.
    pub path: Option<PathBuf>,
}

/// Arguments for `conformance`.
#[derive(Args, Debug)]
pub struct ConformanceArgs {
    /// Candidate twin binary.
    pub binary: PathBuf,

    /// Port the candidate is told to bind.
    #[arg(long, default_value_t = 4999)]
    pub port: u16,
}

// ============================================================================
// Catalog Commands
// ============================================================================

/// Catalog CI commands.
#[derive(Args, Debug)]
pub struct CatalogCommand {
    /// Catalog subcommand.
    #[command(subcommand)]
    pub subcommand: CatalogSubcommand,
}

/// Catalog subcommands.
#[derive(Subcommand, Debug)]
pub enum CatalogSubcommand {
    /// Upsert a released version into a catalog file.
    Update(CatalogUpdateArgs),

    /// Verify a served catalog end to end.
    Verify(CatalogVerifyArgs),
}

/// Arguments for `catalog update`.
#[derive(Args, Debug)]
#[command(disable_version_flag = true)]
pub struct CatalogUpdateArgs {
    /// Twin name.
    #[arg(long)]
    pub name: String,

    /// Version being released.
    #[arg(long)]
    pub version: String,

    /// Release checksum file.
    #[arg(long)]
    pub checksums: PathBuf,

    /// Catalog file to update.
    #[arg(long, default_value = "catalog.json")]
    pub catalog: PathBuf,

    /// `owner/repo` the release was published under.
    #[arg(long)]
    pub repo: String,

    /// Keep the existing `latest` pointer.
    #[arg(long)]
    pub prerelease: bool,

    /// Directory holding `twin-<name>/twin-manifest.json`.
    #[arg(long, default_value = ".")]
    pub manifest_dir: PathBuf,
}

/// Arguments for `catalog verify`.
#[derive(Args, Debug)]
pub struct CatalogVerifyArgs {
    /// Catalog URL; defaults to the public registry.
    pub url: Option<String>,
}

// ============================================================================
// Utility Commands
// ============================================================================

/// Supported completion shells.
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum Shell {
    /// Bash.
    Bash,
    /// Zsh.
    Zsh,
    /// Fish.
    Fish,
    /// `PowerShell`.
    PowerShell,
    /// Elvish.
    Elvish,
}

/// Arguments for `completions`.
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for.
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Output formats for `version`.
#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    /// Plain text.
    #[default]
    Human,
    /// Single-line JSON.
    Json,
}

/// Arguments for `version`.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn up_parses_with_global_config() {
        let cli = Cli::try_parse_from(["wt", "up", "--config", "fleet.yaml"]).unwrap();
        assert!(matches!(cli.command, Commands::Up));
        assert_eq!(cli.config.unwrap(), PathBuf::from("fleet.yaml"));
    }

    #[test]
    fn inspect_defaults_to_state() {
        let cli = Cli::try_parse_from(["wt", "inspect", "stripeish"]).unwrap();
        let Commands::Inspect(args) = cli.command else {
            panic!("expected inspect");
        };
        assert_eq!(args.resource.as_str(), "state");
    }

    #[test]
    fn install_spec_is_optional() {
        let cli = Cli::try_parse_from(["wt", "install"]).unwrap();
        let Commands::Install(args) = cli.command else {
            panic!("expected install");
        };
        assert!(args.spec.is_none());
    }

    #[test]
    fn verbosity_counts() {
        let cli = Cli::try_parse_from(["wt", "-vv", "status"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }
}
