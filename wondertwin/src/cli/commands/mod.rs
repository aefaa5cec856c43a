//! CLI command dispatch and handlers.

pub mod auth;
pub mod catalog;
pub mod completions;
pub mod conformance;
pub mod fleet;
pub mod install;
pub mod mcp;
pub mod registry;
pub mod test;
pub mod version;

use crate::cli::args::{
    AuthSubcommand, CatalogSubcommand, Cli, Commands, RegistrySubcommand,
};
use crate::error::Result;

/// Dispatch a parsed CLI invocation to the appropriate command handler.
///
/// # Errors
///
/// Returns an error if the dispatched command handler fails.
pub async fn dispatch(cli: Cli) -> Result<()> {
    let config = cli.config.as_deref();
    match cli.command {
        Commands::Up => fleet::up(config).await,
        Commands::Down => fleet::down(config).await,
        Commands::Status => fleet::status(config).await,
        Commands::Reset(args) => fleet::reset(config, args.twin.as_deref()).await,
        Commands::Seed(args) => fleet::seed(config, &args.twin, &args.file).await,
        Commands::Logs(args) => fleet::logs(config, &args.twin).await,
        Commands::Inspect(args) => fleet::inspect(config, &args).await,
        Commands::Install(args) => install::run(config, args.spec.as_deref()).await,
        Commands::Test(args) => test::run(config, args.path.as_deref()).await,
        Commands::Auth(cmd) => match cmd.subcommand {
            AuthSubcommand::Login { key } => auth::login(&key),
            AuthSubcommand::Status => auth::status(),
            AuthSubcommand::Logout => auth::logout(),
        },
        Commands::Registry(cmd) => match cmd.subcommand {
            RegistrySubcommand::Add { name, url, token } => registry::add(&name, url, token),
            RegistrySubcommand::Remove { name } => registry::remove(&name),
            RegistrySubcommand::List => registry::list(),
        },
        Commands::Mcp => mcp::run(config).await,
        Commands::Conformance(args) => conformance::run(&args).await,
        Commands::Catalog(cmd) => match cmd.subcommand {
            CatalogSubcommand::Update(args) => catalog::update(&args),
            CatalogSubcommand::Verify(args) => catalog::verify(&args).await,
        },
        Commands::Completions(args) => {
            completions::run(&args);
            Ok(())
        }
        Commands::Version(args) => {
            version::run(&args);
            Ok(())
        }
    }
}
