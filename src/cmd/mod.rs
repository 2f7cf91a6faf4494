//! Subcommand dispatch and execution.
//!
//! The [`dispatch`] function routes the parsed CLI to the appropriate
//! subcommand handler: [`run`], [`init`], [`validate`], or [`health`].
//! Each handler lives in its own submodule.

pub mod health;
pub mod init;
pub mod run;
pub mod validate;

use crate::cli::{Cli, Commands};
use crate::error::RedirectorError;

pub async fn dispatch(cli: Cli) -> Result<(), RedirectorError> {
    match cli.command {
        Some(Commands::Run(args)) => run::execute(*args).await,
        Some(Commands::Init(ref args)) => init::execute(args),
        Some(Commands::Validate(ref args)) => validate::execute(args),
        Some(Commands::Health(args)) => health::execute(args).await,
        None => {
            print_welcome();
            Ok(())
        }
    }
}

fn print_welcome() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        "\n  redirector v{version} \u{2014} host-based HTTP redirector\n\n  \
         No command provided. To get started:\n\n    \
         redirector init                  Generate a starter mappings file\n    \
         redirector run                   Start with DOMAIN_MAPPING_* env vars (or ./redirector.yaml)\n    \
         redirector run -c mappings.yaml  Start with a specific mappings file\n    \
         redirector --help                See all commands and options\n"
    );
}
