use anyhow::Result;
use clap::Command;

use covmat::cli;

pub mod consts {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
    pub const BIN_NAME: &str = "covmat";
}

fn build_parser() -> Command {
    Command::new(consts::BIN_NAME)
        .bin_name(consts::BIN_NAME)
        .version(consts::VERSION)
        .author("Databio")
        .about("Coverage-based candidate region calling and region-by-sample quantification.")
        .subcommand_required(true)
        .subcommand(cli::create_matrix_cli())
}

fn main() -> Result<()> {
    pretty_env_logger::init();

    let app = build_parser();
    let matches = app.get_matches();

    match matches.subcommand() {
        Some((cli::consts::MATRIX_CMD, matches)) => {
            cli::handlers::run_matrix(matches)?;
        }
        _ => unreachable!("Subcommand not found"),
    };

    Ok(())
}
