use crate::server;
use crate::walkthrough::{list_steps, walk, WalkArgs};
use clap::{Args, Parser, Subcommand};
use screening_wizard::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Screening Wizard",
    about = "Serve and inspect the record-a-mammogram step wizard",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// List every reachable step with its form and successors
    Steps,
    /// Answer the wizard's questions in order and print the route taken
    Walk(WalkArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Steps => list_steps(),
        Command::Walk(args) => walk(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_serve_without_subcommand() {
        let cli = Cli::try_parse_from(["screening-wizard-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn parses_walk_answers() {
        let cli = Cli::try_parse_from([
            "screening-wizard-api",
            "walk",
            "--answer",
            "continue",
            "--answer",
            "dropout",
        ])
        .expect("parses");

        match cli.command {
            Some(Command::Walk(args)) => assert_eq!(args.answers, ["continue", "dropout"]),
            other => panic!("expected walk, got {other:?}"),
        }
    }

    #[test]
    fn parses_serve_overrides() {
        let cli = Cli::try_parse_from(["screening-wizard-api", "serve", "--port", "8080"])
            .expect("parses");
        match cli.command {
            Some(Command::Serve(args)) => {
                assert_eq!(args.port, Some(8080));
                assert!(args.host.is_none());
            }
            other => panic!("expected serve, got {other:?}"),
        }
    }
}
