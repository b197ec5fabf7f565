use crate::client::{run_client, ClientCommand};
use crate::server;
use agazh::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "agazh",
    about = "Run the housekeeper hiring marketplace or talk to it from the command line",
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
    /// Act as a marketplace user against a running service
    Client {
        #[command(subcommand)]
        command: ClientCommand,
    },
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
        Command::Client { command } => run_client(command).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::HiringCommand;

    #[test]
    fn no_arguments_means_serve() {
        let cli = Cli::try_parse_from(["agazh"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn hiring_approve_parses_the_id() {
        let cli = Cli::try_parse_from(["agazh", "client", "hiring", "approve", "H1"])
            .expect("parses");
        match cli.command {
            Some(Command::Client {
                command: ClientCommand::Hiring(HiringCommand::Approve { id }),
            }) => assert_eq!(id, "H1"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn login_requires_a_known_user_type() {
        assert!(Cli::try_parse_from([
            "agazh",
            "client",
            "login",
            "--email",
            "a@example.com",
            "--password",
            "secret1",
            "--user-type",
            "landlord",
        ])
        .is_err());
    }

    #[test]
    fn review_takes_rating_and_comment() {
        let cli = Cli::try_parse_from([
            "agazh", "client", "review", "H1", "--rating", "5", "--comment", "Wonderful",
        ])
        .expect("parses");
        match cli.command {
            Some(Command::Client {
                command: ClientCommand::Review(args),
            }) => {
                assert_eq!(args.hiring_id, "H1");
                assert_eq!(args.rating, 5);
                assert_eq!(args.comment.as_deref(), Some("Wonderful"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
