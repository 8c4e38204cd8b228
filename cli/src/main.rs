mod commands;
mod terminal;

use commands::{CommandLine, Commands, discover, profile, scan};
use terminal::{logging, print};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    logging::init(commands.verbose);

    match commands.command {
        Commands::Scan(args) => {
            print::header("mapping server roles");
            scan::scan(args).await
        }
        Commands::Discover(args) => {
            print::header("getting ready for discovery");
            discover::discover(args).await
        }
        Commands::Profile(args) => {
            print::header("port profile");
            profile::profile(args)
        }
    }
}
