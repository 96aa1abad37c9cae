use std::path::PathBuf;

use clap::Parser;
use clap_derive::{Parser, Subcommand};
use time::macros::format_description;
use tracing_subscriber::fmt::time::LocalTime;

mod command;
mod error;
mod pe;
mod sprite;

#[derive(Debug, Parser)]
#[command(name = "egf-tools", version, about = "Sprite viewer for EGF graphics containers")]
struct Args {
    /// Directory the gfxNNN.egf containers live in
    #[arg(long, default_value = "./gfx")]
    gfx_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Extract one sprite and save it as a PNG
    View {
        /// GFX file index (gfx002.egf is file 2); prompts when omitted
        #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..=999))]
        file: Option<u16>,

        /// Sprite number inside the file; prompts when omitted
        #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..=999))]
        sprite: Option<u16>,

        /// Where to save the decoded sprite
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show which sprites a container holds
    Info {
        /// GFX file index
        #[arg(value_parser = clap::value_parser!(u16).range(1..=999))]
        file: u16,

        #[arg(long)]
        json: bool,
    },
    /// List the containers in the gfx directory
    List,
}

fn main() {
    tracing_subscriber::fmt()
        .with_timer(LocalTime::new(format_description!(
            "[hour]:[minute]:[second]"
        )))
        .init();

    let args = Args::parse();
    let res = match &args.command {
        Command::View {
            file,
            sprite,
            output,
        } => command::view::view(&args.gfx_dir, *file, *sprite, output.clone()),
        Command::Info { file, json } => command::info::info(&args.gfx_dir, *file, *json),
        Command::List => command::list::list(&args.gfx_dir),
    };

    if let Err(err) = res {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}
