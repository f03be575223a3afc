use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Disable colors and progress bars (also implied when stdout is not a terminal)
    #[arg(long)]
    pub plain: bool,
}
