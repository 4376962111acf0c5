use clap::Parser;

fn main() {
    let cli = medkit_cli::Cli::parse();
    if let Err(error) = medkit_cli::run(cli) {
        eprintln!("medkit error: {error:#}");
        std::process::exit(1);
    }
}
