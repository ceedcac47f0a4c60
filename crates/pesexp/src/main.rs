use std::path::Path;

use clap::Parser;
use pesexp::{config::Config, die, run};

/// Taylor expansions of a crystal potential energy surface
#[derive(Parser, Debug)]
#[command(author, about, long_about = None)]
struct Args {
    /// input file
    #[arg(value_parser, default_value_t = String::from("pesexp.toml"))]
    infile: String,

    /// Overwrite existing output from a previous run. Defaults to false.
    #[arg(short, long, default_value_t = false)]
    overwrite: bool,

    /// Set the maximum number of threads to use. Defaults to 0, which means to
    /// use as many threads as there are CPUS.
    #[arg(short, long, default_value_t = 0)]
    threads: usize,

    /// Serialize the input file to JSON and exit.
    #[arg(short, default_value_t = false, hide = true)]
    json: bool,
}

fn main() -> Result<(), std::io::Error> {
    env_logger::init();
    let args = Args::parse();
    if args.json {
        let config = Config::load(&args.infile);
        match serde_json::to_string(&config) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                die!("failed to serialize {} with {e}", args.infile);
            }
        };
        return Ok(());
    }
    let path = Path::new("expansion.json");
    if path.exists() && !args.overwrite {
        die!("existing pesexp output. overwrite with -o/--overwrite");
    }
    let config = Config::load(&args.infile);
    println!("PID: {}", std::process::id());
    println!("{config}");
    psqs::max_threads(args.threads);

    let output = match run(&mut std::io::stdout(), &config) {
        Ok(o) => o,
        Err(e) => die!("{e}"),
    };

    let mut f = std::fs::File::create(path)?;
    use std::io::Write;
    writeln!(f, "{}", serde_json::to_string_pretty(&output)?)?;

    println!("normal termination of pesexp");

    Ok(())
}
