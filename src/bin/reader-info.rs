use std::io;
use std::process;

use clap::error::ErrorKind;
use clap::Parser;
use failure::Fail;
use log::debug;

use tmreader::Error;

const USAGE: &str = "Usage: Please provide valid arguments, such as:
reader-info [-v] [reader-uri]
-v  Verbose: Turn on transport listener
reader-uri  Reader URI: e.g., \"tmr:///COM1\", \"tmr://astra-2100d3\"
";

/// Connects to an RFID reader and prints its version and identity parameters.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Print every frame sent to and received from the reader.
    #[arg(short = 'v')]
    verbose: bool,

    /// Reader URI, e.g. tmr:///dev/ttyUSB0 or tmr://reader-host
    uri: String,

    /// Anything after the URI is accepted and ignored.
    #[arg(hide = true)]
    extra: Vec<String>,
}

fn usage() -> ! {
    print!("{}", USAGE);
    process::exit(1);
}

fn main() {
    env_logger::init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => usage(),
        },
    };

    if !args.extra.is_empty() {
        debug!("Ignoring extra arguments {:?}", args.extra);
    }

    let reader = match tmreader::create(&args.uri) {
        Ok(reader) => reader,
        Err(e @ Error::InvalidUri(..)) => {
            eprintln!("{}", e);
            usage();
        }
        Err(e) => {
            report(&e);
            return;
        }
    };

    // Failures past this point are reported but do not change the exit status.
    if let Err(e) = tmreader::info::run(reader, args.verbose, &mut io::stdout()) {
        report(&e);
    }
}

fn report(e: &Error) {
    eprintln!("Error: {}", e);
    for cause in (e as &dyn Fail).iter_causes() {
        eprintln!("Caused by: {}", cause);
    }
}
