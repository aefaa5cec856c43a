//! Version information display.

use crate::cli::args::{OutputFormat, VersionArgs};

/// Print the controller version in human or JSON format.
pub fn run(args: &VersionArgs) {
    let version = env!("CARGO_PKG_VERSION");

    match args.format {
        OutputFormat::Human => {
            println!("wt {version}");
        }
        OutputFormat::Json => {
            println!(r#"{{"name":"wt","version":"{version}"}}"#);
        }
    }
}
