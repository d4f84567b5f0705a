//! `ikarhu-patch`: apply a change tree to a JSON document.
//!
//! Usage:
//!   ikarhu-patch [--diff] '<change-tree-json>'
//!
//! The document is read from stdin. With `--diff` the tree is treated as the
//! full desired document and unmentioned keys are deleted. Exits with 1 if
//! anything failed, including individual rejected keys.

use std::io::{self, Read, Write};
use std::process::exit;

use ikarhu::cli::{init_logging, parse_args, run};

fn main() {
    init_logging();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            exit(1);
        }
    };

    let mut buf = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut buf) {
        eprintln!("{e}");
        exit(1);
    }

    match run(buf.trim(), &args.changes, args.mode) {
        Ok(output) => {
            let mut stdout = io::stdout();
            if let Err(e) = writeln!(stdout, "{}", output.json) {
                eprintln!("{e}");
                exit(1);
            }
            if !output.complete {
                exit(1);
            }
        }
        Err(e) => {
            eprintln!("{e}");
            exit(1);
        }
    }
}
