//! Console progress output.
//!
//! Progress goes to stdout, warnings to stderr. Sub-steps are indented under
//! the `[Preparing X]` header of the dependency they belong to.

use crate::process::Cmd;

pub fn section(title: &str) {
    println!("[{}]", title);
}

pub fn step(msg: &str) {
    println!("- {}", msg);
}

pub fn detail(msg: &str) {
    println!("  {}", msg);
}

pub fn command(cmd: &Cmd) {
    match cmd.cwd() {
        Some(dir) => println!("  $ {}  (in {})", cmd, dir.display()),
        None => println!("  $ {}", cmd),
    }
}

pub fn skip(name: &str) {
    println!("{}", skip_line(name));
}

/// Message printed when a dependency's tree is already in place.
pub fn skip_line(name: &str) -> String {
    format!("Skipping {} - already exists", name)
}

pub fn warn(msg: &str) {
    eprintln!("  [WARN] {}", msg);
}
