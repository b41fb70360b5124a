#[cfg(feature = "cli")]
mod cli;

#[cfg(feature = "cli")]
fn main() {
    if let Err(err) = cli::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!(
        "coref-demo-rs was built without its `cli` feature. Rebuild with \
         `--features cli` (add `web` for the `serve` command)."
    );
}
