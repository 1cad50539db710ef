use std::env;

fn main() {
    let version =
        env::var("ANNOTATOR_VERSION").unwrap_or_else(|_| env::var("CARGO_PKG_VERSION").unwrap());
    println!("cargo:rustc-env=ANNOTATOR_VERSION={version}");
}
