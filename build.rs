// Copies the static site to `dist/`, building the wasm bundle first when
// targeting wasm32.
use std::env;
use std::path::Path;
use std::process::Command;

use fs_extra::dir::{copy, remove, CopyOptions};

fn main() {
    println!("cargo:rerun-if-changed=static");

    let target = env::var("TARGET").unwrap_or_default();
    if target == "wasm32-unknown-unknown" && env::var_os("WASM_PACK_BUILD").is_none() {
        let status = Command::new("wasm-pack")
            .env("WASM_PACK_BUILD", "1")
            .args(["build", "--release", "--target", "web", "--out-dir", "static/pkg"])
            .status();
        match status {
            Ok(st) if st.success() => {}
            Ok(_) => println!("cargo:warning=wasm-pack build failed"),
            Err(_) => println!("cargo:warning=wasm-pack not installed, skipping"),
        }
    }

    let out_dir = Path::new("dist");
    if out_dir.exists() {
        if let Err(err) = remove(out_dir) {
            println!("cargo:warning=could not clear dist/: {err}");
        }
    }

    let static_dir = Path::new("static");
    if static_dir.exists() {
        let options = CopyOptions {
            overwrite: true,
            copy_inside: true,
            ..CopyOptions::new()
        };
        if let Err(err) = copy(static_dir, out_dir, &options) {
            println!("cargo:warning=could not copy static/ to dist/: {err}");
        }
    }
}
