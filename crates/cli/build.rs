// Stamps `tracemerge --version` with the commit and target it was built from.

use std::path::{Path, PathBuf};
use std::process::Command;

fn main() {
    let manifest_dir = PathBuf::from(std::env::var_os("CARGO_MANIFEST_DIR").unwrap_or_default());

    if let Some(git_dir) = manifest_dir.ancestors().map(|dir| dir.join(".git")).find(|p| p.exists()) {
        for watched in ["HEAD", "refs/heads"] {
            println!("cargo:rerun-if-changed={}", git_dir.join(watched).display());
        }
    }

    let hash = short_hash(&manifest_dir).unwrap_or_else(|| "unknown".to_string());
    println!("cargo:rustc-env=TRACEMERGE_GIT_HASH={hash}");

    let target = std::env::var("TARGET").unwrap_or_else(|_| "unknown".to_string());
    println!("cargo:rustc-env=TRACEMERGE_TARGET={target}");
}

fn short_hash(dir: &Path) -> Option<String> {
    let output = Command::new("git")
        .current_dir(dir)
        .args(["rev-parse", "--short=7", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8(output.stdout).ok()?;
    Some(hash.trim().to_string()).filter(|h| !h.is_empty())
}
