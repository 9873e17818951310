use std::process::Command;

/// Embeds the short git SHA as `TALLY_BUILD_SHA`. Packagers building from a
/// tarball can set `TALLY_BUILD_SHA` themselves.
fn main() {
    println!("cargo:rerun-if-env-changed=TALLY_BUILD_SHA");

    if let Ok(sha) = std::env::var("TALLY_BUILD_SHA") {
        if !sha.trim().is_empty() {
            println!("cargo:rustc-env=TALLY_BUILD_SHA={}", sha.trim());
            return;
        }
    }

    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
    let sha = Command::new("git")
        .current_dir(format!("{manifest_dir}/.."))
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=TALLY_BUILD_SHA={sha}");
}
