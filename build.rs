use std::path::Path;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    version_info();
}

/// Appends the abbreviated hash and date of the current commit to the
/// version printed by `wit-tools --version`, when building from a git
/// checkout.
fn version_info() {
    if !Path::new(".git").exists() {
        return;
    }
    println!("cargo:rerun-if-changed=.git/HEAD");
    let output = match Command::new("git")
        .args(["log", "-1", "--date=short", "--format=%h %cd", "--abbrev=9"])
        .output()
    {
        Ok(output) if output.status.success() => output,
        _ => return,
    };
    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut parts = stdout.split_whitespace();
    if let (Some(hash), Some(date)) = (parts.next(), parts.next()) {
        println!(
            "cargo:rustc-env=CARGO_VERSION_INFO={} ({hash} {date})",
            env!("CARGO_PKG_VERSION"),
        );
    }
}
