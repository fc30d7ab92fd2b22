use std::process::Command;

/// Short hash of the checked-out commit, if this is a git checkout.
fn git_short_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short=7", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8(output.stdout).ok()?;
    Some(hash.trim().to_string()).filter(|h| !h.is_empty())
}

fn main() {
    println!("cargo:rerun-if-changed=../../.git/HEAD");

    // Both feed `wellsec --version`
    let commit = git_short_hash().unwrap_or_else(|| "unknown".into());
    let target = std::env::var("TARGET").unwrap_or_else(|_| "unknown".into());
    println!("cargo:rustc-env=WELLSEC_COMMIT={commit}");
    println!("cargo:rustc-env=WELLSEC_TARGET={target}");
}
