use std::process::Command;

/// Build date from `SOURCE_DATE_EPOCH`, set by reproducible build tooling
fn build_date() -> Option<String> {
    let epoch = std::env::var("SOURCE_DATE_EPOCH").ok()?;
    let secs = epoch.trim().parse::<u64>().ok()?;
    let time = std::time::UNIX_EPOCH + std::time::Duration::from_secs(secs);
    Some(humantime::format_rfc3339_seconds(time).to_string())
}

/// Runs git in the workspace root, returning trimmed stdout on success
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").current_dir("..").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!value.is_empty()).then_some(value)
}

fn main() {
    // build metadata shown by `rip --version`, all best effort: builds from a tarball have no git
    let exports = [
        (
            "RIP_GIT_DESCRIBE",
            git(&["describe", "--tags", "--long", "--always", "--dirty"]),
        ),
        ("RIP_GIT_HASH", git(&["rev-parse", "HEAD"])),
        ("RIP_BUILD_DATE", build_date()),
    ];
    for (name, value) in exports {
        if let Some(value) = value {
            println!("cargo:rustc-env={name}={value}");
        }
    }
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");
    if std::path::Path::new("..").join(".git").exists() {
        println!("cargo:rerun-if-changed=../.git/HEAD");
        println!("cargo:rerun-if-changed=../.git/refs");
    }
}
