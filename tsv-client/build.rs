//! Build script for tsv-client
//!
//! Stamps the binary with the identification printed in its startup banner:
//! - `GIT_HASH`: short commit, `-dirty` when the tree has local changes
//! - `BUILD_TIMESTAMP`: RFC 3339, honouring `SOURCE_DATE_EPOCH`
//! - `BUILD_PROFILE`: cargo profile
//!
//! Packaged builds without a checkout can pass `TSV_BUILD_GIT_HASH`.
//! No `rerun-if-*` directives are emitted, so the stamp is refreshed on
//! every build.

use std::process::Command;

fn main() {
    let git_hash = std::env::var("TSV_BUILD_GIT_HASH")
        .ok()
        .filter(|hash| !hash.trim().is_empty())
        .or_else(commit_from_checkout)
        .unwrap_or_else(|| "unknown".to_string());

    let build_timestamp = std::env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|secs| secs.trim().parse::<i64>().ok())
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .unwrap_or_else(chrono::Utc::now)
        .to_rfc3339_opts(chrono::SecondsFormat::Secs, true);

    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=GIT_HASH={}", git_hash);
    println!("cargo:rustc-env=BUILD_TIMESTAMP={}", build_timestamp);
    println!("cargo:rustc-env=BUILD_PROFILE={}", profile);
}

fn commit_from_checkout() -> Option<String> {
    let hash = git(&["rev-parse", "--short=8", "HEAD"])?;
    let dirty = git(&["status", "--porcelain", "--untracked-files=no"])
        .map(|status| !status.is_empty())
        .unwrap_or(false);
    Some(if dirty { format!("{}-dirty", hash) } else { hash })
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|s| s.trim().to_string())
}
