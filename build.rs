// SPDX-License-Identifier: MPL-2.0

use std::process::Command;

fn main() {
    println!("cargo::rerun-if-changed=.git/HEAD");
    println!("cargo::rerun-if-changed=.git/refs/tags");
    println!("cargo::rerun-if-env-changed=CARDCAM_VERSION");

    // Packagers building from a tarball set the version explicitly
    let version = std::env::var("CARDCAM_VERSION").unwrap_or_else(|_| git_version());
    println!("cargo::rustc-env=GIT_VERSION={}", version);
}

/// `0.1.0-abcdef1` on a tag, `0.1.0-dirty-abcdef1` past one, else the hash
fn git_version() -> String {
    let hash = git(&["rev-parse", "--short", "HEAD"]);
    let Some(describe) = git(&["describe", "--tags", "--always", "--match", "v*"]) else {
        return hash.unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());
    };
    let describe = describe.strip_prefix('v').unwrap_or(&describe).to_string();
    let hash = hash.unwrap_or_else(|| "unknown".to_string());

    if describe == hash {
        // No tag reachable
        return format!("{}-{}", env!("CARGO_PKG_VERSION"), hash);
    }
    match describe.rsplitn(3, '-').collect::<Vec<_>>().as_slice() {
        [_, _, base] => format!("{}-dirty-{}", base, hash),
        _ => format!("{}-{}", describe, hash),
    }
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
}
