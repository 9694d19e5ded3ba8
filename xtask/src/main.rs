use std::process::Command;

use anyhow::{Context, Result, bail};

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let task = args.next().unwrap_or_else(|| "help".to_string());
    match task.as_str() {
        "build" => build_guest(args.collect()),
        _ => {
            print_help();
            Ok(())
        }
    }
}

fn build_guest(args: Vec<String>) -> Result<()> {
    let arch = args.first().map(String::as_str).unwrap_or("x86_64");
    let target = match arch {
        "x86_64" => "x86_64-unknown-linux-musl",
        "aarch64" => "aarch64-unknown-linux-musl",
        other => bail!("unsupported guest architecture: {}", other),
    };
    let release = args.iter().any(|a| a == "--release");
    let init = args
        .iter()
        .position(|a| a == "--init")
        .map(|i| args.get(i + 1).context("--init needs a path"))
        .transpose()?;

    let mut cmd = Command::new("cargo");
    cmd.arg("build")
        .arg("-p").arg("guest-boot")
        .arg("--bin").arg("boot_done")
        .arg("--target").arg(target);
    if release {
        cmd.arg("--release");
    }
    if let Some(path) = init {
        if !path.starts_with('/') {
            bail!("--init must be an absolute path, got {}", path);
        }
        cmd.env("GUEST_INIT_PATH", path);
    }
    run(&mut cmd, "guest build")
}

fn run(cmd: &mut Command, name: &str) -> Result<()> {
    println!("[xtask] {}: {:?}", name, cmd);
    let status = cmd
        .status()
        .with_context(|| format!("failed to run {}", name))?;
    if !status.success() {
        bail!("{} failed with status {:?}", name, status);
    }
    Ok(())
}

fn print_help() {
    println!("xtask usage:");
    println!("  cargo run -p xtask -- build <x86_64|aarch64> [--init PATH] [--release]");
}
