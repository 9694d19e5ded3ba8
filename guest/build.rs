use std::process;

const DEFAULT_INIT_PATH: &str = "/sbin/openrc-init";

fn main() {
    let arch = std::env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default();
    let os = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();

    let init_path =
        std::env::var("GUEST_INIT_PATH").unwrap_or_else(|_| DEFAULT_INIT_PATH.to_string());
    if init_path.is_empty() || !init_path.starts_with('/') {
        eprintln!("GUEST_INIT_PATH must be an absolute path, got {:?}", init_path);
        process::exit(1);
    }
    if init_path.contains('\0') {
        eprintln!("GUEST_INIT_PATH must not contain NUL bytes");
        process::exit(1);
    }

    if os != "linux" {
        println!("cargo:warning=guest-boot targets Linux guests, building for {}", os);
    }
    match arch.as_str() {
        "x86_64" | "aarch64" => {}
        other => println!(
            "cargo:warning=no boot signal mechanism for {}, signal is a no-op",
            other
        ),
    }

    println!("cargo:rustc-env=GUEST_BOOT_INIT_PATH={}", init_path);
    println!("cargo:rerun-if-env-changed=GUEST_INIT_PATH");
    println!("cargo:rerun-if-changed=build.rs");
}
