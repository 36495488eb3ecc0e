//! Build script for beacon firmware
//!
//! Handles memory layout configuration for the STM32F100 target.

fn main() {
    // Tell Cargo to re-run this if the linker script changes
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");

    // Target builds only; host tests do not link against memory.x
    if std::env::var_os("CARGO_FEATURE_EMBEDDED").is_some() {
        if let Ok(dir) = std::env::var("CARGO_MANIFEST_DIR") {
            println!("cargo:rustc-link-search={dir}");
        }
        println!("cargo:rustc-link-arg-bins=--nmagic");
        println!("cargo:rustc-link-arg-bins=-Tlink.x");
        println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
    }
}
