use std::env;
use std::path::PathBuf;

const LIB_DIR_ENV: &str = "RETROPSP_PPSSPP_LIB_DIR";
const LIB_NAME: &str = "retropsp_ppsspp";

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed={}", LIB_DIR_ENV);

    // Only the `ppsspp` feature links the emulator shim
    if env::var_os("CARGO_FEATURE_PPSSPP").is_none() {
        return;
    }

    match env::var_os(LIB_DIR_ENV) {
        Some(dir) => {
            let dir = PathBuf::from(dir);
            if !dir.exists() {
                println!(
                    "cargo:warning={} points at {:?}, which does not exist",
                    LIB_DIR_ENV, dir
                );
            }
            println!("cargo:rustc-link-search=native={}", dir.display());
        }
        None => {
            println!(
                "cargo:warning={} is not set, relying on the default linker search path for {}",
                LIB_DIR_ENV, LIB_NAME
            );
        }
    }

    println!("cargo:rustc-link-lib={}", LIB_NAME);

    // The shim is C++; pull in its runtime
    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    match target_os.as_str() {
        "macos" | "ios" => println!("cargo:rustc-link-lib=c++"),
        "windows" => {}
        _ => println!("cargo:rustc-link-lib=stdc++"),
    }
}
