/*
Build metadata for the version banner. Packagers set AMSENDER_BUILD_DATE and
AMSENDER_BUILD_DISTRO; a plain build stamps the build time and "unknown".
*/
use std::env;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=AMSENDER_BUILD_DATE");
    println!("cargo:rerun-if-env-changed=AMSENDER_BUILD_DISTRO");

    let build_date = env::var("AMSENDER_BUILD_DATE")
        .unwrap_or_else(|_| chrono::Utc::now().format("%Y-%m-%d_%H:%M:%S").to_string());
    let build_distro = env::var("AMSENDER_BUILD_DISTRO").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=AMSENDER_BUILD_DATE={}", build_date);
    println!("cargo:rustc-env=AMSENDER_BUILD_DISTRO={}", build_distro);
}
