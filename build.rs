use std::env;
use std::path::PathBuf;

const WATCHED_VARIABLES: [&str; 3] = ["FFMPEG_DIR", "VCPKG_ROOT", "VCPKGRS_TRIPLET"];

fn main() {
    for variable in WATCHED_VARIABLES {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    // Linux and macOS builds find FFmpeg through pkg-config.
    if env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("windows")
        || env::var_os("FFMPEG_DIR").is_some()
    {
        return;
    }

    if let Some(hint) = windows_ffmpeg_hint() {
        println!("cargo:warning={hint}");
    }
}

fn windows_ffmpeg_hint() -> Option<String> {
    let Ok(vcpkg_root) = env::var("VCPKG_ROOT") else {
        return Some(
            "framesieve needs FFmpeg: install it with vcpkg and set FFMPEG_DIR to the install prefix"
                .to_string(),
        );
    };

    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    let prefix = PathBuf::from(vcpkg_root).join("installed").join(triplet);
    if prefix.join("include").join("libavformat").exists() {
        Some(format!(
            "found FFmpeg at {}; set FFMPEG_DIR to that path to use it",
            prefix.display()
        ))
    } else {
        Some(format!("VCPKG_ROOT is set but {} has no FFmpeg headers", prefix.display()))
    }
}
