use std::env;
use std::path::PathBuf;

// ffmpeg-sys-next finds FFmpeg through pkg-config on Unix. Windows builds
// usually rely on vcpkg, so point out a missing FFMPEG_DIR early.
fn main() {
    for variable in ["FFMPEG_DIR", "VCPKG_ROOT", "VCPKGRS_TRIPLET"] {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    if env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("windows")
        || env::var_os("FFMPEG_DIR").is_some()
    {
        return;
    }

    let Some(vcpkg_root) = env::var_os("VCPKG_ROOT") else {
        println!(
            "cargo:warning=FFMPEG_DIR is not set; install FFmpeg (e.g. via vcpkg) and set FFMPEG_DIR to its prefix."
        );
        return;
    };

    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    let prefix = PathBuf::from(vcpkg_root).join("installed").join(triplet);
    if prefix.join("include").join("libavformat").exists() {
        println!(
            "cargo:warning=Found vcpkg FFmpeg at {0}; set FFMPEG_DIR={0} to use it.",
            prefix.display()
        );
    } else {
        println!(
            "cargo:warning=VCPKG_ROOT is set but {} has no FFmpeg headers.",
            prefix.display()
        );
    }
}
