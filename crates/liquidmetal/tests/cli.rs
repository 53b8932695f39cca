use std::fs;
use std::path::Path;
use std::process::Command;

use image::{Rgba, RgbaImage};
use tempfile::TempDir;

fn write_logo(path: &Path) {
    let logo = RgbaImage::from_fn(48, 24, |x, y| {
        if (12..36).contains(&x) && (6..18).contains(&y) {
            Rgba([0, 0, 0, 255])
        } else {
            Rgba([255, 255, 255, 255])
        }
    });
    logo.save(path).unwrap();
}

fn liquidmetal(dir: &TempDir) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_liquidmetal"));
    command.current_dir(dir.path()).env("RUST_LOG", "warn");
    command
}

#[test]
fn params_lists_ranges_and_defaults() {
    let dir = TempDir::new().unwrap();
    let output = liquidmetal(&dir)
        .arg("params")
        .output()
        .expect("failed to run liquidmetal params");
    assert!(output.status.success());
    let text = String::from_utf8(output.stdout).unwrap();
    assert!(text.contains("pattern_scale"));
    assert!(text.contains("halftone_size"));
    assert!(text.contains("floydSteinberg"));
}

#[test]
fn params_toml_is_a_loadable_preset() {
    let dir = TempDir::new().unwrap();
    let output = liquidmetal(&dir)
        .args(["params", "--toml"])
        .output()
        .expect("failed to run liquidmetal params --toml");
    assert!(output.status.success());
    let text = String::from_utf8(output.stdout).unwrap();
    assert_eq!(
        presets::Preset::from_toml_str(&text).unwrap(),
        presets::Preset::defaults()
    );
}

#[test]
fn still_renders_a_png_on_the_cpu() {
    let dir = TempDir::new().unwrap();
    let logo = dir.path().join("logo.png");
    write_logo(&logo);

    let status = liquidmetal(&dir)
        .args([
            "still",
            "logo.png",
            "--backend",
            "cpu",
            "--size",
            "64x48",
            "--time",
            "1.5",
            "--dither",
            "bayer4x4",
            "-o",
            "frame.png",
        ])
        .status()
        .expect("failed to run liquidmetal still");
    assert!(status.success());

    let frame = image::open(dir.path().join("frame.png")).unwrap().to_rgba8();
    assert_eq!(frame.dimensions(), (64, 48));
    assert!(frame.pixels().any(|p| p.0[3] == 255));
    assert!(frame.pixels().any(|p| p.0[3] == 0));
}

#[test]
fn export_writes_the_default_gif() {
    let dir = TempDir::new().unwrap();
    write_logo(&dir.path().join("logo.png"));

    let output = liquidmetal(&dir)
        .args([
            "export",
            "logo.png",
            "--backend",
            "cpu",
            "--frames",
            "3",
            "--delay",
            "40",
            "--size",
            "32",
            "--dither",
            "floydSteinberg",
        ])
        .output()
        .expect("failed to run liquidmetal export");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let path = dir.path().join("liquid-metal-favicon.gif");
    let bytes = fs::read(&path).unwrap();
    assert!(bytes.starts_with(b"GIF89a"));
    assert!(String::from_utf8(output.stdout)
        .unwrap()
        .contains("liquid-metal-favicon.gif"));
}

#[test]
fn export_honours_preset_output_and_clamping() {
    let dir = TempDir::new().unwrap();
    write_logo(&dir.path().join("logo.png"));
    fs::write(
        dir.path().join("preset.toml"),
        "[shader]\nrefraction = 0.5\n[export]\nframe_count = 2\nsize = 24\noutput = \"chrome.gif\"\n",
    )
    .unwrap();

    let strict = liquidmetal(&dir)
        .args(["export", "logo.png", "--backend", "cpu", "--preset", "preset.toml"])
        .status()
        .expect("failed to run strict export");
    assert!(!strict.success());
    assert!(!dir.path().join("chrome.gif").exists());

    let clamped = liquidmetal(&dir)
        .args([
            "export",
            "logo.png",
            "--backend",
            "cpu",
            "--preset",
            "preset.toml",
            "--clamp",
        ])
        .status()
        .expect("failed to run clamped export");
    assert!(clamped.success());
    assert!(dir.path().join("chrome.gif").exists());
}

#[test]
fn missing_image_fails() {
    let dir = TempDir::new().unwrap();
    let output = liquidmetal(&dir)
        .args(["still", "absent.png", "--backend", "cpu"])
        .output()
        .expect("failed to run liquidmetal still");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("absent.png"));
}
