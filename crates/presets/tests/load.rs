use std::fs;
use std::time::Duration;

use presets::{Preset, PresetError, Validation};
use renderer::DitherType;

#[test]
fn loads_preset_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chrome.toml");
    fs::write(
        &path,
        r#"
[shader]
liquid = 0.4

[effects]
dither = "bayer8x8"

[export]
frame_delay = "20ms"
"#,
    )
    .unwrap();

    let resolved = Preset::load(&path)
        .unwrap()
        .resolve(Validation::Strict)
        .unwrap();
    assert_eq!(resolved.shader.liquid, 0.4);
    assert_eq!(resolved.effects.dither, DitherType::Bayer8x8);
    assert_eq!(resolved.export.frame_delay, Duration::from_millis(20));
}

#[test]
fn missing_file_reports_its_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    match Preset::load(&path) {
        Err(PresetError::Io { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected io error, got {other:?}"),
    }
}

#[test]
fn written_defaults_load_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("defaults.toml");
    fs::write(&path, Preset::defaults().to_toml_string().unwrap()).unwrap();
    assert_eq!(Preset::load(&path).unwrap(), Preset::defaults());
}
