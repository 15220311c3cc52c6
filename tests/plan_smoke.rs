use std::path::PathBuf;

fn fixture_dir(name: &str) -> PathBuf {
    let dir = PathBuf::from("target").join("plan_smoke").join(name);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_png(path: &PathBuf, w: u32, h: u32) {
    let img = image::RgbImage::from_pixel(w, h, image::Rgb([40, 80, 200]));
    img.save(path).unwrap();
}

fn montage_exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_montage")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "montage.exe"
            } else {
                "montage"
            });
            p
        })
}

#[test]
fn scan_to_plan_meets_target_for_photo_folder() {
    let dir = fixture_dir("lib");
    write_png(&dir.join("a.png"), 64, 48);
    write_png(&dir.join("b.png"), 48, 64);
    write_png(&dir.join("c.png"), 32, 32);

    let (items, report) = montage::scan_media(&dir, false).unwrap();
    assert_eq!(report.media_count, 3);

    let cfg = montage::TimelineConfig {
        duration: 9.0,
        resolution: Some((1280, 720)),
        ..montage::TimelineConfig::default()
    };
    let tl = montage::build_timeline(&items, &cfg).unwrap();
    assert_eq!(tl.segments.len(), 3);
    assert!((tl.total_seconds() - 9.0).abs() < 1e-6);
}

#[test]
fn cli_plan_prints_summary() {
    let dir = fixture_dir("cli");
    write_png(&dir.join("a.png"), 64, 48);
    write_png(&dir.join("b.png"), 48, 64);

    let output = std::process::Command::new(montage_exe())
        .args(["plan", "--input"])
        .arg(&dir)
        .args(["--duration", "6", "--resolution", "1280x720"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Segments: 2"));
    assert!(stdout.contains("6.000s"));
}

#[test]
fn cli_plan_json_is_parseable_and_exact() {
    let dir = fixture_dir("json");
    write_png(&dir.join("a.png"), 64, 48);

    let output = std::process::Command::new(montage_exe())
        .args(["plan", "--json", "--input"])
        .arg(&dir)
        .args(["--duration", "4", "--resolution", "640x480"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(plan["canvas"]["width"], 640);
    let segs = plan["segments"].as_array().unwrap();
    assert_eq!(segs.len(), 1);
    assert!((segs[0]["duration"].as_f64().unwrap() - 4.0).abs() < 1e-6);
}

#[test]
fn cli_plan_exits_2_on_empty_input() {
    let dir = fixture_dir("empty");

    let output = std::process::Command::new(montage_exe())
        .args(["plan", "--input"])
        .arg(&dir)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no media found"));
}

#[test]
fn cli_preset_is_applied_and_flags_override() {
    let dir = fixture_dir("preset");
    write_png(&dir.join("a.png"), 64, 48);

    let output = std::process::Command::new(montage_exe())
        .args(["plan", "--json", "--input"])
        .arg(&dir)
        .args(["--preset", "preview", "--duration", "5"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    // Preset resolution survives; the explicit duration wins.
    assert_eq!(plan["canvas"]["width"], 1280);
    assert_eq!(plan["canvas"]["height"], 720);
    assert!((plan["target_seconds"].as_f64().unwrap() - 5.0).abs() < 1e-9);
}
