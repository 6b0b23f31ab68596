use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

const ASSETS: &str = r#"{
  "version": 3,
  "targets": {
    "net8.0": {
      "Serilog/3.1.1": {
        "type": "package"
      }
    }
  },
  "projectFileDependencyGroups": {
    "net8.0": [
      "Serilog >= 3.1.1"
    ]
  },
  "project": {
    "frameworks": {
      "net8.0": {
        "dependencies": {
          "Serilog": { "target": "Package", "version": "[3.1.1, )" }
        }
      }
    }
  }
}"#;

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch")
        .as_nanos();
    let pid = std::process::id();
    std::env::temp_dir().join(format!("adze-{prefix}-{pid}-{nanos}"))
}

fn adze_bin() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_adze") {
        return PathBuf::from(path);
    }

    let current_exe = std::env::current_exe().expect("resolve current test binary path");
    let target_dir = current_exe
        .parent()
        .and_then(|path| path.parent())
        .expect("derive cargo target dir from test binary path");
    let bin_name = if cfg!(windows) { "adze.exe" } else { "adze" };
    let fallback = target_dir.join(bin_name);

    if fallback.is_file() {
        fallback
    } else {
        panic!(
            "CARGO_BIN_EXE_adze is not set and fallback binary not found at {}",
            fallback.display()
        );
    }
}

#[test]
fn prints_a_mermaid_live_url_by_default() {
    let root = unique_temp_dir("live-url");
    fs::create_dir_all(&root).expect("create temp dir");
    fs::write(root.join("project.assets.json"), ASSETS).expect("write assets file");

    let output = Command::new(adze_bin())
        .arg(&root)
        .args(["--mermaid-mode", "view"])
        .output()
        .expect("run adze");
    assert!(output.status.success(), "adze failed: {output:?}");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let url = stdout.trim();
    assert!(url.starts_with("https://mermaid.live/view#pako:"));
    let payload = url
        .strip_prefix("https://mermaid.live/view#pako:")
        .expect("pako prefix");
    assert!(!payload.is_empty());
    // base64url alphabet, no padding
    assert!(payload
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));

    let _ = fs::remove_dir_all(root);
}

#[test]
fn unknown_mermaid_mode_exits_nonzero() {
    let root = unique_temp_dir("live-url-mode");
    fs::create_dir_all(&root).expect("create temp dir");
    fs::write(root.join("project.assets.json"), ASSETS).expect("write assets file");

    let output = Command::new(adze_bin())
        .arg(&root)
        .args(["--mermaid-mode", "share"])
        .output()
        .expect("run adze");
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown mermaid mode 'share'"));

    let _ = fs::remove_dir_all(root);
}
