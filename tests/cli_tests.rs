use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn classify_with_model(args: &[&str], model: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_onnx-aircraft"))
        .args(args)
        .env_remove("RUST_LOG")
        .env("AIRCRAFT_CLS_MODEL", model)
        .output()
        .expect("failed to run onnx-aircraft")
}

fn classify(args: &[&str]) -> Output {
    classify_with_model(args, Path::new("/no/such/classifier.onnx"))
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn write_black_png(dir: &Path) -> PathBuf {
    let path = dir.join("black.png");
    image::RgbImage::new(32, 32).save(&path).unwrap();
    path
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn missing_image_argument_exits_with_error() {
    let output = classify(&[]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stdout(&output).trim(), "Error: No image path provided.");
}

#[test]
fn non_image_file_reports_decoder_reason() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "this is plain text").unwrap();

    let output = classify(&[path.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));

    let out = stdout(&output);
    let reason = out
        .trim()
        .strip_prefix("Error loading image: ")
        .expect("unexpected stdout");
    assert!(!reason.is_empty());
    assert!(!out.contains("civilian ("));
}

#[test]
fn missing_image_file_is_a_load_error() {
    let output = classify(&["/no/such/image.png"]);
    assert_eq!(output.status.code(), Some(1));
    let out = stdout(&output);
    assert!(out.starts_with("Error loading image: "));
    assert!(out.contains("No such file"));
}

#[test]
fn valid_image_with_missing_model_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_black_png(dir.path());

    let output = classify(&[path.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).is_empty());
    assert!(stderr(&output).contains("MODEL_LOAD_ERROR"));
}

#[test]
fn fixture_model_prints_one_prediction_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_black_png(dir.path());

    let output = classify_with_model(
        &[path.to_str().unwrap(), "--threads", "1"],
        &fixture("classifier.onnx"),
    );
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "uav (0.43)\n");
}

#[test]
fn scores_are_identical_across_process_runs() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_black_png(dir.path());
    let model = fixture("classifier.onnx");

    let run = || {
        let output = classify_with_model(
            &[path.to_str().unwrap(), "--json", "--threads", "1"],
            &model,
        );
        assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
        serde_json::from_str::<serde_json::Value>(&stdout(&output)).unwrap()
    };

    let first = run();
    let second = run();
    assert_eq!(first["label"], "uav");
    assert_eq!(first["scores"].as_array().unwrap().len(), 3);

    let bits = |value: &serde_json::Value| -> Vec<u32> {
        value["scores"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| (s.as_f64().unwrap() as f32).to_bits())
            .collect()
    };
    assert_eq!(bits(&first), bits(&second));
    assert_eq!(first, second);
}

#[test]
fn chart_is_written_next_to_the_prediction() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_black_png(dir.path());
    let chart = dir.path().join("chart.png");

    let output = classify_with_model(
        &[
            path.to_str().unwrap(),
            "--threads",
            "1",
            "--chart",
            chart.to_str().unwrap(),
        ],
        &fixture("classifier.onnx"),
    );
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    assert_eq!(image::open(&chart).unwrap().width(), 800);
}

fn write_checkpoint(path: &Path) {
    use safetensors::{tensor::TensorView, Dtype};

    let weight = vec![0u8; 3 * 8 * 4];
    let bias = vec![0u8; 3 * 4];
    let tensors = vec![
        ("fc.weight", TensorView::new(Dtype::F32, vec![3, 8], &weight).unwrap()),
        ("fc.bias", TensorView::new(Dtype::F32, vec![3], &bias).unwrap()),
    ];
    std::fs::write(path, safetensors::serialize(tensors, &None).unwrap()).unwrap();
}

#[test]
fn inspect_checkpoint_lists_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("best_model.safetensors");
    write_checkpoint(&path);

    let output = Command::new(env!("CARGO_BIN_EXE_inspect-checkpoint"))
        .arg(&path)
        .env_remove("RUST_LOG")
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(
        stdout(&output).lines().collect::<Vec<_>>(),
        vec!["Keys in the state_dict:", "fc.bias", "fc.weight"]
    );
}

#[test]
fn inspect_checkpoint_fails_on_unreadable_file() {
    let output = Command::new(env!("CARGO_BIN_EXE_inspect-checkpoint"))
        .arg("/no/such/best_model.pth")
        .env_remove("RUST_LOG")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).is_empty());
    assert!(stderr(&output).contains("IO_ERROR"));
}

#[test]
fn inspect_checkpoint_lists_pth_state_dict_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("best_resnet_model.pth");
    // {'fc.weight': [0.5], 'fc.bias': [0.1]}
    let mut bytes = vec![0x80, 0x02, b'}', b'('];
    for (name, value) in [("fc.weight", 0.5f64), ("fc.bias", 0.1)] {
        bytes.push(b'X');
        bytes.extend((name.len() as u32).to_le_bytes());
        bytes.extend(name.as_bytes());
        bytes.extend([b']', b'(', b'G']);
        bytes.extend(value.to_be_bytes());
        bytes.push(b'e');
    }
    bytes.extend([b'u', b'.']);
    std::fs::write(&path, bytes).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_inspect-checkpoint"))
        .arg(&path)
        .env_remove("RUST_LOG")
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(
        stdout(&output).lines().collect::<Vec<_>>(),
        vec!["Keys in the state_dict:", "fc.weight", "fc.bias"]
    );
}
