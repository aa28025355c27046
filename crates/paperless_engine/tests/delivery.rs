use std::fs;

use bytes::Bytes;
use paperless_core::Artifact;
use paperless_engine::{
    ensure_output_dir, ArtifactDelivery, AtomicFileWriter, DeliveryError, DownloadDirDelivery,
};
use tempfile::TempDir;

fn artifact(name: &str, payload: &'static [u8]) -> Artifact {
    Artifact {
        payload: Bytes::from_static(payload),
        suggested_filename: name.to_string(),
        content_type: "application/octet-stream".to_string(),
    }
}

#[test]
fn creates_missing_download_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("downloads");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn atomic_write_replaces_existing_copy() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("orders.xlsx", b"first").unwrap();
    assert_eq!(first.file_name().unwrap(), "orders.xlsx");
    assert_eq!(fs::read(&first).unwrap(), b"first");

    let second = writer.write("orders.xlsx", b"second").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read(&second).unwrap(), b"second");
}

#[test]
fn no_partial_file_when_dir_is_a_file() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    assert!(writer.write("orders.xlsx", b"data").is_err());
    assert!(!file_path.with_file_name("orders.xlsx").exists());
}

#[test]
fn delivery_saves_binary_payload_under_suggested_name() {
    let temp = TempDir::new().unwrap();
    let delivery = DownloadDirDelivery::new(temp.path().join("out"));

    let path = delivery
        .deliver(&artifact("Converted_headerless_2024-03-01.zip", b"PK\x03\x04\x00\xff"))
        .unwrap();
    assert_eq!(path, temp.path().join("out").join("Converted_headerless_2024-03-01.zip"));
    assert_eq!(fs::read(&path).unwrap(), b"PK\x03\x04\x00\xff");
}

#[test]
fn delivery_never_escapes_the_download_dir() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("out");
    let delivery = DownloadDirDelivery::new(out.clone());

    let path = delivery.deliver(&artifact("../../evil.xlsx", b"x")).unwrap();
    assert_eq!(path, out.join("evil.xlsx"));

    let err = delivery.deliver(&artifact("..", b"x")).unwrap_err();
    assert!(matches!(err, DeliveryError::UnusableName(name) if name == ".."));
}
