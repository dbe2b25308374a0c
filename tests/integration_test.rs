mod common;

use common::{build_container, encrypt, oversized_container};
use ruf::batch::{run_batch, BatchOptions, Outcome};
use ruf::container::Container;
use ruf::crypto::{decrypt, decrypt_chained_blocks};
use ruf::header::HEADER_SIZE;
use ruf::registry::KEY_C6900;
use ruf::{ByteOrder, ContainerHeader, Error, ModelRegistry};
use std::fs;
use std::io::{Cursor, Read};
use tempfile::tempdir;

fn three_parts() -> Vec<(u32, Vec<u8>)> {
    vec![(1, vec![0x11; 10]), (3, vec![0x33; 20]), (6, vec![0x66; 30])]
}

fn as_refs(parts: &[(u32, Vec<u8>)]) -> Vec<(u32, &[u8])> {
    parts.iter().map(|(o, d)| (*o, d.as_slice())).collect()
}

#[test]
fn test_known_vector_c6900() {
    let p0: [u8; 16] = *b"RUF known block0";
    let p1: [u8; 16] = *b"RUF known block1";
    let plain = [p0, p1].concat();

    let registry = ModelRegistry::builtin();
    let mut h = ContainerHeader::new(registry.lookup("C6900").unwrap(), ByteOrder::Big);
    h.encrypted_size = 32;
    let mut file = Vec::new();
    h.write(&mut file).unwrap();
    file.extend(encrypt(&plain, &KEY_C6900));

    let mut src = Cursor::new(file);
    let header = ContainerHeader::parse(&mut src, &registry).unwrap();
    assert_eq!(header.encrypted_size, 32);
    let out = decrypt(&mut src, &header).unwrap();
    assert_eq!(&out[HEADER_SIZE..], plain.as_slice());
}

#[test]
fn test_extract_three_parts_in_table_order() {
    let parts = three_parts();
    let bytes = build_container("C6900", ByteOrder::Big, &as_refs(&parts), &[]);

    let fw = Container::from_reader(&mut Cursor::new(bytes), &ModelRegistry::builtin()).unwrap();
    let subfiles = fw.subfiles().unwrap();
    assert_eq!(subfiles.len(), 3);

    let names: Vec<&str> = subfiles.iter().map(|s| s.name).collect();
    assert_eq!(names, ["exe.img", "rootfs.img", "onboot"]);
    assert_eq!(subfiles[0].offset, HEADER_SIZE);
    for (sub, (_, data)) in subfiles.iter().zip(&parts) {
        assert_eq!(sub.data, data.as_slice());
    }
}

#[test]
fn test_extract_all_writes_numbered_files() {
    let parts = three_parts();
    let bytes = build_container("C5500", ByteOrder::Little, &as_refs(&parts), b"tail");
    let dir = tempdir().unwrap();

    let fw = Container::from_reader(&mut Cursor::new(bytes), &ModelRegistry::builtin()).unwrap();
    let written = fw.extract_all(dir.path().join("out")).unwrap();

    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["01.exe.img", "03.rootfs.img", "06.onboot"]);
    assert_eq!(fs::read(&written[2]).unwrap(), vec![0x66; 30]);
    assert!(fw.plaintext().ends_with(b"tail"));
}

#[test]
fn test_source_rewound_after_decode() {
    let parts = three_parts();
    let bytes = build_container("C6900", ByteOrder::Little, &as_refs(&parts), &[]);
    let mut src = Cursor::new(bytes.clone());

    Container::from_reader(&mut src, &ModelRegistry::builtin()).unwrap();
    let mut again = Vec::new();
    src.read_to_end(&mut again).unwrap();
    assert_eq!(again, bytes);
}

#[test]
fn test_decrypt_is_deterministic() {
    let parts = three_parts();
    let bytes = build_container("C5500", ByteOrder::Big, &as_refs(&parts), &[]);
    let registry = ModelRegistry::builtin();

    let a = Container::from_reader(&mut Cursor::new(bytes.clone()), &registry).unwrap();
    let b = Container::from_reader(&mut Cursor::new(bytes), &registry).unwrap();
    assert_eq!(a.plaintext(), b.plaintext());
}

#[test]
fn test_chained_blocks_match_container_body() {
    let parts = three_parts();
    let bytes = build_container("C6900", ByteOrder::Little, &as_refs(&parts), &[]);
    let fw = Container::from_reader(&mut Cursor::new(bytes.clone()), &ModelRegistry::builtin()).unwrap();

    let body = &bytes[HEADER_SIZE..];
    assert_eq!(decrypt_chained_blocks(body, &KEY_C6900).unwrap(), &fw.plaintext()[HEADER_SIZE..]);
}

#[test]
fn test_oversized_table_is_format_error() {
    let err = Container::from_reader(&mut Cursor::new(oversized_container()), &ModelRegistry::builtin())
        .unwrap_err();
    assert!(matches!(err, Error::Format { required: 0x0100_0120, .. }));
}

#[test]
fn test_misaligned_size_is_rejected_before_decryption() {
    let parts = three_parts();
    let mut bytes = build_container("C6900", ByteOrder::Big, &as_refs(&parts), &[]);
    // encrypted size for C6900 sits at 0x54 + 31 + 5
    bytes[0x78..0x7C].copy_from_slice(&20u32.to_be_bytes());
    let err = Container::from_reader(&mut Cursor::new(bytes), &ModelRegistry::builtin()).unwrap_err();
    assert!(matches!(err, Error::Alignment(20)));
}

#[test]
fn test_unknown_model() {
    let mut bytes = build_container("C6900", ByteOrder::Little, &[(1, &[0u8; 16])], &[]);
    bytes[0x34..0x54].fill(0);
    bytes[0x34..0x39].copy_from_slice(b"ZZZZZ");
    let err = Container::from_reader(&mut Cursor::new(bytes), &ModelRegistry::builtin()).unwrap_err();
    assert!(matches!(err, Error::UnknownModel(ref m) if m == "ZZZZZ"));
}

#[test]
fn test_empty_registry_knows_nothing() {
    let bytes = build_container("C6900", ByteOrder::Little, &[(1, &[0u8; 16])], &[]);
    let err = Container::from_reader(&mut Cursor::new(bytes), &ModelRegistry::new()).unwrap_err();
    assert!(matches!(err, Error::UnknownModel(_)));
}

#[test]
fn test_batch_continues_after_failure() {
    let dir = tempdir().unwrap();
    let bad = dir.path().join("broken.RUF");
    let good = dir.path().join("BD-C6900.RUF");
    fs::write(&bad, oversized_container()).unwrap();
    let parts = three_parts();
    fs::write(&good, build_container("C6900", ByteOrder::Big, &as_refs(&parts), &[])).unwrap();

    let opts = BatchOptions { output_root: Some(dir.path().join("out")), dry_run: false };
    let report = run_batch(&[bad, good], &ModelRegistry::builtin(), &opts);

    assert!(matches!(report.inputs[0].outcome, Outcome::Failed { error: Error::Format { .. } }));
    assert!(!report.inputs[0].output_dir.exists());
    match &report.inputs[1].outcome {
        Outcome::Extracted { files } => {
            assert_eq!(files.len(), 3);
            assert!(files.iter().all(|f| f.starts_with(dir.path().join("out").join("BD-C6900"))));
        }
        other => panic!("expected success, got {other:?}"),
    }
    assert_eq!(report.succeeded().count(), 1);
    assert_eq!(report.failed().count(), 1);
}

#[test]
fn test_batch_dry_run_writes_nothing() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("fw.RUF");
    let parts = three_parts();
    fs::write(&input, build_container("C5500", ByteOrder::Little, &as_refs(&parts), &[])).unwrap();

    let opts = BatchOptions { output_root: None, dry_run: true };
    let report = run_batch(&[&input], &ModelRegistry::builtin(), &opts);
    assert!(matches!(report.inputs[0].outcome, Outcome::Checked { parts: 3 }));
    assert!(!dir.path().join("fw").exists());
}

#[test]
fn test_truncated_body_no_output() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("cut.RUF");
    let parts = three_parts();
    let mut bytes = build_container("C6900", ByteOrder::Little, &as_refs(&parts), &[]);
    bytes.truncate(bytes.len() - 16);
    fs::write(&input, bytes).unwrap();

    let report = run_batch(&[&input], &ModelRegistry::builtin(), &BatchOptions::default());
    assert!(matches!(report.inputs[0].outcome, Outcome::Failed { error: Error::TruncatedBody { .. } }));
    assert!(!dir.path().join("cut").exists());
}

#[test]
fn test_profiles_file_adds_model() {
    let dir = tempdir().unwrap();
    let profiles = dir.path().join("profiles.json");
    fs::write(&profiles, r#"[{"model": "C6800", "key": "000102030405060708090a0b0c0d0e0f",
                              "secondary_widths": [20, 4], "entry_shape": "compact"}]"#).unwrap();
    let registry = ModelRegistry::from_json_file(&profiles).unwrap();
    assert_eq!(registry.models().collect::<Vec<_>>(), ["C5500", "C6800", "C6900"]);

    let profile = registry.lookup("C6800").unwrap();
    let mut h = ContainerHeader::new(profile, ByteOrder::Big);
    let plain = [0xA5u8; 32];
    h.encrypted_size = 32;
    h.subfile_count = 1;
    h.subfiles = vec![ruf::SubfileEntry { ordinal: 2, size: 32, checksum: None, reserved: [0; 4], slot: 0 }];
    let mut file = Vec::new();
    h.write(&mut file).unwrap();
    file.extend(encrypt(&plain, &profile.key));

    let fw = Container::from_reader(&mut Cursor::new(file), &registry).unwrap();
    let subfiles = fw.subfiles().unwrap();
    assert_eq!(subfiles[0].file_name(), "02.Image");
    assert_eq!(subfiles[0].data, &plain);
}

#[test]
fn test_batch_shared_stem_extracts_first_only() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("a")).unwrap();
    fs::create_dir_all(dir.path().join("b")).unwrap();
    let first = dir.path().join("a").join("fw.RUF");
    let second = dir.path().join("b").join("fw.RUF");
    fs::write(&first, build_container("C6900", ByteOrder::Big, &[(1, &[0x11; 16])], &[])).unwrap();
    fs::write(&second, build_container("C5500", ByteOrder::Little, &[(2, &[0x22; 16])], &[])).unwrap();

    let out = dir.path().join("out");
    let opts = BatchOptions { output_root: Some(out.clone()), dry_run: false };
    let report = run_batch(&[&first, &second], &ModelRegistry::builtin(), &opts);

    assert!(report.inputs[0].is_success());
    match &report.inputs[1].outcome {
        Outcome::Failed { error: Error::DuplicateOutput(d) } => assert_eq!(d, &out.join("fw")),
        other => panic!("expected duplicate output, got {other:?}"),
    }
    assert_eq!(fs::read(out.join("fw").join("01.exe.img")).unwrap(), vec![0x11; 16]);
    assert!(!out.join("fw").join("02.Image").exists());
}
