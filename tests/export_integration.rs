use assert_cmd::Command;
use predicates::prelude::*;

const IMAGE_ID: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
const AUDIO_ID: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

fn note_bytes(folder: &str, markup: &str, title: &str) -> Vec<u8> {
    let mut bytes = vec![b'z', folder.len() as u8];
    bytes.extend_from_slice(folder.as_bytes());
    bytes.extend_from_slice(markup.as_bytes());
    bytes.extend_from_slice(b"J\x8avnd.android.item/text_note");
    bytes.push(b'r');
    bytes.push(title.len() as u8);
    bytes.extend_from_slice(title.as_bytes());
    bytes
}

/// A synthetic .bak with three live notes, one historical title and two
/// attachments, laid out the way real backups are.
fn synthetic_backup() -> Vec<u8> {
    let mut data = b"miui_bak/_tmp_bak".to_vec();

    // Padding keeps the attachment area past the truncation guard; the
    // gap also holds one field-tagged historical note title.
    data.extend(std::iter::repeat(b'x').take(1100));
    data.push(0x12);
    data.push(8);
    data.extend_from_slice(b"Old memo");
    data.extend_from_slice(&[0x00, 0x00]);

    data.extend(note_bytes(
        "common",
        "<new-format/><text>Buy:</text><bullet indent=\"0\" />milk\n<bullet indent=\"0\" />eggs\n<text>done</text>",
        "Groceries",
    ));
    data.extend(note_bytes(
        "secret",
        "<text>top &amp; secret</text>",
        "Secret plan",
    ));
    data.extend(note_bytes(
        "common",
        &format!(
            "<text>look <img fileid=\"{}\"/> and <sound fileid=\"{}\"/></text>",
            IMAGE_ID, AUDIO_ID
        ),
        "Photo note",
    ));

    // Attachment area: one JPEG, one MPEG audio.
    data.extend_from_slice(format!("miui_att/{}.jpg", IMAGE_ID).as_bytes());
    data.extend_from_slice(&[0x00; 10]);
    data.extend_from_slice(&[0xff, 0xd8, 0xff, 0xe0]);
    data.extend_from_slice(b"JPEGDATA");
    data.extend_from_slice(&[0xff, 0xd9]);

    data.extend_from_slice(format!("miui_att/{}.mp3", AUDIO_ID).as_bytes());
    data.extend_from_slice(&[0x11; 60]);
    data.extend_from_slice(&[0xff, 0xfb, 0x90, 0x44]);
    data.extend_from_slice(b"AUDIOFRAMES");
    data.extend_from_slice(&[0x00; 60]);

    data
}

#[test]
fn exports_notes_from_backup() {
    let temp_dir = tempfile::tempdir().unwrap();
    let bak = temp_dir.path().join("notes.bak");
    std::fs::write(&bak, synthetic_backup()).unwrap();
    let out = temp_dir.path().join("exported");

    let mut cmd = Command::cargo_bin("minotes").unwrap();
    cmd.arg(&bak)
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 3 notes"))
        .stdout(predicate::str::contains("Groceries.md"))
        .stdout(predicate::str::contains("Secret plan.md"))
        .stdout(predicate::str::contains("Exported 3 notes successfully!"));

    let body = std::fs::read_to_string(out.join("Groceries.md")).unwrap();
    assert_eq!(body, "# Groceries\n\nBuy:\n\n- milk\n\n- eggs\n\ndone\n");

    let secret = std::fs::read_to_string(out.join("Secret plan.md")).unwrap();
    assert!(secret.contains("top & secret"));

    // Media placeholders stay put when extraction is off.
    let photo = std::fs::read_to_string(out.join("Photo note.md")).unwrap();
    assert!(photo.contains(&format!("[Image: {}]", IMAGE_ID)));
}

#[test]
fn include_deleted_recovers_historical_titles() {
    let temp_dir = tempfile::tempdir().unwrap();
    let bak = temp_dir.path().join("notes.bak");
    std::fs::write(&bak, synthetic_backup()).unwrap();
    let out = temp_dir.path().join("exported");

    let mut cmd = Command::cargo_bin("minotes").unwrap();
    cmd.arg(&bak)
        .arg(&out)
        .arg("--include-deleted")
        .assert()
        .success()
        .stdout(predicate::str::contains("(including deleted)"))
        .stdout(predicate::str::contains("Old memo.md"));

    let body = std::fs::read_to_string(out.join("Old memo.md")).unwrap();
    assert_eq!(body, "# Old memo\n\nOld memo\n");
}

#[test]
fn extract_media_writes_attachments_and_rewrites_links() {
    let temp_dir = tempfile::tempdir().unwrap();
    let bak = temp_dir.path().join("notes.bak");
    std::fs::write(&bak, synthetic_backup()).unwrap();
    let out = temp_dir.path().join("exported");

    let mut cmd = Command::cargo_bin("minotes").unwrap();
    cmd.arg(&bak)
        .arg(&out)
        .arg("--extract-media")
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 2 media files"));

    let jpeg = out.join("attachments").join(format!("{}.jpg", IMAGE_ID));
    assert!(jpeg.exists());
    let jpeg_bytes = std::fs::read(&jpeg).unwrap();
    assert!(jpeg_bytes.starts_with(&[0xff, 0xd8]));

    let photo = std::fs::read_to_string(out.join("Photo note.md")).unwrap();
    assert!(photo.contains(&format!("![Image](attachments/{}.jpg)", IMAGE_ID)));
    assert!(photo.contains(&format!("[Audio](attachments/{}.mp3)", AUDIO_ID)));
}

#[test]
fn unreadable_backup_fails_with_diagnostic() {
    let temp_dir = tempfile::tempdir().unwrap();
    let bak = temp_dir.path().join("broken.bak");
    std::fs::write(&bak, b"this is not a miui backup").unwrap();

    let mut cmd = Command::cargo_bin("minotes").unwrap();
    cmd.arg(&bak)
        .arg(temp_dir.path().join("exported"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("section not found"));
}
