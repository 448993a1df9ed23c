use scriptdoc::config::AppConfig;
use scriptdoc::export::{ExportError, ExportFormat, ExportOptions};
use scriptdoc::pipeline::{convert_dir, convert_file, Conversion, PipelineError};
use scriptdoc::{Session, SessionError};
use std::fs;
use std::path::Path;

const SCENE: &str = "INT. ROOM - DAY\n\nA chair.\n";

fn convert(input: &Path, output: &Path) -> Result<(), PipelineError> {
    convert_file(input, output, &Conversion::default(), &AppConfig::default()).map(|_| ())
}

fn export_error(result: Result<(), PipelineError>) -> ExportError {
    match result {
        Err(PipelineError::Session(SessionError::Export(e))) => e,
        other => panic!("expected an export error, got {:?}", other),
    }
}

#[test]
fn test_missing_directory_is_not_created() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("room.fountain");
    fs::write(&input, SCENE).unwrap();
    let output = dir.path().join("out/room.fdx");

    let error = export_error(convert(&input, &output));
    assert!(matches!(error, ExportError::DestinationMissing { .. }));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn test_office_lock_files_block_export() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("room.fountain");
    fs::write(&input, SCENE).unwrap();

    fs::write(dir.path().join("~$room.docx"), "").unwrap();
    let error = export_error(convert(&input, &dir.path().join("room.docx")));
    assert!(matches!(error, ExportError::Locked { .. }));

    fs::write(dir.path().join(".~lock.room.fdx#"), "").unwrap();
    let error = export_error(convert(&input, &dir.path().join("room.fdx")));
    assert!(matches!(error, ExportError::Locked { .. }));
    assert!(!dir.path().join("room.fdx").exists());
}

#[test]
fn test_read_only_destination() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("room.fountain");
    fs::write(&input, SCENE).unwrap();
    let output = dir.path().join("room.txt");
    fs::write(&output, "keep me").unwrap();
    let mut permissions = fs::metadata(&output).unwrap().permissions();
    permissions.set_readonly(true);
    fs::set_permissions(&output, permissions).unwrap();

    let error = export_error(convert(&input, &output));
    assert!(matches!(error, ExportError::PermissionDenied { .. }));
    assert_eq!(fs::read_to_string(&output).unwrap(), "keep me");
}

#[test]
fn test_session_survives_failed_export() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("room.fountain");
    fs::write(&input, SCENE).unwrap();
    let document = scriptdoc::pipeline::import(&input, &Conversion::default(), &AppConfig::default())
        .unwrap();
    let mut session =
        Session::with_registry(document, &AppConfig::default().registry().unwrap()).unwrap();

    let missing = dir.path().join("nowhere/room.fdx");
    let job = session
        .spawn_export(missing, None, ExportOptions::default())
        .unwrap();
    assert!(matches!(
        job.join(),
        Err(SessionError::Export(ExportError::DestinationMissing { .. }))
    ));

    // Retry to a valid destination
    let output = dir.path().join("room.fdx");
    session
        .spawn_export(output.clone(), None, ExportOptions::default())
        .unwrap()
        .join()
        .unwrap();
    assert!(output.exists());
}

#[test]
fn test_batch_reports_failures_per_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("good.fountain"), SCENE).unwrap();
    fs::write(dir.path().join("bad.docx"), "not an archive").unwrap();
    let out = tempfile::tempdir().unwrap();

    let results = convert_dir(
        dir.path(),
        out.path(),
        ExportFormat::Fountain,
        &Conversion::default(),
        &AppConfig::default(),
    );
    assert_eq!(results.len(), 2);
    let (bad, good) = (&results[0], &results[1]);
    assert!(bad.0.ends_with("bad.docx"));
    assert!(matches!(bad.1, Err(PipelineError::Import(_))));
    assert!(good.1.is_ok());
    assert!(out.path().join("good.fountain").exists());
}
