use scriptdoc::cancel::CancelToken;
use scriptdoc::import::{import_file, ImportError, ImportFormat, ImportOptions};
use scriptdoc::layout::PaginationEngine;
use scriptdoc::model::{
    Document, KindRole, Paragraph, ParagraphKind, SceneNumber, ScreenplayKind, WritingForm,
};
use scriptdoc::session::spawn_import;
use scriptdoc::template::{builtin, PageGeometry, Template, TemplateError};
use scriptdoc::{Session, SessionError};
use std::fs;
use std::sync::Arc;

const TWO_SCENES: &str = "\
Title: Harbour Lights
Author: J. Doe

EXT. HARBOUR - NIGHT

Fog rolls over the pier.

MARTA
(quietly)
He is late.

LEO
Almost there.

INT. BOAT - NIGHT

ANNA
Hold on to something.

MARTA
I am.
";

fn sp(kind: ScreenplayKind, text: &str) -> Paragraph {
    Paragraph::new(ParagraphKind::Screenplay(kind), text)
}

fn import_text(text: &str) -> Document {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("script.fountain");
    fs::write(&path, text).unwrap();
    import_file(&path, None, &ImportOptions::default(), &CancelToken::new()).unwrap()
}

#[test]
fn test_fountain_import_two_scenes_three_characters() {
    let document = import_text(TWO_SCENES);
    assert_eq!(document.form(), WritingForm::Screenplay);
    assert_eq!(document.title_page.get("Title"), Some("Harbour Lights"));

    let headings = document
        .paragraphs()
        .filter(|p| p.kind().role() == KindRole::SceneHeading)
        .count();
    assert_eq!(headings, 2);

    // Every dialogue paragraph belongs to the closest preceding cue
    let mut speaker = None;
    let mut spoken = Vec::new();
    for paragraph in document.paragraphs() {
        match paragraph.kind() {
            ParagraphKind::Screenplay(ScreenplayKind::Character) => speaker = Some(paragraph.text()),
            ParagraphKind::Screenplay(ScreenplayKind::Dialogue) => {
                spoken.push((speaker.clone().unwrap(), paragraph.text()));
            }
            _ => {}
        }
    }
    assert_eq!(
        spoken,
        [
            ("MARTA".to_string(), "He is late.".to_string()),
            ("LEO".to_string(), "Almost there.".to_string()),
            ("ANNA".to_string(), "Hold on to something.".to_string()),
            ("MARTA".to_string(), "I am.".to_string()),
        ]
    );

    let template = builtin::fallback(WritingForm::Screenplay).unwrap();
    let mut session = Session::new(document, template).unwrap();
    let layout = session.layout().unwrap();
    assert_eq!(layout.pages[0].number, 1);
    assert_eq!(layout.page_of(0), Some(1));
    assert_eq!(layout.scenes.len(), 2);
    assert_eq!(layout.scenes[0].first_page, 1);

    let statistics = session.statistics().unwrap();
    let names: Vec<&str> = statistics.characters.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names.len(), 3);
    assert!(names.contains(&"ANNA") && names.contains(&"LEO") && names.contains(&"MARTA"));
}

#[test]
fn test_continued_marker_after_interruption() {
    let template = builtin::fallback(WritingForm::Screenplay).unwrap();
    let mut session = Session::new(Document::new(WritingForm::Screenplay), template).unwrap();
    session.push(sp(ScreenplayKind::SceneHeading, "int. kitchen - day")).unwrap();
    session.push(sp(ScreenplayKind::Character, "MARTA")).unwrap();
    session.push(sp(ScreenplayKind::Dialogue, "Where is he?")).unwrap();
    session.push(sp(ScreenplayKind::Action, "She checks the window.")).unwrap();
    session.push(sp(ScreenplayKind::Character, "MARTA")).unwrap();
    session.push(sp(ScreenplayKind::Dialogue, "Still nothing.")).unwrap();

    let document = session.document();
    assert_eq!(document.paragraph(0).unwrap().text(), "INT. KITCHEN - DAY");
    assert!(!document.paragraph(1).unwrap().attributes.continued);
    assert!(document.paragraph(4).unwrap().attributes.continued);

    // Removing the interruption removes the marker
    session.remove(3).unwrap();
    assert!(!session.document().paragraph(3).unwrap().attributes.continued);
}

#[test]
fn test_locked_number_survives_insert_before_it() {
    let mut document = Document::new(WritingForm::Screenplay);
    for i in 1..=6 {
        document
            .push(sp(ScreenplayKind::SceneHeading, &format!("INT. ROOM {} - DAY", i)))
            .unwrap();
        document
            .push(sp(ScreenplayKind::Action, "Something happens."))
            .unwrap();
    }
    let fifth = 8;
    let mut attributes = document.paragraph(fifth).unwrap().attributes.clone();
    attributes.number_lock = Some(SceneNumber::new(5));
    document.set_attributes(fifth, attributes).unwrap();

    let template = builtin::fallback(WritingForm::Screenplay).unwrap();
    let mut session = Session::new(document, template).unwrap();
    let before = session.layout().unwrap();
    assert_eq!(before.scene_number(fifth), Some(SceneNumber::new(5)));

    // New scene after scene 2
    session
        .insert(4, sp(ScreenplayKind::SceneHeading, "EXT. YARD - NIGHT"))
        .unwrap();
    let after = session.layout().unwrap();
    let numbers: Vec<String> = after
        .scenes
        .iter()
        .map(|s| s.number.unwrap().to_string())
        .collect();
    assert_eq!(numbers, ["1", "2", "3", "4", "4A", "5", "6"]);
    assert_eq!(after.scene_number(fifth + 1), Some(SceneNumber::new(5)));
}

#[test]
fn test_broken_archive_yields_no_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("draft.docx");
    fs::write(&path, b"PK\x03\x04 this is not really a zip archive").unwrap();

    let result = import_file(
        &path,
        Some(ImportFormat::Docx),
        &ImportOptions::default(),
        &CancelToken::new(),
    );
    assert!(matches!(result, Err(ImportError::ArchiveOpen { .. })));

    let job = spawn_import(path, None, ImportOptions::default());
    assert!(matches!(
        job.join(),
        Err(SessionError::Import(ImportError::ArchiveOpen { .. }))
    ));
}

#[test]
fn test_failed_edit_leaves_document_and_layout_intact() {
    let document = import_text(TWO_SCENES);
    let template = builtin::fallback(WritingForm::Screenplay).unwrap();
    let mut session = Session::new(document, template).unwrap();
    let layout = session.layout().unwrap();
    let snapshot = session.snapshot();

    // Action and character cue cannot merge
    assert!(session.merge(1).is_err());
    assert!(session.split(99, 0).is_err());
    assert_eq!(session.document().nodes(), snapshot.nodes());
    assert!(Arc::ptr_eq(&session.layout().unwrap(), &layout));
}

#[test]
fn test_layout_cell_publishes_to_readers() {
    let document = import_text(TWO_SCENES);
    let template = builtin::fallback(WritingForm::Screenplay).unwrap();
    let mut session = Session::new(document, template).unwrap();
    let cell = session.layout_cell();
    let reader = std::thread::spawn(move || cell.load());
    let published = session.layout().unwrap();
    reader.join().unwrap();
    assert_eq!(session.layout_cell().load().revision, published.revision);
}

#[test]
fn test_engine_alone_matches_session() {
    let document = import_text(TWO_SCENES);
    let template = builtin::fallback(WritingForm::Screenplay).unwrap();
    let mut session = Session::new(document, Arc::clone(&template)).unwrap();
    let from_session = session.layout().unwrap();

    let mut engine = PaginationEngine::new(template);
    let from_engine = engine.relayout(session.document()).unwrap();
    assert_eq!(from_session.pages, from_engine.pages);
    assert_eq!(from_session.scenes, from_engine.scenes);
}

#[test]
fn test_edit_needing_missing_rule_is_not_applied() {
    let full = builtin::fallback(WritingForm::Screenplay).unwrap();
    let mut partial = Template::new("no-shots", WritingForm::Screenplay, PageGeometry::letter());
    for (kind, rule) in full.rules() {
        if kind != ParagraphKind::Screenplay(ScreenplayKind::Shot) {
            partial.set_rule(kind, rule.clone()).unwrap();
        }
    }

    let mut session = Session::new(import_text(TWO_SCENES), Arc::new(partial)).unwrap();
    let layout = session.layout().unwrap();
    let before = session.snapshot();

    let result = session.insert(2, sp(ScreenplayKind::Shot, "close on the rope"));
    assert!(matches!(
        result,
        Err(SessionError::Template(TemplateError::MissingRule { .. }))
    ));
    assert_eq!(session.document(), &*before);
    assert_eq!(session.document().revision(), before.revision());
    assert!(session.is_clean());
    assert!(Arc::ptr_eq(&session.layout().unwrap(), &layout));

    // Kinds the template covers still edit normally
    session
        .insert(2, sp(ScreenplayKind::Action, "the rope   creaks"))
        .unwrap();
    assert_eq!(session.document().paragraph(2).unwrap().text(), "the rope creaks");
}
