use scriptdoc::corrector::{Corrector, CorrectorOptions};
use scriptdoc::layout::PaginationEngine;
use scriptdoc::model::{
    Document, Paragraph, ParagraphKind, SceneNumber, ScreenplayKind, TextRun, WritingForm,
};
use scriptdoc::template::{builtin, TemplateRegistry};
use std::sync::Arc;

const TEXTS: &[&str] = &[
    "int. kitchen - day",
    "She said \"wait...\" and   left.",
    "'Tis the season",
    "(beat)",
    "marta (cont'd)",
    "   ",
    "Fog.... and more fog",
    "A sentence long enough to wrap across several lines of any column the templates define, \
     with words of varied length so that the greedy wrap has something to do.",
];

fn corpus(form: WritingForm) -> Vec<Paragraph> {
    form.kinds()
        .into_iter()
        .flat_map(|kind| {
            TEXTS.iter().map(move |text| {
                Paragraph::with_runs(
                    kind,
                    vec![
                        TextRun::new(*text),
                        TextRun {
                            italic: true,
                            ..TextRun::new(" \"end\"")
                        },
                    ],
                )
            })
        })
        .collect()
}

fn document(form: WritingForm, repeat: usize) -> Document {
    let mut document = Document::new(form);
    for _ in 0..repeat {
        for paragraph in corpus(form) {
            document.push(paragraph).unwrap();
        }
    }
    document
}

#[test]
fn test_every_kind_resolves_in_both_builtins() {
    let registry = TemplateRegistry::new();
    for form in WritingForm::ALL {
        for name in [builtin::letter_name(form), builtin::a4_name(form)] {
            let template = registry.get(&name).unwrap();
            assert_eq!(template.form(), form);
            for kind in form.kinds() {
                assert!(template.rule(kind).is_ok(), "{} lacks {}", name, kind);
                assert!(registry.rule(&template, kind).is_ok());
            }
        }
    }
}

#[test]
fn test_corrector_is_idempotent() {
    let options = [
        CorrectorOptions::default(),
        CorrectorOptions {
            smart_quotes: false,
            ..CorrectorOptions::default()
        },
        CorrectorOptions {
            case_transform: false,
            whitespace: false,
            ..CorrectorOptions::default()
        },
    ];
    for template in builtin::all().unwrap() {
        for options in &options {
            let corrector = Corrector::new(options.clone());
            for paragraph in corpus(template.form()) {
                let once = corrector.normalize(&paragraph, template).unwrap();
                let twice = corrector.normalize(&once, template).unwrap();
                assert_eq!(once, twice, "{} {}", template.name(), paragraph.kind());
            }
        }
    }
}

#[test]
fn test_document_pass_is_idempotent() {
    let corrector = Corrector::default();
    for form in WritingForm::ALL {
        let template = builtin::fallback(form).unwrap();
        let mut document = document(form, 1);
        corrector.normalize_document(&mut document, &template).unwrap();
        let first = document.nodes().to_vec();
        assert_eq!(corrector.normalize_document(&mut document, &template).unwrap(), 0);
        assert_eq!(document.nodes(), &first[..]);
    }
}

#[test]
fn test_pagination_is_deterministic() {
    for template in builtin::all().unwrap() {
        let document = document(template.form(), 3);
        let mut first = PaginationEngine::new(Arc::clone(template));
        let mut second = PaginationEngine::new(Arc::clone(template));
        let a = first.relayout(&document).unwrap();
        let b = second.relayout(&document).unwrap();
        assert_eq!(a.pages, b.pages, "{}", template.name());
        assert_eq!(a.numbering, b.numbering);
        assert_eq!(a.duration, b.duration);
        assert!(a.page_count() > 1, "{} should span pages", template.name());

        let again = first.full_layout(&document).unwrap();
        assert_eq!(again.pages, a.pages);
    }
}

#[test]
fn test_scene_numbers_increase() {
    for form in WritingForm::ALL {
        let template = builtin::fallback(form).unwrap();
        let document = document(form, 2);
        let mut engine = PaginationEngine::new(template);
        let layout = engine.relayout(&document).unwrap();
        let numbers: Vec<_> = layout.numbering.scenes.values().copied().collect();
        assert!(
            numbers.windows(2).all(|w| w[0] < w[1]),
            "{} numbers out of order: {:?}",
            form,
            numbers
        );
        let pages: Vec<usize> = layout.pages.iter().map(|p| p.number).collect();
        assert_eq!(pages, (1..=layout.page_count()).collect::<Vec<_>>());
    }
}

#[test]
fn test_scene_numbers_increase_around_lettered_locks() {
    let layouts: [&[Option<&str>]; 4] = [
        &[Some("4A"), None, Some("4B")],
        &[Some("4A"), None, None, None, Some("4B"), None],
        &[None, Some("4"), None, None, Some("4B"), None, Some("5")],
        &[None, None, Some("1"), None, Some("2A"), None, Some("2B")],
    ];
    let template = builtin::fallback(WritingForm::Screenplay).unwrap();
    for locks in layouts {
        let mut document = Document::new(WritingForm::Screenplay);
        for (i, lock) in locks.iter().enumerate() {
            let mut heading = Paragraph::new(
                ParagraphKind::Screenplay(ScreenplayKind::SceneHeading),
                &format!("INT. ROOM {} - DAY", i),
            );
            heading.attributes.number_lock = lock.and_then(SceneNumber::parse);
            document.push(heading).unwrap();
            document
                .push(Paragraph::new(
                    ParagraphKind::Screenplay(ScreenplayKind::Action),
                    "Something happens.",
                ))
                .unwrap();
        }
        let mut engine = PaginationEngine::new(Arc::clone(&template));
        let layout = engine.relayout(&document).unwrap();
        let numbers: Vec<_> = layout.numbering.scenes.values().copied().collect();
        assert_eq!(numbers.len(), locks.len(), "{:?} left a scene unnumbered", locks);
        assert!(
            numbers.windows(2).all(|w| w[0] < w[1]),
            "{:?} numbered {:?}",
            locks,
            numbers.iter().map(ToString::to_string).collect::<Vec<_>>()
        );
    }
}
