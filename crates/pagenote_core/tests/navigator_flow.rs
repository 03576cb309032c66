use pagenote_core::{
    Direction, DocumentViewer, Focus, Mode, NavState, Navigator, NavigatorError, NoterConfig,
    OrgOutlineRepository, OutlineRepository, PageValue, Section, Session, SharedNavigator,
    SourceDocument, UserMessage,
};
use std::path::Path;
use tempfile::TempDir;

type TestNavigator = Navigator<SourceDocument, OrgOutlineRepository>;

fn navigator_with(
    notes: &str,
    mode: Mode,
    config: NoterConfig,
    page_count: u32,
) -> (TempDir, TestNavigator) {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("paper.pdf");
    std::fs::write(&source, b"%PDF-1.7").unwrap();

    let session = Session::start(
        config,
        mode,
        OrgOutlineRepository::from_text(notes),
        Some(source),
        |path: &Path| Ok(SourceDocument::new(path.display().to_string(), page_count)),
    )
    .unwrap();
    (dir, Navigator::new(session))
}

fn page_key_config() -> NoterConfig {
    NoterConfig::from_toml_str("page_property = \"page\"\n").unwrap()
}

fn note(page: u32) -> String {
    format!("* Notes for page {page}\n:PROPERTIES:\n:page: {page}\n:END:\n")
}

fn narrowed_section(navigator: &TestNavigator) -> Option<&Section> {
    let notes = navigator.session().notes();
    notes.narrowed().and_then(|id| notes.section(id))
}

fn current_page(navigator: &TestNavigator) -> u32 {
    navigator.session().viewer().current_page()
}

#[test]
fn note_created_on_empty_document_stays_open_on_next_page() {
    let (_dir, mut navigator) = navigator_with("", Mode::SingleDocument, page_key_config(), 20);
    navigator.jump_to_page(7).unwrap();

    let page_seven = navigator.add_or_open_note().unwrap();
    let section = narrowed_section(&navigator).unwrap();
    assert_eq!(section.heading, "Notes for page 7");
    assert_eq!(section.property("page"), Some("7"));

    assert_eq!(
        navigator.go_to_page(Direction::Forward).unwrap(),
        NavState::NoNoteForPage(8)
    );
    assert_eq!(current_page(&navigator), 8);
    assert_eq!(navigator.focus(), Focus::Viewer);
    assert_eq!(navigator.session().notes().narrowed(), Some(page_seven));
    assert_eq!(navigator.session().notes().outline().sections.len(), 1);
}

#[test]
fn moving_to_a_page_without_note_keeps_the_last_note_open() {
    let (_dir, mut navigator) =
        navigator_with(&note(7), Mode::SingleDocument, page_key_config(), 20);
    let page_seven = navigator.session().notes().outline().sections[0].id;

    assert_eq!(navigator.jump_to_page(7).unwrap(), NavState::ViewingNote(7));
    assert_eq!(navigator.session().notes().narrowed(), Some(page_seven));

    assert_eq!(
        navigator.go_to_page(Direction::Forward).unwrap(),
        NavState::NoNoteForPage(8)
    );
    assert_eq!(current_page(&navigator), 8);
    assert_eq!(navigator.session().notes().narrowed(), Some(page_seven));
    assert_eq!(navigator.focus(), Focus::Viewer);
    assert_eq!(navigator.session().notes().outline().sections.len(), 1);
}

#[test]
fn add_note_creates_once_then_reopens() {
    let (_dir, mut navigator) =
        navigator_with(&note(7), Mode::SingleDocument, page_key_config(), 20);
    navigator.jump_to_page(8).unwrap();

    let created = navigator.add_or_open_note().unwrap();
    assert_eq!(navigator.state(), NavState::ViewingNote(8));
    assert_eq!(navigator.focus(), Focus::Notes);

    let section = narrowed_section(&navigator).unwrap();
    assert_eq!(section.id, created);
    assert_eq!(section.heading, "Notes for page 8");
    assert_eq!(section.page("page"), PageValue::Page(8));
    assert_eq!(section.level, 1);

    navigator.go_to_page(Direction::Backward).unwrap();
    navigator.go_to_page(Direction::Forward).unwrap();
    let reopened = navigator.add_or_open_note().unwrap();
    assert_eq!(reopened, created);
    assert_eq!(navigator.session().notes().outline().sections.len(), 2);
}

#[test]
fn reopening_a_note_ends_it_on_a_fresh_line() {
    let text = "* Notes for page 2\n:PROPERTIES:\n:page: 2\n:END:\nhalf a thought";
    let (_dir, mut navigator) =
        navigator_with(text, Mode::SingleDocument, page_key_config(), 5);
    navigator.jump_to_page(2).unwrap();

    navigator.add_or_open_note().unwrap();
    assert_eq!(
        narrowed_section(&navigator).unwrap().body,
        "half a thought\n"
    );
}

#[test]
fn page_steps_stop_at_document_edges() {
    let (_dir, mut navigator) = navigator_with("", Mode::SingleDocument, page_key_config(), 2);

    assert_eq!(
        navigator.go_to_page(Direction::Backward).unwrap(),
        NavState::Idle
    );
    assert_eq!(current_page(&navigator), 1);

    assert_eq!(
        navigator.go_to_page(Direction::Forward).unwrap(),
        NavState::NoNoteForPage(2)
    );
    assert_eq!(
        navigator.go_to_page(Direction::Forward).unwrap(),
        NavState::NoNoteForPage(2)
    );
    assert_eq!(current_page(&navigator), 2);
}

#[test]
fn previous_note_reports_first_note() {
    let text = [note(2), note(6)].concat();
    let (_dir, mut navigator) =
        navigator_with(&text, Mode::SingleDocument, page_key_config(), 10);
    navigator.jump_to_page(2).unwrap();

    assert_eq!(navigator.sync_to_previous_note().unwrap(), None);
    assert_eq!(navigator.take_messages(), vec![UserMessage::FirstNote]);
    assert_eq!(current_page(&navigator), 2);
    assert!(navigator.take_messages().is_empty());
}

#[test]
fn previous_and_next_notes_move_both_views() {
    let text = [note(2), "* Scratch\n".to_string(), note(6)].concat();
    let (_dir, mut navigator) =
        navigator_with(&text, Mode::SingleDocument, page_key_config(), 10);
    let sections: Vec<_> = navigator
        .session()
        .notes()
        .outline()
        .sections
        .iter()
        .map(|section| section.id)
        .collect();
    navigator.jump_to_page(6).unwrap();

    assert_eq!(navigator.sync_to_previous_note().unwrap(), Some(sections[0]));
    assert_eq!(current_page(&navigator), 2);
    assert_eq!(navigator.state(), NavState::ViewingNote(2));

    assert_eq!(navigator.sync_to_next_note().unwrap(), Some(sections[2]));
    assert_eq!(current_page(&navigator), 6);
    assert_eq!(navigator.session().notes().narrowed(), Some(sections[2]));

    assert_eq!(navigator.sync_to_next_note().unwrap(), None);
    assert_eq!(navigator.take_messages(), vec![UserMessage::NoNextNotes]);
}

#[test]
fn next_note_skips_the_current_subtree() {
    let text = "* Notes for page 1\n:PROPERTIES:\n:page: 1\n:END:\n** follow-up\n:PROPERTIES:\n:page: 9\n:END:\n* Notes for page 3\n:PROPERTIES:\n:page: 3\n:END:\n";
    let (_dir, mut navigator) =
        navigator_with(text, Mode::SingleDocument, page_key_config(), 10);
    let page_three = navigator.session().notes().outline().sections[1].id;
    navigator.jump_to_page(1).unwrap();

    assert_eq!(navigator.sync_to_next_note().unwrap(), Some(page_three));
    assert_eq!(current_page(&navigator), 3);
}

#[test]
fn syncing_from_a_note_reports_bad_page_properties() {
    let text = "* Loose\n* Roman\n:PROPERTIES:\n:page: iv\n:END:\n* Far\n:PROPERTIES:\n:page: 40\n:END:\n";
    let (_dir, mut navigator) =
        navigator_with(text, Mode::SingleDocument, page_key_config(), 12);
    let ids: Vec<_> = navigator
        .session()
        .notes()
        .outline()
        .sections
        .iter()
        .map(|section| section.id)
        .collect();

    assert_eq!(navigator.sync_page_from_current_note().unwrap(), None);
    assert_eq!(navigator.take_messages(), vec![UserMessage::NoCurrentNote]);

    navigator.session_mut().notes_mut().narrow(ids[0]).unwrap();
    assert_eq!(navigator.sync_page_from_current_note().unwrap(), None);
    assert_eq!(
        navigator.take_messages(),
        vec![UserMessage::MissingPageProperty {
            key: "page".to_string()
        }]
    );

    navigator.session_mut().notes_mut().narrow(ids[1]).unwrap();
    assert_eq!(navigator.sync_page_from_current_note().unwrap(), None);
    assert_eq!(
        navigator.take_messages(),
        vec![UserMessage::UnparsablePageProperty {
            key: "page".to_string(),
            value: "iv".to_string()
        }]
    );

    navigator.session_mut().notes_mut().narrow(ids[2]).unwrap();
    assert_eq!(navigator.sync_page_from_current_note().unwrap(), None);
    assert_eq!(
        navigator.take_messages(),
        vec![UserMessage::PageOutOfRange {
            page: 40,
            page_count: 12
        }]
    );
    assert_eq!(current_page(&navigator), 1);
}

#[test]
fn syncing_from_a_note_moves_the_viewer() {
    let (_dir, mut navigator) =
        navigator_with(&note(5), Mode::SingleDocument, page_key_config(), 12);
    let id = navigator.session().notes().outline().sections[0].id;
    navigator.session_mut().notes_mut().narrow(id).unwrap();

    assert_eq!(navigator.sync_page_from_current_note().unwrap(), Some(5));
    assert_eq!(current_page(&navigator), 5);
    assert_eq!(navigator.state(), NavState::ViewingNote(5));
}

#[test]
fn missing_root_section_leaves_both_views_unchanged() {
    let mode = Mode::MultiDocument {
        document_key: "attn".to_string(),
    };
    let (_dir, mut navigator) =
        navigator_with("* Other\n", mode, NoterConfig::default(), 10);

    let err = navigator.go_to_page(Direction::Forward).unwrap_err();
    assert!(matches!(err, NavigatorError::Scope(_)));
    assert_eq!(current_page(&navigator), 1);
    assert_eq!(navigator.state(), NavState::Idle);

    assert!(navigator.add_or_open_note().is_err());
    assert_eq!(navigator.session().notes().outline().sections.len(), 1);
}

#[test]
fn multi_document_notes_are_created_under_the_root_section() {
    let mode = Mode::MultiDocument {
        document_key: "attn".to_string(),
    };
    let text = "* Attention paper\n:PROPERTIES:\n:CUSTOM_ID: attn\n:END:\n* Unrelated\n";
    let (_dir, mut navigator) = navigator_with(text, mode, NoterConfig::default(), 10);
    navigator.jump_to_page(4).unwrap();

    navigator.add_or_open_note().unwrap();
    let root = &navigator.session().notes().outline().sections[0];
    assert_eq!(root.children.len(), 1);
    assert_eq!(root.children[0].level, 2);
    assert_eq!(root.children[0].property("attn-page"), Some("4"));
}

#[test]
fn shared_navigator_serializes_note_creation() {
    let (_dir, navigator) = navigator_with("", Mode::SingleDocument, page_key_config(), 10);
    let shared = SharedNavigator::new(navigator);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let shared = shared.clone();
            std::thread::spawn(move || shared.with(|navigator| navigator.add_or_open_note()))
        })
        .collect();
    let ids: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap().unwrap())
        .collect();

    assert!(ids.windows(2).all(|pair| pair[0] == pair[1]));
    let navigator = shared.into_inner().unwrap();
    assert_eq!(navigator.session().notes().outline().sections.len(), 1);
}
