use std::time::Duration;

use tracing_test::traced_test;

use super::fixtures::{EN, FakeClipboard, FakeKeys, FakeLayouts, FakeObject, FakeOs, HE};
use crate::{
    clipboard::CF_BITMAP,
    convert::OverrideTable,
    layout::LayoutId,
    workflow::{
        ActionOutcome, Failure, KeyInjector, RewriteTiming, SkipReason, convert_selected_text,
    },
};

fn fast() -> RewriteTiming {
    RewriteTiming {
        copy_poll_tries: 3,
        copy_poll_interval: Duration::ZERO,
        paste_settle: Duration::ZERO,
    }
}

struct Harness {
    os: std::rc::Rc<std::cell::RefCell<FakeOs>>,
    clip: FakeClipboard,
    keys: FakeKeys,
    layouts: FakeLayouts,
    table: OverrideTable,
}

impl Harness {
    fn new(field: &str) -> Self {
        let os = FakeOs::shared();
        {
            let mut o = os.borrow_mut();
            o.set_field(field);
            o.put_text("before");
            o.put(
                CF_BITMAP,
                FakeObject::Bitmap {
                    width: 1,
                    height: 1,
                    pixels: vec![7, 7, 7, 7],
                },
            );
        }
        Self {
            clip: FakeClipboard(os.clone()),
            keys: FakeKeys(os.clone()),
            os,
            layouts: FakeLayouts::en_he(),
            table: OverrideTable::builtin(),
        }
    }

    fn run(&mut self, source: LayoutId, target: LayoutId) -> ActionOutcome {
        convert_selected_text(
            &mut self.clip,
            &mut self.keys,
            &self.layouts,
            &self.table,
            source,
            target,
            fast(),
        )
    }

    fn assert_clipboard_restored(&self) {
        let o = self.os.borrow();
        let board = o.clipboard();
        assert_eq!(board.len(), 2);
        assert_eq!(o.clipboard_text().as_deref(), Some("before"));
        assert_eq!(
            board[1],
            (
                CF_BITMAP,
                FakeObject::Bitmap {
                    width: 1,
                    height: 1,
                    pixels: vec![7, 7, 7, 7],
                }
            )
        );
        assert_eq!(o.leaked(), 0);
        assert!(!o.is_open);
    }
}

#[traced_test]
#[test]
fn convert_all_text_rewrites_the_field_and_restores_the_clipboard() {
    let mut h = Harness::new("akuo/");

    assert!(h.keys.select_all());
    let outcome = h.run(EN, HE);

    assert_eq!(outcome, ActionOutcome::Applied);
    assert_eq!(h.os.borrow().field, "שלום.");
    assert_eq!(h.os.borrow().chords, ["select_all", "copy", "paste"]);
    h.assert_clipboard_restored();
    assert!(logs_contain("source_layout_detected"));
}

#[test]
fn unambiguous_detection_overrides_the_given_source() {
    let mut h = Harness::new("שלום.");
    h.keys.select_all();

    // Called as EN -> EN; detection finds HE as the only possible source.
    assert_eq!(h.run(EN, EN), ActionOutcome::Applied);
    assert_eq!(h.os.borrow().field, "akuo/");
}

#[test]
fn ambiguous_text_keeps_the_given_source() {
    let mut h = Harness::new("A !");
    h.keys.select_all();

    assert_eq!(h.run(EN, HE), ActionOutcome::Applied);
    assert_eq!(h.os.borrow().field, "A !");
    h.assert_clipboard_restored();
}

#[test]
fn nothing_selected_is_a_silent_skip() {
    let mut h = Harness::new("akuo");

    assert_eq!(h.run(EN, HE), ActionOutcome::Skipped(SkipReason::NoSelection));
    assert_eq!(h.os.borrow().field, "akuo");
    assert_eq!(h.os.borrow().chords, ["copy"]);
    h.assert_clipboard_restored();
}

#[test]
fn converting_a_selection_keeps_the_text_around_it() {
    let mut h = Harness::new("hi akuo there");
    h.os.borrow_mut().selected = Some((3, 7));

    assert_eq!(h.run(EN, HE), ActionOutcome::Applied);
    assert_eq!(h.os.borrow().field, "hi שלום there");
    assert_eq!(h.os.borrow().chords, ["copy", "paste"]);
    h.assert_clipboard_restored();
}

#[traced_test]
#[test]
fn undecodable_copy_is_reported_as_such() {
    let mut h = Harness::new("akuo");
    h.keys.select_all();
    // 'a' followed by a lone high surrogate
    h.os.borrow_mut().copied_units = Some(vec![0x0061, 0xD800]);

    assert_eq!(
        h.run(EN, HE),
        ActionOutcome::Skipped(SkipReason::UndecodableText)
    );
    assert_eq!(h.os.borrow().field, "akuo");
    assert_eq!(h.os.borrow().chords, ["select_all", "copy"]);
    h.assert_clipboard_restored();
    assert!(logs_contain("copied_text_undecodable"));
}

#[test]
fn unresponsive_window_exhausts_the_poll_budget() {
    let mut h = Harness::new("akuo");
    h.keys.select_all();
    h.os.borrow_mut().unresponsive = true;

    let opens_before = h.os.borrow().opens;
    assert_eq!(h.run(EN, HE), ActionOutcome::Skipped(SkipReason::NoSelection));

    // capture, sentinel, three polls, restore
    assert_eq!(h.os.borrow().opens - opens_before, 6);
    h.assert_clipboard_restored();
}

#[test]
fn unmappable_selection_leaves_the_field_untouched() {
    let mut h = Harness::new("ak~");
    h.keys.select_all();

    assert_eq!(h.run(EN, HE), ActionOutcome::Skipped(SkipReason::Unmappable));
    assert_eq!(h.os.borrow().field, "ak~");
    assert_eq!(h.os.borrow().chords, ["select_all", "copy"]);
    h.assert_clipboard_restored();
}

#[test]
fn busy_clipboard_aborts_before_any_input() {
    let mut h = Harness::new("akuo");
    h.keys.select_all();
    h.os.borrow_mut().busy = true;

    assert_eq!(h.run(EN, HE), ActionOutcome::Failed(Failure::Clipboard));
    assert_eq!(h.os.borrow().chords, ["select_all"]);

    h.os.borrow_mut().busy = false;
    h.assert_clipboard_restored();
}

#[test]
fn rejected_paste_still_restores_the_clipboard() {
    let mut h = Harness::new("akuo");
    h.keys.select_all();
    h.os.borrow_mut().reject_paste = true;

    assert_eq!(h.run(EN, HE), ActionOutcome::Failed(Failure::Input));
    assert_eq!(h.os.borrow().field, "akuo");
    h.assert_clipboard_restored();
}

#[test]
fn outcome_names_are_stable() {
    assert_eq!(ActionOutcome::Applied.as_str(), "applied");
    assert_eq!(
        ActionOutcome::Skipped(SkipReason::NoSelection).as_str(),
        "no_selection"
    );
    assert_eq!(
        ActionOutcome::Skipped(SkipReason::UndecodableText).as_str(),
        "undecodable_text"
    );
    assert_eq!(
        ActionOutcome::Failed(Failure::Clipboard).as_str(),
        "clipboard_error"
    );
    assert_eq!(RewriteTiming::default().copy_poll_tries, 10);
    assert_eq!(
        RewriteTiming::default().copy_poll_interval,
        Duration::from_millis(30)
    );
    assert_eq!(RewriteTiming::default().paste_settle, Duration::from_millis(100));
}
