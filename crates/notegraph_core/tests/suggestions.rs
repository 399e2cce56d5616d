use notegraph_core::suggest::{compute_candidates, on_text_changed};
use notegraph_core::{KeyOutcome, SuggestionKey, SuggestionSession};

#[test]
fn prefix_filter_keeps_original_order() {
    let known = ["alpha", "apple", "beta"];
    assert_eq!(compute_candidates("ap", &known), vec!["alpha", "apple"]);
}

#[test]
fn literal_prefix_matches_are_always_included() {
    let known = ["Project plan", "progress", "pilot", "other"];
    assert_eq!(
        compute_candidates("pro", &known),
        vec!["Project plan", "progress"]
    );
    assert_eq!(compute_candidates("prog", &known), vec!["progress"]);
}

#[test]
fn trigger_context_is_detected_at_cursor() {
    let text = "first line\nsee [@al";
    assert_eq!(on_text_changed(text.len(), text).as_deref(), Some("al"));
    assert_eq!(on_text_changed(5, text), None);
}

#[test]
fn full_selection_flow_rewrites_token() {
    let known = ["alpha", "apple", "beta"];
    let text = "notes: [@ap";
    let mut session = SuggestionSession::open(text, text.len(), &known).unwrap();
    assert_eq!(session.candidates(), ["alpha", "apple"]);

    session.handle_key(SuggestionKey::Down, text);
    session.handle_key(SuggestionKey::Down, text);
    session.handle_key(SuggestionKey::Down, text);
    assert_eq!(session.selected(), Some("apple"));

    assert_eq!(
        session.handle_key(SuggestionKey::Enter, text),
        KeyOutcome::Applied {
            text: "notes: [@apple]".to_string(),
            cursor: "notes: [@apple]".len(),
        }
    );
}

#[test]
fn no_match_opens_no_session() {
    let known = ["alpha"];
    assert!(SuggestionSession::open("[@zz", 4, &known).is_none());
    assert!(SuggestionSession::open("no trigger", 3, &known).is_none());
}
