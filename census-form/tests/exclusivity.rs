//! "I prefer not to say" checkboxes against number, text, currency and date answers.

use census_form::{
    AnswerEdits, AnswerValue, DateValue, EditPhase, Engine, EngineConfig, GroupState, Location,
    NO_ANSWER_PROVIDED, Next, SessionId, SlotId,
};
use example_questionnaires::mutually_exclusive;
use pretty_assertions::assert_eq;

const PREFER_NOT_TO_SAY: &str = "I prefer not to say";

fn engine() -> Engine {
    Engine::new(mutually_exclusive().unwrap(), EngineConfig::default())
}

fn prefer_not_to_say() -> AnswerValue {
    AnswerValue::Choices(vec![PREFER_NOT_TO_SAY.to_string()])
}

fn summary_value(engine: &Engine, session: SessionId, question: &str) -> String {
    engine
        .summary(session)
        .unwrap()
        .into_iter()
        .find(|row| row.question.as_str() == question)
        .unwrap()
        .value
        .to_string()
}

#[test]
fn test_number_replaces_exclusive() {
    let engine = engine();
    let session = engine.start_session().unwrap();
    let exclusive = SlotId::from("number-exclusive-answer");
    let number = SlotId::from("number-answer");

    engine
        .edit(session, &exclusive, prefer_not_to_say(), EditPhase::Commit)
        .unwrap();
    let applied = engine
        .edit(session, &number, 123, EditPhase::Commit)
        .unwrap();
    assert_eq!(applied.cleared, vec![exclusive.clone()]);
    assert_eq!(applied.state, GroupState::OthersSet);

    let submission = engine
        .submit_block(session, &"mutually-exclusive-number".into(), AnswerEdits::new())
        .unwrap();
    assert!(submission.is_accepted());
    assert_eq!(
        submission.next,
        Some(Next::Block(Location::new(
            "textfield-section",
            "mutually-exclusive-textfield"
        )))
    );

    assert_eq!(summary_value(&engine, session, "number-question"), "123");
    assert_eq!(engine.display_text(session, &exclusive).unwrap(), NO_ANSWER_PROVIDED);
}

#[test]
fn test_exclusive_replaces_number() {
    let engine = engine();
    let session = engine.start_session().unwrap();
    let block = "mutually-exclusive-number".into();

    engine
        .submit_block(session, &block, AnswerEdits::new().with_answer("number-answer", 123))
        .unwrap();
    let submission = engine
        .submit_block(
            session,
            &block,
            AnswerEdits::new().with_answer("number-exclusive-answer", prefer_not_to_say()),
        )
        .unwrap();
    assert!(submission.is_accepted());

    assert_eq!(engine.answer(session, &"number-answer".into()).unwrap(), None);
    assert_eq!(summary_value(&engine, session, "number-question"), PREFER_NOT_TO_SAY);
}

#[test]
fn test_exclusive_wins_within_one_submission() {
    let engine = engine();
    let session = engine.start_session().unwrap();

    let edits = AnswerEdits::new()
        .with_answer("textfield-answer", "Blue")
        .with_answer("textfield-exclusive-answer", prefer_not_to_say());
    let submission = engine
        .submit_block(session, &"mutually-exclusive-textfield".into(), edits)
        .unwrap();
    assert!(submission.is_accepted());

    assert_eq!(engine.answer(session, &"textfield-answer".into()).unwrap(), None);
    assert_eq!(
        summary_value(&engine, session, "textfield-question"),
        PREFER_NOT_TO_SAY
    );
}

#[test]
fn test_textfield_answer() {
    let engine = engine();
    let session = engine.start_session().unwrap();

    engine
        .submit_block(
            session,
            &"mutually-exclusive-textfield".into(),
            AnswerEdits::new().with_answer("textfield-answer", "Blue"),
        )
        .unwrap();

    assert_eq!(summary_value(&engine, session, "textfield-question"), "Blue");
    assert_eq!(
        engine
            .display_text(session, &"textfield-exclusive-answer".into())
            .unwrap(),
        NO_ANSWER_PROVIDED
    );
}

#[test]
fn test_keystroke_keeps_exclusive_until_blur() {
    let engine = engine();
    let session = engine.start_session().unwrap();
    let exclusive = SlotId::from("currency-exclusive-answer");
    let currency = SlotId::from("currency-answer");

    engine
        .edit(session, &exclusive, prefer_not_to_say(), EditPhase::Commit)
        .unwrap();
    let applied = engine
        .edit(session, &currency, 123, EditPhase::Keystroke)
        .unwrap();
    assert!(applied.drafted);
    assert!(applied.cleared.is_empty());
    assert_eq!(
        engine.answer(session, &exclusive).unwrap(),
        Some(prefer_not_to_say())
    );

    let applied = engine.blur(session, &currency).unwrap().unwrap();
    assert_eq!(applied.cleared, vec![exclusive.clone()]);
    assert_eq!(engine.answer(session, &exclusive).unwrap(), None);
    assert_eq!(engine.display_text(session, &currency).unwrap(), "£123.00");

    // Nothing left to commit.
    assert_eq!(engine.blur(session, &currency).unwrap(), None);
}

#[test]
fn test_submission_commits_pending_draft() {
    let engine = engine();
    let session = engine.start_session().unwrap();
    let exclusive = SlotId::from("month-year-date-exclusive-answer");
    let date = SlotId::from("month-year-date-answer");

    engine
        .edit(session, &exclusive, prefer_not_to_say(), EditPhase::Commit)
        .unwrap();
    engine
        .edit(session, &date, DateValue::month_year(3, 2018), EditPhase::Keystroke)
        .unwrap();
    assert!(engine.session_state(session).unwrap().drafts().contains_key(&date));

    let submission = engine
        .submit_block(
            session,
            &"mutually-exclusive-month-year-date".into(),
            AnswerEdits::new(),
        )
        .unwrap();
    assert!(submission.is_accepted());

    let state = engine.session_state(session).unwrap();
    assert!(state.drafts().is_empty());
    assert_eq!(engine.answer(session, &exclusive).unwrap(), None);
    assert_eq!(
        summary_value(&engine, session, "month-year-date-question"),
        "March 2018"
    );
}

#[test]
fn test_exclusive_checkbox_drops_drafts() {
    let engine = engine();
    let session = engine.start_session().unwrap();
    let number = SlotId::from("number-answer");

    engine
        .edit(session, &number, 42, EditPhase::Keystroke)
        .unwrap();
    engine
        .edit(
            session,
            &"number-exclusive-answer".into(),
            prefer_not_to_say(),
            EditPhase::Keystroke,
        )
        .unwrap();

    assert!(engine.session_state(session).unwrap().drafts().is_empty());
    assert_eq!(engine.blur(session, &number).unwrap(), None);
    assert_eq!(engine.answer(session, &number).unwrap(), None);
}

#[test]
fn test_keystroke_clears_when_configured() {
    let config = EngineConfig {
        clear_exclusive_on_keystroke: true,
        ..EngineConfig::default()
    };
    let engine = Engine::new(mutually_exclusive().unwrap(), config);
    let session = engine.start_session().unwrap();
    let exclusive = SlotId::from("textfield-exclusive-answer");

    engine
        .edit(session, &exclusive, prefer_not_to_say(), EditPhase::Commit)
        .unwrap();
    let applied = engine
        .edit(session, &"textfield-answer".into(), "B", EditPhase::Keystroke)
        .unwrap();

    assert!(!applied.drafted);
    assert_eq!(applied.cleared, vec![exclusive.clone()]);
    assert_eq!(engine.answer(session, &exclusive).unwrap(), None);
}

#[test]
fn test_nothing_answered() {
    let engine = engine();
    let session = engine.start_session().unwrap();

    for block in [
        "mutually-exclusive-number",
        "mutually-exclusive-textfield",
        "mutually-exclusive-currency",
        "mutually-exclusive-month-year-date",
    ] {
        let submission = engine
            .submit_block(session, &block.into(), AnswerEdits::new())
            .unwrap();
        assert!(submission.is_accepted());
    }
    assert!(engine.is_complete(session).unwrap());

    let summary = engine.summary(session).unwrap();
    assert_eq!(summary.len(), 4);
    for row in summary {
        assert_eq!(row.value.to_string(), NO_ANSWER_PROVIDED);
    }
}

#[test]
fn test_wrong_type_is_rejected() {
    let engine = engine();
    let session = engine.start_session().unwrap();

    let result = engine.edit(
        session,
        &"month-year-date-answer".into(),
        DateValue::new(1, 12, 2016),
        EditPhase::Commit,
    );
    assert!(result.is_err());
    assert_eq!(
        engine.answer(session, &"month-year-date-answer".into()).unwrap(),
        None
    );
}
