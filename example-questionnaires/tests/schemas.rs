use census_form_types::{Comparison, Destination, Location, NumberUnit, Numeric, SlotKind};
use example_questionnaires::{budget, by_id, census_household, mutually_exclusive, total_breakdown};
use pretty_assertions::assert_eq;

fn blocks(locations: &[Location]) -> Vec<&str> {
    locations.iter().map(|location| location.block.as_str()).collect()
}

#[test]
fn total_breakdown_loads() {
    let questionnaire = total_breakdown().unwrap();
    assert_eq!(questionnaire.id(), "test_total_breakdown");
    assert_eq!(blocks(questionnaire.locations()), ["block", "confirmation"]);

    let (block, rule) = questionnaire.calculation(&"total-percentage".into()).unwrap();
    assert_eq!(block.id.as_str(), "block");
    assert_eq!(rule.target, Numeric::from(100));
    assert_eq!(rule.comparison, Comparison::Equal);
    assert_eq!(rule.label.as_deref(), Some("Total percentage"));

    // Summed slots take interim text.
    let slot = questionnaire.slot(&"percentage-1".into()).unwrap();
    assert!(slot.accepts_raw_text());
    assert_eq!(slot.label(), "Percentage 1");
    let SlotKind::Number(number) = slot.kind() else {
        panic!("expected a number slot");
    };
    assert_eq!(number.unit, Some(NumberUnit::Percent));
}

#[test]
fn mutually_exclusive_loads() {
    let questionnaire = mutually_exclusive().unwrap();
    let sections: Vec<_> = questionnaire
        .sections()
        .iter()
        .map(|section| section.title.as_deref().unwrap_or_default())
        .collect();
    assert_eq!(sections, ["Number", "Textfield", "Currency", "Month Year Date"]);

    for section in questionnaire.sections() {
        for block in &section.blocks {
            for question in &block.questions {
                let exclusive = question.exclusive_answer().unwrap();
                assert_eq!(exclusive.label(), "I prefer not to say");
                assert!(!question.is_mandatory());
            }
        }
    }
}

#[test]
fn census_household_loads() {
    let questionnaire = census_household().unwrap();
    assert_eq!(
        blocks(questionnaire.locations()),
        [
            "over-16",
            "marital-status",
            "another-address",
            "in-education",
            "term-time-location",
            "country-of-birth",
            "employment-status",
            "weekly-hours",
        ]
    );
    assert!(
        questionnaire
            .block(&"term-time-location".into())
            .unwrap()
            .invalidate_when_skipped
    );

    let in_education = questionnaire.block(&"in-education".into()).unwrap();
    assert_eq!(in_education.routing.len(), 2);
    assert!(in_education.routing[1].when.is_none());
    assert_eq!(in_education.question_variants.len(), 1);
    assert_eq!(
        in_education.question_variants[0].question.id().as_str(),
        "in-education-question"
    );
}

#[test]
fn budget_routes_by_section() {
    let questionnaire = budget::load().unwrap();
    let has_savings = questionnaire.block(&"has-savings".into()).unwrap();
    assert_eq!(has_savings.routing[0].goto, Destination::Section("spending".into()));
    assert_eq!(
        questionnaire.section_start(&"spending".into()),
        Some(&Location::new("spending", "spending-breakdown"))
    );

    let (_, rule) = questionnaire.calculation(&"spending-total".into()).unwrap();
    assert_eq!(rule.comparison, Comparison::LessThanOrEqual);
    assert_eq!(rule.target, Numeric::from(budget::MAX_MONTHLY_SPENDING));
}

#[test]
fn lookup_by_id() {
    for id in [
        "test_total_breakdown",
        "test_mutually_exclusive",
        "census_household",
        "household_budget",
    ] {
        let questionnaire = by_id(id).unwrap().unwrap();
        assert_eq!(questionnaire.id(), id);
    }
    assert!(by_id("test_unknown").is_none());
}
