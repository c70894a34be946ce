use census_form_types::{
    AnswerSlot, Block, CalculatedRule, ChoiceSlot, Comparison, Destination, NumberSlot, Predicate,
    Question, Questionnaire, QuestionnaireDefinition, RoutingRule, SchemaError, Section, SlotKind,
};

/// Upper bound on the total of the spending breakdown.
pub const MAX_MONTHLY_SPENDING: i64 = 10_000;

pub const PREFER_NOT_TO_SAY: &str = "I prefer not to say";

fn pounds(id: &str, label: &str) -> AnswerSlot {
    AnswerSlot::new(id, label, SlotKind::Number(NumberSlot::currency("£")))
}

/// Income: a mandatory amount, then savings only for respondents who have
/// some. "No" jumps straight to the spending section.
fn income() -> Section {
    Section::new("income")
        .with_title("Income")
        .with_block(
            Block::new("monthly-income").with_question(
                Question::new("monthly-income-question", "What is your monthly household income?")
                    .with_answer(pounds("monthly-income-answer", "Monthly income"))
                    .mandatory(),
            ),
        )
        .with_block(
            Block::new("has-savings")
                .with_question(
                    Question::new("has-savings-question", "Does your household have any savings?")
                        .with_answer(AnswerSlot::new(
                            "has-savings-answer",
                            "Savings",
                            SlotKind::Radio(ChoiceSlot::new(["Yes", "No"])),
                        ))
                        .mandatory(),
                )
                .with_route(RoutingRule::when(
                    Predicate::equals("has-savings-answer", "No"),
                    Destination::Section("spending".into()),
                )),
        )
        .with_block(
            Block::new("savings")
                .with_question(
                    Question::new("savings-question", "Roughly how much is saved?")
                        .with_answer(pounds("savings-amount-answer", "Amount saved"))
                        .with_answer(AnswerSlot::exclusive(
                            "savings-exclusive-answer",
                            PREFER_NOT_TO_SAY,
                        )),
                )
                .invalidate_when_skipped(),
        )
}

fn spending() -> Section {
    let sources = ["rent-answer", "food-answer", "travel-answer", "other-answer"];

    Section::new("spending").with_title("Spending").with_block(
        Block::new("spending-breakdown")
            .with_question(
                Question::new(
                    "spending-breakdown-question",
                    "How much does your household spend each month on the following?",
                )
                .with_answer(pounds("rent-answer", "Rent or mortgage"))
                .with_answer(pounds("food-answer", "Food"))
                .with_answer(pounds("travel-answer", "Travel"))
                .with_answer(pounds("other-answer", "Everything else")),
            )
            .with_calculation(
                CalculatedRule::sum_equals("spending-total", sources, MAX_MONTHLY_SPENDING)
                    .with_comparison(Comparison::LessThanOrEqual)
                    .with_label("Total monthly spending"),
            ),
    )
}

/// A household budget questionnaire, built in code.
pub fn definition() -> QuestionnaireDefinition {
    QuestionnaireDefinition::new("household_budget")
        .with_title("Household budget")
        .with_section(income())
        .with_section(spending())
}

pub fn load() -> Result<Questionnaire, SchemaError> {
    Questionnaire::from_definition(definition())
}
