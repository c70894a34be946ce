use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{
    AnswerSlot, Block, BlockId, CalculatedRule, Destination, Location, Predicate, Question,
    RuleId, SchemaError, Section, SectionId, SlotId,
};

/// The schema of a questionnaire, as authored.
///
/// This is the serialized shape. It is not checked; turn it into a
/// `Questionnaire` to validate every reference before use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionnaireDefinition {
    /// Schema identifier, e.g. `"test_total_breakdown"`.
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// All sections, in navigation order.
    pub sections: Vec<Section>,
}

impl QuestionnaireDefinition {
    /// Create an empty definition.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            sections: Vec::new(),
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Append a section.
    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    /// Parse a definition from JSON without validating it.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Clone, Copy)]
struct BlockPosition {
    section: usize,
    block: usize,
    /// Index in the linear block order.
    order: usize,
}

#[derive(Debug, Clone, Copy)]
struct SlotPosition {
    section: usize,
    block: usize,
    question: usize,
    /// Set when the slot only appears in a question variant.
    variant: Option<usize>,
    answer: usize,
}

/// A validated, immutable questionnaire.
///
/// Every slot, block and section a rule mentions is known to exist, every
/// route points forward, and identifiers are unique. Loaded once per
/// questionnaire version and shared by all sessions.
#[derive(Debug, Clone)]
pub struct Questionnaire {
    definition: QuestionnaireDefinition,
    order: Vec<Location>,
    blocks: HashMap<BlockId, BlockPosition>,
    sections: HashMap<SectionId, usize>,
    slots: HashMap<SlotId, SlotPosition>,
    rules: HashMap<RuleId, (BlockPosition, usize)>,
}

impl Questionnaire {
    /// Parse and validate a questionnaire from JSON.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        Self::from_definition(QuestionnaireDefinition::from_json(json)?)
    }

    /// Validate a definition.
    pub fn from_definition(definition: QuestionnaireDefinition) -> Result<Self, SchemaError> {
        if definition.sections.is_empty() {
            return Err(SchemaError::EmptyQuestionnaire);
        }

        let mut order = Vec::new();
        let mut blocks = HashMap::new();
        let mut sections = HashMap::new();
        let mut slots = HashMap::new();
        let mut rules = HashMap::new();
        let mut questions = HashSet::new();

        for (s, section) in definition.sections.iter().enumerate() {
            if section.blocks.is_empty() {
                return Err(SchemaError::EmptySection(section.id.clone()));
            }
            if sections.insert(section.id.clone(), s).is_some() {
                return Err(duplicate("section", &section.id));
            }

            for (b, block) in section.blocks.iter().enumerate() {
                if block.questions.is_empty() {
                    return Err(SchemaError::EmptyBlock(block.id.clone()));
                }
                let position = BlockPosition {
                    section: s,
                    block: b,
                    order: order.len(),
                };
                if blocks.insert(block.id.clone(), position).is_some() {
                    return Err(duplicate("block", &block.id));
                }
                order.push(Location::new(section.id.clone(), block.id.clone()));

                for (q, question) in block.questions.iter().enumerate() {
                    if !questions.insert(question.id().clone()) {
                        return Err(duplicate("question", question.id()));
                    }
                    check_question(question)?;
                    for (a, slot) in question.answers().iter().enumerate() {
                        let slot_position = SlotPosition {
                            section: s,
                            block: b,
                            question: q,
                            variant: None,
                            answer: a,
                        };
                        if slots.insert(slot.id().clone(), slot_position).is_some() {
                            return Err(duplicate("answer", slot.id()));
                        }
                    }
                }

                // A variant may reuse the slots of the question it replaces.
                for (v, variant) in block.question_variants.iter().enumerate() {
                    let question = variant.question.id();
                    let Some(q) = block
                        .questions
                        .iter()
                        .position(|default| default.id() == question)
                    else {
                        return Err(SchemaError::UnknownVariantQuestion {
                            block: block.id.clone(),
                            question: question.clone(),
                        });
                    };
                    check_question(&variant.question)?;
                    for (a, slot) in variant.question.answers().iter().enumerate() {
                        match slots.get(slot.id()) {
                            Some(p) if p.section == s && p.block == b && p.question == q => {}
                            Some(_) => return Err(duplicate("answer", slot.id())),
                            None => {
                                slots.insert(
                                    slot.id().clone(),
                                    SlotPosition {
                                        section: s,
                                        block: b,
                                        question: q,
                                        variant: Some(v),
                                        answer: a,
                                    },
                                );
                            }
                        }
                    }
                }

                for (r, rule) in block.calculations.iter().enumerate() {
                    if rules.insert(rule.id.clone(), (position, r)).is_some() {
                        return Err(duplicate("calculation", &rule.id));
                    }
                }
            }
        }

        let mut questionnaire = Self {
            definition,
            order,
            blocks,
            sections,
            slots,
            rules,
        };
        let calculated_sources = questionnaire.check_references()?;
        questionnaire.mark_raw_text_sources(&calculated_sources);
        Ok(questionnaire)
    }

    /// Check every reference in calculations, routes and question variants.
    ///
    /// Returns the slots summed by calculations.
    fn check_references(&self) -> Result<HashSet<SlotId>, SchemaError> {
        let mut sources = HashSet::new();
        let mut order = 0;

        for section in &self.definition.sections {
            for block in &section.blocks {
                for rule in &block.calculations {
                    if rule.sources.is_empty() {
                        return Err(SchemaError::EmptyCalculation(rule.id.clone()));
                    }
                    for source in &rule.sources {
                        let slot = self.slot(source).ok_or_else(|| SchemaError::UnknownSlot {
                            context: format!("Calculation '{}'", rule.id),
                            slot: source.clone(),
                        })?;
                        if !slot.kind().is_numeric() {
                            return Err(SchemaError::NonNumericSource {
                                rule: rule.id.clone(),
                                slot: source.clone(),
                            });
                        }
                        sources.insert(source.clone());
                    }
                }

                for (index, rule) in block.routing.iter().enumerate() {
                    let context = format!("Routing rule {} of block '{}'", index + 1, block.id);
                    if let Some(when) = &rule.when {
                        self.check_predicate(when, &context)?;
                    }
                    let target = match &rule.goto {
                        Destination::Block(id) => {
                            self.location(id).ok_or_else(|| SchemaError::UnknownBlock {
                                context,
                                block: id.clone(),
                            })?
                        }
                        Destination::Section(id) => {
                            self.section_start(id)
                                .ok_or_else(|| SchemaError::UnknownSection {
                                    context,
                                    section: id.clone(),
                                })?
                        }
                        Destination::Summary => continue,
                    };
                    if self.order_of(&target.block).is_none_or(|to| to <= order) {
                        return Err(SchemaError::BackwardRoute {
                            from: block.id.clone(),
                            to: target.block.clone(),
                        });
                    }
                }

                for variant in &block.question_variants {
                    let context = format!("Variant of question '{}'", variant.question.id());
                    self.check_predicate(&variant.when, &context)?;
                }

                order += 1;
            }
        }

        Ok(sources)
    }

    fn check_predicate(&self, predicate: &Predicate, context: &str) -> Result<(), SchemaError> {
        let mut unknown = None;
        predicate.visit_slots(&mut |slot| {
            if unknown.is_none() && !self.slots.contains_key(slot) {
                unknown = Some(slot.clone());
            }
        });
        match unknown {
            Some(slot) => Err(SchemaError::UnknownSlot {
                context: context.to_string(),
                slot,
            }),
            None => Ok(()),
        }
    }

    fn mark_raw_text_sources(&mut self, sources: &HashSet<SlotId>) {
        for block in self
            .definition
            .sections
            .iter_mut()
            .flat_map(|section| section.blocks.iter_mut())
        {
            let Block {
                questions,
                question_variants,
                ..
            } = block;
            let variants = question_variants.iter_mut().map(|variant| &mut variant.question);
            for question in questions.iter_mut().chain(variants) {
                for answer in question.answers_mut() {
                    if sources.contains(answer.id()) {
                        answer.set_accepts_raw_text(true);
                    }
                }
            }
        }
    }

    /// Get the schema identifier.
    pub fn id(&self) -> &str {
        &self.definition.id
    }

    pub fn title(&self) -> Option<&str> {
        self.definition.title.as_deref()
    }

    /// Get the underlying definition.
    pub fn definition(&self) -> &QuestionnaireDefinition {
        &self.definition
    }

    pub fn sections(&self) -> &[Section] {
        &self.definition.sections
    }

    pub fn section(&self, id: &SectionId) -> Option<&Section> {
        self.definition.sections.get(*self.sections.get(id)?)
    }

    /// Iterate over every block in navigation order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.definition
            .sections
            .iter()
            .flat_map(|section| section.blocks.iter())
    }

    pub fn block(&self, id: &BlockId) -> Option<&Block> {
        self.block_at(*self.blocks.get(id)?)
    }

    fn block_at(&self, p: BlockPosition) -> Option<&Block> {
        self.definition.sections.get(p.section)?.blocks.get(p.block)
    }

    /// Every block's location, in navigation order.
    pub fn locations(&self) -> &[Location] {
        &self.order
    }

    pub fn location(&self, id: &BlockId) -> Option<&Location> {
        self.order.get(self.blocks.get(id)?.order)
    }

    /// Position of a block in navigation order.
    pub fn order_of(&self, id: &BlockId) -> Option<usize> {
        self.blocks.get(id).map(|p| p.order)
    }

    /// The first block of the questionnaire.
    pub fn first_location(&self) -> &Location {
        // Non-empty: checked on load.
        &self.order[0]
    }

    /// The block after this one in navigation order (crossing into the next
    /// section at a section boundary).
    pub fn next_in_sequence(&self, id: &BlockId) -> Option<&Location> {
        self.order.get(self.blocks.get(id)?.order + 1)
    }

    /// The first block of a section.
    pub fn section_start(&self, id: &SectionId) -> Option<&Location> {
        let first = self.section(id)?.blocks.first()?;
        self.location(&first.id)
    }

    /// Look up an answer slot, as declared by the default question where it
    /// appears there.
    pub fn slot(&self, id: &SlotId) -> Option<&AnswerSlot> {
        let p = self.slots.get(id)?;
        self.question_at(p)?.answers().get(p.answer)
    }

    fn question_at(&self, p: &SlotPosition) -> Option<&Question> {
        let block = self.definition.sections.get(p.section)?.blocks.get(p.block)?;
        match p.variant {
            Some(v) => block.question_variants.get(v).map(|variant| &variant.question),
            None => block.questions.get(p.question),
        }
    }

    /// The block a slot belongs to.
    pub fn block_of(&self, slot: &SlotId) -> Option<&Block> {
        let p = self.slots.get(slot)?;
        self.definition.sections.get(p.section)?.blocks.get(p.block)
    }

    /// Look up a calculated rule and the block that declares it.
    pub fn calculation(&self, id: &RuleId) -> Option<(&Block, &CalculatedRule)> {
        let (position, index) = self.rules.get(id)?;
        let block = self.block_at(*position)?;
        Some((block, block.calculations.get(*index)?))
    }
}

fn check_question(question: &Question) -> Result<(), SchemaError> {
    if question.answers().is_empty() {
        return Err(SchemaError::EmptyQuestion(question.id().clone()));
    }
    let exclusive = question
        .answers()
        .iter()
        .filter(|slot| slot.kind().is_exclusive())
        .count();
    if exclusive > 1 {
        return Err(SchemaError::MultipleExclusive(question.id().clone()));
    }
    Ok(())
}

fn duplicate(kind: &'static str, id: &impl ToString) -> SchemaError {
    SchemaError::Duplicate {
        kind,
        id: id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AnswerSlot, ChoiceSlot, NumberSlot, RoutingRule, SlotKind};

    fn radio(id: &str) -> AnswerSlot {
        AnswerSlot::new(id, id, SlotKind::Radio(ChoiceSlot::new(["Yes", "No"])))
    }

    fn household() -> QuestionnaireDefinition {
        QuestionnaireDefinition::new("household")
            .with_section(
                Section::new("people")
                    .with_block(
                        Block::new("over-16")
                            .with_question(
                                Question::new("over-16-question", "Are you over 16?")
                                    .with_answer(radio("over-16-answer")),
                            )
                            .with_route(RoutingRule::when(
                                Predicate::equals("over-16-answer", "No"),
                                Destination::Section("accommodation".into()),
                            )),
                    )
                    .with_block(Block::new("marital-status").with_question(
                        Question::new("marital-status-question", "Marital status")
                            .with_answer(radio("marital-status-answer")),
                    )),
            )
            .with_section(
                Section::new("accommodation").with_block(
                    Block::new("bedrooms").with_question(
                        Question::new("bedrooms-question", "Bedrooms")
                            .with_answer(AnswerSlot::number("bedrooms-answer", "Bedrooms")),
                    ),
                ),
            )
    }

    #[test]
    fn loads_and_indexes() {
        let questionnaire = Questionnaire::from_definition(household()).unwrap();

        assert_eq!(questionnaire.first_location(), &Location::new("people", "over-16"));
        assert_eq!(
            questionnaire.next_in_sequence(&"marital-status".into()),
            Some(&Location::new("accommodation", "bedrooms"))
        );
        assert_eq!(questionnaire.next_in_sequence(&"bedrooms".into()), None);
        assert_eq!(
            questionnaire
                .block_of(&"bedrooms-answer".into())
                .map(|block| block.id.as_str()),
            Some("bedrooms")
        );
        assert_eq!(
            questionnaire.section_start(&"accommodation".into()),
            Some(&Location::new("accommodation", "bedrooms"))
        );
    }

    #[test]
    fn rejects_duplicate_answer_ids() {
        let mut definition = household();
        definition.sections[1].blocks[0].questions[0] =
            Question::new("bedrooms-question", "Bedrooms")
                .with_answer(AnswerSlot::number("over-16-answer", "Bedrooms"));

        let err = Questionnaire::from_definition(definition).unwrap_err();
        assert!(matches!(err, SchemaError::Duplicate { kind: "answer", .. }));
    }

    #[test]
    fn rejects_unknown_slot_in_route() {
        let mut definition = household();
        definition.sections[0].blocks[0].routing = vec![RoutingRule::when(
            Predicate::answered("no-such-answer"),
            Destination::Summary,
        )];

        let err = Questionnaire::from_definition(definition).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownSlot { .. }));
    }

    #[test]
    fn rejects_unknown_destination() {
        let mut definition = household();
        definition.sections[0].blocks[0].routing =
            vec![RoutingRule::always(Destination::Block("nowhere".into()))];

        let err = Questionnaire::from_definition(definition).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownBlock { .. }));
    }

    #[test]
    fn rejects_backward_route() {
        let mut definition = household();
        definition.sections[0].blocks[1].routing =
            vec![RoutingRule::always(Destination::Block("over-16".into()))];

        let err = Questionnaire::from_definition(definition).unwrap_err();
        assert!(matches!(err, SchemaError::BackwardRoute { .. }));
    }

    #[test]
    fn rejects_non_numeric_calculation_source() {
        let mut definition = household();
        definition.sections[1].blocks[0].calculations = vec![CalculatedRule::sum_equals(
            "total",
            ["bedrooms-answer", "over-16-answer"],
            10,
        )];

        let err = Questionnaire::from_definition(definition).unwrap_err();
        assert!(matches!(err, SchemaError::NonNumericSource { .. }));
    }

    #[test]
    fn calculation_sources_take_raw_text() {
        let mut definition = household();
        definition.sections[1].blocks[0].calculations =
            vec![CalculatedRule::sum_equals("total", ["bedrooms-answer"], 10)];

        let questionnaire = Questionnaire::from_definition(definition).unwrap();
        let slot = questionnaire.slot(&"bedrooms-answer".into()).unwrap();
        assert!(slot.accepts_raw_text());
        assert!(
            !questionnaire
                .slot(&"over-16-answer".into())
                .unwrap()
                .accepts_raw_text()
        );
        let (block, rule) = questionnaire.calculation(&"total".into()).unwrap();
        assert_eq!(block.id.as_str(), "bedrooms");
        assert_eq!(rule.target, 10.into());
    }

    #[test]
    fn rejects_two_exclusive_answers() {
        let mut definition = household();
        definition.sections[1].blocks[0].questions[0] =
            Question::new("bedrooms-question", "Bedrooms")
                .with_answer(AnswerSlot::new(
                    "bedrooms-answer",
                    "Bedrooms",
                    SlotKind::Number(NumberSlot::default()),
                ))
                .with_answer(AnswerSlot::exclusive("a", "I prefer not to say"))
                .with_answer(AnswerSlot::exclusive("b", "Don't know"));

        let err = Questionnaire::from_definition(definition).unwrap_err();
        assert!(matches!(err, SchemaError::MultipleExclusive(_)));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            Questionnaire::from_json("{\"id\": 1}"),
            Err(SchemaError::Json(_))
        ));
    }

    fn bedrooms_variant(answer: &str) -> Question {
        Question::new("bedrooms-question", "Bedrooms in the child's home")
            .with_answer(AnswerSlot::number(answer, "Bedrooms"))
    }

    #[test]
    fn indexes_variant_answers() {
        let mut definition = household();
        definition.sections[1].blocks[0] = definition.sections[1].blocks[0]
            .clone()
            .with_question_variant(
                Predicate::equals("over-16-answer", "No"),
                bedrooms_variant("bedrooms-answer").with_answer(AnswerSlot::exclusive(
                    "bedrooms-exclusive-answer",
                    "Don't know",
                )),
            );

        let questionnaire = Questionnaire::from_definition(definition).unwrap();
        assert_eq!(
            questionnaire
                .block_of(&"bedrooms-exclusive-answer".into())
                .map(|block| block.id.as_str()),
            Some("bedrooms")
        );
        assert!(
            questionnaire
                .slot(&"bedrooms-exclusive-answer".into())
                .unwrap()
                .kind()
                .is_exclusive()
        );
    }

    #[test]
    fn rejects_variant_of_unknown_question() {
        let mut definition = household();
        definition.sections[0].blocks[1] = definition.sections[0].blocks[1]
            .clone()
            .with_question_variant(Predicate::answered("over-16-answer"), bedrooms_variant("x"));

        let err = Questionnaire::from_definition(definition).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownVariantQuestion { .. }));
    }

    #[test]
    fn rejects_variant_reusing_another_questions_answer() {
        let mut definition = household();
        definition.sections[1].blocks[0] = definition.sections[1].blocks[0]
            .clone()
            .with_question_variant(
                Predicate::answered("over-16-answer"),
                bedrooms_variant("marital-status-answer"),
            );

        let err = Questionnaire::from_definition(definition).unwrap_err();
        assert!(matches!(err, SchemaError::Duplicate { kind: "answer", .. }));
    }

    #[test]
    fn rejects_unknown_slot_in_variant() {
        let mut definition = household();
        definition.sections[1].blocks[0] = definition.sections[1].blocks[0]
            .clone()
            .with_question_variant(
                Predicate::answered("no-such-answer"),
                bedrooms_variant("bedrooms-answer"),
            );

        let err = Questionnaire::from_definition(definition).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownSlot { .. }));
    }

    #[test]
    fn variant_calculation_sources_take_raw_text() {
        let mut definition = household();
        definition.sections[1].blocks[0] = definition.sections[1].blocks[0]
            .clone()
            .with_question_variant(
                Predicate::answered("over-16-answer"),
                bedrooms_variant("bedrooms-answer"),
            )
            .with_calculation(CalculatedRule::sum_equals("total", ["bedrooms-answer"], 10));

        let questionnaire = Questionnaire::from_definition(definition).unwrap();
        let block = questionnaire.block(&"bedrooms".into()).unwrap();
        let variant = &block.question_variants[0].question;
        assert!(variant.answers()[0].accepts_raw_text());
    }
}
