use coauthor_core::{
    reconcile, DocumentMode, EditInstruction, EditKind, InstructionEffect, Provenance,
    ReconcileContext, Section,
};

fn ctx() -> ReconcileContext {
    ReconcileContext::new(2_000)
}

fn document() -> Vec<Section> {
    vec![
        Section::with_id("lead", "Launch plan", "Ship the beta in May.", Provenance::User, 1),
        Section::with_id("goals", "Goals", "Grow signups.", Provenance::Agent, 1),
    ]
}

fn append(title: &str, content: &str) -> EditInstruction {
    EditInstruction::new(EditKind::AppendToSection)
        .with_title(title)
        .with_content(content)
}

#[test]
fn empty_batch_leaves_document_untouched() {
    let sections = document();
    let outcome = reconcile(&sections, DocumentMode::Code, &[], &ctx());
    assert!(!outcome.changed);
    assert_eq!(outcome.sections, sections);
    assert_eq!(outcome.mode, DocumentMode::Code);
    assert!(outcome.effects.is_empty());
}

#[test]
fn appending_already_contained_content_is_a_no_op() {
    let sections = document();
    let outcome = reconcile(
        &sections,
        DocumentMode::FreeText,
        &[append("Goals", "  Grow   signups. ")],
        &ctx(),
    );
    assert!(!outcome.changed);
    assert_eq!(outcome.effects, vec![InstructionEffect::Unchanged]);
    assert_eq!(outcome.sections[1].content, "Grow signups.");
    assert_eq!(outcome.sections[1].updated_at, 1);
}

#[test]
fn appending_new_plain_text_drops_repeated_lines() {
    let mut sections = document();
    sections[1].content = "Grow signups.\nKeep NPS high.".to_string();
    let outcome = reconcile(
        &sections,
        DocumentMode::FreeText,
        &[append("goals", "Keep NPS high.\nCut churn.")],
        &ctx(),
    );
    assert!(outcome.changed);
    assert_eq!(
        outcome.sections[1].content,
        "Grow signups.\nKeep NPS high.\n\nCut churn."
    );
    assert_eq!(outcome.sections[1].updated_at, 2_000);
}

/// Containment is a heuristic: a short, genuinely new remark that happens to
/// be a substring of the old text is dropped, and a longer restatement
/// replaces the old text outright.
#[test]
fn containment_heuristic_can_swallow_or_replace_content() {
    let swallowed = reconcile(
        &document(),
        DocumentMode::FreeText,
        &[append("Goals", "signups")],
        &ctx(),
    );
    assert_eq!(swallowed.effects, vec![InstructionEffect::Unchanged]);

    let replaced = reconcile(
        &document(),
        DocumentMode::FreeText,
        &[append("Goals", "Grow signups. Also keep costs flat.")],
        &ctx(),
    );
    assert_eq!(
        replaced.sections[1].content,
        "Grow signups. Also keep costs flat."
    );
}

#[test]
fn unsafe_markup_is_stripped_before_it_lands() {
    let outcome = reconcile(
        &document(),
        DocumentMode::FreeText,
        &[EditInstruction::new(EditKind::ReplaceSection)
            .with_section_id("goals")
            .with_content(
                r#"<p onclick="steal()">hello</p><script>alert(1)</script><a href=" JavaScript:run()">link</a>"#,
            )],
        &ctx(),
    );
    let content = &outcome.sections[1].content;
    assert!(content.contains("hello"));
    assert!(!content.to_lowercase().contains("<script"));
    assert!(!content.to_lowercase().contains("javascript:"));
    assert!(!content.contains("onclick"));
}

#[test]
fn title_resolution_ignores_surrounding_whitespace() {
    let outcome = reconcile(
        &document(),
        DocumentMode::FreeText,
        &[EditInstruction::new(EditKind::ReplaceSection)
            .with_title("  Goals  ")
            .with_content("Reach 10k users.")],
        &ctx(),
    );
    assert_eq!(
        outcome.effects,
        vec![InstructionEffect::Updated("goals".to_string())]
    );
    assert_eq!(outcome.sections.len(), 2);
    assert_eq!(outcome.sections[1].content, "Reach 10k users.");
}

#[test]
fn exact_id_wins_over_title() {
    let outcome = reconcile(
        &document(),
        DocumentMode::FreeText,
        &[EditInstruction::new(EditKind::ReplaceSection)
            .with_section_id("lead")
            .with_title("Goals")
            .with_content("Ship in June.")],
        &ctx(),
    );
    assert_eq!(outcome.sections[0].content, "Ship in June.");
    assert_eq!(outcome.sections[1].content, "Grow signups.");
}

#[test]
fn create_naming_an_existing_id_only_fills_empty_sections() {
    let mut sections = document();
    sections.push(Section::with_id("risks", "Risks", "", Provenance::User, 1));
    let outcome = reconcile(
        &sections,
        DocumentMode::FreeText,
        &[
            EditInstruction::create("Risk log", "Hiring").with_section_id("risks"),
            EditInstruction::create("Other goals", "Overwrite").with_section_id("goals"),
        ],
        &ctx(),
    );
    assert_eq!(outcome.sections.len(), 3);
    assert_eq!(outcome.sections[2].title, "Risks");
    assert_eq!(outcome.sections[2].content, "Hiring");
    assert_eq!(outcome.sections[1].content, "Grow signups.");
    assert_eq!(
        outcome.effects,
        vec![
            InstructionEffect::Updated("risks".to_string()),
            InstructionEffect::Unchanged
        ]
    );
}

#[test]
fn sections_created_in_one_batch_get_distinct_ids() {
    let outcome = reconcile(
        &document(),
        DocumentMode::FreeText,
        &[
            EditInstruction::create("Budget", "$5k").with_section_id("budget"),
            EditInstruction::create("Timeline", "Q3"),
            EditInstruction::create("Owners", "Ana"),
        ],
        &ctx(),
    );
    let mut ids: Vec<&str> = outcome.sections.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids[2], "budget");
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 5);
}

#[test]
fn provenance_churn_alone_is_not_a_change() {
    let mut sections = document();
    sections[0].provenance = Provenance::Pinned;
    let outcome = reconcile(
        &sections,
        DocumentMode::FreeText,
        &[EditInstruction::new(EditKind::ReplaceSection)
            .with_section_id("lead")
            .with_content("Ship the beta in May.")],
        &ctx(),
    );
    assert!(!outcome.changed);
    assert_eq!(outcome.sections[0].provenance, Provenance::Pinned);
}

#[test]
fn swot_scenario_creates_table_section_and_switches_mode() {
    let table = "| role | goal |\n| --- | --- |\n| S | fast shipping |";
    let outcome = reconcile(
        &[],
        DocumentMode::FreeText,
        &[
            EditInstruction::create("SWOT", table),
            EditInstruction::switch_mode(DocumentMode::Tabular),
        ],
        &ctx(),
    );
    assert!(outcome.changed);
    assert_eq!(outcome.mode, DocumentMode::Tabular);
    assert_eq!(outcome.sections.len(), 1);
    assert_eq!(outcome.sections[0].title, "SWOT");
    assert_eq!(outcome.sections[0].content, table);
    assert_eq!(outcome.sections[0].provenance, Provenance::Agent);
    assert_eq!(
        outcome.effects[1],
        InstructionEffect::ModeSwitched(DocumentMode::Tabular)
    );
}

#[test]
fn input_slice_is_never_mutated() {
    let sections = document();
    let before = sections.clone();
    let _ = reconcile(
        &sections,
        DocumentMode::FreeText,
        &[EditInstruction::new(EditKind::ClearSection).with_section_id("goals")],
        &ctx(),
    );
    assert_eq!(sections, before);
}

#[test]
fn repeated_replaces_walk_through_sections_sharing_a_title() {
    let sections = vec![
        Section::with_id("a", "Ideas", "one", Provenance::User, 1),
        Section::with_id("b", "Ideas", "two", Provenance::User, 1),
    ];
    let replace = |content: &str| {
        EditInstruction::new(EditKind::ReplaceSection)
            .with_title("Ideas")
            .with_content(content)
    };

    let outcome = reconcile(
        &sections,
        DocumentMode::FreeText,
        &[replace("X"), replace("Y")],
        &ctx(),
    );

    let contents: Vec<(&str, &str)> = outcome
        .sections
        .iter()
        .map(|section| (section.id.as_str(), section.content.as_str()))
        .collect();
    assert_eq!(contents, vec![("a", "X"), ("b", "Y")]);
    assert_eq!(
        outcome.effects,
        vec![
            InstructionEffect::Updated("a".to_string()),
            InstructionEffect::Updated("b".to_string()),
        ]
    );
}
