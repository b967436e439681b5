#![forbid(unsafe_code)]

use birdfix::core::{Error, Phase, RepairConfig};
use birdfix::graph::classify::{is_identifier_shape, numeric_suffix};
use birdfix::repair::{analyze_document, repair_document, PassOutcome, RepairContext};
use birdfix::xml::Document;
use std::collections::HashMap;
use std::io::Write;

const BROKEN_REPORT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<SASReport xmlns="http://www.sas.com/sasreportmodel/bird-4.1.4" nextUniqueNameIndex="20">
  <DataDefinitions>
    <ParentDataDefinition name="dd1" dataSource="ds1">
      <DataItem name="di1" expression="sum(ds1)"/>
      <DataItem name="di1"/>
    </ParentDataDefinition>
  </DataDefinitions>
  <DataSources>
    <DataSource name="ds1" label="Sales"/>
  </DataSources>
  <PromptDefinitions>
    <Prompt name="pr1" dataItem="di1"/>
    <Prompt name="pr2"/>
  </PromptDefinitions>
  <VisualElements>
    <Graph name="ve1" data="dd1 xy42" filter="pr1">
      <Expr>${zz7,raw} and di1</Expr>
    </Graph>
  </VisualElements>
</SASReport>
"#;

const CLEAN_REPORT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<SASReport nextUniqueNameIndex="3">
  <DataSource name="ds1"/>
  <DataItem name="di1" source="ds1"/>
  <Prompt name="pr1"/>
  <Filter prompt="pr1">di1 &gt; 5</Filter>
</SASReport>
"#;

fn repair(xml: &str) -> birdfix::repair::RepairOutcome {
    repair_document(xml, &RepairContext::default()).unwrap()
}

// ── Concrete scenarios ───────────────────────────────────────────────

#[test]
fn test_duplicate_renamed_with_counter() {
    let outcome =
        repair(r#"<Root name="a" nextUniqueNameIndex="5"><A name="vi1"/><A name="vi1"/></Root>"#);
    assert!(outcome.flags.has_duplicates);
    assert_eq!(outcome.counts.duplicates, 1);
    assert_eq!(
        outcome.repaired_document,
        r#"<Root name="a" nextUniqueNameIndex="6"><A name="vi1"/><A name="vi5"/></Root>"#
    );
}

#[test]
fn test_dangling_value_removed() {
    let outcome = repair(r#"<Root><Property value="xy99"/></Root>"#);
    assert_eq!(outcome.counts.null_candidates, 1);
    assert!(outcome.flags.has_null_candidates);
    assert!(outcome
        .analysis_report
        .contains("  xy99: Referenced but not defined"));
    assert_eq!(outcome.repaired_document, "<Root><Property/></Root>");
}

#[test]
fn test_unused_prompt_removed() {
    let outcome = repair(r#"<Root><Prompt name="pr100"/></Root>"#);
    assert_eq!(outcome.counts.unused_prompts, 1);
    assert!(outcome.flags.has_unused_prompts);
    assert_eq!(outcome.repaired_document, "<Root/>");
}

#[test]
fn test_three_letter_prefix_not_reported() {
    let outcome = repair(r#"<Root><Property value="abc123"/></Root>"#);
    assert_eq!(outcome.counts.null_candidates, 0);
    assert!(!outcome.flags.has_null_candidates);
    assert_eq!(
        outcome.repaired_document,
        r#"<Root><Property value="abc123"/></Root>"#
    );
}

#[test]
fn test_color_code_not_reported() {
    let outcome = repair(r#"<Root><Property value="aabbcc"/><Style value="ab1234"/></Root>"#);
    assert_eq!(outcome.counts.null_candidates, 0);
    assert!(!outcome.changed());
}

// ── Properties ───────────────────────────────────────────────────────

#[test]
fn test_broken_report_counts() {
    let outcome = repair(BROKEN_REPORT);
    assert_eq!(outcome.counts.duplicates, 1);
    assert_eq!(outcome.counts.null_candidates, 2);
    assert_eq!(outcome.counts.unused_prompts, 1);
    assert!(outcome.flags.has_duplicates);
    assert!(outcome.flags.has_null_candidates);
    assert!(outcome.flags.has_unused_prompts);
    assert!(outcome.analysis_report.contains("Total Objects: 13"));
    assert!(outcome.analysis_report.contains("  DataItem: 2"));
    assert!(outcome.analysis_report.contains("  xy42: Referenced but not defined"));
    assert!(outcome.analysis_report.contains("  zz7: Referenced but not defined"));

    let repaired = &outcome.repaired_document;
    assert!(repaired.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
    assert!(repaired.contains(r#"nextUniqueNameIndex="21""#));
    assert!(repaired.contains(r#"<DataItem name="di20"/>"#));
    assert!(repaired.contains(r#"<Prompt name="pr1" dataItem="di20"/>"#));
    assert!(repaired.contains(r#"data="dd1""#));
    assert!(repaired.contains("<Expr>and di20</Expr>"));
    assert!(!repaired.contains("pr2"));
}

#[test]
fn test_repair_is_idempotent() {
    let first = repair(BROKEN_REPORT);
    let second = repair(&first.repaired_document);
    assert!(!second.changed());
    assert!(!second.flags.has_duplicates);
    assert!(!second.flags.has_null_candidates);
    assert!(!second.flags.has_unused_prompts);
    assert_eq!(second.repaired_document, first.repaired_document);
}

#[test]
fn test_clean_input_unchanged() {
    let outcome = repair(CLEAN_REPORT);
    assert_eq!(outcome.counts.duplicates, 0);
    assert_eq!(outcome.counts.null_candidates, 0);
    assert_eq!(outcome.counts.unused_prompts, 0);
    assert!(!outcome.changed());
    assert!(outcome.analysis_report.contains("No obvious issues detected"));
    assert_eq!(outcome.repaired_document, CLEAN_REPORT);
}

#[test]
fn test_names_unique_and_counter_above_suffixes() {
    let xml = r#"<R nextUniqueNameIndex="2">
        <A name="vi9"/><A name="vi9"/><B name="vi9"/>
        <C name="ve3"/><C name="ve3"/>
        <Ref target="vi9 ve3"/>
    </R>"#;
    let outcome = repair(xml);
    let doc = Document::parse(&outcome.repaired_document).unwrap();

    let mut seen: HashMap<String, usize> = HashMap::new();
    for (_, element) in doc.elements() {
        if let Some(name) = element.attribute("name").filter(|n| is_identifier_shape(n)) {
            *seen.entry(name.to_owned()).or_insert(0) += 1;
        }
    }
    assert!(seen.values().all(|&n| n == 1), "duplicate names left: {seen:?}");

    let counter: u64 = doc
        .root_attribute("nextUniqueNameIndex")
        .unwrap()
        .parse()
        .unwrap();
    let max_suffix = seen.keys().filter_map(|n| numeric_suffix(n)).max().unwrap();
    assert!(counter > max_suffix);
}

#[test]
fn test_null_candidates_eliminated() {
    let xml = r#"<R>
        <DataItem name="di1"/>
        <Graph data="di1 ab77 cd88" filter="${ef99}">see ${ab77,x}, cd88 and di1</Graph>
        <Label text="gh12"/>
        <Note>(gh12)</Note>
    </R>"#;
    let outcome = repair(xml);
    // attribute values are matched by whole token, so `${ef99}` is no reference
    assert_eq!(outcome.counts.null_candidates, 3);
    let after = analyze_document(&outcome.repaired_document, &RepairConfig::default()).unwrap();
    assert!(after.null_candidate_ids.is_empty());
    assert!(after.defined_ids.contains("di1"));
    let repaired = &outcome.repaired_document;
    assert!(repaired.contains(r#"<Graph data="di1" filter="${ef99}">see , and di1</Graph>"#));
    assert!(repaired.contains("<Label/>"));
    assert!(repaired.contains("<Note>()</Note>"));
}

#[test]
fn test_unused_prompt_removal_exact() {
    let xml = r#"<R>
        <Prompt name="pr1"/>
        <Prompt name="pr2"/>
        <Prompt name="pr3"/>
        <Use prompt="pr2"/>
        <Expr>where pr3 = 1</Expr>
    </R>"#;
    let before = analyze_document(xml, &RepairConfig::default()).unwrap();
    let outcome = repair(xml);
    let after = Document::parse(&outcome.repaired_document).unwrap();
    let declared: Vec<&str> = after
        .elements()
        .filter_map(|(_, e)| e.attribute("name"))
        .collect();

    for id in &before.unused_prompt_ids {
        assert!(!declared.contains(&id.as_str()), "{id} still declared");
    }
    for id in before.defined_ids.difference(&before.unused_prompt_ids) {
        assert!(declared.contains(&id.as_str()), "{id} was removed");
    }
    assert_eq!(declared, vec!["pr2", "pr3"]);
}

#[test]
fn test_cap_reached_is_reported() {
    let mut ctx = RepairContext::default();
    ctx.config.max_null_iterations = 1;
    let outcome = repair_document(r#"<R><T>a xy${zz1}99 b</T></R>"#, &ctx).unwrap();
    assert!(outcome.null_cap_reached());
    assert_eq!(outcome.counts.null_candidates, 1);
}

#[test]
fn test_only_selected_pass_runs() {
    let mut ctx = RepairContext::default().with_no_passes();
    ctx.remove_unused_prompts = true;
    let outcome = repair_document(
        r#"<R><Prompt name="pr1"/><A name="vi1"/><A name="vi1"/><B ref="xy99"/></R>"#,
        &ctx,
    )
    .unwrap();
    assert_eq!(outcome.passes.len(), 1);
    assert!(matches!(outcome.passes[0], PassOutcome::UnusedPrompts { removed: 1, .. }));
    assert_eq!(
        outcome.repaired_document,
        r#"<R><A name="vi1"/><A name="vi1"/><B ref="xy99"/></R>"#
    );
    // counts describe the input, whatever was repaired
    assert_eq!(outcome.counts.duplicates, 1);
    assert_eq!(outcome.counts.null_candidates, 1);
}

#[test]
fn test_outcome_json_shape() {
    let outcome = repair(r#"<Root><Prompt name="pr100"/></Root>"#);
    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["counts"]["unusedPrompts"], 1);
    assert_eq!(json["flags"]["hasUnusedPrompts"], true);
    assert_eq!(json["repairedDocument"], "<Root/>");
    assert_eq!(json["passes"][2]["pass"], "unused-prompts");
}

#[test]
fn test_malformed_input_fails_without_output() {
    let err = repair_document("<Root><A></Root>", &RepairContext::default()).unwrap_err();
    assert!(matches!(err, Error::XmlParse(_)));
}

#[test]
fn test_root_prompt_does_not_fail_request() {
    let outcome = repair(r#"<Prompt name="pr1"/>"#);
    assert_eq!(outcome.counts.unused_prompts, 1);
    assert_eq!(outcome.repaired_document, r#"<Prompt name="pr1"/>"#);
}

#[test]
fn test_exhausted_counter_fails_in_duplicates_phase() {
    let err = repair_document(
        r#"<R nextUniqueNameIndex="18446744073709551615"><A name="vi1"/><A name="vi1"/></R>"#,
        &RepairContext::default(),
    )
    .unwrap_err();
    assert_eq!(err.phase(), Some(Phase::Duplicates));
}

#[test]
fn test_cdata_survives_repair() {
    let xml = r#"<R><DataItem name="di1"/><Expr><![CDATA[if (di1 < 5 && xy99) then 1]]></Expr><Note><![CDATA[a < b & c]]></Note></R>"#;
    let outcome = repair(xml);
    assert_eq!(outcome.counts.null_candidates, 1);
    assert_eq!(
        outcome.repaired_document,
        r#"<R><DataItem name="di1"/><Expr><![CDATA[if (di1 < 5 && ) then 1]]></Expr><Note><![CDATA[a < b & c]]></Note></R>"#
    );
}

#[test]
fn test_config_file_replaces_literals() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "false_positive_literals = [\"xy99\"]").unwrap();
    let config = RepairConfig::from_file(file.path()).unwrap();
    let outcome = repair_document(
        r#"<Root><Property value="xy99"/></Root>"#,
        &RepairContext::new(config),
    )
    .unwrap();
    assert_eq!(outcome.counts.null_candidates, 0);
    assert_eq!(
        outcome.repaired_document,
        r#"<Root><Property value="xy99"/></Root>"#
    );
}
