//! Validation of whole records.

use pds_codec::{Address, CodecError, FlatStore};
use pds_model::{
    Condition, CrossFieldRule, FieldKind, FieldSchema, FormSchema, RegistryRule, ScalarType,
    Screen, Value,
};
use pds_session::FormSession;
use pds_validate::{
    ClassificationRegistry, Issue, RegistryError, Restrictions, StaticRegistry, ValidationError,
    Validator, materialize,
};
use serde_json::json;

fn session(form: &FormSchema, record: serde_json::Value) -> FormSession {
    FormSession::from_record(form, &Value::from(record)).unwrap()
}

fn fields_of(issues: &[Issue]) -> Vec<&str> {
    issues.iter().map(Issue::field).collect()
}

#[test]
fn conditional_fields_are_gated() {
    let form = FormSchema::new("gating")
        .with_global_field("a")
        .with_global_field("details")
        .with_screen(
            Screen::new("general").global().with_field(
                FieldSchema::scalar("details", ScalarType::Text)
                    .required()
                    .with_condition(Condition::equals("a", json!(true))),
            ),
        );
    let validator = Validator::new(&form);

    for record in [
        json!({"a": false, "details": "kept out"}),
        json!({"details": "kept out"}),
    ] {
        let session = session(&form, record);
        let report = validator.validate_session(&session).unwrap();
        assert!(report.is_valid());
        let materialized = materialize(&form, session.store()).unwrap();
        assert!(materialized.as_object().unwrap().get("details").is_none());
    }

    let session = session(&form, json!({"a": true}));
    let report = validator.validate_session(&session).unwrap();
    let result = report.get("general", None).unwrap();
    assert_eq!(fields_of(&result.issues), vec!["details"]);
}

fn shares_form() -> FormSchema {
    FormSchema::new("shares").with_screen(
        Screen::new("shares").with_cross_field(CrossFieldRule::Sum {
            fields: vec!["shares.a".into(), "shares.b".into(), "shares.c".into()],
            target: 100.0,
        }),
    )
}

#[test]
fn percentage_sums_must_reach_the_target() {
    let form = shares_form();
    let validator = Validator::new(&form);

    let balanced = session(
        &form,
        json!({"lots": [{"shares": {"a": 30, "b": 30, "c": 40}}]}),
    );
    assert!(validator.validate_session(&balanced).unwrap().is_valid());

    let short = session(
        &form,
        json!({"lots": [{"shares": {"a": 30, "b": 30, "c": 30}}]}),
    );
    let report = validator.validate_session(&short).unwrap();
    let messages = report.get("shares", Some(0)).unwrap().messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("100"), "{}", messages[0]);
    assert!(messages[0].contains("found 90"), "{}", messages[0]);
}

#[test]
fn fractional_shares_use_a_tolerance() {
    let form = shares_form();
    let validator = Validator::new(&form);
    let record = json!({"lots": [{"shares": {"a": 33.3, "b": 33.3, "c": 33.4}}]});
    assert!(
        validator
            .validate_session(&session(&form, record))
            .unwrap()
            .is_valid()
    );
}

#[test]
fn hidden_operands_do_not_count_towards_sums() {
    let form = FormSchema::new("shares").with_screen(
        Screen::new("shares")
            .with_field(FieldSchema::scalar("hasC", ScalarType::Boolean))
            .with_field(
                FieldSchema::scalar("shares.c", ScalarType::Number)
                    .with_condition(Condition::equals("lots.{lot}.hasC", json!(true))),
            )
            .with_cross_field(CrossFieldRule::Sum {
                fields: vec!["shares.a".into(), "shares.b".into(), "shares.c".into()],
                target: 100.0,
            }),
    );
    let validator = Validator::new(&form);
    let record = json!({
        "lots": [
            {"hasC": false, "shares": {"a": 50, "b": 50, "c": 40}},
            {"hasC": true, "shares": {"a": 50, "b": 50, "c": 40}}
        ]
    });
    let session = session(&form, record.clone());

    let report = validator.validate_session(&session).unwrap();
    assert!(report.get("shares", Some(0)).unwrap().is_valid());
    let messages = report.get("shares", Some(1)).unwrap().messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("found 140"), "{}", messages[0]);

    // The unpruned record still carries the hidden value.
    let result = validator
        .validate_screen("shares", &Value::from(record), session.store(), Some(0))
        .unwrap();
    assert!(result.is_valid(), "{:?}", result.messages());
}

fn timeline_form() -> FormSchema {
    FormSchema::new("timeline").with_screen(Screen::new("timeline").with_cross_field(
        CrossFieldRule::DateOrder {
            start: "start".into(),
            end: "end".into(),
        },
    ))
}

#[test]
fn end_date_may_not_precede_start_date() {
    let form = timeline_form();
    let validator = Validator::new(&form);

    let inverted = session(
        &form,
        json!({"lots": [{"start": "2024-01-10", "end": "2024-01-05"}]}),
    );
    let report = validator.validate_session(&inverted).unwrap();
    let messages = report.get("timeline", Some(0)).unwrap().messages();
    assert_eq!(
        messages,
        vec!["end (2024-01-05) is before start (2024-01-10)"]
    );

    let ordered = session(
        &form,
        json!({"lots": [{"start": "2024-01-05", "end": "2024-01-10"}]}),
    );
    assert!(validator.validate_session(&ordered).unwrap().is_valid());
}

#[test]
fn unreadable_dates_are_reported_not_compared() {
    let form = timeline_form();
    let validator = Validator::new(&form);
    let record = json!({"lots": [{"start": "next week", "end": "2024-01-10"}]});
    let report = validator.validate_session(&session(&form, record)).unwrap();
    let issues = &report.get("timeline", Some(0)).unwrap().issues;
    assert_eq!(
        issues,
        &vec![Issue::InvalidDate {
            field: "start".into(),
            value: "next week".into(),
        }]
    );
}

fn award_form() -> FormSchema {
    FormSchema::new("award").with_screen(
        Screen::new("award")
            .with_field(
                FieldSchema::scalar("title", ScalarType::Text)
                    .with_label("Title")
                    .required(),
            )
            .with_field(
                FieldSchema::new(
                    "criteria",
                    FieldKind::ArrayOfObject {
                        fields: vec![
                            FieldSchema::new(
                                "category",
                                FieldKind::Choice {
                                    options: vec!["price".into(), "quality".into()],
                                    multiple: false,
                                },
                            )
                            .required(),
                            FieldSchema::scalar("weight", ScalarType::Number).required(),
                        ],
                        min: Some(2),
                        max: Some(3),
                    },
                )
                .with_label("Award criteria"),
            )
            .with_field(
                FieldSchema::scalar("notes", ScalarType::Text)
                    .required()
                    .with_condition(Condition::truthy("lots.{lot}.hasNotes")),
            )
            .with_cross_field(CrossFieldRule::DateOrder {
                start: "timeline.start".into(),
                end: "timeline.end".into(),
            })
            .with_cross_field(CrossFieldRule::Sum {
                fields: vec!["shares.a".into(), "shares.b".into(), "shares.c".into()],
                target: 100.0,
            })
            .with_cross_field(CrossFieldRule::ArraySum {
                array: "criteria".into(),
                key: "weight".into(),
                target: 100.0,
            })
            .with_registry(RegistryRule::new("cpv", "criteria")),
    )
}

fn works_registry() -> StaticRegistry {
    StaticRegistry::new().with(
        "45000000",
        Restrictions {
            forbids_sole_criterion: true,
            requires_criterion_categories: vec!["quality".into()],
        },
    )
}

fn broken_award() -> serde_json::Value {
    json!({
        "lots": [{
            "name": "General",
            "criteria": [{"category": "price", "weight": 60}],
            "timeline": {"start": "2024-01-10", "end": "2024-01-05"},
            "shares": {"a": 30, "b": 30, "c": 30},
            "cpv": ["45000000"]
        }]
    })
}

#[test]
fn every_phase_reports_in_order() {
    let form = award_form();
    let registry = works_registry();
    let validator = Validator::new(&form).with_registry(&registry);
    let report = validator
        .validate_session(&session(&form, broken_award()))
        .unwrap();

    assert_eq!(report.issue_count(), 7);
    let phases: Vec<_> = report.results[0].issues.iter().map(Issue::phase).collect();
    let mut sorted = phases.clone();
    sorted.sort();
    assert_eq!(phases, sorted);

    insta::assert_snapshot!(report.messages().join("\n"), @r"
    award [lot 0]: Title (title) is required
    award [lot 0]: Award criteria (criteria) needs at least 2 entries (found 1)
    award [lot 0]: timeline.end (2024-01-05) is before timeline.start (2024-01-10)
    award [lot 0]: shares.a + shares.b + shares.c must add up to 100 (found 90)
    award [lot 0]: weight across criteria must add up to 100 (found 60)
    award [lot 0]: Classification code 45000000 does not allow 'price' as the only award criterion
    award [lot 0]: Classification code 45000000 requires an award criterion of category 'quality'
    ");
}

#[test]
fn array_children_are_checked_per_entry() {
    let form = award_form();
    let validator = Validator::new(&form);
    let record = json!({
        "lots": [{
            "title": "Roads",
            "criteria": [{"category": "price", "weight": 50}, {}, {"category": "quality", "weight": 50}]
        }]
    });
    let report = validator.validate_session(&session(&form, record)).unwrap();
    let issues = &report.get("award", Some(0)).unwrap().issues;
    assert_eq!(
        fields_of(issues),
        vec!["criteria.1.category", "criteria.1.weight"]
    );
}

#[test]
fn too_many_entries_name_the_maximum() {
    let form = award_form();
    let validator = Validator::new(&form);
    let criterion = json!({"category": "quality", "weight": 25});
    let record = json!({
        "lots": [{"title": "Roads", "criteria": [criterion, criterion, criterion, criterion]}]
    });
    let report = validator.validate_session(&session(&form, record)).unwrap();
    assert_eq!(
        report.get("award", Some(0)).unwrap().issues,
        vec![Issue::TooManyEntries {
            field: "criteria".into(),
            label: "Award criteria".into(),
            max: 3,
            found: 4,
        }]
    );
}

struct UnreachableRegistry;

impl ClassificationRegistry for UnreachableRegistry {
    fn lookup_restrictions(&self, code: &str) -> Result<Option<Restrictions>, RegistryError> {
        Err(RegistryError::Unavailable {
            code: code.to_string(),
            reason: "connection timed out".into(),
        })
    }
}

#[test]
fn unreachable_registry_fails_open() {
    let form = award_form();
    let validator = Validator::new(&form).with_registry(&UnreachableRegistry);
    let report = validator
        .validate_session(&session(&form, broken_award()))
        .unwrap();
    let issues = &report.get("award", Some(0)).unwrap().issues;
    assert_eq!(issues.len(), 5);
    assert!(
        issues
            .iter()
            .all(|issue| issue.phase() != pds_validate::Phase::Registry)
    );
}

fn order_form() -> FormSchema {
    FormSchema::new("declaration")
        .with_global_field("buyer")
        .with_screen(
            Screen::new("buyer")
                .global()
                .with_field(FieldSchema::scalar("buyer.name", ScalarType::Text).required()),
        )
        .with_screen(
            Screen::new("order").with_field(
                FieldSchema::scalar("orderType.estimatedValue", ScalarType::Number)
                    .required()
                    .with_condition(Condition::equals(
                        "lots.{lot}.orderType.hasValue",
                        json!(true),
                    )),
            ),
        )
}

#[test]
fn two_lot_record_reports_only_the_incomplete_lot() {
    let form = order_form();
    let record = json!({
        "buyer": {"name": "City of Ghent"},
        "lots": [
            {"name": "Roads", "orderType": {"hasValue": true, "estimatedValue": 1000}},
            {"name": "Bridges", "orderType": {"hasValue": true}}
        ]
    });
    let report = Validator::new(&form)
        .validate_session(&session(&form, record))
        .unwrap();

    assert_eq!(report.issue_count(), 1);
    let failing: Vec<_> = report.failing().collect();
    assert_eq!(failing.len(), 1);
    assert_eq!(failing[0].screen_id, "order");
    assert_eq!(failing[0].lot, Some(1));
    assert_eq!(
        fields_of(&failing[0].issues),
        vec!["orderType.estimatedValue"]
    );
    assert!(report.get("buyer", None).unwrap().is_valid());
    assert!(report.get("order", Some(0)).unwrap().is_valid());
}

#[test]
fn lot_removal_keeps_relative_conditions_and_leaves_absolute_ones() {
    let form = FormSchema::new("renumbering").with_screen(
        Screen::new("order")
            .with_field(
                FieldSchema::scalar("estimatedValue", ScalarType::Number)
                    .required()
                    .with_condition(Condition::equals("lots.{lot}.hasValue", json!(true))),
            )
            .with_field(
                FieldSchema::scalar("note", ScalarType::Text)
                    .required()
                    .with_condition(Condition::equals("lots.2.hasValue", json!(true))),
            ),
    );
    let validator = Validator::new(&form);
    let mut session = session(
        &form,
        json!({
            "lots": [
                {"name": "A", "hasValue": false},
                {"name": "B", "hasValue": false},
                {"name": "C", "hasValue": true}
            ]
        }),
    );

    let before = validator.validate_session(&session).unwrap();
    assert_eq!(
        fields_of(&before.get("order", Some(0)).unwrap().issues),
        vec!["note"]
    );
    assert_eq!(
        fields_of(&before.get("order", Some(2)).unwrap().issues),
        vec!["estimatedValue", "note"]
    );

    session.remove_lot(1).unwrap();
    let after = validator.validate_session(&session).unwrap();
    assert_eq!(after.results.len(), 2);
    assert!(after.get("order", Some(0)).unwrap().is_valid());
    assert_eq!(
        fields_of(&after.get("order", Some(1)).unwrap().issues),
        vec!["estimatedValue"]
    );
    assert!(after.get("order", Some(2)).is_none());
}

#[test]
fn structural_conflicts_abort_validation() {
    let form = award_form();
    let store: FlatStore = [
        ("lots.0.name", Value::from("General")),
        ("lots.0.criteria.0.weight", Value::from(50_i64)),
        ("lots.0.criteria.weight", Value::from(50_i64)),
    ]
    .into_iter()
    .map(|(address, value)| (Address::parse(address).unwrap(), value))
    .collect();
    let result = Validator::new(&form).validate_all(&Value::empty_object(), &store);
    let error = result.unwrap_err();
    assert!(matches!(
        error,
        ValidationError::Codec(CodecError::StructuralConflict { .. })
    ));
    assert!(error.user_message().contains("lots.0.criteria"));
}

#[test]
fn conflicting_condition_references_abort_validation() {
    let form = FormSchema::new("gating")
        .with_global_field("a")
        .with_global_field("d")
        .with_screen(
            Screen::new("g").global().with_field(
                FieldSchema::scalar("d", ScalarType::Text)
                    .required()
                    .with_condition(Condition::truthy("a")),
            ),
        );
    let store: FlatStore = [
        ("a.0", Value::from("x")),
        ("a.k", Value::from("y")),
        ("d", Value::from("z")),
    ]
    .into_iter()
    .map(|(address, value)| (Address::parse(address).unwrap(), value))
    .collect();

    let result = Validator::new(&form).validate_screen("g", &Value::empty_object(), &store, None);
    assert!(matches!(
        result,
        Err(ValidationError::Codec(CodecError::StructuralConflict { .. }))
    ));
}

#[test]
fn lots_beyond_the_record_are_fatal() {
    let form = order_form();
    let session = session(
        &form,
        json!({"buyer": {"name": "City"}, "lots": [{"name": "Roads"}]}),
    );
    let validator = Validator::new(&form);
    let record = Value::empty_object();

    let result = validator.validate_screen("order", &record, session.store(), Some(3));
    assert!(matches!(
        result,
        Err(ValidationError::LotOutOfRange { lot: 3, count: 1 })
    ));
    assert!(
        validator
            .validate_screen("order", &record, session.store(), Some(0))
            .is_ok()
    );
    // Global screens ignore the lot.
    let buyer = validator
        .validate_screen("buyer", &record, session.store(), Some(3))
        .unwrap();
    assert_eq!(buyer.lot, None);
}

#[test]
fn unknown_screens_are_fatal() {
    let form = award_form();
    let result = Validator::new(&form).validate_screen(
        "missing",
        &Value::empty_object(),
        &FlatStore::new(),
        None,
    );
    assert!(matches!(result, Err(ValidationError::UnknownScreen { .. })));
}
