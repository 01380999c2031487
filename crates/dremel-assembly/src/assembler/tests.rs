use super::*;
use crate::{Cell, Node};
use dremel_schema::{Mode, Schema, SchemaError, SchemaNode};
use facet_testhelpers::test;
use serde_json::{Value, json};

fn setup(children: Vec<SchemaNode>) -> (Schema, TransitionTable) {
    let schema = Schema::new("root", children).unwrap();
    let table = TransitionTable::build(schema.fields()).unwrap();
    (schema, table)
}

fn store<V>(columns: Vec<(&str, Vec<Cell<V>>)>) -> ColumnStore<V> {
    columns
        .into_iter()
        .map(|(path, cells)| (FieldPath::parse(path), cells))
        .collect()
}

fn json_records(records: &[RecordTree<Value>]) -> Vec<Value> {
    records.iter().map(RecordTree::to_json).collect()
}

fn document() -> Schema {
    Schema::new(
        "Document",
        vec![
            SchemaNode::required("DocId"),
            SchemaNode::group(
                "Links",
                Mode::Optional,
                vec![SchemaNode::repeated("Backward"), SchemaNode::repeated("Forward")],
            ),
            SchemaNode::group(
                "Name",
                Mode::Repeated,
                vec![
                    SchemaNode::group(
                        "Language",
                        Mode::Repeated,
                        vec![SchemaNode::required("Code"), SchemaNode::optional("Country")],
                    ),
                    SchemaNode::optional("Url"),
                ],
            ),
        ],
    )
    .unwrap()
}

fn cell(value: impl Into<Value>, r: u8, d: u8) -> Cell<Value> {
    Cell::new(Some(value.into()), r, d)
}

/// The two striped `Document` records of the Dremel paper.
fn document_columns() -> ColumnStore<Value> {
    store(vec![
        ("DocId", vec![cell(10, 0, 0), cell(20, 0, 0)]),
        (
            "Links.Backward",
            vec![Cell::null(0, 1), cell(10, 0, 2), cell(30, 1, 2)],
        ),
        (
            "Links.Forward",
            vec![cell(20, 0, 2), cell(40, 1, 2), cell(60, 1, 2), cell(80, 0, 2)],
        ),
        (
            "Name.Language.Code",
            vec![
                cell("en-us", 0, 2),
                cell("en", 2, 2),
                Cell::null(1, 1),
                cell("en-gb", 1, 2),
                Cell::null(0, 1),
            ],
        ),
        (
            "Name.Language.Country",
            vec![
                cell("us", 0, 3),
                Cell::null(2, 2),
                Cell::null(1, 1),
                cell("gb", 1, 3),
                Cell::null(0, 1),
            ],
        ),
        (
            "Name.Url",
            vec![
                cell("http://A", 0, 2),
                cell("http://B", 1, 2),
                Cell::null(1, 1),
                cell("http://C", 0, 2),
            ],
        ),
    ])
}

#[test]
fn test_flat_record() {
    let (schema, table) = setup(vec![SchemaNode::required("name")]);
    let columns = store(vec![("name", vec![Cell::value("alice", 0)])]);

    let records = assemble_all(schema.fields(), &table, &columns, AssemblyOptions::new()).unwrap();
    assert_eq!(records.len(), 1);
    insta::assert_snapshot!(records[0].render(), @r"
    root
      name: alice
    ");
}

#[test]
fn test_repeated_leaf() {
    let (schema, table) = setup(vec![SchemaNode::repeated("tags")]);
    let columns = store(vec![(
        "tags",
        vec![Cell::value("a", 0), Cell::value("b", 1)],
    )]);

    let records = assemble_all(schema.fields(), &table, &columns, AssemblyOptions::new()).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].to_json(), json!({"tags": ["a", "b"]}));
}

fn address_records(policy: AbsentPolicy, definition_level: u8) -> Vec<Value> {
    let (schema, table) = setup(vec![SchemaNode::group(
        "address",
        Mode::Optional,
        vec![SchemaNode::optional("city")],
    )]);
    let columns = store(vec![(
        "address.city",
        vec![Cell::null(0, definition_level), Cell::value("NYC", 0)],
    )]);
    let options = AssemblyOptions::new().absent(policy);
    let records = assemble_all(schema.fields(), &table, &columns, options).unwrap();
    records.iter().map(RecordTree::to_json).collect()
}

#[test]
fn test_null_opens_parents() {
    assert_eq!(
        address_records(AbsentPolicy::Parents, 1),
        vec![json!({"address": {}}), json!({"address": {"city": "NYC"}})]
    );
}

#[test]
fn test_null_opens_path() {
    assert_eq!(
        address_records(AbsentPolicy::Path, 1),
        vec![
            json!({"address": {"city": null}}),
            json!({"address": {"city": "NYC"}})
        ]
    );
}

#[test]
fn test_null_follows_definition_level() {
    assert_eq!(
        address_records(AbsentPolicy::DefinitionLevel, 0),
        vec![json!({}), json!({"address": {"city": "NYC"}})]
    );
    assert_eq!(
        address_records(AbsentPolicy::DefinitionLevel, 1),
        vec![json!({"address": {}}), json!({"address": {"city": "NYC"}})]
    );
}

#[test]
fn test_sibling_repeated_groups() {
    let (schema, table) = setup(vec![
        SchemaNode::group("a", Mode::Repeated, vec![SchemaNode::required("x")]),
        SchemaNode::group("b", Mode::Repeated, vec![SchemaNode::required("x")]),
    ]);
    let columns = store(vec![
        (
            "a.x",
            vec![Cell::value(1, 0), Cell::value(2, 1), Cell::value(4, 0)],
        ),
        (
            "b.x",
            vec![Cell::value(3, 0), Cell::value(5, 0), Cell::value(6, 1)],
        ),
    ]);

    let records = assemble_all(schema.fields(), &table, &columns, AssemblyOptions::new()).unwrap();
    assert_eq!(
        records.iter().map(RecordTree::to_json).collect::<Vec<_>>(),
        vec![
            json!({"a": [{"x": 1}, {"x": 2}], "b": [{"x": 3}]}),
            json!({"a": [{"x": 4}], "b": [{"x": 5}, {"x": 6}]}),
        ]
    );
}

#[test]
fn test_incomplete_table_is_rejected() {
    let (schema, _) = setup(vec![SchemaNode::repeated("tags")]);
    let table = TransitionTable::from_rows(vec![vec![Target::End]]);
    let columns = store(vec![("tags", vec![Cell::value("a", 0)])]);

    let err = Assembler::new(schema.fields(), &table, &columns)
        .err()
        .unwrap();
    assert!(err.is_configuration());
    assert_eq!(
        err,
        AssemblyError::Schema(SchemaError::MissingTransition {
            field: FieldPath::parse("tags"),
            level: 1,
        })
    );
}

#[test]
fn test_document_records() {
    let schema = document();
    let table = TransitionTable::build(schema.fields()).unwrap();
    let columns = document_columns();
    let options = AssemblyOptions::new()
        .absent(AbsentPolicy::DefinitionLevel)
        .root_name("Document");

    let records = assemble_all(schema.fields(), &table, &columns, options).unwrap();
    assert_eq!(
        json_records(&records),
        vec![
            json!({
                "DocId": 10,
                "Links": {"Forward": [20, 40, 60]},
                "Name": [
                    {
                        "Language": [{"Code": "en-us", "Country": "us"}, {"Code": "en"}],
                        "Url": "http://A"
                    },
                    {"Url": "http://B"},
                    {"Language": [{"Code": "en-gb", "Country": "gb"}]}
                ]
            }),
            json!({
                "DocId": 20,
                "Links": {"Backward": [10, 30], "Forward": [80]},
                "Name": [{"Url": "http://C"}]
            }),
        ]
    );
    assert_eq!(records[0].node(records[0].root()).name(), "Document");
    assert_eq!(
        records[0]
            .get("Name[0].Language[1].Code")
            .and_then(Node::value),
        Some(&json!("en"))
    );
}

#[test]
fn test_each_step_consumes_one_cell() {
    let schema = document();
    let table = TransitionTable::build(schema.fields()).unwrap();
    let columns = document_columns();
    let mut assembler = Assembler::new(schema.fields(), &table, &columns)
        .unwrap()
        .with_options(AssemblyOptions::new().absent(AbsentPolicy::DefinitionLevel));

    let consumed = |assembler: &Assembler<'_, Value>| {
        assembler
            .readers()
            .iter()
            .map(Reader::position)
            .collect::<Vec<_>>()
    };

    assert!(assembler.has_data());
    assembler.assemble_record().unwrap().unwrap();
    let after_first = consumed(&assembler);
    assert_eq!(after_first, vec![1, 1, 3, 4, 4, 3]);
    assert_eq!(after_first.iter().sum::<usize>(), 16);

    assembler.assemble_record().unwrap().unwrap();
    let after_second = consumed(&assembler);
    assert!(after_first.iter().zip(&after_second).all(|(a, b)| a <= b));
    assert_eq!(after_second.iter().sum::<usize>(), columns.cell_count());

    assert!(!assembler.has_data());
    assert!(assembler.assemble_record().unwrap().is_none());
    assert_eq!(assembler.assembled(), 2);
    assert_eq!(assembler.finish(), Ok(2));
}

#[test]
fn test_records_iterator() {
    let (schema, table) = setup(vec![SchemaNode::repeated("tags")]);
    let columns = store(vec![(
        "tags",
        vec![Cell::value("a", 0), Cell::value("b", 0), Cell::value("c", 1)],
    )]);
    let mut assembler = Assembler::new(schema.fields(), &table, &columns).unwrap();

    let rendered = assembler
        .records()
        .map(|record| record.map(|tree| tree.render()))
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    insta::assert_snapshot!(rendered.join("---\n"), @r"
    root
      tags: [a]
    ---
    root
      tags: [b, c]
    ");
}

fn pair() -> (Schema, TransitionTable) {
    setup(vec![SchemaNode::required("a"), SchemaNode::required("b")])
}

#[test]
fn test_column_exhausted() {
    let (schema, table) = pair();
    let columns = store(vec![
        ("a", vec![Cell::value(1, 0), Cell::value(2, 0)]),
        ("b", vec![Cell::value(1, 0)]),
    ]);

    let mut assembler = Assembler::new(schema.fields(), &table, &columns).unwrap();
    let results: Vec<_> = assembler.records().collect();
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    let err = results[1].clone().unwrap_err();
    assert!(!err.is_configuration());
    assert_eq!(
        err,
        AssemblyError::Inconsistent {
            field: FieldPath::parse("b"),
            position: 1,
            kind: Inconsistency::ColumnExhausted,
        }
    );
}

#[test]
fn test_record_boundary() {
    let (schema, table) = setup(vec![SchemaNode::repeated("tags")]);
    let columns = store(vec![("tags", vec![Cell::value("a", 1)])]);

    let err = assemble_all(schema.fields(), &table, &columns, AssemblyOptions::new()).unwrap_err();
    assert_eq!(
        err,
        AssemblyError::Inconsistent {
            field: FieldPath::parse("tags"),
            position: 0,
            kind: Inconsistency::RecordBoundary { level: 1 },
        }
    );
}

#[test]
fn test_repetition_level_beyond_field() {
    let (schema, table) = setup(vec![SchemaNode::repeated("tags")]);
    let columns = store(vec![(
        "tags",
        vec![Cell::value("a", 0), Cell::value("b", 2)],
    )]);

    let err = assemble_all(schema.fields(), &table, &columns, AssemblyOptions::new()).unwrap_err();
    assert!(!err.is_configuration());
    assert_eq!(
        err,
        AssemblyError::Inconsistent {
            field: FieldPath::parse("tags"),
            position: 1,
            kind: Inconsistency::RepetitionLevel { level: 2, max: 1 },
        }
    );
}

#[test]
fn test_trailing_cells() {
    let (schema, table) = pair();
    let columns = store(vec![
        ("a", vec![Cell::value(1, 0)]),
        ("b", vec![Cell::value(1, 0), Cell::value(2, 0)]),
    ]);

    let err = assemble_all(schema.fields(), &table, &columns, AssemblyOptions::new()).unwrap_err();
    assert_eq!(
        err,
        AssemblyError::Inconsistent {
            field: FieldPath::parse("b"),
            position: 1,
            kind: Inconsistency::TrailingCells { remaining: 1 },
        }
    );
}

#[test]
fn test_column_set_must_match_fields() {
    let (schema, table) = pair();

    let extra = store(vec![
        ("a", vec![Cell::value(1, 0)]),
        ("b", vec![Cell::value(1, 0)]),
        ("c", vec![Cell::value(1, 0)]),
    ]);
    assert_eq!(
        Assembler::new(schema.fields(), &table, &extra).err(),
        Some(AssemblyError::UnknownColumn {
            path: FieldPath::parse("c")
        })
    );

    let missing = store(vec![("a", vec![Cell::value(1, 0)])]);
    assert_eq!(
        Assembler::new(schema.fields(), &table, &missing).err(),
        Some(AssemblyError::MissingColumn {
            field: FieldPath::parse("b")
        })
    );

    let none: ColumnStore<i32> = ColumnStore::new();
    assert_eq!(
        Assembler::new(&[], &table, &none).err(),
        Some(AssemblyError::NoFields)
    );
}

#[test]
fn test_scalar_overwrite() {
    let (schema, _) = setup(vec![SchemaNode::required("name")]);
    // Loops on a required field: only a hand-written table can do that.
    let table = TransitionTable::from_rows(vec![vec![Target::Field(0)]]);
    let columns = store(vec![(
        "name",
        vec![Cell::value("alice", 0), Cell::value("bob", 0)],
    )]);

    let err = assemble_all(schema.fields(), &table, &columns, AssemblyOptions::new()).unwrap_err();
    assert_eq!(
        err,
        AssemblyError::Inconsistent {
            field: FieldPath::parse("name"),
            position: 1,
            kind: Inconsistency::ScalarOverwrite {
                name: "name".to_string()
            },
        }
    );
}

#[test]
fn test_shared_across_threads() {
    let schema = document();
    let table = TransitionTable::build(schema.fields()).unwrap();
    let columns = document_columns();

    let results: Vec<Vec<Value>> = std::thread::scope(|scope| {
        let handles: Vec<_> = [AbsentPolicy::Parents, AbsentPolicy::DefinitionLevel]
            .into_iter()
            .map(|policy| {
                let (fields, table, columns) = (schema.fields(), &table, &columns);
                scope.spawn(move || {
                    let options = AssemblyOptions::new().absent(policy);
                    json_records(&assemble_all(fields, table, columns, options).unwrap())
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].len(), 2);
    assert_eq!(results[1][1]["Name"], json!([{"Url": "http://C"}]));
}
