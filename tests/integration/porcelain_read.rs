#![allow(missing_docs)]

use graphweave::{decode, decode_with, DecodeConfig, Query, Snapshot, Tree};
use serde_json::{json, Value};

fn library() -> Snapshot {
    Snapshot::from_porcelain(&json!({
        "books": [
            {"$key": ["1984"], "title": "1984", "author": {"$ref": "users.orwell"}},
            {"$key": ["2001"], "title": "2001", "author": {"$ref": "users.clarke"}},
            {"$key": ["2312"], "title": "2312", "author": {"$ref": "users.robinson"}},
        ],
        "users": {
            "orwell": {"name": "George Orwell"},
            "clarke": {"name": "Arthur C Clarke"},
            "huxley": null,
        },
        "tags": {"$val": ["hello", "world"]},
    }))
    .expect("library snapshot")
}

fn read(snapshot: &Snapshot, query: Value) -> Value {
    let query = Query::parse(&query).expect("query");
    decode(snapshot, &query)
        .expect("decode")
        .map_or(Value::Null, |tree| tree.to_json())
}

#[test]
fn first_page_of_books_with_authors() {
    let result = read(
        &library(),
        json!({"books": {"$key": {"$first": 2}, "title": true, "author": {"name": true}}}),
    );
    assert_eq!(
        result,
        json!({
            "books": {
                "$items": [
                    {
                        "$key": ["1984"],
                        "title": "1984",
                        "author": {"$ref": ["users", "orwell"], "name": "George Orwell"},
                    },
                    {
                        "$key": ["2001"],
                        "title": "2001",
                        "author": {"$ref": ["users", "clarke"], "name": "Arthur C Clarke"},
                    },
                ],
                "$page": {"$all": true, "$until": ["2001"]},
                "$next": {"$first": 2, "$after": ["2001"]},
                "$prev": null,
            }
        })
    );
}

#[test]
fn explicit_reference_stamps_its_path() {
    let result = read(&library(), json!({"$ref": "users.orwell", "name": true}));
    assert_eq!(result, json!({"$ref": ["users", "orwell"], "name": "George Orwell"}));
}

#[test]
fn absent_and_unknown_stay_distinct() {
    let snapshot = library();
    let result = read(
        &snapshot,
        json!({"users": {"huxley": {"name": true}, "wells": {"name": true}}}),
    );
    assert_eq!(result, json!({"users": {"huxley": null, "wells": {}}}));

    let query = Query::parse(&json!({"users": {"wells": {"name": true}}})).unwrap();
    let tree = decode(&snapshot, &query).unwrap().unwrap();
    let wells = tree.get("users").and_then(|users| users.get("wells")).unwrap();
    assert!(wells.get("name").is_none());
}

#[test]
fn link_to_missing_target_is_unknown() {
    let result = read(
        &library(),
        json!({"books": [{"$key": ["2312"], "author": {"name": true}}]}),
    );
    assert_eq!(result, json!({"books": [{"author": {}}]}));
}

#[test]
fn array_values_read_whole() {
    let snapshot = library();
    assert_eq!(
        read(&snapshot, json!({"tags": 1})),
        json!({"tags": {"$val": ["hello", "world"]}})
    );
    let query = Query::parse(&json!({"tags": true})).unwrap();
    let tree = decode(&snapshot, &query).unwrap().unwrap();
    assert!(matches!(tree.get("tags"), Some(Tree::Val { .. })));
}

#[test]
fn leaf_reads_materialize_collections() {
    let result = read(&library(), json!({"users": {"orwell": true}}));
    assert_eq!(result, json!({"users": {"orwell": {"name": "George Orwell"}}}));

    let result = read(&library(), json!({"books": [{"$key": ["1984"], "author": true}]}));
    assert_eq!(
        result,
        json!({"books": [{"author": {"$ref": ["users", "orwell"], "name": "George Orwell"}}]})
    );
}

#[test]
fn single_key_reads() {
    let result = read(&library(), json!({"books": [{"$key": ["2001"], "title": true}]}));
    assert_eq!(result, json!({"books": [{"title": "2001"}]}));
    let unknown = read(&library(), json!({"books": [{"$key": ["3001"], "title": true}]}));
    assert_eq!(unknown, json!({"books": [{}]}));
}

#[test]
fn filtered_range() {
    let snapshot = Snapshot::from_porcelain(&json!({
        "foo": [
            {"$key": {"$cursor": [1], "bar": "something"}, "id": "id-1", "name": "name-1", "address": "address-1"},
            {"$key": {"$cursor": [2], "bar": "something"}, "id": "id-2", "name": "name-2", "address": "address-2"},
            {"$key": {"$cursor": [3], "bar": "something"}, "id": "id-3", "name": "name-3", "address": "address-3"},
        ]
    }))
    .unwrap();
    let result = read(
        &snapshot,
        json!({"foo": {"$key": {"$first": 2, "bar": "something"}, "id": 1, "name": 1}}),
    );
    assert_eq!(
        result,
        json!({
            "foo": {
                "$items": [
                    {"$key": {"$cursor": [1], "bar": "something"}, "id": "id-1", "name": "name-1"},
                    {"$key": {"$cursor": [2], "bar": "something"}, "id": "id-2", "name": "name-2"},
                ],
                "$page": {"bar": "something", "$all": true, "$until": [2]},
                "$next": {"bar": "something", "$first": 2, "$after": [2]},
                "$prev": null,
            }
        })
    );
}

#[test]
fn unfiltered_range_reads_the_default_bucket() {
    let snapshot = Snapshot::from_porcelain(&json!({
        "foo": [
            {"$key": ["a"], "id": 1},
            {"$key": ["b"], "id": 2},
            {"$key": {"$cursor": ["a"], "bar": "x"}, "id": 3},
        ]
    }))
    .unwrap();
    let result = read(&snapshot, json!({"foo": {"$key": {"$all": true}, "id": true}}));
    assert_eq!(
        result["foo"]["$items"],
        json!([{"$key": ["a"], "id": 1}, {"$key": ["b"], "id": 2}])
    );
    assert_eq!(result["foo"]["$next"], Value::Null);
}

#[test]
fn bare_cursor_keys_read_plain_items() {
    let snapshot =
        Snapshot::from_porcelain(&json!({"foo": [{"$key": {"$cursor": [1]}, "id": 1}]})).unwrap();
    let result = read(&snapshot, json!({"foo": [{"$key": {"$cursor": [1]}, "id": true}]}));
    assert_eq!(result, json!({"foo": [{"id": 1}]}));

    let gap = Snapshot::from_porcelain(&json!({"foo": [{"$key": {"$all": true}}]})).unwrap();
    let result = read(&gap, json!({"foo": [{"$key": {"$cursor": [1], "bar": "x"}, "id": true}]}));
    assert_eq!(result, json!({"foo": [null]}));
}

#[test]
fn reference_with_range_paginates_its_target() {
    let snapshot = Snapshot::from_porcelain(&json!({
        "posts": [
            {"$key": {"$cursor": 1, "tag": "rust"}, "title": "a"},
            {"$key": {"$cursor": 2, "tag": "rust"}, "title": "b"},
            {"$key": {"$cursor": 3, "tag": "go"}, "title": "c"},
        ]
    }))
    .unwrap();
    let result = read(
        &snapshot,
        json!({"$ref": ["posts", {"$first": 5, "tag": "rust"}], "title": true}),
    );
    assert_eq!(
        result["$items"],
        json!([
            {"$key": {"$cursor": 1, "tag": "rust"}, "title": "a"},
            {"$key": {"$cursor": 2, "tag": "rust"}, "title": "b"},
        ])
    );
    assert_eq!(result["$ref"], json!(["posts", {"$first": 5, "tag": "rust"}]));
    assert_eq!(result["$next"], Value::Null);
}

#[test]
fn unexpected_leaf_shapes() {
    let snapshot = Snapshot::new(vec![graphweave::Node::leaf(
        graphweave::EncodedKey::field("blob"),
        json!({"raw": true}),
    )])
    .unwrap();
    let query = Query::parse(&json!({"blob": true})).unwrap();
    let err = decode(&snapshot, &query).unwrap_err();
    assert_eq!(err.code(), "UnexpectedGraphShape");

    let tree = decode_with(&snapshot, &query, &DecodeConfig::permissive())
        .unwrap()
        .unwrap();
    assert_eq!(tree.to_json(), json!({}));
}

#[test]
fn reference_cycles_fail() {
    let snapshot = Snapshot::from_porcelain(&json!({
        "a": {"$ref": "b"},
        "b": {"$ref": "a"},
    }))
    .unwrap();
    let query = Query::parse(&json!({"a": {"name": true}})).unwrap();
    let err = decode(&snapshot, &query).unwrap_err();
    assert_eq!(err.code(), "ReferenceDepthExceeded");
}

#[test]
fn decode_passes_share_one_snapshot() {
    let snapshot = library();
    let query = Query::parse(&json!({"books": {"$key": {"$first": 3}, "title": true}})).unwrap();
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| decode(&snapshot, &query).unwrap().unwrap().to_json()))
            .collect();
        let results: Vec<Value> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
    });
}
