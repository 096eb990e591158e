use std::error::Error;

use serde_json::{Value, json};
use sql_mutation::prelude::*;

#[derive(Debug, Default, Clone, PartialEq)]
struct Profile {
    user_id: i64,
    bio: String,
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Post {
    id: i64,
    title: String,
    // only ever set by callers, never by a record
    draft_note: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq)]
struct User {
    id: i64,
    name: String,
    profile: Option<Profile>,
    posts: Vec<Post>,
    stats: Stats,
}

fn int(record: &Record, column: &str) -> Option<i64> {
    record.get(column).and_then(RowValues::to_identifier)
}

fn text(record: &Record, column: &str) -> Option<String> {
    record
        .get(column)
        .and_then(RowValues::as_text)
        .map(str::to_owned)
}

impl Keyed for User {
    fn key_value(&self, column: &str) -> Option<RowValues> {
        (column == "id").then_some(RowValues::Int(self.id))
    }
}

impl Entity for User {
    fn merge_record(&mut self, record: &Record) -> Result<(), SqlMutationError> {
        if let Some(id) = int(record, "id") {
            self.id = id;
        }
        if let Some(name) = text(record, "name") {
            self.name = name;
        }
        Ok(())
    }
}

impl Keyed for Profile {
    fn key_value(&self, column: &str) -> Option<RowValues> {
        (column == "user_id").then_some(RowValues::Int(self.user_id))
    }
}

impl Entity for Profile {
    fn merge_record(&mut self, record: &Record) -> Result<(), SqlMutationError> {
        if let Some(id) = int(record, "user_id") {
            self.user_id = id;
        }
        if let Some(bio) = text(record, "bio") {
            self.bio = bio;
        }
        Ok(())
    }
}

impl Keyed for Post {
    fn key_value(&self, column: &str) -> Option<RowValues> {
        (column == "id").then_some(RowValues::Int(self.id))
    }
}

impl Entity for Post {
    fn merge_record(&mut self, record: &Record) -> Result<(), SqlMutationError> {
        if let Some(id) = int(record, "id") {
            self.id = id;
        }
        match record.get("title") {
            Some(RowValues::Text(title)) => self.title.clone_from(title),
            Some(RowValues::Null) | None => {}
            Some(other) => {
                return Err(SqlMutationError::Materialize(format!(
                    "post title must be text, got {other:?}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Stats {
    post_count: i64,
}

impl Keyed for Stats {
    fn key_value(&self, _column: &str) -> Option<RowValues> {
        None
    }
}

impl Entity for Stats {
    fn merge_record(&mut self, record: &Record) -> Result<(), SqlMutationError> {
        if let Some(count) = int(record, "post_count") {
            self.post_count = count;
        }
        Ok(())
    }
}

fn records(columns: &[&str], rows: Vec<Vec<RowValues>>) -> RecordSet {
    let mut set = RecordSet::with_columns(columns.iter().map(|c| (*c).to_owned()).collect());
    for row in rows {
        set.add_row_values(row);
    }
    set
}

fn users() -> Vec<User> {
    vec![
        User {
            id: 1,
            name: "ann".into(),
            ..User::default()
        },
        User {
            id: 2,
            name: "bob".into(),
            ..User::default()
        },
    ]
}

fn posts_binding() -> RelationBinding<User> {
    RelationBinding::many("posts", |u: &mut User| &mut u.posts).keys("id", "user_id")
}

#[test]
fn many_then_one_keeps_both_attributes() -> Result<(), Box<dyn Error>> {
    let mut dest = users();
    let posts = records(
        &["id", "user_id", "title"],
        vec![
            vec![10.into(), 1.into(), "first".into()],
            vec![11.into(), 1.into(), "second".into()],
            vec![12.into(), 2.into(), "hello".into()],
        ],
    );
    Materializer::new(&posts).bind(&mut dest, &posts_binding())?;

    let profiles = records(
        &["user_id", "bio"],
        vec![vec![2.into(), "likes tea".into()]],
    );
    let profile = RelationBinding::optional("profile", |u: &mut User| &mut u.profile)
        .keys("id", "user_id");
    Materializer::new(&profiles).bind(&mut dest, &profile)?;

    let titles: Vec<&str> = dest[0].posts.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, ["first", "second"]);
    assert_eq!(dest[1].posts.len(), 1);
    // binding the profile left the posts untouched
    assert_eq!(dest[1].posts[0].id, 12);
    assert_eq!(dest[0].profile, None);
    assert_eq!(
        dest[1].profile.as_ref().map(|p| p.bio.as_str()),
        Some("likes tea")
    );
    Ok(())
}

#[test]
fn rebinding_reuses_children_by_identity() -> Result<(), Box<dyn Error>> {
    let mut dest = users();
    dest[0].posts = vec![Post {
        id: 10,
        title: "stale".into(),
        draft_note: Some("keep me".into()),
    }];
    let posts = records(
        &["id", "user_id", "title"],
        vec![
            vec![11.into(), 1.into(), "new".into()],
            vec![10.into(), 1.into(), "fresh".into()],
        ],
    );
    Materializer::new(&posts).bind(&mut dest, &posts_binding())?;

    let posts = &dest[0].posts;
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].id, 11);
    assert_eq!(posts[1].title, "fresh");
    assert_eq!(posts[1].draft_note.as_deref(), Some("keep me"));
    // unmatched parents get an empty list
    assert!(dest[1].posts.is_empty());
    Ok(())
}

#[test]
fn failed_rebind_keeps_existing_children() -> Result<(), Box<dyn Error>> {
    let mut dest = users();
    dest[0].posts = vec![
        Post {
            id: 10,
            title: "kept".into(),
            draft_note: Some("note".into()),
        },
        Post {
            id: 11,
            title: "also kept".into(),
            draft_note: None,
        },
    ];
    let before = dest[0].posts.clone();
    let posts = records(
        &["id", "user_id", "title"],
        vec![
            vec![12.into(), 1.into(), "new".into()],
            vec![11.into(), 1.into(), 99.into()],
        ],
    );
    let err = Materializer::new(&posts)
        .bind(&mut dest, &posts_binding())
        .unwrap_err();
    assert!(matches!(err, SqlMutationError::Materialize(_)));
    assert_eq!(dest[0].posts, before);
    Ok(())
}

#[test]
fn single_bindings_without_keys_correlate_on_identity() -> Result<(), Box<dyn Error>> {
    let mut dest = users();
    // one row per user, keyed by the user's own id
    let summary = records(
        &["id", "user_id", "bio", "post_count"],
        vec![
            vec![2.into(), 2.into(), "likes tea".into(), 4.into()],
            vec![7.into(), 7.into(), "stranger".into(), 1.into()],
        ],
    );
    let materializer = Materializer::new(&summary);
    materializer.bind(
        &mut dest,
        &RelationBinding::optional("profile", |u: &mut User| &mut u.profile),
    )?;
    materializer.bind(
        &mut dest,
        &RelationBinding::one("stats", |u: &mut User| &mut u.stats),
    )?;

    assert_eq!(dest[0].profile, None);
    assert_eq!(dest[0].stats, Stats::default());
    assert_eq!(
        dest[1].profile,
        Some(Profile {
            user_id: 2,
            bio: "likes tea".into(),
        })
    );
    assert_eq!(dest[1].stats.post_count, 4);
    // the relation only filled its own attribute
    assert_eq!(dest[1].name, "bob");
    Ok(())
}

#[test]
fn later_records_win_per_column() -> Result<(), Box<dyn Error>> {
    let mut dest = users();
    let renamed = records(&["id", "name"], vec![vec![1.into(), "anne".into()]]);
    Materializer::new(&renamed).scan_into(&mut dest, "id")?;
    assert_eq!(dest[0].name, "anne");

    // a record without `name` leaves the name alone
    let ids_only = records(&["id"], vec![vec![1.into()], vec![3.into()]]);
    Materializer::new(&ids_only).scan_into(&mut dest, "id")?;
    assert_eq!(dest[0].name, "anne");
    assert_eq!(dest.len(), 3);
    assert_eq!(dest[2].id, 3);
    Ok(())
}

#[test]
fn scan_one_reports_whether_a_row_existed() -> Result<(), Box<dyn Error>> {
    let mut user = User::default();
    let empty = records(&["id", "name"], vec![]);
    assert!(!Materializer::new(&empty).scan_one(&mut user)?);
    assert_eq!(user, User::default());

    let one = records(&["id", "name"], vec![vec![5.into(), "eve".into()]]);
    assert!(Materializer::new(&one).scan_one(&mut user)?);
    assert_eq!(user.name, "eve");
    Ok(())
}

#[test]
fn binding_errors_are_reported() {
    let mut dest = users();
    let keyless = RelationBinding::many("posts", |u: &mut User| &mut u.posts);
    let posts = records(&["id", "user_id"], vec![vec![10.into(), 1.into()]]);
    let err = Materializer::new(&posts)
        .bind(&mut dest, &keyless)
        .unwrap_err();
    assert!(matches!(err, SqlMutationError::Materialize(_)));

    let wrong_column = records(&["id", "author_id"], vec![vec![10.into(), 1.into()]]);
    let err = Materializer::new(&wrong_column)
        .bind(&mut dest, &posts_binding())
        .unwrap_err();
    assert!(err.to_string().contains("user_id"));
}

#[test]
fn dynamic_graphs_bind_like_typed_ones() -> Result<(), Box<dyn Error>> {
    let mut dest = json!([{"id": 1, "name": "ann"}, {"id": 2, "name": "bob"}]);
    let posts = records(
        &["id", "user_id", "title"],
        vec![
            vec![10.into(), 1.into(), "first".into()],
            vec![12.into(), 2.into(), "hello".into()],
        ],
    );
    Materializer::new(&posts).bind_json(
        &mut dest,
        &RelationBinding::<Value>::json_many("posts").keys("id", "user_id"),
    )?;

    let profiles = records(&["user_id", "bio"], vec![vec![1.into(), "hi".into()]]);
    Materializer::new(&profiles).bind_json(
        &mut dest,
        &RelationBinding::<Value>::json_one("profile").keys("id", "user_id"),
    )?;

    assert_eq!(dest[0]["posts"][0]["title"], json!("first"));
    assert_eq!(dest[1]["posts"].as_array().map(Vec::len), Some(1));
    assert_eq!(dest[0]["profile"]["bio"], json!("hi"));
    assert!(dest[1].get("profile").is_none());

    let mut single = json!({"id": 2});
    Materializer::new(&posts).bind_json(
        &mut single,
        &RelationBinding::<Value>::json_many("posts").keys("id", "user_id"),
    )?;
    assert_eq!(single["posts"][0]["id"], json!(12));
    Ok(())
}

#[test]
fn dynamic_destinations_must_be_objects() -> Result<(), Box<dyn Error>> {
    let posts = records(&["id", "user_id"], vec![vec![10.into(), 1.into()]]);
    let binding = RelationBinding::<Value>::json_many("posts").keys("id", "user_id");

    let mut scalars = json!([1, 2]);
    assert!(Materializer::new(&posts).bind_json(&mut scalars, &binding).is_err());
    let mut text = json!("ann");
    assert!(Materializer::new(&posts).bind_json(&mut text, &binding).is_err());

    let mut list = Value::Null;
    Materializer::new(&posts).scan_json(&mut list, "id")?;
    assert_eq!(list, json!([{"id": 10, "user_id": 1}]));
    let mut not_a_list = json!({"id": 1});
    assert!(Materializer::new(&posts).scan_json(&mut not_a_list, "id").is_err());
    Ok(())
}
