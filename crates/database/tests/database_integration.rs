//! Integration tests for the `Database` API.
//!
//! Scenarios run through the public surface only: builder chains, mutations,
//! triggers, transactions and logging.

use std::cell::RefCell;
use std::rc::Rc;
use tabula_database::{
    Database, DatabaseConfig, Direction, Error, FieldRule, Record, Schema, SequentialIdGenerator,
    TriggerAction, TriggerEvent, Value,
};

fn users_schema() -> Schema {
    Schema::new()
        .field("name", FieldRule::string().required().pattern("^[A-Z][a-z]+$"))
        .field("email", FieldRule::string().pattern(r"^[a-z]+@[a-z]+\.[a-z]+$"))
        .field("age", FieldRule::number().min(0.0).max(150.0))
}

fn user(name: &str, age: i64) -> Record {
    Record::new()
        .with("name", name)
        .with("email", format!("{}@mail.com", name.to_lowercase()))
        .with("age", age)
}

fn users_db(config: DatabaseConfig) -> Database {
    let mut db = Database::open(config)
        .unwrap()
        .with_id_generator(SequentialIdGenerator::new("u"));
    db.create_table("users", Some(users_schema())).unwrap();
    for (name, age) in [("Ann", 31), ("Bob", 25), ("Cid", 47), ("Dee", 25), ("Eve", 62)] {
        db.insert("users", user(name, age)).unwrap();
    }
    db
}

fn names(rows: &[Record]) -> Vec<&str> {
    rows.iter().filter_map(|r| r.value("name").as_str()).collect()
}

#[test]
fn test_generated_ids_are_unique() {
    let mut db = Database::new();
    db.create_table("t", None).unwrap();
    let mut ids = Vec::new();
    for _ in 0..200 {
        ids.push(db.insert("t", Record::new()).unwrap().unwrap());
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 200);
}

#[test]
fn test_sequential_ids() {
    let db = users_db(DatabaseConfig::new());
    assert_eq!(db.last_insert_id(), Some(&Value::from("u5")));
    assert!(db.table("users").unwrap().contains_id(&Value::from("u1")));
}

#[test]
fn test_schema_rejects_invalid_records() {
    let mut db = users_db(DatabaseConfig::new());
    let bad = [
        Record::new().with("age", 3),
        user("", 3),
        user("Ann", -1),
        user("Ann", 3).with("email", "not-an-email"),
        user("Ann", 3).with("age", "old"),
    ];
    for record in bad {
        let err = db.insert("users", record).unwrap_err();
        assert!(err.is_validation(), "unexpected error: {err}");
    }
    assert_eq!(db.raw_count("users").unwrap(), 5);
}

#[test]
fn test_queries_are_idempotent() {
    let mut db = users_db(DatabaseConfig::new());
    let run = |db: &mut Database| {
        db.where_operator("age", "<", 50)
            .order_by("age", Direction::Desc)
            .order_by("name", Direction::Asc)
            .get("users")
            .unwrap()
    };
    let first = run(&mut db);
    let second = run(&mut db);
    assert_eq!(first, second);
    assert_eq!(names(&first), vec!["Cid", "Ann", "Bob", "Dee"]);
}

#[test]
fn test_builder_is_reset_by_every_terminal() {
    let mut db = users_db(DatabaseConfig::new());
    db.where_eq("age", 25).limit(1, 0).get("users").unwrap();
    assert_eq!(db.get("users").unwrap().len(), 5);

    db.where_eq("age", 25).count("users").unwrap();
    assert_eq!(db.count("users").unwrap(), 5);

    db.where_eq("age", 25).sum("users", "age").unwrap();
    assert_eq!(db.sum("users", "age").unwrap(), 190.0);

    db.where_eq("name", "Ann").update("users", Record::new().with("age", 32)).unwrap();
    assert_eq!(db.where_eq("age", 25).count("users").unwrap(), 2);

    assert!(db.where_in("age", "x").get("users").is_err());
    assert_eq!(db.get("users").unwrap().len(), 5);
}

#[test]
fn test_price_range_scenario() {
    let mut db = Database::new();
    db.create_table("products", None).unwrap();
    db.create_index("products", "price").unwrap();
    let items = (1..=20)
        .map(|i| Record::new().with("id", i).with("price", i * 5).with("sku", format!("SKU-{i:02}")))
        .collect();
    db.bulk_insert("products", items).unwrap();

    let rows = db
        .where_operator("price", ">=", 40)
        .where_operator("price", "<", 60)
        .order_by("price", Direction::Desc)
        .get("products")
        .unwrap();
    let prices: Vec<i64> = rows.iter().filter_map(|r| r.value("price").as_i64()).collect();
    assert_eq!(prices, vec![55, 50, 45, 40]);

    let in_rows = db.where_in("id", vec![Value::from(3), Value::from(1), Value::from(99)]).get("products").unwrap();
    assert_eq!(in_rows.len(), 2);
    assert_eq!(in_rows[0].value("id"), &Value::from(1));

    assert_eq!(db.where_like("sku", "SKU-1").count("products").unwrap(), 10);
    assert_eq!(db.where_operator("sku", "like", "%-2%").count("products").unwrap(), 1);
}

#[test]
fn test_pagination_scenario() {
    let mut db = Database::new();
    db.create_table("logs", None).unwrap();
    db.bulk_insert("logs", (1..=23).map(|i| Record::new().with("id", i)).collect())
        .unwrap();

    let last = db.order_by("id", Direction::Asc).paginate("logs", 3, 10).unwrap();
    assert_eq!(last.data.len(), 3);
    assert_eq!(last.pagination.total_pages, 3);
    assert!(!last.pagination.has_next_page);

    let beyond = db.limit(1, 0).paginate("logs", 9, 10).unwrap();
    assert!(beyond.data.is_empty());
    assert_eq!(beyond.pagination.total, 23);

    assert!(db.paginate("logs", 1, 0).is_err());
}

#[test]
fn test_soft_delete_roundtrip() {
    let mut db = users_db(DatabaseConfig::new().soft_delete(true).timestamps(true));
    assert_eq!(db.where_eq("age", 25).delete("users").unwrap(), 2);

    assert_eq!(db.count("users").unwrap(), 3);
    assert_eq!(db.with_trashed().count("users").unwrap(), 5);
    assert_eq!(db.raw_count("users").unwrap(), 5);
    assert_eq!(db.where_eq("age", 25).count("users").unwrap(), 0);
    assert_eq!(db.with_trashed().where_eq("age", 25).count("users").unwrap(), 2);

    // trashed records are not updated
    assert_eq!(db.update("users", Record::new().with("age", 1)).unwrap(), 3);
    assert_eq!(db.with_trashed().where_eq("age", 25).count("users").unwrap(), 2);
}

#[test]
fn test_update_and_delete_counts() {
    let mut db = users_db(DatabaseConfig::new());
    assert_eq!(db.where_eq("age", 99).update("users", Record::new().with("age", 1)).unwrap(), 0);
    assert_eq!(db.where_operator("age", ">", 40).update("users", Record::new().with("senior", true)).unwrap(), 2);
    assert_eq!(db.where_eq("senior", true).delete("users").unwrap(), 2);
    assert_eq!(db.raw_count("users").unwrap(), 3);
    assert_eq!(db.delete("users").unwrap(), 3);
    assert_eq!(db.raw_count("users").unwrap(), 0);
}

#[test]
fn test_trigger_veto_and_failures() {
    let messages = Rc::new(RefCell::new(Vec::<String>::new()));
    let sink = Rc::clone(&messages);
    let config = DatabaseConfig::new().log_to(move |msg| sink.borrow_mut().push(msg.to_string()));
    let mut db = users_db(config);

    db.create_trigger("users", "minors", TriggerEvent::BeforeInsert, |ctx| {
        let age = ctx.new.and_then(|r| r.value("age").as_f64()).unwrap_or(0.0);
        Ok(if age < 18.0 { TriggerAction::Veto } else { TriggerAction::Proceed })
    })
    .unwrap();
    db.create_trigger("users", "broken", TriggerEvent::AfterInsert, |_| {
        Err(anyhow::anyhow!("audit table unavailable"))
    })
    .unwrap();

    assert_eq!(db.insert("users", user("Kid", 9)).unwrap(), None);
    assert!(db.insert("users", user("Max", 30)).unwrap().is_some());
    assert_eq!(db.raw_count("users").unwrap(), 6);

    let log = messages.borrow();
    assert!(log.iter().any(|m| m.contains("vetoed")));
    assert!(log.iter().any(|m| m.contains("audit table unavailable")));
}

#[test]
fn test_custom_trigger_event() {
    let mut db = users_db(DatabaseConfig::new());
    let hits = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&hits);
    db.create_trigger("users", "export", TriggerEvent::parse("export"), move |ctx| {
        assert_eq!(ctx.operation, &TriggerEvent::Custom("export".into()));
        *counter.borrow_mut() += 1;
        Ok(TriggerAction::Proceed)
    })
    .unwrap();

    let outcome = db
        .fire_trigger("users", &TriggerEvent::Custom("export".into()), None, None)
        .unwrap();
    assert!(!outcome.vetoed);
    db.insert("users", user("Zed", 40)).unwrap();
    assert_eq!(*hits.borrow(), 1);
}

#[test]
fn test_transaction_rollback_scenario() {
    let mut db = users_db(DatabaseConfig::new());
    let before = db.raw_count("users").unwrap();

    let result: Result<(), Error> = db.transaction(|db| {
        db.insert("users", user("Fay", 20))?;
        db.insert("users", user("Gus", 21))?;
        db.insert("users", user("Hal", 200))?;
        Ok(())
    });

    assert!(result.unwrap_err().is_validation());
    assert_eq!(db.raw_count("users").unwrap(), before);
    assert_eq!(db.where_eq("name", "Fay").count("users").unwrap(), 0);
}

#[test]
fn test_update_schema_is_atomic() {
    let mut db = users_db(DatabaseConfig::new());
    let strict = Schema::new().field("age", FieldRule::number().min(30.0));
    assert!(db.update_schema("users", strict).unwrap_err().is_validation());
    assert_eq!(db.get_schema("users").unwrap(), Some(users_schema()));

    let loose = Schema::new()
        .field("name", FieldRule::string().required())
        .field("age", FieldRule::number());
    db.update_schema("users", loose).unwrap();
    db.insert("users", Record::new().with("name", "X").with("email", "??")).unwrap();
}

#[test]
fn test_add_column_backfills_indexed_field() {
    let mut db = users_db(DatabaseConfig::new());
    db.create_index("users", "active").unwrap();
    db.add_column("users", "active", true).unwrap();
    assert_eq!(db.where_eq("active", true).count("users").unwrap(), 5);
}

#[test]
fn test_timestamps_on_insert_and_update() {
    let mut db = users_db(DatabaseConfig::new().timestamps(true));
    let ann = db.where_eq("name", "Ann").get_one("users").unwrap().unwrap();
    let created = ann.value("created_at").clone();
    assert!(created.as_str().is_some());
    assert_eq!(ann.value("updated_at"), &created);

    db.where_eq("name", "Ann").update("users", Record::new().with("age", 33)).unwrap();
    let ann = db.where_eq("name", "Ann").get_one("users").unwrap().unwrap();
    assert_eq!(ann.value("created_at"), &created);
    assert!(ann.value("updated_at").as_str().is_some());
}
