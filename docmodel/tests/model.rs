use docmodel::{
    bson::{Bson, Uuid},
    memory::InMemoryStore,
    model::{CREATED_AT, DELETED_AT, UPDATED_AT},
    prelude::*,
};

#[derive(Model)]
#[model(collection = "test-collection", fillables = ["id", "firstname", "lastname"])]
pub struct TestModel;

#[derive(Model)]
#[model(collection = "people", fillables = ["name", "city", "age"], timestamps = false)]
pub struct Person;

#[derive(Model)]
#[model(fillables = ["title"], timestamps = false, soft_delete)]
pub struct BlogPost;

async fn seed_people(store: &DocumentStore<InMemoryStore>) {
    for (name, city, age) in [
        ("ada", "Oslo", 36),
        ("bob", "Rome", 25),
        ("cy", "Oslo", 25),
        ("dee", "Oslo", 41),
    ] {
        store
            .model::<Person>()
            .values([Bson::from(name), Bson::from(city), Bson::from(age)])
            .save()
            .await
            .unwrap();
    }
}

fn names(result: &ResultSet) -> Vec<String> {
    result
        .docs
        .iter()
        .map(|doc| doc.data.get_str("name").unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn save_then_fetch_one_by_field() {
    let store = DocumentStore::new(InMemoryStore::new());

    let id = store
        .model::<TestModel>()
        .values(["1", "test", "test"])
        .save()
        .await
        .unwrap();

    let found = store
        .model::<TestModel>()
        .where_condition("id", "==", "1")
        .fetch_one()
        .await
        .unwrap();

    assert!(!found.is_empty());
    assert_eq!(found.len(), 1);

    let doc = found.first().unwrap();
    assert_eq!(doc.id, id);
    assert_eq!(doc.data.get_str("id").unwrap(), "1");
    assert_eq!(doc.data.get_str("firstname").unwrap(), "test");
    assert_eq!(doc.data.get_str("lastname").unwrap(), "test");
    assert!(matches!(doc.get(CREATED_AT), Some(Bson::DateTime(_))));
    assert_eq!(doc.get(UPDATED_AT), Some(&Bson::Null));
    assert!(doc.get(DELETED_AT).is_none());
}

#[tokio::test]
async fn fetch_one_without_match_is_empty() {
    let store = DocumentStore::new(InMemoryStore::new());

    let found = store
        .model::<TestModel>()
        .where_eq("id", "missing")
        .fetch_one()
        .await
        .unwrap();

    assert!(found.is_empty());
    assert!(found.first().is_none());
}

#[tokio::test]
async fn fetch_one_with_bound_id_ignores_conditions() {
    let store = DocumentStore::new(InMemoryStore::new());
    let id = store
        .model::<TestModel>()
        .values(["1", "a", "b"])
        .save()
        .await
        .unwrap();

    let found = store
        .model::<TestModel>()
        .doc(id)
        .where_eq("firstname", "nobody")
        .fetch_one()
        .await
        .unwrap();

    assert_eq!(found.ids(), vec![id]);

    let by_text = store
        .model::<TestModel>()
        .doc_str(&id.to_string())
        .fetch_one()
        .await
        .unwrap();

    assert_eq!(by_text.ids(), vec![id]);
}

#[tokio::test]
async fn fetch_returns_every_condition_match_in_sort_order() {
    let store = DocumentStore::new(InMemoryStore::new());
    seed_people(&store).await;

    let found = store
        .model::<Person>()
        .where_condition("city", "==", "Oslo")
        .where_condition("age", ">", 30)
        .order_by_desc("age")
        .fetch()
        .await
        .unwrap();

    assert_eq!(names(&found), vec!["dee", "ada"]);
}

#[tokio::test]
async fn fetch_applies_secondary_sort_and_limit() {
    let store = DocumentStore::new(InMemoryStore::new());
    seed_people(&store).await;

    let found = store
        .model::<Person>()
        .order_by("age")
        .order_by_desc("name")
        .limit(3)
        .fetch()
        .await
        .unwrap();

    assert_eq!(names(&found), vec!["cy", "bob", "ada"]);
}

#[tokio::test]
async fn fetch_without_conditions_returns_whole_collection() {
    let store = DocumentStore::new(InMemoryStore::new());
    seed_people(&store).await;

    let found = store.model::<Person>().fetch().await.unwrap();

    assert_eq!(found.len(), 4);
    assert!(!found.is_empty());
}

#[tokio::test]
async fn fetch_on_empty_collection_is_empty() {
    let store = DocumentStore::new(InMemoryStore::new());

    let found = store.model::<Person>().fetch().await.unwrap();

    assert!(found.is_empty());
    assert_eq!(found.len(), 0);
}

#[tokio::test]
async fn word_and_list_operators() {
    let store = DocumentStore::new(InMemoryStore::new());
    seed_people(&store).await;

    let found = store
        .model::<Person>()
        .where_condition("city", "in", vec!["Rome", "Paris"])
        .fetch()
        .await
        .unwrap();
    assert_eq!(names(&found), vec!["bob"]);

    let found = store
        .model::<Person>()
        .where_condition("name", "starts-with", "d")
        .where_condition("city", "not-in", vec!["Rome"])
        .fetch()
        .await
        .unwrap();
    assert_eq!(names(&found), vec!["dee"]);
}

#[tokio::test]
async fn increment_adds_to_the_stored_value() {
    let store = DocumentStore::new(InMemoryStore::new());
    seed_people(&store).await;

    store
        .model::<Person>()
        .where_eq("name", "bob")
        .increment("age", 2)
        .update()
        .await
        .unwrap();

    let found = store
        .model::<Person>()
        .where_eq("name", "bob")
        .fetch_one()
        .await
        .unwrap();

    assert_eq!(found.first().unwrap().get("age"), Some(&Bson::Int32(27)));
}

#[tokio::test]
async fn update_applies_set_and_remove_to_bound_document() {
    let store = DocumentStore::new(InMemoryStore::new());
    let id = store
        .model::<Person>()
        .values([Bson::from("eve"), Bson::from("Bern"), Bson::from(30)])
        .save()
        .await
        .unwrap();

    store
        .model::<Person>()
        .doc(id)
        .set("city", "Basel")
        .remove("age")
        .set("nickname", "e")
        .update()
        .await
        .unwrap();

    let found = store.model::<Person>().doc(id).fetch_one().await.unwrap();
    let doc = found.first().unwrap();

    assert_eq!(doc.data.get_str("city").unwrap(), "Basel");
    assert_eq!(doc.data.get_str("nickname").unwrap(), "e");
    assert!(doc.get("age").is_none());
}

#[tokio::test]
async fn update_without_match_reports_no_match() {
    let store = DocumentStore::new(InMemoryStore::new());

    let err = store
        .model::<Person>()
        .where_eq("name", "nobody")
        .set("city", "Nowhere")
        .update()
        .await
        .unwrap_err();

    assert!(matches!(err, DocumentStoreError::NoMatch(collection) if collection == "people"));
}

#[tokio::test]
async fn update_of_unknown_bound_id_is_not_found() {
    let store = DocumentStore::new(InMemoryStore::new());

    let err = store
        .model::<Person>()
        .doc(Uuid::new())
        .set("city", "Nowhere")
        .update()
        .await
        .unwrap_err();

    assert!(matches!(err, DocumentStoreError::DocumentNotFound(..)));
}

#[tokio::test]
async fn unknown_operator_fails_the_terminal_call() {
    let store = DocumentStore::new(InMemoryStore::new());
    seed_people(&store).await;

    let err = store
        .model::<Person>()
        .where_condition("age", "~=", 25)
        .fetch()
        .await
        .unwrap_err();

    assert!(matches!(err, DocumentStoreError::Backend(message) if message.contains("~=")));
}

#[tokio::test]
async fn accumulators_are_empty_after_terminal_operations() {
    let store = DocumentStore::new(InMemoryStore::new());
    seed_people(&store).await;

    let mut record = store
        .model::<Person>()
        .where_eq("city", "Oslo")
        .order_by("age")
        .limit(1);

    assert_eq!(record.pending_filters().len(), 1);
    assert_eq!(record.fetch().await.unwrap().len(), 1);
    assert!(record.pending_filters().is_empty());
    assert!(record.pending_sorts().is_empty());
    assert_eq!(record.pending_limit(), None);

    // A second fetch on the same record sees the whole collection
    assert_eq!(record.fetch().await.unwrap().len(), 4);
}

#[tokio::test]
async fn accumulators_reset_even_when_the_call_fails() {
    let store = DocumentStore::new(InMemoryStore::new());
    seed_people(&store).await;

    let mut record = store
        .model::<Person>()
        .where_condition("age", "between", 1)
        .where_eq("name", "ada")
        .set("city", "Paris");

    assert!(record.update().await.is_err());
    assert!(record.pending_filters().is_empty());
    assert!(record.pending_patch().is_empty());
    assert!(record.bound_id().is_none());

    let mut record = record.where_eq("name", "ada");
    assert_eq!(names(&record.fetch_one().await.unwrap()), vec!["ada"]);
}

#[tokio::test]
async fn fetch_one_keeps_the_limit() {
    let store = DocumentStore::new(InMemoryStore::new());
    seed_people(&store).await;

    let mut record = store.model::<Person>().where_eq("city", "Oslo").limit(2);

    assert_eq!(record.fetch_one().await.unwrap().len(), 1);
    assert_eq!(record.pending_limit(), Some(2));
    assert_eq!(record.fetch().await.unwrap().len(), 2);
}

#[tokio::test]
async fn save_rejects_more_values_than_fillables() {
    let store = DocumentStore::new(InMemoryStore::new());

    let err = store
        .model::<TestModel>()
        .values(["1", "a", "b", "c"])
        .save()
        .await
        .unwrap_err();

    assert!(matches!(err, DocumentStoreError::InvalidDocument(_)));
    assert!(store.model::<TestModel>().fetch().await.unwrap().is_empty());
}

#[tokio::test]
async fn model_flags_shape_the_saved_document() {
    let store = DocumentStore::new(InMemoryStore::new());

    let post = store.model::<BlogPost>().value("hello");
    assert_eq!(post.collection_name(), "blog_posts");
    assert_eq!(
        post.attributes().unwrap(),
        docmodel::bson::doc! { "title": "hello", DELETED_AT: Bson::Null }
    );

    let person = store.model::<Person>().values([Bson::from("ada")]);
    assert_eq!(
        person.attributes().unwrap(),
        docmodel::bson::doc! { "name": "ada" }
    );
}

#[tokio::test]
async fn malformed_text_id_fails_the_terminal_call() {
    let store = DocumentStore::new(InMemoryStore::new());

    let err = store
        .model::<TestModel>()
        .doc_str("not-a-uuid")
        .fetch_one()
        .await
        .unwrap_err();

    assert!(matches!(err, DocumentStoreError::InvalidDocument(_)));
}

#[tokio::test]
async fn result_set_renders_as_json() {
    let store = DocumentStore::new(InMemoryStore::new());
    let id = store
        .model::<Person>()
        .values([Bson::from("ada")])
        .save()
        .await
        .unwrap();

    let json = store
        .model::<Person>()
        .fetch()
        .await
        .unwrap()
        .to_json()
        .unwrap();

    assert_eq!(
        json,
        serde_json::json!({
            "empty": false,
            "docs": [{ "id": id.to_string(), "data": { "name": "ada" } }],
        })
    );
}

#[tokio::test]
async fn records_work_through_a_dynamic_store() {
    let store = DocumentStore::new(InMemoryStore::new()).into_dyn();

    store
        .model::<TestModel>()
        .values(["1", "test", "test"])
        .save()
        .await
        .unwrap();

    let found = store
        .as_dyn()
        .model::<TestModel>()
        .where_eq("id", "1")
        .fetch_one()
        .await
        .unwrap();

    assert!(!found.is_empty());
    assert_eq!(store.list_collections().await.unwrap(), vec!["test-collection"]);
}

#[tokio::test]
async fn zero_limit_returns_every_match() {
    let store = DocumentStore::new(InMemoryStore::new());
    seed_people(&store).await;

    let mut record = store.model::<Person>().limit(0);

    assert_eq!(record.pending_limit(), None);
    assert_eq!(record.fetch().await.unwrap().len(), 4);
}

#[tokio::test]
async fn mixed_type_field_sorts_by_type() {
    let store = DocumentStore::new(InMemoryStore::new());

    for value in [
        Bson::from("b"),
        Bson::Double(f64::NAN),
        Bson::from(true),
        Bson::from(3),
        Bson::from("a"),
        Bson::Null,
        Bson::from(-2.5),
        Bson::from(false),
    ] {
        store
            .model::<Person>()
            .values([Bson::from("x"), Bson::from("Oslo"), value])
            .save()
            .await
            .unwrap();
    }

    let ages = store
        .model::<Person>()
        .order_by("age")
        .fetch()
        .await
        .unwrap()
        .docs
        .into_iter()
        .map(|doc| doc.data.get("age").unwrap().clone())
        .collect::<Vec<_>>();

    assert_eq!(ages.len(), 8);
    assert_eq!(ages[0], Bson::Null);
    assert_eq!(ages[1..3], [Bson::Double(-2.5), Bson::Int32(3)]);
    assert!(matches!(ages[3], Bson::Double(n) if n.is_nan()));
    assert_eq!(ages[4..], [Bson::from("a"), Bson::from("b"), Bson::from(false), Bson::from(true)]);
}

#[tokio::test]
async fn non_numeric_increment_is_rejected() {
    let store = DocumentStore::new(InMemoryStore::new());
    let id = store
        .model::<Person>()
        .values([Bson::from("eve"), Bson::from("Bern"), Bson::from(5)])
        .save()
        .await
        .unwrap();

    let err = store
        .model::<Person>()
        .doc(id)
        .set("city", "Basel")
        .increment("age", "oops")
        .update()
        .await
        .unwrap_err();

    assert!(matches!(err, DocumentStoreError::InvalidDocument(msg) if msg.contains("age")));

    let doc = store.model::<Person>().doc(id).fetch_one().await.unwrap();
    assert_eq!(doc.first().unwrap().get("age"), Some(&Bson::Int32(5)));
    assert_eq!(doc.first().unwrap().get("city"), Some(&Bson::from("Bern")));
}

#[tokio::test]
async fn int64_increment_overflow_is_rejected() {
    let store = DocumentStore::new(InMemoryStore::new());
    let id = store
        .model::<Person>()
        .values([Bson::from("eve"), Bson::from("Bern"), Bson::Int64(i64::MAX)])
        .save()
        .await
        .unwrap();

    let err = store
        .model::<Person>()
        .doc(id)
        .increment("age", 1)
        .update()
        .await
        .unwrap_err();

    assert!(matches!(err, DocumentStoreError::InvalidDocument(_)));

    let doc = store.model::<Person>().doc(id).fetch_one().await.unwrap();
    assert_eq!(doc.first().unwrap().get("age"), Some(&Bson::Int64(i64::MAX)));
}
