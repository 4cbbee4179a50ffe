use docmodel::{connection, prelude::*};

#[derive(Model)]
#[model(collection = "test-collection", fillables = ["id", "firstname", "lastname"])]
pub struct TestModel;

// The default connection is process-wide, so everything touching it lives in one test.
#[tokio::test]
async fn default_connection_lifecycle() {
    assert!(!connection::is_configured());
    assert!(matches!(
        connection::model::<TestModel>(),
        Err(DocumentStoreError::ConfigurationMissing)
    ));
    assert!(matches!(
        connection::start_batch_write(),
        Err(DocumentStoreError::ConfigurationMissing)
    ));

    let config = ConnectionConfig::from_json(r#"{ "backend": "memory" }"#).unwrap();

    assert!(docmodel::configure(&config).await.unwrap());
    assert!(!docmodel::configure(&config).await.unwrap());
    assert!(connection::is_configured());

    connection::model::<TestModel>()
        .unwrap()
        .values(["1", "test", "test"])
        .save()
        .await
        .unwrap();

    let mut batch = connection::start_batch_write().unwrap();
    connection::model::<TestModel>()
        .unwrap()
        .values(["2", "test", "test"])
        .save_in(&mut batch)
        .unwrap();
    batch.commit().await.unwrap();

    let found = connection::model::<TestModel>()
        .unwrap()
        .where_condition("lastname", "==", "test")
        .order_by("id")
        .fetch()
        .await
        .unwrap();

    assert_eq!(found.len(), 2);
    assert_eq!(found.first().unwrap().get("id"), Some(&docmodel::bson::Bson::from("1")));
}
