//! Transaction isolation of the in-memory engine.

use std::time::Duration;

use netgraph_storage::{
    ConfiguratorStorageFactory, InMemoryStorageFactory, StoredEntity, StoredEntityUpdate,
    StoredNetwork, TxOptions,
};
use netgraph_types::{EntityLoadCriteria, EntityLoadFilter, TypeAndKey};

fn entity(t: &str, k: &str) -> StoredEntity {
    StoredEntity {
        entity_type: t.into(),
        key: k.into(),
        ..Default::default()
    }
}

async fn with_network(factory: &InMemoryStorageFactory) {
    let mut tx = factory.start_transaction(TxOptions::read_write()).await.unwrap();
    tx.create_network(StoredNetwork {
        id: "n1".into(),
        ..Default::default()
    })
    .await
    .unwrap();
    tx.commit().await.unwrap();
}

#[tokio::test]
async fn uncommitted_writes_are_invisible_and_rolled_back() {
    let factory = InMemoryStorageFactory::default();
    with_network(&factory).await;

    let mut tx = factory.start_transaction(TxOptions::read_write()).await.unwrap();
    tx.create_entity("n1", entity("cell", "c1")).await.unwrap();
    let err = tx
        .update_entity(
            "n1",
            StoredEntityUpdate {
                entity_type: "cell".into(),
                key: "missing".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    // a reader cannot start while the writer is open
    let blocked = tokio::time::timeout(
        Duration::from_millis(50),
        factory.start_transaction(TxOptions::read_only()),
    )
    .await;
    assert!(blocked.is_err());

    tx.rollback().await.unwrap();

    let mut reader = factory.start_transaction(TxOptions::read_only()).await.unwrap();
    let loaded = reader
        .load_entities(
            "n1",
            &EntityLoadFilter::of_ids(vec![TypeAndKey::new("cell", "c1")]),
            &EntityLoadCriteria::default(),
        )
        .await
        .unwrap();
    assert!(loaded.entities.is_empty());
    assert_eq!(loaded.entities_not_found.len(), 1);
}

#[tokio::test]
async fn concurrent_readers_share_the_store() {
    let factory = InMemoryStorageFactory::default();
    with_network(&factory).await;

    let mut first = factory.start_transaction(TxOptions::read_only()).await.unwrap();
    let mut second = tokio::time::timeout(
        Duration::from_secs(1),
        factory.start_transaction(TxOptions::read_only()),
    )
    .await
    .expect("second reader must not block")
    .unwrap();
    assert_eq!(first.list_network_ids().await.unwrap(), vec!["n1".to_string()]);
    assert_eq!(second.list_network_ids().await.unwrap(), vec!["n1".to_string()]);
}

#[tokio::test]
async fn graph_load_returns_sorted_component_with_roots() {
    let factory = InMemoryStorageFactory::default();
    with_network(&factory).await;

    let mut tx = factory.start_transaction(TxOptions::read_write()).await.unwrap();
    tx.create_entity("n1", entity("cell", "c1")).await.unwrap();
    tx.create_entity("n1", entity("cell", "c2")).await.unwrap();
    let mut gateway = entity("gateway", "gw1");
    gateway.associations = vec![TypeAndKey::new("cell", "c2"), TypeAndKey::new("cell", "c1")];
    tx.create_entity("n1", gateway).await.unwrap();
    tx.create_entity("n1", entity("tier", "unrelated")).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = factory.start_transaction(TxOptions::read_only()).await.unwrap();
    let graph = tx
        .load_graph_for_entity(
            "n1",
            &TypeAndKey::new("cell", "c1"),
            &EntityLoadCriteria::default(),
        )
        .await
        .unwrap();
    let tks: Vec<_> = graph.entities.iter().map(StoredEntity::tk).collect();
    assert_eq!(
        tks,
        vec![
            TypeAndKey::new("cell", "c1"),
            TypeAndKey::new("cell", "c2"),
            TypeAndKey::new("gateway", "gw1"),
        ]
    );
    assert_eq!(graph.root_entities, vec![TypeAndKey::new("gateway", "gw1")]);
    assert_eq!(graph.edges.len(), 2);
    assert!(graph.edges[0] < graph.edges[1]);
    assert!(graph.entities.iter().all(|e| !e.graph_id.is_empty()));

    let err = tx
        .load_graph_for_entity("n1", &TypeAndKey::new("cell", "nope"), &EntityLoadCriteria::default())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}
