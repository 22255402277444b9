//! Paging through a type-filtered scan yields every entity exactly once.

use std::collections::BTreeSet;

use netgraph_storage::{
    ConfiguratorStorageFactory, InMemoryStorageFactory, StorageConfig, StoredEntity, StoredNetwork,
    TxOptions,
};
use netgraph_types::{EntityLoadCriteria, EntityLoadFilter, TypeAndKey};
use proptest::prelude::*;

async fn seed(factory: &InMemoryStorageFactory, keys: &BTreeSet<String>, noise: usize) {
    let mut tx = factory
        .start_transaction(TxOptions::read_write())
        .await
        .expect("tx");
    tx.create_network(StoredNetwork {
        id: "n1".into(),
        ..Default::default()
    })
    .await
    .expect("network");
    for key in keys {
        tx.create_entity(
            "n1",
            StoredEntity {
                entity_type: "gateway".into(),
                key: key.clone(),
                ..Default::default()
            },
        )
        .await
        .expect("gateway");
    }
    // entities of other types sort before and after "gateway"
    for i in 0..noise {
        for entity_type in ["cell", "tier"] {
            tx.create_entity(
                "n1",
                StoredEntity {
                    entity_type: entity_type.into(),
                    key: format!("x{}", i),
                    ..Default::default()
                },
            )
            .await
            .expect("noise");
        }
    }
    tx.commit().await.expect("commit");
}

async fn collect_pages(factory: &InMemoryStorageFactory, page_size: u32) -> (Vec<TypeAndKey>, usize) {
    let mut tx = factory
        .start_transaction(TxOptions::read_only())
        .await
        .expect("tx");
    let filter = EntityLoadFilter::of_type("gateway");
    let mut token = String::new();
    let mut seen = Vec::new();
    let mut pages = 0;
    loop {
        let criteria = EntityLoadCriteria::default().with_page(page_size, token.clone());
        let page = tx.load_entities("n1", &filter, &criteria).await.expect("page");
        pages += 1;
        seen.extend(page.entities.iter().map(StoredEntity::tk));
        if page.next_page_token.is_empty() {
            break;
        }
        token = page.next_page_token;
    }
    (seen, pages)
}

proptest! {
    #[test]
    fn pages_cover_the_type_exactly_once(
        keys in proptest::collection::btree_set("[a-z0-9]{1,6}", 0..40),
        noise in 0usize..5,
        page_size in 0u32..12,
        max_load in 1u32..20,
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");

        let (seen, pages) = rt.block_on(async {
            let factory = InMemoryStorageFactory::new(StorageConfig {
                max_entity_load_size: max_load,
                default_page_size: 0,
            });
            seed(&factory, &keys, noise).await;
            collect_pages(&factory, page_size).await
        });

        let expected: Vec<TypeAndKey> = keys
            .iter()
            .map(|k| TypeAndKey::new("gateway", k.clone()))
            .collect();
        prop_assert_eq!(&seen, &expected);

        let effective = (if page_size == 0 { max_load } else { page_size.min(max_load) }) as usize;
        prop_assert!(pages <= expected.len() / effective + 1);
    }
}

#[tokio::test]
async fn explicit_ids_report_misses_and_ignore_paging() {
    let factory = InMemoryStorageFactory::new(StorageConfig {
        max_entity_load_size: 10,
        default_page_size: 1,
    });
    let keys: BTreeSet<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
    seed(&factory, &keys, 0).await;

    let mut tx = factory.start_transaction(TxOptions::read_only()).await.unwrap();
    let filter = EntityLoadFilter::of_ids(vec![
        TypeAndKey::new("gateway", "c"),
        TypeAndKey::new("gateway", "a"),
        TypeAndKey::new("gateway", "zz"),
        TypeAndKey::new("gateway", "a"),
    ]);
    let loaded = tx
        .load_entities("n1", &filter, &EntityLoadCriteria::default())
        .await
        .unwrap();
    let found: Vec<_> = loaded.entities.iter().map(|e| e.key.as_str()).collect();
    assert_eq!(found, vec!["a", "c"]);
    assert_eq!(loaded.entities_not_found, vec![TypeAndKey::new("gateway", "zz")]);
    assert!(loaded.next_page_token.is_empty());
}

#[tokio::test]
async fn malformed_token_is_rejected() {
    let factory = InMemoryStorageFactory::default();
    seed(&factory, &BTreeSet::new(), 0).await;
    let mut tx = factory.start_transaction(TxOptions::read_only()).await.unwrap();
    let criteria = EntityLoadCriteria::default().with_page(5, "%%%");
    assert!(tx
        .load_entities("n1", &EntityLoadFilter::of_type("gateway"), &criteria)
        .await
        .is_err());
}
