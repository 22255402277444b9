use std::sync::Arc;

use netgraph_serde::{deserialize, serialize, JsonSerde, Serde, SerdeRegistry, NETWORK_CONFIG_DOMAIN};
use netgraph_types::ConfigValue;
use proptest::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CellularConfig {
    earfcn: u32,
    band: u8,
    plmn: String,
    neighbours: Vec<u16>,
    allow_roaming: Option<bool>,
}

fn cellular_config() -> impl Strategy<Value = CellularConfig> {
    (
        any::<u32>(),
        any::<u8>(),
        "[0-9]{5,6}",
        proptest::collection::vec(any::<u16>(), 0..8),
        any::<Option<bool>>(),
    )
        .prop_map(|(earfcn, band, plmn, neighbours, allow_roaming)| CellularConfig {
            earfcn,
            band,
            plmn,
            neighbours,
            allow_roaming,
        })
}

proptest! {
    #[test]
    fn serialize_then_deserialize_is_identity(config in cellular_config()) {
        let registry = SerdeRegistry::new(vec![
            Arc::new(JsonSerde::<CellularConfig>::network_config("cellular")) as Arc<dyn Serde>,
        ])
        .unwrap();

        let value = ConfigValue::new(config.clone());
        let bytes = serialize(&value, NETWORK_CONFIG_DOMAIN, "cellular", &registry).unwrap();
        prop_assert!(!bytes.is_empty());

        let back = deserialize(&bytes, NETWORK_CONFIG_DOMAIN, "cellular", &registry)
            .unwrap()
            .unwrap();
        prop_assert_eq!(back.downcast_ref::<CellularConfig>(), Some(&config));
    }
}
