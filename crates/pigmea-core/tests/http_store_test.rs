// Store loads over the HTTP backend, using wiremock.
#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pigmea_api::{BackendClient, TransportConfig};
use pigmea_core::{EntityStore, HttpBackend, Order, Stage, StagePhase};

async fn order_store(body: serde_json::Value) -> (MockServer, EntityStore<Order>) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/pedidos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(&server)
        .await;

    let client = BackendClient::new(&server.uri(), &TransportConfig::default()).unwrap();
    let store = EntityStore::new(Arc::new(HttpBackend::new(client)));
    (server, store)
}

#[tokio::test]
async fn test_orders_in_every_backend_stage_load() {
    let (_server, store) = order_store(json!([
        { "id": 1, "numeroPedidoCliente": "OC-1", "etapaActual": "PREPARACION", "metros": "1500" },
        { "id": 2, "numeroPedidoCliente": "OC-2", "etapaActual": "IMPRESION_GIAVE", "metros": 900 },
        { "id": 3, "numeroPedidoCliente": "OC-3", "etapaActual": "POST_REBOBINADO_S2DT" },
        { "id": 4, "numeroPedidoCliente": "OC-4", "etapaActual": "CORTE" },
        { "id": 5, "numeroPedidoCliente": "OC-5", "etapaActual": "POST_SELLADO_K2" }
    ]))
    .await;

    store.ensure_initialized().await.unwrap();

    assert!(store.error().is_none());
    assert_eq!(store.total(), 5);
    let first = store.get(&"1".into()).unwrap();
    assert_eq!(first.stage, Stage::Preparacion);
    assert_eq!(first.meters, Some(1500.0));

    let phases: Vec<StagePhase> = store.snapshot().iter().map(|o| o.stage.phase()).collect();
    assert_eq!(
        phases,
        vec![
            StagePhase::Preparation,
            StagePhase::Printing,
            StagePhase::PostPress,
            StagePhase::PostPress,
            StagePhase::Unknown,
        ]
    );
}

#[tokio::test]
async fn test_enveloped_list_keeps_unknown_stage_verbatim() {
    let (_server, store) = order_store(json!({
        "data": [{ "id": "p7", "etapaActual": "POST_SELLADO_K2" }]
    }))
    .await;

    store.ensure_initialized().await.unwrap();

    let order = store.get(&"p7".into()).unwrap();
    let echoed = serde_json::to_value(order.as_ref()).unwrap();
    assert_eq!(echoed["etapaActual"], "POST_SELLADO_K2");
}
