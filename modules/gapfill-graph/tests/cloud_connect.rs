//! Smoke test: connect to a live Neo4j via bolt://.
//! Run with: cargo test -p gapfill-graph --test cloud_connect -- --ignored

use gapfill_common::{Credentials, GraphSettings};
use gapfill_graph::GraphClient;

#[tokio::test]
#[ignore] // requires live Neo4j credentials
async fn cloud_connect() {
    let settings = GraphSettings {
        uri: std::env::var("NEO4J_URI").expect("NEO4J_URI required"),
        user: std::env::var("NEO4J_USER").expect("NEO4J_USER required"),
        ..GraphSettings::default()
    };
    let credentials = Credentials::from_env().expect("NEO4J_PASSWORD required");

    let client = GraphClient::connect(&settings, &credentials)
        .await
        .expect("Failed to connect");
    client.ping().await.expect("ping");
}
