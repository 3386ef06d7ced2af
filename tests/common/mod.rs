use doclink::{DocLinkClient, MemoryStore, WriteOptions};
use serde_json::json;

#[allow(dead_code)]
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Client over a fresh in-memory store, with the store handle kept for
/// white-box assertions. Seeds four users.
#[allow(dead_code)]
pub async fn seeded_client() -> (DocLinkClient, MemoryStore) {
    let store = MemoryStore::new();
    let client = DocLinkClient::builder()
        .store(store.clone())
        .build()
        .expect("store supplied");
    let users = client.collection("users");
    for (id, age, cuisine) in [
        ("a", 30, "ramen"),
        ("b", 25, "sushi"),
        ("c", 35, "pho"),
        ("d", 25, "ramen"),
    ] {
        users
            .add(
                json!({
                    "id": id,
                    "age": age,
                    "favFoods": {"asian": cuisine},
                }),
                WriteOptions::default(),
            )
            .await
            .expect("seed write");
    }
    (client, store)
}
