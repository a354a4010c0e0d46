//! Concurrent resolution against one shared resolver.

use std::sync::Arc;
use std::thread;

use delphi_core::ApiInterface;
use delphi_oas3::{fixtures, Oas3Api, ResolverConfig};
use http::{HeaderMap, HeaderValue};

fn shared_api() -> Arc<Oas3Api> {
    Arc::new(Oas3Api::new(fixtures::pet_store().unwrap(), ResolverConfig::default()).unwrap())
}

#[test]
fn test_threads_see_only_their_own_requests() {
    let api = shared_api();

    thread::scope(|scope| {
        for worker in 1..=8_i64 {
            let api = Arc::clone(&api);
            scope.spawn(move || {
                for round in 0..50_i64 {
                    let pet_id = worker * 1000 + round;
                    let resolved = api
                        .resolve("GET", &format!("/v1/pets/{pet_id}"), &HeaderMap::new())
                        .into_resolved()
                        .unwrap();
                    let parsed = resolved.parse_parameters().unwrap();
                    assert_eq!(parsed.path["petId"], pet_id);
                }
            });
        }
    });
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_tasks_share_one_resolver() {
    let api = shared_api();

    let tasks: Vec<_> = (0..16)
        .map(|worker| {
            let api = Arc::clone(&api);
            tokio::spawn(async move {
                let mut headers = HeaderMap::new();
                let session = format!("session-{worker:04}");
                headers.insert("cookie", HeaderValue::from_str(&format!("session={session}")).unwrap());

                let resolved = api.resolve("GET", "/v1/pets/mine", &headers).into_resolved().unwrap();
                let parsed = resolved.parse_parameters().unwrap();
                assert!(resolved.validate_parameters(&parsed).is_none());
                (session, parsed.cookie["session"].clone())
            })
        })
        .collect();

    for task in tasks {
        let (sent, received) = task.await.unwrap();
        assert_eq!(received, sent);
    }
}
