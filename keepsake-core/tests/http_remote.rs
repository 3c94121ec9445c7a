use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use keepsake_contracts::{LibraryError, RemoteLibrary};
use keepsake_core::{
    infra::{
        cache::InMemoryMemoryCache,
        connectivity::{ConnectivitySignal, probe_once, spawn_probe},
        remote::HttpRemoteLibrary,
        settings::InMemorySettingsStore,
    },
    memories::{MemoryOrchestrator, MixedMediaSelector},
};
use keepsake_model::{ContentSource, InlinePayload, OwnerId};
use serde_json::json;
use url::Url;

async fn list_media(
    State(base): State<Arc<String>>,
    Path(owner): Path<String>,
) -> Response {
    match owner.as_str() {
        "denied" => StatusCode::FORBIDDEN.into_response(),
        "expired" => StatusCode::UNAUTHORIZED.into_response(),
        "overloaded" => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        "teapot" => StatusCode::IM_A_TEAPOT.into_response(),
        _ => Json(json!([
            {
                "id": "inline-1",
                "fileName": "tiny.png",
                "fileType": "image/png",
                "fileSize": 5,
                "uploadedAt": "2023-08-14T17:03:00Z",
                "inlineData": InlinePayload::encode(b"tiny!").as_str(),
                "userId": owner,
            },
            {
                "id": "remote-1",
                "fileName": "beach.jpg",
                "fileType": "image/jpeg",
                "fileSize": 11,
                "uploadedAt": "2023-08-15T09:00:00Z",
                "downloadUrl": "files/beach.jpg",
                "userId": owner,
            },
            {
                "id": "remote-2",
                "fileName": "clip.mp4",
                "fileType": "video/mp4",
                "fileSize": 10,
                "uploadedAt": "2023-08-16T09:00:00Z",
                "downloadUrl": format!("{base}files/clip.mp4"),
                "userId": owner,
            },
            {
                "id": "no-source",
                "fileName": "ghost.jpg",
                "fileType": "image/jpeg",
                "fileSize": 1,
                "uploadedAt": "2023-08-17T09:00:00Z",
                "userId": owner,
            },
            { "unexpected": true },
        ]))
        .into_response(),
    }
}

async fn file(Path(name): Path<String>) -> Response {
    match name.as_str() {
        "beach.jpg" => b"beach-bytes".to_vec().into_response(),
        "clip.mp4" => b"clip-bytes".to_vec().into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn serve() -> (Url, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let base = format!("http://{addr}/");

    let app = Router::new()
        .route("/v1/owners/{owner}/media", get(list_media))
        .route("/files/{name}", get(file))
        .with_state(Arc::new(base.clone()));
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (base.parse().unwrap(), handle)
}

fn client_for(base: Url) -> HttpRemoteLibrary {
    HttpRemoteLibrary::new(base, Duration::from_secs(5)).unwrap()
}

fn owner(id: &str) -> OwnerId {
    OwnerId::new(id).unwrap()
}

#[tokio::test]
async fn lists_media_and_skips_malformed_entries() {
    let (base, _server) = serve().await;
    let library = client_for(base);

    let items = library.list_media(&owner("alice")).await.unwrap();

    let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, ["inline-1", "remote-1", "remote-2"]);
    assert!(matches!(items[0].source, ContentSource::Inline(_)));
    assert!(items[2].is_video());
    assert_eq!(items[1].owner_id, owner("alice"));
}

#[tokio::test]
async fn resolves_inline_relative_and_absolute_sources() {
    let (base, _server) = serve().await;
    let library = client_for(base);
    let items = library.list_media(&owner("alice")).await.unwrap();

    assert_eq!(library.resolve_bytes(&items[0]).await.unwrap(), b"tiny!");
    assert_eq!(library.resolve_bytes(&items[1]).await.unwrap(), b"beach-bytes");
    assert_eq!(library.resolve_bytes(&items[2]).await.unwrap(), b"clip-bytes");
}

#[tokio::test]
async fn missing_file_is_a_resolution_error() {
    let (base, _server) = serve().await;
    let library = client_for(base);
    let mut item = library.list_media(&owner("alice")).await.unwrap().remove(1);
    item.source = ContentSource::Remote("files/gone.jpg".into());

    let err = library.resolve_bytes(&item).await.unwrap_err();
    let LibraryError::Resolution { id, reason } = err else {
        panic!("expected resolution error, got {err:?}");
    };
    assert_eq!(id.as_str(), "remote-1");
    assert!(reason.contains("404"), "{reason}");
}

#[tokio::test]
async fn status_codes_map_to_error_kinds() {
    let (base, _server) = serve().await;
    let library = client_for(base);

    let denied = library.list_media(&owner("denied")).await.unwrap_err();
    assert!(denied.is_permission_denied());
    let expired = library.list_media(&owner("expired")).await.unwrap_err();
    assert!(expired.is_permission_denied());
    assert!(matches!(
        library.list_media(&owner("overloaded")).await,
        Err(LibraryError::Connectivity(_))
    ));
    assert!(matches!(
        library.list_media(&owner("teapot")).await,
        Err(LibraryError::Remote(_))
    ));
}

#[tokio::test]
async fn unreachable_library_is_a_connectivity_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let library = client_for(format!("http://{addr}/").parse().unwrap());

    assert!(matches!(
        library.list_media(&owner("alice")).await,
        Err(LibraryError::Connectivity(_))
    ));
}

#[tokio::test]
async fn orchestrator_over_http_caches_the_fetched_batch() {
    let (base, _server) = serve().await;
    let cache = Arc::new(InMemoryMemoryCache::new());
    let orchestrator = MemoryOrchestrator::builder(
        Arc::new(client_for(base)),
        cache.clone(),
        Arc::new(InMemorySettingsStore::default()),
    )
    .owner(owner("alice"))
    .selector(Arc::new(MixedMediaSelector::seeded(3)))
    .build();

    let outcome = orchestrator.refetch_now(false).await;
    assert_eq!(outcome.state.memories().len(), 3);
    let report = outcome.write_through_report().await.unwrap();

    assert_eq!(report.cached.len(), 3);
    assert_eq!(cache.len().await, 3);
}

#[tokio::test]
async fn probe_marks_signal_online_when_server_answers() {
    let (base, _server) = serve().await;
    let signal = ConnectivitySignal::new(false);
    let mut watch = signal.watch();
    let client = reqwest::Client::new();

    assert!(probe_once(&client, &base).await);

    let probe = spawn_probe(
        signal.clone(),
        client,
        base,
        Duration::from_millis(20),
    );
    assert_eq!(watch.changed().await, Some(true));
    assert!(signal.is_online());

    drop(watch);
    tokio::time::timeout(Duration::from_secs(2), probe)
        .await
        .expect("probe stops without observers")
        .unwrap();
}
