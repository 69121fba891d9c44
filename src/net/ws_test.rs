use super::*;

#[test]
fn http_urls_map_to_websocket_schemes() {
    assert_eq!(to_websocket_url("https://boards.example.com/graphql"), "wss://boards.example.com/graphql");
    assert_eq!(to_websocket_url("http://localhost:3000/graphql"), "ws://localhost:3000/graphql");
}

#[test]
fn websocket_urls_pass_through_unchanged() {
    assert_eq!(to_websocket_url("wss://boards.example.com/graphql"), "wss://boards.example.com/graphql");
    assert_eq!(to_websocket_url("ws://localhost:3000/graphql"), "ws://localhost:3000/graphql");
}

#[tokio::test]
async fn connector_rejects_unparseable_url() {
    let connector = WsConnector::new("not a uri at all");
    let result = connector.connect().await;
    assert!(matches!(result, Err(StreamError::Connect(_))));
}
