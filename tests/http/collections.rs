use warp::hyper::{Client, Method, StatusCode};

use super::*;

#[tokio::test]
async fn test_http_server_reader_writer() {
    let (addr, server, terminate) = make_http_server().await;

    tokio::task::spawn(server);
    let client = Client::new();
    let collections = format!("http://{addr}/collections");
    let articles_uri = format!("http://{addr}/collections/articles");

    // Create as an anonymous user
    let resp = send(&client, Method::POST, &collections, Some(articles()), None).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(response_json(resp).await["error"]["code"], "FORBIDDEN");

    // Same, wrong token
    let resp = send(
        &client,
        Method::POST,
        &collections,
        Some(articles()),
        Some("wrongpw"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response_json(resp).await["error"]["code"], "WRONG_PASSWORD");

    // Perform a write correctly
    let resp = send(
        &client,
        Method::POST,
        &collections,
        Some(articles()),
        Some("write_password"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        response_json(resp).await,
        json!({"data": {
            "collection": "articles",
            "note": "Blog posts",
            "fields": [{
                "field": "id",
                "datatype": "integer",
                "note": "pk",
                "primary_key": true,
                "auto_increment": false
            }]
        }})
    );

    // Again: conflict
    let resp = send(
        &client,
        Method::POST,
        &collections,
        Some(articles()),
        Some("write_password"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(
        response_json(resp).await["error"]["code"],
        "COLLECTION_ALREADY_EXISTS"
    );

    // Anonymous reads are fine
    let resp = send(&client, Method::GET, &collections, None, None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let listed = response_json(resp).await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);
    assert_eq!(listed["data"][0]["collection"], "articles");

    let resp = send(&client, Method::GET, &articles_uri, None, None).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // Anonymous deletes aren't
    let resp = send(&client, Method::DELETE, &articles_uri, None, None).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = send(
        &client,
        Method::DELETE,
        &articles_uri,
        None,
        Some("write_password"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = send(&client, Method::GET, &articles_uri, None, None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        response_json(resp).await["error"]["code"],
        "COLLECTION_NOT_FOUND"
    );

    terminate.send(()).unwrap();
}

#[tokio::test]
async fn test_http_server_percent_encoded_name() {
    let (addr, server, terminate) = make_http_server().await;

    tokio::task::spawn(server);
    let client = Client::new();

    let resp = send(
        &client,
        Method::POST,
        &format!("http://{addr}/collections"),
        Some(json!({
            "collection": "Line_Items",
            "fields": [{"field": "sku", "datatype": "string", "note": "Stock keeping unit"}]
        })),
        Some("write_password"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    // %5F is "_"
    let resp = send(
        &client,
        Method::GET,
        &format!("http://{addr}/collections/Line%5FItems"),
        None,
        None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(response_json(resp).await["data"]["collection"], "Line_Items");

    terminate.send(()).unwrap();
}
