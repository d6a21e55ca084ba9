//! Catalog paging against a mock API server.

use std::sync::Arc;

use mark8_core::api::ApiClient;
use mark8_core::auth::CredentialStore;
use mark8_core::catalog::{ProductFeed, StoreDirectory};
use mockito::{Matcher, Server};

fn products_body(ids: &[&str], current_page: u32, total_pages: u32) -> String {
    let products: Vec<String> = ids
        .iter()
        .map(|id| format!(r#"{{"id":"{}","name":"Item {}","unitPrice":1000}}"#, id, id))
        .collect();
    format!(
        r#"{{"status":200,"message":"ok","data":{{"products":[{}],"pagination":{{"totalPages":{},"recordsPerPage":9,"totalRecords":12,"currentPage":{}}}}}}}"#,
        products.join(","),
        total_pages,
        current_page
    )
}

fn api(url: &str) -> ApiClient {
    ApiClient::new(url, Arc::new(CredentialStore::in_memory())).unwrap()
}

#[tokio::test]
async fn product_feed_loads_more_until_last_page() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/products")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("pageNumber".into(), "1".into()),
            Matcher::UrlEncoded("recordsPerPage".into(), "9".into()),
        ]))
        .with_status(200)
        .with_body(products_body(&["1", "2"], 1, 2))
        .expect(1)
        .create_async()
        .await;
    server
        .mock("GET", "/products")
        .match_query(Matcher::UrlEncoded("pageNumber".into(), "2".into()))
        .with_status(200)
        .with_body(products_body(&["3"], 2, 2))
        .expect(1)
        .create_async()
        .await;

    let api = api(&server.url());
    let mut feed = ProductFeed::new();
    feed.fetch(&api).await.unwrap();
    assert_eq!(feed.products().len(), 2);
    assert!(feed.has_next_page());

    assert!(feed.load_more(&api).await.unwrap());
    assert_eq!(feed.products().len(), 3);
    assert_eq!(feed.current_page(), 2);
    assert!(!feed.has_next_page());

    // Nothing left, so no request is made
    assert!(!feed.load_more(&api).await.unwrap());
    assert_eq!(feed.total_products(), 12);
}

#[tokio::test]
async fn product_search_sends_name_and_category() {
    let mut server = Server::new_async().await;
    let search = server
        .mock("GET", "/products")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("name".into(), "kitenge".into()),
            Matcher::UrlEncoded("category".into(), "Fashion".into()),
            Matcher::UrlEncoded("pageNumber".into(), "1".into()),
        ]))
        .with_status(200)
        .with_body(products_body(&["7"], 1, 1))
        .expect(1)
        .create_async()
        .await;

    let api = api(&server.url());
    let mut feed = ProductFeed::new();
    feed.set_category("Fashion");
    feed.search(&api, "kitenge").await.unwrap();

    assert_eq!(feed.products()[0].id, "7");
    search.assert_async().await;
}

#[tokio::test]
async fn failed_load_more_keeps_page() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/products")
        .match_query(Matcher::UrlEncoded("pageNumber".into(), "1".into()))
        .with_status(200)
        .with_body(products_body(&["1"], 1, 3))
        .create_async()
        .await;
    server
        .mock("GET", "/products")
        .match_query(Matcher::UrlEncoded("pageNumber".into(), "2".into()))
        .with_status(500)
        .create_async()
        .await;

    let api = api(&server.url());
    let mut feed = ProductFeed::new();
    feed.fetch(&api).await.unwrap();

    assert!(feed.load_more(&api).await.is_err());
    assert_eq!(feed.current_page(), 1);
    assert_eq!(feed.products().len(), 1);
    assert!(feed.last_error().is_some());
}

#[tokio::test]
async fn store_directory_search_replaces_results() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/store")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("name".into(), "pottery".into()),
            Matcher::UrlEncoded("sortBy".into(), "createdAt".into()),
            Matcher::UrlEncoded("sortOrder".into(), "DESC".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"status":200,"message":"ok","data":{"stores":[{"id":"s-1","name":"Huye Pottery","numberOfProducts":4,"image":"https://cdn/s1.png"}]}}"#)
        .expect(1)
        .create_async()
        .await;

    let api = api(&server.url());
    let mut directory = StoreDirectory::new();
    directory.search(&api, "pottery").await.unwrap();

    assert_eq!(directory.total_stores(), 1);
    assert!(!directory.has_more());
    assert_eq!(directory.stores()[0].logo_url.as_deref(), Some("https://cdn/s1.png"));
    assert!(!directory.load_more(&api).await.unwrap());
}
