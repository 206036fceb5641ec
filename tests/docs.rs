mod common;

use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn public_docs_render_markdown() {
    let t = common::spawn().await;
    let ada = t.user("ada").await;
    let cookie = t.login(&ada).await;
    let slug = t.new_mod(&cookie, "Lanterns & Oil", "public").await;

    let guide = t
        .new_page(&cookie, &slug, json!({ "title": "Guide", "content": "Welcome **home**", "is_index": true }))
        .await;
    t.new_page(&cookie, &slug, json!({ "title": "Install", "content": "Run it <script>x()</script>", "parent_id": guide["id"] }))
        .await;
    t.new_page(&cookie, &slug, json!({ "title": "Draft", "published": false })).await;

    let reply = t.get(&format!("/docs/{slug}"), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    let html = reply.text();
    assert!(html.contains("Lanterns &amp; Oil"));
    assert!(html.contains("<strong>home</strong>"));
    assert!(html.contains(&format!("/docs/{slug}/install")));
    assert!(!html.contains("Draft"));

    let reply = t.get(&format!("/docs/{slug}/install"), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    let html = reply.text();
    assert!(html.contains(&format!(r#"<a href="/docs/{slug}/guide">Guide</a>"#)));
    assert!(html.contains("&lt;script&gt;"));
    assert!(!html.contains("<script>"));

    assert_eq!(t.get(&format!("/docs/{slug}/draft"), None).await.status, StatusCode::NOT_FOUND);
    assert_eq!(t.get(&format!("/docs/{slug}/missing"), None).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn private_docs_look_missing() {
    let t = common::spawn().await;
    let ada = t.user("ada").await;
    let bob = t.user("bob").await;
    let ada_cookie = t.login(&ada).await;
    let bob_cookie = t.login(&bob).await;
    let slug = t.new_mod(&ada_cookie, "Secret", "unlisted").await;
    t.new_page(&ada_cookie, &slug, json!({ "title": "Plans" })).await;

    let reply = t.get(&format!("/docs/{slug}"), Some(&bob_cookie)).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert!(reply.text().contains("Sorry"));
    assert_eq!(t.get(&format!("/docs/{slug}/plans"), None).await.status, StatusCode::NOT_FOUND);
    assert_eq!(t.get("/docs/no-such-mod", None).await.status, StatusCode::NOT_FOUND);

    assert_eq!(t.get(&format!("/docs/{slug}"), Some(&ada_cookie)).await.status, StatusCode::OK);
}
