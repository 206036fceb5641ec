mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::json;
use sqlx::SqlitePool;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use common::{FailingMailer, RecordingMailer};

async fn token_for(db_pool: &SqlitePool, user_id: Uuid) -> String {
    let (token,): (String,) = sqlx::query_as("SELECT token FROM mod_invitations WHERE user_id=?")
        .bind(user_id)
        .fetch_one(db_pool)
        .await
        .unwrap();
    token
}

#[tokio::test]
async fn adding_grants_access_and_mails_the_invitee() {
    let t = common::spawn().await;
    let ada = t.user("ada").await;
    let bob = t.user("bob").await;
    let ada_cookie = t.login(&ada).await;
    let bob_cookie = t.login(&bob).await;
    let slug = t.new_mod(&ada_cookie, "Lanterns", "private").await;

    let reply = t.post(&format!("/mods/{slug}/collaborators"), &ada_cookie, json!({ "username": "bob", "role": "editor" })).await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.text());
    assert_eq!(reply.json()["message"], "Invitation sent to bob!");
    assert_eq!(reply.json()["email_sent"], true);

    {
        let sent = t.mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to_email, "bob@example.com");
        assert!(sent[0].invite_url.contains("/invitations/"));
    }

    let reply = t.get(&format!("/mods/{slug}"), Some(&bob_cookie)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["user_role"], "editor");
    assert_eq!(reply.json()["can_edit"], true);

    let listing = t.get(&format!("/mods/{slug}/collaborators"), Some(&ada_cookie)).await.json();
    assert_eq!(listing["collaborators"][0]["username"], "bob");
    assert_eq!(listing["collaborators"][0]["role"], "editor");

    let reply = t.post(&format!("/mods/{slug}/collaborators"), &ada_cookie, json!({ "username": "bob", "role": "viewer" })).await;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(reply.json()["errors"]["username"][0], "User is already a collaborator.");
}

#[tokio::test]
async fn add_validates_the_target() {
    let t = common::spawn().await;
    let ada = t.user("ada").await;
    let cookie = t.login(&ada).await;
    let slug = t.new_mod(&cookie, "Lanterns", "public").await;

    let reply = t.post(&format!("/mods/{slug}/collaborators"), &cookie, json!({ "username": "nobody", "role": "editor" })).await;
    assert_eq!(reply.json()["errors"]["username"][0], "User not found.");

    let reply = t.post(&format!("/mods/{slug}/collaborators"), &cookie, json!({ "username": "ada", "role": "editor" })).await;
    assert_eq!(reply.json()["errors"]["username"][0], "Owner cannot be added as collaborator.");

    let reply = t.post(&format!("/mods/{slug}/collaborators"), &cookie, json!({ "username": "ada", "role": "owner" })).await;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(reply.json()["errors"]["role"].is_array());
}

#[tokio::test]
async fn failed_mail_still_adds_the_collaborator() {
    let t = common::spawn_with(Arc::new(FailingMailer), Arc::new(RecordingMailer::default()), 1024).await;
    let ada = t.user("ada").await;
    t.user("bob").await;
    let cookie = t.login(&ada).await;
    let slug = t.new_mod(&cookie, "Lanterns", "public").await;

    let reply = t.post(&format!("/mods/{slug}/collaborators"), &cookie, json!({ "username": "bob@example.com", "role": "viewer" })).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["message"], "Collaborator added successfully! (Email notification failed to send)");
    assert_eq!(reply.json()["email_sent"], false);

    let listing = t.get(&format!("/mods/{slug}/collaborators"), Some(&cookie)).await.json();
    assert_eq!(listing["collaborators"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn accepting_is_idempotent() {
    let t = common::spawn().await;
    let ada = t.user("ada").await;
    let bob = t.user("bob").await;
    let eve = t.user("eve").await;
    let ada_cookie = t.login(&ada).await;
    let bob_cookie = t.login(&bob).await;
    let eve_cookie = t.login(&eve).await;
    let slug = t.new_mod(&ada_cookie, "Lanterns", "private").await;
    t.post(&format!("/mods/{slug}/collaborators"), &ada_cookie, json!({ "username": "bob", "role": "editor" })).await;
    let token = token_for(&t.db_pool, bob.id).await;

    let reply = t.get(&format!("/invitations/{token}"), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["status"], "pending");
    assert_eq!(reply.json()["needs_login"], true);
    assert_eq!(reply.json()["mod"]["slug"], slug.as_str());

    let reply = t.call(axum::http::Method::POST, &format!("/invitations/{token}/accept"), None, None).await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);

    let accept = format!("/invitations/{token}/accept");
    assert_eq!(t.post(&accept, &eve_cookie, json!({})).await.status, StatusCode::FORBIDDEN);

    let reply = t.post(&accept, &bob_cookie, json!({})).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["message"], "Welcome to Lanterns! You are now a editor.");

    let reply = t.post(&accept, &bob_cookie, json!({})).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["message"], "You are already a collaborator on this mod!");

    assert_eq!(t.get(&format!("/invitations/{token}"), Some(&bob_cookie)).await.json()["status"], "accepted");
    assert_eq!(t.post("/invitations/nope/accept", &bob_cookie, json!({})).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn expired_invitations_are_gone() {
    let t = common::spawn().await;
    let ada = t.user("ada").await;
    let bob = t.user("bob").await;
    let ada_cookie = t.login(&ada).await;
    let bob_cookie = t.login(&bob).await;
    let slug = t.new_mod(&ada_cookie, "Lanterns", "public").await;
    t.post(&format!("/mods/{slug}/collaborators"), &ada_cookie, json!({ "username": "bob", "role": "viewer" })).await;

    sqlx::query("UPDATE mod_invitations SET expires_at=? WHERE user_id=?")
        .bind(OffsetDateTime::now_utc() - Duration::days(1))
        .bind(bob.id)
        .execute(&t.db_pool)
        .await
        .unwrap();
    let token = token_for(&t.db_pool, bob.id).await;

    assert_eq!(t.get(&format!("/invitations/{token}"), None).await.json()["status"], "expired");
    let reply = t.post(&format!("/invitations/{token}/accept"), &bob_cookie, json!({})).await;
    assert_eq!(reply.status, StatusCode::GONE);
}

#[tokio::test]
async fn role_rules() {
    let t = common::spawn().await;
    let ada = t.user("ada").await;
    let bob = t.user("bob").await;
    let cat = t.user("cat").await;
    let ada_cookie = t.login(&ada).await;
    let bob_cookie = t.login(&bob).await;
    let cat_cookie = t.login(&cat).await;
    let slug = t.new_mod(&ada_cookie, "Lanterns", "public").await;
    let members = format!("/mods/{slug}/collaborators");

    t.post(&members, &ada_cookie, json!({ "username": "bob", "role": "admin" })).await;
    t.post(&members, &ada_cookie, json!({ "username": "cat", "role": "editor" })).await;

    // Editors manage nobody, not even fellow editors.
    assert_eq!(t.delete(&format!("{members}/{}", bob.id), &cat_cookie).await.status, StatusCode::FORBIDDEN);
    assert_eq!(t.patch(&format!("{members}/{}", bob.id), &cat_cookie, json!({ "role": "viewer" })).await.status, StatusCode::FORBIDDEN);

    // Admins manage editors but cannot hand out admin or touch the owner.
    assert_eq!(t.patch(&format!("{members}/{}", cat.id), &bob_cookie, json!({ "role": "admin" })).await.status, StatusCode::FORBIDDEN);
    assert_eq!(t.delete(&format!("{members}/{}", ada.id), &bob_cookie).await.status, StatusCode::FORBIDDEN);
    let reply = t.patch(&format!("{members}/{}", cat.id), &bob_cookie, json!({ "role": "viewer" })).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["role"], "viewer");

    // Anyone may leave.
    let reply = t.delete(&format!("{members}/{}", cat.id), &cat_cookie).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["message"], "You have left the mod successfully!");

    // The owner cannot leave their own mod.
    assert_eq!(t.delete(&format!("{members}/{}", ada.id), &ada_cookie).await.status, StatusCode::FORBIDDEN);
    assert_eq!(t.get(&format!("/mods/{slug}"), Some(&ada_cookie)).await.json()["user_role"], "owner");

    let reply = t.delete(&format!("{members}/{}", bob.id), &ada_cookie).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["message"], "Collaborator removed successfully!");
    let (invitations,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM mod_invitations").fetch_one(&t.db_pool).await.unwrap();
    assert_eq!(invitations, 0);
}
