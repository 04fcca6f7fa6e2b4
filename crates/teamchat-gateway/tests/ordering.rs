//! Delivery ordering and typing exclusion
//!
//! Run with: cargo test -p teamchat-gateway --test ordering

mod common;

use std::time::Duration;

use common::TestGateway;
use serde_json::json;

#[tokio::test]
async fn test_room_events_arrive_in_send_order() {
    let gw = TestGateway::start();
    let u = gw.user("u").await;
    let v = gw.user("v").await;
    let x = gw.user("x").await;
    let w = gw.workspace(&[&u, &v, &x]).await;
    let c = gw.channel(w, &[&u, &v, &x]).await;

    let mut uc = gw.login(&u).await;
    let mut vc = gw.login(&v).await;
    let mut xc = gw.login(&x).await;
    uc.drain().await;
    vc.drain().await;
    xc.drain().await;

    for i in 0..20 {
        vc.send("send_message", json!({ "channelId": c, "content": format!("m{i}") }))
            .await;
    }

    for client in [&mut uc, &mut xc] {
        for i in 0..20 {
            let frame = client.expect("new_message").await;
            assert_eq!(frame.data["message"]["content"], format!("m{i}"));
        }
    }
}

#[tokio::test]
async fn test_edit_follows_create_for_every_subscriber() {
    let gw = TestGateway::start();
    let u = gw.user("u").await;
    let v = gw.user("v").await;
    let w = gw.workspace(&[&u, &v]).await;
    let c = gw.channel(w, &[&u, &v]).await;

    let mut uc = gw.login(&u).await;
    let mut vc = gw.login(&v).await;
    uc.drain().await;
    vc.drain().await;

    vc.send("send_message", json!({ "channelId": c, "content": "draft" }))
        .await;
    let id = vc.expect("new_message").await.data["message"]["id"].clone();
    vc.send("edit_message", json!({ "messageId": id, "content": "final" }))
        .await;
    vc.send("delete_message", json!({ "messageId": id })).await;

    let events: Vec<_> = [
        uc.recv().await.event,
        uc.recv().await.event,
        uc.recv().await.event,
    ]
    .into();
    assert_eq!(events, ["new_message", "message_edited", "message_deleted"]);
}

#[tokio::test]
async fn test_typing_excludes_all_of_senders_connections() {
    let gw = TestGateway::start();
    let u = gw.user("u").await;
    let v = gw.user("v").await;
    let w = gw.workspace(&[&u, &v]).await;
    let c = gw.channel(w, &[&u, &v]).await;

    let mut tab1 = gw.login(&u).await;
    let mut tab2 = gw.login(&u).await;
    let mut vc = gw.login(&v).await;
    tab1.drain().await;
    tab2.drain().await;
    vc.drain().await;

    tab1.send("typing_start", json!({ "channelId": c })).await;

    let typing = vc.expect("user_typing").await;
    assert_eq!(typing.data["userId"], json!(u.id));
    assert_eq!(typing.data["username"], "u");
    assert_eq!(typing.data["fullName"], "u tester");

    tab1.expect_silence().await;
    tab2.expect_silence().await;

    tab1.send("typing_stop", json!(c)).await;
    vc.expect("user_stopped_typing").await;
    tab1.expect_silence().await;
    tab2.expect_silence().await;
}

#[tokio::test(start_paused = true)]
async fn test_repeated_typing_resets_auto_clear() {
    let gw = TestGateway::start();
    let u = gw.user("u").await;
    let v = gw.user("v").await;
    let w = gw.workspace(&[&u, &v]).await;
    let c = gw.channel(w, &[&u, &v]).await;

    let mut uc = gw.login(&u).await;
    let mut vc = gw.login(&v).await;
    uc.drain().await;
    vc.drain().await;

    // typing timeout is 300ms in the test config
    uc.send("typing_start", json!(c)).await;
    vc.expect("user_typing").await;

    tokio::time::sleep(Duration::from_millis(200)).await;
    uc.send("typing_start", json!(c)).await;
    vc.expect("user_typing").await;

    tokio::time::sleep(Duration::from_millis(200)).await;
    vc.expect_silence().await;

    tokio::time::sleep(Duration::from_millis(150)).await;
    let stopped = vc.expect("user_stopped_typing").await;
    assert_eq!(stopped.data["userId"], json!(u.id));
    assert_eq!(gw.stats().await.timers, 0);
}

#[tokio::test]
async fn test_typing_in_unjoined_channel_is_dropped() {
    let gw = TestGateway::start();
    let u = gw.user("u").await;
    let v = gw.user("v").await;
    let w = gw.workspace(&[&u, &v]).await;
    let c = gw.channel(w, &[&v]).await;

    let mut uc = gw.login(&u).await;
    let mut vc = gw.login(&v).await;
    uc.drain().await;
    vc.drain().await;

    uc.send("typing_start", json!(c)).await;

    uc.expect_silence().await;
    vc.expect_silence().await;
}
