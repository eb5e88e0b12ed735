use std::time::Duration;

use sparkapi_http::{Args, Session, SparkError};

fn live_session() -> Option<Session> {
    match Session::from_env() {
        Ok(session) => Some(session),
        Err(SparkError::Config(reason)) => {
            eprintln!("skipping live test: {reason}");
            None
        }
        Err(err) => panic!("unexpected error building live session: {err}"),
    }
}

#[tokio::test]
async fn live_me_and_paginated_rooms() {
    let Some(session) = live_session() else {
        return;
    };
    // Decline waits longer than a minute rather than stall the test run.
    let mut session = session.with_ratelimit_policy(|wait: Duration| wait <= Duration::from_secs(60));

    let me = session
        .get("people/me", &[], ())
        .await
        .expect("people/me must succeed");
    assert!(me.get("id").is_some());

    let mut rooms = session
        .get_items("rooms", &["max"], Args::new().set("max", 2))
        .expect("arguments are valid");
    let mut seen = 0usize;
    while let Some(room) = rooms.next_item().await.expect("room listing must succeed") {
        assert!(room.get("id").is_some());
        seen += 1;
        if seen >= 5 {
            break;
        }
    }
}
