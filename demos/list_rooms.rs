use std::time::Duration;

use sparkapi_http::{Args, Session};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut session = Session::from_env()?
        .with_ratelimit_policy(|wait: Duration| {
            eprintln!("throttled, waiting {}s", wait.as_secs());
            wait <= Duration::from_secs(120)
        });

    let mut rooms = session.get_items("rooms", &["type", "max"], Args::new().set("type", "group"))?;
    while let Some(room) = rooms.next_item().await? {
        println!("{} {}", room["id"], room["title"]);
    }

    let me = session.get("people/me", &[], ()).await?;
    println!("signed in as {}", me["displayName"]);

    Ok(())
}
