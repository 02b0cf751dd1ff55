use std::sync::Arc;

use perch_irc::{Event, Session};

use crate::router::Router;

/// Connects to one server and answers commands until the connection ends.
pub async fn run_client(config: perch_irc::Config, router: Arc<Router>) -> anyhow::Result<()> {
    let server_name = config.server_name.clone();

    let (session, handle, mut events) = Session::connect(config).await?;
    let session = tokio::spawn(session.run());

    while let Some(event) = events.recv().await {
        match event {
            Event::Connected { nickname } => {
                log::info!("{server_name}: connected as {nickname}");
            }

            Event::Privmsg(msg) => {
                let Some(reply) = router.dispatch(&server_name, &msg).await else {
                    continue;
                };
                if let Err(err) = handle.reply(&msg, &reply) {
                    log::warn!("{server_name}: cannot reply to {}: {err}", msg.sender);
                }
            }

            Event::NickExhausted { nickname } => {
                log::error!("{server_name}: no free nickname (last tried {nickname})");
                let _ = handle.quit(Some("no free nickname"));
            }

            Event::Disconnected => break,

            Event::Frame(..) | Event::RawSent(..) => {}
        }
    }

    session.await??;
    log::info!("{server_name}: disconnected");
    Ok(())
}
