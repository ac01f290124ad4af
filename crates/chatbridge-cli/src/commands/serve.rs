//! `serve` command: the controller end of the pipe.
//!
//! Each session waits for the plugin to connect, prints every status line it
//! sends, and forwards queued requests. Requests typed while no client is
//! connected are held until the next session.

use anyhow::Result;

#[cfg(target_os = "windows")]
pub async fn run(pipe: &str, messages: Vec<String>) -> Result<()> {
    use anyhow::Context;
    use chatbridge_core::channel::protocol::{encode_request, pipe_path};
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::windows::named_pipe::ServerOptions;
    use tokio::sync::mpsc;
    use tracing::{debug, info};

    let path = pipe_path(pipe);
    let (requests_tx, mut requests) = mpsc::unbounded_channel::<String>();

    for message in messages {
        let _ = requests_tx.send(encode_request(&message));
    }
    tokio::spawn(async move {
        let mut stdin = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = stdin.next_line().await {
            if requests_tx.send(encode_request(&line)).is_err() {
                break;
            }
        }
    });

    let mut first = true;
    loop {
        let server = ServerOptions::new()
            .first_pipe_instance(first)
            .create(&path)
            .with_context(|| format!("failed to create pipe {}", path))?;
        first = false;

        info!("Waiting for client on {}", path);
        tokio::select! {
            connected = server.connect() => connected.context("pipe connect failed")?,
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }
        info!("Client connected");

        let (reader, mut writer) = tokio::io::split(server);
        let mut lines = BufReader::new(reader).lines();

        loop {
            tokio::select! {
                line = lines.next_line() => match line {
                    Ok(Some(line)) => println!("{}", line.trim_end_matches('\r')),
                    Ok(None) => break,
                    Err(e) => {
                        debug!("Read failed: {}", e);
                        break;
                    }
                },
                Some(request) = requests.recv() => {
                    let line = format!("{}\n", request);
                    if let Err(e) = writer.write_all(line.as_bytes()).await {
                        debug!("Write failed: {}", e);
                        break;
                    }
                }
                _ = tokio::signal::ctrl_c() => return Ok(()),
            }
        }
        info!("Client disconnected");
    }
}

#[cfg(not(target_os = "windows"))]
pub async fn run(_pipe: &str, _messages: Vec<String>) -> Result<()> {
    anyhow::bail!("serve requires Windows named pipes")
}
