//! Serve the line protocol over any async reader/writer pair (stdin/stdout in the binary).

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use super::protocol::{handle_line, WireResponse};
use crate::router::Shell;

/// Read frames until EOF, answering each on `writer`. Blank lines are skipped; a line
/// that is not valid UTF-8 is answered with an error frame and the loop carries on.
pub async fn serve<R, W>(shell: &Shell, mut reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .await
            .context("reading request frame")?;
        if n == 0 {
            break;
        }
        let res = match std::str::from_utf8(&buf) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                handle_line(shell, line).await
            }
            Err(e) => {
                log::warn!("transport: dropping non-UTF-8 frame: {}", e);
                WireResponse::err("", format!("invalid frame: {}", e))
            }
        };
        write_frame(&mut writer, &res).await?;
    }
    log::debug!("transport: input closed");
    Ok(())
}

async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, res: &WireResponse) -> Result<()> {
    let mut out = serde_json::to_string(res).context("encoding response frame")?;
    out.push('\n');
    writer
        .write_all(out.as_bytes())
        .await
        .context("writing response frame")?;
    writer.flush().await.context("flushing response frame")
}

/// Serve stdin/stdout until EOF or Ctrl+C.
pub async fn serve_stdio(shell: &Shell) -> Result<()> {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();

    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        res = serve(shell, stdin, stdout) => res,
        _ = ctrl_c => {
            log::info!("shutdown signal received, stopping transport");
            Ok(())
        }
    }
}
