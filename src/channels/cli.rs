//! CLI channel: stdin/stdout REPL for local testing.

use std::sync::Arc;

use futures::{Stream, StreamExt, stream};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::error;

use crate::graph::DispatchGraph;

const GENERIC_ERROR: &str = "Sorry, something went wrong handling that message.";

/// What to do with one input line.
#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Quit,
    Skip,
    Message(&'a str),
}

fn parse_line(line: &str) -> Command<'_> {
    match line.trim() {
        "" => Command::Skip,
        "/quit" | "/exit" => Command::Quit,
        text => Command::Message(text),
    }
}

/// Lines from a reader as a stream; read errors end the stream.
fn line_stream<R>(reader: R) -> impl Stream<Item = String>
where
    R: AsyncBufRead + Unpin,
{
    stream::unfold(reader.lines(), |mut lines| async move {
        match lines.next_line().await {
            Ok(Some(line)) => Some((line, lines)),
            Ok(None) => None, // EOF
            Err(e) => {
                error!("Error reading input: {}", e);
                None
            }
        }
    })
}

/// Run the REPL on stdin/stdout until EOF or `/quit`.
pub async fn run_repl(graph: Arc<DispatchGraph>, user_id: &str) -> std::io::Result<()> {
    let reader = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    run_session(&graph, user_id, reader, &mut stdout).await?;
    Ok(())
}

/// Drive one session over arbitrary input and output. Returns the number of
/// messages answered.
pub async fn run_session<R, W>(
    graph: &DispatchGraph,
    user_id: &str,
    input: R,
    output: &mut W,
) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let lines = line_stream(input);
    futures::pin_mut!(lines);
    let mut answered = 0;

    // Prompt
    eprint!("> ");

    while let Some(line) = lines.next().await {
        let reply = match parse_line(&line) {
            Command::Quit => break,
            Command::Skip => {
                eprint!("> ");
                continue;
            }
            Command::Message(text) => match graph.run(user_id, text).await {
                Ok(reply) => reply,
                Err(e) => {
                    error!(error = %e, "Dispatch failed");
                    GENERIC_ERROR.to_string()
                }
            },
        };

        output
            .write_all(format!("\n{reply}\n\n").as_bytes())
            .await?;
        output.flush().await?;
        answered += 1;
        eprint!("> ");
    }

    Ok(answered)
}
