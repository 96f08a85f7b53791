//! `crownwell chat` — Interactive or single-message streaming chat.

use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;

use crownwell_config::AppConfig;
use crownwell_core::delivery::{Delivery, DeliveryTracker};
use crownwell_core::error::TransportError;
use crownwell_core::message::ChatMessage;
use crownwell_core::model::SupportedModel;
use crownwell_core::snapshot::Snapshot;
use crownwell_stream::{HttpChatTransport, RequestState, StreamReassembler};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::presentation::{TableHistory, ToolTable, derive_title};

pub async fn run(
    message: Option<String>,
    model: Option<String>,
    plain: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let model = match model {
        Some(m) => m.parse::<SupportedModel>()?,
        None => config.default_model,
    };

    let mut session = ChatSession::new(build_runner(&config)?, model, plain);

    if let Some(msg) = message {
        session.send(&msg).await?;
        return Ok(());
    }

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║        Crownwell Chat — Interactive Mode     ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Backend:   {}", config.base_url);
    println!("  Model:     {} ({})", model, model.label());
    println!();
    println!("  Type your message and press Enter. Ctrl+C stops an answer.");
    println!("  Commands: /tables, /model <id>, /new, exit");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };
        let input = line.trim();

        match input {
            "" => continue,
            "exit" | "quit" => break,
            "/tables" => session.print_tables(),
            "/new" => {
                session.reset();
                println!("  Started a new conversation.\n");
            }
            cmd if cmd.starts_with("/model") => {
                match cmd.trim_start_matches("/model").trim().parse::<SupportedModel>() {
                    Ok(m) => {
                        session.model = m;
                        println!("  Model set to {} ({})\n", m, m.label());
                    }
                    Err(e) => eprintln!("  [Error] {e}\n"),
                }
            }
            text => {
                if let Err(e) = session.send(text).await {
                    eprintln!("\n  [Error] {e}\n");
                }
            }
        }
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

fn build_runner(config: &AppConfig) -> crownwell_core::Result<StreamReassembler> {
    let transport = Arc::new(HttpChatTransport::from_config(config)?);
    Ok(StreamReassembler::new(transport).with_channel_capacity(config.chat.channel_capacity))
}

/// One conversation: its history, title, and the tool tables it produced.
struct ChatSession {
    runner: StreamReassembler,
    model: SupportedModel,
    plain: bool,
    history: Vec<ChatMessage>,
    tables: TableHistory,
    title: Option<String>,
}

impl ChatSession {
    fn new(runner: StreamReassembler, model: SupportedModel, plain: bool) -> Self {
        Self {
            runner,
            model,
            plain,
            history: Vec::new(),
            tables: TableHistory::default(),
            title: None,
        }
    }

    fn reset(&mut self) {
        self.history.clear();
        self.tables = TableHistory::default();
        self.title = None;
    }

    async fn send(&mut self, text: &str) -> Result<(), TransportError> {
        if self.title.is_none() {
            let title = derive_title(text);
            debug!(%title, "Conversation titled");
            self.title = Some(title);
        }
        self.history.push(ChatMessage::user(text));

        let cancel = CancellationToken::new();
        let _watch = watch_ctrl_c(cancel.clone());

        let mut stream = match self.runner.run(&self.history, self.model, cancel).await {
            Ok(stream) => stream,
            Err(e) => {
                self.history.pop();
                return Err(e);
            }
        };

        let mut stdout = std::io::stdout();
        let mut renderer = TurnRenderer::default();
        let mut finished = None;

        if !self.plain {
            print!("\n  Assistant > ");
        }
        while let Some(item) = stream.recv().await {
            let snapshot = match item {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    self.history.pop();
                    return Err(e);
                }
            };
            if !self.plain {
                // A closed stdout is not worth failing the turn over.
                let _ = renderer.render(&snapshot, &mut stdout);
            }
            if snapshot.is_complete() {
                finished = Some(snapshot);
            }
        }

        let Some(snapshot) = finished else {
            self.history.pop();
            return Err(TransportError::StreamInterrupted(
                "stream ended without a completion snapshot".into(),
            ));
        };

        if stream.state() == RequestState::Cancelled {
            println!("\n  (stopped)");
        }
        if !self.plain {
            println!("\n");
        }

        let assistant = ChatMessage::assistant_from(&snapshot);
        self.deliver(&assistant.id, &snapshot);
        if !snapshot.parts.is_empty() {
            self.history.push(assistant);
        }
        Ok(())
    }

    /// Act once on a finished turn: print the answer in plain mode and keep
    /// any tables the tools returned.
    fn deliver(&mut self, message_id: &str, snapshot: &Snapshot) {
        let mut tracker = DeliveryTracker::new();
        for delivery in tracker.collect(message_id, snapshot) {
            match delivery {
                Delivery::AssistantText { text, .. } => {
                    if self.plain {
                        println!("{text}");
                    }
                }
                Delivery::ToolData {
                    tool_name, data, ..
                } => {
                    if let Some(table) = ToolTable::from_data(&tool_name, &data) {
                        if !self.plain {
                            println!("  📊 {} returned {} rows (/tables to view)", tool_name, table.rows.len());
                        }
                        self.tables.push(table);
                    }
                }
            }
        }
    }

    fn print_tables(&self) {
        if self.tables.is_empty() {
            println!("  No tool tables yet.\n");
            return;
        }
        for table in self.tables.iter() {
            println!("  ── {} ──", table.tool_name);
            for line in table.render().lines() {
                println!("  {line}");
            }
            println!();
        }
    }
}

/// Cancel `cancel` on Ctrl+C until the returned guard is dropped.
fn watch_ctrl_c(cancel: CancellationToken) -> tokio_util::sync::DropGuard {
    let done = CancellationToken::new();
    let guard = done.clone().drop_guard();
    tokio::spawn(async move {
        tokio::select! {
            _ = done.cancelled() => {}
            res = tokio::signal::ctrl_c() => {
                if res.is_ok() {
                    cancel.cancel();
                }
            }
        }
    });
    guard
}

/// Prints the growth of a turn: new text, and tool calls as they start and
/// finish.
#[derive(Default)]
struct TurnRenderer {
    printed: usize,
    started: HashSet<String>,
    finished: HashSet<String>,
}

impl TurnRenderer {
    fn render(&mut self, snapshot: &Snapshot, out: &mut impl Write) -> std::io::Result<()> {
        let text = snapshot.text();
        if let Some(delta) = text.get(self.printed..).filter(|d| !d.is_empty()) {
            write!(out, "{delta}")?;
            self.printed = text.len();
        }

        for call in snapshot.tool_calls() {
            if self.started.insert(call.id.clone()) {
                writeln!(out, "\n    ⚙ {}({})", call.name, call.arguments_text())?;
            }
            if !call.is_pending() && self.finished.insert(call.id.clone()) {
                writeln!(out, "    ✓ {}", call.name)?;
            }
        }
        out.flush()
    }
}
