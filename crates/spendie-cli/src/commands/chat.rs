//! Terminal chat session
//!
//! Reads one message per line and prints the bot's reply, so the chat
//! commands can be used without a messaging platform.

use std::io::{self, BufRead, Write};

use anyhow::Result;
use chrono::{Local, NaiveDate};
use spendie_core::ChatBot;

use super::App;

pub fn cmd_chat(app: &App) -> Result<()> {
    println!("💬 Chatting as '{}'. Send /help for commands, 'quit' to leave.", app.owner);
    println!();

    let bot = ChatBot::new(app.dispatcher.clone(), app.formatter.clone());
    let stdin = io::stdin();
    let stdout = io::stdout();
    run_session(
        &bot,
        &app.owner,
        stdin.lock(),
        stdout.lock(),
        || Local::now().date_naive(),
    )?;

    Ok(())
}

/// Answer messages from `input` until EOF or `quit`; returns how many were answered
pub fn run_session<R, W>(
    bot: &ChatBot,
    owner: &str,
    input: R,
    mut output: W,
    today: impl Fn() -> NaiveDate,
) -> Result<usize>
where
    R: BufRead,
    W: Write,
{
    let mut answered = 0;
    write!(output, "> ")?;
    output.flush()?;

    for line in input.lines() {
        let line = line?;
        let message = line.trim();
        if message.eq_ignore_ascii_case("quit") || message.eq_ignore_ascii_case("exit") {
            break;
        }
        if !message.is_empty() {
            writeln!(output, "{}", bot.reply(owner, message, today()))?;
            writeln!(output)?;
            answered += 1;
        }
        write!(output, "> ")?;
        output.flush()?;
    }

    writeln!(output)?;
    Ok(answered)
}
