use std::io::Write;

use crossterm::style::Stylize;
use eyre::Result;

use super::session::{ChatSession, TurnOutcome};
use crate::config::BackendId;
use crate::gateway::{Message, Role};
use crate::scenarios::SCENARIOS;

/// Writes one message with its role label. System messages are not part of
/// the transcript view.
pub fn message(
    out: &mut dyn Write,
    session: &ChatSession,
    id: &BackendId,
    message: &Message,
) -> Result<()> {
    let content = session.display_content(id, message);
    match message.role() {
        Role::User => writeln!(out, "{} {}", "You:".bold().cyan(), content)?,
        Role::Assistant => writeln!(out, "{} {}", "Assistant:".bold().green(), content)?,
        Role::System => {}
    }
    Ok(())
}

fn hint(out: &mut dyn Write, session: &ChatSession, id: &BackendId) -> Result<()> {
    if let Some(hint) = session.hint_for(id)? {
        writeln!(out, "{} {}", "Hint:".bold().yellow(), hint)?;
    }
    Ok(())
}

pub fn transcript(out: &mut dyn Write, session: &ChatSession, id: &BackendId) -> Result<()> {
    writeln!(
        out,
        "{}",
        format!("Conversation with {}", session.pretty_name(id)?).bold()
    )?;
    let conversation = session.conversation(id)?;
    for msg in conversation.messages() {
        message(out, session, id, msg)?;
    }
    hint(out, session, id)
}

pub fn system(out: &mut dyn Write, session: &ChatSession, id: &BackendId) -> Result<()> {
    let conversation = session.conversation(id)?;
    writeln!(out, "{}", "About the model".bold())?;
    writeln!(out, "{} {}", "System message:".italic(), conversation.system_message())?;
    Ok(())
}

pub fn backends(out: &mut dyn Write, session: &ChatSession) -> Result<()> {
    let selected = session.selected();
    for id in session.list_backends() {
        let marker = if *id == selected { "*" } else { " " };
        writeln!(out, "{} {:<12} {}", marker, id.as_str(), session.pretty_name(id)?)?;
    }
    Ok(())
}

/// Lists the preset scenarios while the backend has no user turn yet.
pub fn scenarios(out: &mut dyn Write, session: &ChatSession, id: &BackendId) -> Result<()> {
    if session.has_user_turn(id)? {
        writeln!(out, "Scenarios are only offered before the first message.")?;
        return Ok(());
    }
    writeln!(
        out,
        "Try your own scenario, or start off with one of the examples below (/scenario <n>)."
    )?;
    for (i, scenario) in SCENARIOS.iter().enumerate() {
        writeln!(out, "  {}. {}", i + 1, scenario.name)?;
    }
    Ok(())
}

/// Reports a finished turn: the reply and its hint, or what went wrong.
pub fn outcome(
    out: &mut dyn Write,
    session: &ChatSession,
    id: &BackendId,
    outcome: &TurnOutcome,
) -> Result<()> {
    match outcome {
        TurnOutcome::Ignored => {}
        TurnOutcome::Replied(reply) => {
            message(out, session, id, reply)?;
            hint(out, session, id)?;
        }
        TurnOutcome::NoReply => writeln!(out, "{}", "The model returned an empty reply.".yellow())?,
        TurnOutcome::Failed(e) => writeln!(out, "{} {}", "Error:".bold().red(), e)?,
    }
    Ok(())
}
