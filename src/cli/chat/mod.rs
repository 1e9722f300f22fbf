pub mod command;
pub mod conversation_state;
pub mod prompt;
pub mod render;
pub mod session;

use std::io::Write;
use std::process::ExitCode;

use color_print::cstr;
use command::Command;
use eyre::Result;
use prompt::generate_prompt;
use rustyline::error::ReadlineError;
use session::{ChatSession, TurnOutcome};
use tracing::error;

use crate::config::BackendId;
use crate::scenarios;

const WELCOME_TEXT: &str = cstr!(
    "
<bold>What could you do with a model that will do anything?</bold>

Models are designed to refuse harmful requests, but jailbreak-tuned models
will assist with far more. Compare how each backend answers the same prompt.

<green>/models</green>        List the available models
<green>/model</green> ID      Switch to another model
<green>/scenarios</green>     Show example prompts
<green>/help</green>          Show the help dialogue
<green>/quit</green>          Quit the application
"
);

const HELP_TEXT: &str = cstr!(
    "
<bold>Model picker chat</bold>

<green>/models</green>            List the available models
<green>/model</green> ID          Switch to another model (each keeps its own conversation)
<green>/scenarios</green>         Show example prompts (before the first message only)
<green>/scenario</green> N        Pre-fill the prompt with an example
<green>/history</green>           Show the conversation with the current model
<green>/system</green>            Show the current model's system message
<green>/help</green>              Show this help dialogue
<green>/quit</green>              Quit the application
"
);

pub struct ChatContext {
    output: Box<dyn Write>,
    input: Option<String>,
    interactive: bool,
    session: ChatSession,
}

impl ChatContext {
    pub fn new(
        output: Box<dyn Write>,
        input: Option<String>,
        interactive: bool,
        session: ChatSession,
    ) -> Self {
        Self {
            output,
            input,
            interactive,
            session,
        }
    }

    pub async fn run(&mut self) -> Result<ExitCode> {
        // Non-interactive mode: one turn against the selected backend
        if let Some(input) = self.input.take() {
            let backend = self.session.selected();
            let outcome = self.send(&backend, &input).await?;
            return Ok(match outcome {
                TurnOutcome::Failed(_) => ExitCode::FAILURE,
                _ => ExitCode::SUCCESS,
            });
        }

        if self.interactive {
            self.print_welcome()?;
            self.run_interactive().await?;
        }

        Ok(ExitCode::SUCCESS)
    }

    fn print_welcome(&mut self) -> Result<()> {
        writeln!(self.output, "{}", WELCOME_TEXT)?;
        let backend = self.session.selected();
        writeln!(
            self.output,
            "Current model: {}\n",
            self.session.pretty_name(&backend)?
        )?;
        render::scenarios(&mut *self.output, &self.session, &backend)?;
        Ok(())
    }

    async fn run_interactive(&mut self) -> Result<()> {
        let mut rl = prompt::rl()?;
        let mut prefill: Option<String> = None;

        loop {
            let prompt_text = generate_prompt(&self.session.selected());
            let readline = match prefill.take() {
                Some(text) => rl.readline_with_initial(&prompt_text, (&text, "")),
                None => rl.readline(&prompt_text),
            };

            match readline {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }

                    rl.add_history_entry(line.as_str());

                    match self.handle_input(&line).await {
                        Ok(Flow::Continue) => {}
                        Ok(Flow::Prefill(text)) => prefill = Some(text),
                        Ok(Flow::Quit) => break,
                        Err(e) => {
                            error!("Failed to handle input: {}", e);
                            writeln!(self.output, "Error: {}", e)?;
                        }
                    }
                }
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
                Err(e) => {
                    writeln!(self.output, "Error: {}", e)?;
                    break;
                }
            }
        }

        Ok(())
    }

    async fn handle_input(&mut self, input: &str) -> Result<Flow> {
        let backend = self.session.selected();

        match Command::parse(input) {
            Command::Help => writeln!(self.output, "{}", HELP_TEXT)?,
            Command::Quit => return Ok(Flow::Quit),
            Command::Models => render::backends(&mut *self.output, &self.session)?,
            Command::Model(id) => {
                let id = BackendId::from(id);
                self.session.select(&id)?;
                writeln!(
                    self.output,
                    "Current model: {}",
                    self.session.pretty_name(&id)?
                )?;
                if self.session.has_user_turn(&id)? {
                    render::transcript(&mut *self.output, &self.session, &id)?;
                } else {
                    render::scenarios(&mut *self.output, &self.session, &id)?;
                }
            }
            Command::Scenarios => render::scenarios(&mut *self.output, &self.session, &backend)?,
            Command::Scenario(key) => {
                let Some(scenario) = scenarios::find(&key) else {
                    writeln!(self.output, "No scenario named {key}. Try /scenarios.")?;
                    return Ok(Flow::Continue);
                };
                match self.session.choose_scenario(&backend, scenario)? {
                    Some(first_message) => return Ok(Flow::Prefill(first_message.to_string())),
                    None => writeln!(
                        self.output,
                        "Scenarios are only offered before the first message."
                    )?,
                }
            }
            Command::History => render::transcript(&mut *self.output, &self.session, &backend)?,
            Command::System => render::system(&mut *self.output, &self.session, &backend)?,
            Command::Unknown(name) => {
                writeln!(self.output, "Unknown command {name}. Type /help for the list.")?
            }
            Command::Chat(text) => {
                self.send(&backend, &text).await?;
            }
        }

        Ok(Flow::Continue)
    }

    async fn send(&mut self, backend: &BackendId, text: &str) -> Result<TurnOutcome> {
        let outcome = self.session.submit_user_message(backend, text).await?;
        render::outcome(&mut *self.output, &self.session, backend, &outcome)?;
        Ok(outcome)
    }
}

#[derive(Debug)]
enum Flow {
    Continue,
    Prefill(String),
    Quit,
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::config::AppConfig;
    use crate::error::GatewayError;
    use crate::gateway::{GatewayTable, Message, ModelGateway};

    /// Shared buffer so tests can read what the context wrote.
    #[derive(Clone, Default)]
    struct SharedOutput(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedOutput {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedOutput {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    struct Echo;

    #[async_trait]
    impl ModelGateway for Echo {
        async fn complete(&self, conversation: &[Message]) -> Result<Message, GatewayError> {
            let last = conversation.last().map(Message::content).unwrap_or_default();
            Ok(Message::assistant(format!("Warning: echo {last}")))
        }
    }

    fn context(input: Option<&str>) -> (ChatContext, SharedOutput) {
        let mut config = AppConfig::from_lookup(|_| None);
        config.timeout = Duration::from_secs(1);
        let gateways: GatewayTable = config
            .backends
            .iter()
            .map(|b| (b.id.clone(), Arc::new(Echo) as Arc<dyn ModelGateway>))
            .collect();
        let session = ChatSession::new(&config, gateways).unwrap();
        let output = SharedOutput::default();
        let ctx = ChatContext::new(
            Box::new(output.clone()),
            input.map(str::to_string),
            false,
            session,
        );
        (ctx, output)
    }

    #[tokio::test]
    async fn one_shot_input_prints_the_reply() {
        let (mut ctx, output) = context(Some("hello"));
        ctx.run().await.unwrap();

        let text = output.text();
        assert!(text.contains("echo hello"));
        assert!(!text.contains("Warning:"));
        assert!(!text.contains("You:"));
    }

    #[tokio::test]
    async fn switching_models_keeps_each_transcript() {
        let (mut ctx, output) = context(None);

        ctx.handle_input("first for jb").await.unwrap();
        ctx.handle_input("/model gpt4o").await.unwrap();
        ctx.handle_input("first for gpt").await.unwrap();
        ctx.handle_input("/model gpt4o-jb").await.unwrap();

        let jb = ctx.session.conversation(&"gpt4o-jb".into()).unwrap();
        assert_eq!(jb.len(), 3);
        assert_eq!(jb.messages()[1].content(), "first for jb");

        let gpt = ctx.session.conversation(&"gpt4o".into()).unwrap();
        assert_eq!(gpt.messages()[1].content(), "first for gpt");

        assert!(output.text().contains("Current model: OpenAI GPT-4o Jailbroken"));
    }

    #[tokio::test]
    async fn unknown_model_is_an_error() {
        let (mut ctx, _output) = context(None);
        let err = ctx.handle_input("/model gpt5").await.unwrap_err();
        assert_eq!(err.to_string(), "Unknown model gpt5");
        assert_eq!(ctx.session.selected(), BackendId::from("gpt4o-jb"));
    }

    #[tokio::test]
    async fn scenario_prefills_only_before_first_message() {
        let (mut ctx, output) = context(None);

        let flow = ctx.handle_input("/scenario 1").await.unwrap();
        assert!(matches!(flow, Flow::Prefill(ref text) if text == scenarios::SCENARIOS[0].first_message));

        ctx.handle_input(scenarios::SCENARIOS[0].first_message).await.unwrap();
        assert!(output.text().contains("Hint:"));

        let flow = ctx.handle_input("/scenario 1").await.unwrap();
        assert!(matches!(flow, Flow::Continue));
    }

    #[tokio::test]
    async fn quit_stops_the_loop() {
        let (mut ctx, _output) = context(None);
        assert!(matches!(ctx.handle_input("/quit").await.unwrap(), Flow::Quit));
    }
}
