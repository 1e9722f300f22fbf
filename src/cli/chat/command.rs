/// A line typed at the chat prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    /// List the configured backends.
    Models,
    /// Switch to another backend.
    Model(String),
    Scenarios,
    /// Pre-fill the prompt with a scenario's first message.
    Scenario(String),
    History,
    System,
    /// Anything that is not a command is sent to the model.
    Chat(String),
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if !trimmed.starts_with('/') {
            return Command::Chat(line.to_string());
        }

        let (name, arg) = match trimmed.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (trimmed, ""),
        };

        match (name, arg) {
            ("/help", _) => Command::Help,
            ("/quit" | "/exit", _) => Command::Quit,
            ("/models", _) => Command::Models,
            ("/model", "") => Command::Models,
            ("/model", id) => Command::Model(id.to_string()),
            ("/scenarios", _) => Command::Scenarios,
            ("/scenario", "") => Command::Scenarios,
            ("/scenario", key) => Command::Scenario(key.to_string()),
            ("/history", _) => Command::History,
            ("/system", _) => Command::System,
            _ => Command::Unknown(name.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_chat() {
        assert_eq!(Command::parse("hello there"), Command::Chat("hello there".into()));
        assert_eq!(Command::parse("  "), Command::Chat("  ".into()));
    }

    #[test]
    fn commands_with_arguments() {
        assert_eq!(Command::parse("/model gemini1.5"), Command::Model("gemini1.5".into()));
        assert_eq!(Command::parse(" /scenario  Lab Tutor "), Command::Scenario("Lab Tutor".into()));
        assert_eq!(Command::parse("/model"), Command::Models);
        assert_eq!(Command::parse("/scenario"), Command::Scenarios);
    }

    #[test]
    fn bare_commands() {
        assert_eq!(Command::parse("/help"), Command::Help);
        assert_eq!(Command::parse("/exit"), Command::Quit);
        assert_eq!(Command::parse("/history"), Command::History);
        assert_eq!(Command::parse("/system"), Command::System);
        assert_eq!(Command::parse("/bogus arg"), Command::Unknown("/bogus".into()));
    }
}
