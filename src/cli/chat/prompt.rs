use rustyline::{Config, Editor, Result};

use crate::config::BackendId;

pub fn generate_prompt(backend: &BackendId) -> String {
    format!("[{backend}] > ")
}

pub fn rl() -> Result<Editor<()>> {
    let config = Config::builder()
        .history_ignore_space(true)
        .completion_type(rustyline::CompletionType::List)
        .build();
    Editor::with_config(config)
}
