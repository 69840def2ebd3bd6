//! Knowledge assistant server binary.
//! Run with: cargo run --bin knowledge-assistant

use std::process::ExitCode;

use knowledge_assistant::start_knowledge_assistant;

fn main() -> ExitCode {
    start_knowledge_assistant::run()
}
