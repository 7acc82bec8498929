//! Full configuration validation.
//!
//! Checks numeric ranges and the room id pattern, collecting every problem
//! into a single `ConfigError`.

mod helpers;

#[cfg(test)]
mod tests;

use crate::schema::TandemConfig;
use tandem_common::ConfigError;

use helpers::validate_range;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &TandemConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_server(&mut errors, config);
    validate_rooms(&mut errors, config);
    validate_chat(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

fn validate_server(errors: &mut Vec<String>, config: &TandemConfig) {
    validate_range(errors, "server.port", config.server.port, 1024, 65535);
    validate_range(
        errors,
        "server.outbox_warn_depth",
        config.server.outbox_warn_depth,
        1,
        100_000,
    );
    validate_range(
        errors,
        "server.outbox_capacity",
        config.server.outbox_capacity,
        16,
        65_536,
    );
    if config.server.outbox_warn_depth >= config.server.outbox_capacity {
        errors.push(format!(
            "server.outbox_warn_depth = {} must be below server.outbox_capacity = {}",
            config.server.outbox_warn_depth, config.server.outbox_capacity
        ));
    }
    if config.server.host.trim().is_empty() {
        errors.push("server.host must not be empty".into());
    }
}

fn validate_rooms(errors: &mut Vec<String>, config: &TandemConfig) {
    if let Err(e) = config.rooms.compile_pattern() {
        errors.push(e.to_string());
    }
}

fn validate_chat(errors: &mut Vec<String>, config: &TandemConfig) {
    let chat = &config.chat;
    validate_range(errors, "chat.history_limit", chat.history_limit, 1, 500);
    validate_range(errors, "chat.max_history_limit", chat.max_history_limit, 1, 5000);
    validate_range(errors, "chat.max_message_length", chat.max_message_length, 1, 10_000);
    validate_range(errors, "chat.typing_timeout_ms", chat.typing_timeout_ms, 500, 30_000);
    if chat.history_limit > chat.max_history_limit {
        errors.push(format!(
            "chat.history_limit = {} exceeds chat.max_history_limit = {}",
            chat.history_limit, chat.max_history_limit
        ));
    }
}
