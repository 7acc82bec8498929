//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Tandem relay configuration
# Only override what you want to change -- missing fields use defaults.

[server]
# host = "0.0.0.0"
# port = 3001              # 1024-65535
# outbox_warn_depth = 256  # 1-100000, below outbox_capacity
# outbox_capacity = 1024   # 16-65536, full queue disconnects the client

[rooms]
# id_pattern = "^[A-Za-z0-9_\\-]{1,64}$"

[chat]
# history_limit = 50         # 1-500
# max_history_limit = 500    # 1-5000
# max_message_length = 2000  # 1-10000
# typing_timeout_ms = 3000   # 500-30000

[store]
# backend = "journal"        # journal, memory
# path = ""                  # empty = platform data dir

[logging]
# level = "INFO"             # DEBUG, INFO, WARNING, ERROR
"##
    .to_string()
}
