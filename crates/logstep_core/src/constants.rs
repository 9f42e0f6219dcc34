//! Fixed names that appear in debug logs or on the protocol surface.

/// Signature of the synthetic frame wrapping an anonymous script
pub const EXEC_ANON_SIGNATURE: &str = "execute_anonymous_apex";

/// Marker line prefix that opens an anonymous script listing
pub const EXEC_ANON_MARKER: &str = "Execute Anonymous:";

/// Namespace prefix carried by trigger signatures
pub const TRIGGER_PREFIX: &str = "__sfdc_trigger/";

/// The only thread a replay session ever reports
pub const THREAD_ID: i64 = 1;

/// Maximum number of checkpoints registered at once
pub const MAX_CHECKPOINTS: usize = 5;

/// Condition text that diverts a breakpoint to the checkpoint registry
pub const CHECKPOINT_MARKER: &str = "checkpoint";

/// Tag of the line announcing a heap dump
pub const HEAP_DUMP_TAG: &str = "HEAP_DUMP";

/// Prefix of every heap address written in a log or a heap dump
pub const ADDRESS_PREFIX: &str = "0x";

/// Prefix of the trigger context variables a heap dump exposes
pub const TRIGGER_CONTEXT_PREFIX: &str = "Trigger.";
