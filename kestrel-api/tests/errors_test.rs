// Display and conversion checks for kestrel_api::errors

use std::time::Duration;

use anyhow::anyhow;
use kestrel_api::errors::*;
use kestrel_api::supervisor::ProcessState;

#[test]
fn test_mailbox_error_display() {
    assert_eq!(
        MailboxError::Timeout { timeout: Duration::from_millis(50) }.to_string(),
        "Mailbox offer timed out after 50ms"
    );
    assert_eq!(MailboxError::Shutdown.to_string(), "Mailbox is shut down");
    assert_eq!(MailboxError::Full { capacity: 8 }.to_string(), "Mailbox is full (capacity: 8)");
}

#[test]
fn test_registry_error_display() {
    assert_eq!(RegistryError::DuplicateRuntime("r1".to_string()).to_string(), "Runtime already exists: r1");
    assert_eq!(RegistryError::RuntimeNotFound("r9".to_string()).to_string(), "Runtime not found: r9");
    assert_eq!(
        RegistryError::from(MailboxError::Shutdown).to_string(),
        "Mailbox error: Mailbox is shut down"
    );
    // config errors are shown as-is
    let config = RegistryError::from(ConfigError::InvalidMailbox("capacity must be positive".to_string()));
    assert_eq!(config.to_string(), "Invalid mailbox configuration: capacity must be positive");
}

#[test]
fn test_workflow_error_keeps_context_chain() {
    let source = anyhow!("connection refused").context("calling summarizer");
    let error = WorkflowError::execution("a-1", &source);

    assert_eq!(error.activity_id(), "a-1");
    assert_eq!(error.message(), "calling summarizer: connection refused");
    assert_eq!(
        error.to_string(),
        "Workflow failed on activity a-1: calling summarizer: connection refused"
    );
}

#[test]
fn test_workflow_error_serializes_with_kind_tag() {
    let error = WorkflowError::panicked("a-2", "index out of bounds");
    assert_eq!(error.to_string(), "Workflow panicked on activity a-2: index out of bounds");

    let value = serde_json::to_value(&error).unwrap();
    assert_eq!(value["kind"], "panicked");
    assert_eq!(value["activityId"], "a-2");

    let back: WorkflowError = serde_json::from_value(value).unwrap();
    assert_eq!(back, error);
}

#[test]
fn test_supervisor_error_display() {
    let invalid = SupervisorError::InvalidTransition {
        state: ProcessState::Completed,
        event: "START_PROCESS",
    };
    assert_eq!(invalid.to_string(), "Invalid transition: START_PROCESS in state 'completed'");

    let registry = SupervisorError::from(RegistryError::RuntimeNotFound("task-b".to_string()));
    assert_eq!(registry.to_string(), "Registry error: Runtime not found: task-b");
}
