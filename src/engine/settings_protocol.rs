// src/engine/settings_protocol.rs

//! Handling of inbound client messages.

use tracing::{debug, info, warn};

use crate::engine::registry::ClientRegistry;
use crate::protocol::{parse_control_message, settings_ack_json, ControlMessage, EffectiveSettings};
use crate::types::ClientId;

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Settings were merged; the client was sent these effective settings.
    Acknowledged(EffectiveSettings),
    /// Well-formed but not a message we handle.
    Ignored,
    /// Could not be parsed. The connection stays open.
    Rejected,
    /// The client is no longer registered.
    UnknownClient,
}

/// Handle one text frame from `client`.
///
/// A settings request updates only the sender's own entry and is answered on
/// the sender's connection with its fully-resolved settings. Nothing here
/// tears a connection down.
pub fn handle_client_message(
    registry: &mut ClientRegistry,
    defaults: &EffectiveSettings,
    client: ClientId,
    text: &str,
) -> MessageOutcome {
    let update = match parse_control_message(text) {
        Ok(ControlMessage::Settings(update)) => update,
        Ok(ControlMessage::Unrecognized(event)) => {
            debug!(%client, ?event, "ignoring unrecognized client message");
            return MessageOutcome::Ignored;
        }
        Err(err) => {
            warn!(%client, error = %err, "dropping client message");
            return MessageOutcome::Rejected;
        }
    };

    if !registry.update_settings(client, &update) {
        debug!(%client, "settings request from unregistered client");
        return MessageOutcome::UnknownClient;
    }

    let Some(connection) = registry.get(client).map(|c| c.connection.clone()) else {
        return MessageOutcome::UnknownClient;
    };
    let Some(effective) = registry.effective_settings(client, defaults) else {
        return MessageOutcome::UnknownClient;
    };

    info!(
        %client,
        base_path = %effective.base_path,
        relative_paths = effective.relative_paths,
        with_contents = effective.with_contents,
        "client settings updated"
    );

    match settings_ack_json(&effective) {
        Ok(ack) => {
            if connection.send(ack).is_err() {
                debug!(%client, "connection closed before settings acknowledgement");
            }
        }
        Err(err) => warn!(%client, error = %err, "failed to serialize settings acknowledgement"),
    }

    MessageOutcome::Acknowledged(effective)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Connection;

    fn defaults() -> EffectiveSettings {
        EffectiveSettings::new("/default")
    }

    #[test]
    fn settings_request_is_acknowledged_with_resolved_fields() {
        let mut registry = ClientRegistry::new();
        let (conn, mut rx) = Connection::channel();
        let id = registry.register(conn);

        let outcome = handle_client_message(
            &mut registry,
            &defaults(),
            id,
            r#"{"event":"settings","settings":{"relativePaths":true}}"#,
        );

        let expected = defaults().with_relative_paths(true);
        assert_eq!(outcome, MessageOutcome::Acknowledged(expected));
        assert_eq!(
            rx.try_recv().unwrap(),
            r#"{"event":"settings","settings":{"basePath":"/default","relativePaths":true,"withContents":false}}"#
        );
    }

    #[test]
    fn only_the_sender_is_updated() {
        let mut registry = ClientRegistry::new();
        let (a, mut rx_a) = Connection::channel();
        let (b, mut rx_b) = Connection::channel();
        let a = registry.register(a);
        let b = registry.register(b);

        handle_client_message(
            &mut registry,
            &defaults(),
            a,
            r#"{"event":"settings","settings":{"basePath":"/a"}}"#,
        );

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
        assert_eq!(
            registry.effective_settings(b, &defaults()).unwrap(),
            defaults()
        );
    }

    #[test]
    fn garbage_is_rejected_without_reply() {
        let mut registry = ClientRegistry::new();
        let (conn, mut rx) = Connection::channel();
        let id = registry.register(conn);

        let outcome = handle_client_message(&mut registry, &defaults(), id, "{{{");
        assert_eq!(outcome, MessageOutcome::Rejected);
        assert!(rx.try_recv().is_err());
        assert!(registry.contains(id));
    }

    #[test]
    fn unknown_events_are_ignored() {
        let mut registry = ClientRegistry::new();
        let (conn, mut rx) = Connection::channel();
        let id = registry.register(conn);

        let outcome =
            handle_client_message(&mut registry, &defaults(), id, r#"{"event":"hello"}"#);
        assert_eq!(outcome, MessageOutcome::Ignored);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn closed_connection_does_not_fail_the_update() {
        let mut registry = ClientRegistry::new();
        let (conn, rx) = Connection::channel();
        let id = registry.register(conn);
        drop(rx);

        let outcome = handle_client_message(
            &mut registry,
            &defaults(),
            id,
            r#"{"event":"settings","settings":{"withContents":true}}"#,
        );
        assert!(matches!(outcome, MessageOutcome::Acknowledged(_)));
    }
}
