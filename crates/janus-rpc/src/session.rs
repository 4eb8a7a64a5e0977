//! Janus session state machine.
//!
//! A [`Session`] starts unconnected. [`Session::connect`] performs the
//! `create` handshake and stores the gateway assigned session id; after that
//! plugins can be attached with [`Session::activate`] and addressed by their
//! short name through [`Session::plugin`].
//!
//! Every command goes through [`Session::post`], which stamps a fresh
//! transaction on the envelope and only hands back `data` once the reply
//! passed, in order, the HTTP status check, JSON decoding, the marker check
//! and the transaction check.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::helpers::{command_uri, normalize_uri, poll_uri, qualify_namespace};
use crate::protocol::{
    ACK, ATTACH, CREATE, Event, Id, KEEPALIVE, MESSAGE, Request, Response, SUCCESS, Transaction,
};
use crate::transport::{CONTENT_TYPE_JSON, HttpResponse, HttpTransport};

/// Per-dispatch options for [`Session::post`].
#[derive(Debug, Clone, Copy)]
pub struct PostOptions<'a> {
    /// Extra path segment below the session, used to address a plugin handle.
    pub path: Option<&'a Id>,
    /// Marker the reply must carry to count as success.
    pub expected: &'a str,
}

impl Default for PostOptions<'_> {
    fn default() -> Self {
        Self {
            path: None,
            expected: SUCCESS,
        }
    }
}

impl<'a> PostOptions<'a> {
    #[must_use]
    pub fn path(mut self, path: &'a Id) -> Self {
        self.path = Some(path);
        self
    }

    #[must_use]
    pub fn expect(mut self, marker: &'a str) -> Self {
        self.expected = marker;
        self
    }
}

/// A session with a Janus gateway.
pub struct Session<T> {
    transport: T,
    uri: String,
    id: Option<Id>,
    plugins: HashMap<String, Id>,
}

impl<T> std::fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("uri", &self.uri)
            .field("id", &self.id)
            .field("plugins", &self.plugins)
            .finish_non_exhaustive()
    }
}

impl<T: HttpTransport> Session<T> {
    /// Create an unconnected session that will talk through `transport`.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            uri: String::new(),
            id: None,
            plugins: HashMap::new(),
        }
    }

    /// Gateway assigned session id, once connected.
    #[must_use]
    pub fn id(&self) -> Option<&Id> {
        self.id.as_ref()
    }

    /// Base URI without trailing slash.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Attached plugins by short name.
    #[must_use]
    pub fn plugins(&self) -> &HashMap<String, Id> {
        &self.plugins
    }

    /// Create the server side session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyConnected`] if this session already has an id,
    /// otherwise any error of the `create` command. The id stays unset on
    /// failure.
    pub async fn connect(&mut self, uri: &str) -> Result<()> {
        if let Some(id) = &self.id {
            return Err(Error::AlreadyConnected(id.clone()));
        }

        self.uri = normalize_uri(uri).to_string();

        let data = self.command(CREATE, Map::new()).await?;
        let id = extract_id(data)?;

        info!(session_id = %id, uri = %self.uri, "session created");
        self.id = Some(id);
        Ok(())
    }

    /// Attach a plugin and register its handle under the plugin's short name.
    ///
    /// `namespace` may be a full namespace (`janus.plugin.echotest`) or a bare
    /// name (`echotest`). Attaching the same short name again replaces the
    /// earlier handle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] before [`Session::connect`], otherwise
    /// the `attach` command's error unchanged. Nothing is registered on error.
    pub async fn activate(&mut self, namespace: &str) -> Result<Id> {
        if self.id.is_none() {
            return Err(Error::NotConnected);
        }

        let (namespace, short_name) = qualify_namespace(namespace);

        let mut payload = Map::new();
        payload.insert("plugin".to_string(), Value::String(namespace.clone()));

        let data = self.command(ATTACH, payload).await?;
        let handle = extract_id(data)?;

        info!(plugin = %namespace, handle = %handle, "plugin attached");
        self.plugins.insert(short_name, handle.clone());
        Ok(handle)
    }

    /// Look up an attached plugin by short name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownPlugin`] if no plugin was activated under `name`.
    pub fn plugin(&self, name: &str) -> Result<Plugin<'_, T>> {
        let (name, handle) = self
            .plugins
            .get_key_value(name)
            .ok_or_else(|| Error::UnknownPlugin(name.to_string()))?;

        Ok(Plugin {
            session: self,
            name,
            handle,
        })
    }

    /// Send `{...payload, janus: command}` and return the reply's `data`.
    ///
    /// # Errors
    ///
    /// Returns any error of [`Session::post`].
    pub async fn command(&self, command: &str, mut payload: Map<String, Value>) -> Result<Value> {
        payload.insert("janus".to_string(), Value::String(command.to_string()));
        self.post(payload, PostOptions::default()).await
    }

    /// Send a message to a plugin handle, then long-poll for its outcome.
    ///
    /// The gateway acknowledges plugin messages with `ack`; the result is
    /// delivered asynchronously, so the value returned here is the next
    /// long-poll body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] before [`Session::connect`], the
    /// acknowledgement error without polling if the message is rejected,
    /// otherwise any error of [`Session::status`].
    pub async fn message(&self, handle: &Id, body: Value) -> Result<Value> {
        if self.id.is_none() {
            return Err(Error::NotConnected);
        }

        let mut payload = Map::new();
        payload.insert("body".to_string(), body);
        payload.insert("janus".to_string(), Value::String(MESSAGE.to_string()));

        self.post(payload, PostOptions::default().path(handle).expect(ACK))
            .await?;

        self.status().await
    }

    /// Keep the session alive on the gateway.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] before [`Session::connect`], otherwise
    /// any error of [`Session::post`].
    pub async fn keepalive(&self) -> Result<()> {
        if self.id.is_none() {
            return Err(Error::NotConnected);
        }

        let mut payload = Map::new();
        payload.insert("janus".to_string(), Value::String(KEEPALIVE.to_string()));

        self.post(payload, PostOptions::default().expect(ACK)).await?;
        Ok(())
    }

    /// Dispatch a command envelope and validate the reply.
    ///
    /// A fresh transaction replaces any `transaction` key in `payload`. The
    /// target is the base URI, then `/<session id>` once connected, then
    /// `/<path>` if `opts.path` is set.
    ///
    /// # Errors
    ///
    /// In this order: [`Error::Transport`] if no response arrived,
    /// [`Error::Status`] for non-200 replies, [`Error::Json`] for undecodable
    /// bodies, [`Error::Marker`] if the marker is not `opts.expected`, and
    /// [`Error::TransactionMismatch`] if the transaction is not echoed.
    pub async fn post(&self, payload: Map<String, Value>, opts: PostOptions<'_>) -> Result<Value> {
        let request = Request::new(payload, Transaction::new());
        let uri = command_uri(&self.uri, self.id.as_ref(), opts.path);
        let body = serde_json::to_vec(&request)?;

        debug!(
            uri = %uri,
            janus = request.verb().unwrap_or_default(),
            transaction = %request.transaction,
            "dispatching command"
        );

        let response = self
            .transport
            .post(&uri, &[CONTENT_TYPE_JSON], body)
            .await?;

        accept(&response, &request.transaction, opts.expected)
    }

    /// Issue a single long-poll request and return the raw body.
    ///
    /// No marker or transaction validation applies: the body is whatever the
    /// gateway pushed for this session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] before [`Session::connect`],
    /// [`Error::Status`] for non-200 replies and [`Error::Json`] for
    /// undecodable bodies.
    pub async fn status(&self) -> Result<Value> {
        let id = self.id.as_ref().ok_or(Error::NotConnected)?;
        let uri = poll_uri(&self.uri, id);

        debug!(uri = %uri, "requesting status");
        let response = self.transport.get(&uri).await?;

        if !response.is_ok() {
            warn!(status = response.status, "long-poll rejected");
            return Err(Error::Status(response.status));
        }

        let body: Value = serde_json::from_slice(&response.body)?;
        debug!(body = %body, "received status response");
        Ok(body)
    }

    /// [`Session::status`], interpreted as an [`Event`].
    ///
    /// # Errors
    ///
    /// Returns any error of [`Session::status`], or [`Error::Json`] if the
    /// body is not an event object.
    pub async fn events(&self) -> Result<Event> {
        let body = self.status().await?;
        Ok(Event::from_value(body)?)
    }
}

/// An attached plugin, borrowed from its session.
pub struct Plugin<'a, T> {
    session: &'a Session<T>,
    name: &'a str,
    handle: &'a Id,
}

impl<T: HttpTransport> Plugin<'_, T> {
    #[must_use]
    pub fn name(&self) -> &str {
        self.name
    }

    #[must_use]
    pub fn handle(&self) -> &Id {
        self.handle
    }

    /// Send a message body to this plugin. See [`Session::message`].
    ///
    /// # Errors
    ///
    /// Returns any error of [`Session::message`].
    pub async fn send(&self, body: Value) -> Result<Value> {
        self.session.message(self.handle, body).await
    }
}

/// Validate a command reply against its request.
fn accept(response: &HttpResponse, transaction: &Transaction, expected: &str) -> Result<Value> {
    if !response.is_ok() {
        warn!(status = response.status, %transaction, "command rejected");
        return Err(Error::Status(response.status));
    }

    let body: Value = serde_json::from_slice(&response.body)?;
    let Some(reply) = Response::from_value(body) else {
        warn!(expected, %transaction, "reply is not an object");
        return Err(Error::marker(expected, "", None));
    };

    if reply.janus != expected {
        warn!(expected, received = %reply.janus, %transaction, "unexpected reply marker");
        return Err(Error::marker(expected, reply.janus, reply.error));
    }

    if !reply.is_for(transaction) {
        warn!(
            %transaction,
            received = reply.transaction.as_deref().unwrap_or_default(),
            "transaction mismatch"
        );
        return Err(Error::TransactionMismatch);
    }

    Ok(reply.data.unwrap_or(Value::Null))
}

fn extract_id(data: Value) -> Result<Id> {
    let Value::Object(mut data) = data else {
        return Err(Error::MissingId);
    };
    let id = data.remove("id").ok_or(Error::MissingId)?;
    Ok(serde_json::from_value(id)?)
}
