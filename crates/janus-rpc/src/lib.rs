//! Client for the Janus WebRTC gateway over HTTP long-poll.
//!
//! # Architecture
//!
//! - [`protocol`]: wire envelopes, identifiers and marker constants
//! - [`transport`]: the HTTP seam and its `reqwest` implementation
//! - [`session`]: session lifecycle, plugin registry and transaction checks
//! - [`poll`]: caller driven long-poll loop
//! - [`helpers`]: namespace and URI helpers
//! - [`error`]: error type and `Result` alias
//!
//! # Example
//!
//! ```no_run
//! use janus_rpc::{ReqwestTransport, Session};
//!
//! # async fn example() -> Result<(), janus_rpc::Error> {
//! let mut session = Session::new(ReqwestTransport::new());
//! session.connect("http://localhost:8088/janus").await?;
//!
//! session.activate("echotest").await?;
//! let reply = session
//!     .plugin("echotest")?
//!     .send(serde_json::json!({ "audio": true }))
//!     .await?;
//!
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod helpers;
pub mod poll;
pub mod protocol;
pub mod session;
pub mod transport;

pub use error::{Error, Result};

pub use helpers::{normalize_uri, qualify_namespace};

pub use poll::{PollExit, PollLoop};

pub use protocol::{
    ACK, ATTACH, CREATE, ERROR, EVENT, Event, GatewayError, Id, KEEPALIVE, MESSAGE,
    PLUGIN_NAMESPACE_PREFIX, PluginData, Request, Response, SUCCESS, Transaction,
};

pub use session::{Plugin, PostOptions, Session};

pub use transport::{
    CONTENT_TYPE_JSON, HttpResponse, HttpTransport, ReqwestTransport, TransportError,
};
