//! OneBot v11 host integration
//!
//! The bot host exposes an HTTP API where every action is a `POST` to
//! `{base_url}/{action}` with a JSON body, answered with
//!
//! ```json
//! { "status": "ok", "retcode": 0, "data": { ... } }
//! ```
//!
//! [`OneBotClient`] speaks this protocol and serves as the history source,
//! member directory and notifier for reports.
//!
//! ## Usage
//!
//! Point the client at the host in `~/.config/groupstat/config.toml`:
//!
//! ```toml
//! [onebot]
//! base_url = "http://127.0.0.1:3000"
//! access_token = "secret"
//! ```

mod client;

pub use client::OneBotClient;
