//! linebot core library: configuration, LINE webhook types, the event dispatcher,
//! the room sensor client, and the webhook gateway used by the CLI.

pub mod channels;
pub mod config;
pub mod dispatch;
pub mod gateway;
pub mod init;
pub mod reply;
pub mod sensor;
