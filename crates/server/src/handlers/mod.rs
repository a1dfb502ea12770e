//! Protocol adapters. Each one translates its wire format to the post store
//! and back; none of them touch the registry except the WebSocket channel.

pub mod graphql;
pub mod rest;
pub mod soap;
pub mod ws;

pub use graphql::{graphiql, graphql_handler};
pub use rest::{create_post, delete_post, get_post, list_posts, update_post};
pub use soap::soap_handler;
pub use ws::ws_handler;
